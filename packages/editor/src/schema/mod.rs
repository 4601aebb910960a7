//! # Schema
//!
//! Rules describing what a well-formed document looks like, checked by the
//! normalization loop and by [`Schema::validate`].
//!
//! A rule pairs a [`Matcher`] (which nodes it applies to, optionally narrowed
//! by the parent) with a [`Constraint`]. Built-in constraints are plain data
//! and serialize with serde; [`Constraint::Custom`] carries a pair of callbacks
//! for anything the built-ins cannot express.
//!
//! Rules run in order and the first violation wins. [`Schema::core`] holds the
//! rules every document needs regardless of the user schema.

mod matcher;
mod rules;
mod violation;

pub use matcher::Matcher;
pub use violation::{ChildRepair, Violation, ViolationKind};

pub(crate) use rules::repair_operations;

use crate::editor::Editor;
use crate::errors::EditorResult;
use folio_model::{Attributes, Document, NodeRef, NodesOptions, Path};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;
use tracing::debug;

pub type ValidateFn = dyn Fn(&Document, NodeRef<'_>, &Path) -> Vec<Violation> + Send + Sync;
pub type NormalizeFn = dyn Fn(&mut Editor, &Violation) -> EditorResult<()> + Send + Sync;

/// What a rule requires of the nodes it matches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// Bounds on the number of children. Too few removes the node, too many
    /// removes the trailing child.
    ChildCount {
        #[serde(default)]
        min: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },

    /// Every child must match `allowed`
    Children {
        allowed: Matcher,
        #[serde(default)]
        repair: ChildRepair,
    },

    /// The parent must match `allowed`, or the node is removed
    Parent { allowed: Matcher },

    /// Attributes that must be present with exactly these values
    Attributes { required: Attributes },

    /// Non-void elements have at least one child
    NonEmpty,

    /// Children are all blocks or all inline content
    UniformChildren,

    /// Inline elements sit between text leaves
    InlineSpacing,

    /// No two adjacent texts share formatting, and no empty text sits next to
    /// another text
    MergeAdjacentText,

    /// Opaque callbacks; serialized by name only
    #[serde(skip_deserializing)]
    Custom { rule: CustomRule },
}

/// Escape hatch for rules that need code.
///
/// `normalize` receives the editor and may call [`Editor::apply`] as often as
/// it needs to. Every operation it applies marks paths dirty like any other.
#[derive(Clone)]
pub struct CustomRule {
    pub name: String,
    validate: Arc<ValidateFn>,
    normalize: Arc<NormalizeFn>,
}

impl CustomRule {
    pub fn new(
        name: impl Into<String>,
        validate: impl Fn(&Document, NodeRef<'_>, &Path) -> Vec<Violation> + Send + Sync + 'static,
        normalize: impl Fn(&mut Editor, &Violation) -> EditorResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            validate: Arc::new(validate),
            normalize: Arc::new(normalize),
        }
    }

    pub fn validate(&self, doc: &Document, node: NodeRef<'_>, path: &Path) -> Vec<Violation> {
        (self.validate)(doc, node, path)
    }

    pub fn normalize(&self, editor: &mut Editor, violation: &Violation) -> EditorResult<()> {
        (self.normalize)(editor, violation)
    }
}

impl std::fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomRule").field("name", &self.name).finish()
    }
}

impl Serialize for CustomRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

/// A named constraint scoped by matchers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,

    /// Nodes the rule applies to
    pub matches: Matcher,

    /// When set, only nodes whose parent matches are checked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Matcher>,

    pub constraint: Constraint,
}

impl Rule {
    pub fn new(name: impl Into<String>, matches: Matcher, constraint: Constraint) -> Self {
        Self {
            name: name.into(),
            matches,
            parent: None,
            constraint,
        }
    }

    /// Wrap a custom rule, applied to nodes matching `matches`
    pub fn custom(matches: Matcher, rule: CustomRule) -> Self {
        Self::new(rule.name.clone(), matches, Constraint::Custom { rule })
    }

    /// Only check nodes whose parent matches `parent`
    pub fn within(mut self, parent: Matcher) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Whether the rule applies to the node at `path`
    pub fn applies_to(&self, doc: &Document, node: NodeRef<'_>, path: &Path) -> bool {
        if !self.matches.matches(node) {
            return false;
        }
        match &self.parent {
            Some(parent) => doc.parent(path).is_ok_and(|p| parent.matches(p)),
            None => true,
        }
    }

    /// Every violation of this rule at the node at `path`
    pub fn check(&self, doc: &Document, node: NodeRef<'_>, path: &Path) -> Vec<Violation> {
        if !self.applies_to(doc, node, path) {
            return Vec::new();
        }
        rules::check(self, doc, node, path)
    }
}

/// Ordered rule list.
///
/// Deserializing skips custom rules: only their names were stored, and the
/// callbacks have to be registered again in code.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    rules: Vec<Rule>,
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Stored {
            #[serde(default)]
            rules: Vec<serde_json::Value>,
        }

        let stored = Stored::deserialize(deserializer)?;
        let mut rules = Vec::with_capacity(stored.rules.len());
        for value in stored.rules {
            if value["constraint"]["kind"] == "custom" {
                debug!(rule = %value["name"], "skipping custom rule without callbacks");
                continue;
            }
            rules.push(serde_json::from_value(value).map_err(D::Error::custom)?);
        }
        Ok(Self { rules })
    }
}

impl Schema {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// An empty schema
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The built-in rules that keep any document well-formed
    pub fn core() -> Self {
        Self {
            rules: vec![
                Rule::new("non-empty", Matcher::Element, Constraint::NonEmpty),
                Rule::new(
                    "uniform-children",
                    Matcher::not(Matcher::Text),
                    Constraint::UniformChildren,
                ),
                Rule::new("inline-spacing", Matcher::Element, Constraint::InlineSpacing),
                Rule::new(
                    "merge-adjacent-text",
                    Matcher::not(Matcher::Text),
                    Constraint::MergeAdjacentText,
                ),
            ],
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.add_rule(rule);
        self
    }

    /// Append every rule of `other` after this schema's rules
    pub fn extend(&mut self, other: Schema) {
        self.rules.extend(other.rules);
    }

    /// The first violation at the node at `path`, with the rule reporting it
    pub fn first_violation(&self, doc: &Document, node: NodeRef<'_>, path: &Path) -> Option<(&Rule, Violation)> {
        self.rules.iter().find_map(|rule| {
            rule.check(doc, node, path)
                .into_iter()
                .next()
                .map(|violation| (rule, violation))
        })
    }

    /// Every violation in the document, without repairing anything
    pub fn validate(&self, doc: &Document) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (node, path) in doc.nodes(NodesOptions::default()) {
            for rule in &self.rules {
                violations.extend(rule.check(doc, node, &path));
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::{Element, Node, Text};
    use serde_json::json;

    fn quote_schema() -> Schema {
        Schema::new(vec![
            Rule::new(
                "quote-children",
                Matcher::kind("quote"),
                Constraint::Children {
                    allowed: Matcher::kind("paragraph"),
                    repair: ChildRepair::Remove,
                },
            ),
            Rule::new(
                "quote-min",
                Matcher::kind("quote"),
                Constraint::ChildCount { min: 1, max: None },
            ),
        ])
    }

    #[test]
    fn test_core_accepts_well_formed_document() {
        let doc = Document::new(vec![
            Node::element(
                "paragraph",
                vec![
                    Node::text("a "),
                    Node::Element(Element::new("link").inline().with_children(vec![Node::text("b")])),
                    Node::text(""),
                ],
            ),
            Node::Element(Element::new("image").void()),
        ]);
        assert_eq!(Schema::core().validate(&doc), vec![]);
    }

    #[test]
    fn test_core_reports_each_problem() {
        let doc = Document::new(vec![
            Node::element("paragraph", vec![]),
            Node::element(
                "paragraph",
                vec![Node::text("a"), Node::text("b"), Node::element("quote", vec![Node::text("c")])],
            ),
            Node::element(
                "paragraph",
                vec![Node::Element(Element::new("link").inline().with_children(vec![Node::text("x")]))],
            ),
            Node::element("paragraph", vec![Node::Text(Text::new("a").mark("bold")), Node::text("")]),
        ]);

        let kinds: Vec<(String, ViolationKind)> = Schema::core()
            .validate(&doc)
            .into_iter()
            .map(|v| (v.rule, v.kind))
            .collect();

        assert!(kinds.contains(&("non-empty".into(), ViolationKind::Empty)));
        assert!(kinds.contains(&("uniform-children".into(), ViolationKind::MixedChildren { index: 2 })));
        assert!(kinds.contains(&("merge-adjacent-text".into(), ViolationKind::MergeableText { index: 1 })));
        assert!(kinds.contains(&("inline-spacing".into(), ViolationKind::UnpaddedInline { index: 0 })));
        assert!(kinds.contains(&("merge-adjacent-text".into(), ViolationKind::EmptyText { index: 1 })));
    }

    #[test]
    fn test_user_rules_scope_by_type() {
        let doc = Document::new(vec![Node::element(
            "quote",
            vec![Node::Element(Element::new("link").inline().with_children(vec![Node::text("x")]))],
        )]);
        let violations = quote_schema().validate(&doc);
        assert_eq!(
            violations,
            vec![Violation::new(
                "quote-children",
                Path::from([0]),
                ViolationKind::DisallowedChild {
                    index: 0,
                    repair: ChildRepair::Remove
                }
            )]
        );
    }

    #[test]
    fn test_parent_scope() {
        let rule = Rule::new(
            "list-items-only",
            Matcher::Block,
            Constraint::Attributes {
                required: [("type".to_string(), json!("item"))].into_iter().collect(),
            },
        )
        .within(Matcher::kind("list"));

        let doc = Document::new(vec![
            Node::element("list", vec![Node::element("paragraph", vec![Node::text("x")])]),
            Node::element("paragraph", vec![Node::text("y")]),
        ]);
        let violations = Schema::new(vec![rule]).validate(&doc);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, Path::from([0, 0]));
        assert_eq!(
            violations[0].kind,
            ViolationKind::AttributeMismatch {
                key: "type".into(),
                expected: json!("item")
            }
        );
    }

    #[test]
    fn test_custom_rule_runs_validator() {
        let rule = Rule::custom(
            Matcher::Text,
            CustomRule::new(
                "no-shouting",
                |_, node, path| match node.as_text() {
                    Some(text) if text.text.chars().any(char::is_uppercase) => {
                        vec![Violation::custom("no-shouting", path.clone(), "uppercase text")]
                    }
                    _ => vec![],
                },
                |_, _| Ok(()),
            ),
        );
        let doc = Document::new(vec![Node::element("paragraph", vec![Node::text("HEY")])]);
        let violations = Schema::new(vec![rule]).validate(&doc);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].to_string(), "no-shouting at [0,0]: uppercase text");
    }

    #[test]
    fn test_schema_serialization() {
        let mut schema = quote_schema();
        schema.add_rule(Rule::custom(
            Matcher::Any,
            CustomRule::new("opaque", |_, _, _| vec![], |_, _| Ok(())),
        ));

        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["rules"][0]["constraint"]["kind"], "children");
        assert_eq!(value["rules"][1]["constraint"]["min"], 1);
        assert_eq!(value["rules"][2]["constraint"], json!({ "kind": "custom", "rule": "opaque" }));

        let builtin = serde_json::to_string(&quote_schema()).unwrap();
        let back: Schema = serde_json::from_str(&builtin).unwrap();
        assert_eq!(back.rules().len(), 2);
        assert_eq!(back.rules()[0].name, "quote-children");
    }

    #[test]
    fn test_stored_custom_rules_are_dropped_on_load() {
        let mut schema = quote_schema();
        schema.add_rule(Rule::custom(
            Matcher::Any,
            CustomRule::new("opaque", |_, _, _| vec![], |_, _| Ok(())),
        ));
        let stored = serde_json::to_string(&schema).unwrap();

        let back: Schema = serde_json::from_str(&stored).unwrap();
        let names: Vec<&str> = back.rules().iter().map(|rule| rule.name.as_str()).collect();
        assert_eq!(names, vec!["quote-children", "quote-min"]);
    }

    #[test]
    fn test_malformed_rule_still_fails_to_load() {
        let stored = r#"{ "rules": [{ "name": "x", "matches": "any", "constraint": { "kind": "bogus" } }] }"#;
        let err = serde_json::from_str::<Schema>(stored).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }
}
