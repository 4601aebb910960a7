use folio_model::NodeRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Predicate over a single node, used to scope rules and describe allowed
/// children or parents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    Any,
    Root,
    Element,
    Text,
    /// Non-inline element
    Block,
    /// Text leaf or inline element
    Inline,
    Void,
    /// Element whose `type` attribute equals the value
    Type(String),
    Attribute { key: String, value: Value },
    AnyOf(Vec<Matcher>),
    AllOf(Vec<Matcher>),
    Not(Box<Matcher>),
}

impl Matcher {
    pub fn kind(kind: impl Into<String>) -> Self {
        Matcher::Type(kind.into())
    }

    pub fn not(matcher: Matcher) -> Self {
        Matcher::Not(Box::new(matcher))
    }

    pub fn matches(&self, node: NodeRef<'_>) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::Root => node.is_root(),
            Matcher::Element => node.is_element(),
            Matcher::Text => node.is_text(),
            Matcher::Block => node.is_element() && !node.is_inline(),
            Matcher::Inline => node.is_inline(),
            Matcher::Void => node.is_void(),
            Matcher::Type(kind) => node.kind() == Some(kind.as_str()),
            Matcher::Attribute { key, value } => {
                node.attributes().and_then(|attributes| attributes.get(key)) == Some(value)
            }
            Matcher::AnyOf(matchers) => matchers.iter().any(|m| m.matches(node)),
            Matcher::AllOf(matchers) => matchers.iter().all(|m| m.matches(node)),
            Matcher::Not(matcher) => !matcher.matches(node),
        }
    }
}
