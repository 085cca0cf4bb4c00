//! Expression tree.

/// One node of a parsed expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A literal run. Adjacent runs are merged while parsing.
    Text(String),
    /// A `$<identifier:param,...>` call.
    Call(Call),
}

/// A generator-expression call.
///
/// The identifier and every parameter are sequences of nodes so calls may
/// nest anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Nodes that evaluate to the built-in name.
    pub identifier: Vec<Node>,
    /// One node sequence per comma-separated parameter.
    pub parameters: Vec<Vec<Node>>,
    /// Source text of the call, used in diagnostics.
    pub source: String,
}

impl Node {
    /// Whether the node is plain text.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

/// Append literal text, extending the previous node when it is text too.
pub(crate) fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(existing)) = nodes.last_mut() {
        existing.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_owned()));
    }
}

/// Whether a node sequence contains any call at any depth.
pub(crate) fn contains_call(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| !node.is_text())
}
