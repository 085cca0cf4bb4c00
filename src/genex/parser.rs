//! Hand-rolled parser for the `$<...>` grammar.
//!
//! `$<` opens a call and `>` closes it. Inside a call the first `:` ends the
//! identifier and `,` separates parameters; elsewhere all three characters
//! are literal. Nested calls are parsed as single units, so their commas
//! never split the enclosing parameter list.

use super::error::GenexError;
use super::node::{Call, Node, push_text};

/// Result of parsing one input string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedExpression {
    /// Top-level nodes. Malformed calls are omitted.
    pub nodes: Vec<Node>,
    /// Non-fatal syntax errors.
    pub errors: Vec<GenexError>,
}

/// Parse `input` into an expression tree.
///
/// ```
/// use tsunagi::genex::{Node, parse};
///
/// let parsed = parse("lib$<1:a,b>.so");
/// assert!(parsed.errors.is_empty());
/// assert_eq!(parsed.nodes.len(), 3);
/// assert_eq!(parsed.nodes[0], Node::Text("lib".into()));
/// ```
#[must_use]
pub fn parse(input: &str) -> ParsedExpression {
    let mut parser = Parser {
        input,
        pos: 0,
        errors: Vec::new(),
        reported_unterminated: false,
    };
    let (nodes, _) = parser.sequence(Scope::TopLevel);
    ParsedExpression {
        nodes,
        errors: parser.errors,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    TopLevel,
    Identifier,
    Parameter,
}

impl Scope {
    const fn stops_at(self, c: char) -> bool {
        match self {
            Self::TopLevel => false,
            Self::Identifier => matches!(c, ':' | '>'),
            Self::Parameter => matches!(c, ',' | '>'),
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    errors: Vec<GenexError>,
    reported_unterminated: bool,
}

impl Parser<'_> {
    fn rest(&self) -> &str {
        self.input.get(self.pos..).unwrap_or_default()
    }

    fn flush(&self, nodes: &mut Vec<Node>, start: usize) {
        if let Some(text) = self.input.get(start..self.pos) {
            push_text(nodes, text);
        }
    }

    /// Parse nodes until a character that ends `scope`, consuming it.
    /// Returns `None` as the terminator when input ran out first.
    fn sequence(&mut self, scope: Scope) -> (Vec<Node>, Option<char>) {
        let mut nodes = Vec::new();
        let mut text_start = self.pos;
        loop {
            if self.rest().starts_with("$<") {
                self.flush(&mut nodes, text_start);
                if let Some(call) = self.call() {
                    nodes.push(Node::Call(call));
                }
                text_start = self.pos;
                continue;
            }
            let Some(c) = self.rest().chars().next() else {
                self.flush(&mut nodes, text_start);
                return (nodes, None);
            };
            if scope.stops_at(c) {
                self.flush(&mut nodes, text_start);
                self.pos += c.len_utf8();
                return (nodes, Some(c));
            }
            self.pos += c.len_utf8();
        }
    }

    fn call(&mut self) -> Option<Call> {
        let start = self.pos;
        self.pos += 2;
        let (identifier, mut terminator) = self.sequence(Scope::Identifier);
        let mut parameters = Vec::new();
        if terminator == Some(':') {
            loop {
                let (parameter, end) = self.sequence(Scope::Parameter);
                parameters.push(parameter);
                terminator = end;
                if end != Some(',') {
                    break;
                }
            }
        }
        if terminator.is_none() {
            // Nested calls all hit the end of input together; report once.
            if !self.reported_unterminated {
                self.reported_unterminated = true;
                self.errors.push(GenexError::UnterminatedCall {
                    expression: self.input.to_owned(),
                });
            }
            return None;
        }
        let source = self
            .input
            .get(start..self.pos)
            .unwrap_or_default()
            .to_owned();
        if identifier.is_empty() {
            self.errors
                .push(GenexError::EmptyIdentifier { expression: source });
            return None;
        }
        Some(Call {
            identifier,
            parameters,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn text(value: &str) -> Node {
        Node::Text(value.to_owned())
    }

    #[rstest]
    #[case("plain")]
    #[case("a>b,c:d")]
    #[case("cost $5 < $<")]
    fn literal_delimiters_coalesce_into_one_text_node(#[case] input: &str) {
        let parsed = parse(input);
        if input.ends_with("$<") {
            assert_eq!(parsed.nodes, vec![text("cost $5 < ")]);
            assert_eq!(parsed.errors.len(), 1);
        } else {
            assert_eq!(parsed.nodes, vec![text(input)]);
            assert!(parsed.errors.is_empty());
        }
    }

    #[test]
    fn nested_call_is_one_parameter() {
        let parsed = parse("$<JOIN:$<LIST:SORT,b;a>,->");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let [Node::Call(join)] = parsed.nodes.as_slice() else {
            panic!("expected a single call, got {:?}", parsed.nodes);
        };
        assert_eq!(join.identifier, vec![text("JOIN")]);
        assert_eq!(join.parameters.len(), 2);
        assert_eq!(join.parameters[1], vec![text("-")]);
        let [Node::Call(list)] = join.parameters[0].as_slice() else {
            panic!("expected nested call");
        };
        assert_eq!(list.parameters, vec![vec![text("SORT")], vec![text("b;a")]]);
    }

    #[test]
    fn colon_inside_parameters_is_literal() {
        let parsed = parse("$<1:C:/include>");
        let [Node::Call(call)] = parsed.nodes.as_slice() else {
            panic!("expected call");
        };
        assert_eq!(call.parameters, vec![vec![text("C:/include")]]);
        assert_eq!(call.source, "$<1:C:/include>");
    }

    #[test]
    fn unterminated_call_keeps_earlier_siblings() {
        let parsed = parse("pre$<1:a>$<BOOL:$<0:x");
        assert_eq!(parsed.nodes.len(), 2);
        assert_eq!(parsed.nodes[0], text("pre"));
        assert_eq!(
            parsed.errors,
            vec![GenexError::UnterminatedCall {
                expression: "pre$<1:a>$<BOOL:$<0:x".to_owned(),
            }]
        );
    }

    #[rstest]
    #[case("$<>")]
    #[case("$<:x>")]
    fn empty_identifier_is_reported(#[case] input: &str) {
        let parsed = parse(input);
        assert!(parsed.nodes.is_empty());
        assert!(matches!(
            parsed.errors.as_slice(),
            [GenexError::EmptyIdentifier { .. }]
        ));
    }
}
