//! Parser types and utilities.

use crate::yaml::Stream;
use rowan::GreenNode;

/// The result of a parse operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse<T> {
    green_node: GreenNode,
    errors: Vec<String>,
    positioned_errors: Vec<crate::PositionedParseError>,
    _ty: std::marker::PhantomData<fn() -> T>,
}

impl<T> Parse<T> {
    pub(crate) fn new_with_positioned_errors(
        green_node: GreenNode,
        errors: Vec<String>,
        positioned_errors: Vec<crate::PositionedParseError>,
    ) -> Self {
        Parse {
            green_node,
            errors,
            positioned_errors,
            _ty: std::marker::PhantomData,
        }
    }

    /// The parse tree. If there were no parse errors, this is a valid tree.
    /// Otherwise the tree ends in an error node holding the unparsed input.
    pub fn tree(&self) -> T
    where
        T: From<rowan::SyntaxNode<crate::Lang>>,
    {
        let syntax_node = rowan::SyntaxNode::new_root(self.green_node.clone());
        T::from(syntax_node)
    }

    /// Parse errors, if any.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Positioned parse errors with location information.
    pub fn positioned_errors(&self) -> &[crate::PositionedParseError] {
        &self.positioned_errors
    }

    /// Convert parse result to Result, failing if there are any errors.
    pub fn to_result(self) -> Result<T, crate::ParseError>
    where
        T: From<rowan::SyntaxNode<crate::Lang>>,
    {
        if !self.errors.is_empty() {
            Err(crate::ParseError(self.errors))
        } else {
            Ok(self.tree())
        }
    }

    /// Whether the parse had any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl Parse<Stream> {
    /// Parse a complete YAML stream.
    pub fn parse_stream(text: &str) -> Self {
        let parsed = crate::yaml::parse(text);
        Parse::new_with_positioned_errors(
            parsed.green_node,
            parsed.errors,
            parsed.positioned_errors,
        )
    }

    /// Parse one piece of a stream split by [`crate::DocumentReader`].
    pub(crate) fn parse_chunk(text: &str, implicit_start: bool) -> Self {
        let parsed = crate::yaml::parse_chunk(text, implicit_start);
        Parse::new_with_positioned_errors(
            parsed.green_node,
            parsed.errors,
            parsed.positioned_errors,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_result() {
        let parsed = Parse::parse_stream("kind: Pod\n");
        assert!(!parsed.has_errors());
        assert!(parsed.errors().is_empty());
        assert_eq!(parsed.tree().to_string(), "kind: Pod\n");
    }

    #[test]
    fn test_to_result_with_errors() {
        let parsed = Parse::parse_stream("a: b: c\n");
        assert!(parsed.has_errors());
        assert_eq!(parsed.positioned_errors().len(), 1);
        let err = parsed.to_result().unwrap_err();
        assert_eq!(
            err.0,
            vec!["mapping values are not allowed in this context".to_string()]
        );
    }
}
