//! Manifest identity and its extraction from a parsed document.
//!
//! The identity of a manifest is read with a find-key-then-check-value
//! query: [`Mapping::values_for`] yields the values of the entries whose key
//! and value both satisfy a predicate, and the predicates below combine to
//! express "the string under the top-level key `kind`" or "the mapping under
//! `metadata`".

use crate::scalar::NULL_TAG;
use crate::yaml::{Document, Mapping, Node, Scalar};
use std::fmt;

/// The identity of a resource manifest.
///
/// An empty namespace is an ordinary value (cluster scoped resources), so
/// a missing `namespace` key and `namespace: ""` give equal identities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Value of the top-level `apiVersion` key
    pub api_version: String,
    /// Value of the top-level `kind` key
    pub kind: String,
    /// Value of `metadata.name`
    pub name: String,
    /// Value of `metadata.namespace`
    pub namespace: String,
}

impl Identity {
    /// Create an identity from its four fields.
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Whether the identity names a resource: apiVersion, kind and name
    /// are all set. Only complete identities take part in deduplication.
    pub fn is_complete(&self) -> bool {
        !self.api_version.is_empty() && !self.kind.is_empty() && !self.name.is_empty()
    }

    /// Extract the identity of a document.
    ///
    /// Never fails: anything that is not where it is expected, or is not a
    /// string, leaves its field empty.
    pub fn from_document(document: &Document) -> Self {
        document
            .content()
            .map_or_else(Self::default, |root| Self::from_node(&root))
    }

    /// Extract the identity of a document's root node.
    pub fn from_node(root: &Node) -> Self {
        if root.tag() == NULL_TAG {
            return Self::default();
        }
        let Some(mapping) = root.as_mapping() else {
            return Self::default();
        };

        Self {
            api_version: first_string(
                mapping.values_for(with_string_value("apiVersion"), is_string),
            ),
            kind: first_string(mapping.values_for(with_string_value("kind"), is_string)),
            name: metadata_field(mapping, "name"),
            namespace: metadata_field(mapping, "namespace"),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ", self.api_version, self.kind)?;
        if !self.namespace.is_empty() {
            write!(f, "{}/", self.namespace)?;
        }
        write!(f, "{}", self.name)
    }
}

/// Whether the node is a scalar that resolves to `!!str`.
pub fn is_string(node: &Node) -> bool {
    node.as_scalar().map_or(false, Scalar::is_string)
}

/// Whether the node is a mapping.
pub fn is_mapping(node: &Node) -> bool {
    matches!(node, Node::Mapping(_))
}

/// A predicate matching string scalars whose decoded value is `value`.
pub fn with_string_value(value: &str) -> impl Fn(&Node) -> bool + '_ {
    move |node| {
        node.as_scalar()
            .map_or(false, |scalar| scalar.is_string() && scalar.value() == value)
    }
}

fn first_string(mut values: impl Iterator<Item = Node>) -> String {
    values
        .next()
        .and_then(|node| node.as_scalar().map(Scalar::value))
        .unwrap_or_default()
}

/// `metadata.<key>`, searched through every `metadata` mapping in order.
fn metadata_field(mapping: &Mapping, key: &str) -> String {
    first_string(
        mapping
            .values_for(with_string_value("metadata"), is_mapping)
            .filter_map(|node| match node {
                Node::Mapping(metadata) => Some(metadata),
                _ => None,
            })
            .flat_map(|metadata| metadata.values_for(with_string_value(key), is_string)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::Stream;

    fn identity(text: &str) -> Identity {
        let parsed = Stream::parse(text);
        assert!(!parsed.has_errors(), "{:?}", parsed.errors());
        parsed
            .tree()
            .documents()
            .next()
            .map(|document| Identity::from_document(&document))
            .unwrap_or_default()
    }

    #[test]
    fn test_full_identity() {
        let id = identity(
            "apiVersion: v1\nkind: Pod\nmetadata:\n  name: a\n  namespace: ns1\nspec: {}\n",
        );
        assert_eq!(id, Identity::new("v1", "Pod", "a", "ns1"));
        assert!(id.is_complete());
        assert_eq!(id.to_string(), "v1/Pod ns1/a");
    }

    #[test]
    fn test_cluster_scoped() {
        let missing = identity("apiVersion: v1\nkind: Namespace\nmetadata:\n  name: prod\n");
        let empty = identity(
            "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: prod\n  namespace: \"\"\n",
        );
        assert_eq!(missing, empty);
        assert!(missing.is_complete());
        assert_eq!(missing.to_string(), "v1/Namespace prod");
    }

    #[test]
    fn test_quoted_and_flow_values() {
        let id = identity("{apiVersion: 'v1', \"kind\": Pod, metadata: {name: \"a\"}}");
        assert_eq!(id, Identity::new("v1", "Pod", "a", ""));
    }

    #[test]
    fn test_non_string_values_are_ignored() {
        let id = identity("apiVersion: v1\nkind: Pod\nmetadata:\n  name: 123\n");
        assert_eq!(id.name, "");
        assert!(!id.is_complete());

        let id = identity("apiVersion: 1.0\nkind: true\nmetadata:\n  name: \"123\"\n");
        assert_eq!(id, Identity::new("", "", "123", ""));
    }

    #[test]
    fn test_block_scalar_value_is_a_string() {
        let id = identity("apiVersion: v1\nkind: |-\n  Pod\nmetadata:\n  name: >\n    web\n");
        assert_eq!(id, Identity::new("v1", "Pod", "web\n", ""));
    }

    #[test]
    fn test_explicit_tags() {
        let id = identity("apiVersion: !!str 1.0\nkind: !!int Pod\n!!int name: x\n");
        assert_eq!(id.api_version, "1.0");
        assert_eq!(id.kind, "");
    }

    #[test]
    fn test_non_string_key_never_matches() {
        let id = identity("!!int kind: Pod\napiVersion: v1\n");
        assert_eq!(id, Identity::new("v1", "", "", ""));
    }

    #[test]
    fn test_first_matching_entry_wins() {
        let id = identity("kind: 1\nkind: Pod\nkind: Service\napiVersion: v1\n");
        assert_eq!(id.kind, "Pod");
    }

    #[test]
    fn test_metadata_must_be_a_mapping() {
        let id = identity("apiVersion: v1\nkind: Pod\nmetadata: web\n");
        assert_eq!((id.name.as_str(), id.namespace.as_str()), ("", ""));

        let id = identity("apiVersion: v1\nkind: Pod\nmetadata:\n- name: web\n");
        assert_eq!(id.name, "");

        let id = identity("apiVersion: v1\nkind: Pod\nmetadata: x\nmetadata:\n  name: web\n");
        assert_eq!(id.name, "web");
    }

    #[test]
    fn test_name_searched_across_metadata_mappings() {
        let id = identity("metadata:\n  namespace: ns\nmetadata:\n  name: web\n");
        assert_eq!(id, Identity::new("", "", "web", "ns"));
    }

    #[test]
    fn test_alias_value_is_not_a_string() {
        let id = identity("apiVersion: &v v1\nkind: *v\n");
        assert_eq!(id.api_version, "v1");
        assert_eq!(id.kind, "");
    }

    #[test]
    fn test_non_mapping_roots() {
        assert_eq!(identity("null\n"), Identity::default());
        assert_eq!(identity("~\n"), Identity::default());
        assert_eq!(identity("--- !!null\n"), Identity::default());
        assert_eq!(
            identity("!!null {apiVersion: v1, kind: Pod, metadata: {name: a}}\n"),
            Identity::default()
        );
        assert_eq!(identity("- apiVersion: v1\n"), Identity::default());
        assert_eq!(identity("\"hello\"\n"), Identity::default());
        assert_eq!(identity("---\n"), Identity::default());
        assert_eq!(identity(""), Identity::default());
    }

    #[test]
    fn test_incomplete_identities() {
        assert!(!Identity::new("v1", "Pod", "", "ns").is_complete());
        assert!(!Identity::new("", "Pod", "a", "").is_complete());
        assert!(!Identity::new("v1", "", "a", "").is_complete());
        assert!(Identity::new("v1", "Pod", "a", "").is_complete());
    }
}
