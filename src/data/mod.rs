//! Instance data trees and their readers, printers and validation.

pub mod json;
pub mod validate;
pub mod xml;

use crate::schema::NodeId;

/// One data node: a schema link, an optional leaf value and children.
#[derive(Debug, Clone)]
pub struct DataNode {
    pub schema: NodeId,
    pub value: Option<String>,
    pub children: Vec<DataNode>,
    /// true when the value came from a schema default rather than the
    /// document
    pub dflt: bool,
}

impl DataNode {
    pub fn new(schema: NodeId) -> Self {
        DataNode {
            schema,
            value: None,
            children: Vec::new(),
            dflt: false,
        }
    }
}

/// A parsed data document: the top-level sibling chain.
#[derive(Debug, Clone, Default)]
pub struct DataTree {
    pub roots: Vec<DataNode>,
}

/// Output options of the data printers.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PrintFlags {
    /// Pretty-print with newlines and two-space indentation
    pub format: bool,
    /// Print the entire top-level chain instead of only the first root
    pub with_siblings: bool,
    /// Mark defaulted leaves, using the ietf-netconf-with-defaults
    /// module when it is loaded
    pub with_defaults: bool,
}
