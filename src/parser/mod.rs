//! Statement parsing: two surface syntaxes, one statement tree.
//!
//! `yang` reads the compact RFC 6020 text form, `yin` reads the XML
//! mapping; both produce the [`Statement`] tree that `builder` turns
//! into a module under construction plus its unresolved references.

pub mod builder;
pub mod statement;
pub mod yang;
pub mod yin;

pub use statement::{Keyword, Statement};

use crate::error::YangResult;

/// Input format of a schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Yang,
    Yin,
}

/// Parse a schema document into its statement tree.
pub fn parse_statement_tree(text: &str, format: Format) -> YangResult<Statement> {
    match format {
        Format::Yang => yang::parse(text),
        Format::Yin => yin::parse(text),
    }
}
