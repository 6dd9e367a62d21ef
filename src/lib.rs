pub mod context;
pub mod data;
pub mod dict;
pub mod error;
pub mod parser;
pub mod printer;
pub mod schema;

mod resolver;
mod rewrite;

// Re-export main types for convenience
pub use context::{Context, ContextOptions, ModuleProvider, ModuleSource};
pub use data::{DataNode, DataTree, PrintFlags};
pub use dict::{Dict, Sym};
pub use error::{YangError, YangResult};
pub use parser::Format;
pub use schema::{Module, ModuleId, NodeId};
pub use schema::node::{NodeKind, SchemaNode};
