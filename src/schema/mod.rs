//! In-memory schema model: modules, nodes and types.
//!
//! The whole graph lives in arenas owned by the repository
//! ([`crate::context::Context`]): modules are addressed by [`ModuleId`]
//! and schema nodes by [`NodeId`]. Links between nodes (parent, sibling,
//! leafref target, augment target) are ids, which keeps the cyclic parts
//! of the graph out of the ownership story.

pub mod module;
pub mod node;
pub mod typ;

pub use module::{
    Deviate, DeviateKind, Deviation, DeviationOrig, ExternalKind, Feature, FeatureRef, Identity,
    Import, Include, Module, ModuleKind, PropSnapshot, Revision, Typedef, YangVersion,
};
pub use node::{
    AnyXmlBody, AugmentBody, CaseBody, ChoiceBody, ContainerBody, GroupingBody, InOutBody,
    LeafBody, LeafListBody, ListBody, Must, NodeKind, NotifBody, Refine, RpcBody, SchemaNode,
    Status, UsesBody, When, NACM_DENY_ALL, NACM_DENY_WRITE,
};
pub use typ::{Bit, EnumValue, IdentRef, Pattern, Restr, TypeBase, TypeInfo, YangType};

/// Handle of a loaded module or submodule within a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) u32);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of a schema node within a repository's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
