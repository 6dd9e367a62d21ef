//! Module and submodule representation.

use crate::dict::Sym;
use crate::schema::node::{Must, Status};
use crate::schema::typ::{IdentRef, YangType};
use crate::schema::{ModuleId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YangVersion {
    #[default]
    V1,
    V1_1,
}

impl YangVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            YangVersion::V1 => "1",
            YangVersion::V1_1 => "1.1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Module,
    Submodule { belongs_to: ModuleId },
}

/// Why an import entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    /// Written in the module text
    Local,
    /// Added because a foreign module augments this one
    ViaAugment,
    /// Added because a foreign module deviates this one
    ViaDeviation,
}

#[derive(Debug, Clone)]
pub struct Import {
    pub name: Sym,
    pub prefix: Sym,
    pub revision: Option<Sym>,
    pub module: Option<ModuleId>,
    pub external: ExternalKind,
}

#[derive(Debug, Clone)]
pub struct Include {
    pub name: Sym,
    pub revision: Option<Sym>,
    pub submodule: Option<ModuleId>,
}

#[derive(Debug, Clone)]
pub struct Revision {
    pub date: Sym,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
}

/// Reference to a feature within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureRef {
    pub module: ModuleId,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct Feature {
    pub name: Sym,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
    pub status: Status,
    pub iffeatures: Vec<FeatureRef>,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct Identity {
    pub name: Sym,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
    pub status: Status,
    /// `prefix:name` of the base identity as written
    pub base_name: Option<Sym>,
    pub base: Option<IdentRef>,
}

#[derive(Debug, Clone)]
pub struct Typedef {
    pub name: Sym,
    pub typ: YangType,
    pub units: Option<Sym>,
    pub default: Option<Sym>,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
    pub status: Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviateKind {
    NotSupported,
    Add,
    Replace,
    Delete,
}

impl DeviateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviateKind::NotSupported => "not-supported",
            DeviateKind::Add => "add",
            DeviateKind::Replace => "replace",
            DeviateKind::Delete => "delete",
        }
    }
}

/// One `deviate` step with its parsed properties.
#[derive(Debug)]
pub struct Deviate {
    pub kind: DeviateKind,
    pub units: Option<Sym>,
    pub musts: Vec<Must>,
    pub uniques: Vec<Sym>,
    pub default: Option<Sym>,
    pub config: Option<bool>,
    pub mandatory: Option<bool>,
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub typ: Option<YangType>,
}

/// Snapshot of a target's deviatable properties, taken on first apply.
/// Switching a deviation swaps the snapshot with the live values, so
/// the operation is its own inverse.
#[derive(Debug)]
pub enum DeviationOrig {
    /// `deviate not-supported`: the unlinked node and where it was
    NotSupported { parent: Option<NodeId> },
    Properties(Box<PropSnapshot>),
}

#[derive(Debug, Default)]
pub struct PropSnapshot {
    pub units: Option<Sym>,
    pub musts: Vec<Must>,
    pub uniques: Vec<Vec<NodeId>>,
    pub uniques_raw: Vec<Sym>,
    pub default: Option<Sym>,
    pub choice_default: Option<NodeId>,
    pub config: bool,
    pub config_set: bool,
    pub mandatory: bool,
    pub mandatory_set: bool,
    pub min: u32,
    pub max: u32,
    pub min_set: bool,
    pub max_set: bool,
    pub typ: Option<YangType>,
}

#[derive(Debug)]
pub struct Deviation {
    pub target_path: Sym,
    pub target: Option<NodeId>,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
    pub deviates: Vec<Deviate>,
    pub orig: Option<DeviationOrig>,
    /// true while the deviation is applied to the target
    pub applied: bool,
}

/// A loaded module or submodule.
pub struct Module {
    pub name: Sym,
    /// Submodules carry the prefix of their `belongs-to` statement
    pub prefix: Sym,
    /// `None` for submodules, which live in the owner's namespace
    pub ns: Option<Sym>,
    pub org: Option<Sym>,
    pub contact: Option<Sym>,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
    pub version: YangVersion,
    /// Index 0 is the most recent revision
    pub revisions: Vec<Revision>,
    pub imports: Vec<Import>,
    pub includes: Vec<Include>,
    pub typedefs: Vec<Typedef>,
    pub features: Vec<Feature>,
    pub identities: Vec<Identity>,
    /// Module-level augment nodes (not part of the data chain)
    pub augments: Vec<NodeId>,
    pub deviations: Vec<Deviation>,
    /// First node of the top-level sibling chain. Submodule nodes are
    /// linked into the owning module's chain; this stays `None` for
    /// submodules.
    pub data: Option<NodeId>,
    pub implemented: bool,
    pub deviated: bool,
    pub kind: ModuleKind,
}

impl Module {
    pub fn new(name: Sym, prefix: Sym, kind: ModuleKind) -> Self {
        Module {
            name,
            prefix,
            ns: None,
            org: None,
            contact: None,
            dsc: None,
            reference: None,
            version: YangVersion::default(),
            revisions: Vec::new(),
            imports: Vec::new(),
            includes: Vec::new(),
            typedefs: Vec::new(),
            features: Vec::new(),
            identities: Vec::new(),
            augments: Vec::new(),
            deviations: Vec::new(),
            data: None,
            implemented: false,
            deviated: false,
            kind,
        }
    }

    /// Most recent revision date, if any.
    pub fn revision(&self) -> Option<&Sym> {
        self.revisions.first().map(|r| &r.date)
    }

    pub fn is_submodule(&self) -> bool {
        matches!(self.kind, ModuleKind::Submodule { .. })
    }

    pub fn find_feature(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }

    pub fn find_identity(&self, name: &str) -> Option<usize> {
        self.identities.iter().position(|i| i.name == name)
    }

    pub fn find_typedef(&self, name: &str) -> Option<&Typedef> {
        self.typedefs.iter().find(|t| t.name == name)
    }

    /// Import entry whose prefix matches, ignoring bookkeeping entries
    /// added for augments and deviations.
    pub fn find_import(&self, prefix: &str) -> Option<&Import> {
        self.imports
            .iter()
            .find(|i| i.external == ExternalKind::Local && i.prefix == prefix)
    }
}
