//! The schema repository.
//!
//! A [`Context`] owns the string pool, the node arena and the list of
//! loaded modules, and drives the load pipeline: parse, build, resolve,
//! rewrite, seal. A load either completes and registers the module or
//! fails and leaves the repository exactly as it was.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::dict::{Dict, Sym};
use crate::error::{YangError, YangResult};
use crate::parser::{self, builder, Format, Keyword};
use crate::resolver::{self, Unres};
use crate::rewrite;
use crate::schema::node::{self, NodeArena, SchemaNode};
use crate::schema::{ExternalKind, FeatureRef, Module, ModuleId, ModuleKind, NodeId};

/// Loader policy knobs.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    /// Check leafref paths inside groupings that are never used. The
    /// default mirrors the reference behaviour: an unused grouping's
    /// paths are never looked at.
    pub validate_unused_groupings: bool,
    /// Skip unknown vendor-extension statements with a warning instead
    /// of failing the load.
    pub ignore_unknown_extensions: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        ContextOptions {
            validate_unused_groupings: false,
            ignore_unknown_extensions: true,
        }
    }
}

/// Source text of a module, as handed back by a [`ModuleProvider`].
pub struct ModuleSource {
    pub text: String,
    pub format: Format,
}

/// Caller-supplied lookup for import and include dependencies. The
/// repository itself never touches the filesystem.
pub trait ModuleProvider {
    fn retrieve(&self, name: &str, revision: Option<&str>) -> Option<ModuleSource>;
}

enum LoadOutcome {
    Loaded,
    /// The same name and revision is already registered
    Duplicate(ModuleId),
}

/// The repository of loaded modules.
#[derive(Default)]
pub struct Context {
    pub(crate) dict: Dict,
    pub(crate) nodes: NodeArena,
    modules: Vec<Option<Module>>,
    options: ContextOptions,
    provider: Option<Box<dyn ModuleProvider>>,
}

impl Context {
    pub fn new(options: ContextOptions) -> Self {
        Context {
            options,
            ..Context::default()
        }
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    pub fn set_provider(&mut self, provider: Box<dyn ModuleProvider>) {
        self.provider = Some(provider);
    }

    pub(crate) fn intern(&mut self, s: &str) -> Sym {
        self.dict.insert_copy(s)
    }

    /// The string pool, for accounting and tests.
    pub fn dict(&self) -> &Dict {
        &self.dict
    }

    // ---- registry access ---------------------------------------------------

    pub fn module(&self, mid: ModuleId) -> &Module {
        match self.modules.get(mid.index()).and_then(|m| m.as_ref()) {
            Some(m) => m,
            None => panic!("stale module id {mid:?}"),
        }
    }

    pub(crate) fn module_mut(&mut self, mid: ModuleId) -> &mut Module {
        match self.modules.get_mut(mid.index()).and_then(|m| m.as_mut()) {
            Some(m) => m,
            None => panic!("stale module id {mid:?}"),
        }
    }

    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id]
    }

    /// Swap the opaque application slot of a node; the one node field
    /// that stays writable after sealing.
    pub fn set_private(
        &mut self,
        id: NodeId,
        value: Option<Box<dyn std::any::Any>>,
    ) -> Option<Box<dyn std::any::Any>> {
        std::mem::replace(&mut self.nodes[id].private, value)
    }

    /// Live module and submodule ids.
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.modules
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_some())
            .map(|(i, _)| ModuleId(i as u32))
            .collect()
    }

    /// A main module followed by its submodules.
    pub fn module_and_submodules(&self, main: ModuleId) -> Vec<ModuleId> {
        let mut out = vec![main];
        for mid in self.module_ids() {
            if let ModuleKind::Submodule { belongs_to } = self.module(mid).kind {
                if belongs_to == main {
                    out.push(mid);
                }
            }
        }
        out
    }

    /// Look up a module by name. Without a revision, the implemented
    /// revision wins, then the lexicographically largest.
    pub fn get_module(&self, name: &str, revision: Option<&str>) -> Option<ModuleId> {
        let mut best: Option<ModuleId> = None;
        for mid in self.module_ids() {
            let module = self.module(mid);
            if module.is_submodule() || module.name != name {
                continue;
            }
            match revision {
                Some(rev) => {
                    if module.revision().map(|r| r.as_str()) == Some(rev) {
                        return Some(mid);
                    }
                }
                None => {
                    if module.implemented {
                        return Some(mid);
                    }
                    let better = match best {
                        None => true,
                        Some(b) => {
                            let cur = module.revision().map(|r| r.as_str()).unwrap_or("");
                            let old = self
                                .module(b)
                                .revision()
                                .map(|r| r.as_str())
                                .unwrap_or("");
                            cur > old
                        }
                    };
                    if better {
                        best = Some(mid);
                    }
                }
            }
        }
        best
    }

    /// Look up a module by namespace; used by the XML data reader.
    pub fn get_module_by_ns(&self, ns: &str) -> Option<ModuleId> {
        self.module_ids().into_iter().find(|&mid| {
            let module = self.module(mid);
            !module.is_submodule() && module.ns.as_deref() == Some(ns)
        })
    }

    pub(crate) fn get_submodule(&self, owner: ModuleId, name: &str) -> Option<ModuleId> {
        self.module_ids().into_iter().find(|&mid| {
            let module = self.module(mid);
            matches!(module.kind, ModuleKind::Submodule { belongs_to } if belongs_to == owner)
                && module.name == name
        })
    }

    /// Resolve a `/prefix:name/...` schema path against a module's
    /// import table; bare names resolve to the module itself.
    pub fn find_node(&self, mid: ModuleId, path: &str) -> Option<NodeId> {
        resolver::resolve_schema_nodeid(self, mid, path).ok().flatten()
    }

    /// Post-hoc identifier check: the node's name is unique at its
    /// instantiated level. Sealed modules satisfy this for every node.
    pub fn check_id(&self, id: NodeId) -> YangResult<()> {
        let n = &self.nodes[id];
        if matches!(
            n.kind,
            crate::schema::node::NodeKind::Grouping(_)
                | crate::schema::node::NodeKind::Augment(_)
                | crate::schema::node::NodeKind::Uses(_)
                | crate::schema::node::NodeKind::Input(_)
                | crate::schema::node::NodeKind::Output(_)
        ) {
            return Ok(());
        }
        let first = node::level_chain(self, n.parent, n.module);
        let name = n.name.clone();
        node::check_name_free(self, first, n.module, &name, Some(id))
    }

    /// Upward grouping search from a node, nearest scope first.
    pub fn find_grouping(&self, mid: ModuleId, start: Option<NodeId>, name: &str) -> Option<NodeId> {
        resolver::find_grouping(self, mid, start, name).ok().flatten()
    }

    /// Instance-visible children of a node (or a module's top level).
    pub fn data_children(&self, mid: ModuleId, parent: Option<NodeId>) -> Vec<NodeId> {
        let first = match parent {
            Some(p) => self.nodes[p].child,
            None => self.module(node::main_module(self, mid)).data,
        };
        let mut out = Vec::new();
        node::data_children(self, first, &mut out);
        out
    }

    // ---- load pipeline -----------------------------------------------------

    /// Parse, link and register one module. On any failure the
    /// repository is left unchanged.
    pub fn parse_module(&mut self, text: &str, format: Format) -> YangResult<ModuleId> {
        let stmt = parser::parse_statement_tree(text, format)?;
        if stmt.keyword != Keyword::Module {
            return Err(YangError::UnexpectedStatementInContext(
                "a submodule can only be loaded through the module that includes it".to_string(),
            ));
        }
        let mid = self.alloc_module_slot(ModuleKind::Module);
        let mut unres = Unres::default();
        let result = self.try_load(mid, &stmt, &mut unres);
        // the queue holds interned strings; it must be gone before gc
        drop(unres);
        match result {
            Ok(LoadOutcome::Loaded) => {
                info!(
                    "loaded module {} ({})",
                    self.module(mid).name,
                    self.module(mid)
                        .revision()
                        .map(|r| r.as_str())
                        .unwrap_or("no revision")
                );
                Ok(mid)
            }
            Ok(LoadOutcome::Duplicate(existing)) => {
                debug!(
                    "module {} already registered with the same revision",
                    self.module(existing).name
                );
                self.teardown(mid);
                self.dict.gc();
                Ok(existing)
            }
            Err(e) => {
                self.teardown(mid);
                self.dict.gc();
                Err(e)
            }
        }
    }

    fn try_load(
        &mut self,
        mid: ModuleId,
        stmt: &parser::Statement,
        unres: &mut Unres,
    ) -> YangResult<LoadOutcome> {
        builder::build_module(self, mid, stmt, unres)?;
        if let Some(existing) = self.find_duplicate(mid) {
            return Ok(LoadOutcome::Duplicate(existing));
        }
        resolver::resolve_all(self, unres)?;
        rewrite::inherit_nacm(self, mid);
        Ok(LoadOutcome::Loaded)
    }

    /// Parse a submodule on behalf of `owner` while resolving its
    /// include; deferred references land in the caller's queue, so the
    /// includer finishes resolution only after every submodule is in.
    pub(crate) fn parse_submodule(
        &mut self,
        owner: ModuleId,
        text: &str,
        format: Format,
        unres: &mut Unres,
    ) -> YangResult<ModuleId> {
        let stmt = parser::parse_statement_tree(text, format)?;
        if stmt.keyword != Keyword::Submodule {
            return Err(YangError::UnexpectedStatementInContext(format!(
                "include of {} found a {} document",
                self.module(owner).name,
                stmt.keyword
            )));
        }
        let sub = self.alloc_module_slot(ModuleKind::Submodule { belongs_to: owner });
        builder::build_module(self, sub, &stmt, unres)?;
        debug!(
            "parsed submodule {} of {}",
            self.module(sub).name,
            self.module(owner).name
        );
        Ok(sub)
    }

    /// Resolve an import through the provider, if one is installed.
    pub(crate) fn load_dependency(
        &mut self,
        name: &str,
        revision: Option<&str>,
    ) -> YangResult<Option<ModuleId>> {
        let source = match &self.provider {
            Some(p) => p.retrieve(name, revision),
            None => None,
        };
        let source = match source {
            Some(s) => s,
            None => return Ok(None),
        };
        let mid = self.parse_module(&source.text, source.format)?;
        if self.module(mid).name != name {
            return Err(YangError::InvalidValue(format!(
                "provider returned module {} for requested {name}",
                self.module(mid).name
            )));
        }
        Ok(Some(mid))
    }

    pub(crate) fn load_submodule_dependency(
        &mut self,
        owner: ModuleId,
        name: &str,
        revision: Option<&str>,
        unres: &mut Unres,
    ) -> YangResult<Option<ModuleId>> {
        let source = match &self.provider {
            Some(p) => p.retrieve(name, revision),
            None => None,
        };
        let source = match source {
            Some(s) => s,
            None => return Ok(None),
        };
        let sub = self.parse_submodule(owner, &source.text, source.format, unres)?;
        if self.module(sub).name != name {
            return Err(YangError::InvalidValue(format!(
                "provider returned submodule {} for requested {name}",
                self.module(sub).name
            )));
        }
        Ok(Some(sub))
    }

    fn alloc_module_slot(&mut self, kind: ModuleKind) -> ModuleId {
        let placeholder = Module::new(Sym::detached(""), Sym::detached(""), kind);
        for (i, slot) in self.modules.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(placeholder);
                return ModuleId(i as u32);
            }
        }
        self.modules.push(Some(placeholder));
        ModuleId((self.modules.len() - 1) as u32)
    }

    fn find_duplicate(&self, mid: ModuleId) -> Option<ModuleId> {
        let module = self.module(mid);
        let rev = module.revision().map(|r| r.as_str());
        self.module_ids().into_iter().find(|&other| {
            if other == mid {
                return false;
            }
            let o = self.module(other);
            !o.is_submodule()
                && o.name == module.name
                && o.revision().map(|r| r.as_str()) == rev
        })
    }

    // ---- implemented flag --------------------------------------------------

    /// Mark a module implemented. At most one revision of a name can be
    /// implemented at a time.
    pub fn set_implemented(&mut self, mid: ModuleId) -> YangResult<()> {
        let name = self.module(mid).name.clone();
        for other in self.module_ids() {
            if other == mid {
                continue;
            }
            let o = self.module(other);
            if !o.is_submodule() && o.name == name && o.implemented {
                return Err(YangError::ConflictingImplementedRevision(format!(
                    "module {name} revision {} is already implemented",
                    o.revision().map(|r| r.as_str()).unwrap_or("none")
                )));
            }
        }
        self.module_mut(mid).implemented = true;
        Ok(())
    }

    /// Deviating modules are implemented by definition.
    pub(crate) fn force_implemented(&mut self, mid: ModuleId) -> YangResult<()> {
        if self.module(mid).implemented {
            return Ok(());
        }
        self.set_implemented(mid)
    }

    // ---- features ----------------------------------------------------------

    /// Enable a feature (or all with `"*"`); enabling recursively
    /// enables the features it depends on.
    pub fn features_enable(&mut self, mid: ModuleId, name: &str) -> YangResult<()> {
        self.features_change(mid, name, true)
    }

    pub fn features_disable(&mut self, mid: ModuleId, name: &str) -> YangResult<()> {
        self.features_change(mid, name, false)
    }

    fn features_change(&mut self, mid: ModuleId, name: &str, enable: bool) -> YangResult<()> {
        let main = node::main_module(self, mid);
        let mut matched = false;
        let mut visited = HashSet::new();
        for m in self.module_and_submodules(main) {
            let count = self.module(m).features.len();
            for idx in 0..count {
                if name == "*" || self.module(m).features[idx].name == name {
                    matched = true;
                    self.set_feature(m, idx, enable, &mut visited);
                }
            }
        }
        if !matched && name != "*" {
            return Err(YangError::InvalidValue(format!(
                "feature {name:?} not defined by module {}",
                self.module(main).name
            )));
        }
        info!(
            "{} feature {name} in module {}",
            if enable { "enabled" } else { "disabled" },
            self.module(main).name
        );
        Ok(())
    }

    fn set_feature(
        &mut self,
        mid: ModuleId,
        idx: usize,
        enable: bool,
        visited: &mut HashSet<(ModuleId, usize)>,
    ) {
        if !visited.insert((mid, idx)) {
            return;
        }
        self.module_mut(mid).features[idx].enabled = enable;
        if enable {
            let deps = self.module(mid).features[idx].iffeatures.clone();
            for dep in deps {
                self.set_feature(dep.module, dep.index, true, visited);
            }
        }
    }

    /// Enabled state of a feature, or `None` if the module does not
    /// define it.
    pub fn features_state(&self, mid: ModuleId, name: &str) -> Option<bool> {
        let main = node::main_module(self, mid);
        for m in self.module_and_submodules(main) {
            if let Some(idx) = self.module(m).find_feature(name) {
                return Some(self.module(m).features[idx].enabled);
            }
        }
        None
    }

    /// All features of a module (and its submodules) with their state.
    pub fn features_list(&self, mid: ModuleId) -> Vec<(Sym, bool)> {
        let main = node::main_module(self, mid);
        let mut out = Vec::new();
        for m in self.module_and_submodules(main) {
            for f in &self.module(m).features {
                out.push((f.name.clone(), f.enabled));
            }
        }
        out
    }

    pub(crate) fn feature_enabled(&self, fref: FeatureRef) -> bool {
        self.module(fref.module).features[fref.index].enabled
    }

    /// Whether a schema node is disabled by `if-feature` state.
    pub fn is_disabled(&self, id: NodeId) -> bool {
        node::is_disabled(self, id)
    }

    // ---- deviations --------------------------------------------------------

    /// Toggle every deviation the module defines; calling twice is a
    /// no-op.
    pub fn switch_deviations(&mut self, mid: ModuleId) -> YangResult<()> {
        rewrite::deviation::switch_module_deviations(self, mid)?;
        info!("switched deviations of module {}", self.module(mid).name);
        Ok(())
    }

    // ---- teardown ----------------------------------------------------------

    /// Remove a module (and its submodules) from the repository,
    /// reversing its augments and deviations.
    pub fn destroy_module(&mut self, mid: ModuleId) -> YangResult<()> {
        if self.module(mid).is_submodule() {
            return Err(YangError::InvalidValue(
                "submodules are destroyed with their owning module".to_string(),
            ));
        }
        let name = self.module(mid).name.clone();
        self.teardown(mid);
        self.dict.gc();
        info!("destroyed module {name}");
        Ok(())
    }

    /// Shared by rollback and destroy: detach the module group from the
    /// rest of the repository and free it. Callers run `dict.gc()`.
    fn teardown(&mut self, mid: ModuleId) {
        let group: HashSet<ModuleId> = self.module_and_submodules(mid).into_iter().collect();

        // applied deviations defined by the group are reversed first,
        // so their targets return to their written shape
        for &m in &group {
            if let Err(e) = rewrite::deviation::revert_applied(self, m) {
                warn!("reverting deviations of a dying module: {e}");
            }
        }

        // unsplice augment children from their (possibly foreign) targets
        for &m in &group {
            let augments = self.module(m).augments.clone();
            for aug in augments {
                rewrite::augment::remove_augment(self, aug);
            }
        }

        // collect the group's nodes and fix leafref edges
        let owned: Vec<NodeId> = self
            .nodes
            .ids()
            .filter(|&id| group.contains(&self.nodes[id].module))
            .collect();
        let owned_set: HashSet<NodeId> = owned.iter().copied().collect();
        let mut foreign_backlinks = 0usize;
        for &id in &owned {
            if let Some(target) = leafref_target_of(self, id) {
                if !owned_set.contains(&target) {
                    drop_backlink(self, target, id);
                }
            }
            let backlinks = backlinks_of(self, id);
            foreign_backlinks += backlinks
                .iter()
                .filter(|l| !owned_set.contains(l))
                .count();
        }
        if foreign_backlinks > 0 {
            warn!(
                "module {} destroyed with {foreign_backlinks} leafref back-edges from live modules",
                self.module(mid).name
            );
        }

        // bookkeeping import entries other modules hold for this group
        for other in self.module_ids() {
            if group.contains(&other) {
                continue;
            }
            let module = self.module_mut(other);
            module.imports.retain(|i| {
                i.external == ExternalKind::Local
                    || !i.module.map(|m| group.contains(&m)).unwrap_or(false)
            });
        }

        for id in owned {
            self.nodes.dealloc(id);
        }
        for m in group {
            self.modules[m.index()] = None;
        }
    }
}

fn leafref_target_of(ctx: &Context, id: NodeId) -> Option<NodeId> {
    use crate::schema::typ::TypeInfo;
    match ctx.nodes[id].leaf_type() {
        Some(t) => match &t.info {
            TypeInfo::Leafref { target, .. } => *target,
            _ => None,
        },
        None => None,
    }
}

fn backlinks_of(ctx: &Context, id: NodeId) -> Vec<NodeId> {
    use crate::schema::node::NodeKind;
    match &ctx.nodes[id].kind {
        NodeKind::Leaf(b) => b.backlinks.clone(),
        NodeKind::LeafList(b) => b.backlinks.clone(),
        _ => Vec::new(),
    }
}

fn drop_backlink(ctx: &mut Context, target: NodeId, from: NodeId) {
    use crate::schema::node::NodeKind;
    if ctx.nodes.get(target).is_none() {
        return;
    }
    match &mut ctx.nodes[target].kind {
        NodeKind::Leaf(b) => b.backlinks.retain(|&l| l != from),
        NodeKind::LeafList(b) => b.backlinks.retain(|&l| l != from),
        _ => {}
    }
}
