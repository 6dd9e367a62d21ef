//! Forward-reference resolution.
//!
//! The builder records every cross-reference as an [`UnresItem`] entry;
//! this module drains the queue to a fixed point. A pass over the queue
//! is productive when at least one entry resolves; an unproductive full
//! pass fails the load, reporting the first entry that could not make
//! progress. "Cannot make progress yet" (Retry) is the soft failure of
//! the design; anything provably wrong is a hard error that aborts the
//! load immediately.
//!
//! Entry kinds that rewrite the tree are ordered by deferral rather
//! than priority: `uses` expansion waits for its grouping's own content,
//! augments wait for their targets, and deviations run in a second
//! phase once everything else has drained.

use std::collections::HashSet;
use std::mem;

use log::debug;

use crate::context::Context;
use crate::dict::Sym;
use crate::error::{YangError, YangResult};
use crate::rewrite;
use crate::schema::node::{self, NodeKind};
use crate::schema::typ::{
    self, RawTypeSpec, Restr, TypeBase, TypeInfo, YangType,
};
use crate::schema::{FeatureRef, IdentRef, ModuleId, NodeId};

/// Where a type under resolution lives.
#[derive(Debug, Clone)]
pub(crate) enum TypeOwner {
    /// The type of a leaf or leaf-list node
    Leaf(NodeId),
    TypedefModule { module: ModuleId, index: usize },
    TypedefNode { node: NodeId, index: usize },
}

impl TypeOwner {
    fn take(&self, ctx: &mut Context) -> YangType {
        mem::replace(self.slot_mut(ctx), YangType::placeholder())
    }

    fn put(&self, ctx: &mut Context, t: YangType) {
        *self.slot_mut(ctx) = t;
    }

    fn slot_mut<'a>(&self, ctx: &'a mut Context) -> &'a mut YangType {
        match self {
            TypeOwner::Leaf(id) => match &mut ctx.nodes[*id].kind {
                NodeKind::Leaf(b) => &mut b.typ,
                NodeKind::LeafList(b) => &mut b.typ,
                _ => panic!("type owner is not a leaf"),
            },
            TypeOwner::TypedefModule { module, index } => {
                &mut ctx.module_mut(*module).typedefs[*index].typ
            }
            TypeOwner::TypedefNode { node, index } => {
                &mut ctx.nodes[*node].typedefs_mut()[*index].typ
            }
        }
    }

    fn get<'a>(&self, ctx: &'a Context) -> &'a YangType {
        match self {
            TypeOwner::Leaf(id) => match &ctx.nodes[*id].kind {
                NodeKind::Leaf(b) => &b.typ,
                NodeKind::LeafList(b) => &b.typ,
                _ => panic!("type owner is not a leaf"),
            },
            TypeOwner::TypedefModule { module, index } => &ctx.module(*module).typedefs[*index].typ,
            TypeOwner::TypedefNode { node, index } => &ctx.nodes[*node].typedefs()[*index].typ,
        }
    }

    /// Typedef scope the type's unprefixed references search from.
    fn scope(&self) -> Option<NodeId> {
        match self {
            TypeOwner::Leaf(id) => Some(*id),
            TypeOwner::TypedefModule { .. } => None,
            TypeOwner::TypedefNode { node, .. } => Some(*node),
        }
    }

    fn default_of<'a>(&self, ctx: &'a Context) -> Option<&'a Sym> {
        match self {
            TypeOwner::Leaf(id) => match &ctx.nodes[*id].kind {
                NodeKind::Leaf(b) => b.default.as_ref(),
                _ => None,
            },
            TypeOwner::TypedefModule { module, index } => {
                ctx.module(*module).typedefs[*index].default.as_ref()
            }
            TypeOwner::TypedefNode { node, index } => {
                ctx.nodes[*node].typedefs()[*index].default.as_ref()
            }
        }
    }
}

/// What an `if-feature` hangs off.
#[derive(Debug, Clone)]
pub(crate) enum IffTarget {
    Node(NodeId),
    Feature { module: ModuleId, index: usize },
}

/// One unresolved reference.
#[derive(Debug, Clone)]
pub(crate) enum UnresItem {
    ModuleImport { import_idx: usize },
    ModuleInclude { include_idx: usize },
    TypeDer { owner: TypeOwner },
    TypeDerTypedef { owner: TypeOwner },
    TypeLeafref { node: NodeId },
    TypeIdentref { owner: TypeOwner, member: Vec<usize>, base: Sym },
    TypeDefault { owner: TypeOwner },
    Iffeat { target: IffTarget, expr: Sym },
    IdentityBase { ident_idx: usize },
    Uses { node: NodeId },
    Augment { node: NodeId },
    ChoiceDefault { node: NodeId, name: Sym },
    ListKeys { node: NodeId, expr: Sym },
    ListUnique { node: NodeId, expr: Sym, slot: usize },
    Deviation { dev_idx: usize },
}

#[derive(Debug, Clone)]
pub(crate) struct UnresEntry {
    /// Module or submodule whose import table resolves prefixes here
    pub module: ModuleId,
    pub item: UnresItem,
}

/// The work queue of unresolved references for one load.
#[derive(Debug, Default)]
pub(crate) struct Unres {
    pub entries: Vec<UnresEntry>,
}

impl Unres {
    pub fn push(&mut self, module: ModuleId, item: UnresItem) {
        self.entries.push(UnresEntry { module, item });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

enum Attempt {
    Resolved,
    Retry,
}

/// Drain the queue to a fixed point; deviations run last.
pub(crate) fn resolve_all(ctx: &mut Context, unres: &mut Unres) -> YangResult<()> {
    run_phase(ctx, unres, false)?;
    if unres
        .entries
        .iter()
        .all(|e| matches!(e.item, UnresItem::Deviation { .. }))
    {
        run_phase(ctx, unres, true)?;
    }
    if let Some(stuck) = unres.entries.first() {
        return Err(YangError::UnresolvedReference(describe(ctx, stuck)));
    }
    Ok(())
}

fn run_phase(ctx: &mut Context, unres: &mut Unres, deviations: bool) -> YangResult<()> {
    let mut pass = 0usize;
    loop {
        pass += 1;
        let total = unres.entries.len();
        if total == 0 {
            return Ok(());
        }
        let mut resolved = 0usize;
        let mut i = 0usize;
        // entries stay in the queue while attempted, so deferral checks
        // (a uses waiting on its grouping's entries) see the whole set;
        // entries queued by rewrites during the pass land at the back
        // and are attempted within the same pass
        while i < unres.entries.len() {
            let entry = unres.entries[i].clone();
            if !deviations && matches!(entry.item, UnresItem::Deviation { .. }) {
                i += 1;
                continue;
            }
            match attempt(ctx, &entry, unres)? {
                Attempt::Resolved => {
                    unres.entries.remove(i);
                    resolved += 1;
                }
                Attempt::Retry => i += 1,
            }
        }
        debug!(
            "resolver pass {pass}: {resolved}/{total} resolved, {} left",
            unres.entries.len()
        );
        if unres.entries.is_empty() {
            return Ok(());
        }
        if resolved == 0 {
            // unproductive pass: the phase is done, the caller decides
            // whether what is left is acceptable
            return Ok(());
        }
    }
}

fn attempt(ctx: &mut Context, entry: &UnresEntry, unres: &mut Unres) -> YangResult<Attempt> {
    match &entry.item {
        UnresItem::ModuleImport { import_idx } => attempt_import(ctx, entry.module, *import_idx),
        UnresItem::ModuleInclude { include_idx } => {
            attempt_include(ctx, entry.module, *include_idx, unres)
        }
        UnresItem::TypeDer { owner } | UnresItem::TypeDerTypedef { owner } => {
            attempt_type_der(ctx, entry.module, owner, unres)
        }
        UnresItem::TypeLeafref { node } => attempt_leafref(ctx, *node),
        UnresItem::TypeIdentref { owner, member, base } => {
            attempt_identref(ctx, entry.module, owner, member, base)
        }
        UnresItem::TypeDefault { owner } => attempt_type_default(ctx, entry.module, owner),
        UnresItem::Iffeat { target, expr } => attempt_iffeat(ctx, entry.module, target, expr),
        UnresItem::IdentityBase { ident_idx } => {
            attempt_identity_base(ctx, entry.module, *ident_idx)
        }
        UnresItem::Uses { node } => attempt_uses(ctx, *node, unres),
        UnresItem::Augment { node } => attempt_augment(ctx, *node, unres),
        UnresItem::ChoiceDefault { node, name } => attempt_choice_default(ctx, *node, name),
        UnresItem::ListKeys { node, expr } => attempt_list_keys(ctx, *node, expr),
        UnresItem::ListUnique { node, expr, slot } => {
            attempt_list_unique(ctx, *node, expr, *slot)
        }
        UnresItem::Deviation { dev_idx } => {
            rewrite::deviation::attempt_deviation(ctx, entry.module, *dev_idx, unres)
                .map(|done| if done { Attempt::Resolved } else { Attempt::Retry })
        }
    }
}

fn describe(ctx: &Context, entry: &UnresEntry) -> String {
    let module = ctx.module(entry.module).name.clone();
    match &entry.item {
        UnresItem::ModuleImport { import_idx } => {
            let import = &ctx.module(entry.module).imports[*import_idx];
            format!("module {} imported by {module} not found", import.name)
        }
        UnresItem::ModuleInclude { include_idx } => {
            let include = &ctx.module(entry.module).includes[*include_idx];
            format!("submodule {} included by {module} not found", include.name)
        }
        UnresItem::TypeDer { owner } | UnresItem::TypeDerTypedef { owner } => {
            let t = owner.get(ctx);
            match &t.prefix {
                Some(p) => format!("type {p}:{} referenced by {module}", t.name),
                None => format!("type {} referenced by {module}", t.name),
            }
        }
        UnresItem::TypeLeafref { node } => format!(
            "leafref path of {} in {module}",
            node::schema_path(ctx, *node)
        ),
        UnresItem::TypeIdentref { base, .. } => {
            format!("identity base {base} referenced by {module}")
        }
        UnresItem::TypeDefault { owner } => format!(
            "default {:?} referenced by {module}",
            owner.default_of(ctx).map(|s| s.as_str()).unwrap_or("")
        ),
        UnresItem::Iffeat { expr, .. } => format!("feature {expr} referenced by {module}"),
        UnresItem::IdentityBase { ident_idx } => {
            let ident = &ctx.module(entry.module).identities[*ident_idx];
            format!(
                "base {} of identity {} in {module}",
                ident.base_name.as_ref().map(|s| s.as_str()).unwrap_or(""),
                ident.name
            )
        }
        UnresItem::Uses { node } => {
            if let NodeKind::Uses(u) = &ctx.nodes[*node].kind {
                format!("grouping {} used by {module}", u.grouping_name)
            } else {
                format!("uses in {module}")
            }
        }
        UnresItem::Augment { node } => {
            if let NodeKind::Augment(a) = &ctx.nodes[*node].kind {
                format!("augment target {} in {module}", a.target_path)
            } else {
                format!("augment in {module}")
            }
        }
        UnresItem::ChoiceDefault { node, name } => format!(
            "default case {name} of choice {} in {module}",
            ctx.nodes[*node].name
        ),
        UnresItem::ListKeys { node, expr } => format!(
            "key \"{expr}\" of list {} in {module}",
            ctx.nodes[*node].name
        ),
        UnresItem::ListUnique { node, expr, .. } => format!(
            "unique \"{expr}\" of list {} in {module}",
            ctx.nodes[*node].name
        ),
        UnresItem::Deviation { dev_idx } => {
            let dev = &ctx.module(entry.module).deviations[*dev_idx];
            format!("deviation target {} in {module}", dev.target_path)
        }
    }
}

// ---- prefix and name lookup ------------------------------------------------

pub(crate) enum PrefixLookup {
    Module(ModuleId),
    /// The prefix names an import that has not resolved yet
    Pending,
}

/// Map a reference prefix to a module, using the import table of `mid`
/// (a module or submodule). A missing prefix and the module's own
/// prefix both mean the main module itself.
pub(crate) fn module_for_prefix(
    ctx: &Context,
    mid: ModuleId,
    prefix: Option<&str>,
) -> YangResult<PrefixLookup> {
    let module = ctx.module(mid);
    let prefix = match prefix {
        None => return Ok(PrefixLookup::Module(node::main_module(ctx, mid))),
        Some(p) => p,
    };
    if module.prefix == prefix {
        return Ok(PrefixLookup::Module(node::main_module(ctx, mid)));
    }
    match module.find_import(prefix) {
        Some(import) => match import.module {
            Some(target) => Ok(PrefixLookup::Module(target)),
            None => Ok(PrefixLookup::Pending),
        },
        None => Err(YangError::UnknownPrefix(format!(
            "prefix {prefix:?} in module {}",
            module.name
        ))),
    }
}

fn split_ref(s: &str) -> (Option<&str>, &str) {
    match s.split_once(':') {
        Some((p, n)) => (Some(p), n),
        None => (None, s),
    }
}

// ---- imports and includes --------------------------------------------------

fn attempt_import(ctx: &mut Context, mid: ModuleId, import_idx: usize) -> YangResult<Attempt> {
    let (name, revision) = {
        let import = &ctx.module(mid).imports[import_idx];
        if import.module.is_some() {
            return Ok(Attempt::Resolved);
        }
        (import.name.clone(), import.revision.clone())
    };
    let found = match ctx.get_module(name.as_str(), revision.as_deref()) {
        Some(m) => Some(m),
        None => ctx.load_dependency(name.as_str(), revision.as_deref())?,
    };
    match found {
        Some(target) => {
            ctx.module_mut(mid).imports[import_idx].module = Some(target);
            Ok(Attempt::Resolved)
        }
        None => Ok(Attempt::Retry),
    }
}

fn attempt_include(
    ctx: &mut Context,
    mid: ModuleId,
    include_idx: usize,
    unres: &mut Unres,
) -> YangResult<Attempt> {
    let (name, revision) = {
        let include = &ctx.module(mid).includes[include_idx];
        if include.submodule.is_some() {
            return Ok(Attempt::Resolved);
        }
        (include.name.clone(), include.revision.clone())
    };
    let owner = node::main_module(ctx, mid);
    let found = match ctx.get_submodule(owner, name.as_str()) {
        Some(sub) => Some(sub),
        None => {
            ctx.load_submodule_dependency(owner, name.as_str(), revision.as_deref(), unres)?
        }
    };
    match found {
        Some(sub) => {
            ctx.module_mut(mid).includes[include_idx].submodule = Some(sub);
            Ok(Attempt::Resolved)
        }
        None => Ok(Attempt::Retry),
    }
}

// ---- type derivation -------------------------------------------------------

fn attempt_type_der(
    ctx: &mut Context,
    mid: ModuleId,
    owner: &TypeOwner,
    unres: &mut Unres,
) -> YangResult<Attempt> {
    let mut t = owner.take(ctx);
    let result = resolve_type(ctx, mid, owner.scope(), &mut t);
    match result {
        Ok(Attempt::Resolved) => {
            // queue the follow-up work the resolved shape implies
            let mut ident_members = Vec::new();
            collect_unresolved_identrefs(&t, &mut Vec::new(), &mut ident_members);
            let is_leafref = t.base == TypeBase::Leafref;
            owner.put(ctx, t);
            for (member, base) in ident_members {
                unres.push(mid, UnresItem::TypeIdentref { owner: owner.clone(), member, base });
            }
            if is_leafref {
                if let TypeOwner::Leaf(id) = owner {
                    if !node::in_grouping(ctx, *id) {
                        unres.push(mid, UnresItem::TypeLeafref { node: *id });
                    } else if ctx.options().validate_unused_groupings {
                        unres.push(mid, UnresItem::TypeLeafref { node: *id });
                    }
                }
            }
            Ok(Attempt::Resolved)
        }
        Ok(Attempt::Retry) => {
            owner.put(ctx, t);
            Ok(Attempt::Retry)
        }
        Err(e) => {
            owner.put(ctx, t);
            Err(e)
        }
    }
}

fn collect_unresolved_identrefs(
    t: &YangType,
    path: &mut Vec<usize>,
    out: &mut Vec<(Vec<usize>, Sym)>,
) {
    match &t.info {
        TypeInfo::Identityref {
            base_name: Some(base),
            base: None,
        } => out.push((path.clone(), base.clone())),
        TypeInfo::Union { types } => {
            for (i, member) in types.iter().enumerate() {
                path.push(i);
                collect_unresolved_identrefs(member, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}

/// Resolve one type in place: map its name to a built-in or typedef,
/// merge the derivation chain's payload and validate the restrictions.
fn resolve_type(
    ctx: &Context,
    mid: ModuleId,
    scope: Option<NodeId>,
    t: &mut YangType,
) -> YangResult<Attempt> {
    if t.is_resolved() {
        return Ok(Attempt::Resolved);
    }
    let spec = match &mut t.info {
        TypeInfo::Raw(spec) => mem::take(&mut **spec),
        _ => return Err(YangError::Internal("unresolved type without a spec".to_string())),
    };

    if t.prefix.is_none() {
        if let Some(base) = TypeBase::from_builtin(&t.name) {
            match convert_builtin(ctx, mid, scope, base, spec)? {
                BuiltinOutcome::Done(info) => {
                    t.base = base;
                    t.info = info;
                    return Ok(Attempt::Resolved);
                }
                BuiltinOutcome::Pending(spec) => {
                    t.info = TypeInfo::Raw(Box::new(spec));
                    return Ok(Attempt::Retry);
                }
            }
        }
    }

    // derived type: find the typedef up the scope chain
    let target = match find_typedef(ctx, mid, scope, t.prefix.as_deref(), &t.name)? {
        TypedefLookup::Found(owner) => owner,
        TypedefLookup::Pending => {
            t.info = TypeInfo::Raw(Box::new(spec));
            return Ok(Attempt::Retry);
        }
    };
    let base_type = target.get(ctx);
    if !base_type.is_resolved() {
        t.info = TypeInfo::Raw(Box::new(spec));
        return Ok(Attempt::Retry);
    }
    let base = base_type.base;
    let inherited = base_type.info.clone();
    t.base = base;
    t.info = merge_derived(base, inherited, spec)?;
    Ok(Attempt::Resolved)
}

/// Immediate, no-retry type resolution for deviation `type` replaces,
/// which run after everything else has settled.
pub(crate) fn resolve_type_now(
    ctx: &Context,
    mid: ModuleId,
    scope: Option<NodeId>,
    t: &mut YangType,
) -> YangResult<()> {
    match resolve_type(ctx, mid, scope, t)? {
        Attempt::Resolved => {}
        Attempt::Retry => {
            return Err(YangError::UnresolvedReference(format!(
                "type {} in deviation from module {}",
                t.name,
                ctx.module(mid).name
            )))
        }
    }
    let mut pending = Vec::new();
    collect_unresolved_identrefs(t, &mut Vec::new(), &mut pending);
    for (member, base) in pending {
        let resolved = find_identity(ctx, mid, &base)?.ok_or_else(|| {
            YangError::UnresolvedReference(format!("identity base {base} in deviation"))
        })?;
        let mut target = &mut *t;
        for &i in &member {
            target = match &mut target.info {
                TypeInfo::Union { types } => &mut types[i],
                _ => return Err(YangError::Internal("identref member path broken".to_string())),
            };
        }
        if let TypeInfo::Identityref { base: slot, .. } = &mut target.info {
            *slot = Some(resolved);
        }
    }
    Ok(())
}

/// Immediate leafref target resolution, for deviation type replaces.
pub(crate) fn resolve_leafref_now(ctx: &mut Context, node: NodeId) -> YangResult<()> {
    match attempt_leafref(ctx, node)? {
        Attempt::Resolved => Ok(()),
        Attempt::Retry => Err(YangError::UnresolvedReference(format!(
            "leafref path of {}",
            node::schema_path(ctx, node)
        ))),
    }
}

enum BuiltinOutcome {
    Done(TypeInfo),
    /// A union member is still waiting on its own typedef
    Pending(RawTypeSpec),
}

fn convert_builtin(
    ctx: &Context,
    mid: ModuleId,
    scope: Option<NodeId>,
    base: TypeBase,
    mut spec: RawTypeSpec,
) -> YangResult<BuiltinOutcome> {
    let reject = |what: &str| -> YangError {
        YangError::UnexpectedStatementInContext(format!("{what} on a {base:?} type"))
    };
    let info = match base {
        TypeBase::Binary => {
            deny(spec.range.is_some(), reject("range"))?;
            deny(!spec.patterns.is_empty(), reject("pattern"))?;
            deny(!spec.enums.is_empty() || !spec.bits.is_empty(), reject("enum/bit"))?;
            if let Some(length) = &spec.length {
                typ::check_range_expr(&length.expr, 0, u64::MAX as i128, None)?;
            }
            TypeInfo::Binary { length: spec.length }
        }
        TypeBase::Bits => {
            if spec.bits.is_empty() {
                return Err(YangError::MissingRequiredChild("bit in a bits type".to_string()));
            }
            TypeInfo::Bits { bits: spec.bits }
        }
        TypeBase::Bool | TypeBase::Empty => {
            deny(!spec.is_plain(), reject("restriction"))?;
            TypeInfo::None
        }
        TypeBase::Dec64 => {
            let digits = spec.fraction_digits.ok_or_else(|| {
                YangError::MissingRequiredChild("fraction-digits in a decimal64 type".to_string())
            })?;
            if let Some(range) = &spec.range {
                let (lo, hi) = typ::dec64_bounds();
                typ::check_range_expr(&range.expr, lo, hi, Some(digits))?;
            }
            TypeInfo::Dec64 {
                digits,
                divisor: 10i64.pow(digits as u32),
                range: spec.range,
            }
        }
        TypeBase::Enum => {
            if spec.enums.is_empty() {
                return Err(YangError::MissingRequiredChild(
                    "enum in an enumeration type".to_string(),
                ));
            }
            TypeInfo::Enumeration { enums: spec.enums }
        }
        TypeBase::Ident => {
            let base_name = spec.ident_base.take().ok_or_else(|| {
                YangError::MissingRequiredChild("base in an identityref type".to_string())
            })?;
            TypeInfo::Identityref {
                base_name: Some(base_name),
                base: None,
            }
        }
        TypeBase::Inst => TypeInfo::InstanceId {
            require_instance: spec.require_instance.unwrap_or(true),
        },
        TypeBase::Leafref => {
            let path = spec.path.take().ok_or_else(|| {
                YangError::MissingRequiredChild("path in a leafref type".to_string())
            })?;
            check_path_syntax(&path)?;
            TypeInfo::Leafref {
                path,
                require_instance: spec.require_instance.unwrap_or(true),
                target: None,
            }
        }
        TypeBase::String => {
            deny(spec.range.is_some(), reject("range"))?;
            if let Some(length) = &spec.length {
                typ::check_range_expr(&length.expr, 0, u64::MAX as i128, None)?;
            }
            TypeInfo::Str {
                length: spec.length,
                patterns: spec.patterns,
            }
        }
        TypeBase::Union => {
            if spec.union_types.is_empty() {
                return Err(YangError::MissingRequiredChild(
                    "type in a union type".to_string(),
                ));
            }
            let mut pending = false;
            for member in &mut spec.union_types {
                match resolve_type(ctx, mid, scope, member)? {
                    Attempt::Resolved => match member.base {
                        TypeBase::Empty | TypeBase::Leafref => {
                            return Err(YangError::InvalidValue(format!(
                                "{} is not allowed as a union member",
                                member.name
                            )))
                        }
                        _ => {}
                    },
                    Attempt::Retry => pending = true,
                }
            }
            if pending {
                return Ok(BuiltinOutcome::Pending(spec));
            }
            TypeInfo::Union {
                types: spec.union_types,
            }
        }
        _ if base.is_integer() => {
            deny(spec.length.is_some(), reject("length"))?;
            deny(!spec.patterns.is_empty(), reject("pattern"))?;
            if let Some(range) = &spec.range {
                let (lo, hi) = base
                    .integer_bounds()
                    .ok_or_else(|| YangError::Internal("integer without bounds".to_string()))?;
                typ::check_range_expr(&range.expr, lo, hi, None)?;
            }
            TypeInfo::Num { range: spec.range }
        }
        _ => return Err(YangError::Internal(format!("convert of base {base:?}"))),
    };
    Ok(BuiltinOutcome::Done(info))
}

fn deny(cond: bool, err: YangError) -> YangResult<()> {
    if cond {
        Err(err)
    } else {
        Ok(())
    }
}

/// Overlay the restrictions written on a derived type reference onto
/// the payload inherited from its typedef.
fn merge_derived(base: TypeBase, inherited: TypeInfo, spec: RawTypeSpec) -> YangResult<TypeInfo> {
    let reject = |what: &str| -> YangError {
        YangError::UnexpectedStatementInContext(format!(
            "{what} cannot restrict a derived {base:?} type"
        ))
    };
    deny(!spec.enums.is_empty(), reject("enum"))?;
    deny(!spec.bits.is_empty(), reject("bit"))?;
    deny(spec.path.is_some(), reject("path"))?;
    deny(spec.ident_base.is_some(), reject("base"))?;
    deny(!spec.union_types.is_empty(), reject("type"))?;
    deny(spec.fraction_digits.is_some(), reject("fraction-digits"))?;

    let check_range = |restr: &Restr, digits: Option<u8>| -> YangResult<()> {
        match base.integer_bounds() {
            Some((lo, hi)) => typ::check_range_expr(&restr.expr, lo, hi, None),
            None => {
                let (lo, hi) = typ::dec64_bounds();
                typ::check_range_expr(&restr.expr, lo, hi, digits)
            }
        }
    };

    match inherited {
        TypeInfo::Num { range } => {
            deny(spec.length.is_some(), reject("length"))?;
            deny(!spec.patterns.is_empty(), reject("pattern"))?;
            match spec.range {
                Some(r) => {
                    check_range(&r, None)?;
                    Ok(TypeInfo::Num { range: Some(r) })
                }
                None => Ok(TypeInfo::Num { range }),
            }
        }
        TypeInfo::Dec64 { digits, divisor, range } => {
            deny(spec.length.is_some(), reject("length"))?;
            deny(!spec.patterns.is_empty(), reject("pattern"))?;
            match spec.range {
                Some(r) => {
                    check_range(&r, Some(digits))?;
                    Ok(TypeInfo::Dec64 { digits, divisor, range: Some(r) })
                }
                None => Ok(TypeInfo::Dec64 { digits, divisor, range }),
            }
        }
        TypeInfo::Str { length, mut patterns } => {
            deny(spec.range.is_some(), reject("range"))?;
            let length = match spec.length {
                Some(l) => {
                    typ::check_range_expr(&l.expr, 0, u64::MAX as i128, None)?;
                    Some(l)
                }
                None => length,
            };
            patterns.extend(spec.patterns);
            Ok(TypeInfo::Str { length, patterns })
        }
        TypeInfo::Binary { length } => {
            deny(spec.range.is_some(), reject("range"))?;
            deny(!spec.patterns.is_empty(), reject("pattern"))?;
            let length = match spec.length {
                Some(l) => {
                    typ::check_range_expr(&l.expr, 0, u64::MAX as i128, None)?;
                    Some(l)
                }
                None => length,
            };
            Ok(TypeInfo::Binary { length })
        }
        TypeInfo::Leafref { path, require_instance, .. } => {
            deny(!spec.is_plain() && spec.require_instance.is_none(), reject("restriction"))?;
            Ok(TypeInfo::Leafref {
                path,
                require_instance: spec.require_instance.unwrap_or(require_instance),
                // targets are per use site, never inherited
                target: None,
            })
        }
        TypeInfo::InstanceId { require_instance } => {
            deny(!spec.is_plain() && spec.require_instance.is_none(), reject("restriction"))?;
            Ok(TypeInfo::InstanceId {
                require_instance: spec.require_instance.unwrap_or(require_instance),
            })
        }
        other @ (TypeInfo::Bits { .. }
        | TypeInfo::Enumeration { .. }
        | TypeInfo::Identityref { .. }
        | TypeInfo::Union { .. }
        | TypeInfo::None) => {
            deny(!spec.is_plain(), reject("restriction"))?;
            Ok(other)
        }
        TypeInfo::Raw(_) => Err(YangError::Internal("raw payload on a resolved type".to_string())),
    }
}

enum TypedefLookup {
    Found(TypeOwner),
    Pending,
}

fn find_typedef(
    ctx: &Context,
    mid: ModuleId,
    scope: Option<NodeId>,
    prefix: Option<&str>,
    name: &str,
) -> YangResult<TypedefLookup> {
    let target_module = match module_for_prefix(ctx, mid, prefix)? {
        PrefixLookup::Module(m) => m,
        PrefixLookup::Pending => return Ok(TypedefLookup::Pending),
    };
    let local = target_module == node::main_module(ctx, mid);
    if local {
        // unqualified and own-prefix references see the node scope
        let mut cur = scope;
        while let Some(id) = cur {
            if let Some(index) = ctx.nodes[id]
                .typedefs()
                .iter()
                .position(|t| t.name == name)
            {
                return Ok(TypedefLookup::Found(TypeOwner::TypedefNode { node: id, index }));
            }
            cur = ctx.nodes[id].parent;
        }
    }
    for module_id in ctx.module_and_submodules(target_module) {
        if let Some(index) = ctx
            .module(module_id)
            .typedefs
            .iter()
            .position(|t| t.name == name)
        {
            return Ok(TypedefLookup::Found(TypeOwner::TypedefModule {
                module: module_id,
                index,
            }));
        }
    }
    Err(YangError::UnresolvedReference(format!(
        "typedef {name:?} not found from module {}",
        ctx.module(mid).name
    )))
}

// ---- leafref paths ---------------------------------------------------------

/// Syntactic well-formedness of a leafref path: absolute or a chain of
/// `../` steps, then `prefix:name` segments with balanced predicates.
fn check_path_syntax(path: &str) -> YangResult<()> {
    let rest = path.trim();
    if rest.is_empty() {
        return Err(YangError::InvalidValue("empty leafref path".to_string()));
    }
    let mut depth = 0i32;
    for c in rest.chars() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth < 0 {
                    return Err(YangError::InvalidValue(format!(
                        "unbalanced predicate in path {rest:?}"
                    )));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(YangError::InvalidValue(format!(
            "unbalanced predicate in path {rest:?}"
        )));
    }
    Ok(())
}

/// Split a path into its `../` count and named segments, predicates
/// stripped.
fn path_segments(path: &str) -> YangResult<(bool, usize, Vec<String>)> {
    let mut rest = path.trim();
    let absolute = rest.starts_with('/');
    let mut up = 0usize;
    if !absolute {
        while let Some(r) = rest.strip_prefix("../") {
            up += 1;
            rest = r;
        }
        if up == 0 {
            return Err(YangError::InvalidValue(format!(
                "relative path {path:?} must start with \"../\""
            )));
        }
    }
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut depth = 0i32;
    for c in rest.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            '/' if depth == 0 => {
                if !buf.is_empty() {
                    segments.push(mem::take(&mut buf));
                }
            }
            _ if depth == 0 => buf.push(c),
            _ => {}
        }
    }
    if !buf.is_empty() {
        segments.push(buf);
    }
    if segments.is_empty() {
        return Err(YangError::InvalidValue(format!("empty path {path:?}")));
    }
    Ok((absolute, up, segments))
}

/// Nearest ancestor that is a real data level (skips choice, case and
/// uses). `Err(())` signals an augment ancestor that is not yet
/// applied, which is a retry.
fn data_parent(ctx: &Context, node: NodeId) -> Result<Option<NodeId>, ()> {
    let mut cur = ctx.nodes[node].parent;
    while let Some(id) = cur {
        match &ctx.nodes[id].kind {
            NodeKind::Choice(_) | NodeKind::Case(_) | NodeKind::Uses(_) => {
                cur = ctx.nodes[id].parent
            }
            NodeKind::Augment(_) => return Err(()),
            _ => return Ok(Some(id)),
        }
    }
    Ok(None)
}

fn attempt_leafref(ctx: &mut Context, node: NodeId) -> YangResult<Attempt> {
    let (path, mid) = {
        let n = &ctx.nodes[node];
        let path = match &n.kind {
            NodeKind::Leaf(b) => match &b.typ.info {
                TypeInfo::Leafref { path, .. } => path.clone(),
                _ => return Err(YangError::Internal("leafref entry on a non-leafref".to_string())),
            },
            NodeKind::LeafList(b) => match &b.typ.info {
                TypeInfo::Leafref { path, .. } => path.clone(),
                _ => return Err(YangError::Internal("leafref entry on a non-leafref".to_string())),
            },
            _ => return Err(YangError::Internal("leafref entry on a non-leaf".to_string())),
        };
        (path, n.module)
    };

    let (absolute, up, segments) = path_segments(&path)?;

    // starting point
    let mut cur: Option<NodeId> = None;
    let mut cur_module = node::main_module(ctx, mid);
    if absolute {
        let (prefix, _) = split_ref(&segments[0]);
        match module_for_prefix(ctx, mid, prefix)? {
            PrefixLookup::Module(m) => cur_module = m,
            PrefixLookup::Pending => return Ok(Attempt::Retry),
        }
    } else {
        let mut anchor = match data_parent(ctx, node) {
            Ok(a) => a,
            Err(()) => return Ok(Attempt::Retry),
        };
        for _ in 1..up {
            anchor = match anchor {
                Some(a) => match data_parent(ctx, a) {
                    Ok(p) => p,
                    Err(()) => return Ok(Attempt::Retry),
                },
                None => {
                    return Err(YangError::InvalidValue(format!(
                        "path {path:?} climbs above the schema root at {}",
                        node::schema_path(ctx, node)
                    )))
                }
            };
        }
        cur = anchor;
        if let Some(a) = cur {
            cur_module = node::main_module(ctx, ctx.nodes[a].module);
        }
    }

    // walk the named segments
    for seg in &segments {
        let (prefix, name) = split_ref(seg);
        let seg_module = match module_for_prefix(ctx, mid, prefix)? {
            PrefixLookup::Module(m) => m,
            PrefixLookup::Pending => return Ok(Attempt::Retry),
        };
        let found = node::find_data_child_in(ctx, cur, cur_module, seg_module, name);
        match found {
            Some(next) => {
                cur_module = node::main_module(ctx, ctx.nodes[next].module);
                cur = Some(next);
            }
            None => return Ok(Attempt::Retry),
        }
    }

    let target = match cur {
        Some(t) => t,
        None => return Ok(Attempt::Retry),
    };
    if !matches!(ctx.nodes[target].kind, NodeKind::Leaf(_) | NodeKind::LeafList(_)) {
        return Err(YangError::InvalidValue(format!(
            "leafref path {path:?} of {} targets a {}",
            node::schema_path(ctx, node),
            ctx.nodes[target].kind.keyword()
        )));
    }

    // cycle detection over the already-resolved part of the chain
    let mut visited: HashSet<NodeId> = HashSet::new();
    visited.insert(node);
    let mut walk = target;
    loop {
        if !visited.insert(walk) {
            return Err(YangError::CircularLeafref(format!(
                "leafref chain through {}",
                node::schema_path(ctx, walk)
            )));
        }
        let next = match ctx.nodes[walk].leaf_type() {
            Some(t) if t.base == TypeBase::Leafref => match &t.info {
                TypeInfo::Leafref { target: Some(next), .. } => *next,
                _ => break,
            },
            _ => break,
        };
        walk = next;
    }

    // store the target and the back edge
    match &mut ctx.nodes[node].kind {
        NodeKind::Leaf(b) => {
            if let TypeInfo::Leafref { target: slot, .. } = &mut b.typ.info {
                *slot = Some(target);
            }
        }
        NodeKind::LeafList(b) => {
            if let TypeInfo::Leafref { target: slot, .. } = &mut b.typ.info {
                *slot = Some(target);
            }
        }
        _ => {}
    }
    match &mut ctx.nodes[target].kind {
        NodeKind::Leaf(b) => {
            if !b.backlinks.contains(&node) {
                b.backlinks.push(node);
            }
        }
        NodeKind::LeafList(b) => {
            if !b.backlinks.contains(&node) {
                b.backlinks.push(node);
            }
        }
        _ => {}
    }
    Ok(Attempt::Resolved)
}

// ---- identities and features ----------------------------------------------

fn find_identity(
    ctx: &Context,
    mid: ModuleId,
    reference: &str,
) -> YangResult<Option<IdentRef>> {
    let (prefix, name) = split_ref(reference);
    let target = match module_for_prefix(ctx, mid, prefix)? {
        PrefixLookup::Module(m) => m,
        PrefixLookup::Pending => return Ok(None),
    };
    for module_id in ctx.module_and_submodules(target) {
        if let Some(index) = ctx.module(module_id).find_identity(name) {
            return Ok(Some(IdentRef { module: module_id, index }));
        }
    }
    Err(YangError::UnresolvedReference(format!(
        "identity {reference:?} not found from module {}",
        ctx.module(mid).name
    )))
}

fn attempt_identref(
    ctx: &mut Context,
    mid: ModuleId,
    owner: &TypeOwner,
    member: &[usize],
    base: &Sym,
) -> YangResult<Attempt> {
    let resolved = match find_identity(ctx, mid, base)? {
        Some(r) => r,
        None => return Ok(Attempt::Retry),
    };
    let mut t = owner.take(ctx);
    {
        let mut target = &mut t;
        for &i in member {
            target = match &mut target.info {
                TypeInfo::Union { types } => &mut types[i],
                _ => {
                    owner.put(ctx, t);
                    return Err(YangError::Internal("identref member path broken".to_string()));
                }
            };
        }
        if let TypeInfo::Identityref { base: slot, .. } = &mut target.info {
            *slot = Some(resolved);
        }
    }
    owner.put(ctx, t);
    Ok(Attempt::Resolved)
}

fn attempt_identity_base(ctx: &mut Context, mid: ModuleId, ident_idx: usize) -> YangResult<Attempt> {
    let base_name = {
        let ident = &ctx.module(mid).identities[ident_idx];
        if ident.base.is_some() {
            return Ok(Attempt::Resolved);
        }
        match &ident.base_name {
            Some(b) => b.clone(),
            None => return Ok(Attempt::Resolved),
        }
    };
    let resolved = match find_identity(ctx, mid, &base_name)? {
        Some(r) => r,
        None => return Ok(Attempt::Retry),
    };
    // an identity may not derive from itself
    let mut walk = Some(resolved);
    while let Some(cur) = walk {
        if cur.module == mid && cur.index == ident_idx {
            return Err(YangError::InvalidValue(format!(
                "identity {} derives from itself",
                ctx.module(mid).identities[ident_idx].name
            )));
        }
        walk = ctx.module(cur.module).identities[cur.index].base;
    }
    ctx.module_mut(mid).identities[ident_idx].base = Some(resolved);
    Ok(Attempt::Resolved)
}

fn attempt_iffeat(
    ctx: &mut Context,
    mid: ModuleId,
    target: &IffTarget,
    expr: &Sym,
) -> YangResult<Attempt> {
    let (prefix, name) = split_ref(expr);
    let target_module = match module_for_prefix(ctx, mid, prefix)? {
        PrefixLookup::Module(m) => m,
        PrefixLookup::Pending => return Ok(Attempt::Retry),
    };
    let mut found: Option<FeatureRef> = None;
    for module_id in ctx.module_and_submodules(target_module) {
        if let Some(index) = ctx.module(module_id).find_feature(name) {
            found = Some(FeatureRef { module: module_id, index });
            break;
        }
    }
    let fref = found.ok_or_else(|| {
        YangError::UnresolvedReference(format!(
            "feature {expr:?} not found from module {}",
            ctx.module(mid).name
        ))
    })?;
    match target {
        IffTarget::Node(id) => ctx.nodes[*id].iffeatures.push(fref),
        IffTarget::Feature { module, index } => {
            ctx.module_mut(*module).features[*index].iffeatures.push(fref)
        }
    }
    Ok(Attempt::Resolved)
}

// ---- uses, choice defaults, keys, uniques ---------------------------------

/// Upward search for a grouping, nearest scope first (the original's
/// `lys_find_grouping_up`).
pub(crate) fn find_grouping(
    ctx: &Context,
    mid: ModuleId,
    start: Option<NodeId>,
    reference: &str,
) -> YangResult<Option<NodeId>> {
    let (prefix, name) = split_ref(reference);
    let target = match module_for_prefix(ctx, mid, prefix)? {
        PrefixLookup::Module(m) => m,
        PrefixLookup::Pending => return Ok(None),
    };
    if target == node::main_module(ctx, mid) {
        let mut level = start;
        loop {
            let first = match level {
                Some(p) => ctx.nodes[p].child,
                None => ctx.module(node::main_module(ctx, mid)).data,
            };
            for sib in ctx.nodes.chain(first) {
                if matches!(ctx.nodes[sib].kind, NodeKind::Grouping(_))
                    && ctx.nodes[sib].name == name
                {
                    return Ok(Some(sib));
                }
            }
            match level {
                Some(p) => level = ctx.nodes[p].parent,
                None => break,
            }
        }
        return Ok(None);
    }
    // prefixed: top-level groupings of the imported module
    for sib in ctx.nodes.chain(ctx.module(target).data) {
        if matches!(ctx.nodes[sib].kind, NodeKind::Grouping(_)) && ctx.nodes[sib].name == name {
            return Ok(Some(sib));
        }
    }
    Ok(None)
}

/// true while entries in the queue still point inside `root`'s subtree
fn subtree_pending(ctx: &Context, unres: &Unres, root: NodeId, except: NodeId) -> bool {
    let in_subtree = |mut id: NodeId| -> bool {
        loop {
            if id == root {
                return true;
            }
            match ctx.nodes[id].parent {
                Some(p) => id = p,
                None => return false,
            }
        }
    };
    unres.entries.iter().any(|e| {
        let node = match &e.item {
            UnresItem::TypeDer { owner }
            | UnresItem::TypeDerTypedef { owner }
            | UnresItem::TypeIdentref { owner, .. }
            | UnresItem::TypeDefault { owner } => match owner {
                TypeOwner::Leaf(id) | TypeOwner::TypedefNode { node: id, .. } => Some(*id),
                TypeOwner::TypedefModule { .. } => None,
            },
            UnresItem::TypeLeafref { node }
            | UnresItem::Uses { node }
            | UnresItem::ChoiceDefault { node, .. }
            | UnresItem::ListKeys { node, .. }
            | UnresItem::ListUnique { node, .. } => Some(*node),
            UnresItem::Iffeat { target: IffTarget::Node(node), .. } => Some(*node),
            _ => None,
        };
        match node {
            Some(id) => id != except && in_subtree(id),
            None => false,
        }
    })
}

fn attempt_uses(ctx: &mut Context, uses_id: NodeId, unres: &mut Unres) -> YangResult<Attempt> {
    let (name, mid, parent) = {
        let n = &ctx.nodes[uses_id];
        match &n.kind {
            NodeKind::Uses(u) => (u.grouping_name.clone(), n.module, n.parent),
            _ => return Err(YangError::Internal("uses entry on a non-uses".to_string())),
        }
    };
    let grp = match find_grouping(ctx, mid, parent, &name)? {
        Some(g) => g,
        None => return Ok(Attempt::Retry),
    };
    // the grouping's own content must have settled before it is copied
    if subtree_pending(ctx, unres, grp, uses_id) {
        return Ok(Attempt::Retry);
    }
    rewrite::uses::expand_uses(ctx, uses_id, grp, unres)?;
    if let NodeKind::Uses(u) = &mut ctx.nodes[uses_id].kind {
        u.grouping = Some(grp);
    }
    Ok(Attempt::Resolved)
}

/// Resolve an absolute schema node id (augment/deviation target).
pub(crate) fn resolve_schema_nodeid(
    ctx: &Context,
    mid: ModuleId,
    path: &str,
) -> YangResult<Option<NodeId>> {
    let rest = path.trim();
    if !rest.starts_with('/') {
        return Err(YangError::InvalidValue(format!(
            "target path {path:?} must be absolute"
        )));
    }
    let mut cur: Option<NodeId> = None;
    let mut cur_module: Option<ModuleId> = None;
    for seg in rest.split('/').filter(|s| !s.is_empty()) {
        let (prefix, name) = split_ref(seg);
        // only a written prefix pins the owning module; bare names also
        // reach children spliced in by foreign augments
        let seg_module = match prefix {
            Some(_) => match module_for_prefix(ctx, mid, prefix)? {
                PrefixLookup::Module(m) => Some(m),
                PrefixLookup::Pending => return Ok(None),
            },
            None => None,
        };
        let chain_module = seg_module
            .or(cur_module)
            .unwrap_or_else(|| node::main_module(ctx, mid));
        let first = match cur {
            Some(p) => ctx.nodes[p].child,
            None => ctx.module(chain_module).data,
        };
        let found = find_visible(ctx, first, seg_module, name);
        match found {
            Some(next) => {
                cur_module = Some(node::main_module(ctx, ctx.nodes[next].module));
                cur = Some(next);
            }
            None => return Ok(None),
        }
    }
    Ok(cur)
}

/// Find a named node at a visible level: the chain itself plus the
/// bodies of choice, case and uses nodes. `module` restricts the match
/// when the segment was prefixed.
fn find_visible(
    ctx: &Context,
    first: Option<NodeId>,
    module: Option<ModuleId>,
    name: &str,
) -> Option<NodeId> {
    let matches_module =
        |ctx: &Context, id: NodeId| module.map_or(true, |m| node::main_module(ctx, ctx.nodes[id].module) == m);
    for id in ctx.nodes.chain(first) {
        let n = &ctx.nodes[id];
        match &n.kind {
            NodeKind::Grouping(_) | NodeKind::Augment(_) => continue,
            NodeKind::Uses(_) => {
                if let Some(found) = find_visible(ctx, n.child, module, name) {
                    return Some(found);
                }
            }
            NodeKind::Choice(_) | NodeKind::Case(_) => {
                if n.name == name && matches_module(ctx, id) {
                    return Some(id);
                }
                if let Some(found) = find_visible(ctx, n.child, module, name) {
                    return Some(found);
                }
            }
            _ => {
                if n.name == name && matches_module(ctx, id) {
                    return Some(id);
                }
            }
        }
    }
    None
}

fn attempt_augment(ctx: &mut Context, aug_id: NodeId, unres: &mut Unres) -> YangResult<Attempt> {
    let (path, mid, already) = {
        let n = &ctx.nodes[aug_id];
        match &n.kind {
            NodeKind::Augment(a) => (a.target_path.clone(), n.module, a.target.is_some()),
            _ => return Err(YangError::Internal("augment entry on a non-augment".to_string())),
        }
    };
    if already {
        return Ok(Attempt::Resolved);
    }
    let target = match resolve_schema_nodeid(ctx, mid, &path)? {
        Some(t) => t,
        None => return Ok(Attempt::Retry),
    };
    rewrite::augment::apply_augment(ctx, aug_id, target, unres)?;
    Ok(Attempt::Resolved)
}

fn attempt_choice_default(ctx: &mut Context, choice: NodeId, name: &Sym) -> YangResult<Attempt> {
    let (prefix, local) = split_ref(name);
    if prefix.is_some() {
        // a prefixed default must still resolve to a member of this choice
        match module_for_prefix(ctx, ctx.nodes[choice].module, prefix)? {
            PrefixLookup::Module(_) => {}
            PrefixLookup::Pending => return Ok(Attempt::Retry),
        }
    }
    let found = ctx
        .nodes
        .chain(ctx.nodes[choice].child)
        .find(|&id| ctx.nodes[id].name == local);
    match found {
        Some(case) => {
            if let NodeKind::Choice(b) = &mut ctx.nodes[choice].kind {
                b.default = Some(case);
            }
            Ok(Attempt::Resolved)
        }
        None => Ok(Attempt::Retry),
    }
}

fn attempt_list_keys(ctx: &mut Context, list: NodeId, expr: &Sym) -> YangResult<Attempt> {
    let list_cfg = ctx.nodes[list].config;
    let mut keys = Vec::new();
    for token in expr.split_whitespace() {
        let found = node::find_data_child(ctx, Some(list), ctx.nodes[list].module, token);
        let key = match found {
            Some(k) => k,
            None => return Ok(Attempt::Retry),
        };
        if !matches!(ctx.nodes[key].kind, NodeKind::Leaf(_)) {
            return Err(YangError::InvalidValue(format!(
                "key {token:?} of list {} is not a leaf",
                node::schema_path(ctx, list)
            )));
        }
        if keys.contains(&key) {
            return Err(YangError::DuplicateIdentifier(format!(
                "key {token:?} listed twice in list {}",
                node::schema_path(ctx, list)
            )));
        }
        if ctx.nodes[key].config != list_cfg && !node::in_grouping(ctx, list) {
            return Err(YangError::InvalidValue(format!(
                "key {token:?} of list {} differs in config",
                node::schema_path(ctx, list)
            )));
        }
        keys.push(key);
    }
    if keys.is_empty() {
        return Err(YangError::InvalidValue(format!(
            "empty key in list {}",
            node::schema_path(ctx, list)
        )));
    }
    if let NodeKind::List(b) = &mut ctx.nodes[list].kind {
        b.keys = keys;
    }
    Ok(Attempt::Resolved)
}

fn attempt_list_unique(
    ctx: &mut Context,
    list: NodeId,
    expr: &Sym,
    slot: usize,
) -> YangResult<Attempt> {
    let mid = ctx.nodes[list].module;
    let mut leaves = Vec::new();
    for token in expr.split_whitespace() {
        let mut cur = Some(list);
        for seg in token.split('/').filter(|s| !s.is_empty()) {
            let (_, name) = split_ref(seg);
            match node::find_data_child(ctx, cur, mid, name) {
                Some(next) => cur = Some(next),
                None => return Ok(Attempt::Retry),
            }
        }
        let leaf = match cur {
            Some(l) if l != list => l,
            _ => return Ok(Attempt::Retry),
        };
        if !matches!(ctx.nodes[leaf].kind, NodeKind::Leaf(_)) {
            return Err(YangError::InvalidValue(format!(
                "unique part {token:?} of list {} is not a leaf",
                node::schema_path(ctx, list)
            )));
        }
        if leaves.contains(&leaf) {
            return Err(YangError::DuplicateIdentifier(format!(
                "unique part {token:?} repeated in list {}",
                node::schema_path(ctx, list)
            )));
        }
        leaves.push(leaf);
    }
    if let NodeKind::List(b) = &mut ctx.nodes[list].kind {
        b.uniques[slot] = leaves;
    }
    Ok(Attempt::Resolved)
}

// ---- default value checking ------------------------------------------------

fn attempt_type_default(ctx: &mut Context, mid: ModuleId, owner: &TypeOwner) -> YangResult<Attempt> {
    let t = owner.get(ctx);
    if !t.is_resolved() {
        return Ok(Attempt::Retry);
    }
    if let TypeInfo::Identityref { base: None, .. } = &t.info {
        return Ok(Attempt::Retry);
    }
    let value = match owner.default_of(ctx) {
        Some(v) => v.clone(),
        None => return Ok(Attempt::Resolved),
    };
    match check_value(ctx, mid, t, &value) {
        Ok(()) => Ok(Attempt::Resolved),
        Err(YangError::UnresolvedReference(_)) => Ok(Attempt::Retry),
        Err(e) => Err(e),
    }
}

/// Check a literal value against a resolved type. Used for schema
/// defaults and instance data alike; `mid` scopes prefix resolution of
/// identityref values.
pub(crate) fn check_value(
    ctx: &Context,
    mid: ModuleId,
    t: &YangType,
    value: &str,
) -> YangResult<()> {
    let bad = || YangError::InvalidValue(format!("{value:?} is not a valid {} value", t.name));
    match &t.info {
        TypeInfo::None => match t.base {
            TypeBase::Bool => match value {
                "true" | "false" => Ok(()),
                _ => Err(bad()),
            },
            TypeBase::Empty => {
                if value.is_empty() {
                    Ok(())
                } else {
                    Err(bad())
                }
            }
            _ => Ok(()),
        },
        TypeInfo::Num { range } => {
            let v: i128 = value.trim().parse().map_err(|_| bad())?;
            let (lo, hi) = t
                .base
                .integer_bounds()
                .ok_or_else(|| YangError::Internal("numeric without bounds".to_string()))?;
            if v < lo || v > hi {
                return Err(bad());
            }
            if let Some(r) = range {
                let parts = typ::parse_range_expr(&r.expr, None)?;
                if !typ::range_contains(&parts, lo, hi, v) {
                    return Err(bad());
                }
            }
            Ok(())
        }
        TypeInfo::Dec64 { digits, range, .. } => {
            let v = typ::parse_dec64(value, *digits).ok_or_else(bad)?;
            if let Some(r) = range {
                let (lo, hi) = typ::dec64_bounds();
                let parts = typ::parse_range_expr(&r.expr, Some(*digits))?;
                if !typ::range_contains(&parts, lo, hi, v) {
                    return Err(bad());
                }
            }
            Ok(())
        }
        TypeInfo::Str { length, .. } => {
            if let Some(l) = length {
                let n = value.chars().count() as i128;
                let parts = typ::parse_range_expr(&l.expr, None)?;
                if !typ::range_contains(&parts, 0, u64::MAX as i128, n) {
                    return Err(bad());
                }
            }
            Ok(())
        }
        TypeInfo::Binary { length } => {
            let clean: Vec<u8> = value.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
            if !clean
                .iter()
                .all(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/' || *b == b'=')
            {
                return Err(bad());
            }
            if let Some(l) = length {
                let padding = clean.iter().rev().take_while(|&&b| b == b'=').count();
                let n = (clean.len() / 4 * 3).saturating_sub(padding) as i128;
                let parts = typ::parse_range_expr(&l.expr, None)?;
                if !typ::range_contains(&parts, 0, u64::MAX as i128, n) {
                    return Err(bad());
                }
            }
            Ok(())
        }
        TypeInfo::Enumeration { enums } => {
            if enums.iter().any(|e| e.name == value) {
                Ok(())
            } else {
                Err(bad())
            }
        }
        TypeInfo::Bits { bits } => {
            let mut seen = HashSet::new();
            for part in value.split_whitespace() {
                if !bits.iter().any(|b| b.name == part) {
                    return Err(bad());
                }
                if !seen.insert(part) {
                    return Err(bad());
                }
            }
            Ok(())
        }
        TypeInfo::Identityref { base, .. } => {
            let base = base.ok_or_else(|| {
                YangError::Internal("identityref value check before base resolution".to_string())
            })?;
            let ident = match find_identity(ctx, mid, value)? {
                Some(i) => i,
                None => {
                    return Err(YangError::UnresolvedReference(format!(
                        "identity {value:?} not loaded yet"
                    )))
                }
            };
            // the value must be derived from the base, not the base itself
            let mut walk = ctx.module(ident.module).identities[ident.index].base;
            while let Some(cur) = walk {
                if cur == base {
                    return Ok(());
                }
                walk = ctx.module(cur.module).identities[cur.index].base;
            }
            Err(bad())
        }
        TypeInfo::Leafref { target, .. } => match target {
            Some(t_id) => match ctx.nodes[*t_id].leaf_type() {
                Some(inner) => check_value(ctx, mid, inner, value),
                None => Ok(()),
            },
            // unresolved target (typedef or unused grouping): accepted
            None => Ok(()),
        },
        TypeInfo::InstanceId { .. } => Ok(()),
        TypeInfo::Union { types } => {
            for member in types {
                if check_value(ctx, mid, member, value).is_ok() {
                    return Ok(());
                }
            }
            Err(bad())
        }
        TypeInfo::Raw(_) => Err(YangError::Internal("value check on an unresolved type".to_string())),
    }
}
