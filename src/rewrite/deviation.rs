//! Deviation application and toggling.
//!
//! The first application stores a snapshot of the target's deviatable
//! properties (or, for `not-supported`, the unlinked node's old
//! position). Toggling swaps the snapshot with the live values, so
//! `switch_deviations` is its own inverse.

use std::mem;

use log::{debug, info};

use crate::context::Context;
use crate::error::{YangError, YangResult};
use crate::resolver::{self, Unres};
use crate::rewrite;
use crate::schema::node::{self, NodeKind};
use crate::schema::typ::TypeInfo;
use crate::schema::{
    Deviate, DeviateKind, DeviationOrig, ExternalKind, ModuleId, NodeId, PropSnapshot,
};

/// Resolver entry point: resolve the target and apply. `false` means
/// the target is not visible yet and the entry should be retried.
pub(crate) fn attempt_deviation(
    ctx: &mut Context,
    mid: ModuleId,
    dev_idx: usize,
    _unres: &mut Unres,
) -> YangResult<bool> {
    let (path, already) = {
        let dev = &ctx.module(mid).deviations[dev_idx];
        (dev.target_path.clone(), dev.applied)
    };
    if already {
        return Ok(true);
    }
    let target = match resolver::resolve_schema_nodeid(ctx, mid, &path)? {
        Some(t) => t,
        None => return Ok(false),
    };
    let self_main = node::main_module(ctx, mid);
    let target_main = node::main_module(ctx, ctx.nodes[target].module);
    if self_main == target_main {
        return Err(YangError::DeviationOfOwnModule(format!(
            "deviation {} in module {}",
            path,
            ctx.module(self_main).name
        )));
    }

    apply_deviation(ctx, mid, dev_idx, target)?;

    // bookkeeping: the target knows it is deviated and by whom, and a
    // deviating module is implemented by definition
    ctx.module_mut(target_main).deviated = true;
    rewrite::augment::add_external_import(ctx, target_main, self_main, ExternalKind::ViaDeviation);
    ctx.force_implemented(self_main)?;
    info!(
        "module {} deviates {} in {}",
        ctx.module(self_main).name,
        path,
        ctx.module(target_main).name
    );
    Ok(true)
}

fn apply_deviation(
    ctx: &mut Context,
    mid: ModuleId,
    dev_idx: usize,
    target: NodeId,
) -> YangResult<()> {
    let not_supported = ctx.module(mid).deviations[dev_idx]
        .deviates
        .first()
        .map(|d| d.kind == DeviateKind::NotSupported)
        .unwrap_or(false);

    let orig = if not_supported {
        let parent = unlink_not_supported(ctx, target)?;
        DeviationOrig::NotSupported { parent }
    } else {
        let mut snap = snapshot(ctx, target);
        let deviates = mem::take(&mut ctx.module_mut(mid).deviations[dev_idx].deviates);
        let result = deviates
            .iter()
            .try_for_each(|dv| apply_deviate(ctx, mid, target, dv));
        ctx.module_mut(mid).deviations[dev_idx].deviates = deviates;
        result?;
        // the snapshot keeps the pre-deviation type only when a type
        // deviate exists, so toggling swaps the right things
        let replaces_type = ctx.module(mid).deviations[dev_idx]
            .deviates
            .iter()
            .any(|d| d.typ.is_some());
        if !replaces_type {
            snap.typ = None;
        }
        DeviationOrig::Properties(Box::new(snap))
    };

    let dev = &mut ctx.module_mut(mid).deviations[dev_idx];
    dev.orig = Some(orig);
    dev.target = Some(target);
    dev.applied = true;
    Ok(())
}

/// Unlink the target node; it stays allocated so the deviation can be
/// switched off again.
fn unlink_not_supported(ctx: &mut Context, target: NodeId) -> YangResult<Option<NodeId>> {
    if let Some(parent) = ctx.nodes[target].parent {
        if let NodeKind::List(b) = &ctx.nodes[parent].kind {
            if b.keys.contains(&target) {
                return Err(YangError::NotSupportedRemovesKey(format!(
                    "leaf {}",
                    node::schema_path(ctx, target)
                )));
            }
        }
    }
    let parent = ctx.nodes[target].parent;
    match parent {
        Some(p) => {
            if let Some(head) = ctx.nodes[p].child {
                let new_head = ctx.nodes.unlink_from_chain(head, target);
                ctx.nodes[p].child = new_head;
            }
        }
        None => {
            let main = node::main_module(ctx, ctx.nodes[target].module);
            if let Some(head) = ctx.module(main).data {
                let new_head = ctx.nodes.unlink_from_chain(head, target);
                ctx.module_mut(main).data = new_head;
            }
        }
    }
    Ok(parent)
}

fn relink_not_supported(ctx: &mut Context, target: NodeId, parent: Option<NodeId>) {
    match parent {
        Some(p) => {
            let head = ctx.nodes[p].child;
            let head = ctx.nodes.append_to_chain(head, target);
            ctx.nodes[target].parent = Some(p);
            ctx.nodes[p].child = Some(head);
        }
        None => {
            let main = node::main_module(ctx, ctx.nodes[target].module);
            let head = ctx.module(main).data;
            let head = ctx.nodes.append_to_chain(head, target);
            ctx.module_mut(main).data = Some(head);
        }
    }
}

fn snapshot(ctx: &Context, target: NodeId) -> PropSnapshot {
    let n = &ctx.nodes[target];
    let mut snap = PropSnapshot {
        config: n.config,
        config_set: n.config_set,
        mandatory: n.mandatory,
        mandatory_set: n.mandatory_set,
        musts: n.musts().to_vec(),
        ..PropSnapshot::default()
    };
    match &n.kind {
        NodeKind::Leaf(b) => {
            snap.units = b.units.clone();
            snap.default = b.default.clone();
            snap.typ = Some(b.typ.clone());
        }
        NodeKind::LeafList(b) => {
            snap.units = b.units.clone();
            snap.typ = Some(b.typ.clone());
            snap.min = b.min;
            snap.max = b.max;
            snap.min_set = b.min_set;
            snap.max_set = b.max_set;
        }
        NodeKind::List(b) => {
            snap.uniques = b.uniques.clone();
            snap.uniques_raw = b.uniques_raw.clone();
            snap.min = b.min;
            snap.max = b.max;
            snap.min_set = b.min_set;
            snap.max_set = b.max_set;
        }
        NodeKind::Choice(b) => snap.choice_default = b.default,
        _ => {}
    }
    snap
}

fn apply_deviate(
    ctx: &mut Context,
    mid: ModuleId,
    target: NodeId,
    dv: &Deviate,
) -> YangResult<()> {
    let kw = dv.kind;
    let path = node::schema_path(ctx, target);
    let wrong_kind = |prop: &str| -> YangError {
        YangError::InvalidValue(format!(
            "deviate {} of {prop} does not apply to {path}",
            kw.as_str()
        ))
    };

    if let Some(units) = &dv.units {
        let slot = match &mut ctx.nodes[target].kind {
            NodeKind::Leaf(b) => &mut b.units,
            NodeKind::LeafList(b) => &mut b.units,
            _ => return Err(wrong_kind("units")),
        };
        match kw {
            DeviateKind::Add => {
                if slot.is_some() {
                    return Err(YangError::InvalidValue(format!(
                        "deviate add units on {path}, which already has units"
                    )));
                }
                *slot = Some(units.clone());
            }
            DeviateKind::Replace => {
                if slot.is_none() {
                    return Err(YangError::InvalidValue(format!(
                        "deviate replace units on {path}, which has none"
                    )));
                }
                *slot = Some(units.clone());
            }
            DeviateKind::Delete => {
                if slot.as_ref() != Some(units) {
                    return Err(YangError::InvalidValue(format!(
                        "deviate delete units {units:?} does not match {path}"
                    )));
                }
                *slot = None;
            }
            DeviateKind::NotSupported => unreachable!(),
        }
    }

    if !dv.musts.is_empty() {
        let musts = dv.musts.clone();
        let slot = match &mut ctx.nodes[target].kind {
            NodeKind::Container(b) => &mut b.musts,
            NodeKind::List(b) => &mut b.musts,
            NodeKind::Leaf(b) => &mut b.musts,
            NodeKind::LeafList(b) => &mut b.musts,
            NodeKind::AnyXml(b) => &mut b.musts,
            _ => return Err(wrong_kind("must")),
        };
        match kw {
            DeviateKind::Add => slot.extend(musts),
            DeviateKind::Delete => {
                for must in &musts {
                    let at = slot.iter().position(|m| m.expr == must.expr).ok_or_else(|| {
                        YangError::InvalidValue(format!(
                            "deviate delete must {:?} does not match {path}",
                            must.expr
                        ))
                    })?;
                    slot.remove(at);
                }
            }
            _ => return Err(wrong_kind("must")),
        }
    }

    if !dv.uniques.is_empty() {
        match kw {
            DeviateKind::Add => {
                for unique in &dv.uniques {
                    let leaves = resolve_unique(ctx, target, unique)?;
                    match &mut ctx.nodes[target].kind {
                        NodeKind::List(b) => {
                            b.uniques.push(leaves);
                            b.uniques_raw.push(unique.clone());
                        }
                        _ => return Err(wrong_kind("unique")),
                    }
                }
            }
            DeviateKind::Delete => {
                for unique in &dv.uniques {
                    match &mut ctx.nodes[target].kind {
                        NodeKind::List(b) => {
                            let at = b
                                .uniques_raw
                                .iter()
                                .position(|u| u == unique)
                                .ok_or_else(|| {
                                    YangError::InvalidValue(format!(
                                        "deviate delete unique {unique:?} does not match {path}"
                                    ))
                                })?;
                            b.uniques_raw.remove(at);
                            b.uniques.remove(at);
                        }
                        _ => return Err(wrong_kind("unique")),
                    }
                }
            }
            _ => return Err(wrong_kind("unique")),
        }
    }

    if let Some(default) = &dv.default {
        match &ctx.nodes[target].kind {
            NodeKind::Leaf(_) => {
                let mandatory = ctx.nodes[target].mandatory;
                let slot = match &mut ctx.nodes[target].kind {
                    NodeKind::Leaf(b) => &mut b.default,
                    _ => unreachable!(),
                };
                match kw {
                    DeviateKind::Add => {
                        if slot.is_some() {
                            return Err(YangError::InvalidValue(format!(
                                "deviate add default on {path}, which already has one"
                            )));
                        }
                        if mandatory {
                            return Err(YangError::MandatoryWithDefault(format!("leaf {path}")));
                        }
                        *slot = Some(default.clone());
                    }
                    DeviateKind::Replace => {
                        if slot.is_none() {
                            return Err(YangError::InvalidValue(format!(
                                "deviate replace default on {path}, which has none"
                            )));
                        }
                        *slot = Some(default.clone());
                    }
                    DeviateKind::Delete => {
                        if slot.as_ref() != Some(default) {
                            return Err(YangError::InvalidValue(format!(
                                "deviate delete default {default:?} does not match {path}"
                            )));
                        }
                        *slot = None;
                    }
                    DeviateKind::NotSupported => unreachable!(),
                }
            }
            NodeKind::Choice(_) => {
                let case = ctx
                    .nodes
                    .chain(ctx.nodes[target].child)
                    .find(|&id| ctx.nodes[id].name == default.as_str());
                let slot_filled = match &ctx.nodes[target].kind {
                    NodeKind::Choice(b) => b.default.is_some(),
                    _ => unreachable!(),
                };
                let value = match kw {
                    DeviateKind::Add => {
                        if slot_filled {
                            return Err(YangError::InvalidValue(format!(
                                "deviate add default on {path}, which already has one"
                            )));
                        }
                        Some(case.ok_or_else(|| {
                            YangError::UnresolvedReference(format!(
                                "default case {default} of {path}"
                            ))
                        })?)
                    }
                    DeviateKind::Replace => {
                        if !slot_filled {
                            return Err(YangError::InvalidValue(format!(
                                "deviate replace default on {path}, which has none"
                            )));
                        }
                        Some(case.ok_or_else(|| {
                            YangError::UnresolvedReference(format!(
                                "default case {default} of {path}"
                            ))
                        })?)
                    }
                    DeviateKind::Delete => None,
                    DeviateKind::NotSupported => unreachable!(),
                };
                if let NodeKind::Choice(b) = &mut ctx.nodes[target].kind {
                    b.default = value;
                }
            }
            _ => return Err(wrong_kind("default")),
        }
    }

    if let Some(config) = dv.config {
        match kw {
            DeviateKind::Add => {
                if ctx.nodes[target].config_set {
                    return Err(YangError::InvalidValue(format!(
                        "deviate add config on {path}, which sets config itself"
                    )));
                }
            }
            DeviateKind::Replace => {
                if !ctx.nodes[target].config_set {
                    return Err(YangError::InvalidValue(format!(
                        "deviate replace config on {path}, which does not set config"
                    )));
                }
            }
            _ => return Err(wrong_kind("config")),
        }
        ctx.nodes[target].config = config;
        ctx.nodes[target].config_set = true;
        rewrite::propagate_config(ctx, target)?;
    }

    if let Some(mandatory) = dv.mandatory {
        if !matches!(
            ctx.nodes[target].kind,
            NodeKind::Leaf(_) | NodeKind::Choice(_) | NodeKind::AnyXml(_)
        ) {
            return Err(wrong_kind("mandatory"));
        }
        match kw {
            DeviateKind::Add => {
                if ctx.nodes[target].mandatory_set {
                    return Err(YangError::InvalidValue(format!(
                        "deviate add mandatory on {path}, which sets mandatory itself"
                    )));
                }
            }
            DeviateKind::Replace => {
                if !ctx.nodes[target].mandatory_set {
                    return Err(YangError::InvalidValue(format!(
                        "deviate replace mandatory on {path}, which does not set mandatory"
                    )));
                }
            }
            _ => return Err(wrong_kind("mandatory")),
        }
        if mandatory {
            let has_default = match &ctx.nodes[target].kind {
                NodeKind::Leaf(b) => b.default.is_some(),
                NodeKind::Choice(b) => b.default.is_some(),
                _ => false,
            };
            if has_default {
                return Err(YangError::MandatoryWithDefault(format!("{path}")));
            }
        }
        ctx.nodes[target].mandatory = mandatory;
        ctx.nodes[target].mandatory_set = true;
    }

    if dv.min.is_some() || dv.max.is_some() {
        let (min, max) = (dv.min, dv.max);
        let slots = match &mut ctx.nodes[target].kind {
            NodeKind::List(b) => (&mut b.min, &mut b.max, &mut b.min_set, &mut b.max_set),
            NodeKind::LeafList(b) => (&mut b.min, &mut b.max, &mut b.min_set, &mut b.max_set),
            _ => return Err(wrong_kind("min/max-elements")),
        };
        if let Some(v) = min {
            match kw {
                DeviateKind::Add if *slots.2 => {
                    return Err(YangError::InvalidValue(format!(
                        "deviate add min-elements on {path}, which sets it"
                    )))
                }
                DeviateKind::Replace if !*slots.2 => {
                    return Err(YangError::InvalidValue(format!(
                        "deviate replace min-elements on {path}, which does not set it"
                    )))
                }
                DeviateKind::Delete => return Err(wrong_kind("min-elements")),
                _ => {}
            }
            *slots.0 = v;
            *slots.2 = true;
        }
        if let Some(v) = max {
            match kw {
                DeviateKind::Add if *slots.3 => {
                    return Err(YangError::InvalidValue(format!(
                        "deviate add max-elements on {path}, which sets it"
                    )))
                }
                DeviateKind::Replace if !*slots.3 => {
                    return Err(YangError::InvalidValue(format!(
                        "deviate replace max-elements on {path}, which does not set it"
                    )))
                }
                DeviateKind::Delete => return Err(wrong_kind("max-elements")),
                _ => {}
            }
            *slots.1 = v;
            *slots.3 = true;
        }
    }

    if let Some(typ) = &dv.typ {
        if kw != DeviateKind::Replace {
            return Err(wrong_kind("type"));
        }
        if !matches!(ctx.nodes[target].kind, NodeKind::Leaf(_) | NodeKind::LeafList(_)) {
            return Err(wrong_kind("type"));
        }
        let mut new_type = typ.clone();
        resolver::resolve_type_now(ctx, mid, None, &mut new_type)?;
        let old_target = leafref_target(ctx, target);
        set_leaf_type(ctx, target, new_type);
        if let Some(old) = old_target {
            drop_backlink(ctx, old, target);
        }
        if matches!(
            ctx.nodes[target].leaf_type().map(|t| t.base),
            Some(crate::schema::typ::TypeBase::Leafref)
        ) {
            resolver::resolve_leafref_now(ctx, target)?;
        }
    }

    debug!("deviate {} applied to {path}", kw.as_str());
    Ok(())
}

fn resolve_unique(
    ctx: &Context,
    list: NodeId,
    expr: &str,
) -> YangResult<Vec<NodeId>> {
    let mid = ctx.nodes[list].module;
    let mut leaves = Vec::new();
    for token in expr.split_whitespace() {
        let mut cur = Some(list);
        for seg in token.split('/').filter(|s| !s.is_empty()) {
            let name = seg.split_once(':').map(|(_, n)| n).unwrap_or(seg);
            cur = node::find_data_child(ctx, cur, mid, name);
            if cur.is_none() {
                break;
            }
        }
        match cur {
            Some(leaf) if leaf != list && matches!(ctx.nodes[leaf].kind, NodeKind::Leaf(_)) => {
                leaves.push(leaf)
            }
            _ => {
                return Err(YangError::UnresolvedReference(format!(
                    "unique part {token:?} under {}",
                    node::schema_path(ctx, list)
                )))
            }
        }
    }
    Ok(leaves)
}

fn leafref_target(ctx: &Context, id: NodeId) -> Option<NodeId> {
    match ctx.nodes[id].leaf_type() {
        Some(t) => match &t.info {
            TypeInfo::Leafref { target, .. } => *target,
            _ => None,
        },
        None => None,
    }
}

fn set_leaf_type(ctx: &mut Context, id: NodeId, typ: crate::schema::typ::YangType) {
    match &mut ctx.nodes[id].kind {
        NodeKind::Leaf(b) => b.typ = typ,
        NodeKind::LeafList(b) => b.typ = typ,
        _ => {}
    }
}

fn drop_backlink(ctx: &mut Context, target: NodeId, from: NodeId) {
    match &mut ctx.nodes[target].kind {
        NodeKind::Leaf(b) => b.backlinks.retain(|&l| l != from),
        NodeKind::LeafList(b) => b.backlinks.retain(|&l| l != from),
        _ => {}
    }
}

/// Toggle every deviation `mid` defines: applied ones are reverted,
/// reverted ones re-applied. The operation is its own inverse.
pub(crate) fn switch_module_deviations(ctx: &mut Context, mid: ModuleId) -> YangResult<()> {
    let count = ctx.module(mid).deviations.len();
    for dev_idx in 0..count {
        toggle_deviation(ctx, mid, dev_idx)?;
    }
    recompute_deviated_flags(ctx);
    Ok(())
}

fn toggle_deviation(ctx: &mut Context, mid: ModuleId, dev_idx: usize) -> YangResult<()> {
    let (target, applied, orig) = {
        let dev = &mut ctx.module_mut(mid).deviations[dev_idx];
        let target = match dev.target {
            Some(t) => t,
            None => return Ok(()),
        };
        (target, dev.applied, dev.orig.take())
    };
    let orig = match orig {
        Some(o) => o,
        None => return Ok(()),
    };
    let orig = match orig {
        DeviationOrig::NotSupported { parent } => {
            if applied {
                relink_not_supported(ctx, target, parent);
            } else {
                let parent = unlink_not_supported(ctx, target)?;
                return put_back(ctx, mid, dev_idx, DeviationOrig::NotSupported { parent }, !applied);
            }
            DeviationOrig::NotSupported { parent }
        }
        DeviationOrig::Properties(mut snap) => {
            swap_props(ctx, target, &mut snap)?;
            DeviationOrig::Properties(snap)
        }
    };
    put_back(ctx, mid, dev_idx, orig, !applied)
}

fn put_back(
    ctx: &mut Context,
    mid: ModuleId,
    dev_idx: usize,
    orig: DeviationOrig,
    applied: bool,
) -> YangResult<()> {
    let dev = &mut ctx.module_mut(mid).deviations[dev_idx];
    dev.orig = Some(orig);
    dev.applied = applied;
    Ok(())
}

/// Exchange the snapshot's property set with the node's live one.
fn swap_props(ctx: &mut Context, target: NodeId, snap: &mut PropSnapshot) -> YangResult<()> {
    {
        let n = &mut ctx.nodes[target];
        mem::swap(&mut snap.config, &mut n.config);
        mem::swap(&mut snap.config_set, &mut n.config_set);
        mem::swap(&mut snap.mandatory, &mut n.mandatory);
        mem::swap(&mut snap.mandatory_set, &mut n.mandatory_set);
        match &mut n.kind {
            NodeKind::Leaf(b) => {
                mem::swap(&mut snap.units, &mut b.units);
                mem::swap(&mut snap.default, &mut b.default);
                mem::swap(&mut snap.musts, &mut b.musts);
            }
            NodeKind::LeafList(b) => {
                mem::swap(&mut snap.units, &mut b.units);
                mem::swap(&mut snap.musts, &mut b.musts);
                mem::swap(&mut snap.min, &mut b.min);
                mem::swap(&mut snap.max, &mut b.max);
                mem::swap(&mut snap.min_set, &mut b.min_set);
                mem::swap(&mut snap.max_set, &mut b.max_set);
            }
            NodeKind::List(b) => {
                mem::swap(&mut snap.musts, &mut b.musts);
                mem::swap(&mut snap.uniques, &mut b.uniques);
                mem::swap(&mut snap.uniques_raw, &mut b.uniques_raw);
                mem::swap(&mut snap.min, &mut b.min);
                mem::swap(&mut snap.max, &mut b.max);
                mem::swap(&mut snap.min_set, &mut b.min_set);
                mem::swap(&mut snap.max_set, &mut b.max_set);
            }
            NodeKind::Container(b) => mem::swap(&mut snap.musts, &mut b.musts),
            NodeKind::AnyXml(b) => mem::swap(&mut snap.musts, &mut b.musts),
            NodeKind::Choice(b) => mem::swap(&mut snap.choice_default, &mut b.default),
            _ => {}
        }
    }
    if let Some(snap_typ) = snap.typ.take() {
        let old_target = leafref_target(ctx, target);
        let live = match &mut ctx.nodes[target].kind {
            NodeKind::Leaf(b) => mem::replace(&mut b.typ, snap_typ),
            NodeKind::LeafList(b) => mem::replace(&mut b.typ, snap_typ),
            _ => return Err(YangError::Internal("type snapshot on a non-leaf".to_string())),
        };
        if let Some(old) = old_target {
            drop_backlink(ctx, old, target);
        }
        if let Some(new) = leafref_target(ctx, target) {
            match &mut ctx.nodes[new].kind {
                NodeKind::Leaf(b) => {
                    if !b.backlinks.contains(&target) {
                        b.backlinks.push(target);
                    }
                }
                NodeKind::LeafList(b) => {
                    if !b.backlinks.contains(&target) {
                        b.backlinks.push(target);
                    }
                }
                _ => {}
            }
        }
        snap.typ = Some(live);
    }
    rewrite::propagate_config(ctx, target)?;
    Ok(())
}

/// Revert the applied deviations of one (sub)module; used by teardown,
/// where re-applying reverted ones would be wrong.
pub(crate) fn revert_applied(ctx: &mut Context, mid: ModuleId) -> YangResult<()> {
    let count = ctx.module(mid).deviations.len();
    let mut touched = false;
    for dev_idx in 0..count {
        if ctx.module(mid).deviations[dev_idx].applied {
            toggle_deviation(ctx, mid, dev_idx)?;
            touched = true;
        }
    }
    if touched {
        recompute_deviated_flags(ctx);
    }
    Ok(())
}

/// A module is `deviated` while any applied deviation targets it.
fn recompute_deviated_flags(ctx: &mut Context) {
    let module_ids = ctx.module_ids();
    let mut deviated: Vec<ModuleId> = Vec::new();
    for mid in &module_ids {
        for dev in &ctx.module(*mid).deviations {
            if dev.applied {
                if let Some(target) = dev.target {
                    deviated.push(node::main_module(ctx, ctx.nodes[target].module));
                }
            }
        }
    }
    for mid in module_ids {
        let flag = deviated.contains(&mid);
        ctx.module_mut(mid).deviated = flag;
    }
}
