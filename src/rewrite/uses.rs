//! Grouping instantiation.
//!
//! Expanding a `uses` deep-copies the grouping's body under the uses
//! node: the copies belong to the using module, inherit the effective
//! config of the use site, drop the grouping body's NACM flags, and get
//! their leafref targets re-resolved in place. Refines and uses-level
//! augments are applied to the fresh copies.

use std::collections::HashMap;

use log::debug;

use crate::context::Context;
use crate::dict::Sym;
use crate::error::{YangError, YangResult};
use crate::resolver::{Unres, UnresItem};
use crate::rewrite;
use crate::schema::node::{
    self, AnyXmlBody, CaseBody, ChoiceBody, ContainerBody, GroupingBody, InOutBody, LeafBody,
    LeafListBody, ListBody, NodeKind, NotifBody, Refine, RpcBody, SchemaNode, UsesBody,
};
use crate::schema::typ::{TypeBase, TypeInfo};
use crate::schema::{ModuleId, NodeId};

pub(crate) fn expand_uses(
    ctx: &mut Context,
    uses_id: NodeId,
    grp: NodeId,
    unres: &mut Unres,
) -> YangResult<()> {
    let mid = ctx.nodes[uses_id].module;
    let in_grp = node::in_grouping(ctx, uses_id);

    // the copies surface at the uses' own level, so their names must be
    // free there before anything is linked in
    let level_first = node::level_chain(ctx, ctx.nodes[uses_id].parent, mid);
    let grp_children: Vec<NodeId> = ctx.nodes.chain(ctx.nodes[grp].child).collect();
    for &child in &grp_children {
        if matches!(ctx.nodes[child].kind, NodeKind::Grouping(_)) {
            continue;
        }
        let name = ctx.nodes[child].name.clone();
        node::check_name_free(ctx, level_first, mid, &name, Some(uses_id))?;
    }

    debug!(
        "expanding grouping {} at {}",
        ctx.nodes[grp].name,
        node::schema_path(ctx, uses_id)
    );

    let mut map: HashMap<NodeId, NodeId> = HashMap::new();
    for child in grp_children {
        if matches!(ctx.nodes[child].kind, NodeKind::Grouping(_)) {
            continue;
        }
        copy_subtree(ctx, child, uses_id, mid, in_grp, &mut map, unres)?;
    }

    // intra-copy references recorded as old node ids get remapped
    let copies: Vec<NodeId> = map.values().copied().collect();
    for new in copies {
        remap_links(ctx, new, &map);
    }

    let refines = match &ctx.nodes[uses_id].kind {
        NodeKind::Uses(u) => u.refines.clone(),
        _ => Vec::new(),
    };
    for refine in &refines {
        apply_refine(ctx, uses_id, refine)?;
    }

    let augments = match &ctx.nodes[uses_id].kind {
        NodeKind::Uses(u) => u.augments.clone(),
        _ => Vec::new(),
    };
    for aug in augments {
        apply_uses_augment(ctx, uses_id, aug, unres)?;
    }
    Ok(())
}

/// Deep copy one node of the grouping body under `parent`.
fn copy_subtree(
    ctx: &mut Context,
    src: NodeId,
    parent: NodeId,
    mid: ModuleId,
    in_grp: bool,
    map: &mut HashMap<NodeId, NodeId>,
    unres: &mut Unres,
) -> YangResult<NodeId> {
    let parent_cfg = ctx.nodes[parent].config;
    let (header, kind, queue_leafref) = {
        let s = &ctx.nodes[src];
        let effective_cfg = if s.config_set { s.config } else { parent_cfg };
        if s.config_set && s.config && !parent_cfg && !in_grp {
            return Err(YangError::InvalidValue(format!(
                "config true under a config false parent at {}",
                node::schema_path(ctx, parent)
            )));
        }
        let kind = clone_kind(&s.kind);
        let is_leafref = matches!(
            s.leaf_type().map(|t| t.base),
            Some(TypeBase::Leafref)
        );
        (
            (
                s.name.clone(),
                s.dsc.clone(),
                s.reference.clone(),
                s.status,
                effective_cfg,
                s.config_set,
                s.mandatory,
                s.mandatory_set,
                s.iffeatures.clone(),
            ),
            kind,
            is_leafref && !in_grp,
        )
    };

    let mut new = SchemaNode::new(header.0, mid, kind);
    new.dsc = header.1;
    new.reference = header.2;
    new.status = header.3;
    new.config = header.4;
    new.config_set = header.5;
    new.mandatory = header.6;
    new.mandatory_set = header.7;
    new.iffeatures = header.8;
    // NACM flags of the grouping body are not inherited by the copies

    let new_id = ctx.nodes.alloc(new);
    let head = ctx.nodes[parent].child;
    let head = ctx.nodes.append_to_chain(head, new_id);
    ctx.nodes[new_id].parent = Some(parent);
    ctx.nodes[parent].child = Some(head);
    map.insert(src, new_id);

    // a copy still inside a grouping resolves its leafref only when
    // that grouping is itself instantiated
    if queue_leafref {
        unres.push(mid, UnresItem::TypeLeafref { node: new_id });
    }

    let children: Vec<NodeId> = ctx.nodes.chain(ctx.nodes[src].child).collect();
    for child in children {
        if matches!(ctx.nodes[child].kind, NodeKind::Grouping(_)) {
            continue;
        }
        copy_subtree(ctx, child, new_id, mid, in_grp, map, unres)?;
    }
    Ok(new_id)
}

/// Clone a node body for instantiation. Children are copied separately;
/// node-id references (list keys, choice defaults) still point at the
/// originals here and are remapped afterwards.
fn clone_kind(kind: &NodeKind) -> NodeKind {
    match kind {
        NodeKind::Container(b) => NodeKind::Container(ContainerBody {
            presence: b.presence.clone(),
            typedefs: b.typedefs.clone(),
            musts: b.musts.clone(),
            when: b.when.clone(),
        }),
        NodeKind::List(b) => NodeKind::List(ListBody {
            keys: b.keys.clone(),
            uniques: b.uniques.clone(),
            uniques_raw: b.uniques_raw.clone(),
            min: b.min,
            max: b.max,
            min_set: b.min_set,
            max_set: b.max_set,
            ordered_by_user: b.ordered_by_user,
            typedefs: b.typedefs.clone(),
            musts: b.musts.clone(),
            when: b.when.clone(),
        }),
        NodeKind::Leaf(b) => {
            let mut typ = b.typ.clone();
            if let TypeInfo::Leafref { target, .. } = &mut typ.info {
                *target = None;
            }
            NodeKind::Leaf(LeafBody {
                typ,
                units: b.units.clone(),
                default: b.default.clone(),
                musts: b.musts.clone(),
                when: b.when.clone(),
                backlinks: Vec::new(),
            })
        }
        NodeKind::LeafList(b) => {
            let mut typ = b.typ.clone();
            if let TypeInfo::Leafref { target, .. } = &mut typ.info {
                *target = None;
            }
            NodeKind::LeafList(LeafListBody {
                typ,
                units: b.units.clone(),
                musts: b.musts.clone(),
                when: b.when.clone(),
                backlinks: Vec::new(),
                min: b.min,
                max: b.max,
                min_set: b.min_set,
                max_set: b.max_set,
                ordered_by_user: b.ordered_by_user,
            })
        }
        NodeKind::Choice(b) => NodeKind::Choice(ChoiceBody {
            default: b.default,
            when: b.when.clone(),
        }),
        NodeKind::Case(b) => NodeKind::Case(CaseBody { when: b.when.clone() }),
        NodeKind::AnyXml(b) => NodeKind::AnyXml(AnyXmlBody {
            musts: b.musts.clone(),
            when: b.when.clone(),
        }),
        // an expanded uses is copied with its instantiated children;
        // its refines and augments were already applied to the body
        NodeKind::Uses(b) => NodeKind::Uses(UsesBody {
            grouping_name: b.grouping_name.clone(),
            grouping: b.grouping,
            refines: Vec::new(),
            augments: Vec::new(),
            when: b.when.clone(),
        }),
        NodeKind::Grouping(b) => NodeKind::Grouping(GroupingBody {
            typedefs: b.typedefs.clone(),
        }),
        NodeKind::Rpc(b) => NodeKind::Rpc(RpcBody {
            typedefs: b.typedefs.clone(),
        }),
        NodeKind::Input(b) => NodeKind::Input(InOutBody {
            typedefs: b.typedefs.clone(),
        }),
        NodeKind::Output(b) => NodeKind::Output(InOutBody {
            typedefs: b.typedefs.clone(),
        }),
        NodeKind::Notification(b) => NodeKind::Notification(NotifBody {
            typedefs: b.typedefs.clone(),
        }),
        NodeKind::Augment(_) => unreachable!("augment nodes never sit in a grouping body"),
    }
}

/// Point copied list keys, uniques and choice defaults at the copies.
fn remap_links(ctx: &mut Context, id: NodeId, map: &HashMap<NodeId, NodeId>) {
    match &mut ctx.nodes[id].kind {
        NodeKind::List(b) => {
            for key in &mut b.keys {
                if let Some(new) = map.get(key) {
                    *key = *new;
                }
            }
            for unique in &mut b.uniques {
                for leaf in unique {
                    if let Some(new) = map.get(leaf) {
                        *leaf = *new;
                    }
                }
            }
        }
        NodeKind::Choice(b) => {
            if let Some(default) = &mut b.default {
                if let Some(new) = map.get(default) {
                    *default = *new;
                }
            }
        }
        _ => {}
    }
}

/// Locate a refine/augment target below the uses by its descendant
/// schema node id.
fn find_descendant(ctx: &Context, uses_id: NodeId, path: &str) -> Option<NodeId> {
    let mut cur = uses_id;
    for seg in path.split('/').filter(|s| !s.is_empty()) {
        let name = seg.split_once(':').map(|(_, n)| n).unwrap_or(seg);
        cur = node::find_data_child(ctx, Some(cur), ctx.nodes[uses_id].module, name)?;
    }
    if cur == uses_id {
        None
    } else {
        Some(cur)
    }
}

fn apply_refine(ctx: &mut Context, uses_id: NodeId, refine: &Refine) -> YangResult<()> {
    let target = find_descendant(ctx, uses_id, &refine.target_path).ok_or_else(|| {
        YangError::UnresolvedReference(format!(
            "refine target {} under {}",
            refine.target_path,
            node::schema_path(ctx, uses_id)
        ))
    })?;
    let target_kw = ctx.nodes[target].kind.keyword();
    let target_path = node::schema_path(ctx, target);
    let misfit = move |what: &str| -> YangError {
        YangError::UnexpectedStatementInContext(format!(
            "refine {what} on a {target_kw} at {target_path}"
        ))
    };

    if let Some(dsc) = &refine.dsc {
        ctx.nodes[target].dsc = Some(dsc.clone());
    }
    if let Some(reference) = &refine.reference {
        ctx.nodes[target].reference = Some(reference.clone());
    }
    if let Some(presence) = &refine.presence {
        match &mut ctx.nodes[target].kind {
            NodeKind::Container(b) => b.presence = Some(presence.clone()),
            _ => return Err(misfit("presence")),
        }
    }
    if let Some(default) = &refine.default {
        match refine_default(ctx, target, default)? {
            true => {}
            false => return Err(misfit("default")),
        }
    }
    if let Some(mandatory) = refine.mandatory {
        match &ctx.nodes[target].kind {
            NodeKind::Leaf(b) => {
                if mandatory && b.default.is_some() {
                    return Err(YangError::MandatoryWithDefault(format!(
                        "leaf {}",
                        node::schema_path(ctx, target)
                    )));
                }
            }
            NodeKind::Choice(b) => {
                if mandatory && b.default.is_some() {
                    return Err(YangError::MandatoryWithDefault(format!(
                        "choice {}",
                        node::schema_path(ctx, target)
                    )));
                }
            }
            NodeKind::AnyXml(_) => {}
            _ => return Err(misfit("mandatory")),
        }
        let n = &mut ctx.nodes[target];
        n.mandatory = mandatory;
        n.mandatory_set = true;
    }
    if let Some(config) = refine.config {
        let n = &mut ctx.nodes[target];
        n.config = config;
        n.config_set = true;
        rewrite::propagate_config(ctx, target)?;
    }
    if let Some(min) = refine.min {
        match &mut ctx.nodes[target].kind {
            NodeKind::List(b) => {
                b.min = min;
                b.min_set = true;
            }
            NodeKind::LeafList(b) => {
                b.min = min;
                b.min_set = true;
            }
            _ => return Err(misfit("min-elements")),
        }
    }
    if let Some(max) = refine.max {
        match &mut ctx.nodes[target].kind {
            NodeKind::List(b) => {
                b.max = max;
                b.max_set = true;
            }
            NodeKind::LeafList(b) => {
                b.max = max;
                b.max_set = true;
            }
            _ => return Err(misfit("max-elements")),
        }
    }
    if !refine.musts.is_empty() {
        let musts = refine.musts.clone();
        match &mut ctx.nodes[target].kind {
            NodeKind::Container(b) => b.musts.extend(musts),
            NodeKind::List(b) => b.musts.extend(musts),
            NodeKind::Leaf(b) => b.musts.extend(musts),
            NodeKind::LeafList(b) => b.musts.extend(musts),
            NodeKind::AnyXml(b) => b.musts.extend(musts),
            _ => return Err(misfit("must")),
        }
    }
    Ok(())
}

/// Refine `default`: a value on a leaf, a case name on a choice.
fn refine_default(ctx: &mut Context, target: NodeId, default: &Sym) -> YangResult<bool> {
    match &ctx.nodes[target].kind {
        NodeKind::Leaf(_) => {
            if ctx.nodes[target].mandatory {
                return Err(YangError::MandatoryWithDefault(format!(
                    "leaf {}",
                    node::schema_path(ctx, target)
                )));
            }
            if let NodeKind::Leaf(b) = &mut ctx.nodes[target].kind {
                b.default = Some(default.clone());
            }
            Ok(true)
        }
        NodeKind::Choice(_) => {
            if ctx.nodes[target].mandatory {
                return Err(YangError::MandatoryWithDefault(format!(
                    "choice {}",
                    node::schema_path(ctx, target)
                )));
            }
            let case = ctx
                .nodes
                .chain(ctx.nodes[target].child)
                .find(|&id| ctx.nodes[id].name == default.as_str())
                .ok_or_else(|| {
                    YangError::UnresolvedReference(format!(
                        "default case {default} of choice {}",
                        node::schema_path(ctx, target)
                    ))
                })?;
            if let NodeKind::Choice(b) = &mut ctx.nodes[target].kind {
                b.default = Some(case);
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Apply one uses-level augment: its target is relative to the uses.
fn apply_uses_augment(
    ctx: &mut Context,
    uses_id: NodeId,
    aug_id: NodeId,
    unres: &mut Unres,
) -> YangResult<()> {
    let path = match &ctx.nodes[aug_id].kind {
        NodeKind::Augment(a) => a.target_path.clone(),
        _ => return Err(YangError::Internal("uses augment is not an augment".to_string())),
    };
    let target = find_descendant(ctx, uses_id, &path).ok_or_else(|| {
        YangError::UnresolvedReference(format!(
            "augment target {path} under {}",
            node::schema_path(ctx, uses_id)
        ))
    })?;
    rewrite::augment::apply_augment(ctx, aug_id, target, unres)
}
