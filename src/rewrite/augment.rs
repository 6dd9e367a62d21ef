//! Augment application and teardown.
//!
//! Applying an augment splices its child chain onto the target's chain
//! in sibling order; the children keep the augmenting module as their
//! owner, which is what lets teardown find and remove them again. The
//! augment node itself stays in the owning module's augment array for
//! bookkeeping.

use log::debug;

use crate::context::Context;
use crate::error::{YangError, YangResult};
use crate::resolver::Unres;
use crate::rewrite;
use crate::schema::node::{self, NodeKind};
use crate::schema::{ExternalKind, Import, NodeId};

pub(crate) fn apply_augment(
    ctx: &mut Context,
    aug_id: NodeId,
    target: NodeId,
    _unres: &mut Unres,
) -> YangResult<()> {
    let mid = ctx.nodes[aug_id].module;
    let target_is_choice = match &ctx.nodes[target].kind {
        NodeKind::Container(_)
        | NodeKind::List(_)
        | NodeKind::Case(_)
        | NodeKind::Input(_)
        | NodeKind::Output(_)
        | NodeKind::Notification(_) => false,
        NodeKind::Choice(_) => true,
        other => {
            return Err(YangError::InvalidValue(format!(
                "augment target {} is a {}",
                node::schema_path(ctx, target),
                other.keyword()
            )))
        }
    };

    let children: Vec<NodeId> = ctx.nodes.chain(ctx.nodes[aug_id].child).collect();
    for &child in &children {
        if target_is_choice {
            if matches!(ctx.nodes[child].kind, NodeKind::Uses(_) | NodeKind::Choice(_)) {
                return Err(YangError::InvalidValue(format!(
                    "augment of choice {} adds a {}",
                    node::schema_path(ctx, target),
                    ctx.nodes[child].kind.keyword()
                )));
            }
        } else if matches!(ctx.nodes[child].kind, NodeKind::Case(_)) {
            return Err(YangError::InvalidValue(format!(
                "augment adds a case to non-choice {}",
                node::schema_path(ctx, target)
            )));
        }
        let name = ctx.nodes[child].name.clone();
        let level = match &ctx.nodes[target].kind {
            // splicing into a choice or case surfaces at the enclosing
            // real level
            NodeKind::Choice(_) | NodeKind::Case(_) => {
                node::level_chain(ctx, Some(target), mid)
            }
            _ => ctx.nodes[target].child,
        };
        node::check_name_free(ctx, level, mid, &name, None)?;
    }

    debug!(
        "augmenting {} with {} nodes from {}",
        node::schema_path(ctx, target),
        children.len(),
        ctx.module(node::main_module(ctx, mid)).name
    );

    // move the chain: children leave the augment node and join the
    // target, in order
    ctx.nodes[aug_id].child = None;
    for &child in &children {
        let n = &mut ctx.nodes[child];
        n.parent = None;
        n.prev = None;
        n.next = None;
    }
    for &child in &children {
        let head = ctx.nodes[target].child;
        let head = ctx.nodes.append_to_chain(head, child);
        ctx.nodes[child].parent = Some(target);
        ctx.nodes[target].child = Some(head);
    }

    // access-control flags and effective config below the new parent
    let target_nacm = ctx.nodes[target].nacm;
    for &child in &children {
        rewrite::inherit_nacm_subtree(ctx, child, target_nacm);
    }
    for &child in &children {
        if !ctx.nodes[child].config_set {
            ctx.nodes[child].config = ctx.nodes[target].config;
        } else if ctx.nodes[child].config && !ctx.nodes[target].config {
            return Err(YangError::InvalidValue(format!(
                "config true under a config false parent at {}",
                node::schema_path(ctx, child)
            )));
        }
        rewrite::propagate_config(ctx, child)?;
    }

    if let NodeKind::Augment(a) = &mut ctx.nodes[aug_id].kind {
        a.target = Some(target);
        a.spliced = children;
    }

    // cross-module augments are recorded in the target's import table
    // so reverse dependencies stay discoverable
    let aug_main = node::main_module(ctx, mid);
    let target_main = node::main_module(ctx, ctx.nodes[target].module);
    if aug_main != target_main {
        add_external_import(ctx, target_main, aug_main, ExternalKind::ViaAugment);
    }
    Ok(())
}

/// Record module `dep` in `owner`'s import table with an external flag,
/// once.
pub(crate) fn add_external_import(
    ctx: &mut Context,
    owner: crate::schema::ModuleId,
    dep: crate::schema::ModuleId,
    external: ExternalKind,
) {
    let (name, prefix) = {
        let m = ctx.module(dep);
        (m.name.clone(), m.prefix.clone())
    };
    let owner_module = ctx.module_mut(owner);
    let exists = owner_module
        .imports
        .iter()
        .any(|i| i.module == Some(dep) && i.external == external);
    if !exists {
        owner_module.imports.push(Import {
            name,
            prefix,
            revision: None,
            module: Some(dep),
            external,
        });
    }
}

/// Undo one applied augment: unlink its spliced children from the
/// target chain. The children themselves still belong to the
/// augmenting module and are freed with it.
pub(crate) fn remove_augment(ctx: &mut Context, aug_id: NodeId) {
    let (target, spliced) = match &mut ctx.nodes[aug_id].kind {
        NodeKind::Augment(a) => (a.target.take(), std::mem::take(&mut a.spliced)),
        _ => return,
    };
    let target = match target {
        Some(t) => t,
        None => return,
    };
    for child in spliced {
        if ctx.nodes.get(child).is_none() {
            continue;
        }
        if let Some(head) = ctx.nodes[target].child {
            let new_head = ctx.nodes.unlink_from_chain(head, child);
            ctx.nodes[target].child = new_head;
        }
    }
}
