//! Tree rewriting: grouping expansion, augment splicing, deviation
//! application and NACM flag inheritance.
//!
//! The resolver drives the first three while draining its queue; NACM
//! inheritance runs once per load, after the queue is empty.

pub mod augment;
pub mod deviation;
pub mod uses;

use crate::context::Context;
use crate::error::{YangError, YangResult};
use crate::schema::node::{self, NodeKind};
use crate::schema::{ModuleId, NodeId};

/// OR-combine NACM flags down the data tree. Children of a grouping
/// definition do not inherit; everything else does.
pub(crate) fn inherit_nacm(ctx: &mut Context, mid: ModuleId) {
    let roots: Vec<NodeId> = ctx.nodes.chain(ctx.module(mid).data).collect();
    for root in roots {
        nacm_dfs(ctx, root, 0);
    }
}

/// OR-combine an inherited flag set into one subtree; used when a
/// subtree is spliced under a new parent after the module-wide walk.
pub(crate) fn inherit_nacm_subtree(ctx: &mut Context, root: NodeId, inherited: u8) {
    nacm_dfs(ctx, root, inherited);
}

fn nacm_dfs(ctx: &mut Context, id: NodeId, inherited: u8) {
    ctx.nodes[id].nacm |= inherited;
    let pass_down = match ctx.nodes[id].kind {
        NodeKind::Grouping(_) => 0,
        _ => ctx.nodes[id].nacm,
    };
    let children: Vec<NodeId> = ctx.nodes.chain(ctx.nodes[id].child).collect();
    for child in children {
        nacm_dfs(ctx, child, pass_down);
    }
}

/// Re-derive the effective config flag below `root` after its own flag
/// changed (refine, deviation, splice into a new parent). Nodes with an
/// explicit `config` keep it, and keeping `config true` under a
/// `config false` parent is an error.
pub(crate) fn propagate_config(ctx: &mut Context, root: NodeId) -> YangResult<()> {
    let parent_cfg = ctx.nodes[root].config;
    let children: Vec<NodeId> = ctx.nodes.chain(ctx.nodes[root].child).collect();
    for child in children {
        if matches!(
            ctx.nodes[child].kind,
            NodeKind::Rpc(_) | NodeKind::Input(_) | NodeKind::Output(_) | NodeKind::Notification(_)
        ) {
            continue;
        }
        if ctx.nodes[child].config_set {
            if ctx.nodes[child].config && !parent_cfg {
                return Err(YangError::InvalidValue(format!(
                    "config true under a config false parent at {}",
                    node::schema_path(ctx, child)
                )));
            }
        } else {
            ctx.nodes[child].config = parent_cfg;
        }
        propagate_config(ctx, child)?;
    }
    Ok(())
}
