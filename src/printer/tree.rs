//! Tree-view printer.
//!
//! Renders the instantiated data tree the way the usual YANG tooling
//! does: one node per line with config flags, cardinality markers and
//! leaf types, choices in parentheses and cases prefixed by a colon.

use std::fmt::Write;

use crate::context::Context;
use crate::schema::node::NodeKind;
use crate::schema::{ModuleId, NodeId};

pub fn print_module(ctx: &Context, mid: ModuleId) -> String {
    let mut out = String::new();
    let module = ctx.module(mid);
    let _ = writeln!(out, "module: {}", module.name);

    let top: Vec<NodeId> = ctx.nodes.chain(module.data).collect();
    let data: Vec<NodeId> = top
        .iter()
        .copied()
        .filter(|&id| {
            !matches!(
                ctx.nodes[id].kind,
                NodeKind::Grouping(_) | NodeKind::Rpc(_) | NodeKind::Notification(_)
            )
        })
        .collect();
    print_level(ctx, &mut out, &data, "   ");

    let rpcs: Vec<NodeId> = top
        .iter()
        .copied()
        .filter(|&id| matches!(ctx.nodes[id].kind, NodeKind::Rpc(_)))
        .collect();
    if !rpcs.is_empty() {
        let _ = writeln!(out, "rpcs:");
        print_level(ctx, &mut out, &rpcs, "   ");
    }

    let notifs: Vec<NodeId> = top
        .iter()
        .copied()
        .filter(|&id| matches!(ctx.nodes[id].kind, NodeKind::Notification(_)))
        .collect();
    if !notifs.is_empty() {
        let _ = writeln!(out, "notifications:");
        print_level(ctx, &mut out, &notifs, "   ");
    }
    out
}

fn print_level(ctx: &Context, out: &mut String, nodes: &[NodeId], prefix: &str) {
    let visible: Vec<NodeId> = nodes
        .iter()
        .copied()
        .flat_map(|id| flatten(ctx, id))
        .collect();
    for (i, &id) in visible.iter().enumerate() {
        let last = i + 1 == visible.len();
        print_node(ctx, out, id, prefix, last);
    }
}

/// uses nodes are transparent in the tree view
fn flatten(ctx: &Context, id: NodeId) -> Vec<NodeId> {
    match ctx.nodes[id].kind {
        NodeKind::Uses(_) => ctx
            .nodes
            .chain(ctx.nodes[id].child)
            .flat_map(|c| flatten(ctx, c))
            .collect(),
        NodeKind::Grouping(_) | NodeKind::Augment(_) => Vec::new(),
        _ => vec![id],
    }
}

fn print_node(ctx: &Context, out: &mut String, id: NodeId, prefix: &str, last: bool) {
    let node = &ctx.nodes[id];
    let flags = match &node.kind {
        NodeKind::Rpc(_) | NodeKind::Input(_) | NodeKind::Output(_) => "-x",
        NodeKind::Notification(_) => "-n",
        _ if node.config => "rw",
        _ => "ro",
    };

    let label = match &node.kind {
        NodeKind::Choice(_) => {
            let mark = if node.mandatory { "" } else { "?" };
            format!("({}){}", node.name, mark)
        }
        NodeKind::Case(_) => format!(":({})", node.name),
        NodeKind::List(b) => {
            let keys = b
                .keys
                .iter()
                .map(|&k| ctx.nodes[k].name.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            if keys.is_empty() {
                format!("{}*", node.name)
            } else {
                format!("{}* [{keys}]", node.name)
            }
        }
        NodeKind::LeafList(_) => format!("{}*", node.name),
        NodeKind::Leaf(_) => {
            let key = node
                .parent
                .map(|p| match &ctx.nodes[p].kind {
                    NodeKind::List(b) => b.keys.contains(&id),
                    _ => false,
                })
                .unwrap_or(false);
            let mark = if node.mandatory || key { "" } else { "?" };
            format!("{}{}", node.name, mark)
        }
        NodeKind::Container(b) => {
            let mark = if b.presence.is_some() { "!" } else { "" };
            format!("{}{}", node.name, mark)
        }
        NodeKind::AnyXml(_) => {
            let mark = if node.mandatory { "" } else { "?" };
            format!("{}{}", node.name, mark)
        }
        _ => node.name.to_string(),
    };

    let typ = node
        .leaf_type()
        .map(|t| match &t.prefix {
            Some(p) => format!("   {p}:{}", t.name),
            None => format!("   {}", t.name),
        })
        .unwrap_or_default();

    let _ = writeln!(out, "{prefix}+--{flags} {label}{typ}");

    let children: Vec<NodeId> = ctx
        .nodes
        .chain(node.child)
        .flat_map(|c| flatten(ctx, c))
        .collect();
    let child_prefix = if last {
        format!("{prefix}   ")
    } else {
        format!("{prefix}|  ")
    };
    for (i, &child) in children.iter().enumerate() {
        print_node(ctx, out, child, &child_prefix, i + 1 == children.len());
    }
}
