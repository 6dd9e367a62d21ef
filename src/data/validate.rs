//! Instance data validation.
//!
//! Checks leaf values against their resolved types, list key presence
//! and uniqueness, `unique` groups, cardinality bounds and mandatory
//! correctness: every mandatory node reachable from the root has an
//! instance, choices have at most one case, and subtrees below an
//! absent presence container are exempt.

use std::collections::HashMap;

use crate::context::Context;
use crate::data::{DataNode, DataTree};
use crate::error::{YangError, YangResult};
use crate::resolver;
use crate::schema::node::{self, NodeKind};
use crate::schema::{ModuleId, NodeId};

pub fn validate(ctx: &Context, tree: &DataTree) -> YangResult<()> {
    // each main module present at the top level is validated against
    // its own top-level schema chain
    let mut by_module: Vec<(ModuleId, Vec<&DataNode>)> = Vec::new();
    for root in &tree.roots {
        let main = node::main_module(ctx, ctx.nodes[root.schema].module);
        match by_module.iter_mut().find(|(m, _)| *m == main) {
            Some((_, list)) => list.push(root),
            None => by_module.push((main, vec![root])),
        }
    }
    for (main, roots) in by_module {
        validate_level(ctx, ctx.module(main).data, &roots)?;
    }
    Ok(())
}

/// Validate one sibling level: the instances against the schema chain
/// starting at `chain`.
fn validate_level(ctx: &Context, chain: Option<NodeId>, instances: &[&DataNode]) -> YangResult<()> {
    let mut present: HashMap<NodeId, Vec<&DataNode>> = HashMap::new();
    for inst in instances {
        present.entry(inst.schema).or_default().push(inst);
    }

    for (&schema, insts) in &present {
        if node::is_disabled(ctx, schema) {
            return Err(YangError::InvalidValue(format!(
                "{} is disabled by its if-feature",
                node::schema_path(ctx, schema)
            )));
        }
        let n = &ctx.nodes[schema];
        match &n.kind {
            NodeKind::Leaf(b) => {
                if insts.len() > 1 {
                    return Err(YangError::InvalidValue(format!(
                        "leaf {} instantiated {} times",
                        node::schema_path(ctx, schema),
                        insts.len()
                    )));
                }
                check_leaf_value(ctx, schema, &b.typ, insts[0])?;
            }
            NodeKind::LeafList(b) => {
                for inst in insts {
                    check_leaf_value(ctx, schema, &b.typ, inst)?;
                }
                check_count(ctx, schema, insts.len(), b.min, b.max)?;
            }
            NodeKind::Container(_) | NodeKind::AnyXml(_) => {
                if insts.len() > 1 {
                    return Err(YangError::InvalidValue(format!(
                        "{} instantiated {} times",
                        node::schema_path(ctx, schema),
                        insts.len()
                    )));
                }
            }
            NodeKind::List(b) => {
                check_count(ctx, schema, insts.len(), b.min, b.max)?;
                check_list_keys(ctx, schema, insts)?;
            }
            NodeKind::Rpc(_) | NodeKind::Input(_) | NodeKind::Output(_)
            | NodeKind::Notification(_) => {}
            other => {
                return Err(YangError::Internal(format!(
                    "{} node in a data tree",
                    other.keyword()
                )))
            }
        }
    }

    check_mandatory_chain(ctx, chain, &present)?;

    // descend into the containers and list entries
    for (&schema, insts) in &present {
        if matches!(
            ctx.nodes[schema].kind,
            NodeKind::Container(_) | NodeKind::List(_) | NodeKind::Rpc(_) | NodeKind::Input(_)
                | NodeKind::Output(_) | NodeKind::Notification(_)
        ) {
            for inst in insts {
                let children: Vec<&DataNode> = inst.children.iter().collect();
                validate_level(ctx, ctx.nodes[schema].child, &children)?;
            }
        }
    }
    Ok(())
}

fn check_leaf_value(
    ctx: &Context,
    schema: NodeId,
    typ: &crate::schema::typ::YangType,
    inst: &DataNode,
) -> YangResult<()> {
    let value = inst.value.as_deref().unwrap_or("");
    resolver::check_value(ctx, ctx.nodes[schema].module, typ, value).map_err(|e| {
        YangError::InvalidValue(format!("{e} (at {})", node::schema_path(ctx, schema)))
    })
}

fn check_count(ctx: &Context, schema: NodeId, count: usize, min: u32, max: u32) -> YangResult<()> {
    if count < min as usize {
        return Err(YangError::MissingMandatory(format!(
            "{} has {count} instances, min-elements is {min}",
            node::schema_path(ctx, schema)
        )));
    }
    if max != 0 && count > max as usize {
        return Err(YangError::InvalidValue(format!(
            "{} has {count} instances, max-elements is {max}",
            node::schema_path(ctx, schema)
        )));
    }
    Ok(())
}

fn check_list_keys(ctx: &Context, list: NodeId, insts: &[&DataNode]) -> YangResult<()> {
    let (keys, uniques) = match &ctx.nodes[list].kind {
        NodeKind::List(b) => (b.keys.clone(), b.uniques.clone()),
        _ => return Ok(()),
    };
    let mut seen_keys: Vec<Vec<String>> = Vec::new();
    for inst in insts {
        let mut tuple = Vec::new();
        for &key in &keys {
            let value = inst
                .children
                .iter()
                .find(|c| c.schema == key)
                .and_then(|c| c.value.clone());
            match value {
                Some(v) => tuple.push(v),
                None => {
                    return Err(YangError::MissingMandatory(format!(
                        "list {} entry lacks key {}",
                        node::schema_path(ctx, list),
                        ctx.nodes[key].name
                    )))
                }
            }
        }
        if !tuple.is_empty() {
            if seen_keys.contains(&tuple) {
                return Err(YangError::InvalidValue(format!(
                    "list {} has duplicate keys [{}]",
                    node::schema_path(ctx, list),
                    tuple.join(" ")
                )));
            }
            seen_keys.push(tuple);
        }
    }

    // unique groups compare only entries where every part is present
    for unique in &uniques {
        let mut seen: Vec<Vec<String>> = Vec::new();
        for inst in insts {
            let tuple: Option<Vec<String>> = unique
                .iter()
                .map(|&leaf| {
                    inst.children
                        .iter()
                        .find(|c| c.schema == leaf)
                        .and_then(|c| c.value.clone())
                })
                .collect();
            if let Some(tuple) = tuple {
                if seen.contains(&tuple) {
                    return Err(YangError::InvalidValue(format!(
                        "list {} violates unique [{}]",
                        node::schema_path(ctx, list),
                        tuple.join(" ")
                    )));
                }
                seen.push(tuple);
            }
        }
    }
    Ok(())
}

/// Walk a schema sibling chain enforcing mandatory constraints against
/// the instances present at this level.
fn check_mandatory_chain(
    ctx: &Context,
    chain: Option<NodeId>,
    present: &HashMap<NodeId, Vec<&DataNode>>,
) -> YangResult<()> {
    for schema in ctx.nodes.chain(chain) {
        check_mandatory_node(ctx, schema, present)?;
    }
    Ok(())
}

fn check_mandatory_node(
    ctx: &Context,
    schema: NodeId,
    present: &HashMap<NodeId, Vec<&DataNode>>,
) -> YangResult<()> {
    if node::is_disabled(ctx, schema) {
        return Ok(());
    }
    let n = &ctx.nodes[schema];
    match &n.kind {
        NodeKind::Grouping(_) | NodeKind::Augment(_) | NodeKind::Rpc(_)
        | NodeKind::Notification(_) | NodeKind::Input(_) | NodeKind::Output(_) => Ok(()),
        NodeKind::Uses(_) | NodeKind::Case(_) => check_mandatory_chain(ctx, n.child, present),
        NodeKind::Leaf(_) | NodeKind::AnyXml(_) => {
            if n.mandatory && !present.contains_key(&schema) {
                return Err(YangError::MissingMandatory(format!(
                    "{}",
                    node::schema_path(ctx, schema)
                )));
            }
            Ok(())
        }
        NodeKind::LeafList(b) => {
            if !present.contains_key(&schema) && b.min > 0 {
                return Err(YangError::MissingMandatory(format!(
                    "{} has 0 instances, min-elements is {}",
                    node::schema_path(ctx, schema),
                    b.min
                )));
            }
            Ok(())
        }
        NodeKind::List(b) => {
            if !present.contains_key(&schema) && b.min > 0 {
                return Err(YangError::MissingMandatory(format!(
                    "{} has 0 instances, min-elements is {}",
                    node::schema_path(ctx, schema),
                    b.min
                )));
            }
            Ok(())
        }
        NodeKind::Container(b) => {
            if present.contains_key(&schema) {
                // its own level is checked when the instance recurses
                return Ok(());
            }
            if b.presence.is_some() {
                // rule 1: nothing below an absent presence container is
                // required
                return Ok(());
            }
            let empty = HashMap::new();
            check_mandatory_chain(ctx, n.child, &empty)
        }
        NodeKind::Choice(_) => {
            let mut instantiated = 0usize;
            let mut selected: Option<NodeId> = None;
            for branch in ctx.nodes.chain(n.child) {
                if branch_present(ctx, branch, present) {
                    instantiated += 1;
                    selected = Some(branch);
                }
            }
            if instantiated > 1 {
                return Err(YangError::InvalidValue(format!(
                    "choice {} has {instantiated} cases instantiated",
                    node::schema_path(ctx, schema)
                )));
            }
            if instantiated == 0 && n.mandatory {
                return Err(YangError::MissingMandatory(format!(
                    "choice {}",
                    node::schema_path(ctx, schema)
                )));
            }
            if let Some(branch) = selected {
                if matches!(ctx.nodes[branch].kind, NodeKind::Case(_)) {
                    return check_mandatory_chain(ctx, ctx.nodes[branch].child, present);
                }
            }
            Ok(())
        }
    }
}

/// true when any data node of this case (or shorthand member) exists at
/// the level.
fn branch_present(
    ctx: &Context,
    branch: NodeId,
    present: &HashMap<NodeId, Vec<&DataNode>>,
) -> bool {
    match &ctx.nodes[branch].kind {
        NodeKind::Case(_) | NodeKind::Uses(_) | NodeKind::Choice(_) => ctx
            .nodes
            .chain(ctx.nodes[branch].child)
            .any(|c| branch_present(ctx, c, present)),
        NodeKind::Grouping(_) | NodeKind::Augment(_) => false,
        _ => present.contains_key(&branch),
    }
}
