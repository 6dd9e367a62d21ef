//! JSON printer for instance data (RFC 7951 member naming).

use serde_json::{json, Map, Value};

use crate::context::Context;
use crate::data::{DataNode, DataTree, PrintFlags};
use crate::error::{YangError, YangResult};
use crate::schema::node::{self, NodeKind};
use crate::schema::typ::TypeBase;
use crate::schema::ModuleId;

/// Print a data tree as JSON. Top-level members and module-boundary
/// crossings are qualified as `module:name`.
pub fn print_data(ctx: &Context, tree: &DataTree, flags: &PrintFlags) -> YangResult<String> {
    let roots: &[DataNode] = if flags.with_siblings {
        &tree.roots
    } else {
        &tree.roots[..tree.roots.len().min(1)]
    };
    let mut top = Map::new();
    emit_level(ctx, roots, None, flags, &mut top)?;
    let value = Value::Object(top);
    let out = if flags.format {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    out.map_err(|e| YangError::Internal(format!("JSON printer: {e}")))
}

/// Emit one sibling level into a JSON object, grouping list and
/// leaf-list instances into arrays.
fn emit_level(
    ctx: &Context,
    nodes: &[DataNode],
    parent_module: Option<ModuleId>,
    flags: &PrintFlags,
    out: &mut Map<String, Value>,
) -> YangResult<()> {
    let mut i = 0usize;
    while i < nodes.len() {
        let data = &nodes[i];
        let schema = &ctx.nodes[data.schema];
        let name = member_name(ctx, data, parent_module);
        match &schema.kind {
            NodeKind::List(_) | NodeKind::LeafList(_) => {
                let mut items = Vec::new();
                let mut j = i;
                while j < nodes.len() && nodes[j].schema == data.schema {
                    items.push(&nodes[j]);
                    j += 1;
                }
                let array: YangResult<Vec<Value>> =
                    items.iter().map(|d| node_value(ctx, d, flags)).collect();
                out.insert(name, Value::Array(array?));
                i = j;
            }
            _ => {
                let value = node_value(ctx, data, flags)?;
                if flags.with_defaults && data.dflt {
                    if let Some(meta) = defaults_metadata(ctx) {
                        out.insert(format!("@{name}"), meta);
                    }
                }
                out.insert(name, value);
                i += 1;
            }
        }
    }
    Ok(())
}

fn member_name(ctx: &Context, data: &DataNode, parent_module: Option<ModuleId>) -> String {
    let schema = &ctx.nodes[data.schema];
    let main = node::main_module(ctx, schema.module);
    let qualify = parent_module != Some(main);
    if qualify {
        format!("{}:{}", ctx.module(main).name, schema.name)
    } else {
        schema.name.to_string()
    }
}

fn defaults_metadata(ctx: &Context) -> Option<Value> {
    ctx.get_module("ietf-netconf-with-defaults", None)?;
    Some(json!({ "ietf-netconf-with-defaults:default": true }))
}

fn node_value(ctx: &Context, data: &DataNode, flags: &PrintFlags) -> YangResult<Value> {
    let schema = &ctx.nodes[data.schema];
    match &schema.kind {
        NodeKind::Leaf(_) | NodeKind::LeafList(_) => {
            Ok(leaf_value(ctx, data))
        }
        NodeKind::AnyXml(_) => Ok(Value::String(
            data.value.clone().unwrap_or_default(),
        )),
        _ => {
            let main = node::main_module(ctx, schema.module);
            let mut obj = Map::new();
            emit_level(ctx, &data.children, Some(main), flags, &mut obj)?;
            Ok(Value::Object(obj))
        }
    }
}

/// RFC 7951 value mapping: 32-bit-and-smaller integers and booleans
/// are native JSON, 64-bit integers and decimal64 stay strings, empty
/// is `[null]`.
fn leaf_value(ctx: &Context, data: &DataNode) -> Value {
    let raw = data.value.clone().unwrap_or_default();
    let base = ctx.nodes[data.schema]
        .leaf_type()
        .map(|t| t.base)
        .unwrap_or(TypeBase::String);
    match base {
        TypeBase::Bool => match raw.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw),
        },
        TypeBase::Empty => Value::Array(vec![Value::Null]),
        TypeBase::Int8 | TypeBase::Int16 | TypeBase::Int32 => raw
            .trim()
            .parse::<i64>()
            .map(|v| json!(v))
            .unwrap_or(Value::String(raw)),
        TypeBase::Uint8 | TypeBase::Uint16 | TypeBase::Uint32 => raw
            .trim()
            .parse::<u64>()
            .map(|v| json!(v))
            .unwrap_or(Value::String(raw)),
        _ => Value::String(raw),
    }
}
