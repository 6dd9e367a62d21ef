//! XML reader and printer for instance data.
//!
//! Elements resolve against the loaded schema: top-level elements by
//! their `xmlns` (or, failing that, by a unique top-level name), inner
//! elements through transparent child lookup. Values stay as strings;
//! checking them against types is the validator's job.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::context::Context;
use crate::data::{DataNode, DataTree, PrintFlags};
use crate::error::{YangError, YangResult};
use crate::schema::node::{self, NodeKind};
use crate::schema::NodeId;

/// Parse an XML data document against the loaded schema.
pub fn parse_data(ctx: &Context, text: &str) -> YangResult<DataTree> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut tree = DataTree::default();
    let mut stack: Vec<DataNode> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| YangError::UnexpectedChar(format!("malformed data document: {e}")))?;
        match event {
            Event::Start(e) => {
                let schema = resolve_element(ctx, &stack, &e)?;
                let mut data = DataNode::new(schema);
                if matches!(
                    ctx.nodes[schema].kind,
                    NodeKind::Leaf(_) | NodeKind::LeafList(_) | NodeKind::AnyXml(_)
                ) {
                    // leaves and anyxml close immediately; anyxml keeps
                    // its inner markup verbatim
                    let end = e.to_end().into_owned();
                    let text = reader.read_text(end.name()).map_err(|err| {
                        YangError::UnexpectedChar(format!("malformed data document: {err}"))
                    })?;
                    data.value = Some(text.into_owned());
                    attach(&mut stack, &mut tree, data);
                } else {
                    stack.push(data);
                }
            }
            Event::Empty(e) => {
                let schema = resolve_element(ctx, &stack, &e)?;
                let mut data = DataNode::new(schema);
                if matches!(
                    ctx.nodes[schema].kind,
                    NodeKind::Leaf(_) | NodeKind::LeafList(_)
                ) {
                    data.value = Some(String::new());
                }
                attach(&mut stack, &mut tree, data);
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| YangError::UnexpectedChar(format!("bad data text: {e}")))?;
                if let Some(top) = stack.last_mut() {
                    match &mut top.value {
                        Some(v) => v.push_str(&text),
                        None => top.value = Some(text.into_owned()),
                    }
                } else if !text.trim().is_empty() {
                    return Err(YangError::UnexpectedChar(format!(
                        "stray text {:?} in data document",
                        text.trim()
                    )));
                }
            }
            Event::End(_) => {
                let done = stack.pop().ok_or_else(|| {
                    YangError::UnexpectedChar("unbalanced data document".to_string())
                })?;
                attach(&mut stack, &mut tree, done);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !stack.is_empty() {
        return Err(YangError::UnexpectedChar(
            "data document ends inside an element".to_string(),
        ));
    }
    Ok(tree)
}

fn attach(stack: &mut [DataNode], tree: &mut DataTree, node: DataNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => tree.roots.push(node),
    }
}

fn resolve_element(
    ctx: &Context,
    stack: &[DataNode],
    e: &BytesStart<'_>,
) -> YangResult<NodeId> {
    let raw = e.name();
    let full = std::str::from_utf8(raw.as_ref())
        .map_err(|_| YangError::UnexpectedChar("non-UTF8 element name".to_string()))?;
    let name = full.split_once(':').map(|(_, n)| n).unwrap_or(full);

    match stack.last() {
        Some(parent) => {
            let pschema = parent.schema;
            node::find_data_child(ctx, Some(pschema), ctx.nodes[pschema].module, name)
                .or_else(|| rpc_io_child(ctx, pschema, name))
                .ok_or_else(|| {
                    YangError::InvalidValue(format!(
                        "element {name:?} does not match a child of {}",
                        node::schema_path(ctx, pschema)
                    ))
                })
        }
        None => {
            // top level: prefer the namespace, fall back to a search
            if let Some(ns) = xmlns_of(e)? {
                let mid = ctx.get_module_by_ns(&ns).ok_or_else(|| {
                    YangError::InvalidValue(format!("no module with namespace {ns:?}"))
                })?;
                return node::find_data_child(ctx, None, mid, name).ok_or_else(|| {
                    YangError::InvalidValue(format!(
                        "element {name:?} is not a top-level node of {}",
                        ctx.module(mid).name
                    ))
                });
            }
            for mid in ctx.module_ids() {
                if ctx.module(mid).is_submodule() {
                    continue;
                }
                if let Some(found) = node::find_data_child(ctx, None, mid, name) {
                    return Ok(found);
                }
            }
            Err(YangError::InvalidValue(format!(
                "element {name:?} matches no loaded module"
            )))
        }
    }
}

/// rpc input/output levels are addressable in data documents
fn rpc_io_child(ctx: &Context, parent: NodeId, name: &str) -> Option<NodeId> {
    if !matches!(ctx.nodes[parent].kind, NodeKind::Rpc(_)) {
        return None;
    }
    ctx.nodes
        .chain(ctx.nodes[parent].child)
        .find(|&id| ctx.nodes[id].name == name)
}

fn xmlns_of(e: &BytesStart<'_>) -> YangResult<Option<String>> {
    for attr in e.attributes() {
        let attr =
            attr.map_err(|e| YangError::UnexpectedChar(format!("bad attribute: {e}")))?;
        if attr.key.as_ref() == b"xmlns" {
            let value = attr
                .unescape_value()
                .map_err(|e| YangError::UnexpectedChar(format!("bad attribute value: {e}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Print a data tree as XML.
pub fn print_data(ctx: &Context, tree: &DataTree, flags: &PrintFlags) -> YangResult<String> {
    let mut writer = if flags.format {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };
    let wd = with_defaults_module(ctx, flags);

    let roots: &[DataNode] = if flags.with_siblings {
        &tree.roots
    } else {
        &tree.roots[..tree.roots.len().min(1)]
    };
    for root in roots {
        write_node(ctx, &mut writer, root, true, &wd)?;
    }
    String::from_utf8(writer.into_inner())
        .map_err(|_| YangError::Internal("XML printer produced invalid UTF-8".to_string()))
}

/// Prefix and namespace of ietf-netconf-with-defaults, when loaded.
fn with_defaults_module(ctx: &Context, flags: &PrintFlags) -> Option<(String, String)> {
    if !flags.with_defaults {
        return None;
    }
    let mid = ctx.get_module("ietf-netconf-with-defaults", None)?;
    let module = ctx.module(mid);
    Some((module.prefix.to_string(), module.ns.as_deref()?.to_string()))
}

fn io_err(e: std::io::Error) -> YangError {
    YangError::Internal(format!("XML printer: {e}"))
}

fn write_node(
    ctx: &Context,
    writer: &mut Writer<Vec<u8>>,
    data: &DataNode,
    top: bool,
    wd: &Option<(String, String)>,
) -> YangResult<()> {
    let schema = &ctx.nodes[data.schema];
    let name = schema.name.to_string();
    let mut start = BytesStart::new(name.clone());
    if top {
        let main = node::main_module(ctx, schema.module);
        if let Some(ns) = &ctx.module(main).ns {
            start.push_attribute(("xmlns", ns.as_str()));
        }
    }
    if data.dflt {
        if let Some((prefix, ns)) = wd {
            start.push_attribute((format!("xmlns:{prefix}").as_str(), ns.as_str()));
            start.push_attribute((format!("{prefix}:default").as_str(), "true"));
        }
    }

    let empty_value = data.value.as_deref().map(|v| v.is_empty()).unwrap_or(true);
    if data.children.is_empty() && empty_value {
        writer.write_event(Event::Empty(start)).map_err(io_err)?;
        return Ok(());
    }
    writer.write_event(Event::Start(start)).map_err(io_err)?;
    if let Some(value) = &data.value {
        writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(io_err)?;
    }
    for child in &data.children {
        write_node(ctx, writer, child, false, wd)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(io_err)?;
    Ok(())
}

/// Fill in default values for leaves that are absent under `parent`,
/// marking them as defaulted. Used before printing with defaults.
pub fn add_defaults(ctx: &Context, data: &mut DataNode) {
    let schema_children = ctx.data_children(ctx.nodes[data.schema].module, Some(data.schema));
    for child_schema in schema_children {
        if let NodeKind::Leaf(b) = &ctx.nodes[child_schema].kind {
            if let Some(default) = &b.default {
                let present = data.children.iter().any(|c| c.schema == child_schema);
                if !present && !node::is_disabled(ctx, child_schema) {
                    let mut leaf = DataNode::new(child_schema);
                    leaf.value = Some(default.to_string());
                    leaf.dflt = true;
                    data.children.push(leaf);
                }
            }
        }
    }
    for child in &mut data.children {
        if matches!(
            ctx.nodes[child.schema].kind,
            NodeKind::Container(_) | NodeKind::List(_)
        ) {
            add_defaults(ctx, child);
        }
    }
}
