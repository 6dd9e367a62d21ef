//! YIN serialisation of the statement tree.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::context::Context;
use crate::error::{YangError, YangResult};
use crate::parser::statement::Statement;
use crate::schema::ModuleId;

const YIN_NS: &str = "urn:ietf:params:xml:ns:yang:yin:1";

/// Print a sealed module (or submodule) as a YIN document.
pub fn print_module(ctx: &Context, mid: ModuleId) -> YangResult<String> {
    let root = super::module_statements(ctx, mid);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(io_err)?;
    write_statement(&mut writer, &root, true, ctx, mid)?;
    let bytes = writer.into_inner();
    String::from_utf8(bytes)
        .map_err(|_| YangError::Internal("YIN printer produced invalid UTF-8".to_string()))
}

fn io_err(e: std::io::Error) -> YangError {
    YangError::Internal(format!("YIN printer: {e}"))
}

fn write_statement(
    writer: &mut Writer<Vec<u8>>,
    stmt: &Statement,
    is_root: bool,
    ctx: &Context,
    mid: ModuleId,
) -> YangResult<()> {
    let name = stmt.keyword.name().to_string();
    let mut start = BytesStart::new(name.clone());
    if is_root {
        start.push_attribute(("xmlns", YIN_NS));
        let module = ctx.module(mid);
        if let Some(ns) = &module.ns {
            start.push_attribute((format!("xmlns:{}", module.prefix).as_str(), ns.as_str()));
        }
    }

    let arg = stmt.keyword.yin_argument();
    let mut text_child: Option<(&'static str, &str)> = None;
    if let (Some((arg_name, as_element)), Some(value)) = (arg, stmt.arg.as_deref()) {
        if as_element {
            text_child = Some((arg_name, value));
        } else {
            start.push_attribute((arg_name, value));
        }
    }

    if stmt.children.is_empty() && text_child.is_none() {
        writer.write_event(Event::Empty(start)).map_err(io_err)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(io_err)?;
    if let Some((arg_name, value)) = text_child {
        writer
            .write_event(Event::Start(BytesStart::new(arg_name)))
            .map_err(io_err)?;
        writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(io_err)?;
        writer
            .write_event(Event::End(BytesEnd::new(arg_name)))
            .map_err(io_err)?;
    }
    for child in &stmt.children {
        write_statement(writer, child, false, ctx, mid)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::parser::Format;

    #[test]
    fn test_yin_round_trip() {
        let yang = r#"
            module yin-check {
              namespace "urn:yin-check";
              prefix yc;
              description "Round trip through the XML form.";
              leaf id {
                type string;
              }
            }
        "#;
        let mut ctx = Context::default();
        let mid = ctx.parse_module(yang, Format::Yang).unwrap();
        let yin = super::print_module(&ctx, mid).unwrap();
        assert!(yin.contains("urn:ietf:params:xml:ns:yang:yin:1"));

        let mut ctx2 = Context::default();
        let mid2 = ctx2.parse_module(&yin, Format::Yin).unwrap();
        assert_eq!(ctx2.module(mid2).name, "yin-check");
        assert_eq!(
            ctx2.module(mid2).dsc.as_deref(),
            Some("Round trip through the XML form.")
        );
    }
}
