//! YANG text serialisation of the statement tree.

use crate::context::Context;
use crate::parser::statement::{Keyword, Statement};
use crate::schema::ModuleId;

/// Print a sealed module (or submodule) as YANG text.
pub fn print_module(ctx: &Context, mid: ModuleId) -> String {
    let root = super::module_statements(ctx, mid);
    let mut out = String::new();
    write_statement(&mut out, &root, 0);
    out
}

fn write_statement(out: &mut String, stmt: &Statement, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(stmt.keyword.name());
    if let Some(arg) = &stmt.arg {
        out.push(' ');
        out.push_str(&render_arg(&stmt.keyword, arg));
    }
    if stmt.children.is_empty() {
        out.push_str(";\n");
    } else {
        out.push_str(" {\n");
        for child in &stmt.children {
            write_statement(out, child, depth + 1);
        }
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str("}\n");
    }
}

/// Keywords whose argument is free text and always printed quoted.
fn always_quoted(kw: &Keyword) -> bool {
    matches!(
        kw,
        Keyword::Namespace
            | Keyword::Organization
            | Keyword::Contact
            | Keyword::Description
            | Keyword::Reference
            | Keyword::Presence
            | Keyword::Units
            | Keyword::Default
            | Keyword::ErrorMessage
            | Keyword::ErrorAppTag
            | Keyword::Pattern
            | Keyword::Range
            | Keyword::Length
            | Keyword::Must
            | Keyword::When
            | Keyword::Path
            | Keyword::Key
            | Keyword::Unique
            | Keyword::Augment
            | Keyword::Refine
            | Keyword::Deviation
            | Keyword::Enum
    )
}

fn render_arg(kw: &Keyword, arg: &str) -> String {
    if !always_quoted(kw) && is_safe_bare(arg) {
        return arg.to_string();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

/// A token that the reader would re-tokenise unchanged.
fn is_safe_bare(arg: &str) -> bool {
    !arg.is_empty()
        && arg.chars().all(|c| {
            c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '/')
        })
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::parser::Format;

    #[test]
    fn test_print_and_reparse() {
        let yang = r#"
            module printer-check {
              namespace "urn:printer-check";
              prefix pc;
              revision 2024-05-01;

              feature extras;

              typedef percent {
                type uint8 {
                  range "0..100";
                }
                description "Share of a whole.";
              }

              container stats {
                leaf load {
                  type percent;
                  default "10";
                }
                leaf-list tags {
                  type string;
                  max-elements 8;
                }
              }
            }
        "#;
        let mut ctx = Context::default();
        let mid = ctx.parse_module(yang, Format::Yang).unwrap();
        let printed = super::print_module(&ctx, mid);

        let mut ctx2 = Context::default();
        let mid2 = ctx2.parse_module(&printed, Format::Yang).unwrap();
        assert_eq!(ctx.module(mid).name, ctx2.module(mid2).name);
        assert_eq!(
            ctx.module(mid).revision().map(|r| r.to_string()),
            ctx2.module(mid2).revision().map(|r| r.to_string())
        );
        // the reprinted form is already a fixed point
        let printed2 = super::print_module(&ctx2, mid2);
        assert_eq!(printed, printed2);
    }
}
