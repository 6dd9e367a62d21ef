//! Reader for the YIN surface syntax (RFC 6020 §11).
//!
//! YIN is the XML rendering of the same statement tree the YANG text
//! form carries: one element per statement, the argument in an
//! attribute or, for the text-like statements, in a child element.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{YangError, YangResult};
use crate::parser::statement::{Keyword, Statement};

/// Parse a YIN document into the statement tree.
pub fn parse(text: &str) -> YangResult<Statement> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut root: Option<Statement> = None;
    let mut stack: Vec<Statement> = Vec::new();
    // Some(arg_element_name) while inside a <text>/<value> argument child
    let mut capturing: Option<String> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| YangError::UnexpectedChar(format!("malformed YIN document: {e}")))?;
        match event {
            Event::Start(e) => {
                if capturing.is_some() {
                    return Err(YangError::UnexpectedChar(format!(
                        "markup inside an argument element: {}",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                if let Some(parent) = stack.last() {
                    if let Some((arg_name, true)) = parent.keyword.yin_argument() {
                        if e.name().as_ref() == arg_name.as_bytes() {
                            capturing = Some(arg_name.to_string());
                            continue;
                        }
                    }
                }
                match element_statement(&reader, &e)? {
                    Some(stmt) => stack.push(stmt),
                    None => {
                        // vendor extension with a body: skip the subtree
                        let end = e.to_end().into_owned();
                        reader.read_to_end(end.name()).map_err(|e| {
                            YangError::UnexpectedChar(format!("malformed YIN document: {e}"))
                        })?;
                        if let Some(stmt) = extension_statement(&e)? {
                            attach(&mut stack, &mut root, stmt)?;
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if capturing.is_some() {
                    return Err(YangError::UnexpectedChar(
                        "markup inside an argument element".to_string(),
                    ));
                }
                let stmt = match element_statement(&reader, &e)? {
                    Some(stmt) => Some(stmt),
                    None => extension_statement(&e)?,
                };
                if let Some(stmt) = stmt {
                    attach(&mut stack, &mut root, stmt)?;
                }
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| YangError::UnexpectedChar(format!("bad YIN text: {e}")))?;
                if capturing.is_some() {
                    if let Some(parent) = stack.last_mut() {
                        match &mut parent.arg {
                            Some(existing) => existing.push_str(&text),
                            None => parent.arg = Some(text.into_owned()),
                        }
                    }
                } else if !text.trim().is_empty() {
                    return Err(YangError::UnexpectedChar(format!(
                        "stray text in YIN document: {:?}",
                        text.trim()
                    )));
                }
            }
            Event::End(e) => {
                if let Some(name) = &capturing {
                    if e.name().as_ref() == name.as_bytes() {
                        capturing = None;
                        continue;
                    }
                }
                let stmt = stack.pop().ok_or_else(|| {
                    YangError::UnexpectedChar("unbalanced YIN document".to_string())
                })?;
                attach(&mut stack, &mut root, stmt)?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::CData(t) => {
                if capturing.is_some() {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&t).into_owned();
                        match &mut parent.arg {
                            Some(existing) => existing.push_str(&text),
                            None => parent.arg = Some(text),
                        }
                    }
                }
            }
        }
    }

    match root {
        Some(stmt) if matches!(stmt.keyword, Keyword::Module | Keyword::Submodule) => Ok(stmt),
        Some(stmt) => Err(YangError::UnexpectedStatementInContext(format!(
            "expected module or submodule, found {}",
            stmt.keyword
        ))),
        None => Err(YangError::UnexpectedChar("empty YIN document".to_string())),
    }
}

fn attach(
    stack: &mut [Statement],
    root: &mut Option<Statement>,
    stmt: Statement,
) -> YangResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(stmt);
            Ok(())
        }
        None => {
            if root.is_some() {
                return Err(YangError::UnexpectedChar(
                    "multiple top-level elements in YIN document".to_string(),
                ));
            }
            *root = Some(stmt);
            Ok(())
        }
    }
}

/// Build the statement for a known-keyword element, reading its
/// argument attribute. Returns `None` for vendor-extension elements.
fn element_statement(
    reader: &Reader<&[u8]>,
    e: &BytesStart<'_>,
) -> YangResult<Option<Statement>> {
    let raw = e.name();
    let name_bytes = raw.as_ref();
    let name = std::str::from_utf8(name_bytes)
        .map_err(|_| YangError::UnexpectedChar("non-UTF8 element name".to_string()))?;
    if name.contains(':') {
        return Ok(None);
    }
    let keyword = match Keyword::from_name(name) {
        Some(kw) => kw,
        None => return Ok(None),
    };

    let mut arg = None;
    if let Some((arg_name, false)) = keyword.yin_argument() {
        for attr in e.attributes() {
            let attr = attr
                .map_err(|e| YangError::UnexpectedChar(format!("bad YIN attribute: {e}")))?;
            if attr.key.as_ref() == arg_name.as_bytes() {
                let value = attr.unescape_value().map_err(|e| {
                    YangError::UnexpectedChar(format!("bad YIN attribute value: {e}"))
                })?;
                arg = Some(value.into_owned());
            }
        }
        if arg.is_none() {
            return Err(YangError::MissingRequiredChild(format!(
                "YIN element {name} lacks its {arg_name:?} attribute"
            )));
        }
    }
    let line = reader.buffer_position() as usize;
    Ok(Some(Statement::new(keyword, arg, line)))
}

/// Vendor-extension element (prefixed name): carried as an opaque
/// extension statement, body dropped.
fn extension_statement(e: &BytesStart<'_>) -> YangResult<Option<Statement>> {
    let raw = e.name();
    let name = std::str::from_utf8(raw.as_ref())
        .map_err(|_| YangError::UnexpectedChar("non-UTF8 element name".to_string()))?;
    let Some((prefix, local)) = name.split_once(':') else {
        return Ok(None);
    };
    if prefix == "xmlns" {
        return Ok(None);
    }
    Ok(Some(Statement::new(
        Keyword::Extension {
            prefix: prefix.to_string(),
            name: local.to_string(),
        },
        None,
        0,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yin_module() {
        let yin = r#"<?xml version="1.0" encoding="UTF-8"?>
            <module name="example"
                    xmlns="urn:ietf:params:xml:ns:yang:yin:1"
                    xmlns:ex="urn:example">
              <namespace uri="urn:example"/>
              <prefix value="ex"/>
              <description>
                <text>An example module.</text>
              </description>
              <leaf name="host">
                <type name="string"/>
              </leaf>
            </module>"#;
        let stmt = parse(yin).unwrap();
        assert_eq!(stmt.keyword, Keyword::Module);
        assert_eq!(stmt.arg.as_deref(), Some("example"));
        assert_eq!(stmt.children.len(), 4);
        assert_eq!(stmt.children[2].keyword, Keyword::Description);
        assert_eq!(stmt.children[2].arg.as_deref(), Some("An example module."));
        let leaf = &stmt.children[3];
        assert_eq!(leaf.keyword, Keyword::Leaf);
        assert_eq!(leaf.children[0].arg.as_deref(), Some("string"));
    }

    #[test]
    fn test_yin_missing_argument() {
        let yin = r#"<module xmlns="urn:ietf:params:xml:ns:yang:yin:1"><namespace uri="u"/></module>"#;
        let err = parse(yin).unwrap_err();
        assert!(matches!(err, YangError::MissingRequiredChild(_)));
    }
}
