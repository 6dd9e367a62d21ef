//! Reader for the compact YANG text syntax (RFC 6020 §6).
//!
//! Produces the abstract [`Statement`] tree. String arguments get the
//! double-quote escape handling and the §6.1.3 indentation stripping
//! here, so the builder only ever sees final argument values.

use crate::error::{YangError, YangResult};
use crate::parser::statement::{Keyword, Statement};

/// Parse a complete module or submodule into its statement tree.
pub fn parse(text: &str) -> YangResult<Statement> {
    let mut cursor = Cursor::new(text);
    cursor.skip_trivia()?;
    let stmt = cursor.read_statement()?;
    cursor.skip_trivia()?;
    if !cursor.is_eof() {
        return Err(YangError::UnexpectedChar(format!(
            "trailing input after the {} statement on line {}",
            stmt.keyword, cursor.line
        )));
    }
    if !matches!(stmt.keyword, Keyword::Module | Keyword::Submodule) {
        return Err(YangError::UnexpectedStatementInContext(format!(
            "expected module or submodule, found {} on line {}",
            stmt.keyword, stmt.line
        )));
    }
    Ok(stmt)
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    /// 0-based column in display columns (tab advances to the next
    /// multiple of eight)
    col: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Cursor {
            src,
            pos: 0,
            line: 1,
            col: 0,
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut it = self.src[self.pos..].chars();
        it.next();
        it.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        match c {
            '\n' => {
                self.line += 1;
                self.col = 0;
            }
            '\t' => self.col = (self.col / 8 + 1) * 8,
            _ => self.col += 1,
        }
        Some(c)
    }

    /// Skip whitespace and both comment forms.
    fn skip_trivia(&mut self) -> YangResult<()> {
        loop {
            while self.peek().is_some_and(|c| c.is_whitespace()) {
                self.advance();
            }
            if self.peek() == Some('/') && self.peek2() == Some('/') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
            } else if self.peek() == Some('/') && self.peek2() == Some('*') {
                let start_line = self.line;
                self.advance();
                self.advance();
                loop {
                    if self.is_eof() {
                        return Err(YangError::UnterminatedString(format!(
                            "comment opened on line {start_line} never closes"
                        )));
                    }
                    if self.peek() == Some('*') && self.peek2() == Some('/') {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
            } else {
                return Ok(());
            }
        }
    }

    fn read_identifier(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {
                self.advance();
            }
            _ => return None,
        }
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            self.advance();
        }
        Some(&self.src[start..self.pos])
    }

    fn read_statement(&mut self) -> YangResult<Statement> {
        let line = self.line;
        let ident = self.read_identifier().ok_or_else(|| {
            YangError::UnexpectedChar(format!(
                "expected a statement keyword on line {}, found {:?}",
                self.line,
                self.peek().map(String::from).unwrap_or_default()
            ))
        })?;

        // prefixed keyword means a vendor extension statement
        let keyword = if self.peek() == Some(':') {
            self.advance();
            let name = self.read_identifier().ok_or_else(|| {
                YangError::UnexpectedChar(format!(
                    "bad extension keyword after {ident:?} on line {line}"
                ))
            })?;
            Keyword::Extension {
                prefix: ident.to_string(),
                name: name.to_string(),
            }
        } else {
            Keyword::from_name(ident).ok_or_else(|| {
                YangError::UnexpectedStatementInContext(format!(
                    "unknown statement {ident:?} on line {line}"
                ))
            })?
        };

        self.skip_trivia()?;
        let arg = self.read_argument()?;
        self.skip_trivia()?;

        let mut stmt = Statement::new(keyword, arg, line);

        match self.peek() {
            Some(';') => {
                self.advance();
            }
            Some('{') => {
                self.advance();
                if matches!(stmt.keyword, Keyword::Extension { .. }) {
                    // extension bodies are opaque to the loader
                    self.skip_block(line)?;
                } else {
                    loop {
                        self.skip_trivia()?;
                        match self.peek() {
                            Some('}') => {
                                self.advance();
                                break;
                            }
                            None => {
                                return Err(YangError::UnexpectedChar(format!(
                                    "block of {} opened on line {line} never closes",
                                    stmt.keyword
                                )))
                            }
                            _ => stmt.children.push(self.read_statement()?),
                        }
                    }
                }
            }
            other => {
                return Err(YangError::UnexpectedChar(format!(
                    "expected ';' or '{{' after {} on line {}, found {:?}",
                    stmt.keyword,
                    self.line,
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }

        Ok(stmt)
    }

    /// Consume a balanced `{ ... }` body, quote-aware; the opening brace
    /// is already consumed.
    fn skip_block(&mut self, open_line: usize) -> YangResult<()> {
        let mut depth = 1usize;
        while depth > 0 {
            self.skip_trivia()?;
            match self.peek() {
                None => {
                    return Err(YangError::UnexpectedChar(format!(
                        "block opened on line {open_line} never closes"
                    )))
                }
                Some('{') => {
                    depth += 1;
                    self.advance();
                }
                Some('}') => {
                    depth -= 1;
                    self.advance();
                }
                Some('"') | Some('\'') => {
                    self.read_quoted()?;
                }
                _ => {
                    self.advance();
                }
            }
        }
        Ok(())
    }

    /// Read the optional statement argument: a quoted string sequence
    /// joined by `+`, or a bare token.
    fn read_argument(&mut self) -> YangResult<Option<String>> {
        match self.peek() {
            Some('"') | Some('\'') => {
                let mut value = self.read_quoted()?;
                loop {
                    self.skip_trivia()?;
                    if self.peek() == Some('+') {
                        self.advance();
                        self.skip_trivia()?;
                        match self.peek() {
                            Some('"') | Some('\'') => value.push_str(&self.read_quoted()?),
                            _ => {
                                return Err(YangError::UnexpectedChar(format!(
                                    "expected a quoted string after '+' on line {}",
                                    self.line
                                )))
                            }
                        }
                    } else {
                        break;
                    }
                }
                Ok(Some(value))
            }
            Some(';') | Some('{') | Some('}') | None => Ok(None),
            Some(_) => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == ';' || c == '{' || c == '}' {
                        break;
                    }
                    if c == '/' && (self.peek2() == Some('/') || self.peek2() == Some('*')) {
                        break;
                    }
                    self.advance();
                }
                Ok(Some(self.src[start..self.pos].to_string()))
            }
        }
    }

    fn read_quoted(&mut self) -> YangResult<String> {
        match self.peek() {
            Some('"') => self.read_double_quoted(),
            Some('\'') => self.read_single_quoted(),
            _ => Err(YangError::Internal("read_quoted off a quote".to_string())),
        }
    }

    fn read_single_quoted(&mut self) -> YangResult<String> {
        let start_line = self.line;
        self.advance(); // opening '
        let start = self.pos;
        loop {
            match self.peek() {
                Some('\'') => {
                    let value = self.src[start..self.pos].to_string();
                    self.advance();
                    return Ok(value);
                }
                Some(_) => {
                    self.advance();
                }
                None => {
                    return Err(YangError::UnterminatedString(format!(
                        "string opened on line {start_line} never closes"
                    )))
                }
            }
        }
    }

    fn read_double_quoted(&mut self) -> YangResult<String> {
        let start_line = self.line;
        let quote_col = self.col;
        self.advance(); // opening "
        let mut raw = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => raw.push('\n'),
                        Some('t') => raw.push('\t'),
                        Some('\\') => raw.push('\\'),
                        Some('"') => raw.push('"'),
                        Some(other) => {
                            // undefined escapes pass through literally
                            raw.push('\\');
                            raw.push(other);
                        }
                        None => {
                            return Err(YangError::BadEscape(format!(
                                "dangling backslash in string opened on line {start_line}"
                            )))
                        }
                    }
                }
                Some(c) => {
                    raw.push(c);
                    self.advance();
                }
                None => {
                    return Err(YangError::UnterminatedString(format!(
                        "string opened on line {start_line} never closes"
                    )))
                }
            }
        }
        Ok(strip_indent(&raw, quote_col + 1))
    }
}

/// RFC 6020 §6.1.3: lines after the first lose up to `indent` leading
/// columns of whitespace; a tab counts as eight columns and a tab that
/// crosses the limit leaves its residual spaces in place.
fn strip_indent(text: &str, indent: usize) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if i == 0 {
            out.push_str(line);
            continue;
        }
        let mut budget = indent;
        let mut chars = line.chars();
        loop {
            match chars.clone().next() {
                Some(' ') if budget >= 1 => {
                    budget -= 1;
                    chars.next();
                }
                Some('\t') if budget > 0 => {
                    chars.next();
                    if budget >= 8 {
                        budget -= 8;
                    } else {
                        for _ in 0..(8 - budget) {
                            out.push(' ');
                        }
                        budget = 0;
                    }
                }
                _ => break,
            }
        }
        out.push_str(chars.as_str());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_module() {
        let yang = r#"
            module example {
                namespace "urn:example";
                prefix ex;
                leaf name {
                    type string;
                }
            }
        "#;
        let stmt = parse(yang).unwrap();
        assert_eq!(stmt.keyword, Keyword::Module);
        assert_eq!(stmt.arg.as_deref(), Some("example"));
        assert_eq!(stmt.children.len(), 3);
        let leaf = &stmt.children[2];
        assert_eq!(leaf.keyword, Keyword::Leaf);
        assert_eq!(leaf.children[0].keyword, Keyword::Type);
    }

    #[test]
    fn test_comments_and_quotes() {
        let yang = "module m { // line comment\n  namespace 'urn:m'; /* block\n comment */ prefix \"m\";\n}";
        let stmt = parse(yang).unwrap();
        assert_eq!(stmt.children.len(), 2);
        assert_eq!(stmt.children[0].arg.as_deref(), Some("urn:m"));
    }

    #[test]
    fn test_escapes() {
        let yang = "module m { namespace 'urn:m'; prefix m;\n  description \"a\\tb\\nc \\\"q\\\" \\x\";\n}";
        let stmt = parse(yang).unwrap();
        assert_eq!(
            stmt.children[2].arg.as_deref(),
            Some("a\tb\nc \"q\" \\x")
        );
    }

    #[test]
    fn test_string_concatenation() {
        let yang = "module m { namespace 'urn:' + 'm'; prefix m; }";
        let stmt = parse(yang).unwrap();
        assert_eq!(stmt.children[0].arg.as_deref(), Some("urn:m"));
    }

    #[test]
    fn test_multiline_indent_stripping() {
        let yang = "module m {\n  namespace 'urn:m'; prefix m;\n  description \"line one\n    line two\";\n}";
        let stmt = parse(yang).unwrap();
        // the quote opens at column 14, so 15 columns are stripped and
        // "line two" (indented 4) loses all of its leading whitespace
        assert_eq!(stmt.children[2].arg.as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse("module m { namespace \"urn").unwrap_err();
        assert!(matches!(err, YangError::UnterminatedString(_)));
    }

    #[test]
    fn test_unknown_keyword() {
        let err = parse("module m { frobnicate x; }").unwrap_err();
        assert!(matches!(err, YangError::UnexpectedStatementInContext(_)));
    }

    #[test]
    fn test_extension_statement_is_carried() {
        let yang = "module m { namespace 'urn:m'; prefix m; ex:meta \"v\"; }";
        let stmt = parse(yang).unwrap();
        let ext = &stmt.children[2];
        assert!(matches!(ext.keyword, Keyword::Extension { .. }));
        assert_eq!(ext.arg.as_deref(), Some("v"));
    }
}
