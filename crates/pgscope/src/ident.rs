//! SQL identifier validation and quoting.
//!
//! Table and column names arrive as data (scope table names, filter keys, record
//! keys), so every one of them goes through [`Ident::parse`] before it reaches SQL
//! text.
//!
//! - Unquoted parts are validated against: `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts allow any characters except NUL and `?` and escape `"` as `""`
//!
//! `?` is the placeholder marker of compiled statements, so it cannot appear in
//! identifier text either.
//!
//! Rendering always quotes each part, so `createdAt` stays `"createdAt"` instead of
//! being folded to lower case by PostgreSQL.

use crate::error::{ConnectorError, ConnectorResult};

/// A SQL identifier (column, table, or schema name), split on dots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// Parse an identifier string, supporting dotted and quoted forms.
    ///
    /// - Dotted: `schema.table.column`
    /// - Quoted: `"CamelCase"."UserTable"`
    /// - Mixed: `public."UserTable".id`
    pub fn parse(s: &str) -> ConnectorResult<Self> {
        if s.is_empty() {
            return Err(ConnectorError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(ConnectorError::validation(
                "Identifier cannot contain NUL character",
            ));
        }
        if s.contains('?') {
            return Err(ConnectorError::validation(format!(
                "'?' is not allowed in identifier '{s}'"
            )));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(ConnectorError::validation(format!(
                                "Trailing '.' in identifier '{s}'"
                            )));
                        }
                    }
                    Some(c) => {
                        return Err(ConnectorError::validation(format!(
                            "Expected '.' between identifier parts in '{s}', got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') => {
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                name.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => {
                            return Err(ConnectorError::validation(format!(
                                "Unclosed quoted identifier '{s}'"
                            )));
                        }
                    }
                }
                if name.is_empty() {
                    return Err(ConnectorError::validation("Empty quoted identifier"));
                }
                parts.push(name);
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                let valid = if name.is_empty() {
                    c == '_' || c.is_ascii_alphabetic()
                } else {
                    c == '_' || c == '$' || c.is_ascii_alphanumeric()
                };
                if !valid {
                    return Err(ConnectorError::validation(format!(
                        "Invalid character '{c}' in identifier '{s}'"
                    )));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(ConnectorError::validation(format!(
                    "Empty identifier segment in '{s}'"
                )));
            }
            parts.push(name);
        }

        Ok(Self { parts })
    }

    /// Render the identifier as quoted SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::with_capacity(self.parts.iter().map(|p| p.len() + 3).sum());
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push('"');
            for ch in part.chars() {
                if ch == '"' {
                    out.push('"');
                }
                out.push(ch);
            }
            out.push('"');
        }
    }
}
