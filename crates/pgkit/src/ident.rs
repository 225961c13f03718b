//! SQL identifier validation.
//!
//! Table and column names are spliced into generated SQL, so every name goes
//! through [`Ident`] first.
//!
//! - Unquoted parts must match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts (`"Name"`) allow anything except NUL; `""` escapes a quote
//! - Tables may be dotted (`schema.table`), columns may not

use crate::error::{PgError, PgResult};

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    Unquoted(String),
    Quoted(String),
}

/// A validated SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

impl Ident {
    /// Parse an identifier, supporting dotted and quoted forms.
    pub fn parse(s: &str) -> PgResult<Self> {
        if s.is_empty() {
            return Err(PgError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(PgError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut rest = s;
        loop {
            let (part, tail) = match rest.strip_prefix('"') {
                Some(quoted) => take_quoted(quoted)?,
                None => take_unquoted(rest)?,
            };
            parts.push(part);

            if tail.is_empty() {
                break;
            }
            match tail.strip_prefix('.') {
                Some("") => return Err(PgError::validation("Trailing '.' in identifier")),
                Some(next) => rest = next,
                None => {
                    return Err(PgError::validation(format!(
                        "Expected '.' between identifier parts in '{s}'"
                    )));
                }
            }
        }

        Ok(Self { parts })
    }

    /// Parse a column name: a single unqualified part.
    pub fn column(s: &str) -> PgResult<Self> {
        let ident = Self::parse(s)?;
        if ident.parts.len() != 1 {
            return Err(PgError::validation(format!(
                "Column name must not be qualified: '{s}'"
            )));
        }
        Ok(ident)
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                IdentPart::Unquoted(name) => out.push_str(name),
                IdentPart::Quoted(name) => {
                    out.push('"');
                    out.push_str(&name.replace('"', "\"\""));
                    out.push('"');
                }
            }
        }
        out
    }
}

/// Consume a quoted part (opening quote already stripped).
fn take_quoted(s: &str) -> PgResult<(IdentPart, &str)> {
    let mut name = String::new();
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '"' {
            name.push(c);
            continue;
        }
        if matches!(chars.peek(), Some((_, '"'))) {
            chars.next();
            name.push('"');
            continue;
        }
        if name.is_empty() {
            return Err(PgError::validation("Empty quoted identifier"));
        }
        return Ok((IdentPart::Quoted(name), &s[i + 1..]));
    }
    Err(PgError::validation("Unclosed quoted identifier"))
}

fn take_unquoted(s: &str) -> PgResult<(IdentPart, &str)> {
    let end = s.find(['.', '"']).unwrap_or(s.len());
    let (name, tail) = s.split_at(end);

    let mut chars = name.chars();
    match chars.next() {
        None => return Err(PgError::validation("Empty identifier segment")),
        Some(c) if c != '_' && !c.is_ascii_alphabetic() => {
            return Err(PgError::validation(format!(
                "Invalid identifier start character: '{c}'"
            )));
        }
        Some(_) => {}
    }
    if let Some(c) = chars.find(|c| *c != '_' && *c != '$' && !c.is_ascii_alphanumeric()) {
        return Err(PgError::validation(format!(
            "Invalid character in identifier: '{c}'"
        )));
    }

    Ok((IdentPart::Unquoted(name.to_string()), tail))
}
