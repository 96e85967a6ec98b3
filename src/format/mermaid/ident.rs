// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MermaidIdentError {
    Empty,
    ContainsWhitespace,
    InvalidChar { ch: char },
}

impl fmt::Display for MermaidIdentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("must not be empty"),
            Self::ContainsWhitespace => f.write_str("must not contain whitespace"),
            Self::InvalidChar { ch } => write!(f, "contains invalid character: '{ch}'"),
        }
    }
}

impl std::error::Error for MermaidIdentError {}

pub(super) fn validate_mermaid_ident(ident: &str) -> Result<(), MermaidIdentError> {
    if ident.is_empty() {
        return Err(MermaidIdentError::Empty);
    }
    if ident.chars().any(|c| c.is_whitespace()) {
        return Err(MermaidIdentError::ContainsWhitespace);
    }
    if let Some(ch) = ident.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(MermaidIdentError::InvalidChar { ch });
    }
    Ok(())
}

/// Map an arbitrary scene id onto a Mermaid-safe identifier.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`. The result always
/// passes [`validate_mermaid_ident`]; uniqueness across a document is the
/// compiler's job (it suffixes collisions).
pub(super) fn sanitize_mermaid_ident(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{sanitize_mermaid_ident, validate_mermaid_ident, MermaidIdentError};

    #[test]
    fn validate_rejects_bad_idents() {
        assert_eq!(validate_mermaid_ident(""), Err(MermaidIdentError::Empty));
        assert_eq!(
            validate_mermaid_ident("a b"),
            Err(MermaidIdentError::ContainsWhitespace)
        );
        assert_eq!(
            validate_mermaid_ident("a-b"),
            Err(MermaidIdentError::InvalidChar { ch: '-' })
        );
        assert_eq!(validate_mermaid_ident("scene_1"), Ok(()));
    }

    #[test]
    fn sanitize_always_yields_a_valid_ident() {
        for raw in ["plain", "two words", "dash-id", "кириллица", "[odd]"] {
            let ident = sanitize_mermaid_ident(raw);
            assert_eq!(validate_mermaid_ident(&ident), Ok(()), "raw: {raw}");
        }
        assert_eq!(sanitize_mermaid_ident("two words"), "two_words");
        assert_eq!(sanitize_mermaid_ident("a-b"), "a_b");
    }
}
