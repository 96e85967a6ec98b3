// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

//! Color/stroke tokens fed into the graph compiler.
//!
//! Tokens are CSS color strings because they end up verbatim inside Mermaid
//! `style`/`linkStyle` directives; the external engine interprets them.

use std::{env, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeMode {
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphTheme {
    mode: ThemeMode,
    start_fill: String,
    start_stroke: String,
    start_text: String,
    edge_stroke: String,
}

impl GraphTheme {
    pub fn light() -> Self {
        Self {
            mode: ThemeMode::Light,
            start_fill: "#d4edda".to_owned(),
            start_stroke: "#28a745".to_owned(),
            start_text: "#1b1e21".to_owned(),
            edge_stroke: "#6c757d".to_owned(),
        }
    }

    pub fn dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            start_fill: "#1e4620".to_owned(),
            start_stroke: "#4caf50".to_owned(),
            start_text: "#e8e8e8".to_owned(),
            edge_stroke: "#9e9e9e".to_owned(),
        }
    }

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Light => Self::light(),
            ThemeMode::Dark => Self::dark(),
        }
    }

    /// Resolve the theme from `QUESTMAP_THEME` (`light`/`dark`, absent means
    /// dark) with an optional `QUESTMAP_START_FILL` accent override.
    pub fn from_env() -> Result<Self, ThemeError> {
        let mode = match env_var("QUESTMAP_THEME")? {
            None => ThemeMode::Dark,
            Some(value) => match value.trim() {
                "" | "dark" => ThemeMode::Dark,
                "light" => ThemeMode::Light,
                other => {
                    return Err(ThemeError::InvalidEnv {
                        name: "QUESTMAP_THEME".to_owned(),
                        value: other.to_owned(),
                    });
                }
            },
        };

        let mut theme = Self::for_mode(mode);
        if let Some(value) = env_var("QUESTMAP_START_FILL")? {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                validate_hex_color(trimmed).map_err(|error| ThemeError::InvalidEnv {
                    name: "QUESTMAP_START_FILL".to_owned(),
                    value: format!("{trimmed} ({error})"),
                })?;
                theme.start_fill = trimmed.to_owned();
            }
        }

        Ok(theme)
    }

    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    pub fn start_fill(&self) -> &str {
        &self.start_fill
    }

    pub fn start_stroke(&self) -> &str {
        &self.start_stroke
    }

    pub fn start_text(&self) -> &str {
        &self.start_text
    }

    pub fn edge_stroke(&self) -> &str {
        &self.edge_stroke
    }
}

impl Default for GraphTheme {
    fn default() -> Self {
        Self::dark()
    }
}

fn env_var(name: &str) -> Result<Option<String>, ThemeError> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ThemeError::InvalidEnv {
            name: name.to_owned(),
            value: "<non-unicode>".to_owned(),
        }),
    }
}

fn validate_hex_color(value: &str) -> Result<(), String> {
    let Some(hex) = value.strip_prefix('#') else {
        return Err(format!("invalid hex color: {value} (expected #RRGGBB)"));
    };
    if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(format!("invalid hex color: {value} (expected #RRGGBB)"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub enum ThemeError {
    InvalidEnv { name: String, value: String },
}

impl fmt::Display for ThemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnv { name, value } => write!(f, "invalid env {name}={value}"),
        }
    }
}

impl std::error::Error for ThemeError {}

#[cfg(test)]
mod tests {
    use super::{validate_hex_color, GraphTheme, ThemeMode};

    #[test]
    fn light_and_dark_use_distinct_tokens() {
        let light = GraphTheme::light();
        let dark = GraphTheme::dark();
        assert_eq!(light.mode(), ThemeMode::Light);
        assert_eq!(dark.mode(), ThemeMode::Dark);
        assert_ne!(light.start_fill(), dark.start_fill());
        assert_ne!(light.edge_stroke(), dark.edge_stroke());
    }

    #[test]
    fn hex_validation_accepts_rrggbb_only() {
        assert!(validate_hex_color("#1a2b3c").is_ok());
        assert!(validate_hex_color("1a2b3c").is_err());
        assert!(validate_hex_color("#1a2b3").is_err());
        assert!(validate_hex_color("#1a2b3g").is_err());
    }
}
