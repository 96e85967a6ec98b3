// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

use std::fmt;

use async_trait::async_trait;

/// What an engine hands back for a successfully laid-out diagram.
///
/// Engines are free to produce richer artifacts internally; the adapter only
/// needs the final text and the node identifiers the engine recognized, so
/// interactions can be attached to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    pub text: String,
    pub node_idents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine rejected the diagram text.
    Rejected { message: String },
    /// The engine itself failed (crashed, timed out, unreachable).
    Unavailable { message: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { message } => write!(f, "diagram rejected by engine: {message}"),
            Self::Unavailable { message } => write!(f, "diagram engine unavailable: {message}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Boundary to the external layout engine.
///
/// `render` takes finished diagram text and is expected to be cancel-safe;
/// the adapter may drop a render mid-flight when a newer document arrives.
#[async_trait]
pub trait DiagramEngine: Send + Sync {
    async fn render(&self, text: &str) -> Result<RenderedDiagram, EngineError>;
}

/// In-process engine that validates and echoes the diagram text instead of
/// laying it out. Good enough for the CLI and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessEngine;

#[async_trait]
impl DiagramEngine for HeadlessEngine {
    async fn render(&self, text: &str) -> Result<RenderedDiagram, EngineError> {
        let mut lines = text.lines();
        match lines.next() {
            Some("flowchart TD") => {}
            Some(other) => {
                return Err(EngineError::Rejected {
                    message: format!("unsupported diagram header '{other}'"),
                })
            }
            None => {
                return Err(EngineError::Rejected { message: "empty diagram text".to_owned() })
            }
        }

        let mut node_idents = Vec::new();
        for line in lines {
            // Node statements look like `ident["label"]`.
            if let Some(open) = line.find("[\"") {
                let ident = &line[..open];
                if !ident.is_empty() && !ident.contains(' ') {
                    node_idents.push(ident.to_owned());
                }
            }
        }

        Ok(RenderedDiagram { text: text.to_owned(), node_idents })
    }
}
