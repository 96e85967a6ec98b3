// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

//! Mermaid flowchart compilation.
//!
//! Quest documents compile down to a Mermaid-ish `flowchart TD` text that an
//! external layout engine can render. Compilation is pure and deterministic.

mod flowchart;
mod ident;

pub use flowchart::{
    compile_flowchart, CompiledDiagram, EdgeBinding, EDGE_LABEL_MAX_LINES,
    EDGE_LABEL_WRAP_COLUMNS,
};
pub use ident::MermaidIdentError;
