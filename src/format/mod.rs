// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

//! Diagram text formats.
//!
//! Currently this module covers the Mermaid flowchart dialect the renderer
//! consumes.

pub mod mermaid;
