// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

//! Questmap — branching-quest document model, graph compiler, and editor core.
//!
//! The pipeline runs model → compiler → renderer: loosely structured quest
//! JSON decodes into a [`model::QuestDocument`], compiles into Mermaid
//! flowchart text, and renders through the async engine boundary in
//! [`render`]. Edits funnel through [`ops`] and the [`session`] service,
//! which also owns persistence and the generation backend handoff.

pub mod backend;
pub mod format;
pub mod model;
pub mod ops;
pub mod render;
pub mod session;
pub mod store;
pub mod theme;

#[cfg(test)]
mod tests {
    #[test]
    fn sanity() {
        assert_eq!(2 + 2, 4);
    }
}
