// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

//! Core data model.
//!
//! Quest documents (scenes + choices) and the chat-session state that wraps
//! their serialized form.

pub mod ids;
pub mod quest;
pub mod session;

pub use ids::{ChatId, Id, IdError, SceneId};
pub use quest::{
    decode_quest_payload, decode_quest_value, Choice, MalformedQuestError, QuestDocument, Scene,
    PLACEHOLDER_SCENE_TEXT,
};
pub use session::{ChatSession, SessionState};
