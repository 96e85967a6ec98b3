// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::ChatId;

/// One chat: the user-entered setting plus the raw result text, which is
/// what later decodes into a quest document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    id: ChatId,
    title: String,
    #[serde(default)]
    setting: String,
    #[serde(default)]
    result: String,
}

impl ChatSession {
    pub fn new(id: ChatId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            setting: String::new(),
            result: String::new(),
        }
    }

    pub fn id(&self) -> &ChatId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn setting(&self) -> &str {
        &self.setting
    }

    pub fn set_setting(&mut self, setting: impl Into<String>) {
        self.setting = setting.into();
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn set_result(&mut self, result: impl Into<String>) {
        self.result = result.into();
    }
}

/// The persisted top-level state: all chats plus which one is active.
///
/// The wire shape (`chats` object keyed by id, camelCase `activeChatId`)
/// matches what earlier builds of the host shell already wrote to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    chats: BTreeMap<ChatId, ChatSession>,
    #[serde(rename = "activeChatId", default)]
    active_chat_id: Option<ChatId>,
}

impl SessionState {
    pub fn chats(&self) -> &BTreeMap<ChatId, ChatSession> {
        &self.chats
    }

    pub fn chats_mut(&mut self) -> &mut BTreeMap<ChatId, ChatSession> {
        &mut self.chats
    }

    pub fn active_chat_id(&self) -> Option<&ChatId> {
        self.active_chat_id.as_ref()
    }

    pub fn set_active_chat_id(&mut self, chat_id: Option<ChatId>) {
        self.active_chat_id = chat_id;
    }

    pub fn active_chat(&self) -> Option<&ChatSession> {
        self.active_chat_id
            .as_ref()
            .and_then(|id| self.chats.get(id))
    }

    pub fn active_chat_mut(&mut self) -> Option<&mut ChatSession> {
        let id = self.active_chat_id.clone()?;
        self.chats.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatSession, SessionState};
    use crate::model::ChatId;

    #[test]
    fn state_serializes_with_legacy_field_names() {
        let chat_id = ChatId::new("chat_1").expect("chat id");
        let mut state = SessionState::default();
        state
            .chats_mut()
            .insert(chat_id.clone(), ChatSession::new(chat_id.clone(), "First"));
        state.set_active_chat_id(Some(chat_id));

        let json = serde_json::to_value(&state).expect("serialize");
        assert_eq!(json["activeChatId"], "chat_1");
        assert_eq!(json["chats"]["chat_1"]["title"], "First");
        assert_eq!(json["chats"]["chat_1"]["setting"], "");
    }

    #[test]
    fn state_tolerates_missing_fields() {
        let state: SessionState = serde_json::from_str("{}").expect("deserialize");
        assert!(state.chats().is_empty());
        assert!(state.active_chat_id().is_none());
    }

    #[test]
    fn active_chat_resolves_through_the_map() {
        let chat_id = ChatId::new("chat_1").expect("chat id");
        let mut state = SessionState::default();
        state
            .chats_mut()
            .insert(chat_id.clone(), ChatSession::new(chat_id.clone(), "First"));

        assert!(state.active_chat().is_none());
        state.set_active_chat_id(Some(chat_id));
        assert_eq!(state.active_chat().map(ChatSession::title), Some("First"));
    }
}
