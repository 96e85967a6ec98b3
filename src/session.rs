// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

//! Session service: the in-memory chat state plus its persistence.
//!
//! All UI-facing mutations come through here. Structural changes (chat
//! lifecycle, quest edits, generation results) persist immediately; the
//! free-typed setting field goes through the debounced scheduler and is
//! flushed when focus leaves it.

use std::fmt;
use std::path::Path;

use crate::model::{
    decode_quest_payload, ChatId, ChatSession, MalformedQuestError, QuestDocument, SessionState,
};
use crate::ops::{apply_op, EditError, EditOutcome, QuestOp};
use crate::store::{ChatStore, SaveScheduler, StoreError};

#[derive(Debug)]
pub enum SessionError {
    Store(StoreError),
    MalformedQuest(MalformedQuestError),
    Edit(EditError),
    NoActiveChat,
    ChatNotFound { chat_id: ChatId },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(source) => write!(f, "store error: {source}"),
            Self::MalformedQuest(source) => write!(f, "chat result is not a quest: {source}"),
            Self::Edit(source) => write!(f, "edit rejected: {source}"),
            Self::NoActiveChat => write!(f, "no active chat"),
            Self::ChatNotFound { chat_id } => write!(f, "chat not found (id={chat_id})"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(source) => Some(source),
            Self::MalformedQuest(source) => Some(source),
            Self::Edit(source) => Some(source),
            Self::NoActiveChat | Self::ChatNotFound { .. } => None,
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(source: StoreError) -> Self {
        Self::Store(source)
    }
}

impl From<MalformedQuestError> for SessionError {
    fn from(source: MalformedQuestError) -> Self {
        Self::MalformedQuest(source)
    }
}

impl From<EditError> for SessionError {
    fn from(source: EditError) -> Self {
        Self::Edit(source)
    }
}

pub struct SessionStore {
    state: SessionState,
    store: ChatStore,
    scheduler: SaveScheduler,
}

impl SessionStore {
    /// Load persisted chats, or start empty. A corrupt state file is logged
    /// and replaced rather than blocking startup; only I/O trouble with the
    /// directory itself is fatal.
    pub fn open(store: ChatStore) -> Result<Self, SessionError> {
        let state = match store.load_or_init_state() {
            Ok(state) => state,
            Err(StoreError::Json { path, source }) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %source,
                    "chat state unreadable, starting empty"
                );
                SessionState::default()
            }
            Err(err) => return Err(err.into()),
        };
        let scheduler = SaveScheduler::new(store.clone());
        Ok(Self { state, store, scheduler })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn active_chat(&self) -> Option<&ChatSession> {
        self.state.active_chat()
    }

    /// Create a chat with the next free `chat_N` id and make it active.
    pub fn create_chat(&mut self) -> Result<ChatId, SessionError> {
        let chat_id = self.generate_chat_id();
        let number = self.state.chats().len() + 1;
        let chat = ChatSession::new(chat_id.clone(), format!("Chat {number}"));
        self.state.chats_mut().insert(chat_id.clone(), chat);
        self.state.set_active_chat_id(Some(chat_id.clone()));
        self.save_now()?;
        Ok(chat_id)
    }

    fn generate_chat_id(&self) -> ChatId {
        let mut n = 1usize;
        loop {
            let candidate = format!("chat_{n}");
            let taken = self.state.chats().keys().any(|id| id.as_str() == candidate);
            if !taken {
                match ChatId::new(candidate) {
                    Ok(id) => return id,
                    Err(_) => unreachable!("generated chat ids are always valid"),
                }
            }
            n += 1;
        }
    }

    /// Delete a chat. When the active chat goes away the first remaining
    /// chat takes over; deleting the last chat leaves a fresh empty one.
    pub fn delete_chat(&mut self, chat_id: &ChatId) -> Result<(), SessionError> {
        if self.state.chats_mut().remove(chat_id).is_none() {
            return Err(SessionError::ChatNotFound { chat_id: chat_id.clone() });
        }

        if self.state.active_chat_id() == Some(chat_id)
            || self.state.active_chat().is_none()
        {
            let next = self.state.chats().keys().next().cloned();
            match next {
                Some(next) => self.state.set_active_chat_id(Some(next)),
                None => {
                    self.create_chat()?;
                    return Ok(());
                }
            }
        }

        self.save_now()
    }

    pub fn rename_chat(&mut self, chat_id: &ChatId, title: &str) -> Result<(), SessionError> {
        let chat = self
            .state
            .chats_mut()
            .get_mut(chat_id)
            .ok_or_else(|| SessionError::ChatNotFound { chat_id: chat_id.clone() })?;
        chat.set_title(title);
        self.save_now()
    }

    pub fn switch_chat(&mut self, chat_id: &ChatId) -> Result<(), SessionError> {
        if !self.state.chats().contains_key(chat_id) {
            return Err(SessionError::ChatNotFound { chat_id: chat_id.clone() });
        }
        self.state.set_active_chat_id(Some(chat_id.clone()));
        self.save_now()
    }

    /// Update the active chat's setting text. Persists through the debounce
    /// window so typing does not hammer the disk.
    pub fn set_setting(&mut self, text: &str) -> Result<(), SessionError> {
        let chat = self.state.active_chat_mut().ok_or(SessionError::NoActiveChat)?;
        chat.set_setting(text);
        self.scheduler.schedule(self.state.clone());
        Ok(())
    }

    /// Store a generation result on the active chat and persist immediately.
    pub fn set_result(&mut self, raw: &str) -> Result<(), SessionError> {
        let chat = self.state.active_chat_mut().ok_or(SessionError::NoActiveChat)?;
        chat.set_result(raw);
        self.save_now()
    }

    /// Decode the active chat's result into a quest document.
    ///
    /// An empty result reads as the starter template, so the editor always
    /// has something to edit.
    pub fn active_quest(&self) -> Result<QuestDocument, SessionError> {
        let chat = self.state.active_chat().ok_or(SessionError::NoActiveChat)?;
        if chat.result().trim().is_empty() {
            return Ok(QuestDocument::template());
        }
        Ok(decode_quest_payload(chat.result())?)
    }

    /// The single commit path for quest edits: decode, apply, re-serialize
    /// back onto the chat, persist. The caller re-renders from the returned
    /// document.
    pub fn commit_edit(
        &mut self,
        op: &QuestOp,
    ) -> Result<(QuestDocument, EditOutcome), SessionError> {
        let mut doc = self.active_quest()?;
        let outcome = apply_op(&mut doc, op)?;
        let raw = doc.to_json_string();
        let chat = self.state.active_chat_mut().ok_or(SessionError::NoActiveChat)?;
        chat.set_result(raw);
        self.save_now()?;
        Ok((doc, outcome))
    }

    pub fn export_active_quest(&self, path: &Path) -> Result<(), SessionError> {
        let chat = self.state.active_chat().ok_or(SessionError::NoActiveChat)?;
        self.store.export_quest(path, chat.result())?;
        Ok(())
    }

    /// Block until any pending debounced save has hit disk.
    pub fn flush(&self) {
        self.scheduler.flush();
    }

    fn save_now(&self) -> Result<(), SessionError> {
        self.store.save_state(&self.state)?;
        Ok(())
    }
}
