// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

//! On-disk persistence: the chat store and the debounced save worker.

pub mod chat_store;
pub mod scheduler;

pub use chat_store::{ChatStore, StoreError, WriteDurability};
pub use scheduler::{SaveScheduler, SAVE_DEBOUNCE};
