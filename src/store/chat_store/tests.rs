// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::env;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rstest::{fixture, rstest};

use super::{ChatStore, StoreError, WriteDurability};
use crate::model::{ChatId, ChatSession, SessionState};

static TEMP_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

struct TempDir {
    path: std::path::PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let counter = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut path = env::temp_dir();
        path.push(format!("questmap-{prefix}-{}-{nanos}-{counter}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

struct ChatStoreTestCtx {
    tmp: TempDir,
    store: ChatStore,
}

impl ChatStoreTestCtx {
    fn new(prefix: &str) -> Self {
        let tmp = TempDir::new(prefix);
        let store = ChatStore::new(tmp.path().join("data"));
        Self { tmp, store }
    }
}

#[fixture]
fn ctx() -> ChatStoreTestCtx {
    ChatStoreTestCtx::new("chat-store")
}

fn state_with_chat(id: &str, title: &str) -> SessionState {
    let chat_id = ChatId::new(id).unwrap();
    let mut state = SessionState::default();
    state.chats_mut().insert(chat_id.clone(), ChatSession::new(chat_id.clone(), title));
    state.set_active_chat_id(Some(chat_id));
    state
}

#[rstest]
fn save_and_load_round_trips_state(ctx: ChatStoreTestCtx) {
    let state = state_with_chat("chat_1", "First quest");
    ctx.store.save_state(&state).unwrap();

    let loaded = ctx.store.load_state().unwrap();
    assert_eq!(loaded, state);

    // The file carries the legacy wire names on disk.
    let raw = std::fs::read_to_string(ctx.store.chats_path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["activeChatId"], "chat_1");
}

#[rstest]
fn load_or_init_creates_an_empty_state_file(ctx: ChatStoreTestCtx) {
    assert!(!ctx.store.chats_path().exists());

    let state = ctx.store.load_or_init_state().unwrap();
    assert!(state.chats().is_empty());
    assert!(ctx.store.chats_path().is_file());
}

#[rstest]
fn load_state_surfaces_malformed_json(ctx: ChatStoreTestCtx) {
    std::fs::create_dir_all(ctx.store.root()).unwrap();
    std::fs::write(ctx.store.chats_path(), "not json").unwrap();

    match ctx.store.load_state() {
        Err(StoreError::Json { path, .. }) => assert_eq!(path, ctx.store.chats_path()),
        other => panic!("expected json error, got {other:?}"),
    }
}

#[rstest]
fn api_keys_default_to_empty_and_round_trip(ctx: ChatStoreTestCtx) {
    assert!(ctx.store.load_api_keys().unwrap().is_empty());

    let mut keys = BTreeMap::new();
    keys.insert("openrouter".to_owned(), "sk-test".to_owned());
    ctx.store.save_api_keys(&keys).unwrap();

    assert_eq!(ctx.store.load_api_keys().unwrap(), keys);
}

#[rstest]
fn export_quest_normalizes_and_writes(ctx: ChatStoreTestCtx) {
    let out = ctx.tmp.path().join("exports/quest.json");
    let raw = r#"{"scenes":[{"scene_id":"a","text":"Start","choices":[]}]}"#;
    ctx.store.export_quest(&out, raw).unwrap();

    let exported = std::fs::read_to_string(&out).unwrap();
    let json: serde_json::Value = serde_json::from_str(&exported).unwrap();
    assert_eq!(json["start_scene"], "a");
    assert_eq!(json["scenes"][0]["scene_id"], "a");
}

#[rstest]
fn export_quest_refuses_undecodable_results(ctx: ChatStoreTestCtx) {
    let out = ctx.tmp.path().join("quest.json");
    match ctx.store.export_quest(&out, "not a quest") {
        Err(StoreError::InvalidExport { .. }) => {}
        other => panic!("expected invalid export error, got {other:?}"),
    }
    assert!(!out.exists());
}

#[cfg(unix)]
#[rstest]
fn save_refuses_to_write_through_a_symlink(ctx: ChatStoreTestCtx) {
    std::fs::create_dir_all(ctx.store.root()).unwrap();
    let target = ctx.tmp.path().join("elsewhere.json");
    std::fs::write(&target, "{}").unwrap();
    std::os::unix::fs::symlink(&target, ctx.store.chats_path()).unwrap();

    match ctx.store.save_state(&SessionState::default()) {
        Err(StoreError::SymlinkRefused { path }) => assert_eq!(path, ctx.store.chats_path()),
        other => panic!("expected symlink refusal, got {other:?}"),
    }
    // The symlink target is untouched.
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "{}");
}

#[rstest]
fn durable_writes_still_replace_atomically(ctx: ChatStoreTestCtx) {
    let store = ChatStore::new(ctx.store.root()).with_durability(WriteDurability::Durable);
    store.save_state(&state_with_chat("chat_1", "First")).unwrap();
    store.save_state(&state_with_chat("chat_2", "Second")).unwrap();

    let loaded = store.load_state().unwrap();
    assert!(loaded.chats().contains_key(&ChatId::new("chat_2").unwrap()));

    // No temp files left behind.
    let leftovers = std::fs::read_dir(store.root())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp."))
        .count();
    assert_eq!(leftovers, 0);
}

#[rstest]
fn missing_state_file_reads_as_not_found(ctx: ChatStoreTestCtx) {
    match ctx.store.load_state() {
        Err(StoreError::Io { source, .. }) => {
            assert_eq!(source.kind(), io::ErrorKind::NotFound);
        }
        other => panic!("expected io error, got {other:?}"),
    }
}
