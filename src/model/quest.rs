// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::SceneId;

/// A directed, labeled transition from one scene to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    text: String,
    next_scene: SceneId,
}

impl Choice {
    pub fn new(text: impl Into<String>, next_scene: SceneId) -> Self {
        Self {
            text: text.into(),
            next_scene,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn next_scene(&self) -> &SceneId {
        &self.next_scene
    }

    pub fn set_next_scene(&mut self, next_scene: SceneId) {
        self.next_scene = next_scene;
    }
}

/// A narrative beat: descriptive text plus outgoing choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    scene_id: SceneId,
    #[serde(default)]
    text: String,
    #[serde(default)]
    choices: Vec<Choice>,
}

impl Scene {
    pub fn new(scene_id: SceneId, text: impl Into<String>) -> Self {
        Self {
            scene_id,
            text: text.into(),
            choices: Vec::new(),
        }
    }

    pub fn scene_id(&self) -> &SceneId {
        &self.scene_id
    }

    pub fn set_scene_id(&mut self, scene_id: SceneId) {
        self.scene_id = scene_id;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub fn choices_mut(&mut self) -> &mut Vec<Choice> {
        &mut self.choices
    }

    pub fn push_choice(&mut self, choice: Choice) {
        self.choices.push(choice);
    }
}

/// The normalized quest document: an ordered scene list with a resolved start
/// scene and unique scene ids.
///
/// Instances come out of [`decode_quest_payload`] (backend responses or
/// persisted chat text), out of [`QuestDocument::template`] (fresh editor
/// sessions), or out of editor mutations via `ops::apply_op`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestDocument {
    start_scene: SceneId,
    scenes: Vec<Scene>,
}

pub const PLACEHOLDER_SCENE_TEXT: &str = "Describe this scene.";

impl QuestDocument {
    pub fn new(start_scene: SceneId, scenes: Vec<Scene>) -> Self {
        Self {
            start_scene,
            scenes,
        }
    }

    /// Single-scene placeholder document for editing sessions that start with
    /// no quest data.
    pub fn template() -> Self {
        let scene_id = SceneId::new("scene_1").expect("static scene id");
        let scene = Scene::new(scene_id.clone(), PLACEHOLDER_SCENE_TEXT);
        Self {
            start_scene: scene_id,
            scenes: vec![scene],
        }
    }

    pub fn start_scene(&self) -> &SceneId {
        &self.start_scene
    }

    pub fn set_start_scene(&mut self, start_scene: SceneId) {
        self.start_scene = start_scene;
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn scenes_mut(&mut self) -> &mut Vec<Scene> {
        &mut self.scenes
    }

    pub fn scene(&self, scene_id: &SceneId) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.scene_id() == scene_id)
    }

    pub fn scene_mut(&mut self, scene_id: &SceneId) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| s.scene_id() == scene_id)
    }

    pub fn has_scene(&self, scene_id: &SceneId) -> bool {
        self.scene(scene_id).is_some()
    }

    /// All node ids a renderer must produce: declared scene ids in
    /// declaration order, followed by dangling `next_scene` targets in
    /// first-reference order. Each id appears once.
    pub fn renderable_node_ids(&self) -> Vec<SceneId> {
        let mut seen = BTreeSet::new();
        let mut ids = Vec::with_capacity(self.scenes.len());
        for scene in &self.scenes {
            if seen.insert(scene.scene_id().clone()) {
                ids.push(scene.scene_id().clone());
            }
        }
        for scene in &self.scenes {
            for choice in scene.choices() {
                if seen.insert(choice.next_scene().clone()) {
                    ids.push(choice.next_scene().clone());
                }
            }
        }
        ids
    }

    /// A dangling target is a `next_scene` id with no backing scene entry.
    pub fn is_dangling(&self, scene_id: &SceneId) -> bool {
        !self.has_scene(scene_id)
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).expect("quest document serializes")
    }

    pub fn to_json_string_pretty(&self) -> String {
        serde_json::to_string_pretty(self).expect("quest document serializes")
    }
}

#[derive(Debug)]
pub enum MalformedQuestError {
    InvalidJson { source: serde_json::Error },
    NotAnObject,
    MissingScenes,
    NoScenes,
}

impl fmt::Display for MalformedQuestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson { source } => write!(f, "quest payload is not valid JSON: {source}"),
            Self::NotAnObject => f.write_str("quest payload is not a JSON object"),
            Self::MissingScenes => f.write_str("quest payload has no 'scenes' array"),
            Self::NoScenes => f.write_str("quest payload contains no usable scenes"),
        }
    }
}

impl std::error::Error for MalformedQuestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidJson { source } => Some(source),
            _ => None,
        }
    }
}

fn code_fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("static code fence regex")
    })
}

/// Decode a text blob into a normalized [`QuestDocument`].
///
/// The blob may be wrapped in a Markdown code fence (some backends echo the
/// model output verbatim), and may be a JSON-encoded *string* containing the
/// real JSON. Exactly one extra unwrap of such double-encoding is attempted;
/// deeper nesting is rejected as [`MalformedQuestError::NotAnObject`].
pub fn decode_quest_payload(raw: &str) -> Result<QuestDocument, MalformedQuestError> {
    let cleaned = match code_fence_regex().captures(raw) {
        Some(captures) => captures.get(1).map(|m| m.as_str()).unwrap_or(raw),
        None => raw,
    };

    let value: Value = serde_json::from_str(cleaned.trim())
        .map_err(|source| MalformedQuestError::InvalidJson { source })?;

    let value = match value {
        Value::String(inner) => serde_json::from_str(&inner)
            .map_err(|source| MalformedQuestError::InvalidJson { source })?,
        other => other,
    };

    decode_quest_value(&value)
}

/// Normalize an already-parsed JSON value into a [`QuestDocument`].
///
/// Tolerated input damage: scenes with missing/empty ids (dropped), duplicate
/// scene ids (first occurrence wins), choices without a usable `next_scene`
/// (dropped), missing or unresolvable `start_scene` (first scene promoted).
pub fn decode_quest_value(value: &Value) -> Result<QuestDocument, MalformedQuestError> {
    let Value::Object(object) = value else {
        return Err(MalformedQuestError::NotAnObject);
    };

    let Some(Value::Array(raw_scenes)) = object.get("scenes") else {
        return Err(MalformedQuestError::MissingScenes);
    };

    let mut scenes: Vec<Scene> = Vec::with_capacity(raw_scenes.len());
    let mut seen = BTreeSet::<SceneId>::new();
    let mut dropped_duplicates = 0usize;

    for raw_scene in raw_scenes {
        let Value::Object(raw_scene) = raw_scene else {
            continue;
        };
        let Some(scene_id) = raw_scene
            .get("scene_id")
            .and_then(Value::as_str)
            .and_then(|s| SceneId::new(s).ok())
        else {
            continue;
        };
        if !seen.insert(scene_id.clone()) {
            dropped_duplicates += 1;
            continue;
        }

        let text = raw_scene
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let mut scene = Scene::new(scene_id, text);

        if let Some(Value::Array(raw_choices)) = raw_scene.get("choices") {
            for raw_choice in raw_choices {
                let Value::Object(raw_choice) = raw_choice else {
                    continue;
                };
                let Some(next_scene) = raw_choice
                    .get("next_scene")
                    .and_then(Value::as_str)
                    .and_then(|s| SceneId::new(s).ok())
                else {
                    continue;
                };
                let choice_text = raw_choice
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                scene.push_choice(Choice::new(choice_text, next_scene));
            }
        }

        scenes.push(scene);
    }

    if scenes.is_empty() {
        return Err(MalformedQuestError::NoScenes);
    }

    if dropped_duplicates > 0 {
        tracing::debug!(dropped_duplicates, "dropped scenes with duplicate ids");
    }

    let declared_start = object
        .get("start_scene")
        .and_then(Value::as_str)
        .and_then(|s| SceneId::new(s).ok());
    let start_scene = match declared_start {
        Some(start) if seen.contains(&start) => start,
        _ => scenes[0].scene_id().clone(),
    };

    Ok(QuestDocument::new(start_scene, scenes))
}
