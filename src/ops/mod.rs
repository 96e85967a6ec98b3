// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

//! Mutation operations for quest documents.
//!
//! Every edit the UI offers funnels through [`apply_op`], which mutates the
//! document in place and reports an [`EditOutcome`] the caller uses to
//! refresh derived state. Operations are pure with respect to everything
//! outside the document: serialization, persistence, and re-rendering are
//! the caller's job.

use std::fmt;

use crate::model::{Choice, IdError, QuestDocument, Scene, SceneId, PLACEHOLDER_SCENE_TEXT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestOp {
    /// Insert a fresh scene with a generated `scene_N` id and placeholder text.
    AddScene,
    EditSceneText {
        scene_id: SceneId,
        text: String,
    },
    /// Rename a scene, rewriting every choice target and the start marker
    /// that pointed at the old id.
    RenameScene {
        scene_id: SceneId,
        new_id: String,
    },
    DeleteScene {
        scene_id: SceneId,
    },
    AddChoice {
        scene_id: SceneId,
        text: String,
        next_scene: SceneId,
    },
    EditChoiceText {
        scene_id: SceneId,
        choice_index: usize,
        text: String,
    },
    DeleteChoice {
        scene_id: SceneId,
        choice_index: usize,
    },
}

/// Which scenes an applied op touched, plus the side effects the caller
/// cannot infer from the op itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    pub added: Vec<SceneId>,
    pub updated: Vec<SceneId>,
    pub removed: Vec<SceneId>,
    /// Set when deleting the start scene forced promotion of another scene.
    pub new_start_scene: Option<SceneId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    SceneNotFound { scene_id: SceneId },
    ChoiceNotFound { scene_id: SceneId, choice_index: usize },
    EmptySceneId,
    InvalidSceneId { reason: IdError },
    SceneIdCollision { scene_id: SceneId },
    UnknownTargetScene { scene_id: SceneId },
    LastScene,
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SceneNotFound { scene_id } => write!(f, "scene not found (id={scene_id})"),
            Self::ChoiceNotFound { scene_id, choice_index } => {
                write!(f, "choice not found (scene={scene_id}, index={choice_index})")
            }
            Self::EmptySceneId => write!(f, "scene id must not be empty"),
            Self::InvalidSceneId { reason } => write!(f, "invalid scene id: {reason}"),
            Self::SceneIdCollision { scene_id } => {
                write!(f, "a scene with id '{scene_id}' already exists")
            }
            Self::UnknownTargetScene { scene_id } => {
                write!(f, "choice target '{scene_id}' is not a declared scene")
            }
            Self::LastScene => write!(f, "cannot delete the only remaining scene"),
        }
    }
}

impl std::error::Error for EditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidSceneId { reason } => Some(reason),
            _ => None,
        }
    }
}

pub fn apply_op(doc: &mut QuestDocument, op: &QuestOp) -> Result<EditOutcome, EditError> {
    match op {
        QuestOp::AddScene => add_scene(doc),
        QuestOp::EditSceneText { scene_id, text } => edit_scene_text(doc, scene_id, text),
        QuestOp::RenameScene { scene_id, new_id } => rename_scene(doc, scene_id, new_id),
        QuestOp::DeleteScene { scene_id } => delete_scene(doc, scene_id),
        QuestOp::AddChoice { scene_id, text, next_scene } => {
            add_choice(doc, scene_id, text, next_scene)
        }
        QuestOp::EditChoiceText { scene_id, choice_index, text } => {
            edit_choice_text(doc, scene_id, *choice_index, text)
        }
        QuestOp::DeleteChoice { scene_id, choice_index } => {
            delete_choice(doc, scene_id, *choice_index)
        }
    }
}

fn add_scene(doc: &mut QuestDocument) -> Result<EditOutcome, EditError> {
    let scene_id = generate_scene_id(doc);
    doc.scenes_mut().push(Scene::new(scene_id.clone(), PLACEHOLDER_SCENE_TEXT));
    Ok(EditOutcome { added: vec![scene_id], ..EditOutcome::default() })
}

/// First unused `scene_N`, counting from 1. Declared scenes and dangling
/// targets both count as taken so a generated id never aliases an existing
/// node.
fn generate_scene_id(doc: &QuestDocument) -> SceneId {
    let taken = doc.renderable_node_ids();
    let mut n = 1usize;
    loop {
        let candidate = format!("scene_{n}");
        if !taken.iter().any(|id| id.as_str() == candidate) {
            match SceneId::new(candidate) {
                Ok(id) => return id,
                Err(_) => unreachable!("generated scene ids are always valid"),
            }
        }
        n += 1;
    }
}

fn edit_scene_text(
    doc: &mut QuestDocument,
    scene_id: &SceneId,
    text: &str,
) -> Result<EditOutcome, EditError> {
    let scene = doc
        .scene_mut(scene_id)
        .ok_or_else(|| EditError::SceneNotFound { scene_id: scene_id.clone() })?;
    scene.set_text(text);
    Ok(EditOutcome { updated: vec![scene_id.clone()], ..EditOutcome::default() })
}

fn rename_scene(
    doc: &mut QuestDocument,
    scene_id: &SceneId,
    new_id: &str,
) -> Result<EditOutcome, EditError> {
    let trimmed = new_id.trim();
    if trimmed.is_empty() {
        return Err(EditError::EmptySceneId);
    }
    let new_id = SceneId::new(trimmed).map_err(|reason| EditError::InvalidSceneId { reason })?;

    if !doc.has_scene(scene_id) {
        return Err(EditError::SceneNotFound { scene_id: scene_id.clone() });
    }
    if new_id == *scene_id {
        return Ok(EditOutcome::default());
    }
    if doc.has_scene(&new_id) {
        return Err(EditError::SceneIdCollision { scene_id: new_id });
    }

    let mut updated = Vec::new();
    for scene in doc.scenes_mut() {
        let mut touched = false;
        if scene.scene_id() == scene_id {
            scene.set_scene_id(new_id.clone());
            touched = true;
        }
        for choice in scene.choices_mut() {
            if choice.next_scene() == scene_id {
                choice.set_next_scene(new_id.clone());
                touched = true;
            }
        }
        if touched {
            updated.push(scene.scene_id().clone());
        }
    }
    if doc.start_scene() == scene_id {
        doc.set_start_scene(new_id.clone());
    }

    Ok(EditOutcome {
        updated,
        removed: vec![scene_id.clone()],
        added: vec![new_id],
        ..EditOutcome::default()
    })
}

fn delete_scene(doc: &mut QuestDocument, scene_id: &SceneId) -> Result<EditOutcome, EditError> {
    if !doc.has_scene(scene_id) {
        return Err(EditError::SceneNotFound { scene_id: scene_id.clone() });
    }
    if doc.scenes().len() == 1 {
        return Err(EditError::LastScene);
    }

    doc.scenes_mut().retain(|scene| scene.scene_id() != scene_id);

    // Choices that pointed at the deleted scene go with it.
    let mut updated = Vec::new();
    for scene in doc.scenes_mut() {
        let before = scene.choices().len();
        scene.choices_mut().retain(|choice| choice.next_scene() != scene_id);
        if scene.choices().len() != before {
            updated.push(scene.scene_id().clone());
        }
    }

    let mut new_start_scene = None;
    if doc.start_scene() == scene_id {
        let promoted = match doc.scenes().first() {
            Some(scene) => scene.scene_id().clone(),
            None => unreachable!("delete keeps at least one scene"),
        };
        doc.set_start_scene(promoted.clone());
        new_start_scene = Some(promoted);
    }

    Ok(EditOutcome {
        removed: vec![scene_id.clone()],
        updated,
        new_start_scene,
        ..EditOutcome::default()
    })
}

fn add_choice(
    doc: &mut QuestDocument,
    scene_id: &SceneId,
    text: &str,
    next_scene: &SceneId,
) -> Result<EditOutcome, EditError> {
    if !doc.has_scene(next_scene) {
        return Err(EditError::UnknownTargetScene { scene_id: next_scene.clone() });
    }
    let scene = doc
        .scene_mut(scene_id)
        .ok_or_else(|| EditError::SceneNotFound { scene_id: scene_id.clone() })?;
    scene.push_choice(Choice::new(text, next_scene.clone()));
    Ok(EditOutcome { updated: vec![scene_id.clone()], ..EditOutcome::default() })
}

fn edit_choice_text(
    doc: &mut QuestDocument,
    scene_id: &SceneId,
    choice_index: usize,
    text: &str,
) -> Result<EditOutcome, EditError> {
    let scene = doc
        .scene_mut(scene_id)
        .ok_or_else(|| EditError::SceneNotFound { scene_id: scene_id.clone() })?;
    let choice = scene.choices_mut().get_mut(choice_index).ok_or_else(|| {
        EditError::ChoiceNotFound { scene_id: scene_id.clone(), choice_index }
    })?;
    choice.set_text(text);
    Ok(EditOutcome { updated: vec![scene_id.clone()], ..EditOutcome::default() })
}

fn delete_choice(
    doc: &mut QuestDocument,
    scene_id: &SceneId,
    choice_index: usize,
) -> Result<EditOutcome, EditError> {
    let scene = doc
        .scene_mut(scene_id)
        .ok_or_else(|| EditError::SceneNotFound { scene_id: scene_id.clone() })?;
    if choice_index >= scene.choices().len() {
        return Err(EditError::ChoiceNotFound { scene_id: scene_id.clone(), choice_index });
    }
    scene.choices_mut().remove(choice_index);
    Ok(EditOutcome { updated: vec![scene_id.clone()], ..EditOutcome::default() })
}
