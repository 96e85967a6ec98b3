// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use crate::format::mermaid::CompiledDiagram;
use crate::model::{QuestDocument, SceneId};

/// Tooltip tail for nodes with no outgoing choices.
pub const END_OF_BRANCH: &str = "End of branch.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    View,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    EditText,
    Rename,
    Delete,
    AddChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeAction {
    EditText,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasAction {
    AddScene,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInteraction {
    pub scene_id: SceneId,
    pub tooltip: String,
    pub actions: Vec<NodeAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeInteraction {
    pub edge_index: usize,
    pub scene_id: SceneId,
    pub choice_index: usize,
    pub actions: Vec<EdgeAction>,
}

/// Everything the UI needs to hang tooltips and context menus off the
/// rendered graph, keyed the same way the compiled diagram is: nodes by
/// Mermaid identifier, edges by statement index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionRegistry {
    mode: InteractionMode,
    nodes: BTreeMap<String, NodeInteraction>,
    edges: Vec<EdgeInteraction>,
    canvas_actions: Vec<CanvasAction>,
}

impl InteractionRegistry {
    pub fn build(doc: &QuestDocument, compiled: &CompiledDiagram, mode: InteractionMode) -> Self {
        let node_actions = match mode {
            InteractionMode::View => Vec::new(),
            InteractionMode::Edit => vec![
                NodeAction::EditText,
                NodeAction::Rename,
                NodeAction::Delete,
                NodeAction::AddChoice,
            ],
        };
        let edge_actions = match mode {
            InteractionMode::View => Vec::new(),
            InteractionMode::Edit => vec![EdgeAction::EditText, EdgeAction::Delete],
        };
        let canvas_actions = match mode {
            InteractionMode::View => Vec::new(),
            InteractionMode::Edit => vec![CanvasAction::AddScene],
        };

        let mut nodes = BTreeMap::new();
        for (ident, scene_id) in compiled.nodes() {
            nodes.insert(
                ident.clone(),
                NodeInteraction {
                    scene_id: scene_id.clone(),
                    tooltip: node_tooltip(doc, scene_id),
                    actions: node_actions.clone(),
                },
            );
        }

        let edges = compiled
            .edges()
            .iter()
            .map(|binding| EdgeInteraction {
                edge_index: binding.index,
                scene_id: binding.scene_id.clone(),
                choice_index: binding.choice_index,
                actions: edge_actions.clone(),
            })
            .collect();

        Self { mode, nodes, edges, canvas_actions }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn node(&self, ident: &str) -> Option<&NodeInteraction> {
        self.nodes.get(ident)
    }

    pub fn nodes(&self) -> &BTreeMap<String, NodeInteraction> {
        &self.nodes
    }

    pub fn edge(&self, edge_index: usize) -> Option<&EdgeInteraction> {
        self.edges.get(edge_index)
    }

    pub fn edges(&self) -> &[EdgeInteraction] {
        &self.edges
    }

    pub fn canvas_actions(&self) -> &[CanvasAction] {
        &self.canvas_actions
    }
}

fn node_tooltip(doc: &QuestDocument, scene_id: &SceneId) -> String {
    match doc.scene(scene_id) {
        Some(scene) => {
            let mut tooltip = if scene.text().is_empty() {
                scene_id.as_str().to_owned()
            } else {
                format!("{scene_id}: {}", scene.text())
            };
            if scene.choices().is_empty() {
                tooltip.push_str("\n\n");
                tooltip.push_str(END_OF_BRANCH);
            }
            tooltip
        }
        // Dangling target: referenced but never declared, so there is
        // nothing past it.
        None => END_OF_BRANCH.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{CanvasAction, InteractionMode, InteractionRegistry, END_OF_BRANCH};
    use crate::format::mermaid::compile_flowchart;
    use crate::model::decode_quest_payload;
    use crate::theme::GraphTheme;

    fn build(raw: &str, mode: InteractionMode) -> InteractionRegistry {
        let doc = decode_quest_payload(raw).expect("decode");
        let compiled = compile_flowchart(&doc, &GraphTheme::dark());
        InteractionRegistry::build(&doc, &compiled, mode)
    }

    #[test]
    fn tooltips_carry_scene_text_and_leaf_marker() {
        let registry = build(
            r#"{"scenes":[
                {"scene_id":"a","text":"Start here.","choices":[{"text":"go","next_scene":"b"}]},
                {"scene_id":"b","text":"The end.","choices":[]}
            ]}"#,
            InteractionMode::View,
        );

        let a = registry.node("a").expect("node a");
        assert_eq!(a.tooltip, "a: Start here.");
        let b = registry.node("b").expect("node b");
        assert!(b.tooltip.starts_with("b: The end."));
        assert!(b.tooltip.ends_with(END_OF_BRANCH));
    }

    #[test]
    fn dangling_targets_read_as_end_of_branch() {
        let registry = build(
            r#"{"scenes":[{"scene_id":"a","choices":[{"text":"leap","next_scene":"void"}]}]}"#,
            InteractionMode::View,
        );
        assert_eq!(registry.node("void").expect("node").tooltip, END_OF_BRANCH);
    }

    #[test]
    fn view_mode_exposes_no_actions() {
        let registry = build(
            r#"{"scenes":[{"scene_id":"a","choices":[{"text":"go","next_scene":"a"}]}]}"#,
            InteractionMode::View,
        );
        assert!(registry.node("a").expect("node").actions.is_empty());
        assert!(registry.edge(0).expect("edge").actions.is_empty());
        assert!(registry.canvas_actions().is_empty());
    }

    #[test]
    fn edit_mode_exposes_the_full_action_set() {
        let registry = build(
            r#"{"scenes":[{"scene_id":"a","choices":[{"text":"go","next_scene":"a"}]}]}"#,
            InteractionMode::Edit,
        );
        assert_eq!(registry.node("a").expect("node").actions.len(), 4);
        assert_eq!(registry.edge(0).expect("edge").actions.len(), 2);
        assert_eq!(registry.canvas_actions(), &[CanvasAction::AddScene]);

        let edge = registry.edge(0).expect("edge");
        assert_eq!(edge.choice_index, 0);
        assert_eq!(edge.scene_id.as_str(), "a");
    }
}
