// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use super::ident::{sanitize_mermaid_ident, validate_mermaid_ident};
use crate::model::{QuestDocument, SceneId};
use crate::theme::GraphTheme;

/// Column width edge labels are wrapped to before handing them to the
/// layout engine.
pub const EDGE_LABEL_WRAP_COLUMNS: usize = 24;

/// Maximum wrapped lines per edge label; anything longer is truncated with
/// an ellipsis.
pub const EDGE_LABEL_MAX_LINES: usize = 3;

/// Binds one emitted edge statement back to the `(scene, choice)` pair it
/// was compiled from. Edge statements are index-addressable in Mermaid
/// (`linkStyle <index> …`), so the statement index is the stable handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeBinding {
    pub index: usize,
    pub scene_id: SceneId,
    pub choice_index: usize,
}

/// The compiled diagram text plus the ident/scene bindings a renderer needs
/// to map engine output back onto the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDiagram {
    text: String,
    nodes: BTreeMap<String, SceneId>,
    edges: Vec<EdgeBinding>,
}

impl CompiledDiagram {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Mermaid identifier → scene id, for every emitted node statement.
    pub fn nodes(&self) -> &BTreeMap<String, SceneId> {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeBinding] {
        &self.edges
    }

    pub fn scene_for_ident(&self, ident: &str) -> Option<&SceneId> {
        self.nodes.get(ident)
    }
}

/// Compile a normalized quest document into Mermaid `flowchart` text.
///
/// Output is stable/deterministic for a given (document, theme):
/// - one node statement per renderable id, in the document's renderable
///   iteration order (declared scenes first, then dangling targets),
/// - one edge statement per (scene, choice) in scene-declaration then
///   choice-index order,
/// - a `style` directive emphasizing the start node and a default
///   `linkStyle` carrying the theme's edge stroke.
///
/// Labels are quote-escaped (`"` → `#quot;`) before any wrapping or
/// truncation so no label can break a statement open.
pub fn compile_flowchart(doc: &QuestDocument, theme: &GraphTheme) -> CompiledDiagram {
    let node_ids = doc.renderable_node_ids();

    let mut ident_for_scene = BTreeMap::<SceneId, String>::new();
    let mut nodes = BTreeMap::<String, SceneId>::new();
    for scene_id in &node_ids {
        let ident = allocate_ident(scene_id.as_str(), &nodes);
        nodes.insert(ident.clone(), scene_id.clone());
        ident_for_scene.insert(scene_id.clone(), ident);
    }

    let mut out = String::new();
    out.push_str("flowchart TD\n");

    for scene_id in &node_ids {
        let ident = &ident_for_scene[scene_id];
        out.push_str(ident);
        out.push_str("[\"");
        out.push_str(&escape_label(scene_id.as_str()));
        out.push_str("\"]\n");
    }

    let mut edges = Vec::new();
    for scene in doc.scenes() {
        let from = &ident_for_scene[scene.scene_id()];
        for (choice_index, choice) in scene.choices().iter().enumerate() {
            let to = &ident_for_scene[choice.next_scene()];
            out.push_str(from);
            let label = wrap_label(
                &escape_label(choice.text()),
                EDGE_LABEL_WRAP_COLUMNS,
                EDGE_LABEL_MAX_LINES,
            );
            if label.is_empty() {
                out.push_str(" --> ");
            } else {
                out.push_str(" -->|\"");
                out.push_str(&label);
                out.push_str("\"| ");
            }
            out.push_str(to);
            out.push('\n');

            edges.push(EdgeBinding {
                index: edges.len(),
                scene_id: scene.scene_id().clone(),
                choice_index,
            });
        }
    }

    let start_ident = &ident_for_scene[doc.start_scene()];
    out.push_str("style ");
    out.push_str(start_ident);
    out.push_str(&format!(
        " fill:{},stroke:{},stroke-width:2px,color:{}\n",
        theme.start_fill(),
        theme.start_stroke(),
        theme.start_text()
    ));
    out.push_str(&format!(
        "linkStyle default stroke:{}\n",
        theme.edge_stroke()
    ));

    CompiledDiagram { text: out, nodes, edges }
}

fn allocate_ident(raw: &str, taken: &BTreeMap<String, SceneId>) -> String {
    let base = if validate_mermaid_ident(raw).is_ok() {
        raw.to_owned()
    } else {
        sanitize_mermaid_ident(raw)
    };
    if !taken.contains_key(&base) {
        return base;
    }
    let mut suffix = 2usize;
    loop {
        let candidate = format!("{base}_{suffix}");
        if !taken.contains_key(&candidate) {
            return candidate;
        }
        suffix = suffix.saturating_add(1);
    }
}

fn escape_label(label: &str) -> String {
    label.replace('"', "#quot;")
}

/// Word-wrap an already-escaped label to `columns`, joining lines with
/// `<br/>`. Words longer than a full line are hard-split. At most
/// `max_lines` lines survive; overflow is truncated with `…`.
fn wrap_label(label: &str, columns: usize, max_lines: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut truncated = false;

    'words: for word in label.split_whitespace() {
        let mut word = word;
        loop {
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed <= columns {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                continue 'words;
            }

            if current.is_empty() {
                // Word alone exceeds a line: hard-split it.
                let split_at = word
                    .char_indices()
                    .nth(columns)
                    .map(|(idx, _)| idx)
                    .unwrap_or(word.len());
                current.push_str(&word[..split_at]);
                word = &word[split_at..];
            }

            if lines.len() + 1 >= max_lines {
                truncated = true;
                break 'words;
            }
            lines.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if truncated {
        match lines.last_mut() {
            Some(last) => last.push('…'),
            None => lines.push("…".to_owned()),
        }
    }

    lines.join("<br/>")
}

#[cfg(test)]
mod tests {
    use super::{compile_flowchart, wrap_label};
    use crate::model::{decode_quest_payload, SceneId};
    use crate::theme::GraphTheme;

    fn doc(raw: &str) -> crate::model::QuestDocument {
        decode_quest_payload(raw).expect("decode")
    }

    #[test]
    fn compiles_nodes_edge_and_start_style() {
        let compiled = compile_flowchart(
            &doc(r#"{"start_scene":"a","scenes":[{"scene_id":"a","text":"Start","choices":[{"text":"Go","next_scene":"b"}]}]}"#),
            &GraphTheme::dark(),
        );

        let text = compiled.text();
        assert!(text.starts_with("flowchart TD\n"));
        assert!(text.contains("a[\"a\"]\n"));
        assert!(text.contains("b[\"b\"]\n"));
        assert!(text.contains("a -->|\"Go\"| b\n"));
        assert!(text.contains("style a fill:"));

        assert_eq!(compiled.nodes().len(), 2);
        assert_eq!(
            compiled.scene_for_ident("b"),
            Some(&SceneId::new("b").expect("id"))
        );
        assert_eq!(compiled.edges().len(), 1);
        assert_eq!(compiled.edges()[0].choice_index, 0);
    }

    #[test]
    fn compilation_is_deterministic() {
        let document = doc(
            r#"{"start_scene":"a","scenes":[
                {"scene_id":"a","choices":[{"text":"one","next_scene":"b"},{"text":"two","next_scene":"c"}]},
                {"scene_id":"b","choices":[{"text":"back","next_scene":"a"}]}
            ]}"#,
        );
        let theme = GraphTheme::light();
        let first = compile_flowchart(&document, &theme);
        let second = compile_flowchart(&document, &theme);
        assert_eq!(first.text(), second.text());
        assert_eq!(first, second);
    }

    #[test]
    fn quotes_are_escaped_before_wrapping() {
        let compiled = compile_flowchart(
            &doc(r#"{"scenes":[{"scene_id":"a","choices":[{"text":"say \"hi\" now","next_scene":"a"}]}]}"#),
            &GraphTheme::dark(),
        );
        assert!(compiled.text().contains("#quot;hi#quot;"));
        // The only raw quotes left are the statement delimiters themselves.
        let edge_line = compiled
            .text()
            .lines()
            .find(|line| line.contains("-->"))
            .expect("edge line");
        assert_eq!(edge_line.matches('"').count(), 2);
    }

    #[test]
    fn long_edge_labels_wrap_and_truncate() {
        let label = "a very long choice label that keeps going well past any sensible width limit";
        let compiled = compile_flowchart(
            &doc(&format!(
                r#"{{"scenes":[{{"scene_id":"a","choices":[{{"text":"{label}","next_scene":"a"}}]}}]}}"#
            )),
            &GraphTheme::dark(),
        );
        let edge_line = compiled
            .text()
            .lines()
            .find(|line| line.contains("-->"))
            .expect("edge line");
        assert!(edge_line.contains("<br/>"));
        assert!(edge_line.contains('…'));
    }

    #[test]
    fn scene_ids_with_odd_characters_get_sanitized_idents() {
        let compiled = compile_flowchart(
            &doc(r#"{"scenes":[{"scene_id":"two words","choices":[{"text":"go","next_scene":"two-words"}]}]}"#),
            &GraphTheme::dark(),
        );
        // Both ids sanitize to the same base; the second gets a suffix.
        assert!(compiled.text().contains("two_words[\"two words\"]"));
        assert!(compiled.text().contains("two_words_2[\"two-words\"]"));
        assert!(compiled.text().contains("two_words -->|\"go\"| two_words_2"));
    }

    #[test]
    fn empty_choice_text_omits_the_label() {
        let compiled = compile_flowchart(
            &doc(r#"{"scenes":[{"scene_id":"a","choices":[{"text":"","next_scene":"b"}]}]}"#),
            &GraphTheme::dark(),
        );
        assert!(compiled.text().contains("a --> b\n"));
    }

    #[test]
    fn themes_change_the_style_directives_only() {
        let document = doc(r#"{"scenes":[{"scene_id":"a"}]}"#);
        let light = compile_flowchart(&document, &GraphTheme::light());
        let dark = compile_flowchart(&document, &GraphTheme::dark());
        assert_ne!(light.text(), dark.text());
        assert_eq!(light.nodes(), dark.nodes());
    }

    #[test]
    fn wrap_label_behaves_at_the_boundaries() {
        assert_eq!(wrap_label("", 24, 3), "");
        assert_eq!(wrap_label("short", 24, 3), "short");
        assert_eq!(wrap_label("one two", 3, 3), "one<br/>two");
        // A single oversized word is hard-split.
        assert_eq!(wrap_label("abcdef", 3, 3), "abc<br/>def");
        // Overflow beyond the line budget truncates with an ellipsis.
        assert_eq!(wrap_label("aa bb cc dd", 2, 2), "aa<br/>bb…");
    }
}
