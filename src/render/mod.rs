// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

//! Rendering adapter around the external diagram engine.
//!
//! The compiler produces diagram text; this module owns the async boundary
//! that turns the text into something displayable, the single surface slot
//! the result lands in, and the interaction registry the UI hangs tooltips
//! and edit actions off.

use std::sync::Arc;

use tracing::warn;

pub mod engine;
pub mod registry;
pub mod surface;

pub use engine::{DiagramEngine, EngineError, HeadlessEngine, RenderedDiagram};
pub use registry::{
    CanvasAction, EdgeAction, EdgeInteraction, InteractionMode, InteractionRegistry, NodeAction,
    NodeInteraction, END_OF_BRANCH,
};
pub use surface::{DisplaySurface, RenderPass, SurfaceContent};

use crate::format::mermaid::compile_flowchart;
use crate::model::QuestDocument;
use crate::theme::GraphTheme;

/// Compiles documents and drives renders onto a [`DisplaySurface`].
///
/// Cheap to clone; clones share the surface, so overlapping renders contend
/// on epochs and the newest pass wins.
#[derive(Clone)]
pub struct GraphRenderer {
    engine: Arc<dyn DiagramEngine>,
    surface: DisplaySurface,
    theme: GraphTheme,
}

impl GraphRenderer {
    pub fn new(engine: Arc<dyn DiagramEngine>, theme: GraphTheme) -> Self {
        Self { engine, surface: DisplaySurface::new(), theme }
    }

    pub fn surface(&self) -> &DisplaySurface {
        &self.surface
    }

    pub fn theme(&self) -> &GraphTheme {
        &self.theme
    }

    /// Compile `doc` and render it onto the surface.
    ///
    /// The surface is cleared before the engine runs. On engine failure an
    /// error placeholder is installed instead, so the surface never keeps
    /// showing a graph for a document it no longer matches. Returns false
    /// when the pass was superseded by a newer one.
    pub async fn render_document(&self, doc: &QuestDocument, mode: InteractionMode) -> bool {
        let compiled = compile_flowchart(doc, &self.theme);
        let pass = self.surface.begin_pass();

        let content = match self.engine.render(compiled.text()).await {
            Ok(rendered) => {
                let registry = InteractionRegistry::build(doc, &compiled, mode);
                SurfaceContent::Graph { text: rendered.text, registry }
            }
            Err(err) => {
                warn!(error = %err, "diagram render failed");
                SurfaceContent::Error(format!("Unable to render quest graph: {err}"))
            }
        };

        self.surface.install(pass, content)
    }

    /// Put the error placeholder up for a document that never reached the
    /// compiler, e.g. a chat result that failed to decode. Claims a fresh
    /// pass so any in-flight render is superseded.
    pub fn install_failure(&self, err: &dyn std::error::Error) -> bool {
        let pass = self.surface.begin_pass();
        self.surface
            .install(pass, SurfaceContent::Error(format!("Unable to render quest graph: {err}")))
    }
}
