// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

use std::sync::{Arc, Mutex};

use super::registry::InteractionRegistry;

/// What the surface currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceContent {
    /// Cleared, waiting for a render pass to finish.
    Empty,
    /// Render failed; the message is shown in place of the graph.
    Error(String),
    Graph { text: String, registry: InteractionRegistry },
}

#[derive(Debug)]
struct SurfaceInner {
    epoch: u64,
    content: SurfaceContent,
}

/// Handle to the single display slot the graph occupies.
///
/// Each render pass begins by clearing the surface and claiming a fresh
/// epoch. A pass may only install its result while its epoch is still the
/// newest; a pass that lost the race installs nothing. This is how stale
/// renders are dropped instead of flashing over newer ones.
#[derive(Debug, Clone)]
pub struct DisplaySurface {
    inner: Arc<Mutex<SurfaceInner>>,
}

/// Token for one render pass, returned by [`DisplaySurface::begin_pass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPass {
    epoch: u64,
}

impl DisplaySurface {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SurfaceInner { epoch: 0, content: SurfaceContent::Empty })),
        }
    }

    /// Clear the surface and claim the next epoch.
    pub fn begin_pass(&self) -> RenderPass {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.content = SurfaceContent::Empty;
        RenderPass { epoch: inner.epoch }
    }

    /// Install content for `pass`. Returns false without touching the
    /// surface when a newer pass has started since.
    pub fn install(&self, pass: RenderPass, content: SurfaceContent) -> bool {
        let mut inner = self.lock();
        if inner.epoch != pass.epoch {
            return false;
        }
        inner.content = content;
        true
    }

    pub fn content(&self) -> SurfaceContent {
        self.lock().content.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SurfaceInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for DisplaySurface {
    fn default() -> Self {
        Self::new()
    }
}
