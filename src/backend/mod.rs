// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

//! Quest generation backend client.
//!
//! The backend streams newline-delimited JSON progress lines and finishes
//! with the generated quest. [`stream::StreamAssembler`] does the pure
//! scanning; [`client::GenerationClient`] owns the HTTP side.

pub mod client;
pub mod stream;

pub use client::{
    BackendError, GenerateRequest, GenerationClient, KeyValidation, LocalModel, ModelCatalog,
    DEFAULT_BACKEND_URL,
};
pub use stream::{StreamAssembler, StreamEvent};
