//! Language-model command generation.
//!
//! [`client`] talks to an OpenAI-compatible chat-completion API;
//! [`generator`] builds the dataset-aware prompt and reads the reply back
//! as command documents.

#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod generator;

pub use client::{CommandAssistant, CompletionBackend};
pub use generator::{CommandGenerator, column_context, parse_commands, system_prompt};
