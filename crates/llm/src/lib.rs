//! LLM provider infrastructure adapter.
//!
//! Implements the [`pipeline::CompletionProvider`] trait for OpenAI-compatible
//! Chat Completions endpoints. Additional providers are added as new modules
//! in this crate without any changes to the `pipeline` crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport, request formatting, response
//! parsing, and status-code classification live here. The [`pipeline`] crate
//! sees only [`pipeline::CompletionProvider`] and
//! [`pipeline::CompletionError`].

pub mod openai;

pub use openai::{OpenAiConfig, OpenAiProvider, DEFAULT_BASE_URL};
