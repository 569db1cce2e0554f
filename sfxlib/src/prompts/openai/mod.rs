//! OpenAI-backed prompt generation.
//!
//! Talks to the Chat Completions endpoint (or any OpenAI-compatible server
//! reachable through `OPENAI_BASE_URL`).

mod client;
mod config;
mod types;

pub use client::OpenAI;
pub use config::OpenAIConfig;
