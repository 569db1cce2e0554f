//! sfxlib - build a sound effect library for a topic
//!
//! One run asks a language model for short sound effect prompts, renders each
//! prompt to a clip with a text-to-audio model, uploads the clip to object
//! storage and appends the prompt and public URL to a CSV ledger.
//!
//! The backends sit behind traits ([`prompts::PromptGenerator`],
//! [`effects::SoundEffectProvider`], [`storage::ObjectStore`]) so the
//! [`pipeline::Pipeline`] can be driven with any implementation.

pub mod config;
pub mod effects;
pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod prelude;
pub mod prompts;
pub mod storage;

pub use error::{Error, FilesystemError, Result, UpstreamError};
