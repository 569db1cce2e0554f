//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use sfxlib::prelude::*;
//! ```

pub use crate::config::Settings;
pub use crate::effects::{
    AudioStream, ElevenLabs, ElevenLabsConfig, SoundEffectFile, SoundEffectProvider,
    SoundEffectRequest, Synthesizer,
};
pub use crate::error::{Error, FilesystemError, Result, UpstreamError};
pub use crate::ledger::{Ledger, LedgerRecord};
pub use crate::pipeline::{DefaultPipeline, Pipeline, PipelineOptions, PromptReport, RunSummary};
pub use crate::prompts::{OpenAI, OpenAIConfig, PromptGenerator, parse_prompts};
pub use crate::storage::{
    ObjectStore, S3Store, StorageConfig, StoreError, UploadFailure, UploadOutcome, Uploader,
};
