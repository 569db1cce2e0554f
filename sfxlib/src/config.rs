//! Run settings.
//!
//! [`Settings`] gathers every knob the pipeline needs in one value. It is
//! built once at startup, usually with [`Settings::from_env`], and passed by
//! reference to whatever assembles the pipeline. Reading the environment
//! never fails; a missing variable is reported by the component that needs
//! it when that component is first used.

use std::path::PathBuf;

use crate::effects::{DEFAULT_OUTPUT_DIR, ElevenLabsConfig};
use crate::ledger::DEFAULT_LEDGER_PATH;
use crate::pipeline::PipelineOptions;
use crate::prompts::{DEFAULT_PROMPT_COUNT, OpenAIConfig};
use crate::storage::StorageConfig;

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Prompt generation.
    pub openai: OpenAIConfig,
    /// Audio synthesis.
    pub elevenlabs: ElevenLabsConfig,
    /// Object storage.
    pub storage: StorageConfig,
    /// Ledger file.
    pub ledger_path: PathBuf,
    /// Directory clips are written to.
    pub output_dir: PathBuf,
    /// Number of prompts to ask for.
    pub prompt_count: usize,
    /// Orchestration behaviour.
    pub options: PipelineOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai: OpenAIConfig::default(),
            elevenlabs: ElevenLabsConfig::default(),
            storage: StorageConfig::default(),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            prompt_count: DEFAULT_PROMPT_COUNT,
            options: PipelineOptions::default(),
        }
    }
}

impl Settings {
    /// Read provider configuration from the environment; everything else
    /// takes its default.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            openai: OpenAIConfig::from_env(),
            elevenlabs: ElevenLabsConfig::from_env(),
            storage: StorageConfig::from_env(),
            ..Self::default()
        }
    }

    /// Sets the ledger path.
    #[must_use]
    pub fn with_ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_path = path.into();
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the number of prompts.
    #[must_use]
    pub const fn with_prompt_count(mut self, count: usize) -> Self {
        self.prompt_count = count;
        self
    }

    /// Sets the prompt generation model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.openai.model = model.into();
        self
    }

    /// Sets whether uploaded clips are deleted locally.
    #[must_use]
    pub const fn with_delete_uploaded(mut self, delete: bool) -> Self {
        self.options.delete_uploaded = delete;
        self
    }
}
