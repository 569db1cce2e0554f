//! The end-to-end run: topic in, ledger rows out.
//!
//! ```text
//! topic -> generator -> prompts -> for each prompt: synthesizer -> uploader -> ledger
//! ```
//!
//! Prompts are processed one at a time, in order. A failed generation stops
//! the run before anything is written. A synthesis error, a hard upload error
//! or a ledger error stops the remaining prompts; soft upload failures only
//! skip the ledger row for that prompt.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::effects::{ElevenLabs, SoundEffectProvider, Synthesizer};
use crate::error::Result;
use crate::ledger::Ledger;
use crate::prompts::{OpenAI, PromptGenerator, parse_prompts};
use crate::storage::{ObjectStore, S3Store, UploadOutcome, Uploader};

/// Orchestration switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Remove each local clip once it is uploaded and recorded.
    /// Clips whose upload failed are always kept.
    pub delete_uploaded: bool,
}

/// What happened to one prompt.
#[derive(Debug, Clone)]
pub struct PromptReport {
    /// The prompt text.
    pub prompt: String,
    /// Where the clip was written.
    pub path: PathBuf,
    /// Upload result.
    pub outcome: UploadOutcome,
    /// Whether the local clip was removed after upload.
    pub deleted: bool,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Topic the run was started with.
    pub topic: String,
    /// Prompts parsed from the generator output.
    pub prompts: Vec<String>,
    /// One report per prompt, in processing order.
    pub reports: Vec<PromptReport>,
}

impl RunSummary {
    /// Number of prompts whose clip was uploaded.
    #[must_use]
    pub fn uploaded(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_uploaded()).count()
    }

    /// Number of prompts whose upload was skipped.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports.len() - self.uploaded()
    }
}

/// Pipeline wired to the production backends.
pub type DefaultPipeline = Pipeline<OpenAI, ElevenLabs, S3Store>;

/// Generator, synthesizer, uploader and ledger, run in sequence.
#[derive(Debug)]
pub struct Pipeline<G, P, S> {
    generator: G,
    synthesizer: Synthesizer<P>,
    uploader: Uploader<S>,
    ledger: Ledger,
    options: PipelineOptions,
}

impl DefaultPipeline {
    /// Build the production pipeline from settings.
    ///
    /// No credentials are checked here.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let generator =
            OpenAI::new(settings.openai.clone())?.with_prompt_count(settings.prompt_count);
        let provider = ElevenLabs::new(settings.elevenlabs.clone())?;
        let store = S3Store::new(settings.storage.clone());

        Ok(Pipeline::new(
            generator,
            Synthesizer::new(provider, &settings.output_dir),
            Uploader::new(store),
            Ledger::new(&settings.ledger_path),
        )
        .with_options(settings.options))
    }
}

impl<G, P, S> Pipeline<G, P, S>
where
    G: PromptGenerator,
    P: SoundEffectProvider,
    S: ObjectStore,
{
    /// Assemble a pipeline with default options.
    pub fn new(
        generator: G,
        synthesizer: Synthesizer<P>,
        uploader: Uploader<S>,
        ledger: Ledger,
    ) -> Self {
        Self {
            generator,
            synthesizer,
            uploader,
            ledger,
            options: PipelineOptions::default(),
        }
    }

    /// Set the options.
    #[must_use]
    pub const fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// The ledger rows are appended to.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The synthesizer.
    #[must_use]
    pub const fn synthesizer(&self) -> &Synthesizer<P> {
        &self.synthesizer
    }

    /// The uploader.
    #[must_use]
    pub const fn uploader(&self) -> &Uploader<S> {
        &self.uploader
    }

    /// Run once for `topic`.
    ///
    /// # Errors
    ///
    /// Returns the first generation, synthesis, hard upload or ledger error.
    /// Rows appended before the error stay in the ledger.
    pub async fn run(&self, topic: &str) -> Result<RunSummary> {
        info!(
            provider = self.generator.provider_name(),
            topic, "generating prompts"
        );
        let text = self.generator.generate(topic).await?;
        let prompts = parse_prompts(&text);
        info!(count = prompts.len(), "prompts generated");
        for (index, prompt) in prompts.iter().enumerate() {
            debug!(index, prompt = %prompt, "prompt");
        }

        let mut reports = Vec::with_capacity(prompts.len());
        for (index, prompt) in prompts.iter().enumerate() {
            info!(index, total = prompts.len(), prompt = %prompt, "processing prompt");
            reports.push(self.process(prompt).await?);
        }

        let summary = RunSummary {
            topic: topic.to_owned(),
            prompts,
            reports,
        };
        info!(
            uploaded = summary.uploaded(),
            failed = summary.failed(),
            ledger = %self.ledger.path().display(),
            "run complete"
        );
        Ok(summary)
    }

    async fn process(&self, prompt: &str) -> Result<PromptReport> {
        let mut clip = self.synthesizer.synthesize(prompt).await?;
        let outcome = self.uploader.upload(clip.path(), None).await?;

        match &outcome {
            UploadOutcome::Uploaded { url, .. } => {
                self.ledger.append(prompt, url)?;
                if self.options.delete_uploaded {
                    clip.mark_disposable();
                }
            }
            UploadOutcome::Failed(failure) => {
                warn!(prompt, ?failure, "no ledger row written");
            }
        }

        let path = clip.path().to_path_buf();
        let deleted = clip.is_disposable();
        drop(clip);

        Ok(PromptReport {
            prompt: prompt.to_owned(),
            path,
            outcome,
            deleted,
        })
    }
}
