//! Sound effect synthesis.
//!
//! A [`SoundEffectProvider`] turns a text prompt into a stream of encoded
//! audio chunks. The [`Synthesizer`] drains that stream into a uniquely named
//! file and hands back a [`SoundEffectFile`] guard that owns the file on disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use sfxlib::prelude::*;
//!
//! let synth = Synthesizer::new(ElevenLabs::from_env()?, "testing_sound_effects");
//! let file = synth.synthesize("thunder crack").await?;
//! println!("saved to {}", file.path().display());
//! ```

pub mod elevenlabs;

use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{FilesystemError, Result};

pub use elevenlabs::{ElevenLabs, ElevenLabsConfig};

/// Length of each clip in seconds.
pub const DEFAULT_DURATION_SECONDS: f32 = 1.0;

/// How closely the provider follows the prompt (0.0 - 1.0).
pub const DEFAULT_PROMPT_INFLUENCE: f32 = 0.3;

/// Directory synthesized clips are written to unless configured otherwise.
pub const DEFAULT_OUTPUT_DIR: &str = "testing_sound_effects";

/// File extension of synthesized clips.
pub const AUDIO_EXTENSION: &str = "mp3";

/// Chunked audio body returned by a provider.
pub type AudioStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A text-to-sound-effect request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoundEffectRequest {
    /// Description of the sound.
    pub text: String,
    /// Requested clip length in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f32>,
    /// Prompt influence (0.0 - 1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_influence: Option<f32>,
}

impl SoundEffectRequest {
    /// Create a request with the default duration and influence.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            duration_seconds: Some(DEFAULT_DURATION_SECONDS),
            prompt_influence: Some(DEFAULT_PROMPT_INFLUENCE),
        }
    }

    /// Set the clip length.
    #[must_use]
    pub const fn duration_seconds(mut self, seconds: f32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    /// Set the prompt influence.
    #[must_use]
    pub const fn prompt_influence(mut self, influence: f32) -> Self {
        self.prompt_influence = Some(influence);
        self
    }
}

/// A backend that renders sound effects from text.
#[async_trait]
pub trait SoundEffectProvider: Send + Sync {
    /// Start rendering `request` and return the audio body as a stream.
    ///
    /// Errors before the first byte are returned directly; errors while the
    /// body is being read surface as `Err` items in the stream.
    async fn generate(&self, request: &SoundEffectRequest) -> Result<AudioStream>;

    /// Provider name, used in logs.
    fn provider_name(&self) -> &'static str;
}

/// A synthesized clip on local disk.
///
/// The guard decides what happens to the file when it goes out of scope:
/// retained files stay on disk, disposable files are removed on drop.
#[derive(Debug)]
pub struct SoundEffectFile {
    path: PathBuf,
    size_bytes: u64,
    delete_on_drop: bool,
}

impl SoundEffectFile {
    /// Take ownership of an existing file, keeping it on disk by default.
    #[must_use]
    pub fn retained(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            delete_on_drop: false,
        }
    }

    fn disposable(path: PathBuf) -> Self {
        Self {
            path,
            size_bytes: 0,
            delete_on_drop: true,
        }
    }

    /// Location of the clip.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Whether the file will be removed when the guard is dropped.
    #[must_use]
    pub const fn is_disposable(&self) -> bool {
        self.delete_on_drop
    }

    /// Remove the file when the guard is dropped.
    pub const fn mark_disposable(&mut self) {
        self.delete_on_drop = true;
    }

    /// Keep the file when the guard is dropped.
    pub const fn retain(&mut self) {
        self.delete_on_drop = false;
    }

    /// Release the guard and keep the file.
    #[must_use]
    pub fn into_path(mut self) -> PathBuf {
        self.delete_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for SoundEffectFile {
    fn drop(&mut self) {
        if !self.delete_on_drop {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed sound effect file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove sound effect file");
            }
        }
    }
}

/// Renders prompts through a provider and writes each clip to disk.
#[derive(Debug, Clone)]
pub struct Synthesizer<P> {
    provider: P,
    output_dir: PathBuf,
    duration_seconds: f32,
    prompt_influence: f32,
}

impl<P: SoundEffectProvider> Synthesizer<P> {
    /// Create a synthesizer writing into `output_dir`.
    ///
    /// The directory is created on the first call to [`Self::synthesize`].
    pub fn new(provider: P, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            output_dir: output_dir.into(),
            duration_seconds: DEFAULT_DURATION_SECONDS,
            prompt_influence: DEFAULT_PROMPT_INFLUENCE,
        }
    }

    /// Override the clip length.
    #[must_use]
    pub const fn with_duration(mut self, seconds: f32) -> Self {
        self.duration_seconds = seconds;
        self
    }

    /// Override the prompt influence.
    #[must_use]
    pub const fn with_prompt_influence(mut self, influence: f32) -> Self {
        self.prompt_influence = influence;
        self
    }

    /// Directory clips are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The underlying provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Render `prompt` and write the full body to a new file.
    ///
    /// The returned file has been flushed and synced. If the body fails part
    /// way through, the partial file is removed and the error returned.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the provider fails, and a filesystem
    /// error if the directory or file cannot be written.
    pub async fn synthesize(&self, prompt: &str) -> Result<SoundEffectFile> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| FilesystemError::io(&self.output_dir, e))?;

        let request = SoundEffectRequest::new(prompt)
            .duration_seconds(self.duration_seconds)
            .prompt_influence(self.prompt_influence);

        info!(provider = self.provider.provider_name(), prompt, "generating sound effect");
        let mut stream = self.provider.generate(&request).await?;

        let path = self.output_dir.join(format!(
            "output_{}.{AUDIO_EXTENSION}",
            Uuid::new_v4().simple()
        ));
        let mut clip = SoundEffectFile::disposable(path);

        let mut file = tokio::fs::File::create(clip.path())
            .await
            .map_err(|e| FilesystemError::io(clip.path(), e))?;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FilesystemError::io(clip.path(), e))?;
            clip.size_bytes += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| FilesystemError::io(clip.path(), e))?;
        file.sync_all()
            .await
            .map_err(|e| FilesystemError::io(clip.path(), e))?;
        drop(file);

        clip.retain();
        info!(path = %clip.path().display(), bytes = clip.size_bytes, "audio saved");
        Ok(clip)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::{Error, UpstreamError};
    use assert_fs::TempDir;
    use std::sync::Mutex;

    /// Provider that replays fixed chunks and records requests.
    struct ScriptedProvider {
        chunks: Vec<std::result::Result<&'static [u8], &'static str>>,
        requests: Mutex<Vec<SoundEffectRequest>>,
        fail_upfront: bool,
    }

    impl ScriptedProvider {
        fn ok(chunks: &[&'static [u8]]) -> Self {
            Self {
                chunks: chunks.iter().copied().map(Ok).collect(),
                requests: Mutex::new(Vec::new()),
                fail_upfront: false,
            }
        }
    }

    #[async_trait]
    impl SoundEffectProvider for ScriptedProvider {
        async fn generate(&self, request: &SoundEffectRequest) -> Result<AudioStream> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_upfront {
                return Err(UpstreamError::http_status(500, "boom").into());
            }
            let items: Vec<Result<Bytes>> = self
                .chunks
                .iter()
                .map(|c| match c {
                    Ok(bytes) => Ok(Bytes::from_static(bytes)),
                    Err(msg) => Err(UpstreamError::stream(*msg).into()),
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    mod request {
        use super::*;

        #[test]
        fn defaults_to_one_second_and_low_influence() {
            let req = SoundEffectRequest::new("thunder");
            assert_eq!(req.duration_seconds, Some(1.0));
            assert_eq!(req.prompt_influence, Some(0.3));
        }

        #[test]
        fn serializes_expected_fields() {
            let json = serde_json::to_value(SoundEffectRequest::new("drip on leaf")).unwrap();
            assert_eq!(json["text"], "drip on leaf");
            assert_eq!(json["duration_seconds"], 1.0);
            assert!((json["prompt_influence"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        }
    }

    mod synthesizer {
        use super::*;

        #[tokio::test]
        async fn writes_all_chunks_to_a_fresh_file() {
            let dir = TempDir::new().unwrap();
            let out = dir.path().join("clips");
            let synth = Synthesizer::new(ScriptedProvider::ok(&[b"ID3", b"abc", b"def"]), &out);

            let clip = synth.synthesize("thunder crack").await.unwrap();

            assert!(clip.path().starts_with(&out));
            assert_eq!(clip.path().extension().unwrap(), "mp3");
            assert_eq!(std::fs::read(clip.path()).unwrap(), b"ID3abcdef");
            assert_eq!(clip.size_bytes(), 9);
            assert!(!clip.is_disposable());

            let requests = synth.provider().requests.lock().unwrap();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0], SoundEffectRequest::new("thunder crack"));
        }

        #[tokio::test]
        async fn file_names_are_unique() {
            let dir = TempDir::new().unwrap();
            let synth = Synthesizer::new(ScriptedProvider::ok(&[b"x"]), dir.path());

            let a = synth.synthesize("one").await.unwrap();
            let b = synth.synthesize("one").await.unwrap();

            assert_ne!(a.path(), b.path());
        }

        #[tokio::test]
        async fn upstream_failure_leaves_no_file() {
            let dir = TempDir::new().unwrap();
            let mut provider = ScriptedProvider::ok(&[]);
            provider.fail_upfront = true;
            let synth = Synthesizer::new(provider, dir.path());

            let err = synth.synthesize("boom").await.unwrap_err();

            assert!(matches!(err, Error::Upstream(UpstreamError::HttpStatus { .. })));
            assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        }

        #[tokio::test]
        async fn stream_failure_removes_partial_file() {
            let dir = TempDir::new().unwrap();
            let provider = ScriptedProvider {
                chunks: vec![Ok(&b"partial"[..]), Err("connection reset")],
                requests: Mutex::new(Vec::new()),
                fail_upfront: false,
            };
            let synth = Synthesizer::new(provider, dir.path());

            let err = synth.synthesize("rain").await.unwrap_err();

            assert!(matches!(err, Error::Upstream(UpstreamError::Stream(_))));
            assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        }

        #[tokio::test]
        async fn unwritable_output_dir_is_filesystem_error() {
            let dir = TempDir::new().unwrap();
            let blocker = dir.path().join("not_a_dir");
            std::fs::write(&blocker, b"").unwrap();
            let synth = Synthesizer::new(ScriptedProvider::ok(&[b"x"]), blocker.join("clips"));

            let err = synth.synthesize("wind").await.unwrap_err();

            assert!(matches!(err, Error::Filesystem(FilesystemError::Io { .. })));
        }

        #[tokio::test]
        async fn overrides_reach_the_provider() {
            let dir = TempDir::new().unwrap();
            let synth = Synthesizer::new(ScriptedProvider::ok(&[b"x"]), dir.path())
                .with_duration(2.5)
                .with_prompt_influence(0.7);

            let _clip = synth.synthesize("wind").await.unwrap();

            let requests = synth.provider().requests.lock().unwrap();
            assert_eq!(requests[0].duration_seconds, Some(2.5));
            assert_eq!(requests[0].prompt_influence, Some(0.7));
        }
    }

    mod guard {
        use super::*;

        #[test]
        fn disposable_file_is_removed_on_drop() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("a.mp3");
            std::fs::write(&path, b"x").unwrap();

            let mut clip = SoundEffectFile::retained(&path, 1);
            clip.mark_disposable();
            drop(clip);

            assert!(!path.exists());
        }

        #[test]
        fn retained_file_survives_drop() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("b.mp3");
            std::fs::write(&path, b"x").unwrap();

            drop(SoundEffectFile::retained(&path, 1));

            assert!(path.exists());
        }

        #[test]
        fn into_path_keeps_file() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("c.mp3");
            std::fs::write(&path, b"x").unwrap();

            let mut clip = SoundEffectFile::retained(&path, 1);
            clip.mark_disposable();
            let kept = clip.into_path();

            assert_eq!(kept, path);
            assert!(path.exists());
        }
    }
}
