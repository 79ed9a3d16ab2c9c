//! Speech-to-text providers used when a video has no subtitles.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::transcript::Segment;
use crate::ClipperError;

pub mod aws;
pub mod processor;

pub use aws::AwsTranscribeProvider;

/// Maps audio to timestamped segments
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SttProvider: Send + Sync {
    /// Transcribe the audio file at `audio` spoken in `language`
    async fn transcribe(&self, audio: &Path, language: &str) -> anyhow::Result<Vec<Segment>>;

    /// One-line summary shown by `clipper providers`
    fn description(&self) -> &'static str;
}

/// Provider that only explains how to plug in a real one
pub struct StubProvider;

#[async_trait]
impl SttProvider for StubProvider {
    async fn transcribe(&self, _audio: &Path, _language: &str) -> anyhow::Result<Vec<Segment>> {
        anyhow::bail!(
            "The 'stub' speech-to-text provider is not implemented. \
             Select a real provider with '--stt-provider' (see 'clipper providers')."
        )
    }

    fn description(&self) -> &'static str {
        "Placeholder that always fails; select a real provider instead"
    }
}

/// Named speech-to-text providers, populated once at startup
#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn SttProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in providers
    pub fn with_defaults(config: &Config) -> Self {
        let mut registry = Self::new();
        registry.register("stub", Arc::new(StubProvider));
        registry.register(
            AwsTranscribeProvider::NAME,
            Arc::new(AwsTranscribeProvider::new(
                config.aws.clone(),
                config.stt.max_segment_length,
            )),
        );
        registry
    }

    /// Register a provider, replacing any previous one with the same name
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn SttProvider>) {
        let name = name.into();
        if self.providers.insert(name.clone(), provider).is_some() {
            tracing::warn!("STT provider '{}' was registered twice; keeping the latest", name);
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn SttProvider>, ClipperError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| ClipperError::UnknownProvider {
                name: name.to_string(),
                available: self.available(),
            })
    }

    /// Sorted provider names
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Name and description of every provider
    pub fn describe(&self) -> Vec<(&str, &'static str)> {
        self.providers
            .iter()
            .map(|(name, provider)| (name.as_str(), provider.description()))
            .collect()
    }

    fn available(&self) -> String {
        if self.providers.is_empty() {
            "none".to_string()
        } else {
            self.names().join(", ")
        }
    }
}
