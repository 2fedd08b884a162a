use std::path::PathBuf;
use std::time::Duration;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::PipelineError;
use crate::llm::{GenerationConfig, Provider};
use crate::summarize::{self, PromptTemplate, Strategy, SummaryStyle};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_MAX_PAGE_BYTES: usize = 5 * 1024 * 1024;

/// Settings for fetching source content
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Skip certificate verification for generic pages
    pub insecure_tls: bool,
    pub user_agent: String,
    /// Preferred caption language
    pub lang: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    /// Page bodies are cut off after this many bytes
    pub max_bytes: usize,
    pub youtube_base_url: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            insecure_tls: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            lang: "en".to_string(),
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
            max_bytes: DEFAULT_MAX_PAGE_BYTES,
            youtube_base_url: crate::youtube::YOUTUBE_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub enabled: bool,
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Named presets matching the supported summarizer setups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Groq chat model, whole text in one prompt with a word-count hint
    #[default]
    Stuff,
    /// Hugging Face summarization model over 3000-char chunks
    MapReduce,
}

/// Everything a request needs besides its URL and credential
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub provider: Provider,
    pub model_id: String,
    pub strategy: Strategy,
    /// Stuff prompt, or the per-chunk prompt under map-reduce
    pub prompt_template: PromptTemplate,
    /// Reduce-phase prompt; only used by map-reduce
    pub combine_template: PromptTemplate,
    pub chunking: ChunkingConfig,
    pub generation: GenerationConfig,
    pub fetch: FetchConfig,
}

impl PipelineConfig {
    pub fn from_profile(profile: Profile) -> Self {
        match profile {
            Profile::Stuff => Self {
                provider: Provider::Groq,
                model_id: Provider::Groq.default_model().to_string(),
                strategy: Strategy::Stuff,
                prompt_template: summarize::default_stuff_prompt(),
                combine_template: summarize::default_combine_prompt(),
                chunking: ChunkingConfig::default(),
                generation: GenerationConfig::default(),
                fetch: FetchConfig::default(),
            },
            Profile::MapReduce => Self {
                provider: Provider::HuggingFace,
                model_id: Provider::HuggingFace.default_model().to_string(),
                strategy: Strategy::MapReduce,
                prompt_template: summarize::default_map_prompt(),
                combine_template: summarize::default_combine_prompt(),
                chunking: ChunkingConfig {
                    enabled: true,
                    ..ChunkingConfig::default()
                },
                generation: GenerationConfig::default(),
                fetch: FetchConfig::default(),
            },
        }
    }

    /// Switch strategy along with that strategy's default prompt and chunking.
    ///
    /// Explicit prompt or chunking settings are applied after this by
    /// `Config::resolve`, so they always win.
    pub fn set_strategy(&mut self, strategy: Strategy) {
        if strategy == self.strategy {
            return;
        }
        self.strategy = strategy;
        self.prompt_template = match strategy {
            Strategy::Stuff => summarize::default_stuff_prompt(),
            Strategy::MapReduce => summarize::default_map_prompt(),
        };
        self.chunking.enabled = strategy == Strategy::MapReduce;
    }

    /// Switch provider, resetting the model to that provider's default.
    pub fn set_provider(&mut self, provider: Provider) {
        if provider != self.provider {
            self.provider = provider;
            self.model_id = provider.default_model().to_string();
        }
    }
}

impl ChunkingConfig {
    /// Reject settings `chunk::split` would refuse, without touching any input.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.enabled {
            return Ok(());
        }
        if self.chunk_size == 0 {
            return Err(PipelineError::invalid("chunk size must be greater than zero"));
        }
        if self.overlap >= self.chunk_size {
            return Err(PipelineError::invalid(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Contents of the optional config file
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub profile: Option<Profile>,
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub strategy: Option<Strategy>,
    pub style: Option<SummaryStyle>,
    pub prompt: Option<String>,
    pub chunking: Option<bool>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub base_url: Option<String>,
    pub insecure_tls: Option<bool>,
    pub user_agent: Option<String>,
    pub lang: Option<String>,
    pub fetch_timeout_secs: Option<u64>,
    pub model_timeout_secs: Option<u64>,
    pub max_page_bytes: Option<usize>,
}

impl Config {
    /// Load config from ~/.config/urlsum/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Field-wise merge; anything set in `top` wins.
    pub fn overlay(self, top: Config) -> Config {
        Config {
            profile: top.profile.or(self.profile),
            provider: top.provider.or(self.provider),
            model: top.model.or(self.model),
            strategy: top.strategy.or(self.strategy),
            style: top.style.or(self.style),
            prompt: top.prompt.or(self.prompt),
            chunking: top.chunking.or(self.chunking),
            chunk_size: top.chunk_size.or(self.chunk_size),
            chunk_overlap: top.chunk_overlap.or(self.chunk_overlap),
            temperature: top.temperature.or(self.temperature),
            max_tokens: top.max_tokens.or(self.max_tokens),
            base_url: top.base_url.or(self.base_url),
            insecure_tls: top.insecure_tls.or(self.insecure_tls),
            user_agent: top.user_agent.or(self.user_agent),
            lang: top.lang.or(self.lang),
            fetch_timeout_secs: top.fetch_timeout_secs.or(self.fetch_timeout_secs),
            model_timeout_secs: top.model_timeout_secs.or(self.model_timeout_secs),
            max_page_bytes: top.max_page_bytes.or(self.max_page_bytes),
        }
    }

    /// Build the pipeline config: profile preset, then provider and strategy
    /// switches, then every explicit setting on top.
    pub fn resolve(&self) -> Result<PipelineConfig> {
        let mut c = PipelineConfig::from_profile(self.profile.unwrap_or_default());

        if let Some(provider) = self.provider {
            c.set_provider(provider);
        }
        if let Some(strategy) = self.strategy {
            c.set_strategy(strategy);
        }
        if let Some(ref model) = self.model {
            c.model_id = model.clone();
        }
        if let Some(ref prompt) = self.prompt {
            c.prompt_template = PromptTemplate::new(prompt.as_str())?;
        }
        if let Some(enabled) = self.chunking {
            c.chunking.enabled = enabled;
        }
        if let Some(size) = self.chunk_size {
            c.chunking.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            c.chunking.overlap = overlap;
        }
        if let Some(t) = self.temperature {
            c.generation.temperature = t;
        }
        if let Some(n) = self.max_tokens {
            c.generation.max_tokens = n;
        }
        if let Some(ref url) = self.base_url {
            c.generation.base_url = Some(url.clone());
        }
        if let Some(secs) = self.model_timeout_secs {
            c.generation.timeout = Duration::from_secs(secs);
        }
        if let Some(insecure) = self.insecure_tls {
            c.fetch.insecure_tls = insecure;
        }
        if let Some(ref ua) = self.user_agent {
            c.fetch.user_agent = ua.clone();
        }
        if let Some(ref lang) = self.lang {
            c.fetch.lang = lang.clone();
        }
        if let Some(secs) = self.fetch_timeout_secs {
            c.fetch.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = self.max_page_bytes {
            c.fetch.max_bytes = n;
        }

        c.chunking.validate()?;
        Ok(c)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("urlsum")
        .join("config.toml")
}
