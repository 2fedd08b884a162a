use clap::Parser;
use std::path::PathBuf;

use urlsum::config::{Config, Profile};
use urlsum::llm::Provider;
use urlsum::summarize::{Strategy, SummaryStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "urlsum",
    about = "Summarize a YouTube video or web page with a hosted LLM",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// YouTube or website URL (reads one URL per line from stdin if omitted)
    pub url: Option<String>,

    /// API key for the model provider (falls back to the provider's env var)
    #[arg(short = 'k', long)]
    pub api_key: Option<String>,

    /// Preset: stuff (Groq, one call) or map-reduce (Hugging Face, chunked)
    #[arg(short, long, value_enum)]
    pub profile: Option<Profile>,

    /// Model provider
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,

    /// Model identifier
    #[arg(short, long)]
    pub model: Option<String>,

    /// How chunks are combined
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Summary length (stuff strategy only)
    #[arg(short, long, value_enum)]
    pub style: Option<SummaryStyle>,

    /// Custom prompt template; must contain {text}, may contain {word_count}
    #[arg(long)]
    pub prompt: Option<String>,

    /// Max chars per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Chars repeated between consecutive chunks
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Send whole documents without chunking
    #[arg(long)]
    pub no_chunking: bool,

    /// Override the provider's API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Preferred caption language
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Verify TLS certificates when fetching web pages
    #[arg(long)]
    pub secure_tls: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show source and model details on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Flags that take priority over the config file, as a config layer.
    pub fn overrides(&self) -> Config {
        Config {
            profile: self.profile,
            provider: self.provider,
            model: self.model.clone(),
            strategy: self.strategy,
            style: self.style,
            chunking: self.no_chunking.then_some(false),
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            base_url: self.base_url.clone(),
            insecure_tls: self.secure_tls.then_some(false),
            lang: self.lang.clone(),
            ..Config::default()
        }
    }
}
