use log::{debug, info, warn};

use crate::chunk;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::llm::{LanguageModel, RemoteModel};
use crate::loader::{ContentLoader, HttpLoader};
use crate::source::{self, SourceKind};
use crate::summarize::{self, PromptTemplate, Strategy, SummaryStyle};
use crate::validate;
use crate::{Chunk, Document, Summary};

/// How the caller wants the summary shaped
#[derive(Debug, Clone, PartialEq)]
pub enum RequestStyle {
    /// Configured prompt with this style's word count
    Preset(SummaryStyle),
    /// Caller-supplied prompt template
    Custom(PromptTemplate),
}

impl Default for RequestStyle {
    fn default() -> Self {
        RequestStyle::Preset(SummaryStyle::default())
    }
}

impl RequestStyle {
    /// A custom prompt beats a named style; neither means the default style.
    pub fn resolve(prompt: Option<&str>, style: Option<SummaryStyle>) -> Result<Self, PipelineError> {
        match prompt {
            Some(template) => Ok(RequestStyle::Custom(PromptTemplate::new(template)?)),
            None => Ok(RequestStyle::Preset(style.unwrap_or_default())),
        }
    }
}

/// One summarization request
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub credential: String,
    pub style: RequestStyle,
}

impl Request {
    pub fn new(url: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credential: credential.into(),
            style: RequestStyle::default(),
        }
    }

    pub fn with_style(mut self, style: RequestStyle) -> Self {
        self.style = style;
        self
    }
}

/// validate → classify → load → chunk → summarize
pub struct Pipeline {
    config: PipelineConfig,
    loader: Box<dyn ContentLoader>,
    model: Box<dyn LanguageModel>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, loader: Box<dyn ContentLoader>, model: Box<dyn LanguageModel>) -> Self {
        Self { config, loader, model }
    }

    /// Pipeline wired to the real HTTP loader and the configured provider.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let loader = HttpLoader::new(&config.fetch)?;
        let model = RemoteModel::new(config.provider, &config.model_id, &config.generation)?;
        Ok(Self::new(config, Box::new(loader), Box::new(model)))
    }

    pub async fn run(&self, request: &Request) -> Result<Summary, PipelineError> {
        if request.credential.trim().is_empty() {
            return Err(PipelineError::invalid("Please enter your API key."));
        }
        if request.url.trim().is_empty() {
            return Err(PipelineError::invalid("Please enter a YouTube or website URL."));
        }
        self.config.chunking.validate()?;
        let url = validate::parse_url(&request.url)?;

        let kind = source::classify(&url);
        info!("Summarizing {url} as {kind}");

        let documents = self.loader.load(&url, kind).await?;
        let documents: Vec<Document> = documents.into_iter().filter(|d| !d.text.trim().is_empty()).collect();
        if documents.is_empty() {
            return Err(PipelineError::unavailable(kind, "Couldn't fetch content. Try another URL."));
        }
        debug!("Loaded {} document(s)", documents.len());

        let chunks = self.prepare_chunks(&documents)?;

        let (prompt, word_count) = match &request.style {
            RequestStyle::Preset(style) => (&self.config.prompt_template, style.word_count()),
            RequestStyle::Custom(template) => (template, SummaryStyle::default().word_count()),
        };

        let outcome = match self.config.strategy {
            Strategy::Stuff => {
                summarize::stuff(self.model.as_ref(), &request.credential, &chunks, prompt, word_count).await
            }
            Strategy::MapReduce => {
                summarize::map_reduce(
                    self.model.as_ref(),
                    &request.credential,
                    &chunks,
                    prompt,
                    &self.config.combine_template,
                )
                .await
            }
        };
        let outcome = outcome.inspect_err(|e| {
            if let PipelineError::RemoteServiceFailure(remote) = e {
                warn!("Model call failed ({}): {}", remote.kind, remote.message);
            }
        })?;

        info!("Summary ready after {} model call(s)", outcome.model_calls);
        Ok(Summary {
            text: outcome.text.trim().to_string(),
            model: self.model.model_id().to_string(),
            strategy: self.config.strategy,
            model_calls: outcome.model_calls,
            chunks: chunks.len(),
        })
    }

    /// Chunks when chunking is on, otherwise one whole-document chunk each.
    fn prepare_chunks(&self, documents: &[Document]) -> Result<Vec<Chunk>, PipelineError> {
        let chunking = &self.config.chunking;
        if chunking.enabled {
            return chunk::split(documents, chunking.chunk_size, chunking.overlap);
        }
        Ok(documents
            .iter()
            .enumerate()
            .map(|(i, d)| Chunk {
                text: d.text.clone(),
                document_index: i,
                start: 0,
                overlap: 0,
            })
            .collect())
    }
}
