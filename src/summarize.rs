use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::Chunk;
use crate::error::PipelineError;
use crate::llm::LanguageModel;

/// Prompt used by the stuff strategy
pub const STUFF_PROMPT: &str = "Summarize the following content in about {word_count} words, \
highlighting key insights and main points:\n{text}\n";

/// Prompt applied to each chunk, and again to the joined chunk summaries
pub const MAP_PROMPT: &str = "Write a concise summary of the following:\n\n\n\"{text}\"\n\n\nCONCISE SUMMARY:";
pub const COMBINE_PROMPT: &str = MAP_PROMPT;

const TEXT_SLOT: &str = "{text}";
const WORD_COUNT_SLOT: &str = "{word_count}";

/// How chunk texts are combined into one summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Everything in one prompt, one model call
    Stuff,
    /// One call per chunk, then one call over the partial summaries
    MapReduce,
}

impl Strategy {
    /// Whether the target word count reaches the model under this strategy.
    pub fn word_count_applies(self) -> bool {
        matches!(self, Strategy::Stuff)
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Stuff => write!(f, "stuff"),
            Strategy::MapReduce => write!(f, "map-reduce"),
        }
    }
}

/// Target summary length
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    Concise,
    #[default]
    Standard,
    Detailed,
}

impl SummaryStyle {
    pub fn word_count(self) -> usize {
        match self {
            SummaryStyle::Concise => 150,
            SummaryStyle::Standard => 300,
            SummaryStyle::Detailed => 500,
        }
    }
}

/// A prompt with one `{text}` slot and an optional `{word_count}` slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, PipelineError> {
        let template = template.into();
        match template.matches(TEXT_SLOT).count() {
            1 => {}
            0 => return Err(PipelineError::invalid("prompt template must contain a {text} slot")),
            _ => return Err(PipelineError::invalid("prompt template must contain exactly one {text} slot")),
        }
        if template.matches(WORD_COUNT_SLOT).count() > 1 {
            return Err(PipelineError::invalid("prompt template may contain at most one {word_count} slot"));
        }
        Ok(Self { template })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn render(&self, text: &str, word_count: Option<usize>) -> String {
        // Fill word_count first so a literal "{word_count}" in the text survives
        let template = match word_count {
            Some(n) => self.template.replace(WORD_COUNT_SLOT, &n.to_string()),
            None => self.template.clone(),
        };
        template.replacen(TEXT_SLOT, text, 1)
    }
}

pub fn default_stuff_prompt() -> PromptTemplate {
    PromptTemplate {
        template: STUFF_PROMPT.to_string(),
    }
}

pub fn default_map_prompt() -> PromptTemplate {
    PromptTemplate {
        template: MAP_PROMPT.to_string(),
    }
}

pub fn default_combine_prompt() -> PromptTemplate {
    PromptTemplate {
        template: COMBINE_PROMPT.to_string(),
    }
}

/// Result of running a strategy, before it is wrapped into a `Summary`
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub text: String,
    pub model_calls: usize,
}

/// Put every chunk into one prompt and make a single model call.
pub async fn stuff(
    model: &dyn LanguageModel,
    credential: &str,
    chunks: &[Chunk],
    prompt: &PromptTemplate,
    word_count: usize,
) -> Result<Outcome, PipelineError> {
    let text = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let rendered = prompt.render(&text, Some(word_count));
    info!("Stuff summarization: {} chars in one call to {}", rendered.chars().count(), model.model_id());

    let summary = model.complete(&rendered, credential).await?;
    Ok(Outcome {
        text: summary,
        model_calls: 1,
    })
}

/// Summarize each chunk on its own, then summarize the partial summaries.
///
/// The map calls run one after another in chunk order. No word count is
/// passed to either prompt.
pub async fn map_reduce(
    model: &dyn LanguageModel,
    credential: &str,
    chunks: &[Chunk],
    map_prompt: &PromptTemplate,
    combine_prompt: &PromptTemplate,
) -> Result<Outcome, PipelineError> {
    info!("Map-reduce summarization over {} chunk(s) with {}", chunks.len(), model.model_id());

    let mut partials = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        debug!("Map call {}/{} ({} chars)", i + 1, chunks.len(), chunk.text.chars().count());
        let partial = model.complete(&map_prompt.render(&chunk.text, None), credential).await?;
        partials.push(partial.trim().to_string());
    }

    let combined = partials.join("\n");
    debug!("Reduce call over {} chars of partial summaries", combined.chars().count());
    let summary = model.complete(&combine_prompt.render(&combined, None), credential).await?;

    Ok(Outcome {
        text: summary,
        model_calls: chunks.len() + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RemoteError, RemoteErrorKind};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        prompts: Mutex<Vec<String>>,
        fail_on: Option<usize>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl LanguageModel for Recorder {
        fn model_id(&self) -> &str {
            "recorder"
        }

        async fn complete(&self, prompt: &str, _credential: &str) -> Result<String, RemoteError> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            let n = prompts.len();
            if self.fail_on == Some(n) {
                return Err(RemoteError::new(RemoteErrorKind::RateLimit, "rate limited"));
            }
            Ok(format!("summary {n}"))
        }
    }

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            document_index: 0,
            start: 0,
            overlap: 0,
        }
    }

    #[test]
    fn test_template_requires_text_slot() {
        assert!(PromptTemplate::new("Summarize please").is_err());
        assert!(PromptTemplate::new("{text} and {text}").is_err());
        assert!(PromptTemplate::new("{word_count} {word_count} {text}").is_err());
        assert!(PromptTemplate::new("Summarize: {text}").is_ok());
    }

    #[test]
    fn test_render_fills_slots() {
        let t = PromptTemplate::new("In {word_count} words: {text}").unwrap();
        assert_eq!(t.render("body", Some(150)), "In 150 words: body");
        assert_eq!(t.render("body", None), "In {word_count} words: body");
    }

    #[test]
    fn test_render_leaves_text_braces_alone() {
        let t = default_stuff_prompt();
        let out = t.render("literal {text} and {word_count}", Some(300));
        assert!(out.contains("about 300 words"));
        assert!(out.contains("literal {text} and {word_count}"));
    }

    #[test]
    fn test_style_word_counts() {
        assert_eq!(SummaryStyle::Concise.word_count(), 150);
        assert_eq!(SummaryStyle::Standard.word_count(), 300);
        assert_eq!(SummaryStyle::Detailed.word_count(), 500);
    }

    #[test]
    fn test_word_count_only_applies_to_stuff() {
        assert!(Strategy::Stuff.word_count_applies());
        assert!(!Strategy::MapReduce.word_count_applies());
    }

    #[tokio::test]
    async fn test_stuff_makes_one_call() {
        let model = Recorder::new();
        let chunks = [chunk("first part"), chunk("second part")];
        let out = stuff(&model, "key", &chunks, &default_stuff_prompt(), 150).await.unwrap();

        assert_eq!(out.model_calls, 1);
        assert_eq!(out.text, "summary 1");
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("about 150 words"));
        assert!(prompts[0].contains("first part\n\nsecond part"));
    }

    #[tokio::test]
    async fn test_map_reduce_makes_n_plus_one_calls() {
        let model = Recorder::new();
        let chunks: Vec<Chunk> = (0..4).map(|i| chunk(&format!("chunk {i}"))).collect();
        let out = map_reduce(&model, "key", &chunks, &default_map_prompt(), &default_combine_prompt())
            .await
            .unwrap();

        assert_eq!(out.model_calls, 5);
        assert_eq!(out.text, "summary 5");
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 5);
        assert!(prompts[0].contains("\"chunk 0\""));
        assert!(prompts[3].contains("\"chunk 3\""));
        assert!(prompts[4].contains("summary 1\nsummary 2\nsummary 3\nsummary 4"));
        assert!(prompts.iter().all(|p| !p.contains("words")));
    }

    #[tokio::test]
    async fn test_map_reduce_stops_on_first_failure() {
        let model = Recorder {
            prompts: Mutex::new(Vec::new()),
            fail_on: Some(2),
        };
        let chunks: Vec<Chunk> = (0..4).map(|i| chunk(&format!("chunk {i}"))).collect();
        let err = map_reduce(&model, "key", &chunks, &default_map_prompt(), &default_combine_prompt())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::RemoteServiceFailure(_)));
        assert_eq!(model.prompts.lock().unwrap().len(), 2);
    }
}
