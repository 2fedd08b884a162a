pub mod chunk;
pub mod config;
pub mod error;
pub mod llm;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod source;
pub mod summarize;
pub mod validate;
pub mod web;
pub mod youtube;

use std::collections::BTreeMap;

use serde::Serialize;

pub use error::{PipelineError, RemoteError, RemoteErrorKind};
pub use source::SourceKind;

/// Text retrieved from a source, with loader-specific metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// A bounded slice of a document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub text: String,
    /// Index of the source document in the loader output
    pub document_index: usize,
    /// Char offset of this chunk within its document
    pub start: usize,
    /// Leading chars repeated from the previous chunk of the same document
    pub overlap: usize,
}

/// Final output of a request
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub text: String,
    pub model: String,
    pub strategy: summarize::Strategy,
    pub model_calls: usize,
    pub chunks: usize,
}

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    // Bare 11-character video ID
    if regex::Regex::new(r"^[a-zA-Z0-9_-]{11}$").unwrap().is_match(input) {
        return Some(input.to_string());
    }

    let patterns = [
        r"youtube(?:-nocookie)?\.com/watch\?(?:.*&)?v=([a-zA-Z0-9_-]{11})",
        r"youtu\.be/([a-zA-Z0-9_-]{11})",
        r"youtube(?:-nocookie)?\.com/embed/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/live/([a-zA-Z0-9_-]{11})",
    ];

    for pattern in patterns {
        if let Some(caps) = regex::Regex::new(pattern).unwrap().captures(input) {
            return Some(caps[1].to_string());
        }
    }

    None
}
