use crate::error::PipelineError;
use crate::source::SourceKind;
use crate::Summary;

pub const VIDEO_HINT: &str = "If this is a YouTube link, ensure subtitles are available.";

/// Extra guidance shown with an error, if any applies
pub fn hint(err: &PipelineError) -> Option<&'static str> {
    match err {
        PipelineError::ContentUnavailable {
            kind: SourceKind::Video,
            ..
        } => Some(VIDEO_HINT),
        _ => None,
    }
}

/// Render an outcome for a terminal
pub fn render_text(outcome: &Result<Summary, PipelineError>) -> String {
    match outcome {
        Ok(summary) => format!("✅ Summary Generated!\n\n{}", summary.text),
        Err(err) => {
            let mut out = format!("❌ Error: {err}");
            if let Some(h) = hint(err) {
                out.push_str("\n💡 ");
                out.push_str(h);
            }
            out
        }
    }
}

/// Render an outcome as a JSON object
pub fn render_json(url: &str, outcome: &Result<Summary, PipelineError>) -> String {
    let value = match outcome {
        Ok(summary) => serde_json::json!({
            "status": "ok",
            "url": url,
            "summary": summary.text,
            "model": summary.model,
            "strategy": summary.strategy,
            "model_calls": summary.model_calls,
            "chunks": summary.chunks,
        }),
        Err(err) => serde_json::json!({
            "status": "error",
            "url": url,
            "error_kind": err.kind_name(),
            "error": err.to_string(),
            "hint": hint(err),
        }),
    };
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}
