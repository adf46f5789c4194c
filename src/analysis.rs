//! Boundary with the AI analysis step: prompt rendering with the history digest, and a
//! tolerant reading of the model's reply.
//!
//! No network I/O here; the caller sends the rendered prompt and hands back the raw reply.

use serde::{Deserialize, Serialize};

pub const NEWS_CONTENT_HEADING: &str = "## 📰 本次新闻内容";
const RAW_FALLBACK_CHARS: usize = 500;

/// Prompt file split into `[system]` and `[user]` parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

impl PromptTemplate {
    /// Without both markers the whole text is the user prompt.
    pub fn parse(content: &str) -> Self {
        match content.split_once("[user]") {
            Some((head, user)) if head.contains("[system]") => {
                let system = head
                    .split_once("[system]")
                    .map(|(_, s)| s.trim().to_string())
                    .unwrap_or_default();
                Self {
                    system,
                    user: user.trim().to_string(),
                }
            }
            _ => Self {
                system: String::new(),
                user: content.to_string(),
            },
        }
    }

    /// Replace `{name}` placeholders by plain substitution (JSON braces in the template are
    /// left alone). A non-empty `history_context` goes in front of `{news_content}`.
    pub fn render(&self, vars: &[(&str, &str)], history_context: Option<&str>) -> String {
        let mut out = self.user.clone();
        for (name, value) in vars {
            let key = format!("{{{name}}}");
            let value = if *name == "news_content" {
                match history_context.filter(|h| !h.trim().is_empty()) {
                    Some(history) => format!("{history}\n\n{NEWS_CONTENT_HEADING}\n\n{value}"),
                    None => value.to_string(),
                }
            } else {
                value.to_string()
            };
            out = out.replace(&key, &value);
        }
        out
    }
}

/// Sections the analysis reply is expected to carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSections {
    #[serde(default)]
    pub core_trends: String,
    #[serde(default)]
    pub sentiment_controversy: String,
    #[serde(default)]
    pub signals: String,
    #[serde(default)]
    pub rss_insights: String,
    #[serde(default)]
    pub outlook_strategy: String,
}

/// Result of reading a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Success(AnalysisSections),
    /// The reply was not valid JSON; the raw text is carried in `core_trends`.
    PartialSuccess {
        payload: AnalysisSections,
        warning: Option<String>,
    },
    Failure(String),
}

impl AnalysisOutcome {
    pub fn sections(&self) -> Option<&AnalysisSections> {
        match self {
            AnalysisOutcome::Success(s) => Some(s),
            AnalysisOutcome::PartialSuccess { payload, .. } => Some(payload),
            AnalysisOutcome::Failure(_) => None,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            AnalysisOutcome::PartialSuccess { warning, .. } => warning.as_deref(),
            AnalysisOutcome::Failure(e) => Some(e),
            AnalysisOutcome::Success(_) => None,
        }
    }
}

/// JSON body of a reply: a ```json fence, else the first ``` fence, else the whole text.
fn extract_json(response: &str) -> &str {
    if let Some((_, rest)) = response.split_once("```json") {
        return rest.split_once("```").map_or(rest, |(body, _)| body).trim();
    }
    if let Some((_, rest)) = response.split_once("```") {
        return rest.split_once("```").map_or(rest, |(body, _)| body).trim();
    }
    response.trim()
}

pub fn parse_response(response: &str) -> AnalysisOutcome {
    if response.trim().is_empty() {
        return AnalysisOutcome::Failure("empty response".to_string());
    }
    let body = extract_json(response);
    let warning = if body.is_empty() {
        "no JSON content in response".to_string()
    } else {
        match serde_json::from_str::<AnalysisSections>(body) {
            Ok(sections) => return AnalysisOutcome::Success(sections),
            Err(e) => format!("JSON parse error at line {} column {}: {e}", e.line(), e.column()),
        }
    };
    tracing::warn!(%warning, "analysis reply kept as raw text");
    AnalysisOutcome::PartialSuccess {
        payload: AnalysisSections {
            core_trends: crate::ingest::truncate_chars(response, RAW_FALLBACK_CHARS),
            ..Default::default()
        },
        warning: Some(warning),
    }
}
