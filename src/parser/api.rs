//! JSON result extraction for the API-backed question bank.
//!
//! Items come from a typed collection; document and answer-key URLs are built
//! from the item identifier rather than scraped.

use std::fmt;

use serde::Deserialize;
use tracing::trace;

use crate::model::{DocumentKind, ResultItem, sanitize_display_name};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// Identifiers and years arrive as numbers or strings depending on endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value.trim()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiQuestion {
    id: Scalar,
    question: String,
    year: Option<Scalar>,
    examining_board: Option<Named>,
    institution: Option<Named>,
    #[serde(default)]
    has_answer: bool,
}

/// Parses one search response into items.
///
/// A body that is not a JSON object with an `items` collection is an error;
/// individual malformed records inside the collection are skipped.
///
/// # Errors
///
/// Returns the `serde_json` error when the response envelope cannot be decoded.
pub fn question_items(
    body: &str,
    base_url: &str,
) -> Result<impl Iterator<Item = ResultItem> + use<>, serde_json::Error> {
    let response: SearchResponse = serde_json::from_str(body)?;
    let base = base_url.trim_end_matches('/').to_string();
    Ok(response.items.into_iter().filter_map(move |value| {
        match serde_json::from_value::<ApiQuestion>(value) {
            Ok(question) => item_from_question(question, &base),
            Err(error) => {
                trace!(error = %error, "skipping malformed question record");
                None
            }
        }
    }))
}

fn item_from_question(question: ApiQuestion, base: &str) -> Option<ResultItem> {
    let id = question.id.to_string();
    if id.is_empty() {
        return None;
    }
    let title = sanitize_display_name(&question.question);
    if title.is_empty() {
        return None;
    }

    let name_of = |named: Option<Named>| {
        named
            .and_then(|n| n.name)
            .map(|n| n.trim().to_string())
            .unwrap_or_default()
    };

    Some(ResultItem {
        kind: DocumentKind::Exam,
        remote_url: format!("{base}/questoes/{id}/download"),
        display_name: format!("{title}_{id}"),
        year: question.year.map(|y| y.to_string()).unwrap_or_default(),
        examining_board: name_of(question.examining_board),
        institution: name_of(question.institution),
        level: None,
        answer_key_url: question
            .has_answer
            .then(|| format!("{base}/questoes/{id}/gabarito")),
    })
}
