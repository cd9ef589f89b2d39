//! Question Writer
//!
//! Asks the oracle for one conversational question per field, or per field
//! group, in the session language. When the reply is unusable the local
//! prompt tables write the questions instead.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use auraforming_core::{group_options, FieldDescriptor, FieldKind, Language};
use auraforming_llm::{LlmProvider, LlmRequestOptions};

use super::catalog::FieldCatalog;
use super::prompts::Prompts;
use crate::models::interview::FieldQuestion;
use crate::utils::error::{AppError, AppResult};

/// Questions for a whole form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    pub questions: Vec<FieldQuestion>,
    /// Whether the oracle wrote them
    pub generated: bool,
}

/// Oracle-backed question writer
#[derive(Clone)]
pub struct QuestionWriter {
    provider: Arc<dyn LlmProvider>,
}

impl QuestionWriter {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Write one question per turn of the catalog.
    ///
    /// Auth and rate-limit failures are returned; any other oracle failure or
    /// a reply of the wrong shape falls back to the local templates.
    pub async fn write(&self, form_title: &str, catalog: &FieldCatalog, language: Language) -> AppResult<QuestionSet> {
        let turns = catalog.turns();
        let labels: Vec<String> = turns.iter().map(|t| catalog.prompt_label(t)).collect();

        let prompt = build_prompt(form_title, catalog, &turns, language);
        let reply = self
            .provider
            .generate_json(&prompt, &response_schema(), LlmRequestOptions::named("field_questions"))
            .await
            .map_err(AppError::from);

        let generated = match reply {
            Ok(value) => {
                let parsed = parse_questions(&value, turns.len());
                if parsed.is_none() {
                    warn!(
                        provider = self.provider.name(),
                        expected = turns.len(),
                        "Oracle questions unusable, using local templates"
                    );
                }
                parsed
            }
            Err(e @ (AppError::OracleAuth(_) | AppError::OracleRateLimit(_))) => return Err(e),
            Err(e) => {
                warn!(code = e.code(), error = %e, "Question generation failed, using local templates");
                None
            }
        };

        let prompts = Prompts::for_language(&language);
        let is_generated = generated.is_some();
        let texts = generated.unwrap_or_else(|| {
            turns
                .iter()
                .zip(&labels)
                .map(|(turn, label)| prompts.question(label, turn))
                .collect()
        });
        debug!(questions = texts.len(), generated = is_generated, "Questions written");

        let questions = turns
            .iter()
            .zip(labels)
            .zip(texts)
            .map(|((turn, label), question)| FieldQuestion {
                fields: turn.iter().map(|f| f.key.clone()).collect(),
                label,
                question,
            })
            .collect();

        Ok(QuestionSet {
            questions,
            generated: is_generated,
        })
    }
}

/// Output contract for question generation
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "questions": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["questions"],
        "additionalProperties": false
    })
}

fn describe_turn(catalog: &FieldCatalog, turn: &[&FieldDescriptor]) -> Value {
    let mut described = json!({ "label": catalog.prompt_label(turn) });
    if turn.len() > 1 {
        described["type"] = json!("multi_select");
        described["options"] = json!(group_options(turn));
    } else if let Some(field) = turn.first() {
        described["type"] = json!(field.kind.as_str());
        if field.kind != FieldKind::Text && !field.options.is_empty() {
            described["options"] = json!(field.options);
        }
    }
    described
}

/// Build the instruction listing every turn of the form, without field keys
pub fn build_prompt(
    form_title: &str,
    catalog: &FieldCatalog,
    turns: &[Vec<&FieldDescriptor>],
    language: Language,
) -> String {
    let fields: Vec<String> = turns
        .iter()
        .enumerate()
        .map(|(i, turn)| format!("{}. {}", i + 1, describe_turn(catalog, turn)))
        .collect();

    format!(
        r#"Write natural, conversational questions for the fields of the form "{title}".

Fields in order:
{fields}

Rules:
- Return exactly {count} entries in "questions", one per field, in the same order.
- Each question is one or two short sentences in {language} ({code}).
- For fields with options, mention the options. For multi_select fields, say that several options may be chosen.
- No numbering, no explanations, and never mention internal field identifiers."#,
        title = form_title,
        fields = fields.join("\n"),
        count = turns.len(),
        language = language.label,
        code = language.code,
    )
}

/// Questions from the oracle's reply, when it holds exactly `expected`
/// non-blank strings.
pub fn parse_questions(value: &Value, expected: usize) -> Option<Vec<String>> {
    let items = value.get("questions")?.as_array()?;
    if items.len() != expected {
        return None;
    }
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string)
        })
        .collect()
}
