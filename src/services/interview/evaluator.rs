//! Turn Evaluator
//!
//! Asks the oracle how one utterance relates to the field (or field group)
//! being asked, and validates the structured verdict it returns.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use auraforming_core::{group_options, FieldDescriptor, FieldKind, Language};
use auraforming_llm::{LlmProvider, LlmRequestOptions};

use crate::models::interview::{TurnIntent, TurnJudgment};
use crate::utils::error::{AppError, AppResult};

/// Language the filled document is written in
const BASE_LANGUAGE: &str = "English";

/// Everything the oracle sees for one turn. Field keys are never included.
#[derive(Debug)]
pub struct TurnContext<'a> {
    pub form_title: &'a str,
    /// Label spoken for the current field or group
    pub current_label: &'a str,
    /// Current field, or every member of the current group
    pub current: &'a [&'a FieldDescriptor],
    pub next: Option<&'a FieldDescriptor>,
    pub remaining: &'a [&'a FieldDescriptor],
    /// Collected `(label, value)` pairs in document order
    pub answers: &'a [(String, String)],
    pub utterance: &'a str,
    pub was_interruption: bool,
    pub language: Language,
}

impl TurnContext<'_> {
    pub fn is_grouped(&self) -> bool {
        self.current.len() > 1
    }
}

/// Oracle-backed evaluator
#[derive(Clone)]
pub struct TurnEvaluator {
    provider: Arc<dyn LlmProvider>,
}

impl TurnEvaluator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Judge one utterance.
    ///
    /// Oracle auth/rate-limit/transport failures keep their kind; a reply that
    /// violates the output contract is an `OracleRequest` error.
    pub async fn evaluate(&self, ctx: &TurnContext<'_>) -> AppResult<TurnJudgment> {
        let prompt = build_prompt(ctx);
        let schema = response_schema();
        let call_id = Uuid::new_v4().simple().to_string();

        debug!(
            call_id = %call_id,
            provider = self.provider.name(),
            model = self.provider.model(),
            fields = ?schema_fields(&schema),
            grouped = ctx.is_grouped(),
            "Evaluating turn"
        );

        let value = self
            .provider
            .generate_json(&prompt, &schema, LlmRequestOptions::named("turn_judgment"))
            .await?;

        let judgment = parse_judgment(&value, ctx.is_grouped())?;
        debug!(
            call_id = %call_id,
            intent = judgment.intent.as_str(),
            adequate = judgment.is_adequate,
            "Turn evaluated"
        );
        Ok(judgment)
    }
}

fn schema_fields(schema: &Value) -> Vec<String> {
    schema["properties"]
        .as_object()
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default()
}

/// Output contract given to the oracle
pub fn response_schema() -> Value {
    let intents: Vec<&str> = TurnIntent::all().iter().map(TurnIntent::as_str).collect();
    json!({
        "type": "object",
        "properties": {
            "intent": { "type": "string", "enum": intents },
            "is_answer_adequate": { "type": "boolean" },
            "normalized_value": { "type": "string" },
            "collected_values": { "type": "array", "items": { "type": "string" } },
            "assistant_response": { "type": "string" }
        },
        "required": [
            "intent",
            "is_answer_adequate",
            "normalized_value",
            "collected_values",
            "assistant_response"
        ],
        "additionalProperties": false
    })
}

fn describe_field(field: &FieldDescriptor) -> Value {
    let mut described = json!({
        "label": field.label,
        "type": field.kind.as_str(),
    });
    if field.kind != FieldKind::Text && !field.options.is_empty() {
        described["options"] = json!(field.options);
    }
    described
}

fn answers_json(answers: &[(String, String)]) -> Value {
    Value::Array(
        answers
            .iter()
            .map(|(label, value)| json!({ "label": label, "value": value }))
            .collect(),
    )
}

/// Build the instruction for one turn
pub fn build_prompt(ctx: &TurnContext<'_>) -> String {
    let current = if ctx.is_grouped() {
        json!({
            "label": ctx.current_label,
            "type": "multi_select",
            "members": ctx.current.len(),
            "options": group_options(ctx.current),
        })
    } else {
        ctx.current
            .first()
            .map(|f| describe_field(f))
            .unwrap_or(Value::Null)
    };
    let next = ctx.next.map(describe_field).unwrap_or(Value::Null);
    let remaining: Vec<Value> = ctx.remaining.iter().map(|f| describe_field(f)).collect();

    let group_rule = if ctx.is_grouped() {
        format!(
            "- The current question is multi-select. Put every option the user selected in \"collected_values\", each exactly as listed, at most {} entries. When the user clearly says none of the options apply, the answer is adequate and \"collected_values\" is empty.\n",
            ctx.current.len()
        )
    } else {
        "- Leave \"collected_values\" empty.\n".to_string()
    };

    format!(
        r#"You are validating one turn in a voice interview that fills the form "{title}".

Current field (evaluate only this field): {current}
Next field after this one: {next}
Remaining fields in order: {remaining}
Already collected answers: {answers}
User transcript: "{utterance}"
Interruption while assistant was speaking: {interruption}
Conversation language: {language} ({code})

Rules:
- Mark "is_answer_adequate" true ONLY when the user explicitly and unambiguously stated their own value for the current field.
- If the answer is unclear, partial, about someone else, or off-topic, use intent "clarification", mark it inadequate, and ask a short clarification for the same field.
- If the user interrupted or asked a side question, use intent "barge_in", answer briefly, then return to the current field.
- Prefer clarification over guessing. Do not assume or infer information.
- For fields with options, "normalized_value" must be exactly one of the listed options.
- For yes/no fields, "normalized_value" must be "Yes" or "No".
- "normalized_value" and "collected_values" are written into the document: always give them in {base}, whatever language the user speaks. Transliterate names and addresses written in non-Latin scripts instead of translating them.
{group_rule}- "assistant_response" is spoken aloud in {language}. Keep it to one or two short sentences. When the answer is adequate, acknowledge it and ask for the next field; when it is the last field, thank the user.
- Never ask for more than one field at a time, never ask for fields outside the remaining list, and never mention internal field identifiers."#,
        title = ctx.form_title,
        current = current,
        next = next,
        remaining = Value::Array(remaining),
        answers = answers_json(ctx.answers),
        utterance = ctx.utterance.replace('"', "'"),
        interruption = ctx.was_interruption,
        language = ctx.language.label,
        code = ctx.language.code,
        base = BASE_LANGUAGE,
        group_rule = group_rule,
    )
}

/// Validate the oracle's reply against the output contract.
pub fn parse_judgment(value: &Value, grouped: bool) -> AppResult<TurnJudgment> {
    let invalid = |what: &str| AppError::OracleRequest(format!("Invalid turn judgment: {}", what));

    let obj = value.as_object().ok_or_else(|| invalid("not an object"))?;

    let intent = obj
        .get("intent")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing intent"))?;
    let intent = TurnIntent::parse(intent).ok_or_else(|| invalid(&format!("unknown intent {:?}", intent)))?;

    let is_adequate = obj
        .get("is_answer_adequate")
        .and_then(Value::as_bool)
        .ok_or_else(|| invalid("missing is_answer_adequate"))?;

    let raw_value = obj
        .get("normalized_value")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing normalized_value"))?
        .trim()
        .to_string();

    let spoken_response = obj
        .get("assistant_response")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing assistant_response"))?
        .trim()
        .to_string();

    let collected_values = match obj.get("collected_values") {
        None | Some(Value::Null) if !grouped => Vec::new(),
        None | Some(Value::Null) => return Err(invalid("missing collected_values")),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| invalid("collected_values must hold strings"))
            })
            .collect::<AppResult<Vec<_>>>()?,
        Some(_) => return Err(invalid("collected_values must be an array")),
    };

    Ok(TurnJudgment {
        intent,
        is_adequate,
        raw_value,
        collected_values: if grouped { collected_values } else { Vec::new() },
        spoken_response,
    })
}
