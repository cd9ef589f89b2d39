//! Direct Submission
//!
//! Coerces a posted answers map against a form's catalog, so a submission
//! writes the same canonical values an interview would.

use std::collections::BTreeMap;

use auraforming_core::{
    coerce_boolean, coerce_group, coerce_value, is_selected, match_option, FieldDescriptor, FieldKind,
};

use super::catalog::FieldCatalog;
use crate::utils::error::{AppError, AppResult};

/// Posted answers after coercion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercedSubmission {
    pub answers: BTreeMap<String, String>,
    /// Posted keys that name no field of the form
    pub ignored: Vec<String>,
}

/// Coerce posted answers field by field.
///
/// Blank answers to single fields are skipped, and a submission that writes
/// nothing is rejected. A group is coerced as a whole
/// once any of its members is posted. A value outside a field's domain fails
/// the whole submission with a validation error naming the field's label.
pub fn coerce_submission(
    catalog: &FieldCatalog,
    posted: &BTreeMap<String, String>,
) -> AppResult<CoercedSubmission> {
    let posted: BTreeMap<&str, &str> = posted
        .iter()
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .collect();
    if posted.is_empty() {
        return Err(AppError::validation("Missing answers."));
    }

    let mut answers = BTreeMap::new();
    for turn in catalog.turns() {
        if !turn.iter().any(|f| posted.contains_key(f.key.as_str())) {
            continue;
        }
        let rejected = |raw: &str| {
            AppError::validation(format!(
                "\"{}\" is not an accepted answer for {}.",
                raw,
                catalog.prompt_label(&turn)
            ))
        };

        if let [single] = turn.as_slice() {
            let raw = posted.get(single.key.as_str()).copied().unwrap_or_default();
            if raw.is_empty() {
                continue;
            }
            let value = coerce_value(single, raw).ok_or_else(|| rejected(raw))?;
            answers.insert(single.key.clone(), value);
            continue;
        }

        let collected: Vec<String> = turn
            .iter()
            .map(|member| {
                let raw = posted.get(member.key.as_str()).copied().unwrap_or_default();
                member_selection(member, raw)
            })
            .collect();
        let Some(assigned) = coerce_group(&turn, &collected) else {
            let selected: Vec<&str> = collected
                .iter()
                .map(String::as_str)
                .filter(|v| !v.is_empty())
                .collect();
            return Err(rejected(&selected.join(", ")));
        };
        answers.extend(assigned);
    }

    if answers.is_empty() {
        return Err(AppError::validation("No posted answer matches a field of this form."));
    }

    let ignored = posted
        .keys()
        .filter(|key| catalog.get(key).is_none())
        .map(|key| key.to_string())
        .collect();

    Ok(CoercedSubmission { answers, ignored })
}

/// What a posted value selects for one group member: checkbox states map
/// onto the member's own option, option text passes through.
fn member_selection(member: &FieldDescriptor, raw: &str) -> String {
    if raw.is_empty() || member.kind == FieldKind::Text {
        return raw.to_string();
    }
    if !is_selected(raw) {
        return String::new();
    }
    if match_option(raw, &member.options).is_some() || coerce_boolean(raw, &[]).is_none() {
        return raw.to_string();
    }
    member
        .options
        .first()
        .cloned()
        .unwrap_or_else(|| raw.to_string())
}
