//! Value Coercion
//!
//! Turns a judged free-text value into the canonical stored representation of
//! a field. This is the only place yes/no token recognition and option
//! matching live; the interview, direct submissions, the upload preview, and
//! finalization all go through it.
//!
//! Absence of a satisfying mapping is `None`, never an error. Callers treat
//! `None` as "answer still inadequate".

use std::sync::OnceLock;

use regex::Regex;

use crate::form::{FieldDescriptor, FieldKind};

/// Canonical affirmative value stored for boolean fields
pub const CANONICAL_YES: &str = "Yes";
/// Canonical negative value stored for boolean fields
pub const CANONICAL_NO: &str = "No";

const AFFIRMATIVE_TOKENS: &[&str] = &[
    // en
    "yes", "y", "yeah", "yea", "yep", "yup", "sure", "ok", "okay", "true", "correct",
    "affirmative", "absolutely", "definitely", "certainly", "of course", "i agree", "agree",
    "agreed", "i do", "checked", "check", "on", "1", "x",
    // es / pt / it
    "si", "sí", "claro", "por supuesto", "sim", "certo", "certamente", "va bene",
    // fr / de
    "oui", "bien sûr", "d accord", "ja", "jawohl", "genau", "natürlich",
    // zh / ja / ko
    "是", "是的", "对", "对的", "好", "好的", "はい", "ええ", "うん", "네", "예", "응",
    // ru / hi
    "да", "конечно", "हाँ", "हां", "जी", "जी हाँ",
];

const NEGATIVE_TOKENS: &[&str] = &[
    // en
    "no", "n", "nope", "nah", "false", "negative", "never", "not really", "i disagree",
    "disagree", "i do not", "i don t", "unchecked", "off", "0", "none",
    // es / pt / it / fr / de
    "não", "nao", "non", "nein", "nee", "niente", "nunca", "jamais",
    // zh / ja / ko
    "否", "不", "不是", "没有", "不要", "いいえ", "いや", "아니요", "아니오", "아니",
    // ru / hi
    "нет", "नहीं", "ना",
];

const NEGATION_MARKERS: &[&str] = &[
    "not", "no", "never", "don t", "dont", "do not", "doesn t", "didn t", "won t", "can t",
    "refuse", "decline", "withhold", "without", "nicht", "pas", "não", "nao", "нет", "не",
];

fn separator_runs() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[^\p{Alphabetic}\p{N}]+").ok())
        .as_ref()
}

/// Lower-case and collapse every run of non-alphanumeric characters into a
/// single space.
pub fn normalize_for_match(value: &str) -> String {
    let lowered = value.to_lowercase();
    match separator_runs() {
        Some(re) => re.replace_all(&lowered, " ").trim().to_string(),
        None => lowered.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

fn token_in(normalized: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| normalize_for_match(t) == normalized)
}

fn has_negation(normalized: &str) -> bool {
    let padded = format!(" {} ", normalized);
    NEGATION_MARKERS
        .iter()
        .any(|m| padded.contains(&format!(" {} ", normalize_for_match(m))))
}

/// Map a yes/no style answer onto `Yes` / `No`.
///
/// Recognizes a multilingual token set. A mention of consent qualified by a
/// negation maps to `No`. Unrecognized input falls through to option matching
/// when the field declares its own options, and yields `None` otherwise.
pub fn coerce_boolean(raw: &str, declared_options: &[String]) -> Option<String> {
    let normalized = normalize_for_match(raw);
    if normalized.is_empty() {
        return None;
    }

    if normalized.contains("consent") {
        let answer = if has_negation(&normalized) {
            CANONICAL_NO
        } else {
            CANONICAL_YES
        };
        return Some(answer.to_string());
    }

    if token_in(&normalized, AFFIRMATIVE_TOKENS) {
        return Some(CANONICAL_YES.to_string());
    }
    if token_in(&normalized, NEGATIVE_TOKENS) {
        return Some(CANONICAL_NO.to_string());
    }

    let first = normalized.split(' ').next().unwrap_or_default();
    if token_in(first, NEGATIVE_TOKENS) {
        return Some(CANONICAL_NO.to_string());
    }
    if token_in(first, AFFIRMATIVE_TOKENS) {
        let rest = normalized[first.len()..].trim();
        if rest.is_empty() || !has_negation(rest) {
            return Some(CANONICAL_YES.to_string());
        }
    }

    if declared_options.is_empty() {
        None
    } else {
        match_option(raw, declared_options)
    }
}

/// Match a raw value against the declared options.
///
/// Stages, each over all options in order: exact match, normalized equality,
/// normalized substring in either direction. The first hit wins.
pub fn match_option(raw: &str, options: &[String]) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || options.is_empty() {
        return None;
    }

    if let Some(option) = options.iter().find(|o| o.as_str() == raw) {
        return Some(option.clone());
    }

    let needle = normalize_for_match(raw);
    if needle.is_empty() {
        return None;
    }
    let normalized: Vec<String> = options.iter().map(|o| normalize_for_match(o)).collect();

    if let Some(idx) = normalized.iter().position(|o| *o == needle) {
        return Some(options[idx].clone());
    }

    normalized
        .iter()
        .position(|o| !o.is_empty() && (needle.contains(o.as_str()) || o.contains(&needle)))
        .map(|idx| options[idx].clone())
}

/// Coerce a judged value for a single (ungrouped) field.
pub fn coerce_value(field: &FieldDescriptor, raw: &str) -> Option<String> {
    match field.kind {
        FieldKind::Text => {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        FieldKind::Boolean => {
            let declared: &[String] = if field.has_default_boolean_options() {
                &[]
            } else {
                &field.options
            };
            coerce_boolean(raw, declared)
        }
        FieldKind::SingleChoice | FieldKind::MultiChoiceOption => {
            if field.options.is_empty() {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            } else {
                match_option(raw, &field.options)
            }
        }
    }
}

/// Union of the members' own options, in member order.
///
/// This is what a multi-select group offers when it is asked as one question.
pub fn group_options(members: &[&FieldDescriptor]) -> Vec<String> {
    let mut union: Vec<String> = Vec::new();
    for option in members.iter().flat_map(|m| m.options.iter()) {
        if !union.contains(option) {
            union.push(option.clone());
        }
    }
    union
}

fn exact_option(raw: &str, options: &[String]) -> Option<String> {
    let needle = normalize_for_match(raw);
    if needle.is_empty() {
        return None;
    }
    options
        .iter()
        .find(|o| normalize_for_match(o) == needle)
        .cloned()
}

/// Distribute collected values over a group's members.
///
/// Each member only accepts one of its own options. A non-blank entry goes to
/// the member at the same position when that member accepts it, otherwise to
/// the first free member that does; exact matches are tried across the group
/// before looser substring matches. A member without options accepts any text
/// at its own position. Members left without a value receive an empty string
/// (not selected), so an answer selecting nothing is a valid distribution.
///
/// Returns `None` when a non-blank entry fits no free member.
pub fn coerce_group(
    members: &[&FieldDescriptor],
    collected: &[String],
) -> Option<Vec<(String, String)>> {
    if members.is_empty() {
        return None;
    }

    let mut assigned: Vec<Option<String>> = vec![None; members.len()];
    for (position, raw) in collected.iter().enumerate() {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let mut order: Vec<usize> = Vec::with_capacity(members.len());
        if position < members.len() {
            order.push(position);
        }
        order.extend((0..members.len()).filter(|&i| i != position));

        let free = |i: &usize| assigned[*i].is_none();
        let hit = order
            .iter()
            .copied()
            .filter(free)
            .find_map(|i| exact_option(raw, &members[i].options).map(|v| (i, v)))
            .or_else(|| {
                order
                    .iter()
                    .copied()
                    .filter(free)
                    .find_map(|i| match_option(raw, &members[i].options).map(|v| (i, v)))
            })
            .or_else(|| {
                members
                    .get(position)
                    .filter(|m| m.options.is_empty() && assigned[position].is_none())
                    .map(|_| (position, raw.to_string()))
            });

        let (slot, value) = hit?;
        assigned[slot] = Some(value);
    }

    Some(
        members
            .iter()
            .zip(assigned)
            .map(|(member, value)| (member.key.clone(), value.unwrap_or_default()))
            .collect(),
    )
}

/// Whether a stored value means "checked" for a checkbox widget.
///
/// Empty strings and recognized negatives are unchecked; anything else
/// (canonical `Yes`, a matched option label) is checked.
pub fn is_selected(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    coerce_boolean(trimmed, &[]).as_deref() != Some(CANONICAL_NO)
}
