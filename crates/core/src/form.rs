//! Form Field Model
//!
//! A `FieldDescriptor` is one fillable slot of a form as the interview sees it:
//! a stable key, a human label, a native kind, and the allowed options.
//!
//! Keys may carry a repetition index (`ethnicity[0]`, `form1[0].page1[0].name[0]`).
//! Stripping a trailing `[<integer>]` yields the group key; fields whose group
//! keys collide form a multi-select group when the group has more than one member.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Native representation of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text, stored trimmed
    Text,
    /// Exactly one of the declared options (combo box, list box, radio group)
    SingleChoice,
    /// One member of a multi-select group (checkbox sharing a group key)
    MultiChoiceOption,
    /// Checkbox answered as Yes/No
    Boolean,
}

impl FieldKind {
    /// Map a document widget type name onto a field kind.
    ///
    /// Accepts the widget names used in stored schemas (`Text`, `ComboBox`,
    /// `ListBox`, `RadioButton`, `CheckBox`) as well as the snake_case kind names.
    pub fn from_source_type(source: &str) -> Option<Self> {
        match source.trim().to_ascii_lowercase().as_str() {
            "text" | "textfield" | "tx" => Some(Self::Text),
            "combobox" | "listbox" | "radiobutton" | "ch" | "single_choice" => {
                Some(Self::SingleChoice)
            }
            "checkbox" | "boolean" => Some(Self::Boolean),
            "multi_choice_option" => Some(Self::MultiChoiceOption),
            _ => None,
        }
    }

    /// Widget type name written back into stored schemas.
    pub fn source_type(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::SingleChoice => "ComboBox",
            Self::MultiChoiceOption | Self::Boolean => "CheckBox",
        }
    }

    /// Get the string form used in prompts and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::SingleChoice => "single_choice",
            Self::MultiChoiceOption => "multi_choice_option",
            Self::Boolean => "boolean",
        }
    }
}

impl FromStr for FieldKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_source_type(s)
            .ok_or_else(|| CoreError::parse(format!("Unknown field type: {}", s)))
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field to collect during an interview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Stable identifier of the field in the source document
    pub key: String,
    /// Human-readable prompt text
    pub label: String,
    /// Native value kind
    pub kind: FieldKind,
    /// Ordered allowed display values (empty for text)
    pub options: Vec<String>,
    /// Base identifier shared by members of a multi-select group
    pub group_key: String,
}

impl FieldDescriptor {
    /// Build a descriptor, filling in the label and option defaults.
    ///
    /// A missing or blank label is humanized from the key. Options are trimmed
    /// and de-duplicated in order; a boolean field without options gets `Yes`/`No`.
    pub fn new(
        key: impl Into<String>,
        label: Option<&str>,
        kind: FieldKind,
        options: Vec<String>,
    ) -> Self {
        let key = key.into().trim().to_string();
        let label = label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| humanize_key(&key));

        let mut cleaned: Vec<String> = Vec::with_capacity(options.len());
        for option in options {
            let option = option.trim();
            if !option.is_empty() && !cleaned.iter().any(|o| o == option) {
                cleaned.push(option.to_string());
            }
        }
        if kind == FieldKind::Boolean && cleaned.is_empty() {
            cleaned = vec!["Yes".to_string(), "No".to_string()];
        }

        let group_key = group_key_of(&key).to_string();
        Self {
            key,
            label,
            kind,
            options: cleaned,
            group_key,
        }
    }

    /// Whether the boolean options are the default Yes/No pair
    pub fn has_default_boolean_options(&self) -> bool {
        self.options.len() == 2 && self.options[0] == "Yes" && self.options[1] == "No"
    }
}

fn index_suffix() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[[0-9]+\]$").ok()).as_ref()
}

fn word_boundaries() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"[_\-]+", " "),
            (r"(\p{Ll})(\p{Lu})", "$1 $2"),
            (r"(\p{Alphabetic})([0-9])", "$1 $2"),
            (r"([0-9])(\p{Alphabetic})", "$1 $2"),
        ]
        .into_iter()
        .filter_map(|(pattern, with)| Regex::new(pattern).ok().map(|re| (re, with)))
        .collect()
    })
}

/// Strip a trailing `[<integer>]` index suffix from a key.
///
/// `ethnicity[1]` -> `ethnicity`; keys without a numeric suffix are returned as-is.
pub fn group_key_of(key: &str) -> &str {
    match index_suffix().and_then(|re| re.find(key)) {
        Some(suffix) => &key[..suffix.start()],
        None => key,
    }
}

/// Turn a field key into a readable label.
///
/// Uses the last dotted segment, drops index suffixes, replaces underscores and
/// dashes with spaces, splits camelCase and letter/digit boundaries, and
/// collapses whitespace into sentence case. All-caps words are kept as written.
pub fn humanize_key(key: &str) -> String {
    let base = group_key_of(key.trim());
    let segment = base.rsplit('.').next().unwrap_or(base);
    let segment = group_key_of(segment);

    let compact: String = segment
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    if compact == "fullname" || compact == "namefull" {
        return "Full name".to_string();
    }

    let spaced = word_boundaries()
        .iter()
        .fold(segment.to_string(), |text, (re, with)| {
            re.replace_all(&text, *with).into_owned()
        });

    let words: Vec<String> = spaced
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            let is_acronym = word.chars().count() > 1
                && word.chars().all(|c| !c.is_lowercase())
                && word.chars().any(|c| c.is_uppercase());
            if is_acronym {
                return word.to_string();
            }
            let lower = word.to_lowercase();
            if i == 0 {
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => lower,
                }
            } else {
                lower
            }
        })
        .collect();

    if words.is_empty() {
        key.trim().to_string()
    } else {
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key_strips_numeric_suffix() {
        assert_eq!(group_key_of("ethnicity[0]"), "ethnicity");
        assert_eq!(group_key_of("ethnicity[12]"), "ethnicity");
        assert_eq!(group_key_of("form1[0].page1[0].name[0]"), "form1[0].page1[0].name");
    }

    #[test]
    fn test_group_key_keeps_non_numeric_suffix() {
        assert_eq!(group_key_of("name"), "name");
        assert_eq!(group_key_of("choice[a]"), "choice[a]");
        assert_eq!(group_key_of("choice[]"), "choice[]");
        assert_eq!(group_key_of("choice[٣]"), "choice[٣]");
        assert_eq!(group_key_of("rows[1]x"), "rows[1]x");
    }

    #[test]
    fn test_humanize_snake_and_camel_case() {
        assert_eq!(humanize_key("first_name"), "First name");
        assert_eq!(humanize_key("dateOfBirth"), "Date of birth");
        assert_eq!(humanize_key("address2"), "Address 2");
        assert_eq!(humanize_key("  home__phone  "), "Home phone");
    }

    #[test]
    fn test_humanize_uses_last_segment_without_index() {
        assert_eq!(humanize_key("form1[0].page1[0].last_name[0]"), "Last name");
    }

    #[test]
    fn test_humanize_full_name_special_case() {
        assert_eq!(humanize_key("FULLNAME"), "Full name");
        assert_eq!(humanize_key("full_name"), "Full name");
        assert_eq!(humanize_key("fullName[0]"), "Full name");
    }

    #[test]
    fn test_humanize_keeps_acronyms() {
        assert_eq!(humanize_key("SSN"), "SSN");
        assert_eq!(humanize_key("applicant_SSN"), "Applicant SSN");
    }

    #[test]
    fn test_descriptor_defaults() {
        let field = FieldDescriptor::new("subscribe", None, FieldKind::Boolean, vec![]);
        assert_eq!(field.label, "Subscribe");
        assert_eq!(field.options, vec!["Yes", "No"]);
        assert!(field.has_default_boolean_options());
        assert_eq!(field.group_key, "subscribe");
    }

    #[test]
    fn test_descriptor_cleans_options_and_label() {
        let field = FieldDescriptor::new(
            "state",
            Some("  State of residence "),
            FieldKind::SingleChoice,
            vec!["CA".into(), " NY ".into(), "".into(), "CA".into(), "TX".into()],
        );
        assert_eq!(field.label, "State of residence");
        assert_eq!(field.options, vec!["CA", "NY", "TX"]);
    }

    #[test]
    fn test_kind_from_source_type() {
        assert_eq!(FieldKind::from_source_type("Text"), Some(FieldKind::Text));
        assert_eq!(FieldKind::from_source_type("ComboBox"), Some(FieldKind::SingleChoice));
        assert_eq!(FieldKind::from_source_type("RadioButton"), Some(FieldKind::SingleChoice));
        assert_eq!(FieldKind::from_source_type("CheckBox"), Some(FieldKind::Boolean));
        assert_eq!(FieldKind::from_source_type("Signature"), None);
        assert!("PushButton".parse::<FieldKind>().is_err());
    }
}
