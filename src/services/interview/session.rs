//! Interview Session
//!
//! One respondent's progress through a form. `ordered_fields` only ever
//! shrinks by whole groups, and the session is complete exactly when it is
//! empty. Oracle failures never reach this type: a failed turn leaves the
//! session untouched.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};

use auraforming_core::{coerce_group, coerce_value, is_selected, FieldDescriptor, Language};

use super::catalog::FieldCatalog;
use super::prompts::{is_substantive, Prompts};
use crate::models::agent::short_id;
use crate::models::interview::{FinalizationArtifacts, SessionSnapshot, TurnIntent, TurnJudgment};

/// Live interview state
#[derive(Debug, Clone)]
pub struct InterviewSession {
    pub session_id: String,
    pub agent_id: String,
    pub ordered_fields: Vec<String>,
    pub answers: BTreeMap<String, String>,
    pub language: Language,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Artifacts attached by finalization; the only change allowed after completion
    pub finalization: Option<FinalizationArtifacts>,
}

/// What a judged turn did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub intent: TurnIntent,
    /// Whether the answer was written and its fields consumed
    pub accepted: bool,
    /// The oracle called it adequate but no allowed value matched
    pub coercion_rejected: bool,
    /// This turn emptied `ordered_fields`
    pub completed_now: bool,
    pub assistant_response: String,
}

impl InterviewSession {
    /// Start collecting every field of the catalog in order
    pub fn start(agent_id: impl Into<String>, catalog: &FieldCatalog, language: Language) -> Self {
        let now = Utc::now();
        Self {
            session_id: short_id(),
            agent_id: agent_id.into(),
            ordered_fields: catalog.keys(),
            answers: BTreeMap::new(),
            language,
            created_at: now,
            updated_at: now,
            finalization: None,
        }
    }

    /// A completed session whose answers arrived in one direct submission
    pub fn submitted(
        agent_id: impl Into<String>,
        language: Language,
        answers: BTreeMap<String, String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: short_id(),
            agent_id: agent_id.into(),
            ordered_fields: Vec::new(),
            answers,
            language,
            created_at: now,
            updated_at: now,
            finalization: None,
        }
    }

    pub fn completed(&self) -> bool {
        self.ordered_fields.is_empty()
    }

    pub fn current_field(&self) -> Option<&str> {
        self.ordered_fields.first().map(String::as_str)
    }

    pub fn prompts(&self) -> &'static Prompts {
        Prompts::for_language(&self.language)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Seconds from start to the last accepted turn
    pub fn duration_seconds(&self) -> i64 {
        (self.updated_at - self.created_at).num_seconds().max(0)
    }

    /// Greeting that asks for the first field
    pub fn first_prompt(&self, catalog: &FieldCatalog) -> String {
        match catalog.label_for(&self.ordered_fields) {
            Some(label) => self.prompts().first_prompt(&label),
            None => self.prompts().already_complete(),
        }
    }

    /// Locally synthesized re-ask for the current field
    pub fn reprompt(&self, catalog: &FieldCatalog) -> String {
        let group = catalog.current_group(&self.ordered_fields);
        if group.is_empty() {
            return self.prompts().already_complete();
        }
        self.prompts().clarify(&catalog.prompt_label(&group), &group)
    }

    /// Collected answers as `(label, value)` pairs in document order, as shown
    /// to the oracle. Fields sharing a label each keep their own entry.
    pub fn answers_by_label(&self, catalog: &FieldCatalog) -> Vec<(String, String)> {
        let mut labelled: Vec<(String, String)> = catalog
            .fields()
            .iter()
            .filter_map(|f| {
                self.answers
                    .get(&f.key)
                    .map(|value| (f.label.clone(), value.clone()))
            })
            .collect();
        labelled.extend(
            self.answers
                .iter()
                .filter(|(key, _)| catalog.get(key).is_none())
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        labelled
    }

    /// Apply an oracle judgment to the current field or group.
    ///
    /// The answer is accepted only when the oracle judged it adequate and every
    /// value maps onto the field's domain; otherwise only `updated_at` changes.
    pub fn apply_judgment(&mut self, catalog: &FieldCatalog, judgment: &TurnJudgment) -> TurnOutcome {
        let prompts = self.prompts();

        if self.completed() {
            return TurnOutcome {
                intent: TurnIntent::Acknowledgment,
                accepted: false,
                coercion_rejected: false,
                completed_now: false,
                assistant_response: prompts.already_complete(),
            };
        }

        let group: Vec<FieldDescriptor> = catalog
            .current_group(&self.ordered_fields)
            .into_iter()
            .cloned()
            .collect();
        let members: Vec<&FieldDescriptor> = group.iter().collect();
        let label = catalog.prompt_label(&members);

        let values = if !judgment.is_adequate {
            None
        } else {
            coerce_judgment(&members, judgment)
        };
        let coercion_rejected = judgment.is_adequate && values.is_none();

        self.touch();

        let Some(values) = values else {
            let assistant_response = if !coercion_rejected && is_substantive(&judgment.spoken_response) {
                judgment.spoken_response.clone()
            } else if judgment.intent == TurnIntent::BargeIn {
                prompts.barge_in(&label)
            } else {
                prompts.clarify(&label, &members)
            };
            return TurnOutcome {
                intent: judgment.intent,
                accepted: false,
                coercion_rejected,
                completed_now: false,
                assistant_response,
            };
        };

        let consumed: HashSet<&str> = members.iter().map(|f| f.key.as_str()).collect();
        self.ordered_fields.retain(|key| !consumed.contains(key.as_str()));
        self.answers.extend(values);

        let completed_now = self.completed();
        let assistant_response = if is_substantive(&judgment.spoken_response) {
            judgment.spoken_response.clone()
        } else if completed_now {
            prompts.all_collected()
        } else {
            let next = catalog
                .label_for(&self.ordered_fields)
                .unwrap_or_default();
            prompts.advance(&next)
        };

        TurnOutcome {
            intent: judgment.intent,
            accepted: true,
            coercion_rejected: false,
            completed_now,
            assistant_response,
        }
    }

    /// Current state for clients
    pub fn snapshot(&self, catalog: &FieldCatalog) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            agent_id: self.agent_id.clone(),
            completed: self.completed(),
            current_field: self.current_field().map(str::to_string),
            current_label: catalog.label_for(&self.ordered_fields),
            ordered_fields: self.ordered_fields.clone(),
            answers: self.answers.clone(),
            language_code: self.language.code.to_string(),
            language_label: self.language.label.to_string(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
            finalization: self.finalization.clone(),
        }
    }
}

/// Coerce the judged value(s) for the current field or group
fn coerce_judgment(
    members: &[&FieldDescriptor],
    judgment: &TurnJudgment,
) -> Option<Vec<(String, String)>> {
    match members {
        [] => None,
        [single] => coerce_value(single, &judgment.raw_value).map(|v| vec![(single.key.clone(), v)]),
        _ => {
            let collected = if !judgment.collected_values.is_empty() {
                judgment.collected_values.clone()
            } else if is_selected(&judgment.raw_value) {
                vec![judgment.raw_value.clone()]
            } else {
                Vec::new()
            };
            coerce_group(members, &collected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agent::StoredField;

    fn stored(key: &str, label: &str, field_type: &str, options: &[&str]) -> StoredField {
        StoredField {
            key: key.to_string(),
            label: label.to_string(),
            field_type: field_type.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    fn sample_catalog() -> FieldCatalog {
        FieldCatalog::from_stored(&[
            stored("name", "", "Text", &[]),
            stored("state", "", "ComboBox", &["CA", "NY", "TX"]),
            stored("subscribe", "", "CheckBox", &[]),
        ])
        .unwrap()
    }

    fn judgment(intent: TurnIntent, adequate: bool, raw: &str, response: &str) -> TurnJudgment {
        TurnJudgment {
            intent,
            is_adequate: adequate,
            raw_value: raw.to_string(),
            collected_values: Vec::new(),
            spoken_response: response.to_string(),
        }
    }

    fn start(catalog: &FieldCatalog) -> InterviewSession {
        InterviewSession::start("agent1", catalog, Language::resolve(None))
    }

    #[test]
    fn test_start_asks_first_field() {
        let catalog = sample_catalog();
        let session = start(&catalog);
        assert_eq!(session.current_field(), Some("name"));
        assert_eq!(session.session_id.len(), 12);
        assert!(session.first_prompt(&catalog).contains("Let's start with Name."));
    }

    #[test]
    fn test_adequate_answer_advances() {
        let catalog = sample_catalog();
        let mut session = start(&catalog);
        let outcome = session.apply_judgment(
            &catalog,
            &judgment(TurnIntent::Data, true, "Jane Doe", ""),
        );
        assert!(outcome.accepted);
        assert_eq!(session.answers["name"], "Jane Doe");
        assert_eq!(session.current_field(), Some("state"));
        assert_eq!(outcome.assistant_response, "Great, now let's do State.");
    }

    #[test]
    fn test_unmatched_option_forces_clarification() {
        let catalog = sample_catalog();
        let mut session = start(&catalog);
        session.apply_judgment(&catalog, &judgment(TurnIntent::Data, true, "Jane", ""));

        let before = session.ordered_fields.clone();
        let outcome = session.apply_judgment(
            &catalog,
            &judgment(TurnIntent::Data, true, "somewhere out west", "Got it, thanks!"),
        );
        assert!(!outcome.accepted);
        assert!(outcome.coercion_rejected);
        assert_eq!(session.ordered_fields, before);
        assert!(outcome.assistant_response.contains("CA, NY, TX"));
        assert!(!session.answers.contains_key("state"));
    }

    #[test]
    fn test_inadequate_keeps_oracle_clarification() {
        let catalog = sample_catalog();
        let mut session = start(&catalog);
        let outcome = session.apply_judgment(
            &catalog,
            &judgment(TurnIntent::Clarification, false, "", "Could you spell your name?"),
        );
        assert!(!outcome.accepted);
        assert_eq!(outcome.assistant_response, "Could you spell your name?");
        assert_eq!(session.ordered_fields.len(), 3);
    }

    #[test]
    fn test_barge_in_fallback() {
        let catalog = sample_catalog();
        let mut session = start(&catalog);
        let outcome = session.apply_judgment(&catalog, &judgment(TurnIntent::BargeIn, false, "", "ok"));
        assert_eq!(outcome.assistant_response, "Got it. Let's continue with Name.");
    }

    #[test]
    fn test_completion_and_idempotent_ack() {
        let catalog = sample_catalog();
        let mut session = start(&catalog);
        session.apply_judgment(&catalog, &judgment(TurnIntent::Data, true, "Jane", ""));
        session.apply_judgment(&catalog, &judgment(TurnIntent::Data, true, "ny", ""));
        assert_eq!(session.answers["state"], "NY");

        let outcome = session.apply_judgment(&catalog, &judgment(TurnIntent::Data, true, "yeah sure", ""));
        assert!(outcome.completed_now);
        assert!(session.completed());
        assert_eq!(session.answers["subscribe"], "Yes");
        assert_eq!(outcome.assistant_response, "Thanks. We have all missing fields now.");

        let answers = session.answers.clone();
        let again = session.apply_judgment(&catalog, &judgment(TurnIntent::Data, true, "No", ""));
        assert!(!again.accepted);
        assert_eq!(again.assistant_response, "Thanks. I have all required information.");
        assert_eq!(session.answers, answers);
    }

    #[test]
    fn test_group_consumed_atomically() {
        let catalog = FieldCatalog::from_stored(&[
            stored("ethnicity[0]", "Hispanic", "CheckBox", &[]),
            stored("ethnicity[1]", "Asian", "CheckBox", &[]),
            stored("ethnicity[2]", "Other", "CheckBox", &[]),
            stored("zip", "", "Text", &[]),
        ])
        .unwrap();
        let mut session = start(&catalog);

        let mut bad = judgment(TurnIntent::Data, true, "", "");
        bad.collected_values = vec!["Hispanic".into(), "Martian".into()];
        let outcome = session.apply_judgment(&catalog, &bad);
        assert!(!outcome.accepted);
        assert_eq!(session.ordered_fields.len(), 4);

        let mut good = judgment(TurnIntent::Data, true, "", "");
        good.collected_values = vec!["Hispanic".into(), "Asian".into()];
        let outcome = session.apply_judgment(&catalog, &good);
        assert!(outcome.accepted);
        assert_eq!(session.ordered_fields, vec!["zip"]);
        assert_eq!(session.answers["ethnicity[0]"], "Hispanic");
        assert_eq!(session.answers["ethnicity[1]"], "Asian");
        assert_eq!(session.answers["ethnicity[2]"], "");
        assert_eq!(outcome.assistant_response, "Great, now let's do Zip.");
    }

    #[test]
    fn test_snapshot_and_answers_by_label() {
        let catalog = sample_catalog();
        let mut session = start(&catalog);
        session.apply_judgment(&catalog, &judgment(TurnIntent::Data, true, "Jane", ""));

        let snapshot = session.snapshot(&catalog);
        assert_eq!(snapshot.current_field.as_deref(), Some("state"));
        assert_eq!(snapshot.current_label.as_deref(), Some("State"));
        assert_eq!(snapshot.language_code, "en-US");
        assert_eq!(
            session.answers_by_label(&catalog),
            vec![("Name".to_string(), "Jane".to_string())]
        );
        assert!(session.reprompt(&catalog).contains("The options are: CA, NY, TX."));
    }

    #[test]
    fn test_answers_by_label_keeps_repeated_labels() {
        let catalog = FieldCatalog::from_stored(&[
            stored("start_date", "Date", "Text", &[]),
            stored("end_date", "Date", "Text", &[]),
            stored("name", "", "Text", &[]),
        ])
        .unwrap();
        let mut session = start(&catalog);
        session.apply_judgment(&catalog, &judgment(TurnIntent::Data, true, "2024-01-01", ""));
        session.apply_judgment(&catalog, &judgment(TurnIntent::Data, true, "2024-12-31", ""));

        assert_eq!(
            session.answers_by_label(&catalog),
            vec![
                ("Date".to_string(), "2024-01-01".to_string()),
                ("Date".to_string(), "2024-12-31".to_string()),
            ]
        );
    }

    fn ethnicity_catalog() -> FieldCatalog {
        FieldCatalog::from_stored(&[
            stored("ethnicity[0]", "Hispanic", "CheckBox", &[]),
            stored("ethnicity[1]", "Asian", "CheckBox", &[]),
            stored("zip", "", "Text", &[]),
        ])
        .unwrap()
    }

    #[test]
    fn test_group_single_later_option_checks_its_own_box() {
        let catalog = ethnicity_catalog();
        let mut session = start(&catalog);
        let mut only_asian = judgment(TurnIntent::Data, true, "", "");
        only_asian.collected_values = vec!["Asian".into()];

        let outcome = session.apply_judgment(&catalog, &only_asian);
        assert!(outcome.accepted);
        assert_eq!(session.answers["ethnicity[0]"], "");
        assert_eq!(session.answers["ethnicity[1]"], "Asian");
    }

    #[test]
    fn test_group_none_of_these_advances() {
        let catalog = ethnicity_catalog();
        for raw in ["", "None of these"] {
            let mut session = start(&catalog);
            let mut none = judgment(TurnIntent::Data, true, raw, "");
            none.collected_values = if raw.is_empty() {
                vec![String::new(), String::new()]
            } else {
                Vec::new()
            };

            let outcome = session.apply_judgment(&catalog, &none);
            assert!(outcome.accepted, "{raw:?}");
            assert_eq!(session.ordered_fields, vec!["zip"]);
            assert_eq!(session.answers["ethnicity[0]"], "");
            assert_eq!(session.answers["ethnicity[1]"], "");
        }
    }

    #[test]
    fn test_group_single_value_falls_back_to_normalized_value() {
        let catalog = ethnicity_catalog();
        let mut session = start(&catalog);
        let outcome = session.apply_judgment(&catalog, &judgment(TurnIntent::Data, true, "asian", ""));
        assert!(outcome.accepted);
        assert_eq!(session.answers["ethnicity[1]"], "Asian");
    }
}
