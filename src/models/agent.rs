//! Agent Models
//!
//! An agent is a stored form definition: the uploaded source document plus the
//! field schema derived from it.

use serde::{Deserialize, Serialize};

use auraforming_core::{FieldDescriptor, FieldKind};

/// One field as persisted in an agent's schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredField {
    pub key: String,
    #[serde(default)]
    pub label: String,
    /// Widget type name (`Text`, `ComboBox`, `RadioButton`, `CheckBox`)
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    #[serde(default)]
    pub options: Vec<String>,
}

fn default_field_type() -> String {
    "Text".to_string()
}

impl StoredField {
    /// Build a descriptor, treating unknown widget types as free text.
    pub fn to_descriptor(&self) -> FieldDescriptor {
        let kind = FieldKind::from_source_type(&self.field_type).unwrap_or(FieldKind::Text);
        let label = (!self.label.trim().is_empty()).then_some(self.label.as_str());
        FieldDescriptor::new(self.key.clone(), label, kind, self.options.clone())
    }
}

impl From<&FieldDescriptor> for StoredField {
    fn from(field: &FieldDescriptor) -> Self {
        Self {
            key: field.key.clone(),
            label: field.label.clone(),
            field_type: field.kind.source_type().to_string(),
            options: field.options.clone(),
        }
    }
}

/// Field schema stored with an agent, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSchema {
    #[serde(default)]
    pub widget_names: Vec<String>,
    #[serde(default)]
    pub interview_fields: Vec<StoredField>,
}

impl AgentSchema {
    /// Build a schema from inspected fields
    pub fn from_fields(fields: &[StoredField]) -> Self {
        Self {
            widget_names: fields.iter().map(|f| f.key.clone()).collect(),
            interview_fields: fields.to_vec(),
        }
    }

    /// Number of fields a respondent is asked for
    pub fn field_count(&self) -> usize {
        let keyed = self
            .interview_fields
            .iter()
            .filter(|f| !f.key.trim().is_empty())
            .count();
        if keyed > 0 {
            keyed
        } else {
            self.widget_names
                .iter()
                .filter(|w| !w.trim().is_empty())
                .count()
        }
    }
}

/// A stored agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: String,
    pub agent_name: String,
    pub pdf_path: String,
    pub schema: AgentSchema,
    pub created_at: String,
}

impl AgentRecord {
    /// Create a new agent record with a generated id
    pub fn create(
        agent_name: impl Into<String>,
        pdf_path: impl Into<String>,
        schema: AgentSchema,
    ) -> Self {
        Self {
            agent_id: short_id(),
            agent_name: agent_name.into(),
            pdf_path: pdf_path.into(),
            schema,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Public link respondents open to start an interview
    pub fn share_url(&self) -> String {
        format!("/agent/{}", self.agent_id)
    }
}

/// Agent list entry for the admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    #[serde(flatten)]
    pub agent: AgentRecord,
    pub field_count: usize,
    pub intake_count: i64,
    pub share_url: String,
}

/// Outcome of deleting an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAgentResult {
    pub agent_id: String,
    pub deleted_sessions: usize,
    pub deleted_files: usize,
}

/// Field preview returned by the plain upload endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPreview {
    pub filename: String,
    pub field_count: usize,
    pub field_names: Vec<String>,
}

/// Per-agent completion statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAnalytics {
    pub completed_sessions: usize,
    pub total_fields: usize,
    pub avg_duration: String,
}

/// Twelve hex characters of a fresh v4 UUID
pub fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}
