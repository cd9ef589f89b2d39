//! Document Collaborators
//!
//! Reading fillable fields out of a source form and writing collected answers
//! back into it.
//!
//! ## Architecture
//! - `DocumentInspector` enumerates fields with key, label, type and options
//! - `DocumentFiller` writes a key/value mapping and returns the finished bytes
//! - `acroform.rs` implements both over `lopdf`

pub mod acroform;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::agent::StoredField;
use crate::utils::error::AppResult;

pub use acroform::AcroFormDocument;

/// A field as found in a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectedField {
    /// Fully qualified field name (`parent.child`)
    pub key: String,
    /// Tooltip text, when the document declares one
    pub label: Option<String>,
    /// Widget type name (`Text`, `ComboBox`, `ListBox`, `RadioButton`, `CheckBox`)
    pub field_type: String,
    /// Choice options, or radio on-states
    pub options: Vec<String>,
    /// Checkbox "checked" appearance name
    pub on_state: Option<String>,
}

impl From<&InspectedField> for StoredField {
    fn from(field: &InspectedField) -> Self {
        Self {
            key: field.key.clone(),
            label: field.label.clone().unwrap_or_default(),
            field_type: field.field_type.clone(),
            options: field.options.clone(),
        }
    }
}

/// Result of filling a document
#[derive(Debug, Clone)]
pub struct FilledDocument {
    pub bytes: Vec<u8>,
    /// Keys whose values were written
    pub filled: Vec<String>,
    /// Keys in the mapping that the document does not contain
    pub missing: Vec<String>,
}

/// Enumerates the fillable fields of a source document
pub trait DocumentInspector: Send + Sync {
    fn inspect(&self, bytes: &[u8]) -> AppResult<Vec<InspectedField>>;
}

/// Writes answers into a source document
pub trait DocumentFiller: Send + Sync {
    /// Fill `values` into the document, honoring each field's native type, and
    /// return a non-editable copy.
    fn fill(&self, bytes: &[u8], values: &BTreeMap<String, String>) -> AppResult<FilledDocument>;
}
