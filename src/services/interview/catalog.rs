//! Field Catalog
//!
//! The ordered set of fields an interview collects, derived once per agent
//! from its stored schema or from the source document.
//!
//! Fields whose keys differ only by a trailing `[<n>]` share a group key. A
//! group key with more than one member is a multi-select group: its members
//! are asked in one turn; each keeps its own option (a checkbox answers with
//! its label) and the question offers the union of them.

use std::collections::{HashMap, HashSet};

use auraforming_core::{humanize_key, FieldDescriptor, FieldKind};

use crate::models::agent::StoredField;
use crate::services::document::InspectedField;
use crate::utils::error::{AppError, AppResult};

/// Ordered fields of one form
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
    group_sizes: HashMap<String, usize>,
}

impl FieldCatalog {
    /// Build a catalog from descriptors in document order.
    ///
    /// Blank and duplicate keys are dropped. Fails with a validation error when
    /// nothing usable remains.
    pub fn from_descriptors(descriptors: Vec<FieldDescriptor>) -> AppResult<Self> {
        let mut seen = HashSet::new();
        let mut fields: Vec<FieldDescriptor> = descriptors
            .into_iter()
            .filter(|f| !f.key.is_empty() && seen.insert(f.key.clone()))
            .collect();

        if fields.is_empty() {
            return Err(AppError::validation("Agent has no fields to interview."));
        }

        let mut group_sizes: HashMap<String, usize> = HashMap::new();
        for field in &fields {
            *group_sizes.entry(field.group_key.clone()).or_default() += 1;
        }

        // Each member of a multi-select group answers with its own option(s)
        for field in fields
            .iter_mut()
            .filter(|f| group_sizes[&f.group_key] > 1 && f.kind != FieldKind::Text)
        {
            let label_only = field.options.is_empty()
                || (field.kind == FieldKind::Boolean && field.has_default_boolean_options());
            if label_only {
                field.options = vec![field.label.clone()];
            }
            field.kind = FieldKind::MultiChoiceOption;
        }

        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.key.clone(), i))
            .collect();

        Ok(Self {
            fields,
            index,
            group_sizes,
        })
    }

    /// Build from a stored agent schema
    pub fn from_stored(fields: &[StoredField]) -> AppResult<Self> {
        Self::from_descriptors(
            fields
                .iter()
                .filter(|f| !f.key.trim().is_empty())
                .map(StoredField::to_descriptor)
                .collect(),
        )
    }

    /// Build from fields read out of the source document
    pub fn from_inspected(fields: &[InspectedField]) -> AppResult<Self> {
        let stored: Vec<StoredField> = fields.iter().map(StoredField::from).collect();
        Self::from_stored(&stored)
    }

    /// Build plain text fields from bare widget names
    pub fn from_widget_names(names: &[String]) -> AppResult<Self> {
        Self::from_descriptors(
            names
                .iter()
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .map(|n| FieldDescriptor::new(n, None, FieldKind::Text, Vec::new()))
                .collect(),
        )
    }

    /// All fields in document order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// All keys in document order
    pub fn keys(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&FieldDescriptor> {
        self.index.get(key).map(|&i| &self.fields[i])
    }

    /// Whether the field belongs to a multi-member group
    pub fn is_grouped(&self, key: &str) -> bool {
        self.get(key)
            .and_then(|f| self.group_sizes.get(&f.group_key))
            .is_some_and(|&n| n > 1)
    }

    /// Fields asked in the current turn: the first remaining key plus, for a
    /// group, every remaining key of the same group in order.
    pub fn current_group(&self, remaining: &[String]) -> Vec<&FieldDescriptor> {
        let Some(first) = remaining.first().and_then(|k| self.get(k)) else {
            return Vec::new();
        };
        if !self.is_grouped(&first.key) {
            return vec![first];
        }
        remaining
            .iter()
            .filter_map(|k| self.get(k))
            .filter(|f| f.group_key == first.group_key)
            .collect()
    }

    /// First remaining field outside the current group
    pub fn next_after_group(&self, remaining: &[String]) -> Option<&FieldDescriptor> {
        let current: HashSet<&str> = self
            .current_group(remaining)
            .iter()
            .map(|f| f.key.as_str())
            .collect();
        remaining
            .iter()
            .filter(|k| !current.contains(k.as_str()))
            .find_map(|k| self.get(k))
    }

    /// Fields grouped the way they are asked, in document order
    pub fn turns(&self) -> Vec<Vec<&FieldDescriptor>> {
        let mut remaining = self.keys();
        let mut turns = Vec::new();
        while !remaining.is_empty() {
            let group = self.current_group(&remaining);
            if group.is_empty() {
                break;
            }
            let asked: HashSet<&str> = group.iter().map(|f| f.key.as_str()).collect();
            remaining.retain(|k| !asked.contains(k.as_str()));
            turns.push(group);
        }
        turns
    }

    /// Label spoken for a set of fields asked together
    pub fn prompt_label(&self, group: &[&FieldDescriptor]) -> String {
        match group {
            [] => String::new(),
            [single] => single.label.clone(),
            [first, ..] => humanize_key(&first.group_key),
        }
    }

    /// Label spoken for the turn starting at the first remaining key
    pub fn label_for(&self, remaining: &[String]) -> Option<String> {
        let group = self.current_group(remaining);
        (!group.is_empty()).then(|| self.prompt_label(&group))
    }
}
