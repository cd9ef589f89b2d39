//! AcroForm Documents
//!
//! Field inspection and filling for interactive PDF forms using `lopdf`.
//! Filled documents have every field marked read-only and `NeedAppearances`
//! set so viewers regenerate the widget appearances.

use std::collections::{BTreeMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::debug;

use auraforming_core::{is_selected, match_option};

use super::{DocumentFiller, DocumentInspector, FilledDocument, InspectedField};
use crate::utils::error::{AppError, AppResult};

const FF_READ_ONLY: i64 = 1;
const FF_RADIO: i64 = 1 << 15;
const FF_PUSHBUTTON: i64 = 1 << 16;
const FF_COMBO: i64 = 1 << 17;
const OFF_STATE: &str = "Off";
/// Guard against malformed, cyclic field trees
const MAX_FIELD_DEPTH: usize = 32;

/// `lopdf`-backed inspector and filler
#[derive(Debug, Clone, Copy, Default)]
pub struct AcroFormDocument;

impl AcroFormDocument {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WidgetKind {
    Text,
    ComboBox,
    ListBox,
    RadioButton,
    CheckBox,
}

impl WidgetKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::ComboBox => "ComboBox",
            Self::ListBox => "ListBox",
            Self::RadioButton => "RadioButton",
            Self::CheckBox => "CheckBox",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ChoiceOption {
    export: String,
    display: String,
}

/// A terminal field with its widget annotations
#[derive(Debug, Clone)]
struct FieldNode {
    id: ObjectId,
    key: String,
    kind: WidgetKind,
    flags: i64,
    label: Option<String>,
    options: Vec<ChoiceOption>,
    /// Widget object and its "on" appearance name
    widgets: Vec<(ObjectId, Option<String>)>,
}

impl FieldNode {
    fn on_states(&self) -> Vec<String> {
        let mut states: Vec<String> = Vec::new();
        for state in self.widgets.iter().filter_map(|(_, s)| s.clone()) {
            if !states.contains(&state) {
                states.push(state);
            }
        }
        states
    }

    fn to_inspected(&self) -> InspectedField {
        let options = match self.kind {
            WidgetKind::RadioButton => self.on_states(),
            WidgetKind::ComboBox | WidgetKind::ListBox => {
                self.options.iter().map(|o| o.display.clone()).collect()
            }
            WidgetKind::Text | WidgetKind::CheckBox => Vec::new(),
        };
        let on_state = match self.kind {
            WidgetKind::CheckBox => self.on_states().into_iter().next(),
            _ => None,
        };
        InspectedField {
            key: self.key.clone(),
            label: self.label.clone(),
            field_type: self.kind.as_str().to_string(),
            options,
            on_state,
        }
    }
}

/// Attributes a field inherits from its ancestors
#[derive(Debug, Clone, Default)]
struct Inherited {
    field_type: Option<Vec<u8>>,
    flags: i64,
    options: Option<Vec<ChoiceOption>>,
}

impl DocumentInspector for AcroFormDocument {
    fn inspect(&self, bytes: &[u8]) -> AppResult<Vec<InspectedField>> {
        let doc = load(bytes)?;
        let mut seen = HashSet::new();
        let fields: Vec<InspectedField> = collect_fields(&doc)?
            .iter()
            .filter(|node| seen.insert(node.key.clone()))
            .map(FieldNode::to_inspected)
            .collect();
        debug!(field_count = fields.len(), "Inspected form fields");
        Ok(fields)
    }
}

impl DocumentFiller for AcroFormDocument {
    fn fill(&self, bytes: &[u8], values: &BTreeMap<String, String>) -> AppResult<FilledDocument> {
        let mut doc = load(bytes)?;
        let nodes = collect_fields(&doc)?;

        let mut filled = Vec::new();
        for node in &nodes {
            if let Some(value) = values.get(&node.key) {
                apply_value(&mut doc, node, value)?;
                filled.push(node.key.clone());
            }
            set_entry(&mut doc, node.id, "Ff", Object::Integer(node.flags | FF_READ_ONLY))?;
        }

        let known: HashSet<&str> = nodes.iter().map(|n| n.key.as_str()).collect();
        let missing: Vec<String> = values
            .keys()
            .filter(|k| !known.contains(k.as_str()))
            .cloned()
            .collect();

        set_need_appearances(&mut doc);

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| AppError::document(format!("Could not write PDF: {}", e)))?;

        debug!(
            filled = filled.len(),
            missing = missing.len(),
            "Filled form document"
        );
        Ok(FilledDocument {
            bytes: out,
            filled,
            missing,
        })
    }
}

// ============================================================================
// Field tree
// ============================================================================

fn load(bytes: &[u8]) -> AppResult<Document> {
    Document::load_mem(bytes).map_err(|e| AppError::document(format!("Could not read PDF: {}", e)))
}

fn pdf_error(e: lopdf::Error) -> AppError {
    AppError::document(format!("Invalid PDF structure: {}", e))
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn root_id(doc: &Document) -> AppResult<ObjectId> {
    doc.trailer
        .get(b"Root")
        .and_then(|o| o.as_reference())
        .map_err(pdf_error)
}

fn acroform_dict(doc: &Document) -> AppResult<Option<&Dictionary>> {
    let catalog = doc.get_dictionary(root_id(doc)?).map_err(pdf_error)?;
    Ok(catalog
        .get(b"AcroForm")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok()))
}

fn collect_fields(doc: &Document) -> AppResult<Vec<FieldNode>> {
    let Some(acroform) = acroform_dict(doc)? else {
        return Ok(Vec::new());
    };
    let Some(roots) = acroform
        .get(b"Fields")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_array().ok())
    else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    let mut visited = HashSet::new();
    for id in roots.iter().filter_map(|o| o.as_reference().ok()) {
        walk(doc, id, None, &Inherited::default(), 0, &mut visited, &mut out);
    }
    Ok(out)
}

fn walk(
    doc: &Document,
    id: ObjectId,
    parent_key: Option<&str>,
    inherited: &Inherited,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<FieldNode>,
) {
    if depth > MAX_FIELD_DEPTH || !visited.insert(id) {
        return;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        return;
    };

    let partial = text_entry(doc, dict, b"T");
    let key = match (parent_key, partial.as_deref()) {
        (Some(parent), Some(name)) => format!("{}.{}", parent, name),
        (None, Some(name)) => name.to_string(),
        (Some(parent), None) => parent.to_string(),
        (None, None) => String::new(),
    };

    let mut inherited = inherited.clone();
    if let Ok(ft) = dict.get(b"FT").and_then(|o| o.as_name()) {
        inherited.field_type = Some(ft.to_vec());
    }
    if let Ok(ff) = dict.get(b"Ff").and_then(|o| o.as_i64()) {
        inherited.flags = ff;
    }
    if let Ok(opt) = dict.get(b"Opt") {
        inherited.options = Some(parse_options(doc, resolve(doc, opt)));
    }

    let kids: Vec<ObjectId> = dict
        .get(b"Kids")
        .ok()
        .and_then(|k| resolve(doc, k).as_array().ok())
        .map(|arr| arr.iter().filter_map(|o| o.as_reference().ok()).collect())
        .unwrap_or_default();
    let child_fields: Vec<ObjectId> = kids
        .iter()
        .copied()
        .filter(|kid| doc.get_dictionary(*kid).map(|d| d.has(b"T")).unwrap_or(false))
        .collect();

    if !child_fields.is_empty() {
        let parent = (!key.is_empty()).then_some(key.as_str());
        for kid in child_fields {
            walk(doc, kid, parent, &inherited, depth + 1, visited, out);
        }
        return;
    }

    if key.is_empty() {
        return;
    }
    let Some(kind) = widget_kind(inherited.field_type.as_deref(), inherited.flags) else {
        return;
    };

    let widget_ids = if kids.is_empty() { vec![id] } else { kids };
    let widgets = widget_ids
        .into_iter()
        .map(|w| (w, widget_on_state(doc, w)))
        .collect();

    out.push(FieldNode {
        id,
        key,
        kind,
        flags: inherited.flags,
        label: text_entry(doc, dict, b"TU")
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        options: inherited.options.unwrap_or_default(),
        widgets,
    });
}

fn widget_kind(field_type: Option<&[u8]>, flags: i64) -> Option<WidgetKind> {
    match field_type? {
        b"Tx" => Some(WidgetKind::Text),
        b"Ch" if flags & FF_COMBO != 0 => Some(WidgetKind::ComboBox),
        b"Ch" => Some(WidgetKind::ListBox),
        b"Btn" if flags & FF_PUSHBUTTON != 0 => None,
        b"Btn" if flags & FF_RADIO != 0 => Some(WidgetKind::RadioButton),
        b"Btn" => Some(WidgetKind::CheckBox),
        _ => None,
    }
}

/// First normal-appearance state that is not `Off`
fn widget_on_state(doc: &Document, widget: ObjectId) -> Option<String> {
    let dict = doc.get_dictionary(widget).ok()?;
    let appearance = resolve(doc, dict.get(b"AP").ok()?).as_dict().ok()?;
    let normal = resolve(doc, appearance.get(b"N").ok()?).as_dict().ok()?;
    normal
        .iter()
        .map(|(name, _)| String::from_utf8_lossy(name).to_string())
        .find(|name| name != OFF_STATE)
}

fn parse_options(doc: &Document, obj: &Object) -> Vec<ChoiceOption> {
    let Ok(items) = obj.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match resolve(doc, item) {
            Object::Array(pair) if pair.len() >= 2 => {
                let export = resolve(doc, &pair[0]).as_str().ok().map(decode_text_string)?;
                let display = resolve(doc, &pair[1]).as_str().ok().map(decode_text_string)?;
                Some(ChoiceOption { export, display })
            }
            other => other.as_str().ok().map(decode_text_string).map(|s| ChoiceOption {
                export: s.clone(),
                display: s,
            }),
        })
        .collect()
}

fn text_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    let obj = resolve(doc, dict.get(key).ok()?);
    obj.as_str().ok().map(decode_text_string)
}

/// Decode a PDF text string (UTF-16BE with BOM, else single-byte)
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

fn encode_text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::string_literal(value);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

// ============================================================================
// Filling
// ============================================================================

fn set_entry(doc: &mut Document, id: ObjectId, key: &str, value: Object) -> AppResult<()> {
    let dict = doc
        .get_object_mut(id)
        .and_then(|o| o.as_dict_mut())
        .map_err(pdf_error)?;
    dict.set(key, value);
    Ok(())
}

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

fn apply_value(doc: &mut Document, node: &FieldNode, value: &str) -> AppResult<()> {
    match node.kind {
        WidgetKind::Text => set_entry(doc, node.id, "V", encode_text_string(value)),
        WidgetKind::ComboBox | WidgetKind::ListBox => {
            let export = node
                .options
                .iter()
                .find(|o| o.display == value)
                .map(|o| o.export.as_str())
                .unwrap_or(value);
            set_entry(doc, node.id, "V", encode_text_string(export))
        }
        WidgetKind::CheckBox => {
            let checked = is_selected(value);
            let field_on = node.on_states().into_iter().next().unwrap_or_else(|| "Yes".to_string());
            for (widget, on) in &node.widgets {
                let state = match (checked, on) {
                    (true, Some(on)) => on.as_str(),
                    (true, None) => field_on.as_str(),
                    (false, _) => OFF_STATE,
                };
                set_entry(doc, *widget, "AS", name(state))?;
            }
            let state = if checked { field_on.as_str() } else { OFF_STATE };
            set_entry(doc, node.id, "V", name(state))
        }
        WidgetKind::RadioButton => {
            let chosen = match_option(value, &node.on_states());
            for (widget, on) in &node.widgets {
                let state = match (&chosen, on) {
                    (Some(chosen), Some(on)) if chosen == on => on.as_str(),
                    _ => OFF_STATE,
                };
                set_entry(doc, *widget, "AS", name(state))?;
            }
            let state = chosen.as_deref().unwrap_or(OFF_STATE);
            set_entry(doc, node.id, "V", name(state))
        }
    }
}

fn set_need_appearances(doc: &mut Document) {
    let Ok(root) = root_id(doc) else {
        return;
    };
    let acroform_ref = doc
        .get_dictionary(root)
        .ok()
        .and_then(|catalog| catalog.get(b"AcroForm").ok())
        .and_then(|o| o.as_reference().ok());

    let acroform = match acroform_ref {
        Some(id) => doc.get_object_mut(id).and_then(|o| o.as_dict_mut()),
        None => doc
            .get_object_mut(root)
            .and_then(|o| o.as_dict_mut())
            .and_then(|catalog| catalog.get_mut(b"AcroForm"))
            .and_then(|o| o.as_dict_mut()),
    };
    if let Ok(acroform) = acroform {
        acroform.set("NeedAppearances", Object::Boolean(true));
    }
}
