//! Rename-with-retype and fill over the field model
//!
//! Both operations are best effort: a missing or unsupported field never
//! aborts the batch. Per-field outcomes are collected as [`FieldWarning`]
//! values and only structural failures of the object graph are returned as
//! errors.

use crate::error::Result;
use crate::pdf::builder::{add_widget, create_field, remove_field, Placement};
use crate::pdf::document::FormDocument;
use crate::pdf::fields::{
    encode_text_string, find_field, strip_separator, FieldData, FieldIter, FieldType, FormField,
};
use lopdf::{Object, ObjectId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fill result message for a field that was found
pub const FIELD_FILLED: &str = "Field filled";
/// Fill result message for a field that does not exist
pub const FIELD_NOT_FOUND: &str = "Field Not found";

/// Category of a per-field condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    FieldNotFound,
    UnsupportedFieldKind,
    /// Rename target already used by another field
    NameTaken,
    /// Rename target with an empty partial name (e.g. `a..b`)
    InvalidName,
    /// Widget whose page could not be resolved
    MissingPage,
    /// Choice value matching none of the options
    InvalidOption,
}

/// A per-field condition reported alongside a successful operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldWarning {
    pub field: String,
    pub kind: WarningKind,
    pub message: String,
}

impl FieldWarning {
    fn new(field: &str, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            kind,
            message: message.into(),
        }
    }
}

/// A field that was rebuilt under a new name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenamedField {
    pub from: String,
    pub to: String,
    pub widgets: usize,
}

/// Outcome of a rename batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenameReport {
    pub renamed: Vec<RenamedField>,
    pub warnings: Vec<FieldWarning>,
}

/// Value written into a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
}

impl FieldValue {
    /// `true`, or any non-empty string
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Text(s) => !s.is_empty(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Per-field fill outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillResult {
    pub field: String,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Rename fields pairwise, rebuilding each as the same kind.
///
/// Pairs are zipped, so surplus entries on the longer side are ignored.
pub fn rename_fields(
    doc: &mut FormDocument,
    old_names: &[String],
    new_names: &[String],
) -> Result<RenameReport> {
    let mut report = RenameReport::default();
    let mut removed_any = false;

    for (old, new) in old_names.iter().zip(new_names) {
        if new.split('.').any(str::is_empty) {
            report.warnings.push(FieldWarning::new(
                old,
                WarningKind::InvalidName,
                format!("'{}' is not a valid field name", new),
            ));
            continue;
        }

        if name_taken(doc, old, new) {
            report.warnings.push(FieldWarning::new(
                old,
                WarningKind::NameTaken,
                format!("A field named '{}' already exists", new),
            ));
            continue;
        }

        let Some(field) = find_field(doc, old) else {
            report.warnings.push(FieldWarning::new(
                old,
                WarningKind::FieldNotFound,
                "Field not found",
            ));
            continue;
        };

        let kind = match field.data.field_type() {
            FieldType::Supported(kind) => kind,
            FieldType::Unsupported(unsupported) => {
                remove_field(doc, &field)?;
                removed_any = true;
                report.warnings.push(FieldWarning::new(
                    old,
                    WarningKind::UnsupportedFieldKind,
                    format!(
                        "Field of kind '{}' was removed without replacement",
                        FieldType::Unsupported(unsupported).label()
                    ),
                ));
                continue;
            }
        };

        let placements = capture_placements(&field, &mut report.warnings);
        let options = match field.data {
            FieldData::Choice { .. } => export_options(doc, field.id),
            _ => None,
        };

        remove_field(doc, &field)?;
        removed_any = true;

        let field_id = create_field(doc, new, kind)?;
        if let Some(options) = options {
            // Index on-states keep pointing at the same labels
            doc.inner_mut()
                .get_dictionary_mut(field_id)?
                .set("Opt", options);
        }
        for (placement, on_state) in &placements {
            add_widget(doc, field_id, kind, placement, on_state.as_deref())?;
        }

        tracing::debug!(from = %old, to = %new, widgets = placements.len(), "Field renamed");
        report.renamed.push(RenamedField {
            from: old.clone(),
            to: new.clone(),
            widgets: placements.len(),
        });
    }

    if removed_any {
        // Appearance streams of deleted widgets are now unreachable
        let pruned = doc.inner_mut().prune_objects();
        tracing::debug!(objects = pruned.len(), "Pruned unreachable objects");
    }

    Ok(report)
}

/// Whether `new` collides with a field other than `old`, either by name or
/// because one would have to be the parent of the other
fn name_taken(doc: &FormDocument, old: &str, new: &str) -> bool {
    FieldIter::new(doc)
        .filter(|node| node.name != old)
        .any(|node| {
            node.name == new || is_ancestor(&node.name, new) || is_ancestor(new, &node.name)
        })
}

fn is_ancestor(parent: &str, child: &str) -> bool {
    child
        .strip_prefix(parent)
        .is_some_and(|rest| rest.starts_with('.'))
}

/// Resolved `/Opt` entries of a field
fn export_options(doc: &FormDocument, field_id: ObjectId) -> Option<Vec<Object>> {
    let opt = doc.dict(field_id)?.get(b"Opt").ok()?;
    let items = doc.resolve(opt)?.as_array().ok()?;
    Some(items.iter().filter_map(|i| doc.resolve(i).cloned()).collect())
}

/// Record `(page, rect)` of every widget, plus the cleaned on-state token
/// for choice widgets.
fn capture_placements(
    field: &FormField,
    warnings: &mut Vec<FieldWarning>,
) -> Vec<(Placement, Option<String>)> {
    let is_choice = matches!(field.data, FieldData::Choice { .. });
    let mut placements = Vec::with_capacity(field.widgets.len());

    for (index, widget) in field.widgets.iter().enumerate() {
        let Some(page) = widget.page else {
            warnings.push(FieldWarning::new(
                &field.name,
                WarningKind::MissingPage,
                format!("Widget {} has no resolvable page and was dropped", index),
            ));
            continue;
        };

        let on_state = is_choice.then(|| {
            widget
                .on_value
                .as_deref()
                .map(|v| strip_separator(v).to_string())
                .unwrap_or_else(|| index.to_string())
        });

        placements.push((
            Placement {
                page,
                rect: widget.rect,
            },
            on_state,
        ));
    }

    placements
}

/// Write values into fields pairwise by type-specific semantics
pub fn fill_form(
    doc: &mut FormDocument,
    names: &[String],
    values: &[FieldValue],
) -> Result<Vec<FillResult>> {
    let mut results = Vec::with_capacity(names.len().min(values.len()));
    let mut wrote = false;

    for (name, value) in names.iter().zip(values) {
        let Some(field) = find_field(doc, name) else {
            results.push(FillResult {
                field: name.clone(),
                success: false,
                message: FIELD_NOT_FOUND.to_string(),
                warning: None,
            });
            continue;
        };

        let warning = match &field.data {
            FieldData::Text { .. } => {
                fill_text(doc, &field, &value.as_text())?;
                wrote = true;
                None
            }
            FieldData::Choice { options, .. } => {
                let wanted = value.as_text();
                match options.iter().find(|o| o.label == wanted) {
                    Some(option) => {
                        let state = strip_separator(&option.encoded).to_string();
                        set_button_state(doc, &field, Some(&state))?;
                        wrote = true;
                        None
                    }
                    None => Some(format!("'{}' is not an option of this field", wanted)),
                }
            }
            FieldData::CheckBox { .. } => {
                let state = value.is_truthy().then(|| {
                    field
                        .widgets
                        .iter()
                        .find_map(|w| w.on_value.as_deref())
                        .map(|v| strip_separator(v).to_string())
                        .unwrap_or_else(|| "Yes".to_string())
                });
                set_button_state(doc, &field, state.as_deref())?;
                wrote = true;
                None
            }
            FieldData::Unsupported(kind) => Some(format!(
                "Field of kind '{}' cannot be filled",
                FieldType::Unsupported(*kind).label()
            )),
        };

        if let Some(warning) = &warning {
            tracing::debug!(field = %name, warning = %warning, "Field fill skipped");
        }
        results.push(FillResult {
            field: name.clone(),
            success: true,
            message: FIELD_FILLED.to_string(),
            warning,
        });
    }

    if wrote {
        doc.set_need_appearances()?;
    }

    Ok(results)
}

fn fill_text(doc: &mut FormDocument, field: &FormField, text: &str) -> Result<()> {
    let inner = doc.inner_mut();
    inner
        .get_dictionary_mut(field.id)?
        .set("V", encode_text_string(text));

    // Stale appearances would keep showing the previous value
    for widget in &field.widgets {
        inner.get_dictionary_mut(widget.id)?.remove(b"AP");
    }
    Ok(())
}

/// Set `/V` on the field and `/AS` on every widget; `None` means off
fn set_button_state(doc: &mut FormDocument, field: &FormField, state: Option<&str>) -> Result<()> {
    let inner = doc.inner_mut();
    let value = state.unwrap_or("Off");
    inner
        .get_dictionary_mut(field.id)?
        .set("V", Object::Name(value.as_bytes().to_vec()));

    for widget in &field.widgets {
        let own_state = widget.on_value.as_deref().map(strip_separator);
        let appearance = match (state, own_state) {
            (Some(wanted), Some(own)) if wanted == own => own,
            _ => "Off",
        };
        inner
            .get_dictionary_mut(widget.id)?
            .set("AS", Object::Name(appearance.as_bytes().to_vec()));
    }
    Ok(())
}
