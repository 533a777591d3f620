//! Typed view of AcroForm fields and their widgets
//!
//! Fields are classified into a closed set of transformable kinds
//! ([`FieldKind`]). Everything else the AcroForm can hold is reported as an
//! [`UnsupportedKind`] so callers can surface it instead of dropping it.

use crate::pdf::document::{number, FormDocument};
use crate::pdf::geometry::Rect;
use lopdf::{Dictionary, Object, ObjectId, StringFormat};
use serde::Serialize;

/// `/Ff` bit for radio buttons (bit position 16)
pub(crate) const FLAG_RADIO: i64 = 1 << 15;
/// `/Ff` bit for push buttons (bit position 17)
pub(crate) const FLAG_PUSHBUTTON: i64 = 1 << 16;
/// `/Ff` bit for combo boxes (bit position 18)
pub(crate) const FLAG_COMBO: i64 = 1 << 17;
/// `/Ff` bit forbidding all radio buttons to be off (bit position 15)
pub(crate) const FLAG_NO_TOGGLE_TO_OFF: i64 = 1 << 14;

/// Guard against cyclic `/Kids` graphs
const MAX_FIELD_DEPTH: usize = 64;

/// Field kinds the transform engine can rebuild and fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    /// Radio group: one selectable option per widget
    Choice,
    CheckBox,
}

/// AcroForm kinds that are listed but never transformed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedKind {
    PushButton,
    ComboBox,
    ListBox,
    Signature,
    Unknown,
}

/// Classification of a terminal field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Supported(FieldKind),
    Unsupported(UnsupportedKind),
}

impl FieldType {
    /// Classify from `/FT` and the (possibly inherited) `/Ff` flags
    pub fn classify(ft: Option<&[u8]>, flags: i64) -> Self {
        match ft {
            Some(b"Tx") => FieldType::Supported(FieldKind::Text),
            Some(b"Btn") if flags & FLAG_PUSHBUTTON != 0 => {
                FieldType::Unsupported(UnsupportedKind::PushButton)
            }
            Some(b"Btn") if flags & FLAG_RADIO != 0 => FieldType::Supported(FieldKind::Choice),
            Some(b"Btn") => FieldType::Supported(FieldKind::CheckBox),
            Some(b"Ch") if flags & FLAG_COMBO != 0 => {
                FieldType::Unsupported(UnsupportedKind::ComboBox)
            }
            Some(b"Ch") => FieldType::Unsupported(UnsupportedKind::ListBox),
            Some(b"Sig") => FieldType::Unsupported(UnsupportedKind::Signature),
            _ => FieldType::Unsupported(UnsupportedKind::Unknown),
        }
    }

    /// Stable label used in listings ("text", "choice", "check_box", ...)
    pub fn label(&self) -> &'static str {
        match self {
            FieldType::Supported(FieldKind::Text) => "text",
            FieldType::Supported(FieldKind::Choice) => "choice",
            FieldType::Supported(FieldKind::CheckBox) => "check_box",
            FieldType::Unsupported(UnsupportedKind::PushButton) => "push_button",
            FieldType::Unsupported(UnsupportedKind::ComboBox) => "combo_box",
            FieldType::Unsupported(UnsupportedKind::ListBox) => "list_box",
            FieldType::Unsupported(UnsupportedKind::Signature) => "signature",
            FieldType::Unsupported(UnsupportedKind::Unknown) => "unknown",
        }
    }
}

/// A terminal field located in the field tree
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub id: ObjectId,
    /// Fully qualified name (partial names joined with `.`)
    pub name: String,
    pub field_type: FieldType,
    /// Intermediate field holding this one in `/Kids`, if any
    pub parent: Option<ObjectId>,
}

/// One visual placement of a field
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub id: ObjectId,
    pub rect: Rect,
    /// 0-based page index, when the widget's page could be resolved
    pub page: Option<usize>,
    /// Encoded on-state token (e.g. `/Yes`) for button widgets
    pub on_value: Option<String>,
}

/// A selectable option of a choice field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceOption {
    pub label: String,
    /// Encoded on-state token, e.g. `/A`
    pub encoded: String,
}

/// Kind-specific state of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Text {
        value: Option<String>,
    },
    Choice {
        options: Vec<ChoiceOption>,
        selected: Option<String>,
    },
    CheckBox {
        checked: bool,
    },
    Unsupported(UnsupportedKind),
}

impl FieldData {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldData::Text { .. } => FieldType::Supported(FieldKind::Text),
            FieldData::Choice { .. } => FieldType::Supported(FieldKind::Choice),
            FieldData::CheckBox { .. } => FieldType::Supported(FieldKind::CheckBox),
            FieldData::Unsupported(kind) => FieldType::Unsupported(*kind),
        }
    }
}

/// A fully loaded field: tree position, widgets and current state
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub id: ObjectId,
    pub name: String,
    pub parent: Option<ObjectId>,
    pub widgets: Vec<Widget>,
    pub data: FieldData,
}

/// Depth-first iterator over terminal fields in `/Fields` order.
///
/// Walks lazily with an explicit stack; each call to `next` resolves only
/// the nodes needed to reach the next terminal field.
pub struct FieldIter<'a> {
    doc: &'a FormDocument,
    stack: Vec<PendingNode>,
}

struct PendingNode {
    id: ObjectId,
    parent: Option<ObjectId>,
    parent_name: Option<String>,
    inherited_ft: Option<Vec<u8>>,
    inherited_flags: i64,
    depth: usize,
}

impl<'a> FieldIter<'a> {
    pub fn new(doc: &'a FormDocument) -> Self {
        let stack = doc
            .root_fields()
            .into_iter()
            .rev()
            .map(|id| PendingNode {
                id,
                parent: None,
                parent_name: None,
                inherited_ft: None,
                inherited_flags: 0,
                depth: 0,
            })
            .collect();
        Self { doc, stack }
    }
}

impl Iterator for FieldIter<'_> {
    type Item = FieldNode;

    fn next(&mut self) -> Option<FieldNode> {
        while let Some(node) = self.stack.pop() {
            if node.depth >= MAX_FIELD_DEPTH {
                continue;
            }
            let Some(dict) = self.doc.dict(node.id) else {
                continue;
            };

            let partial = dict.get(b"T").ok().and_then(|t| text_value(self.doc, t));
            let name = match (node.parent_name.as_deref(), partial) {
                (Some(parent), Some(partial)) => format!("{}.{}", parent, partial),
                (Some(parent), None) => parent.to_string(),
                (None, Some(partial)) => partial,
                (None, None) => String::new(),
            };
            let ft = match dict.get(b"FT") {
                Ok(Object::Name(ft)) => Some(ft.clone()),
                _ => node.inherited_ft.clone(),
            };
            let flags = match dict.get(b"Ff") {
                Ok(Object::Integer(flags)) => *flags,
                _ => node.inherited_flags,
            };

            let child_fields: Vec<ObjectId> = kids(self.doc, dict)
                .into_iter()
                .filter(|kid| self.doc.dict(*kid).is_some_and(|d| d.has(b"T")))
                .collect();

            if !child_fields.is_empty() {
                for kid in child_fields.into_iter().rev() {
                    self.stack.push(PendingNode {
                        id: kid,
                        parent: Some(node.id),
                        parent_name: Some(name.clone()),
                        inherited_ft: ft.clone(),
                        inherited_flags: flags,
                        depth: node.depth + 1,
                    });
                }
                continue;
            }

            if name.is_empty() {
                continue;
            }

            return Some(FieldNode {
                id: node.id,
                name,
                field_type: FieldType::classify(ft.as_deref(), flags),
                parent: node.parent,
            });
        }
        None
    }
}

/// `(kind, name)` pairs in native field order, optionally text fields only
pub fn list_fields(
    doc: &FormDocument,
    text_only: bool,
) -> impl Iterator<Item = (FieldType, String)> + '_ {
    FieldIter::new(doc)
        .filter(move |node| {
            !text_only || node.field_type == FieldType::Supported(FieldKind::Text)
        })
        .map(|node| (node.field_type, node.name))
}

/// Look up a field by fully qualified name and load its widgets and state
pub fn find_field(doc: &FormDocument, name: &str) -> Option<FormField> {
    let node = FieldIter::new(doc).find(|node| node.name == name)?;
    load_field(doc, node)
}

fn load_field(doc: &FormDocument, node: FieldNode) -> Option<FormField> {
    let dict = doc.dict(node.id)?;

    // Kids without /T are widgets; a field with no kids may be its own widget
    let widget_ids = match kids(doc, dict) {
        kids if kids.is_empty() && dict.has(b"Rect") => vec![node.id],
        kids => kids,
    };

    let widgets: Vec<Widget> = widget_ids
        .into_iter()
        .filter_map(|id| {
            let widget = doc.dict(id)?;
            Some(Widget {
                id,
                rect: widget_rect(doc, widget),
                page: doc.page_of_widget(id, widget),
                on_value: on_value(doc, widget).map(|name| format!("/{}", name)),
            })
        })
        .collect();

    let data = match node.field_type {
        FieldType::Supported(FieldKind::Text) => FieldData::Text {
            value: dict.get(b"V").ok().and_then(|v| text_value(doc, v)),
        },
        FieldType::Supported(FieldKind::Choice) => {
            let options = choice_options(doc, dict, &widgets);
            let selected = current_state(doc, dict).and_then(|state| {
                let encoded = format!("/{}", state);
                options
                    .iter()
                    .find(|o| o.encoded == encoded)
                    .map(|o| o.label.clone())
            });
            FieldData::Choice { options, selected }
        }
        FieldType::Supported(FieldKind::CheckBox) => FieldData::CheckBox {
            checked: current_state(doc, dict).is_some_and(|state| state != "Off"),
        },
        FieldType::Unsupported(kind) => FieldData::Unsupported(kind),
    };

    Some(FormField {
        id: node.id,
        name: node.name,
        parent: node.parent,
        widgets,
        data,
    })
}

/// Options in widget order, labelled from `/Opt` when the on-state is an
/// index into it, otherwise by the on-state name itself.
fn choice_options(doc: &FormDocument, field: &Dictionary, widgets: &[Widget]) -> Vec<ChoiceOption> {
    let opt: Vec<String> = field
        .get(b"Opt")
        .ok()
        .and_then(|o| doc.resolve(o))
        .and_then(|o| o.as_array().ok())
        .map(|items| items.iter().filter_map(|i| text_value(doc, i)).collect())
        .unwrap_or_default();

    let mut options: Vec<ChoiceOption> = Vec::new();
    for encoded in widgets.iter().filter_map(|w| w.on_value.clone()) {
        if options.iter().any(|o| o.encoded == encoded) {
            continue;
        }
        let token = strip_separator(&encoded);
        let label = token
            .parse::<usize>()
            .ok()
            .and_then(|i| opt.get(i).cloned())
            .unwrap_or_else(|| token.to_string());
        options.push(ChoiceOption { label, encoded });
    }
    options
}

/// Drop the leading `/` of an encoded name token
pub fn strip_separator(encoded: &str) -> &str {
    encoded.strip_prefix('/').unwrap_or(encoded)
}

/// Current `/V` of a button field, falling back to the first widget's `/AS`
fn current_state(doc: &FormDocument, field: &Dictionary) -> Option<String> {
    if let Ok(Object::Name(v)) = field.get(b"V") {
        return Some(String::from_utf8_lossy(v).into_owned());
    }
    if let Ok(Object::Name(state)) = field.get(b"AS") {
        return Some(String::from_utf8_lossy(state).into_owned());
    }
    kids(doc, field).into_iter().find_map(|kid| {
        match doc.dict(kid)?.get(b"AS") {
            Ok(Object::Name(state)) if state.as_slice() != b"Off" => {
                Some(String::from_utf8_lossy(state).into_owned())
            }
            _ => None,
        }
    })
}

/// First appearance state other than `Off` under `/AP /N` (or `/AP /D`)
pub(crate) fn on_value(doc: &FormDocument, widget: &Dictionary) -> Option<String> {
    let ap = doc.resolve(widget.get(b"AP").ok()?)?.as_dict().ok()?;
    [b"N".as_slice(), b"D".as_slice()].iter().find_map(|key| {
        let states = doc.resolve(ap.get(key).ok()?)?.as_dict().ok()?;
        states
            .iter()
            .map(|(name, _)| name)
            .find(|name| name.as_slice() != b"Off")
            .map(|name| String::from_utf8_lossy(name).into_owned())
    })
}

fn widget_rect(doc: &FormDocument, widget: &Dictionary) -> Rect {
    let values: Vec<f64> = widget
        .get(b"Rect")
        .ok()
        .and_then(|r| doc.resolve(r))
        .and_then(|r| r.as_array().ok())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| doc.resolve(i).and_then(number))
                .collect()
        })
        .unwrap_or_default();

    match values.as_slice() {
        [x1, y1, x2, y2] => Rect::from_corners(*x1, *y1, *x2, *y2),
        _ => Rect::new(0.0, 0.0, 0.0, 0.0),
    }
}

/// Referenced entries of a node's `/Kids`
pub(crate) fn kids(doc: &FormDocument, dict: &Dictionary) -> Vec<ObjectId> {
    dict.get(b"Kids")
        .ok()
        .and_then(|k| doc.resolve(k))
        .and_then(|k| k.as_array().ok())
        .map(|items| {
            items
                .iter()
                .filter_map(|k| match k {
                    Object::Reference(id) => Some(*id),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Decode a text string or name, handling UTF-16BE with BOM
pub(crate) fn text_value(doc: &FormDocument, obj: &Object) -> Option<String> {
    match doc.resolve(obj)? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// Encode a text string: literal for ASCII, UTF-16BE with BOM otherwise
pub(crate) fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
