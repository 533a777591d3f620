//! Low-level construction and removal of AcroForm fields

use crate::error::{Error, Result};
use crate::pdf::document::FormDocument;
use crate::pdf::fields::{
    encode_text_string, kids, text_value, FieldKind, FormField, FLAG_NO_TOGGLE_TO_OFF,
    FLAG_RADIO,
};
use crate::pdf::geometry::Rect;
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream};
use std::collections::HashSet;

/// Default appearance for newly created text fields (auto-sized Helvetica)
const TEXT_DA: &str = "/Helv 0 Tf 0 g";

/// Annotation flag: print
const ANNOT_PRINT: i64 = 4;

/// Maximum `/Parent` hops when pruning emptied intermediate fields
const MAX_PARENT_DEPTH: usize = 64;

/// Where a widget goes: 0-based page index and rectangle in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub page: usize,
    pub rect: Rect,
}

/// Create an empty terminal field of `kind` under its fully qualified name.
///
/// Each dotted prefix of `name` becomes a non-terminal node, reusing one
/// that already exists at that level. The caller guarantees that no prefix
/// names a terminal field and that no partial name is empty.
pub(crate) fn create_field(doc: &mut FormDocument, name: &str, kind: FieldKind) -> Result<ObjectId> {
    let (path, partial) = match name.rsplit_once('.') {
        Some((path, partial)) => (path.split('.').collect::<Vec<_>>(), partial),
        None => (Vec::new(), name),
    };

    let mut parent = None;
    for segment in path {
        parent = Some(intermediate_node(doc, parent, segment)?);
    }

    let mut field = dictionary! {
        "T" => encode_text_string(partial),
        "Kids" => Vec::<Object>::new(),
    };
    if let Some(parent) = parent {
        field.set("Parent", parent);
    }
    match kind {
        FieldKind::Text => {
            field.set("FT", "Tx");
            field.set("DA", Object::string_literal(TEXT_DA));
        }
        FieldKind::CheckBox => {
            field.set("FT", "Btn");
        }
        FieldKind::Choice => {
            field.set("FT", "Btn");
            field.set("Ff", FLAG_RADIO | FLAG_NO_TOGGLE_TO_OFF);
        }
    }

    let field_id = doc.inner_mut().add_object(field);
    attach(doc, parent, field_id)?;
    Ok(field_id)
}

/// Find the child of `parent` (or root field) with partial name `segment`,
/// creating an empty non-terminal node when there is none
fn intermediate_node(
    doc: &mut FormDocument,
    parent: Option<ObjectId>,
    segment: &str,
) -> Result<ObjectId> {
    let level = match parent {
        Some(parent) => kids(doc, doc.inner().get_dictionary(parent)?),
        None => doc.root_fields(),
    };
    let existing = level.into_iter().find(|id| {
        doc.dict(*id)
            .and_then(|d| d.get(b"T").ok())
            .and_then(|t| text_value(doc, t))
            .is_some_and(|t| t == segment)
    });
    if let Some(id) = existing {
        return Ok(id);
    }

    let mut node = dictionary! {
        "T" => encode_text_string(segment),
        "Kids" => Vec::<Object>::new(),
    };
    if let Some(parent) = parent {
        node.set("Parent", parent);
    }
    let id = doc.inner_mut().add_object(node);
    attach(doc, parent, id)?;
    Ok(id)
}

/// Append `child` to the kids of `parent`, or to `/Fields` at the root
fn attach(doc: &mut FormDocument, parent: Option<ObjectId>, child: ObjectId) -> Result<()> {
    match parent {
        Some(parent) => kids_mut(doc, parent)?.push(Object::Reference(child)),
        None => doc.root_fields_mut()?.push(Object::Reference(child)),
    }
    Ok(())
}

/// Attach a new widget to `field_id` at `placement`.
///
/// `on_state` names the appearance state of a choice option; check boxes
/// always use `Yes`.
pub(crate) fn add_widget(
    doc: &mut FormDocument,
    field_id: ObjectId,
    kind: FieldKind,
    placement: &Placement,
    on_state: Option<&str>,
) -> Result<ObjectId> {
    let page_id = doc.page_id(placement.page).ok_or_else(|| Error::Parse {
        reason: format!("Page {} does not exist", placement.page + 1),
    })?;

    let rect = placement.rect;
    let mut widget = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => rect.corners().iter().map(|v| Object::Real(*v as _)).collect::<Vec<Object>>(),
        "P" => page_id,
        "Parent" => field_id,
        "F" => ANNOT_PRINT,
    };

    match kind {
        FieldKind::Text => {
            widget.set("BS", dictionary! { "W" => 0 });
        }
        FieldKind::CheckBox => {
            widget.set("BS", dictionary! { "W" => 0 });
            widget.set("MK", dictionary! {});
            let on = add_appearance(doc, &rect, check_mark(&rect));
            let off = add_appearance(doc, &rect, Vec::new());
            widget.set("AP", appearance_states("Yes", on, off));
            widget.set("AS", "Off");
        }
        FieldKind::Choice => {
            let state = on_state.unwrap_or("Yes");
            let on = add_appearance(doc, &rect, radio_dot(&rect));
            let off = add_appearance(doc, &rect, Vec::new());
            widget.set("AP", appearance_states(state, on, off));
            widget.set("AS", "Off");
        }
    }

    let widget_id = doc.inner_mut().add_object(widget);

    doc.inner_mut()
        .get_dictionary_mut(field_id)?
        .get_mut(b"Kids")?
        .as_array_mut()?
        .push(Object::Reference(widget_id));
    doc.page_annots_mut(placement.page)?
        .push(Object::Reference(widget_id));
    doc.register_annotation(widget_id, placement.page);

    Ok(widget_id)
}

/// Remove a field and its widgets from the document.
///
/// Widgets are detached from their pages, the field is detached from its
/// parent (or from `/Fields`) and the objects are deleted. Intermediate
/// fields left without kids are removed as well.
pub(crate) fn remove_field(doc: &mut FormDocument, field: &FormField) -> Result<()> {
    let widget_ids: HashSet<ObjectId> = field.widgets.iter().map(|w| w.id).collect();

    let pages: HashSet<usize> = field.widgets.iter().filter_map(|w| w.page).collect();
    for page in pages {
        doc.page_annots_mut(page)?
            .retain(|annot| !matches!(annot, Object::Reference(id) if widget_ids.contains(id)));
    }
    for id in &widget_ids {
        doc.forget_annotation(*id);
    }

    detach_from_parent(doc, field.id, field.parent)?;

    let objects = &mut doc.inner_mut().objects;
    for id in widget_ids.iter().chain(std::iter::once(&field.id)) {
        objects.remove(id);
    }
    Ok(())
}

fn detach_from_parent(
    doc: &mut FormDocument,
    field_id: ObjectId,
    parent: Option<ObjectId>,
) -> Result<()> {
    let mut child = field_id;
    let mut parent = parent;
    let mut emptied = Vec::new();

    for _ in 0..MAX_PARENT_DEPTH {
        let Some(parent_id) = parent else {
            doc.root_fields_mut()?
                .retain(|f| !matches!(f, Object::Reference(id) if *id == child));
            break;
        };

        let remaining = {
            let kids = kids_mut(doc, parent_id)?;
            kids.retain(|k| !matches!(k, Object::Reference(id) if *id == child));
            kids.len()
        };
        if remaining > 0 {
            break;
        }

        // Emptied intermediate node: remove it from its own parent too
        emptied.push(parent_id);
        parent = match doc.inner().get_dictionary(parent_id)?.get(b"Parent") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };
        child = parent_id;
    }

    for id in emptied {
        doc.inner_mut().objects.remove(&id);
    }
    Ok(())
}

fn kids_mut(doc: &mut FormDocument, parent_id: ObjectId) -> Result<&mut Vec<Object>> {
    let kids_ref = match doc.inner().get_dictionary(parent_id)?.get(b"Kids") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    match kids_ref {
        Some(id) => Ok(doc.inner_mut().get_object_mut(id)?.as_array_mut()?),
        None => Ok(doc
            .inner_mut()
            .get_dictionary_mut(parent_id)?
            .get_mut(b"Kids")?
            .as_array_mut()?),
    }
}

fn appearance_states(on_state: &str, on: ObjectId, off: ObjectId) -> Dictionary {
    let mut normal = Dictionary::new();
    normal.set(on_state, on);
    normal.set("Off", off);
    dictionary! { "N" => normal }
}

fn add_appearance(doc: &mut FormDocument, rect: &Rect, content: Vec<u8>) -> ObjectId {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(rect.width as _),
            Object::Real(rect.height as _),
        ],
    };
    doc.inner_mut().add_object(Stream::new(dict, content))
}

/// Two stroked diagonals inset from the widget edges
fn check_mark(rect: &Rect) -> Vec<u8> {
    let inset = (rect.width.min(rect.height) * 0.2).max(1.0);
    let (x0, y0) = (inset, inset);
    let (x1, y1) = (rect.width - inset, rect.height - inset);
    format!(
        "q 0 G 1 w {x0:.2} {y0:.2} m {x1:.2} {y1:.2} l {x0:.2} {y1:.2} m {x1:.2} {y0:.2} l S Q"
    )
    .into_bytes()
}

/// Filled circle centred in the widget, drawn with four Bézier arcs
fn radio_dot(rect: &Rect) -> Vec<u8> {
    let (cx, cy) = (rect.width / 2.0, rect.height / 2.0);
    let r = rect.width.min(rect.height) * 0.25;
    let k = r * 0.5523;
    format!(
        "q 0 g {x0:.2} {cy:.2} m \
         {x0:.2} {a:.2} {b:.2} {y1:.2} {cx:.2} {y1:.2} c \
         {c:.2} {y1:.2} {x1:.2} {a:.2} {x1:.2} {cy:.2} c \
         {x1:.2} {d:.2} {c:.2} {y0:.2} {cx:.2} {y0:.2} c \
         {b:.2} {y0:.2} {x0:.2} {d:.2} {x0:.2} {cy:.2} c f Q",
        x0 = cx - r,
        x1 = cx + r,
        y0 = cy - r,
        y1 = cy + r,
        a = cy + k,
        b = cx - k,
        c = cx + k,
        d = cy - k,
    )
    .into_bytes()
}
