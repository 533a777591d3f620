//! PDF processing layer
//!
//! This module provides AcroForm inspection and mutation on top of lopdf.

mod builder;
mod document;
mod fields;
mod geometry;
mod transform;

pub use builder::Placement;
pub use document::FormDocument;
pub use fields::{
    find_field, list_fields, ChoiceOption, FieldData, FieldIter, FieldKind,
    FieldNode, FieldType, FormField, UnsupportedKind, Widget,
};
pub use geometry::{anchor_position, to_anchor_pixels, PageSize, PixelRect, Rect};
pub use transform::{
    fill_form, rename_fields, FieldValue, FieldWarning, FillResult, RenameReport, RenamedField,
    WarningKind, FIELD_FILLED, FIELD_NOT_FOUND,
};
