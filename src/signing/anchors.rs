//! Signature anchors from form-field widgets

use super::types::{SignatureAnchor, SignatureFieldRequest};
use crate::config::GeometryConfig;
use crate::pdf::{anchor_position, find_field, FormDocument};

/// One anchor per widget of every requested field.
///
/// Requests naming a missing field, and widgets whose page cannot be
/// resolved, produce no anchor.
pub fn signature_anchors(
    doc: &FormDocument,
    requests: &[SignatureFieldRequest],
    geometry: &GeometryConfig,
) -> Vec<SignatureAnchor> {
    let mut anchors = Vec::new();

    for request in requests {
        let Some(field) = find_field(doc, &request.name) else {
            tracing::debug!(field = %request.name, "Signature field not found, skipping");
            continue;
        };

        for widget in &field.widgets {
            let Some((page, size)) = widget
                .page
                .and_then(|page| Some((page, doc.page_size(page)?)))
            else {
                tracing::debug!(field = %request.name, "Signature widget has no page, skipping");
                continue;
            };

            let (x, y) = anchor_position(&widget.rect, &size, geometry);
            anchors.push(SignatureAnchor {
                page: page + 1,
                x,
                y,
                placeholder_id: request.placeholder_id.clone(),
                field_type: request.field_type.clone(),
                required: true,
                fixed_width: false,
                lock_sign_date: false,
            });
        }
    }

    anchors
}
