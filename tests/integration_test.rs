//! Integration tests for PDF Form Server

use async_trait::async_trait;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use parking_lot::Mutex;
use pdf_form_server::config::{Config, GeometryConfig};
use pdf_form_server::pdf::{
    fill_form, find_field, list_fields, rename_fields, ChoiceOption, FieldData, FieldKind,
    FieldType, FieldValue, FormDocument, Rect, UnsupportedKind, WarningKind, FIELD_FILLED,
    FIELD_NOT_FOUND,
};
use pdf_form_server::signing::{
    signature_anchors, DocumentRequest, DocumentResponse, Placeholder, Recipient,
    SignatureFieldRequest, SigningService, TemplateRequest, TemplateResponse,
    SIGN_DOCUMENT_CREATED, TEMPLATE_CREATED,
};
use pdf_form_server::source::PdfSource;
use pdf_form_server::storage::MemoryStore;
use pdf_form_server::{Error, FillRequest, FormService};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

const BASE_URL: &str = "https://cdn.test/";

fn rect(values: [i64; 4]) -> Object {
    Object::Array(values.iter().map(|v| Object::Integer(*v)).collect())
}

fn appearance(doc: &mut Document) -> ObjectId {
    doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => rect([0, 0, 10, 10]),
        },
        Vec::new(),
    ))
}

fn states(doc: &mut Document, on: &str) -> Dictionary {
    let on_id = appearance(doc);
    let off_id = appearance(doc);
    let mut normal = Dictionary::new();
    normal.set(on, on_id);
    normal.set("Off", off_id);
    dictionary! { "N" => normal }
}

/// Two-page form:
/// - page 1 (612x792): `name` (text), `status` (radio A/B), `person.email` (text)
/// - page 2 (595x842): `agree` (check box), `sig` (text), `action` (push button)
fn form_document() -> Document {
    build_form(false)
}

/// With `indexed_status`, the `status` widgets use on-states `0`/`1` and
/// the labels `Yes`/`No` come from `/Opt`.
fn build_form(indexed_status: bool) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page1 = doc.new_object_id();
    let page2 = doc.new_object_id();

    let name_widget = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => rect([100, 700, 250, 720]),
        "P" => page1,
    });
    let name = doc.add_object(dictionary! {
        "FT" => "Tx",
        "T" => Object::string_literal("name"),
        "Kids" => vec![Object::Reference(name_widget)],
    });
    doc.get_dictionary_mut(name_widget).unwrap().set("Parent", name);

    let (on_a, on_b) = if indexed_status { ("0", "1") } else { ("A", "B") };
    let ap_a = states(&mut doc, on_a);
    let status_a = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => rect([100, 600, 112, 612]),
        "AP" => ap_a,
        "AS" => "Off",
    });
    let ap_b = states(&mut doc, on_b);
    let status_b = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => rect([150, 600, 162, 612]),
        "AP" => ap_b,
        "AS" => "Off",
    });
    let status = doc.add_object(dictionary! {
        "FT" => "Btn",
        "Ff" => Object::Integer(1 << 15),
        "T" => Object::string_literal("status"),
        "Kids" => vec![Object::Reference(status_a), Object::Reference(status_b)],
    });
    for widget in [status_a, status_b] {
        doc.get_dictionary_mut(widget).unwrap().set("Parent", status);
    }
    if indexed_status {
        doc.get_dictionary_mut(status).unwrap().set(
            "Opt",
            vec![Object::string_literal("Yes"), Object::string_literal("No")],
        );
    }

    let email = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::string_literal("email"),
        "Rect" => rect([100, 500, 300, 520]),
        "P" => page1,
    });
    let person = doc.add_object(dictionary! {
        "T" => Object::string_literal("person"),
        "Kids" => vec![Object::Reference(email)],
    });
    doc.get_dictionary_mut(email).unwrap().set("Parent", person);

    let agree_ap = states(&mut doc, "Yes");
    let agree = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Btn",
        "T" => Object::string_literal("agree"),
        "Rect" => rect([50, 400, 62, 412]),
        "AP" => agree_ap,
        "AS" => "Off",
        "P" => page2,
    });

    let sig = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::string_literal("sig"),
        "Rect" => rect([100, 100, 250, 120]),
        "P" => page2,
    });

    let action = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Btn",
        "Ff" => Object::Integer(1 << 16),
        "T" => Object::string_literal("action"),
        "Rect" => rect([400, 50, 500, 70]),
        "P" => page2,
    });

    // status widgets carry no /P; their page comes from /Annots
    doc.objects.insert(
        page1,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Annots" => vec![
                Object::Reference(name_widget),
                Object::Reference(status_a),
                Object::Reference(status_b),
                Object::Reference(email),
            ],
        }),
    );
    doc.objects.insert(
        page2,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => rect([0, 0, 595, 842]),
            "Annots" => vec![
                Object::Reference(agree),
                Object::Reference(sig),
                Object::Reference(action),
            ],
        }),
    );
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page1), Object::Reference(page2)],
            "Count" => Object::Integer(2),
            "MediaBox" => rect([0, 0, 612, 792]),
        }),
    );

    let acroform = doc.add_object(dictionary! {
        "Fields" => vec![
            Object::Reference(name),
            Object::Reference(status),
            Object::Reference(person),
            Object::Reference(agree),
            Object::Reference(sig),
            Object::Reference(action),
        ],
    });
    let catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => acroform,
    });
    doc.trailer.set("Root", catalog);
    doc
}

fn form_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    form_document().save_to(&mut bytes).unwrap();
    bytes
}

fn form() -> FormDocument {
    FormDocument::from_bytes(&form_bytes()).unwrap()
}

fn form_with_indexed_status() -> FormDocument {
    let mut bytes = Vec::new();
    build_form(true).save_to(&mut bytes).unwrap();
    FormDocument::from_bytes(&bytes).unwrap()
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn field_names(doc: &FormDocument) -> Vec<String> {
    list_fields(doc, false).map(|(_, name)| name).collect()
}

/// `(page, rect corners)` of every widget, comparable as a set
fn placements(doc: &FormDocument, name: &str) -> BTreeSet<(Option<usize>, [i64; 4])> {
    find_field(doc, name)
        .unwrap()
        .widgets
        .iter()
        .map(|w| (w.page, w.rect.corners().map(|v| v.round() as i64)))
        .collect()
}

fn reload(doc: &mut FormDocument) -> FormDocument {
    FormDocument::from_bytes(&doc.save().unwrap()).unwrap()
}

// ============================================================================
// Field listing
// ============================================================================

#[test]
fn test_list_fields_in_document_order() {
    let doc = form();
    let listed: Vec<(&str, String)> = list_fields(&doc, false)
        .map(|(kind, name)| (kind.label(), name))
        .collect();

    assert_eq!(
        listed,
        vec![
            ("text", "name".to_string()),
            ("choice", "status".to_string()),
            ("text", "person.email".to_string()),
            ("check_box", "agree".to_string()),
            ("text", "sig".to_string()),
            ("push_button", "action".to_string()),
        ]
    );
}

#[test]
fn test_list_fields_text_only() {
    let doc = form();
    let text: Vec<String> = list_fields(&doc, true).map(|(_, name)| name).collect();
    assert_eq!(text, names(&["name", "person.email", "sig"]));
}

#[test]
fn test_list_fields_is_restartable() {
    let doc = form();
    assert_eq!(field_names(&doc), field_names(&doc));
}

#[test]
fn test_document_without_form_lists_nothing() {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => Object::Integer(0),
        }),
    );
    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog);

    let doc = FormDocument::from_document(doc);
    assert_eq!(list_fields(&doc, false).count(), 0);
}

#[test]
fn test_choice_field_model() {
    let doc = form();
    let status = find_field(&doc, "status").unwrap();
    assert_eq!(
        status.data,
        FieldData::Choice {
            options: vec![
                ChoiceOption {
                    label: "A".to_string(),
                    encoded: "/A".to_string()
                },
                ChoiceOption {
                    label: "B".to_string(),
                    encoded: "/B".to_string()
                },
            ],
            selected: None,
        }
    );
    // Pages resolved through the /Annots table
    assert!(status.widgets.iter().all(|w| w.page == Some(0)));
}

// ============================================================================
// Rename-with-retype
// ============================================================================

#[rstest]
#[case::named_states(false, ["A", "B"])]
#[case::labels_from_opt(true, ["Yes", "No"])]
fn test_rename_choice_status_to_state(#[case] indexed: bool, #[case] labels: [&str; 2]) {
    let mut doc = if indexed { form_with_indexed_status() } else { form() };
    let before = placements(&doc, "status");

    let report = rename_fields(&mut doc, &names(&["status"]), &names(&["state"])).unwrap();
    assert!(report.warnings.is_empty());
    assert_eq!(report.renamed[0].widgets, 2);

    let mut doc = reload(&mut doc);
    assert!(find_field(&doc, "status").is_none());

    let state = find_field(&doc, "state").unwrap();
    assert_eq!(state.data.field_type(), FieldType::Supported(FieldKind::Choice));
    let FieldData::Choice { options, .. } = &state.data else {
        panic!("state should be a choice field");
    };
    let option_labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(option_labels, labels.to_vec());
    assert_eq!(placements(&doc, "state"), before);

    // Options stay selectable by their labels after the rebuild
    let results =
        fill_form(&mut doc, &names(&["state"]), &[FieldValue::from(labels[1])]).unwrap();
    assert!(results[0].warning.is_none());
    let FieldData::Choice { selected, .. } = find_field(&doc, "state").unwrap().data else {
        panic!("state should be a choice field");
    };
    assert_eq!(selected.as_deref(), Some(labels[1]));
}

#[test]
fn test_rename_into_dotted_names_builds_hierarchy() {
    let mut doc = form();
    let before = placements(&doc, "name");

    let report = rename_fields(
        &mut doc,
        &names(&["name", "sig"]),
        &names(&["tenant.name", "tenant.signature"]),
    )
    .unwrap();
    assert!(report.warnings.is_empty());

    let doc = reload(&mut doc);
    assert_eq!(
        field_names(&doc),
        names(&[
            "status",
            "person.email",
            "agree",
            "action",
            "tenant.name",
            "tenant.signature",
        ])
    );
    assert_eq!(placements(&doc, "tenant.name"), before);

    // Both fields share one `tenant` node
    let name = find_field(&doc, "tenant.name").unwrap();
    let signature = find_field(&doc, "tenant.signature").unwrap();
    assert!(name.parent.is_some());
    assert_eq!(name.parent, signature.parent);
}

#[rstest]
#[case("a..b")]
#[case(".name")]
#[case("name.")]
#[case("")]
fn test_rename_rejects_empty_partial_names(#[case] new: &str) {
    let mut doc = form();
    let report = rename_fields(&mut doc, &names(&["name"]), &names(&[new])).unwrap();

    assert!(report.renamed.is_empty());
    assert_eq!(report.warnings[0].kind, WarningKind::InvalidName);
    assert!(find_field(&doc, "name").is_some());
}

#[rstest]
#[case("sig", "name.first")]
#[case("sig", "person")]
fn test_rename_refuses_parent_child_clash(#[case] old: &str, #[case] new: &str) {
    let mut doc = form();
    let report = rename_fields(&mut doc, &names(&[old]), &names(&[new])).unwrap();

    assert_eq!(report.warnings[0].kind, WarningKind::NameTaken);
    assert!(find_field(&doc, old).is_some());
}

#[rstest]
#[case("name", "full_name", FieldKind::Text)]
#[case("agree", "consent", FieldKind::CheckBox)]
#[case("person.email", "contact_email", FieldKind::Text)]
fn test_rename_preserves_kind_and_placements(
    #[case] old: &str,
    #[case] new: &str,
    #[case] kind: FieldKind,
) {
    let mut doc = form();
    let before = placements(&doc, old);
    let count = field_names(&doc).len();

    rename_fields(&mut doc, &names(&[old]), &names(&[new])).unwrap();
    let doc = reload(&mut doc);

    let renamed = find_field(&doc, new).unwrap();
    assert_eq!(renamed.data.field_type(), FieldType::Supported(kind));
    assert_eq!(placements(&doc, new), before);
    assert!(find_field(&doc, old).is_none());
    assert_eq!(field_names(&doc).len(), count);
}

#[test]
fn test_rename_absent_field_is_noop() {
    let mut doc = form();
    let before = field_names(&doc);

    let report = rename_fields(&mut doc, &names(&["ghost"]), &names(&["spirit"])).unwrap();

    assert!(report.renamed.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, WarningKind::FieldNotFound);
    assert_eq!(field_names(&doc), before);
}

#[test]
fn test_rename_zips_to_shorter_list() {
    let mut doc = form();
    let report =
        rename_fields(&mut doc, &names(&["name", "sig"]), &names(&["full_name"])).unwrap();

    assert_eq!(report.renamed.len(), 1);
    assert!(find_field(&doc, "sig").is_some());
    assert!(find_field(&doc, "full_name").is_some());
}

#[test]
fn test_rename_onto_existing_name_is_refused() {
    let mut doc = form();
    let report = rename_fields(&mut doc, &names(&["name"]), &names(&["sig"])).unwrap();

    assert_eq!(report.warnings[0].kind, WarningKind::NameTaken);
    assert!(find_field(&doc, "name").is_some());
    assert_eq!(field_names(&doc).len(), 6);
}

#[test]
fn test_rename_unsupported_kind_removes_field() {
    let mut doc = form();
    let report = rename_fields(&mut doc, &names(&["action"]), &names(&["submit"])).unwrap();

    assert_eq!(report.warnings[0].kind, WarningKind::UnsupportedFieldKind);
    assert!(find_field(&doc, "action").is_none());
    assert!(find_field(&doc, "submit").is_none());
}

// ============================================================================
// Fill
// ============================================================================

#[test]
fn test_fill_text_survives_save_and_reload() {
    let mut doc = form();
    let results = fill_form(&mut doc, &names(&["name"]), &[FieldValue::from("Alice")]).unwrap();

    assert_eq!(results[0].field, "name");
    assert!(results[0].success);
    assert_eq!(results[0].message, FIELD_FILLED);

    let doc = reload(&mut doc);
    assert_eq!(
        find_field(&doc, "name").unwrap().data,
        FieldData::Text {
            value: Some("Alice".to_string())
        }
    );
}

#[test]
fn test_fill_unicode_text() {
    let mut doc = form();
    fill_form(&mut doc, &names(&["person.email"]), &[FieldValue::from("zoë@example.com")]).unwrap();

    let doc = reload(&mut doc);
    assert_eq!(
        find_field(&doc, "person.email").unwrap().data,
        FieldData::Text {
            value: Some("zoë@example.com".to_string())
        }
    );
}

#[test]
fn test_fill_missing_field_reports_not_found() {
    let mut doc = form();
    let results = fill_form(&mut doc, &names(&["ghost"]), &[FieldValue::from("x")]).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].field, "ghost");
    assert!(!results[0].success);
    assert_eq!(results[0].message, FIELD_NOT_FOUND);
}

#[test]
fn test_fill_is_idempotent() {
    let fields = names(&["name", "status", "agree"]);
    let values = vec![
        FieldValue::from("Alice"),
        FieldValue::from("A"),
        FieldValue::from(true),
    ];

    let mut doc = form();
    fill_form(&mut doc, &fields, &values).unwrap();
    let once: Vec<FieldData> = fields
        .iter()
        .map(|f| find_field(&doc, f).unwrap().data)
        .collect();

    fill_form(&mut doc, &fields, &values).unwrap();
    let twice: Vec<FieldData> = fields
        .iter()
        .map(|f| find_field(&doc, f).unwrap().data)
        .collect();

    assert_eq!(once, twice);
}

#[test]
fn test_fill_choice_invalid_option_warns() {
    let mut doc = form();
    fill_form(&mut doc, &names(&["status"]), &[FieldValue::from("A")]).unwrap();
    let results = fill_form(&mut doc, &names(&["status"]), &[FieldValue::from("Z")]).unwrap();

    assert!(results[0].success);
    assert!(results[0].warning.is_some());
    let FieldData::Choice { selected, .. } = find_field(&doc, "status").unwrap().data else {
        panic!("status should be a choice field");
    };
    assert_eq!(selected.as_deref(), Some("A"));
}

#[rstest]
#[case(FieldValue::from(true), true)]
#[case(FieldValue::from("yes"), true)]
#[case(FieldValue::from(false), false)]
#[case(FieldValue::from(""), false)]
fn test_fill_check_box_truthiness(#[case] value: FieldValue, #[case] checked: bool) {
    let mut doc = form();
    fill_form(&mut doc, &names(&["agree"]), &[value]).unwrap();

    let doc = reload(&mut doc);
    assert_eq!(
        find_field(&doc, "agree").unwrap().data,
        FieldData::CheckBox { checked }
    );
}

#[test]
fn test_fill_unsupported_kind_warns() {
    let mut doc = form();
    let results = fill_form(&mut doc, &names(&["action"]), &[FieldValue::from("go")]).unwrap();

    assert!(results[0].success);
    assert!(results[0].warning.is_some());
    assert_eq!(
        find_field(&doc, "action").unwrap().data,
        FieldData::Unsupported(UnsupportedKind::PushButton)
    );
}

#[test]
fn test_fill_requests_appearance_regeneration() {
    let mut doc = form();
    fill_form(&mut doc, &names(&["name"]), &[FieldValue::from("Alice")]).unwrap();

    let doc = reload(&mut doc);
    let catalog_id = doc.inner().trailer.get(b"Root").unwrap().as_reference().unwrap();
    let catalog = doc.inner().get_dictionary(catalog_id).unwrap();
    let acroform_id = catalog.get(b"AcroForm").unwrap().as_reference().unwrap();
    let acroform = doc.inner().get_dictionary(acroform_id).unwrap();
    assert_eq!(acroform.get(b"NeedAppearances").unwrap(), &Object::Boolean(true));
}

// ============================================================================
// Signature anchors
// ============================================================================

#[test]
fn test_signature_anchor_position() {
    let doc = form();
    let requests = vec![
        SignatureFieldRequest {
            name: "sig".to_string(),
            placeholder_id: "p1".to_string(),
            field_type: "signature".to_string(),
        },
        SignatureFieldRequest {
            name: "ghost".to_string(),
            placeholder_id: "p1".to_string(),
            field_type: "signature".to_string(),
        },
    ];

    let anchors = signature_anchors(&doc, &requests, &GeometryConfig::default());
    assert_eq!(anchors.len(), 1);

    let anchor = &anchors[0];
    assert_eq!(anchor.page, 2);
    assert!((anchor.x - 100.0 * 1.37).abs() < 1e-9);
    // 842 - 100 - 20 on the second page
    assert!((anchor.y - 722.0 * 1.32).abs() < 1e-9);
    assert!(anchor.required);
    assert!(!anchor.fixed_width);
    assert!(!anchor.lock_sign_date);
    assert_eq!(anchor.placeholder_id, "p1");
}

#[test]
fn test_widget_rect_is_normalised() {
    let doc = form();
    let name = find_field(&doc, "name").unwrap();
    assert_eq!(name.widgets[0].rect, Rect::new(100.0, 700.0, 150.0, 20.0));
}

// ============================================================================
// Service end to end
// ============================================================================

#[derive(Default)]
struct RecordingSigner {
    status: Option<String>,
    templates: Mutex<Vec<TemplateRequest>>,
    documents: Mutex<Vec<DocumentRequest>>,
}

#[async_trait]
impl SigningService for RecordingSigner {
    async fn create_template(
        &self,
        request: &TemplateRequest,
    ) -> pdf_form_server::Result<TemplateResponse> {
        self.templates.lock().push(request.clone());
        Ok(TemplateResponse {
            status: self.status.clone(),
            id: Some("tpl-1".to_string()),
            template_link: Some("https://signing.test/t/tpl-1".to_string()),
        })
    }

    async fn create_document(
        &self,
        request: &DocumentRequest,
    ) -> pdf_form_server::Result<DocumentResponse> {
        self.documents.lock().push(request.clone());
        Ok(DocumentResponse {
            id: Some("doc-1".to_string()),
            recipients: serde_json::json!([{"id": "1", "embedded_signing_url": "https://signing.test/s/1"}]),
        })
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.storage.base_url = BASE_URL.to_string();
    config.signing.template_wait = Duration::ZERO;
    config
}

fn fill_request() -> FillRequest {
    use base64::Engine;

    FillRequest {
        source: PdfSource::Base64 {
            base64: base64::engine::general_purpose::STANDARD.encode(form_bytes()),
        },
        field_names: names(&["name", "ghost"]),
        field_values: vec![FieldValue::from("Alice"), FieldValue::from("x")],
        output: "lease.final.pdf".to_string(),
        signature_fields: vec![SignatureFieldRequest {
            name: "sig".to_string(),
            placeholder_id: "p1".to_string(),
            field_type: "signature".to_string(),
        }],
        placeholders: vec![Placeholder {
            id: "p1".to_string(),
            name: "Tenant".to_string(),
            extra: BTreeMap::new(),
        }],
        recipients: vec![Recipient {
            id: "1".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            placeholder_name: "Tenant".to_string(),
            send_email: Some(false),
            send_email_delay: None,
            extra: BTreeMap::new(),
        }],
    }
}

#[tokio::test]
async fn test_fill_and_sign_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    let signer = Arc::new(RecordingSigner {
        status: Some(TEMPLATE_CREATED.to_string()),
        ..RecordingSigner::default()
    });
    let service = FormService::new(&test_config(), store.clone(), signer.clone()).unwrap();

    let outcome = service.fill_form(fill_request()).await.unwrap();

    assert_eq!(outcome.message, SIGN_DOCUMENT_CREATED);
    assert_eq!(outcome.data.document_id.as_deref(), Some("doc-1"));
    assert_eq!(outcome.data.template_id, "tpl-1");
    assert_eq!(outcome.fill_results.len(), 2);
    assert!(outcome.fill_results[0].success);
    assert!(!outcome.fill_results[1].success);

    // Stored document carries the value
    let key = outcome.file_url.strip_prefix(BASE_URL).unwrap();
    assert!(key.starts_with("pdf/"));
    assert!(key.ends_with("/lease.final.pdf"));
    let stored = FormDocument::from_bytes(&store.get(key).unwrap()).unwrap();
    assert_eq!(
        find_field(&stored, "name").unwrap().data,
        FieldData::Text {
            value: Some("Alice".to_string())
        }
    );

    let templates = signer.templates.lock();
    assert_eq!(templates[0].name, "lease");
    assert_eq!(templates[0].files[0].file_url, outcome.file_url);
    assert_eq!(templates[0].fields.len(), 1);
    assert_eq!(templates[0].fields[0].len(), 1);
    assert_eq!(templates[0].fields[0][0].page, 2);

    let documents = signer.documents.lock();
    assert_eq!(documents[0].template_id, "tpl-1");
    assert_eq!(documents[0].name, "lease.final.pdf");
}

#[tokio::test]
async fn test_uncreated_template_aborts_after_upload() {
    let store = Arc::new(MemoryStore::new());
    let signer = Arc::new(RecordingSigner {
        status: Some("Failed".to_string()),
        ..RecordingSigner::default()
    });
    let service = FormService::new(&test_config(), store.clone(), signer.clone()).unwrap();

    let err = service.fill_form(fill_request()).await.unwrap_err();

    assert!(matches!(err, Error::ExternalService { .. }));
    assert_eq!(err.client_message(), "Failed to create a sign well document");
    assert_eq!(store.len(), 1);
    assert!(signer.documents.lock().is_empty());
}

#[tokio::test]
async fn test_rename_through_service() {
    use base64::Engine;

    let store = Arc::new(MemoryStore::new());
    let service = FormService::new(
        &test_config(),
        store.clone(),
        Arc::new(RecordingSigner::default()),
    )
    .unwrap();
    let source = PdfSource::Base64 {
        base64: base64::engine::general_purpose::STANDARD.encode(form_bytes()),
    };

    let outcome = service
        .rename_fields(
            &source,
            Some(names(&["status", "ghost"])),
            Some(names(&["state", "spirit"])),
            "renamed.pdf",
        )
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.warnings.len(), 1);
    let key = outcome.file_url.as_deref().unwrap().strip_prefix(BASE_URL).unwrap();
    let stored = FormDocument::from_bytes(&store.get(key).unwrap()).unwrap();
    assert_eq!(
        field_names(&stored),
        names(&["name", "person.email", "agree", "sig", "action", "state"])
    );
}
