use base64::Engine as _;
use form_router::{
    DocumentRef, FormClassifier, ObjectStore, ProcessorName, RouterConfig, RouterError,
    RoutingRecord, TokenSource, DEFAULT_FIELD_MASK,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BUCKET: &str = "process-bucket";
const FORM_PDF: &[u8] = b"%PDF-1.4 form";
const LETTER_PDF: &[u8] = b"%PDF-1.4 letter";
const PROCESS_PATH: &str = "/v1/projects/proj/locations/us/processors/proc:process";

/// Mock storage + Document AI served from a background runtime so the
/// blocking clients can run on the test thread.
struct Harness {
    server: MockServer,
    rt: Runtime,
}

impl Harness {
    fn start() -> Self {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        Self { server, rt }
    }

    fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    fn config(&self) -> RouterConfig {
        RouterConfig::new()
            .with_storage_endpoint(self.server.uri())
            .with_docai_endpoint(self.server.uri())
            .with_token(TokenSource::Static("test-token".into()))
    }

    fn classifier(&self) -> FormClassifier<form_router::GcsClient, form_router::DocumentAiClient> {
        FormClassifier::from_config(&self.config()).unwrap()
    }

    fn mount_listing(&self, names: &[&str]) {
        let items: Vec<_> = names.iter().map(|name| json!({ "name": name })).collect();
        self.mount(
            Mock::given(method("GET"))
                .and(path(format!("/storage/v1/b/{}/o", BUCKET)))
                .and(query_param("prefix", "orders/pdf/"))
                .and(header("authorization", "Bearer test-token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "kind": "storage#objects",
                    "items": items
                }))),
        );
    }

    fn mount_object(&self, name: &str, content: &[u8]) {
        self.mount(
            Mock::given(method("GET"))
                .and(path(format!(
                    "/storage/v1/b/{}/o/{}",
                    BUCKET,
                    urlencoding::encode(name)
                )))
                .and(query_param("alt", "media"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec())),
        );
    }

    fn mount_entities(&self, content: &[u8], entities: serde_json::Value) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(content);
        self.mount(
            Mock::given(method("POST"))
                .and(path(PROCESS_PATH))
                .and(header("authorization", "Bearer test-token"))
                .and(body_partial_json(json!({
                    "rawDocument": { "content": encoded, "mimeType": "application/pdf" },
                    "fieldMask": "entities",
                    "processOptions": { "individualPageSelector": { "pages": [1, 2, 3, 4, 5] } }
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "document": { "entities": entities }
                }))),
        );
    }
}

#[test]
fn routes_forms_from_folder() {
    let harness = Harness::start();
    harness.mount_listing(&["orders/pdf/a.pdf", "orders/pdf/b.pdf"]);
    harness.mount_object("orders/pdf/a.pdf", FORM_PDF);
    harness.mount_object("orders/pdf/b.pdf", LETTER_PDF);
    harness.mount_entities(FORM_PDF, json!([{ "type": "form", "confidence": 0.93 }]));
    harness.mount_entities(LETTER_PDF, json!([{ "type": "form", "confidence": 0.7 }]));

    let forms = harness
        .classifier()
        .get_forms_list(Some("proc"), "proj", Some("us"), BUCKET, "orders")
        .unwrap();

    assert_eq!(
        forms,
        vec![RoutingRecord {
            source_object: "orders/pdf/a.pdf".into(),
            destination_bucket: BUCKET.into(),
            destination_object: "orders/pdf-forms/input/".into(),
        }]
    );
}

#[test]
fn blank_processor_never_lists() {
    let harness = Harness::start();
    harness.mount(
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0),
    );

    let forms = harness
        .classifier()
        .get_forms_list(Some(""), "proj", Some("us"), BUCKET, "orders")
        .unwrap();
    assert!(forms.is_empty());

    let received = harness.rt.block_on(harness.server.received_requests()).unwrap();
    assert!(received.is_empty());
}

#[test]
fn listing_follows_page_tokens() {
    let harness = Harness::start();
    harness.mount(
        Mock::given(method("GET"))
            .and(path(format!("/storage/v1/b/{}/o", BUCKET)))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "name": "orders/pdf/c.pdf" }]
            })))
            .with_priority(1),
    );
    harness.mount(
        Mock::given(method("GET"))
            .and(path(format!("/storage/v1/b/{}/o", BUCKET)))
            .and(query_param("prefix", "orders/pdf/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "name": "orders/pdf/a.pdf" }, { "name": "orders/pdf/b.pdf" }],
                "nextPageToken": "page-2"
            }))),
    );

    let store = form_router::GcsClient::new(&harness.config()).unwrap();
    let names = store.list(BUCKET, "orders/pdf/").unwrap();
    assert_eq!(
        names,
        vec!["orders/pdf/a.pdf", "orders/pdf/b.pdf", "orders/pdf/c.pdf"]
    );
}

#[test]
fn processor_version_is_addressed() {
    let harness = Harness::start();
    harness.mount_object("orders/pdf/a.pdf", FORM_PDF);
    harness.mount(
        Mock::given(method("POST"))
            .and(path(
                "/v1/projects/proj/locations/us/processors/proc/processorVersions/pretrained:process",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "document": { "entities": [{ "type": "FORM", "confidence": 0.88 }] }
            }))),
    );

    let processor =
        ProcessorName::new("proj", "us", "proc").with_version(Some("pretrained".into()));
    let verdict = harness
        .classifier()
        .is_form(
            &processor,
            &DocumentRef::pdf(BUCKET, "orders/pdf/a.pdf"),
            Some(DEFAULT_FIELD_MASK),
        )
        .unwrap();
    assert!(verdict);
}

#[test]
fn document_without_entities_is_not_a_form() {
    let harness = Harness::start();
    harness.mount_object("orders/pdf/b.pdf", LETTER_PDF);
    harness.mount(
        Mock::given(method("POST"))
            .and(path(PROCESS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "document": {} }))),
    );

    let verdict = harness
        .classifier()
        .is_form(
            &ProcessorName::new("proj", "us", "proc"),
            &DocumentRef::pdf(BUCKET, "orders/pdf/b.pdf"),
            Some(DEFAULT_FIELD_MASK),
        )
        .unwrap();
    assert!(!verdict);
}

#[test]
fn service_error_aborts_listing() {
    let harness = Harness::start();
    harness.mount_listing(&["orders/pdf/a.pdf", "orders/pdf/b.pdf"]);
    harness.mount_object("orders/pdf/a.pdf", FORM_PDF);
    harness.mount(
        Mock::given(method("POST"))
            .and(path(PROCESS_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("permission denied")),
    );

    let result = harness
        .classifier()
        .get_forms_list(Some("proc"), "proj", Some("us"), BUCKET, "orders");

    match result {
        Err(RouterError::Status { status, body, .. }) => {
            assert_eq!(status.as_u16(), 403);
            assert_eq!(body, "permission denied");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[test]
fn oversized_document_is_rejected() {
    let harness = Harness::start();
    harness.mount_object("orders/pdf/a.pdf", FORM_PDF);

    let mut config = harness.config();
    config.max_document_bytes = 4;
    let store = form_router::GcsClient::new(&config).unwrap();

    let result = store.download(BUCKET, "orders/pdf/a.pdf");
    assert!(matches!(result, Err(RouterError::TooLarge(_))));
}

#[test]
fn malformed_entities_are_a_decode_error() {
    let harness = Harness::start();
    harness.mount_object("orders/pdf/a.pdf", FORM_PDF);
    harness.mount(
        Mock::given(method("POST"))
            .and(path(PROCESS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "document": { "entities": "x" } })),
            ),
    );

    let result = harness.classifier().is_form(
        &ProcessorName::new("proj", "us", "proc"),
        &DocumentRef::pdf(BUCKET, "orders/pdf/a.pdf"),
        Some(DEFAULT_FIELD_MASK),
    );
    assert!(matches!(result, Err(RouterError::Decode(_))));
}

#[test]
fn non_json_listing_is_a_decode_error() {
    let harness = Harness::start();
    harness.mount(
        Mock::given(method("GET"))
            .and(path(format!("/storage/v1/b/{}/o", BUCKET)))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>")),
    );

    let result = harness
        .classifier()
        .get_forms_list(Some("proc"), "proj", Some("us"), BUCKET, "orders");
    assert!(matches!(result, Err(RouterError::Decode(_))));
}

#[test]
fn metadata_token_fetched_once_per_run() {
    let harness = Harness::start();
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/computeMetadata/v1/instance/service-accounts/default/token"))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "test-token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1),
    );
    harness.mount_listing(&["orders/pdf/a.pdf", "orders/pdf/b.pdf"]);
    harness.mount_object("orders/pdf/a.pdf", FORM_PDF);
    harness.mount_object("orders/pdf/b.pdf", LETTER_PDF);
    harness.mount_entities(FORM_PDF, json!([{ "type": "form", "confidence": 0.93 }]));
    harness.mount_entities(LETTER_PDF, json!([]));

    let mut config = harness.config().with_token(TokenSource::Metadata);
    config.metadata_host = harness.server.address().to_string();
    let forms = FormClassifier::from_config(&config)
        .unwrap()
        .get_forms_list(Some("proc"), "proj", Some("us"), BUCKET, "orders")
        .unwrap();

    assert_eq!(forms.len(), 1);
}
