//! Integration tests for the translation workflow.
//!
//! Every collaborator is a deterministic in-process stub, so these run
//! offline and in CI. The backend round trip (feature `server`) binds an
//! ephemeral port on 127.0.0.1.
//!
//! Run with:
//!   cargo test --test workflow -- --nocapture

use async_trait::async_trait;
use edgequake_doctranslate::pipeline::imaging::PreparedImage;
use edgequake_doctranslate::{
    resolve_templates, run_loading, ExtractionError, FailureKind, Language, LoadingDisposition,
    LoadingFailure, Money, OcrEngine, PaymentError, PaymentGateway, PaymentProof, PaymentReceipt,
    PipelineConfig, Pipelines, ReviewField, ServiceTier, Stage, TranslationError, Translator,
    Workflow, WorkflowContext, WorkflowError,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

const PASSPORT_TEXT: &str = "\
RÉPUBLIQUE FRANÇAISE
PASSEPORT
Date de délivrance: 14.03.2019
Autorité: Préfecture de Police
P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<
L898902C36UTO7408122F1204159ZE184226B<<<<<10";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("edgequake_doctranslate=debug")
        .with_test_writer()
        .try_init();
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([250, 250, 245, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode fixture");
    out.into_inner()
}

fn config() -> PipelineConfig {
    PipelineConfig::builder()
        .api_timeout_secs(5)
        .build()
        .expect("valid config")
}

/// Returns the same text for every image and counts calls.
#[derive(Default)]
struct FixedOcr {
    calls: AtomicUsize,
}

#[async_trait]
impl OcrEngine for FixedOcr {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn recognize(&self, _image: &PreparedImage, _hint: &str) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("```text\n{PASSPORT_TEXT}\n```"))
    }
}

/// Fails the first `failures` calls, then behaves like [`FixedOcr`].
struct FlakyOcr {
    failures: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl OcrEngine for FlakyOcr {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn recognize(&self, _image: &PreparedImage, _hint: &str) -> Result<String, ExtractionError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(ExtractionError::ServiceFailure {
                kind: FailureKind::Unavailable,
                message: "connection refused".into(),
            });
        }
        Ok(PASSPORT_TEXT.to_string())
    }
}

/// Takes `delay` before answering.
struct SlowOcr {
    delay: Duration,
}

#[async_trait]
impl OcrEngine for SlowOcr {
    fn name(&self) -> &str {
        "slow"
    }

    async fn recognize(&self, _image: &PreparedImage, _hint: &str) -> Result<String, ExtractionError> {
        tokio::time::sleep(self.delay).await;
        Ok(PASSPORT_TEXT.to_string())
    }
}

/// Prefixes the text with the target language name.
#[derive(Default)]
struct TaggingTranslator {
    calls: AtomicUsize,
}

#[async_trait]
impl Translator for TaggingTranslator {
    fn name(&self) -> &str {
        "tagging"
    }

    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("[{target}]\n{text}"))
    }
}

/// Translates the first `ok` calls, then reports a rate limit.
struct FailAfter {
    ok: usize,
    calls: AtomicUsize,
}

impl FailAfter {
    fn new(ok: usize) -> Self {
        Self {
            ok,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Translator for FailAfter {
    fn name(&self) -> &str {
        "fail-after"
    }

    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.ok {
            return Ok(format!("[{target}]\n{text}"));
        }
        Err(TranslationError::ServiceFailure {
            kind: FailureKind::RateLimited,
            message: "429".into(),
        })
    }
}

/// Approves every charge and remembers the amounts.
#[derive(Default)]
struct ApprovingGateway {
    charged: std::sync::Mutex<Vec<Money>>,
}

#[async_trait]
impl PaymentGateway for ApprovingGateway {
    async fn charge(&self, amount: Money, _proof: &PaymentProof) -> Result<PaymentReceipt, PaymentError> {
        self.charged.lock().unwrap().push(amount);
        Ok(PaymentReceipt {
            reference: "txn_0001".into(),
            amount,
        })
    }
}

struct DecliningGateway;

#[async_trait]
impl PaymentGateway for DecliningGateway {
    async fn charge(&self, _amount: Money, _proof: &PaymentProof) -> Result<PaymentReceipt, PaymentError> {
        Err(PaymentError::Declined {
            reason: "card expired".into(),
        })
    }
}

/// Unreachable for the first call, then approves.
#[derive(Default)]
struct FlakyGateway {
    calls: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for FlakyGateway {
    async fn charge(&self, amount: Money, _proof: &PaymentProof) -> Result<PaymentReceipt, PaymentError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(PaymentError::ServiceUnavailable {
                message: "gateway timeout".into(),
            });
        }
        Ok(PaymentReceipt {
            reference: "txn_0002".into(),
            amount,
        })
    }
}

/// Walk a fresh workflow to SelectTargetDetails for a French passport.
fn french_passport_up_to_target(image: Option<Vec<u8>>) -> Workflow {
    let mut wf = Workflow::from_config(&config());
    wf.start().unwrap();
    wf.select_document_type("Passport").unwrap();
    wf.select_origin("France", None).unwrap();
    wf.attach_document(image).unwrap();
    wf.select_template("1").unwrap();
    wf
}

// ── Templates ────────────────────────────────────────────────────────────────

#[test]
fn france_offers_four_templates_newest_first() {
    let mut wf = Workflow::new();
    wf.start().unwrap();
    wf.select_document_type("Passport").unwrap();
    wf.select_origin("France", None).unwrap();
    wf.attach_document(None).unwrap();

    assert_eq!(wf.stage(), Stage::Template);
    let years: Vec<&str> = wf.template_options().iter().map(|o| o.year.as_str()).collect();
    assert_eq!(years, ["2019", "2013", "2008", "2006"]);
    assert_eq!(wf.template_options(), resolve_templates("France").as_slice());
}

#[test]
fn unknown_origin_country_falls_back_to_default_catalog() {
    let options = resolve_templates("Atlantis");
    assert!(!options.is_empty());
    assert_eq!(options, resolve_templates("Atlantis"));
    assert_eq!(options, resolve_templates("France"));
}

// ── Loading ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_load_fills_review_record() {
    init_tracing();
    let ocr = Arc::new(FixedOcr::default());
    let translator = Arc::new(TaggingTranslator::default());
    let pipelines = Pipelines::new(ocr.clone(), translator.clone(), &config());

    let mut wf = french_passport_up_to_target(Some(png(64, 48)));
    wf.select_target_country("Germany").unwrap();
    assert_eq!(wf.context().target_language.as_deref(), Some("German"));

    let disposition = wf.load(&pipelines).await.unwrap();
    assert_eq!(disposition, LoadingDisposition::Applied(Stage::ReviewData));

    let ctx = wf.context();
    assert_eq!(ctx.extracted_text.as_deref(), Some(PASSPORT_TEXT));
    let translated = ctx.translated_text.as_deref().unwrap();
    assert!(translated.starts_with("[German]\n"));

    let record = wf.review_record().unwrap();
    assert_eq!(record.full_name, "Anna Maria Eriksson");
    assert_eq!(record.certificate_number, "L898902C3");
    assert_eq!(record.country_of_issue, "France");
    assert_eq!(record.language, "French");
    assert_eq!(record.document_reference, "france-passport-2019");
    assert_eq!(record.issuing_authority, "Préfecture de Police");
    assert!(!record.reviewed_and_confirmed);

    assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn extraction_is_deterministic_for_identical_bytes() {
    let pipelines = Pipelines::new(
        Arc::new(FixedOcr::default()),
        Arc::new(TaggingTranslator::default()),
        &config(),
    );
    let bytes = png(32, 32);
    let first = pipelines.extraction.extract(&bytes).await.unwrap();
    let second = pipelines.extraction.extract(&bytes).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, PASSPORT_TEXT);
}

#[tokio::test]
async fn extraction_failure_parks_without_translation() {
    let translator = Arc::new(TaggingTranslator::default());
    let pipelines = Pipelines::new(
        Arc::new(FlakyOcr {
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
        }),
        translator.clone(),
        &config(),
    );

    let mut wf = french_passport_up_to_target(Some(png(16, 16)));
    wf.select_target_country("Spain").unwrap();
    let before = wf.snapshot();

    let disposition = wf.load(&pipelines).await.unwrap();
    assert_eq!(disposition, LoadingDisposition::Applied(Stage::ExtractionFailed));
    assert!(matches!(
        wf.last_failure(),
        Some(LoadingFailure::Extraction(ExtractionError::ServiceFailure {
            kind: FailureKind::Unavailable,
            ..
        }))
    ));
    assert!(wf.context().translated_text.is_none());
    assert_eq!(wf.context(), &before);
    assert_eq!(translator.calls.load(Ordering::SeqCst), 0);

    // Skipping reaches the review with nothing translated.
    wf.skip_extraction().unwrap();
    assert_eq!(wf.stage(), Stage::ReviewData);
    assert!(wf.context().translated_text.is_none());
    let record = wf.review_record().unwrap();
    assert!(record.full_name.is_empty());
    assert_eq!(record.country_of_issue, "France");
}

#[tokio::test]
async fn translation_failure_parks_and_can_be_skipped() {
    let translator = Arc::new(FailAfter::new(0));
    let pipelines = Pipelines::new(Arc::new(FixedOcr::default()), translator.clone(), &config());

    let mut wf = french_passport_up_to_target(Some(png(16, 16)));
    wf.select_target_country("Germany").unwrap();

    let disposition = wf.load(&pipelines).await.unwrap();
    assert_eq!(disposition, LoadingDisposition::Applied(Stage::ExtractionFailed));
    assert!(matches!(
        wf.last_failure(),
        Some(LoadingFailure::Translation(TranslationError::ServiceFailure {
            kind: FailureKind::RateLimited,
            ..
        }))
    ));
    assert!(wf.context().translated_text.is_none());
    assert_eq!(translator.calls.load(Ordering::SeqCst), 1);

    wf.skip_extraction().unwrap();
    assert_eq!(wf.stage(), Stage::ReviewData);
    assert!(wf.context().translated_text.is_none());
    assert!(wf.context().extracted_text.is_none());
}

#[tokio::test]
async fn failed_reload_for_new_target_drops_old_texts() {
    let pipelines = Pipelines::new(
        Arc::new(FixedOcr::default()),
        Arc::new(FailAfter::new(1)),
        &config(),
    );
    let mut wf = french_passport_up_to_target(Some(png(16, 16)));
    wf.select_target_country("Germany").unwrap();
    wf.load(&pipelines).await.unwrap();
    assert!(wf
        .context()
        .translated_text
        .as_deref()
        .is_some_and(|t| t.starts_with("[German]")));

    wf.back().unwrap();
    wf.select_target_country("Spain").unwrap();
    wf.load(&pipelines).await.unwrap();

    assert_eq!(wf.stage(), Stage::ExtractionFailed);
    assert_eq!(wf.context().target_language.as_deref(), Some("Spanish"));
    assert!(wf.context().extracted_text.is_none());
    assert!(wf.context().translated_text.is_none());
    assert!(wf.review_record().is_none());
}

#[tokio::test]
async fn retry_after_failure_succeeds() {
    let ocr = Arc::new(FlakyOcr {
        failures: 1,
        calls: AtomicUsize::new(0),
    });
    let pipelines = Pipelines::new(ocr.clone(), Arc::new(TaggingTranslator::default()), &config());

    let mut wf = french_passport_up_to_target(Some(png(16, 16)));
    wf.select_target_country("Italy").unwrap();
    assert_eq!(
        wf.load(&pipelines).await.unwrap(),
        LoadingDisposition::Applied(Stage::ExtractionFailed)
    );
    assert_eq!(
        wf.load(&pipelines).await.unwrap(),
        LoadingDisposition::Applied(Stage::ReviewData)
    );
    assert!(wf.last_failure().is_none());
    assert!(wf
        .context()
        .translated_text
        .as_deref()
        .is_some_and(|t| t.starts_with("[Italian]")));
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn undecodable_upload_is_an_extraction_failure() {
    let ocr = Arc::new(FixedOcr::default());
    let pipelines = Pipelines::new(ocr.clone(), Arc::new(TaggingTranslator::default()), &config());

    let mut wf = french_passport_up_to_target(Some(b"definitely not an image".to_vec()));
    wf.select_target_country("Germany").unwrap();
    wf.load(&pipelines).await.unwrap();

    assert_eq!(wf.stage(), Stage::ExtractionFailed);
    assert!(matches!(
        wf.last_failure(),
        Some(LoadingFailure::Extraction(ExtractionError::InvalidImage { .. }))
    ));
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn loading_without_upload_skips_both_calls() {
    let ocr = Arc::new(FixedOcr::default());
    let translator = Arc::new(TaggingTranslator::default());
    let pipelines = Pipelines::new(ocr.clone(), translator.clone(), &config());

    let mut wf = french_passport_up_to_target(None);
    wf.select_target_country("United Kingdom").unwrap();
    wf.load(&pipelines).await.unwrap();

    assert_eq!(wf.stage(), Stage::ReviewData);
    assert!(wf.context().extracted_text.is_none());
    assert!(wf.context().translated_text.is_none());
    assert_eq!(wf.review_record().unwrap().language, "French");
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn photo_read_from_disk_goes_through_the_pipeline() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&png(40, 30)).unwrap();
    let bytes = tokio::fs::read(file.path()).await.unwrap();

    let pipelines = Pipelines::new(
        Arc::new(FixedOcr::default()),
        Arc::new(TaggingTranslator::default()),
        &config(),
    );
    let mut wf = french_passport_up_to_target(Some(bytes));
    wf.select_target_country("Germany").unwrap();
    wf.load(&pipelines).await.unwrap();
    assert_eq!(wf.stage(), Stage::ReviewData);
    assert!(wf
        .context()
        .document_image_ref
        .as_deref()
        .is_some_and(|h| h.starts_with("sha256:")));
}

// ── Navigation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn back_and_forward_restores_identical_context() {
    let pipelines = Pipelines::new(
        Arc::new(FixedOcr::default()),
        Arc::new(TaggingTranslator::default()),
        &config(),
    );
    let image = png(24, 24);
    let mut wf = french_passport_up_to_target(Some(image.clone()));
    wf.select_target_country("Germany").unwrap();
    wf.load(&pipelines).await.unwrap();
    let reviewed: WorkflowContext = wf.snapshot();

    // ReviewData → SelectTargetDetails → Template → UploadDocument
    assert_eq!(wf.back().unwrap(), Stage::SelectTargetDetails);
    assert_eq!(wf.back().unwrap(), Stage::Template);
    assert_eq!(wf.back().unwrap(), Stage::UploadDocument);
    assert_eq!(wf.context(), &reviewed);

    wf.attach_document(Some(image)).unwrap();
    wf.select_template("1").unwrap();
    wf.select_target_country("Germany").unwrap();
    wf.load(&pipelines).await.unwrap();
    assert_eq!(wf.stage(), Stage::ReviewData);
    assert_eq!(wf.context(), &reviewed);
}

#[tokio::test]
async fn edits_survive_a_reload_with_unchanged_inputs() {
    let pipelines = Pipelines::new(
        Arc::new(FixedOcr::default()),
        Arc::new(TaggingTranslator::default()),
        &config(),
    );
    let mut wf = french_passport_up_to_target(Some(png(24, 24)));
    wf.select_target_country("Germany").unwrap();
    wf.load(&pipelines).await.unwrap();
    wf.edit_review_field(ReviewField::FullName, "Anna-Maria Eriksson")
        .unwrap();

    wf.back().unwrap();
    wf.load(&pipelines).await.unwrap();
    assert_eq!(wf.review_record().unwrap().full_name, "Anna-Maria Eriksson");

    // A different target language invalidates the old translation.
    wf.back().unwrap();
    wf.select_target_country("Spain").unwrap();
    wf.load(&pipelines).await.unwrap();
    assert_eq!(wf.review_record().unwrap().full_name, "Anna Maria Eriksson");
    assert!(wf
        .context()
        .translated_text
        .as_deref()
        .is_some_and(|t| t.starts_with("[Spanish]")));
}

#[tokio::test(start_paused = true)]
async fn late_report_after_back_is_discarded() {
    let pipelines = Pipelines::new(
        Arc::new(SlowOcr {
            delay: Duration::from_secs(3),
        }),
        Arc::new(TaggingTranslator::default()),
        &config(),
    );
    let mut wf = french_passport_up_to_target(Some(png(16, 16)));
    wf.select_target_country("Germany").unwrap();

    let ticket = wf.confirm_target().unwrap();
    assert_eq!(wf.stage(), Stage::Loading);
    let background = pipelines.clone();
    let task = tokio::spawn(async move {
        run_loading(ticket, &background.extraction, &background.translation).await
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(wf.back().unwrap(), Stage::SelectTargetDetails);
    let before = wf.snapshot();

    let report = task.await.unwrap();
    assert_eq!(wf.complete_loading(report).unwrap(), LoadingDisposition::Discarded);
    assert_eq!(wf.stage(), Stage::SelectTargetDetails);
    assert_eq!(wf.context(), &before);
    assert!(wf.context().translated_text.is_none());
}

#[tokio::test(start_paused = true)]
async fn late_report_after_start_over_is_discarded() {
    let pipelines = Pipelines::new(
        Arc::new(SlowOcr {
            delay: Duration::from_secs(3),
        }),
        Arc::new(TaggingTranslator::default()),
        &config(),
    );
    let mut wf = french_passport_up_to_target(Some(png(16, 16)));
    wf.select_target_country("Germany").unwrap();
    let ticket = wf.confirm_target().unwrap();

    // Run the attempt to completion; only the attempt number makes it stale.
    let report = run_loading(ticket, &pipelines.extraction, &pipelines.translation).await;
    wf.start_over();

    assert_eq!(wf.complete_loading(report).unwrap(), LoadingDisposition::Discarded);
    assert_eq!(wf.stage(), Stage::Home);
    assert_eq!(wf.context(), &WorkflowContext::default());
}

#[tokio::test]
async fn superseded_attempt_is_discarded_after_retry() {
    let pipelines = Pipelines::new(
        Arc::new(FlakyOcr {
            failures: 1,
            calls: AtomicUsize::new(0),
        }),
        Arc::new(TaggingTranslator::default()),
        &config(),
    );
    let mut wf = french_passport_up_to_target(Some(png(16, 16)));
    wf.select_target_country("Germany").unwrap();

    let first = wf.confirm_target().unwrap();
    let failed = run_loading(first, &pipelines.extraction, &pipelines.translation).await;
    assert_eq!(
        wf.complete_loading(failed.clone()).unwrap(),
        LoadingDisposition::Applied(Stage::ExtractionFailed)
    );

    let second = wf.retry_extraction().unwrap();
    let succeeded = run_loading(second, &pipelines.extraction, &pipelines.translation).await;

    // A duplicate delivery of the first report must not undo the retry.
    assert_eq!(wf.complete_loading(failed).unwrap(), LoadingDisposition::Discarded);
    assert_eq!(wf.stage(), Stage::Loading);
    assert_eq!(
        wf.complete_loading(succeeded).unwrap(),
        LoadingDisposition::Applied(Stage::ReviewData)
    );
}

// ── Review / Payment ─────────────────────────────────────────────────────────

#[tokio::test]
async fn confirmed_review_pays_printed_tier() {
    let pipelines = Pipelines::new(
        Arc::new(FixedOcr::default()),
        Arc::new(TaggingTranslator::default()),
        &config(),
    );
    let mut wf = french_passport_up_to_target(Some(png(16, 16)));
    wf.select_target_country("Germany").unwrap();
    wf.load(&pipelines).await.unwrap();

    wf.confirm_review().unwrap();
    wf.edit_review_field(ReviewField::IssueDate, "15.03.2019").unwrap();
    assert!(!wf.review_record().unwrap().can_advance());
    assert!(wf.proceed_to_payment().is_err());
    wf.confirm_review().unwrap();
    wf.proceed_to_payment().unwrap();
    assert_eq!(wf.stage(), Stage::Payment);

    wf.select_service_tier(ServiceTier::Printed).unwrap();
    let summary = wf.cost_summary().unwrap();
    assert_eq!(summary.tier_price(), Money::from_dollars(35));
    assert_eq!(summary.total, Money::from_dollars(45));
    assert_eq!(summary.total.to_string(), "$45.00");

    let declined = wf
        .pay(&DecliningGateway, &PaymentProof::new("tok_visa"))
        .await
        .unwrap_err();
    assert!(matches!(declined, WorkflowError::Payment(PaymentError::Declined { .. })));
    assert_eq!(wf.stage(), Stage::Payment);

    let gateway = ApprovingGateway::default();
    let order = wf
        .pay(&gateway, &PaymentProof::new("tok_visa"))
        .await
        .unwrap()
        .clone();
    assert_eq!(wf.stage(), Stage::Confirmation);
    assert_eq!(order.service_tier, ServiceTier::Printed);
    assert_eq!(order.template.as_deref(), Some("france-passport-2019"));
    assert_eq!(order.target_language.as_deref(), Some("German"));
    assert_eq!(order.record.issue_date, "15.03.2019");
    assert_eq!(order.receipt.amount, Money::from_dollars(45));
    assert_eq!(*gateway.charged.lock().unwrap(), [Money::from_dollars(45)]);
}

#[tokio::test]
async fn unreachable_gateway_keeps_payment_open() {
    let mut wf = french_passport_up_to_target(None);
    wf.select_target_country("Germany").unwrap();
    let pipelines = Pipelines::new(
        Arc::new(FixedOcr::default()),
        Arc::new(TaggingTranslator::default()),
        &config(),
    );
    wf.load(&pipelines).await.unwrap();
    wf.confirm_review().unwrap();
    wf.proceed_to_payment().unwrap();
    let before = wf.snapshot();

    let gateway = FlakyGateway::default();
    let proof = PaymentProof::new("tok_visa");
    let err = wf.pay(&gateway, &proof).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Payment(PaymentError::ServiceUnavailable { .. })
    ));
    assert_eq!(wf.stage(), Stage::Payment);
    assert_eq!(wf.context(), &before);
    assert!(wf.order().is_none());

    let order = wf.pay(&gateway, &proof).await.unwrap().clone();
    assert_eq!(wf.stage(), Stage::Confirmation);
    assert_eq!(order.receipt.reference, "txn_0002");
    assert_eq!(order.receipt.amount, Money::from_dollars(35));
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
}

// ── Backend round trip ───────────────────────────────────────────────────────

#[cfg(feature = "server")]
mod backend {
    use super::*;
    use edgequake_doctranslate::server::router;
    use edgequake_doctranslate::BackendClient;
    use std::net::SocketAddr;

    async fn spawn_backend(pipelines: Pipelines) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::new(pipelines), config().max_image_bytes);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn client_pipelines(addr: SocketAddr) -> Pipelines {
        let client = Arc::new(
            BackendClient::new(format!("http://{addr}/"), Duration::from_secs(5)).unwrap(),
        );
        Pipelines::new(client.clone(), client, &config())
    }

    #[tokio::test]
    async fn workflow_runs_against_a_live_backend() {
        init_tracing();
        let addr = spawn_backend(Pipelines::new(
            Arc::new(FixedOcr::default()),
            Arc::new(TaggingTranslator::default()),
            &config(),
        ))
        .await;

        let mut wf = french_passport_up_to_target(Some(png(48, 32)));
        wf.select_target_country("Germany").unwrap();
        let disposition = wf.load(&client_pipelines(addr)).await.unwrap();

        assert_eq!(disposition, LoadingDisposition::Applied(Stage::ReviewData));
        assert_eq!(wf.context().extracted_text.as_deref(), Some(PASSPORT_TEXT));
        assert!(wf
            .context()
            .translated_text
            .as_deref()
            .is_some_and(|t| t.starts_with("[German]")));
        assert_eq!(wf.review_record().unwrap().full_name, "Anna Maria Eriksson");
    }

    #[tokio::test]
    async fn backend_errors_become_service_failures() {
        let addr = spawn_backend(Pipelines::new(
            Arc::new(FlakyOcr {
                failures: usize::MAX,
                calls: AtomicUsize::new(0),
            }),
            Arc::new(TaggingTranslator::default()),
            &config(),
        ))
        .await;
        let pipelines = client_pipelines(addr);

        let err = pipelines.extraction.extract(&png(8, 8)).await.unwrap_err();
        match err {
            ExtractionError::ServiceFailure { kind, message } => {
                assert_eq!(kind, FailureKind::Upstream);
                assert!(message.contains("connection refused"), "{message}");
            }
            other => panic!("expected ServiceFailure, got {other:?}"),
        }

        let err = pipelines
            .translation
            .translate("Bonjour", "Klingon")
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn health_endpoint_answers() {
        let addr = spawn_backend(Pipelines::new(
            Arc::new(FixedOcr::default()),
            Arc::new(TaggingTranslator::default()),
            &config(),
        ))
        .await;
        let body = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }
}
