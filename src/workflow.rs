//! The stage controller.
//!
//! [`Workflow`] owns the session: the current [`Stage`], the
//! [`WorkflowContext`], the captured image bytes and the loading-attempt
//! bookkeeping. Every operation checks that it is called from the right stage,
//! builds a [`ContextDelta`], and merges it only after verifying that the
//! active stage owns every field the delta touches.
//!
//! ## Loading and cancellation
//!
//! Loading is split in three so the external calls never hold a borrow of the
//! workflow:
//!
//! ```text
//! confirm_target() / retry_extraction() ──▶ LoadingTicket
//! run_loading(ticket, extraction, translation).await ──▶ LoadingReport
//! complete_loading(report) ──▶ Applied(ReviewData | ExtractionFailed) | Discarded
//! ```
//!
//! Each ticket carries a fresh attempt number and an abort registration.
//! `back()`, `start_over()` and a new attempt abort the in-flight future and
//! bump the attempt, so a report that arrives late is discarded instead of
//! overwriting a context the user has moved away from. [`Workflow::load`] runs
//! all three steps in place for callers that simply await.

use crate::catalog::{self, Language, PASSPORT};
use crate::config::PipelineConfig;
use crate::context::{ContextDelta, ServiceTier, StageField, WorkflowContext};
use crate::error::{ExtractionError, TranslationError, ValidationError, WorkflowError};
use crate::finalize::{
    compute_cost, confirm_payment, CostSummary, FinalizedOrder, PaymentGateway, PaymentProof,
    PricingTable,
};
use crate::pipeline::imaging::content_handle;
use crate::pipeline::{ExtractionPipeline, Pipelines, TranslationPipeline};
use crate::progress::{NoopObserver, SharedObserver, WorkflowObserver};
use crate::review::{ReviewField, ReviewRecord};
use crate::stage::Stage;
use crate::templates::{resolve_templates, TemplateOption};
use futures::future::{AbortHandle, AbortRegistration, Abortable, Aborted};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

// ── Loading types ────────────────────────────────────────────────────────────

/// Why a loading attempt ended in `ExtractionFailed`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "step", content = "error", rename_all = "snake_case")]
pub enum LoadingFailure {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Translation(#[from] TranslationError),
}

/// Everything one loading attempt needs, detached from the workflow.
pub struct LoadingTicket {
    attempt: u64,
    image: Option<Arc<[u8]>>,
    target_language: String,
    context: WorkflowContext,
    observer: SharedObserver,
    registration: AbortRegistration,
}

impl LoadingTicket {
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

impl fmt::Debug for LoadingTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingTicket")
            .field("attempt", &self.attempt)
            .field("image_bytes", &self.image.as_ref().map(|b| b.len()))
            .field("target_language", &self.target_language)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadingOutcome {
    Completed {
        extracted_text: Option<String>,
        translated_text: Option<String>,
        record: ReviewRecord,
    },
    Failed(LoadingFailure),
    /// The attempt was aborted before it finished.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingReport {
    pub attempt: u64,
    pub outcome: LoadingOutcome,
}

/// What [`Workflow::complete_loading`] did with a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingDisposition {
    /// The report was applied and the workflow moved to this stage.
    Applied(Stage),
    /// The report belonged to an attempt the user already left.
    Discarded,
}

/// Run extraction then translation for a ticket.
///
/// Never touches the workflow; hand the report to
/// [`Workflow::complete_loading`]. Without an image, or when the image holds
/// no recognisable text, no translation is requested and the record is seeded
/// from the context alone.
pub async fn run_loading(
    ticket: LoadingTicket,
    extraction: &ExtractionPipeline,
    translation: &TranslationPipeline,
) -> LoadingReport {
    let LoadingTicket {
        attempt,
        image,
        target_language,
        context,
        observer,
        registration,
    } = ticket;

    let texts = load_texts(
        attempt,
        image,
        &target_language,
        extraction,
        translation,
        observer.as_ref(),
    );
    let outcome = match Abortable::new(texts, registration).await {
        Err(Aborted) => {
            debug!(attempt, "Loading attempt aborted");
            LoadingOutcome::Aborted
        }
        Ok(Ok((extracted, translated))) => LoadingOutcome::Completed {
            record: ReviewRecord::from_extraction(
                &context,
                extracted.as_deref(),
                translated.as_deref(),
            ),
            extracted_text: extracted,
            translated_text: translated,
        },
        Ok(Err(failure)) => {
            warn!(attempt, "Loading attempt failed: {}", failure);
            observer.on_loading_failed(attempt, &failure.to_string());
            LoadingOutcome::Failed(failure)
        }
    };
    LoadingReport { attempt, outcome }
}

async fn load_texts(
    attempt: u64,
    image: Option<Arc<[u8]>>,
    target_language: &str,
    extraction: &ExtractionPipeline,
    translation: &TranslationPipeline,
    observer: &dyn WorkflowObserver,
) -> Result<(Option<String>, Option<String>), LoadingFailure> {
    let Some(image) = image else {
        debug!(attempt, "No document image; record will be entered manually");
        return Ok((None, None));
    };

    observer.on_extraction_start(attempt);
    let extracted = extraction.extract(&image).await?;
    observer.on_extraction_complete(attempt, extracted.chars().count());
    if extracted.is_empty() {
        warn!(attempt, "No text recognised in the document image");
        return Ok((None, None));
    }

    observer.on_translation_start(attempt, target_language);
    let translated = translation.translate(&extracted, target_language).await?;
    observer.on_translation_complete(attempt, translated.chars().count());
    Ok((Some(extracted), Some(translated)))
}

// ── Controller ───────────────────────────────────────────────────────────────

struct StoredImage {
    handle: String,
    bytes: Arc<[u8]>,
}

/// The context fields a loaded review record was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadingInputs {
    document_type: Option<String>,
    origin_country: Option<String>,
    origin_language: Option<String>,
    template: Option<String>,
    target_language: Option<String>,
    document_image_ref: Option<String>,
}

impl LoadingInputs {
    fn of(ctx: &WorkflowContext) -> Self {
        Self {
            document_type: ctx.document_type.clone(),
            origin_country: ctx.origin_country.clone(),
            origin_language: ctx.origin_language.clone(),
            template: ctx.template.clone(),
            target_language: ctx.target_language.clone(),
            document_image_ref: ctx.document_image_ref.clone(),
        }
    }
}

/// One user's translation order, from `Home` to `Confirmation`.
pub struct Workflow {
    stage: Stage,
    context: WorkflowContext,
    image: Option<StoredImage>,
    template_options: Vec<TemplateOption>,
    pricing: PricingTable,
    observer: SharedObserver,
    attempt: u64,
    in_flight: Option<AbortHandle>,
    last_failure: Option<LoadingFailure>,
    /// Set when the current review record came out of a completed load.
    loaded_from: Option<LoadingInputs>,
    order: Option<FinalizedOrder>,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("stage", &self.stage)
            .field("context", &self.context)
            .field("attempt", &self.attempt)
            .field("loading", &self.in_flight.is_some())
            .field("last_failure", &self.last_failure)
            .finish()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            stage: Stage::Home,
            context: WorkflowContext::default(),
            image: None,
            template_options: Vec::new(),
            pricing: PricingTable::default(),
            observer: Arc::new(NoopObserver),
            attempt: 0,
            in_flight: None,
            last_failure: None,
            loaded_from: None,
            order: None,
        }
    }

    /// A workflow priced from the configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new().with_pricing(config.pricing.clone())
    }

    pub fn with_pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.context
    }

    /// An owned copy of the context for a stage to work from.
    pub fn snapshot(&self) -> WorkflowContext {
        self.context.clone()
    }

    /// Number of the most recent loading attempt (0 before the first).
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Why the workflow is in `ExtractionFailed`.
    pub fn last_failure(&self) -> Option<&LoadingFailure> {
        self.last_failure.as_ref()
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    pub fn review_record(&self) -> Option<&ReviewRecord> {
        self.context.review_fields.as_ref()
    }

    /// The paid order, once the workflow reached `Confirmation`.
    pub fn order(&self) -> Option<&FinalizedOrder> {
        self.order.as_ref()
    }

    // ── Home / DocumentType ──────────────────────────────────────────────────

    pub fn start(&mut self) -> Result<(), WorkflowError> {
        self.expect_stage(Stage::Home, "start")?;
        self.transition(Stage::DocumentType);
        Ok(())
    }

    /// Pick the document type. Only passports have a workflow.
    pub fn select_document_type(&mut self, name: &str) -> Result<(), WorkflowError> {
        self.expect_stage(Stage::DocumentType, "select a document type")?;
        let Some(document_type) = catalog::find_document_type(name) else {
            return Err(ValidationError::UnknownDocumentType(name.trim().to_string()).into());
        };
        if document_type != PASSPORT {
            info!(document_type, "Unsupported document type requested");
            return Err(WorkflowError::Unsupported {
                document_type: document_type.to_string(),
            });
        }

        self.apply(ContextDelta {
            document_type: Some(document_type.to_string()),
            ..Default::default()
        })?;
        self.require_to_advance()?;
        self.transition(Stage::SelectOriginDetails);
        Ok(())
    }

    // ── SelectOriginDetails ──────────────────────────────────────────────────

    /// Set the origin country and language. Without a language, the country's
    /// catalog language is used.
    pub fn select_origin(
        &mut self,
        country: &str,
        language: Option<&str>,
    ) -> Result<(), WorkflowError> {
        self.expect_stage(Stage::SelectOriginDetails, "select origin details")?;
        let country = country.trim();
        if country.is_empty() {
            return Err(ValidationError::MissingField(StageField::OriginCountry).into());
        }
        let language = match language.map(str::trim).filter(|l| !l.is_empty()) {
            Some(name) => name.parse::<Language>()?,
            None => catalog::default_language(country)
                .ok_or(ValidationError::MissingField(StageField::OriginLanguage))?,
        };
        let country = catalog::find_country(country).map_or(country, |c| c.name);

        self.apply(ContextDelta {
            origin_country: Some(country.to_string()),
            origin_language: Some(language.name().to_string()),
            ..Default::default()
        })?;
        self.require_to_advance()?;
        self.transition(Stage::UploadDocument);
        Ok(())
    }

    // ── UploadDocument ───────────────────────────────────────────────────────

    /// Attach the captured image, or pass `None` to skip the upload.
    ///
    /// Skipping keeps an image attached on an earlier pass.
    pub fn attach_document(&mut self, image: Option<Vec<u8>>) -> Result<(), WorkflowError> {
        self.expect_stage(Stage::UploadDocument, "attach a document")?;
        match image {
            Some(bytes) if bytes.is_empty() => {
                return Err(ExtractionError::InvalidImage {
                    reason: "image is empty".into(),
                }
                .into());
            }
            Some(bytes) => {
                let handle = content_handle(&bytes);
                self.apply(ContextDelta {
                    document_image_ref: Some(handle.clone()),
                    ..Default::default()
                })?;
                debug!(handle = %handle, bytes = bytes.len(), "Document image attached");
                self.image = Some(StoredImage {
                    handle,
                    bytes: Arc::from(bytes),
                });
            }
            None => debug!("Upload skipped"),
        }
        self.transition(Stage::Template);
        Ok(())
    }

    /// Bytes of the attached image, if any.
    pub fn document_image(&self) -> Option<&[u8]> {
        self.stored_image().map(|img| img.bytes.as_ref())
    }

    fn stored_image(&self) -> Option<&StoredImage> {
        self.image
            .as_ref()
            .filter(|img| self.context.document_image_ref.as_deref() == Some(img.handle.as_str()))
    }

    // ── Template ─────────────────────────────────────────────────────────────

    /// Options resolved when the template stage was entered.
    pub fn template_options(&self) -> &[TemplateOption] {
        &self.template_options
    }

    /// Select a template by option id (`"1"`) or canonical id
    /// (`"france-passport-2019"`).
    pub fn select_template(&mut self, id: &str) -> Result<(), WorkflowError> {
        self.expect_stage(Stage::Template, "select a template")?;
        let id = id.trim();
        let template = self
            .template_options
            .iter()
            .find(|o| o.id == id || o.template_id().eq_ignore_ascii_case(id))
            .map(TemplateOption::template_id);
        let Some(template) = template else {
            return Err(ValidationError::UnknownTemplate {
                id: id.to_string(),
                country: self.context.origin_country.clone().unwrap_or_default(),
            }
            .into());
        };

        self.apply(ContextDelta {
            template: Some(template),
            ..Default::default()
        })?;
        self.require_to_advance()?;
        self.transition(Stage::SelectTargetDetails);
        Ok(())
    }

    // ── SelectTargetDetails ──────────────────────────────────────────────────

    /// Set the target country; catalog countries also select their language.
    pub fn select_target_country(&mut self, country: &str) -> Result<(), WorkflowError> {
        self.expect_stage(Stage::SelectTargetDetails, "select a target country")?;
        let country = country.trim();
        if country.is_empty() {
            return Err(ValidationError::MissingField(StageField::TargetCountry).into());
        }
        let (country, language) = match catalog::find_country(country) {
            Some(c) => (c.name, Some(c.language.name().to_string())),
            None => (country, None),
        };
        self.apply(ContextDelta {
            target_country: Some(country.to_string()),
            target_language: language,
            ..Default::default()
        })
    }

    pub fn select_target_language(&mut self, name: &str) -> Result<(), WorkflowError> {
        self.expect_stage(Stage::SelectTargetDetails, "select a target language")?;
        let language: Language = name.parse()?;
        self.apply(ContextDelta {
            target_language: Some(language.name().to_string()),
            ..Default::default()
        })
    }

    /// Close the target gate and enter Loading.
    pub fn confirm_target(&mut self) -> Result<LoadingTicket, WorkflowError> {
        self.expect_stage(Stage::SelectTargetDetails, "confirm the target details")?;
        self.require_to_advance()?;
        self.transition(Stage::Loading);
        Ok(self.issue_ticket())
    }

    // ── Loading / ExtractionFailed ───────────────────────────────────────────

    /// Apply a loading report, or discard it if it is stale.
    pub fn complete_loading(
        &mut self,
        report: LoadingReport,
    ) -> Result<LoadingDisposition, WorkflowError> {
        if self.stage != Stage::Loading || report.attempt != self.attempt {
            debug!(
                attempt = report.attempt,
                current = self.attempt,
                stage = %self.stage,
                "Discarding stale loading result"
            );
            self.observer.on_result_discarded(report.attempt);
            return Ok(LoadingDisposition::Discarded);
        }

        match report.outcome {
            LoadingOutcome::Aborted => {
                self.observer.on_result_discarded(report.attempt);
                Ok(LoadingDisposition::Discarded)
            }
            LoadingOutcome::Completed {
                extracted_text,
                translated_text,
                record,
            } => {
                self.in_flight = None;
                let inputs = LoadingInputs::of(&self.context);
                // Same inputs as the load that produced the current record:
                // keep the user's edits.
                let kept = if self.loaded_from.as_ref() == Some(&inputs) {
                    self.context.review_fields.take()
                } else {
                    None
                };
                self.context.clear_extraction();
                self.apply(ContextDelta {
                    extracted_text,
                    translated_text,
                    review_fields: Some(kept.unwrap_or(record)),
                    ..Default::default()
                })?;
                self.loaded_from = Some(inputs);
                self.transition(Stage::ReviewData);
                Ok(LoadingDisposition::Applied(Stage::ReviewData))
            }
            LoadingOutcome::Failed(failure) => {
                self.in_flight = None;
                // Texts from a load with other inputs no longer describe
                // this document/target pair.
                if self.loaded_from.as_ref() != Some(&LoadingInputs::of(&self.context)) {
                    self.context.clear_extraction();
                    self.loaded_from = None;
                }
                self.last_failure = Some(failure);
                self.transition(Stage::ExtractionFailed);
                Ok(LoadingDisposition::Applied(Stage::ExtractionFailed))
            }
        }
    }

    /// Enter Loading (from SelectTargetDetails or ExtractionFailed), run both
    /// calls and apply the result.
    pub async fn load(&mut self, pipelines: &Pipelines) -> Result<LoadingDisposition, WorkflowError> {
        let ticket = match self.stage {
            Stage::SelectTargetDetails => self.confirm_target()?,
            Stage::ExtractionFailed => self.retry_extraction()?,
            stage => {
                return Err(WorkflowError::InvalidTransition {
                    stage,
                    action: "start loading",
                })
            }
        };
        let report = run_loading(ticket, &pipelines.extraction, &pipelines.translation).await;
        self.complete_loading(report)
    }

    pub fn retry_extraction(&mut self) -> Result<LoadingTicket, WorkflowError> {
        self.expect_stage(Stage::ExtractionFailed, "retry extraction")?;
        self.transition(Stage::Loading);
        Ok(self.issue_ticket())
    }

    /// Give up on extraction and continue with a record seeded from the
    /// context only.
    pub fn skip_extraction(&mut self) -> Result<(), WorkflowError> {
        self.expect_stage(Stage::ExtractionFailed, "skip extraction")?;
        self.last_failure = None;
        self.loaded_from = None;
        self.context.clear_extraction();
        let record = ReviewRecord::seeded(&self.context);
        self.apply(ContextDelta {
            review_fields: Some(record),
            ..Default::default()
        })?;
        self.transition(Stage::ReviewData);
        Ok(())
    }

    // ── ReviewData ───────────────────────────────────────────────────────────

    /// Edit one review field. Drops the confirmation.
    pub fn edit_review_field(
        &mut self,
        field: ReviewField,
        value: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        self.expect_stage(Stage::ReviewData, "edit review data")?;
        let record = self.current_record().update_field(field, value);
        self.apply(ContextDelta {
            review_fields: Some(record),
            ..Default::default()
        })
    }

    pub fn confirm_review(&mut self) -> Result<(), WorkflowError> {
        self.expect_stage(Stage::ReviewData, "confirm review data")?;
        let record = self.current_record().confirm();
        self.apply(ContextDelta {
            review_fields: Some(record),
            ..Default::default()
        })
    }

    pub fn proceed_to_payment(&mut self) -> Result<(), WorkflowError> {
        self.expect_stage(Stage::ReviewData, "proceed to payment")?;
        self.require_to_advance()?;
        let confirmed = self
            .context
            .review_fields
            .as_ref()
            .is_some_and(ReviewRecord::can_advance);
        if !confirmed {
            return Err(ValidationError::ReviewNotConfirmed.into());
        }
        self.transition(Stage::Payment);
        Ok(())
    }

    fn current_record(&self) -> ReviewRecord {
        self.context
            .review_fields
            .clone()
            .unwrap_or_else(|| ReviewRecord::seeded(&self.context))
    }

    // ── Payment / Confirmation ───────────────────────────────────────────────

    pub fn select_service_tier(&mut self, tier: ServiceTier) -> Result<(), WorkflowError> {
        self.expect_stage(Stage::Payment, "select a service tier")?;
        self.apply(ContextDelta {
            service_tier: Some(tier),
            ..Default::default()
        })
    }

    pub fn cost_summary(&self) -> Result<CostSummary, WorkflowError> {
        self.expect_stage(Stage::Payment, "compute the cost")?;
        let tier = self
            .context
            .service_tier
            .ok_or(ValidationError::MissingField(StageField::ServiceTier))?;
        Ok(compute_cost(&self.pricing, tier))
    }

    /// Charge the current cost summary and move to Confirmation.
    ///
    /// A failed charge leaves the workflow in Payment for another attempt.
    pub async fn pay(
        &mut self,
        gateway: &dyn PaymentGateway,
        proof: &PaymentProof,
    ) -> Result<&FinalizedOrder, WorkflowError> {
        self.expect_stage(Stage::Payment, "pay")?;
        self.require_to_advance()?;
        let summary = self.cost_summary()?;
        let order = confirm_payment(gateway, &self.context, &summary, proof).await?;
        self.transition(Stage::Confirmation);
        let order: &FinalizedOrder = self.order.insert(order);
        Ok(order)
    }

    // ── Navigation ───────────────────────────────────────────────────────────

    /// Return to the preceding interactive stage, keeping every field.
    ///
    /// Leaving Loading aborts the in-flight calls.
    pub fn back(&mut self) -> Result<Stage, WorkflowError> {
        let Some(previous) = self.stage.previous() else {
            return Err(WorkflowError::InvalidTransition {
                stage: self.stage,
                action: "go back",
            });
        };
        if self.stage == Stage::Loading {
            self.cancel_loading();
        }
        self.last_failure = None;
        self.transition(previous);
        Ok(previous)
    }

    /// Abandon the session and return to Home with an empty context.
    pub fn start_over(&mut self) {
        self.cancel_loading();
        self.context = WorkflowContext::default();
        self.image = None;
        self.template_options.clear();
        self.last_failure = None;
        self.loaded_from = None;
        self.order = None;
        self.transition(Stage::Home);
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn expect_stage(&self, expected: Stage, action: &'static str) -> Result<(), WorkflowError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                stage: self.stage,
                action,
            })
        }
    }

    /// Merge `delta` if the active stage owns every field it touches.
    fn apply(&mut self, delta: ContextDelta) -> Result<(), WorkflowError> {
        let writable = self.stage.writes();
        if let Some(field) = delta.touched().into_iter().find(|f| !writable.contains(f)) {
            return Err(ValidationError::FieldNotWritable {
                stage: self.stage,
                field,
            }
            .into());
        }
        self.context.merge(delta);
        Ok(())
    }

    fn require_to_advance(&self) -> Result<(), ValidationError> {
        match self
            .stage
            .required_to_advance()
            .iter()
            .find(|f| !self.context.is_set(**f))
        {
            Some(field) => Err(ValidationError::MissingField(*field)),
            None => Ok(()),
        }
    }

    fn transition(&mut self, to: Stage) {
        let from = self.stage;
        self.stage = to;
        match to {
            Stage::Template => {
                let origin = self.context.origin_country.as_deref().unwrap_or_default();
                self.template_options = resolve_templates(origin);
            }
            Stage::Payment if self.context.service_tier.is_none() => {
                self.context.service_tier = Some(ServiceTier::Digital);
            }
            _ => {}
        }
        info!(from = %from, to = %to, "Stage changed");
        self.observer.on_stage_changed(from, to);
    }

    fn issue_ticket(&mut self) -> LoadingTicket {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self.attempt += 1;
        self.last_failure = None;
        let (handle, registration) = AbortHandle::new_pair();
        self.in_flight = Some(handle);
        debug!(attempt = self.attempt, "Loading attempt issued");
        LoadingTicket {
            attempt: self.attempt,
            image: self.stored_image().map(|img| Arc::clone(&img.bytes)),
            target_language: self.context.target_language.clone().unwrap_or_default(),
            context: self.context.clone(),
            observer: Arc::clone(&self.observer),
            registration,
        }
    }

    fn cancel_loading(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
            info!(attempt = self.attempt, "Loading cancelled");
        }
        self.attempt += 1;
    }
}
