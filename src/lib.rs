//! # edgequake-doctranslate
//!
//! Guided translation of official documents: a staged intake workflow, OCR
//! and LLM translation of the document photo, an editable review record and a
//! priced finalization gate.
//!
//! ## Workflow Overview
//!
//! ```text
//! Home
//!  │
//!  ├─ 1. DocumentType          only "Passport" proceeds
//!  ├─ 2. SelectOriginDetails   country + language (language defaults from country)
//!  ├─ 3. UploadDocument        photo bytes, or skip
//!  ├─ 4. Template              passport versions for the origin country
//!  ├─ 5. SelectTargetDetails   target country (+ auto-selected language)
//!  ├─ 6. Loading               OCR → translation (the only suspending step)
//!  │      └─ ExtractionFailed  retry or skip with empty fields
//!  ├─ 7. ReviewData            edit + confirm the record
//!  ├─ 8. Payment               tier, cost summary, charge
//!  └─ 9. Confirmation
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doctranslate::{build_pipelines, PipelineConfig, Workflow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / OPENROUTER_API_KEY / ...
//!     let config = PipelineConfig::default();
//!     let pipelines = build_pipelines(&config)?;
//!
//!     let mut workflow = Workflow::from_config(&config);
//!     workflow.start()?;
//!     workflow.select_document_type("Passport")?;
//!     workflow.select_origin("France", None)?;
//!     workflow.attach_document(Some(std::fs::read("passport.jpg")?))?;
//!     workflow.select_template("1")?;
//!     workflow.select_target_country("Germany")?;
//!     workflow.load(&pipelines).await?;
//!
//!     println!("{:#?}", workflow.review_record());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `doctranslate` binary (clap + anyhow + tracing-subscriber) |
//! | `server` | on      | Hosts the `/extract` + `/translate` backend with axum |
//!
//! Disable both when using only the library:
//! ```toml
//! edgequake-doctranslate = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod finalize;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod review;
#[cfg(feature = "server")]
pub mod server;
pub mod stage;
pub mod templates;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::BackendClient;
pub use catalog::Language;
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use context::{ContextDelta, ServiceTier, StageField, WorkflowContext};
pub use error::{
    ConfigError, ExtractionError, FailureKind, PaymentError, TranslationError, ValidationError,
    WorkflowError,
};
pub use finalize::{
    compute_cost, confirm_payment, CostSummary, FinalizedOrder, LineItem, Money, PaymentGateway,
    PaymentProof, PaymentReceipt, PricingTable,
};
pub use pipeline::{
    build_pipelines, ExtractionPipeline, OcrEngine, Pipelines, TranslationPipeline, Translator,
};
pub use progress::{NoopObserver, WorkflowObserver};
pub use review::{ReviewField, ReviewRecord};
pub use stage::Stage;
pub use templates::{resolve_templates, TemplateOption};
pub use workflow::{
    run_loading, LoadingDisposition, LoadingFailure, LoadingOutcome, LoadingReport,
    LoadingTicket, Workflow,
};
