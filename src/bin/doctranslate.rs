//! CLI binary for edgequake-doctranslate.
//!
//! A thin shim over the library crate: `translate` drives one passport through
//! the workflow up to the review (and optionally the cost summary), `templates`
//! lists template versions, and `serve` hosts the HTTP backend.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_doctranslate::{
    build_pipelines, resolve_templates, LoadingDisposition, PipelineConfig, ServiceTier, Stage,
    Workflow, WorkflowObserver,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Spinner observer ─────────────────────────────────────────────────────────

/// Shows a spinner while the loading stage waits on OCR and translation.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        Arc::new(Self { bar })
    }
}

impl WorkflowObserver for CliObserver {
    fn on_stage_changed(&self, from: Stage, _to: Stage) {
        if from == Stage::Loading && !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }

    fn on_extraction_start(&self, _attempt: u64) {
        self.bar.set_prefix("Extracting");
        self.bar.set_message("reading the document…");
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_extraction_complete(&self, _attempt: u64, chars: usize) {
        self.bar.println(format!(
            "  {} Text extracted  {}",
            green("✓"),
            dim(&format!("{chars} chars"))
        ));
    }

    fn on_translation_start(&self, _attempt: u64, target_language: &str) {
        self.bar.set_prefix("Translating");
        self.bar.set_message(format!("into {target_language}…"));
    }

    fn on_translation_complete(&self, _attempt: u64, chars: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "  {} Translation ready  {}",
            green("✓"),
            dim(&format!("{chars} chars"))
        );
    }

    fn on_loading_failed(&self, _attempt: u64, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("  {} {}", red("✗"), red(error));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate a French passport photo into German (review data on stdout)
  doctranslate translate passport.jpg --origin France --target Germany

  # Pick the 2013 template, confirm the review and show the printed-tier cost
  doctranslate translate passport.jpg --origin France --target Spain \
      --template 2013 --confirm --tier printed --json

  # Use a running backend instead of calling an LLM directly
  doctranslate --backend http://localhost:5001/api translate passport.png \
      --origin Italy --target "United Kingdom"

  # List passport template versions for a country
  doctranslate templates Germany

  # Host the /extract + /translate backend
  doctranslate serve --bind 0.0.0.0:5001

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  OPENROUTER_API_KEY      OpenRouter API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, openrouter, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  DOCTRANSLATE_BACKEND    Backend base URL (skips the LLM provider entirely)
"#;

/// Translate official documents: OCR, LLM translation, review and pricing.
#[derive(Parser, Debug)]
#[command(
    name = "doctranslate",
    version,
    about = "Translate official documents with OCR + LLMs, then review and price the result",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// LLM model ID; must support vision for OCR.
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, openrouter, anthropic, gemini, ollama.
    #[arg(long, global = true, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Base URL of a /extract + /translate backend to use instead of an LLM.
    #[arg(long, global = true, env = "DOCTRANSLATE_BACKEND")]
    backend: Option<String>,

    /// Per-call timeout for OCR and translation, in seconds.
    #[arg(long, global = true, env = "DOCTRANSLATE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// OCR language hint.
    #[arg(long, global = true, env = "DOCTRANSLATE_OCR_LANGUAGE", default_value = "eng")]
    ocr_language: String,

    /// Path to a text file with a custom translation system prompt
    /// (`{language}` is replaced with the target language).
    #[arg(long, global = true, env = "DOCTRANSLATE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCTRANSLATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCTRANSLATE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a passport photo through extraction, translation and review.
    Translate(TranslateArgs),

    /// List passport template versions for a country.
    Templates {
        /// Origin country (unknown countries get the default catalog).
        country: String,

        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Host the /extract + /translate backend.
    #[cfg(feature = "server")]
    Serve {
        /// Address to bind.
        #[arg(long, env = "DOCTRANSLATE_BIND", default_value = "127.0.0.1:5001")]
        bind: std::net::SocketAddr,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Document photo (PNG or JPEG).
    image: PathBuf,

    /// Country that issued the document.
    #[arg(long)]
    origin: String,

    /// Language of the document; defaults to the origin country's language.
    #[arg(long)]
    origin_language: Option<String>,

    /// Country the translation is for.
    #[arg(long)]
    target: String,

    /// Target language; defaults to the target country's language.
    #[arg(long)]
    target_language: Option<String>,

    /// Template: option number, year, or canonical id. Default: newest.
    #[arg(long, default_value = "1")]
    template: String,

    /// Mark the review as confirmed and print the cost summary.
    #[arg(long)]
    confirm: bool,

    /// Service tier for the cost summary.
    #[arg(long, value_enum, default_value = "digital")]
    tier: TierArg,

    /// Continue with empty review fields when extraction fails.
    #[arg(long)]
    skip_on_failure: bool,

    /// Output structured JSON instead of the translated text.
    #[arg(long)]
    json: bool,

    /// Write output to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable the spinner.
    #[arg(long, env = "DOCTRANSLATE_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TierArg {
    Digital,
    Printed,
}

impl From<TierArg> for ServiceTier {
    fn from(v: TierArg) -> Self {
        match v {
            TierArg::Digital => ServiceTier::Digital,
            TierArg::Printed => ServiceTier::Printed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives the user feedback during translate; keep INFO logs
    // out of its way unless asked for.
    let spinner = matches!(&cli.command, Command::Translate(a) if !a.no_progress && !a.json);
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Translate(args) => run_translate(&cli, args, spinner && !cli.quiet).await,
        Command::Templates { country, json } => run_templates(country, *json),
        #[cfg(feature = "server")]
        Command::Serve { bind } => {
            let config = build_config(&cli).await?;
            let pipelines = build_pipelines(&config).context("Failed to set up pipelines")?;
            edgequake_doctranslate::server::serve(*bind, Arc::new(pipelines), config.max_image_bytes)
                .await
                .with_context(|| format!("Backend server on {bind} failed"))
        }
    }
}

/// JSON shape of `translate --json`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateReport<'a> {
    stage: Stage,
    context: &'a edgequake_doctranslate::WorkflowContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    cost_summary: Option<edgequake_doctranslate::CostSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<&'a edgequake_doctranslate::LoadingFailure>,
}

async fn run_translate(cli: &Cli, args: &TranslateArgs, show_progress: bool) -> Result<()> {
    let image = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read image {:?}", args.image))?;

    let config = build_config(cli).await?;
    let pipelines = build_pipelines(&config).context("Failed to set up pipelines")?;

    let mut workflow = Workflow::from_config(&config);
    if show_progress {
        workflow = workflow.with_observer(CliObserver::new());
    }

    // ── Intake ───────────────────────────────────────────────────────────
    workflow.start()?;
    workflow.select_document_type("Passport")?;
    workflow
        .select_origin(&args.origin, args.origin_language.as_deref())
        .context("Invalid origin details")?;
    workflow.attach_document(Some(image))?;

    let template = workflow
        .template_options()
        .iter()
        .find(|o| o.year == args.template.trim())
        .map(|o| o.id.clone())
        .unwrap_or_else(|| args.template.clone());
    workflow
        .select_template(&template)
        .context("Invalid template")?;

    workflow
        .select_target_country(&args.target)
        .context("Invalid target country")?;
    if let Some(ref language) = args.target_language {
        workflow
            .select_target_language(language)
            .context("Invalid target language")?;
    }

    // ── Loading ──────────────────────────────────────────────────────────
    let disposition = workflow.load(&pipelines).await?;
    if disposition == LoadingDisposition::Applied(Stage::ExtractionFailed) {
        if !args.skip_on_failure {
            let reason = workflow
                .last_failure()
                .map(|f| f.to_string())
                .unwrap_or_default();
            bail!("Extraction failed: {reason}\nRe-run, or pass --skip-on-failure to enter the fields manually.");
        }
        workflow.skip_extraction()?;
    }

    // ── Review / Payment summary ─────────────────────────────────────────
    let mut cost_summary = None;
    if args.confirm {
        workflow.confirm_review()?;
        workflow.proceed_to_payment()?;
        workflow.select_service_tier(args.tier.into())?;
        cost_summary = Some(workflow.cost_summary()?);
    }

    let output = if args.json {
        let report = TranslateReport {
            stage: workflow.stage(),
            context: workflow.context(),
            cost_summary: cost_summary.clone(),
            failure: workflow.last_failure(),
        };
        serde_json::to_string_pretty(&report).context("Failed to serialise output")?
    } else {
        workflow
            .context()
            .translated_text
            .clone()
            .unwrap_or_default()
    };

    match args.output {
        Some(ref path) => tokio::fs::write(path, format!("{output}\n"))
            .await
            .with_context(|| format!("Failed to write {:?}", path))?,
        None => {
            let mut handle = io::stdout().lock();
            writeln!(handle, "{output}").context("Failed to write to stdout")?;
        }
    }

    if !cli.quiet && !args.json {
        print_review(&workflow);
        if let Some(summary) = cost_summary {
            eprintln!();
            for item in &summary.line_items {
                eprintln!("  {:<22} {:>8}", item.label, item.amount.to_string());
            }
            eprintln!("  {:<22} {:>8}", bold("Total"), bold(&summary.total.to_string()));
        }
    }
    Ok(())
}

fn print_review(workflow: &Workflow) {
    let Some(record) = workflow.review_record() else {
        return;
    };
    eprintln!();
    eprintln!("{}", bold("Review data"));
    for field in edgequake_doctranslate::ReviewField::ALL {
        let value = record.get(field);
        let shown = if value.is_empty() {
            dim("(enter manually)")
        } else {
            value.to_string()
        };
        eprintln!("  {:<20} {}", field.label(), shown);
    }
    if record.can_advance() {
        eprintln!("  {}", green("✔ confirmed"));
    }
}

fn run_templates(country: &str, json: bool) -> Result<()> {
    let options = resolve_templates(country);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&options).context("Failed to serialise templates")?
        );
        return Ok(());
    }
    for option in &options {
        println!("{:>2}  {}  {}", option.id, option.year, option.template_id());
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .api_timeout_secs(cli.api_timeout)
        .ocr_language_hint(cli.ocr_language.clone());

    if let Some(ref url) = cli.backend {
        builder = builder.backend_url(url.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.translation_system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}
