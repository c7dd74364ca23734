//! Iglu schema tooling CLI
//!
//! The `iglu-schemas` command works on a tree of self-describing schemas laid
//! out as `<vendor>/<name>/<format>/<version>`.
//!
//! ## Commands
//!
//! - `validate`: Submit every schema to the console for validation
//! - `publish`: Promote every schema to DEV or PROD
//! - `test`: Run behavioural suites against a local collector

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iglu_core::{emit_run_finished, resolve_layout, ConsoleReporter, RunSpan, SchemaIdentifier};
use iglu_harness::{
    parse_collector_url, run_schema_checks, CollectorClient, CollectorSink, Harness,
    SuiteRegistry, DEFAULT_COLLECTOR,
};
use iglu_registry::{
    publish_all, validate_all, AccessToken, DeployTarget, RegistryClient, RegistryConfig,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, Level};

#[derive(Parser, Debug)]
#[command(name = "iglu-schemas")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Validate, publish and test iglu schemas", long_about = None)]
struct Cli {
    /// Print parsed options and enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Promote schemas through VALIDATED -> DEV -> PROD
    Publish {
        /// Root of the schema tree
        #[arg(long, default_value = "src/main")]
        schemas: PathBuf,

        /// Environment to deploy to (DEV or PROD)
        #[arg(long)]
        target: DeployTarget,

        #[command(flatten)]
        console: ConsoleArgs,
    },

    /// Validate schemas against the console
    Validate {
        /// Root of the schema tree
        #[arg(long, default_value = "src/main")]
        schemas: PathBuf,

        #[command(flatten)]
        console: ConsoleArgs,
    },

    /// Run test suites against a local collector
    ///
    /// A case passes when delivery matches its assertion. An event that never
    /// reaches the collector (transport error or timeout) counts as "not
    /// delivered" for its case and also fails the run with an [ERROR] line.
    Test {
        /// Root of the schema tree
        #[arg(long, default_value = "src/main")]
        schemas: PathBuf,

        /// Root of the test suite tree
        #[arg(long, default_value = "src/test")]
        tests: PathBuf,

        /// Collector base URL
        #[arg(long, default_value = DEFAULT_COLLECTOR)]
        collector: String,
    },
}

/// Console credentials shared by `publish` and `validate`.
#[derive(clap::Args, Debug)]
struct ConsoleArgs {
    /// Organization id
    #[arg(long = "orgId", env = "IGLU_ORG_ID")]
    org_id: String,

    /// Console API key
    #[arg(long = "apiKey", env = "IGLU_API_KEY", hide_env_values = true)]
    api_key: ApiKey,

    /// Console API root (defaults to IGLU_CONSOLE_URL or the public console)
    #[arg(long)]
    console_url: Option<String>,
}

/// API key that never shows up in debug output.
#[derive(Clone)]
struct ApiKey(String);

impl From<String> for ApiKey {
    fn from(value: String) -> Self {
        ApiKey(value)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    iglu_core::init_tracing(cli.json, level);

    if cli.debug {
        eprintln!("{:#?}", cli.command);
    }

    let code = match run(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            1
        }
    };
    std::process::exit(code);
}

async fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Publish {
            schemas,
            target,
            console,
        } => cmd_publish(&schemas, target, &console).await,
        Commands::Validate { schemas, console } => cmd_validate(&schemas, &console).await,
        Commands::Test {
            schemas,
            tests,
            collector,
        } => cmd_test(&schemas, &tests, &collector).await,
    }
}

fn scan(root: &Path) -> Result<Vec<SchemaIdentifier>> {
    let schemas =
        resolve_layout(root).with_context(|| format!("Failed to scan schemas in {:?}", root))?;
    debug!(root = %root.display(), count = schemas.len(), "resolved layout");
    Ok(schemas)
}

async fn connect(console: &ConsoleArgs) -> Result<(RegistryClient, AccessToken)> {
    let config = match &console.console_url {
        Some(url) => RegistryConfig::new(url),
        None => RegistryConfig::from_env(),
    };
    let client = RegistryClient::new(config).context("Failed to build console client")?;
    let token = client
        .fetch_access_token(&console.api_key.0, &console.org_id)
        .await
        .context("Failed to fetch console access token")?;
    Ok((client, token))
}

async fn cmd_publish(
    schemas_dir: &Path,
    target: DeployTarget,
    console: &ConsoleArgs,
) -> Result<i32> {
    let _span = RunSpan::enter("publish");
    let schemas = scan(schemas_dir)?;
    let (client, token) = connect(console).await?;

    let mut reporter = ConsoleReporter;
    let tally = publish_all(
        &client,
        &token,
        &console.org_id,
        &schemas,
        target,
        &mut reporter,
    )
    .await;

    let code = tally.exit_code();
    emit_run_finished("publish", schemas.len(), code);
    Ok(code)
}

async fn cmd_validate(schemas_dir: &Path, console: &ConsoleArgs) -> Result<i32> {
    let _span = RunSpan::enter("validate");
    let schemas = scan(schemas_dir)?;
    let (client, token) = connect(console).await?;

    let mut reporter = ConsoleReporter;
    let tally = validate_all(&client, &token, &console.org_id, &schemas, &mut reporter).await;

    let code = tally.exit_code();
    emit_run_finished("validate", schemas.len(), code);
    Ok(code)
}

async fn cmd_test(schemas_dir: &Path, tests_dir: &Path, collector: &str) -> Result<i32> {
    let _span = RunSpan::enter("test");

    if !schemas_dir.is_dir() || !tests_dir.is_dir() {
        eprintln!("Not all paths exist - check your values and try again.");
        eprintln!("  schemas: {}", schemas_dir.display());
        eprintln!("  tests:   {}", tests_dir.display());
        return Ok(1);
    }

    let url = parse_collector_url(collector)?;
    let schemas = scan(schemas_dir)?;
    let mut registry = SuiteRegistry::new();
    let cases = registry
        .load_dir(tests_dir)
        .with_context(|| format!("Failed to load test suites from {:?}", tests_dir))?;
    info!(schemas = schemas.len(), cases, collector = %url, "starting test run");

    let mut reporter = ConsoleReporter;
    let checks = CollectorClient::new(url.clone())?;
    let mut verdict = run_schema_checks(&checks, &schemas, &mut reporter).await;

    let harness = Harness::new(Arc::new(CollectorSink::new(url)?));
    harness
        .run_suites(registry.suites(), &mut reporter, &mut verdict)
        .await;

    let code = verdict.exit_code();
    emit_run_finished("test", cases, code);
    Ok(code)
}
