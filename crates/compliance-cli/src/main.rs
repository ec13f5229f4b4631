mod config;
mod display;

use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use compliance_api::{ApiConfig, AppState, RateLimitConfig, state::DEFAULT_BODY_LIMIT};
use compliance_core::{CatalogHandle, Regulation};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{CatalogArgs, PipelineArgs};

/// Agentic compliance agent: maps business facts onto GDPR, CCPA, FDA and IRS
/// provisions, scores the risk and decides whether a human has to look.
#[derive(Parser, Debug)]
#[command(name = "compliance-agent", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API.
    Serve(ServeArgs),
    /// Analyse a single query and print the result.
    Analyze(AnalyzeArgs),
    /// List the regulation catalog.
    Catalog(CatalogCommand),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Port to listen on (all interfaces).
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Deployed frontend origin allowed through CORS.
    #[arg(long, env = "FRONTEND_URL")]
    frontend_url: Option<String>,

    /// `/analyze` requests per client per minute; 0 disables the limit.
    #[arg(long, env = "COMPLIANCE_RATE_LIMIT", default_value_t = 10)]
    rate_limit: u32,

    /// Re-read the catalog file every N seconds.
    #[arg(long, env = "COMPLIANCE_CATALOG_RELOAD_SECS")]
    catalog_reload_secs: Option<u64>,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Print the response as JSON instead of a card.
    #[arg(long)]
    json: bool,

    /// Query text. Read from stdin when omitted.
    query: Option<String>,
}

#[derive(Args, Debug)]
struct CatalogCommand {
    #[command(flatten)]
    catalog: CatalogArgs,

    /// Only list this regulation (GDPR, CCPA, FDA, IRS).
    #[arg(long)]
    regulation: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `analyze --json` output stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Analyze(args) => analyze(args).await,
        Commands::Catalog(args) => catalog(args),
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    info!("compliance-agent v{}", env!("CARGO_PKG_VERSION"));
    let (analyst, catalog) = args.pipeline.build()?;

    if let Some(secs) = args.catalog_reload_secs {
        let Some(path) = args.pipeline.catalog.catalog.clone() else {
            bail!("--catalog-reload-secs needs a catalog file (--catalog or COMPLIANCE_CATALOG)");
        };
        spawn_catalog_reload(catalog, path, Duration::from_secs(secs.max(1)));
    }

    let config = ApiConfig {
        frontend_url: args.frontend_url,
        rate_limit: (args.rate_limit > 0).then(|| RateLimitConfig {
            max_requests: args.rate_limit,
            window: Duration::from_secs(60),
        }),
        body_limit: DEFAULT_BODY_LIMIT,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    compliance_api::serve(AppState::new(analyst, config), addr, shutdown_signal())
        .await
        .context("HTTP server failed")
}

fn spawn_catalog_reload(catalog: CatalogHandle, path: PathBuf, every: Duration) {
    info!(path = %path.display(), every_secs = every.as_secs(), "catalog hot reload enabled");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick fires immediately; the catalog was just loaded.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            // Failures are logged by the handle and keep the old snapshot.
            if catalog.reload_from(&path).is_ok() {
                info!(path = %path.display(), "catalog reloaded");
            }
        }
    });
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received, draining requests"),
        Err(e) => {
            error!(error = %e, "cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

async fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let query = match args.query {
        Some(q) => q,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading query from stdin")?;
            buf
        }
    };

    let (analyst, _) = args.pipeline.build()?;
    let response = analyst.analyze(&query).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", display::render_analysis(&response));
    }
    Ok(())
}

fn catalog(args: CatalogCommand) -> anyhow::Result<()> {
    let only = match args.regulation.as_deref() {
        None => None,
        Some(label) => match Regulation::from_label(label) {
            Regulation::Other => bail!("unknown regulation {label:?}; expected GDPR, CCPA, FDA or IRS"),
            r => Some(r),
        },
    };
    let catalog = args.catalog.load()?;
    print!("{}", display::render_catalog(&catalog, only));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractorKind, ValidationMode};
    use compliance_core::ValidationPolicy;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn serve_flags() {
        let cli = parse(&[
            "compliance-agent",
            "serve",
            "--port",
            "9000",
            "--rate-limit",
            "0",
            "--extractor",
            "rules",
            "--validation",
            "strict",
        ]);
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, 9000);
        assert_eq!(args.rate_limit, 0);
        assert_eq!(args.pipeline.extractor, ExtractorKind::Rules);
        assert_eq!(args.pipeline.validation, ValidationMode::Strict);
    }

    #[test]
    fn analyze_takes_positional_query() {
        let cli = parse(&["compliance-agent", "analyze", "--json", "We lost a laptop."]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert!(args.json);
        assert_eq!(args.query.as_deref(), Some("We lost a laptop."));
    }

    #[test]
    fn unknown_extractor_is_rejected() {
        assert!(Cli::try_parse_from(["compliance-agent", "analyze", "--extractor", "magic", "q"]).is_err());
    }

    #[test]
    fn settings_apply_overrides() {
        let cli = parse(&[
            "compliance-agent",
            "analyze",
            "--validation",
            "strict",
            "--high-at",
            "9",
            "--auto-approve-at",
            "0.9",
            "--extraction-timeout-secs",
            "5",
            "q",
        ]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let settings = args.pipeline.settings().unwrap();
        assert_eq!(settings.validation, ValidationPolicy::Strict);
        assert_eq!(settings.risk.high_at, 9.0);
        assert_eq!(settings.decision.auto_approve_at, 0.9);
        assert_eq!(settings.extraction_timeout, Duration::from_secs(5));
    }

    #[test]
    fn inverted_cutoffs_are_rejected() {
        let cli = parse(&["compliance-agent", "analyze", "--medium-at", "7", "--high-at", "3", "q"]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert!(args.pipeline.settings().is_err());
    }

    #[test]
    fn risk_policy_file_is_merged_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk.json");
        std::fs::write(&path, r#"{"weights": {"gdpr": 4.0}}"#).unwrap();
        let path_arg = path.to_str().unwrap();

        let cli = parse(&["compliance-agent", "analyze", "--risk-policy", path_arg, "q"]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let settings = args.pipeline.settings().unwrap();
        assert_eq!(settings.risk.weights.gdpr, 4.0);
        assert_eq!(settings.risk.weights.fda, 3.0);
    }

    #[test]
    fn llm_extractor_needs_a_key() {
        let cli = parse(&[
            "compliance-agent",
            "analyze",
            "--extractor",
            "llm",
            "--api-key",
            " ",
            "q",
        ]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert!(args.pipeline.extractor().is_err());
    }

    #[test]
    fn llm_extractor_with_key_builds() {
        let cli = parse(&[
            "compliance-agent",
            "analyze",
            "--extractor",
            "llm",
            "--api-key",
            "test-key",
            "q",
        ]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.pipeline.extractor().unwrap().name(), "llm");
    }
}
