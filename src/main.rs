//! code-extractor CLI - upload images and export the codes found in them.
//!
//! # Usage
//!
//! ```bash
//! # Extract from a few photos and write both export files into ./out
//! code-extractor --email ops@example.com --config extractor.yaml -o out *.jpg
//!
//! # Only the comma-separated file, against another service
//! code-extractor --endpoint http://ocr.internal:5000 --format delimited scans/*.png
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use code_extractor::{
    AllowListVerifier, AuthGate, ExportFormat, ExtractorConfig, ReqwestExtractionClient,
    Workflow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Plain,
    Delimited,
    Both,
}

impl FormatArg {
    fn formats(self) -> &'static [ExportFormat] {
        match self {
            FormatArg::Plain => &[ExportFormat::Plain],
            FormatArg::Delimited => &[ExportFormat::Delimited],
            FormatArg::Both => &ExportFormat::ALL,
        }
    }
}

/// Upload images to a recognition service and export the extracted codes.
#[derive(Parser)]
#[command(name = "code-extractor", version, about)]
struct Cli {
    /// Image files to upload (non-image files are skipped)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// YAML configuration file
    #[arg(short, long, env = "CODE_EXTRACTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Override the service base URL
    #[arg(long, env = "CODE_EXTRACTOR_ENDPOINT")]
    endpoint: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Account to sign in with
    #[arg(long, env = "CODE_EXTRACTOR_EMAIL")]
    email: String,

    /// Secret for the account
    #[arg(long, env = "CODE_EXTRACTOR_SECRET", hide_env_values = true)]
    secret: String,

    /// Export format(s) to write
    #[arg(short, long, value_enum, default_value = "both")]
    format: FormatArg,

    /// Directory to write exports into
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => ExtractorConfig::from_yaml_file(path)?,
        None => ExtractorConfig::default(),
    };
    if let Some(endpoint) = cli.endpoint.clone() {
        config.endpoint = endpoint;
    }
    if cli.timeout_ms.is_some() {
        config.timeout_ms = cli.timeout_ms;
    }

    let gate = AuthGate::new(AllowListVerifier::new(config.credentials.clone()));
    gate.sign_in(&cli.email, &cli.secret).context("Sign-in failed")?;

    let workflow = Workflow::new(ReqwestExtractionClient::new(), config, gate.session());

    let selection = workflow.select_paths(cli.files.as_slice()).await?;
    eprintln!("{}", selection.message());
    if selection.rejected > 0 {
        eprintln!("Skipped {} non-image file(s).", selection.rejected);
    }

    let result = workflow.submit().await?;
    if let Some(summary) = workflow.summary() {
        eprintln!("{}", summary);
    }

    if result.is_empty() {
        eprintln!("No codes found; nothing to export.");
        return Ok(());
    }

    tokio::fs::create_dir_all(&cli.out_dir)
        .await
        .with_context(|| format!("Cannot create {}", cli.out_dir.display()))?;

    for format in cli.format.formats() {
        let Some(artifact) = workflow.export(*format) else {
            bail!("No codes available for export");
        };
        let path = artifact.write_to_dir(&cli.out_dir).await?;
        println!("{}", path.display());
    }

    Ok(())
}
