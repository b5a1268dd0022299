//! Before/After image fetcher.
//!
//! Command-line front end over the resilient execution core: validates image
//! URLs, fetches them with retries and proxy fallback, and reports failures
//! as structured errors.
//!
//! ```text
//! before-after [--config FILE] fetch <URL> [--out FILE]
//! before-after [--config FILE] compare <BEFORE> <AFTER> [--out-dir DIR]
//! before-after [--config FILE] check-url <URL>
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use before_after::config::{load_config, AppConfig, ConfigError};
use before_after::fetch::{validate_image_url, FetchedImage, ImageFetcher, ImageUrl};
use before_after::lifecycle::cancel_on_ctrl_c;
use before_after::observability::{logging, metrics};
use before_after::resilience::{RetryPreset, RetryResult};
use before_after::AppError;

#[derive(Parser)]
#[command(name = "before-after")]
#[command(about = "Fetch and check images for Before/After comparisons", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one image, falling back to configured proxies
    Fetch {
        url: String,

        /// Write the image bytes here
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        retry: RetryArgs,
    },
    /// Fetch both sides of a comparison, one after the other
    Compare {
        before: String,
        after: String,

        /// Write before.<ext> and after.<ext> into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,

        #[command(flatten)]
        retry: RetryArgs,
    },
    /// Check a URL against the source policy without fetching it
    CheckUrl { url: String },
}

#[derive(Args)]
struct RetryArgs {
    /// Retry preset to start from
    #[arg(long, value_enum)]
    profile: Option<Profile>,

    /// Total attempts per candidate, including the first
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Per-attempt timeout in milliseconds (0 disables it)
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Profile {
    Default,
    ExternalFetch,
}

impl From<Profile> for RetryPreset {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Default => RetryPreset::Default,
            Profile::ExternalFetch => RetryPreset::ExternalFetch,
        }
    }
}

impl RetryArgs {
    fn apply(&self, config: &mut AppConfig) -> Result<(), ConfigError> {
        if let Some(profile) = self.profile {
            config.fetch.profile = profile.into();
        }
        if self.max_attempts.is_some() {
            config.fetch.retry.max_attempts = self.max_attempts;
        }
        if self.timeout_ms.is_some() {
            config.fetch.retry.timeout_ms = self.timeout_ms;
        }
        config
            .fetch
            .retry_policy()
            .validate()
            .map_err(ConfigError::Validation)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    logging::init(&config.observability);
    if let Some(addr) = config.observability.metrics_addr {
        metrics::init_exporter(addr)?;
    }

    let cancel = CancellationToken::new();
    let _signals = cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Commands::Fetch { url, out, retry } => {
            retry.apply(&mut config)?;
            let fetcher = ImageFetcher::new(config.fetch.clone())?;

            let source = match validate_image_url(&url, fetcher.config()) {
                Ok(source) => source,
                Err(e) => return Ok(report_failure(&e, 0)),
            };

            match fetcher.fetch_image(&source, Some(&cancel)).await {
                RetryResult::Success { data, attempts } => {
                    if let Some(path) = out {
                        tokio::fs::write(&path, &data.bytes).await?;
                        tracing::info!(path = %path.display(), "Image written");
                    }
                    print_json(&summary(&data, attempts))?;
                }
                RetryResult::Failure { error, attempts } => {
                    return Ok(report_failure(&error, attempts));
                }
            }
        }
        Commands::Compare {
            before,
            after,
            out_dir,
            retry,
        } => {
            retry.apply(&mut config)?;
            let fetcher = ImageFetcher::new(config.fetch.clone())?;

            let sides = match (
                validate_image_url(&before, fetcher.config()),
                validate_image_url(&after, fetcher.config()),
            ) {
                (Ok(before), Ok(after)) => [("before", before), ("after", after)],
                (Err(e), _) | (_, Err(e)) => return Ok(report_failure(&e, 0)),
            };

            let mut report = serde_json::Map::new();
            for (name, source) in sides {
                let (image, attempts) = match fetch_side(&fetcher, &source, &cancel).await {
                    Ok(fetched) => fetched,
                    Err((error, attempts)) => return Ok(report_failure(&error, attempts)),
                };
                if let Some(dir) = &out_dir {
                    write_side(dir, name, &image).await?;
                }
                report.insert(name.to_string(), summary(&image, attempts));
            }
            print_json(&Value::Object(report))?;
        }
        Commands::CheckUrl { url } => match validate_image_url(&url, &config.fetch) {
            Ok(source) => print_json(&json!({ "url": source.as_str(), "ok": true }))?,
            Err(e) => return Ok(report_failure(&e, 0)),
        },
    }

    Ok(ExitCode::SUCCESS)
}

async fn fetch_side(
    fetcher: &ImageFetcher,
    source: &ImageUrl,
    cancel: &CancellationToken,
) -> Result<(FetchedImage, u32), (AppError, u32)> {
    match fetcher.fetch_image(source, Some(cancel)).await {
        RetryResult::Success { data, attempts } => Ok((data, attempts)),
        RetryResult::Failure { error, attempts } => Err((error, attempts)),
    }
}

async fn write_side(dir: &Path, name: &str, image: &FetchedImage) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{name}.{}", extension_for(&image.content_type)));
    tokio::fs::write(&path, &image.bytes).await?;
    tracing::info!(path = %path.display(), "Image written");
    Ok(())
}

fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/svg+xml" => "svg",
        _ => "img",
    }
}

fn summary(image: &FetchedImage, attempts: u32) -> Value {
    json!({
        "source": image.source,
        "url": image.url,
        "contentType": image.content_type,
        "bytes": image.len(),
        "attempts": attempts,
    })
}

fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_failure(error: &AppError, attempts: u32) -> ExitCode {
    eprintln!("Error: {}", error.display_for_user());
    let payload = json!({ "error": error, "attempts": attempts });
    match serde_json::to_string_pretty(&payload) {
        Ok(text) => eprintln!("{text}"),
        Err(e) => tracing::error!(error = %e, "Failed to serialize error report"),
    }
    ExitCode::FAILURE
}
