use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use meta_content_stats::config::{
    self, API_VERSION_KEY, Credentials, DEFAULT_LIMIT, DEFAULT_RESULTS_DIR, GRAPH_URL_KEY, OutputFormat,
    OutputMode, Settings, process_env, resolve_setting,
};
use meta_content_stats::fetch::DEFAULT_CONCURRENCY;
use meta_content_stats::output::{csv_fetched_at, csv_output_path};
use meta_content_stats::{
    DEFAULT_API_VERSION, FetchOptions, GRAPH_API_BASE, GraphClient, fetch_facebook_content,
    fetch_instagram_content, render_json, render_text_summary, resolve_linked_account, write_csv,
};
use tracing_subscriber::EnvFilter;

/// Fetch Facebook Page and Instagram content stats from the Meta Graph API.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Meta Page or User access token (or set META_TOKEN in .env)
    #[arg(long)]
    token: Option<String>,

    /// Facebook Page ID (or set META_PAGE_ID in .env)
    #[arg(long)]
    page_id: Option<String>,

    /// Max posts per platform
    #[arg(long, default_value_t = DEFAULT_LIMIT, value_parser = clap::value_parser!(u32).range(1..))]
    limit: u32,

    #[arg(long, value_enum, default_value_t = OutputMode::All)]
    output: OutputMode,

    /// Ignored with --output csv
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// For --output csv: filename prefix; the file is written to the results
    /// directory as <prefix>_YYYY-MM-DD_HHMM.csv
    #[arg(short = 'o', long = "out-file")]
    out_file: Option<String>,

    /// With --output csv: write only Instagram rows
    #[arg(long)]
    instagram_only: bool,

    /// Graph API version (or set META_API_VERSION)
    #[arg(long)]
    api_version: Option<String>,

    /// Graph API host (or set META_GRAPH_URL)
    #[arg(long)]
    api_base: Option<String>,

    /// Read settings from this file instead of searching for .env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Directory for CSV output
    #[arg(long, default_value = DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,

    /// Insight requests in flight per platform
    #[arg(
        long,
        default_value_t = DEFAULT_CONCURRENCY,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    concurrency: usize,
}

impl Cli {
    fn into_settings(self) -> Result<Settings> {
        let env_vars = config::discover_env_vars(self.env_file.as_deref())?;
        let credentials = Credentials::resolve(self.token, self.page_id, process_env, &env_vars)?;

        Ok(Settings {
            access_token: credentials.access_token,
            page_id: credentials.page_id,
            limit: self.limit,
            output: self.output,
            format: self.format,
            api_version: resolve_setting(self.api_version, API_VERSION_KEY, process_env, &env_vars)
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            api_base: resolve_setting(self.api_base, GRAPH_URL_KEY, process_env, &env_vars)
                .unwrap_or_else(|| GRAPH_API_BASE.to_string()),
            out_prefix: self.out_file,
            instagram_only: self.instagram_only,
            results_dir: self.results_dir,
            concurrency: self.concurrency,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,meta_content_stats=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let settings = Cli::parse().into_settings()?;
    run(settings).await
}

async fn run(settings: Settings) -> Result<()> {
    let client = GraphClient::with_base_url(
        &settings.api_base,
        &settings.access_token,
        &settings.api_version,
    )?;

    let options = FetchOptions {
        concurrency: settings.concurrency,
        progress: progress_bar("Facebook insights")?,
    };
    let facebook = fetch_facebook_content(&client, &settings.page_id, settings.limit, &options)
        .await
        .context("Facebook fetch error")?;

    let account_id = resolve_linked_account(&client, &settings.page_id)
        .await
        .context("Instagram account lookup failed")?;

    let instagram = match account_id {
        Some(account_id) => {
            let options = FetchOptions {
                concurrency: settings.concurrency,
                progress: progress_bar("Instagram insights")?,
            };
            match fetch_instagram_content(&client, &account_id, settings.limit, &options).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(error = %e, "Instagram fetch warning");
                    Vec::new()
                }
            }
        }
        None => {
            tracing::warn!(page_id = %settings.page_id, "No Instagram Business account linked to this Page.");
            Vec::new()
        }
    };

    if settings.output == OutputMode::Csv {
        let path = csv_output_path(&settings.results_dir, settings.out_prefix.as_deref(), Local::now());
        write_csv(
            &instagram,
            &facebook,
            &path,
            settings.instagram_only,
            &csv_fetched_at(Utc::now()),
        )?;

        let facebook_rows = if settings.instagram_only { 0 } else { facebook.len() };
        eprintln!(
            "Wrote {} Instagram + {} Facebook rows to {}",
            instagram.len(),
            facebook_rows,
            path.display()
        );
        return Ok(());
    }

    match settings.format {
        OutputFormat::Text => println!("{}", render_text_summary(&facebook, &instagram)),
        OutputFormat::Json => println!(
            "{}",
            render_json(settings.output, &facebook, &instagram, Utc::now())?
        ),
    }

    Ok(())
}

fn progress_bar(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?
            .progress_chars("##-"),
    );
    pb.set_message(message);
    Ok(pb)
}
