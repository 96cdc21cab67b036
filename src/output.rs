use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use csv::WriterBuilder;
use serde::Serialize;

use crate::aggregate::{CampaignAggregate, build_campaigns};
use crate::config::OutputMode;
use crate::models::{ContentItem, ContentType, Platform};

pub const DEFAULT_CSV_PREFIX: &str = "instagram_stats";

pub const CSV_COLUMNS: [&str; 18] = [
    "platform",
    "post_id",
    "media_type",
    "media_product_type",
    "content_type",
    "posted_at",
    "text",
    "likes",
    "comments",
    "shares",
    "saves",
    "reach",
    "impressions",
    "views",
    "engagement_total",
    "engagement_rate_pct",
    "clicks",
    "fetched_at",
];

#[derive(Debug, Serialize)]
pub struct PlatformPosts<'a> {
    pub platform: Platform,
    pub total_spend: u64,
    pub posts: &'a [ContentItem],
}

impl<'a> PlatformPosts<'a> {
    fn new(platform: Platform, posts: &'a [ContentItem]) -> Self {
        Self {
            platform,
            total_spend: 0,
            posts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Platforms<'a> {
    pub facebook: PlatformPosts<'a>,
    pub instagram: PlatformPosts<'a>,
}

/// Per-post view, keyed by platform.
#[derive(Debug, Serialize)]
pub struct SocialMediaReport<'a> {
    pub meta_fetched_at: String,
    pub platforms: Platforms<'a>,
}

/// Aggregate view, one campaign per platform with content.
#[derive(Debug, Serialize)]
pub struct CampaignReport {
    pub campaigns: Vec<CampaignAggregate>,
    pub meta_fetched_at: String,
}

#[derive(Debug, Serialize)]
pub struct CombinedReport<'a> {
    pub social_media: SocialMediaReport<'a>,
    pub campaigns: CampaignReport,
}

pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn build_social_media_output<'a>(
    facebook: &'a [ContentItem],
    instagram: &'a [ContentItem],
    now: DateTime<Utc>,
) -> SocialMediaReport<'a> {
    SocialMediaReport {
        meta_fetched_at: iso_timestamp(now),
        platforms: Platforms {
            facebook: PlatformPosts::new(Platform::Facebook, facebook),
            instagram: PlatformPosts::new(Platform::Instagram, instagram),
        },
    }
}

pub fn build_campaigns_output(
    facebook: &[ContentItem],
    instagram: &[ContentItem],
    now: DateTime<Utc>,
) -> CampaignReport {
    CampaignReport {
        campaigns: build_campaigns(facebook, instagram),
        meta_fetched_at: iso_timestamp(now),
    }
}

pub fn build_combined_output<'a>(
    facebook: &'a [ContentItem],
    instagram: &'a [ContentItem],
    now: DateTime<Utc>,
) -> CombinedReport<'a> {
    CombinedReport {
        social_media: build_social_media_output(facebook, instagram, now),
        campaigns: build_campaigns_output(facebook, instagram, now),
    }
}

/// Pretty-printed JSON for one of the JSON output modes.
pub fn render_json(
    mode: OutputMode,
    facebook: &[ContentItem],
    instagram: &[ContentItem],
    now: DateTime<Utc>,
) -> Result<String> {
    let json = match mode {
        OutputMode::All => {
            serde_json::to_string_pretty(&build_combined_output(facebook, instagram, now))?
        }
        OutputMode::SocialMedia => {
            serde_json::to_string_pretty(&build_social_media_output(facebook, instagram, now))?
        }
        OutputMode::Campaigns => {
            serde_json::to_string_pretty(&build_campaigns_output(facebook, instagram, now))?
        }
        OutputMode::Csv => bail!("CSV output is written to a file, not rendered as JSON"),
    };
    Ok(json)
}

pub fn render_text_summary(facebook: &[ContentItem], instagram: &[ContentItem]) -> String {
    format!(
        "Facebook posts: {}\nInstagram posts: {}\nUse --format json to get full data.",
        facebook.len(),
        instagram.len()
    )
}

/// One CSV line; field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvRow {
    pub platform: Platform,
    pub post_id: String,
    pub media_type: String,
    pub media_product_type: String,
    pub content_type: ContentType,
    pub posted_at: String,
    pub text: String,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub saves: u64,
    pub reach: u64,
    pub impressions: u64,
    pub views: u64,
    pub engagement_total: u64,
    pub engagement_rate_pct: f64,
    pub clicks: u64,
    pub fetched_at: String,
}

impl CsvRow {
    pub fn from_item(item: &ContentItem, fetched_at: &str) -> Self {
        let reach = match item.platform {
            Platform::Instagram => item.reach,
            Platform::Facebook => item.engagement_proxy.unwrap_or(0),
        };

        Self {
            platform: item.platform,
            post_id: item.post_id.clone(),
            media_type: item.media_type.clone().unwrap_or_default(),
            media_product_type: item.media_product_type.clone().unwrap_or_default(),
            content_type: item.content_type,
            posted_at: item.posted_at.clone(),
            text: single_line(item.text.as_str()),
            likes: item.likes,
            comments: item.comments,
            shares: item.shares,
            saves: item.saves,
            reach,
            impressions: item.impressions,
            views: item.views,
            engagement_total: item.engagement_total(),
            engagement_rate_pct: item.engagement_rate_pct(),
            clicks: item.clicks,
            fetched_at: fetched_at.to_string(),
        }
    }
}

fn single_line(text: &str) -> String {
    text.replace('\n', " ").replace('\r', "")
}

pub fn csv_fetched_at(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// `<prefix>_<YYYY-MM-DD_HHMM>.csv`, with a trailing `.csv` dropped from the
/// prefix.
pub fn csv_file_name(prefix: Option<&str>, now: DateTime<Local>) -> String {
    let prefix = prefix
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_CSV_PREFIX);
    let prefix = prefix.strip_suffix(".csv").unwrap_or(prefix);
    format!("{}_{}.csv", prefix, now.format("%Y-%m-%d_%H%M"))
}

pub fn csv_output_path(results_dir: &Path, prefix: Option<&str>, now: DateTime<Local>) -> PathBuf {
    results_dir.join(csv_file_name(prefix, now))
}

/// Write Instagram rows first, then Facebook rows unless `instagram_only`.
/// The header is always written. Returns the number of data rows.
pub fn write_csv(
    instagram: &[ContentItem],
    facebook: &[ContentItem],
    path: &Path,
    instagram_only: bool,
    fetched_at: &str,
) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
    wtr.write_record(CSV_COLUMNS)?;

    let facebook: &[ContentItem] = if instagram_only { &[] } else { facebook };
    let mut rows = 0;
    for item in instagram.iter().chain(facebook) {
        wtr.serialize(CsvRow::from_item(item, fetched_at))?;
        rows += 1;
    }

    wtr.flush()?;
    Ok(rows)
}
