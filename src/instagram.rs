use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{GraphClient, GraphList};
use crate::error::Result;
use crate::fetch::{FetchOptions, fan_out};
use crate::insights::{Insights, metric, parse_insights};
use crate::models::{ContentItem, ContentType, Platform, PostText, excerpt};

pub const MEDIA_FIELDS: &str =
    "id,media_type,media_product_type,caption,timestamp,like_count,comments_count";

const BASE_METRICS: &str = "reach,saved,shares";
const CAPTION_EXCERPT_CHARS: usize = 500;
const DEFAULT_MEDIA_TYPE: &str = "IMAGE";
const DEFAULT_PRODUCT_TYPE: &str = "FEED";

/// An Instagram media object as returned by `/{ig-user-id}/media`.
///
/// Like and comment counts are direct fields here, so they need no insights
/// call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMedia {
    pub id: String,
    pub media_type: Option<String>,
    pub media_product_type: Option<String>,
    pub caption: Option<String>,
    pub timestamp: Option<String>,
    pub like_count: Option<u64>,
    pub comments_count: Option<u64>,
}

impl RawMedia {
    pub fn media_type(&self) -> &str {
        self.media_type.as_deref().unwrap_or(DEFAULT_MEDIA_TYPE)
    }

    pub fn product_type(&self) -> &str {
        self.media_product_type.as_deref().unwrap_or(DEFAULT_PRODUCT_TYPE)
    }
}

/// Look up the Instagram Business account linked to a Page. `None` when the
/// Page has no linked account.
pub async fn resolve_linked_account(client: &GraphClient, page_id: &str) -> Result<Option<String>> {
    let body = client
        .get(page_id, &[("fields", "instagram_business_account")])
        .await?;
    Ok(linked_account_id(&body))
}

fn linked_account_id(page: &Value) -> Option<String> {
    let id = match page.get("instagram_business_account")? {
        Value::Null => None,
        Value::Object(account) => account.get("id").and_then(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }),
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    };
    id.filter(|id| !id.is_empty())
}

pub async fn list_media(client: &GraphClient, account_id: &str, limit: u32) -> Result<Vec<RawMedia>> {
    let limit = limit.to_string();
    let list: GraphList<RawMedia> = client
        .get_as(
            &format!("{account_id}/media"),
            &[("fields", MEDIA_FIELDS), ("limit", limit.as_str())],
        )
        .await?;
    Ok(list.data)
}

/// Reels and videos report `views`; `impressions` is deprecated for them and
/// errors or comes back empty, so only one of the two is ever requested.
pub fn wants_views(media_type: &str, product_type: &str) -> bool {
    product_type.eq_ignore_ascii_case("REELS") || media_type.eq_ignore_ascii_case("VIDEO")
}

pub fn media_metrics(media_type: &str, product_type: &str) -> String {
    let reach_metric = if wants_views(media_type, product_type) {
        "views"
    } else {
        "impressions"
    };
    format!("{BASE_METRICS},{reach_metric}")
}

pub async fn get_media_insights(
    client: &GraphClient,
    media_id: &str,
    media_type: &str,
    product_type: &str,
) -> Result<Insights> {
    let metrics = media_metrics(media_type, product_type);
    let body = client
        .get(
            &format!("{media_id}/insights"),
            &[("metric", metrics.as_str()), ("period", "lifetime")],
        )
        .await?;
    Ok(parse_insights(&body))
}

/// Per-item insights are best-effort: a failed request yields an empty
/// metric map and the media is still reported.
pub async fn media_insights_or_empty(client: &GraphClient, media: &RawMedia) -> Insights {
    get_media_insights(client, &media.id, media.media_type(), media.product_type())
        .await
        .unwrap_or_else(|e| {
            tracing::debug!(media_id = %media.id, error = %e, "Instagram insights unavailable");
            Insights::new()
        })
}

pub fn classify_media(media_type: &str) -> ContentType {
    match media_type.to_ascii_uppercase().as_str() {
        "VIDEO" | "REELS" => ContentType::Video,
        "CAROUSEL_ALBUM" => ContentType::Carousel,
        _ => ContentType::Image,
    }
}

pub fn normalize_media(media: &RawMedia, insights: &Insights) -> ContentItem {
    let reach = metric(insights, "reach");
    let views = metric(insights, "views");
    let impressions = match metric(insights, "impressions") {
        0 if views > 0 => views,
        0 => reach,
        n => n,
    };

    ContentItem {
        platform: Platform::Instagram,
        post_id: media.id.clone(),
        media_type: Some(media.media_type().to_string()),
        media_product_type: Some(media.product_type().to_string()),
        content_type: classify_media(media.media_type()),
        text: PostText::Caption(excerpt(
            media.caption.as_deref().unwrap_or_default(),
            CAPTION_EXCERPT_CHARS,
        )),
        likes: media.like_count.unwrap_or(0),
        comments: media.comments_count.unwrap_or(0),
        shares: metric(insights, "shares"),
        saves: metric(insights, "saved"),
        reach,
        impressions,
        views,
        clicks: 0,
        engagement_proxy: None,
        posted_at: media.timestamp.clone().unwrap_or_default(),
    }
}

/// List the account's recent media and attach best-effort insights to each.
/// Only the listing call can fail.
pub async fn fetch_instagram_content(
    client: &GraphClient,
    account_id: &str,
    limit: u32,
    options: &FetchOptions,
) -> Result<Vec<ContentItem>> {
    let media = list_media(client, account_id, limit).await?;
    tracing::info!(account_id, count = media.len(), "Fetched Instagram media");

    let items = fan_out(media, options, |item| async move {
        let insights = media_insights_or_empty(client, &item).await;
        normalize_media(&item, &insights)
    })
    .await;

    Ok(items)
}
