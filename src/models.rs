use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Facebook,
    Instagram,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Image,
    Video,
    Carousel,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Image => "image",
            ContentType::Video => "video",
            ContentType::Carousel => "carousel",
        }
    }
}

/// Post text, keyed the way each platform names it (`message` on Facebook,
/// `caption` on Instagram).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostText {
    Message(String),
    Caption(String),
}

impl PostText {
    pub fn as_str(&self) -> &str {
        match self {
            PostText::Message(text) | PostText::Caption(text) => text,
        }
    }
}

/// One fetched piece of content, normalized across platforms.
///
/// Counts the platform does not expose for a given endpoint are zero, never
/// absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentItem {
    pub platform: Platform,
    pub post_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_product_type: Option<String>,
    pub content_type: ContentType,
    #[serde(flatten)]
    pub text: PostText,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub saves: u64,
    pub reach: u64,
    pub impressions: u64,
    pub views: u64,
    pub clicks: u64,
    /// Stand-in for likes/comments/shares when the endpoint only reports an
    /// aggregate engagement figure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_proxy: Option<u64>,
    pub posted_at: String,
}

impl ContentItem {
    /// Total interactions used for engagement rate.
    pub fn engagement_total(&self) -> u64 {
        match self.platform {
            Platform::Instagram => [self.likes, self.comments, self.shares, self.saves]
                .into_iter()
                .fold(0, u64::saturating_add),
            Platform::Facebook => self.engagement_proxy.unwrap_or(0),
        }
    }

    /// Views when reported, impressions otherwise.
    pub fn rate_denominator(&self) -> u64 {
        if self.views > 0 { self.views } else { self.impressions }
    }

    /// `100 * engagement / denominator`, rounded to two decimals; 0.0 when
    /// nothing was seen.
    pub fn engagement_rate_pct(&self) -> f64 {
        engagement_rate_pct(self.engagement_total(), self.rate_denominator())
    }
}

pub fn engagement_rate_pct(engagement: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let pct = 100.0 * engagement as f64 / denominator as f64;
    (pct * 100.0).round() / 100.0
}

/// First `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
