use serde::{Deserialize, Serialize};

use crate::models::ContentItem;

pub const ORGANIC_CHANNEL: &str = "organic_social";
pub const FACEBOOK_CAMPAIGN: &str = "Facebook Page (organic)";
pub const INSTAGRAM_CAMPAIGN: &str = "Instagram (organic)";

/// One platform's organic content rolled up into a campaign record. Organic
/// content has no spend, revenue, leads or customers, so those are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignAggregate {
    pub name: String,
    pub channel: String,
    pub spend: f64,
    pub revenue: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub leads: u64,
    pub customers: u64,
}

/// Engagement for a single post: the proxy figure when the platform gave a
/// non-zero one, otherwise likes + comments + shares.
pub fn post_engagement(item: &ContentItem) -> u64 {
    match item.engagement_proxy {
        Some(proxy) if proxy > 0 => proxy,
        _ => item.likes.saturating_add(item.comments).saturating_add(item.shares),
    }
}

/// Sum impressions and clicks across `posts`. When nothing was clicked the
/// summed engagement is reported as clicks instead.
pub fn aggregate(posts: &[ContentItem], name: &str) -> CampaignAggregate {
    let impressions = saturating_sum(posts.iter().map(|p| p.impressions));
    let clicks = saturating_sum(posts.iter().map(|p| p.clicks));
    let engagement = saturating_sum(posts.iter().map(post_engagement));

    CampaignAggregate {
        name: name.to_string(),
        channel: ORGANIC_CHANNEL.to_string(),
        spend: 0.0,
        revenue: 0.0,
        impressions,
        clicks: if clicks > 0 { clicks } else { engagement },
        leads: 0,
        customers: 0,
    }
}

fn saturating_sum(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0, u64::saturating_add)
}

/// Campaign records for every platform that returned at least one post.
pub fn build_campaigns(facebook: &[ContentItem], instagram: &[ContentItem]) -> Vec<CampaignAggregate> {
    [(facebook, FACEBOOK_CAMPAIGN), (instagram, INSTAGRAM_CAMPAIGN)]
        .into_iter()
        .filter(|(posts, _)| !posts.is_empty())
        .map(|(posts, name)| aggregate(posts, name))
        .collect()
}
