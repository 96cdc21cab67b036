use serde::{Deserialize, Serialize};

use crate::client::{GraphClient, GraphList};
use crate::error::{GraphError, Result};
use crate::fetch::{FetchOptions, try_fan_out};
use crate::insights::{Insights, metric, parse_insights};
use crate::models::{ContentItem, ContentType, Platform, PostText, excerpt};

pub const POST_FIELDS: &str = "id,message,created_time,full_picture";
pub const POST_METRICS: &str = "post_impressions,post_engaged_users,post_clicks";

const MESSAGE_EXCERPT_CHARS: usize = 200;

/// A Page post as returned by `/{page-id}/posts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPost {
    pub id: String,
    pub message: Option<String>,
    pub created_time: Option<String>,
    pub full_picture: Option<String>,
}

pub async fn list_posts(client: &GraphClient, page_id: &str, limit: u32) -> Result<Vec<RawPost>> {
    let limit = limit.to_string();
    let list: GraphList<RawPost> = client
        .get_as(
            &format!("{page_id}/posts"),
            &[("fields", POST_FIELDS), ("limit", limit.as_str())],
        )
        .await?;
    Ok(list.data)
}

pub async fn get_post_insights(client: &GraphClient, post_id: &str) -> Result<Insights> {
    let body = client
        .get(&format!("{post_id}/insights"), &[("metric", POST_METRICS)])
        .await?;
    Ok(parse_insights(&body))
}

/// Page posts only expose a picture URL, not a media kind: a post with a
/// picture is treated as an image, one without as a video.
pub fn classify_post(post: &RawPost) -> ContentType {
    match post.full_picture.as_deref() {
        Some(picture) if !picture.is_empty() => ContentType::Image,
        _ => ContentType::Video,
    }
}

/// Post-level insights carry no likes/comments/shares, so those stay zero
/// and engaged users stands in for both reach and engagement.
pub fn normalize_post(post: &RawPost, insights: &Insights) -> ContentItem {
    let engaged = metric(insights, "post_engaged_users");

    ContentItem {
        platform: Platform::Facebook,
        post_id: post.id.clone(),
        media_type: None,
        media_product_type: None,
        content_type: classify_post(post),
        text: PostText::Message(excerpt(
            post.message.as_deref().unwrap_or_default(),
            MESSAGE_EXCERPT_CHARS,
        )),
        likes: 0,
        comments: 0,
        shares: 0,
        saves: 0,
        reach: engaged,
        impressions: metric(insights, "post_impressions"),
        views: 0,
        clicks: metric(insights, "post_clicks"),
        engagement_proxy: Some(engaged),
        posted_at: post.created_time.clone().unwrap_or_default(),
    }
}

/// List the Page's recent posts and attach insights to each. Any failure,
/// including a single post's insights, fails the whole fetch.
pub async fn fetch_facebook_content(
    client: &GraphClient,
    page_id: &str,
    limit: u32,
    options: &FetchOptions,
) -> Result<Vec<ContentItem>> {
    let posts = list_posts(client, page_id, limit).await?;
    tracing::info!(page_id, count = posts.len(), "Fetched Facebook posts");

    try_fan_out(posts, options, |post| async move {
        let insights = get_post_insights(client, &post.id).await?;
        Ok::<_, GraphError>(normalize_post(&post, &insights))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    fn client_for(server: &ServerGuard) -> GraphClient {
        GraphClient::with_base_url(server.url(), "tok", "v21.0").unwrap()
    }

    fn insights_body(impressions: u64, engaged: u64, clicks: u64) -> String {
        serde_json::json!({
            "data": [
                {"name": "post_impressions", "period": "lifetime", "values": [{"value": impressions}]},
                {"name": "post_engaged_users", "period": "lifetime", "values": [{"value": engaged}]},
                {"name": "post_clicks", "period": "lifetime", "values": [{"value": clicks}]},
            ]
        })
        .to_string()
    }

    #[test]
    fn test_classify_post_by_picture() {
        let with_picture = RawPost {
            full_picture: Some("https://scontent.example/p.jpg".to_string()),
            ..RawPost::default()
        };
        assert_eq!(classify_post(&with_picture), ContentType::Image);
        assert_eq!(classify_post(&RawPost::default()), ContentType::Video);
    }

    #[test]
    fn test_normalize_post_defaults_to_zero() {
        let post = RawPost {
            id: "1_2".to_string(),
            ..RawPost::default()
        };
        let item = normalize_post(&post, &Insights::new());

        assert_eq!(item.platform, Platform::Facebook);
        assert_eq!(item.text, PostText::Message(String::new()));
        assert_eq!(item.impressions, 0);
        assert_eq!(item.clicks, 0);
        assert_eq!(item.reach, 0);
        assert_eq!(item.engagement_proxy, Some(0));
    }

    #[test]
    fn test_normalize_post_truncates_message() {
        let post = RawPost {
            id: "1_2".to_string(),
            message: Some("x".repeat(450)),
            ..RawPost::default()
        };
        let item = normalize_post(&post, &Insights::new());
        assert_eq!(item.text.as_str().chars().count(), 200);
    }

    #[tokio::test]
    async fn test_list_posts_requests_fields_and_limit() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v21.0/42/posts")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("fields".into(), POST_FIELDS.into()),
                Matcher::UrlEncoded("limit".into(), "10".into()),
                Matcher::UrlEncoded("access_token".into(), "tok".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":[{"id":"42_1","message":"hi","created_time":"2024-01-01T00:00:00+0000"}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let posts = list_posts(&client, "42", 10).await.unwrap();

        mock.assert_async().await;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "42_1");
        assert_eq!(posts[0].message.as_deref(), Some("hi"));
        assert!(posts[0].full_picture.is_none());
    }

    #[tokio::test]
    async fn test_fetch_facebook_content_end_to_end() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v21.0/42/posts")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"data":[
                    {"id":"42_1","message":"first","created_time":"2024-01-02T00:00:00+0000","full_picture":"https://img/1.jpg"},
                    {"id":"42_2","created_time":"2024-01-01T00:00:00+0000"}
                ]}"#,
            )
            .create_async()
            .await;
        let _mock = server
            .mock("GET", "/v21.0/42_1/insights")
            .match_query(Matcher::UrlEncoded("metric".into(), POST_METRICS.into()))
            .with_status(200)
            .with_body(insights_body(100, 8, 3))
            .create_async()
            .await;
        let _mock = server
            .mock("GET", "/v21.0/42_2/insights")
            .match_query(Matcher::UrlEncoded("metric".into(), POST_METRICS.into()))
            .with_status(200)
            .with_body(insights_body(50, 5, 0))
            .create_async()
            .await;

        let client = client_for(&server);
        let items = fetch_facebook_content(&client, "42", 25, &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].post_id, "42_1");
        assert_eq!(items[0].content_type, ContentType::Image);
        assert_eq!(items[0].impressions, 100);
        assert_eq!(items[0].reach, 8);
        assert_eq!(items[0].engagement_proxy, Some(8));
        assert_eq!(items[0].clicks, 3);
        assert_eq!(items[0].likes, 0);
        assert_eq!(items[1].post_id, "42_2");
        assert_eq!(items[1].content_type, ContentType::Video);
        assert_eq!(items[1].impressions, 50);
    }

    #[tokio::test]
    async fn test_fetch_facebook_content_propagates_insight_errors() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v21.0/42/posts")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data":[{"id":"42_1"}]}"#)
            .create_async()
            .await;
        let _mock = server
            .mock("GET", "/v21.0/42_1/insights")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"message":"(#100) The value must be a valid insights metric"}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = fetch_facebook_content(&client, "42", 25, &FetchOptions::sequential())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("valid insights metric"));
    }

    #[test]
    fn test_null_created_time_becomes_empty_posted_at() {
        let list: GraphList<RawPost> = serde_json::from_str(
            r#"{"data":[{"id":"42_1","message":null,"created_time":null}]}"#,
        )
        .unwrap();

        let item = normalize_post(&list.data[0], &Insights::new());
        assert_eq!(item.posted_at, "");
        assert_eq!(item.text, PostText::Message(String::new()));
    }

    #[tokio::test]
    async fn test_fetch_facebook_content_stops_after_first_insight_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v21.0/42/posts")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data":[{"id":"42_1"},{"id":"42_2"},{"id":"42_3"}]}"#)
            .create_async()
            .await;
        let _mock = server
            .mock("GET", "/v21.0/42_1/insights")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"error":{"message":"An unknown error has occurred."}}"#)
            .create_async()
            .await;
        let untouched = server
            .mock("GET", "/v21.0/42_3/insights")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(insights_body(1, 1, 1))
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = fetch_facebook_content(&client, "42", 25, &FetchOptions::sequential())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        untouched.assert_async().await;
    }
}
