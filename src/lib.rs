//! Fetch Facebook Page and linked Instagram Business content stats from the
//! Meta Graph API and reshape them for analytics tooling.

pub mod aggregate;
pub mod client;
pub mod config;
pub mod error;
pub mod facebook;
pub mod fetch;
pub mod insights;
pub mod instagram;
pub mod models;
pub mod output;

pub use aggregate::{CampaignAggregate, aggregate, build_campaigns};
pub use client::{DEFAULT_API_VERSION, GRAPH_API_BASE, GraphClient};
pub use config::{Credentials, OutputFormat, OutputMode, Settings, parse_env_file};
pub use error::{GraphError, Result};
pub use facebook::fetch_facebook_content;
pub use fetch::FetchOptions;
pub use instagram::{fetch_instagram_content, resolve_linked_account};
pub use models::{ContentItem, ContentType, Platform, PostText};
pub use output::{render_json, render_text_summary, write_csv};
