//! Instagram Graph API carousel client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{build_caption, carousel_urls, SocialPublisher};
use crate::config::{keys, Credentials, PipelineSettings};
use crate::core::{DayKey, Item};
use crate::errors::{DealflowError, Result};
use crate::publish::PagesHost;

const GRAPH_URL: &str = "https://graph.facebook.com";

#[derive(Debug, Deserialize)]
struct GraphError {
    message: Option<String>,
}

/// Either an object id or an error envelope.
#[derive(Debug, Deserialize)]
struct GraphResponse {
    id: Option<String>,
    error: Option<GraphError>,
}

impl GraphResponse {
    fn into_id(self, step: &str) -> Result<String> {
        match self.id {
            Some(id) => Ok(id),
            None => {
                let reason = self
                    .error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "response carried no id".to_string());
                Err(DealflowError::api("Instagram", format!("{step}: {reason}")))
            }
        }
    }
}

/// Publishes carousels through the Graph API.
#[derive(Clone)]
pub struct InstagramPublisher {
    client: reqwest::Client,
    api_base: String,
    page_id: String,
    access_token: String,
    host: PagesHost,
    carousel_item_limit: usize,
}

impl std::fmt::Debug for InstagramPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstagramPublisher")
            .field("api_base", &self.api_base)
            .field("page_id", &self.page_id)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl InstagramPublisher {
    /// Creates a publisher from credentials; github id, page id and token
    /// are all required.
    pub fn from_config(
        client: reqwest::Client,
        credentials: &Credentials,
        settings: &PipelineSettings,
    ) -> Result<Self> {
        let host_id = Credentials::require(&credentials.github_id, keys::GITHUB_ID)?;
        let page_id = Credentials::require(&credentials.insta_page_id, keys::INSTA_PAGE_ID)?;
        let token = Credentials::require(&credentials.insta_access_token, keys::INSTA_ACCESS_TOKEN)?;

        Ok(Self {
            client,
            api_base: format!("{GRAPH_URL}/{}", settings.graph_api_version),
            page_id: page_id.to_string(),
            access_token: token.to_string(),
            host: PagesHost::new(host_id),
            carousel_item_limit: settings.carousel_item_limit,
        })
    }

    /// Points the client at another API base (including the version segment).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn post(&self, endpoint: &str, form: &[(&str, &str)], step: &str) -> Result<String> {
        let url = format!("{}/{}/{endpoint}", self.api_base, self.page_id);
        let mut fields = form.to_vec();
        fields.push(("access_token", self.access_token.as_str()));

        let response: GraphResponse = self.client.post(url).form(&fields).send().await?.json().await?;
        response.into_id(step)
    }

    async fn create_child(&self, image_url: &str) -> Result<String> {
        let id = self
            .post(
                "media",
                &[("image_url", image_url), ("is_carousel_item", "true")],
                "carousel item upload",
            )
            .await?;
        debug!(image_url, container = %id, "Carousel item container created");
        Ok(id)
    }
}

#[async_trait]
impl SocialPublisher for InstagramPublisher {
    async fn publish(&self, items: &[Item]) -> Result<String> {
        let first = items.first().ok_or(DealflowError::EmptyInput)?;
        let day = DayKey::parse(first.date.clone())?;

        let urls = carousel_urls(&self.host, &day, items, self.carousel_item_limit);
        info!(images = urls.len(), "Uploading carousel items");

        let mut children = Vec::with_capacity(urls.len());
        for url in &urls {
            children.push(self.create_child(url).await?);
        }

        let caption = build_caption(&day, items);
        let children = children.join(",");
        let carousel = self
            .post(
                "media",
                &[
                    ("media_type", "CAROUSEL"),
                    ("children", children.as_str()),
                    ("caption", caption.as_str()),
                ],
                "carousel container",
            )
            .await?;

        let post_id = self
            .post(
                "media_publish",
                &[("creation_id", carousel.as_str())],
                "carousel publish",
            )
            .await?;
        info!(%post_id, "Carousel published");
        Ok(post_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_credentials() -> Credentials {
        Credentials {
            github_id: Some("octo".into()),
            insta_page_id: Some("1789".into()),
            insta_access_token: Some("token".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_graph_response_error_message() {
        let response: GraphResponse = serde_json::from_value(json!({
            "error": {"message": "Only photo or video can be accepted as media type."}
        }))
        .unwrap();

        let err = response.into_id("carousel item upload").unwrap_err();
        assert!(err.to_string().contains("Only photo or video"));
        assert!(err.to_string().contains("carousel item upload"));
    }

    #[test]
    fn test_graph_response_id() {
        let response: GraphResponse = serde_json::from_value(json!({"id": "178"})).unwrap();
        assert_eq!(response.into_id("x").unwrap(), "178");
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let mut creds = full_credentials();
        creds.insta_access_token = None;
        let err = InstagramPublisher::from_config(
            reqwest::Client::new(),
            &creds,
            &PipelineSettings::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("INSTA_ACCESS_TOKEN"));
    }

    #[test]
    fn test_api_base_uses_version() {
        let publisher = InstagramPublisher::from_config(
            reqwest::Client::new(),
            &full_credentials(),
            &PipelineSettings::default(),
        )
        .unwrap();
        assert_eq!(publisher.api_base, "https://graph.facebook.com/v19.0");
        assert!(!format!("{publisher:?}").contains("token"));
    }

    #[tokio::test]
    async fn test_unreachable_api_fails() {
        let publisher = InstagramPublisher::from_config(
            reqwest::Client::new(),
            &full_credentials(),
            &PipelineSettings::default(),
        )
        .unwrap()
        .with_api_base("http://127.0.0.1:9/v19.0");

        let items = crate::testing::fixtures::items_for_day("20250115", 2);
        assert!(publisher.publish(&items).await.is_err());
    }
}
