//! Affiliate gateway client: today's deal list plus deep-link shortening.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::signing::authorization_header;
use super::FeedSource;
use crate::config::{keys, Credentials};
use crate::core::{DayKey, Item};
use crate::errors::{DealflowError, Result};
use crate::utils::signed_date;

/// Production gateway.
pub const GATEWAY_URL: &str = "https://api-gateway.coupang.com";

const GOLDBOX_PATH: &str = "/v2/providers/affiliate_open_api/apis/openapi/v1/products/goldbox";
const DEEPLINK_PATH: &str = "/v2/providers/affiliate_open_api/apis/openapi/v1/deeplink";

/// Drops the `&itemId=` suffix (and everything after it) from a product URL.
///
/// Tracking parameters before it, such as `pageKey`, are kept.
#[must_use]
pub fn clean_product_url(url: &str) -> &str {
    url.split_once("&itemId=").map_or(url, |(head, _)| head)
}

/// A product as returned by the deal endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProduct {
    product_name: String,
    product_image: String,
    product_url: String,
    #[serde(default)]
    product_price: Option<Value>,
    #[serde(default)]
    sale_price: Option<Value>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    original_price: Option<Value>,
}

impl RawProduct {
    /// First positive price among the known price fields.
    fn price(&self) -> u64 {
        [
            &self.product_price,
            &self.sale_price,
            &self.price,
            &self.original_price,
        ]
        .into_iter()
        .filter_map(|v| v.as_ref().and_then(price_value))
        .find(|p| *p > 0)
        .unwrap_or(0)
    }
}

fn price_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.replace(',', "").trim().parse::<f64>().ok().map(|f| f as u64),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct DealResponse {
    #[serde(default)]
    data: Vec<RawProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeepLink {
    shorten_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeepLinkResponse {
    #[serde(rename = "rCode")]
    r_code: Option<String>,
    #[serde(default)]
    data: Vec<DeepLink>,
}

/// Client for the affiliate open API.
#[derive(Clone)]
pub struct CoupangFeed {
    client: reqwest::Client,
    base_url: String,
    access_key: String,
    secret_key: String,
    day: Option<DayKey>,
}

impl std::fmt::Debug for CoupangFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoupangFeed")
            .field("base_url", &self.base_url)
            .field("day", &self.day)
            .finish_non_exhaustive()
    }
}

impl CoupangFeed {
    /// Creates a client against the production gateway.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: GATEWAY_URL.to_string(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            day: None,
        }
    }

    /// Creates a client from loaded credentials; both keys are required.
    pub fn from_credentials(client: reqwest::Client, credentials: &Credentials) -> Result<Self> {
        let access = Credentials::require(&credentials.coupang_access_key, keys::COUPANG_ACCESS_KEY)?;
        let secret = Credentials::require(&credentials.coupang_secret_key, keys::COUPANG_SECRET_KEY)?;
        Ok(Self::new(client, access, secret))
    }

    /// Points the client at another gateway.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Pins the day stamped on collected items instead of today.
    #[must_use]
    pub fn with_day(mut self, day: DayKey) -> Self {
        self.day = Some(day);
        self
    }

    async fn call(&self, method: Method, path_with_query: &str, body: Option<&Value>) -> Result<Value> {
        let authorization = authorization_header(
            &self.access_key,
            &self.secret_key,
            &signed_date(),
            method.as_str(),
            path_with_query,
        )?;

        let mut request = self
            .client
            .request(method, format!("{}{path_with_query}", self.base_url))
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(reqwest::header::CONTENT_TYPE, "application/json;charset=UTF-8");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DealflowError::api("Coupang", format!("{status}: {text}")));
        }
        Ok(response.json().await?)
    }

    /// Shortens a product URL into a tracked deep link.
    ///
    /// Any failure falls back to the input URL; shortening never fails a run.
    pub async fn shorten(&self, url: &str) -> String {
        let body = json!({ "coupangUrls": [url] });
        let response = match self.call(Method::POST, DEEPLINK_PATH, Some(&body)).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Deep link request failed, keeping product URL");
                return url.to_string();
            }
        };

        match serde_json::from_value::<DeepLinkResponse>(response) {
            Ok(DeepLinkResponse { r_code: Some(code), data }) if code == "0" => data
                .into_iter()
                .next()
                .and_then(|d| d.shorten_url)
                .unwrap_or_else(|| url.to_string()),
            Ok(other) => {
                warn!(r_code = ?other.r_code, "Deep link rejected, keeping product URL");
                url.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Unexpected deep link payload, keeping product URL");
                url.to_string()
            }
        }
    }
}

#[async_trait]
impl FeedSource for CoupangFeed {
    async fn collect(&self, limit: usize) -> Result<Vec<Item>> {
        let day = self.day.clone().unwrap_or_else(DayKey::today);
        info!(%day, limit, "Collecting deal items");

        let path = format!("{GOLDBOX_PATH}?limit={limit}");
        let response: DealResponse = serde_json::from_value(self.call(Method::GET, &path, None).await?)?;
        debug!(found = response.data.len(), "Deal products received");

        let mut items = Vec::with_capacity(response.data.len().min(limit));
        for (product, rank) in response.data.into_iter().take(limit).zip(1u32..) {
            let cleaned = clean_product_url(&product.product_url);
            let link = self.shorten(cleaned).await;
            if rank == 1 {
                debug!(raw = %product.product_url, cleaned, %link, "First product link conversion");
            }
            items.push(Item::new(
                &day,
                rank,
                product.product_name.clone(),
                product.price(),
                product.product_image.clone(),
                link,
            ));
        }

        info!(count = items.len(), "Deal items collected");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(value: Value) -> RawProduct {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_clean_product_url() {
        let url = "https://link.coupang.com/re/AFF?lptag=AF1&pageKey=123&itemId=456&vendorItemId=789";
        assert_eq!(
            clean_product_url(url),
            "https://link.coupang.com/re/AFF?lptag=AF1&pageKey=123"
        );
        assert_eq!(clean_product_url("https://x/y?a=1"), "https://x/y?a=1");
    }

    #[test]
    fn test_price_fallback_order() {
        let p = raw(json!({
            "productName": "A", "productImage": "i", "productUrl": "u",
            "productPrice": 0, "salePrice": 15900, "price": 17000
        }));
        assert_eq!(p.price(), 15900);

        let p = raw(json!({
            "productName": "A", "productImage": "i", "productUrl": "u",
            "originalPrice": "21,000"
        }));
        assert_eq!(p.price(), 21000);

        let p = raw(json!({"productName": "A", "productImage": "i", "productUrl": "u"}));
        assert_eq!(p.price(), 0);
    }

    #[test]
    fn test_float_price_is_truncated() {
        assert_eq!(price_value(&json!(12900.0)), Some(12900));
        assert_eq!(price_value(&json!(-5.0)), None);
    }

    #[test]
    fn test_deal_response_tolerates_missing_data() {
        let parsed: DealResponse = serde_json::from_value(json!({"rCode": "0"})).unwrap();
        assert!(parsed.data.is_empty());
    }

    #[test]
    fn test_from_credentials_requires_both_keys() {
        let creds = Credentials {
            coupang_access_key: Some("ak".into()),
            ..Default::default()
        };
        let err = CoupangFeed::from_credentials(reqwest::Client::new(), &creds).unwrap_err();
        assert!(err.to_string().contains("COUPANG_SECRET_KEY"));
    }

    #[tokio::test]
    async fn test_shorten_falls_back_when_gateway_unreachable() {
        let feed = CoupangFeed::new(reqwest::Client::new(), "ak", "sk")
            .with_base_url("http://127.0.0.1:9");
        assert_eq!(feed.shorten("https://x/p?a=1").await, "https://x/p?a=1");
    }

    #[tokio::test]
    async fn test_collect_fails_loudly_on_transport_error() {
        let feed = CoupangFeed::new(reqwest::Client::new(), "ak", "sk")
            .with_base_url("http://127.0.0.1:9")
            .with_day(DayKey::parse("20250115").unwrap());
        assert!(feed.collect(10).await.is_err());
    }
}
