use std::sync::OnceLock;

use log::*;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT},
    Client,
    Method,
    RequestBuilder,
    Response,
    StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::WoltConfig,
    data_objects::{OrderDetails, VenueInfo, VenueResponse},
    WoltApiError,
};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.16; rv:84.0) Gecko/20100101 Firefox/84.0";
const GUEST_NAME: &str = "Wolt Bot";

static BOOTSTRAP_SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<script[^>]*\bid\s*=\s*["']bootstrap["'][^>]*>(.*?)</script>"#).unwrap());

/// A guest session in a single Wolt group order.
///
/// Wolt identifies guests by cookie, so every group gets its own client and cookie jar. The group is addressed by
/// the short id found in invitation links until [`WoltGroup::join`] resolves the internal id.
pub struct WoltGroup {
    config: WoltConfig,
    client: Client,
    pretty_id: String,
    id: OnceLock<String>,
}

impl WoltGroup {
    pub fn new(config: WoltConfig, pretty_id: &str) -> Result<Self, WoltApiError> {
        let mut headers = HeaderMap::with_capacity(3);
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json;charset=utf-8"));
        let origin =
            HeaderValue::from_str(&config.base_addr).map_err(|e| WoltApiError::Initialization(e.to_string()))?;
        headers.insert(ORIGIN, origin);
        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|e| WoltApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client, pretty_id: pretty_id.to_string(), id: OnceLock::new() })
    }

    pub fn pretty_id(&self) -> &str {
        &self.pretty_id
    }

    /// The internal group id, available once the group has been joined.
    pub fn id(&self) -> Option<&str> {
        self.id.get().map(String::as_str)
    }

    fn joined_id(&self) -> Result<&str, WoltApiError> {
        self.id().ok_or_else(|| WoltApiError::NotJoined(self.pretty_id.clone()))
    }

    pub fn site_url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_addr.trim_end_matches('/'))
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base_addr.trim_end_matches('/'))
    }

    /// Sends the request, retrying on connection failures, 5xx and 429 responses with exponential backoff.
    async fn send(&self, request: RequestBuilder) -> Result<Response, WoltApiError> {
        let mut attempt = 0;
        loop {
            let req = request.try_clone().ok_or_else(|| WoltApiError::Request("request is not cloneable".into()))?;
            let result = req.send().await;
            let retryable = match &result {
                Ok(response) => {
                    let status = response.status();
                    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
                },
                Err(e) => e.is_connect() || e.is_timeout(),
            };
            if !retryable || attempt >= self.config.max_retries {
                let response = result.map_err(|e| WoltApiError::Request(e.to_string()))?;
                return check_status(response).await;
            }
            attempt += 1;
            let delay = self.config.retry_delay(attempt);
            match &result {
                Ok(r) => error!("🛵️ Retrying request for {} after status {} (attempt {attempt})", r.url(), r.status()),
                Err(e) => error!("🛵️ Retrying request after error: {e} (attempt {attempt})"),
            }
            tokio::time::sleep(delay).await;
        }
    }

    async fn query<T: DeserializeOwned>(&self, method: Method, url: String, body: Option<Value>) -> Result<T, WoltApiError> {
        trace!("🛵️ Sending {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = self.send(req).await?;
        response.json::<T>().await.map_err(|e| WoltApiError::Json(e.to_string()))
    }

    /// Joins the group as a guest. The invitation page carries the internal group id in its bootstrap script, which
    /// is then used for the actual join call.
    pub async fn join(&self) -> Result<(), WoltApiError> {
        let url = self.site_url(&format!("/en/group-order/{}/join", self.pretty_id));
        debug!("🛵️ Fetching the invitation page for group {}", self.pretty_id);
        let response = self.send(self.client.get(url)).await?;
        let html = response.text().await.map_err(|e| WoltApiError::Request(e.to_string()))?;
        let id = extract_group_id_from_html(&html)?;
        debug!("🛵️ Group {} has internal id {id}", self.pretty_id);

        let url = self.api_url(&format!("/v1/group_order/guest/join/{id}"));
        let body = serde_json::json!({ "first_name": GUEST_NAME });
        let req = self.client.post(url).header(REFERER, self.config.base_addr.as_str()).json(&body);
        self.send(req).await?;
        let _ = self.id.set(id);
        info!("🛵️ Joined group {}", self.pretty_id);
        Ok(())
    }

    pub async fn details(&self) -> Result<OrderDetails, WoltApiError> {
        let url = self.api_url(&format!("/v1/group_order/guest/{}/participants/me", self.joined_id()?));
        let body = serde_json::json!({ "subscribed": false });
        self.query::<OrderDetails>(Method::PATCH, url, Some(body)).await
    }

    pub async fn mark_as_ready(&self) -> Result<(), WoltApiError> {
        let url = self.api_url(&format!("/v1/group_order/guest/{}/participants/me", self.joined_id()?));
        let body = serde_json::json!({ "status": "ready" });
        let req = self.client.request(Method::PATCH, url).json(&body);
        self.send(req).await?;
        info!("🛵️ Marked myself as ready in group {}", self.pretty_id);
        Ok(())
    }

    pub async fn venue(&self, venue_id: &str) -> Result<VenueInfo, WoltApiError> {
        let url = self.api_url(&format!("/v3/venues/{venue_id}"));
        let response = self.query::<VenueResponse>(Method::GET, url, None).await?;
        response.results.into_iter().next().ok_or_else(|| WoltApiError::VenueNotFound(venue_id.to_string()))
    }
}

async fn check_status(response: Response) -> Result<Response, WoltApiError> {
    if response.status().is_success() {
        trace!("🛵️ Request successful. {}", response.status());
        Ok(response)
    } else {
        let status = response.status().as_u16();
        let message = response.text().await.map_err(|e| WoltApiError::Request(e.to_string()))?;
        Err(WoltApiError::Status { status, message })
    }
}

/// Pulls the internal group id out of the invitation page. The bootstrap script holds URL-encoded JSON with the id at
/// `groupOrder.order.confirmedState.id`.
pub fn extract_group_id_from_html(html: &str) -> Result<String, WoltApiError> {
    let script = BOOTSTRAP_SCRIPT
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .ok_or(WoltApiError::BootstrapNotFound)?;
    let unescaped = script.replace('+', " ");
    let decoded = percent_decode_str(&unescaped)
        .decode_utf8()
        .map_err(|e| WoltApiError::InvalidBootstrap(e.to_string()))?;
    let json: Value = serde_json::from_str(&decoded).map_err(|e| WoltApiError::InvalidBootstrap(e.to_string()))?;
    json["groupOrder"]["order"]["confirmedState"]["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| WoltApiError::InvalidBootstrap("group id not found".into()))
}
