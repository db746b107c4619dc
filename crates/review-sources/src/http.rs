use crate::error::{BlockReason, HttpError};
use crate::policy::{RandomizedPolicy, RequestPolicy};
use reqwest::header::USER_AGENT;
use reqwest::{Client, Method};
use review_config::HttpConfig;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// A request description, independent of the underlying client
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    form: Option<Vec<(String, String)>>,
    headers: Vec<(String, String)>,
    expect_json: bool,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
            form: None,
            headers: Vec::new(),
            expect_json: false,
        }
    }

    pub fn post_form(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::POST,
            form: Some(form),
            ..Self::get(url)
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// An HTML body in the response is then treated as a block
    pub fn expect_json(mut self) -> Self {
        self.expect_json = true;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub url: String, // Final URL after redirects
    pub body: String,
}

impl HttpResponse {
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Success,
    Transient,
    Blocked(BlockReason),
}

/// Classify a completed response. Blocks win over everything else.
pub fn classify_response(status: u16, body: &str, expect_json: bool, block_markers: &[String]) -> Classification {
    if status == 403 || status == 429 {
        return Classification::Blocked(BlockReason::Status(status));
    }

    let lowered = body.to_lowercase();
    for marker in block_markers {
        let marker = marker.trim().to_lowercase();
        if !marker.is_empty() && lowered.contains(&marker) {
            return Classification::Blocked(BlockReason::Marker(marker));
        }
    }

    if !(200..300).contains(&status) {
        return Classification::Transient;
    }

    if expect_json && looks_like_html(body) {
        return Classification::Blocked(BlockReason::UnexpectedHtml);
    }

    Classification::Success
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(15).collect::<String>().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// `Accept-Language` value for a storefront country, English as the fallback
pub fn accept_language(country: &str) -> String {
    let country = country.trim().to_lowercase();
    let language = match country.as_str() {
        "ru" | "by" | "kz" | "kg" => "ru",
        "ua" => "uk",
        "de" | "at" => "de",
        "fr" => "fr",
        "es" | "mx" | "ar" | "cl" | "co" => "es",
        "it" => "it",
        "br" | "pt" => "pt",
        "jp" => "ja",
        "kr" => "ko",
        "cn" | "tw" | "hk" => "zh",
        "tr" => "tr",
        "pl" => "pl",
        "nl" => "nl",
        _ => "en",
    };

    if country.len() != 2 {
        return "en-US,en;q=0.9".to_string();
    }
    let region = country.to_uppercase();
    if language == "en" {
        format!("en-{},en;q=0.9", region)
    } else {
        format!("{}-{},{};q=0.9,en;q=0.8", language, region, language)
    }
}

/// HTTP wrapper shared by all fetchers: rotating identity, throttling,
/// retries on transient failures and block classification.
pub struct ReviewHttpClient {
    client: Client,
    policy: Arc<dyn RequestPolicy>,
    max_attempts: u32,
    block_markers: Vec<String>,
}

impl ReviewHttpClient {
    pub fn new(config: &HttpConfig, policy: Arc<dyn RequestPolicy>) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            policy,
            max_attempts: config.max_attempts.max(1),
            block_markers: config.block_markers.clone(),
        })
    }

    /// Client with the randomized user-agent pool and jitter from `config`
    pub fn from_config(config: &HttpConfig) -> Result<Self, HttpError> {
        Self::new(config, Arc::new(RandomizedPolicy::from_config(config)))
    }

    /// Send with up to `max_attempts` attempts. Blocks are returned at once.
    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            sleep(self.policy.pause()).await;

            match self.send_once(request).await {
                Ok(response) => {
                    match classify_response(response.status, &response.body, request.expect_json, &self.block_markers) {
                        Classification::Success => return Ok(response),
                        Classification::Blocked(reason) => {
                            warn!(url = %request.url, status = response.status, reason = %reason, "Response classified as blocked");
                            return Err(HttpError::Blocked(reason));
                        }
                        Classification::Transient => {
                            last_error = format!("HTTP status {}", response.status);
                        }
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            debug!(
                url = %request.url,
                attempt = attempt,
                max_attempts = self.max_attempts,
                error = %last_error,
                "Request attempt failed"
            );
        }

        Err(HttpError::Exhausted {
            url: request.url.clone(),
            attempts: self.max_attempts,
            last_error,
        })
    }

    async fn send_once(&self, request: &HttpRequest) -> Result<HttpResponse, reqwest::Error> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .header(USER_AGENT, self.policy.user_agent());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await?;

        Ok(HttpResponse { status, url, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FixedPolicy;
    use mockito::Matcher;

    fn markers() -> Vec<String> {
        review_config::config::default_block_markers()
    }

    fn test_client() -> ReviewHttpClient {
        ReviewHttpClient::new(&HttpConfig::default(), Arc::new(FixedPolicy::immediate())).unwrap()
    }

    #[test]
    fn test_classify_status_codes() {
        assert_eq!(classify_response(200, "{}", true, &markers()), Classification::Success);
        assert_eq!(
            classify_response(429, "", false, &markers()),
            Classification::Blocked(BlockReason::Status(429))
        );
        assert_eq!(
            classify_response(403, "", false, &markers()),
            Classification::Blocked(BlockReason::Status(403))
        );
        assert_eq!(classify_response(500, "oops", false, &markers()), Classification::Transient);
        assert_eq!(classify_response(404, "", false, &markers()), Classification::Transient);
    }

    #[test]
    fn test_accept_language_follows_country() {
        assert_eq!(accept_language("ru"), "ru-RU,ru;q=0.9,en;q=0.8");
        assert_eq!(accept_language("US"), "en-US,en;q=0.9");
        assert_eq!(accept_language("gb"), "en-GB,en;q=0.9");
        assert_eq!(accept_language("jp"), "ja-JP,ja;q=0.9,en;q=0.8");
        assert_eq!(accept_language(""), "en-US,en;q=0.9");
    }

    #[tokio::test]
    async fn test_request_headers_are_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/headers")
            .match_header("accept-language", "en-US,en;q=0.9")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let request = HttpRequest::get(format!("{}/headers", server.url())).header("Accept-Language", accept_language("us"));
        let response = test_client().send(&request).await.unwrap();

        assert_eq!(response.body, "ok");
        mock.assert_async().await;
    }

    #[test]
    fn test_classify_markers_case_insensitive() {
        let body = "<html><body>Please solve the CAPTCHA to continue</body></html>";
        assert_eq!(
            classify_response(200, body, false, &markers()),
            Classification::Blocked(BlockReason::Marker("captcha".to_string()))
        );

        let body = "Подтвердите, что вы НЕ РОБОТ";
        assert!(matches!(
            classify_response(200, body, false, &markers()),
            Classification::Blocked(BlockReason::Marker(_))
        ));
    }

    #[test]
    fn test_classify_html_where_json_expected() {
        let body = "  <!DOCTYPE html><html><head></head></html>";
        assert_eq!(
            classify_response(200, body, true, &markers()),
            Classification::Blocked(BlockReason::UnexpectedHtml)
        );
        assert_eq!(classify_response(200, body, false, &markers()), Classification::Success);
    }

    #[tokio::test]
    async fn test_send_returns_body_and_rotates_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex("^/reviews".to_string()))
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .match_header("user-agent", "reviewscope-test")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;

        let client = test_client();
        let request = HttpRequest::get(format!("{}/reviews", server.url())).query("page", "2");
        let response = client.send(&request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_retries_transient_failures() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = test_client();
        let err = client
            .send(&HttpRequest::get(format!("{}/flaky", server.url())))
            .await
            .unwrap_err();

        assert!(matches!(err, HttpError::Exhausted { attempts: 3, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_does_not_retry_blocks() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/limited")
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let client = test_client();
        let err = client
            .send(&HttpRequest::get(format!("{}/limited", server.url())))
            .await
            .unwrap_err();

        assert!(matches!(err, HttpError::Blocked(BlockReason::Status(429))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_form_sends_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/internal")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("sort".into(), "newest".into()),
            ]))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = test_client();
        let form = vec![
            ("page".to_string(), "1".to_string()),
            ("sort".to_string(), "newest".to_string()),
        ];
        let request = HttpRequest::post_form(format!("{}/internal", server.url()), form).expect_json();
        let response = client.send(&request).await.unwrap();

        assert_eq!(response.body, "[]");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure_is_exhausted_not_panic() {
        let client = test_client();
        // Port 9 (discard) on localhost is closed in test environments
        let err = client
            .send(&HttpRequest::get("http://127.0.0.1:9/unreachable"))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Exhausted { .. }));
    }
}
