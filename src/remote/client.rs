//! HTTP client for the platform's listing API, item pages and short links

use super::media::HttpMediaDownloader;
use super::signer::UnsignedRequests;
use super::traits::{DetailSource, ProfileResolver, RequestSigner, Session, SessionFactory};
use crate::config::{Config, RequestConfig};
use crate::error::{Error, Result};
use crate::types::SessionOptions;
use crate::walker::{ListingSource, PageRequest};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{COOKIE, LOCATION, ORIGIN, REFERER};
use reqwest::redirect::Policy;
use serde_json::Value;
use std::sync::Arc;

const PROFILE_PATTERN: &str = r"(?:https?://)?(?:www\.)?xiaohongshu\.com/user/profile/([a-zA-Z0-9]+)";
const SHORT_LINK_PATTERN: &str =
    r#"(?:https?://)?xhslink\.com/[^\s"<>\\^`{|}，。；！？、【】《》]+"#;

/// Compiled link patterns, shared by every session
#[derive(Debug)]
pub struct LinkPatterns {
    profile: Regex,
    short: Regex,
}

impl LinkPatterns {
    /// Compile the profile and short-link patterns
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::Other(format!("invalid link pattern: {e}")))
        };
        Ok(Self {
            profile: compile(PROFILE_PATTERN)?,
            short: compile(SHORT_LINK_PATTERN)?,
        })
    }

    /// Publisher id embedded in a profile link
    pub fn profile_id(&self, text: &str) -> Option<String> {
        self.profile
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// First short link in `text`, with a scheme
    pub fn short_link(&self, text: &str) -> Option<String> {
        let found = self.short.find(text)?.as_str();
        if found.starts_with("http://") || found.starts_with("https://") {
            Some(found.to_string())
        } else {
            Some(format!("https://{found}"))
        }
    }
}

/// Platform client bound to one cookie/proxy combination
pub struct XhsClient {
    http: reqwest::Client,
    no_redirect: reqwest::Client,
    cookie: Option<String>,
    api_base_url: String,
    web_base_url: String,
    signer: Arc<dyn RequestSigner>,
    patterns: Arc<LinkPatterns>,
}

impl XhsClient {
    /// Build a client for `options`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a proxy reqwest refuses.
    pub fn new(
        request: &RequestConfig,
        options: &SessionOptions,
        signer: Arc<dyn RequestSigner>,
        patterns: Arc<LinkPatterns>,
    ) -> Result<Self> {
        Ok(Self {
            http: build_http_client(request, options, Policy::default())?,
            no_redirect: build_http_client(request, options, Policy::none())?,
            cookie: options.cookie.clone(),
            api_base_url: request.api_base_url.trim_end_matches('/').to_string(),
            web_base_url: request.web_base_url.trim_end_matches('/').to_string(),
            signer,
            patterns,
        })
    }

    /// The underlying HTTP client (shares proxy and timeout settings)
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Follow one redirect from a short link and extract the publisher id it points to
    pub async fn resolve_short_link(&self, short_link: &str) -> Result<Option<String>> {
        let response = self.no_redirect.get(short_link).send().await?;
        let status = response.status();

        let target = if status.is_redirection() {
            response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        } else if status.is_success() {
            Some(response.url().to_string())
        } else {
            return Err(Error::RemoteStatus {
                status: status.as_u16(),
                url: short_link.to_string(),
            });
        };

        tracing::debug!(short_link, target = ?target, "Short link resolved");
        Ok(target.and_then(|t| self.patterns.profile_id(&t)))
    }

    fn with_session_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header(ORIGIN, self.web_base_url.as_str())
            .header(REFERER, format!("{}/", self.web_base_url));
        match &self.cookie {
            Some(cookie) => request.header(COOKIE, cookie.as_str()),
            None => request,
        }
    }
}

#[async_trait]
impl ListingSource for XhsClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Value> {
        let url = format!("{}{}", self.api_base_url, request.mode.endpoint());
        let query = [
            ("num", request.page_size.to_string()),
            ("cursor", request.cursor.clone()),
            ("user_id", request.subject_id.clone()),
        ];
        let signature = self.signer.sign(&url, &query, self.cookie.as_deref())?;

        let response = self
            .with_session_headers(self.http.get(&url).query(&query))
            .headers(signature)
            .send()
            .await?;
        let response = check_status(response)?;

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl DetailSource for XhsClient {
    async fn fetch_detail(&self, link: &str) -> Result<String> {
        let response = self.with_session_headers(self.http.get(link)).send().await?;
        let response = check_status(response)?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ProfileResolver for XhsClient {
    async fn resolve(&self, profile_url: &str) -> Result<String> {
        let text = profile_url.trim();
        if text.is_empty() {
            return Err(Error::Resolution("profile link is empty".into()));
        }

        if let Some(id) = self.patterns.profile_id(text) {
            return Ok(id);
        }

        if let Some(short) = self.patterns.short_link(text) {
            let resolved = self
                .resolve_short_link(&short)
                .await
                .map_err(|e| Error::Resolution(format!("could not follow {short}: {e}")))?;
            if let Some(id) = resolved {
                return Ok(id);
            }
        }

        Err(Error::Resolution(format!(
            "no publisher id found in '{text}'"
        )))
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::RemoteStatus {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

fn build_http_client(
    request: &RequestConfig,
    options: &SessionOptions,
    redirect: Policy,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(request.timeout)
        .user_agent(request.user_agent.as_str())
        .redirect(redirect);

    if let Some(proxy) = &options.proxy {
        let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(|e| Error::Config {
            message: format!("invalid proxy '{proxy}': {e}"),
            key: Some("proxy".into()),
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))
}

/// Default [`SessionFactory`]: one [`XhsClient`] plus an [`HttpMediaDownloader`] per task
pub struct HttpSessionFactory {
    config: Arc<Config>,
    signer: Arc<dyn RequestSigner>,
    patterns: Arc<LinkPatterns>,
}

impl HttpSessionFactory {
    /// Factory that sends unsigned listing requests
    pub fn new(config: Arc<Config>) -> Result<Self> {
        Self::with_signer(config, Arc::new(UnsignedRequests))
    }

    /// Factory that signs listing requests with `signer`
    pub fn with_signer(config: Arc<Config>, signer: Arc<dyn RequestSigner>) -> Result<Self> {
        Ok(Self {
            config,
            signer,
            patterns: Arc::new(LinkPatterns::new()?),
        })
    }
}

impl SessionFactory for HttpSessionFactory {
    fn open(&self, options: &SessionOptions) -> Result<Session> {
        let client = Arc::new(XhsClient::new(
            &self.config.request,
            options,
            self.signer.clone(),
            self.patterns.clone(),
        )?);
        let media = Arc::new(HttpMediaDownloader::new(
            client.http().clone(),
            &self.config.download,
            &self.config.retry,
        ));

        Ok(Session {
            listing: client.clone(),
            detail: client.clone(),
            resolver: client,
            media,
        })
    }
}
