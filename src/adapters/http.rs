use crate::config::adapter::AdapterConfig;
use crate::utils::error::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;

pub const ACCEPT_HEADER: &str = "application/json, text/html, */*";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
    Post,
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub json_body: Option<serde_json::Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post_json(body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            json_body: Some(body),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// reqwest client preconfigured with the adapter's timeout and identity headers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &AdapterConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// 單次請求；非 2xx 狀態碼一律轉成錯誤
    pub async fn send(&self, url: &str, options: &RequestOptions) -> Result<String> {
        let mut request = match options.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.json_body {
            request = request.json(body);
        }

        let response = request.send().await?;
        tracing::debug!("{:?} {} -> {}", options.method, url, response.status());

        let body = response.error_for_status()?.text().await?;
        Ok(body)
    }
}
