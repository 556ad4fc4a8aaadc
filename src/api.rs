use anyhow::{Context, Result, anyhow};
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::constants::constants;
use crate::controller::VideoSource;
use crate::filters::QueryParams;
use crate::models::{BatchOutcome, FilterOptions, NewVideo, VideoDetail, VideoSummary};

/// HTTP client for the catalog API.
///
/// When an admin key is configured it is attached to every outgoing request,
/// read-only ones included.
#[derive(Debug, Clone)]
pub struct ApiClient {
  http: Client,
  base_url: String,
}

impl ApiClient {
  pub fn new(base_url: &str, admin_key: Option<&str>) -> Result<Self> {
    let http = client_builder(admin_key)?.build().context("Failed to build HTTP client")?;
    Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  /// `/videos/{id}` with the id encoded as a single path segment.
  fn video_url(&self, video_id: &str) -> Result<Url> {
    if matches!(video_id, "" | "." | "..") {
      return Err(anyhow!("Invalid video id '{}'", video_id));
    }
    let mut url = Url::parse(&self.url("/videos/")).with_context(|| format!("Invalid API URL {}", self.base_url))?;
    url
      .path_segments_mut()
      .map_err(|_| anyhow!("API URL {} cannot carry a path", self.base_url))?
      .pop_if_empty()
      .push(video_id);
    Ok(url)
  }

  /// `GET /videos/` with the given facet constraints.
  pub async fn list_videos(&self, query: &QueryParams) -> Result<Vec<VideoSummary>> {
    debug!(?query, "api: listing videos");
    let req = self.http.get(self.url("/videos/")).query(query);
    send_json(req, "list videos").await
  }

  /// `GET /videos/filters`.
  pub async fn filter_options(&self) -> Result<FilterOptions> {
    send_json(self.http.get(self.url("/videos/filters")), "load filter options").await
  }

  /// `GET /videos/{id}`.
  pub async fn video(&self, video_id: &str) -> Result<VideoDetail> {
    let resp = self
      .http
      .get(self.video_url(video_id)?)
      .send()
      .await
      .with_context(|| format!("Failed to reach catalog for video {}", video_id))?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Err(anyhow!("Video {} not found", video_id));
    }
    decode(resp, "load video").await
  }

  /// `POST /videos/`.
  pub async fn create_video(&self, video: &NewVideo) -> Result<VideoSummary> {
    send_json(self.http.post(self.url("/videos/")).json(video), "create video").await
  }

  /// `POST /videos/batch/`.
  pub async fn create_batch(&self, videos: &[NewVideo]) -> Result<BatchOutcome> {
    send_json(self.http.post(self.url("/videos/batch/")).json(videos), "upload batch").await
  }

  /// `DELETE /videos/{id}`.
  pub async fn delete_video(&self, video_id: &str) -> Result<()> {
    let resp = self
      .http
      .delete(self.video_url(video_id)?)
      .send()
      .await
      .with_context(|| format!("Failed to reach catalog to delete {}", video_id))?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Err(anyhow!("Video {} not found", video_id));
    }
    check_status(resp, "delete video").await?;
    Ok(())
  }
}

/// Client settings shared by every request: admin header and timeout.
fn client_builder(admin_key: Option<&str>) -> Result<ClientBuilder> {
  let mut headers = HeaderMap::new();
  if let Some(key) = admin_key {
    let name = HeaderName::from_bytes(constants().admin_key_header.as_bytes()).context("Invalid admin header name")?;
    let mut value = HeaderValue::from_str(key).context("Admin key contains characters not allowed in a header")?;
    value.set_sensitive(true);
    headers.insert(name, value);
  }
  Ok(Client::builder().default_headers(headers).timeout(Duration::from_secs(constants().http_timeout_secs)))
}

impl VideoSource for ApiClient {
  fn list_videos(&self, query: QueryParams) -> BoxFuture<'static, Result<Vec<VideoSummary>>> {
    let client = self.clone();
    async move { ApiClient::list_videos(&client, &query).await }.boxed()
  }

  fn filter_options(&self) -> BoxFuture<'static, Result<FilterOptions>> {
    let client = self.clone();
    async move { ApiClient::filter_options(&client).await }.boxed()
  }
}

async fn send_json<T: DeserializeOwned>(req: RequestBuilder, what: &str) -> Result<T> {
  let resp = req.send().await.with_context(|| format!("Failed to {}: catalog unreachable", what))?;
  decode(resp, what).await
}

async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
  let resp = check_status(resp, what).await?;
  resp.json::<T>().await.with_context(|| format!("Failed to {}: unexpected response body", what))
}

/// Turn a non-2xx response into an error carrying the server's `detail`
/// message when it sends one.
async fn check_status(resp: Response, what: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  let detail = server_detail(&body).unwrap_or_else(|| body.trim().chars().take(200).collect());
  match status {
    StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
      Err(anyhow!("Failed to {}: admin key rejected ({})", what, detail))
    }
    StatusCode::TOO_MANY_REQUESTS => Err(anyhow!("Failed to {}: rate limited, try again later", what)),
    _ if detail.is_empty() => Err(anyhow!("Failed to {}: HTTP {}", what, status)),
    _ => Err(anyhow!("Failed to {}: HTTP {}: {}", what, status, detail)),
  }
}

/// FastAPI-style `{"detail": "..."}` error bodies.
fn server_detail(body: &str) -> Option<String> {
  let value: serde_json::Value = serde_json::from_str(body).ok()?;
  match value.get("detail")? {
    serde_json::Value::String(s) => Some(s.clone()),
    other => Some(other.to_string()),
  }
}
