use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use openschool_forum::{
    Attachment, BoxFuture, Comment, CommentGateway, GatewayError, Id, NewComment, ProgressFn,
};

/// Client-side request timeout. The upstream contract specifies none; a
/// hung request would otherwise pin the calling node in its loading state
/// forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Attachment bytes are streamed in chunks of this size so upload progress
/// has something to report.
const UPLOAD_CHUNK: usize = 64 * 1024;

/// Connection to an OpenSchool server: base URL plus optional bearer token.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let value = format!("Bearer {token}");
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value).map_err(|e| GatewayError::Network(e.to_string()))?,
            );
        }
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /auth/login` — returns the bearer token to store in the
    /// client context. Credential checking is entirely the server's.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, GatewayError> {
        let url = format!("{}/auth/login", self.base_url);
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(net_err)?;
        if !resp.status().is_success() {
            return Err(api_err(resp).await);
        }
        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        data["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Decode("no access_token in response".into()))
    }
}

/// The production [`CommentGateway`]: forum routes over [`ApiClient`].
pub struct HttpGateway {
    client: ApiClient,
}

impl HttpGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn connect(base_url: &str, token: Option<&str>) -> Result<Self, GatewayError> {
        Ok(Self::new(ApiClient::new(base_url, token)?))
    }
}

impl CommentGateway for HttpGateway {
    fn fetch_post(&self, id: &Id) -> BoxFuture<Result<Comment, GatewayError>> {
        let http = self.client.http.clone();
        let url = format!("{}/forum/posts/{}", self.client.base_url, id);
        Box::pin(get_json(http, url))
    }

    fn list_children(&self, parent_id: &Id) -> BoxFuture<Result<Vec<Comment>, GatewayError>> {
        let http = self.client.http.clone();
        let url = format!("{}/forum/posts/{}/comments", self.client.base_url, parent_id);
        Box::pin(get_json(http, url))
    }

    fn create_comment(
        &self,
        req: NewComment,
        progress: Option<ProgressFn>,
    ) -> BoxFuture<Result<Comment, GatewayError>> {
        let http = self.client.http.clone();
        let url = format!("{}/forum/posts", self.client.base_url);
        Box::pin(async move {
            let total = req.image.as_ref().map_or(0, Attachment::len)
                + req.file.as_ref().map_or(0, Attachment::len);
            let sent = Arc::new(AtomicU64::new(0));

            let mut form = Form::new()
                .text("content", req.content)
                .text("parentId", req.parent_id.into_inner())
                .text("forumId", req.forum_id.into_inner());
            if let Some(image) = req.image {
                form = form.part(
                    "image",
                    upload_part(image, total, Arc::clone(&sent), progress.clone())?,
                );
            }
            if let Some(file) = req.file {
                form = form.part("file", upload_part(file, total, sent, progress.clone())?);
            }

            debug!(%url, total_bytes = total, "POST multipart");
            let resp = http.post(&url).multipart(form).send().await.map_err(net_err)?;
            if !resp.status().is_success() {
                return Err(api_err(resp).await);
            }
            if let Some(p) = &progress {
                p(100);
            }
            resp.json::<Comment>()
                .await
                .map_err(|e| GatewayError::Decode(e.to_string()))
        })
    }

    fn mark_viewed(&self, post_id: &Id) -> BoxFuture<Result<(), GatewayError>> {
        let http = self.client.http.clone();
        let url = format!("{}/forum/posts/{}/viewed", self.client.base_url, post_id);
        Box::pin(async move {
            let resp = http.post(&url).send().await.map_err(net_err)?;
            if !resp.status().is_success() {
                return Err(api_err(resp).await);
            }
            Ok(())
        })
    }
}

async fn get_json<T: DeserializeOwned>(
    http: reqwest::Client,
    url: String,
) -> Result<T, GatewayError> {
    debug!(%url, "GET");
    let resp = http.get(&url).send().await.map_err(net_err)?;
    if !resp.status().is_success() {
        return Err(api_err(resp).await);
    }
    resp.json::<T>()
        .await
        .map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Build a multipart file part whose byte stream drives the progress
/// callback as reqwest pulls chunks onto the wire.
fn upload_part(
    att: Attachment,
    total: u64,
    sent: Arc<AtomicU64>,
    progress: Option<ProgressFn>,
) -> Result<Part, GatewayError> {
    let len = att.len();
    let chunks: Vec<Vec<u8>> = att.data.chunks(UPLOAD_CHUNK).map(<[u8]>::to_vec).collect();
    let counted = chunks.into_iter().map(move |chunk| {
        let done = sent.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
        if let Some(p) = &progress {
            let pct = if total == 0 {
                100
            } else {
                (done.saturating_mul(100) / total).min(100) as u8
            };
            p(pct);
        }
        Ok::<Vec<u8>, std::io::Error>(chunk)
    });
    Part::stream_with_length(Body::wrap_stream(stream::iter(counted)), len)
        .file_name(att.file_name)
        .mime_str(&att.content_type)
        .map_err(|e| GatewayError::Network(e.to_string()))
}

/// Error envelope the API uses for non-success responses:
/// `{"code": "NOT_FOUND", "message": "..."}`. `code` is stable; `message`
/// is display text.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    code: String,
    message: String,
}

fn net_err(e: reqwest::Error) -> GatewayError {
    GatewayError::Network(e.to_string())
}

async fn api_err(resp: reqwest::Response) -> GatewayError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    decode_api_err(status, &text)
}

fn decode_api_err(status: u16, body: &str) -> GatewayError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => GatewayError::Api {
            status,
            code: env.code,
            message: env.message,
        },
        // Not every proxy speaks the envelope; fall back to the raw body.
        Err(_) => GatewayError::Api {
            status,
            code: "INTERNAL".into(),
            message: if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body.to_string()
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_trimmed() {
        let client = ApiClient::new("http://localhost:8080/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn decode_api_err_reads_envelope() {
        let err = decode_api_err(404, r#"{"code":"NOT_FOUND","message":"post '9' not found"}"#);
        match err {
            GatewayError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 404);
                assert_eq!(code, "NOT_FOUND");
                assert_eq!(message, "post '9' not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decode_api_err_falls_back_to_raw_body() {
        let err = decode_api_err(502, "Bad Gateway");
        match err {
            GatewayError::Api { status, code, message } => {
                assert_eq!(status, 502);
                assert_eq!(code, "INTERNAL");
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decode_api_err_empty_body_names_the_status() {
        let err = decode_api_err(500, "");
        match err {
            GatewayError::Api { message, .. } => assert_eq!(message, "HTTP 500"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
