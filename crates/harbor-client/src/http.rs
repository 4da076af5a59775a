use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use harbor_types::api::PostListResponse;
use harbor_types::models::{Profile, UserStatus};

use crate::{ClientError, Direction, PostsApi};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `PostsApi` over the server's v4 REST API.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v4{}", self.base_url, path)
    }

    async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        debug!("GET {}", url);

        let resp = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .query(query)
            .send()
            .await?;

        decode(resp).await
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(body)
            .send()
            .await?;

        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    Ok(serde_json::from_str(&body)?)
}

/// Error bodies are `{"id": ..., "message": ..., "status_code": ...}` when the
/// server produced them, arbitrary text when a proxy did.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl PostsApi for HttpClient {
    async fn get_posts(
        &self,
        channel_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<PostListResponse, ClientError> {
        self.get_json(
            &format!("/channels/{}/posts", channel_id),
            &[("page", page), ("per_page", per_page)],
        )
        .await
    }

    async fn get_posts_since(
        &self,
        channel_id: &str,
        since: i64,
    ) -> Result<PostListResponse, ClientError> {
        self.get_json(&format!("/channels/{}/posts", channel_id), &[("since", since)])
            .await
    }

    async fn get_posts_anchored(
        &self,
        channel_id: &str,
        post_id: &str,
        direction: Direction,
        page: u32,
        per_page: u32,
    ) -> Result<PostListResponse, ClientError> {
        let page = page.to_string();
        let per_page = per_page.to_string();
        self.get_json(
            &format!("/channels/{}/posts", channel_id),
            &[
                (direction.as_str(), post_id),
                ("page", page.as_str()),
                ("per_page", per_page.as_str()),
            ],
        )
        .await
    }

    async fn get_post_thread(&self, root_id: &str) -> Result<PostListResponse, ClientError> {
        self.get_json(&format!("/posts/{}/thread", root_id), &[] as &[(&str, &str)])
            .await
    }

    async fn get_profiles_by_ids(&self, user_ids: &[String]) -> Result<Vec<Profile>, ClientError> {
        self.post_json("/users/ids", user_ids).await
    }

    async fn get_profiles_by_usernames(
        &self,
        usernames: &[String],
    ) -> Result<Vec<Profile>, ClientError> {
        self.post_json("/users/usernames", usernames).await
    }

    async fn get_statuses_by_ids(&self, user_ids: &[String]) -> Result<Vec<UserStatus>, ClientError> {
        self.post_json("/users/status/ids", user_ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = HttpClient::new("https://chat.example.com/", "token").unwrap();
        assert_eq!(
            client.endpoint("/posts/abc/thread"),
            "https://chat.example.com/api/v4/posts/abc/thread"
        );
    }

    #[test]
    fn error_message_prefers_server_message() {
        let body = r#"{"id":"api.context.session_expired.app_error","message":"Invalid or expired session","status_code":401}"#;
        assert_eq!(error_message(body), "Invalid or expired session");
        assert_eq!(error_message("  502 Bad Gateway\n"), "502 Bad Gateway");
    }

    #[test]
    fn status_errors_expose_their_code() {
        let err = ClientError::Status { status: 404, message: "not found".into() };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "server returned 404: not found");
    }
}
