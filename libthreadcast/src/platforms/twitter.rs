//! X (Twitter) platform implementation
//!
//! Talks to the v2 API directly with `reqwest`, signing every request with
//! the user's OAuth 1.0a credentials. Only two endpoints are used:
//! `GET /2/users/me` to verify credentials and `POST /2/tweets` to publish.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::TwitterConfig;
use crate::credentials::Credentials;
use crate::error::{PlatformError, Result};
use crate::platforms::oauth::{authorization_header, Nonce};
use crate::platforms::{validate_length, Platform};

const USER_AGENT: &str = concat!("threadcast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<ReplySettings<'a>>,
}

#[derive(Debug, Serialize)]
struct ReplySettings<'a> {
    in_reply_to_tweet_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Error body shapes returned by the API
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    #[serde(default)]
    message: Option<String>,
}

impl ApiErrorBody {
    fn summary(raw: &str) -> String {
        let body: ApiErrorBody = serde_json::from_str(raw).unwrap_or_default();
        body.detail
            .or(body.title)
            .or_else(|| body.errors.into_iter().find_map(|e| e.message))
            .unwrap_or_else(|| {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    "no response body".to_string()
                } else {
                    trimmed.chars().take(200).collect()
                }
            })
    }
}

const AUTHENTICATE: &str = "authenticate";

/// Map a non-success HTTP status to a platform error
///
/// X answers 403 both for missing permissions and for refused content
/// (duplicates, suspended reply targets), so 403 only counts as an
/// authentication failure while verifying credentials.
fn map_status(status: StatusCode, body: &str, context: &str) -> PlatformError {
    let summary = ApiErrorBody::summary(body);
    let rejected_credentials = status == StatusCode::UNAUTHORIZED
        || (status == StatusCode::FORBIDDEN && context == AUTHENTICATE);

    match status {
        _ if rejected_credentials => PlatformError::Authentication(format!(
            "X rejected the request during {} ({}): {}. Check the four values in your credentials file and that the app has write access.",
            context, status, summary
        )),
        StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimit(format!(
            "X rate limit hit during {}: {}",
            context, summary
        )),
        s if s.is_server_error() => {
            PlatformError::Network(format!("X server error during {} ({}): {}", context, s, summary))
        }
        s => PlatformError::Posting(format!("X refused {} ({}): {}", context, s, summary)),
    }
}

fn map_reqwest_error(error: reqwest::Error, context: &str) -> PlatformError {
    if error.is_timeout() {
        PlatformError::Network(format!("Timed out during {}: {}", context, error))
    } else if error.is_decode() {
        PlatformError::Posting(format!("Unexpected response during {}: {}", context, error))
    } else {
        PlatformError::Network(format!("Request failed during {}: {}", context, error))
    }
}

/// X API v2 client
///
/// `Debug` output redacts the credentials.
#[derive(Debug)]
pub struct TwitterClient {
    http: reqwest::Client,
    api_base: Url,
    credentials: Credentials,
    character_limit: usize,
    user: Option<AuthenticatedUser>,
}

impl TwitterClient {
    /// Create a client; no network traffic happens until [`Platform::authenticate`]
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `api_base` is not a URL, or
    /// `PlatformError::Network` if the HTTP client cannot be built.
    pub fn new(credentials: Credentials, config: &TwitterConfig) -> Result<Self> {
        let mut base = config.api_base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_base = Url::parse(&base).map_err(|e| crate::error::ConfigError::InvalidValue {
            field: "twitter.api_base".to_string(),
            reason: e.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| PlatformError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base,
            credentials,
            character_limit: config.character_limit,
            user: None,
        })
    }

    /// The account verified by the last successful authentication
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.user.as_ref()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base.join(path).map_err(|e| {
            PlatformError::Network(format!("Invalid endpoint {}: {}", path, e)).into()
        })
    }

    fn request(&self, method: Method, url: Url) -> Result<reqwest::RequestBuilder> {
        let header = authorization_header(
            &self.credentials,
            method.as_str(),
            &url,
            &[],
            &Nonce::generate(),
        )?;

        Ok(self
            .http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, header))
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, context))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, context))?;

        if !status.is_success() {
            return Err(map_status(status, &body, context).into());
        }

        serde_json::from_str(&body).map_err(|e| {
            PlatformError::Posting(format!(
                "Unexpected response during {}: {}",
                context, e
            ))
            .into()
        })
    }
}

#[async_trait]
impl Platform for TwitterClient {
    async fn authenticate(&mut self) -> Result<()> {
        let url = self.endpoint("2/users/me")?;
        let builder = self.request(Method::GET, url)?;
        let envelope: DataEnvelope<AuthenticatedUser> = self.send(builder, AUTHENTICATE).await?;

        info!("Authenticated as @{}", envelope.data.username);
        self.user = Some(envelope.data);
        Ok(())
    }

    async fn post(&self, content: &str, reply_to: Option<&str>) -> Result<String> {
        self.validate_content(content)?;

        if self.user.is_none() {
            return Err(PlatformError::Authentication("Not authenticated".to_string()).into());
        }

        let url = self.endpoint("2/tweets")?;
        let body = CreateTweetRequest {
            text: content,
            reply: reply_to.map(|id| ReplySettings {
                in_reply_to_tweet_id: id,
            }),
        };
        debug!(reply_to = ?reply_to, "creating tweet");

        let builder = self.request(Method::POST, url)?.json(&body);
        let envelope: DataEnvelope<CreatedTweet> = self.send(builder, "create tweet").await?;

        Ok(envelope.data.id)
    }

    fn validate_content(&self, content: &str) -> Result<()> {
        validate_length(self.name(), content, Some(self.character_limit))
    }

    fn name(&self) -> &str {
        "twitter"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(self.character_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> TwitterClient {
        let config = TwitterConfig {
            api_base: server.uri(),
            character_limit: 280,
        };
        TwitterClient::new(Credentials::new("ck", "cs", "at", "ats"), &config).unwrap()
    }

    async fn mount_me(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"id": "12", "username": "threadcast", "name": "Threadcast"}
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_map_status_variants() {
        let body = r#"{"title":"Forbidden","detail":"You are not permitted to perform this action."}"#;
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, body, AUTHENTICATE),
            PlatformError::Authentication(m) if m.contains("not permitted")
        ));
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, "", "create tweet"),
            PlatformError::Authentication(_)
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, body, "create tweet"),
            PlatformError::Posting(_)
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, "", "create tweet"),
            PlatformError::RateLimit(_)
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, "", "create tweet"),
            PlatformError::Network(_)
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, r#"{"errors":[{"message":"duplicate"}]}"#, "create tweet"),
            PlatformError::Posting(m) if m.contains("duplicate")
        ));
    }

    #[test]
    fn test_invalid_api_base() {
        let config = TwitterConfig {
            api_base: "not a url".to_string(),
            character_limit: 280,
        };
        let result = TwitterClient::new(Credentials::new("a", "b", "c", "d"), &config);
        assert!(result.unwrap_err().to_string().contains("twitter.api_base"));
    }

    #[test]
    fn test_debug_output_hides_credentials() {
        let client = TwitterClient::new(
            Credentials::new("key-1", "consumer-secret", "token-1", "token-secret"),
            &TwitterConfig::default(),
        )
        .unwrap();
        let debug = format!("{:?}", client);

        assert!(debug.contains("api.twitter.com"));
        assert!(!debug.contains("consumer-secret"));
        assert!(!debug.contains("token-secret"));
    }

    #[tokio::test]
    async fn test_authenticate_records_user() {
        let server = MockServer::start().await;
        mount_me(&server).await;

        let mut client = client_for(&server);
        client.authenticate().await.unwrap();
        assert_eq!(client.user().unwrap().username, "threadcast");
    }

    #[tokio::test]
    async fn test_authenticate_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "title": "Unauthorized", "status": 401, "detail": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        let err = client.authenticate().await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_post_sends_reply_target() {
        let server = MockServer::start().await;
        mount_me(&server).await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header_exists("authorization"))
            .and(body_json(serde_json::json!({
                "text": "second",
                "reply": {"in_reply_to_tweet_id": "100"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": "101", "text": "second"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        client.authenticate().await.unwrap();
        let id = client.post("second", Some("100")).await.unwrap();
        assert_eq!(id, "101");
    }

    #[tokio::test]
    async fn test_post_without_reply_omits_field() {
        let server = MockServer::start().await;
        mount_me(&server).await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(body_json(serde_json::json!({"text": "standalone"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": "7", "text": "standalone"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        client.authenticate().await.unwrap();
        assert_eq!(client.post("standalone", None).await.unwrap(), "7");
    }

    #[tokio::test]
    async fn test_post_rejects_long_content_without_request() {
        let server = MockServer::start().await;
        mount_me(&server).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        client.authenticate().await.unwrap();
        let err = client.post(&"x".repeat(281), None).await.unwrap_err();
        assert!(err.to_string().contains("character limit"));
    }

    #[tokio::test]
    async fn test_post_requires_authentication() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let err = client.post("hello", None).await.unwrap_err();
        assert!(err.to_string().contains("Not authenticated"));
    }

    #[tokio::test]
    async fn test_post_duplicate_is_posting_error() {
        let server = MockServer::start().await;
        mount_me(&server).await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "detail": "You are not allowed to create a Tweet with duplicate content.",
                "status": 403
            })))
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        client.authenticate().await.unwrap();
        let err = client.post("again", None).await.unwrap_err();
        assert!(err.to_string().contains("duplicate content"));
        assert_eq!(err.exit_code(), 1);
    }
}
