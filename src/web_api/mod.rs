use crate::core::http::RetryableClient;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

const AUTH_HEADER: &str = "x-nd-authorization";

#[derive(Debug, Error)]
pub enum WebApiError {
    #[error("Username is already taken")]
    UsernameTaken,
    #[error("Request failed: {0}")]
    RequestError(String),
    #[error("Web API returned {status}: {body}")]
    StatusError { status: u16, body: String },
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWebUser {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

/// The web application's user management API.
#[async_trait]
pub trait WebUserApi: Send + Sync {
    /// Creates the user and returns the id assigned by the web application.
    async fn create_user(&self, user: &NewWebUser) -> Result<String, WebApiError>;
    async fn delete_user(&self, user_id: &str) -> Result<(), WebApiError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserBody<'a> {
    is_admin: bool,
    user_name: &'a str,
    name: &'a str,
    email: Option<&'a str>,
    password: &'a str,
}

pub struct WebApiClient {
    host: String,
    token: String,
    client: RetryableClient,
}

impl WebApiClient {
    pub fn new(host: &str, token: &str, client: RetryableClient) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

// The web API signals a name collision with an `errors` key in the body
fn is_name_collision(body: &Value) -> bool {
    body.get("errors").is_some()
}

#[async_trait]
impl WebUserApi for WebApiClient {
    async fn create_user(&self, user: &NewWebUser) -> Result<String, WebApiError> {
        let body = CreateUserBody {
            is_admin: false,
            user_name: &user.username,
            name: &user.username,
            email: user.email.as_deref(),
            password: &user.password,
        };

        // Not retried: a repeated POST could create the user twice
        let response = self
            .client
            .execute(
                self.client
                    .post(format!("{}/api/user", self.host))
                    .header(AUTH_HEADER, self.bearer())
                    .json(&body),
            )
            .await
            .map_err(|e| {
                error!(username = %user.username, error = %e, "Create user request failed");
                WebApiError::RequestError(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| WebApiError::RequestError(e.to_string()))?;
        let json: Option<Value> = serde_json::from_str(&text).ok();

        if json.as_ref().is_some_and(is_name_collision) {
            return Err(WebApiError::UsernameTaken);
        }

        if !status.is_success() {
            error!(username = %user.username, status = %status, body = %text, "Create user rejected");
            return Err(WebApiError::StatusError {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(username = %user.username, body = %text, "Create user succeeded");
        json.as_ref()
            .and_then(|v| v.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(WebApiError::InvalidResponse(text))
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), WebApiError> {
        let response = self
            .client
            .execute_with_retry(
                self.client
                    .delete(format!("{}/api/user/{}", self.host, user_id))
                    .header(AUTH_HEADER, self.bearer()),
            )
            .await
            .map_err(|e| {
                error!(user_id = %user_id, error = %e, "Delete user request failed");
                WebApiError::RequestError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(user_id = %user_id, status = %status, body = %body, "Delete user rejected");
            return Err(WebApiError::StatusError {
                status: status.as_u16(),
                body,
            });
        }

        debug!(user_id = %user_id, "Delete user succeeded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    fn client_for(server: &mockito::ServerGuard) -> WebApiClient {
        WebApiClient::new(
            &server.url(),
            "secret-token",
            RetryableClient::with_settings(Duration::from_secs(5), 0).unwrap(),
        )
    }

    fn alice() -> NewWebUser {
        NewWebUser {
            username: "alice".to_string(),
            email: None,
            password: "hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_user_returns_assigned_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/user")
            .match_header("x-nd-authorization", "Bearer secret-token")
            .match_body(Matcher::Json(json!({
                "isAdmin": false,
                "userName": "alice",
                "name": "alice",
                "email": null,
                "password": "hunter2"
            })))
            .with_status(200)
            .with_body(r#"{"id":"web-123","userName":"alice"}"#)
            .create_async()
            .await;

        let id = client_for(&server).create_user(&alice()).await.unwrap();
        assert_eq!(id, "web-123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_user_sends_email_when_given() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/user")
            .match_body(Matcher::PartialJson(json!({"email": "a@example.com"})))
            .with_status(200)
            .with_body(r#"{"id":"web-1"}"#)
            .create_async()
            .await;

        let user = NewWebUser {
            email: Some("a@example.com".to_string()),
            ..alice()
        };
        client_for(&server).create_user(&user).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_user_name_collision() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/user")
            .with_status(400)
            .with_body(r#"{"errors":{"userName":"ra.validation.unique"}}"#)
            .create_async()
            .await;

        let err = client_for(&server).create_user(&alice()).await.unwrap_err();
        assert!(matches!(err, WebApiError::UsernameTaken), "{err:?}");
    }

    #[tokio::test]
    async fn test_create_user_other_failure_is_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/user")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let err = client_for(&server).create_user(&alice()).await.unwrap_err();
        assert!(
            matches!(err, WebApiError::StatusError { status: 500, .. }),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn test_create_user_without_id_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/user")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let err = client_for(&server).create_user(&alice()).await.unwrap_err();
        assert!(matches!(err, WebApiError::InvalidResponse(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_delete_user() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/user/web-123")
            .match_header("x-nd-authorization", "Bearer secret-token")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        client_for(&server).delete_user("web-123").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_user_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/user/web-123")
            .with_status(404)
            .create_async()
            .await;

        let err = client_for(&server).delete_user("web-123").await.unwrap_err();
        assert!(
            matches!(err, WebApiError::StatusError { status: 404, .. }),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let client = WebApiClient::new(
            "http://127.0.0.1:1",
            "secret-token",
            RetryableClient::with_settings(Duration::from_secs(1), 0).unwrap(),
        );
        let err = client.delete_user("web-123").await.unwrap_err();
        assert!(matches!(err, WebApiError::RequestError(_)), "{err:?}");
    }
}
