use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    config::NetworkConfig,
    error::{ApiError, ApiResult},
    model::{
        Credentials, LibraryPlant, LoginResponse, NewLibraryPlant, NewUserPlant, Notification,
        Profile, ProfileUpdate, Registration, UserPlant, UserPlantUpdate,
    },
};

/// API client for the plant-care service.
#[derive(Clone, Debug)]
pub struct PlantApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl PlantApiClient {
    /// Create a new API client with configurable timeouts.
    pub fn new(base_url: impl Into<String>, network_config: &NetworkConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network_config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(network_config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Attach a bearer token to every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // ==================== Library ====================

    pub async fn fetch_library(&self) -> ApiResult<Vec<LibraryPlant>> {
        let response = send(self.request(Method::GET, "/plants"), "/plants").await?;
        list_body(response).await
    }

    pub async fn fetch_plant(&self, id: i64) -> ApiResult<LibraryPlant> {
        let path = format!("/plants/{}", id);
        let response = send(self.request(Method::GET, &path), &path).await?;
        optional_body(response)
            .await?
            .ok_or(ApiError::NotFound(path))
    }

    /// Add an entry to the shared library. Rejected locally if invalid.
    pub async fn create_library_plant(
        &self,
        plant: &NewLibraryPlant,
    ) -> ApiResult<Option<LibraryPlant>> {
        let plant = plant.clone().normalized();
        plant.validate()?;
        let path = "/admin/add-plant";
        let response = send(self.request(Method::POST, path).json(&plant), path).await?;
        optional_body(response).await
    }

    pub async fn update_library_plant(
        &self,
        id: i64,
        plant: &NewLibraryPlant,
    ) -> ApiResult<Option<LibraryPlant>> {
        let plant = plant.clone().normalized();
        plant.validate()?;
        let path = format!("/admin/plants/{}", id);
        let response = send(self.request(Method::PUT, &path).json(&plant), &path).await?;
        optional_body(response).await
    }

    pub async fn delete_library_plant(&self, id: i64) -> ApiResult<()> {
        let path = format!("/admin/plants/{}", id);
        send(self.request(Method::DELETE, &path), &path).await?;
        Ok(())
    }

    // ==================== Collection ====================

    pub async fn fetch_user_plants(&self) -> ApiResult<Vec<UserPlant>> {
        let path = "/my-plants";
        let response = send(self.request(Method::GET, path), path).await?;
        list_body(response).await
    }

    /// Returns the created record when the service echoes it back.
    pub async fn add_user_plant(&self, plant: &NewUserPlant) -> ApiResult<Option<UserPlant>> {
        let path = "/my-plants";
        let response = send(self.request(Method::POST, path).json(plant), path).await?;
        optional_body(response).await
    }

    pub async fn update_user_plant(&self, id: i64, update: &UserPlantUpdate) -> ApiResult<()> {
        let path = format!("/my-plants/{}", id);
        send(self.request(Method::PUT, &path).json(update), &path).await?;
        Ok(())
    }

    pub async fn delete_user_plant(&self, id: i64) -> ApiResult<()> {
        let path = format!("/my-plants/{}", id);
        send(self.request(Method::DELETE, &path), &path).await?;
        Ok(())
    }

    pub async fn record_watering(&self, id: i64) -> ApiResult<()> {
        let path = format!("/water-plant/{}", id);
        send(self.request(Method::POST, &path), &path).await?;
        Ok(())
    }

    // ==================== Notifications ====================

    pub async fn fetch_unread_notifications(&self) -> ApiResult<Vec<Notification>> {
        let path = "/notifications/unread";
        let response = send(self.request(Method::GET, path), path).await?;
        list_body(response).await
    }

    // ==================== Accounts ====================

    pub async fn register(&self, registration: &Registration) -> ApiResult<()> {
        let path = "/register";
        send(self.request(Method::POST, path).json(registration), path).await?;
        Ok(())
    }

    /// Exchange credentials for a session token.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<String> {
        let path = "/login";
        let response = send(self.request(Method::POST, path).json(credentials), path).await?;
        let login: LoginResponse = json_body(response).await?;
        Ok(login.token)
    }

    pub async fn profile(&self) -> ApiResult<Profile> {
        let path = "/profile";
        let response = send(self.request(Method::GET, path), path).await?;
        json_body(response).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<()> {
        let path = "/profile";
        send(self.request(Method::PUT, path).json(update), path).await?;
        Ok(())
    }

    pub async fn delete_profile(&self) -> ApiResult<()> {
        let path = "/profile";
        send(self.request(Method::DELETE, path), path).await?;
        Ok(())
    }
}

// ==================== Response Handling ====================

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: Option<String>,
}

/// Send a request and map non-success statuses to typed errors.
async fn send(builder: RequestBuilder, path: &str) -> ApiResult<Response> {
    let response = builder.send().await?;
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    tracing::warn!("{} returned {}", path, status);
    match status {
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(path.to_string())),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            })
        }
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorBody {
        message: Some(message),
    }) = serde_json::from_str::<ErrorBody>(body)
    {
        return message;
    }
    let body = body.trim();
    if !body.is_empty() && !body.starts_with('{') {
        return body.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unexpected response")
        .to_string()
}

async fn json_body<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// A list body that is empty or `null` is an empty list.
async fn list_body<T: DeserializeOwned>(response: Response) -> ApiResult<Vec<T>> {
    Ok(optional_body::<Vec<T>>(response).await?.unwrap_or_default())
}

/// An empty or `null` body is `None`.
async fn optional_body<T: DeserializeOwned>(response: Response) -> ApiResult<Option<T>> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(serde_json::from_slice::<Option<T>>(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Error Message Tests ====================

    #[test]
    fn test_error_message_from_json() {
        let msg = error_message(
            StatusCode::CONFLICT,
            r#"{"message": "Plant already added"}"#,
        );
        assert_eq!(msg, "Plant already added");

        let msg = error_message(StatusCode::BAD_REQUEST, r#"{"error": "bad interval"}"#);
        assert_eq!(msg, "bad interval");
    }

    #[test]
    fn test_error_message_from_text() {
        let msg = error_message(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(msg, "upstream down");
    }

    #[test]
    fn test_error_message_falls_back_to_reason() {
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Internal Server Error"
        );
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail": 1}"#),
            "Internal Server Error"
        );
    }

    // ==================== Client Construction Tests ====================

    #[test]
    fn test_api_client_creation() {
        let config = NetworkConfig {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        };
        let result = PlantApiClient::new("https://example.com/api", &config);
        assert!(result.is_ok());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = PlantApiClient::new("http://localhost:8080/api/", &NetworkConfig::default())
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/api");
    }
}
