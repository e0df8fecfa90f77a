use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use super::{
    Api, ApiError, AuthData, MenuItemData, NewOrder, NewProfile, OrderData, RestaurantData, Result,
};
use crate::inbox::NotificationRecord;

/// The HTTP implementation of [Api], speaking JSON against the ordering
/// service's REST surface with an optional bearer token.
pub struct HttpApi {
    client: Client,
    base: Url,
    token: Mutex<Option<String>>,
}

impl HttpApi {
    /// Creates an unauthenticated client. `base` is the service root and
    /// should end with a trailing slash, e.g. `https://host/api/`.
    pub fn new(base: Url) -> Self {
        Self {
            client: Client::new(),
            base,
            token: Mutex::new(None),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Remote(format!("invalid endpoint {path}: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &*self.token.lock() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.client.get(self.endpoint(path)?);
        let response = self.authorize(request).send().await?;

        parse(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.client.post(self.endpoint(path)?).json(body);
        let response = self.authorize(request).send().await?;

        parse(response).await
    }

    async fn put_ack(&self, path: &str) -> Result<()> {
        let request = self.client.put(self.endpoint(path)?);
        let response = self.authorize(request).send().await?;

        acknowledge(response).await
    }
}

#[async_trait]
impl Api for HttpApi {
    async fn authenticate(&self, email: &str, password: &str) -> Result<AuthData> {
        #[derive(Serialize)]
        struct Credentials<'a> {
            email: &'a str,
            password: &'a str,
        }

        self.post("auth/login", &Credentials { email, password })
            .await
    }

    async fn register(&self, profile: NewProfile) -> Result<AuthData> {
        self.post("auth/register", &profile).await
    }

    async fn list_notifications(&self) -> Result<Vec<NotificationRecord>> {
        self.get("notifications").await
    }

    async fn mark_notification_read(&self, id: i64) -> Result<()> {
        self.put_ack(&format!("notifications/{id}/read")).await
    }

    async fn mark_all_notifications_read(&self) -> Result<()> {
        self.put_ack("notifications/read-all").await
    }

    async fn list_restaurants(&self) -> Result<Vec<RestaurantData>> {
        self.get("restaurants").await
    }

    async fn restaurant(&self, id: i64) -> Result<RestaurantData> {
        self.get(&format!("restaurants/{id}")).await
    }

    async fn menu_items(&self, restaurant_id: i64) -> Result<Vec<MenuItemData>> {
        self.get(&format!("menu-items/restaurant/{restaurant_id}/available"))
            .await
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderData> {
        self.post("orders", &order).await
    }

    fn set_credential(&self, token: Option<String>) {
        *self.token.lock() = token;
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        Self::Remote(value.to_string())
    }
}

/// The error payload the service responds with on failures.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
    errors: Option<HashMap<String, String>>,
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = into_error(response).await?;

    response
        .json()
        .await
        .map_err(|e| ApiError::Remote(format!("malformed response: {e}")))
}

async fn acknowledge(response: Response) -> Result<()> {
    into_error(response).await.map(|_| ())
}

async fn into_error(response: Response) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body: ErrorBody = response.json().await.unwrap_or_default();

    if let Some(errors) = body.errors {
        return Err(ApiError::Validation(errors));
    }

    let message = body
        .message
        .or(body.error)
        .unwrap_or_else(|| format!("request failed with status {status}"));

    Err(ApiError::Remote(message))
}
