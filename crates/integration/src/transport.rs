use std::time::Duration;

use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ServiceError, translate_status};

/// Process-lifetime HTTP client shared by every downstream client.
///
/// Built once at startup and cloned into each client; clones share the
/// underlying connection pool.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(connect_timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        tracing::debug!(url, ?query, "GET");
        let response = self.client.get(url).query(query).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<(), ServiceError> {
        tracing::debug!(url, "POST");
        let response = self.client.post(url).json(body).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn delete(&self, url: &str, query: &[(&str, String)]) -> Result<(), ServiceError> {
        tracing::debug!(url, ?query, "DELETE");
        let response = self.client.delete(url).query(query).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn check(response: Response) -> Result<Response, ServiceError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(translate_status(status, &body))
    }
}
