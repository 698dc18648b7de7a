//! reqwest client for the anchor service

use crate::api::{
    AnchorRecord, AnchorService, NewAnchorRequest, NewAnchorResponse, RemoteAnchor, StoreError,
    StoreResult, WireTransform,
};
use crate::core::{AnchorId, Transform};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Root path segment of every anchor route
const ANCHOR_ROUTE: &str = "UWBAnchor";

/// Anchor service reached over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpAnchorService {
    client: Client,
    endpoint: Url,
}

impl HttpAnchorService {
    pub fn new(endpoint: &str, timeout: Duration) -> StoreResult<Self> {
        let endpoint = Url::parse(endpoint).map_err(|_| StoreError::BadUrl {
            url: endpoint.to_string(),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::BadUrl { url: endpoint.to_string() });
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StoreError::from)?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `{endpoint}/UWBAnchor/{beacon_name}/{action}` with the name escaped
    fn route(&self, beacon_name: &str, action: &str) -> StoreResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::BadUrl { url: self.endpoint.to_string() })?
            .pop_if_empty()
            .extend([ANCHOR_ROUTE, beacon_name, action]);
        Ok(url)
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> StoreResult<T> {
        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), url = %response.url(), "anchor service rejected request");
            return Err(StoreError::Http { status: status.as_u16() });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl AnchorService for HttpAnchorService {
    async fn create_anchor(&self, beacon_name: &str, relative: &Transform) -> StoreResult<AnchorId> {
        let url = self.route(beacon_name, "new")?;
        let body = NewAnchorRequest {
            relative_transform: WireTransform::from(relative),
        };
        debug!(url = %url, "posting anchor");

        let response = self.client.post(url).json(&body).send().await?;
        let created: NewAnchorResponse = Self::read_json(response).await?;
        Ok(created.id)
    }

    async fn list_anchors(&self, beacon_name: &str) -> StoreResult<Vec<RemoteAnchor>> {
        let url = self.route(beacon_name, "list")?;
        debug!(url = %url, "listing anchors");

        let response = self.client.get(url).send().await?;
        let records: Vec<AnchorRecord> = Self::read_json(response).await?;
        Ok(records
            .into_iter()
            .map(|r| RemoteAnchor {
                id: r.id,
                relative_transform: Transform::from(r.relative_transform),
            })
            .collect())
    }
}
