//! CoinCap market data provider implementation.
//!
//! Secondary upstream used when CoinGecko cannot serve a request. Covers
//! listings, batch prices, and daily history; it has no rich detail
//! endpoint, so `supports_detail` is off and the client never routes
//! detail requests here.

mod models;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::errors::FetchError;
use crate::models::{MarketRecord, PriceSeries};
use crate::normalize;
use crate::provider::{MarketDataProvider, ProviderCapabilities};

use models::{AssetsEnvelope, CoinCapHistoryPoint, HistoryEnvelope};

const BASE_URL: &str = "https://api.coincap.io/v2";
const PROVIDER_ID: &str = "COINCAP";

/// CoinCap provider.
pub struct CoinCapProvider {
    client: Client,
}

impl CoinCapProvider {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    /// Issue a GET request and decode the JSON body.
    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}", BASE_URL, path);
        debug!("CoinCap request: /{}", path);

        let response = self.client.get(&url).query(query).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                FetchError::Network(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                provider: PROVIDER_ID.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                FetchError::EmptyResponse {
                    message: format!("CoinCap body failed to parse: {e}"),
                }
            } else {
                FetchError::Network(e)
            }
        })
    }

    async fn fetch_assets(&self, query: &[(&str, &str)]) -> Result<Vec<MarketRecord>, FetchError> {
        let envelope: AssetsEnvelope = self.fetch("assets", query).await?;
        if envelope.data.is_empty() {
            return Err(FetchError::EmptyResponse {
                message: "CoinCap returned no asset rows".to_string(),
            });
        }
        Ok(envelope
            .data
            .into_iter()
            .map(|asset| asset.into_record())
            .collect())
    }
}

impl Default for CoinCapProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for CoinCapProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_detail: false,
            supports_history: true,
        }
    }

    async fn top_coins(&self, limit: usize) -> Result<Vec<MarketRecord>, FetchError> {
        let limit_param = limit.to_string();
        self.fetch_assets(&[("limit", limit_param.as_str())]).await
    }

    async fn coin_prices(&self, ids: &[String]) -> Result<Vec<MarketRecord>, FetchError> {
        let joined = ids
            .iter()
            .map(|id| normalize::coincap_query_id(id))
            .collect::<Vec<_>>()
            .join(",");
        self.fetch_assets(&[("ids", joined.as_str())]).await
    }

    async fn price_history(&self, id: &str, days: u32) -> Result<PriceSeries, FetchError> {
        let canonical = normalize::canonical_id(id);
        let path = format!("assets/{}/history", normalize::coincap_query_id(&canonical));

        let end = Utc::now();
        // One extra day of margin so the window always spans days + 1
        // daily boundaries.
        let start = end - chrono::Duration::days(i64::from(days) + 1);
        let start_param = start.timestamp_millis().to_string();
        let end_param = end.timestamp_millis().to_string();

        let envelope: HistoryEnvelope = self
            .fetch(
                &path,
                &[
                    ("interval", "d1"),
                    ("start", &start_param),
                    ("end", &end_param),
                ],
            )
            .await?;

        let points = envelope
            .data
            .into_iter()
            .filter_map(CoinCapHistoryPoint::into_point)
            .collect();

        normalize::shape_daily_series(&canonical, days, points)
    }
}
