//! CoinGecko market data provider implementation.
//!
//! Primary upstream: rich listing, detail, and history endpoints with
//! numeric JSON fields. Works unauthenticated against the public API; a
//! demo API key can be supplied and is sent via the `x-cg-demo-api-key`
//! header. Free tier allows roughly 30 calls per minute - the scheduler's
//! spacing keeps us well under that.

mod models;

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::errors::FetchError;
use crate::models::{CoinDetail, MarketRecord, PriceSeries};
use crate::normalize;
use crate::provider::{MarketDataProvider, ProviderCapabilities};

use models::{GeckoDetail, GeckoMarket, GeckoMarketChart};

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const PROVIDER_ID: &str = "COINGECKO";
const VS_CURRENCY: &str = "usd";
const PCT_WINDOWS: &str = "24h,7d,30d";

/// CoinGecko provider.
pub struct CoinGeckoProvider {
    client: Client,
    api_key: Option<String>,
}

impl CoinGeckoProvider {
    /// Create a provider, optionally authenticated with a demo API key.
    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Issue a GET request and decode the JSON body.
    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}", BASE_URL, path);
        debug!("CoinGecko request: /{}", path);

        let mut request = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request.send().await.map_err(|e| {
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
                    message: format!("CoinGecko body failed to parse: {e}"),
                }
            } else {
                FetchError::Network(e)
            }
        })
    }

    async fn fetch_markets(&self, query: &[(&str, &str)]) -> Result<Vec<MarketRecord>, FetchError> {
        let rows: Vec<GeckoMarket> = self.fetch("coins/markets", query).await?;
        if rows.is_empty() {
            return Err(FetchError::EmptyResponse {
                message: "CoinGecko returned no market rows".to_string(),
            });
        }
        Ok(rows.into_iter().map(GeckoMarket::into_record).collect())
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        5
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_detail: true,
            supports_history: true,
        }
    }

    async fn top_coins(&self, limit: usize) -> Result<Vec<MarketRecord>, FetchError> {
        let per_page = limit.to_string();
        self.fetch_markets(&[
            ("vs_currency", VS_CURRENCY),
            ("order", "market_cap_desc"),
            ("per_page", &per_page),
            ("page", "1"),
            ("sparkline", "false"),
            ("price_change_percentage", PCT_WINDOWS),
        ])
        .await
    }

    async fn coin_prices(&self, ids: &[String]) -> Result<Vec<MarketRecord>, FetchError> {
        let joined = ids.join(",");
        self.fetch_markets(&[
            ("vs_currency", VS_CURRENCY),
            ("ids", &joined),
            ("sparkline", "false"),
            ("price_change_percentage", PCT_WINDOWS),
        ])
        .await
    }

    async fn coin_detail(&self, id: &str) -> Result<CoinDetail, FetchError> {
        let path = format!("coins/{}", id);
        let detail: GeckoDetail = self
            .fetch(
                &path,
                &[
                    ("localization", "false"),
                    ("tickers", "false"),
                    ("market_data", "true"),
                    ("community_data", "false"),
                    ("developer_data", "false"),
                    ("sparkline", "false"),
                ],
            )
            .await?;
        Ok(detail.into_detail())
    }

    async fn price_history(&self, id: &str, days: u32) -> Result<PriceSeries, FetchError> {
        let path = format!("coins/{}/market_chart", id);
        let days_param = days.to_string();
        let chart: GeckoMarketChart = self
            .fetch(
                &path,
                &[
                    ("vs_currency", VS_CURRENCY),
                    ("days", &days_param),
                    ("interval", "daily"),
                ],
            )
            .await?;

        normalize::shape_daily_series(&normalize::canonical_id(id), days, chart.into_points())
    }
}
