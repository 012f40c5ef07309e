//! Coinex API client.
//!
//! Speaks the venue's v2 JSON protocol: public market data plus private,
//! HMAC-SHA512-signed account endpoints. Monetary quantities travel on the
//! wire as integers scaled by 10^8.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::VenueError;
use crate::venue::types::{Balance, Currency, Order, OrderSide, TradePair};
use crate::venue::Venue;

type HmacSha512 = Hmac<Sha512>;

/// Number of fractional digits in the venue's fixed-point wire encoding.
const WIRE_SCALE: u32 = 8;

/// Coinex API client.
#[derive(Debug)]
pub struct CoinexClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL, without a trailing slash.
    base_url: String,
    /// Public API key.
    api_key: String,
    /// Secret used to sign private request bodies.
    api_secret: String,
    /// Interned currencies by id, loaded once per process.
    currencies: OnceCell<HashMap<u64, Arc<Currency>>>,
}

/// Currency list response.
#[derive(Debug, Deserialize)]
struct CurrenciesResponse {
    currencies: Vec<RawCurrency>,
}

/// Single currency row.
#[derive(Debug, Deserialize)]
struct RawCurrency {
    id: u64,
    abbreviation: String,
    name: String,
}

/// Trade pair list response.
#[derive(Debug, Deserialize)]
struct PairsResponse {
    trade_pairs: Vec<RawPair>,
}

/// Single trade pair row.
#[derive(Debug, Deserialize)]
struct RawPair {
    id: u64,
    from_currency_id: u64,
    to_currency_id: u64,
}

/// Order list response (order book, own orders, status queries).
#[derive(Debug, Deserialize)]
struct OrdersResponse {
    orders: Vec<RawOrder>,
}

/// Submission response; the venue wraps the created order in a list.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    order: Vec<RawOrder>,
}

/// Single order row with scaled-integer quantities.
#[derive(Debug, Deserialize)]
struct RawOrder {
    id: u64,
    trade_pair_id: u64,
    bid: bool,
    rate: i64,
    amount: i64,
    filled: i64,
    #[serde(default)]
    cancelled: bool,
    #[serde(default)]
    complete: bool,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// Balance list response.
#[derive(Debug, Deserialize)]
struct BalancesResponse {
    balances: Vec<RawBalance>,
}

/// Single balance row with scaled-integer quantities.
#[derive(Debug, Deserialize)]
struct RawBalance {
    currency_id: u64,
    amount: i64,
    held: i64,
}

/// Order submission request body.
#[derive(Debug, Serialize)]
struct SubmitRequest {
    order: SubmitOrderBody,
}

/// Inner order payload, quantities wire-scaled.
#[derive(Debug, Serialize)]
struct SubmitOrderBody {
    trade_pair_id: u64,
    amount: i64,
    bid: bool,
    rate: i64,
}

/// Decode a wire-scaled integer into an exact decimal.
pub(crate) fn decimal_from_units(raw: i64) -> Decimal {
    Decimal::new(raw, WIRE_SCALE)
}

/// Encode a decimal as a wire-scaled integer, truncating below 10^-8.
pub(crate) fn units_from_decimal(value: Decimal) -> Result<i64, VenueError> {
    let scaled = value
        .checked_mul(Decimal::from(100_000_000_i64))
        .ok_or(VenueError::Unencodable(value))?;
    scaled
        .trunc()
        .to_i64()
        .ok_or(VenueError::Unencodable(value))
}

impl RawOrder {
    fn into_order(self) -> Order {
        Order {
            id: self.id,
            pair_id: self.trade_pair_id,
            side: OrderSide::from_bid_flag(self.bid),
            rate: decimal_from_units(self.rate),
            amount: decimal_from_units(self.amount),
            filled: decimal_from_units(self.filled),
            cancelled: self.cancelled,
            complete: self.complete,
            created_at: self.created_at,
        }
    }
}

impl CoinexClient {
    /// Create a new client from config.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(std::time::Duration::from_millis(1_000))
            .tcp_nodelay(true)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            base_url: config.coinex_base_url.trim_end_matches('/').to_string(),
            api_key: config.coinex_api_key.clone(),
            api_secret: config.coinex_api_secret.clone(),
            currencies: OnceCell::new(),
        }
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Hex HMAC-SHA512 of a private request body.
    fn sign(&self, body: &[u8]) -> String {
        let mut mac = HmacSha512::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Issue an unauthenticated GET.
    async fn get_public<T: DeserializeOwned>(&self, page: &str) -> Result<T, VenueError> {
        let url = format!("{}/{}", self.base_url, page);
        let response = self.http.get(&url).send().await?;
        Self::decode(response).await
    }

    /// Issue a signed request. `body` of `None` signs the empty string and
    /// sends a GET; a JSON body is POSTed.
    async fn call_private<T: DeserializeOwned>(
        &self,
        page: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, VenueError> {
        let url = format!("{}/{}", self.base_url, page);
        let payload = match &body {
            Some(value) => serde_json::to_vec(value)
                .map_err(|e| VenueError::Decode(format!("failed to encode request: {e}")))?,
            None => Vec::new(),
        };

        let mut request = if body.is_some() {
            self.http.post(&url).body(payload.clone())
        } else {
            self.http.get(&url)
        };
        request = request
            .header("Content-Type", "application/json")
            .header("API-Key", &self.api_key)
            .header("API-Sign", self.sign(&payload));

        let response = request.send().await?;
        Self::decode(response).await
    }

    /// Check status and decode a JSON response body.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, VenueError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VenueError::Status {
                status: status.as_u16(),
                body: body.chars().take(256).collect(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| VenueError::Decode(e.to_string()))
    }

    /// Interned currency map, fetched on first use.
    async fn currency_map(&self) -> Result<&HashMap<u64, Arc<Currency>>, VenueError> {
        self.currencies
            .get_or_try_init(|| async {
                let response: CurrenciesResponse = self.get_public("currencies").await?;
                let map = response
                    .currencies
                    .into_iter()
                    .map(|raw| {
                        (
                            raw.id,
                            Arc::new(Currency {
                                id: raw.id,
                                abbreviation: raw.abbreviation,
                                name: raw.name,
                            }),
                        )
                    })
                    .collect();
                Ok(map)
            })
            .await
    }
}

#[async_trait]
impl Venue for CoinexClient {
    #[instrument(skip(self))]
    async fn list_currencies(&self) -> Result<Vec<Arc<Currency>>, VenueError> {
        let map = self.currency_map().await?;
        let mut currencies: Vec<_> = map.values().cloned().collect();
        currencies.sort_by_key(|c| c.id);
        Ok(currencies)
    }

    #[instrument(skip(self))]
    async fn list_pairs(&self) -> Result<Vec<Arc<TradePair>>, VenueError> {
        let currencies = self.currency_map().await?;
        let response: PairsResponse = self.get_public("trade_pairs").await?;

        response
            .trade_pairs
            .into_iter()
            .map(|raw| {
                let from_currency = currencies
                    .get(&raw.from_currency_id)
                    .ok_or(VenueError::UnknownCurrency(raw.from_currency_id))?
                    .clone();
                let to_currency = currencies
                    .get(&raw.to_currency_id)
                    .ok_or(VenueError::UnknownCurrency(raw.to_currency_id))?
                    .clone();
                Ok(Arc::new(TradePair {
                    id: raw.id,
                    from_currency,
                    to_currency,
                }))
            })
            .collect()
    }

    #[instrument(skip(self), fields(pair_id = pair_id))]
    async fn fetch_order_book(&self, pair_id: u64) -> Result<Vec<Order>, VenueError> {
        let response: OrdersResponse = self
            .get_public(&format!("orders?tradePair={pair_id}"))
            .await?;
        debug!(count = response.orders.len(), "Fetched order book");
        Ok(response
            .orders
            .into_iter()
            .map(RawOrder::into_order)
            .collect())
    }

    #[instrument(skip(self))]
    async fn fetch_balances(&self) -> Result<Vec<Balance>, VenueError> {
        let response: BalancesResponse = self.call_private("balances", None).await?;
        Ok(response
            .balances
            .into_iter()
            .map(|raw| Balance {
                currency_id: raw.currency_id,
                amount: decimal_from_units(raw.amount),
                held: decimal_from_units(raw.held),
            })
            .collect())
    }

    #[instrument(skip(self), fields(pair_id = pair_id, side = %side))]
    async fn submit_order(
        &self,
        pair_id: u64,
        amount: Decimal,
        side: OrderSide,
        rate: Decimal,
    ) -> Result<Order, VenueError> {
        let request = SubmitRequest {
            order: SubmitOrderBody {
                trade_pair_id: pair_id,
                amount: units_from_decimal(amount)?,
                bid: side == OrderSide::Bid,
                rate: units_from_decimal(rate)?,
            },
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| VenueError::Decode(format!("failed to encode order: {e}")))?;

        let response: SubmitResponse = self.call_private("orders", Some(body)).await?;
        let order = response
            .order
            .into_iter()
            .next()
            .ok_or_else(|| VenueError::Rejected("venue returned no order".to_string()))?
            .into_order();

        debug!(order_id = order.id, "Order submitted");
        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = order_id))]
    async fn query_order(&self, order_id: u64) -> Result<Order, VenueError> {
        let response: OrdersResponse = self
            .call_private(&format!("orders/{order_id}"), None)
            .await?;
        response
            .orders
            .into_iter()
            .next()
            .map(RawOrder::into_order)
            .ok_or_else(|| VenueError::Decode(format!("order {order_id} missing from response")))
    }

    #[instrument(skip(self), fields(order_id = order_id))]
    async fn cancel_order(&self, order_id: u64) -> Result<Order, VenueError> {
        let response: OrdersResponse = self
            .call_private(
                &format!("orders/{order_id}/cancel"),
                Some(serde_json::json!({})),
            )
            .await?;
        response
            .orders
            .into_iter()
            .next()
            .map(RawOrder::into_order)
            .ok_or_else(|| VenueError::Decode(format!("order {order_id} missing from response")))
    }
}
