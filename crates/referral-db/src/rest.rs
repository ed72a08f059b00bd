//! Client for a hosted PostgREST-style table API (`/rest/v1/<table>`).

use std::time::Duration;

use async_trait::async_trait;
use referral_types::{Message, MessageFormData};
use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde_json::json;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{MessageFilter, MessageStore, SortOrder};

const TABLE: &str = "messages";

#[derive(Debug, Clone)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: String,
    /// Signed-in user's access token. Falls back to the api key.
    pub bearer: Option<String>,
    pub timeout: Duration,
}

pub struct RestStore {
    client: Client,
    endpoint: String,
    api_key: String,
    bearer: String,
}

impl RestStore {
    pub fn new(config: RestConfig) -> StoreResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let endpoint = format!("{}/rest/v1/{}", config.base_url.trim_end_matches('/'), TABLE);
        let bearer = config.bearer.unwrap_or_else(|| config.api_key.clone());

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            bearer,
        })
    }

    fn request(&self, method: Method, query: &[(&str, String)]) -> RequestBuilder {
        self.client
            .request(method, &self.endpoint)
            .query(query)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
    }
}

fn filter_query(filter: &MessageFilter) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(id) = &filter.id {
        query.push(("id", format!("eq.{}", id)));
    }
    if let Some(referral_id) = filter.referral_id {
        query.push(("referral_id", format!("eq.{}", referral_id)));
    }
    if let Some(recipient_id) = &filter.recipient_id {
        query.push(("recipient_id", format!("eq.{}", recipient_id)));
    }
    if let Some(read) = filter.read {
        query.push(("read", format!("eq.{}", read)));
    }
    query
}

/// Turns a non-2xx response into `StoreError::Rejected`, keeping the body
/// since hosted stores put the constraint or policy name there.
async fn ok_or_rejected(resp: Response) -> StoreResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        body,
    })
}

/// Total from a `Content-Range` header such as `0-24/120` or `*/0`.
fn parse_total(content_range: &str) -> Option<u64> {
    content_range.rsplit_once('/')?.1.parse().ok()
}

#[async_trait]
impl MessageStore for RestStore {
    async fn insert(&self, form: &MessageFormData) -> StoreResult<Message> {
        debug!(referral_id = form.referral_id, "rest insert message");
        let resp = self
            .request(Method::POST, &[])
            .header("Prefer", "return=representation")
            .json(form)
            .send()
            .await?;

        let rows: Vec<Message> = ok_or_rejected(resp).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Malformed("insert returned no row".into()))
    }

    async fn select(&self, filter: &MessageFilter, order: SortOrder) -> StoreResult<Vec<Message>> {
        debug!(?filter, ?order, "rest select messages");
        let mut query = vec![("select", "*".to_string())];
        query.extend(filter_query(filter));
        query.push((
            "order",
            match order {
                SortOrder::Ascending => "created_at.asc".to_string(),
                SortOrder::Descending => "created_at.desc".to_string(),
            },
        ));

        let resp = self.request(Method::GET, &query).send().await?;
        Ok(ok_or_rejected(resp).await?.json().await?)
    }

    async fn set_read(&self, filter: &MessageFilter, read: bool) -> StoreResult<u64> {
        if filter.is_empty() {
            return Err(StoreError::Unfiltered);
        }

        debug!(?filter, read, "rest update read flag");
        let resp = self
            .request(Method::PATCH, &filter_query(filter))
            .header("Prefer", "return=representation")
            .json(&json!({ "read": read }))
            .send()
            .await?;

        // Only the number of rows matters here, not their shape
        let rows: Vec<serde_json::Value> = ok_or_rejected(resp).await?.json().await?;
        Ok(rows.len() as u64)
    }

    async fn count(&self, filter: &MessageFilter) -> StoreResult<u64> {
        debug!(?filter, "rest count messages");
        let mut query = vec![("select", "*".to_string())];
        query.extend(filter_query(filter));

        let resp = self
            .request(Method::HEAD, &query)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let resp = ok_or_rejected(resp).await?;

        let range = resp
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::Malformed("count response has no Content-Range".into()))?;
        parse_total(range)
            .ok_or_else(|| StoreError::Malformed(format!("unparseable Content-Range '{}'", range)))
    }
}
