use crate::{backoff::jittered_backoff, Error, Result};
use blackjack_house_types::{
    api::{
        MoveCall, ObjectData, ObjectResponse, OwnedObjectsPage, RpcRequest, RpcResponse,
        TransactionBytes, TransactionResponse, WaitMode,
    },
    Address, ObjectId,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use url::Url;

/// Default timeout applied to every HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Object error codes returned for ids that do not resolve to a live object.
const MISSING_OBJECT_CODES: &[&str] = &["notExists", "deleted"];

/// Retry behaviour for requests that fail with a transient error.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Also retry requests that change ledger state (transaction execution).
    pub retry_non_idempotent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            retry_non_idempotent: false,
        }
    }
}

impl RetryPolicy {
    fn attempts_for(&self, idempotent: bool) -> usize {
        if idempotent || self.retry_non_idempotent {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::BAD_GATEWAY
        || status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        || status == reqwest::StatusCode::GATEWAY_TIMEOUT
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

pub(crate) fn validate_scheme(url: &Url) -> Result<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidScheme(other.to_string())),
    }
}

/// JSON-RPC client for the ledger's full node.
#[derive(Clone)]
pub struct Client {
    pub(crate) base_url: Url,
    pub(crate) http_client: reqwest::Client,
    retry_policy: RetryPolicy,
    next_id: Arc<AtomicU64>,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        validate_scheme(&base_url)?;
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            http_client,
            retry_policy: RetryPolicy::default(),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// POST a JSON body, retrying transient failures according to the policy.
    pub(crate) async fn post_json_with_retry(
        &self,
        url: Url,
        body: &Value,
        idempotent: bool,
    ) -> Result<reqwest::Response> {
        let attempts = self.retry_policy.attempts_for(idempotent);
        let mut backoff = self.retry_policy.initial_backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let last = attempt >= attempts;
            match self.http_client.post(url.clone()).json(body).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if !last && is_retryable_status(response.status()) => {
                    warn!(%url, status = %response.status(), attempt, "retrying request");
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(Error::FailedWithBody {
                        status,
                        body: format!("POST {url}: {text}"),
                    });
                }
                Err(err) if !last && is_retryable_error(&err) => {
                    warn!(%url, error = %err, attempt, "retrying request");
                }
                Err(err) => return Err(err.into()),
            }

            let delay = jittered_backoff(&mut rand::thread_rng(), backoff);
            sleep(delay).await;
            backoff = backoff
                .saturating_mul(2)
                .min(self.retry_policy.max_backoff);
        }
    }

    /// Issue a JSON-RPC call and decode its `result`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        idempotent: bool,
    ) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = serde_json::to_value(RpcRequest::new(id, method, params))?;
        debug!(method, id, "rpc call");
        let response = self
            .post_json_with_retry(self.base_url.clone(), &request, idempotent)
            .await?;
        let response: RpcResponse<T> = response.json().await?;
        if let Some(error) = response.error {
            return Err(Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        response.result.ok_or(Error::UnexpectedResponse)
    }

    /// Fetch an object with its type and content. Returns `None` if it does not exist.
    pub async fn get_object(&self, id: &ObjectId) -> Result<Option<ObjectData>> {
        let response: ObjectResponse = self
            .call(
                "sui_getObject",
                json!([id, { "showType": true, "showContent": true }]),
                true,
            )
            .await?;
        if let Some(data) = response.data {
            return Ok(Some(data));
        }
        match response.error {
            Some(error) => {
                let code = error.get("code").and_then(Value::as_str).unwrap_or_default();
                if MISSING_OBJECT_CODES.contains(&code) {
                    Ok(None)
                } else {
                    Err(Error::ObjectError(error.to_string()))
                }
            }
            None => Err(Error::UnexpectedResponse),
        }
    }

    /// Fetch every object of `struct_type` owned by `owner`, following pagination.
    pub async fn get_owned_objects(
        &self,
        owner: &Address,
        struct_type: &str,
        page_size: usize,
    ) -> Result<Vec<ObjectData>> {
        let query = json!({
            "filter": { "StructType": struct_type },
            "options": { "showType": true, "showContent": true },
        });
        let mut objects = Vec::new();
        let mut cursor: Option<String> = None;
        let mut sent = HashSet::new();
        loop {
            let page: OwnedObjectsPage = self
                .call(
                    "suix_getOwnedObjects",
                    json!([owner, query, cursor, page_size]),
                    true,
                )
                .await?;
            objects.extend(page.data.into_iter().filter_map(|entry| entry.data));
            match page.next_cursor {
                Some(next) if page.has_next_page => {
                    if let Some(previous) = cursor.take() {
                        sent.insert(previous);
                    }
                    if sent.contains(&next) {
                        warn!(%owner, struct_type, cursor = %next, "owned objects cursor repeated");
                        break;
                    }
                    cursor = Some(next);
                }
                _ => break,
            }
        }
        debug!(%owner, struct_type, count = objects.len(), "fetched owned objects");
        Ok(objects)
    }

    /// Build an unsigned transaction for `call` with an explicit gas budget.
    pub async fn move_call(
        &self,
        sender: &Address,
        call: &MoveCall,
        gas_budget: u64,
    ) -> Result<TransactionBytes> {
        self.call(
            "unsafe_moveCall",
            json!([
                sender,
                call.package,
                call.module,
                call.function,
                [],
                call.arguments,
                Value::Null,
                gas_budget.to_string(),
            ]),
            true,
        )
        .await
    }

    /// Submit a signed transaction and return its effects, events and object changes.
    pub async fn execute_transaction_block(
        &self,
        tx_bytes: &str,
        signatures: &[String],
        wait_mode: WaitMode,
    ) -> Result<TransactionResponse> {
        self.call(
            "sui_executeTransactionBlock",
            json!([
                tx_bytes,
                signatures,
                {
                    "showEffects": true,
                    "showEvents": true,
                    "showObjectChanges": true,
                },
                wait_mode.as_str(),
            ]),
            false,
        )
        .await
    }

    /// Poll until the ledger knows about `digest`, or `timeout` elapses.
    pub async fn wait_for_transaction(
        &self,
        digest: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<TransactionResponse> {
        let deadline = Instant::now() + timeout;
        loop {
            let result: Result<TransactionResponse> = self
                .call(
                    "sui_getTransactionBlock",
                    json!([digest, { "showEffects": true }]),
                    true,
                )
                .await;
            match result {
                Ok(response) => return Ok(response),
                Err(Error::Rpc { code, message }) => {
                    debug!(digest, code, %message, "transaction not yet available");
                }
                Err(err) => return Err(err),
            }
            if Instant::now() + poll_interval > deadline {
                return Err(Error::Timeout(format!("transaction {digest}")));
            }
            sleep(poll_interval).await;
        }
    }
}
