use blackjack_house_client::{Client, SponsorClient};
use blackjack_house_types::{
    api::{MoveCall, ObjectData, SponsoredTransaction, TransactionBytes, TransactionResponse, WaitMode},
    Address, ObjectId,
};
use std::{future::Future, time::Duration};
use thiserror::Error;

/// Read and write access to the ledger the game lives on.
pub trait Ledger: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch an object with its type and content. `None` if it does not exist.
    fn get_object(
        &self,
        id: &ObjectId,
    ) -> impl Future<Output = Result<Option<ObjectData>, Self::Error>> + Send;

    /// Every object of `struct_type` owned by `owner`.
    fn get_owned_objects(
        &self,
        owner: &Address,
        struct_type: &str,
    ) -> impl Future<Output = Result<Vec<ObjectData>, Self::Error>> + Send;

    /// Build an unsigned transaction invoking `call`.
    fn build_transaction(
        &self,
        sender: &Address,
        call: &MoveCall,
        gas_budget: u64,
    ) -> impl Future<Output = Result<TransactionBytes, Self::Error>> + Send;

    /// Submit a signed transaction and wait for local execution.
    fn execute(
        &self,
        tx_bytes: &str,
        signatures: &[String],
    ) -> impl Future<Output = Result<TransactionResponse, Self::Error>> + Send;

    /// Wait until a transaction is known to the ledger.
    fn wait_for_transaction(
        &self,
        digest: &str,
    ) -> impl Future<Output = Result<TransactionResponse, Self::Error>> + Send;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SponsorError {
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Service that pays gas for house transactions.
pub trait Sponsor: Clone + Send + Sync + 'static {
    /// Hand over the house's transaction and receive the final transaction
    /// together with the sponsor's signature over it.
    fn sponsor(
        &self,
        sender: &Address,
        tx_bytes: &str,
    ) -> impl Future<Output = Result<SponsoredTransaction, SponsorError>> + Send;
}

/// [Ledger] backed by a JSON-RPC full node.
#[derive(Clone)]
pub struct RpcLedger {
    client: Client,
    page_size: usize,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl RpcLedger {
    pub fn new(
        client: Client,
        page_size: usize,
        wait_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            page_size,
            wait_timeout,
            poll_interval,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Ledger for RpcLedger {
    type Error = blackjack_house_client::Error;

    async fn get_object(&self, id: &ObjectId) -> Result<Option<ObjectData>, Self::Error> {
        self.client.get_object(id).await
    }

    async fn get_owned_objects(
        &self,
        owner: &Address,
        struct_type: &str,
    ) -> Result<Vec<ObjectData>, Self::Error> {
        self.client
            .get_owned_objects(owner, struct_type, self.page_size)
            .await
    }

    async fn build_transaction(
        &self,
        sender: &Address,
        call: &MoveCall,
        gas_budget: u64,
    ) -> Result<TransactionBytes, Self::Error> {
        self.client.move_call(sender, call, gas_budget).await
    }

    async fn execute(
        &self,
        tx_bytes: &str,
        signatures: &[String],
    ) -> Result<TransactionResponse, Self::Error> {
        self.client
            .execute_transaction_block(tx_bytes, signatures, WaitMode::WaitForLocalExecution)
            .await
    }

    async fn wait_for_transaction(&self, digest: &str) -> Result<TransactionResponse, Self::Error> {
        self.client
            .wait_for_transaction(digest, self.wait_timeout, self.poll_interval)
            .await
    }
}

impl Sponsor for SponsorClient {
    async fn sponsor(
        &self,
        sender: &Address,
        tx_bytes: &str,
    ) -> Result<SponsoredTransaction, SponsorError> {
        self.request_sponsorship(sender, tx_bytes)
            .await
            .map_err(|err| match err {
                blackjack_house_client::Error::SponsorRejected(reason) => {
                    SponsorError::Rejected(reason)
                }
                blackjack_house_client::Error::SponsorUnavailable(reason) => {
                    SponsorError::Unavailable(reason)
                }
                other => SponsorError::Unavailable(other.to_string()),
            })
    }
}
