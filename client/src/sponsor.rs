use crate::{client::validate_scheme, Error, Result};
use blackjack_house_types::{
    api::{SponsorRequest, SponsoredTransaction},
    Address,
};
use std::time::Duration;
use tracing::debug;
use url::{ParseError, Url};

/// HTTP client for the gas sponsor.
///
/// The sponsor receives the house's unsigned transaction, may rewrite it (for
/// example to attach its own gas payment) and returns the final transaction
/// together with its signature over it. Sponsorship requests are never retried.
#[derive(Clone)]
pub struct SponsorClient {
    url: Url,
    http_client: reqwest::Client,
}

impl SponsorClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut url = Url::parse(base_url)?;
        validate_scheme(&url)?;
        url.path_segments_mut()
            .map_err(|_| ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push("sponsor");
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, http_client })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn request_sponsorship(
        &self,
        sender: &Address,
        tx_bytes: &str,
    ) -> Result<SponsoredTransaction> {
        let request = SponsorRequest {
            sender: *sender,
            tx_bytes: tx_bytes.to_string(),
        };
        debug!(url = %self.url, %sender, "requesting sponsorship");
        let response = self
            .http_client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|err| Error::SponsorUnavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SponsorRejected(format!("{status}: {body}")));
        }
        let sponsored: SponsoredTransaction = response
            .json()
            .await
            .map_err(|err| Error::SponsorRejected(format!("malformed response: {err}")))?;
        if sponsored.tx_bytes.is_empty() || sponsored.signature.is_empty() {
            return Err(Error::SponsorRejected(
                "response is missing the transaction or signature".to_string(),
            ));
        }
        Ok(sponsored)
    }
}
