use crate::{
    contract::{Contract, HouseCall},
    keys::AdminKeypair,
    ledger::{Ledger, Sponsor},
    matcher::find_authorization,
    reader::fetch_game_state,
    signer::HouseKey,
    submitter::{Outcome, Stage, Submitter},
    Error, Result,
};
use blackjack_house_types::{Address, Move, ObjectId};
use std::sync::Arc;
use tracing::{debug, info};

/// Everything the oracle needs besides its ledger and sponsor connections.
#[derive(Debug)]
pub struct OracleConfig {
    pub contract: Contract,
    pub house_data_id: ObjectId,
    pub gas_budget: u64,
    pub house_key: HouseKey,
    pub admin: AdminKeypair,
}

/// Signs and submits the house's side of every game.
///
/// Clones share configuration and keys, so independent games can be driven
/// concurrently from cloned handles.
#[derive(Clone)]
pub struct HouseOracle<L, S> {
    ledger: L,
    sponsor: Option<S>,
    config: Arc<OracleConfig>,
}

impl<L: Ledger, S: Sponsor> HouseOracle<L, S> {
    /// Without a sponsor, hit and stand are paid for by the admin account.
    pub fn new(ledger: L, sponsor: Option<S>, config: OracleConfig) -> Self {
        Self {
            ledger,
            sponsor,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn house_address(&self) -> Address {
        self.config.admin.address()
    }

    pub fn public_key_hex(&self) -> String {
        self.config.house_key.public_key_hex()
    }

    /// Deal the opening hand of `game`.
    ///
    /// If `creation_digest` is given, first wait for the transaction that
    /// created the game to become visible.
    pub async fn deal(&self, game: &ObjectId, creation_digest: Option<&str>) -> Result<Outcome> {
        info!(game = %game, stage = %Stage::Idle, "dealing");
        if let Some(digest) = creation_digest {
            self.ledger
                .wait_for_transaction(digest)
                .await
                .map_err(|err| Error::ledger("game creation wait", err))?;
            debug!(game = %game, digest, "game creation visible");
        }

        let record = fetch_game_state(&self.ledger, &self.config.contract, game).await?;
        debug!(game = %game, stage = %Stage::StateRead, counter = record.counter);
        let commitment = self.config.house_key.sign(&record);
        debug!(game = %game, stage = %Stage::Signed, message = %commitment.message());

        self.submitter()
            .submit(
                HouseCall::FirstDeal,
                *game,
                &commitment,
                self.config.house_data_id,
            )
            .await
    }

    /// Answer a pending `player_move` request on `game`.
    pub async fn play(&self, game: &ObjectId, player_move: Move) -> Result<Outcome> {
        info!(game = %game, %player_move, stage = %Stage::Idle, "playing house move");
        let record = fetch_game_state(&self.ledger, &self.config.contract, game).await?;
        debug!(
            game = %game,
            stage = %Stage::StateRead,
            counter = record.counter,
            player_sum = record.player_sum
        );
        let commitment = self.config.house_key.sign(&record);
        debug!(game = %game, stage = %Stage::Signed, message = %commitment.message());

        let owner = self.house_address();
        let authorization = find_authorization(
            &self.ledger,
            &self.config.contract,
            &owner,
            game,
            player_move,
            record.player_sum,
        )
        .await?
        .ok_or(Error::NoMatchingAuthorization {
            game: *game,
            player_move,
            player_sum: record.player_sum,
        })?;
        debug!(game = %game, request = %authorization.id, "matched authorization request");

        self.submitter()
            .submit(
                HouseCall::Move {
                    player_move,
                    authorization: &authorization.id,
                },
                *game,
                &commitment,
                self.config.house_data_id,
            )
            .await
    }

    fn submitter(&self) -> Submitter<'_, L, S> {
        Submitter {
            ledger: &self.ledger,
            sponsor: self.sponsor.as_ref(),
            admin: &self.config.admin,
            contract: &self.config.contract,
            gas_budget: self.config.gas_budget,
        }
    }
}
