use crate::{
    contract::{Contract, HouseCall},
    fields::{id_field, optional_bytes_field, uint_field},
    keys::AdminKeypair,
    ledger::{Ledger, Sponsor, SponsorError},
    signer::HouseCommitment,
    Error, Result,
};
use blackjack_house_types::{
    api::{LedgerEvent, TransactionResponse},
    Address, HitDoneEvent, Move, ObjectId,
};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Progress of a single house move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Idle,
    StateRead,
    Signed,
    SelfSigned,
    SponsorRequested,
    Submitted,
    Finalized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::StateRead => "state_read",
            Stage::Signed => "signed",
            Stage::SelfSigned => "self_signed",
            Stage::SponsorRequested => "sponsor_requested",
            Stage::Submitted => "submitted",
            Stage::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Successful result of a house move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Dealt { digest: String },
    Hit { digest: String, event: HitDoneEvent },
    Stood { digest: String, game_id: ObjectId },
}

impl Outcome {
    pub fn digest(&self) -> &str {
        match self {
            Outcome::Dealt { digest }
            | Outcome::Hit { digest, .. }
            | Outcome::Stood { digest, .. } => digest,
        }
    }
}

/// Transaction carrying the house and sponsor signatures, in that order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CosignedTransaction {
    pub tx_bytes: String,
    pub signatures: [String; 2],
}

/// One sponsorship handshake. Consumed by [SponsorSession::cosign]; nothing
/// outlives a failed handshake.
pub struct SponsorSession<'a, S> {
    sponsor: &'a S,
    admin: &'a AdminKeypair,
}

impl<'a, S: Sponsor> SponsorSession<'a, S> {
    pub fn new(sponsor: &'a S, admin: &'a AdminKeypair) -> Self {
        Self { sponsor, admin }
    }

    /// Hand the unsigned transaction to the sponsor, then sign what it returns.
    pub async fn cosign(self, tx_bytes: &str) -> Result<CosignedTransaction> {
        let sender: Address = self.admin.address();
        let sponsored = self
            .sponsor
            .sponsor(&sender, tx_bytes)
            .await
            .map_err(|err| match err {
                SponsorError::Unavailable(reason) => Error::SponsorUnavailable(reason),
                SponsorError::Rejected(reason) => Error::SponsorRejected(reason),
            })?;
        let house_signature = self
            .admin
            .sign_transaction(&sponsored.tx_bytes)
            .map_err(|err| Error::SponsorRejected(format!("invalid transaction bytes: {err}")))?;
        Ok(CosignedTransaction {
            tx_bytes: sponsored.tx_bytes,
            signatures: [house_signature, sponsored.signature],
        })
    }
}

/// Builds, signs and submits house calls, then interprets the result.
pub struct Submitter<'a, L, S> {
    pub ledger: &'a L,
    pub sponsor: Option<&'a S>,
    pub admin: &'a AdminKeypair,
    pub contract: &'a Contract,
    pub gas_budget: u64,
}

impl<L: Ledger, S: Sponsor> Submitter<'_, L, S> {
    pub async fn submit(
        &self,
        call: HouseCall<'_>,
        game: ObjectId,
        commitment: &HouseCommitment,
        house_data: ObjectId,
    ) -> Result<Outcome> {
        let move_call = self
            .contract
            .call(call, game, commitment.to_bytes(), house_data);
        let sender = self.admin.address();
        let unsigned = self
            .ledger
            .build_transaction(&sender, &move_call, self.gas_budget)
            .await
            .map_err(|err| Error::ledger("transaction build", err))?;

        let sponsor = match call {
            HouseCall::FirstDeal => None,
            HouseCall::Move { .. } => self.sponsor,
        };
        let (tx_bytes, signatures) = match sponsor {
            Some(sponsor) => {
                debug!(game = %game, call = %move_call, stage = %Stage::SponsorRequested, "requesting sponsorship");
                let cosigned = SponsorSession::new(sponsor, self.admin)
                    .cosign(&unsigned.tx_bytes)
                    .await?;
                (cosigned.tx_bytes, cosigned.signatures.to_vec())
            }
            None => {
                let signature = self
                    .admin
                    .sign_transaction(&unsigned.tx_bytes)
                    .map_err(|err| Error::ledger("transaction build", err))?;
                debug!(game = %game, call = %move_call, stage = %Stage::SelfSigned, "signed transaction");
                (unsigned.tx_bytes, vec![signature])
            }
        };

        let response = self
            .ledger
            .execute(&tx_bytes, &signatures)
            .await
            .map_err(|err| Error::ledger("transaction execution", err))?;
        debug!(game = %game, digest = %response.digest, stage = %Stage::Submitted, "transaction executed");

        let outcome = interpret(self.contract, call, game, response)?;
        info!(game = %game, call = %move_call, digest = outcome.digest(), stage = %Stage::Finalized, "house move finalized");
        Ok(outcome)
    }
}

/// Turn an execution response into an [Outcome], or the reason it is not one.
pub fn interpret(
    contract: &Contract,
    call: HouseCall<'_>,
    game: ObjectId,
    response: TransactionResponse,
) -> Result<Outcome> {
    let Some(effects) = response.effects else {
        return Err(Error::SubmissionFailed {
            digest: response.digest,
            status: "unknown".to_string(),
            error: Some("response carries no effects".to_string()),
        });
    };
    let digest = effects
        .transaction_digest
        .filter(|digest| !digest.is_empty())
        .unwrap_or(response.digest);
    if !effects.status.is_success() {
        warn!(game = %game, %digest, status = %effects.status.status, error = ?effects.status.error, "transaction failed");
        return Err(Error::SubmissionFailed {
            digest,
            status: effects.status.status,
            error: effects.status.error,
        });
    }

    match call {
        HouseCall::FirstDeal => Ok(Outcome::Dealt { digest }),
        HouseCall::Move {
            player_move: Move::Hit,
            ..
        } => {
            let events = response.events.unwrap_or_default();
            let event = hit_event(contract, &events, &game, &digest)?;
            Ok(Outcome::Hit { digest, event })
        }
        HouseCall::Move {
            player_move: Move::Stand,
            ..
        } => Ok(Outcome::Stood {
            digest,
            game_id: game,
        }),
    }
}

/// Locate the hit event for `game` among everything the transaction emitted.
fn hit_event(
    contract: &Contract,
    events: &[LedgerEvent],
    game: &ObjectId,
    digest: &str,
) -> Result<HitDoneEvent> {
    for event in events.iter().filter(|event| contract.is_hit_done(&event.event_type)) {
        match id_field(&event.parsed_json, "game_id") {
            Ok(owner) if owner == *game => {}
            Ok(owner) => {
                debug!(game = %game, other = %owner, digest, "ignoring hit event of another game");
                continue;
            }
            Err(reason) => {
                debug!(game = %game, digest, %reason, "ignoring hit event without a game id");
                continue;
            }
        }
        return parse_hit_event(&event.parsed_json).map_err(|reason| Error::MalformedEvent {
            digest: digest.to_string(),
            reason,
        });
    }
    Err(Error::EventMissing {
        digest: digest.to_string(),
    })
}

fn parse_hit_event(payload: &serde_json::Value) -> std::result::Result<HitDoneEvent, String> {
    Ok(HitDoneEvent {
        game_id: id_field(payload, "game_id")?,
        current_player_hand_sum: uint_field(payload, "current_player_hand_sum")?,
        player_cards: optional_bytes_field(payload, "player_cards")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{hit_done_event, sponsored, MockSponsor};
    use blackjack_house_types::{
        api::{ExecutionStatus, TransactionEffects},
        DEFAULT_MODULE,
    };
    use serde_json::json;

    fn id(value: &str) -> ObjectId {
        value.parse().unwrap()
    }

    fn contract() -> Contract {
        Contract::new(id("0x1"), DEFAULT_MODULE)
    }

    fn response(status: ExecutionStatus, events: Vec<LedgerEvent>) -> TransactionResponse {
        TransactionResponse {
            digest: "D1".to_string(),
            effects: Some(TransactionEffects {
                status,
                transaction_digest: Some("D1".to_string()),
            }),
            events: Some(events),
            object_changes: None,
        }
    }

    #[test]
    fn test_failure_status_is_not_success_even_with_digest() {
        let request = id("0xc");
        let hit = HouseCall::Move {
            player_move: Move::Hit,
            authorization: &request,
        };
        let err = interpret(
            &contract(),
            hit,
            id("0xa"),
            response(ExecutionStatus::failure("MoveAbort(3)"), vec![]),
        )
        .unwrap_err();
        match err {
            Error::SubmissionFailed {
                digest,
                status,
                error,
            } => {
                assert_eq!(digest, "D1");
                assert_eq!(status, "failure");
                assert_eq!(error.as_deref(), Some("MoveAbort(3)"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_hit_event_found_among_unrelated_events() {
        let request = id("0xc");
        let hit = HouseCall::Move {
            player_move: Move::Hit,
            authorization: &request,
        };
        let events = vec![
            LedgerEvent {
                event_type: "0x2::coin::CoinMinted".to_string(),
                parsed_json: json!({ "amount": "5" }),
            },
            hit_done_event(&contract(), id("0xff"), 12, vec![1, 2]),
            hit_done_event(&contract(), id("0xa"), 18, vec![10, 8]),
        ];
        let outcome = interpret(
            &contract(),
            hit,
            id("0xa"),
            response(ExecutionStatus::success(), events),
        )
        .unwrap();
        assert_eq!(
            outcome,
            Outcome::Hit {
                digest: "D1".to_string(),
                event: HitDoneEvent {
                    game_id: id("0xa"),
                    current_player_hand_sum: 18,
                    player_cards: vec![10, 8],
                },
            }
        );
    }

    #[test]
    fn test_hit_without_event_is_event_missing() {
        let request = id("0xc");
        let hit = HouseCall::Move {
            player_move: Move::Hit,
            authorization: &request,
        };
        let err = interpret(
            &contract(),
            hit,
            id("0xa"),
            response(ExecutionStatus::success(), vec![]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EventMissing { digest } if digest == "D1"));
    }

    #[test]
    fn test_malformed_hit_event() {
        let request = id("0xc");
        let hit = HouseCall::Move {
            player_move: Move::Hit,
            authorization: &request,
        };
        let event = LedgerEvent {
            event_type: contract().type_tag("HitDoneEvent"),
            parsed_json: json!({ "game_id": id("0xa").to_string() }),
        };
        let err = interpret(
            &contract(),
            hit,
            id("0xa"),
            response(ExecutionStatus::success(), vec![event]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedEvent { .. }));
    }

    #[test]
    fn test_stand_and_deal_outcomes() {
        let request = id("0xc");
        let stand = HouseCall::Move {
            player_move: Move::Stand,
            authorization: &request,
        };
        let outcome = interpret(
            &contract(),
            stand,
            id("0xa"),
            response(ExecutionStatus::success(), vec![]),
        )
        .unwrap();
        assert_eq!(
            outcome,
            Outcome::Stood {
                digest: "D1".to_string(),
                game_id: id("0xa"),
            }
        );

        let deal = HouseCall::FirstDeal;
        let outcome = interpret(
            &contract(),
            deal,
            id("0xa"),
            response(ExecutionStatus::success(), vec![]),
        )
        .unwrap();
        assert_eq!(
            outcome,
            Outcome::Dealt {
                digest: "D1".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_hit_event_of_another_game_is_skipped() {
        let request = id("0xc");
        let hit = HouseCall::Move {
            player_move: Move::Hit,
            authorization: &request,
        };
        let events = vec![
            LedgerEvent {
                event_type: contract().type_tag("HitDoneEvent"),
                parsed_json: json!({ "game_id": id("0xff").to_string() }),
            },
            LedgerEvent {
                event_type: contract().type_tag("HitDoneEvent"),
                parsed_json: json!({ "current_player_hand_sum": "30" }),
            },
            hit_done_event(&contract(), id("0xa"), 18, vec![10, 8]),
        ];
        let outcome = interpret(
            &contract(),
            hit,
            id("0xa"),
            response(ExecutionStatus::success(), events),
        )
        .unwrap();
        assert_eq!(
            outcome,
            Outcome::Hit {
                digest: "D1".to_string(),
                event: HitDoneEvent {
                    game_id: id("0xa"),
                    current_player_hand_sum: 18,
                    player_cards: vec![10, 8],
                },
            }
        );
    }

    #[test]
    fn test_only_foreign_hit_events_is_event_missing() {
        let request = id("0xc");
        let hit = HouseCall::Move {
            player_move: Move::Hit,
            authorization: &request,
        };
        let events = vec![LedgerEvent {
            event_type: contract().type_tag("HitDoneEvent"),
            parsed_json: json!({ "game_id": id("0xff").to_string() }),
        }];
        let err = interpret(
            &contract(),
            hit,
            id("0xa"),
            response(ExecutionStatus::success(), events),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EventMissing { digest } if digest == "D1"));
    }

    #[test]
    fn test_missing_effects_is_failure() {
        let deal = HouseCall::FirstDeal;
        let response = TransactionResponse {
            digest: "D2".to_string(),
            ..Default::default()
        };
        let err = interpret(&contract(), deal, id("0xa"), response).unwrap_err();
        assert!(matches!(err, Error::SubmissionFailed { digest, .. } if digest == "D2"));
    }

    #[tokio::test]
    async fn test_session_orders_house_signature_first() {
        let admin = AdminKeypair::from_bytes(&[5u8; 32]).unwrap();
        let sponsor = MockSponsor::new();
        let cosigned = SponsorSession::new(&sponsor, &admin)
            .cosign("AAEC")
            .await
            .unwrap();
        assert_eq!(cosigned.tx_bytes, sponsored("AAEC"));
        assert_eq!(
            cosigned.signatures[0],
            admin.sign_transaction(&sponsored("AAEC")).unwrap()
        );
        assert_eq!(cosigned.signatures[1], MockSponsor::SIGNATURE);
        assert_eq!(sponsor.requests(), vec![(admin.address(), "AAEC".to_string())]);
    }

    #[tokio::test]
    async fn test_session_surfaces_sponsor_failures() {
        let admin = AdminKeypair::from_bytes(&[5u8; 32]).unwrap();
        let sponsor = MockSponsor::failing(SponsorError::Unavailable("down".to_string()));
        let err = SponsorSession::new(&sponsor, &admin)
            .cosign("AAEC")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SponsorUnavailable(reason) if reason == "down"));

        let sponsor = MockSponsor::failing(SponsorError::Rejected("no gas".to_string()));
        let err = SponsorSession::new(&sponsor, &admin)
            .cosign("AAEC")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SponsorRejected(reason) if reason == "no gas"));
    }
}
