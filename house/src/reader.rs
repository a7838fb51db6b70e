use crate::{
    contract::Contract,
    fields::{bytes_field, optional_bytes_field, uint_field},
    ledger::Ledger,
    Error, Result,
};
use blackjack_house_types::{api::ObjectData, GameRecord, ObjectId};
use tracing::debug;

/// Read the current state of `game`. Never cached; callers read immediately
/// before signing.
pub async fn fetch_game_state<L: Ledger>(
    ledger: &L,
    contract: &Contract,
    game: &ObjectId,
) -> Result<GameRecord> {
    let object = ledger
        .get_object(game)
        .await
        .map_err(|err| Error::StateUnavailable {
            object: *game,
            reason: err.to_string(),
        })?
        .ok_or(Error::NotFound(*game))?;
    let record = parse_game(contract, game, &object)?;
    debug!(
        game = %game,
        counter = record.counter,
        player_sum = record.player_sum,
        "read game state"
    );
    Ok(record)
}

/// Decode a game object. Objects of any other type are reported as [Error::NotFound].
pub fn parse_game(contract: &Contract, game: &ObjectId, object: &ObjectData) -> Result<GameRecord> {
    match object.type_tag() {
        Some(tag) if contract.is_game(tag) => {}
        _ => return Err(Error::NotFound(*game)),
    }
    let malformed = |reason: String| Error::MalformedState {
        object: *game,
        reason,
    };
    let fields = object
        .fields()
        .ok_or_else(|| malformed("object has no content".to_string()))?;

    let user_randomness = bytes_field(fields, "user_randomness").map_err(malformed)?;
    if user_randomness.is_empty() {
        return Err(malformed("user_randomness is empty".to_string()));
    }
    Ok(GameRecord {
        id: *game,
        counter: uint_field(fields, "counter").map_err(malformed)?,
        user_randomness,
        player_sum: uint_field(fields, "player_sum").map_err(malformed)?,
        player_cards: optional_bytes_field(fields, "player_cards").map_err(malformed)?,
    })
}
