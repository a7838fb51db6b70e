use crate::{
    contract::Contract,
    fields::{id_field, uint_field},
    ledger::Ledger,
    Error, Result,
};
use blackjack_house_types::{api::ObjectData, Address, AuthorizationRequest, Move, ObjectId};
use tracing::{debug, error, warn};

/// Find the request object authorizing `player_move` on `game` at `player_sum`.
///
/// Returns `Ok(None)` when no request matches.
pub async fn find_authorization<L: Ledger>(
    ledger: &L,
    contract: &Contract,
    owner: &Address,
    game: &ObjectId,
    player_move: Move,
    player_sum: u16,
) -> Result<Option<AuthorizationRequest>> {
    let request_type = contract.request_type(player_move);
    let objects = ledger
        .get_owned_objects(owner, &request_type)
        .await
        .map_err(|err| Error::ledger("owned object query", err))?;
    debug!(
        %owner,
        game = %game,
        %player_move,
        candidates = objects.len(),
        "listed authorization requests"
    );

    let candidates = objects
        .iter()
        .filter(|object| {
            object
                .type_tag()
                .is_some_and(|tag| contract.is_type(tag, player_move.request_struct()))
        })
        .filter_map(|object| match parse_request(object, player_move) {
            Ok(request) => Some(request),
            Err(reason) => {
                warn!(object = %object.object_id, %reason, "skipping malformed request");
                None
            }
        })
        .collect::<Vec<_>>();
    Ok(select(candidates, game, player_move, player_sum))
}

/// Pick the unique request matching `(game, player_move, player_sum)`.
///
/// More than one match should never happen; it is logged and the lowest object
/// id wins so the choice is stable.
pub fn select(
    candidates: impl IntoIterator<Item = AuthorizationRequest>,
    game: &ObjectId,
    player_move: Move,
    player_sum: u16,
) -> Option<AuthorizationRequest> {
    let mut matches = candidates
        .into_iter()
        .filter(|request| {
            request.game_id == *game
                && request.player_move == player_move
                && request.expected_player_sum == player_sum
        })
        .collect::<Vec<_>>();
    matches.sort_by_key(|request| request.id);
    if matches.len() > 1 {
        let ids = matches
            .iter()
            .map(|request| request.id.to_string())
            .collect::<Vec<_>>();
        error!(
            game = %game,
            %player_move,
            player_sum,
            ?ids,
            "multiple authorization requests match"
        );
    }
    matches.into_iter().next()
}

fn parse_request(
    object: &ObjectData,
    player_move: Move,
) -> std::result::Result<AuthorizationRequest, String> {
    let fields = object.fields().ok_or("object has no content")?;
    Ok(AuthorizationRequest {
        id: object.object_id,
        game_id: id_field(fields, "game_id")?,
        player_move,
        expected_player_sum: uint_field(fields, "current_player_sum")?,
    })
}
