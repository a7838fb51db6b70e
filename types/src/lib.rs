pub mod api;
pub mod game;

pub use game::{
    Address, AuthorizationRequest, GameRecord, HitDoneEvent, Move, ObjectId, ObjectIdError,
    SigningMessage,
};

/// Name of the on-chain module implementing the game.
pub const DEFAULT_MODULE: &str = "single_player_blackjack";

/// Name of the entry function that performs the initial deal.
pub const FIRST_DEAL_FUNCTION: &str = "first_deal";

/// Name of the game object struct.
pub const GAME_STRUCT: &str = "Game";

/// Name of the event emitted after a successful hit.
pub const HIT_DONE_EVENT: &str = "HitDoneEvent";

/// Gas budget attached to every house transaction.
pub const DEFAULT_GAS_BUDGET: u64 = 10_000_000_000;

/// Fully qualified type tag of a struct or event declared by the game module.
pub fn type_tag(package: &ObjectId, module: &str, name: &str) -> String {
    format!("{package}::{module}::{name}")
}

/// Whether `tag` names `package::module::name`, tolerating short address forms.
///
/// Generic instantiations (`...::Name<T>`) do not match.
pub fn matches_type(tag: &str, package: &ObjectId, module: &str, name: &str) -> bool {
    let mut parts = tag.splitn(3, "::");
    let (Some(address), Some(tag_module), Some(tag_name)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    tag_module == module
        && tag_name == name
        && address.parse::<ObjectId>().map_or(false, |address| &address == package)
}
