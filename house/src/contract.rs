use blackjack_house_types::{
    api::{CallArg, MoveCall},
    matches_type, type_tag, Move, ObjectId, FIRST_DEAL_FUNCTION, GAME_STRUCT, HIT_DONE_EVENT,
};

/// Location of the game module on the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contract {
    pub package: ObjectId,
    pub module: String,
}

/// Entry point the house calls on behalf of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HouseCall<'a> {
    FirstDeal,
    Move {
        player_move: Move,
        authorization: &'a ObjectId,
    },
}

impl HouseCall<'_> {
    pub fn function(&self) -> &'static str {
        match self {
            HouseCall::FirstDeal => FIRST_DEAL_FUNCTION,
            HouseCall::Move { player_move, .. } => player_move.function(),
        }
    }
}

impl Contract {
    pub fn new(package: ObjectId, module: impl Into<String>) -> Self {
        Self {
            package,
            module: module.into(),
        }
    }

    pub fn type_tag(&self, name: &str) -> String {
        type_tag(&self.package, &self.module, name)
    }

    pub fn is_type(&self, tag: &str, name: &str) -> bool {
        matches_type(tag, &self.package, &self.module, name)
    }

    pub fn is_game(&self, tag: &str) -> bool {
        self.is_type(tag, GAME_STRUCT)
    }

    pub fn is_hit_done(&self, tag: &str) -> bool {
        self.is_type(tag, HIT_DONE_EVENT)
    }

    /// Type of the request object that authorizes `player_move`.
    pub fn request_type(&self, player_move: Move) -> String {
        self.type_tag(player_move.request_struct())
    }

    /// Build the call `(game, commitment, house_data[, authorization])`.
    pub fn call(
        &self,
        call: HouseCall<'_>,
        game: ObjectId,
        commitment: Vec<u8>,
        house_data: ObjectId,
    ) -> MoveCall {
        let mut arguments = vec![
            CallArg::Object(game),
            CallArg::Bytes(commitment),
            CallArg::Object(house_data),
        ];
        if let HouseCall::Move { authorization, .. } = call {
            arguments.push(CallArg::Object(*authorization));
        }
        MoveCall {
            package: self.package,
            module: self.module.clone(),
            function: call.function().to_string(),
            arguments,
        }
    }
}
