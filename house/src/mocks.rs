//! In-memory [Ledger] and [Sponsor] implementations for tests.

use crate::{
    contract::Contract,
    ledger::{Ledger, Sponsor, SponsorError},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use blackjack_house_types::{
    api::{
        CallArg, ExecutionStatus, LedgerEvent, MoveCall, ObjectContent, ObjectData,
        SponsoredTransaction, TransactionBytes, TransactionEffects, TransactionResponse,
    },
    Address, Move, ObjectId, GAME_STRUCT, HIT_DONE_EVENT,
};
use serde_json::{json, Value};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    io,
    sync::{Arc, Mutex},
};

/// Marker the mock sponsor appends to a transaction to stand in for its gas payment.
const SPONSOR_SUFFIX: &[u8] = b"+gas";

/// Transaction bytes as rewritten by [MockSponsor].
pub fn sponsored(tx_bytes: &str) -> String {
    let mut bytes = STANDARD.decode(tx_bytes).unwrap_or_default();
    bytes.extend_from_slice(SPONSOR_SUFFIX);
    STANDARD.encode(bytes)
}

fn unsponsored(tx_bytes: &str) -> Option<String> {
    let bytes = STANDARD.decode(tx_bytes).ok()?;
    let original = bytes.strip_suffix(SPONSOR_SUFFIX)?;
    Some(STANDARD.encode(original))
}

pub fn game_object(contract: &Contract, id: ObjectId, fields: Value) -> ObjectData {
    let object_type = contract.type_tag(GAME_STRUCT);
    ObjectData {
        object_id: id,
        object_type: Some(object_type.clone()),
        content: Some(ObjectContent {
            data_type: "moveObject".to_string(),
            object_type,
            fields,
        }),
    }
}

/// A game at `counter` with the given randomness and player sum.
pub fn game(
    contract: &Contract,
    id: ObjectId,
    counter: u8,
    user_randomness: &[u8],
    player_sum: u16,
) -> ObjectData {
    game_object(
        contract,
        id,
        json!({
            "id": { "id": id.to_string() },
            "counter": counter,
            "user_randomness": user_randomness,
            "player_sum": player_sum.to_string(),
            "player_cards": [],
        }),
    )
}

pub fn request_object(
    contract: &Contract,
    id: ObjectId,
    player_move: Move,
    game: ObjectId,
    player_sum: u16,
) -> ObjectData {
    let object_type = contract.request_type(player_move);
    ObjectData {
        object_id: id,
        object_type: Some(object_type.clone()),
        content: Some(ObjectContent {
            data_type: "moveObject".to_string(),
            object_type,
            fields: json!({
                "id": { "id": id.to_string() },
                "game_id": game.to_string(),
                "current_player_sum": player_sum.to_string(),
            }),
        }),
    }
}

pub fn hit_done_event(
    contract: &Contract,
    game: ObjectId,
    player_sum: u16,
    player_cards: Vec<u8>,
) -> LedgerEvent {
    LedgerEvent {
        event_type: contract.type_tag(HIT_DONE_EVENT),
        parsed_json: json!({
            "game_id": game.to_string(),
            "current_player_hand_sum": player_sum.to_string(),
            "player_cards": player_cards,
        }),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Execution {
    pub tx_bytes: String,
    pub signatures: Vec<String>,
    pub call: Option<MoveCall>,
}

#[derive(Default)]
struct State {
    objects: HashMap<ObjectId, ObjectData>,
    owned: HashMap<Address, Vec<ObjectData>>,
    read_failure: Option<String>,
    built: HashMap<String, MoveCall>,
    build_log: Vec<(Address, MoveCall, u64)>,
    executions: Vec<Execution>,
    scripted: VecDeque<TransactionResponse>,
    hit_results: HashMap<ObjectId, (u16, Vec<u8>)>,
    known_transactions: HashSet<String>,
    wait_log: Vec<String>,
}

/// Ledger whose objects and transaction results are set up by the test.
///
/// Unless a response is scripted, every execution succeeds with digest
/// `digest-<n>`, and a hit emits a hit event if one was registered for its
/// game with [MockLedger::set_hit_result].
#[derive(Clone)]
pub struct MockLedger {
    contract: Option<Contract>,
    state: Arc<Mutex<State>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            contract: None,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// A ledger that knows the event types of `contract`.
    pub fn for_contract(contract: Contract) -> Self {
        Self {
            contract: Some(contract),
            ..Self::new()
        }
    }

    pub fn insert_object(&self, object: ObjectData) {
        let mut state = self.state.lock().unwrap();
        state.objects.insert(object.object_id, object);
    }

    pub fn insert_owned(&self, owner: Address, object: ObjectData) {
        let mut state = self.state.lock().unwrap();
        state.owned.entry(owner).or_default().push(object);
    }

    pub fn fail_reads(&self, reason: &str) {
        self.state.lock().unwrap().read_failure = Some(reason.to_string());
    }

    pub fn script_response(&self, response: TransactionResponse) {
        self.state.lock().unwrap().scripted.push_back(response);
    }

    pub fn set_hit_result(&self, game: ObjectId, player_sum: u16, player_cards: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        state.hit_results.insert(game, (player_sum, player_cards));
    }

    pub fn add_transaction(&self, digest: &str) {
        let mut state = self.state.lock().unwrap();
        state.known_transactions.insert(digest.to_string());
    }

    pub fn builds(&self) -> Vec<(Address, MoveCall, u64)> {
        self.state.lock().unwrap().build_log.clone()
    }

    pub fn executions(&self) -> Vec<Execution> {
        self.state.lock().unwrap().executions.clone()
    }

    pub fn waits(&self) -> Vec<String> {
        self.state.lock().unwrap().wait_log.clone()
    }

    fn check_reads(state: &State) -> Result<(), io::Error> {
        match &state.read_failure {
            Some(reason) => Err(io::Error::new(io::ErrorKind::ConnectionReset, reason.clone())),
            None => Ok(()),
        }
    }

    fn default_response(&self, state: &State, call: Option<&MoveCall>) -> TransactionResponse {
        let digest = format!("digest-{}", state.executions.len());
        let mut events = Vec::new();
        if let (Some(contract), Some(call)) = (&self.contract, call) {
            if call.function == Move::Hit.function() {
                if let Some(CallArg::Object(game)) = call.arguments.first() {
                    if let Some((sum, cards)) = state.hit_results.get(game) {
                        events.push(hit_done_event(contract, *game, *sum, cards.clone()));
                    }
                }
            }
        }
        TransactionResponse {
            digest: digest.clone(),
            effects: Some(TransactionEffects {
                status: ExecutionStatus::success(),
                transaction_digest: Some(digest),
            }),
            events: Some(events),
            object_changes: None,
        }
    }
}

impl Ledger for MockLedger {
    type Error = io::Error;

    async fn get_object(&self, id: &ObjectId) -> Result<Option<ObjectData>, Self::Error> {
        let state = self.state.lock().unwrap();
        Self::check_reads(&state)?;
        Ok(state.objects.get(id).cloned())
    }

    async fn get_owned_objects(
        &self,
        owner: &Address,
        struct_type: &str,
    ) -> Result<Vec<ObjectData>, Self::Error> {
        let state = self.state.lock().unwrap();
        Self::check_reads(&state)?;
        Ok(state
            .owned
            .get(owner)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|object| object.type_tag() == Some(struct_type))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn build_transaction(
        &self,
        sender: &Address,
        call: &MoveCall,
        gas_budget: u64,
    ) -> Result<TransactionBytes, Self::Error> {
        let mut state = self.state.lock().unwrap();
        let tx_bytes = STANDARD.encode(format!("{call}#{}", state.build_log.len()));
        state.built.insert(tx_bytes.clone(), call.clone());
        state.build_log.push((*sender, call.clone(), gas_budget));
        Ok(TransactionBytes { tx_bytes })
    }

    async fn execute(
        &self,
        tx_bytes: &str,
        signatures: &[String],
    ) -> Result<TransactionResponse, Self::Error> {
        let mut state = self.state.lock().unwrap();
        let call = state
            .built
            .get(tx_bytes)
            .or_else(|| unsponsored(tx_bytes).and_then(|original| state.built.get(&original)))
            .cloned();
        let response = match state.scripted.pop_front() {
            Some(response) => response,
            None => self.default_response(&state, call.as_ref()),
        };
        state.executions.push(Execution {
            tx_bytes: tx_bytes.to_string(),
            signatures: signatures.to_vec(),
            call,
        });
        Ok(response)
    }

    async fn wait_for_transaction(&self, digest: &str) -> Result<TransactionResponse, Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.wait_log.push(digest.to_string());
        if !state.known_transactions.contains(digest) {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("transaction {digest} not found"),
            ));
        }
        Ok(TransactionResponse {
            digest: digest.to_string(),
            effects: Some(TransactionEffects {
                status: ExecutionStatus::success(),
                transaction_digest: Some(digest.to_string()),
            }),
            ..Default::default()
        })
    }
}

/// Sponsor that appends a gas marker to the transaction and signs with a fixed string.
#[derive(Clone, Default)]
pub struct MockSponsor {
    failure: Option<SponsorError>,
    requests: Arc<Mutex<Vec<(Address, String)>>>,
}

impl MockSponsor {
    pub const SIGNATURE: &'static str = "sponsor-signature";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: SponsorError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<(Address, String)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Sponsor for MockSponsor {
    async fn sponsor(
        &self,
        sender: &Address,
        tx_bytes: &str,
    ) -> Result<SponsoredTransaction, SponsorError> {
        self.requests
            .lock()
            .unwrap()
            .push((*sender, tx_bytes.to_string()));
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(SponsoredTransaction {
            tx_bytes: sponsored(tx_bytes),
            signature: Self::SIGNATURE.to_string(),
        })
    }
}
