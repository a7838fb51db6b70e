use commonware_utils::{from_hex, hex};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Length of a ledger object id or account address.
pub const OBJECT_ID_LENGTH: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjectIdError {
    #[error("object id is empty")]
    Empty,
    #[error("object id too long (len={len}, max={max})")]
    TooLong { len: usize, max: usize },
    #[error("object id must be hex: {0}")]
    InvalidHex(String),
}

/// Identifier of a ledger object (or account address, which shares the format).
///
/// Parsed from `0x`-prefixed hex. Short forms (`0x6`) are left-padded with zeros,
/// and [fmt::Display] always renders the canonical 64-character lowercase form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; OBJECT_ID_LENGTH]);

/// Account addresses use the same 32-byte representation as object ids.
pub type Address = ObjectId;

impl ObjectId {
    pub const fn new(bytes: [u8; OBJECT_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LENGTH] {
        &self.0
    }

    /// Abbreviated form used in log lines (`0x1234…abcd`).
    pub fn short(&self) -> String {
        let full = hex(&self.0);
        format!("0x{}…{}", &full[..4], &full[full.len() - 4..])
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(ObjectIdError::Empty);
        }
        let max = OBJECT_ID_LENGTH * 2;
        if digits.len() > max {
            return Err(ObjectIdError::TooLong {
                len: digits.len(),
                max,
            });
        }
        let padded = format!("{digits:0>max$}");
        let bytes = from_hex(&padded).ok_or_else(|| ObjectIdError::InvalidHex(value.to_string()))?;
        let bytes: [u8; OBJECT_ID_LENGTH] = bytes
            .try_into()
            .map_err(|_| ObjectIdError::InvalidHex(value.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex(&self.0))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// A player intent the house answers on-chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Hit,
    Stand,
}

impl Move {
    /// Entry function invoked for this move.
    pub fn function(&self) -> &'static str {
        match self {
            Move::Hit => "hit",
            Move::Stand => "stand",
        }
    }

    /// Struct name of the request object that authorizes this move.
    pub fn request_struct(&self) -> &'static str {
        match self {
            Move::Hit => "HitRequest",
            Move::Stand => "StandRequest",
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.function()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Move {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "hit" => Ok(Move::Hit),
            "stand" => Ok(Move::Stand),
            other => Err(format!("unknown move: {other}")),
        }
    }
}

/// The fields of an on-chain game the house depends on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameRecord {
    pub id: ObjectId,
    /// Incremented by the contract once per accepted move.
    pub counter: u8,
    /// Randomness contributed by the player at game creation.
    pub user_randomness: Vec<u8>,
    pub player_sum: u16,
    pub player_cards: Vec<u8>,
}

impl GameRecord {
    /// Message the house must sign to advance this game by one move.
    pub fn signing_message(&self) -> SigningMessage {
        SigningMessage::new(&self.user_randomness, self.counter)
    }
}

/// `hex(user_randomness) ++ hex([counter])`, lowercase and without separators.
///
/// The contract reconstructs the same bytes from its own state
/// (`user_randomness` with `counter` appended), so the layout must not change.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningMessage {
    hex: String,
    bytes: Vec<u8>,
}

impl SigningMessage {
    pub fn new(user_randomness: &[u8], counter: u8) -> Self {
        let mut bytes = Vec::with_capacity(user_randomness.len() + 1);
        bytes.extend_from_slice(user_randomness);
        bytes.push(counter);

        let mut hex_message = hex(user_randomness);
        hex_message.push_str(&hex(&[counter]));

        Self {
            hex: hex_message,
            bytes,
        }
    }

    /// Hex form of the message.
    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// Bytes encoded by [Self::as_hex], which is what gets signed.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for SigningMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

impl fmt::Debug for SigningMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningMessage({})", self.hex)
    }
}

/// A single-use request object, owned by the house, that authorizes one move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub id: ObjectId,
    pub game_id: ObjectId,
    pub player_move: Move,
    /// Player sum the request was issued against.
    pub expected_player_sum: u16,
}

/// Payload of the event emitted by a successful hit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitDoneEvent {
    pub game_id: ObjectId,
    pub current_player_hand_sum: u16,
    #[serde(default)]
    pub player_cards: Vec<u8>,
}
