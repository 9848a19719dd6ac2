//! Packet types for coop-relay's wire format.
//!
//! Every message on the wire is one JSON object: a handful of optional
//! envelope fields (`roomId`, `targetClientId`, `quiet`), a required
//! `type` discriminator, and whatever fields that type carries. Anything
//! else, such as a client's own `clientId`, rides along untouched.
//!
//! ```json
//! {"type":"UPDATE_CLIENT_DATA","roomId":"castle","data":{"hp":3}}
//! ```
//!
//! On the Rust side the discriminator becomes [`Payload`], an enum the
//! router matches exhaustively. Fields the server doesn't interpret are
//! kept so a forwarded packet reaches its peers unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ProtocolError;

/// A JSON object with fields the relay doesn't interpret.
pub type Fields = Map<String, Value>;

/// A client's state snapshot. Opaque to the server.
pub type ClientData = Map<String, Value>;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected client.
///
/// Serialized as a plain number, so `ClientId(42)` is `42` on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A unique identifier for a room, generated when the room is created.
///
/// Rooms are joined by name; the id only identifies the instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Which members of a room a fan-out should reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every member, the sender included.
    All,
    /// Every member except the given client.
    AllExcept(ClientId),
    /// One specific member.
    Client(ClientId),
}

impl Recipient {
    /// Returns `true` if `client` is covered by this recipient set.
    pub fn includes(&self, client: ClientId) -> bool {
        match self {
            Recipient::All => true,
            Recipient::AllExcept(excluded) => *excluded != client,
            Recipient::Client(target) => *target == client,
        }
    }
}

// ---------------------------------------------------------------------------
// PacketType
// ---------------------------------------------------------------------------

/// The known values of the `type` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PacketType {
    UpdateClientData,
    AllClientData,
    /// Only ever produced by the server.
    ServerMessage,
    DisableAnchor,
    RequestSaveState,
    PushSaveState,
    GameComplete,
    Heartbeat,
    SetSceneFlag,
    GiveItem,
}

impl PacketType {
    /// Every known packet type, in declaration order.
    pub const ALL: [PacketType; 10] = [
        PacketType::UpdateClientData,
        PacketType::AllClientData,
        PacketType::ServerMessage,
        PacketType::DisableAnchor,
        PacketType::RequestSaveState,
        PacketType::PushSaveState,
        PacketType::GameComplete,
        PacketType::Heartbeat,
        PacketType::SetSceneFlag,
        PacketType::GiveItem,
    ];

    /// The string used for this type on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            PacketType::UpdateClientData => "UPDATE_CLIENT_DATA",
            PacketType::AllClientData => "ALL_CLIENT_DATA",
            PacketType::ServerMessage => "SERVER_MESSAGE",
            PacketType::DisableAnchor => "DISABLE_ANCHOR",
            PacketType::RequestSaveState => "REQUEST_SAVE_STATE",
            PacketType::PushSaveState => "PUSH_SAVE_STATE",
            PacketType::GameComplete => "GAME_COMPLETE",
            PacketType::Heartbeat => "HEARTBEAT",
            PacketType::SetSceneFlag => "SET_SCENE_FLAG",
            PacketType::GiveItem => "GIVE_ITEM",
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PacketType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PacketType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                ProtocolError::InvalidMessage(format!("unknown packet type {s:?}"))
            })
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The optional routing fields every packet may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Name of the room to join if the sender isn't in one yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,

    /// Deliver to this room-mate only, bypassing type dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_client_id: Option<ClientId>,

    /// Parsed and forwarded; no handler consults it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,
}

impl Envelope {
    /// The room join key, treating an empty string as absent.
    pub fn room_name(&self) -> Option<&str> {
        self.room_id.as_deref().filter(|name| !name.is_empty())
    }

    /// The unicast target, treating `0` as absent.
    pub fn target(&self) -> Option<ClientId> {
        self.target_client_id.filter(|id| id.0 != 0)
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// `UPDATE_CLIENT_DATA`: the sender's latest state snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateClientData {
    #[serde(default)]
    pub data: ClientData,
    #[serde(flatten)]
    pub extra: Fields,
}

/// `ALL_CLIENT_DATA`: a bundle of snapshots for the rest of the room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllClientData {
    #[serde(default)]
    pub clients: Vec<ClientData>,
    #[serde(flatten)]
    pub extra: Fields,
}

/// `SERVER_MESSAGE`: human-readable text from the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub message: String,
    #[serde(flatten)]
    pub extra: Fields,
}

/// The body of a packet, selected by its `type`.
///
/// Types without an enforced schema keep their fields as an opaque
/// [`Fields`] object. A `type` the server doesn't know becomes
/// [`Payload::Unrecognized`] so the envelope rules still apply to it.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    UpdateClientData(UpdateClientData),
    AllClientData(AllClientData),
    ServerMessage(ServerMessage),
    DisableAnchor(Fields),
    RequestSaveState(Fields),
    PushSaveState(Fields),
    GameComplete(Fields),
    Heartbeat(Fields),
    SetSceneFlag(Fields),
    GiveItem(Fields),
    Unrecognized { type_name: String, fields: Fields },
}

impl Payload {
    /// Builds a payload from a `type` string and the remaining fields.
    pub fn from_parts(
        type_name: String,
        fields: Fields,
    ) -> Result<Self, ProtocolError> {
        let Ok(packet_type) = type_name.parse::<PacketType>() else {
            return Ok(Payload::Unrecognized { type_name, fields });
        };

        let payload = match packet_type {
            PacketType::UpdateClientData => Payload::UpdateClientData(
                serde_json::from_value(Value::Object(fields))
                    .map_err(ProtocolError::Decode)?,
            ),
            PacketType::AllClientData => Payload::AllClientData(
                serde_json::from_value(Value::Object(fields))
                    .map_err(ProtocolError::Decode)?,
            ),
            PacketType::ServerMessage => Payload::ServerMessage(
                serde_json::from_value(Value::Object(fields))
                    .map_err(ProtocolError::Decode)?,
            ),
            PacketType::DisableAnchor => Payload::DisableAnchor(fields),
            PacketType::RequestSaveState => Payload::RequestSaveState(fields),
            PacketType::PushSaveState => Payload::PushSaveState(fields),
            PacketType::GameComplete => Payload::GameComplete(fields),
            PacketType::Heartbeat => Payload::Heartbeat(fields),
            PacketType::SetSceneFlag => Payload::SetSceneFlag(fields),
            PacketType::GiveItem => Payload::GiveItem(fields),
        };
        Ok(payload)
    }

    /// Splits the payload back into its `type` string and fields.
    pub fn into_parts(self) -> (String, Fields) {
        let type_name = self.type_name().to_string();
        let fields = match self {
            Payload::UpdateClientData(UpdateClientData { data, mut extra }) => {
                extra.insert("data".into(), Value::Object(data));
                extra
            }
            Payload::AllClientData(AllClientData { clients, mut extra }) => {
                let clients = clients.into_iter().map(Value::Object).collect();
                extra.insert("clients".into(), Value::Array(clients));
                extra
            }
            Payload::ServerMessage(ServerMessage { message, mut extra }) => {
                extra.insert("message".into(), Value::String(message));
                extra
            }
            Payload::DisableAnchor(fields)
            | Payload::RequestSaveState(fields)
            | Payload::PushSaveState(fields)
            | Payload::GameComplete(fields)
            | Payload::Heartbeat(fields)
            | Payload::SetSceneFlag(fields)
            | Payload::GiveItem(fields)
            | Payload::Unrecognized { fields, .. } => fields,
        };
        (type_name, fields)
    }

    /// The known packet type, or `None` for [`Payload::Unrecognized`].
    pub fn packet_type(&self) -> Option<PacketType> {
        let packet_type = match self {
            Payload::UpdateClientData(_) => PacketType::UpdateClientData,
            Payload::AllClientData(_) => PacketType::AllClientData,
            Payload::ServerMessage(_) => PacketType::ServerMessage,
            Payload::DisableAnchor(_) => PacketType::DisableAnchor,
            Payload::RequestSaveState(_) => PacketType::RequestSaveState,
            Payload::PushSaveState(_) => PacketType::PushSaveState,
            Payload::GameComplete(_) => PacketType::GameComplete,
            Payload::Heartbeat(_) => PacketType::Heartbeat,
            Payload::SetSceneFlag(_) => PacketType::SetSceneFlag,
            Payload::GiveItem(_) => PacketType::GiveItem,
            Payload::Unrecognized { .. } => return None,
        };
        Some(packet_type)
    }

    /// The `type` string as it appears on the wire.
    pub fn type_name(&self) -> &str {
        match self {
            Payload::Unrecognized { type_name, .. } => type_name,
            known => known
                .packet_type()
                .map(PacketType::as_str)
                .unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// One complete message: envelope plus payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPacket", into = "RawPacket")]
pub struct Packet {
    pub envelope: Envelope,
    pub payload: Payload,
}

impl Packet {
    /// Creates a packet with an empty envelope.
    pub fn new(payload: Payload) -> Self {
        Self {
            envelope: Envelope::default(),
            payload,
        }
    }

    /// A `SERVER_MESSAGE` carrying `message`.
    pub fn server_message(message: impl Into<String>) -> Self {
        Self::new(Payload::ServerMessage(ServerMessage {
            message: message.into(),
            extra: Fields::new(),
        }))
    }

    /// Sets the room join key.
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.envelope.room_id = Some(room.into());
        self
    }

    /// Sets the unicast target.
    pub fn with_target(mut self, target: ClientId) -> Self {
        self.envelope.target_client_id = Some(target);
        self
    }

    /// The `type` string as it appears on the wire.
    pub fn type_name(&self) -> &str {
        self.payload.type_name()
    }
}

/// Wire shape of a packet, used only for (de)serialization.
#[derive(Serialize, Deserialize)]
struct RawPacket {
    #[serde(flatten)]
    envelope: Envelope,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(flatten)]
    fields: Fields,
}

impl TryFrom<RawPacket> for Packet {
    type Error = ProtocolError;

    fn try_from(raw: RawPacket) -> Result<Self, Self::Error> {
        Ok(Packet {
            envelope: raw.envelope,
            payload: Payload::from_parts(raw.type_name, raw.fields)?,
        })
    }
}

impl From<Packet> for RawPacket {
    fn from(packet: Packet) -> Self {
        let (type_name, fields) = packet.payload.into_parts();
        RawPacket {
            envelope: packet.envelope,
            type_name,
            fields,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
