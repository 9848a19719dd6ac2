//! Packet routing: room join, unicast override, then dispatch by type.
//!
//! [`route`] is synchronous and runs with the registry lock held, so
//! every step for one packet sees a consistent view of rooms and
//! members. Sends only enqueue onto each recipient's outbound channel;
//! the actual socket writes happen in the per-client writer tasks.

use coop_relay_protocol::{ClientId, Codec, Packet, Payload, Recipient, encode_frame};

use crate::{RelayError, Registry};

/// Sent to a client that asks for a save state with nobody to ask.
pub const NO_PEERS_MESSAGE: &str = "No other clients available to request save state.";

/// Sent to a client once its save-state request went out to its peers.
pub const SAVE_STATE_REQUESTED_MESSAGE: &str = "Save State Requested";

/// Routes one decoded packet from `sender`.
///
/// In order:
/// 1. A `roomId` joins the sender to that room if it isn't in one yet.
/// 2. A `targetClientId` delivers the packet to that client alone, if it
///    shares the sender's room, and skips type dispatch entirely.
/// 3. Otherwise the packet is dispatched on its `type`.
///
/// Routing misses are logged and return `Ok`. Errors only come from an
/// unregistered sender or a packet that fails to encode.
pub fn route<C: Codec>(
    registry: &mut Registry,
    codec: &C,
    sender: ClientId,
    packet: Packet,
) -> Result<(), RelayError> {
    if let Some(name) = packet.envelope.room_name() {
        registry.join_room(sender, name)?;
    }

    if let Some(target) = packet.envelope.target() {
        return unicast(registry, codec, sender, target, &packet);
    }

    dispatch(registry, codec, sender, &packet)
}

fn unicast<C: Codec>(
    registry: &Registry,
    codec: &C,
    sender: ClientId,
    target: ClientId,
    packet: &Packet,
) -> Result<(), RelayError> {
    let Some(room) = registry.room_of(sender).filter(|room| room.contains(target)) else {
        tracing::debug!(
            %sender,
            %target,
            packet_type = packet.type_name(),
            "unicast target not in sender's room, dropping"
        );
        return Ok(());
    };

    let frame = encode_frame(codec, packet)?;
    room.send_to(target, frame);
    tracing::debug!(%sender, %target, packet_type = packet.type_name(), "packet unicast");
    Ok(())
}

fn dispatch<C: Codec>(
    registry: &mut Registry,
    codec: &C,
    sender: ClientId,
    packet: &Packet,
) -> Result<(), RelayError> {
    match &packet.payload {
        Payload::UpdateClientData(update) => {
            registry.update_client_data(sender, update.data.clone())?;
        }

        Payload::AllClientData(_) => {
            // Resolved by membership scan rather than the cached room.
            match registry.room_containing(sender) {
                Some(room) => {
                    let frame = encode_frame(codec, packet)?;
                    room.broadcast(&frame, Recipient::AllExcept(sender));
                }
                None => tracing::debug!(%sender, "client data bundle from client without a room"),
            }
        }

        Payload::SetSceneFlag(_) | Payload::GiveItem(_) => {
            match registry.room_of(sender) {
                Some(room) => {
                    let frame = encode_frame(codec, packet)?;
                    room.broadcast(&frame, Recipient::All);
                }
                None => tracing::debug!(
                    %sender,
                    packet_type = packet.type_name(),
                    "no room to forward to"
                ),
            }
        }

        Payload::RequestSaveState(_) => request_save_state(registry, codec, sender, packet)?,

        Payload::PushSaveState(_) => push_save_state(registry, codec, sender, packet)?,

        Payload::DisableAnchor(_) => {
            tracing::info!(%sender, "anchor disabled");
        }

        Payload::GameComplete(_) => {
            tracing::info!(%sender, "game complete");
        }

        Payload::Heartbeat(_) => {
            tracing::debug!(%sender, "heartbeat");
        }

        Payload::ServerMessage(_) => {
            tracing::debug!(%sender, "ignoring server-only packet sent by client");
        }

        Payload::Unrecognized { type_name, .. } => {
            tracing::debug!(%sender, packet_type = %type_name, "ignoring unrecognized packet type");
        }
    }

    Ok(())
}

/// Queues the sender for a save state and asks its room-mates for one.
fn request_save_state<C: Codec>(
    registry: &mut Registry,
    codec: &C,
    sender: ClientId,
    packet: &Packet,
) -> Result<(), RelayError> {
    let room = match registry.room_of_mut(sender) {
        Some(room) if room.len() >= 2 => room,
        Some(room) => {
            room.send_to(sender, encode_frame(codec, &Packet::server_message(NO_PEERS_MESSAGE))?);
            return Ok(());
        }
        None => {
            let frame = encode_frame(codec, &Packet::server_message(NO_PEERS_MESSAGE))?;
            if let Some(client) = registry.client(sender) {
                client.send(frame);
            }
            return Ok(());
        }
    };

    let request = encode_frame(codec, packet)?;
    let ack = encode_frame(codec, &Packet::server_message(SAVE_STATE_REQUESTED_MESSAGE))?;

    let pending = room.queue_save_state_request(sender)?;
    room.broadcast(&request, Recipient::AllExcept(sender));
    room.send_to(sender, ack);
    tracing::info!(%sender, room_id = %room.id(), pending, "save state requested");
    Ok(())
}

/// Hands a pushed save state to everyone waiting in the sender's room.
fn push_save_state<C: Codec>(
    registry: &mut Registry,
    codec: &C,
    sender: ClientId,
    packet: &Packet,
) -> Result<(), RelayError> {
    let Some(room) = registry.room_of_mut(sender) else {
        tracing::debug!(%sender, "save state pushed by client without a room");
        return Ok(());
    };

    let frame = encode_frame(codec, packet)?;
    let requesters = room.take_pending();
    for requester in &requesters {
        requester.send(frame.clone());
    }
    tracing::info!(
        %sender,
        room_id = %room.id(),
        delivered = requesters.len(),
        "save state pushed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use coop_relay_protocol::{FRAME_DELIMITER, JsonCodec, PacketType, RoomId};
    use coop_relay_session::{OutboundReceiver, SessionError, outbound_channel};
    use serde_json::{Value, json};

    use super::*;

    struct Harness {
        registry: Registry,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                registry: Registry::new(),
            }
        }

        fn connect(&mut self, id: u64) -> OutboundReceiver {
            let (sender, rx) = outbound_channel(ClientId(id));
            self.registry.register(sender, None).expect("should register");
            rx
        }

        fn send(&mut self, from: u64, value: Value) {
            let packet: Packet = serde_json::from_value(value).expect("valid packet");
            route(&mut self.registry, &JsonCodec, ClientId(from), packet).expect("should route");
        }

        fn room_id(&self, client: u64) -> Option<RoomId> {
            self.registry.room_of(ClientId(client)).map(|room| room.id())
        }
    }

    /// Drains every queued frame and parses it back to JSON.
    fn received(rx: &mut OutboundReceiver) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            assert_eq!(frame.last(), Some(&FRAME_DELIMITER));
            out.push(serde_json::from_slice(&frame[..frame.len() - 1]).expect("valid JSON"));
        }
        out
    }

    fn server_message(text: &str) -> Value {
        json!({"type": "SERVER_MESSAGE", "message": text})
    }

    #[test]
    fn test_first_reference_creates_room_and_later_clients_join_it() {
        let mut h = Harness::new();
        let _a = h.connect(1);
        let _b = h.connect(2);

        h.send(1, json!({"type": "UPDATE_CLIENT_DATA", "roomId": "R", "data": {"hp": 3}}));
        h.send(2, json!({"type": "HEARTBEAT", "roomId": "R"}));

        assert_eq!(h.registry.rooms().room_count(), 1);
        assert_eq!(h.room_id(1), h.room_id(2));
        assert_eq!(
            h.registry.room_by_name("R").unwrap().member_ids(),
            vec![ClientId(1), ClientId(2)]
        );
    }

    #[test]
    fn test_room_id_is_ignored_once_in_a_room() {
        let mut h = Harness::new();
        let _a = h.connect(1);

        h.send(1, json!({"type": "HEARTBEAT", "roomId": "first"}));
        h.send(1, json!({"type": "HEARTBEAT", "roomId": "second"}));

        assert_eq!(h.registry.room_of(ClientId(1)).unwrap().name(), "first");
        assert!(h.registry.room_by_name("second").is_none());
    }

    #[test]
    fn test_empty_room_id_does_not_join() {
        let mut h = Harness::new();
        let _a = h.connect(1);

        h.send(1, json!({"type": "HEARTBEAT", "roomId": ""}));

        assert_eq!(h.room_id(1), None);
        assert_eq!(h.registry.rooms().room_count(), 0);
    }

    #[test]
    fn test_unicast_reaches_only_target_even_for_broadcast_types() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        let mut c = h.connect(3);
        for id in 1..=3 {
            h.send(id, json!({"type": "HEARTBEAT", "roomId": "R"}));
        }

        let packet = json!({"type": "SET_SCENE_FLAG", "targetClientId": 2, "flag": 9});
        h.send(1, packet.clone());

        assert!(received(&mut a).is_empty());
        assert_eq!(received(&mut b), vec![packet]);
        assert!(received(&mut c).is_empty());
    }

    #[test]
    fn test_zero_target_falls_through_to_type_dispatch() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        h.send(1, json!({"type": "HEARTBEAT", "roomId": "R"}));
        h.send(2, json!({"type": "HEARTBEAT", "roomId": "R"}));

        let packet = json!({"type": "SET_SCENE_FLAG", "targetClientId": 0, "flag": 1});
        h.send(1, packet.clone());

        assert_eq!(received(&mut a), vec![packet.clone()]);
        assert_eq!(received(&mut b), vec![packet]);
    }

    #[test]
    fn test_unicast_skips_type_handling() {
        let mut h = Harness::new();
        let _a = h.connect(1);
        let mut b = h.connect(2);
        h.send(1, json!({"type": "HEARTBEAT", "roomId": "R"}));
        h.send(2, json!({"type": "HEARTBEAT", "roomId": "R"}));

        h.send(1, json!({"type": "UPDATE_CLIENT_DATA", "targetClientId": 2, "data": {"x": 1}}));

        assert!(h.registry.client(ClientId(1)).unwrap().data.is_empty());
        assert_eq!(received(&mut b).len(), 1);
    }

    #[test]
    fn test_unicast_outside_room_is_dropped() {
        let mut h = Harness::new();
        let _a = h.connect(1);
        let mut b = h.connect(2);
        h.send(1, json!({"type": "HEARTBEAT", "roomId": "north"}));
        h.send(2, json!({"type": "HEARTBEAT", "roomId": "south"}));

        h.send(1, json!({"type": "GIVE_ITEM", "targetClientId": 2}));
        h.send(1, json!({"type": "GIVE_ITEM", "targetClientId": 99}));

        assert!(received(&mut b).is_empty());
    }

    #[test]
    fn test_unknown_type_still_joins_and_unicasts() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        h.send(2, json!({"type": "HEARTBEAT", "roomId": "R"}));

        h.send(1, json!({"type": "WAVE", "roomId": "R"}));
        assert_eq!(h.room_id(1), h.room_id(2));
        assert!(received(&mut b).is_empty());

        let wave = json!({"type": "WAVE", "targetClientId": 2, "hand": "left"});
        h.send(1, wave.clone());
        assert_eq!(received(&mut b), vec![wave]);
        assert!(received(&mut a).is_empty());
    }

    #[test]
    fn test_update_client_data_replaces_snapshot() {
        let mut h = Harness::new();
        let mut a = h.connect(1);

        h.send(1, json!({"type": "UPDATE_CLIENT_DATA", "data": {"hp": 3}}));
        h.send(1, json!({"type": "UPDATE_CLIENT_DATA", "data": {"hp": 1}}));

        let data = &h.registry.client(ClientId(1)).unwrap().data;
        assert_eq!(Value::Object(data.clone()), json!({"hp": 1}));
        assert!(received(&mut a).is_empty());
    }

    #[test]
    fn test_all_client_data_goes_to_everyone_but_sender() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        let mut c = h.connect(3);
        for id in 1..=3 {
            h.send(id, json!({"type": "HEARTBEAT", "roomId": "R"}));
        }

        let bundle = json!({"type": "ALL_CLIENT_DATA", "clients": [{"id": 1}, {"id": 2}]});
        h.send(1, bundle.clone());

        assert!(received(&mut a).is_empty());
        assert_eq!(received(&mut b), vec![bundle.clone()]);
        assert_eq!(received(&mut c), vec![bundle]);
    }

    #[test]
    fn test_scene_flags_and_items_reach_whole_room_including_sender() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        let mut outsider = h.connect(3);
        h.send(1, json!({"type": "HEARTBEAT", "roomId": "R"}));
        h.send(2, json!({"type": "HEARTBEAT", "roomId": "R"}));
        h.send(3, json!({"type": "HEARTBEAT", "roomId": "elsewhere"}));

        let flag = json!({"type": "SET_SCENE_FLAG", "scene": 4, "flag": 2});
        let item = json!({"type": "GIVE_ITEM", "item": 17});
        h.send(1, flag.clone());
        h.send(2, item.clone());

        assert_eq!(received(&mut a), vec![flag.clone(), item.clone()]);
        assert_eq!(received(&mut b), vec![flag, item]);
        assert!(received(&mut outsider).is_empty());
    }

    #[test]
    fn test_log_only_types_have_no_network_effect() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        h.send(1, json!({"type": "HEARTBEAT", "roomId": "R"}));
        h.send(2, json!({"type": "HEARTBEAT", "roomId": "R"}));

        for packet_type in [
            PacketType::DisableAnchor,
            PacketType::GameComplete,
            PacketType::Heartbeat,
            PacketType::ServerMessage,
        ] {
            let mut packet = json!({"type": packet_type.as_str(), "quiet": true});
            if packet_type == PacketType::ServerMessage {
                packet["message"] = json!("spoofed");
            }
            h.send(1, packet);
        }
        h.send(1, json!({"type": "NOT_A_REAL_TYPE"}));

        assert!(received(&mut a).is_empty());
        assert!(received(&mut b).is_empty());
    }

    #[test]
    fn test_request_save_state_alone_gets_no_peers_message() {
        let mut h = Harness::new();
        let mut a = h.connect(1);

        h.send(1, json!({"type": "REQUEST_SAVE_STATE", "roomId": "R"}));

        assert_eq!(received(&mut a), vec![server_message(NO_PEERS_MESSAGE)]);
        assert!(h.registry.room_of(ClientId(1)).unwrap().pending_ids().is_empty());
    }

    #[test]
    fn test_request_save_state_without_room_gets_no_peers_message() {
        let mut h = Harness::new();
        let mut a = h.connect(1);

        h.send(1, json!({"type": "REQUEST_SAVE_STATE"}));

        assert_eq!(received(&mut a), vec![server_message(NO_PEERS_MESSAGE)]);
        assert_eq!(h.registry.rooms().room_count(), 0);
    }

    #[test]
    fn test_request_save_state_broadcasts_and_acknowledges() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        let mut c = h.connect(3);
        for id in 1..=3 {
            h.send(id, json!({"type": "HEARTBEAT", "roomId": "R"}));
        }

        let request = json!({"type": "REQUEST_SAVE_STATE"});
        h.send(3, request.clone());

        assert_eq!(received(&mut a), vec![request.clone()]);
        assert_eq!(received(&mut b), vec![request]);
        assert_eq!(received(&mut c), vec![server_message(SAVE_STATE_REQUESTED_MESSAGE)]);
        assert_eq!(
            h.registry.room_of(ClientId(3)).unwrap().pending_ids(),
            vec![ClientId(3)]
        );
    }

    #[test]
    fn test_push_save_state_reaches_every_requester_and_clears_queue() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        let mut host = h.connect(3);
        for id in 1..=3 {
            h.send(id, json!({"type": "HEARTBEAT", "roomId": "R"}));
        }
        h.send(1, json!({"type": "REQUEST_SAVE_STATE"}));
        h.send(2, json!({"type": "REQUEST_SAVE_STATE"}));
        received(&mut a);
        received(&mut b);
        received(&mut host);

        let push = json!({"type": "PUSH_SAVE_STATE", "saveState": {"rupees": 99}});
        h.send(3, push.clone());

        assert_eq!(received(&mut a), vec![push.clone()]);
        assert_eq!(received(&mut b), vec![push]);
        assert!(received(&mut host).is_empty());
        assert!(h.registry.room_of(ClientId(3)).unwrap().pending_ids().is_empty());
    }

    #[test]
    fn test_repeated_request_receives_push_once_per_request() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let _b = h.connect(2);
        h.send(1, json!({"type": "HEARTBEAT", "roomId": "R"}));
        h.send(2, json!({"type": "HEARTBEAT", "roomId": "R"}));
        h.send(1, json!({"type": "REQUEST_SAVE_STATE"}));
        h.send(1, json!({"type": "REQUEST_SAVE_STATE"}));
        received(&mut a);

        h.send(2, json!({"type": "PUSH_SAVE_STATE"}));

        assert_eq!(received(&mut a).len(), 2);
    }

    #[test]
    fn test_push_with_nothing_pending_sends_nothing() {
        let mut h = Harness::new();
        let mut a = h.connect(1);
        let mut b = h.connect(2);
        h.send(1, json!({"type": "HEARTBEAT", "roomId": "R"}));
        h.send(2, json!({"type": "HEARTBEAT", "roomId": "R"}));

        h.send(1, json!({"type": "PUSH_SAVE_STATE"}));

        assert!(received(&mut a).is_empty());
        assert!(received(&mut b).is_empty());
    }

    #[test]
    fn test_unregistered_sender_is_an_error() {
        let mut registry = Registry::new();
        let packet: Packet =
            serde_json::from_value(json!({"type": "HEARTBEAT", "roomId": "R"})).unwrap();

        let result = route(&mut registry, &JsonCodec, ClientId(42), packet);

        assert!(matches!(
            result,
            Err(RelayError::Session(SessionError::UnknownClient(ClientId(42))))
        ));
    }
}
