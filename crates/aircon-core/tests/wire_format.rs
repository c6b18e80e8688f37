//! Integration tests for the aircon-core wire format.
//!
//! These exercise the public API the way a controller and a unit would use it
//! against each other: each side seals with one key scope and the other side
//! opens with the matching key.

use aircon_core::{
    crypto::{decrypt, encrypt},
    protocol::{
        decode_pack, expect_pack_type, open_pack, pack_type, BindReply, BindRequest,
        CommandReply, CommandRequest, KeyScope, StatusReply, StatusRequest, SCAN_REQUEST,
    },
    CipherError, CipherKey, DiscoveryAnnouncement, PackError, ParameterMap, ParameterName,
    ProtocolError, SessionKey, GENERIC_KEY,
};
use aircon_core::{open_envelope, seal_pack};
use serde_json::json;

const MAC: &str = "f4911e7aca59";

fn session() -> SessionKey {
    SessionKey::from_wire("Gh3kL9mN2pQ5rS8t").expect("16-byte key")
}

#[test]
fn test_scan_request_is_plain_json() {
    let value: serde_json::Value = serde_json::from_slice(SCAN_REQUEST).unwrap();
    assert_eq!(value, json!({"t":"scan"}));
}

#[test]
fn test_discovery_reply_decodes_to_announcement() {
    // Arrange: a unit's reply with only name and mac, as some firmware sends it.
    let reply = seal_pack(
        &json!({"name":"Unit1","mac":"AA:BB:CC"}),
        &GENERIC_KEY,
        KeyScope::Generic,
        "",
    )
    .unwrap();

    // Act
    let ann: DiscoveryAnnouncement = decode_pack(&reply, &GENERIC_KEY).expect("decode");

    // Assert
    assert_eq!(ann.name, "Unit1");
    assert_eq!(ann.mac, "AA:BB:CC");
}

#[test]
fn test_bind_handshake_yields_usable_session_key() {
    // Arrange: controller sends bind, unit answers bindok.
    let request = seal_pack(&BindRequest::new(MAC), &GENERIC_KEY, KeyScope::Generic, MAC).unwrap();
    let seen: BindRequest = decode_pack(&request, &GENERIC_KEY).unwrap();
    assert_eq!(seen.t, pack_type::BIND);

    let reply = BindReply {
        t: pack_type::BIND_OK.to_string(),
        mac: seen.mac,
        key: "Gh3kL9mN2pQ5rS8t".to_string(),
        r: Some(200),
    };
    let reply_bytes = seal_pack(&reply, &GENERIC_KEY, KeyScope::Generic, "app").unwrap();

    // Act
    let opened: BindReply = decode_pack(&reply_bytes, &GENERIC_KEY).unwrap();
    let key = SessionKey::from_wire(&opened.key).expect("session key");

    // Assert
    assert!(opened.is_success());
    assert_eq!(key, session());
    let text = encrypt(b"{}", key.cipher_key());
    assert_eq!(decrypt(&text, session().cipher_key()).unwrap(), b"{}");
}

#[test]
fn test_status_exchange_under_session_key() {
    // Arrange
    let key = session();
    let cols: Vec<String> = ParameterName::STATUS_COLUMNS
        .iter()
        .map(|n| n.as_wire().to_string())
        .collect();
    let request = seal_pack(
        &StatusRequest::new(MAC, cols.clone()),
        key.cipher_key(),
        KeyScope::Session,
        MAC,
    )
    .unwrap();
    let seen: StatusRequest = decode_pack(&request, key.cipher_key()).unwrap();
    assert_eq!(seen.cols.len(), 19);

    let reply = StatusReply {
        t: pack_type::STATUS_DATA.to_string(),
        mac: MAC.to_string(),
        r: Some(200),
        cols: vec!["Pow".to_string(), "SetTem".to_string()],
        dat: vec![json!(1), json!(24)],
    };
    let reply_bytes = seal_pack(&reply, key.cipher_key(), KeyScope::Session, "app").unwrap();

    // Act
    let opened: StatusReply = decode_pack(&reply_bytes, key.cipher_key()).unwrap();
    expect_pack_type(&opened.t, pack_type::STATUS_DATA).unwrap();
    let params = opened.parameters().unwrap();

    // Assert
    assert_eq!(params.get_int(&ParameterName::Power), Some(1));
    assert_eq!(params.get_int(&ParameterName::SetTemperature), Some(24));
}

#[test]
fn test_command_exchange_round_trips_parameters() {
    // Arrange
    let key = session();
    let params = ParameterMap::new()
        .with(ParameterName::Power, 1)
        .with(ParameterName::Light, 0);
    let request = seal_pack(
        &CommandRequest::from_parameters(&params),
        key.cipher_key(),
        KeyScope::Session,
        MAC,
    )
    .unwrap();

    // Act
    let seen: CommandRequest = decode_pack(&request, key.cipher_key()).unwrap();
    let (opt, p) = params.to_columns();
    let reply = CommandReply {
        t: pack_type::COMMAND_RESULT.to_string(),
        mac: MAC.to_string(),
        r: Some(200),
        opt,
        p: Some(p),
        val: None,
    };
    let reply_bytes = seal_pack(&reply, key.cipher_key(), KeyScope::Session, "app").unwrap();
    let opened: CommandReply = decode_pack(&reply_bytes, key.cipher_key()).unwrap();

    // Assert
    assert_eq!(seen.parameters().unwrap(), params);
    assert_eq!(opened.parameters().unwrap(), params);
}

#[test]
fn test_session_traffic_cannot_be_opened_with_generic_key() {
    let request = seal_pack(
        &StatusRequest::new(MAC, vec!["Pow".to_string()]),
        session().cipher_key(),
        KeyScope::Session,
        MAC,
    )
    .unwrap();

    let envelope = open_envelope(&request).unwrap();
    let result = open_pack::<StatusRequest>(&envelope, &GENERIC_KEY);

    assert!(result.is_err());
}

#[test]
fn test_mismatched_reply_arrays_surface_as_protocol_error() {
    let reply: StatusReply =
        serde_json::from_value(json!({"t":"dat","cols":["Pow","Mod"],"dat":[1]})).unwrap();

    assert_eq!(
        reply.parameters(),
        Err(ProtocolError::LengthMismatch {
            columns: 2,
            values: 1
        })
    );
}

#[test]
fn test_pack_with_bad_base64_is_decode_error() {
    let datagram = br#"{"cid":"app","i":1,"t":"pack","uid":0,"tcid":"","pack":"@@@"}"#;
    let result = decode_pack::<DiscoveryAnnouncement>(datagram, &GENERIC_KEY);
    assert!(matches!(
        result,
        Err(PackError::Decode(CipherError::InvalidBase64(_)))
    ));
}

#[test]
fn test_cipher_key_from_slice_matches_generic_key_bytes() {
    let key = CipherKey::from_slice(b"a3K8Bx%2r8Y7#xDh").unwrap();
    assert_eq!(key, GENERIC_KEY);
}
