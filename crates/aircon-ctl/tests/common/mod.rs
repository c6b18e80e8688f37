//! Localhost stand-in for a unit, used by the integration tests.
//!
//! The mock answers on a loopback UDP socket the way a real unit answers on
//! port 7000:
//!
//! - plaintext `{"t":"scan"}` → `scan_replies` copies of its announcement
//!   under the generic key
//! - envelope with `i = 1` → bind reply carrying `session_key`
//! - envelope with `i = 0` → `status` or `cmd` handled against an in-memory
//!   parameter map under the session key
//!
//! Unreadable datagrams are ignored, as a unit would.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use aircon_core::protocol::{
    open_envelope, open_pack, pack_type, seal_pack, BindReply, BindRequest, CommandReply,
    CommandRequest, KeyScope, StatusReply, StatusRequest, SCAN_REQUEST,
};
use aircon_core::{CipherKey, ParameterMap, ParameterName, ParameterValue, GENERIC_KEY};
use serde_json::{json, Value};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

pub const SESSION_KEY: &str = "Gh3kL9mN2pQ5rS8t";

#[derive(Debug, Clone)]
pub struct MockOptions {
    pub name: String,
    pub mac: String,
    /// Copies of the announcement sent per scan.
    pub scan_replies: usize,
    /// Raw pack sent in reply to every status query instead of the real one.
    pub status_override: Option<Value>,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            name: "Unit1".to_string(),
            mac: "AA:BB:CC".to_string(),
            scan_replies: 1,
            status_override: None,
        }
    }
}

pub struct MockDevice {
    addr: SocketAddr,
    state: Arc<Mutex<ParameterMap>>,
    binds: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockDevice {
    pub async fn start(options: MockOptions) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind mock");
        let addr = socket.local_addr().expect("mock addr");

        let initial = ParameterMap::new()
            .with(ParameterName::Power, 0)
            .with(ParameterName::Mode, 1)
            .with(ParameterName::SetTemperature, 25)
            .with(ParameterName::Light, 1);
        let state = Arc::new(Mutex::new(initial));
        let binds = Arc::new(AtomicUsize::new(0));

        let handle = tokio::spawn(serve(
            socket,
            options,
            Arc::clone(&state),
            Arc::clone(&binds),
        ));

        Self {
            addr,
            state,
            binds,
            handle,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> ParameterMap {
        self.state.lock().unwrap().clone()
    }

    pub fn bind_count(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    socket: UdpSocket,
    options: MockOptions,
    state: Arc<Mutex<ParameterMap>>,
    binds: Arc<AtomicUsize>,
) {
    let session_key = CipherKey::from_slice(SESSION_KEY.as_bytes()).unwrap();
    let mut buf = vec![0u8; 65_507];

    loop {
        let Ok((len, from)) = socket.recv_from(&mut buf).await else {
            continue;
        };
        let datagram = &buf[..len];

        if datagram == SCAN_REQUEST {
            let announcement = json!({
                "t": "dev", "cid": options.mac, "mac": options.mac,
                "name": options.name, "ver": "V1.1.13"
            });
            let reply = seal_pack(&announcement, &GENERIC_KEY, KeyScope::Generic, "").unwrap();
            for _ in 0..options.scan_replies {
                let _ = socket.send_to(&reply, from).await;
            }
            continue;
        }

        let Ok(envelope) = open_envelope(datagram) else {
            continue;
        };

        let reply = if envelope.i == KeyScope::Generic.as_wire() {
            let Ok(request) = open_pack::<BindRequest>(&envelope, &GENERIC_KEY) else {
                continue;
            };
            binds.fetch_add(1, Ordering::SeqCst);
            let reply = BindReply {
                t: pack_type::BIND_OK.to_string(),
                mac: request.mac,
                key: SESSION_KEY.to_string(),
                r: Some(200),
            };
            seal_pack(&reply, &GENERIC_KEY, KeyScope::Generic, "app").unwrap()
        } else {
            let Ok(pack) = open_pack::<Value>(&envelope, &session_key) else {
                continue;
            };
            let Some(body) = handle_session_pack(pack, &options, &state) else {
                continue;
            };
            seal_pack(&body, &session_key, KeyScope::Session, "app").unwrap()
        };

        let _ = socket.send_to(&reply, from).await;
    }
}

fn handle_session_pack(
    pack: Value,
    options: &MockOptions,
    state: &Mutex<ParameterMap>,
) -> Option<Value> {
    match pack.get("t").and_then(Value::as_str) {
        Some(pack_type::STATUS) => {
            if let Some(raw) = &options.status_override {
                return Some(raw.clone());
            }
            let request: StatusRequest = serde_json::from_value(pack).ok()?;
            let state = state.lock().unwrap();
            let dat = request
                .cols
                .iter()
                .map(|c| {
                    state
                        .get(&ParameterName::from_wire(c))
                        .map(ParameterValue::to_json)
                        .unwrap_or(json!(0))
                })
                .collect();
            let reply = StatusReply {
                t: pack_type::STATUS_DATA.to_string(),
                mac: options.mac.clone(),
                r: Some(200),
                cols: request.cols,
                dat,
            };
            serde_json::to_value(reply).ok()
        }
        Some(pack_type::COMMAND) => {
            let request: CommandRequest = serde_json::from_value(pack).ok()?;
            let params = request.parameters().ok()?;
            let mut state = state.lock().unwrap();
            for (name, value) in params.iter() {
                state.insert(name.clone(), value.clone());
            }
            let reply = CommandReply {
                t: pack_type::COMMAND_RESULT.to_string(),
                mac: options.mac.clone(),
                r: Some(200),
                opt: request.opt,
                p: Some(request.p),
                val: None,
            };
            serde_json::to_value(reply).ok()
        }
        _ => None,
    }
}
