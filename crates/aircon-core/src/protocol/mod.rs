//! Protocol module containing the envelope, pack payloads, and the codec that
//! seals payloads into envelopes and opens them again.

pub mod codec;
pub mod error;
pub mod messages;

pub use codec::{decode_pack, open_envelope, open_pack, seal_pack, PackError};
pub use error::ProtocolError;
pub use messages::*;
