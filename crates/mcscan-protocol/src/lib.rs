//! Wire codec and handshake/status framing for the Minecraft Java Edition
//! server list ping protocol, plus the two legacy pre-1.7 variants.
//!
//! This crate is pure with respect to the modern framing (operates on byte
//! buffers and any `Read`/`Write`), and additionally exposes thin async
//! helpers for driving the handshake/status exchange over a live socket.

pub mod document;
pub mod error;
pub mod handshake;
pub mod legacy;
pub mod status;
pub mod types;

pub use error::ProtocolError;
pub use types::{ProtocolRead, ProtocolWrite, VarInt};
