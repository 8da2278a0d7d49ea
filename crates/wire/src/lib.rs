// SPDX-License-Identifier: MIT

//! IPC wire protocol between `ghost` (CLI / app SDKs) and `ghostd` (the daemon).
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod envelope;
mod framing;

pub use envelope::{WireRequest, WireResponse};
pub use framing::{
    decode, encode, read_message, read_request, write_message, write_response, ProtocolError,
};

pub const PROTOCOL_VERSION: &str = "1";
