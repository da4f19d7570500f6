//! MongoDB wire protocol framing
//!
//! Only `OP_MSG` is spoken: it is the one opcode every server from 3.6 on
//! accepts, and the handshake needs nothing else.

pub mod constants;
mod decode;
mod encode;
mod message;

pub use decode::{decode_header, decode_message};
pub use encode::encode_message;
pub use message::{MessageHeader, OpMsg};
