//! Protocol message types

use bson::Document;

/// Standard message header shared by every opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Total message length including the header
    pub message_length: i32,
    /// Identifier chosen by the sender
    pub request_id: i32,
    /// Request this message answers (0 for requests)
    pub response_to: i32,
    /// Operation code
    pub op_code: i32,
}

/// An `OP_MSG` message (either direction)
#[derive(Debug, Clone, PartialEq)]
pub struct OpMsg {
    /// Identifier chosen by the sender
    pub request_id: i32,
    /// Request this message answers (0 for requests)
    pub response_to: i32,
    /// Flag bits (see [`super::constants::flags`])
    pub flags: u32,
    /// The kind-0 body section
    pub body: Document,
}

impl OpMsg {
    /// Build a request carrying `body`
    pub fn request(request_id: i32, body: Document) -> Self {
        Self {
            request_id,
            response_to: 0,
            flags: 0,
            body,
        }
    }

    /// Build a reply to `request_id` carrying `body`
    pub fn reply(request_id: i32, response_to: i32, body: Document) -> Self {
        Self {
            request_id,
            response_to,
            flags: 0,
            body,
        }
    }
}
