//! Protocol message encoding

use super::constants::{op_codes, sections, HEADER_LEN};
use super::message::OpMsg;
use bytes::{BufMut, BytesMut};
use std::io;

/// Encode an `OP_MSG` into bytes
pub fn encode_message(msg: &OpMsg) -> io::Result<BytesMut> {
    let body = bson::to_vec(&msg.body)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + 5 + body.len());

    // Reserve space for length (will be filled at end)
    let len_pos = buf.len();
    buf.put_i32_le(0);
    buf.put_i32_le(msg.request_id);
    buf.put_i32_le(msg.response_to);
    buf.put_i32_le(op_codes::OP_MSG);

    buf.put_u32_le(msg.flags);
    buf.put_u8(sections::BODY);
    buf.put_slice(&body);

    let len = i32::try_from(buf.len() - len_pos).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "message exceeds i32 length")
    })?;
    buf[len_pos..len_pos + 4].copy_from_slice(&len.to_le_bytes());

    Ok(buf)
}
