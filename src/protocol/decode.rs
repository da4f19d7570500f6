//! Protocol message decoding

use super::constants::{flags, op_codes, sections, HEADER_LEN, MAX_MESSAGE_LENGTH};
use super::message::{MessageHeader, OpMsg};
use bson::Document;
use std::io;

/// Smallest valid OP_MSG: header, flag bits, section kind and an empty document
const MIN_OP_MSG_LENGTH: usize = HEADER_LEN + 4 + 1 + 5;

/// Decode the 16-byte standard header
///
/// Does not validate the opcode; callers match on it.
pub fn decode_header(data: &[u8]) -> io::Result<MessageHeader> {
    if data.len() < HEADER_LEN {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "incomplete message header",
        ));
    }

    Ok(MessageHeader {
        message_length: read_i32(data, 0),
        request_id: read_i32(data, 4),
        response_to: read_i32(data, 8),
        op_code: read_i32(data, 12),
    })
}

/// Decode one `OP_MSG` from the front of `data`
///
/// # Returns
/// `Ok((msg, consumed))` - Message and number of bytes consumed
/// `Err(e)` with `UnexpectedEof` - more bytes are needed
/// `Err(e)` with any other kind - the stream is corrupt
pub fn decode_message(data: &[u8]) -> io::Result<(OpMsg, usize)> {
    let header = decode_header(data)?;
    let len = usize::try_from(header.message_length).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("negative message length {}", header.message_length),
        )
    })?;

    if len > MAX_MESSAGE_LENGTH {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "message length {} exceeds maximum allowed {}",
                len, MAX_MESSAGE_LENGTH
            ),
        ));
    }

    match header.op_code {
        op_codes::OP_MSG => {}
        op_codes::OP_COMPRESSED => {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "compressed messages are not supported",
            ))
        }
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected opcode: {}", other),
            ))
        }
    }

    if len < MIN_OP_MSG_LENGTH {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message length {} too short for OP_MSG", len),
        ));
    }

    if data.len() < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "incomplete message body",
        ));
    }

    let flag_bits = read_u32(data, HEADER_LEN);
    let sections_end = if flag_bits & flags::CHECKSUM_PRESENT != 0 {
        len - 4
    } else {
        len
    };

    let mut offset = HEADER_LEN + 4;
    let mut body = None;

    while offset < sections_end {
        let kind = data[offset];
        offset += 1;

        let section_len = section_length(data, offset, sections_end)?;
        match kind {
            sections::BODY => {
                let doc = bson::from_slice::<Document>(&data[offset..offset + section_len])
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
                if body.replace(doc).is_some() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "multiple body sections",
                    ));
                }
            }
            // Only produced for bulk writes; nothing on the handshake path reads them
            sections::DOCUMENT_SEQUENCE => {}
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown section kind: {}", other),
                ))
            }
        }
        offset += section_len;
    }

    let body = body
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing body section"))?;

    Ok((
        OpMsg {
            request_id: header.request_id,
            response_to: header.response_to,
            flags: flag_bits,
            body,
        },
        len,
    ))
}

/// Both section kinds open with a self-inclusive little-endian length
fn section_length(data: &[u8], offset: usize, end: usize) -> io::Result<usize> {
    if offset + 4 > end {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "truncated section length",
        ));
    }
    let len = read_i32(data, offset);
    match usize::try_from(len) {
        Ok(len) if len >= 4 && offset + len <= end => Ok(len),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("section length {} out of bounds", len),
        )),
    }
}

fn read_i32(data: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}
