//! MongoDB wire protocol constants

/// Length of the standard message header (length, requestID, responseTo, opCode)
pub const HEADER_LEN: usize = 16;

/// Default `maxMessageSizeBytes` advertised by mongod
pub const MAX_MESSAGE_LENGTH: usize = 48_000_000;

/// Default mongod port
pub const DEFAULT_PORT: u16 = 27017;

/// Database that hosts the handshake command
pub const ADMIN_DB: &str = "admin";

/// Operation codes
pub mod op_codes {
    /// Extensible message format (MongoDB 3.6+)
    pub const OP_MSG: i32 = 2013;

    /// Compressed wrapper around another opcode
    pub const OP_COMPRESSED: i32 = 2012;
}

/// OP_MSG flag bits
pub mod flags {
    /// A CRC-32C checksum trails the sections
    pub const CHECKSUM_PRESENT: u32 = 1;
}

/// OP_MSG section kinds
pub mod sections {
    /// A single BSON body document
    pub const BODY: u8 = 0;

    /// Size, identifier, then a sequence of BSON documents
    pub const DOCUMENT_SEQUENCE: u8 = 1;
}
