//! Output formatting for the command line.

pub mod envelope;

pub use envelope::{
    EXIT_ERROR, EXIT_NOT_FOUND, EXIT_SUCCESS, EntityType, Envelope, ErrorDetails, MessageType,
    Meta, ResultCode, SCHEMA_VERSION, Status,
};
