//! Binary encoding of frames.
//!
//! Encoders are synchronous and append a complete frame to a `BytesMut`,
//! so a frame can be built once and written to several sockets. Decoding
//! is driven by [`FrameReader`] over any `AsyncRead`.

mod decode;
mod encode;
mod error;


pub use decode::FrameReader;
pub use encode::{
    write_add_probe_message, write_addition_message, write_deletion_message, write_end_message,
    write_header, write_idle_message, write_init_message, write_killed_message,
    write_move_action_message, write_probe_message, write_remove_probe_message,
    write_set_simulation_delay_message, write_start_message,
};
pub use error::CodecError;

/// Largest string field accepted on decode, in bytes.
pub const MAX_STRING_LEN: usize = 1024 * 1024;

/// Largest element count accepted on decode.
pub const MAX_COLLECTION_LEN: usize = 1024 * 1024;

pub(crate) const PROBE_VALUE_BOOL: u8 = 0;
pub(crate) const PROBE_VALUE_INTEGER: u8 = 1;
pub(crate) const PROBE_VALUE_REAL: u8 = 2;
pub(crate) const PROBE_VALUE_TEXT: u8 = 3;
