//! simlink-protocol: the wire vocabulary shared by the simulation server
//! and its remote controllers and viewers.
//!
//! A frame is a one-byte [`MessageType`] tag followed by the payload of
//! that message kind, if any. There is no outer length prefix: the tag
//! fully determines how many fields follow. All multi-byte values are
//! big-endian.
//!
//! - [`message`]: the message-type enumeration and its wire codes.
//! - [`types`]: payload records exchanged with the simulation model.
//! - [`codec`]: encoders appending frames to a `BytesMut` and the async
//!   [`FrameReader`](codec::FrameReader) decoding them from a stream.

pub mod codec;
pub mod message;
pub mod types;

pub use codec::{CodecError, FrameReader};
pub use message::MessageType;
pub use types::*;

/// Port the simulator listens on when none is configured.
pub const DEFAULT_SIMULATOR_PORT: u16 = 7410;
