use std::io;

/// Errors raised while encoding or decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("unknown message type code: {0:#04x}")]
    UnknownMessageType(u8),

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("string field of {0} bytes exceeds the limit")]
    StringTooLong(usize),

    #[error("collection of {0} elements exceeds the limit")]
    CollectionTooLong(usize),

    #[error("invalid probe value tag: {0}")]
    InvalidProbeValueTag(u8),

    #[error("invalid option flag: {0}")]
    InvalidOptionFlag(u8),
}

impl CodecError {
    /// `true` when the peer closed the stream, including mid-frame.
    pub fn is_eof(&self) -> bool {
        matches!(self, CodecError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}
