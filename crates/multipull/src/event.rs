//! Structural events produced by the pull parser.
//!
//! Each pull step of [`MimeParser`](crate::MimeParser) yields exactly one
//! event; the [`Message`](crate::Message) assembler consumes each event
//! exactly once. The sequence is single-pass and not restartable.

use std::fmt;

use bstr::ByteSlice;

use crate::headers::HeaderBlock;

/// One structural event of the multipart grammar.
///
/// A well-formed message produces
/// `MessageStarted`, then per part `PartStarted`, `HeadersReady`, one or
/// more `Content` chunks, `PartEnded`, and finally `MessageEnded`.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MimeEvent {
    /// Parsing has begun; no bytes are interpreted yet.
    MessageStarted,
    /// A boundary line introduced a new part.
    PartStarted,
    /// The current part's header block arrived whole.
    HeadersReady(HeaderBlock),
    /// One bounded slice of the current part's body.
    Content {
        /// The chunk's bytes, still transfer-encoded.
        data: Vec<u8>,
        /// Whether this chunk was cut short by source exhaustion.
        is_partial: bool,
    },
    /// The current part's body ended (closing or intermediate boundary,
    /// or a tolerated truncation).
    PartEnded,
    /// The message is complete; the source has been released.
    MessageEnded,
}

impl fmt::Debug for MimeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageStarted => f.write_str("MessageStarted"),
            Self::PartStarted => f.write_str("PartStarted"),
            Self::HeadersReady(block) => f.debug_tuple("HeadersReady").field(block).finish(),
            Self::Content { data, is_partial } => f
                .debug_struct("Content")
                .field("data", &data.as_bstr())
                .field("is_partial", is_partial)
                .finish(),
            Self::PartEnded => f.write_str("PartEnded"),
            Self::MessageEnded => f.write_str("MessageEnded"),
        }
    }
}
