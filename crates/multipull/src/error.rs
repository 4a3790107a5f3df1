//! Error types for multipart parsing.

use std::{fmt, io};

use thiserror::Error;

/// Identifies the part a failed lookup referred to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartLocator {
    /// Sequential, zero-based position in boundary order.
    Index(usize),
    /// Correlation identifier carried in the part's `Content-ID` header.
    ContentId(String),
}

impl fmt::Display for PartLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "index {index}"),
            Self::ContentId(cid) => write!(f, "content id {cid:?}"),
        }
    }
}

/// Failures raised while parsing a multipart message.
///
/// Structural failures abort the whole parse; partial content is not an
/// error but a flagged branch of normal operation (see
/// [`ParseOptions::enable_partial`](crate::ParseOptions::enable_partial)).
#[derive(Debug, Error)]
pub enum Error {
    /// The stream ended before any opening boundary line was seen.
    #[error("missing start boundary: stream ended before any boundary line")]
    MalformedStream,

    /// The stream ended inside a part body and partial mode is disabled,
    /// or it ended while a boundary candidate was still undecidable.
    #[error("reached end of stream inside part {index}, but there is no closing boundary")]
    UnterminatedMessage {
        /// Zero-based index of the part being read when the stream ended.
        index: usize,
    },

    /// More bytes were read from the source than the configured cap allows.
    #[error("message stream exceeds the configured limit of {limit} bytes")]
    SizeLimitExceeded {
        /// The configured maximum number of bytes.
        limit: u64,
    },

    /// An index-based and an identifier-based placeholder both claim the
    /// part whose headers just arrived, and they are not the same part.
    #[error("created two different parts for index {index} and content id {content_id:?}")]
    IdentityConflict {
        /// Sequential position of the conflicting part.
        index: usize,
        /// Correlation identifier decoded from the part's headers.
        content_id: String,
    },

    /// The requested part does not exist in the fully parsed message.
    #[error("no attachment part at {0}")]
    PartNotFound(PartLocator),

    /// A logic defect: a driving loop drained the message but the state it
    /// was waiting for never appeared.
    #[error("internal error: {0}")]
    InternalInvariant(&'static str),

    /// The underlying source failed while being read.
    #[error("i/o error reading the message stream")]
    Io(#[from] io::Error),

    /// No codec is registered for the part's transfer encoding.
    #[error("no codec registered for transfer encoding {0:?}")]
    UnsupportedEncoding(String),

    /// A registered codec failed to decode the part's content.
    #[error("failed to decode {encoding:?} content: {message}")]
    Decode {
        /// The transfer encoding whose codec failed.
        encoding: String,
        /// The codec's failure description.
        message: String,
    },
}
