//! A streaming, pull-based multipart (MIME) parser that tolerates
//! truncated messages.
//!
//! The parser consumes a boundary-delimited byte stream incrementally and
//! resolves it into addressable parts without requiring the stream to be
//! complete: when the source dies mid-part, the in-progress part and the
//! message are flagged partial and everything read so far stays available,
//! with the truncated tail cut back to a whole number of encoding blocks.
//!
//! Two levels of API:
//!
//! - [`MimeParser`] — the raw pull sequence of structural [`MimeEvent`]s,
//!   one event per step, single-pass.
//! - [`Message`] — the lazy assembler on top: parts by index or by
//!   correlation identifier ([`Message::part_at`], [`Message::part_by_id`]),
//!   each access driving the stream only as far as it needs, with at most
//!   one concurrent drive of the source.
//!
//! Transfer decoding is delegated through [`TransferCodec`]; only the
//! identity encodings ship built in.
//!
//! # Examples
//!
//! ```rust
//! use std::io::Cursor;
//!
//! use multipull::{Message, ParseOptions};
//!
//! // A two-part message cut off inside the second body.
//! let stream = "--mixed\r\n\
//!     Content-ID: <first@host>\r\n\
//!     \r\n\
//!     complete content\r\n\
//!     --mixed\r\n\
//!     Content-ID: <second@host>\r\n\
//!     \r\n\
//!     cut off mid-st";
//!
//! let message = Message::new(
//!     Cursor::new(stream.as_bytes().to_vec()),
//!     "mixed",
//!     ParseOptions::default(),
//! )
//! .unwrap();
//!
//! let parts = message.all_parts().unwrap();
//! assert_eq!(parts.len(), 2);
//! assert_eq!(parts[0].decoded().unwrap(), b"complete content");
//! assert!(!parts[0].is_partial().unwrap());
//!
//! // The truncated body survives, cut to a whole number of 4-byte blocks.
//! assert!(parts[1].is_partial().unwrap());
//! assert_eq!(parts[1].decoded().unwrap(), b"cut off mid-");
//! assert!(message.is_partial().unwrap());
//! ```

mod boundary;
mod buffer;
mod codec;
mod error;
mod event;
mod headers;
mod message;
mod options;
mod parser;
mod part;

pub use codec::{CodecError, CodecRegistry, TransferCodec};
pub use error::{Error, PartLocator};
pub use event::MimeEvent;
pub use headers::{HeaderBlock, HeaderField};
pub use message::Message;
pub use options::ParseOptions;
pub use parser::MimeParser;
pub use part::Part;
