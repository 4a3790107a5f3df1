//! The message assembler.
//!
//! Owns the single parse cursor: `make_progress` advances the pull parser by
//! exactly one event and applies it to the part collections, and it is the
//! only path by which the underlying stream moves. All assembler state lives
//! behind one mutex, so two callers reading two different parts concurrently
//! serialize their state-machine steps and otherwise proceed independently.

use std::{
    collections::HashMap,
    fmt,
    io::Read,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{debug, warn};

use crate::{
    codec::{CodecRegistry, TransferCodec},
    error::{Error, PartLocator},
    event::MimeEvent,
    headers::HeaderBlock,
    options::ParseOptions,
    parser::MimeParser,
    part::{Part, PartInner},
};

/// A multipart message lazily assembled from a byte stream.
///
/// Parts are available by boundary-order index or by correlation
/// identifier, before or after parsing reaches them. The message drives its
/// stream at most as far as each access requires; [`Message::all_parts`]
/// drains it completely.
///
/// # Examples
///
/// ```rust
/// use std::io::Cursor;
///
/// use multipull::{Message, ParseOptions};
///
/// let stream = "preamble\r\n\
///     --sep\r\n\
///     Content-ID: <greeting@host>\r\n\
///     \r\n\
///     hello\r\n\
///     --sep--\r\n";
/// let message = Message::new(
///     Cursor::new(stream.as_bytes().to_vec()),
///     "sep",
///     ParseOptions::default(),
/// )
/// .unwrap();
///
/// let parts = message.all_parts().unwrap();
/// assert_eq!(parts.len(), 1);
/// assert_eq!(parts[0].content_id().unwrap(), "greeting@host");
/// assert_eq!(parts[0].decoded().unwrap(), b"hello");
/// assert!(!message.is_partial().unwrap());
/// ```
pub struct Message {
    core: Arc<MessageCore>,
}

pub(crate) struct MessageCore {
    assembler: Mutex<Assembler>,
}

impl MessageCore {
    fn lock(&self) -> MutexGuard<'_, Assembler> {
        self.assembler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies exactly one parser event. Returns whether more are possible.
    pub(crate) fn make_progress(&self) -> Result<bool, Error> {
        self.lock().make_progress()
    }

    pub(crate) fn decode(&self, encoding: &str, input: &[u8]) -> Result<Vec<u8>, Error> {
        self.lock().codecs.decode(encoding, input)
    }
}

struct Assembler {
    events: MimeParser<Box<dyn Read + Send>>,
    /// Parts in boundary order, including unresolved index placeholders.
    parts: Vec<Arc<PartInner>>,
    /// Parts by correlation identifier, including unresolved placeholders.
    by_id: HashMap<String, Arc<PartInner>>,
    current: Option<Arc<PartInner>>,
    cursor: usize,
    parsed: bool,
    partial: bool,
    codecs: CodecRegistry,
}

impl Assembler {
    fn make_progress(&mut self) -> Result<bool, Error> {
        let Some(event) = self.events.next_event() else {
            return Ok(false);
        };
        match event? {
            MimeEvent::MessageStarted | MimeEvent::PartStarted => {}
            MimeEvent::HeadersReady(block) => self.apply_headers(block)?,
            MimeEvent::Content { data, is_partial } => {
                let current = self.current.clone().ok_or(Error::InternalInvariant(
                    "content event arrived before any headers",
                ))?;
                if is_partial {
                    current.mark_partial();
                    self.partial = true;
                }
                current.push_chunk(&data);
            }
            MimeEvent::PartEnded => {
                if let Some(part) = self.current.take() {
                    part.finalize();
                }
                self.cursor += 1;
            }
            MimeEvent::MessageEnded => {
                debug!("message fully parsed: {} parts", self.parts.len());
                self.parsed = true;
            }
        }
        Ok(true)
    }

    /// Resolves the part the arriving header block belongs to, converging
    /// any placeholders registered for its index or identifier.
    fn apply_headers(&mut self, block: HeaderBlock) -> Result<(), Error> {
        let mut cid = block
            .first("Content-ID")
            .map_or_else(|| self.cursor.to_string(), str::to_string);
        if cid.starts_with('<') && cid.chars().count() > 2 {
            let mut chars = cid.chars();
            chars.next();
            chars.next_back();
            cid = chars.as_str().to_string();
        }

        let list_part = self.parts.get(self.cursor).cloned();
        let map_part = self.lookup_id(&cid);
        let current = match (list_part, map_part) {
            (None, None) => {
                let part = PartInner::with_content_id(&cid);
                self.by_id.insert(cid, Arc::clone(&part));
                self.parts.push(Arc::clone(&part));
                part
            }
            (None, Some(map_part)) => {
                self.parts.push(Arc::clone(&map_part));
                map_part
            }
            (Some(list_part), None) => {
                list_part.set_content_id(&cid);
                self.by_id.insert(cid, Arc::clone(&list_part));
                list_part
            }
            (Some(list_part), Some(map_part)) => {
                if !Arc::ptr_eq(&list_part, &map_part) {
                    return Err(Error::IdentityConflict {
                        index: self.cursor,
                        content_id: cid,
                    });
                }
                list_part
            }
        };
        current.set_headers(block);
        self.current = Some(current);
        Ok(())
    }

    /// Identifier lookup with a percent-decoded fallback; some producers
    /// write the identifier unescaped.
    fn lookup_id(&self, content_id: &str) -> Option<Arc<PartInner>> {
        if let Some(part) = self.by_id.get(content_id) {
            return Some(Arc::clone(part));
        }
        if content_id.contains('%') {
            if let Some(decoded) = percent_decode(content_id) {
                return self.by_id.get(&decoded).cloned();
            }
        }
        None
    }
}

impl Message {
    /// Creates a message over `source` with the given boundary token
    /// (without its leading dashes).
    ///
    /// The source is read on demand and released once fully consumed.
    ///
    /// # Errors
    ///
    /// With [`ParseOptions::parse_eagerly`] set, any parse failure surfaces
    /// here; otherwise construction cannot fail.
    pub fn new<R>(source: R, boundary: &str, options: ParseOptions) -> Result<Self, Error>
    where
        R: Read + Send + 'static,
    {
        let source: Box<dyn Read + Send> = Box::new(source);
        let events = MimeParser::new(source, boundary, &options);
        let message = Self {
            core: Arc::new(MessageCore {
                assembler: Mutex::new(Assembler {
                    events,
                    parts: Vec::new(),
                    by_id: HashMap::new(),
                    current: None,
                    cursor: 0,
                    parsed: false,
                    partial: false,
                    codecs: CodecRegistry::builtin(),
                }),
            }),
        };
        if options.parse_eagerly {
            message.parse_all()?;
        }
        Ok(message)
    }

    fn wrap(&self, inner: Arc<PartInner>) -> Part {
        Part::new(Arc::clone(&self.core), inner)
    }

    /// Advances parsing by exactly one event.
    ///
    /// Returns `false` once the message is fully parsed (or a previous step
    /// failed).
    ///
    /// # Errors
    ///
    /// Propagates the structural failure that aborted the parse.
    pub fn make_progress(&self) -> Result<bool, Error> {
        self.core.make_progress()
    }

    /// Drains the message to completion.
    ///
    /// # Errors
    ///
    /// Propagates the structural failure that aborted the parse.
    pub fn parse_all(&self) -> Result<(), Error> {
        while self.core.make_progress()? {}
        Ok(())
    }

    /// All parts in boundary order. Drains the message first.
    ///
    /// Placeholders requested beyond the real part count are not included.
    ///
    /// # Errors
    ///
    /// Propagates the structural failure that aborted the parse.
    pub fn all_parts(&self) -> Result<Vec<Part>, Error> {
        self.parse_all()?;
        let assembler = self.core.lock();
        let materialized = assembler.parts.len().min(assembler.cursor);
        Ok(assembler.parts[..materialized]
            .iter()
            .map(|inner| self.wrap(Arc::clone(inner)))
            .collect())
    }

    /// The part at the given boundary-order index.
    ///
    /// If parsing has not reached that index yet, a placeholder is returned
    /// that fills in as parsing proceeds.
    ///
    /// # Errors
    ///
    /// [`Error::PartNotFound`] when the message is fully parsed and has no
    /// such index.
    pub fn part_at(&self, index: usize) -> Result<Part, Error> {
        let mut assembler = self.core.lock();
        if assembler.parsed {
            // Fully parsed: only materialized indices exist; unresolved
            // placeholders beyond the cursor do not count.
            if index >= assembler.cursor {
                return Err(Error::PartNotFound(PartLocator::Index(index)));
            }
        } else {
            while assembler.parts.len() <= index {
                assembler.parts.push(PartInner::new());
            }
        }
        let inner = Arc::clone(&assembler.parts[index]);
        drop(assembler);
        Ok(self.wrap(inner))
    }

    /// The part with the given correlation identifier (pass a `Content-ID`
    /// without its angle brackets).
    ///
    /// If parsing has not reached that part yet, a placeholder is returned
    /// that fills in as parsing proceeds.
    ///
    /// # Errors
    ///
    /// [`Error::PartNotFound`] when the message is fully parsed and has no
    /// such identifier.
    pub fn part_by_id(&self, content_id: &str) -> Result<Part, Error> {
        let mut assembler = self.core.lock();
        if let Some(inner) = assembler.lookup_id(content_id) {
            drop(assembler);
            return Ok(self.wrap(inner));
        }
        if assembler.parsed {
            return Err(Error::PartNotFound(PartLocator::ContentId(
                content_id.to_string(),
            )));
        }
        let inner = PartInner::with_content_id(content_id);
        assembler
            .by_id
            .insert(content_id.to_string(), Arc::clone(&inner));
        drop(assembler);
        Ok(self.wrap(inner))
    }

    /// Whether any part's body was cut short. Drains the message first so
    /// the answer is definitive.
    ///
    /// # Errors
    ///
    /// Propagates the structural failure that aborted the parse.
    pub fn is_partial(&self) -> Result<bool, Error> {
        self.parse_all()?;
        Ok(self.core.lock().partial)
    }

    /// Whether the closing boundary has been observed and applied.
    #[must_use]
    pub fn is_fully_parsed(&self) -> bool {
        self.core.lock().parsed
    }

    /// Registers (or replaces) the codec used to decode parts with the
    /// given transfer encoding.
    pub fn register_codec(&self, encoding: &str, codec: Arc<dyn TransferCodec>) {
        self.core.lock().codecs.register(encoding, codec);
    }

    /// Closes every materialized part's sink, from both the index and the
    /// identifier collections. Idempotent and safe after a failed or
    /// partial parse; individual close failures are logged, never raised.
    pub fn close(&self) {
        let assembler = self.core.lock();
        for inner in assembler.parts.iter().chain(assembler.by_id.values()) {
            if let Err(e) = inner.close() {
                warn!("closing part sink failed: {e}");
            }
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assembler = self.core.lock();
        f.debug_struct("Message")
            .field("parts", &assembler.parts.len())
            .field("parsed", &assembler.parsed)
            .field("partial", &assembler.partial)
            .finish()
    }
}

/// Decodes `%XX` escapes (and `+` as space), yielding `None` on malformed
/// escapes or non-UTF-8 results.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 3 <= bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}
