//! One attachment part.
//!
//! A [`Part`] handle is cheap to clone and may exist before parsing reaches
//! the part it names (a placeholder created by index or identifier lookup).
//! Accessors drive the owning message forward only as far as needed for the
//! requested datum; the content accessors additionally wait for the part to
//! be finalized.

use std::{
    fmt, io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::warn;

use crate::{error::Error, headers::HeaderBlock, message::MessageCore};

#[derive(Default)]
struct PartState {
    headers: Option<HeaderBlock>,
    content_id: Option<String>,
    content_type: Option<String>,
    transfer_encoding: Option<String>,
    data: Vec<u8>,
    partial: bool,
    done: bool,
    closed: bool,
}

/// Shared per-part record, mutated only by the assembler until the part is
/// finalized.
pub(crate) struct PartInner {
    state: Mutex<PartState>,
}

impl PartInner {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PartState::default()),
        })
    }

    pub(crate) fn with_content_id(content_id: &str) -> Arc<Self> {
        let inner = Self::new();
        inner.lock().content_id = Some(content_id.to_string());
        inner
    }

    fn lock(&self) -> MutexGuard<'_, PartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_headers(&self, block: HeaderBlock) {
        let mut state = self.lock();
        state.content_type = Some(
            block
                .first("Content-Type")
                .unwrap_or("application/octet-stream")
                .to_string(),
        );
        state.transfer_encoding = Some(
            block
                .first("Content-Transfer-Encoding")
                .unwrap_or("binary")
                .to_string(),
        );
        state.headers = Some(block);
    }

    pub(crate) fn set_content_id(&self, content_id: &str) {
        self.lock().content_id = Some(content_id.to_string());
    }

    pub(crate) fn push_chunk(&self, chunk: &[u8]) {
        self.lock().data.extend_from_slice(chunk);
    }

    pub(crate) fn mark_partial(&self) {
        self.lock().partial = true;
    }

    pub(crate) fn finalize(&self) {
        self.lock().done = true;
    }

    pub(crate) fn close(&self) -> io::Result<()> {
        let mut state = self.lock();
        if !state.closed {
            state.data = Vec::new();
            state.closed = true;
        }
        Ok(())
    }

    fn headers_ready(&self) -> bool {
        self.lock().headers.is_some()
    }

    fn is_done(&self) -> bool {
        self.lock().done
    }
}

/// One boundary-delimited part of a [`Message`](crate::Message).
///
/// Handles are clones of the same underlying record: two handles obtained by
/// index and by identifier for the same physical part compare equal.
#[derive(Clone)]
pub struct Part {
    core: Arc<MessageCore>,
    inner: Arc<PartInner>,
}

impl Part {
    pub(crate) fn new(core: Arc<MessageCore>, inner: Arc<PartInner>) -> Self {
        Self { core, inner }
    }

    /// Drives parsing until this part's headers are present.
    fn ensure_headers(&self) -> Result<(), Error> {
        loop {
            if self.inner.headers_ready() {
                return Ok(());
            }
            if !self.core.make_progress()? {
                if self.inner.headers_ready() {
                    return Ok(());
                }
                return Err(Error::InternalInvariant(
                    "part headers missing after the message was fully parsed",
                ));
            }
        }
    }

    /// Drives parsing until this part is finalized or the message drains.
    fn ensure_done(&self) -> Result<(), Error> {
        loop {
            if self.inner.is_done() {
                return Ok(());
            }
            if !self.core.make_progress()? {
                return Ok(());
            }
        }
    }

    /// The part's correlation identifier.
    ///
    /// Either the first `Content-ID` header value (angle brackets stripped)
    /// or, when the header is absent, the part's decimal index.
    ///
    /// # Errors
    ///
    /// Propagates parse failures from driving the message.
    pub fn content_id(&self) -> Result<String, Error> {
        if let Some(cid) = self.inner.lock().content_id.clone() {
            return Ok(cid);
        }
        self.ensure_headers()?;
        self.inner
            .lock()
            .content_id
            .clone()
            .ok_or(Error::InternalInvariant(
                "content id missing after headers arrived",
            ))
    }

    /// The first `Content-Type` header value, defaulting to
    /// `application/octet-stream`.
    ///
    /// # Errors
    ///
    /// Propagates parse failures from driving the message.
    pub fn content_type(&self) -> Result<String, Error> {
        self.ensure_headers()?;
        self.inner
            .lock()
            .content_type
            .clone()
            .ok_or(Error::InternalInvariant(
                "content type missing after headers arrived",
            ))
    }

    /// The first `Content-Transfer-Encoding` header value, defaulting to
    /// `binary`.
    ///
    /// # Errors
    ///
    /// Propagates parse failures from driving the message.
    pub fn content_transfer_encoding(&self) -> Result<String, Error> {
        self.ensure_headers()?;
        self.inner
            .lock()
            .transfer_encoding
            .clone()
            .ok_or(Error::InternalInvariant(
                "transfer encoding missing after headers arrived",
            ))
    }

    /// All values of the named header, in order, or `None` if absent.
    /// Matching is case-insensitive.
    ///
    /// # Errors
    ///
    /// Propagates parse failures from driving the message.
    pub fn header(&self, name: &str) -> Result<Option<Vec<String>>, Error> {
        self.ensure_headers()?;
        let state = self.inner.lock();
        let headers = state.headers.as_ref().ok_or(Error::InternalInvariant(
            "part headers missing after headers arrived",
        ))?;
        Ok(headers
            .get(name)
            .map(|values| values.into_iter().map(str::to_string).collect()))
    }

    /// A clone of the part's complete header block.
    ///
    /// # Errors
    ///
    /// Propagates parse failures from driving the message.
    pub fn headers(&self) -> Result<HeaderBlock, Error> {
        self.ensure_headers()?;
        self.inner
            .lock()
            .headers
            .clone()
            .ok_or(Error::InternalInvariant(
                "part headers missing after headers arrived",
            ))
    }

    /// The part's body exactly as it appeared on the wire, still
    /// transfer-encoded. Drives parsing until the part is finalized.
    ///
    /// # Errors
    ///
    /// Propagates parse failures from driving the message.
    pub fn raw_content(&self) -> Result<Vec<u8>, Error> {
        self.ensure_headers()?;
        self.ensure_done()?;
        Ok(self.inner.lock().data.clone())
    }

    /// The part's body decoded through the codec registered for its
    /// transfer encoding.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedEncoding`] when no codec is
    /// registered for the encoding, and propagates parse and codec
    /// failures.
    pub fn decoded(&self) -> Result<Vec<u8>, Error> {
        let encoding = self.content_transfer_encoding()?;
        let raw = self.raw_content()?;
        self.core.decode(&encoding, &raw)
    }

    /// A readable stream over the decoded body.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Part::decoded`].
    pub fn read(&self) -> Result<io::Cursor<Vec<u8>>, Error> {
        Ok(io::Cursor::new(self.decoded()?))
    }

    /// Whether this part's body was cut short by source exhaustion.
    ///
    /// Sticky: once set, never reset. Drives parsing until the part is
    /// finalized so the answer is definitive.
    ///
    /// # Errors
    ///
    /// Propagates parse failures from driving the message.
    pub fn is_partial(&self) -> Result<bool, Error> {
        self.ensure_done()?;
        Ok(self.inner.lock().partial)
    }

    /// Releases the part's content. Idempotent; failures are logged, not
    /// raised.
    pub fn close(&self) {
        if let Err(e) = self.inner.close() {
            warn!("closing part sink failed: {e}");
        }
    }

    /// Whether [`Part::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl PartialEq for Part {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Part {}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Part")
            .field("content_id", &state.content_id)
            .field("transfer_encoding", &state.transfer_encoding)
            .field("len", &state.data.len())
            .field("partial", &state.partial)
            .field("done", &state.done)
            .finish()
    }
}
