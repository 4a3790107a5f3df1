//! Parser configuration.

/// Configuration options for multipart message parsing.
///
/// # Examples
///
/// ```rust
/// use multipull::ParseOptions;
///
/// let options = ParseOptions {
///     chunk_size: 4096,
///     ..Default::default()
/// };
/// assert!(options.enable_partial);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Whether to drain the entire message when it is constructed.
    ///
    /// When `false`, parsing is demand-driven: the stream is advanced only
    /// as far as needed to satisfy each part access.
    ///
    /// # Default
    ///
    /// `false`
    pub parse_eagerly: bool,

    /// Approximate number of body bytes emitted per content chunk.
    ///
    /// Also sizes the scan window: the window always holds one chunk of
    /// lookahead plus the boundary and its trailing-whitespace tolerance.
    ///
    /// # Default
    ///
    /// `8192`
    pub chunk_size: usize,

    /// Whether a stream that ends mid-part is tolerated.
    ///
    /// When `true`, the in-progress part and the message are flagged
    /// partial and the tail chunk is truncated to a whole number of
    /// 4-byte encoding blocks. When `false`, such a stream fails with
    /// [`Error::UnterminatedMessage`](crate::Error::UnterminatedMessage).
    ///
    /// # Default
    ///
    /// `true`
    pub enable_partial: bool,

    /// Hard cap on the total number of bytes read from the source.
    ///
    /// Exceeding it fails the parse with
    /// [`Error::SizeLimitExceeded`](crate::Error::SizeLimitExceeded).
    ///
    /// # Default
    ///
    /// 45 MiB
    pub max_total_bytes: u64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            parse_eagerly: false,
            chunk_size: 8192,
            enable_partial: true,
            max_total_bytes: 45 * 1024 * 1024,
        }
    }
}
