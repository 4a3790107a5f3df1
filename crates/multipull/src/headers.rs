//! Raw part headers.
//!
//! A header block is the run of `name: value` lines between a boundary line
//! and the first blank line. Values are kept verbatim (decoded as Latin-1);
//! interpreting them is the caller's concern. Lookup is by name,
//! case-insensitive, preserving the order values appeared in.

/// One raw header field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeaderField {
    /// Field name as it appeared, without the colon.
    pub name: String,
    /// Field value with folded continuation lines joined.
    pub value: String,
}

/// The complete header block of one part.
///
/// # Examples
///
/// ```rust
/// use multipull::HeaderBlock;
///
/// let block = HeaderBlock::from_lines(vec![
///     "Content-ID: <a@example>".to_string(),
///     "X-Tag: one".to_string(),
///     "X-Tag: two".to_string(),
/// ]);
/// assert_eq!(block.first("content-id"), Some("<a@example>"));
/// assert_eq!(block.get("x-tag"), Some(vec!["one", "two"]));
/// assert_eq!(block.get("absent"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeaderBlock {
    fields: Vec<HeaderField>,
}

impl HeaderBlock {
    /// Builds a block from raw header lines (terminators stripped).
    ///
    /// A line starting with space or tab continues the previous field's
    /// value. Lines without a colon are ignored.
    #[must_use]
    pub fn from_lines(lines: Vec<String>) -> Self {
        let mut fields: Vec<HeaderField> = Vec::new();
        for line in lines {
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some(last) = fields.last_mut() {
                    last.value.push(' ');
                    last.value.push_str(line.trim_start_matches([' ', '\t']));
                }
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            fields.push(HeaderField {
                name: name.trim().to_string(),
                value: value.trim().to_string(),
            });
        }
        Self { fields }
    }

    /// All values for `name` in order of appearance, or `None` if the
    /// header is absent. Matching is ASCII case-insensitive.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Vec<&str>> {
        let values: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
            .collect();
        if values.is_empty() { None } else { Some(values) }
    }

    /// The first value for `name`, if any.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }

    /// Iterates over all fields in order.
    pub fn iter(&self) -> impl Iterator<Item = &HeaderField> {
        self.fields.iter()
    }

    /// Number of fields in the block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the block has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decodes header bytes as Latin-1, mapping each byte to the code point of
/// the same value. Lossless for any input.
pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
