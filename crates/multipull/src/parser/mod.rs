//! The pull parser state machine.
//!
//! Overview
//! - Consumes the scan window through the boundary matcher and exposes the
//!   multipart structure as a pull sequence of [`MimeEvent`]s: each call to
//!   [`MimeParser::next_event`] performs exactly one state-machine step and
//!   yields exactly one event.
//! - The sequence is forward-only and single-pass. It fuses after
//!   `MessageEnded` or after the first error; a fresh parse requires a fresh
//!   parser over a fresh stream.
//! - Truncation handling is a designed branch, not an error path: when the
//!   source ends mid-body and partial mode is on, the tail chunk is emitted
//!   flagged partial and cut back to a whole number of encoding blocks, so a
//!   downstream block decoder never sees a torn quantum.
//!
//! The grammar consumed here is the MIME multipart delimiter grammar: a
//! boundary line is `--` + token, optionally followed by horizontal
//! whitespace, then a line terminator; the closing boundary carries a `--`
//! suffix.

use std::io::Read;

use log::trace;

use crate::{
    boundary::BoundaryPattern,
    buffer::ScanBuffer,
    error::Error,
    event::MimeEvent,
    headers::{HeaderBlock, latin1},
    options::ParseOptions,
};


// The grammar does not allow whitespace after a boundary, but mail writers
// emit it anyway; tolerate at most this many characters before the line
// terminator.
const MAX_TRAILING_WHITESPACE: usize = 1000;

// Width of one transfer-encoding block; a partial tail is truncated to a
// multiple of this so block decoders receive whole quanta only.
const ENCODED_BLOCK: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    StartMessage,
    SkipPreamble,
    StartPart,
    Headers,
    Body,
    EndPart,
    EndMessage,
}

enum HeaderLine {
    Field(String),
    Blank,
    Truncated,
}

/// Pull parser over a multipart byte stream.
///
/// Yields one [`MimeEvent`] per step. Most callers want the lazy
/// [`Message`](crate::Message) assembler instead; the parser is exposed for
/// event-level consumers.
///
/// # Examples
///
/// ```rust
/// use multipull::{MimeEvent, MimeParser, ParseOptions};
///
/// let stream = b"--b\r\nContent-ID: <a>\r\n\r\nhi\r\n--b--\r\n";
/// let parser = MimeParser::new(&stream[..], "b", &ParseOptions::default());
/// let events: Vec<_> = parser.map(Result::unwrap).collect();
/// assert_eq!(events.len(), 6);
/// assert_eq!(events[0], MimeEvent::MessageStarted);
/// assert_eq!(events[5], MimeEvent::MessageEnded);
/// ```
pub struct MimeParser<R> {
    buffer: ScanBuffer<R>,
    pattern: BoundaryPattern,
    chunk_size: usize,
    enable_partial: bool,
    state: ParserState,
    /// Whether the window currently begins at a line start.
    bol: bool,
    /// Set once the closing boundary (or a tolerated truncation) is seen.
    done: bool,
    /// Terminal flag; the event sequence is exhausted.
    parsed: bool,
    /// Sticky truncation marker carried onto emitted chunks.
    is_partial: bool,
    /// Zero-based index of the part currently being parsed.
    part_index: usize,
    poisoned: bool,
}

impl<R: Read> MimeParser<R> {
    /// Creates a parser over `source` for the given boundary token (without
    /// its leading dashes).
    pub fn new(source: R, boundary: &str, options: &ParseOptions) -> Self {
        let pattern = BoundaryPattern::new(boundary);
        // One chunk of lookahead, plus CRLF + boundary + "--\r\n" + the
        // trailing-whitespace tolerance.
        let capacity = options.chunk_size + 2 + pattern.len() + 4 + MAX_TRAILING_WHITESPACE;
        Self {
            buffer: ScanBuffer::new(source, capacity, options.max_total_bytes),
            pattern,
            chunk_size: options.chunk_size,
            enable_partial: options.enable_partial,
            state: ParserState::StartMessage,
            bol: false,
            done: false,
            parsed: false,
            is_partial: false,
            part_index: 0,
            poisoned: false,
        }
    }

    /// Performs one state-machine step.
    ///
    /// Returns `None` once the sequence is exhausted (after `MessageEnded`
    /// or after an error has been yielded).
    pub fn next_event(&mut self) -> Option<Result<MimeEvent, Error>> {
        if self.parsed || self.poisoned {
            return None;
        }
        let step = self.step();
        if step.is_err() {
            self.poisoned = true;
        }
        Some(step)
    }

    fn step(&mut self) -> Result<MimeEvent, Error> {
        loop {
            match self.state {
                ParserState::StartMessage => {
                    self.state = ParserState::SkipPreamble;
                    return Ok(MimeEvent::MessageStarted);
                }
                ParserState::SkipPreamble => {
                    self.skip_preamble()?;
                    self.state = ParserState::Headers;
                    return Ok(MimeEvent::PartStarted);
                }
                ParserState::StartPart => {
                    self.state = ParserState::Headers;
                    return Ok(MimeEvent::PartStarted);
                }
                ParserState::Headers => match self.read_headers()? {
                    Some(block) => {
                        self.state = ParserState::Body;
                        self.bol = true;
                        return Ok(MimeEvent::HeadersReady(block));
                    }
                    None => {
                        // The header block never completed. The part is not
                        // materialized: no headers event, no content, no
                        // part end.
                        if !self.enable_partial {
                            return Err(Error::UnterminatedMessage {
                                index: self.part_index,
                            });
                        }
                        trace!(
                            "header block of part {} truncated; part skipped",
                            self.part_index
                        );
                        self.done = true;
                        self.state = ParserState::EndMessage;
                    }
                },
                ParserState::Body => {
                    let data = self.read_body()?;
                    self.bol = false;
                    return Ok(MimeEvent::Content {
                        data,
                        is_partial: self.is_partial,
                    });
                }
                ParserState::EndPart => {
                    self.state = if self.done {
                        ParserState::EndMessage
                    } else {
                        ParserState::StartPart
                    };
                    self.part_index += 1;
                    return Ok(MimeEvent::PartEnded);
                }
                ParserState::EndMessage => {
                    self.parsed = true;
                    self.buffer.close_source();
                    return Ok(MimeEvent::MessageEnded);
                }
            }
        }
    }

    /// Scans forward to the first boundary line and discards everything
    /// before it.
    fn skip_preamble(&mut self) -> Result<(), Error> {
        let bl = self.pattern.len();
        loop {
            if !self.buffer.at_eof() {
                self.buffer.fill()?;
            }
            let len = self.buffer.len();
            let Some(start) = self.pattern.find(self.buffer.filled()) else {
                if self.buffer.at_eof() {
                    return Err(Error::MalformedStream);
                }
                // Keep a pattern-length tail in case the boundary straddles
                // the window edge.
                self.buffer.discard(len - (bl - 1));
                continue;
            };
            if start > self.chunk_size {
                self.buffer.discard(start);
                continue;
            }
            let data = self.buffer.filled();
            let mut lwsp = 0;
            while start + bl + lwsp < len
                && (data[start + bl + lwsp] == b' ' || data[start + bl + lwsp] == b'\t')
            {
                lwsp += 1;
            }
            if start + bl + lwsp < len
                && (data[start + bl + lwsp] == b'\n' || data[start + bl + lwsp] == b'\r')
            {
                if data[start + bl + lwsp] == b'\n' {
                    self.buffer.discard(start + bl + lwsp + 1);
                    return Ok(());
                } else if start + bl + lwsp + 1 < len && data[start + bl + lwsp + 1] == b'\n' {
                    self.buffer.discard(start + bl + lwsp + 2);
                    return Ok(());
                }
            }
            // Boundary-shaped bytes mid-line: resynchronize one byte past
            // the apparent match.
            self.buffer.discard(start + 1);
        }
    }

    /// Collects the current part's header lines.
    ///
    /// Returns `None` when the source ends before the block's terminating
    /// blank line.
    fn read_headers(&mut self) -> Result<Option<HeaderBlock>, Error> {
        if !self.buffer.at_eof() {
            self.buffer.fill()?;
        }
        let mut offset = 0usize;
        let mut lines: Vec<String> = Vec::new();
        loop {
            match self.next_header_line(&mut offset)? {
                HeaderLine::Blank => return Ok(Some(HeaderBlock::from_lines(lines))),
                HeaderLine::Field(line) => lines.push(line),
                HeaderLine::Truncated => return Ok(None),
            }
        }
    }

    /// Reads one header line starting at `offset` into the window.
    ///
    /// Lines are terminated by LF or CRLF. Consumed bytes stay in the
    /// window (tracked by `offset`) until the blank line, which consumes
    /// the whole block at once.
    fn next_header_line(&mut self, offset: &mut usize) -> Result<HeaderLine, Error> {
        let mut n = 0usize;
        let mut term = 0usize;
        loop {
            if *offset + n >= self.buffer.len() {
                if self.buffer.at_eof() {
                    return Ok(HeaderLine::Truncated);
                }
                self.buffer.grow()?;
                if *offset + n >= self.buffer.len() {
                    return Ok(HeaderLine::Truncated);
                }
            }
            let b = self.buffer.filled()[*offset + n];
            if b == b'\n' {
                term = 1;
                break;
            }
            if *offset + n + 1 == self.buffer.len() {
                // The line continues past the window; widen it.
                self.buffer.grow()?;
            }
            if *offset + n + 1 >= self.buffer.len() {
                return Ok(HeaderLine::Truncated);
            }
            if b == b'\r' && self.buffer.filled()[*offset + n + 1] == b'\n' {
                term = 2;
                break;
            }
            n += 1;
        }
        if n == 0 {
            // Blank line: the block is complete. Consume it wholesale.
            self.buffer.discard(*offset + term);
            return Ok(HeaderLine::Blank);
        }
        let line = latin1(&self.buffer.filled()[*offset..*offset + n]);
        *offset += n + term;
        Ok(HeaderLine::Field(line))
    }

    /// Reads and returns one chunk of the current part's body.
    ///
    /// At return, the window holds the unconsumed remainder at index 0.
    fn read_body(&mut self) -> Result<Vec<u8>, Error> {
        if !self.buffer.at_eof() {
            self.buffer.fill()?;
        }
        let len = self.buffer.len();
        let bl = self.pattern.len();
        let Some(start) = self.pattern.find(self.buffer.filled()) else {
            // No boundary in the window.
            debug_assert!(self.buffer.at_eof() || len >= self.chunk_size);
            if self.buffer.at_eof() {
                self.done = true;
                if self.enable_partial {
                    trace!("source exhausted inside part {}; flagging partial", self.part_index);
                    self.is_partial = true;
                    self.state = ParserState::EndPart;
                    let aligned = len - len % ENCODED_BLOCK;
                    return Ok(self.buffer.take(aligned, 0));
                }
                return Err(Error::UnterminatedMessage {
                    index: self.part_index,
                });
            }
            return Ok(self.buffer.take(self.chunk_size, len - self.chunk_size));
        };
        // A boundary candidate. Is it at the start of a line?
        let data = self.buffer.filled();
        let mut chunk_len = start;
        if self.bol && start == 0 {
            // Window begins the line; nothing to trim.
        } else if start > 0 && (data[start - 1] == b'\n' || data[start - 1] == b'\r') {
            chunk_len -= 1;
            if data[start - 1] == b'\n' && start > 1 && data[start - 2] == b'\r' {
                chunk_len -= 1;
            }
        } else {
            // Mid-line: ordinary content. Emit one byte past the apparent
            // match and rescan.
            return Ok(self.buffer.take(start + 1, len - start - 1));
        }

        if start + bl + 1 < len && data[start + bl] == b'-' && data[start + bl + 1] == b'-' {
            // The closing boundary.
            self.state = ParserState::EndPart;
            self.done = true;
            return Ok(self.buffer.take(chunk_len, 0));
        }

        let mut lwsp = 0;
        while start + bl + lwsp < len
            && (data[start + bl + lwsp] == b' ' || data[start + bl + lwsp] == b'\t')
        {
            lwsp += 1;
        }

        if start + bl + lwsp < len && data[start + bl + lwsp] == b'\n' {
            self.state = ParserState::EndPart;
            return Ok(self.buffer.take(chunk_len, len - start - bl - lwsp - 1));
        } else if start + bl + lwsp + 1 < len
            && data[start + bl + lwsp] == b'\r'
            && data[start + bl + lwsp + 1] == b'\n'
        {
            self.state = ParserState::EndPart;
            return Ok(self.buffer.take(chunk_len, len - start - bl - lwsp - 2));
        } else if start + bl + lwsp + 1 < len {
            // Boundary bytes embedded in content.
            return Ok(self.buffer.take(chunk_len + 1, len - chunk_len - 1));
        } else if self.buffer.at_eof() {
            self.done = true;
            return Err(Error::UnterminatedMessage {
                index: self.part_index,
            });
        }

        // Not enough buffered to decide; emit the settled prefix and rescan
        // with more data.
        Ok(self.buffer.take(chunk_len, len - chunk_len))
    }
}

impl<R: Read> Iterator for MimeParser<R> {
    type Item = Result<MimeEvent, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }
}
