//! Transfer-encoding codec seam.
//!
//! The parser never decodes content itself; a part's body is handed to a
//! codec resolved by the part's `Content-Transfer-Encoding` name. Only the
//! identity encodings ship built in. Callers register codecs for anything
//! else (base64, quoted-printable, ...).

use std::{collections::HashMap, fmt, sync::Arc};

use thiserror::Error;

use crate::error::Error;

/// A codec failure, carrying a human-readable description.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CodecError(String);

impl CodecError {
    /// Creates a codec failure from a description.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Decodes a transfer encoding into raw bytes.
pub trait TransferCodec: Send + Sync {
    /// Decodes one part's complete encoded body.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] describing the malformed input.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Identity pass-through for encodings that carry raw bytes.
struct IdentityCodec;

impl TransferCodec for IdentityCodec {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(input.to_vec())
    }
}

/// Codecs keyed by lower-cased transfer-encoding name.
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn TransferCodec>>,
}

impl CodecRegistry {
    /// A registry holding only the identity encodings `binary`, `7bit`
    /// and `8bit`.
    #[must_use]
    pub fn builtin() -> Self {
        let identity: Arc<dyn TransferCodec> = Arc::new(IdentityCodec);
        let mut codecs: HashMap<String, Arc<dyn TransferCodec>> = HashMap::new();
        for name in ["binary", "7bit", "8bit"] {
            codecs.insert(name.to_string(), Arc::clone(&identity));
        }
        Self { codecs }
    }

    /// Registers (or replaces) the codec for `encoding`.
    pub fn register(&mut self, encoding: &str, codec: Arc<dyn TransferCodec>) {
        self.codecs.insert(encoding.to_ascii_lowercase(), codec);
    }

    pub(crate) fn decode(&self, encoding: &str, input: &[u8]) -> Result<Vec<u8>, Error> {
        let codec = self
            .codecs
            .get(&encoding.to_ascii_lowercase())
            .ok_or_else(|| Error::UnsupportedEncoding(encoding.to_string()))?;
        codec.decode(input).map_err(|e| Error::Decode {
            encoding: encoding.to_string(),
            message: e.to_string(),
        })
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("encodings", &self.codecs.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_encodings_pass_bytes_through() {
        let registry = CodecRegistry::builtin();
        for name in ["binary", "7BIT", "8bit"] {
            assert_eq!(registry.decode(name, b"abc").unwrap(), b"abc");
        }
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let registry = CodecRegistry::builtin();
        let err = registry.decode("base64", b"aGk=").unwrap_err();
        assert!(matches!(err, Error::UnsupportedEncoding(name) if name == "base64"));
    }

    #[test]
    fn registered_codec_is_used() {
        struct Reverse;
        impl TransferCodec for Reverse {
            fn decode(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
                Ok(input.iter().rev().copied().collect())
            }
        }
        let mut registry = CodecRegistry::builtin();
        registry.register("x-reverse", Arc::new(Reverse));
        assert_eq!(registry.decode("X-Reverse", b"abc").unwrap(), b"cba");
    }

    #[test]
    fn codec_failures_surface_the_encoding_name() {
        struct Failing;
        impl TransferCodec for Failing {
            fn decode(&self, _input: &[u8]) -> Result<Vec<u8>, CodecError> {
                Err(CodecError::new("bad quantum"))
            }
        }
        let mut registry = CodecRegistry::builtin();
        registry.register("base64", Arc::new(Failing));
        let err = registry.decode("base64", b"!!!").unwrap_err();
        assert!(matches!(err, Error::Decode { encoding, .. } if encoding == "base64"));
    }
}
