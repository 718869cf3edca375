//! # Records
//!
//! Tag identifiers and the canonical textual record derived from them.
//!
//! ## Record Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Record Encoding                                │
//! │                                                                         │
//! │  TagUid bytes:   [0x04] [0xA3] [0x9F]                                  │
//! │                     │      │      │                                     │
//! │                     ▼      ▼      ▼                                     │
//! │  Record:          "04"   "A3"   "9F"   → "04A39F"                      │
//! │                                                                         │
//! │  • 2 uppercase hex digits per byte, zero padded                        │
//! │  • No separators, input order preserved                                │
//! │  • Same string on the wire ({"uid": "04A39F"}) and on disk (one line)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::MAX_UID_LEN;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

// =============================================================================
// Tag UID
// =============================================================================

/// Raw identifier bytes read from a tag.
///
/// Always holds between 1 and [`MAX_UID_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagUid(Vec<u8>);

impl TagUid {
    /// Wraps raw identifier bytes, rejecting empty or oversized reads.
    pub fn new(bytes: impl Into<Vec<u8>>) -> CoreResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() || bytes.len() > MAX_UID_LEN {
            return Err(CoreError::InvalidUidLength {
                len: bytes.len(),
                max: MAX_UID_LEN,
            });
        }
        Ok(TagUid(bytes))
    }

    /// Returns the identifier bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of identifier bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no identifier bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Record
// =============================================================================

/// Canonical uppercase-hex form of a tag identifier.
///
/// ## Invariant
/// Length is even and at least 2; every character is `0-9` or `A-F`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Record(String);

impl Record {
    /// Encodes identifier bytes as a record.
    ///
    /// Pure and deterministic: the same identifier always yields the same
    /// record.
    pub fn encode(uid: &TagUid) -> Self {
        let mut out = String::with_capacity(uid.len() * 2);
        for byte in uid.as_bytes() {
            out.push(HEX_DIGITS[usize::from(byte >> 4)] as char);
            out.push(HEX_DIGITS[usize::from(byte & 0x0F)] as char);
        }
        Record(out)
    }

    /// Returns the record text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the record back into identifier bytes.
    pub fn to_uid(&self) -> CoreResult<TagUid> {
        let bytes = self
            .0
            .as_bytes()
            .chunks(2)
            .map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1]))
            .collect::<Vec<u8>>();
        TagUid::new(bytes)
    }
}

/// Value of an already-validated hex digit.
fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

impl FromStr for Record {
    type Err = CoreError;

    /// Parses one line of a queue file.
    ///
    /// Surrounding whitespace is ignored and lowercase digits are
    /// canonicalised to uppercase.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let text = line.trim();
        let malformed = |reason| CoreError::MalformedRecord {
            line: text.to_string(),
            reason,
        };

        if text.is_empty() {
            return Err(malformed("empty"));
        }
        if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(malformed("non-hex character"));
        }
        if text.len() % 2 != 0 {
            return Err(malformed("odd number of hex digits"));
        }
        if text.len() > MAX_UID_LEN * 2 {
            return Err(malformed("longer than any tag identifier"));
        }

        Ok(Record(text.to_ascii_uppercase()))
    }
}

impl From<&TagUid> for Record {
    fn from(uid: &TagUid) -> Self {
        Record::encode(uid)
    }
}

impl AsRef<str> for Record {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
