//! Identity records: who owns which device.
//!
//! The identity service maps a 6-byte hardware address to a person's roll
//! number and name.  Records are persisted one per line in the form
//!
//! ```text
//! AA:BB:CC:DD:EE:FF|19100009|Awais
//! ```

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;

/// Longest name, in bytes of UTF-8, an identity record may carry.
pub const MAX_NAME_LEN: usize = 63;

/// Field separator in the persisted record format.
const FIELD_SEPARATOR: char = '|';

/// Returns `true` if `name` can be written as part of a single record line.
///
/// Control characters (NUL, line breaks) are refused; everything else,
/// including leading or trailing spaces, is kept verbatim.
pub fn is_storable_name(name: &str) -> bool {
    !name.chars().any(char::is_control)
}

/// A 6-byte hardware (MAC) address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({self})")
    }
}

/// Error returned when a textual hardware address cannot be parsed.
#[derive(Debug, Error, PartialEq)]
#[error("invalid hardware address {input:?}: expected six colon-separated hex pairs")]
pub struct MacAddressParseError {
    pub input: String,
}

impl FromStr for MacAddress {
    type Err = MacAddressParseError;

    /// Parses `AA:BB:CC:DD:EE:FF`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MacAddressParseError {
            input: s.to_string(),
        };
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(octets))
    }
}

/// A person's registration.
///
/// `id == 0` means "unset".  Uniqueness of `address` and of non-zero `id` is
/// enforced by the identity directory, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityRecord {
    pub id: i32,
    pub address: MacAddress,
    pub name: String,
}

impl IdentityRecord {
    pub fn new(id: i32, address: MacAddress, name: impl Into<String>) -> Self {
        Self {
            id,
            address,
            name: name.into(),
        }
    }

    /// Formats the record as one line of the persisted record file,
    /// without the trailing newline.
    pub fn to_record_line(&self) -> String {
        format!("{}|{}|{}", self.address, self.id, self.name)
    }

    /// Parses one line of the persisted record file.
    ///
    /// The name is everything after the second separator, byte for byte.
    /// Only the line terminator (`\n` or `\r\n`) is removed.
    ///
    /// # Errors
    ///
    /// Returns [`RecordLineError`] when a field is missing or malformed.
    pub fn parse_record_line(line: &str) -> Result<Self, RecordLineError> {
        let mut fields = line.trim_end_matches(['\r', '\n']).splitn(3, FIELD_SEPARATOR);
        let address = fields
            .next()
            .filter(|f| !f.trim().is_empty())
            .ok_or(RecordLineError::MissingField("address"))?;
        let id = fields.next().ok_or(RecordLineError::MissingField("id"))?;
        let name = fields.next().ok_or(RecordLineError::MissingField("name"))?;

        if name.len() > MAX_NAME_LEN {
            return Err(RecordLineError::NameTooLong(name.len()));
        }

        Ok(Self {
            id: id.trim().parse()?,
            address: address.trim().parse()?,
            name: name.to_string(),
        })
    }
}

/// Error returned when a record file line cannot be parsed.
#[derive(Debug, Error, PartialEq)]
pub enum RecordLineError {
    #[error("missing {0} field")]
    MissingField(&'static str),

    #[error(transparent)]
    Address(#[from] MacAddressParseError),

    #[error("invalid id: {0}")]
    Id(#[from] ParseIntError),

    #[error("name is {0} bytes; the limit is {MAX_NAME_LEN}")]
    NameTooLong(usize),
}

/// Which key an identity lookup searches by.
///
/// On the wire the choice is implicit: a non-zero id selects [`LookupKey::Id`],
/// a zero id selects [`LookupKey::Address`].  Carrying the discriminant
/// explicitly keeps that convention at the codec boundary.  A consequence is
/// that `LookupKey::Id(0)` has no wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey {
    Id(i32),
    Address(MacAddress),
}

impl LookupKey {
    /// Derives the key from the wire fields of a GET request.
    pub fn from_wire(id: i32, address: MacAddress) -> Self {
        if id != 0 {
            LookupKey::Id(id)
        } else {
            LookupKey::Address(address)
        }
    }

    /// Returns `true` if `record` is selected by this key.
    pub fn matches(&self, record: &IdentityRecord) -> bool {
        match self {
            LookupKey::Id(id) => record.id == *id,
            LookupKey::Address(address) => record.address == *address,
        }
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKey::Id(id) => write!(f, "id {id}"),
            LookupKey::Address(address) => write!(f, "address {address}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
