//! Git object identifier (SHA-1 hash)
//!
//! Object IDs are 20-byte SHA-1 digests of `<kind> <size>\0<content>`.
//! They uniquely identify all objects in Git (blobs, trees, commits).
//!
//! ## Format
//!
//! - Raw: 20 bytes, as embedded in tree entries
//! - Full: 40 hex characters (e.g., "abc123...def")
//! - Short: First 12 characters, used in progress output
//!
//! The null identifier (20 zero bytes) is the "no object" sentinel.

use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::{OBJECT_ID_LENGTH, OBJECT_ID_SIZE, SHORT_OBJECT_ID_LENGTH};
use sha1::{Digest, Sha1};
use std::io;

/// Git object identifier (SHA-1 hash)
///
/// Stored in binary form; rendered as lowercase hex for the wire protocol and display.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_SIZE]);

impl ObjectId {
    /// Build an object ID from raw digest bytes
    ///
    /// # Arguments
    ///
    /// * `bytes` - Exactly 20 bytes
    pub fn try_from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let raw: [u8; OBJECT_ID_SIZE] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Invalid object ID length: {}", bytes.len()))?;
        Ok(Self(raw))
    }

    /// Parse and validate an object ID from a hex string
    ///
    /// # Arguments
    ///
    /// * `id` - 40-character hexadecimal string
    pub fn try_parse(id: &str) -> anyhow::Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(anyhow::anyhow!("Invalid object ID length: {}", id.len()));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow::anyhow!("Invalid object ID characters: {}", id));
        }

        let mut raw = [0u8; OBJECT_ID_SIZE];
        for (i, byte) in raw.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&id[i * 2..i * 2 + 2], 16)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Invalid hex digit"))?;
        }

        Ok(Self(raw))
    }

    /// The "no object" sentinel
    pub fn null() -> Self {
        Self([0; OBJECT_ID_SIZE])
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0; OBJECT_ID_SIZE]
    }

    /// Hash an object body under its kind tag
    ///
    /// Computes SHA-1 over `"<kind> <len>\0<body>"`, the same preimage git uses.
    pub fn for_object(kind: ObjectType, body: &[u8]) -> Self {
        Self::for_raw_kind(kind.as_str(), body)
    }

    /// Like [`ObjectId::for_object`], for kinds this crate does not decode
    pub fn for_raw_kind(kind: &str, body: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(format!("{kind} {}\0", body.len()).as_bytes());
        hasher.update(body);

        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_SIZE] {
        &self.0
    }

    /// Leading byte, used to shard the object cache
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|byte| format!("{byte:02x}")).collect()
    }

    /// Get abbreviated form of the object ID
    ///
    /// # Returns
    ///
    /// First 12 hex characters of the hash
    pub fn to_short_oid(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(SHORT_OBJECT_ID_LENGTH);
        hex
    }

    /// Write the object ID in binary format (20 bytes)
    ///
    /// Used when serializing tree objects.
    pub fn write_raw_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        writer.write_all(&self.0)?;
        Ok(())
    }

    /// Read an object ID from binary format (20 bytes)
    ///
    /// Used when deserializing tree objects.
    pub fn read_raw_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let mut raw = [0u8; OBJECT_ID_SIZE];
        reader.read_exact(&mut raw)?;
        Ok(Self(raw))
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl From<[u8; OBJECT_ID_SIZE]> for ObjectId {
    fn from(raw: [u8; OBJECT_ID_SIZE]) -> Self {
        Self(raw)
    }
}

impl TryFrom<&str> for ObjectId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        Self::try_parse(value)
    }
}
