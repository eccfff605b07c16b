//! Binary vault file format.
//!
//! A vault file has this layout (all integers little-endian):
//!
//! ```text
//! [QVLT: 4][version: 1][salt: 16][iterations: u32][mac: 32][record_count: u32]
//! record_count × [key_len: u32][key bytes][value_len: u32][value bytes]
//! ```
//!
//! - **Magic** (`QVLT`): identifies the file as a QVault vault.
//! - **Version**: format version (currently `1`).
//! - **Salt / iterations**: PBKDF2 parameters used to derive the key material.
//! - **MAC**: HMAC-SHA256 over the derived key material (see `crypto::integrity`).
//! - **Records**: encrypted key → encrypted value pairs, sorted by
//!   encrypted key so the same map always serializes to the same bytes.
//!
//! Writes replace the whole file in place.  There is no temp-file and
//! rename step, so a write interrupted half-way leaves a torn file that
//! `decode` will reject.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::crypto::integrity::TAG_LEN;
use crate::crypto::kdf::{MAX_ITERATIONS, SALT_LEN};
use crate::errors::{Result, VaultError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every vault file.
const MAGIC: &[u8; 4] = b"QVLT";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Fixed-size header: magic + version + salt + iterations + mac.
pub const HEADER_LEN: usize = 4 + 1 + SALT_LEN + 4 + TAG_LEN;

/// Byte offset of the salt inside the file.
pub const SALT_OFFSET: usize = 5;

/// Byte offset of the MAC inside the file.
pub const MAC_OFFSET: usize = SALT_OFFSET + SALT_LEN + 4;

/// Encrypted key bytes → encrypted value bytes.
pub type Records = HashMap<Vec<u8>, Vec<u8>>;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Key-derivation parameters and integrity tag stored at the start of a vault file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultHeader {
    pub salt: [u8; SALT_LEN],
    pub iterations: u32,
    pub mac: [u8; TAG_LEN],
}

/// A fully decoded vault file.
#[derive(Debug)]
pub struct VaultFile {
    pub header: VaultHeader,
    pub records: Records,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Serialize a header and record map to the binary layout.
pub fn encode(header: &VaultHeader, records: &Records) -> Result<Vec<u8>> {
    let record_count = u32::try_from(records.len()).map_err(|_| {
        VaultError::InvalidVaultFormat(format!("{} records exceed u32::MAX", records.len()))
    })?;

    let body_len: usize = records.iter().map(|(k, v)| 8 + k.len() + v.len()).sum();
    let mut buf = Vec::with_capacity(HEADER_LEN + 4 + body_len);

    buf.extend_from_slice(MAGIC); // 4 bytes
    buf.push(CURRENT_VERSION); // 1 byte
    buf.extend_from_slice(&header.salt); // 16 bytes
    buf.extend_from_slice(&header.iterations.to_le_bytes()); // 4 bytes LE
    buf.extend_from_slice(&header.mac); // 32 bytes
    buf.extend_from_slice(&record_count.to_le_bytes()); // 4 bytes LE

    // Sort by encrypted key for deterministic output.
    let mut sorted: Vec<(&Vec<u8>, &Vec<u8>)> = records.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    for (key, value) in sorted {
        push_field(&mut buf, key)?;
        push_field(&mut buf, value)?;
    }

    Ok(buf)
}

fn push_field(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    let len = u32::try_from(bytes.len()).map_err(|_| {
        VaultError::InvalidVaultFormat(format!("record length {} exceeds u32::MAX", bytes.len()))
    })?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Parse the binary layout back into a `VaultFile`.
pub fn decode(data: &[u8]) -> Result<VaultFile> {
    let mut reader = Reader::new(data);

    if reader.take(4, "magic")? != MAGIC {
        return Err(VaultError::InvalidVaultFormat(
            "missing QVLT magic bytes".into(),
        ));
    }

    let version = reader.array::<1>("version")?[0];
    if version != CURRENT_VERSION {
        return Err(VaultError::InvalidVaultFormat(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let salt = reader.array::<SALT_LEN>("salt")?;
    let iterations = reader.u32("iterations")?;
    if iterations == 0 || iterations > MAX_ITERATIONS {
        return Err(VaultError::InvalidVaultFormat(format!(
            "iteration count {iterations} out of range"
        )));
    }
    let mac = reader.array::<TAG_LEN>("mac")?;

    let record_count = reader.u32("record count")?;
    let mut records = Records::new();
    for _ in 0..record_count {
        let key = reader.field("record key")?;
        let value = reader.field("record value")?;
        if records.insert(key.to_vec(), value.to_vec()).is_some() {
            return Err(VaultError::InvalidVaultFormat(
                "duplicate record key".into(),
            ));
        }
    }

    if !reader.is_empty() {
        return Err(VaultError::InvalidVaultFormat(format!(
            "{} trailing bytes after records",
            reader.remaining()
        )));
    }

    Ok(VaultFile {
        header: VaultHeader {
            salt,
            iterations,
            mac,
        },
        records,
    })
}

/// Bounds-checked cursor over the raw file bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(VaultError::InvalidVaultFormat(format!(
                "file truncated while reading {what}"
            )));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array::<4>(what)?))
    }

    /// A non-empty length-prefixed byte field.
    fn field(&mut self, what: &str) -> Result<&'a [u8]> {
        let len = self.u32(what)?;
        let len = usize::try_from(len).map_err(|_| {
            VaultError::InvalidVaultFormat(format!(
                "{what} length {len} exceeds platform address space"
            ))
        })?;
        if len == 0 {
            return Err(VaultError::InvalidVaultFormat(format!("empty {what}")));
        }
        self.take(len, what)
    }
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Read and decode a vault file.
pub fn read_vault(path: &Path) -> Result<VaultFile> {
    let data = fs::read(path)?;
    decode(&data)
}

/// Rewrite an existing vault file with new contents.
pub fn write_vault(path: &Path, header: &VaultHeader, records: &Records) -> Result<()> {
    let buf = encode(header, records)?;
    fs::write(path, &buf)?;
    Ok(())
}

/// Write a brand-new vault file.  Fails if anything already exists at `path`.
///
/// On Unix the file is created with owner-only permissions (0600).
pub fn create_vault(path: &Path, header: &VaultHeader, records: &Records) -> Result<()> {
    let buf = encode(header, records)?;

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| {
        if e.kind() == ErrorKind::AlreadyExists {
            VaultError::AlreadyExists(path.to_path_buf())
        } else {
            VaultError::Io(e)
        }
    })?;
    file.write_all(&buf)?;
    file.sync_all()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> VaultHeader {
        VaultHeader {
            salt: [0x5A; SALT_LEN],
            iterations: 4_242,
            mac: [0xC3; TAG_LEN],
        }
    }

    fn sample_records() -> Records {
        let mut records = Records::new();
        records.insert(vec![1, 2, 3], vec![4, 5]);
        records.insert(vec![9], vec![8, 7, 6]);
        records
    }

    #[test]
    fn header_fields_sit_at_documented_offsets() {
        let header = sample_header();
        let buf = encode(&header, &Records::new()).unwrap();

        assert_eq!(&buf[0..4], b"QVLT");
        assert_eq!(buf[4], CURRENT_VERSION);
        assert_eq!(&buf[SALT_OFFSET..SALT_OFFSET + SALT_LEN], &header.salt);
        assert_eq!(&buf[21..25], &4_242u32.to_le_bytes());
        assert_eq!(&buf[MAC_OFFSET..MAC_OFFSET + TAG_LEN], &header.mac);
        assert_eq!(&buf[HEADER_LEN..], &0u32.to_le_bytes());
    }

    #[test]
    fn decode_restores_header_and_records() {
        let buf = encode(&sample_header(), &sample_records()).unwrap();
        let file = decode(&buf).unwrap();
        assert_eq!(file.header, sample_header());
        assert_eq!(file.records, sample_records());
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = encode(&sample_header(), &sample_records()).unwrap();
        let b = encode(&sample_header(), &sample_records()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut buf = encode(&sample_header(), &Records::new()).unwrap();
        buf[0] = b'X';
        assert!(matches!(decode(&buf), Err(VaultError::InvalidVaultFormat(_))));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut buf = encode(&sample_header(), &Records::new()).unwrap();
        buf[4] = 99;
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let header = VaultHeader {
            iterations: 0,
            ..sample_header()
        };
        let buf = encode(&header, &Records::new()).unwrap();
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn every_truncation_is_rejected() {
        let buf = encode(&sample_header(), &sample_records()).unwrap();
        for len in 0..buf.len() {
            assert!(decode(&buf[..len]).is_err(), "prefix of {len} bytes decoded");
        }
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut buf = encode(&sample_header(), &sample_records()).unwrap();
        buf.push(0);
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut buf = encode(&sample_header(), &Records::new()).unwrap();
        let count_at = HEADER_LEN;
        buf[count_at..count_at + 4].copy_from_slice(&2u32.to_le_bytes());
        for _ in 0..2 {
            buf.extend_from_slice(&1u32.to_le_bytes());
            buf.push(0xAA);
            buf.extend_from_slice(&1u32.to_le_bytes());
            buf.push(0xBB);
        }
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn create_vault_refuses_to_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("v.qvault");

        create_vault(&path, &sample_header(), &Records::new()).unwrap();
        let second = create_vault(&path, &sample_header(), &Records::new());
        assert!(matches!(second, Err(VaultError::AlreadyExists(_))));
    }

    #[test]
    fn write_then_read_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("v.qvault");

        create_vault(&path, &sample_header(), &Records::new()).unwrap();
        write_vault(&path, &sample_header(), &sample_records()).unwrap();

        let file = read_vault(&path).unwrap();
        assert_eq!(file.records.len(), 2);
    }
}
