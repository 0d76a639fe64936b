//! # Canonical Export Module
//!
//! Deterministic, bit-exact serialization of the directory for backup and
//! migration. redb files are not guaranteed bit-identical across runs, so
//! the canonical postcard stream is the source of truth when comparing two
//! directories.

use crate::directory::DirectorySnapshot;
use crate::types::OmnichatError;
use serde::{Deserialize, Serialize};

// =============================================================================
// CANONICAL FORMAT
// =============================================================================

/// Magic bytes for canonical export format.
pub const CANONICAL_MAGIC: [u8; 4] = *b"OCDX"; // Omnichat Directory Export

/// Current canonical format version.
pub const CANONICAL_VERSION: u8 = 1;

/// Maximum allowed record count per section in canonical imports.
///
/// This prevents memory exhaustion from malicious or corrupted data.
pub const MAX_IMPORT_RECORD_COUNT: u64 = 1_000_000;

/// Header for canonical export files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalHeader {
    /// Magic bytes to identify the format.
    pub magic: [u8; 4],

    /// Format version for compatibility.
    pub version: u8,

    /// Number of accounts in the export.
    pub account_count: u64,

    /// Number of triggers in the export.
    pub trigger_count: u64,

    /// Checksum of the data section.
    pub checksum: u64,
}

impl CanonicalHeader {
    #[must_use]
    pub fn new(account_count: u64, trigger_count: u64, checksum: u64) -> Self {
        Self {
            magic: CANONICAL_MAGIC,
            version: CANONICAL_VERSION,
            account_count,
            trigger_count,
            checksum,
        }
    }

    /// Validate the header.
    ///
    /// Error messages are intentionally generic to avoid leaking format
    /// details.
    pub fn validate(&self) -> Result<(), OmnichatError> {
        if self.magic != CANONICAL_MAGIC {
            return Err(OmnichatError::SerializationError(
                "Invalid file format".to_string(),
            ));
        }
        if self.version != CANONICAL_VERSION {
            return Err(OmnichatError::SerializationError(
                "Unsupported file version".to_string(),
            ));
        }
        if self.account_count > MAX_IMPORT_RECORD_COUNT
            || self.trigger_count > MAX_IMPORT_RECORD_COUNT
        {
            return Err(OmnichatError::SerializationError(
                "Import exceeds record limits".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// CHECKSUM
// =============================================================================

/// FNV-1a over the serialized data section.
///
/// Integrity check only; this is not collision-resistant and must not be
/// used for authentication.
#[must_use]
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x100_0000_01b3;
    let mut hash = OFFSET;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Checksum of a snapshot's canonical byte form.
pub fn canonical_checksum(snapshot: &DirectorySnapshot) -> Result<u64, OmnichatError> {
    let data = postcard::to_stdvec(snapshot)
        .map_err(|e| OmnichatError::SerializationError(e.to_string()))?;
    Ok(fnv1a(&data))
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Serialize a snapshot to the canonical byte stream (header + data).
pub fn export_canonical(snapshot: &DirectorySnapshot) -> Result<Vec<u8>, OmnichatError> {
    let data = postcard::to_stdvec(snapshot)
        .map_err(|e| OmnichatError::SerializationError(e.to_string()))?;
    let header = CanonicalHeader::new(
        snapshot.accounts.len() as u64,
        snapshot.triggers.len() as u64,
        fnv1a(&data),
    );
    let mut out = postcard::to_stdvec(&header)
        .map_err(|e| OmnichatError::SerializationError(e.to_string()))?;
    out.extend_from_slice(&data);
    Ok(out)
}

/// Parse a canonical byte stream back into a snapshot, verifying the header
/// and checksum.
pub fn import_canonical(bytes: &[u8]) -> Result<DirectorySnapshot, OmnichatError> {
    let (header, data): (CanonicalHeader, &[u8]) = postcard::take_from_bytes(bytes)
        .map_err(|e| OmnichatError::SerializationError(e.to_string()))?;
    header.validate()?;
    if fnv1a(data) != header.checksum {
        return Err(OmnichatError::SerializationError(
            "Checksum mismatch".to_string(),
        ));
    }
    let snapshot: DirectorySnapshot = postcard::from_bytes(data)
        .map_err(|e| OmnichatError::SerializationError(e.to_string()))?;
    if snapshot.accounts.len() as u64 != header.account_count
        || snapshot.triggers.len() as u64 != header.trigger_count
    {
        return Err(OmnichatError::SerializationError(
            "Header counts do not match data".to_string(),
        ));
    }
    Ok(snapshot)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, UserAccount, UserId, UserStatus};

    fn sample_snapshot() -> DirectorySnapshot {
        let mut snapshot = DirectorySnapshot::default();
        snapshot.accounts.push(UserAccount {
            id: UserId("usr-1".to_string()),
            username: "alice".to_string(),
            name: "Alice".to_string(),
            status: UserStatus::default(),
            roles: [Role::User, Role::LivechatAgent].into_iter().collect(),
            auth_token: None,
        });
        snapshot
    }

    #[test]
    fn test_export_is_deterministic() {
        let snapshot = sample_snapshot();
        let a = export_canonical(&snapshot).expect("export");
        let b = export_canonical(&snapshot).expect("export");
        assert_eq!(a, b, "exports must be bit-identical");
    }

    #[test]
    fn test_round_trip() {
        let snapshot = sample_snapshot();
        let bytes = export_canonical(&snapshot).expect("export");
        let restored = import_canonical(&bytes).expect("import");
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_corrupted_data_rejected() {
        let snapshot = sample_snapshot();
        let mut bytes = export_canonical(&snapshot).expect("export");
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(import_canonical(&bytes).is_err());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let header = CanonicalHeader {
            magic: *b"NOPE",
            version: CANONICAL_VERSION,
            account_count: 0,
            trigger_count: 0,
            checksum: 0,
        };
        assert!(header.validate().is_err());
    }

    #[test]
    fn test_checksum_changes_with_content() {
        let empty = DirectorySnapshot::default();
        let populated = sample_snapshot();
        assert_ne!(
            canonical_checksum(&empty).expect("checksum"),
            canonical_checksum(&populated).expect("checksum")
        );
    }
}
