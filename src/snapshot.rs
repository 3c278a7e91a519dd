use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::errors::{PaymentResult, SnapshotReadError};
use crate::store::StoreSnapshot;

pub const SNAPSHOT_MAGIC: &str = "MasternodePayments";

const CHECKSUM_LEN: usize = 32;

/// The on-disk election snapshot: length-prefixed magic message, four-byte
/// network magic, the serialized tables, and a trailing blake3 checksum over
/// everything before it.
pub struct SnapshotFile {
    path: PathBuf,
    network_magic: [u8; 4],
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>, network_magic: [u8; 4]) -> Self {
        Self {
            path: path.into(),
            network_magic,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, snapshot: &StoreSnapshot) -> PaymentResult<()> {
        let started = Instant::now();
        let mut buffer = Vec::new();
        bincode::serialize_into(&mut buffer, SNAPSHOT_MAGIC)?;
        buffer.extend_from_slice(&self.network_magic);
        bincode::serialize_into(&mut buffer, snapshot)?;
        let checksum = blake3::hash(&buffer);
        buffer.extend_from_slice(checksum.as_bytes());
        fs::write(&self.path, buffer)?;
        debug!(
            path = %self.path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "wrote masternode payments snapshot"
        );
        Ok(())
    }

    pub fn read(&self) -> Result<StoreSnapshot, SnapshotReadError> {
        let started = Instant::now();
        let bytes = fs::read(&self.path)?;
        if bytes.len() < CHECKSUM_LEN {
            return Err(SnapshotReadError::HashReadError);
        }
        let (body, tail) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if blake3::hash(body).as_bytes() != tail {
            return Err(SnapshotReadError::IncorrectHash);
        }

        let mut cursor = Cursor::new(body);
        let magic: String = bincode::deserialize_from(&mut cursor)
            .map_err(|err| SnapshotReadError::IncorrectFormat(err.to_string()))?;
        if magic != SNAPSHOT_MAGIC {
            return Err(SnapshotReadError::IncorrectMagicMessage);
        }

        let position = cursor.position() as usize;
        let remaining = &body[position..];
        if remaining.len() < self.network_magic.len() {
            return Err(SnapshotReadError::IncorrectFormat(
                "network magic truncated".into(),
            ));
        }
        let (tag, payload) = remaining.split_at(self.network_magic.len());
        if tag != self.network_magic {
            return Err(SnapshotReadError::IncorrectMagicNumber);
        }

        let snapshot: StoreSnapshot = bincode::deserialize(payload)
            .map_err(|err| SnapshotReadError::IncorrectFormat(err.to_string()))?;
        info!(
            path = %self.path.display(),
            votes = snapshot.votes.len(),
            blocks = snapshot.tallies.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded masternode payments snapshot"
        );
        Ok(snapshot)
    }

    /// Verifies the existing file (dry run) and rewrites it from `snapshot`.
    /// Unknown or rewriteable states recreate the file; an unrecognisable
    /// file is left alone for manual inspection.
    pub fn dump(&self, snapshot: &StoreSnapshot) -> PaymentResult<()> {
        match self.read() {
            Ok(_) => {}
            Err(SnapshotReadError::FileError(_)) => {
                debug!("missing masternode payments snapshot, recreating");
            }
            Err(SnapshotReadError::IncorrectFormat(reason)) => {
                debug!(%reason, "snapshot magic ok but body invalid, recreating");
            }
            Err(err) => {
                warn!(?err, "snapshot file unreadable, not overwriting");
                return Ok(());
            }
        }
        self.write(snapshot)
    }
}
