//! On-disk record encoding

use doodad_core::PersistError;
use doodad_engine::DoodadRecord;
use serde::{Deserialize, Serialize};

/// Current record layout version
pub const RECORD_VERSION: u32 = 1;

/// Record file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreFormat {
    /// JSON (human readable)
    Json,
    /// Binary (compact)
    Binary,
}

impl Default for StoreFormat {
    fn default() -> Self {
        Self::Binary
    }
}

/// A record plus the layout version it was written with
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    version: u32,
    record: DoodadRecord,
}

impl StoreFormat {
    /// File extension used for records
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "sav",
        }
    }

    /// Encode a record
    pub fn encode(self, record: &DoodadRecord) -> Result<Vec<u8>, PersistError> {
        let stored = StoredRecord {
            version: RECORD_VERSION,
            record: record.clone(),
        };
        match self {
            Self::Json => serde_json::to_vec_pretty(&stored)
                .map_err(|e| PersistError::Serialization(e.to_string())),
            Self::Binary => {
                bincode::serialize(&stored).map_err(|e| PersistError::Serialization(e.to_string()))
            }
        }
    }

    /// Decode a record, rejecting layouts newer than this build understands
    pub fn decode(self, bytes: &[u8]) -> Result<DoodadRecord, PersistError> {
        let stored: StoredRecord = match self {
            Self::Json => serde_json::from_slice(bytes)
                .map_err(|e| PersistError::Deserialization(e.to_string()))?,
            Self::Binary => bincode::deserialize(bytes)
                .map_err(|e| PersistError::Deserialization(e.to_string()))?,
        };

        if stored.version > RECORD_VERSION {
            return Err(PersistError::Deserialization(format!(
                "record version {} is newer than supported version {}",
                stored.version, RECORD_VERSION
            )));
        }
        Ok(stored.record)
    }
}
