//! # doodad_store - Doodad Record Storage
//!
//! Implementations of the engine's persistence gateway:
//! - [`MemoryStore`]: process-local, counts write traffic
//! - [`FileStore`]: one JSON or binary file per record
//!
//! [`StoreSpec`] selects a backend from a configuration string such as
//! `memory`, `json:./data/doodads` or `binary:/var/lib/doodads`.

pub mod file;
pub mod format;
pub mod memory;

pub use file::*;
pub use format::*;
pub use memory::*;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use doodad_core::{PersistError, PersistentId};
use doodad_engine::PersistenceGateway;
use serde::{Deserialize, Serialize};

/// Which backend to open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StoreSpec {
    /// In-memory store, lost on exit
    Memory,
    /// Directory of record files
    Files { format: StoreFormat, dir: PathBuf },
}

impl Default for StoreSpec {
    fn default() -> Self {
        Self::Memory
    }
}

impl StoreSpec {
    /// Open the backend
    pub fn open(&self) -> Result<Arc<dyn PersistenceGateway>, PersistError> {
        match self {
            Self::Memory => Ok(Arc::new(MemoryStore::new())),
            Self::Files { format, dir } => {
                let store = FileStore::new(dir.clone()).with_format(*format);
                store.ensure_dir()?;
                log::info!("Opened {:?} doodad store at {}", format, dir.display());
                Ok(Arc::new(store))
            }
        }
    }
}

impl FromStr for StoreSpec {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("memory") {
            return Ok(Self::Memory);
        }
        let (kind, dir) = s
            .split_once(':')
            .ok_or_else(|| PersistError::Backend(format!("invalid store spec '{}'", s)))?;
        let format = match kind {
            "json" => StoreFormat::Json,
            "binary" => StoreFormat::Binary,
            other => {
                return Err(PersistError::Backend(format!("unknown store kind '{}'", other)));
            }
        };
        if dir.is_empty() {
            return Err(PersistError::Backend(format!("store spec '{}' has no directory", s)));
        }
        Ok(Self::Files {
            format,
            dir: PathBuf::from(dir),
        })
    }
}

impl fmt::Display for StoreSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Files { format, dir } => {
                let kind = match format {
                    StoreFormat::Json => "json",
                    StoreFormat::Binary => "binary",
                };
                write!(f, "{}:{}", kind, dir.display())
            }
        }
    }
}

impl TryFrom<String> for StoreSpec {
    type Error = PersistError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StoreSpec> for String {
    fn from(spec: StoreSpec) -> Self {
        spec.to_string()
    }
}

/// Highest durable id present in `store`, 0 if empty.
///
/// Used to seed the id allocator so fresh ids never collide with stored ones,
/// including records that no longer decode.
pub fn highest_id(store: &dyn PersistenceGateway) -> Result<PersistentId, PersistError> {
    store.max_id()
}

pub mod prelude {
    pub use crate::file::FileStore;
    pub use crate::format::StoreFormat;
    pub use crate::memory::MemoryStore;
    pub use crate::{highest_id, StoreSpec};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_store_spec() {
        assert_eq!("memory".parse::<StoreSpec>().unwrap(), StoreSpec::Memory);
        assert_eq!(
            "json:/tmp/doodads".parse::<StoreSpec>().unwrap(),
            StoreSpec::Files {
                format: StoreFormat::Json,
                dir: PathBuf::from("/tmp/doodads"),
            }
        );
        assert!("sqlite:/tmp/x".parse::<StoreSpec>().is_err());
        assert!("binary:".parse::<StoreSpec>().is_err());
        assert!("nonsense".parse::<StoreSpec>().is_err());
    }

    #[test]
    fn test_store_spec_display_round_trips() {
        let spec: StoreSpec = "binary:data/doodads".parse().unwrap();
        assert_eq!(spec.to_string(), "binary:data/doodads");
    }

    #[test]
    fn test_highest_id() {
        use doodad_core::ObjectId;
        use doodad_engine::Doodad;

        let store = MemoryStore::new();
        assert_eq!(highest_id(&store).unwrap(), 0);
        for id in [4, 17, 9] {
            let mut record = Doodad::without_template(ObjectId::new(1), 1).to_record();
            record.id = id;
            store.save(&record).unwrap();
        }
        assert_eq!(highest_id(&store).unwrap(), 17);
    }

    #[test]
    fn test_highest_id_counts_unreadable_files() {
        use doodad_core::{IdAllocator, ObjectId, SequentialIds};
        use doodad_engine::Doodad;

        let dir = std::env::temp_dir().join("doodad_store_test_highest_corrupt");
        let _ = std::fs::remove_dir_all(&dir); // Clean up
        let store = FileStore::new(&dir).with_format(StoreFormat::Binary);

        let mut record = Doodad::without_template(ObjectId::new(1), 1).to_record();
        record.id = 1;
        store.save(&record).unwrap();
        std::fs::write(store.record_path(2), b"garbage").unwrap();

        assert_eq!(store.load_all().unwrap().len(), 1);
        assert_eq!(highest_id(&store).unwrap(), 2);

        // A fresh id allocated from the seed leaves the unreadable file alone
        let ids = SequentialIds::starting_at(highest_id(&store).unwrap() + 1);
        assert_eq!(ids.next_id(), 3);
        assert_eq!(std::fs::read(store.record_path(2)).unwrap(), b"garbage");

        let _ = std::fs::remove_dir_all(&dir); // Clean up
    }
}
