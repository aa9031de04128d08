//! Directory-backed record store
//!
//! One file per record, named `doodad_<id>.<ext>`.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use doodad_core::{PersistError, PersistentId};
use doodad_engine::{DoodadRecord, PersistenceGateway};
use parking_lot::Mutex;

use crate::format::StoreFormat;

const FILE_PREFIX: &str = "doodad_";

/// Stores each record as its own file in a directory
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    format: StoreFormat,
    /// Serializes writers so a save and a delete of one record never interleave
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            format: StoreFormat::Binary,
            write_lock: Mutex::new(()),
        }
    }

    /// Set the record format
    pub fn with_format(mut self, format: StoreFormat) -> Self {
        self.format = format;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> StoreFormat {
        self.format
    }

    /// Ensure the store directory exists
    pub fn ensure_dir(&self) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Path of the file holding record `id`
    pub fn record_path(&self, id: PersistentId) -> PathBuf {
        self.dir
            .join(format!("{}{}.{}", FILE_PREFIX, id, self.format.extension()))
    }

    /// Whether record `id` exists on disk
    pub fn exists(&self, id: PersistentId) -> bool {
        self.record_path(id).exists()
    }

    /// Ids of every record file in this store's format, ascending
    pub fn ids(&self) -> Result<Vec<PersistentId>, PersistError> {
        self.scan_ids(Some(self.format.extension()))
    }

    fn scan_ids(&self, ext: Option<&str>) -> Result<Vec<PersistentId>, PersistError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let ext_matches = match ext {
                Some(ext) => path.extension().map(|e| e == ext).unwrap_or(false),
                None => true,
            };
            if !ext_matches {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix(FILE_PREFIX))
                .and_then(|s| s.parse::<PersistentId>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Write `bytes` to a hidden temp file next to `path`, then rename it
    /// into place so readers never see a partial record
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PersistError::Backend(format!("invalid record path {}", path.display())))?;
        let temp_path = self.dir.join(format!(".{}.tmp", name));

        let written = File::create(&temp_path).and_then(|file| {
            let mut writer = BufWriter::new(file);
            writer.write_all(bytes)?;
            writer.flush()?;
            writer.get_ref().sync_all()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&temp_path, path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

impl PersistenceGateway for FileStore {
    fn save(&self, record: &DoodadRecord) -> Result<(), PersistError> {
        let bytes = self.format.encode(record)?;
        let _guard = self.write_lock.lock();
        self.ensure_dir()?;
        self.write_atomic(&self.record_path(record.id), &bytes)
    }

    fn delete(&self, id: PersistentId) -> Result<(), PersistError> {
        let _guard = self.write_lock.lock();
        match fs::remove_file(self.record_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self, id: PersistentId) -> Result<DoodadRecord, PersistError> {
        let bytes = match fs::read(self.record_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(PersistError::NotFound(id)),
            Err(e) => return Err(e.into()),
        };
        self.format.decode(&bytes)
    }

    /// Taken from file names, so records that fail to decode still count
    fn max_id(&self) -> Result<PersistentId, PersistError> {
        Ok(self.scan_ids(None)?.last().copied().unwrap_or(0))
    }

    fn load_all(&self) -> Result<Vec<DoodadRecord>, PersistError> {
        let mut records = Vec::new();
        for id in self.ids()? {
            match self.load(id) {
                Ok(record) => records.push(record),
                Err(e @ PersistError::Deserialization(_)) => {
                    log::warn!("Skipping unreadable doodad record {}: {}", id, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use doodad_core::ObjectId;
    use doodad_engine::Doodad;
    use std::env::temp_dir;

    fn record(id: PersistentId) -> DoodadRecord {
        let mut record = Doodad::without_template(ObjectId::new(1), 4).to_record();
        record.id = id;
        record.data = id as i32 * 10;
        record.plant_time = Utc.timestamp_opt(1_700_000_000, 0).single();
        record
    }

    fn store_in(name: &str, format: StoreFormat) -> FileStore {
        let dir = temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir); // Clean up
        FileStore::new(dir).with_format(format)
    }

    #[test]
    fn test_file_store_json() {
        let store = store_in("doodad_store_test_json", StoreFormat::Json);

        store.save(&record(3)).unwrap();
        store.save(&record(12)).unwrap();
        assert!(store.exists(3));
        assert_eq!(store.ids().unwrap(), vec![3, 12]);

        let loaded = store.load(12).unwrap();
        assert_eq!(loaded, record(12));

        store.delete(3).unwrap();
        store.delete(3).unwrap();
        assert!(matches!(store.load(3), Err(PersistError::NotFound(3))));

        let _ = fs::remove_dir_all(store.dir()); // Clean up
    }

    #[test]
    fn test_file_store_binary_load_all() {
        let store = store_in("doodad_store_test_binary", StoreFormat::Binary);
        for id in [5, 1, 9] {
            store.save(&record(id)).unwrap();
        }
        fs::write(store.dir().join("notes.txt"), b"ignored").unwrap();
        fs::write(store.record_path(7), b"corrupt").unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 5, 9]);
        assert_eq!(all[1].data, 50);

        let _ = fs::remove_dir_all(store.dir()); // Clean up
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let store = store_in("doodad_store_test_atomic", StoreFormat::Json);
        store.save(&record(4)).unwrap();
        store.save(&record(4)).unwrap();

        let names: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["doodad_4.json".to_string()]);
        assert_eq!(store.load(4).unwrap(), record(4));

        let _ = fs::remove_dir_all(store.dir()); // Clean up
    }

    #[test]
    fn test_max_id_includes_unreadable_and_other_format_files() {
        let store = store_in("doodad_store_test_max_id", StoreFormat::Binary);
        store.save(&record(3)).unwrap();
        fs::write(store.record_path(8), b"truncated").unwrap();
        fs::write(store.dir().join("doodad_11.json"), b"{}").unwrap();
        fs::write(store.dir().join(".doodad_20.sav.tmp"), b"partial").unwrap();

        assert_eq!(store.ids().unwrap(), vec![3, 8]);
        assert_eq!(store.max_id().unwrap(), 11);

        let _ = fs::remove_dir_all(store.dir()); // Clean up
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let store = store_in("doodad_store_test_missing", StoreFormat::Json);
        assert!(store.load_all().unwrap().is_empty());
    }
}
