use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::types::SlotSwap;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("record is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes `contents` next to `path` and renames it into place, so readers
/// never see half a record
pub(crate) fn write_atomically(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

/// Reads a record file; a missing or blank file reads as `None`
pub(crate) fn read_record(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(None),
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Removes a record file; a missing file is already clear
pub(crate) fn remove_record(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Storage for the singleton swap record
pub trait SwapStore {
    fn load(&self) -> Result<Option<SlotSwap>, StoreError>;
    fn save(&mut self, swap: &SlotSwap) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Keeps the record as a small pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SwapStore for JsonFileStore {
    fn load(&self) -> Result<Option<SlotSwap>, StoreError> {
        let Some(contents) = read_record(&self.path)? else {
            return Ok(None);
        };

        // `null`, `{}` or a blank date all mean "no swap"
        let value: serde_json::Value = serde_json::from_str(&contents)?;
        let has_date = value
            .get("date")
            .and_then(|d| d.as_str())
            .map(|d| !d.trim().is_empty())
            .unwrap_or(false);
        if !has_date {
            return Ok(None);
        }

        Ok(Some(serde_json::from_value(value)?))
    }

    fn save(&mut self, swap: &SlotSwap) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(swap)?;
        write_atomically(&self.path, &json)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        Ok(remove_record(&self.path)?)
    }
}

/// In-process store, for callers that do not persist swaps
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: Option<SlotSwap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_record(swap: SlotSwap) -> Self {
        MemoryStore { record: Some(swap) }
    }

    pub fn record(&self) -> Option<&SlotSwap> {
        self.record.as_ref()
    }
}

impl SwapStore for MemoryStore {
    fn load(&self) -> Result<Option<SlotSwap>, StoreError> {
        Ok(self.record)
    }

    fn save(&mut self, swap: &SlotSwap) -> Result<(), StoreError> {
        self.record = Some(*swap);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.record = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_grid::Slot;
    use chrono::NaiveDate;

    fn sample() -> SlotSwap {
        SlotSwap {
            date: NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
            from_slot: Slot::new(3).unwrap(),
            to_slot: Slot::new(5).unwrap(),
        }
    }

    #[test]
    fn missing_file_loads_as_no_swap() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("daily_slot_swap.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_load_and_clear_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested").join("daily_slot_swap.json"));

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
        assert!(!store.path().with_extension("json.tmp").exists());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn empty_records_read_as_no_swap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily_slot_swap.json");
        let store = JsonFileStore::new(&path);

        for contents in ["", "null", "{}", "{\"date\": \"\"}"] {
            fs::write(&path, contents).unwrap();
            assert!(store.load().unwrap().is_none(), "contents {:?}", contents);
        }
    }

    #[test]
    fn corrupt_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily_slot_swap.json");
        fs::write(&path, "{\"date\": \"2026-02-05\", \"from_slot\": 9, \"to_slot\": 1}").unwrap();

        assert!(matches!(JsonFileStore::new(&path).load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn record_with_equal_slots_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily_slot_swap.json");
        fs::write(&path, "{\"date\": \"2026-02-05\", \"from_slot\": 3, \"to_slot\": 3}").unwrap();

        assert!(matches!(JsonFileStore::new(&path).load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn memory_store_holds_one_record() {
        let mut store = MemoryStore::new();
        store.save(&sample()).unwrap();
        assert_eq!(store.record(), Some(&sample()));
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
