use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use serde_json::Value;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{StateDocument, StoreKey};

/// One JSON document per [`StoreKey`], written atomically and durably.
///
/// Each key has its own lock, so saves to different keys never wait on each
/// other. Saves to the same key are serialized; the last one wins.
pub struct JsonStore {
    dir: PathBuf,
    locks: [Mutex<()>; 3],
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: [Mutex::new(()), Mutex::new(()), Mutex::new(())],
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: StoreKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    pub(crate) fn lock(&self, key: StoreKey) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, a panicked holder cannot leave it inconsistent.
        self.locks[key.index()]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the stored document, or the key's default when the file is
    /// absent, unreadable or malformed. Never fails.
    pub fn load(&self, key: StoreKey) -> StateDocument {
        match self.read(key) {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                tracing::debug!(?key, "no saved state, using default");
                key.default_document()
            }
            Err(e) => {
                tracing::warn!(?key, error = %e, "ignoring unusable state, using default");
                key.default_document()
            }
        }
    }

    /// Reads the document for `key`, keeping "absent" (`Ok(None)`) apart from
    /// "present but unusable" (`Err`).
    pub fn read(&self, key: StoreKey) -> Result<Option<StateDocument>, StoreError> {
        let path = self.path_for(key);
        let _guard = self.lock(key);

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::StorageUnavailable { path, source }),
        };

        serde_json::from_str::<StateDocument>(&text)
            .map(Some)
            .map_err(|source| StoreError::MalformedState { path, source })
    }

    /// Replaces the document for `key`. Returns only once the new contents
    /// have been synced to stable storage.
    pub fn save(&self, key: StoreKey, document: Value) -> Result<(), StoreError> {
        let Value::Object(doc) = document else {
            return Err(StoreError::InvalidInput);
        };

        let path = self.path_for(key);
        let _guard = self.lock(key);

        if let Err(source) = fs::create_dir_all(&self.dir) {
            tracing::error!(?key, dir = %self.dir.display(), error = %source, "cannot create state directory");
            return Err(StoreError::StorageUnavailable {
                path: self.dir.clone(),
                source,
            });
        }

        let tmp_path = self
            .dir
            .join(format!("{}.{}.tmp", key.file_name(), Uuid::new_v4()));

        let result = write_synced(&tmp_path, &doc).and_then(|()| fs::rename(&tmp_path, &path));
        if let Err(source) = result {
            let _ = fs::remove_file(&tmp_path);
            tracing::error!(?key, path = %path.display(), error = %source, "save failed");
            return Err(StoreError::StorageUnavailable { path, source });
        }

        sync_dir(&self.dir);
        self.remove_stale_temps(key);
        tracing::info!(?key, path = %path.display(), "state saved");
        Ok(())
    }

    // Temp files left by a crash between write and rename. Only the holder of
    // the key's lock writes temps for that key, so any found here are orphans.
    fn remove_stale_temps(&self, key: StoreKey) {
        let prefix = format!("{}.", key.file_name());
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(&prefix) && name.ends_with(".tmp") {
                match fs::remove_file(entry.path()) {
                    Ok(()) => tracing::debug!(?key, file = name, "removed stale temp file"),
                    Err(e) => tracing::debug!(?key, file = name, error = %e, "cannot remove stale temp file"),
                }
            }
        }
    }
}

// write -> flush -> fsync, in that order
fn write_synced(path: &Path, doc: &StateDocument) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, doc).map_err(io::Error::from)?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

// Makes the rename itself durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), error = %e, "directory sync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn store() -> (TempDir, JsonStore) {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::new(tmp.path().join("state"));
        (tmp, store)
    }

    fn as_doc(v: Value) -> StateDocument {
        match v {
            Value::Object(m) => m,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_tmp, store) = store();
        let doc = json!({
            "Cartoons": { "index": 3, "time": 124.5 },
            "News": { "index": 0, "time": 0 },
            "tags": ["a", "b"],
            "nothing": null
        });

        store.save(StoreKey::Progress, doc.clone()).unwrap();

        assert_eq!(store.load(StoreKey::Progress), as_doc(doc));
    }

    #[test]
    fn defaults_when_nothing_saved() {
        let (_tmp, store) = store();

        assert!(store.load(StoreKey::Progress).is_empty());
        assert!(store.load(StoreKey::MoviesProgress).is_empty());
        assert_eq!(
            store.load(StoreKey::AlarmSettings),
            as_doc(json!({ "time": "08:00", "enabled": false }))
        );
        assert!(matches!(store.read(StoreKey::Progress), Ok(None)));
    }

    #[test]
    fn corrupt_file_loads_as_default() {
        let (_tmp, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path_for(StoreKey::AlarmSettings), b"{\"time\": \"07:").unwrap();

        assert_eq!(
            store.load(StoreKey::AlarmSettings),
            StoreKey::AlarmSettings.default_document()
        );
        assert!(matches!(
            store.read(StoreKey::AlarmSettings),
            Err(StoreError::MalformedState { .. })
        ));
    }

    #[test]
    fn non_object_file_loads_as_default() {
        let (_tmp, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path_for(StoreKey::Progress), b"[1, 2, 3]").unwrap();

        assert!(store.load(StoreKey::Progress).is_empty());
    }

    #[test]
    fn save_rejects_non_objects() {
        let (_tmp, store) = store();

        for bad in [json!([1, 2]), json!("text"), json!(42), json!(null)] {
            assert!(matches!(
                store.save(StoreKey::Progress, bad),
                Err(StoreError::InvalidInput)
            ));
        }
        assert!(!store.path_for(StoreKey::Progress).exists());
    }

    #[test]
    fn save_creates_nested_directories() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStore::new(tmp.path().join("a").join("b").join("c"));

        store.save(StoreKey::MoviesProgress, json!({ "film.mp4": 42 })).unwrap();

        assert!(store.path_for(StoreKey::MoviesProgress).is_file());
    }

    #[test]
    fn save_replaces_whole_document() {
        let (_tmp, store) = store();

        store.save(StoreKey::Progress, json!({ "a": 1, "b": 2 })).unwrap();
        store.save(StoreKey::Progress, json!({ "c": 3 })).unwrap();

        assert_eq!(store.load(StoreKey::Progress), as_doc(json!({ "c": 3 })));
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let (_tmp, store) = store();

        store.save(StoreKey::Progress, json!({ "a": 1 })).unwrap();
        store.save(StoreKey::Progress, json!({ "a": 2 })).unwrap();

        let names: Vec<String> = fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["progression.json".to_string()]);
    }

    #[test]
    fn unusable_directory_is_storage_unavailable() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not_a_dir");
        fs::write(&blocker, b"file").unwrap();
        let store = JsonStore::new(blocker.join("state"));

        let err = store.save(StoreKey::Progress, json!({ "a": 1 })).unwrap_err();

        assert!(matches!(err, StoreError::StorageUnavailable { .. }));
    }

    #[test]
    fn interrupted_write_keeps_previous_document() {
        let (_tmp, store) = store();
        store.save(StoreKey::Progress, json!({ "episode": 4 })).unwrap();

        // What a crash between write and rename leaves behind.
        let orphan = store
            .dir()
            .join(format!("{}.{}.tmp", StoreKey::Progress.file_name(), Uuid::new_v4()));
        fs::write(&orphan, b"{\"episode\": 5, \"ti").unwrap();

        assert_eq!(store.load(StoreKey::Progress), as_doc(json!({ "episode": 4 })));
    }

    #[test]
    fn save_sweeps_orphaned_temps_of_its_key() {
        let (_tmp, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        let own = store
            .dir()
            .join(format!("{}.{}.tmp", StoreKey::Progress.file_name(), Uuid::new_v4()));
        let other = store
            .dir()
            .join(format!("{}.{}.tmp", StoreKey::AlarmSettings.file_name(), Uuid::new_v4()));
        fs::write(&own, b"{\"half").unwrap();
        fs::write(&other, b"{\"half").unwrap();

        store.save(StoreKey::Progress, json!({ "a": 1 })).unwrap();

        assert!(!own.exists());
        assert!(other.exists());
        assert_eq!(store.load(StoreKey::Progress), as_doc(json!({ "a": 1 })));

        store.save(StoreKey::AlarmSettings, json!({ "time": "07:00", "enabled": true })).unwrap();
        assert!(!other.exists());
    }

    #[test]
    fn interrupted_first_write_loads_default() {
        let (_tmp, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        let orphan = store
            .dir()
            .join(format!("{}.{}.tmp", StoreKey::AlarmSettings.file_name(), Uuid::new_v4()));
        fs::write(&orphan, b"{\"time\": \"06").unwrap();

        assert_eq!(
            store.load(StoreKey::AlarmSettings),
            StoreKey::AlarmSettings.default_document()
        );
    }

    fn big_doc(tag: &str) -> Value {
        let mut m = serde_json::Map::new();
        for i in 0..500 {
            m.insert(format!("{tag}-{i}"), json!({ "writer": tag, "pos": i }));
        }
        Value::Object(m)
    }

    #[test]
    fn concurrent_same_key_saves_last_writer_wins() {
        let (_tmp, store) = store();
        let store = Arc::new(store);
        let a = big_doc("a");
        let b = big_doc("b");

        let writers: Vec<_> = [a.clone(), b.clone()]
            .into_iter()
            .map(|doc| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..25 {
                        store.save(StoreKey::Progress, doc.clone()).unwrap();
                    }
                })
            })
            .collect();

        let reader = {
            let store = Arc::clone(&store);
            let (a, b) = (as_doc(a.clone()), as_doc(b.clone()));
            thread::spawn(move || {
                for _ in 0..50 {
                    let seen = store.load(StoreKey::Progress);
                    assert!(seen.is_empty() || seen == a || seen == b);
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        let last = store.load(StoreKey::Progress);
        assert!(last == as_doc(a) || last == as_doc(b));
    }

    #[test]
    fn concurrent_saves_to_different_keys_are_independent() {
        let (_tmp, store) = store();
        let store = Arc::new(store);

        let handles: Vec<_> = StoreKey::ALL
            .into_iter()
            .map(|key| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..20 {
                        store
                            .save(key, json!({ "key": key.file_name(), "round": i }))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        for key in StoreKey::ALL {
            assert_eq!(
                store.load(key),
                as_doc(json!({ "key": key.file_name(), "round": 19 }))
            );
        }
    }
}
