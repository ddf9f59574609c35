// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File-backed medium.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::error::StorageError;

use super::{Medium, Slot};

/// Stores each slot in its own file: `<root>/<namespace>/<key>.0` and
/// `<key>.1`.
///
/// # Examples
///
/// ```no_run
/// use mesh_switch::config::StorageConfig;
/// use mesh_switch::store::{DoubleBufferStore, FileMedium, SessionStore};
///
/// # fn main() -> Result<(), mesh_switch::error::StorageError> {
/// let medium = FileMedium::open("/var/lib/mesh-switch", &StorageConfig::default())?;
/// let mut store = DoubleBufferStore::new(medium);
/// let record = store.restore()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileMedium {
    dir: PathBuf,
    key: String,
}

impl FileMedium {
    /// Opens (creating if needed) the namespace directory under `root`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>, config: &StorageConfig) -> Result<Self, StorageError> {
        let dir = root.as_ref().join(&config.namespace);
        fs::create_dir_all(&dir).map_err(|e| {
            StorageError::Unavailable(format!("cannot open {}: {e}", dir.display()))
        })?;

        tracing::debug!(dir = %dir.display(), key = %config.key, "Opened session storage");
        Ok(Self {
            dir,
            key: config.key.clone(),
        })
    }

    /// Path of a slot file.
    #[must_use]
    pub fn slot_path(&self, slot: Slot) -> PathBuf {
        self.dir.join(format!("{}.{}", self.key, slot.index()))
    }
}

impl Medium for FileMedium {
    fn read(&mut self, slot: Slot) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.slot_path(slot)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, slot: Slot, bytes: &[u8]) -> io::Result<()> {
        let mut file = File::create(self.slot_path(slot))?;
        file.write_all(bytes)?;
        file.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DoubleBufferStore, SessionRecord, SessionStore};

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("mesh-switch-test-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn open_creates_namespace_dir() {
        let root = temp_root();
        let medium = FileMedium::open(&root, &StorageConfig::default()).unwrap();

        assert!(root.join("mesh_example").is_dir());
        assert_eq!(
            medium.slot_path(Slot::B),
            root.join("mesh_example").join("onoff_client.1")
        );

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn missing_file_reads_none() {
        let root = temp_root();
        let mut medium = FileMedium::open(&root, &StorageConfig::default()).unwrap();

        assert_eq!(medium.read(Slot::A).unwrap(), None);

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn records_survive_reopen() {
        let root = temp_root();
        let config = StorageConfig::default();

        let mut store = DoubleBufferStore::new(FileMedium::open(&root, &config).unwrap());
        store.store(SessionRecord::new(41, false)).unwrap();
        store.store(SessionRecord::new(42, true)).unwrap();
        drop(store);

        let mut reopened = DoubleBufferStore::new(FileMedium::open(&root, &config).unwrap());
        assert_eq!(
            reopened.restore().unwrap(),
            Some(SessionRecord::new(42, true))
        );

        fs::remove_dir_all(root).unwrap();
    }
}
