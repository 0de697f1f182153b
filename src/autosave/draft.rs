use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Local copy of the latest unsaved edit.
///
/// An [`AutoSaveController`](super::AutoSaveController) stashes every
/// triggered value here before its debounce timer runs, and clears the
/// draft once a save succeeds with nothing newer queued. On the next start
/// the caller can pick the edit back up with
/// [`restore_draft`](super::AutoSaveController::restore_draft).
pub trait DraftStore<D>: Send + Sync {
    fn stash(&self, draft: &D) -> anyhow::Result<()>;

    /// The stashed draft, or `None` when there is nothing to recover.
    fn restore(&self) -> anyhow::Result<Option<D>>;

    fn clear(&self) -> anyhow::Result<()>;
}

/// Keeps the draft in process memory.
#[derive(Debug)]
pub struct MemoryDraftStore<D> {
    slot: Mutex<Option<D>>,
}

impl<D> MemoryDraftStore<D> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<D> Default for MemoryDraftStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> DraftStore<D> for MemoryDraftStore<D>
where
    D: Clone + Send,
{
    fn stash(&self, draft: &D) -> anyhow::Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(draft.clone());
        Ok(())
    }

    fn restore(&self) -> anyhow::Result<Option<D>> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

/// Keeps the draft as a JSON file, one file per form.
#[derive(Debug)]
pub struct FileDraftStore<D> {
    path: PathBuf,
    _draft: PhantomData<fn() -> D>,
}

impl<D> FileDraftStore<D> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _draft: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<D> DraftStore<D> for FileDraftStore<D>
where
    D: Serialize + DeserializeOwned,
{
    fn stash(&self, draft: &D) -> anyhow::Result<()> {
        let json = serde_json::to_string(draft)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn restore(&self) -> anyhow::Result<Option<D>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        bio: String,
    }

    fn profile() -> Profile {
        Profile {
            name: "Ada".to_string(),
            bio: String::new(),
        }
    }

    #[test]
    fn memory_store_keeps_the_last_stash() {
        let drafts: MemoryDraftStore<u32> = MemoryDraftStore::new();
        assert_eq!(drafts.restore().unwrap(), None);

        drafts.stash(&1).unwrap();
        drafts.stash(&2).unwrap();
        assert_eq!(drafts.restore().unwrap(), Some(2));

        drafts.clear().unwrap();
        assert_eq!(drafts.restore().unwrap(), None);
    }

    #[test]
    fn file_store_survives_a_new_instance() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("profile_general_draft.json");

        let drafts: FileDraftStore<Profile> = FileDraftStore::new(&path);
        drafts.stash(&profile()).unwrap();
        drop(drafts);

        let reopened: FileDraftStore<Profile> = FileDraftStore::new(&path);
        assert_eq!(reopened.restore().unwrap(), Some(profile()));

        reopened.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(reopened.restore().unwrap(), None);
    }

    #[test]
    fn file_store_without_a_file_is_empty() {
        let dir = tempdir().expect("failed to create temp dir");
        let drafts: FileDraftStore<Profile> = FileDraftStore::new(dir.path().join("none.json"));

        assert_eq!(drafts.restore().unwrap(), None);
        assert!(drafts.clear().is_ok());
    }

    #[test]
    fn corrupt_draft_file_is_an_error() {
        let dir = tempdir().expect("failed to create temp dir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let drafts: FileDraftStore<Profile> = FileDraftStore::new(&path);
        assert!(drafts.restore().is_err());
    }
}
