//! A profile form wired to all three stores

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uistore::{
    AutoSaveController, DialogStore, FileDraftStore, NotificationKind, NotificationStore,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ProfileDraft {
    first_name: String,
    phone: String,
}

#[derive(Clone, Debug)]
struct ConfirmLeave {
    title: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> uistore::Result<()> {
    println!("=== Auto-save Form ===\n");

    let notifications = NotificationStore::new();
    let dialogs: DialogStore<ConfirmLeave> = DialogStore::new();

    notifications.subscribe(|list| {
        for n in list {
            println!("  [{}] {}", n.kind, n.message);
        }
    });

    let autosave = AutoSaveController::new(|draft: ProfileDraft| async move {
        println!("Persisting name={:?} phone={:?}", draft.first_name, draft.phone);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<(), anyhow::Error>(())
    })?
    .with_error_sink({
        let notifications = notifications.clone();
        move |err| {
            notifications.show(format!("Auto-save failed: {err}"), NotificationKind::Error);
        }
    })
    .with_draft_store(FileDraftStore::new(
        std::env::temp_dir().join("uistore_profile_general_draft.json"),
    ));

    // Pick up an edit a previous run never saved
    if let Some(draft) = autosave.restore_draft()? {
        println!("Restored local draft: {draft:?}");
    }

    autosave.subscribe(|state| {
        println!(
            "saving={} unsaved={} last_saved={:?}",
            state.is_saving, state.has_unsaved_changes, state.last_saved_at
        );
    });

    // Typing: every keystroke triggers, only the last one is saved
    for name in ["A", "Al", "Ali", "Alic", "Alice"] {
        autosave.trigger_save(ProfileDraft {
            first_name: name.to_string(),
            phone: String::new(),
        });
    }
    tokio::time::sleep(autosave.delay() + Duration::from_millis(100)).await;

    // Navigating away with unsaved edits
    autosave.trigger_save(ProfileDraft {
        first_name: "Alice".to_string(),
        phone: "+41 79 000 00 00".to_string(),
    });
    dialogs.open(ConfirmLeave {
        title: "Leave with unsaved changes?".to_string(),
    });
    let dialog = dialogs.get_config();
    if let Some(confirm) = dialog.config.as_ref() {
        println!("\nDialog open={}: {}", dialog.is_open, confirm.title);
    }

    autosave.flush().await?;
    dialogs.close();
    notifications.show("Profile saved", NotificationKind::Success);

    println!("\nFinal state: {:#?}", autosave.state());
    Ok(())
}
