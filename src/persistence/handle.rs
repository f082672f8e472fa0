use super::{Persistence, PersistenceKind, SaveAsOutcome};
use crate::platform::{
    Dialogs, FileType, PlatformError, SaveFilePicker, SavePickerOptions, write_via_handle,
};
use async_trait::async_trait;
use tracing::{debug, info};

/// Save-as through a platform picker that returns a reusable file handle.
pub struct HandleBackedPersistence {
    picker: Box<dyn SaveFilePicker>,
}

impl HandleBackedPersistence {
    pub fn new(picker: Box<dyn SaveFilePicker>) -> Self {
        Self { picker }
    }
}

#[async_trait(?Send)]
impl Persistence for HandleBackedPersistence {
    fn kind(&self) -> PersistenceKind {
        PersistenceKind::HandleBacked
    }

    async fn save_as(
        &self,
        content: &str,
        suggested_name: &str,
        dialogs: &mut dyn Dialogs,
    ) -> Result<SaveAsOutcome, PlatformError> {
        let options = SavePickerOptions {
            suggested_name: suggested_name.to_string(),
            types: vec![FileType::plain_text()],
        };

        let Some(handle) = self.picker.show_save_file_picker(dialogs, &options).await? else {
            debug!("save picker dismissed");
            return Ok(SaveAsOutcome::Cancelled);
        };

        write_via_handle(handle.as_ref(), content.as_bytes()).await?;
        info!(name = handle.name(), bytes = content.len(), "saved through new handle");
        Ok(SaveAsOutcome::Saved(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryFileHandle, PickerScript, ScriptedDialogs, ScriptedPicker};

    #[tokio::test]
    async fn test_saves_and_returns_handle() {
        let target = MemoryFileHandle::new("picked.txt");
        let picker = ScriptedPicker::new(vec![PickerScript::Handle(target.clone())]);
        let persistence = HandleBackedPersistence::new(Box::new(picker.clone()));
        let mut dialogs = ScriptedDialogs::new();

        let outcome = persistence
            .save_as("body", "Untitled.txt", &mut dialogs)
            .await
            .unwrap();

        match outcome {
            SaveAsOutcome::Saved(handle) => assert_eq!(handle.name(), "picked.txt"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(target.contents().as_deref(), Some("body"));

        let requests = picker.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].suggested_name, "Untitled.txt");
        assert_eq!(requests[0].types, vec![FileType::plain_text()]);
    }

    #[tokio::test]
    async fn test_cancel_is_not_an_error() {
        let picker = ScriptedPicker::new(vec![PickerScript::Cancel]);
        let persistence = HandleBackedPersistence::new(Box::new(picker));
        let mut dialogs = ScriptedDialogs::new();

        let outcome = persistence.save_as("body", "a.txt", &mut dialogs).await.unwrap();
        assert!(matches!(outcome, SaveAsOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let target = MemoryFileHandle::new("locked.txt").revoked();
        let picker = ScriptedPicker::new(vec![PickerScript::Handle(target)]);
        let persistence = HandleBackedPersistence::new(Box::new(picker));
        let mut dialogs = ScriptedDialogs::new();

        let result = persistence.save_as("body", "a.txt", &mut dialogs).await;
        assert!(matches!(result, Err(PlatformError::PermissionDenied(_))));
    }
}
