use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use cotar_core::config::StorageConfig;
use cotar_core::ports::{AttachmentStore, GatewayError, StoredAttachment};

/// Filesystem attachment store. Files land under `root_dir` with a
/// generated name; the public URL is `public_path` plus that name, served
/// by the HTTP layer as static files.
pub struct FsAttachmentStore {
    root_dir: PathBuf,
    public_path: String,
}

impl FsAttachmentStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root_dir: config.root_dir.clone(),
            public_path: config.public_path.trim_end_matches('/').to_string(),
        }
    }

    fn disk_name(id: &str, file_name: &str) -> String {
        // Generated prefix keeps uploads collision-free; the sanitized
        // original name stays for operator readability.
        let safe: String = file_name
            .chars()
            .map(|ch| if ch.is_alphanumeric() || ch == '.' || ch == '-' { ch } else { '_' })
            .collect();
        format!("{id}-{safe}")
    }
}

#[async_trait]
impl AttachmentStore for FsAttachmentStore {
    async fn store(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredAttachment, GatewayError> {
        let id = Uuid::new_v4().simple().to_string();
        let disk_name = Self::disk_name(&id, file_name);
        let path = self.root_dir.join(&disk_name);

        fs::create_dir_all(&self.root_dir)
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;
        fs::write(&path, bytes)
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        info!(
            event_name = "attachment_stored",
            file_name,
            size_bytes = bytes.len(),
            "stored attachment on disk"
        );

        Ok(StoredAttachment {
            id,
            url: format!("{}/{disk_name}", self.public_path),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            size_bytes: bytes.len() as u64,
        })
    }

    async fn discard(&self, id: &str) -> Result<(), GatewayError> {
        let mut entries = fs::read_dir(&self.root_dir)
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        let prefix = format!("{id}-");
        while let Some(entry) =
            entries.next_entry().await.map_err(|error| GatewayError::Transport(error.to_string()))?
        {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&prefix) {
                fs::remove_file(entry.path())
                    .await
                    .map_err(|error| GatewayError::Transport(error.to_string()))?;
                return Ok(());
            }
        }

        Ok(())
    }
}
