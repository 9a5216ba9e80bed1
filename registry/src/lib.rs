//! Durable mapping from install token to group configuration.
//!
//! The whole map is written to a JSON snapshot after every mutation and read
//! back wholesale on startup. A failed write is logged and otherwise ignored:
//! the in-memory change stands.

use snoobot_core::{ConfigEntry, CoreError, ErrorExt, Install, InstallRequest, RegistryError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type InstallMap = BTreeMap<String, Install>;

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty registry.
    pub async fn load(&self) -> Result<InstallMap, CoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No install snapshot at {}, starting empty", self.path.display());
                return Ok(InstallMap::new());
            }
            Err(e) => return Err(self.load_error(e)),
        };

        serde_json::from_slice(&raw).map_err(|e| self.load_error(e))
    }

    /// Overwrites the snapshot via a temporary sibling file and a rename.
    pub async fn save(&self, installs: &InstallMap) -> Result<(), CoreError> {
        let encoded = serde_json::to_vec_pretty(installs)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.persist_error(e))?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        tokio::fs::write(&tmp_path, &encoded)
            .await
            .map_err(|e| self.persist_error(e))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
                warn!("Could not remove {}: {}", tmp_path.display(), cleanup);
            }
            return Err(self.persist_error(e));
        }

        debug!("Persisted {} installs to {}", installs.len(), self.path.display());
        Ok(())
    }

    fn load_error(&self, reason: impl ToString) -> CoreError {
        RegistryError::LoadFailed {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
        .into()
    }

    fn persist_error(&self, reason: impl ToString) -> CoreError {
        RegistryError::PersistFailed {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
        .into()
    }
}

/// Install records keyed by token.
///
/// Every mutation and its snapshot write happen under one lock, so writes to
/// the same token can never interleave and the file always reflects some
/// complete in-memory state.
#[derive(Debug)]
pub struct InstallRegistry {
    installs: Mutex<InstallMap>,
    store: Option<SnapshotStore>,
}

impl InstallRegistry {
    /// Loads the snapshot at `path`, which also receives all later writes.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let store = SnapshotStore::new(path);
        let installs = store.load().await?;
        info!(
            "Loaded {} installs from {}",
            installs.len(),
            store.path().display()
        );

        Ok(Self {
            installs: Mutex::new(installs),
            store: Some(store),
        })
    }

    /// A registry that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            installs: Mutex::new(InstallMap::new()),
            store: None,
        }
    }

    /// Inserts or overwrites the install for `token`.
    pub async fn install(&self, token: &str, request: InstallRequest) -> Result<(), CoreError> {
        let fields = [
            ("token", token),
            ("groupId", request.group_id.as_str()),
            ("groupName", request.group_name.as_str()),
            ("webhook", request.webhook.as_str()),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(RegistryError::MissingField {
                field: field.to_string(),
            }
            .into());
        }

        let install = Install {
            token: token.to_string(),
            group_id: request.group_id,
            group_name: request.group_name,
            webhook: request.webhook,
            config: request.config,
            is_paused: false,
        };

        let mut installs = self.installs.lock().await;
        if installs.insert(token.to_string(), install).is_some() {
            info!("Replaced existing install {}", token);
        } else {
            info!("Installed {}", token);
        }
        self.persist(&installs).await;
        Ok(())
    }

    /// Replaces the config of an existing install. Returns false if absent.
    pub async fn reinstall(&self, token: &str, config: Vec<ConfigEntry>) -> bool {
        self.update(token, "reinstall", |install| install.config = config)
            .await
    }

    pub async fn uninstall(&self, token: &str) -> bool {
        let mut installs = self.installs.lock().await;
        if installs.remove(token).is_none() {
            debug!("uninstall ignored for unknown install {}", token);
            return false;
        }
        info!("Uninstalled {}", token);
        self.persist(&installs).await;
        true
    }

    pub async fn pause(&self, token: &str) -> bool {
        self.update(token, "pause", |install| install.is_paused = true)
            .await
    }

    pub async fn resume(&self, token: &str) -> bool {
        self.update(token, "resume", |install| install.is_paused = false)
            .await
    }

    pub async fn get(&self, token: &str) -> Option<Install> {
        self.installs.lock().await.get(token).cloned()
    }

    pub async fn list(&self) -> Vec<Install> {
        self.installs.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.installs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.installs.lock().await.is_empty()
    }

    async fn update<F>(&self, token: &str, operation: &str, apply: F) -> bool
    where
        F: FnOnce(&mut Install),
    {
        let mut installs = self.installs.lock().await;
        let Some(install) = installs.get_mut(token) else {
            debug!("{} ignored for unknown install {}", operation, token);
            return false;
        };
        apply(install);
        info!("Applied {} to {}", operation, token);
        self.persist(&installs).await;
        true
    }

    async fn persist(&self, installs: &InstallMap) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save(installs).await {
            e.log_error();
            warn!("Install state kept in memory only until the next successful save");
        }
    }
}
