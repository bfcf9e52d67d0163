use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use log::{debug, info};
use tokio::sync::Mutex;
use crate::error::Result;
use crate::profile::ProxyProfile;

/// Persisted profiles and active selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    #[serde(default)]
    pub proxies: Vec<ProxyProfile>,
    #[serde(default)]
    pub active_proxy_id: Option<String>,
}

impl StoreState {
    pub fn find(&self, id: &str) -> Option<&ProxyProfile> {
        self.proxies.iter().find(|p| p.id == id)
    }

    pub fn active(&self) -> Option<&ProxyProfile> {
        self.active_proxy_id.as_deref().and_then(|id| self.find(id))
    }
}

/// Key-value style persistence. Writing one key leaves the other intact.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load(&self) -> Result<StoreState>;

    async fn save_profiles(&self, profiles: &[ProxyProfile]) -> Result<()>;

    async fn save_active(&self, id: Option<&str>) -> Result<()>;
}

/// JSON file store. A missing file reads as an empty state.
pub struct JsonFileStore {
    path: PathBuf,
    // serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<StoreState> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(StoreState::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No profile store at {}, starting empty", self.path.display());
                Ok(StoreState::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, state: &StoreState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for JsonFileStore {
    async fn load(&self) -> Result<StoreState> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn save_profiles(&self, profiles: &[ProxyProfile]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut state = self.read().await?;
        state.proxies = profiles.to_vec();
        self.write(&state).await?;
        info!("Saved {} profiles to {}", profiles.len(), self.path.display());
        Ok(())
    }

    async fn save_active(&self, id: Option<&str>) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut state = self.read().await?;
        state.active_proxy_id = id.map(str::to_string);
        self.write(&state).await
    }
}

/// Volatile store, mainly for tests and dry runs
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new(state: StoreState) -> Self {
        Self { state: Mutex::new(state) }
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn load(&self) -> Result<StoreState> {
        Ok(self.state.lock().await.clone())
    }

    async fn save_profiles(&self, profiles: &[ProxyProfile]) -> Result<()> {
        self.state.lock().await.proxies = profiles.to_vec();
        Ok(())
    }

    async fn save_active(&self, id: Option<&str>) -> Result<()> {
        self.state.lock().await.active_proxy_id = id.map(str::to_string);
        Ok(())
    }
}
