use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use log::debug;
use tokio::sync::Mutex;
use crate::compiler::ProxyPayload;
use crate::error::{Result, SwitchError};

/// Host network layer that enforces proxy settings.
/// Both operations resolve only when the host acknowledges them.
#[async_trait]
pub trait ProxyHost: Send + Sync {
    async fn apply(&self, payload: &ProxyPayload) -> Result<()>;

    /// Remove every active proxy setting
    async fn clear(&self) -> Result<()>;
}

pub const SCRIPT_FILE: &str = "proxy.pac";
pub const RULES_FILE: &str = "rules.json";

/// Publishes payloads as files for an external proxy agent to pick up:
/// `proxy.pac` for scripts, `rules.json` for rule tables.
pub struct FileHost {
    dir: PathBuf,
}

impl FileHost {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn script_path(&self) -> PathBuf {
        self.dir.join(SCRIPT_FILE)
    }

    pub fn rules_path(&self) -> PathBuf {
        self.dir.join(RULES_FILE)
    }

    async fn write(&self, payload: &ProxyPayload) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let (target, stale) = match payload {
            ProxyPayload::Script(script) => {
                tokio::fs::write(self.script_path(), script.render()).await?;
                (self.script_path(), self.rules_path())
            }
            ProxyPayload::Rules(table) => {
                let json = serde_json::to_string_pretty(table)?;
                tokio::fs::write(self.rules_path(), json).await?;
                (self.rules_path(), self.script_path())
            }
        };
        remove_if_exists(&stale).await?;
        debug!("Wrote {} payload to {}", payload.mode(), target.display());
        Ok(())
    }
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[async_trait]
impl ProxyHost for FileHost {
    async fn apply(&self, payload: &ProxyPayload) -> Result<()> {
        self.write(payload)
            .await
            .map_err(|e| SwitchError::HostApply(e.to_string()))
    }

    async fn clear(&self) -> Result<()> {
        for path in [self.script_path(), self.rules_path()] {
            remove_if_exists(&path)
                .await
                .map_err(|e| SwitchError::HostClear(format!("{}: {}", path.display(), e)))?;
        }
        Ok(())
    }
}

/// Call observed by a [`RecordingHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Apply(ProxyPayload),
    Clear,
}

/// In-memory host that records calls and can be told to reject them
#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    reject_apply: AtomicBool,
    reject_clear: AtomicBool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_apply(&self, reject: bool) {
        self.reject_apply.store(reject, Ordering::SeqCst);
    }

    pub fn reject_clear(&self, reject: bool) {
        self.reject_clear.store(reject, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().await.clone()
    }

    /// Most recently accepted payload
    pub async fn last_applied(&self) -> Option<ProxyPayload> {
        self.calls.lock().await.iter().rev().find_map(|call| match call {
            HostCall::Apply(payload) => Some(payload.clone()),
            HostCall::Clear => None,
        })
    }
}

#[async_trait]
impl ProxyHost for RecordingHost {
    async fn apply(&self, payload: &ProxyPayload) -> Result<()> {
        if self.reject_apply.load(Ordering::SeqCst) {
            return Err(SwitchError::HostApply("rejected by host".to_string()));
        }
        self.calls.lock().await.push(HostCall::Apply(payload.clone()));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.reject_clear.load(Ordering::SeqCst) {
            return Err(SwitchError::HostClear("rejected by host".to_string()));
        }
        self.calls.lock().await.push(HostCall::Clear);
        Ok(())
    }
}
