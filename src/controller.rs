use std::sync::Arc;
use log::{info, warn};
use crate::compiler::{compile, ProxyPayload};
use crate::error::Result;
use crate::host::ProxyHost;
use crate::indicator::{Badge, Indicator};
use crate::profile::ProxyProfile;
use crate::session::SessionContext;

/// Drives the host network layer from proxy profiles.
///
/// Operations are not serialized: two overlapping `apply` calls may
/// interleave around the host acknowledgement, so callers should wait for
/// one to finish before issuing the next.
pub struct ProxyPolicyCompiler {
    host: Arc<dyn ProxyHost>,
    indicator: Arc<dyn Indicator>,
    ctx: Arc<SessionContext>,
}

impl ProxyPolicyCompiler {
    pub fn new(host: Arc<dyn ProxyHost>, indicator: Arc<dyn Indicator>, ctx: Arc<SessionContext>) -> Self {
        Self { host, indicator, ctx }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    /// Compile `profile` without touching the host or session
    pub fn compile(&self, profile: &ProxyProfile) -> ProxyPayload {
        compile(profile)
    }

    /// Compile and submit `profile`. On rejection the auth session is put
    /// back to what it was and the badge is left alone.
    pub async fn apply(&self, profile: &ProxyProfile) -> Result<ProxyPayload> {
        let scheme = profile.protocol.scheme();
        let previous = self.ctx.replace_credentials(profile.credentials()).await;

        let payload = compile(profile);
        if let Err(e) = self.host.apply(&payload).await {
            warn!("Proxy set error for {}: {}", profile.name, e);
            self.ctx.replace_credentials(previous).await;
            return Err(e);
        }

        info!(
            "Proxy set: {}://{}:{} [{}]",
            scheme, profile.host, profile.port, profile.policy_mode
        );
        self.show(Badge::Active(profile.policy_mode)).await;
        Ok(payload)
    }

    /// Restore direct connection
    pub async fn clear(&self) -> Result<()> {
        if let Err(e) = self.host.clear().await {
            warn!("Proxy clear error: {}", e);
            return Err(e);
        }
        info!("Proxy cleared, direct connection");
        self.ctx.replace_credentials(None).await;
        self.show(Badge::Inactive).await;
        Ok(())
    }

    /// Reset the badge without a host call
    pub async fn mark_inactive(&self) {
        self.show(Badge::Inactive).await;
    }

    async fn show(&self, badge: Badge) {
        self.ctx.set_badge(badge).await;
        self.indicator.show(&badge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::{oneshot, Mutex, Notify};
    use crate::host::{HostCall, RecordingHost};
    use crate::profile::{Credentials, PolicyMode, ProfileDraft, ProxyProtocol};

    #[derive(Default)]
    struct CaptureIndicator {
        shown: StdMutex<Vec<Badge>>,
    }

    impl Indicator for CaptureIndicator {
        fn show(&self, badge: &Badge) {
            self.shown.lock().unwrap().push(*badge);
        }
    }

    fn profile(mode: PolicyMode, user: Option<&str>) -> ProxyProfile {
        let mut draft = ProfileDraft::new("p", ProxyProtocol::Http, "10.0.0.1", 8080)
            .with_policy(mode, Vec::new());
        if let Some(user) = user {
            draft = draft.with_credentials(user, "pw");
        }
        ProxyProfile::from_draft("1".to_string(), draft)
    }

    fn setup() -> (Arc<RecordingHost>, Arc<CaptureIndicator>, ProxyPolicyCompiler) {
        let host = Arc::new(RecordingHost::new());
        let indicator = Arc::new(CaptureIndicator::default());
        let compiler = ProxyPolicyCompiler::new(host.clone(), indicator.clone(), SessionContext::new());
        (host, indicator, compiler)
    }

    #[tokio::test]
    async fn test_apply_sets_credentials_and_badge() {
        let (host, indicator, compiler) = setup();
        let payload = compiler.apply(&profile(PolicyMode::Whitelist, Some("alice"))).await.unwrap();

        assert_eq!(host.calls().await, vec![HostCall::Apply(payload)]);
        assert_eq!(compiler.context().badge().await, Badge::Active(PolicyMode::Whitelist));
        assert_eq!(compiler.context().credentials().await.unwrap().username, "alice");
        assert_eq!(*indicator.shown.lock().unwrap(), vec![Badge::Active(PolicyMode::Whitelist)]);

        compiler.apply(&profile(PolicyMode::Blacklist, None)).await.unwrap();
        assert!(compiler.context().credentials().await.is_none());
        assert_eq!(compiler.context().badge().await, Badge::Active(PolicyMode::Blacklist));
    }

    #[tokio::test]
    async fn test_failed_apply_restores_session() {
        let (host, indicator, compiler) = setup();
        compiler.apply(&profile(PolicyMode::Blacklist, Some("alice"))).await.unwrap();

        host.reject_apply(true);
        let result = compiler.apply(&profile(PolicyMode::Whitelist, Some("bob"))).await;
        assert!(result.is_err());
        assert_eq!(compiler.context().credentials().await.unwrap().username, "alice");
        assert_eq!(compiler.context().badge().await, Badge::Active(PolicyMode::Blacklist));
        assert_eq!(indicator.shown.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let (host, _, compiler) = setup();
        compiler.apply(&profile(PolicyMode::Blacklist, Some("alice"))).await.unwrap();

        host.reject_clear(true);
        assert!(compiler.clear().await.is_err());
        assert!(compiler.context().credentials().await.is_some());
        assert_eq!(compiler.context().badge().await, Badge::Active(PolicyMode::Blacklist));

        host.reject_clear(false);
        compiler.clear().await.unwrap();
        assert!(compiler.context().credentials().await.is_none());
        assert_eq!(compiler.context().badge().await, Badge::Inactive);
    }

    /// Host whose first apply waits until the test releases it
    struct GatedHost {
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        entered: Notify,
    }

    #[async_trait]
    impl ProxyHost for GatedHost {
        async fn apply(&self, _payload: &ProxyPayload) -> Result<()> {
            let gate = self.gate.lock().await.take();
            if let Some(rx) = gate {
                self.entered.notify_one();
                let _ = rx.await;
            }
            Ok(())
        }

        async fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_overlapping_applies_are_not_serialized() {
        let (tx, rx) = oneshot::channel();
        let host = Arc::new(GatedHost { gate: Mutex::new(Some(rx)), entered: Notify::new() });
        let compiler = Arc::new(ProxyPolicyCompiler::new(
            host.clone(),
            Arc::new(CaptureIndicator::default()),
            SessionContext::new(),
        ));

        let first = {
            let compiler = compiler.clone();
            tokio::spawn(async move {
                compiler.apply(&profile(PolicyMode::Whitelist, Some("alice"))).await
            })
        };
        host.entered.notified().await;

        compiler.apply(&profile(PolicyMode::Blacklist, None)).await.unwrap();
        tx.send(()).unwrap();
        first.await.unwrap().unwrap();

        // badge comes from the first apply, auth session from the second
        assert_eq!(compiler.context().badge().await, Badge::Active(PolicyMode::Whitelist));
        assert_eq!(compiler.context().credentials().await, None::<Credentials>);
    }
}
