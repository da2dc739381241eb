//! Credential gate guarding every paid analysis call.
//!
//! The gate is a cheaply cloneable handle over shared flags. It is created once
//! at startup, checked with [`CredentialGate::check_credential`], and passed to
//! the session explicitly. Nothing else mutates it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::config;

/// Errors raised by a key chooser
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The chooser could not be queried
    #[error("key chooser unavailable: {0}")]
    Unavailable(String),
}

/// Returned by session actions while no credential is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("an API key must be selected before capturing or analyzing")]
pub struct CredentialRequired;

/// Platform hook that knows whether an API key has been selected.
#[async_trait]
pub trait KeyChooser: Send + Sync {
    /// Whether a key is currently selected
    async fn has_selected_api_key(&self) -> Result<bool, CredentialError>;

    /// Open the selection flow. Returns once the flow closes, without
    /// confirming that a key was actually chosen.
    async fn open_select_key(&self) -> Result<(), CredentialError>;
}

/// Chooser backed by the process environment.
///
/// `open_select_key` has no dialog to show; it re-reads the environment so a
/// key exported after startup is picked up.
#[derive(Debug, Default)]
pub struct EnvKeyChooser;

#[async_trait]
impl KeyChooser for EnvKeyChooser {
    async fn has_selected_api_key(&self) -> Result<bool, CredentialError> {
        Ok(config::api_key_from_env().is_some())
    }

    async fn open_select_key(&self) -> Result<(), CredentialError> {
        tracing::info!(
            "export {} to select an API key for hazard analysis",
            config::ENV_API_KEY
        );
        Ok(())
    }
}

/// Chooser with a fixed answer.
#[derive(Debug)]
pub struct StaticKeyChooser {
    selected: AtomicBool,
}

impl StaticKeyChooser {
    pub fn new(selected: bool) -> Self {
        Self {
            selected: AtomicBool::new(selected),
        }
    }

    pub fn set_selected(&self, selected: bool) {
        self.selected.store(selected, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyChooser for StaticKeyChooser {
    async fn has_selected_api_key(&self) -> Result<bool, CredentialError> {
        Ok(self.selected.load(Ordering::SeqCst))
    }

    async fn open_select_key(&self) -> Result<(), CredentialError> {
        Ok(())
    }
}

#[derive(Debug)]
struct GateFlags {
    satisfied: AtomicBool,
    needs_verification: AtomicBool,
}

/// Process-wide credential state.
#[derive(Clone)]
pub struct CredentialGate {
    chooser: Arc<dyn KeyChooser>,
    flags: Arc<GateFlags>,
}

impl std::fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGate")
            .field("satisfied", &self.is_satisfied())
            .field("needs_verification", &self.needs_verification())
            .finish()
    }
}

impl CredentialGate {
    /// Create a gate. It starts satisfied until the startup check says otherwise.
    pub fn new(chooser: Arc<dyn KeyChooser>) -> Self {
        Self {
            chooser,
            flags: Arc::new(GateFlags {
                satisfied: AtomicBool::new(true),
                needs_verification: AtomicBool::new(false),
            }),
        }
    }

    /// Create a gate and run the startup check.
    pub async fn init(chooser: Arc<dyn KeyChooser>) -> Self {
        let gate = Self::new(chooser);
        gate.check_credential().await;
        gate
    }

    pub fn is_satisfied(&self) -> bool {
        self.flags.satisfied.load(Ordering::SeqCst)
    }

    /// Set after an unconfirmed selection flow, until [`verify`](Self::verify) runs.
    pub fn needs_verification(&self) -> bool {
        self.flags.needs_verification.load(Ordering::SeqCst)
    }

    /// Query the chooser. A failed query keeps the previously known state.
    pub async fn check_credential(&self) -> bool {
        match self.chooser.has_selected_api_key().await {
            Ok(selected) => {
                self.flags.satisfied.store(selected, Ordering::SeqCst);
                tracing::debug!(selected, "credential check");
                selected
            }
            Err(e) => {
                tracing::error!("Error checking API key: {}", e);
                self.is_satisfied()
            }
        }
    }

    /// Open the selection flow.
    ///
    /// The chooser never confirms a selection, so completion is optimistically
    /// taken as success and the gate is flagged for a later [`verify`](Self::verify).
    pub async fn request_credential(&self) -> bool {
        if let Err(e) = self.chooser.open_select_key().await {
            tracing::error!("Error opening key selector: {}", e);
            return self.is_satisfied();
        }
        // optimistic: no confirmation channel exists
        self.flags.satisfied.store(true, Ordering::SeqCst);
        self.flags.needs_verification.store(true, Ordering::SeqCst);
        true
    }

    /// Reconcile an optimistic selection with the chooser's real answer.
    pub async fn verify(&self) -> bool {
        if !self.flags.needs_verification.swap(false, Ordering::SeqCst) {
            return self.is_satisfied();
        }
        let satisfied = self.check_credential().await;
        if !satisfied {
            tracing::warn!("key selection was not confirmed by the chooser");
        }
        satisfied
    }

    /// Mark the credential invalid, forcing re-selection.
    pub fn revoke(&self) {
        self.flags.satisfied.store(false, Ordering::SeqCst);
        self.flags.needs_verification.store(false, Ordering::SeqCst);
    }

    /// Block callers while no credential is selected.
    pub fn ensure_satisfied(&self) -> Result<(), CredentialRequired> {
        if self.is_satisfied() {
            Ok(())
        } else {
            Err(CredentialRequired)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingChooser;

    #[async_trait]
    impl KeyChooser for FailingChooser {
        async fn has_selected_api_key(&self) -> Result<bool, CredentialError> {
            Err(CredentialError::Unavailable("bridge not loaded".into()))
        }

        async fn open_select_key(&self) -> Result<(), CredentialError> {
            Err(CredentialError::Unavailable("bridge not loaded".into()))
        }
    }

    #[tokio::test]
    async fn test_init_reflects_chooser() {
        let gate = CredentialGate::init(Arc::new(StaticKeyChooser::new(false))).await;
        assert!(!gate.is_satisfied());
        assert_eq!(gate.ensure_satisfied(), Err(CredentialRequired));

        let gate = CredentialGate::init(Arc::new(StaticKeyChooser::new(true))).await;
        assert!(gate.is_satisfied());
        assert!(gate.ensure_satisfied().is_ok());
    }

    #[tokio::test]
    async fn test_failed_check_keeps_previous_state() {
        let gate = CredentialGate::new(Arc::new(FailingChooser));
        assert!(gate.check_credential().await);

        gate.revoke();
        assert!(!gate.check_credential().await);
    }

    #[tokio::test]
    async fn test_request_is_optimistic_then_verified() {
        let chooser = Arc::new(StaticKeyChooser::new(false));
        let gate = CredentialGate::init(chooser.clone()).await;
        assert!(!gate.is_satisfied());

        assert!(gate.request_credential().await);
        assert!(gate.is_satisfied());
        assert!(gate.needs_verification());

        // The chooser never actually got a key.
        assert!(!gate.verify().await);
        assert!(!gate.is_satisfied());
        assert!(!gate.needs_verification());
    }

    #[tokio::test]
    async fn test_verify_confirms_selection() {
        let chooser = Arc::new(StaticKeyChooser::new(false));
        let gate = CredentialGate::init(chooser.clone()).await;
        gate.request_credential().await;
        chooser.set_selected(true);
        assert!(gate.verify().await);
        assert!(!gate.needs_verification());
    }

    #[tokio::test]
    async fn test_request_failure_leaves_gate_unchanged() {
        let gate = CredentialGate::new(Arc::new(FailingChooser));
        gate.revoke();
        assert!(!gate.request_credential().await);
        assert!(!gate.needs_verification());
    }

    #[test]
    fn test_revoke_is_shared_between_clones() {
        let gate = CredentialGate::new(Arc::new(StaticKeyChooser::new(true)));
        let other = gate.clone();
        other.revoke();
        assert!(!gate.is_satisfied());
    }
}
