//! Immersive AR session lifecycle.
//!
//! [`ArSessionController`] probes capability once on mount, gates session
//! requests on capability and a secure context, and tracks the session
//! through the platform's start/end/error callbacks:
//!
//! ```text
//! Idle ──request──▶ Requesting ──start──▶ Presenting ──end──▶ Idle
//!                       │                     │
//!                       └──────error──────────┴──▶ Error ──request──▶ Requesting
//!                                                    └──acknowledge──▶ Idle
//! ```

mod platform;

pub use platform::{
    ArCapabilityError, ArSessionError, NoXrPlatform, ProbeOutcome, XrPlatform,
};

/// Session state exposed to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArSessionState {
    /// No session.
    #[default]
    Idle,
    /// A session was requested and has not started yet.
    Requesting,
    /// The session is presenting.
    Presenting,
    /// The last request or session failed.
    Error,
}

/// Result of the capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArCapability {
    /// The probe has not finished.
    #[default]
    Probing,
    /// Immersive AR is available.
    Supported,
    /// Immersive AR is not available.
    Unsupported,
}

/// State change caused by a session callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// The session started presenting.
    Entered,
    /// The session ended.
    Exited,
    /// The session failed.
    Failed,
    /// The callback did not apply to the current state.
    Ignored,
}

/// AR capability and session state machine.
#[derive(Debug, Default)]
pub struct ArSessionController {
    state: ArSessionState,
    capability: ArCapability,
    secure: bool,
    mounted: bool,
    error: Option<String>,
}

impl ArSessionController {
    /// Unmounted controller: probing, insecure until told otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> ArSessionState {
        self.state
    }

    /// Probe result.
    #[must_use]
    pub fn capability(&self) -> ArCapability {
        self.capability
    }

    /// Whether the host is a secure context.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Message of the last failure while in [`ArSessionState::Error`].
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the session is presenting.
    #[must_use]
    pub fn is_presenting(&self) -> bool {
        self.state == ArSessionState::Presenting
    }

    /// Record the secure-context flag and run the one-shot capability probe.
    /// Later calls do nothing.
    pub fn mount(&mut self, platform: &mut dyn XrPlatform) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.secure = platform.is_secure_context();
        match platform.probe_immersive_ar() {
            ProbeOutcome::ApiMissing => {
                log::info!("no XR API; AR disabled");
                self.capability = ArCapability::Unsupported;
            }
            ProbeOutcome::Supported(supported) => self.set_capability(supported),
            ProbeOutcome::Pending => {}
            ProbeOutcome::Failed(e) => self.fail_probe(&e),
        }
    }

    /// Deliver the answer of a [`ProbeOutcome::Pending`] probe. Ignored once
    /// the capability is known.
    pub fn on_probe_result(&mut self, result: Result<bool, ArCapabilityError>) {
        if self.capability != ArCapability::Probing {
            log::warn!("late AR probe result ignored");
            return;
        }
        match result {
            Ok(supported) => self.set_capability(supported),
            Err(e) => self.fail_probe(&e),
        }
    }

    fn set_capability(&mut self, supported: bool) {
        self.capability = if supported {
            ArCapability::Supported
        } else {
            ArCapability::Unsupported
        };
        log::info!("immersive AR supported: {supported}");
    }

    fn fail_probe(&mut self, e: &ArCapabilityError) {
        log::warn!("{e}");
        self.capability = ArCapability::Unsupported;
        self.state = ArSessionState::Error;
        self.error = Some(e.0.clone());
    }

    /// Whether a request would be accepted right now.
    #[must_use]
    pub fn can_request(&self) -> bool {
        self.capability == ArCapability::Supported
            && self.secure
            && matches!(self.state, ArSessionState::Idle | ArSessionState::Error)
    }

    /// Request an immersive session.
    ///
    /// # Errors
    ///
    /// [`ArSessionError::NotAvailable`] (state unchanged) when AR is not
    /// supported, the context is insecure, or a session is already
    /// requested or presenting. A platform rejection moves to
    /// [`ArSessionState::Error`] and is returned.
    pub fn request_session(
        &mut self,
        platform: &mut dyn XrPlatform,
    ) -> Result<(), ArSessionError> {
        if !self.can_request() {
            return Err(ArSessionError::NotAvailable);
        }
        self.state = ArSessionState::Requesting;
        self.error = None;
        match platform.request_session() {
            Ok(()) => {
                log::info!("immersive AR session requested");
                Ok(())
            }
            Err(e) => {
                log::warn!("AR session request failed: {e}");
                self.state = ArSessionState::Error;
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Ask the platform to end the session. The state changes when
    /// [`Self::on_session_end`] arrives.
    ///
    /// # Errors
    ///
    /// Platform failures move to [`ArSessionState::Error`] and are returned.
    pub fn end_session(
        &mut self,
        platform: &mut dyn XrPlatform,
    ) -> Result<(), ArSessionError> {
        if !matches!(
            self.state,
            ArSessionState::Requesting | ArSessionState::Presenting
        ) {
            return Ok(());
        }
        platform.end_session().inspect_err(|e| {
            log::warn!("AR session end failed: {e}");
            self.state = ArSessionState::Error;
            self.error = Some(e.to_string());
        })
    }

    /// The session started presenting.
    pub fn on_session_start(&mut self) -> SessionTransition {
        if self.state != ArSessionState::Requesting {
            log::warn!("session start in state {:?} ignored", self.state);
            return SessionTransition::Ignored;
        }
        self.state = ArSessionState::Presenting;
        log::info!("AR session started");
        SessionTransition::Entered
    }

    /// The session ended.
    pub fn on_session_end(&mut self) -> SessionTransition {
        if !matches!(
            self.state,
            ArSessionState::Requesting | ArSessionState::Presenting
        ) {
            log::warn!("session end in state {:?} ignored", self.state);
            return SessionTransition::Ignored;
        }
        self.state = ArSessionState::Idle;
        self.error = None;
        log::info!("AR session ended");
        SessionTransition::Exited
    }

    /// The session failed.
    pub fn on_session_error(&mut self, error: &ArSessionError) -> SessionTransition {
        if !matches!(
            self.state,
            ArSessionState::Requesting | ArSessionState::Presenting
        ) {
            log::warn!("session error in state {:?} ignored: {error}", self.state);
            return SessionTransition::Ignored;
        }
        log::warn!("AR session error: {error}");
        self.state = ArSessionState::Error;
        self.error = Some(error.to_string());
        SessionTransition::Failed
    }

    /// Leave the error state.
    pub fn acknowledge_error(&mut self) {
        if self.state == ArSessionState::Error {
            self.state = ArSessionState::Idle;
            self.error = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted platform for driving the state machine.
    struct FakeXr {
        secure: bool,
        probe: ProbeOutcome,
        reject: Option<String>,
        requests: usize,
        ends: usize,
    }

    impl FakeXr {
        fn supported() -> Self {
            Self {
                secure: true,
                probe: ProbeOutcome::Supported(true),
                reject: None,
                requests: 0,
                ends: 0,
            }
        }
    }

    impl XrPlatform for FakeXr {
        fn is_secure_context(&self) -> bool {
            self.secure
        }

        fn probe_immersive_ar(&mut self) -> ProbeOutcome {
            self.probe.clone()
        }

        fn request_session(&mut self) -> Result<(), ArSessionError> {
            self.requests += 1;
            match &self.reject {
                Some(msg) => Err(ArSessionError::Rejected(msg.clone())),
                None => Ok(()),
            }
        }

        fn end_session(&mut self) -> Result<(), ArSessionError> {
            self.ends += 1;
            Ok(())
        }
    }

    fn mounted(platform: &mut FakeXr) -> ArSessionController {
        let mut ar = ArSessionController::new();
        ar.mount(platform);
        ar
    }

    #[test]
    fn full_session_cycle() {
        let mut xr = FakeXr::supported();
        let mut ar = mounted(&mut xr);
        assert_eq!(ar.capability(), ArCapability::Supported);
        assert_eq!(ar.state(), ArSessionState::Idle);

        ar.request_session(&mut xr).unwrap();
        assert_eq!(ar.state(), ArSessionState::Requesting);
        assert_eq!(ar.on_session_start(), SessionTransition::Entered);
        assert!(ar.is_presenting());

        ar.end_session(&mut xr).unwrap();
        assert_eq!(xr.ends, 1);
        assert!(ar.is_presenting());
        assert_eq!(ar.on_session_end(), SessionTransition::Exited);
        assert_eq!(ar.state(), ArSessionState::Idle);
    }

    #[test]
    fn missing_api_is_unsupported_without_error() {
        let mut ar = ArSessionController::new();
        ar.mount(&mut NoXrPlatform);
        assert_eq!(ar.capability(), ArCapability::Unsupported);
        assert_eq!(ar.state(), ArSessionState::Idle);
        assert_eq!(
            ar.request_session(&mut NoXrPlatform),
            Err(ArSessionError::NotAvailable)
        );
        assert_eq!(ar.state(), ArSessionState::Idle);
    }

    #[test]
    fn insecure_context_blocks_requests() {
        let mut xr = FakeXr::supported();
        xr.secure = false;
        let mut ar = mounted(&mut xr);
        assert_eq!(ar.request_session(&mut xr), Err(ArSessionError::NotAvailable));
        assert_eq!(xr.requests, 0);
    }

    #[test]
    fn pending_probe_resolves_later() {
        let mut xr = FakeXr::supported();
        xr.probe = ProbeOutcome::Pending;
        let mut ar = mounted(&mut xr);
        assert_eq!(ar.capability(), ArCapability::Probing);
        assert!(!ar.can_request());
        ar.on_probe_result(Ok(true));
        assert_eq!(ar.capability(), ArCapability::Supported);
        ar.on_probe_result(Ok(false));
        assert_eq!(ar.capability(), ArCapability::Supported);
    }

    #[test]
    fn probe_failure_is_an_error() {
        let mut xr = FakeXr::supported();
        xr.probe = ProbeOutcome::Failed(ArCapabilityError("boom".to_owned()));
        let ar = mounted(&mut xr);
        assert_eq!(ar.capability(), ArCapability::Unsupported);
        assert_eq!(ar.state(), ArSessionState::Error);
        assert_eq!(ar.error_message(), Some("boom"));
    }

    #[test]
    fn mount_runs_once() {
        let mut xr = FakeXr::supported();
        let mut ar = mounted(&mut xr);
        xr.probe = ProbeOutcome::Supported(false);
        ar.mount(&mut xr);
        assert_eq!(ar.capability(), ArCapability::Supported);
    }

    #[test]
    fn rejection_moves_to_error_and_can_retry() {
        let mut xr = FakeXr::supported();
        xr.reject = Some("user declined".to_owned());
        let mut ar = mounted(&mut xr);
        assert!(ar.request_session(&mut xr).is_err());
        assert_eq!(ar.state(), ArSessionState::Error);
        assert!(ar.error_message().unwrap().contains("user declined"));

        xr.reject = None;
        ar.request_session(&mut xr).unwrap();
        assert_eq!(ar.state(), ArSessionState::Requesting);
        assert_eq!(ar.error_message(), None);
    }

    #[test]
    fn session_error_then_acknowledge() {
        let mut xr = FakeXr::supported();
        let mut ar = mounted(&mut xr);
        ar.request_session(&mut xr).unwrap();
        let _ = ar.on_session_start();
        assert_eq!(
            ar.on_session_error(&ArSessionError::Platform("tracking lost".to_owned())),
            SessionTransition::Failed
        );
        assert_eq!(ar.error_message(), Some("tracking lost"));
        ar.acknowledge_error();
        assert_eq!(ar.state(), ArSessionState::Idle);
        assert_eq!(ar.error_message(), None);
    }

    #[test]
    fn unexpected_callbacks_are_ignored() {
        let mut xr = FakeXr::supported();
        let mut ar = mounted(&mut xr);
        assert_eq!(ar.on_session_start(), SessionTransition::Ignored);
        assert_eq!(ar.on_session_end(), SessionTransition::Ignored);
        assert_eq!(
            ar.on_session_error(&ArSessionError::Platform("x".to_owned())),
            SessionTransition::Ignored
        );
        assert_eq!(ar.state(), ArSessionState::Idle);
    }

    #[test]
    fn double_request_is_refused() {
        let mut xr = FakeXr::supported();
        let mut ar = mounted(&mut xr);
        ar.request_session(&mut xr).unwrap();
        assert_eq!(ar.request_session(&mut xr), Err(ArSessionError::NotAvailable));
        assert_eq!(xr.requests, 1);
    }
}
