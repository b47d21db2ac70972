//! The platform XR seam and its error types.

use std::fmt;

/// Result of asking the platform whether immersive AR is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The platform has no XR API at all.
    ApiMissing,
    /// The probe finished synchronously.
    Supported(bool),
    /// The probe is running; the answer arrives through
    /// [`super::ArSessionController::on_probe_result`].
    Pending,
    /// The probe itself failed.
    Failed(ArCapabilityError),
}

/// Capability detection failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArCapabilityError(pub String);

impl fmt::Display for ArCapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AR capability detection failed: {}", self.0)
    }
}

impl std::error::Error for ArCapabilityError {}

/// A session could not be started or ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArSessionError {
    /// AR is unsupported, the context is insecure, or a session is already
    /// active.
    NotAvailable,
    /// The platform (or the user) declined the session request.
    Rejected(String),
    /// The platform reported an error during the session.
    Platform(String),
}

impl fmt::Display for ArSessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAvailable => write!(f, "AR is not available"),
            Self::Rejected(msg) => write!(f, "session request rejected: {msg}"),
            Self::Platform(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ArSessionError {}

/// Host XR API.
///
/// Session start, end and runtime errors are reported back asynchronously
/// through the controller's `on_session_*` callbacks.
pub trait XrPlatform {
    /// Whether the host is a secure (https or local) context.
    fn is_secure_context(&self) -> bool;

    /// Ask whether immersive AR sessions are supported.
    fn probe_immersive_ar(&mut self) -> ProbeOutcome;

    /// Request an immersive AR session.
    ///
    /// # Errors
    ///
    /// [`ArSessionError::Rejected`] when the request is refused outright.
    fn request_session(&mut self) -> Result<(), ArSessionError>;

    /// Ask the active session to end.
    ///
    /// # Errors
    ///
    /// [`ArSessionError::Platform`] when the platform cannot end it.
    fn end_session(&mut self) -> Result<(), ArSessionError>;
}

/// Native host without any XR API.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoXrPlatform;

impl XrPlatform for NoXrPlatform {
    fn is_secure_context(&self) -> bool {
        true
    }

    fn probe_immersive_ar(&mut self) -> ProbeOutcome {
        ProbeOutcome::ApiMissing
    }

    fn request_session(&mut self) -> Result<(), ArSessionError> {
        Err(ArSessionError::NotAvailable)
    }

    fn end_session(&mut self) -> Result<(), ArSessionError> {
        Ok(())
    }
}
