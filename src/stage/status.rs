//! User-facing AR status text and the Start AR gate.

use crate::ar::{ArCapability, ArSessionState};

/// Snapshot of everything the status text depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusInputs<'a> {
    /// Probe result.
    pub capability: ArCapability,
    /// Secure-context flag.
    pub secure: bool,
    /// A structure fetch is in flight.
    pub loading: bool,
    /// Message of the last failed load.
    pub load_error: Option<&'a str>,
    /// The viewer and its AR entry point are ready.
    pub initialized: bool,
    /// Session state.
    pub session: ArSessionState,
    /// Message of the last AR failure.
    pub ar_error: Option<&'a str>,
}

/// Status line under the Start AR control. The first matching condition
/// wins.
#[must_use]
pub fn status_message(s: &StatusInputs<'_>) -> String {
    if s.capability == ArCapability::Probing {
        return "Checking whether this browser supports WebXR...".to_owned();
    }
    if !s.secure {
        return "AR needs a secure (https) connection. Open the viewer using https and try again."
            .to_owned();
    }
    if s.capability == ArCapability::Unsupported {
        return "This device or browser does not expose WebXR immersive-ar. Try Chrome on Android or Safari on iOS 13+."
            .to_owned();
    }
    if s.loading {
        return "Loading 3D structure...".to_owned();
    }
    if s.load_error.is_some() {
        return "Fix the molecule load error above, then try again.".to_owned();
    }
    if !s.initialized {
        return "Viewer initialising...".to_owned();
    }
    match s.session {
        ArSessionState::Presenting => {
            "AR session active - move your device to explore the molecule.".to_owned()
        }
        ArSessionState::Error => format!(
            "AR session failed: {}. The 3D preview is still available.",
            s.ar_error.unwrap_or("unknown error")
        ),
        ArSessionState::Idle | ArSessionState::Requesting => {
            "Ready to launch AR. Position your device and tap Start AR when you are ready."
                .to_owned()
        }
    }
}

/// Banner above the viewport.
#[must_use]
pub fn ar_banner(s: &StatusInputs<'_>) -> &'static str {
    if s.capability == ArCapability::Unsupported {
        "AR requires a WebXR capable device (Chrome on Android or Safari on iOS 13+). You can still explore the molecule in 3D."
    } else if s.session == ArSessionState::Presenting {
        "AR session active - walk around the molecule to inspect bond angles."
    } else {
        "Tap Start AR on supported devices to place the molecule in your space."
    }
}

/// Whether the Start AR control is enabled.
#[must_use]
pub fn can_start_ar(s: &StatusInputs<'_>) -> bool {
    s.capability == ArCapability::Supported
        && s.secure
        && !s.loading
        && s.load_error.is_none()
        && s.initialized
}
