//! Structure download from PubChem.
//!
//! The engine itself only consumes connection-table text; this module is
//! the collaborator that produces it. URL construction, CID validation,
//! error classification and cancellation live here unconditionally, while
//! the blocking HTTP call is behind the `fetch` feature.
//!
//! ```no_run
//! # #[cfg(feature = "fetch")]
//! # fn main() -> Result<(), molstage::fetch::FetchError> {
//! use molstage::fetch::{fetch_sdf, CancelToken};
//!
//! let sdf = fetch_sdf("702", &CancelToken::new())?;
//! assert!(sdf.contains("V2000"));
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "fetch"))]
//! # fn main() {}
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// PubChem PUG REST base for compound records.
const PUBCHEM_COMPOUND_URL: &str =
    "https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/cid";

/// `Accept` header sent with structure requests.
pub const SDF_ACCEPT: &str = "chemical/x-mdl-sdfile, text/plain";

/// Errors from fetching a structure file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The service has no 3D record for this compound (HTTP 404).
    NotFound,
    /// Any other non-success HTTP status.
    Status(u16),
    /// Transport-level failure (DNS, TLS, connection reset, body read).
    Network(String),
    /// The compound identifier is not a PubChem CID.
    InvalidCid(String),
    /// The request was superseded or the viewer was torn down.
    Cancelled,
}

impl FetchError {
    /// Text shown to the user in place of the molecule.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound => {
                "3D structure not available for this molecule.".to_owned()
            }
            Self::Status(code) => {
                format!("PubChem request failed with status {code}.")
            }
            Self::Network(msg) => {
                format!("Could not reach PubChem: {msg}")
            }
            Self::InvalidCid(_) => {
                "Enter a PubChem CID before loading.".to_owned()
            }
            Self::Cancelled => "Request cancelled.".to_owned(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "structure not found (HTTP 404)"),
            Self::Status(code) => write!(f, "HTTP status {code}"),
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::InvalidCid(cid) => write!(f, "invalid CID '{cid}'"),
            Self::Cancelled => write!(f, "request cancelled"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Shared cancellation flag for one in-flight fetch.
///
/// Clones observe the same flag, so the fetching side can poll a clone
/// while the owner cancels.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the fetch as abandoned.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Trim and validate a PubChem CID (ASCII digits only).
///
/// # Errors
///
/// [`FetchError::InvalidCid`] for blank or non-numeric input.
pub fn validate_cid(cid: &str) -> Result<&str, FetchError> {
    let trimmed = cid.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FetchError::InvalidCid(trimmed.to_owned()));
    }
    Ok(trimmed)
}

/// Download URL for the 3D SDF record of a compound.
#[must_use]
pub fn pubchem_sdf_url(cid: &str) -> String {
    format!("{PUBCHEM_COMPOUND_URL}/{}/record/SDF?record_type=3d", cid.trim())
}

/// Fetch the 3D SDF text for a compound (blocking).
///
/// Cancellation is checked before the request and after each blocking
/// step; a cancelled fetch returns [`FetchError::Cancelled`] and its body
/// is dropped.
///
/// # Errors
///
/// See [`FetchError`].
#[cfg(feature = "fetch")]
pub fn fetch_sdf(cid: &str, cancel: &CancelToken) -> Result<String, FetchError> {
    let cid = validate_cid(cid)?;
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }

    let url = pubchem_sdf_url(cid);
    log::info!("Downloading CID {cid} from PubChem...");

    let response = ureq::get(&url)
        .header("Accept", SDF_ACCEPT)
        .call()
        .map_err(classify)?;
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }

    let body = response
        .into_body()
        .read_to_string()
        .map_err(|e| FetchError::Network(e.to_string()))?;
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }

    log::info!("Downloaded CID {cid} ({} bytes)", body.len());
    Ok(body)
}

#[cfg(feature = "fetch")]
fn classify(err: ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(404) => FetchError::NotFound,
        ureq::Error::StatusCode(code) => FetchError::Status(code),
        other => FetchError::Network(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_cid() {
        assert_eq!(
            pubchem_sdf_url(" 2244 "),
            "https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/cid/2244/record/SDF?record_type=3d"
        );
    }

    #[test]
    fn cid_validation() {
        assert_eq!(validate_cid(" 962 "), Ok("962"));
        assert_eq!(validate_cid(""), Err(FetchError::InvalidCid(String::new())));
        assert!(validate_cid("aspirin").is_err());
        assert!(validate_cid("12 3").is_err());
    }

    #[test]
    fn not_found_has_its_own_message() {
        assert_eq!(
            FetchError::NotFound.user_message(),
            "3D structure not available for this molecule."
        );
        assert_eq!(
            FetchError::Status(503).user_message(),
            "PubChem request failed with status 503."
        );
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let worker = token.clone();
        assert!(!worker.is_cancelled());
        token.cancel();
        assert!(worker.is_cancelled());
    }
}
