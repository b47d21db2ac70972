//! Load state and ticketed structure fetches.

use crate::fetch::{CancelToken, FetchError};

/// Progress of the current structure load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The molecule is on stage.
    Loaded,
    /// The last load failed; holds the user-facing message.
    Failed(String),
}

impl LoadState {
    /// Whether a fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// User-facing error message, if the last load failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Identifies one load request. Results carrying an outdated ticket are
/// discarded.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    generation: u64,
    cid: String,
    cancel: CancelToken,
}

impl FetchTicket {
    /// Compound being fetched.
    #[must_use]
    pub fn cid(&self) -> &str {
        &self.cid
    }

    /// Cancellation token to hand to the fetch.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

/// What happened to a completed fetch.
#[derive(Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The ticket is current; the body should be parsed and applied.
    Accepted(String),
    /// The ticket is current and the fetch failed.
    Failed(FetchError),
    /// A newer request superseded this one; the result was dropped.
    Stale,
}

/// Issues tickets and discards results of superseded loads.
#[derive(Debug, Default)]
pub struct LoadCoordinator {
    generation: u64,
    in_flight: Option<CancelToken>,
}

impl LoadCoordinator {
    /// Coordinator with no load in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a load, cancelling the one in flight.
    pub fn begin(&mut self, cid: &str) -> FetchTicket {
        self.cancel();
        self.generation += 1;
        let cancel = CancelToken::new();
        self.in_flight = Some(cancel.clone());
        log::info!("loading CID {cid} (request {})", self.generation);
        FetchTicket {
            generation: self.generation,
            cid: cid.to_owned(),
            cancel,
        }
    }

    /// Whether `ticket` belongs to the most recent load.
    #[must_use]
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation && self.in_flight.is_some()
    }

    /// Resolve a fetch result against the current ticket.
    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        result: Result<String, FetchError>,
    ) -> LoadOutcome {
        if !self.is_current(ticket) || ticket.cancel.is_cancelled() {
            log::debug!("discarding stale result for CID {}", ticket.cid);
            return LoadOutcome::Stale;
        }
        self.in_flight = None;
        match result {
            Ok(body) => LoadOutcome::Accepted(body),
            Err(FetchError::Cancelled) => LoadOutcome::Stale,
            Err(e) => LoadOutcome::Failed(e),
        }
    }

    /// Cancel the load in flight, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_request_supersedes_older() {
        let mut loads = LoadCoordinator::new();
        let first = loads.begin("702");
        let second = loads.begin("241");
        assert!(first.cancel_token().is_cancelled());
        assert!(!second.cancel_token().is_cancelled());

        assert_eq!(
            loads.complete(&first, Ok("ethanol".to_owned())),
            LoadOutcome::Stale
        );
        assert_eq!(
            loads.complete(&second, Ok("benzene".to_owned())),
            LoadOutcome::Accepted("benzene".to_owned())
        );
    }

    #[test]
    fn each_ticket_completes_once() {
        let mut loads = LoadCoordinator::new();
        let ticket = loads.begin("702");
        let _ = loads.complete(&ticket, Ok(String::new()));
        assert_eq!(loads.complete(&ticket, Ok(String::new())), LoadOutcome::Stale);
    }

    #[test]
    fn errors_pass_through_for_current_ticket() {
        let mut loads = LoadCoordinator::new();
        let ticket = loads.begin("999999999");
        assert_eq!(
            loads.complete(&ticket, Err(FetchError::NotFound)),
            LoadOutcome::Failed(FetchError::NotFound)
        );
    }

    #[test]
    fn cancelled_fetch_is_stale() {
        let mut loads = LoadCoordinator::new();
        let ticket = loads.begin("702");
        loads.cancel();
        assert!(!loads.is_current(&ticket));
        assert_eq!(
            loads.complete(&ticket, Err(FetchError::Cancelled)),
            LoadOutcome::Stale
        );
    }

    #[test]
    fn load_state_helpers() {
        assert!(LoadState::Loading.is_loading());
        assert_eq!(LoadState::Failed("x".to_owned()).error(), Some("x"));
        assert_eq!(LoadState::Loaded.error(), None);
    }
}
