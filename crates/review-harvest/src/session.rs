//! Scoped browser sessions.
//!
//! Each harvesting phase (entry-point discovery, panel harvesting) opens its
//! own session and must release it on every exit path: success, typed
//! failure, or a panic inside the phase. [`Session::finish`] is the single
//! release point; callers drive the phase with `catch_unwind` and hand the
//! outcome to it.

use crate::provider::{BrowserProvider, BrowserSession, SessionProfile};
use crate::types::{HarvestError, HarvestResult};
use std::fmt;
use std::time::Instant;

/// Which phase of a product run a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Discovery,
    Harvest,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery => write!(f, "discovery"),
            Self::Harvest => write!(f, "harvest"),
        }
    }
}

/// A browser session owned by one phase.
pub struct Session {
    phase: SessionPhase,
    browser: Box<dyn BrowserSession>,
    opened_at: Instant,
}

impl Session {
    /// Open a session from the provider.
    pub async fn acquire(
        provider: &dyn BrowserProvider,
        profile: &SessionProfile,
        phase: SessionPhase,
    ) -> HarvestResult<Self> {
        let browser = provider
            .open_session(profile)
            .await
            .map_err(|e| HarvestError::SessionUnavailable {
                reason: format!("could not open {phase} session: {e:#}"),
            })?;
        tracing::debug!(%phase, "browser session opened");
        Ok(Self {
            phase,
            browser,
            opened_at: Instant::now(),
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The browser page driven by this session.
    pub fn browser(&mut self) -> &mut dyn BrowserSession {
        self.browser.as_mut()
    }

    /// Release the session, then return the phase's outcome. A panic caught
    /// from the phase is resumed after the session is closed.
    pub async fn finish<T>(self, outcome: std::thread::Result<T>) -> T {
        self.release().await;
        match outcome {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Close the browser session. Failures are logged, never returned.
    pub async fn release(self) {
        let phase = self.phase;
        let age_ms = self.opened_at.elapsed().as_millis() as u64;
        match self.browser.close().await {
            Ok(()) => tracing::debug!(%phase, age_ms, "browser session closed"),
            Err(e) => tracing::warn!(%phase, "failed to close browser session: {e:#}"),
        }
    }
}
