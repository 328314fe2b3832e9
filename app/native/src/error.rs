//! Error types for the input interception engine.
//!
//! Initialization failures are fatal and are returned from `InputEngine::init`.
//! Processing faults are recovered inside the tick handler and only logged;
//! they never reach the foreign caller of an interception point.

use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while installing hooks or processing a tick.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The call-site locator could not produce an address for a required site.
    #[error("Call site '{site}' not found (signature: {signature})")]
    LocationNotFound {
        /// Name of the interception point being installed.
        site: String,
        /// The signature that was handed to the locator.
        signature: String,
    },

    /// The detour backend refused to create or enable a detour.
    #[error("Failed to install hook '{site}': {reason}")]
    HookInstall {
        /// Name of the interception point being installed.
        site: String,
        /// Backend-provided failure description.
        reason: String,
    },

    /// `init` was called on an engine that already has interception points installed.
    #[error("Input engine already initialized")]
    AlreadyInitialized,

    /// A fault occurred while classifying or dispatching a tick.
    ///
    /// Never surfaced to the foreign caller; the tick handler logs it and drops
    /// the rest of that tick.
    #[error("Processing fault: {0}")]
    ProcessingFault(String),
}

impl EngineError {
    /// Creates a location-not-found error for the given site.
    #[must_use]
    pub fn location_not_found(site: impl Into<String>, signature: impl Into<String>) -> Self {
        Self::LocationNotFound {
            site: site.into(),
            signature: signature.into(),
        }
    }

    /// Creates a hook installation error for the given site.
    #[must_use]
    pub fn hook_install(site: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HookInstall { site: site.into(), reason: reason.into() }
    }

    /// Builds a processing fault from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::ProcessingFault(message)
    }

    /// Returns `true` if this error belongs to the hook-installation family.
    #[must_use]
    pub const fn is_install_error(&self) -> bool {
        matches!(
            self,
            Self::LocationNotFound { .. } | Self::HookInstall { .. } | Self::AlreadyInitialized
        )
    }

    /// Returns `true` if the engine recovers from this error on its own.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool { matches!(self, Self::ProcessingFault(_)) }
}
