//! A single installed detour and its lifecycle.

use super::{CallSite, CallSiteLocator, DetourBackend, RawDetour};
use crate::error::{EngineError, EngineResult};

/// Lifecycle state of an interception point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HookState {
    Disabled,
    Enabled,
    Disposed,
}

/// An installed redirection at a foreign call site.
///
/// Disabling or disposing twice is a no-op. Dropping the point disposes it.
pub struct InterceptionPoint {
    site: CallSite,
    address: usize,
    detour: Option<Box<dyn RawDetour>>,
    state: HookState,
}

impl std::fmt::Debug for InterceptionPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptionPoint")
            .field("site", &self.site.name)
            .field("address", &format_args!("{:#x}", self.address))
            .field("state", &self.state)
            .finish()
    }
}

impl InterceptionPoint {
    /// Locates `site` and installs a disabled detour on it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LocationNotFound`] if the locator has no address
    /// for the site, or [`EngineError::HookInstall`] if the backend fails.
    pub fn install(
        site: CallSite,
        locator: &dyn CallSiteLocator,
        backend: &mut dyn DetourBackend,
    ) -> EngineResult<Self> {
        let Some(address) = locator.locate(&site) else {
            return Err(EngineError::location_not_found(&site.name, &site.signature));
        };

        let detour = backend
            .create(&site, address)
            .map_err(|reason| EngineError::hook_install(&site.name, reason))?;

        tracing::debug!(site = %site, address, "input: hook installed");

        Ok(Self {
            site,
            address,
            detour: Some(detour),
            state: HookState::Disabled,
        })
    }

    /// Starts redirecting calls. Enabling an enabled point is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::HookInstall`] if the point was disposed or the
    /// backend fails to enable the detour.
    pub fn enable(&mut self) -> EngineResult<()> {
        match self.state {
            HookState::Enabled => Ok(()),
            HookState::Disposed => Err(EngineError::hook_install(
                &self.site.name,
                "interception point already disposed",
            )),
            HookState::Disabled => {
                let Some(detour) = self.detour.as_mut() else {
                    return Err(EngineError::hook_install(&self.site.name, "detour missing"));
                };
                detour.enable().map_err(|reason| EngineError::hook_install(&self.site.name, reason))?;
                self.state = HookState::Enabled;
                tracing::debug!(site = %self.site, "input: hook enabled");
                Ok(())
            }
        }
    }

    /// Stops redirecting calls. No-op unless the point is enabled.
    pub fn disable(&mut self) {
        if self.state != HookState::Enabled {
            tracing::trace!(site = %self.site, "input: disable on inactive hook ignored");
            return;
        }

        if let Some(detour) = self.detour.as_mut()
            && let Err(err) = detour.disable()
        {
            tracing::warn!(site = %self.site, error = %err, "input: failed to disable hook");
        }
        self.state = HookState::Disabled;
        tracing::debug!(site = %self.site, "input: hook disabled");
    }

    /// Disables the point and removes the detour. No-op once disposed.
    pub fn dispose(&mut self) {
        if self.state == HookState::Disposed {
            tracing::trace!(site = %self.site, "input: dispose on disposed hook ignored");
            return;
        }

        self.disable();
        drop(self.detour.take());
        self.state = HookState::Disposed;
        tracing::debug!(site = %self.site, "input: hook disposed");
    }

    /// Returns whether calls are currently redirected.
    #[must_use]
    pub fn is_enabled(&self) -> bool { self.state == HookState::Enabled }

    /// Returns whether the detour has been removed.
    #[must_use]
    pub fn is_disposed(&self) -> bool { self.state == HookState::Disposed }

    /// Returns the resolved call-site address.
    #[must_use]
    pub const fn address(&self) -> usize { self.address }

    /// Returns the call site this point was installed for.
    #[must_use]
    pub const fn site(&self) -> &CallSite { &self.site }
}

impl Drop for InterceptionPoint {
    fn drop(&mut self) { self.dispose(); }
}

/// Runs the original foreign call, then `handler`, and returns the original's result.
///
/// The original always runs first and its result is returned untouched, so the
/// existence of the hook never changes host behavior by itself.
pub fn intercept<R>(original: impl FnOnce() -> R, handler: impl FnOnce()) -> R {
    let result = original();
    handler();
    result
}
