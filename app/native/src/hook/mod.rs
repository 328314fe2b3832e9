//! Interception point abstraction.
//!
//! The engine never patches code itself. A platform collaborator supplies two
//! capabilities:
//!
//! - [`CallSiteLocator`] - turns a [`CallSite`] description into an address
//! - [`DetourBackend`] - creates a [`RawDetour`] redirecting that address
//!
//! [`InterceptionPoint`] wraps one installed detour and owns its
//! enable/disable/dispose lifecycle.
//!
//! # Usage
//!
//! ```ignore
//! use input_intercept::hook::{CallSite, InterceptionPoint, intercept};
//!
//! let site = CallSite::new("input", "E8 ?? ?? ?? ?? 83 7B 58 00");
//! let mut point = InterceptionPoint::install(site, &locator, &mut backend)?;
//! point.enable()?;
//!
//! // Inside the detour:
//! let ret = intercept(|| original(args), || engine_work());
//! ```

mod point;

use std::fmt;

pub use point::{InterceptionPoint, intercept};

/// Description of a foreign call site handed to the locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Human-readable name used in logs and errors.
    pub name: String,
    /// Opaque locator input (for example a byte signature).
    pub signature: String,
}

impl CallSite {
    #[must_use]
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self { name: name.into(), signature: signature.into() }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.name) }
}

/// Resolves call sites to addresses in the foreign module.
pub trait CallSiteLocator {
    /// Returns the address of `site`, or `None` if it cannot be found.
    fn locate(&self, site: &CallSite) -> Option<usize>;
}

/// One installed detour as provided by the platform.
///
/// Dropping the value must remove the patch and restore the original code.
pub trait RawDetour: Send {
    /// Starts redirecting calls through the detour.
    ///
    /// # Errors
    ///
    /// Returns a description of the platform failure.
    fn enable(&mut self) -> Result<(), String>;

    /// Stops redirecting calls. The patch stays installed.
    ///
    /// # Errors
    ///
    /// Returns a description of the platform failure.
    fn disable(&mut self) -> Result<(), String>;
}

/// Creates detours at resolved addresses.
pub trait DetourBackend {
    /// Installs a disabled detour at `address` for `site`.
    ///
    /// # Errors
    ///
    /// Returns a description of the platform failure.
    fn create(&mut self, site: &CallSite, address: usize) -> Result<Box<dyn RawDetour>, String>;
}
