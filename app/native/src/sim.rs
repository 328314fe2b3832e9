//! In-process stand-in for the platform hooking layer.
//!
//! [`SimulatedHost`] resolves call sites from a name table and hands out
//! detours that only record what happened to them. It lets the engine's
//! lifecycle run end-to-end without patching any code, for tests and for
//! trace replay.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{INPUT_SITE, KEY_MESSAGE_SITE};
use crate::hook::{CallSite, CallSiteLocator, DetourBackend, RawDetour};

/// Something that happened to a simulated detour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    Created(String),
    Enabled(String),
    Disabled(String),
    Removed(String),
}

/// A locator and detour backend over a fixed address table.
///
/// Clones share the address table and the event log.
#[derive(Debug, Clone)]
pub struct SimulatedHost {
    addresses: HashMap<String, usize>,
    events: Arc<Mutex<Vec<HookEvent>>>,
}

impl Default for SimulatedHost {
    fn default() -> Self { Self::new() }
}

impl SimulatedHost {
    /// Base address handed out for the first known site.
    const BASE_ADDRESS: usize = 0x1_4000_0000;

    /// Creates a host that knows both engine call sites.
    #[must_use]
    pub fn new() -> Self {
        Self { addresses: HashMap::new(), events: Arc::default() }
            .with_site(INPUT_SITE, Self::BASE_ADDRESS + 0x10)
            .with_site(KEY_MESSAGE_SITE, Self::BASE_ADDRESS + 0x20)
    }

    /// Adds or replaces a site's address.
    #[must_use]
    pub fn with_site(mut self, name: &str, address: usize) -> Self {
        self.addresses.insert(name.to_string(), address);
        self
    }

    /// Forgets a site, so locating it fails.
    #[must_use]
    pub fn without_site(mut self, name: &str) -> Self {
        self.addresses.remove(name);
        self
    }

    /// Every recorded event, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<HookEvent> { self.events.lock().clone() }

    /// Names of sites whose detour is currently enabled, in enable order.
    #[must_use]
    pub fn enabled_sites(&self) -> Vec<String> {
        let mut enabled: Vec<String> = Vec::new();
        for event in self.events.lock().iter() {
            match event {
                HookEvent::Enabled(name) => enabled.push(name.clone()),
                HookEvent::Disabled(name) | HookEvent::Removed(name) => {
                    enabled.retain(|existing| existing != name);
                }
                HookEvent::Created(_) => {}
            }
        }
        enabled
    }
}

impl CallSiteLocator for SimulatedHost {
    fn locate(&self, site: &CallSite) -> Option<usize> { self.addresses.get(&site.name).copied() }
}

impl DetourBackend for SimulatedHost {
    fn create(&mut self, site: &CallSite, address: usize) -> Result<Box<dyn RawDetour>, String> {
        if self.addresses.get(&site.name) != Some(&address) {
            return Err(format!("no code at {address:#x} for {site}"));
        }
        self.events.lock().push(HookEvent::Created(site.name.clone()));
        Ok(Box::new(SimulatedDetour {
            name: site.name.clone(),
            events: Arc::clone(&self.events),
        }))
    }
}

struct SimulatedDetour {
    name: String,
    events: Arc<Mutex<Vec<HookEvent>>>,
}

impl RawDetour for SimulatedDetour {
    fn enable(&mut self) -> Result<(), String> {
        self.events.lock().push(HookEvent::Enabled(self.name.clone()));
        Ok(())
    }

    fn disable(&mut self) -> Result<(), String> {
        self.events.lock().push(HookEvent::Disabled(self.name.clone()));
        Ok(())
    }
}

impl Drop for SimulatedDetour {
    fn drop(&mut self) { self.events.lock().push(HookEvent::Removed(self.name.clone())); }
}
