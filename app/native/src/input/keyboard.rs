//! Keyboard device state: per-key map plus the discrete event queue.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of slots in a key map. Every `u8` key code has a slot.
pub const KEY_MAP_LEN: usize = 256;

/// A virtual key code as used by the host's key map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualKey(pub u8);

impl VirtualKey {
    /// Converts a raw key parameter from a foreign call.
    ///
    /// Returns `None` when the value does not fit a virtual key code.
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> { u8::try_from(raw).ok().map(Self) }

    /// Returns the key code.
    #[must_use]
    pub const fn code(self) -> u8 { self.0 }

    /// Returns the slot index in a [`KeyMap`].
    #[must_use]
    pub const fn index(self) -> usize { self.0 as usize }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "0x{:02X}", self.0) }
}

/// How the host classified a queued key entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyEventKind {
    /// The key went down.
    Pressed,
    /// Auto-repeat while the key is held.
    Held,
    /// The key went up.
    Released,
    /// Continuous "some key is held" signal.
    AnyKeyHeld,
}

impl KeyEventKind {
}

/// One entry of the host's discrete key queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// The key the entry refers to.
    pub key: VirtualKey,
    /// The host's classification of the entry.
    pub kind: KeyEventKind,
}

impl KeyEvent {
    #[must_use]
    pub const fn new(key: VirtualKey, kind: KeyEventKind) -> Self { Self { key, kind } }
}

/// Per-key state bytes, indexed by virtual key code.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyMap([u8; KEY_MAP_LEN]);

impl Default for KeyMap {
    fn default() -> Self { Self([0; KEY_MAP_LEN]) }
}

impl fmt::Debug for KeyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let down: Vec<_> = (0..=u8::MAX).map(VirtualKey).filter(|key| self.is_down(*key)).collect();
        f.debug_struct("KeyMap").field("down", &down).finish()
    }
}

impl KeyMap {
    /// Returns the raw state byte for `key`.
    #[must_use]
    pub const fn get(&self, key: VirtualKey) -> u8 { self.0[key.index()] }

    /// Sets the raw state byte for `key`.
    pub const fn set(&mut self, key: VirtualKey, value: u8) { self.0[key.index()] = value; }

    /// Returns whether `key` has a non-zero state byte.
    #[must_use]
    pub const fn is_down(&self, key: VirtualKey) -> bool { self.get(key) != 0 }

    /// Zeroes the state byte for `key`.
    pub const fn clear(&mut self, key: VirtualKey) { self.set(key, 0); }
}

/// Host keyboard block: key map, queue and the host-reported queue count.
///
/// `queue_count` is whatever the host claims; it is not required to match
/// `queue.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardState {
    /// Per-key state.
    pub key_map: KeyMap,
    /// Queue slots. `None` marks an empty slot.
    pub queue: Vec<Option<KeyEvent>>,
    /// Number of queue entries the host reports for this tick.
    pub queue_count: i32,
}

impl KeyboardState {
    /// Builds a keyboard block whose reported count matches its queue.
    #[must_use]
    pub fn with_queue(events: impl IntoIterator<Item = KeyEvent>) -> Self {
        let queue: Vec<_> = events.into_iter().map(Some).collect();
        let queue_count = i32::try_from(queue.len()).unwrap_or(i32::MAX);
        Self { key_map: KeyMap::default(), queue, queue_count }
    }
}

/// Narrow access to a host-owned key map.
pub trait HostKeyMap {
    /// Returns a by-value copy of the map.
    fn snapshot(&self) -> KeyMap;

    /// Zeroes the state for `key` in place.
    fn clear_key(&mut self, key: VirtualKey);
}

/// Narrow access to a host-owned keyboard block with a discrete queue.
pub trait HostKeyboard: HostKeyMap {
    /// Queue length as reported by the host. May be negative or inflated.
    fn reported_count(&self) -> i32;

    /// Returns the queue entry at `index`, or `None` for an empty or
    /// out-of-range slot.
    fn entry(&self, index: usize) -> Option<KeyEvent>;
}

impl HostKeyMap for KeyMap {
    fn snapshot(&self) -> KeyMap { *self }

    fn clear_key(&mut self, key: VirtualKey) { self.clear(key); }
}

impl HostKeyMap for KeyboardState {
    fn snapshot(&self) -> KeyMap { self.key_map }

    fn clear_key(&mut self, key: VirtualKey) { self.key_map.clear(key); }
}

impl HostKeyboard for KeyboardState {
    fn reported_count(&self) -> i32 { self.queue_count }

    fn entry(&self, index: usize) -> Option<KeyEvent> { self.queue.get(index).copied().flatten() }
}
