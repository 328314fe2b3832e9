//! Double-buffered shadow copy of device state.
//!
//! The mirror holds what the engine observed, independent of whatever the host
//! does with its own block afterwards. Snapshots are always copied by value.

use crate::input::{ButtonBits, KeyMap, MouseButton, MouseState, VirtualKey};

/// Shadow device state owned by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateMirror {
    current: MouseState,
    previous: MouseState,
    keys: KeyMap,
}

impl StateMirror {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Copies this tick's mouse snapshot into `current`.
    pub const fn update(&mut self, raw: MouseState) { self.current = raw; }

    /// Copies this tick's queue key map.
    pub const fn update_keys(&mut self, raw: KeyMap) { self.keys = raw; }

    /// Mouse state as observed this tick, including suppressions applied so far.
    #[must_use]
    pub const fn current(&self) -> &MouseState { &self.current }

    /// Mouse state as of the end of the previous tick.
    #[must_use]
    pub const fn previous(&self) -> &MouseState { &self.previous }

    /// Last copied queue key map.
    #[cfg(test)]
    pub(crate) const fn keys(&self) -> &KeyMap { &self.keys }

    /// Returns whether `button` was held last tick and is not held now.
    #[must_use]
    pub const fn is_released(&self, button: MouseButton) -> bool {
        self.previous.is_pressed(button) && !self.current.is_pressed(button)
    }

    /// Clears `bits` for `button` in both `current` and the `previous`
    /// comparison basis, so later steps of the same tick see the suppression.
    pub fn suppress(&mut self, button: MouseButton, bits: ButtonBits) {
        self.current.clear_bits(button, bits);
        self.previous.clear_bits(button, bits);
    }

    /// Clears `key` in the mirrored key map.
    pub const fn suppress_key(&mut self, key: VirtualKey) { self.keys.clear(key); }

    /// Rotates `previous = current`. Called once per tick after classification.
    pub const fn commit(&mut self) { self.previous = self.current; }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(button: MouseButton) -> MouseState {
        MouseState { pressed: button, ..MouseState::default() }
    }

    #[test]
    fn test_update_copies_by_value() {
        let mut mirror = StateMirror::new();
        let mut raw = held(MouseButton::LEFT);
        mirror.update(raw);

        raw.pressed = MouseButton::empty();

        assert!(mirror.current().is_pressed(MouseButton::LEFT));
    }

    #[test]
    fn test_release_detection_uses_previous() {
        let mut mirror = StateMirror::new();
        mirror.update(held(MouseButton::RIGHT));
        assert!(!mirror.is_released(MouseButton::RIGHT));
        mirror.commit();

        mirror.update(MouseState::default());
        assert!(mirror.is_released(MouseButton::RIGHT));
        assert!(!mirror.is_released(MouseButton::LEFT));
    }

    #[test]
    fn test_suppress_clears_comparison_basis() {
        let mut mirror = StateMirror::new();
        mirror.update(held(MouseButton::LEFT));
        mirror.commit();
        mirror.update(MouseState::default());
        assert!(mirror.is_released(MouseButton::LEFT));

        mirror.suppress(MouseButton::LEFT, ButtonBits::all());

        assert!(!mirror.is_released(MouseButton::LEFT));
        assert!(!mirror.previous().is_pressed(MouseButton::LEFT));
    }

    #[test]
    fn test_commit_happens_only_on_request() {
        let mut mirror = StateMirror::new();
        mirror.update(held(MouseButton::MIDDLE));
        assert_eq!(*mirror.previous(), MouseState::default());

        mirror.commit();
        assert_eq!(mirror.previous(), mirror.current());
    }

    #[test]
    fn test_suppress_key() {
        let mut mirror = StateMirror::new();
        let mut keys = KeyMap::default();
        keys.set(VirtualKey(0x41), 1);
        mirror.update_keys(keys);

        mirror.suppress_key(VirtualKey(0x41));
        assert!(!mirror.keys().is_down(VirtualKey(0x41)));
    }
}
