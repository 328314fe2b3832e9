//! Mouse device state as reported by the host each tick.

use bitflags::bitflags;

bitflags! {
    /// Mouse buttons, one bit per button.
    ///
    /// Bit values match the host's own button mask so a raw mask can be
    /// converted with [`MouseButton::from_bits_truncate`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseButton: u8 {
        const LEFT = 1;
        const MIDDLE = 1 << 1;
        const RIGHT = 1 << 2;
        const BACK = 1 << 3;
        const FORWARD = 1 << 4;
    }
}

impl MouseButton {
    /// Returns a short lowercase name for a single button.
    ///
    /// Combined masks return `"mixed"`, the empty mask returns `"none"`.
    #[must_use]
    pub fn label(self) -> &'static str {
        const NAMES: [(MouseButton, &str); 5] = [
            (MouseButton::LEFT, "left"),
            (MouseButton::MIDDLE, "middle"),
            (MouseButton::RIGHT, "right"),
            (MouseButton::BACK, "back"),
            (MouseButton::FORWARD, "forward"),
        ];

        if self.is_empty() {
            return "none";
        }
        NAMES
            .iter()
            .find(|(button, _)| *button == self)
            .map_or("mixed", |(_, name)| *name)
    }

    /// Parses a button name as produced by [`MouseButton::label`].
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "left" => Some(Self::LEFT),
            "middle" => Some(Self::MIDDLE),
            "right" => Some(Self::RIGHT),
            "back" | "button4" => Some(Self::BACK),
            "forward" | "button5" => Some(Self::FORWARD),
            _ => None,
        }
    }
}

bitflags! {
    /// Which per-button bits of a [`MouseState`] an operation touches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ButtonBits: u8 {
        /// The "currently held" bit.
        const PRESSED = 1;
        /// The "transitioned to pressed this tick" bit.
        const CLICKED = 1 << 1;
    }
}

/// Instantaneous mouse state for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseState {
    /// Cursor x position in host client coordinates.
    pub x: i32,
    /// Cursor y position in host client coordinates.
    pub y: i32,
    /// Wheel delta for this tick.
    pub wheel: i8,
    /// Buttons currently held.
    pub pressed: MouseButton,
    /// Buttons that transitioned to pressed this tick.
    pub clicked: MouseButton,
}

impl MouseState {
    /// Returns whether `button` is held.
    #[must_use]
    pub const fn is_pressed(&self, button: MouseButton) -> bool { self.pressed.intersects(button) }

    /// Returns whether `button` went down this tick.
    #[must_use]
    pub const fn is_clicked(&self, button: MouseButton) -> bool { self.clicked.intersects(button) }

    /// Clears the selected bits for `button`.
    pub fn clear_bits(&mut self, button: MouseButton, bits: ButtonBits) {
        if bits.contains(ButtonBits::PRESSED) {
            self.pressed.remove(button);
        }
        if bits.contains(ButtonBits::CLICKED) {
            self.clicked.remove(button);
        }
    }
}

/// Narrow access to a host-owned mouse block.
///
/// Implementations wrap memory the engine does not own. The engine reads a
/// value copy once per tick and only ever clears bits through [`clear`].
///
/// [`clear`]: HostMouse::clear
pub trait HostMouse {
    /// Returns a by-value copy of the block.
    fn read(&self) -> MouseState;

    /// Clears the selected bits for `button` in place.
    fn clear(&mut self, button: MouseButton, bits: ButtonBits);
}

impl HostMouse for MouseState {
    fn read(&self) -> MouseState { *self }

    fn clear(&mut self, button: MouseButton, bits: ButtonBits) { self.clear_bits(button, bits); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_labels_round_trip() {
        for button in MouseButton::all().iter() {
            assert_eq!(MouseButton::from_label(button.label()), Some(button));
        }
        assert_eq!(MouseButton::empty().label(), "none");
        assert_eq!((MouseButton::LEFT | MouseButton::RIGHT).label(), "mixed");
        assert_eq!(MouseButton::from_label("Button4"), Some(MouseButton::BACK));
        assert_eq!(MouseButton::from_label("wheel"), None);
    }

    #[test]
    fn test_all_iterates_single_buttons() {
        let buttons: Vec<_> = MouseButton::all().iter().collect();
        assert_eq!(buttons.len(), 5);
        assert_eq!(buttons[0], MouseButton::LEFT);
        assert_eq!(buttons[4], MouseButton::FORWARD);
    }

    #[test]
    fn test_clear_bits_is_selective() {
        let mut state = MouseState {
            pressed: MouseButton::LEFT | MouseButton::RIGHT,
            clicked: MouseButton::LEFT,
            ..MouseState::default()
        };

        state.clear_bits(MouseButton::LEFT, ButtonBits::CLICKED);
        assert!(state.is_pressed(MouseButton::LEFT));
        assert!(!state.is_clicked(MouseButton::LEFT));

        state.clear_bits(MouseButton::LEFT, ButtonBits::all());
        assert!(!state.is_pressed(MouseButton::LEFT));
        assert!(state.is_pressed(MouseButton::RIGHT));
    }

    #[test]
    fn test_host_mouse_read_is_a_copy() {
        let mut host = MouseState { pressed: MouseButton::MIDDLE, ..MouseState::default() };
        let copy = HostMouse::read(&host);
        HostMouse::clear(&mut host, MouseButton::MIDDLE, ButtonBits::PRESSED);

        assert!(copy.is_pressed(MouseButton::MIDDLE));
        assert!(!host.is_pressed(MouseButton::MIDDLE));
    }
}
