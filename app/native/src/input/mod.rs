//! Device state model shared by the host glue and the engine.
//!
//! - [`mouse`] - button bitflags and the per-tick mouse block
//! - [`keyboard`] - key map, discrete key queue and key identities
//!
//! Host-owned blocks are reached through the `Host*` traits only. The concrete
//! structs implement those traits so tests and the replay tool can act as host.

pub mod keyboard;
pub mod mouse;

pub use keyboard::{
    HostKeyMap, HostKeyboard, KEY_MAP_LEN, KeyEvent, KeyEventKind, KeyMap, KeyboardState,
    VirtualKey,
};
pub use mouse::{ButtonBits, HostMouse, MouseButton, MouseState};
