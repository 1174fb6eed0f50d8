// TiltCue - motion-cue firmware core
//
// Everything except the ESP-IDF wiring in `main.rs` builds and tests on the
// host.

pub mod attitude;
pub mod channel;
pub mod config;
pub mod drivers;
pub mod events;
pub mod motion;
pub mod sampler;
pub mod sim;
pub mod statemachine;
pub mod tasks;
