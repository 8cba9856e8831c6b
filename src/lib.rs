//! SNES Controller driver
//!
//! Reads the twelve buttons of a SNES-style game pad over its 3-wire
//! shift-register protocol (data, clock, latch). Pins live in byte-wide,
//! bit-addressable port registers supplied by a platform register map, and
//! all timing goes through an injected `DelayNs` provider.
//!
//! Without the `std` feature only the protocol core is built (`register`,
//! `platform::msp430`, `timing::CycleDelay`, `buttons`, `controller`,
//! `error`), which runs bare metal.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod buttons;
#[cfg(feature = "daemon")]
pub mod command;
#[cfg(feature = "daemon")]
pub mod config;
pub mod controller;
pub mod error;
pub mod platform;
pub mod register;
#[cfg(any(feature = "std", test))]
pub mod sim;
pub mod timing;

// Re-export main types for convenience
pub use buttons::{Button, ButtonState};
pub use controller::{ControllerPorts, Pins, SnesController};
pub use error::{ConfigurationError, Line};
pub use platform::RegisterMap;
pub use register::{BitRegister, PortRegisters};
