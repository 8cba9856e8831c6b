//! Platform register maps
//!
//! A register map resolves a logical port number to the direction, output
//! and input registers backing it. Maps are passed explicitly to controller
//! setup instead of being referenced as global chip symbols.

pub mod msp430;
#[cfg(feature = "rpi")]
pub mod rpi;

use crate::register::{BitRegister, PortRegisters};

pub use msp430::Msp430Ports;
#[cfg(feature = "rpi")]
pub use rpi::{GpioError, RppalPorts};

/// Ports a controller may be attached to.
pub const SUPPORTED_PORTS: [u8; 2] = [1, 2];

pub trait RegisterMap {
    type Register: BitRegister;

    /// Registers of `port`, or `None` when the platform has no such port.
    fn port(&self, port: u8) -> Option<PortRegisters<Self::Register>>;

    /// Mask of the bits of `port` that are wired to a physical line.
    /// Maps whose registers are complete bytes keep the default.
    fn lines(&self, _port: u8) -> u8 {
        0xff
    }
}

impl<M: RegisterMap + ?Sized> RegisterMap for &M {
    type Register = M::Register;

    fn port(&self, port: u8) -> Option<PortRegisters<Self::Register>> {
        (**self).port(port)
    }

    fn lines(&self, port: u8) -> u8 {
        (**self).lines(port)
    }
}
