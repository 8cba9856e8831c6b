//! MSP430 (G2xx family) digital I/O ports 1 and 2
//!
//! Each port has a byte-wide input (PxIN), output (PxOUT) and direction
//! (PxDIR) register in peripheral space. A set PxDIR bit makes the pin an
//! output.

use super::RegisterMap;
use crate::register::{Mmio8, PortRegisters};

pub const P1IN: usize = 0x0020;
pub const P1OUT: usize = 0x0021;
pub const P1DIR: usize = 0x0022;

pub const P2IN: usize = 0x0028;
pub const P2OUT: usize = 0x0029;
pub const P2DIR: usize = 0x002A;

#[derive(Debug)]
pub struct Msp430Ports {
    _private: (),
}

impl Msp430Ports {
    /// # Safety
    ///
    /// Only valid when running on an MSP430 whose port 1 and port 2
    /// registers live at the G2xx addresses.
    pub unsafe fn new() -> Self {
        Msp430Ports { _private: () }
    }
}

impl RegisterMap for Msp430Ports {
    type Register = Mmio8;

    fn port(&self, port: u8) -> Option<PortRegisters<Mmio8>> {
        let (dir, out, input) = match port {
            1 => (P1DIR, P1OUT, P1IN),
            2 => (P2DIR, P2OUT, P2IN),
            _ => return None,
        };
        // Constructing the map promised these addresses are valid.
        unsafe {
            Some(PortRegisters::new(
                Mmio8::from_addr(dir),
                Mmio8::from_addr(out),
                Mmio8::from_addr(input),
            ))
        }
    }
}
