//! Byte-wide, bit-addressable I/O registers
//!
//! The protocol only ever needs read-modify-write bit operations on the
//! direction, output and input registers of a port. Register values are
//! shared hardware state, so every operation takes `&self`.

use core::ptr::{read_volatile, write_volatile};

/// A single byte-wide register that can be read and written.
pub trait BitRegister {
    /// Read the whole register.
    fn read(&self) -> u8;

    /// Write the whole register.
    fn write(&self, value: u8);

    /// `reg |= mask`
    fn set_bits(&self, mask: u8) {
        self.write(self.read() | mask);
    }

    /// `reg &= !mask`
    fn clear_bits(&self, mask: u8) {
        self.write(self.read() & !mask);
    }

    /// True when any bit of `mask` is set.
    fn test_bits(&self, mask: u8) -> bool {
        self.read() & mask != 0
    }
}

impl<T: BitRegister + ?Sized> BitRegister for &T {
    fn read(&self) -> u8 {
        (**self).read()
    }

    fn write(&self, value: u8) {
        (**self).write(value)
    }

    fn set_bits(&self, mask: u8) {
        (**self).set_bits(mask)
    }

    fn clear_bits(&self, mask: u8) {
        (**self).clear_bits(mask)
    }

    fn test_bits(&self, mask: u8) -> bool {
        (**self).test_bits(mask)
    }
}

/// Which register of a port triple a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterKind {
    Direction,
    Output,
    Input,
}

/// The direction/output/input register triple of one port.
///
/// A set bit in `dir` makes the line an output.
#[derive(Debug, Clone, Copy)]
pub struct PortRegisters<R> {
    pub dir: R,
    pub out: R,
    pub input: R,
}

impl<R> PortRegisters<R> {
    pub fn new(dir: R, out: R, input: R) -> Self {
        PortRegisters { dir, out, input }
    }
}

/// A memory-mapped 8-bit register accessed with volatile reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mmio8(*mut u8);

impl Mmio8 {
    /// # Safety
    ///
    /// `addr` must point to a readable and writable byte for as long as the
    /// register (or any copy of it) is used.
    pub const unsafe fn from_addr(addr: usize) -> Self {
        Mmio8(addr as *mut u8)
    }

    /// # Safety
    ///
    /// Same contract as [`Mmio8::from_addr`].
    pub const unsafe fn from_ptr(ptr: *mut u8) -> Self {
        Mmio8(ptr)
    }

    pub fn addr(&self) -> usize {
        self.0 as usize
    }
}

impl BitRegister for Mmio8 {
    fn read(&self) -> u8 {
        unsafe { read_volatile(self.0) }
    }

    fn write(&self, value: u8) {
        unsafe { write_volatile(self.0, value) }
    }
}
