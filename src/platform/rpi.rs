//! Raspberry Pi GPIO presented as byte-wide ports
//!
//! A port is a bank of up to eight BCM GPIO lines, one per register bit.
//! Writes to the direction register switch line modes, writes to the output
//! register drive levels, and reads of the input register sample every line.

use super::RegisterMap;
use crate::register::{BitRegister, PortRegisters, RegisterKind};
use log::{debug, trace};
use rppal::gpio::{Gpio, IoPin, Level, Mode};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Lines per port.
pub const BANK_WIDTH: usize = 8;

#[derive(Debug, Error)]
pub enum GpioError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("port {port} lists {count} lines, at most 8 are allowed")]
    TooManyLines { port: u8, count: usize },
}

/// A single GPIO line that can switch between input and output.
pub trait BankLine {
    fn set_output(&mut self, output: bool);
    fn set_level(&mut self, high: bool);
    fn is_high(&self) -> bool;
}

impl BankLine for IoPin {
    fn set_output(&mut self, output: bool) {
        self.set_mode(if output { Mode::Output } else { Mode::Input });
    }

    fn set_level(&mut self, high: bool) {
        self.write(if high { Level::High } else { Level::Low });
    }

    fn is_high(&self) -> bool {
        IoPin::is_high(self)
    }
}

/// Eight optional lines plus shadows of the direction and output registers.
pub struct GpioBank<L> {
    lines: RefCell<[Option<L>; BANK_WIDTH]>,
    dir: Cell<u8>,
    out: Cell<u8>,
}

impl<L: BankLine> GpioBank<L> {
    /// All lines start as inputs with a low output latch.
    pub fn new(lines: [Option<L>; BANK_WIDTH]) -> Self {
        let bank = GpioBank {
            lines: RefCell::new(lines),
            dir: Cell::new(0),
            out: Cell::new(0),
        };
        for line in bank.lines.borrow_mut().iter_mut().flatten() {
            line.set_level(false);
            line.set_output(false);
        }
        bank
    }

    /// Mask of bits with a line attached.
    pub fn wired(&self) -> u8 {
        self.lines
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, line)| line.is_some())
            .fold(0u8, |mask, (bit, _)| mask | (1 << bit))
    }

    fn write_dir(&self, value: u8) {
        let changed = self.dir.get() ^ value;
        self.dir.set(value);
        let mut lines = self.lines.borrow_mut();
        for (bit, line) in lines.iter_mut().enumerate() {
            let mask = 1u8 << bit;
            if changed & mask == 0 {
                continue;
            }
            if let Some(line) = line {
                line.set_output(value & mask != 0);
            }
        }
    }

    fn write_out(&self, value: u8) {
        let changed = self.out.get() ^ value;
        self.out.set(value);
        let mut lines = self.lines.borrow_mut();
        for (bit, line) in lines.iter_mut().enumerate() {
            let mask = 1u8 << bit;
            if changed & mask == 0 {
                continue;
            }
            if let Some(line) = line {
                line.set_level(value & mask != 0);
            }
        }
    }

    fn read_input(&self) -> u8 {
        self.lines
            .borrow()
            .iter()
            .enumerate()
            .filter_map(|(bit, line)| line.as_ref().map(|l| (bit, l)))
            .filter(|(_, line)| line.is_high())
            .fold(0u8, |value, (bit, _)| value | (1 << bit))
    }
}

/// One register of a [`GpioBank`].
pub struct BankRegister<L> {
    bank: Rc<GpioBank<L>>,
    kind: RegisterKind,
}

impl<L> fmt::Debug for BankRegister<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankRegister")
            .field("kind", &self.kind)
            .field("dir", &self.bank.dir.get())
            .field("out", &self.bank.out.get())
            .finish()
    }
}

impl<L: BankLine> BitRegister for BankRegister<L> {
    fn read(&self) -> u8 {
        match self.kind {
            RegisterKind::Direction => self.bank.dir.get(),
            RegisterKind::Output => self.bank.out.get(),
            RegisterKind::Input => self.bank.read_input(),
        }
    }

    fn write(&self, value: u8) {
        match self.kind {
            RegisterKind::Direction => self.bank.write_dir(value),
            RegisterKind::Output => self.bank.write_out(value),
            RegisterKind::Input => trace!("Ignoring write of 0x{:02x} to input register", value),
        }
    }
}

/// A register map made of GPIO banks, keyed by port number.
pub struct BankPorts<L> {
    banks: BTreeMap<u8, Rc<GpioBank<L>>>,
}

impl<L: BankLine> BankPorts<L> {
    pub fn new() -> Self {
        BankPorts {
            banks: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, port: u8, bank: GpioBank<L>) {
        self.banks.insert(port, Rc::new(bank));
    }
}

impl<L: BankLine> Default for BankPorts<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: BankLine> RegisterMap for BankPorts<L> {
    type Register = BankRegister<L>;

    fn port(&self, port: u8) -> Option<PortRegisters<BankRegister<L>>> {
        let bank = self.banks.get(&port)?;
        let register = |kind| BankRegister {
            bank: Rc::clone(bank),
            kind,
        };
        Some(PortRegisters::new(
            register(RegisterKind::Direction),
            register(RegisterKind::Output),
            register(RegisterKind::Input),
        ))
    }

    fn lines(&self, port: u8) -> u8 {
        self.banks.get(&port).map_or(0, |bank| bank.wired())
    }
}

pub type RppalPorts = BankPorts<IoPin>;

impl BankPorts<IoPin> {
    /// Acquire the BCM lines listed for each port. Entry `n` of a port's
    /// list backs register bit `n`; `None` leaves the bit unconnected.
    pub fn open<I>(ports: I) -> Result<Self, GpioError>
    where
        I: IntoIterator<Item = (u8, Vec<Option<u8>>)>,
    {
        let gpio = Gpio::new()?;
        let mut map = BankPorts::new();

        for (port, bcm_lines) in ports {
            if bcm_lines.len() > BANK_WIDTH {
                return Err(GpioError::TooManyLines {
                    port,
                    count: bcm_lines.len(),
                });
            }

            let mut lines: [Option<IoPin>; BANK_WIDTH] = Default::default();
            for (bit, bcm) in bcm_lines.into_iter().enumerate() {
                if let Some(bcm) = bcm {
                    debug!("Port {} bit {} -> BCM GPIO {}", port, bit, bcm);
                    lines[bit] = Some(gpio.get(bcm)?.into_io(Mode::Input));
                }
            }
            map.insert(port, GpioBank::new(lines));
        }

        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Pins, SnesController};
    use crate::error::{ConfigurationError, Line};
    use crate::timing::CycleDelay;

    #[derive(Default)]
    struct FakeLine {
        output: bool,
        level: Rc<Cell<bool>>,
    }

    impl BankLine for FakeLine {
        fn set_output(&mut self, output: bool) {
            self.output = output;
        }

        fn set_level(&mut self, high: bool) {
            self.level.set(high);
        }

        fn is_high(&self) -> bool {
            self.level.get()
        }
    }

    fn bank_with_lines(bits: &[usize]) -> (GpioBank<FakeLine>, Vec<Rc<Cell<bool>>>) {
        let mut lines: [Option<FakeLine>; BANK_WIDTH] = Default::default();
        let mut levels = Vec::new();
        for &bit in bits {
            let line = FakeLine::default();
            levels.push(Rc::clone(&line.level));
            lines[bit] = Some(line);
        }
        (GpioBank::new(lines), levels)
    }

    #[test]
    fn test_output_register_drives_lines() {
        let (bank, levels) = bank_with_lines(&[0, 7]);
        let mut ports = BankPorts::new();
        ports.insert(1, bank);
        let regs = ports.port(1).unwrap();

        regs.out.set_bits(0x80);
        assert!(!levels[0].get());
        assert!(levels[1].get());
        assert_eq!(regs.out.read(), 0x80);
        assert_eq!(regs.input.read(), 0x80);

        regs.out.clear_bits(0x80);
        assert!(!levels[1].get());
    }

    #[test]
    fn test_input_register_samples_lines() {
        let (bank, levels) = bank_with_lines(&[1, 2]);
        let mut ports = BankPorts::new();
        ports.insert(2, bank);
        let regs = ports.port(2).unwrap();

        levels[0].set(true);
        assert_eq!(regs.input.read(), 0b0000_0010);
        assert!(regs.input.test_bits(0b0000_0010));
        assert!(!regs.input.test_bits(0b0000_0100));

        // input register is read-only
        regs.input.write(0xff);
        assert_eq!(regs.input.read(), 0b0000_0010);
    }

    #[test]
    fn test_direction_register_switches_modes() {
        let (bank, _) = bank_with_lines(&[3]);
        regs_dir_roundtrip(bank);
    }

    fn regs_dir_roundtrip(bank: GpioBank<FakeLine>) {
        let bank = Rc::new(bank);
        let dir = BankRegister {
            bank: Rc::clone(&bank),
            kind: RegisterKind::Direction,
        };
        dir.set_bits(0b0000_1000);
        assert!(bank.lines.borrow()[3].as_ref().unwrap().output);
        assert_eq!(dir.read(), 0b0000_1000);
        dir.clear_bits(0b0000_1000);
        assert!(!bank.lines.borrow()[3].as_ref().unwrap().output);
    }

    #[test]
    fn test_wired_mask() {
        let (bank, _) = bank_with_lines(&[0, 3, 7]);
        let mut ports = BankPorts::new();
        ports.insert(1, bank);
        assert_eq!(ports.lines(1), 0b1000_1001);
        assert_eq!(ports.lines(2), 0);
    }

    #[test]
    fn test_setup_rejects_unwired_data_line() {
        let (bank, _) = bank_with_lines(&[2, 3]);
        let mut ports = BankPorts::new();
        ports.insert(1, bank);

        let mut delay = CycleDelay::with_default_clock(|_: u32| {});
        let result = SnesController::setup(&ports, 1, Pins::new(1, 2, 3), &mut delay);
        assert_eq!(
            result.err(),
            Some(ConfigurationError::PinNotConnected {
                port: 1,
                line: Line::Data,
                pin: 1
            })
        );

        // nothing was configured
        let regs = ports.port(1).unwrap();
        assert_eq!(regs.dir.read(), 0);
        assert_eq!(regs.out.read(), 0);
    }

    #[test]
    fn test_setup_on_fully_wired_bank() {
        let (bank, levels) = bank_with_lines(&[1, 2, 3]);
        let mut ports = BankPorts::new();
        ports.insert(1, bank);

        let mut delay = CycleDelay::with_default_clock(|_: u32| {});
        let ctrl = SnesController::setup(&ports, 1, Pins::new(1, 2, 3), &mut delay).unwrap();
        // clock idles high, latch low
        assert!(levels[1].get());
        assert!(!levels[2].get());

        // data line held high: nothing pressed
        levels[0].set(true);
        assert_eq!(ctrl.read(&mut delay), crate::ButtonState::default());
    }

    #[test]
    fn test_missing_port() {
        let ports: BankPorts<FakeLine> = BankPorts::new();
        assert!(ports.port(1).is_none());
    }
}
