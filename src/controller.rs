//! SNES controller handle and protocol engine
//!
//! A read pulses the latch line for 12 µs, then samples the data line twelve
//! times. Each sample waits half a clock period, reads the data bit (low =
//! pressed) and sends a 6 µs low pulse on the clock line to shift the next
//! button out. The whole read is a fixed ~156 µs busy wait.

use crate::buttons::{Button, ButtonState};
use crate::error::{ConfigurationError, Line};
use crate::platform::{RegisterMap, SUPPORTED_PORTS};
use crate::register::{BitRegister, PortRegisters};
use crate::timing::{HALF_CLOCK_US, LATCH_PULSE_US, SETTLE_US};
use embedded_hal::delay::DelayNs;
use log::{debug, log_enabled, trace, warn, Level};

/// Highest pin index within a port register.
pub const MAX_PIN: u8 = 7;

/// Single-bit mask for a pin index in 0..=7.
pub const fn pin_mask(pin: u8) -> u8 {
    1 << pin
}

/// Bit positions of the data, clock and latch lines within one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pins {
    pub data: u8,
    pub clock: u8,
    pub latch: u8,
}

impl Pins {
    pub const fn new(data: u8, clock: u8, latch: u8) -> Self {
        Pins { data, clock, latch }
    }

    pub fn lines(&self) -> [(Line, u8); 3] {
        [
            (Line::Data, self.data),
            (Line::Clock, self.clock),
            (Line::Latch, self.latch),
        ]
    }

    /// Every pin must fit in a byte register and no two lines may share one.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let lines = self.lines();
        for (line, pin) in lines {
            if pin > MAX_PIN {
                return Err(ConfigurationError::PinOutOfRange { line, pin });
            }
        }
        for (i, (first, pin)) in lines.iter().enumerate() {
            if let Some((second, _)) = lines[i + 1..].iter().find(|(_, other)| other == pin) {
                return Err(ConfigurationError::PinConflict {
                    first: *first,
                    second: *second,
                    pin: *pin,
                });
            }
        }
        Ok(())
    }

    /// Union of the three pin masks. Only meaningful for validated pins.
    pub fn mask(&self) -> u8 {
        pin_mask(self.data) | pin_mask(self.clock) | pin_mask(self.latch)
    }
}

/// A controller bound to three lines of one port.
///
/// Holds no state beyond the resolved registers and masks; reads on
/// handles with independent registers may run in any order.
#[derive(Debug)]
pub struct SnesController<R> {
    regs: PortRegisters<R>,
    port: u8,
    data_mask: u8,
    clock_mask: u8,
    latch_mask: u8,
}

impl<R: BitRegister> SnesController<R> {
    /// Resolve `port` through `map`, configure the lines and wait for them
    /// to settle.
    ///
    /// The clock line idles high and the latch line idles low. The data line
    /// is made an input, clock and latch outputs. Configuration problems are
    /// reported before any register is written.
    pub fn setup<M, D>(
        map: &M,
        port: u8,
        pins: Pins,
        delay: &mut D,
    ) -> Result<Self, ConfigurationError>
    where
        M: RegisterMap<Register = R> + ?Sized,
        D: DelayNs + ?Sized,
    {
        let regs = resolve(map, port, pins).map_err(|err| {
            warn!("Rejected controller configuration: {}", err);
            err
        })?;

        let ctrl = SnesController {
            regs,
            port,
            data_mask: pin_mask(pins.data),
            clock_mask: pin_mask(pins.clock),
            latch_mask: pin_mask(pins.latch),
        };

        // Clock idles high, latch idles low.
        ctrl.regs.out.set_bits(ctrl.clock_mask);
        ctrl.regs.out.clear_bits(ctrl.latch_mask);

        ctrl.regs.dir.clear_bits(ctrl.data_mask);
        ctrl.regs.dir.set_bits(ctrl.latch_mask | ctrl.clock_mask);

        delay.delay_us(SETTLE_US);

        debug!(
            "Controller on port {}: data=0x{:02x} clock=0x{:02x} latch=0x{:02x}",
            port, ctrl.data_mask, ctrl.clock_mask, ctrl.latch_mask
        );
        Ok(ctrl)
    }

    /// Read all twelve buttons.
    ///
    /// There is no presence check: with nothing attached the result only
    /// reflects how the data line floats.
    pub fn read<D: DelayNs + ?Sized>(&self, delay: &mut D) -> ButtonState {
        self.latch_pulse(delay);

        let mut state = ButtonState::default();
        for button in Button::SHIFT_ORDER {
            state.set(button, self.read_bit(delay));
        }

        if log_enabled!(Level::Trace) {
            trace!("Port {} buttons: {}", self.port, state);
        }
        state
    }

    /// Capture the pad's buttons into its shift register.
    fn latch_pulse<D: DelayNs + ?Sized>(&self, delay: &mut D) {
        self.regs.out.set_bits(self.latch_mask);
        delay.delay_us(LATCH_PULSE_US);
        self.regs.out.clear_bits(self.latch_mask);
    }

    /// Sample the current bit, then clock the next one out.
    fn read_bit<D: DelayNs + ?Sized>(&self, delay: &mut D) -> bool {
        delay.delay_us(HALF_CLOCK_US);

        // Low means pressed.
        let pressed = !self.regs.input.test_bits(self.data_mask);

        self.regs.out.clear_bits(self.clock_mask);
        delay.delay_us(HALF_CLOCK_US);
        self.regs.out.set_bits(self.clock_mask);

        pressed
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn data_mask(&self) -> u8 {
        self.data_mask
    }

    pub fn clock_mask(&self) -> u8 {
        self.clock_mask
    }

    pub fn latch_mask(&self) -> u8 {
        self.latch_mask
    }

    pub fn registers(&self) -> &PortRegisters<R> {
        &self.regs
    }
}

fn resolve<M>(
    map: &M,
    port: u8,
    pins: Pins,
) -> Result<PortRegisters<M::Register>, ConfigurationError>
where
    M: RegisterMap + ?Sized,
{
    if !SUPPORTED_PORTS.contains(&port) {
        return Err(ConfigurationError::InvalidPort { port });
    }
    pins.validate()?;
    let regs = map
        .port(port)
        .ok_or(ConfigurationError::InvalidPort { port })?;

    // An unwired data bit would read low forever, i.e. every button pressed.
    let wired = map.lines(port);
    if let Some((line, pin)) = pins
        .lines()
        .into_iter()
        .find(|(_, pin)| wired & pin_mask(*pin) == 0)
    {
        return Err(ConfigurationError::PinNotConnected { port, line, pin });
    }
    Ok(regs)
}

fn port_slot(port: u8) -> Option<usize> {
    SUPPORTED_PORTS.iter().position(|p| *p == port)
}

/// Owns a register map and hands out controllers whose pins never overlap.
///
/// Two controllers may share a port as long as their pins are disjoint,
/// since setup and reads modify the shared registers bit by bit.
pub struct ControllerPorts<M> {
    map: M,
    claimed: [u8; SUPPORTED_PORTS.len()],
}

impl<M: RegisterMap> ControllerPorts<M> {
    pub fn new(map: M) -> Self {
        ControllerPorts {
            map,
            claimed: [0; SUPPORTED_PORTS.len()],
        }
    }

    /// Like [`SnesController::setup`], but also rejects pins already used
    /// by a controller created here.
    pub fn setup<D: DelayNs + ?Sized>(
        &mut self,
        port: u8,
        pins: Pins,
        delay: &mut D,
    ) -> Result<SnesController<M::Register>, ConfigurationError> {
        if SUPPORTED_PORTS.contains(&port) && pins.validate().is_ok() {
            let claimed = self.claimed(port);
            if let Some((_, pin)) = pins
                .lines()
                .into_iter()
                .find(|(_, pin)| claimed & pin_mask(*pin) != 0)
            {
                let err = ConfigurationError::PinInUse { port, pin };
                warn!("Rejected controller configuration: {}", err);
                return Err(err);
            }
        }

        let ctrl = SnesController::setup(&self.map, port, pins, delay)?;
        if let Some(slot) = port_slot(port) {
            self.claimed[slot] |= pins.mask();
        }
        Ok(ctrl)
    }

    /// Mask of pins already in use on `port`.
    pub fn claimed(&self, port: u8) -> u8 {
        port_slot(port).map_or(0, |slot| self.claimed[slot])
    }

    pub fn map(&self) -> &M {
        &self.map
    }
}
