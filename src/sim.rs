//! Simulated ports and controller pad
//!
//! `SimBus` is a register map with ports 1 and 2 backed by plain memory. A
//! `SimPad` can be wired to three bits of a port; it behaves like the pad's
//! shift register: buttons are captured on the latch rising edge, the next
//! bit is presented on each clock rising edge, and a pressed button pulls the
//! data line low. Every edge on a wired clock/latch line, every input
//! register read and every delay is recorded in a trace.

use crate::buttons::ButtonState;
use crate::controller::Pins;
use crate::error::{ConfigurationError, Line};
use crate::platform::RegisterMap;
use crate::register::{BitRegister, PortRegisters, RegisterKind};
use embedded_hal::delay::DelayNs;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Bits the pad shifts out before the data line drops low.
pub const SHIFT_LENGTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// Level change of a wired clock or latch line.
    Edge { port: u8, line: Line, high: bool },
    /// Read of a port's input register.
    Sample { port: u8, value: u8 },
    /// Busy wait requested through [`SimDelay`].
    Wait { ns: u64 },
}

/// Controller-side shift register.
#[derive(Debug, Clone)]
pub struct SimPad {
    // bit n = level of the n-th shifted bit, 1 = high
    live: u16,
    captured: u16,
    position: usize,
}

impl SimPad {
    /// A pad with nothing pressed.
    pub fn new() -> Self {
        SimPad {
            live: u16::MAX,
            captured: u16::MAX,
            position: SHIFT_LENGTH,
        }
    }

    pub fn with_buttons(state: ButtonState) -> Self {
        let mut pad = SimPad::new();
        pad.set_buttons(state);
        pad
    }

    /// A pad presenting `levels` (true = high) at successive sample points.
    /// Missing entries read high.
    pub fn from_wire_levels(levels: &[bool]) -> Self {
        let mut pad = SimPad::new();
        pad.live = levels
            .iter()
            .take(SHIFT_LENGTH)
            .enumerate()
            .fold(u16::MAX, |wire, (bit, high)| {
                if *high {
                    wire
                } else {
                    wire & !(1 << bit)
                }
            });
        pad
    }

    /// Change the held buttons. Takes effect at the next latch pulse.
    pub fn set_buttons(&mut self, state: ButtonState) {
        // bits 12..15 always shift out high
        self.live = !state.to_bits();
    }

    fn latch(&mut self) {
        self.captured = self.live;
        self.position = 0;
    }

    fn shift(&mut self) {
        if self.position < SHIFT_LENGTH {
            self.position += 1;
        }
    }

    fn data_high(&self) -> bool {
        self.position < SHIFT_LENGTH && self.captured & (1 << self.position) != 0
    }
}

impl Default for SimPad {
    fn default() -> Self {
        Self::new()
    }
}

struct WiredPad {
    pins: Pins,
    pad: SimPad,
}

struct SimPort {
    number: u8,
    dir: Cell<u8>,
    out: Cell<u8>,
    pull_ups: Cell<u8>,
    pad: RefCell<Option<WiredPad>>,
}

impl SimPort {
    fn new(number: u8) -> Self {
        SimPort {
            number,
            dir: Cell::new(0),
            out: Cell::new(0),
            pull_ups: Cell::new(0),
            pad: RefCell::new(None),
        }
    }

    /// Level seen on each bit, ignoring any pad output.
    fn driven_levels(&self) -> u8 {
        let dir = self.dir.get();
        (self.out.get() & dir) | (self.pull_ups.get() & !dir)
    }
}

struct SimState {
    ports: [SimPort; 2],
    trace: RefCell<Vec<TraceEvent>>,
    tracing: Cell<bool>,
}

impl SimState {
    fn port(&self, port: u8) -> Option<&SimPort> {
        self.ports.iter().find(|p| p.number == port)
    }

    fn record(&self, event: TraceEvent) {
        if self.tracing.get() {
            self.trace.borrow_mut().push(event);
        }
    }

    /// Apply a register write and feed the resulting edges to a wired pad.
    fn write(&self, port: &SimPort, kind: RegisterKind, value: u8) {
        let before = port.driven_levels();
        match kind {
            RegisterKind::Direction => port.dir.set(value),
            RegisterKind::Output => port.out.set(value),
            RegisterKind::Input => return,
        }
        let after = port.driven_levels();

        let mut slot = port.pad.borrow_mut();
        let Some(wired) = slot.as_mut() else {
            return;
        };
        let latch = 1u8 << wired.pins.latch;
        let clock = 1u8 << wired.pins.clock;

        if (before ^ after) & latch != 0 {
            let high = after & latch != 0;
            self.record(TraceEvent::Edge {
                port: port.number,
                line: Line::Latch,
                high,
            });
            if high {
                wired.pad.latch();
            }
        }
        if (before ^ after) & clock != 0 {
            let high = after & clock != 0;
            self.record(TraceEvent::Edge {
                port: port.number,
                line: Line::Clock,
                high,
            });
            if high && after & latch == 0 {
                wired.pad.shift();
            }
        }
    }

    fn read_input(&self, port: &SimPort) -> u8 {
        let mut value = port.driven_levels();
        if let Some(wired) = port.pad.borrow().as_ref() {
            let data = 1u8 << wired.pins.data;
            if port.dir.get() & data == 0 {
                if wired.pad.data_high() {
                    value |= data;
                } else {
                    value &= !data;
                }
            }
        }
        self.record(TraceEvent::Sample {
            port: port.number,
            value,
        });
        value
    }
}

/// Simulated register map with ports 1 and 2. Clones share state.
#[derive(Clone)]
pub struct SimBus {
    state: Rc<SimState>,
}

impl SimBus {
    pub fn new() -> Self {
        SimBus {
            state: Rc::new(SimState {
                ports: [SimPort::new(1), SimPort::new(2)],
                trace: RefCell::new(Vec::new()),
                tracing: Cell::new(true),
            }),
        }
    }

    fn sim_port(&self, port: u8) -> Result<&SimPort, ConfigurationError> {
        self.state
            .port(port)
            .ok_or(ConfigurationError::InvalidPort { port })
    }

    /// Wire `pad` to `pins` of `port`, replacing any pad already there.
    pub fn attach(&self, port: u8, pins: Pins, pad: SimPad) -> Result<(), ConfigurationError> {
        pins.validate()?;
        *self.sim_port(port)?.pad.borrow_mut() = Some(WiredPad { pins, pad });
        Ok(())
    }

    /// Change the buttons held on the pad wired to `port`.
    pub fn set_buttons(&self, port: u8, state: ButtonState) {
        if let Some(p) = self.state.port(port) {
            if let Some(wired) = p.pad.borrow_mut().as_mut() {
                wired.pad.set_buttons(state);
            }
        }
    }

    /// Levels read on undriven input bits. Defaults to all low.
    pub fn set_pull_ups(&self, port: u8, mask: u8) {
        if let Some(p) = self.state.port(port) {
            p.pull_ups.set(mask);
        }
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay {
            state: Rc::clone(&self.state),
        }
    }

    pub fn trace(&self) -> Vec<TraceEvent> {
        self.state.trace.borrow().clone()
    }

    pub fn clear_trace(&self) {
        self.state.trace.borrow_mut().clear();
    }

    /// Turn trace recording on or off. Long-running users should turn it
    /// off, the trace is unbounded.
    pub fn set_tracing(&self, enabled: bool) {
        self.state.tracing.set(enabled);
    }

    /// Sum of all recorded waits.
    pub fn waited_ns(&self) -> u64 {
        self.state
            .trace
            .borrow()
            .iter()
            .map(|event| match event {
                TraceEvent::Wait { ns } => *ns,
                _ => 0,
            })
            .sum()
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterMap for SimBus {
    type Register = SimRegister;

    fn port(&self, port: u8) -> Option<PortRegisters<SimRegister>> {
        self.state.port(port)?;
        let register = |kind| SimRegister {
            state: Rc::clone(&self.state),
            port,
            kind,
        };
        Some(PortRegisters::new(
            register(RegisterKind::Direction),
            register(RegisterKind::Output),
            register(RegisterKind::Input),
        ))
    }
}

pub struct SimRegister {
    state: Rc<SimState>,
    port: u8,
    kind: RegisterKind,
}

impl fmt::Debug for SimRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimRegister")
            .field("port", &self.port)
            .field("kind", &self.kind)
            .finish()
    }
}

impl BitRegister for SimRegister {
    fn read(&self) -> u8 {
        let Some(port) = self.state.port(self.port) else {
            return 0;
        };
        match self.kind {
            RegisterKind::Direction => port.dir.get(),
            RegisterKind::Output => port.out.get(),
            RegisterKind::Input => self.state.read_input(port),
        }
    }

    fn write(&self, value: u8) {
        if let Some(port) = self.state.port(self.port) {
            self.state.write(port, self.kind, value);
        }
    }
}

/// Delay provider that records waits instead of spending time.
pub struct SimDelay {
    state: Rc<SimState>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.state.record(TraceEvent::Wait { ns: ns as u64 });
    }

    fn delay_us(&mut self, us: u32) {
        self.state.record(TraceEvent::Wait {
            ns: us as u64 * 1_000,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buttons::Button;

    #[test]
    fn test_pad_shifts_captured_buttons() {
        let mut pad = SimPad::with_buttons(ButtonState {
            y: true,
            ..Default::default()
        });
        pad.latch();
        assert!(pad.data_high()); // B released
        pad.shift();
        assert!(!pad.data_high()); // Y pressed
        for _ in 0..SHIFT_LENGTH {
            pad.shift();
        }
        assert!(!pad.data_high());
    }

    #[test]
    fn test_pad_changes_wait_for_latch() {
        let mut pad = SimPad::new();
        pad.latch();
        pad.set_buttons(ButtonState::from_bits(1 << Button::B.index()));
        assert!(pad.data_high());
        pad.latch();
        assert!(!pad.data_high());
    }

    #[test]
    fn test_wire_levels() {
        let mut pad = SimPad::from_wire_levels(&[false, true, false]);
        pad.latch();
        let levels: Vec<bool> = (0..4)
            .map(|_| {
                let level = pad.data_high();
                pad.shift();
                level
            })
            .collect();
        assert_eq!(levels, vec![false, true, false, true]);
    }

    #[test]
    fn test_registers_and_pull_ups() {
        let bus = SimBus::new();
        let regs = bus.port(2).unwrap();
        assert_eq!(regs.input.read(), 0x00);

        bus.set_pull_ups(2, 0xf0);
        regs.dir.set_bits(0x30);
        regs.out.write(0x1f);
        // bits 4,5 driven from the output latch, the rest pulled
        assert_eq!(regs.input.read(), 0b1101_0000);
        assert!(bus.port(3).is_none());
    }

    #[test]
    fn test_edges_recorded_for_wired_lines() {
        let bus = SimBus::new();
        let pins = Pins::new(0, 1, 2);
        bus.attach(1, pins, SimPad::new()).unwrap();
        let regs = bus.port(1).unwrap();
        regs.dir.set_bits(0b110);
        regs.out.set_bits(0b100);
        regs.out.clear_bits(0b100);
        regs.out.set_bits(0b1000); // unwired bit
        assert_eq!(
            bus.trace(),
            vec![
                TraceEvent::Edge { port: 1, line: Line::Latch, high: true },
                TraceEvent::Edge { port: 1, line: Line::Latch, high: false },
            ]
        );
    }

    #[test]
    fn test_attach_rejects_bad_port() {
        let bus = SimBus::new();
        assert_eq!(
            bus.attach(3, Pins::new(0, 1, 2), SimPad::new()),
            Err(ConfigurationError::InvalidPort { port: 3 })
        );
    }

    #[test]
    fn test_tracing_can_be_disabled() {
        let bus = SimBus::new();
        bus.set_tracing(false);
        bus.delay().delay_us(12);
        bus.port(1).unwrap().input.read();
        assert!(bus.trace().is_empty());

        bus.set_tracing(true);
        bus.delay().delay_us(12);
        assert_eq!(bus.trace(), vec![TraceEvent::Wait { ns: 12_000 }]);
    }

    #[test]
    fn test_register_debug() {
        let bus = SimBus::new();
        let regs = bus.port(2).unwrap();
        assert_eq!(
            format!("{:?}", regs.out),
            "SimRegister { port: 2, kind: Output }"
        );
    }

    #[test]
    fn test_delay_records_waits() {
        let bus = SimBus::new();
        let mut delay = bus.delay();
        delay.delay_us(6);
        delay.delay_ns(500);
        assert_eq!(bus.waited_ns(), 6_500);
        bus.clear_trace();
        assert!(bus.trace().is_empty());
    }
}
