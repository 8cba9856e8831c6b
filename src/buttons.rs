use serde::{Deserialize, Serialize};
use core::fmt;

/// Number of bits shifted out per read.
pub const BUTTON_COUNT: usize = 12;

/// A physical button on the pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    B,
    Y,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
    A,
    X,
    L,
    R,
}

impl Button {
    /// Order in which the controller's shift register presents the buttons.
    pub const SHIFT_ORDER: [Button; BUTTON_COUNT] = [
        Button::B,
        Button::Y,
        Button::Select,
        Button::Start,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::A,
        Button::X,
        Button::L,
        Button::R,
    ];

    /// Position of this button in the serial stream.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Button::B => "B",
            Button::Y => "Y",
            Button::Select => "Select",
            Button::Start => "Start",
            Button::Up => "Up",
            Button::Down => "Down",
            Button::Left => "Left",
            Button::Right => "Right",
            Button::A => "A",
            Button::X => "X",
            Button::L => "L",
            Button::R => "R",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Button status returned by a read. `true` means pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ButtonState {
    pub b: bool,
    pub y: bool,
    pub select: bool,
    pub start: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub a: bool,
    pub x: bool,
    pub l: bool,
    pub r: bool,
}

impl ButtonState {
    pub fn get(&self, button: Button) -> bool {
        match button {
            Button::B => self.b,
            Button::Y => self.y,
            Button::Select => self.select,
            Button::Start => self.start,
            Button::Up => self.up,
            Button::Down => self.down,
            Button::Left => self.left,
            Button::Right => self.right,
            Button::A => self.a,
            Button::X => self.x,
            Button::L => self.l,
            Button::R => self.r,
        }
    }

    pub fn set(&mut self, button: Button, pressed: bool) {
        let field = match button {
            Button::B => &mut self.b,
            Button::Y => &mut self.y,
            Button::Select => &mut self.select,
            Button::Start => &mut self.start,
            Button::Up => &mut self.up,
            Button::Down => &mut self.down,
            Button::Left => &mut self.left,
            Button::Right => &mut self.right,
            Button::A => &mut self.a,
            Button::X => &mut self.x,
            Button::L => &mut self.l,
            Button::R => &mut self.r,
        };
        *field = pressed;
    }

    /// Pressed buttons, in shift order.
    pub fn pressed(&self) -> impl Iterator<Item = Button> + '_ {
        Button::SHIFT_ORDER
            .iter()
            .copied()
            .filter(move |b| self.get(*b))
    }

    /// Buttons whose state differs from `previous`, with their new state.
    pub fn changes_from<'a>(
        &'a self,
        previous: &'a ButtonState,
    ) -> impl Iterator<Item = (Button, bool)> + 'a {
        Button::SHIFT_ORDER
            .iter()
            .copied()
            .filter(move |b| self.get(*b) != previous.get(*b))
            .map(move |b| (b, self.get(b)))
    }

    pub fn any_pressed(&self) -> bool {
        self.pressed().next().is_some()
    }

    /// Pack into a 12-bit word: bit n is the n-th button shifted out, 1 = pressed.
    pub fn to_bits(&self) -> u16 {
        Button::SHIFT_ORDER
            .iter()
            .filter(|b| self.get(**b))
            .fold(0u16, |bits, b| bits | (1 << b.index()))
    }

    /// Inverse of [`ButtonState::to_bits`]. Bits above 11 are ignored.
    pub fn from_bits(bits: u16) -> Self {
        let mut state = ButtonState::default();
        for button in Button::SHIFT_ORDER {
            state.set(button, bits & (1 << button.index()) != 0);
        }
        state
    }
}

impl fmt::Display for ButtonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pressed = self.pressed();
        match pressed.next() {
            None => f.write_str("none"),
            Some(first) => {
                write!(f, "{}", first)?;
                for button in pressed {
                    write!(f, "+{}", button)?;
                }
                Ok(())
            }
        }
    }
}
