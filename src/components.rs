/// External bias on a wire: a pad forced by a driver, a pull-up/pull-down resistor, or nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pulled {
    None,
    High,
    Low,
}

impl Pulled {
    /// Byte used for this bias in the circuit file.
    pub fn to_byte(self) -> u8 {
        match self {
            Pulled::None => 0,
            Pulled::High => 1,
            Pulled::Low => 2,
        }
    }

    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(Pulled::None),
            1 => Some(Pulled::High),
            2 => Some(Pulled::Low),
            _ => None,
        }
    }
}

/// Resolved logic level of a wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireState {
    Grounded,
    DrivenHigh,
    PulledHigh,
    PulledLow,
    FloatingHigh,
    FloatingLow,
}

impl WireState {
    pub fn is_high(self) -> bool {
        match self {
            WireState::DrivenHigh | WireState::PulledHigh | WireState::FloatingHigh => true,
            _ => false,
        }
    }

    pub fn is_low(self) -> bool {
        !self.is_high()
    }

    /// The state a wire takes right after it is pulled (or left unpulled) with no propagation.
    pub fn from_pulled(pulled: Pulled) -> Self {
        match pulled {
            Pulled::High => WireState::PulledHigh,
            Pulled::Low => WireState::PulledLow,
            Pulled::None => WireState::FloatingLow,
        }
    }

    /// Level left behind when a wire loses its connection but keeps its charge.
    pub fn floated(self) -> Self {
        match self {
            WireState::Grounded | WireState::PulledLow => WireState::FloatingLow,
            WireState::DrivenHigh | WireState::PulledHigh => WireState::FloatingHigh,
            floating => floating,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateState {
    Off,
    On,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Wire {
    pub index: usize,
    pub name: Option<String>,
    /// Transistors for which this wire is one of the switched terminals.
    pub controlling: Vec<usize>,
    /// Transistors whose gate this wire drives.
    pub gated: Vec<usize>,
    pub pulled: Pulled,
    pub state: WireState,
}

impl Wire {
    pub fn new(
        index: usize,
        name: Option<String>,
        controlling: Vec<usize>,
        gated: Vec<usize>,
        pulled: Pulled,
    ) -> Self {
        Wire {
            index,
            name,
            controlling,
            gated,
            pulled,
            state: WireState::from_pulled(pulled),
        }
    }

    /// An empty slot in the wire table: unnamed and touching no transistor.
    pub fn is_absent(&self) -> bool {
        self.name.is_none() && self.controlling.is_empty() && self.gated.is_empty()
    }

    /// Number of connected transistors, used as a stand-in for the wire's capacitance.
    pub fn fan_out(&self) -> usize {
        self.controlling.len() + self.gated.len()
    }

    /// Pins the wire high or low, the way an external driver forces a pad.
    pub fn force(&mut self, high: bool) {
        if high {
            self.pulled = Pulled::High;
            self.state = WireState::PulledHigh;
        } else {
            self.pulled = Pulled::Low;
            self.state = WireState::PulledLow;
        }
    }

    /// A wire that keeps its pull resistor takes the pulled level; anything else floats.
    pub fn float(&mut self) {
        self.state = match self.pulled {
            Pulled::High => WireState::PulledHigh,
            Pulled::Low => WireState::PulledLow,
            Pulled::None => self.state.floated(),
        };
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transistor {
    pub index: usize,
    pub terminal_a: usize,
    pub terminal_b: usize,
    pub gate: usize,
    pub gate_state: GateState,
}

impl Transistor {
    pub fn new(index: usize, terminal_a: usize, terminal_b: usize, gate: usize) -> Self {
        Transistor {
            index,
            terminal_a,
            terminal_b,
            gate,
            gate_state: GateState::Off,
        }
    }

    pub fn is_on(&self) -> bool {
        self.gate_state == GateState::On
    }

    /// The terminal across the switch from `wire`, if `wire` is one of its terminals.
    pub fn other_side(&self, wire: usize) -> Option<usize> {
        if self.terminal_a == wire {
            Some(self.terminal_b)
        } else if self.terminal_b == wire {
            Some(self.terminal_a)
        } else {
            None
        }
    }
}
