//! Group discovery and resolution.
//!
//! A group is every wire reachable from a starting wire through transistors
//! that are currently on. Its level is decided by strict precedence:
//! ground, then VCC, then a pulled-high member, then a pulled-low member, and
//! finally the floating members. When both floating-high and floating-low wires
//! are present, the side whose wires touch more transistors wins, with ties
//! going high.

mod indexed;
mod set;

pub use self::{indexed::IndexedGroups, set::SetGroups};

use crate::{
    components::{Pulled, WireState},
    topology::Topology,
};
use serde::Deserialize;

pub trait GroupStrategy {
    /// Sizes any per-wire scratch space. Called once when a circuit is attached.
    fn prepare(&mut self, _wire_count: usize) {}

    /// Replaces the contents of `group` with the wires connected to `start` and
    /// returns the level the whole group settles to.
    fn resolve_group(&mut self, start: usize, topology: &Topology, group: &mut Vec<usize>)
        -> WireState;
}

impl<S: GroupStrategy + ?Sized> GroupStrategy for Box<S> {
    fn prepare(&mut self, wire_count: usize) {
        (**self).prepare(wire_count)
    }

    fn resolve_group(
        &mut self,
        start: usize,
        topology: &Topology,
        group: &mut Vec<usize>,
    ) -> WireState {
        (**self).resolve_group(start, topology, group)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Indexed,
    Set,
}

impl StrategyKind {
    pub fn build(self) -> Box<dyn GroupStrategy> {
        match self {
            StrategyKind::Indexed => Box::new(IndexedGroups::default()),
            StrategyKind::Set => Box::new(SetGroups::default()),
        }
    }
}

/// What a group has seen so far; independent of the order members are added.
#[derive(Default, Debug)]
pub struct GroupValue {
    grounded: bool,
    driven_high: bool,
    pulled_high: bool,
    pulled_low: bool,
    floating_high: bool,
    floating_low: bool,
    floating_high_fan_out: usize,
    floating_low_fan_out: usize,
}

impl GroupValue {
    pub fn add(&mut self, index: usize, topology: &Topology) {
        if index == topology.gnd() {
            self.grounded = true;
            return;
        }
        if index == topology.vcc() {
            self.driven_high = true;
            return;
        }

        let wire = &topology.wires[index];
        match wire.pulled {
            Pulled::High => self.pulled_high = true,
            Pulled::Low => self.pulled_low = true,
            Pulled::None => {}
        }
        match wire.state {
            WireState::FloatingHigh => {
                self.floating_high = true;
                self.floating_high_fan_out += wire.fan_out();
            }
            WireState::FloatingLow => {
                self.floating_low = true;
                self.floating_low_fan_out += wire.fan_out();
            }
            _ => {}
        }
    }

    /// `fallback` is used when no member carries any level information.
    pub fn resolve(&self, fallback: WireState) -> WireState {
        if self.grounded {
            WireState::Grounded
        } else if self.driven_high {
            WireState::DrivenHigh
        } else if self.pulled_high {
            WireState::PulledHigh
        } else if self.pulled_low {
            WireState::PulledLow
        } else if self.floating_high && self.floating_low {
            if self.floating_high_fan_out < self.floating_low_fan_out {
                WireState::FloatingLow
            } else {
                WireState::FloatingHigh
            }
        } else if self.floating_low {
            WireState::FloatingLow
        } else if self.floating_high {
            WireState::FloatingHigh
        } else {
            fallback
        }
    }
}
