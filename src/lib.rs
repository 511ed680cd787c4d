//! Transistor-level NMOS logic simulation.
//!
//! A circuit is a table of wires and transistors. External code forces pads
//! high or low, then asks the simulator to recalculate those wires; the
//! simulator regroups every wire connected through conducting transistors,
//! resolves each group's level and keeps switching transistors until nothing
//! changes.

mod components;
mod config;
mod consts;
mod error;
mod pads;
mod recalc_swap_list;
mod strategy;
mod topology;
mod wire_set;

#[cfg(test)]
mod tests;

pub use crate::{
    components::{GateState, Pulled, Transistor, Wire, WireState},
    config::SimConfig,
    consts::{DEFAULT_SANITY_CHECK_WINDOW, DEFAULT_STEP_LIMIT, NEXT_CTRL, NO_WIRE},
    error::{ConvergenceError, Error, FormatError, Result, UnknownWireError},
    pads::{WireId, MAX_BUS_WIDTH},
    strategy::{GroupStrategy, GroupValue, IndexedGroups, SetGroups, StrategyKind},
    topology::{Topology, TopologyBuilder},
};

use crate::recalc_swap_list::RecalcSwapList;
use std::io::Read;
use tracing::{error, trace, warn};

/// Running totals across every `recalculate` call since the last `clear_stats`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimStats {
    pub recalc_calls: u64,
    pub wires_recalculated: u64,
    pub group_additions: u64,
}

/// Outcome of a single `recalculate` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Settle {
    pub generations: usize,
    pub state_changes: usize,
    pub gate_toggles: usize,
    /// False only for a tolerated non-convergent first settle.
    pub converged: bool,
}

pub struct CircuitSimulator<S = IndexedGroups> {
    topology: Topology,
    strategy: S,
    config: SimConfig,
    recalc_list: RecalcSwapList,
    group: Vec<usize>,
    recalc_count: usize,
    stats: SimStats,
}

impl CircuitSimulator<Box<dyn GroupStrategy>> {
    /// Builds a simulator whose group strategy is picked by `config.strategy`.
    pub fn from_config(topology: Topology, config: SimConfig) -> Self {
        let strategy = config.strategy.build();
        CircuitSimulator::with_config(topology, strategy, config)
    }

    pub fn load<R: Read>(reader: &mut R, config: SimConfig) -> Result<Self> {
        let topology = Topology::load(reader)?;
        Ok(CircuitSimulator::from_config(topology, config))
    }
}

impl<S: GroupStrategy> CircuitSimulator<S> {
    pub fn new(topology: Topology, strategy: S) -> Self {
        CircuitSimulator::with_config(topology, strategy, SimConfig::default())
    }

    pub fn with_config(topology: Topology, mut strategy: S, config: SimConfig) -> Self {
        let wire_count = topology.wire_count();
        strategy.prepare(wire_count);
        CircuitSimulator {
            topology,
            strategy,
            config,
            recalc_list: RecalcSwapList::new(wire_count),
            group: Vec::with_capacity(wire_count),
            recalc_count: 0,
            stats: SimStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }

    pub fn clear_stats(&mut self) {
        self.stats = SimStats::default();
    }

    pub fn state(&self, index: usize) -> Option<WireState> {
        self.topology.wire(index).map(|w| w.state)
    }

    pub fn gate_state(&self, transistor: usize) -> Option<GateState> {
        self.topology.transistor(transistor).map(|t| t.gate_state)
    }

    /// Rejects indices that are out of range or name an absent wire slot.
    fn check_index(&self, index: usize) -> Result<()> {
        index.wire_index(&self.topology)?;
        Ok(())
    }

    /// Pins a wire high or low without propagating. The rails cannot be forced.
    pub fn force(&mut self, index: usize, high: bool) -> Result<()> {
        self.check_index(index)?;
        if self.topology.is_rail(index) {
            return Err(Error::RailForced { wire: index });
        }
        self.topology.wires[index].force(high);
        Ok(())
    }

    /// Removes any external driver from a wire, leaving it floating at its last level.
    pub fn float(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        if !self.topology.is_rail(index) {
            let wire = &mut self.topology.wires[index];
            wire.pulled = Pulled::None;
            wire.state = wire.state.floated();
        }
        Ok(())
    }

    /// Marks every present wire dirty. Meant for the power-on settle.
    pub fn recalc_all(&mut self) -> Result<Settle> {
        let wires = self
            .topology
            .wires()
            .iter()
            .filter(|w| !w.is_absent() && !self.topology.is_rail(w.index))
            .map(|w| w.index)
            .collect::<Vec<usize>>();
        self.recalculate(wires)
    }

    /// Propagates from the given wires until the circuit is stable.
    ///
    /// Running past the step limit is only tolerated on the first call for a
    /// circuit, since the power-on state is arbitrary and may not settle.
    pub fn recalculate<I: IntoIterator<Item = usize>>(&mut self, wires: I) -> Result<Settle> {
        for index in wires {
            if let Err(e) = self.check_index(index) {
                self.recalc_list.reset();
                return Err(e);
            }
            self.recalc_list.push_cur_list(index);
        }
        self.do_recalc_iterations()
    }

    fn do_recalc_iterations(&mut self) -> Result<Settle> {
        let step_limit = self.config.step_limit;
        let mut settle = Settle::default();
        let mut step = 0;

        while step < step_limit && !self.recalc_list.is_cur_list_empty() {
            let dirty = self.recalc_list.cur_len();
            trace!(generation = step, dirty, "recalc generation");

            for i in 0..dirty {
                let wire = self.recalc_list.cur(i);
                self.recalc_group(wire, &mut settle);
                self.recalc_list.mark_processed(wire);
            }
            self.stats.wires_recalculated += dirty as u64;

            self.recalc_list.swap();
            step += 1;
        }

        let first_settle = self.recalc_count == 0;
        self.recalc_count += 1;
        self.stats.recalc_calls += 1;
        settle.generations = step;
        settle.converged = self.recalc_list.is_cur_list_empty();

        if !settle.converged {
            self.recalc_list.reset();
            if first_settle {
                warn!(
                    circuit = %self.config.name,
                    iterations = step_limit,
                    "initial settle did not converge"
                );
            } else {
                error!(
                    circuit = %self.config.name,
                    iterations = step_limit,
                    "simulation did not converge"
                );
                return Err(ConvergenceError {
                    circuit: self.config.name.clone(),
                    iterations: step_limit,
                }
                .into());
            }
        }

        if self.recalc_count <= self.config.sanity_check_window && !self.recalc_list.is_clear() {
            warn!(
                circuit = %self.config.name,
                recalc = self.recalc_count,
                generations = step,
                "dirty markers left set after recalculation"
            );
            self.recalc_list.reset();
        }

        Ok(settle)
    }

    fn recalc_group(&mut self, wire: usize, settle: &mut Settle) {
        if self.topology.is_rail(wire) {
            return;
        }

        let new_state = self
            .strategy
            .resolve_group(wire, &self.topology, &mut self.group);
        // Fixed member order keeps switching order independent of the strategy
        self.group.sort_unstable();
        self.stats.group_additions += self.group.len() as u64;

        let new_high = new_state.is_high();
        for i in 0..self.group.len() {
            let member = self.group[i];
            if self.topology.is_rail(member) {
                continue;
            }

            if self.topology.wires[member].state != new_state {
                self.topology.wires[member].state = new_state;
                settle.state_changes += 1;
            }

            for k in 0..self.topology.wires[member].gated.len() {
                let t = self.topology.wires[member].gated[k];
                let on = match &self.topology.transistors[t] {
                    Some(transistor) => transistor.is_on(),
                    None => continue,
                };
                if new_high && !on {
                    self.turn_transistor_on(t);
                    settle.gate_toggles += 1;
                } else if !new_high && on {
                    self.turn_transistor_off(t);
                    settle.gate_toggles += 1;
                }
            }
        }
    }

    fn terminals(&self, t: usize) -> Option<(usize, usize)> {
        self.topology
            .transistor(t)
            .map(|transistor| (transistor.terminal_a, transistor.terminal_b))
    }

    fn set_gate(&mut self, t: usize, gate_state: GateState) {
        if let Some(transistor) = self.topology.transistors[t].as_mut() {
            transistor.gate_state = gate_state;
        }
    }

    fn turn_transistor_on(&mut self, t: usize) {
        self.set_gate(t, GateState::On);
        if let Some((a, b)) = self.terminals(t) {
            self.add_recalc_wire(a);
            self.add_recalc_wire(b);
        }
    }

    fn turn_transistor_off(&mut self, t: usize) {
        self.set_gate(t, GateState::Off);
        if let Some((a, b)) = self.terminals(t) {
            self.float_terminal(a);
            self.float_terminal(b);
            self.add_recalc_wire(a);
            self.add_recalc_wire(b);
        }
    }

    fn float_terminal(&mut self, wire: usize) {
        if !self.topology.is_rail(wire) {
            self.topology.wires[wire].float();
        }
    }

    fn add_recalc_wire(&mut self, wire: usize) {
        if !self.topology.is_rail(wire) {
            self.recalc_list.push_next_list(wire);
        }
    }
}
