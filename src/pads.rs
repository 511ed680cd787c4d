//! Pad-level access for code that drives a chip from outside: look wires up by
//! name, force them, and move multi-wire busses in and out as integers
//! (least significant wire first, at most `MAX_BUS_WIDTH` wires).

use crate::{
    components::WireState,
    error::{Error, Result, UnknownWireError},
    strategy::GroupStrategy,
    topology::Topology,
    CircuitSimulator, Settle,
};

/// Something that identifies a wire: its name or its index.
pub trait WireId {
    fn wire_index(&self, topology: &Topology) -> std::result::Result<usize, UnknownWireError>;
}

impl WireId for usize {
    fn wire_index(&self, topology: &Topology) -> std::result::Result<usize, UnknownWireError> {
        match topology.wire(*self) {
            Some(wire) if !wire.is_absent() => Ok(*self),
            _ => Err(UnknownWireError(format!("#{}", self))),
        }
    }
}

impl WireId for &str {
    fn wire_index(&self, topology: &Topology) -> std::result::Result<usize, UnknownWireError> {
        topology
            .wire_index(self)
            .ok_or_else(|| UnknownWireError((*self).to_owned()))
    }
}

impl WireId for String {
    fn wire_index(&self, topology: &Topology) -> std::result::Result<usize, UnknownWireError> {
        self.as_str().wire_index(topology)
    }
}

/// Widest bus that fits the `u64` used by the bus helpers.
pub const MAX_BUS_WIDTH: usize = 64;

fn check_bus_width(wires: &[usize]) -> Result<()> {
    if wires.len() > MAX_BUS_WIDTH {
        return Err(Error::BusTooWide { width: wires.len() });
    }
    Ok(())
}

impl<S: GroupStrategy> CircuitSimulator<S> {
    pub fn get_wire_index(&self, name: &str) -> Result<usize> {
        Ok(name.wire_index(self.topology())?)
    }

    pub fn wire_state<W: WireId>(&self, wire: W) -> Result<WireState> {
        let index = wire.wire_index(self.topology())?;
        Ok(self.topology().wires()[index].state)
    }

    pub fn is_high<W: WireId>(&self, wire: W) -> Result<bool> {
        Ok(self.wire_state(wire)?.is_high())
    }

    pub fn is_low<W: WireId>(&self, wire: W) -> Result<bool> {
        Ok(self.wire_state(wire)?.is_low())
    }

    pub fn set_high<W: WireId>(&mut self, wire: W) -> Result<()> {
        let index = wire.wire_index(self.topology())?;
        self.force(index, true)
    }

    pub fn set_low<W: WireId>(&mut self, wire: W) -> Result<()> {
        let index = wire.wire_index(self.topology())?;
        self.force(index, false)
    }

    /// Stops driving a pad, e.g. when a chip hands a shared data bus back.
    pub fn release<W: WireId>(&mut self, wire: W) -> Result<()> {
        let index = wire.wire_index(self.topology())?;
        self.float(index)
    }

    /// Recalculates all named wires in a single pass.
    pub fn recalc_named(&mut self, names: &[&str]) -> Result<Settle> {
        let wires = self.bus_indices(names)?;
        self.recalculate(wires)
    }

    pub fn bus_indices(&self, names: &[&str]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| name.wire_index(self.topology()).map_err(Error::from))
            .collect()
    }

    pub fn read_bus(&self, wires: &[usize]) -> Result<u64> {
        check_bus_width(wires)?;
        let mut value = 0_u64;
        for (bit, wire) in wires.iter().enumerate() {
            if self.is_high(*wire)? {
                value |= 1_u64 << bit;
            }
        }
        Ok(value)
    }

    /// Forces each bus wire to its bit of `value`. Does not recalculate.
    ///
    /// Every wire is checked first, so on error no pad has been touched.
    pub fn write_bus(&mut self, wires: &[usize], value: u64) -> Result<()> {
        check_bus_width(wires)?;
        for wire in wires {
            let index = wire.wire_index(self.topology())?;
            if self.topology().is_rail(index) {
                return Err(Error::RailForced { wire: index });
            }
        }
        for (bit, wire) in wires.iter().enumerate() {
            self.force(*wire, value & (1_u64 << bit) != 0)?;
        }
        Ok(())
    }

    pub fn float_bus(&mut self, wires: &[usize]) -> Result<()> {
        for wire in wires {
            wire.wire_index(self.topology())?;
        }
        for wire in wires {
            self.float(*wire)?;
        }
        Ok(())
    }

    fn named_bus(&self, prefix: &str, width: usize) -> Result<Vec<usize>> {
        (0..width)
            .map(|bit| {
                format!("{}{}", prefix, bit)
                    .wire_index(self.topology())
                    .map_err(Error::from)
            })
            .collect()
    }

    /// Reads the bus `prefix0..prefix{width-1}`.
    pub fn read_named_bus(&self, prefix: &str, width: usize) -> Result<u64> {
        let wires = self.named_bus(prefix, width)?;
        self.read_bus(&wires)
    }

    pub fn write_named_bus(&mut self, prefix: &str, width: usize, value: u64) -> Result<()> {
        let wires = self.named_bus(prefix, width)?;
        self.write_bus(&wires, value)
    }

    /// Gives `wires` the names `prefix0`, `prefix1`, ... so they can be used as a named bus.
    pub fn name_bus(&mut self, prefix: &str, wires: &[usize]) -> Result<()> {
        Ok(self.topology.name_bus(prefix, wires)?)
    }
}
