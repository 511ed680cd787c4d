use super::{GroupStrategy, GroupValue};
use crate::{components::WireState, topology::Topology};
use fnv::FnvHashSet;

/// Builds a fresh hash set per group with a recursive walk. Simple, but the
/// recursion depth grows with the size of the group.
#[derive(Default)]
pub struct SetGroups;

fn add_wire_to_group(index: usize, topology: &Topology, members: &mut FnvHashSet<usize>) {
    if !members.insert(index) || topology.is_rail(index) {
        return;
    }

    for t in &topology.wires[index].controlling {
        if let Some(transistor) = topology.transistor(*t) {
            if !transistor.is_on() {
                continue;
            }
            if let Some(other) = transistor.other_side(index) {
                add_wire_to_group(other, topology, members);
            }
        }
    }
}

impl GroupStrategy for SetGroups {
    fn resolve_group(
        &mut self,
        start: usize,
        topology: &Topology,
        group: &mut Vec<usize>,
    ) -> WireState {
        let mut members = FnvHashSet::default();
        add_wire_to_group(start, topology, &mut members);

        let mut value = GroupValue::default();
        for index in &members {
            value.add(*index, topology);
        }

        group.clear();
        group.extend(members);
        value.resolve(topology.wires[start].state)
    }
}
