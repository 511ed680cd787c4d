use super::{GroupStrategy, GroupValue};
use crate::{components::WireState, topology::Topology};

/// Iterative traversal with a per-wire generation stamp; no allocation once prepared.
#[derive(Default)]
pub struct IndexedGroups {
    stamps: Vec<u32>,
    generation: u32,
    stack: Vec<usize>,
}

impl IndexedGroups {
    fn next_generation(&mut self) {
        if self.generation == u32::MAX {
            self.stamps.iter_mut().for_each(|s| *s = 0);
            self.generation = 0;
        }
        self.generation += 1;
    }
}

impl GroupStrategy for IndexedGroups {
    fn prepare(&mut self, wire_count: usize) {
        self.stamps = vec![0; wire_count];
        self.generation = 0;
        self.stack = Vec::with_capacity(wire_count);
    }

    fn resolve_group(
        &mut self,
        start: usize,
        topology: &Topology,
        group: &mut Vec<usize>,
    ) -> WireState {
        if self.stamps.len() != topology.wire_count() {
            self.prepare(topology.wire_count());
        }
        self.next_generation();
        group.clear();

        let mut value = GroupValue::default();
        self.stack.clear();
        self.stack.push(start);
        while let Some(index) = self.stack.pop() {
            if self.stamps[index] == self.generation {
                continue;
            }
            self.stamps[index] = self.generation;
            group.push(index);
            value.add(index, topology);

            // Nothing propagates through the rails
            if topology.is_rail(index) {
                continue;
            }

            for t in &topology.wires[index].controlling {
                let other = match topology.transistor(*t) {
                    Some(transistor) if transistor.is_on() => transistor.other_side(index),
                    _ => None,
                };
                if let Some(other) = other {
                    if self.stamps[other] != self.generation {
                        self.stack.push(other);
                    }
                }
            }
        }

        value.resolve(topology.wires[start].state)
    }
}
