use crate::wire_set::WireSet;

/// Double-buffered dirty queue. The current generation is drained while wires
/// dirtied during that pass collect in the next one; `swap` flips the roles.
pub struct RecalcSwapList {
    lists: [Vec<usize>; 2],
    markers: [WireSet; 2],
    indices: (usize, usize),
}

impl RecalcSwapList {
    pub fn new(wire_count: usize) -> Self {
        RecalcSwapList {
            lists: [
                Vec::with_capacity(wire_count),
                Vec::with_capacity(wire_count),
            ],
            markers: [WireSet::new(wire_count), WireSet::new(wire_count)],
            indices: (0, 1),
        }
    }

    /// Queues a wire in the generation about to run.
    pub fn push_cur_list(&mut self, wire: usize) {
        let (cur_list, _) = self.indices;
        if self.markers[cur_list].insert(wire) {
            self.lists[cur_list].push(wire);
        }
    }

    /// Queues a wire for the following generation, returning `false` if it was already queued.
    pub fn push_next_list(&mut self, wire: usize) -> bool {
        let (_, next_list) = self.indices;
        let added = self.markers[next_list].insert(wire);
        if added {
            self.lists[next_list].push(wire);
        }
        added
    }

    pub fn cur_len(&self) -> usize {
        let (cur_list, _) = self.indices;
        self.lists[cur_list].len()
    }

    pub fn cur(&self, i: usize) -> usize {
        let (cur_list, _) = self.indices;
        self.lists[cur_list][i]
    }

    /// Drops the current-generation marker of a wire once it has been processed.
    pub fn mark_processed(&mut self, wire: usize) {
        let (cur_list, _) = self.indices;
        debug_assert!(self.markers[cur_list].contains(wire));
        self.markers[cur_list].remove(wire);
    }

    pub fn is_cur_list_empty(&self) -> bool {
        self.cur_len() == 0
    }

    pub fn swap(&mut self) {
        let (cur_list, next_list) = self.indices;
        self.lists[cur_list].clear();
        self.indices = (next_list, cur_list);
    }

    /// True when no wire is queued or marked in either generation.
    pub fn is_clear(&self) -> bool {
        self.lists.iter().all(Vec::is_empty) && self.markers.iter().all(WireSet::is_empty)
    }

    pub fn reset(&mut self) {
        for list in self.lists.iter_mut() {
            list.clear();
        }
        for markers in self.markers.iter_mut() {
            markers.clear_all();
        }
        self.indices = (0, 1);
    }
}
