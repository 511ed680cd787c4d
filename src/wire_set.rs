/// Fixed-capacity bitset keyed by wire index.
pub struct WireSet {
    set: Vec<u8>,
}

impl WireSet {
    pub fn new(wire_count: usize) -> Self {
        let elem_count = (wire_count / 8) + (if wire_count % 8 != 0 { 1 } else { 0 });
        WireSet {
            set: vec![0; elem_count],
        }
    }

    pub fn contains(&self, wire: usize) -> bool {
        let mask = 1 << (wire % 8);
        self.set[wire / 8] & mask > 0
    }

    /// Adds `wire`, returning `false` if it was already present.
    pub fn insert(&mut self, wire: usize) -> bool {
        let mask = 1 << (wire % 8);
        let byte = &mut self.set[wire / 8];
        let added = *byte & mask == 0;
        *byte |= mask;
        added
    }

    pub fn remove(&mut self, wire: usize) {
        let mask = 1 << (wire % 8);
        self.set[wire / 8] &= !mask;
    }

    pub fn clear_all(&mut self) {
        self.set.iter_mut().for_each(|b| *b = 0);
    }

    pub fn is_empty(&self) -> bool {
        self.set.iter().all(|b| *b == 0)
    }
}

#[test]
fn test_create() {
    let set = WireSet::new(8);
    assert_eq!(1, set.set.len());

    let set = WireSet::new(9);
    assert_eq!(2, set.set.len());

    let set = WireSet::new(16);
    assert_eq!(2, set.set.len());

    let set = WireSet::new(17);
    assert_eq!(3, set.set.len());
}

#[test]
fn test_insert() {
    let mut set = WireSet::new(20);
    assert!(set.is_empty());
    assert!(set.insert(0));
    assert!(!set.insert(0));
    assert!(set.contains(0));
    assert!(!set.contains(1));
    assert!(set.insert(9));
    assert!(set.contains(9));
    assert!(!set.contains(8));
    assert!(!set.is_empty());
}

#[test]
fn test_clear() {
    let mut set = WireSet::new(20);
    for wire in &[0, 1, 8, 9] {
        set.insert(*wire);
    }

    for wire in &[1, 2, 9] {
        set.remove(*wire);
    }
    assert!(set.contains(0));
    assert!(!set.contains(1));
    assert!(!set.contains(2));
    assert!(set.contains(8));
    assert!(!set.contains(9));

    set.clear_all();
    assert!(set.is_empty());
    assert!(!set.contains(0));
    assert!(!set.contains(8));
}
