use crate::{
    CircuitSimulator, ConvergenceError, Error, GroupStrategy, IndexedGroups, Pulled, SetGroups,
    SimConfig, StrategyKind, Topology, TopologyBuilder, WireState,
};
use proptest::prelude::*;

fn states<S: GroupStrategy>(sim: &CircuitSimulator<S>) -> Vec<WireState> {
    sim.topology().wires().iter().map(|w| w.state).collect()
}

fn gates<S: GroupStrategy>(sim: &CircuitSimulator<S>) -> Vec<bool> {
    sim.topology()
        .transistors()
        .iter()
        .map(|t| t.as_ref().map_or(false, |t| t.is_on()))
        .collect()
}

/// Pull-up feeding OUT through a pass transistor gated by CTRL. OUT in turn
/// gates a transistor that grounds SENSE.
fn pass_gate() -> Topology {
    let mut builder = TopologyBuilder::new();
    let pull_up = builder.wire("PU", Pulled::High);
    let ctrl = builder.wire("CTRL", Pulled::None);
    let out = builder.wire("OUT", Pulled::None);
    let sense = builder.wire("SENSE", Pulled::High);
    let gnd = builder.gnd();
    builder.transistor(pull_up, out, ctrl);
    builder.transistor(sense, gnd, out);
    builder.build().unwrap()
}

fn pass_gate_scenario<S: GroupStrategy>(strategy: S) {
    let mut sim = CircuitSimulator::new(pass_gate(), strategy);
    let settle = sim.recalc_all().unwrap();
    assert!(settle.converged);
    assert_eq!(sim.wire_state("OUT").unwrap(), WireState::FloatingLow);
    assert_eq!(sim.wire_state("SENSE").unwrap(), WireState::PulledHigh);

    sim.set_high("CTRL").unwrap();
    sim.recalc_named(&["CTRL"]).unwrap();
    assert_eq!(
        sim.wire_state("OUT").unwrap(),
        sim.wire_state("PU").unwrap()
    );
    assert_eq!(sim.wire_state("OUT").unwrap(), WireState::PulledHigh);
    assert_eq!(sim.wire_state("SENSE").unwrap(), WireState::Grounded);

    sim.set_low("CTRL").unwrap();
    sim.recalc_named(&["CTRL"]).unwrap();
    assert_eq!(sim.wire_state("OUT").unwrap(), WireState::FloatingHigh);
    assert_eq!(sim.wire_state("PU").unwrap(), WireState::PulledHigh);
    // OUT still holds its charge, so SENSE stays grounded
    assert_eq!(sim.wire_state("SENSE").unwrap(), WireState::Grounded);
}

#[test]
fn pass_gate_indexed() {
    pass_gate_scenario(IndexedGroups::default());
}

#[test]
fn pass_gate_set() {
    pass_gate_scenario(SetGroups);
}

fn ground_wins_scenario<S: GroupStrategy>(strategy: S) {
    let mut builder = TopologyBuilder::new();
    let vcc = builder.vcc();
    let gnd = builder.gnd();
    let wires = (0..4)
        .map(|i| builder.wire(&format!("W{}", i), Pulled::High))
        .collect::<Vec<_>>();
    for pair in wires.windows(2) {
        builder.transistor(pair[0], pair[1], vcc);
    }
    builder.transistor(wires[3], gnd, vcc);
    let mut sim = CircuitSimulator::new(builder.build().unwrap(), strategy);

    sim.recalc_all().unwrap();
    for wire in &wires {
        assert_eq!(sim.state(*wire), Some(WireState::Grounded));
    }
    assert_eq!(sim.state(gnd), Some(WireState::Grounded));
    assert_eq!(sim.state(vcc), Some(WireState::DrivenHigh));
}

#[test]
fn ground_wins_over_pulled_high() {
    ground_wins_scenario(IndexedGroups::default());
    ground_wins_scenario(SetGroups);
}

#[test]
fn precedence_below_ground() {
    let mut builder = TopologyBuilder::new();
    let vcc = builder.vcc();
    let low = builder.wire("LOW", Pulled::Low);
    builder.transistor(low, vcc, vcc);

    let high = builder.wire("HIGH", Pulled::High);
    let other_low = builder.wire("OTHER_LOW", Pulled::Low);
    let floating = builder.wire("FLOAT", Pulled::None);
    builder.transistor(high, other_low, vcc);
    builder.transistor(other_low, floating, vcc);

    let mut sim = CircuitSimulator::new(builder.build().unwrap(), IndexedGroups::default());
    sim.recalc_all().unwrap();

    assert_eq!(sim.state(low), Some(WireState::DrivenHigh));
    for wire in &[high, other_low, floating] {
        assert_eq!(sim.state(*wire), Some(WireState::PulledHigh));
    }
}

/// A and B are joined by a transistor gated by C. Extra transistors held off
/// by GND add fan-out to one side or the other.
fn floating_merge<S: GroupStrategy>(strategy: S, extra_a: usize, extra_b: usize) -> WireState {
    let mut builder = TopologyBuilder::new();
    let gnd = builder.gnd();
    let a = builder.wire("A", Pulled::None);
    let b = builder.wire("B", Pulled::None);
    let c = builder.wire("C", Pulled::None);
    builder.transistor(a, b, c);
    for (wire, extra) in &[(a, extra_a), (b, extra_b)] {
        for _ in 0..*extra {
            let dummy = builder.unnamed_wire(Pulled::None);
            builder.transistor(*wire, dummy, gnd);
        }
    }
    let mut sim = CircuitSimulator::new(builder.build().unwrap(), strategy);

    sim.set_high("A").unwrap();
    sim.set_low("B").unwrap();
    sim.set_low("C").unwrap();
    sim.recalc_all().unwrap();
    sim.release("A").unwrap();
    sim.release("B").unwrap();
    assert_eq!(sim.wire_state("A").unwrap(), WireState::FloatingHigh);
    assert_eq!(sim.wire_state("B").unwrap(), WireState::FloatingLow);

    sim.set_high("C").unwrap();
    sim.recalc_named(&["C"]).unwrap();
    let merged = sim.wire_state("A").unwrap();
    assert_eq!(sim.wire_state("B").unwrap(), merged);
    merged
}

#[test]
fn floating_tie_break_follows_fan_out() {
    assert_eq!(
        floating_merge(IndexedGroups::default(), 3, 0),
        WireState::FloatingHigh
    );
    assert_eq!(
        floating_merge(IndexedGroups::default(), 0, 3),
        WireState::FloatingLow
    );
    assert_eq!(floating_merge(SetGroups, 3, 0), WireState::FloatingHigh);
    assert_eq!(floating_merge(SetGroups, 0, 3), WireState::FloatingLow);
}

#[test]
fn floating_exact_tie_goes_high() {
    assert_eq!(
        floating_merge(IndexedGroups::default(), 2, 2),
        WireState::FloatingHigh
    );
    assert_eq!(floating_merge(SetGroups, 0, 0), WireState::FloatingHigh);
}

#[test]
fn recalculating_stable_wires_changes_nothing() {
    let mut sim = CircuitSimulator::new(pass_gate(), IndexedGroups::default());
    sim.recalc_all().unwrap();
    sim.set_high("CTRL").unwrap();
    sim.recalc_named(&["CTRL"]).unwrap();
    sim.set_low("CTRL").unwrap();
    sim.recalc_named(&["CTRL"]).unwrap();

    let before = (states(&sim), gates(&sim));
    let settle = sim.recalc_all().unwrap();
    assert_eq!(settle.state_changes, 0);
    assert_eq!(settle.gate_toggles, 0);
    assert_eq!(settle.generations, 1);
    assert_eq!((states(&sim), gates(&sim)), before);
}

fn nmos_inverter_and_nand<S: GroupStrategy>(strategy: S) {
    let mut builder = TopologyBuilder::new();
    let gnd = builder.gnd();
    let input = builder.wire("IN", Pulled::None);
    let inverted = builder.wire("NOT", Pulled::High);
    builder.transistor(inverted, gnd, input);

    let a = builder.wire("A", Pulled::None);
    let b = builder.wire("B", Pulled::None);
    let nand = builder.wire("NAND", Pulled::High);
    let mid = builder.unnamed_wire(Pulled::None);
    builder.transistor(nand, mid, a);
    builder.transistor(mid, gnd, b);
    let mut sim = CircuitSimulator::new(builder.build().unwrap(), strategy);
    sim.recalc_all().unwrap();

    for high in &[true, false, true] {
        sim.force(input, *high).unwrap();
        sim.recalculate(vec![input]).unwrap();
        assert_eq!(sim.is_low("NOT").unwrap(), *high);
    }

    for (x, y) in &[(true, true), (true, false), (false, true), (false, false), (true, true)] {
        sim.force(a, *x).unwrap();
        sim.force(b, *y).unwrap();
        sim.recalc_named(&["A", "B"]).unwrap();
        assert_eq!(sim.is_high("NAND").unwrap(), !(*x && *y), "{} nand {}", x, y);
    }
}

#[test]
fn inverter_and_nand_logic() {
    nmos_inverter_and_nand(IndexedGroups::default());
    nmos_inverter_and_nand(SetGroups);
}

/// Three inverters in a loop: there is no stable assignment.
fn ring_oscillator() -> (Topology, usize) {
    let mut builder = TopologyBuilder::new();
    let gnd = builder.gnd();
    let outs = (0..3)
        .map(|i| builder.wire(&format!("O{}", i), Pulled::High))
        .collect::<Vec<_>>();
    for i in 0..3 {
        builder.transistor(outs[(i + 1) % 3], gnd, outs[i]);
    }
    let quiet = builder.wire("QUIET", Pulled::Low);
    (builder.build().unwrap(), quiet)
}

fn convergence_scenario(config: SimConfig) {
    let (topology, quiet) = ring_oscillator();
    let mut sim = CircuitSimulator::from_config(topology, config);

    let settle = sim.recalc_all().unwrap();
    assert!(!settle.converged);
    assert_eq!(settle.generations, 400);

    // The pending work of the failed settle is dropped
    let settle = sim.recalculate(vec![quiet]).unwrap();
    assert!(settle.converged);
    assert_eq!(settle.generations, 1);

    match sim.recalc_named(&["O0", "O1", "O2"]) {
        Err(Error::Convergence(err)) => assert_eq!(
            err,
            ConvergenceError {
                circuit: "ring".to_owned(),
                iterations: 400
            }
        ),
        other => panic!("expected a convergence error, got {:?}", other),
    }
}

#[test]
fn oscillation_fails_after_first_settle() {
    convergence_scenario(SimConfig::named("ring"));
    convergence_scenario(SimConfig {
        strategy: StrategyKind::Set,
        ..SimConfig::named("ring")
    });
}

#[test]
fn bus_round_trip() {
    let mut builder = TopologyBuilder::new();
    for i in 0..8 {
        builder.wire(&format!("DB{}", i), Pulled::None);
    }
    let mut sim = CircuitSimulator::new(builder.build().unwrap(), IndexedGroups::default());
    let names = (0..8).map(|i| format!("DB{}", i)).collect::<Vec<_>>();
    let names = names.iter().map(String::as_str).collect::<Vec<_>>();
    let bus = sim.bus_indices(&names).unwrap();

    for value in &[0xA5, 0x00, 0xFF, 0x5A] {
        sim.write_bus(&bus, *value).unwrap();
        sim.recalculate(bus.clone()).unwrap();
        assert_eq!(sim.read_bus(&bus).unwrap(), *value);
        assert_eq!(sim.read_named_bus("DB", 8).unwrap(), *value);
    }

    sim.write_named_bus("DB", 8, 0x81).unwrap();
    assert_eq!(sim.read_bus(&bus).unwrap(), 0x81);
    assert!(sim.is_high("DB7").unwrap());
    assert!(sim.is_low("DB1").unwrap());

    sim.float_bus(&bus).unwrap();
    sim.recalculate(bus.clone()).unwrap();
    assert_eq!(sim.wire_state("DB0").unwrap(), WireState::FloatingHigh);
    assert_eq!(sim.wire_state("DB1").unwrap(), WireState::FloatingLow);
    assert_eq!(sim.read_bus(&bus).unwrap(), 0x81);
}

#[test]
fn named_bus_over_unnamed_wires() {
    let mut builder = TopologyBuilder::new();
    let wires = (0..4)
        .map(|_| builder.unnamed_wire(Pulled::None))
        .collect::<Vec<_>>();
    let mut sim = CircuitSimulator::new(builder.build().unwrap(), SetGroups);
    assert!(sim.set_high(wires[0]).is_err());

    sim.name_bus("AB", &wires).unwrap();
    sim.write_named_bus("AB", 4, 0b1010).unwrap();
    assert_eq!(sim.read_named_bus("AB", 4).unwrap(), 0b1010);
    assert_eq!(sim.get_wire_index("AB3").unwrap(), wires[3]);
}

fn pulled_low_bus(width: usize) -> (CircuitSimulator, Vec<usize>) {
    let mut builder = TopologyBuilder::new();
    let wires = (0..width)
        .map(|i| builder.wire(&format!("D{}", i), Pulled::Low))
        .collect::<Vec<_>>();
    (
        CircuitSimulator::new(builder.build().unwrap(), IndexedGroups::default()),
        wires,
    )
}

#[test]
fn failed_bus_write_leaves_pads_alone() {
    let (mut sim, mut bus) = pulled_low_bus(2);
    let vcc = sim.topology().vcc();
    bus.push(vcc);
    assert!(matches!(
        sim.write_bus(&bus, 0b111),
        Err(Error::RailForced { wire }) if wire == vcc
    ));
    assert_eq!(sim.state(bus[0]), Some(WireState::PulledLow));
    assert_eq!(sim.state(bus[1]), Some(WireState::PulledLow));

    bus[2] = 999;
    assert!(matches!(
        sim.write_bus(&bus, 0b111),
        Err(Error::UnknownWire(_))
    ));
    assert!(matches!(sim.float_bus(&bus), Err(Error::UnknownWire(_))));
    assert_eq!(sim.topology().wires()[bus[0]].pulled, Pulled::Low);
    assert_eq!(sim.state(bus[1]), Some(WireState::PulledLow));
}

#[test]
fn bus_wider_than_64_wires_is_rejected() {
    let (mut sim, bus) = pulled_low_bus(70);
    assert!(matches!(
        sim.write_bus(&bus, u64::MAX),
        Err(Error::BusTooWide { width: 70 })
    ));
    assert!(matches!(
        sim.read_bus(&bus),
        Err(Error::BusTooWide { width: 70 })
    ));
    assert_eq!(sim.state(bus[0]), Some(WireState::PulledLow));
    assert_eq!(sim.state(bus[69]), Some(WireState::PulledLow));

    sim.write_bus(&bus[..64], u64::MAX).unwrap();
    assert_eq!(sim.read_bus(&bus[..64]).unwrap(), u64::MAX);
}

#[test]
fn absent_slots_are_unknown_wires() {
    let mut builder = TopologyBuilder::new();
    let absent = builder.unnamed_wire(Pulled::None);
    let mut sim = CircuitSimulator::new(builder.build().unwrap(), SetGroups);

    assert!(matches!(sim.force(absent, true), Err(Error::UnknownWire(_))));
    assert!(matches!(sim.float(absent), Err(Error::UnknownWire(_))));
    assert!(matches!(
        sim.recalculate(vec![absent]),
        Err(Error::UnknownWire(_))
    ));
    assert!(matches!(sim.wire_state(absent), Err(Error::UnknownWire(_))));
}

#[test]
fn lookup_and_rail_errors() {
    let mut sim = CircuitSimulator::new(pass_gate(), IndexedGroups::default());
    match sim.get_wire_index("NOPE") {
        Err(Error::UnknownWire(err)) => assert_eq!(err.0, "NOPE"),
        other => panic!("expected unknown wire, got {:?}", other),
    }
    assert!(matches!(sim.is_high("NOPE"), Err(Error::UnknownWire(_))));
    assert!(matches!(sim.is_high(999_usize), Err(Error::UnknownWire(_))));
    assert!(matches!(
        sim.recalculate(vec![999]),
        Err(Error::UnknownWire(_))
    ));

    let vcc = sim.topology().vcc();
    let gnd = sim.topology().gnd();
    assert!(matches!(sim.set_low("VCC"), Err(Error::RailForced { wire }) if wire == vcc));
    assert!(matches!(sim.force(gnd, true), Err(Error::RailForced { .. })));

    sim.float(vcc).unwrap();
    sim.float(gnd).unwrap();
    assert_eq!(sim.state(vcc), Some(WireState::DrivenHigh));
    assert_eq!(sim.state(gnd), Some(WireState::Grounded));

    // A failed lookup leaves nothing queued
    assert!(sim.recalc_all().unwrap().converged);
}

#[test]
fn named_list_is_one_pass() {
    let mut sim = CircuitSimulator::new(pass_gate(), IndexedGroups::default());
    sim.recalc_all().unwrap();
    sim.clear_stats();

    sim.set_high("CTRL").unwrap();
    sim.set_low("PU").unwrap();
    sim.recalc_named(&["CTRL", "PU"]).unwrap();
    let stats = sim.stats();
    assert_eq!(stats.recalc_calls, 1);
    assert!(stats.wires_recalculated >= 2);
    assert!(stats.group_additions >= stats.wires_recalculated);
    assert_eq!(sim.wire_state("OUT").unwrap(), WireState::PulledLow);
}

#[test]
fn config_selects_strategy() {
    let config = SimConfig::from_json(r#"{"name": "pass", "strategy": "set"}"#).unwrap();
    let mut sim = CircuitSimulator::from_config(pass_gate(), config);
    assert_eq!(sim.name(), "pass");
    sim.recalc_all().unwrap();
    sim.set_high("CTRL").unwrap();
    sim.recalc_named(&["CTRL"]).unwrap();
    assert!(sim.is_high("OUT").unwrap());
}

#[derive(Clone, Debug)]
enum Poke {
    High(usize),
    Low(usize),
    Release(usize),
}

fn random_circuit() -> impl Strategy<Value = (Vec<u8>, Vec<(usize, usize, usize)>, Vec<Poke>)> {
    (1..8_usize).prop_flat_map(|n| {
        let wires = n + 2;
        let poke = prop_oneof![
            (0..wires).prop_map(Poke::High),
            (0..wires).prop_map(Poke::Low),
            (0..wires).prop_map(Poke::Release),
        ];
        (
            prop::collection::vec(0..3_u8, n),
            prop::collection::vec((0..wires, 0..wires, 0..wires), 0..14),
            prop::collection::vec(poke, 1..10),
        )
    })
}

proptest! {
    #[test]
    fn strategies_agree((pulled, transistors, pokes) in random_circuit()) {
        let mut builder = TopologyBuilder::new();
        for (i, p) in pulled.iter().enumerate() {
            builder.wire(&format!("W{}", i), Pulled::from_byte(*p).unwrap());
        }
        for (a, b, gate) in &transistors {
            builder.transistor(*a, *b, *gate);
        }
        let topology = builder.build().unwrap();

        let config = SimConfig { step_limit: 100, ..SimConfig::default() };
        let mut indexed =
            CircuitSimulator::with_config(topology.clone(), IndexedGroups::default(), config.clone());
        let mut set = CircuitSimulator::with_config(topology, SetGroups, config);

        let a = indexed.recalc_all().unwrap();
        let b = set.recalc_all().unwrap();
        prop_assert_eq!(a, b);
        prop_assert_eq!(states(&indexed), states(&set));

        for poke in &pokes {
            let (wire, forced_a, forced_b) = match poke {
                Poke::High(w) => (*w, indexed.force(*w, true).is_ok(), set.force(*w, true).is_ok()),
                Poke::Low(w) => (*w, indexed.force(*w, false).is_ok(), set.force(*w, false).is_ok()),
                Poke::Release(w) => (*w, indexed.float(*w).is_ok(), set.float(*w).is_ok()),
            };
            prop_assert_eq!(forced_a, forced_b);

            let a = indexed.recalculate(vec![wire]).map_err(|e| e.to_string());
            let b = set.recalculate(vec![wire]).map_err(|e| e.to_string());
            prop_assert_eq!(a, b);
            prop_assert_eq!(states(&indexed), states(&set));
            prop_assert_eq!(gates(&indexed), gates(&set));
        }
    }

    #[test]
    fn repeated_runs_are_deterministic((pulled, transistors, pokes) in random_circuit()) {
        let mut builder = TopologyBuilder::new();
        for (i, p) in pulled.iter().enumerate() {
            builder.wire(&format!("W{}", i), Pulled::from_byte(*p).unwrap());
        }
        for (a, b, gate) in &transistors {
            builder.transistor(*a, *b, *gate);
        }
        let topology = builder.build().unwrap();

        let run = |topology: Topology| {
            let config = SimConfig { step_limit: 100, ..SimConfig::default() };
            let mut sim = CircuitSimulator::with_config(topology, IndexedGroups::default(), config);
            let _ = sim.recalc_all();
            for poke in &pokes {
                let wire = match poke {
                    Poke::High(w) => { let _ = sim.force(*w, true); *w }
                    Poke::Low(w) => { let _ = sim.force(*w, false); *w }
                    Poke::Release(w) => { let _ = sim.float(*w); *w }
                };
                let _ = sim.recalculate(vec![wire]);
            }
            states(&sim)
        };
        prop_assert_eq!(run(topology.clone()), run(topology));
    }
}
