use nmossim::{CircuitSimulator, Error, FormatError, SimConfig, Topology};
use std::{
    fs::{self, File},
    io::BufReader,
    path::Path,
    process,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  nmossim info <circuit>");
    eprintln!("  nmossim settle <circuit> [config.json] [wire...]");
    process::exit(2);
}

fn load_topology(path: &str) -> Result<Topology, Error> {
    let file = File::open(path).map_err(FormatError::from)?;
    Ok(Topology::load(&mut BufReader::new(file))?)
}

fn load_config(path: &str) -> Result<SimConfig, Error> {
    let json = fs::read_to_string(path).map_err(FormatError::from)?;
    SimConfig::from_json(&json)
}

fn print_info(path: &str) -> Result<(), Error> {
    let topology = load_topology(path)?;
    let present_wires = topology.wires().iter().filter(|w| !w.is_absent()).count();
    let present_transistors = topology.transistors().iter().flatten().count();
    println!("circuit:      {}", path);
    println!(
        "wires:        {} ({} present)",
        topology.wire_count(),
        present_wires
    );
    println!(
        "transistors:  {} ({} present)",
        topology.transistor_count(),
        present_transistors
    );
    println!("vcc:          {}", topology.vcc());
    println!("gnd:          {}", topology.gnd());
    Ok(())
}

fn settle(path: &str, rest: &[String]) -> Result<(), Error> {
    let (config, wires) = match rest.split_first() {
        Some((first, wires)) if first.ends_with(".json") => (load_config(first)?, wires),
        _ => {
            let name = Path::new(path)
                .file_stem()
                .and_then(|s| s.to_str())
                .map_or_else(SimConfig::default, SimConfig::named);
            (name, rest)
        }
    };

    let topology = load_topology(path)?;
    let mut sim = CircuitSimulator::from_config(topology, config);
    let settle = sim.recalc_all()?;
    info!(
        circuit = sim.name(),
        generations = settle.generations,
        state_changes = settle.state_changes,
        gate_toggles = settle.gate_toggles,
        converged = settle.converged,
        "initial settle finished"
    );

    for wire in wires {
        let state = sim.wire_state(wire.as_str())?;
        let level = if state.is_high() { "high" } else { "low" };
        println!("{:<12} {:<5} {:?}", wire, level, state);
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let result = match (args.get(1).map(String::as_str), args.get(2)) {
        (Some("info"), Some(path)) => print_info(path),
        (Some("settle"), Some(path)) => settle(path, &args[3..]),
        _ => usage(),
    };

    if let Err(err) = result {
        eprintln!("nmossim: {}", err);
        process::exit(1);
    }
}
