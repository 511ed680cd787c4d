use std::io;
use thiserror::Error;

/// A circuit file that is malformed or internally inconsistent.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to read or write circuit data: {0}")]
    Io(#[from] io::Error),
    #[error("not a circuit file (bad magic)")]
    BadMagic,
    #[error("unsupported circuit format version {0}")]
    UnsupportedVersion(u16),
    #[error("{table}: expected {expected} entries, found {found}")]
    CountMismatch {
        table: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{table}: wire {wire} segment ends with {found:#X} instead of the terminator")]
    MissingTerminator {
        table: &'static str,
        wire: usize,
        found: u32,
    },
    #[error("required wire {0} is missing")]
    MissingRail(&'static str),
    #[error("wire {wire} has invalid pulled value {value}")]
    BadPulled { wire: usize, value: u8 },
    #[error("wire {wire} has a name that is not valid UTF-8")]
    BadName { wire: usize },
    #[error("transistor {transistor} refers to wire {wire}, which is out of range")]
    WireOutOfRange { transistor: usize, wire: u32 },
    #[error("wire {wire} refers to transistor {transistor}, which is out of range")]
    TransistorOutOfRange { wire: usize, transistor: u32 },
    #[error("transistor {0} is only partially marked absent")]
    PartialTransistor(usize),
    #[error("wire {wire} refers to absent transistor {transistor}")]
    AbsentTransistorReferenced { wire: usize, transistor: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown wire '{0}'")]
pub struct UnknownWireError(pub String);

/// The fixed-point loop ran past its step limit after the initial settle.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("sim \"{circuit}\" did not converge after {iterations} iterations")]
pub struct ConvergenceError {
    pub circuit: String,
    pub iterations: usize,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    UnknownWire(#[from] UnknownWireError),
    #[error(transparent)]
    Convergence(#[from] ConvergenceError),
    #[error("wire {wire} is a power rail and cannot be forced")]
    RailForced { wire: usize },
    #[error("bus of {width} wires does not fit in a 64-bit value")]
    BusTooWide { width: usize },
    #[error("invalid simulator config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
