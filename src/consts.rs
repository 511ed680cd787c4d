pub const FORMAT_MAGIC: [u8; 4] = *b"NMOS";
pub const FORMAT_VERSION: u16 = 1;

/// Terminates each wire's segment in the controlling and gated tables.
pub const NEXT_CTRL: u32 = 0xFFFE;
/// Marks an unused slot in the transistor table.
pub const NO_WIRE: u32 = 0xFFFD;

pub const VCC_NAME: &str = "VCC";
pub const GND_NAME: &str = "GND";
/// Ground net name used by the visual6502-derived netlists.
pub const GND_ALT_NAME: &str = "VSS";

pub const DEFAULT_STEP_LIMIT: usize = 400;
pub const DEFAULT_SANITY_CHECK_WINDOW: usize = 20;
pub const DEFAULT_CIRCUIT_NAME: &str = "circuit";
