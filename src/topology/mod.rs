//! Circuit topology: the wire and transistor tables of one chip, plus the
//! binary format they are stored in.
//!
//! All integers are little-endian:
//!
//! ```text
//! magic "NMOS", version u16
//! wire count u32, transistor count u32, segment terminator u32, absent marker u32
//! pulled table:      u32 n, n x u8           (0 none, 1 high, 2 low)
//! name table:        u32 n, n x (u32 len, utf-8 bytes)
//! controlling table: u32 n, n x u32          per wire: count, indices..., terminator
//! gated table:       u32 n, n x u32          per wire: count, indices..., terminator
//! terminal A table:  u32 n, n x u32          absent marker for unused slots
//! terminal B table:  u32 n, n x u32
//! gate table:        u32 n, n x u32
//! ```


use crate::{
    components::{GateState, Pulled, Transistor, Wire, WireState},
    consts::{FORMAT_MAGIC, FORMAT_VERSION, GND_ALT_NAME, GND_NAME, NEXT_CTRL, NO_WIRE, VCC_NAME},
    error::{FormatError, UnknownWireError},
};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use fnv::FnvHashMap;
use std::io::{self, Read, Write};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct Topology {
    pub(crate) wires: Vec<Wire>,
    pub(crate) transistors: Vec<Option<Transistor>>,
    wire_index_by_name: FnvHashMap<String, usize>,
    vcc: usize,
    gnd: usize,
}

impl Topology {
    /// Validates the tables, locates the rails, pins their states and switches on
    /// every transistor gated by VCC.
    pub fn from_parts(
        mut wires: Vec<Wire>,
        mut transistors: Vec<Option<Transistor>>,
    ) -> Result<Self, FormatError> {
        let wire_count = wires.len();
        for (i, transistor) in transistors.iter_mut().enumerate() {
            if let Some(t) = transistor {
                t.index = i;
                for wire in &[t.terminal_a, t.terminal_b, t.gate] {
                    if *wire >= wire_count {
                        return Err(FormatError::WireOutOfRange {
                            transistor: i,
                            wire: *wire as u32,
                        });
                    }
                }
            }
        }

        for (i, wire) in wires.iter().enumerate() {
            for t in wire.controlling.iter().chain(wire.gated.iter()) {
                match transistors.get(*t) {
                    None => {
                        return Err(FormatError::TransistorOutOfRange {
                            wire: i,
                            transistor: *t as u32,
                        })
                    }
                    Some(None) => {
                        return Err(FormatError::AbsentTransistorReferenced {
                            wire: i,
                            transistor: *t,
                        })
                    }
                    Some(Some(_)) => {}
                }
            }
        }

        let mut wire_index_by_name = FnvHashMap::default();
        for (i, wire) in wires.iter_mut().enumerate() {
            wire.index = i;
            if let Some(name) = &wire.name {
                wire_index_by_name.insert(name.clone(), i);
            }
        }

        let vcc = *wire_index_by_name
            .get(VCC_NAME)
            .ok_or(FormatError::MissingRail(VCC_NAME))?;
        let gnd = *wire_index_by_name
            .get(GND_NAME)
            .or_else(|| wire_index_by_name.get(GND_ALT_NAME))
            .ok_or(FormatError::MissingRail(GND_NAME))?;

        wires[vcc].state = WireState::DrivenHigh;
        wires[gnd].state = WireState::Grounded;
        for t in &wires[vcc].gated {
            if let Some(transistor) = transistors[*t].as_mut() {
                transistor.gate_state = GateState::On;
            }
        }

        Ok(Topology {
            wires,
            transistors,
            wire_index_by_name,
            vcc,
            gnd,
        })
    }

    pub fn load<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        let mut magic = [0_u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != FORMAT_MAGIC {
            return Err(FormatError::BadMagic);
        }
        let version = reader.read_u16::<LittleEndian>()?;
        if version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let wire_count = reader.read_u32::<LittleEndian>()? as usize;
        let transistor_count = reader.read_u32::<LittleEndian>()? as usize;
        let next_ctrl = reader.read_u32::<LittleEndian>()?;
        let no_wire = reader.read_u32::<LittleEndian>()?;

        let pulled_count = reader.read_u32::<LittleEndian>()?;
        expect_count("wire pulled", wire_count, pulled_count as usize)?;
        let pulled = read_bytes(reader, u64::from(pulled_count))?;

        let name_count = reader.read_u32::<LittleEndian>()? as usize;
        expect_count("wire names", wire_count, name_count)?;
        let mut names = Vec::with_capacity(wire_count);
        for wire in 0..name_count {
            let len = reader.read_u32::<LittleEndian>()?;
            let bytes = read_bytes(reader, u64::from(len))?;
            let name = String::from_utf8(bytes).map_err(|_| FormatError::BadName { wire })?;
            names.push(if name.is_empty() { None } else { Some(name) });
        }

        let controlling_table = read_u32_table(reader)?;
        let gated_table = read_u32_table(reader)?;
        let side_a = read_u32_table(reader)?;
        let side_b = read_u32_table(reader)?;
        let gates = read_u32_table(reader)?;
        expect_count("transistor terminal A", transistor_count, side_a.len())?;
        expect_count("transistor terminal B", transistor_count, side_b.len())?;
        expect_count("transistor gate", transistor_count, gates.len())?;

        let mut controlling_pos = 0;
        let mut gated_pos = 0;
        let mut wires = Vec::with_capacity(wire_count);
        for (i, name) in names.into_iter().enumerate() {
            let controlling = read_segment(
                "controlling",
                &controlling_table,
                &mut controlling_pos,
                i,
                next_ctrl,
                transistor_count,
            )?;
            let gated = read_segment(
                "gated",
                &gated_table,
                &mut gated_pos,
                i,
                next_ctrl,
                transistor_count,
            )?;
            let pulled = Pulled::from_byte(pulled[i]).ok_or(FormatError::BadPulled {
                wire: i,
                value: pulled[i],
            })?;
            wires.push(Wire::new(i, name, controlling, gated, pulled));
        }
        expect_count("controlling", controlling_pos, controlling_table.len())?;
        expect_count("gated", gated_pos, gated_table.len())?;

        let mut transistors = Vec::with_capacity(transistor_count);
        for i in 0..transistor_count {
            let slots = [side_a[i], side_b[i], gates[i]];
            let absent = slots.iter().filter(|s| **s == no_wire).count();
            match absent {
                0 => transistors.push(Some(Transistor::new(
                    i,
                    slots[0] as usize,
                    slots[1] as usize,
                    slots[2] as usize,
                ))),
                3 => transistors.push(None),
                _ => return Err(FormatError::PartialTransistor(i)),
            }
        }

        let topology = Topology::from_parts(wires, transistors)?;
        debug!(
            wires = topology.wire_count(),
            transistors = topology.transistor_count(),
            vcc = topology.vcc,
            gnd = topology.gnd,
            "loaded circuit"
        );
        Ok(topology)
    }

    /// Writes the structure and pulled bias of every wire. Resolved states are not stored.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), FormatError> {
        writer.write_all(&FORMAT_MAGIC)?;
        writer.write_u16::<LittleEndian>(FORMAT_VERSION)?;
        writer.write_u32::<LittleEndian>(self.wires.len() as u32)?;
        writer.write_u32::<LittleEndian>(self.transistors.len() as u32)?;
        writer.write_u32::<LittleEndian>(NEXT_CTRL)?;
        writer.write_u32::<LittleEndian>(NO_WIRE)?;

        writer.write_u32::<LittleEndian>(self.wires.len() as u32)?;
        for wire in &self.wires {
            writer.write_u8(wire.pulled.to_byte())?;
        }

        writer.write_u32::<LittleEndian>(self.wires.len() as u32)?;
        for wire in &self.wires {
            let name = wire.name.as_deref().unwrap_or("");
            writer.write_u32::<LittleEndian>(name.len() as u32)?;
            writer.write_all(name.as_bytes())?;
        }

        let mut controlling_table = Vec::new();
        let mut gated_table = Vec::new();
        for wire in &self.wires {
            write_segment(&mut controlling_table, &wire.controlling);
            write_segment(&mut gated_table, &wire.gated);
        }
        write_u32_table(writer, &controlling_table)?;
        write_u32_table(writer, &gated_table)?;

        let slot = |f: fn(&Transistor) -> usize| {
            self.transistors
                .iter()
                .map(|t| t.as_ref().map_or(NO_WIRE, |t| f(t) as u32))
                .collect::<Vec<u32>>()
        };
        write_u32_table(writer, &slot(|t| t.terminal_a))?;
        write_u32_table(writer, &slot(|t| t.terminal_b))?;
        write_u32_table(writer, &slot(|t| t.gate))?;

        debug!(
            wires = self.wires.len(),
            transistors = self.transistors.len(),
            "saved circuit"
        );
        Ok(())
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    pub fn transistor_count(&self) -> usize {
        self.transistors.len()
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    pub fn wire(&self, index: usize) -> Option<&Wire> {
        self.wires.get(index)
    }

    pub fn transistors(&self) -> &[Option<Transistor>] {
        &self.transistors
    }

    pub fn transistor(&self, index: usize) -> Option<&Transistor> {
        self.transistors.get(index).and_then(Option::as_ref)
    }

    pub fn vcc(&self) -> usize {
        self.vcc
    }

    pub fn gnd(&self) -> usize {
        self.gnd
    }

    pub fn is_rail(&self, index: usize) -> bool {
        index == self.vcc || index == self.gnd
    }

    pub fn wire_index(&self, name: &str) -> Option<usize> {
        self.wire_index_by_name.get(name).copied()
    }

    /// Names `wires` as `prefix0`, `prefix1`, ... from least significant bit up.
    pub fn name_bus(&mut self, prefix: &str, wires: &[usize]) -> Result<(), UnknownWireError> {
        if let Some(bad) = wires.iter().find(|w| **w >= self.wires.len()) {
            return Err(UnknownWireError(format!("#{}", bad)));
        }
        for (bit, index) in wires.iter().enumerate() {
            let name = format!("{}{}", prefix, bit);
            if let Some(old) = self.wires[*index].name.take() {
                if self.wire_index_by_name.get(&old) == Some(index) {
                    self.wire_index_by_name.remove(&old);
                }
            }
            // A wire that already carried this name loses it
            if let Some(owner) = self.wire_index_by_name.insert(name.clone(), *index) {
                if owner != *index {
                    self.wires[owner].name = None;
                }
            }
            self.wires[*index].name = Some(name);
        }
        Ok(())
    }
}

/// Assembles synthetic circuits. `VCC` and `GND` are always wires 0 and 1.
#[derive(Default)]
pub struct TopologyBuilder {
    wires: Vec<(Option<String>, Pulled)>,
    transistors: Vec<(usize, usize, usize)>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        let mut builder = TopologyBuilder::default();
        builder.wire(VCC_NAME, Pulled::None);
        builder.wire(GND_NAME, Pulled::None);
        builder
    }

    pub fn vcc(&self) -> usize {
        0
    }

    pub fn gnd(&self) -> usize {
        1
    }

    pub fn wire(&mut self, name: &str, pulled: Pulled) -> usize {
        self.wires.push((Some(name.to_owned()), pulled));
        self.wires.len() - 1
    }

    pub fn unnamed_wire(&mut self, pulled: Pulled) -> usize {
        self.wires.push((None, pulled));
        self.wires.len() - 1
    }

    /// Adds a transistor switching `terminal_a` and `terminal_b` together while `gate` is high.
    pub fn transistor(&mut self, terminal_a: usize, terminal_b: usize, gate: usize) -> usize {
        self.transistors.push((terminal_a, terminal_b, gate));
        self.transistors.len() - 1
    }

    pub fn build(self) -> Result<Topology, FormatError> {
        let mut controlling = vec![Vec::new(); self.wires.len()];
        let mut gated = vec![Vec::new(); self.wires.len()];
        let mut transistors = Vec::with_capacity(self.transistors.len());
        for (i, (a, b, gate)) in self.transistors.into_iter().enumerate() {
            for wire in &[a, b, gate] {
                if *wire >= controlling.len() {
                    return Err(FormatError::WireOutOfRange {
                        transistor: i,
                        wire: *wire as u32,
                    });
                }
            }
            controlling[a].push(i);
            if b != a {
                controlling[b].push(i);
            }
            gated[gate].push(i);
            transistors.push(Some(Transistor::new(i, a, b, gate)));
        }

        let wires = self
            .wires
            .into_iter()
            .zip(controlling.into_iter().zip(gated))
            .enumerate()
            .map(|(i, ((name, pulled), (controlling, gated)))| {
                Wire::new(i, name, controlling, gated, pulled)
            })
            .collect();

        Topology::from_parts(wires, transistors)
    }
}

fn expect_count(table: &'static str, expected: usize, found: usize) -> Result<(), FormatError> {
    if expected == found {
        Ok(())
    } else {
        Err(FormatError::CountMismatch {
            table,
            expected,
            found,
        })
    }
}

/// Reads exactly `len` bytes. The buffer only grows with data actually present,
/// so a corrupt length prefix cannot force a huge allocation.
fn read_bytes<R: Read>(reader: &mut R, len: u64) -> Result<Vec<u8>, FormatError> {
    let mut bytes = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut bytes)?;
    if (bytes.len() as u64) < len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(bytes)
}

fn read_u32_table<R: Read>(reader: &mut R) -> Result<Vec<u32>, FormatError> {
    let len = reader.read_u32::<LittleEndian>()?;
    let bytes = read_bytes(reader, u64::from(len) * 4)?;
    let mut table = vec![0_u32; len as usize];
    LittleEndian::read_u32_into(&bytes, &mut table);
    Ok(table)
}

fn write_u32_table<W: Write>(writer: &mut W, table: &[u32]) -> Result<(), FormatError> {
    writer.write_u32::<LittleEndian>(table.len() as u32)?;
    for value in table {
        writer.write_u32::<LittleEndian>(*value)?;
    }
    Ok(())
}

fn write_segment(table: &mut Vec<u32>, transistors: &[usize]) {
    table.push(transistors.len() as u32);
    table.extend(transistors.iter().map(|t| *t as u32));
    table.push(NEXT_CTRL);
}

/// Reads one wire's `count, indices..., terminator` run starting at `pos`.
fn read_segment(
    table_name: &'static str,
    table: &[u32],
    pos: &mut usize,
    wire: usize,
    terminator: u32,
    transistor_count: usize,
) -> Result<Vec<usize>, FormatError> {
    let truncated = || FormatError::CountMismatch {
        table: table_name,
        expected: *pos + 1,
        found: table.len(),
    };
    let count = *table.get(*pos).ok_or_else(truncated)? as usize;
    let end = *pos + 1 + count;
    if end >= table.len() {
        return Err(FormatError::CountMismatch {
            table: table_name,
            expected: end + 1,
            found: table.len(),
        });
    }

    let mut segment = Vec::with_capacity(count);
    for t in &table[*pos + 1..end] {
        if *t as usize >= transistor_count {
            return Err(FormatError::TransistorOutOfRange {
                wire,
                transistor: *t,
            });
        }
        segment.push(*t as usize);
    }

    if table[end] != terminator {
        return Err(FormatError::MissingTerminator {
            table: table_name,
            wire,
            found: table[end],
        });
    }
    *pos = end + 1;
    Ok(segment)
}
