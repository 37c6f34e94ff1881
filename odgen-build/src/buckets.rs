//! Memory buckets
//!
//! Every generated variable lives in the structure of its memory type. The declarations and
//! initializers of a structure must line up, and the initializers of a combined group must be
//! contiguous and in ascending index order, no matter in which order the group members were
//! visited.
//!
//! A bucket therefore keeps one slot per declaration, in the order anchors (and ungrouped objects)
//! are visited. Each slot holds its initializers keyed by index, so a member is placed correctly
//! the moment it is inserted. Members visited before their anchor are parked until the anchor's
//! slot exists.
use std::collections::{BTreeMap, HashMap};

use odgen_common::objects::MemoryType;

#[derive(Debug)]
struct Slot {
    grouped: bool,
    initializers: BTreeMap<u16, String>,
}

/// Declarations and initializers of one memory type
#[derive(Debug, Default)]
pub struct MemoryBucket {
    declarations: Vec<String>,
    slots: Vec<Slot>,
    positions: HashMap<u16, usize>,
    pending: HashMap<u16, BTreeMap<u16, String>>,
}

impl MemoryBucket {
    /// Append the declaration and initializer of an ungrouped object or a group anchor
    pub fn push_anchor(
        &mut self,
        index: u16,
        grouped: bool,
        declaration: String,
        initializer: String,
    ) {
        let mut initializers = self.pending.remove(&index).unwrap_or_default();
        initializers.insert(index, initializer);

        self.positions.insert(index, self.slots.len());
        self.declarations.push(declaration);
        self.slots.push(Slot {
            grouped,
            initializers,
        });
    }

    /// Insert the initializer of a non-anchor group member into its group's slot
    pub fn insert_member(&mut self, anchor: u16, index: u16, initializer: String) {
        match self.positions.get(&anchor) {
            Some(&position) => {
                self.slots[position].initializers.insert(index, initializer);
            }
            None => {
                self.pending
                    .entry(anchor)
                    .or_default()
                    .insert(index, initializer);
            }
        }
    }

    /// The declarations, in visitation order of their anchors
    pub fn declarations(&self) -> &[String] {
        &self.declarations
    }

    /// Object indices of the initializers, in the order they are rendered
    pub fn initializer_indices(&self) -> Vec<u16> {
        self.slots
            .iter()
            .flat_map(|slot| slot.initializers.keys().copied())
            .collect()
    }

    /// Render the initializer lines
    ///
    /// Each line is `/*<index>*/` followed by the value; the values of a group are wrapped in one
    /// pair of braces spanning the first and the last member.
    pub fn initializer_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for slot in &self.slots {
            let last = slot.initializers.len().saturating_sub(1);
            for (i, (index, value)) in slot.initializers.iter().enumerate() {
                let open = if slot.grouped && i == 0 { "{" } else { " " };
                let close = if slot.grouped && i == last { "}" } else { "" };
                lines.push(format!("/*{index:04X}*/{open}{value}{close},"));
            }
        }
        lines
    }
}

/// One memory bucket per memory type
#[derive(Debug, Default)]
pub struct MemoryBuckets {
    ram: MemoryBucket,
    eeprom: MemoryBucket,
    rom: MemoryBucket,
}

impl MemoryBuckets {
    /// Get the bucket of a memory type
    pub fn get(&self, memory_type: MemoryType) -> &MemoryBucket {
        match memory_type {
            MemoryType::Ram => &self.ram,
            MemoryType::Eeprom => &self.eeprom,
            MemoryType::Rom => &self.rom,
        }
    }

    /// Get the bucket of a memory type for insertion
    pub fn get_mut(&mut self, memory_type: MemoryType) -> &mut MemoryBucket {
        match memory_type {
            MemoryType::Ram => &mut self.ram,
            MemoryType::Eeprom => &mut self.eeprom,
            MemoryType::Rom => &mut self.rom,
        }
    }
}
