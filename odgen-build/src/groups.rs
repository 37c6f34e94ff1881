//! Combined groups
//!
//! A combined group is a set of objects at different indices which are generated as one C array,
//! e.g. the communication parameters of all RPDOs. The group is keyed by its anchor: the first
//! index of the range, which also provides the declaration and the attributes every other member
//! has to share.
use std::collections::{BTreeMap, HashMap};

use odgen_common::objects::{AccessType, DataType, MemoryType, ObjectCode, PdoMapping};

use crate::diagnostics::GroupField;

/// Position of an object inside its combined group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    /// Index of the group anchor
    pub anchor: u16,
    /// Array slot occupied by the object
    pub slot: usize,
}

/// Table of all combined groups of a compilation run
#[derive(Debug, Default)]
pub struct GroupTable {
    members: HashMap<u16, Membership>,
    counts: BTreeMap<u16, usize>,
}

impl GroupTable {
    /// Register a group with its member indices, in slot order
    ///
    /// The first index is the anchor. An index which already belongs to a group keeps its first
    /// registration and is left out, so the group only counts the indices it actually holds. A
    /// range whose anchor is already taken is ignored altogether.
    pub fn register(&mut self, indices: &[u16]) {
        let Some(&anchor) = indices.first() else {
            return;
        };
        if let Some(existing) = self.members.get(&anchor) {
            log::warn!(
                "Object {anchor:04X} is already combined with object {:04X}; ignoring range starting there",
                existing.anchor
            );
            return;
        }
        // Slots stay contiguous when members are skipped
        let mut slot = 0;
        for &index in indices {
            if let Some(existing) = self.members.get(&index) {
                log::warn!(
                    "Object {index:04X} is already combined with object {:04X}; leaving it out of the range starting at {anchor:04X}",
                    existing.anchor
                );
                continue;
            }
            self.members.insert(index, Membership { anchor, slot });
            slot += 1;
        }
        self.counts.insert(anchor, slot);
    }

    /// Group membership of an index, if it belongs to a group
    pub fn membership(&self, index: u16) -> Option<Membership> {
        self.members.get(&index).copied()
    }

    /// Number of members of the group anchored at `anchor`
    pub fn count(&self, anchor: u16) -> Option<usize> {
        self.counts.get(&anchor).copied()
    }

    /// Anchor indices of all groups, ascending
    pub fn anchors(&self) -> impl Iterator<Item = u16> + '_ {
        self.counts.keys().copied()
    }
}

/// The layout related attributes of a var or array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueLayout {
    /// Data type of the var, or of the array elements
    pub data_type: DataType,
    /// Access type of the var, or of the array elements
    pub access_type: AccessType,
    /// PDO mapping of the var, or of the array elements
    pub pdo_mapping: PdoMapping,
    /// Storage size of the var, or the largest element size
    pub size: Option<usize>,
}

/// Kind specific attributes shared by all members of a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedLayout {
    /// Attributes of a var
    Var(ValueLayout),
    /// Attributes of an array
    Array(ValueLayout),
    /// Declared field types and attribute bytes of a record
    Record {
        /// The declaration of every field
        fields: Vec<String>,
        /// The attribute byte of every field
        attributes: Vec<u8>,
    },
}

/// Everything the members of a combined group have to agree on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedAttributes {
    /// Human readable name
    pub name: String,
    /// Object kind
    pub object_code: ObjectCode,
    /// Number of sub-objects
    pub sub_number: usize,
    /// Memory the group is stored in
    pub memory_type: MemoryType,
    /// Kind specific layout
    pub layout: SharedLayout,
}

impl SharedAttributes {
    /// List the fields in which `member` differs from `self`, the anchor
    pub fn mismatches(&self, member: &SharedAttributes) -> Vec<GroupField> {
        let mut fields = Vec::new();
        if self.name != member.name {
            fields.push(GroupField::Name);
        }
        if self.object_code != member.object_code {
            fields.push(GroupField::ObjectType);
        }
        if self.sub_number != member.sub_number {
            fields.push(GroupField::SubNumber);
        }
        if self.memory_type != member.memory_type {
            fields.push(GroupField::MemoryType);
        }

        match (&self.layout, &member.layout) {
            (SharedLayout::Var(a), SharedLayout::Var(b)) => {
                fields.extend(value_mismatches(a, b, GroupField::DefaultValueSize));
            }
            (SharedLayout::Array(a), SharedLayout::Array(b)) => {
                fields.extend(value_mismatches(a, b, GroupField::ElementSize));
            }
            (
                SharedLayout::Record {
                    fields: a_fields,
                    attributes: a_attrs,
                },
                SharedLayout::Record {
                    fields: b_fields,
                    attributes: b_attrs,
                },
            ) => {
                if a_fields != b_fields {
                    fields.push(GroupField::RecordFieldTypes);
                }
                if a_attrs != b_attrs {
                    fields.push(GroupField::RecordFieldAttributes);
                }
            }
            // Differing kinds are already reported as an object type mismatch
            _ => (),
        }
        fields
    }
}

fn value_mismatches(a: &ValueLayout, b: &ValueLayout, size_field: GroupField) -> Vec<GroupField> {
    let mut fields = Vec::new();
    if a.data_type != b.data_type {
        fields.push(GroupField::DataType);
    }
    if a.access_type != b.access_type {
        fields.push(GroupField::AccessType);
    }
    if a.pdo_mapping != b.pdo_mapping {
        fields.push(GroupField::PdoMapping);
    }
    if a.size != b.size {
        fields.push(size_field);
    }
    fields
}
