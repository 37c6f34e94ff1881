//! Non-fatal diagnostics
//!
//! Every problem found in a device description while compiling it is recorded as a [`Diagnostic`]
//! and generation continues with a substitute (a zero value, the anchor's attributes, a skipped
//! alias). The diagnostics of a run are handed back as one batch once all artifacts exist.
use core::fmt;

use odgen_common::objects::DataType;
use snafu::Snafu;

/// A field which all members of a combined group must agree on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupField {
    /// The human readable object name
    Name,
    /// Var, array or record
    ObjectType,
    /// Number of sub-objects
    SubNumber,
    /// RAM, EEPROM or ROM
    MemoryType,
    /// Data type of a var or of the array elements
    DataType,
    /// Access type of a var or of the array elements
    AccessType,
    /// PDO mapping of a var or of the array elements
    PdoMapping,
    /// Storage size derived from the default value of a var
    DefaultValueSize,
    /// Largest storage size derived from the default values of array elements
    ElementSize,
    /// Declared type of every record field
    RecordFieldTypes,
    /// Attribute byte of every record field
    RecordFieldAttributes,
}

impl fmt::Display for GroupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GroupField::Name => "Name",
            GroupField::ObjectType => "Object Type",
            GroupField::SubNumber => "Sub Number",
            GroupField::MemoryType => "Memory Type",
            GroupField::DataType => "Data Type",
            GroupField::AccessType => "Access Type",
            GroupField::PdoMapping => "PDO Mapping",
            GroupField::DefaultValueSize => "Length of Default value",
            GroupField::ElementSize => "Default Value Memory Size",
            GroupField::RecordFieldTypes => "Data Type on all SubObjects",
            GroupField::RecordFieldAttributes => "Access Type and PDO mapping on all SubObjects",
        })
    }
}

fn sub_suffix(sub: &Option<u8>) -> String {
    sub.map(|s| format!(", {s:02X}")).unwrap_or_default()
}

/// A recoverable problem found while compiling
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Diagnostic {
    /// Two objects resolve to the same generated storage name
    #[snafu(display("Error in object {index:04X}: Duplicate Name! ({name} is already used)"))]
    DuplicateName {
        /// Index of the object with the repeated name
        index: u16,
        /// The generated storage name
        name: String,
    },
    /// A combined group member disagrees with its anchor
    #[snafu(display(
        "Error in object {index:04X}: This object is combined with object {anchor:04X} into Array. {field} of both objects must be the same!"
    ))]
    CombinedGroupMismatch {
        /// Index of the disagreeing member
        index: u16,
        /// Index of the group anchor
        anchor: u16,
        /// The field which differs
        field: GroupField,
    },
    /// A sub-object's sub index does not match its position
    #[snafu(display(
        "Error in object {index:04X}: Wrong SubObjects! (sub-object at position {position} has sub index {sub_index:02X})"
    ))]
    InvalidSubIndexSequence {
        /// Index of the object
        index: u16,
        /// Position of the sub-object in the declaration
        position: usize,
        /// The declared sub index
        sub_index: u8,
    },
    /// Two fields of a record resolve to the same generated name
    #[snafu(display(
        "Error in object {index:04X}: Each SubObject must have unique name! ({name} is repeated)"
    ))]
    DuplicateSubName {
        /// Index of the record
        index: u16,
        /// The repeated field name
        name: String,
    },
    /// A default value fails validation for its data type
    #[snafu(display(
        "Error in object {index:04X}{}: Invalid Default value! ({value:?} is not a valid {data_type})",
        sub_suffix(sub)
    ))]
    InvalidDefaultValue {
        /// Index of the object
        index: u16,
        /// Sub index, for sub-objects
        sub: Option<u8>,
        /// Declared data type
        data_type: DataType,
        /// The raw default value
        value: String,
    },
    /// An index appears more than once among the enabled objects; repeats are skipped
    #[snafu(display("Error in object {index:04X}: Index is defined more than once!"))]
    DuplicateIndex {
        /// The repeated index
        index: u16,
    },
    /// Array elements disagree on their access type or PDO mapping
    #[snafu(display(
        "Error in object {index:04X}: Access Type and PDO mapping must be the same on all SubObjects!"
    ))]
    InconsistentSubAttributes {
        /// Index of the array
        index: u16,
    },
    /// A combined group member whose anchor object is missing or disabled
    #[snafu(display(
        "Error in object {index:04X}: This object is combined with object {anchor:04X}, which does not exist or is disabled. It is generated on its own."
    ))]
    MissingGroupAnchor {
        /// Index of the member
        index: u16,
        /// Index of the missing anchor
        anchor: u16,
    },
}

impl Diagnostic {
    /// Index of the object which triggered the diagnostic
    pub fn index(&self) -> u16 {
        match self {
            Diagnostic::DuplicateName { index, .. }
            | Diagnostic::CombinedGroupMismatch { index, .. }
            | Diagnostic::InvalidSubIndexSequence { index, .. }
            | Diagnostic::DuplicateSubName { index, .. }
            | Diagnostic::InvalidDefaultValue { index, .. }
            | Diagnostic::DuplicateIndex { index }
            | Diagnostic::InconsistentSubAttributes { index }
            | Diagnostic::MissingGroupAnchor { index, .. } => *index,
        }
    }
}

/// Append-only collector of the diagnostics of one compilation run
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Record a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::warn!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    /// The diagnostics recorded so far, in the order they were found
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Consume the collector, returning the recorded diagnostics
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
