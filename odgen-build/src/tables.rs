//! Intermediate tables
//!
//! Everything the emitters need is collected here by the object analyzer and the code generator.
//! The emitters only format these tables; they make no decisions of their own.
use std::collections::BTreeMap;

use odgen_common::device_description::Label;
use odgen_common::objects::{AccessType, DataType, MemoryType, ObjectCode, PdoMapping};

use crate::buckets::MemoryBuckets;

/// Prototype of the default SDO server access function
pub const DEFAULT_ACCESS_FUNCTION: &str = "CO_ODF";

/// Format the prototype of an access function with the given name
pub fn access_function_prototype(name: &str) -> String {
    format!(
        "UNSIGNED32 {name}(void*, UNSIGNED16, UNSIGNED8, UNSIGNED16*, UNSIGNED16, UNSIGNED8, void*, const void*);\n"
    )
}

/// The C code tables generated for the object dictionary
#[derive(Debug)]
pub struct OdTables {
    /// Lines of the record type definitions
    pub typedefs: Vec<String>,
    /// Declarations and initializers per memory type
    pub buckets: MemoryBuckets,
    /// Lines of the alias macros
    pub aliases: Vec<String>,
    /// Lines of the record descriptor tables
    pub records: Vec<String>,
    /// Access function prototypes and generated bodies
    pub functions: Vec<String>,
    /// Dictionary entry rows, keyed by index
    pub entries: BTreeMap<u16, String>,
    /// Normalized description of every generated object, in visitation order
    pub sheets: Vec<ObjectSheet>,
}

impl Default for OdTables {
    fn default() -> Self {
        Self {
            typedefs: Vec::new(),
            buckets: MemoryBuckets::default(),
            aliases: Vec::new(),
            records: Vec::new(),
            functions: vec![access_function_prototype(DEFAULT_ACCESS_FUNCTION)],
            entries: BTreeMap::new(),
            sheets: Vec::new(),
        }
    }
}

/// Attributes of one value of an object: a var, or a sub-object
#[derive(Debug, Clone, PartialEq)]
pub struct SheetEntry {
    /// Sub index; 0 for a var
    pub sub_index: u8,
    /// Human readable name
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// Access type
    pub access_type: AccessType,
    /// PDO mapping
    pub pdo_mapping: PdoMapping,
    /// Change of state detection for TPDOs
    pub tpdo_detect_cos: bool,
    /// Raw default value
    pub default_value: String,
    /// Raw actual value
    pub actual_value: String,
}

/// How the SDO server accesses an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetAccess {
    /// The default access function
    Default,
    /// An external function, by name
    External(String),
    /// A generated wrapper around user code; holds the complete function
    Injected(String),
}

/// Normalized description of an object, used by the EDS, XDD and documentation emitters
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSheet {
    /// Object index
    pub index: u16,
    /// Human readable name
    pub name: String,
    /// Object kind
    pub object_code: ObjectCode,
    /// Memory type of the object
    pub memory_type: MemoryType,
    /// Attributes of a var, or the common attributes of array elements
    pub value: Option<SheetEntry>,
    /// Sub-objects; array elements carry the array's data type, access type and PDO mapping
    pub subs: Vec<SheetEntry>,
    /// SDO access of the object
    pub access: SheetAccess,
    /// Localized labels and descriptions
    pub labels: Vec<Label>,
}
