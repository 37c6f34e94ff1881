//! Object Definitions
//!
//! Enumerations describing CANopen objects: their kind, where their storage lives, how they can be
//! accessed and which data type they hold. All of them can be read from a device description
//! file, and all of them know the text used for them in generated artifacts.
use core::fmt;
use core::str::FromStr;

use serde::de::Error as _;
use serde::Deserialize;

/// Object Code value
///
/// Defines the kind of an object in the dictionary
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectCode {
    /// An object holding a single value
    #[default]
    Var = 7,
    /// An array of sub-objects all with the same data type
    Array = 8,
    /// A collection of sub-objects with varying types
    Record = 9,
}

impl ObjectCode {
    /// The numeric object code, as written in EDS and XDD files
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

/// Access type enum
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// Read-only
    #[default]
    Ro,
    /// Write-only
    Wo,
    /// Read-write
    Rw,
    /// Read-only, and also will never be changed, even internally by the device
    Const,
}

impl AccessType {
    /// Returns true if an object with this access type can be read
    pub fn is_readable(&self) -> bool {
        matches!(self, AccessType::Ro | AccessType::Rw | AccessType::Const)
    }

    /// Returns true if an object with this access type can be written
    pub fn is_writable(&self) -> bool {
        matches!(self, AccessType::Rw | AccessType::Wo)
    }

    /// The lower case name used in device description files
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Ro => "ro",
            AccessType::Wo => "wo",
            AccessType::Rw => "rw",
            AccessType::Const => "const",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ro" => Ok(AccessType::Ro),
            "wo" => Ok(AccessType::Wo),
            "rw" => Ok(AccessType::Rw),
            "const" => Ok(AccessType::Const),
            _ => Err(format!(
                "Invalid access type: {s} (allowed: 'ro', 'rw', 'wo', or 'const')"
            )),
        }
    }
}

impl<'de> Deserialize<'de> for AccessType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Possible PDO mapping values for an object
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PdoMapping {
    /// Object cannot be mapped to PDOs
    #[default]
    No,
    /// Object can be mapped to both RPDOs and TPDOs
    Optional,
    /// Object can be mapped to RPDOs only
    Rpdo,
    /// Object can be mapped to TPDOs only
    Tpdo,
}

impl PdoMapping {
    /// Can be mapped to an RPDO
    pub fn supports_rpdo(&self) -> bool {
        matches!(self, PdoMapping::Optional | PdoMapping::Rpdo)
    }

    /// Can be mapped to a TPDO
    pub fn supports_tpdo(&self) -> bool {
        matches!(self, PdoMapping::Optional | PdoMapping::Tpdo)
    }

    /// Can be mapped to any PDO
    pub fn is_mappable(&self) -> bool {
        !matches!(self, PdoMapping::No)
    }

    /// The name used in device description and XDD files
    pub fn as_str(&self) -> &'static str {
        match self {
            PdoMapping::No => "no",
            PdoMapping::Optional => "optional",
            PdoMapping::Rpdo => "RPDO",
            PdoMapping::Tpdo => "TPDO",
        }
    }
}

impl fmt::Display for PdoMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PdoMapping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "no" | "none" => Ok(PdoMapping::No),
            "optional" | "both" => Ok(PdoMapping::Optional),
            "rpdo" => Ok(PdoMapping::Rpdo),
            "tpdo" => Ok(PdoMapping::Tpdo),
            _ => Err(format!(
                "Invalid PDO mapping: {s} (allowed: 'no', 'optional', 'RPDO' or 'TPDO')"
            )),
        }
    }
}

impl<'de> Deserialize<'de> for PdoMapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// The memory section a variable is stored in on the device
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryType {
    /// Volatile storage, initialized at startup
    #[default]
    Ram,
    /// Non-volatile storage, preserved across power cycles
    Eeprom,
    /// Constant storage in program memory
    Rom,
}

impl MemoryType {
    /// The two bit memory code stored in the low bits of an object attribute
    pub fn code(&self) -> u8 {
        match self {
            MemoryType::Rom => 0x01,
            MemoryType::Ram => 0x02,
            MemoryType::Eeprom => 0x03,
        }
    }

    /// The upper case name, used for structure names in generated code
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Ram => "RAM",
            MemoryType::Eeprom => "EEPROM",
            MemoryType::Rom => "ROM",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RAM" => Ok(MemoryType::Ram),
            "EEPROM" => Ok(MemoryType::Eeprom),
            "ROM" => Ok(MemoryType::Rom),
            _ => Err(format!(
                "Invalid memory type: {s} (allowed: 'RAM', 'EEPROM' or 'ROM')"
            )),
        }
    }
}

impl<'de> Deserialize<'de> for MemoryType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Indicate the type of data stored in an object
///
/// Codes which are not part of the standard set are kept as [`DataType::Other`], and flow through
/// generation without validation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum DataType {
    Boolean,
    Integer8,
    Integer16,
    Integer24,
    Integer32,
    Integer40,
    Integer48,
    Integer56,
    Integer64,
    #[default]
    Unsigned8,
    Unsigned16,
    Unsigned24,
    Unsigned32,
    Unsigned40,
    Unsigned48,
    Unsigned56,
    Unsigned64,
    Real32,
    Real64,
    VisibleString,
    OctetString,
    UnicodeString,
    TimeOfDay,
    TimeDifference,
    Domain,
    Other(u8),
}

impl From<u8> for DataType {
    fn from(value: u8) -> Self {
        use DataType::*;
        match value {
            0x01 => Boolean,
            0x02 => Integer8,
            0x03 => Integer16,
            0x04 => Integer32,
            0x05 => Unsigned8,
            0x06 => Unsigned16,
            0x07 => Unsigned32,
            0x08 => Real32,
            0x09 => VisibleString,
            0x0A => OctetString,
            0x0B => UnicodeString,
            0x0C => TimeOfDay,
            0x0D => TimeDifference,
            0x0F => Domain,
            0x10 => Integer24,
            0x11 => Real64,
            0x12 => Integer40,
            0x13 => Integer48,
            0x14 => Integer56,
            0x15 => Integer64,
            0x16 => Unsigned24,
            0x18 => Unsigned40,
            0x19 => Unsigned48,
            0x1A => Unsigned56,
            0x1B => Unsigned64,
            _ => Other(value),
        }
    }
}

impl DataType {
    /// The CANopen data type code
    pub fn code(&self) -> u8 {
        use DataType::*;
        match self {
            Boolean => 0x01,
            Integer8 => 0x02,
            Integer16 => 0x03,
            Integer32 => 0x04,
            Unsigned8 => 0x05,
            Unsigned16 => 0x06,
            Unsigned32 => 0x07,
            Real32 => 0x08,
            VisibleString => 0x09,
            OctetString => 0x0A,
            UnicodeString => 0x0B,
            TimeOfDay => 0x0C,
            TimeDifference => 0x0D,
            Domain => 0x0F,
            Integer24 => 0x10,
            Real64 => 0x11,
            Integer40 => 0x12,
            Integer48 => 0x13,
            Integer56 => 0x14,
            Integer64 => 0x15,
            Unsigned24 => 0x16,
            Unsigned40 => 0x18,
            Unsigned48 => 0x19,
            Unsigned56 => 0x1A,
            Unsigned64 => 0x1B,
            Other(code) => *code,
        }
    }

    /// The CANopen name of the type, which is also the C type name used by the stack
    ///
    /// Returns None for non-standard codes.
    pub fn name(&self) -> Option<&'static str> {
        use DataType::*;
        Some(match self {
            Boolean => "BOOLEAN",
            Integer8 => "INTEGER8",
            Integer16 => "INTEGER16",
            Integer24 => "INTEGER24",
            Integer32 => "INTEGER32",
            Integer40 => "INTEGER40",
            Integer48 => "INTEGER48",
            Integer56 => "INTEGER56",
            Integer64 => "INTEGER64",
            Unsigned8 => "UNSIGNED8",
            Unsigned16 => "UNSIGNED16",
            Unsigned24 => "UNSIGNED24",
            Unsigned32 => "UNSIGNED32",
            Unsigned40 => "UNSIGNED40",
            Unsigned48 => "UNSIGNED48",
            Unsigned56 => "UNSIGNED56",
            Unsigned64 => "UNSIGNED64",
            Real32 => "REAL32",
            Real64 => "REAL64",
            VisibleString => "VISIBLE_STRING",
            OctetString => "OCTET_STRING",
            UnicodeString => "UNICODE_STRING",
            TimeOfDay => "TIME_OF_DAY",
            TimeDifference => "TIME_DIFFERENCE",
            Domain => "DOMAIN",
            Other(_) => return None,
        })
    }

    /// Returns true if data type is one of the string types
    pub fn is_str(&self) -> bool {
        matches!(
            self,
            Self::VisibleString | Self::OctetString | Self::UnicodeString
        )
    }
}

impl fmt::Display for DataType {
    /// Writes the CANopen name, or the hex code for non-standard types
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.code()),
        }
    }
}

impl FromStr for DataType {
    type Err = String;

    /// Parse a data type from its CANopen name, a short alias, or its code in hex
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let by_name = match lower.replace('_', "").as_str() {
            "boolean" | "bool" => Some(DataType::Boolean),
            "integer8" | "int8" => Some(DataType::Integer8),
            "integer16" | "int16" => Some(DataType::Integer16),
            "integer24" | "int24" => Some(DataType::Integer24),
            "integer32" | "int32" => Some(DataType::Integer32),
            "integer40" | "int40" => Some(DataType::Integer40),
            "integer48" | "int48" => Some(DataType::Integer48),
            "integer56" | "int56" => Some(DataType::Integer56),
            "integer64" | "int64" => Some(DataType::Integer64),
            "unsigned8" | "uint8" => Some(DataType::Unsigned8),
            "unsigned16" | "uint16" => Some(DataType::Unsigned16),
            "unsigned24" | "uint24" => Some(DataType::Unsigned24),
            "unsigned32" | "uint32" => Some(DataType::Unsigned32),
            "unsigned40" | "uint40" => Some(DataType::Unsigned40),
            "unsigned48" | "uint48" => Some(DataType::Unsigned48),
            "unsigned56" | "uint56" => Some(DataType::Unsigned56),
            "unsigned64" | "uint64" => Some(DataType::Unsigned64),
            "real32" | "float32" => Some(DataType::Real32),
            "real64" | "float64" => Some(DataType::Real64),
            "visiblestring" => Some(DataType::VisibleString),
            "octetstring" => Some(DataType::OctetString),
            "unicodestring" => Some(DataType::UnicodeString),
            "timeofday" => Some(DataType::TimeOfDay),
            "timedifference" => Some(DataType::TimeDifference),
            "domain" => Some(DataType::Domain),
            _ => None,
        };
        if let Some(data_type) = by_name {
            return Ok(data_type);
        }

        let digits = lower.strip_prefix("0x").unwrap_or(&lower);
        u8::from_str_radix(digits, 16)
            .map(DataType::from)
            .map_err(|_| format!("Invalid data type: {s}"))
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u8),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Ok(DataType::from(code)),
            Repr::Text(s) => s.parse().map_err(D::Error::custom),
        }
    }
}
