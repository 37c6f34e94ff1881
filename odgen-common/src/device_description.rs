//! Device description file
//!
//! A [`DeviceDescription`] is the input of the object dictionary compiler. It lists the identity of
//! the device, the communication features it enables, and every object in its object dictionary.
//! It is usually created from a TOML file, but can just as well be built in code.
//!
//! # An example TOML file
//!
//! ```toml
//! [file]
//! file_name = "demo.toml"
//! file_version = "1"
//! file_creator = "jane"
//!
//! [identity]
//! vendor_name = "ACME"
//! vendor_id = 0x1234
//! product_name = "Demo IO"
//!
//! [[features]]
//! name = "RPDO"
//! value = 4
//! [[features.associated_objects]]
//! index = 0x1400
//! index_max = 0x15FF
//! index_step = 1
//!
//! [[objects]]
//! index = 0x1018
//! name = "Identity"
//! object_type = "record"
//! memory_type = "ROM"
//! [[objects.subs]]
//! sub_index = 0
//! name = "max sub-index"
//! data_type = "UNSIGNED8"
//! default_value = "1"
//! [[objects.subs]]
//! sub_index = 1
//! name = "Vendor-ID"
//! data_type = "UNSIGNED32"
//! default_value = "0x1234"
//!
//! [[objects]]
//! index = 0x2100
//! name = "Error Status Bits"
//! object_type = "var"
//! data_type = "OCTET_STRING"
//! access_type = "ro"
//! pdo_mapping = "optional"
//! default_value = "00 00 00 00"
//! ```
//!
//! # Values
//!
//! Default and actual values are kept as raw text. They may be written either as TOML strings
//! (which can carry the `$NODEID+` prefix) or as numbers, which are converted to decimal text. It is
//! up to the compiler to validate them against the declared data type.
//!
//! # Combined objects
//!
//! Features may associate a range of object indices (e.g. one communication parameter object per
//! RPDO). The objects in such a range are combined into a single generated array, and so they are
//! expected to share name, kind and layout.
use std::collections::HashMap;

use crate::objects::{AccessType, DataType, MemoryType, ObjectCode, PdoMapping};
use serde::Deserialize;

use snafu::ResultExt as _;
use snafu::Snafu;

/// Error returned when loading a device description fails
#[derive(Debug, Snafu)]
pub enum LoadError {
    /// An IO error occured while reading the file
    #[snafu(display("IO error: {source}"))]
    Io {
        /// The underlying IO error
        source: std::io::Error,
    },
    /// An error occured in the TOML parser
    #[snafu(display("Toml parse error: {source}"))]
    TomlParsing {
        /// The toml error which led to this error
        source: toml::de::Error,
    },
    /// Multiple objects defined with same index
    #[snafu(display("Multiple definitions for object with index 0x{id:x}"))]
    DuplicateObjectIds {
        /// index which was defined multiple times
        id: u16,
    },
}

/// Standard CAN bit rates, in kbit/s
pub const STANDARD_BAUD_RATES: [u16; 8] = [10, 20, 50, 125, 250, 500, 800, 1000];

fn default_baud_rates() -> Vec<u16> {
    STANDARD_BAUD_RATES.to_vec()
}

fn default_baud_rate() -> u16 {
    125
}

fn default_dummy_usage() -> Vec<DataType> {
    (0x02..=0x07).map(DataType::from).collect()
}

/// Accept a string, integer, float or bool and keep it as text
fn deserialize_value_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ValueText {
        Integer(i64),
        Float(f64),
        Bool(bool),
        String(String),
    }

    Ok(match ValueText::deserialize(deserializer)? {
        ValueText::Integer(i) => i.to_string(),
        ValueText::Float(f) => f.to_string(),
        ValueText::Bool(b) => b.to_string(),
        ValueText::String(s) => s,
    })
}

/// Information about the description file itself
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
#[allow(missing_docs)]
pub struct FileInfo {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_version: String,
    #[serde(default)]
    pub file_creation_time: String,
    #[serde(default)]
    pub file_creation_date: String,
    #[serde(default)]
    pub file_creator: String,
}

/// A localized label with an optional longer description
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Label {
    /// Language code, e.g. "en"
    pub lang: String,
    /// Short label text
    #[serde(default)]
    pub label: String,
    /// Longer description text; may span multiple lines
    #[serde(default)]
    pub description: String,
    /// Optional link to further information
    #[serde(default)]
    pub uri: Option<String>,
}

/// A version entry in the device identity
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Version {
    /// The kind of version, e.g. "SW" or "HW"
    pub version_type: String,
    /// The version text
    #[serde(deserialize_with = "deserialize_value_text")]
    pub value: String,
}

/// Identity of the device
///
/// All fields are optional, and are passed through to the generated artifacts as text.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
#[allow(missing_docs)]
pub struct DeviceIdentity {
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default, deserialize_with = "deserialize_value_text")]
    pub vendor_id: String,
    #[serde(default)]
    pub vendor_text: Vec<Label>,
    #[serde(default)]
    pub device_family: Vec<Label>,
    #[serde(default)]
    pub product_family: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default, deserialize_with = "deserialize_value_text")]
    pub product_id: String,
    #[serde(default)]
    pub product_text: Vec<Label>,
    #[serde(default)]
    pub order_numbers: Vec<String>,
    #[serde(default)]
    pub versions: Vec<Version>,
    #[serde(default)]
    pub build_date: String,
    #[serde(default)]
    pub specification_revision: String,
    #[serde(default)]
    pub instance_name: String,
}

/// Reference from a feature to the object(s) implementing it
#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AssociatedObjectRef {
    /// The object index, or the first index of a range
    pub index: u16,
    /// Inclusive upper bound of an index range
    #[serde(default)]
    pub index_max: Option<u16>,
    /// Distance between consecutive indices of a range. Values below 1 are treated as 1.
    #[serde(default)]
    pub index_step: Option<i32>,
}

/// An optional communication feature of the device, e.g. the number of RPDOs
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Feature {
    /// Feature name, e.g. "RPDO"
    pub name: String,
    /// Number of enabled instances of the feature; zero disables it
    #[serde(default)]
    pub value: u32,
    /// The objects belonging to the feature
    #[serde(default)]
    pub associated_objects: Vec<AssociatedObjectRef>,
    /// Localized labels and descriptions
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// Defines a sub-object of an array or record
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SubObject {
    /// Sub index for the sub-object being defined
    pub sub_index: u8,
    /// A human readable name for the value stored in this sub-object
    #[serde(default)]
    pub name: String,
    /// The data type of the sub object
    #[serde(default)]
    pub data_type: DataType,
    /// Access permissions for the sub object
    #[serde(default)]
    pub access_type: AccessType,
    /// Indicates whether this sub object can be mapped to PDOs
    #[serde(default)]
    pub pdo_mapping: PdoMapping,
    /// A change of this value triggers transmission of TPDOs it is mapped to
    #[serde(default)]
    pub tpdo_detect_cos: bool,
    /// The default value, as raw text
    #[serde(default, deserialize_with = "deserialize_value_text")]
    pub default_value: String,
    /// The actual value, as raw text. Used for documentation only.
    #[serde(default, deserialize_with = "deserialize_value_text")]
    pub actual_value: String,
}

/// Descriptor for a var object
#[derive(Default, Deserialize, Debug, Clone, PartialEq)]
pub struct VarDefinition {
    /// Indicates the type of data stored in the object
    pub data_type: DataType,
    /// Indicates how this object can be accessed
    #[serde(default)]
    pub access_type: AccessType,
    /// Determines which if type of PDO this object can me mapped to
    #[serde(default)]
    pub pdo_mapping: PdoMapping,
    /// A change of this value triggers transmission of TPDOs it is mapped to
    #[serde(default)]
    pub tpdo_detect_cos: bool,
    /// The default value for this object, as raw text
    #[serde(default, deserialize_with = "deserialize_value_text")]
    pub default_value: String,
    /// The actual value, as raw text. Used for documentation only.
    #[serde(default, deserialize_with = "deserialize_value_text")]
    pub actual_value: String,
}

/// Descriptor for an array object
///
/// Sub-object 0 holds the number of elements. Every following sub-object is an element of the
/// array, and shares the array's data type, access type and PDO mapping.
#[derive(Default, Deserialize, Debug, Clone, PartialEq)]
pub struct ArrayDefinition {
    /// The datatype of array elements
    pub data_type: DataType,
    /// Access type for all array elements
    #[serde(default)]
    pub access_type: AccessType,
    /// Whether elements in this array can be mapped to PDOs
    #[serde(default)]
    pub pdo_mapping: PdoMapping,
    /// A change of an element triggers transmission of TPDOs it is mapped to
    #[serde(default)]
    pub tpdo_detect_cos: bool,
    /// Sub object definitions, starting with sub-object 0
    #[serde(default)]
    pub subs: Vec<SubObject>,
}

/// Descriptor for a record object
#[derive(Default, Deserialize, Debug, Clone, PartialEq)]
pub struct RecordDefinition {
    /// The sub object definitions for this record object
    #[serde(default)]
    pub subs: Vec<SubObject>,
}

/// An enum representing the different kinds of objects which can be defined in a description
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "object_type", rename_all = "lowercase")]
pub enum ObjectKind {
    /// A var object is just a single value
    Var(VarDefinition),
    /// An array object is an array of values, all with the same type
    Array(ArrayDefinition),
    /// A record is a collection of sub objects all with different types
    Record(RecordDefinition),
}

/// How the SDO server accesses an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOverride<'a> {
    /// The default access function of the stack
    Default,
    /// An access function implemented elsewhere in the application
    External(&'a str),
    /// User code injected before and after the default access function
    Injected {
        /// Code run before the default access
        pre: &'a str,
        /// Code run after the default access
        post: &'a str,
    },
}

/// Descriptor for an object in the object dictionary
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CanOpenObject {
    /// The index of the object
    pub index: u16,
    /// A human readable name to describe the contents of the object
    #[serde(default)]
    pub name: String,
    /// Where the storage for this object lives
    #[serde(default)]
    pub memory_type: MemoryType,
    /// Disabled objects are skipped by the compiler
    #[serde(default)]
    pub disabled: bool,
    /// Name of an external function replacing the default SDO access function
    #[serde(default)]
    pub access_function: Option<String>,
    /// Code to run before the default SDO access function
    #[serde(default)]
    pub access_function_pre_code: Option<String>,
    /// Code to run after the default SDO access function
    #[serde(default)]
    pub access_function_post_code: Option<String>,
    /// Localized labels and descriptions
    #[serde(default)]
    pub labels: Vec<Label>,
    /// The descriptor for the object
    #[serde(flatten)]
    pub kind: ObjectKind,
}

impl CanOpenObject {
    /// Get the object code specifying the type of this object
    pub fn object_code(&self) -> ObjectCode {
        match self.kind {
            ObjectKind::Var(_) => ObjectCode::Var,
            ObjectKind::Array(_) => ObjectCode::Array,
            ObjectKind::Record(_) => ObjectCode::Record,
        }
    }

    /// The sub-objects of an array or record; empty for a var
    pub fn subs(&self) -> &[SubObject] {
        match &self.kind {
            ObjectKind::Var(_) => &[],
            ObjectKind::Array(def) => &def.subs,
            ObjectKind::Record(def) => &def.subs,
        }
    }

    /// Get the access function override configured for this object
    ///
    /// An external function name takes precedence over injected code. Empty strings count as not
    /// set.
    pub fn access_override(&self) -> AccessOverride<'_> {
        fn non_empty(s: &Option<String>) -> Option<&str> {
            s.as_deref().filter(|s| !s.is_empty())
        }

        if let Some(name) = non_empty(&self.access_function) {
            return AccessOverride::External(name);
        }
        let pre = non_empty(&self.access_function_pre_code);
        let post = non_empty(&self.access_function_post_code);
        if pre.is_some() || post.is_some() {
            AccessOverride::Injected {
                pre: pre.unwrap_or_default(),
                post: post.unwrap_or_default(),
            }
        } else {
            AccessOverride::Default
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
/// Device description structure
pub struct DeviceDescription {
    /// Information about the description file
    #[serde(default)]
    pub file: FileInfo,

    /// The identity of the device
    #[serde(default)]
    pub identity: DeviceIdentity,

    /// Supported bit rates in kbit/s
    #[serde(default = "default_baud_rates")]
    pub baud_rates: Vec<u16>,

    /// Bit rate the device uses out of the box, in kbit/s
    #[serde(default = "default_baud_rate")]
    pub default_baud_rate: u16,

    /// Data types which may be used as dummy entries in PDO mappings
    #[serde(default = "default_dummy_usage")]
    pub dummy_usage: Vec<DataType>,

    /// Communication features of the device
    #[serde(default)]
    pub features: Vec<Feature>,

    /// The objects of the object dictionary, in declaration order
    #[serde(default)]
    pub objects: Vec<CanOpenObject>,
}

impl Default for DeviceDescription {
    fn default() -> Self {
        Self {
            file: FileInfo::default(),
            identity: DeviceIdentity::default(),
            baud_rates: default_baud_rates(),
            default_baud_rate: default_baud_rate(),
            dummy_usage: default_dummy_usage(),
            features: Vec::new(),
            objects: Vec::new(),
        }
    }
}

impl DeviceDescription {
    /// Try to read a device description from a file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, LoadError> {
        let description_str = std::fs::read_to_string(&path).context(IoSnafu)?;
        Self::load_from_str(&description_str)
    }

    /// Try to read a device description from a &str
    pub fn load_from_str(description_str: &str) -> Result<Self, LoadError> {
        let description: DeviceDescription =
            toml::from_str(description_str).context(TomlParsingSnafu)?;

        Self::validate_unique_indices(&description.objects)?;

        log::debug!(
            "Loaded device description with {} features and {} objects",
            description.features.len(),
            description.objects.len()
        );
        Ok(description)
    }

    /// Look up the value of a feature by name; a missing feature counts as zero
    pub fn feature_value(&self, name: &str) -> u32 {
        self.features
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value)
            .unwrap_or(0)
    }

    fn validate_unique_indices(objects: &[CanOpenObject]) -> Result<(), LoadError> {
        let mut found_indices = HashMap::new();
        for obj in objects {
            if found_indices.contains_key(&obj.index) {
                return DuplicateObjectIdsSnafu { id: obj.index }.fail();
            }
            found_indices.insert(&obj.index, ());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::device_description::{
        AccessOverride, DeviceDescription, LoadError, ObjectKind,
    };
    use crate::objects::{AccessType, DataType, MemoryType, PdoMapping};
    use assertables::assert_contains;

    #[test]
    fn test_duplicate_objects_errors() {
        const TOML: &str = r#"
            [[objects]]
            index = 0x2000
            name = "Test1"
            object_type = "var"
            data_type = "INTEGER16"
            access_type = "rw"

            [[objects]]
            index = 0x2000
            name = "Duplicate"
            object_type = "record"
        "#;

        let result = DeviceDescription::load_from_str(TOML);

        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, LoadError::DuplicateObjectIds { id: 0x2000 }));
        assert_contains!(
            err.to_string(),
            "Multiple definitions for object with index 0x2000"
        );
    }

    #[test]
    fn test_record_with_repeated_sub_index_loads() {
        // Sub-index sequence problems are reported by the compiler, not the loader
        const TOML: &str = r#"
            [[objects]]
            index = 0x2000
            name = "Repeated"
            object_type = "record"
            [[objects.subs]]
            sub_index = 0
            name = "max sub-index"
            data_type = "UNSIGNED8"
            [[objects.subs]]
            sub_index = 0
            name = "again"
            data_type = "UNSIGNED8"
        "#;

        let description = DeviceDescription::load_from_str(TOML).unwrap();
        assert_eq!(2, description.objects[0].subs().len());
    }

    #[test]
    fn test_values_and_types() {
        const TOML: &str = r#"
            [identity]
            vendor_id = 0x1234
            product_name = "Demo"

            [[objects]]
            index = 0x1017
            name = "Producer heartbeat time"
            object_type = "var"
            memory_type = "EEPROM"
            data_type = "06"
            access_type = "rw"
            default_value = 1000

            [[objects]]
            index = 0x1400
            name = "RPDO communication parameter"
            object_type = "record"
            access_function = "CO_ODF_RPDOcom"
            [[objects.subs]]
            sub_index = 1
            name = "COB-ID"
            data_type = "UNSIGNED32"
            access_type = "rw"
            pdo_mapping = "no"
            default_value = "$NODEID+0x200"
        "#;

        let description = DeviceDescription::load_from_str(TOML).unwrap();
        assert_eq!("4660", description.identity.vendor_id);
        assert_eq!(vec![10, 20, 50, 125, 250, 500, 800, 1000], description.baud_rates);

        let heartbeat = &description.objects[0];
        assert_eq!(MemoryType::Eeprom, heartbeat.memory_type);
        match &heartbeat.kind {
            ObjectKind::Var(var) => {
                assert_eq!(DataType::Unsigned16, var.data_type);
                assert_eq!(AccessType::Rw, var.access_type);
                assert_eq!(PdoMapping::No, var.pdo_mapping);
                assert_eq!("1000", var.default_value);
            }
            other => panic!("Expected a var, got {other:?}"),
        }

        let rpdo = &description.objects[1];
        assert_eq!(
            AccessOverride::External("CO_ODF_RPDOcom"),
            rpdo.access_override()
        );
        assert_eq!("$NODEID+0x200", rpdo.subs()[0].default_value);
    }

    #[test]
    fn test_invalid_access_type() {
        const TOML: &str = r#"
            [[objects]]
            index = 0x2000
            name = "Bad"
            object_type = "var"
            data_type = "UNSIGNED8"
            access_type = "readwrite"
        "#;

        let err = DeviceDescription::load_from_str(TOML).unwrap_err();
        assert!(matches!(err, LoadError::TomlParsing { .. }));
        assert_contains!(err.to_string(), "Invalid access type");
    }
}
