//! Value encoding helpers
//!
//! Converting human names into C identifiers, default values into C initializers, and object
//! properties into the packed attribute byte used by the stack.
use std::sync::LazyLock;

use bitflags::bitflags;
use odgen_common::objects::{AccessType, DataType, MemoryType, PdoMapping};
use regex::Regex;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9A-Za-z_]+").unwrap());
static HEX_PAIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9A-Fa-f]{2}").unwrap());

/// Prefix of default values which are relative to the node ID
pub const NODE_ID_PREFIX: &str = "$NODEID+";

bitflags! {
    /// The attribute byte of an object dictionary entry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Attribute: u8 {
        /// Stored in ROM
        const ROM = 0x01;
        /// Stored in RAM
        const RAM = 0x02;
        /// Stored in EEPROM
        const EEPROM = 0x03;
        /// May be read over SDO
        const READABLE = 0x04;
        /// May be written over SDO
        const WRITEABLE = 0x08;
        /// May be mapped to an RPDO
        const RPDO_MAPPABLE = 0x10;
        /// May be mapped to a TPDO
        const TPDO_MAPPABLE = 0x20;
        /// A change of state triggers TPDO transmission
        const TPDO_DETECT_COS = 0x40;
        /// Value spans multiple bytes, and may need byte swapping
        const MULTI_BYTE = 0x80;
    }
}

impl Attribute {
    /// Pack the attribute byte for a value
    pub fn new(
        memory_type: MemoryType,
        data_type: DataType,
        access_type: AccessType,
        pdo_mapping: PdoMapping,
        detect_cos: bool,
    ) -> Self {
        let mut attr = Attribute::from_bits_retain(memory_type.code());
        attr.set(Attribute::READABLE, access_type.is_readable());
        attr.set(Attribute::WRITEABLE, access_type.is_writable());
        attr.set(Attribute::RPDO_MAPPABLE, pdo_mapping.supports_rpdo());
        attr.set(Attribute::TPDO_MAPPABLE, pdo_mapping.supports_tpdo());
        attr.set(Attribute::TPDO_DETECT_COS, detect_cos);
        attr.set(Attribute::MULTI_BYTE, is_multi_byte(data_type));
        attr
    }
}

/// Returns false for types stored as single bytes or byte strings
fn is_multi_byte(data_type: DataType) -> bool {
    !matches!(
        data_type,
        DataType::Boolean
            | DataType::Integer8
            | DataType::Unsigned8
            | DataType::VisibleString
            | DataType::OctetString
            | DataType::UnicodeString
            | DataType::Domain
    )
}

/// Pad a string with spaces to `width`; strings that are already too long get a single space
pub fn pad(s: &str, width: usize) -> String {
    if s.len() >= width {
        format!("{s} ")
    } else {
        format!("{s:width$}")
    }
}

/// Turn a human readable name into a C identifier
///
/// Non-word characters are removed, and every word after the first is capitalized. The first
/// letter is lower cased when the first word continues in lower case, and an underscore separates
/// words which would otherwise run together as capitals, e.g. "SYNC COB ID" becomes
/// `SYNC_COB_ID` and "Producer heartbeat time" becomes `producerHeartbeatTime`.
pub fn storage_name(name: &str) -> String {
    let mut words = NON_WORD.split(name);
    let first: Vec<char> = words.next().unwrap_or_default().chars().collect();

    let mut out = String::new();
    let mut prev_last = match first.get(1) {
        Some(c) if c.is_ascii_lowercase() => {
            out.extend(first[0].to_lowercase());
            out.extend(&first[1..]);
            first.last().copied()
        }
        _ => {
            out.extend(&first);
            first.last().copied()
        }
    };

    for word in words {
        let chars: Vec<char> = word.chars().collect();
        let Some(head) = chars.first() else {
            continue;
        };
        let upper_boundary = prev_last.is_some_and(|c| c.is_ascii_uppercase())
            && chars.get(1).is_some_and(|c| c.is_ascii_uppercase());
        if upper_boundary {
            out.push('_');
        }
        out.extend(head.to_uppercase());
        out.extend(&chars[1..]);
        prev_last = chars.last().copied();
    }
    out
}

/// Turn a feature name into the suffix of its `CO_NO_` macro
pub fn macro_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Storage size in bytes of a value of the given type
///
/// String sizes are derived from the default value. Returns None for types without a known size.
pub fn storage_size(data_type: DataType, value: &str) -> Option<usize> {
    use DataType::*;
    Some(match data_type {
        Integer8 | Unsigned8 => 1,
        Integer16 | Unsigned16 => 2,
        Integer24 | Unsigned24 => 3,
        Integer32 | Unsigned32 | Real32 => 4,
        Integer40 | Unsigned40 => 5,
        Integer48 | Unsigned48 | TimeOfDay | TimeDifference => 6,
        Integer56 | Unsigned56 => 7,
        Integer64 | Unsigned64 | Real64 => 8,
        VisibleString => value.len(),
        OctetString => strip_whitespace(value).len() / 2,
        UnicodeString => strip_whitespace(value).len() / 4,
        Domain => 0,
        Boolean | Other(_) => return None,
    })
}

/// Format a storage size for the dictionary table: two columns wide, `??` when unknown
pub fn format_size(size: Option<usize>) -> String {
    match size {
        Some(size) => format!("{size:>2}"),
        None => "??".to_string(),
    }
}

/// Split a C declaration for a value into its type name and array suffix
///
/// `dims` holds any array dimensions added by the caller; string types add their length as the
/// innermost dimension.
pub fn c_declarator(data_type: DataType, value: &str, dims: &str) -> (String, String) {
    let type_name = data_type.to_string();
    let suffix = match storage_size(data_type, value) {
        Some(len) if matches!(data_type, DataType::VisibleString | DataType::OctetString) => {
            format!("{dims}[{len}]")
        }
        _ => dims.to_string(),
    };
    (type_name, suffix)
}

/// The substitute value used when a default value is invalid
pub fn zero_value(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Integer32 => "0L",
        DataType::VisibleString | DataType::OctetString => "{0}",
        _ => "0",
    }
}

/// Parse an integer written in decimal, or in hex with a `0x` prefix
fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) if hex.starts_with(|c: char| c.is_ascii_hexdigit()) => {
            i64::from_str_radix(hex, 16).ok()?
        }
        Some(_) => return None,
        None if digits.starts_with(|c: char| c.is_ascii_digit()) => digits.parse::<i64>().ok()?,
        None => return None,
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn checked_int(value: &str, min: i64, max: i64) -> Option<i64> {
    parse_int(value).filter(|i| (min..=max).contains(i))
}

/// C character literals for one character; non-ASCII characters become one literal per UTF-8 byte
fn char_literals(c: char) -> Vec<String> {
    if c.is_ascii() {
        return vec![char_literal(c)];
    }
    let mut buf = [0; 4];
    c.encode_utf8(&mut buf)
        .bytes()
        .map(|b| format!("'\\x{b:02X}'"))
        .collect()
}

fn char_literal(c: char) -> String {
    match c {
        '\'' => "'\\''".to_string(),
        '\\' => "'\\\\'".to_string(),
        '\n' => "'\\n'".to_string(),
        '\r' => "'\\r'".to_string(),
        '\t' => "'\\t'".to_string(),
        c => format!("'{c}'"),
    }
}

/// Encode a default value as a C initializer
///
/// Returns None when the value is not valid for the data type. Types without validation rules
/// pass the value through unchanged.
pub fn encode_value(data_type: DataType, raw: &str) -> Option<String> {
    let value = raw.replacen(NODE_ID_PREFIX, "", 1);
    match data_type {
        DataType::Integer8 => {
            checked_int(&value, i8::MIN.into(), i8::MAX.into()).map(|i| i.to_string())
        }
        DataType::Integer16 => {
            checked_int(&value, i16::MIN.into(), i16::MAX.into()).map(|i| i.to_string())
        }
        DataType::Integer32 => {
            checked_int(&value, i32::MIN.into(), i32::MAX.into()).map(|i| format!("{i}L"))
        }
        DataType::Unsigned8 => checked_int(&value, 0, u8::MAX.into()).map(|i| format!("0x{i:X}")),
        DataType::Unsigned16 => {
            checked_int(&value, 0, u16::MAX.into()).map(|i| format!("0x{i:X}"))
        }
        DataType::Unsigned32 => {
            checked_int(&value, 0, u32::MAX.into()).map(|i| format!("0x{i:X}L"))
        }
        DataType::Real32 => {
            let f: f64 = value.trim().parse().ok()?;
            (-3.4e38 < f && f < 3.4e38).then(|| f.to_string())
        }
        DataType::VisibleString => {
            let chars: Vec<String> = value.chars().flat_map(char_literals).collect();
            Some(format!("{{{}}}", chars.join(", ")))
        }
        DataType::OctetString => {
            if !strip_whitespace(&HEX_PAIR.replace_all(&value, "")).is_empty() {
                return None;
            }
            let pairs: Vec<String> = HEX_PAIR
                .find_iter(&value)
                .map(|m| format!("0x{}", m.as_str()))
                .collect();
            Some(format!("{{{}}}", pairs.join(", ")))
        }
        _ => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_names() {
        assert_eq!("SYNC_COB_ID", storage_name("SYNC COB ID"));
        assert_eq!("producerHeartbeatTime", storage_name("Producer heartbeat time"));
        assert_eq!("errorRegister", storage_name("Error register"));
        assert_eq!("RPDOCommunicationParameter", storage_name("RPDO communication parameter"));
        assert_eq!("COB_IDClientToServer", storage_name("COB ID client to server"));
        assert_eq!("maxSubIndex", storage_name("max sub-index"));
        assert_eq!("x", storage_name("x"));
        assert_eq!("", storage_name(""));
    }

    #[test]
    fn test_macro_names() {
        assert_eq!("SDO_SERVER", macro_name("SDO server"));
        assert_eq!("RPDO", macro_name("RPDO"));
    }

    #[test]
    fn test_unsigned8_boundaries() {
        assert_eq!(Some("0x0".to_string()), encode_value(DataType::Unsigned8, "0"));
        assert_eq!(Some("0xFF".to_string()), encode_value(DataType::Unsigned8, "255"));
        assert_eq!(None, encode_value(DataType::Unsigned8, "256"));
        assert_eq!(None, encode_value(DataType::Unsigned8, "-1"));
        assert_eq!(None, encode_value(DataType::Unsigned8, ""));
    }

    #[test]
    fn test_signs_are_only_allowed_up_front() {
        assert_eq!(Some("0x5".to_string()), encode_value(DataType::Unsigned8, "+5"));
        assert_eq!(Some("0x5".to_string()), encode_value(DataType::Unsigned8, "0x5"));
        assert_eq!(None, encode_value(DataType::Unsigned8, "0x+5"));
        assert_eq!(None, encode_value(DataType::Integer8, "0x-5"));
        assert_eq!(None, encode_value(DataType::Integer8, "-+5"));
        assert_eq!(None, encode_value(DataType::Unsigned8, "0x"));
    }

    #[test]
    fn test_integer_encoding() {
        assert_eq!(Some("-128".to_string()), encode_value(DataType::Integer8, "-128"));
        assert_eq!(None, encode_value(DataType::Integer8, "128"));
        assert_eq!(Some("-5L".to_string()), encode_value(DataType::Integer32, "-5"));
        assert_eq!(Some("0xFFFF".to_string()), encode_value(DataType::Unsigned16, "65535"));
        assert_eq!(None, encode_value(DataType::Unsigned16, "65536"));
        assert_eq!(
            Some("0x12345678L".to_string()),
            encode_value(DataType::Unsigned32, "0x12345678")
        );
        assert_eq!(
            Some("0x180L".to_string()),
            encode_value(DataType::Unsigned32, "$NODEID+0x180")
        );
        assert_eq!("0L", zero_value(DataType::Integer32));
        assert_eq!("0", zero_value(DataType::Unsigned32));
        assert_eq!("{0}", zero_value(DataType::OctetString));
    }

    #[test]
    fn test_real_and_passthrough() {
        assert_eq!(Some("1.5".to_string()), encode_value(DataType::Real32, "1.5"));
        assert_eq!(None, encode_value(DataType::Real32, "4e38"));
        assert_eq!(None, encode_value(DataType::Real32, "abc"));
        assert_eq!(Some("0x1234".to_string()), encode_value(DataType::Unsigned64, "0x1234"));
        assert_eq!(Some("1".to_string()), encode_value(DataType::Boolean, "1"));
    }

    #[test]
    fn test_string_encoding() {
        assert_eq!(
            Some("{'a', 'b', '\\''}".to_string()),
            encode_value(DataType::VisibleString, "ab'")
        );
        assert_eq!(Some("{}".to_string()), encode_value(DataType::VisibleString, ""));
        assert_eq!(
            Some("{'a', '\\xC3', '\\xA9'}".to_string()),
            encode_value(DataType::VisibleString, "a\u{e9}")
        );
        assert_eq!(
            Some("{0x11, 0xAA, 0x00}".to_string()),
            encode_value(DataType::OctetString, "11 AA00")
        );
        assert_eq!(None, encode_value(DataType::OctetString, "11 A"));
        assert_eq!(None, encode_value(DataType::OctetString, "GG"));
    }

    #[test]
    fn test_sizes_and_declarators() {
        assert_eq!(Some(4), storage_size(DataType::Unsigned32, ""));
        assert_eq!(Some(3), storage_size(DataType::VisibleString, "abc"));
        // Sized in bytes, like the initializer
        assert_eq!(Some(3), storage_size(DataType::VisibleString, "a\u{e9}"));
        assert_eq!(Some(2), storage_size(DataType::OctetString, "11 22"));
        assert_eq!(Some(0), storage_size(DataType::Domain, ""));
        assert_eq!(None, storage_size(DataType::Other(0x30), ""));
        assert_eq!(" 4", format_size(Some(4)));
        assert_eq!("12", format_size(Some(12)));
        assert_eq!("??", format_size(None));

        assert_eq!(
            ("VISIBLE_STRING".to_string(), "[2][5]".to_string()),
            c_declarator(DataType::VisibleString, "hello", "[2]")
        );
        assert_eq!(
            ("UNSIGNED8".to_string(), "[4]".to_string()),
            c_declarator(DataType::Unsigned8, "0", "[4]")
        );
    }

    #[test]
    fn test_attribute_byte() {
        let identity = Attribute::new(
            MemoryType::Rom,
            DataType::Unsigned32,
            AccessType::Ro,
            PdoMapping::No,
            false,
        );
        assert_eq!(0x85, identity.bits());
        assert!(identity.contains(Attribute::READABLE));
        assert!(!identity.contains(Attribute::WRITEABLE));

        let status = Attribute::new(
            MemoryType::Ram,
            DataType::Unsigned8,
            AccessType::Rw,
            PdoMapping::Optional,
            true,
        );
        assert_eq!(0x7E, status.bits());

        let command = Attribute::new(
            MemoryType::Eeprom,
            DataType::Integer16,
            AccessType::Wo,
            PdoMapping::Rpdo,
            false,
        );
        assert_eq!(0x9B, command.bits());
    }

    #[test]
    fn test_pad() {
        assert_eq!("abc  ", pad("abc", 5));
        assert_eq!("abcdef ", pad("abcdef", 5));
    }
}
