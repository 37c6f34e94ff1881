//! Artifact renderers
//!
//! Each emitter is a pure function of the analysis tables, plus the identity and file metadata of
//! the description which is passed through verbatim.
pub mod doc;
pub mod eds;
pub mod header;
pub mod source;
pub mod xdd;

use odgen_common::objects::{AccessType, PdoMapping};

const LINE_WIDTH: usize = 80;

/// A block comment with a title, spanning the full line width
pub(crate) fn section(title: &str) -> String {
    let stars = "*".repeat(LINE_WIDTH - 1);
    format!("/{stars}\n   {title}\n{stars}/\n")
}

/// A one line comment, filled up with stars to the full line width
pub(crate) fn star_banner(title: &str) -> String {
    let head = format!("/***** {title} ");
    let fill = (LINE_WIDTH - 1).saturating_sub(head.len());
    format!("{head}{}/", "*".repeat(fill))
}

/// Access type as written in EDS files, folding in the PDO direction of read/write values
pub(crate) fn eds_access_type(access_type: AccessType, pdo_mapping: PdoMapping) -> &'static str {
    match (access_type, pdo_mapping) {
        (AccessType::Rw, PdoMapping::Rpdo | PdoMapping::Optional) => "rww",
        (AccessType::Rw, PdoMapping::Tpdo) => "rwr",
        (access_type, _) => access_type.as_str(),
    }
}

/// The part of the object dictionary an index belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Division {
    Communication,
    Manufacturer,
    DeviceProfile,
}

impl Division {
    pub fn of(index: u16) -> Self {
        match index {
            0..0x2000 => Division::Communication,
            0x2000..0x6000 => Division::Manufacturer,
            _ => Division::DeviceProfile,
        }
    }
}
