//! C code generation for vars, arrays and records
//!
//! Each object contributes to several tables at once: the declaration and initializer of its
//! storage, the alias macros, the record descriptors and one row of the dictionary table. Group
//! members only contribute their initializer and their own row; the declaration belongs to the
//! anchor.
use std::collections::HashSet;

use odgen_common::device_description::{
    ArrayDefinition, ObjectKind, RecordDefinition, SubObject, VarDefinition,
};
use odgen_common::objects::{AccessType, DataType, MemoryType};

use crate::analyzer::ResolvedObject;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::tables::{ObjectSheet, OdTables, SheetEntry};
use crate::values::{
    c_declarator, encode_value, format_size, pad, storage_name, storage_size, zero_value,
    Attribute,
};

/// Generate all table contributions of one object
pub(crate) fn generate(
    object: &ResolvedObject,
    tables: &mut OdTables,
    diagnostics: &mut Diagnostics,
) {
    log::trace!("Generating object {:04X} as {}", object.index(), object.name);
    match &object.object.kind {
        ObjectKind::Var(def) => generate_var(object, def, tables, diagnostics),
        ObjectKind::Array(def) => generate_array(object, def, tables, diagnostics),
        ObjectKind::Record(def) => generate_record(object, def, tables, diagnostics),
    }
}

/// A field of a generated record structure
#[derive(Debug, Clone)]
pub(crate) struct RecordField {
    pub name: String,
    /// The field declaration, without indentation
    pub declaration: String,
    pub attribute: Attribute,
    pub size: Option<usize>,
    /// Strings are declared as arrays, and are addressed by their first element
    pub is_array: bool,
}

/// Build the fields of a record stored in `memory_type`
pub(crate) fn record_fields(subs: &[SubObject], memory_type: MemoryType) -> Vec<RecordField> {
    subs.iter()
        .map(|sub| {
            let name = storage_name(&sub.name);
            let (type_name, suffix) = c_declarator(sub.data_type, &sub.default_value, "");
            RecordField {
                declaration: format!("{}{name}{suffix};", pad(&type_name, 15)),
                attribute: Attribute::new(
                    memory_type,
                    sub.data_type,
                    sub.access_type,
                    sub.pdo_mapping,
                    sub.tpdo_detect_cos,
                ),
                size: storage_size(sub.data_type, &sub.default_value),
                is_array: !suffix.is_empty(),
                name,
            }
        })
        .collect()
}

/// The largest storage size of the array elements; None when any size is unknown
pub(crate) fn element_size(def: &ArrayDefinition) -> Option<usize> {
    def.subs
        .iter()
        .skip(1)
        .map(|sub| storage_size(def.data_type, &sub.default_value))
        .try_fold(0, |max, size| size.map(|size| max.max(size)))
}

fn is_char_array(data_type: DataType) -> bool {
    matches!(data_type, DataType::VisibleString | DataType::OctetString)
}

fn initial_value(
    index: u16,
    sub: Option<u8>,
    data_type: DataType,
    raw: &str,
    diagnostics: &mut Diagnostics,
) -> String {
    encode_value(data_type, raw).unwrap_or_else(|| {
        diagnostics.push(Diagnostic::InvalidDefaultValue {
            index,
            sub,
            data_type,
            value: raw.to_string(),
        });
        zero_value(data_type).to_string()
    })
}

/// Report array elements which differ from the first element in access type or PDO mapping
fn check_element_attributes(index: u16, elements: &[SubObject], diagnostics: &mut Diagnostics) {
    let Some((first, rest)) = elements.split_first() else {
        return;
    };
    if rest
        .iter()
        .any(|sub| sub.access_type != first.access_type || sub.pdo_mapping != first.pdo_mapping)
    {
        diagnostics.push(Diagnostic::InconsistentSubAttributes { index });
    }
}

/// Report the first sub-object whose sub index differs from its position
fn check_sub_indices(index: u16, subs: &[SubObject], diagnostics: &mut Diagnostics) {
    if let Some((position, sub)) = subs
        .iter()
        .enumerate()
        .find(|(position, sub)| sub.sub_index as usize != *position)
    {
        diagnostics.push(Diagnostic::InvalidSubIndexSequence {
            index,
            position,
            sub_index: sub.sub_index,
        });
    }
}

fn alias_comment(object: &ResolvedObject, type_name: &str, suffix: &str) -> String {
    let array = if suffix.is_empty() {
        String::new()
    } else {
        format!(", Array{suffix}")
    };
    format!(
        "/*{:04X}{}, Data Type: {type_name}{array} */",
        object.index(),
        object.dims()
    )
}

fn storage_alias(object: &ResolvedObject) -> String {
    format!(
        "      #define OD_{}CO_OD_{}.{}",
        pad(&object.name, 40),
        object.memory_type.as_str(),
        object.name
    )
}

fn length_alias(name: &str, kind: &str, length: usize) -> String {
    format!("      #define ODL_{}{length}", pad(&format!("{name}_{kind}Length"), 39))
}

/// Place the initializer into the memory bucket; anchors and ungrouped objects also declare
fn store(
    object: &ResolvedObject,
    tables: &mut OdTables,
    declaration: Option<String>,
    initializer: String,
) {
    let bucket = tables.buckets.get_mut(object.memory_type);
    match (declaration, object.group) {
        (Some(declaration), group) => {
            bucket.push_anchor(object.index(), group.is_some(), declaration, initializer)
        }
        (None, Some(group)) => bucket.insert_member(group.anchor, object.index(), initializer),
        (None, None) => (),
    }
}

fn sheet(object: &ResolvedObject, value: Option<SheetEntry>, subs: Vec<SheetEntry>) -> ObjectSheet {
    ObjectSheet {
        index: object.index(),
        name: object.object.name.clone(),
        object_code: object.object.object_code(),
        memory_type: object.object.memory_type,
        value,
        subs,
        access: object.access.clone(),
        labels: object.object.labels.clone(),
    }
}

fn sub_entry(sub: &SubObject) -> SheetEntry {
    SheetEntry {
        sub_index: sub.sub_index,
        name: sub.name.clone(),
        data_type: sub.data_type,
        access_type: sub.access_type,
        pdo_mapping: sub.pdo_mapping,
        tpdo_detect_cos: sub.tpdo_detect_cos,
        default_value: sub.default_value.clone(),
        actual_value: sub.actual_value.clone(),
    }
}

fn generate_var(
    object: &ResolvedObject,
    def: &VarDefinition,
    tables: &mut OdTables,
    diagnostics: &mut Diagnostics,
) {
    let index = object.index();
    let data_type = def.data_type;
    let size = storage_size(data_type, &def.default_value);
    let initializer = initial_value(index, None, data_type, &def.default_value, diagnostics);
    let attribute = Attribute::new(
        object.memory_type,
        data_type,
        def.access_type,
        def.pdo_mapping,
        def.tpdo_detect_cos,
    );

    let declaration = object.declares_storage().then(|| {
        let (type_name, suffix) = c_declarator(data_type, &def.default_value, &object.dims());
        tables.aliases.push(alias_comment(object, &type_name, &suffix));
        tables.aliases.push(storage_alias(object));
        if is_char_array(data_type) {
            tables
                .aliases
                .push(length_alias(&object.name, "string", size.unwrap_or(0)));
        }
        tables.aliases.push(String::new());
        format!(
            "{}*/ {}{}{suffix};",
            object.index_range(),
            pad(&type_name, 15),
            object.name
        )
    });
    store(object, tables, declaration, initializer);

    let pointer = if data_type == DataType::Domain {
        "0".to_string()
    } else {
        format!(
            "(const void*)&CO_OD_{}.{}{}{}",
            object.memory_type.as_str(),
            object.name,
            object.subscript(),
            if is_char_array(data_type) { "[0]" } else { "" }
        )
    };
    tables.entries.insert(
        index,
        format!(
            "{{0x{index:04X}, 0x00, 0x{:02X}, {}, {}{}}},",
            attribute.bits(),
            format_size(size),
            pad(&format!("{pointer}, "), 63),
            object.function
        ),
    );

    let value = SheetEntry {
        sub_index: 0,
        name: object.object.name.clone(),
        data_type,
        access_type: def.access_type,
        pdo_mapping: def.pdo_mapping,
        tpdo_detect_cos: def.tpdo_detect_cos,
        default_value: def.default_value.clone(),
        actual_value: def.actual_value.clone(),
    };
    tables.sheets.push(sheet(object, Some(value), Vec::new()));
}

fn generate_array(
    object: &ResolvedObject,
    def: &ArrayDefinition,
    tables: &mut OdTables,
    diagnostics: &mut Diagnostics,
) {
    let index = object.index();
    check_sub_indices(index, &def.subs, diagnostics);

    let data_type = def.data_type;
    let elements = def.subs.get(1..).unwrap_or_default();
    check_element_attributes(index, elements, diagnostics);
    let count = elements.len();
    let size = element_size(def);

    let values: Vec<String> = elements
        .iter()
        .map(|sub| {
            initial_value(
                index,
                Some(sub.sub_index),
                data_type,
                &sub.default_value,
                diagnostics,
            )
        })
        .collect();
    let initializer = format!("{{{}}}", values.join(", "));

    // A writable sub 0 makes the whole array writable
    let access_type = match def.subs.first() {
        Some(sub) if sub.access_type == AccessType::Rw => AccessType::Rw,
        _ => def.access_type,
    };
    let attribute = Attribute::new(
        object.memory_type,
        data_type,
        access_type,
        def.pdo_mapping,
        def.tpdo_detect_cos,
    );

    let declaration = object.declares_storage().then(|| {
        let first_default = elements.first().map(|s| s.default_value.as_str()).unwrap_or("");
        let dims = format!("{}[{count}]", object.dims());
        let (type_name, suffix) = c_declarator(data_type, first_default, &dims);

        tables.aliases.push(alias_comment(object, &type_name, &suffix));
        tables.aliases.push(storage_alias(object));
        tables.aliases.push(length_alias(&object.name, "array", count));
        if is_char_array(data_type) {
            tables
                .aliases
                .push(length_alias(&object.name, "string", size.unwrap_or(0)));
        }
        let sub_names: Vec<String> = elements.iter().map(|sub| storage_name(&sub.name)).collect();
        let unique: HashSet<&String> = sub_names.iter().collect();
        if unique.len() == sub_names.len() {
            for (i, sub_name) in sub_names.iter().enumerate() {
                tables.aliases.push(format!(
                    "      #define ODA_{}{i}",
                    pad(&format!("{}_{sub_name}", object.name), 39)
                ));
            }
        } else {
            log::debug!("Element names of array {index:04X} repeat; skipping element aliases");
        }
        tables.aliases.push(String::new());

        format!(
            "{}*/ {}{}{suffix};",
            object.index_range(),
            pad(&type_name, 15),
            object.name
        )
    });
    store(object, tables, declaration, initializer);

    let pointer = format!(
        "CO_OD_{}.{}{}[0]{}",
        object.memory_type.as_str(),
        object.name,
        object.subscript(),
        if is_char_array(data_type) { "[0]" } else { "" }
    );
    tables.entries.insert(
        index,
        format!(
            "{{0x{index:04X}, 0x{count:02X}, 0x{:02X}, {}, (const void*)&{}{}}},",
            attribute.bits(),
            format_size(size),
            pad(&format!("{pointer}, "), 49),
            object.function
        ),
    );

    let value = SheetEntry {
        sub_index: 0,
        name: object.object.name.clone(),
        data_type,
        access_type: def.access_type,
        pdo_mapping: def.pdo_mapping,
        tpdo_detect_cos: def.tpdo_detect_cos,
        default_value: String::new(),
        actual_value: String::new(),
    };
    let subs = def
        .subs
        .iter()
        .enumerate()
        .map(|(position, sub)| {
            let mut entry = sub_entry(sub);
            if position > 0 {
                entry.data_type = data_type;
                entry.access_type = def.access_type;
                entry.pdo_mapping = def.pdo_mapping;
            }
            entry
        })
        .collect();
    tables.sheets.push(sheet(object, Some(value), subs));
}

fn generate_record(
    object: &ResolvedObject,
    def: &RecordDefinition,
    tables: &mut OdTables,
    diagnostics: &mut Diagnostics,
) {
    let index = object.index();
    check_sub_indices(index, &def.subs, diagnostics);

    let fields = record_fields(&def.subs, object.memory_type);
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for field in &fields {
        if !seen.insert(&field.name) && reported.insert(&field.name) {
            diagnostics.push(Diagnostic::DuplicateSubName {
                index,
                name: field.name.clone(),
            });
        }
    }

    let values: Vec<String> = def
        .subs
        .iter()
        .map(|sub| {
            initial_value(
                index,
                Some(sub.sub_index),
                sub.data_type,
                &sub.default_value,
                diagnostics,
            )
        })
        .collect();
    let initializer = format!("{{{}}}", values.join(", "));
    let type_name = format!("OD_{}_t", object.name);

    let declaration = object.declares_storage().then(|| {
        let range = object.index_range();
        tables.typedefs.push(format!("{range}*/ typedef struct{{"));
        for field in &fields {
            tables.typedefs.push(format!("{:15}{}", "", field.declaration));
        }
        tables
            .typedefs
            .push(format!("{:15}}}{:14}{type_name};\n", "", ""));

        tables.aliases.push(alias_comment(object, &type_name, &object.dims()));
        tables.aliases.push(storage_alias(object));
        tables.aliases.push(String::new());

        format!("{range}*/ {}{}{};", pad(&type_name, 15), object.name, object.dims())
    });
    store(object, tables, declaration, initializer);

    let rows: Vec<String> = fields
        .iter()
        .map(|field| {
            format!(
                "           {{(const void*)&CO_OD_{}.{}{}.{}{}, 0x{:02X}, {}}}",
                object.memory_type.as_str(),
                object.name,
                object.subscript(),
                field.name,
                if field.is_array { "[0]" } else { "" },
                field.attribute.bits(),
                format_size(field.size)
            )
        })
        .collect();
    tables.records.push(format!(
        "/*0x{index:04X}*/ const CO_ODrecord_t ODrecord{index:04X}[{}] = {{",
        fields.len()
    ));
    tables.records.push(format!("{}}};", rows.join(",\n")));

    tables.entries.insert(
        index,
        format!(
            "{{0x{index:04X}, 0x{:02X}, 0x00,  0, (const void*)&{}{}}},",
            fields.len().saturating_sub(1),
            pad(&format!("ODrecord{index:04X}, "), 49),
            object.function
        ),
    );

    let subs = def.subs.iter().map(sub_entry).collect();
    tables.sheets.push(sheet(object, None, subs));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use assertables::assert_contains;
    use odgen_common::device_description::CanOpenObject;
    use odgen_common::objects::PdoMapping;
    use odgen_common::DeviceDescription;

    fn sub(sub_index: u8, name: &str, data_type: DataType, default_value: &str) -> SubObject {
        SubObject {
            sub_index,
            name: name.into(),
            data_type,
            access_type: AccessType::Ro,
            default_value: default_value.into(),
            ..Default::default()
        }
    }

    fn object(index: u16, name: &str, memory_type: MemoryType, kind: ObjectKind) -> CanOpenObject {
        CanOpenObject {
            index,
            name: name.into(),
            memory_type,
            disabled: false,
            access_function: None,
            access_function_pre_code: None,
            access_function_post_code: None,
            labels: Vec::new(),
            kind,
        }
    }

    fn identity() -> CanOpenObject {
        object(
            0x1018,
            "Identity",
            MemoryType::Rom,
            ObjectKind::Record(RecordDefinition {
                subs: vec![
                    sub(0, "max sub-index", DataType::Unsigned8, "4"),
                    sub(1, "Vendor-ID", DataType::Unsigned32, "0x12345678"),
                    sub(2, "Product code", DataType::Unsigned32, "0"),
                    sub(3, "Revision number", DataType::Unsigned32, "0"),
                    sub(4, "Serial number", DataType::Unsigned32, "0"),
                ],
            }),
        )
    }

    fn compile(objects: Vec<CanOpenObject>) -> (OdTables, Vec<Diagnostic>) {
        let analysis = analyze(&DeviceDescription {
            objects,
            ..Default::default()
        });
        (analysis.tables, analysis.diagnostics)
    }

    #[test]
    fn test_record_generation() {
        let (tables, diagnostics) = compile(vec![identity()]);
        assert!(diagnostics.is_empty());

        assert_eq!(
            vec![
                "/*1018      */ typedef struct{",
                "               UNSIGNED8      maxSubIndex;",
                "               UNSIGNED32     vendorID;",
                "               UNSIGNED32     productCode;",
                "               UNSIGNED32     revisionNumber;",
                "               UNSIGNED32     serialNumber;",
                "               }              OD_identity_t;\n",
            ],
            tables.typedefs
        );

        let rom = tables.buckets.get(MemoryType::Rom);
        assert_eq!(vec!["/*1018      */ OD_identity_t  identity;"], rom.declarations());
        assert_eq!(
            vec!["/*1018*/ {0x4, 0x12345678L, 0x0L, 0x0L, 0x0L},"],
            rom.initializer_lines()
        );

        assert_eq!(
            "/*0x1018*/ const CO_ODrecord_t ODrecord1018[5] = {",
            tables.records[0]
        );
        assert_contains!(
            tables.records[1],
            "           {(const void*)&CO_OD_ROM.identity.maxSubIndex, 0x05,  1},\n"
        );
        assert_contains!(
            tables.records[1],
            "           {(const void*)&CO_OD_ROM.identity.vendorID, 0x85,  4},\n"
        );
        assert!(tables.records[1].ends_with("serialNumber, 0x85,  4}};"));

        assert_contains!(tables.entries[&0x1018], "{0x1018, 0x04, 0x00,  0, (const void*)&ODrecord1018, ");
    }

    #[test]
    fn test_record_sub_problems() {
        let mut record = identity();
        if let ObjectKind::Record(def) = &mut record.kind {
            def.subs[2].sub_index = 5;
            def.subs[3].name = "Vendor ID".into();
            def.subs[4].default_value = "0x100000000".into();
        }
        let (_, diagnostics) = compile(vec![record]);
        assert_eq!(
            vec![
                Diagnostic::InvalidSubIndexSequence {
                    index: 0x1018,
                    position: 2,
                    sub_index: 5
                },
                Diagnostic::DuplicateSubName {
                    index: 0x1018,
                    name: "vendorID".into()
                },
                Diagnostic::InvalidDefaultValue {
                    index: 0x1018,
                    sub: Some(4),
                    data_type: DataType::Unsigned32,
                    value: "0x100000000".into()
                },
            ],
            diagnostics
        );
    }

    #[test]
    fn test_array_generation() {
        let array = object(
            0x1003,
            "Pre-defined error field",
            MemoryType::Ram,
            ObjectKind::Array(ArrayDefinition {
                data_type: DataType::Unsigned32,
                access_type: AccessType::Ro,
                pdo_mapping: PdoMapping::No,
                tpdo_detect_cos: false,
                subs: vec![
                    SubObject {
                        access_type: AccessType::Rw,
                        ..sub(0, "Number of errors", DataType::Unsigned8, "0")
                    },
                    sub(1, "Standard error field", DataType::Unsigned32, "0"),
                    sub(2, "Standard error field", DataType::Unsigned32, "0"),
                ],
            }),
        );
        let (tables, diagnostics) = compile(vec![array]);
        assert!(diagnostics.is_empty());

        let ram = tables.buckets.get(MemoryType::Ram);
        assert_eq!(
            vec!["/*1003      */ UNSIGNED32     preDefinedErrorField[2];"],
            ram.declarations()
        );
        assert_eq!(vec!["/*1003*/ {0x0L, 0x0L},"], ram.initializer_lines());
        assert_eq!(
            "{0x1003, 0x02, 0x8E,  4, (const void*)&CO_OD_RAM.preDefinedErrorField[0],               CO_ODF},",
            tables.entries[&0x1003]
        );
        assert_eq!(
            vec![
                "/*1003, Data Type: UNSIGNED32, Array[2] */",
                "      #define OD_preDefinedErrorField                    CO_OD_RAM.preDefinedErrorField",
                "      #define ODL_preDefinedErrorField_arrayLength       2",
                "",
            ],
            tables.aliases
        );

        let sheet = &tables.sheets[0];
        assert_eq!(AccessType::Rw, sheet.subs[0].access_type);
        assert_eq!(AccessType::Ro, sheet.subs[1].access_type);
        assert_eq!(DataType::Unsigned32, sheet.subs[2].data_type);
    }

    #[test]
    fn test_array_element_attributes_must_agree() {
        let array = object(
            0x2400,
            "Outputs",
            MemoryType::Ram,
            ObjectKind::Array(ArrayDefinition {
                data_type: DataType::Unsigned8,
                access_type: AccessType::Rw,
                pdo_mapping: PdoMapping::No,
                tpdo_detect_cos: false,
                subs: vec![
                    sub(0, "Number of outputs", DataType::Unsigned8, "2"),
                    SubObject {
                        access_type: AccessType::Wo,
                        pdo_mapping: PdoMapping::Rpdo,
                        ..sub(1, "Output", DataType::Unsigned8, "0")
                    },
                    SubObject {
                        access_type: AccessType::Rw,
                        pdo_mapping: PdoMapping::Tpdo,
                        ..sub(2, "Output", DataType::Unsigned8, "0")
                    },
                ],
            }),
        );
        let (tables, diagnostics) = compile(vec![array]);
        assert_eq!(
            vec![Diagnostic::InconsistentSubAttributes { index: 0x2400 }],
            diagnostics
        );
        // Generation carries on
        assert_contains!(tables.entries[&0x2400], "{0x2400, 0x02, ");
    }

    #[test]
    fn test_string_var() {
        let var = object(
            0x1008,
            "Manufacturer device name",
            MemoryType::Rom,
            ObjectKind::Var(VarDefinition {
                data_type: DataType::VisibleString,
                access_type: AccessType::Const,
                default_value: "IO".into(),
                ..Default::default()
            }),
        );
        let (tables, _) = compile(vec![var]);
        let rom = tables.buckets.get(MemoryType::Rom);
        assert_eq!(
            vec!["/*1008      */ VISIBLE_STRING manufacturerDeviceName[2];"],
            rom.declarations()
        );
        assert_eq!(vec!["/*1008*/ {'I', 'O'},"], rom.initializer_lines());
        assert_contains!(
            tables.entries[&0x1008],
            "{0x1008, 0x00, 0x05,  2, (const void*)&CO_OD_ROM.manufacturerDeviceName[0], "
        );
        assert_contains!(
            tables.aliases.join("\n"),
            "#define ODL_manufacturerDeviceName_stringLength    2"
        );
    }
}
