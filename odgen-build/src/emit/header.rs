//! CO_OD.h
use odgen_common::objects::MemoryType;
use odgen_common::DeviceDescription;

use crate::analyzer::Analysis;
use crate::emit::{section, star_banner};
use crate::values::pad;

const BANNER: &str = "/*******************************************************************************

   File: CO_OD.h
   CANopen Object Dictionary.

   This file was automatically generated by odgen from a device description.
   DON'T EDIT THIS FILE MANUALLY !!!!

*******************************************************************************/
";

fn or_zero(value: &str) -> &str {
    if value.is_empty() {
        "0"
    } else {
        value
    }
}

fn memory_struct(memory_type: MemoryType, analysis: &Analysis) -> String {
    let name = memory_type.as_str();
    format!(
        "{}\nstruct sCO_OD_{name}{{\n{:15}UNSIGNED32     FirstWord;\n\n{}\n\n{:15}UNSIGNED32     LastWord;\n}};\n",
        star_banner(&format!("Structure for {name} variables")),
        "",
        analysis.tables.buckets.get(memory_type).declarations().join("\n"),
        "",
    )
}

/// Render the header declaring the object dictionary storage
pub fn render(description: &DeviceDescription, analysis: &Analysis) -> String {
    let file = &description.file;
    let identity = &description.identity;
    let tables = &analysis.tables;

    let file_info = format!(
        "FILE INFO:\n      FileName:     {}\n      FileVersion:  {}\n      CreationTime: {}\n      CreationDate: {}\n      CreatedBy:    {}",
        file.file_name,
        file.file_version,
        file.file_creation_time,
        file.file_creation_date,
        file.file_creator
    );
    let device_info = format!(
        "DEVICE INFO:\n      VendorName:     {}\n      VendorNumber:   {}\n      ProductName:    {}\n      ProductNumber:  {}",
        identity.vendor_name,
        or_zero(&identity.vendor_id),
        identity.product_name,
        or_zero(&identity.product_id)
    );
    let macros: Vec<String> = analysis
        .features
        .iter()
        .map(|feature| {
            format!(
                "   #define CO_NO_{}{}{}",
                pad(&feature.macro_name, 25),
                pad(&feature.value.to_string(), 4),
                feature.comment()
            )
        })
        .collect();

    [
        BANNER.to_string(),
        "\n#ifndef _CO_OD_H\n#define _CO_OD_H\n\n".to_string(),
        section(&file_info),
        "\n\n".to_string(),
        section(&device_info),
        "\n\n".to_string(),
        section("FEATURES"),
        format!("{}\n\n\n", macros.join("\n")),
        section("OBJECT DICTIONARY"),
        format!(
            "   #define CO_OD_NoOfElements             {}\n\n\n",
            tables.entries.len()
        ),
        section("TYPE DEFINITIONS FOR RECORDS"),
        format!("{}\n\n", tables.typedefs.join("\n")),
        section("STRUCTURES FOR VARIABLES IN DIFFERENT MEMORY LOCATIONS"),
        "#define  CO_OD_FIRST_LAST_WORD     0x55 //Any value from 0x01 to 0xFE. If changed, EEPROM will be reinitialized.\n\n".to_string(),
        memory_struct(MemoryType::Ram, analysis),
        "\n".to_string(),
        memory_struct(MemoryType::Eeprom, analysis),
        "\n\n".to_string(),
        memory_struct(MemoryType::Rom, analysis),
        "\n\n".to_string(),
        star_banner("Declaration of Object Dictionary variables"),
        "\nextern struct sCO_OD_RAM CO_OD_RAM;\n\nextern struct sCO_OD_EEPROM CO_OD_EEPROM;\n\nextern CO_OD_ROM_IDENT struct sCO_OD_ROM CO_OD_ROM;\n\n\n".to_string(),
        section("ALIASES FOR OBJECT DICTIONARY VARIABLES"),
        format!("{}\n\n#endif\n", tables.aliases.join("\n")),
    ]
    .concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use assertables::assert_contains;
    use odgen_common::device_description::{AssociatedObjectRef, Feature};

    #[test]
    fn test_header_layout() {
        let description = DeviceDescription {
            features: vec![Feature {
                name: "SDO server".into(),
                value: 1,
                associated_objects: vec![AssociatedObjectRef {
                    index: 0x1200,
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let header = render(&description, &analyze(&description));

        assert!(header.starts_with("/****"));
        assert!(header.ends_with("\n#endif\n"));
        assert_contains!(header, "      VendorNumber:   0\n");
        assert_contains!(
            header,
            "   #define CO_NO_SDO_SERVER               1   //Associated objects: 1200\n"
        );
        assert_contains!(header, "   #define CO_OD_NoOfElements             0\n");
        assert_contains!(
            header,
            "struct sCO_OD_RAM{\n               UNSIGNED32     FirstWord;\n\n\n\n               UNSIGNED32     LastWord;\n};\n"
        );
        assert_contains!(header, "extern CO_OD_ROM_IDENT struct sCO_OD_ROM CO_OD_ROM;\n");
    }
}
