//! CO_OD.c
use odgen_common::objects::MemoryType;

use crate::analyzer::Analysis;
use crate::emit::{section, star_banner};

const BANNER: &str = "/*******************************************************************************

   File - CO_OD.c
   CANopen Object Dictionary.

   This file was automatically generated by odgen from a device description.
   DON'T EDIT THIS FILE MANUALLY !!!!

*******************************************************************************/
";

const SENTINEL: &str = "           CO_OD_FIRST_LAST_WORD";

fn memory_definition(memory_type: MemoryType, analysis: &Analysis) -> String {
    let name = memory_type.as_str();
    let lines = analysis.tables.buckets.get(memory_type).initializer_lines();
    let (opening, closing) = match memory_type {
        MemoryType::Rom => (
            "   CO_OD_ROM_IDENT struct sCO_OD_ROM CO_OD_ROM = {    //constant variables, stored in flash"
                .to_string(),
            SENTINEL.to_string(),
        ),
        _ => (
            format!("struct sCO_OD_{name} CO_OD_{name} = {{"),
            format!("{SENTINEL},"),
        ),
    };
    format!(
        "{}\n{opening}\n{SENTINEL},\n\n{}\n\n{closing}\n}};\n",
        star_banner(&format!("Definition for {name} variables")),
        lines.join("\n"),
    )
}

/// Render the source defining and initializing the object dictionary
pub fn render(analysis: &Analysis) -> String {
    let tables = &analysis.tables;
    let entries: Vec<&str> = tables.entries.values().map(String::as_str).collect();

    [
        BANNER.to_string(),
        "\n\n#include \"CO_driver.h\"\n#include \"CO_OD.h\"\n#include \"CO_SDO.h\"\n\n\n".to_string(),
        section("DEFINITION AND INITIALIZATION OF OBJECT DICTIONARY VARIABLES"),
        "\n".to_string(),
        memory_definition(MemoryType::Ram, analysis),
        "\n\n".to_string(),
        memory_definition(MemoryType::Eeprom, analysis),
        "\n\n".to_string(),
        memory_definition(MemoryType::Rom, analysis),
        "\n\n".to_string(),
        section("STRUCTURES FOR RECORD TYPE OBJECTS"),
        format!("{}\n\n\n", tables.records.join("\n")),
        section("SDO SERVER ACCESS FUNCTIONS WITH USER CODE"),
        "#define WRITING (dir == 1)\n#define READING (dir == 0)\n".to_string(),
        format!("{}\n\n", tables.functions.join("\n")),
        section("OBJECT DICTIONARY"),
        format!(
            "const sCO_OD_object CO_OD[CO_OD_NoOfElements] = {{\n{}\n}};\n",
            entries.join("\n")
        ),
    ]
    .concat()
}
