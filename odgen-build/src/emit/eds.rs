//! Electronic data sheet
//!
//! An INI style description of the device and every object in its dictionary, for use by
//! configuration tools.
use odgen_common::device_description::STANDARD_BAUD_RATES;
use odgen_common::objects::{DataType, ObjectCode};
use odgen_common::DeviceDescription;

use crate::analyzer::Analysis;
use crate::emit::eds_access_type;
use crate::tables::{ObjectSheet, SheetEntry};

/// Objects every CANopen device must implement
const MANDATORY_OBJECTS: [u16; 3] = [0x1000, 0x1001, 0x1018];

fn or_zero(value: &str) -> &str {
    if value.is_empty() {
        "0"
    } else {
        value
    }
}

fn flag(set: bool) -> u8 {
    u8::from(set)
}

fn eds_default_value(entry: &SheetEntry) -> String {
    if entry.data_type == DataType::OctetString {
        entry.default_value.split_whitespace().collect()
    } else {
        entry.default_value.clone()
    }
}

fn value_section(name: &str, entry: &SheetEntry) -> String {
    format!(
        "ParameterName={name}\nObjectType=7\nDataType=0x{:04X}\nAccessType={}\nPDOMapping={}\nDefaultValue={}\n\n",
        entry.data_type.code(),
        eds_access_type(entry.access_type, entry.pdo_mapping),
        flag(entry.pdo_mapping.is_mappable()),
        eds_default_value(entry)
    )
}

fn object_sections(sheet: &ObjectSheet) -> String {
    match (sheet.object_code, &sheet.value) {
        (ObjectCode::Var, Some(value)) => {
            format!("[{:04X}]\n{}", sheet.index, value_section(&sheet.name, value))
        }
        _ => {
            let mut text = format!(
                "[{:04X}]\nParameterName={}\nObjectType={}\nSubNumber={}\n\n",
                sheet.index,
                sheet.name,
                sheet.object_code.code(),
                sheet.subs.len()
            );
            for sub in &sheet.subs {
                text += &format!(
                    "[{:04X}sub{:X}]\n{}",
                    sheet.index,
                    sub.sub_index,
                    value_section(&sub.name, sub)
                );
            }
            text
        }
    }
}

fn object_list(indices: &[u16]) -> String {
    let mut text = format!("SupportedObjects={}\n", indices.len());
    for (i, index) in indices.iter().enumerate() {
        text += &format!("{}=0x{index:04X}\n", i + 1);
    }
    text
}

/// Render the electronic data sheet
pub fn render(description: &DeviceDescription, analysis: &Analysis) -> String {
    let file = &description.file;
    let identity = &description.identity;
    let sheets = &analysis.tables.sheets;

    let baud_rates: String = STANDARD_BAUD_RATES
        .iter()
        .map(|rate| {
            format!(
                "BaudRate_{rate}={}\n",
                flag(description.baud_rates.contains(rate))
            )
        })
        .collect();
    let dummy_usage: String = (1..=7u8)
        .map(|code| {
            format!(
                "Dummy{code:04X}={}\n",
                flag(description.dummy_usage.contains(&DataType::from(code)))
            )
        })
        .collect();

    let manufacturer: Vec<u16> = sheets
        .iter()
        .map(|s| s.index)
        .filter(|index| (0x2000..0x6000).contains(index))
        .collect();
    let optional: Vec<u16> = sheets
        .iter()
        .map(|s| s.index)
        .filter(|index| {
            !(0x2000..0x6000).contains(index) && !MANDATORY_OBJECTS.contains(index)
        })
        .collect();

    let objects: String = sheets.iter().map(object_sections).collect();

    format!(
        "\n; CANopen Electronic Data Sheet\n; File was automatically generated by odgen\n\n\n\
         [FileInfo]\n\
         FileName={}\n\
         FileVersion={}\n\
         FileRevision=0\n\
         EDSVersion=4.0\n\
         Description={}\n\
         CreationTime={}\n\
         CreationDate={}\n\
         CreatedBy={}\n\n\n\
         [DeviceInfo]\n\
         VendorName={}\n\
         VendorNumber={}\n\
         ProductName={}\n\
         ProductNumber={}\n\
         RevisionNumber=0\n\
         OrderCode=0\n\
         {baud_rates}\
         SimpleBootUpMaster=0\n\
         SimpleBootUpSlave=1\n\
         Granularity=8\n\
         DynamicChannelsSupported=0\n\
         GroupMessaging=0\n\
         NrOfRXPDO={}\n\
         NrOfTXPDO={}\n\
         LSS_Supported=0\n\n\n\
         [Comments]\n\
         Lines=5\n\
         Line1=EDS File for CANopen device\n\
         Line2=Object dictionary for the CANopenNode stack\n\
         Line3=Device: {}\n\
         Line4=Generated by odgen\n\
         Line5=odgen version {}\n\n\n\
         [DummyUsage]\n\
         {dummy_usage}\n\n\
         [MandatoryObjects]\n\
         {}\n\n\
         [OptionalObjects]\n\
         {}\n\n\
         [ManufacturerObjects]\n\
         {}\n\
         {objects}",
        file.file_name,
        file.file_version,
        identity.product_name,
        file.file_creation_time,
        file.file_creation_date,
        file.file_creator,
        identity.vendor_name,
        or_zero(&identity.vendor_id),
        identity.product_name,
        or_zero(&identity.product_id),
        description.feature_value("RPDO"),
        description.feature_value("TPDO"),
        identity.product_name,
        env!("CARGO_PKG_VERSION"),
        object_list(&MANDATORY_OBJECTS),
        object_list(&optional),
        object_list(&manufacturer),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use assertables::assert_contains;
    use odgen_common::device_description::{
        ArrayDefinition, CanOpenObject, Feature, ObjectKind, SubObject, VarDefinition,
    };
    use odgen_common::objects::{AccessType, MemoryType, PdoMapping};

    fn object(index: u16, name: &str, kind: ObjectKind) -> CanOpenObject {
        CanOpenObject {
            index,
            name: name.into(),
            memory_type: MemoryType::Ram,
            disabled: false,
            access_function: None,
            access_function_pre_code: None,
            access_function_post_code: None,
            labels: Vec::new(),
            kind,
        }
    }

    fn description() -> DeviceDescription {
        DeviceDescription {
            baud_rates: vec![125, 250],
            features: vec![Feature {
                name: "RPDO".into(),
                value: 4,
                ..Default::default()
            }],
            objects: vec![
                object(
                    0x1000,
                    "Device type",
                    ObjectKind::Var(VarDefinition {
                        data_type: DataType::Unsigned32,
                        access_type: AccessType::Ro,
                        default_value: "0x00000000".into(),
                        ..Default::default()
                    }),
                ),
                object(
                    0x2100,
                    "Error status bits",
                    ObjectKind::Var(VarDefinition {
                        data_type: DataType::OctetString,
                        access_type: AccessType::Rw,
                        pdo_mapping: PdoMapping::Tpdo,
                        default_value: "00 00 00".into(),
                        ..Default::default()
                    }),
                ),
                object(
                    0x6401,
                    "Read analog input",
                    ObjectKind::Array(ArrayDefinition {
                        data_type: DataType::Integer16,
                        access_type: AccessType::Rw,
                        pdo_mapping: PdoMapping::Optional,
                        tpdo_detect_cos: false,
                        subs: vec![
                            SubObject {
                                sub_index: 0,
                                name: "Number of inputs".into(),
                                data_type: DataType::Unsigned8,
                                access_type: AccessType::Ro,
                                default_value: "1".into(),
                                ..Default::default()
                            },
                            SubObject {
                                sub_index: 1,
                                name: "Input".into(),
                                default_value: "0".into(),
                                ..Default::default()
                            },
                        ],
                    }),
                ),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_eds_sections() {
        let description = description();
        let eds = render(&description, &analyze(&description));

        assert_contains!(
            eds,
            "BaudRate_10=0\nBaudRate_20=0\nBaudRate_50=0\nBaudRate_125=1\nBaudRate_250=1\n"
        );
        assert_contains!(eds, "NrOfRXPDO=4\nNrOfTXPDO=0\n");
        assert_contains!(
            eds,
            "[Comments]\nLines=5\nLine1=EDS File for CANopen device\n"
        );
        assert_contains!(eds, "Line4=Generated by odgen\nLine5=odgen version ");
        assert_contains!(eds, "[DummyUsage]\nDummy0001=0\nDummy0002=1\n");
        assert_contains!(
            eds,
            "Dummy0007=1\n\n\n[MandatoryObjects]\nSupportedObjects=3\n1=0x1000\n2=0x1001\n3=0x1018\n"
        );
        assert_contains!(eds, "[OptionalObjects]\nSupportedObjects=1\n1=0x6401\n");
        assert_contains!(eds, "[ManufacturerObjects]\nSupportedObjects=1\n1=0x2100\n");

        assert_contains!(
            eds,
            "[1000]\nParameterName=Device type\nObjectType=7\nDataType=0x0007\nAccessType=ro\nPDOMapping=0\nDefaultValue=0x00000000\n\n"
        );
        assert_contains!(
            eds,
            "[2100]\nParameterName=Error status bits\nObjectType=7\nDataType=0x000A\nAccessType=rwr\nPDOMapping=1\nDefaultValue=000000\n\n"
        );
        assert_contains!(
            eds,
            "[6401]\nParameterName=Read analog input\nObjectType=8\nSubNumber=2\n\n"
        );
        assert_contains!(
            eds,
            "[6401sub0]\nParameterName=Number of inputs\nObjectType=7\nDataType=0x0005\nAccessType=ro\nPDOMapping=0\n"
        );
        assert_contains!(
            eds,
            "[6401sub1]\nParameterName=Input\nObjectType=7\nDataType=0x0003\nAccessType=rww\nPDOMapping=1\nDefaultValue=0\n\n"
        );
    }
}
