//! CANopen XML device description
//!
//! The document is an `ISO15745ProfileContainer` holding two profiles: the device profile with
//! the identity and features, and the communication network profile with the object list and
//! physical layer.
use odgen_common::device_description::{DeviceIdentity, Label};
use odgen_common::objects::ObjectCode;
use odgen_common::DeviceDescription;
use serde::Serialize;
use snafu::ResultExt;

use crate::analyzer::Analysis;
use crate::errors::{CompileError, XmlSerializeSnafu};
use crate::tables::{ObjectSheet, SheetEntry};

const XML_DECLARATION: &str = "<?xml version=\"1.0\"?>\n";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "CANopen_Main.xsd";

#[derive(Debug, Serialize)]
#[serde(rename = "ISO15745ProfileContainer")]
struct ProfileContainer {
    #[serde(rename = "@xmlns:xsi")]
    xmlns_xsi: &'static str,
    #[serde(rename = "@xsi:noNamespaceSchemaLocation")]
    schema_location: &'static str,
    #[serde(rename = "ISO15745Profile")]
    profiles: Vec<Profile>,
}

#[derive(Debug, Serialize)]
struct Profile {
    #[serde(rename = "ProfileHeader")]
    header: ProfileHeader,
    #[serde(rename = "ProfileBody")]
    body: ProfileBody,
}

#[derive(Debug, Serialize)]
struct ProfileHeader {
    #[serde(rename = "ProfileIdentification")]
    identification: &'static str,
    #[serde(rename = "ProfileRevision")]
    revision: &'static str,
    #[serde(rename = "ProfileName")]
    name: String,
    #[serde(rename = "ProfileSource")]
    source: String,
    #[serde(rename = "ProfileClassID")]
    class_id: &'static str,
    #[serde(rename = "ISO15745Reference")]
    reference: Iso15745Reference,
}

#[derive(Debug, Serialize)]
struct Iso15745Reference {
    #[serde(rename = "ISO15745Part")]
    part: &'static str,
    #[serde(rename = "ISO15745Edition")]
    edition: &'static str,
    #[serde(rename = "ProfileTechnology")]
    technology: &'static str,
}

impl Default for Iso15745Reference {
    fn default() -> Self {
        Self {
            part: "1",
            edition: "1",
            technology: "CANopen",
        }
    }
}

#[derive(Debug, Serialize)]
struct ProfileBody {
    #[serde(rename = "@xsi:type")]
    body_type: &'static str,
    #[serde(rename = "@fileName")]
    file_name: String,
    #[serde(rename = "@fileCreator")]
    file_creator: String,
    #[serde(rename = "@fileCreationDate")]
    file_creation_date: String,
    #[serde(rename = "@fileCreationTime")]
    file_creation_time: String,
    #[serde(rename = "@fileVersion")]
    file_version: String,
    #[serde(rename = "DeviceIdentity", skip_serializing_if = "Option::is_none")]
    identity: Option<XddIdentity>,
    #[serde(rename = "DeviceFunction", skip_serializing_if = "Option::is_none")]
    function: Option<DeviceFunction>,
    #[serde(rename = "ApplicationLayers", skip_serializing_if = "Option::is_none")]
    application_layers: Option<ApplicationLayers>,
    #[serde(rename = "TransportLayers", skip_serializing_if = "Option::is_none")]
    transport_layers: Option<TransportLayers>,
}

/// A list of localized labels and descriptions
#[derive(Debug, Serialize)]
struct Labels {
    #[serde(rename = "$value")]
    items: Vec<LabelItem>,
}

#[derive(Debug, Serialize)]
enum LabelItem {
    #[serde(rename = "label")]
    Label(LocalizedText),
    #[serde(rename = "description")]
    Description(LocalizedDescription),
}

#[derive(Debug, Serialize)]
struct LocalizedText {
    #[serde(rename = "@lang")]
    lang: String,
    #[serde(rename = "$value")]
    text: String,
}

#[derive(Debug, Serialize)]
struct LocalizedDescription {
    #[serde(rename = "@lang")]
    lang: String,
    #[serde(rename = "@URI", skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    #[serde(rename = "$value")]
    text: String,
}

impl Labels {
    fn single(lang: &str, text: String) -> Self {
        Self {
            items: vec![LabelItem::Label(LocalizedText {
                lang: lang.into(),
                text,
            })],
        }
    }

    fn from_labels(labels: &[Label]) -> Option<Self> {
        if labels.is_empty() {
            return None;
        }
        let mut items = Vec::new();
        for label in labels {
            items.push(LabelItem::Label(LocalizedText {
                lang: label.lang.clone(),
                text: label.label.clone(),
            }));
            if !label.description.is_empty() {
                items.push(LabelItem::Description(LocalizedDescription {
                    lang: label.lang.clone(),
                    uri: label.uri.clone(),
                    text: label.description.clone(),
                }));
            }
        }
        Some(Self { items })
    }
}

#[derive(Debug, Serialize)]
struct XddVersion {
    #[serde(rename = "@versionType")]
    version_type: String,
    #[serde(rename = "$value")]
    value: String,
}

#[derive(Debug, Serialize)]
struct XddIdentity {
    #[serde(rename = "vendorName")]
    vendor_name: String,
    #[serde(rename = "vendorID", skip_serializing_if = "Option::is_none")]
    vendor_id: Option<String>,
    #[serde(rename = "vendorText", skip_serializing_if = "Option::is_none")]
    vendor_text: Option<Labels>,
    #[serde(rename = "deviceFamily", skip_serializing_if = "Option::is_none")]
    device_family: Option<Labels>,
    #[serde(rename = "productFamily", skip_serializing_if = "Option::is_none")]
    product_family: Option<String>,
    #[serde(rename = "productName")]
    product_name: String,
    #[serde(rename = "productID", skip_serializing_if = "Option::is_none")]
    product_id: Option<String>,
    #[serde(rename = "productText", skip_serializing_if = "Option::is_none")]
    product_text: Option<Labels>,
    #[serde(rename = "orderNumber", skip_serializing_if = "Vec::is_empty")]
    order_numbers: Vec<String>,
    #[serde(rename = "version", skip_serializing_if = "Vec::is_empty")]
    versions: Vec<XddVersion>,
    #[serde(rename = "buildDate", skip_serializing_if = "Option::is_none")]
    build_date: Option<String>,
    #[serde(rename = "specificationRevision", skip_serializing_if = "Option::is_none")]
    specification_revision: Option<String>,
    #[serde(rename = "instanceName", skip_serializing_if = "Option::is_none")]
    instance_name: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl From<&DeviceIdentity> for XddIdentity {
    fn from(identity: &DeviceIdentity) -> Self {
        Self {
            vendor_name: identity.vendor_name.clone(),
            vendor_id: non_empty(&identity.vendor_id),
            vendor_text: Labels::from_labels(&identity.vendor_text),
            device_family: Labels::from_labels(&identity.device_family),
            product_family: non_empty(&identity.product_family),
            product_name: identity.product_name.clone(),
            product_id: non_empty(&identity.product_id),
            product_text: Labels::from_labels(&identity.product_text),
            order_numbers: identity.order_numbers.clone(),
            versions: identity
                .versions
                .iter()
                .map(|v| XddVersion {
                    version_type: v.version_type.clone(),
                    value: v.value.clone(),
                })
                .collect(),
            build_date: non_empty(&identity.build_date),
            specification_revision: non_empty(&identity.specification_revision),
            instance_name: non_empty(&identity.instance_name),
        }
    }
}

#[derive(Debug, Serialize)]
struct DeviceFunction {
    capabilities: Capabilities,
}

#[derive(Debug, Serialize)]
struct Capabilities {
    #[serde(rename = "characteristicsList")]
    characteristics_list: CharacteristicsList,
}

#[derive(Debug, Serialize)]
struct CharacteristicsList {
    #[serde(rename = "characteristic", skip_serializing_if = "Vec::is_empty")]
    characteristics: Vec<Characteristic>,
}

#[derive(Debug, Serialize)]
struct Characteristic {
    #[serde(rename = "characteristicName")]
    name: Labels,
    #[serde(rename = "characteristicContent")]
    content: Labels,
}

#[derive(Debug, Serialize)]
struct ApplicationLayers {
    #[serde(rename = "CANopenObjectList")]
    object_list: ObjectList,
    #[serde(rename = "dummyUsage")]
    dummy_usage: DummyUsage,
}

#[derive(Debug, Serialize)]
struct ObjectList {
    #[serde(rename = "CANopenObject", skip_serializing_if = "Vec::is_empty")]
    objects: Vec<XddObject>,
}

#[derive(Debug, Serialize)]
struct XddObject {
    #[serde(rename = "@index")]
    index: String,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@objectType")]
    object_type: u8,
    #[serde(rename = "@dataType", skip_serializing_if = "Option::is_none")]
    data_type: Option<String>,
    #[serde(rename = "@accessType", skip_serializing_if = "Option::is_none")]
    access_type: Option<&'static str>,
    #[serde(rename = "@defaultValue", skip_serializing_if = "Option::is_none")]
    default_value: Option<String>,
    #[serde(rename = "@PDOmapping", skip_serializing_if = "Option::is_none")]
    pdo_mapping: Option<&'static str>,
    #[serde(rename = "@subNumber", skip_serializing_if = "Option::is_none")]
    sub_number: Option<usize>,
    #[serde(rename = "CANopenSubObject", skip_serializing_if = "Vec::is_empty")]
    subs: Vec<XddSubObject>,
}

#[derive(Debug, Serialize)]
struct XddSubObject {
    #[serde(rename = "@subIndex")]
    sub_index: String,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@objectType")]
    object_type: u8,
    #[serde(rename = "@dataType")]
    data_type: String,
    #[serde(rename = "@accessType")]
    access_type: &'static str,
    #[serde(rename = "@defaultValue")]
    default_value: String,
    #[serde(rename = "@PDOmapping")]
    pdo_mapping: &'static str,
}

#[derive(Debug, Serialize)]
struct DummyUsage {
    #[serde(rename = "dummy")]
    dummies: Vec<Dummy>,
}

#[derive(Debug, Serialize)]
struct Dummy {
    #[serde(rename = "@entry")]
    entry: String,
}

#[derive(Debug, Serialize)]
struct TransportLayers {
    #[serde(rename = "PhysicalLayer")]
    physical_layer: PhysicalLayer,
}

#[derive(Debug, Serialize)]
struct PhysicalLayer {
    #[serde(rename = "baudRate")]
    baud_rate: BaudRate,
}

#[derive(Debug, Serialize)]
struct BaudRate {
    #[serde(rename = "@defaultValue")]
    default_value: String,
    #[serde(rename = "supportedBaudRate", skip_serializing_if = "Vec::is_empty")]
    supported: Vec<SupportedBaudRate>,
}

#[derive(Debug, Serialize)]
struct SupportedBaudRate {
    #[serde(rename = "@value")]
    value: String,
}

fn data_type_code(entry: &SheetEntry) -> String {
    format!("{:04X}", entry.data_type.code())
}

fn xdd_sub_object(entry: &SheetEntry) -> XddSubObject {
    XddSubObject {
        sub_index: format!("{:02X}", entry.sub_index),
        name: entry.name.clone(),
        object_type: ObjectCode::Var.code(),
        data_type: data_type_code(entry),
        access_type: entry.access_type.as_str(),
        default_value: entry.default_value.clone(),
        pdo_mapping: entry.pdo_mapping.as_str(),
    }
}

fn xdd_object(sheet: &ObjectSheet) -> XddObject {
    let mut object = XddObject {
        index: format!("{:04X}", sheet.index),
        name: sheet.name.clone(),
        object_type: sheet.object_code.code(),
        data_type: None,
        access_type: None,
        default_value: None,
        pdo_mapping: None,
        sub_number: None,
        subs: Vec::new(),
    };
    match (&sheet.value, sheet.object_code) {
        (Some(value), ObjectCode::Var) => {
            object.data_type = Some(data_type_code(value));
            object.access_type = Some(value.access_type.as_str());
            object.default_value = Some(value.default_value.clone());
            object.pdo_mapping = Some(value.pdo_mapping.as_str());
        }
        _ => {
            object.sub_number = Some(sheet.subs.len());
            object.subs = sheet.subs.iter().map(xdd_sub_object).collect();
        }
    }
    object
}

fn profile_body(description: &DeviceDescription, body_type: &'static str) -> ProfileBody {
    let file = &description.file;
    ProfileBody {
        body_type,
        file_name: file.file_name.clone(),
        file_creator: file.file_creator.clone(),
        file_creation_date: file.file_creation_date.clone(),
        file_creation_time: file.file_creation_time.clone(),
        file_version: file.file_version.clone(),
        identity: None,
        function: None,
        application_layers: None,
        transport_layers: None,
    }
}

fn profile_header(
    description: &DeviceDescription,
    identification: &'static str,
    class_id: &'static str,
) -> ProfileHeader {
    ProfileHeader {
        identification,
        revision: "1",
        name: description.identity.product_name.clone(),
        source: String::new(),
        class_id,
        reference: Iso15745Reference::default(),
    }
}

fn baud_rate_text(rate: u16) -> String {
    format!("{rate} Kbps")
}

/// Render the XML device description
pub fn render(description: &DeviceDescription, analysis: &Analysis) -> Result<String, CompileError> {
    let characteristics = analysis
        .features
        .iter()
        .filter(|feature| feature.value != 0)
        .map(|feature| Characteristic {
            name: Labels::single("en", feature.name.clone()),
            content: Labels::single("en", feature.value.to_string()),
        })
        .collect();

    let mut device_body = profile_body(description, "ProfileBody_Device_CANopen");
    device_body.identity = Some(XddIdentity::from(&description.identity));
    device_body.function = Some(DeviceFunction {
        capabilities: Capabilities {
            characteristics_list: CharacteristicsList { characteristics },
        },
    });

    let dummies = (1..=7u8)
        .map(|code| {
            let used = description
                .dummy_usage
                .iter()
                .any(|data_type| data_type.code() == code);
            Dummy {
                entry: format!("Dummy{code:04X}={}", u8::from(used)),
            }
        })
        .collect();

    let mut comm_body = profile_body(description, "ProfileBody_CommunicationNetwork_CANopen");
    comm_body.application_layers = Some(ApplicationLayers {
        object_list: ObjectList {
            objects: analysis.tables.sheets.iter().map(xdd_object).collect(),
        },
        dummy_usage: DummyUsage { dummies },
    });
    comm_body.transport_layers = Some(TransportLayers {
        physical_layer: PhysicalLayer {
            baud_rate: BaudRate {
                default_value: baud_rate_text(description.default_baud_rate),
                supported: description
                    .baud_rates
                    .iter()
                    .map(|rate| SupportedBaudRate {
                        value: baud_rate_text(*rate),
                    })
                    .collect(),
            },
        },
    });

    let container = ProfileContainer {
        xmlns_xsi: XSI_NAMESPACE,
        schema_location: SCHEMA_LOCATION,
        profiles: vec![
            Profile {
                header: profile_header(description, "CAN device profile", "Device"),
                body: device_body,
            },
            Profile {
                header: profile_header(
                    description,
                    "CAN comm net profile",
                    "CommunicationNetwork",
                ),
                body: comm_body,
            },
        ],
    };

    let mut buffer = String::new();
    let mut serializer = quick_xml::se::Serializer::new(&mut buffer);
    serializer.indent(' ', 2);
    container.serialize(serializer).context(XmlSerializeSnafu)?;

    Ok(format!("{XML_DECLARATION}{buffer}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use assertables::assert_contains;
    use odgen_common::device_description::{
        CanOpenObject, Feature, ObjectKind, RecordDefinition, SubObject, VarDefinition,
    };
    use odgen_common::objects::{AccessType, DataType, MemoryType};

    fn object(index: u16, name: &str, kind: ObjectKind) -> CanOpenObject {
        CanOpenObject {
            index,
            name: name.into(),
            memory_type: MemoryType::Rom,
            disabled: false,
            access_function: None,
            access_function_pre_code: None,
            access_function_post_code: None,
            labels: Vec::new(),
            kind,
        }
    }

    #[test]
    fn test_xdd_document() {
        let mut description = DeviceDescription {
            baud_rates: vec![125, 500],
            default_baud_rate: 125,
            features: vec![Feature {
                name: "SYNC".into(),
                value: 1,
                ..Default::default()
            }],
            objects: vec![
                object(
                    0x1000,
                    "Device type",
                    ObjectKind::Var(VarDefinition {
                        data_type: DataType::Unsigned32,
                        access_type: AccessType::Ro,
                        default_value: "0x0".into(),
                        ..Default::default()
                    }),
                ),
                object(
                    0x1018,
                    "Identity",
                    ObjectKind::Record(RecordDefinition {
                        subs: vec![
                            SubObject {
                                sub_index: 0,
                                name: "max sub-index".into(),
                                data_type: DataType::Unsigned8,
                                access_type: AccessType::Ro,
                                default_value: "1".into(),
                                ..Default::default()
                            },
                            SubObject {
                                sub_index: 1,
                                name: "Vendor-ID".into(),
                                data_type: DataType::Unsigned32,
                                access_type: AccessType::Ro,
                                default_value: "0x12345678".into(),
                                ..Default::default()
                            },
                        ],
                    }),
                ),
            ],
            ..Default::default()
        };
        description.identity.product_name = "Demo & Co".into();
        description.identity.order_numbers = vec!["A-1".into()];

        let xdd = render(&description, &analyze(&description)).expect("serializes");

        assert!(xdd.starts_with("<?xml version=\"1.0\"?>\n<ISO15745ProfileContainer"));
        assert_contains!(xdd, "xsi:noNamespaceSchemaLocation=\"CANopen_Main.xsd\"");
        assert_contains!(xdd, "<ProfileName>Demo &amp; Co</ProfileName>");
        assert_contains!(xdd, "<ProfileClassID>CommunicationNetwork</ProfileClassID>");
        assert_contains!(xdd, "xsi:type=\"ProfileBody_Device_CANopen\"");
        assert_contains!(xdd, "<orderNumber>A-1</orderNumber>");
        assert_contains!(xdd, "<label lang=\"en\">SYNC</label>");
        assert_contains!(
            xdd,
            "<CANopenObject index=\"1000\" name=\"Device type\" objectType=\"7\" dataType=\"0007\" accessType=\"ro\" defaultValue=\"0x0\" PDOmapping=\"no\"/>"
        );
        assert_contains!(
            xdd,
            "<CANopenObject index=\"1018\" name=\"Identity\" objectType=\"9\" subNumber=\"2\">"
        );
        assert_contains!(
            xdd,
            "<CANopenSubObject subIndex=\"01\" name=\"Vendor-ID\" objectType=\"7\" dataType=\"0007\" accessType=\"ro\" defaultValue=\"0x12345678\" PDOmapping=\"no\"/>"
        );
        assert_contains!(xdd, "<dummy entry=\"Dummy0001=0\"/>");
        assert_contains!(xdd, "<baudRate defaultValue=\"125 Kbps\">");
        assert_contains!(xdd, "<supportedBaudRate value=\"500 Kbps\"/>");
    }
}
