//! HTML documentation
//!
//! A single XHTML page, with a fixed index pane on the left listing every object, followed by the
//! file information, device identity, features and one section per object.
use odgen_common::device_description::{DeviceIdentity, Feature, Label};
use odgen_common::objects::ObjectCode;
use odgen_common::DeviceDescription;
use snafu::ResultExt;

use crate::analyzer::Analysis;
use crate::emit::Division;
use crate::errors::{CompileError, MarkupSnafu};
use crate::features::FeatureSummary;
use crate::markup::{self, Element};
use crate::tables::{ObjectSheet, SheetAccess, SheetEntry};

const DOCTYPE: &str = "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\">\n";

const STYLE: &str = "
    body {
      margin-left: 6em;
    }

    div#object_index {
      position: fixed;
      width: 5em;
      height: 100%;
      background-color: rgb(165, 186, 221);
      border-right: 1px solid black;
      top: 0px;
      left: 0px;
      text-align: center;
      overflow: auto;
    }

    div#object_index a {
      display: block;
      width: 99%;
      text-decoration: none;
    }

    div#object_index a:link {color: black;}
    div#object_index a:visited {color: maroon;}
    div#object_index a:hover {font-weight: bold;}

    @media print {
      div#object_index {display: none;}
      body {margin-left: 0;}
    }
  ";

fn link(href: impl Into<String>, text: impl Into<String>) -> Element {
    Element::new("a").attr("href", href).text(text)
}

fn list_item(href: impl Into<String>, text: impl Into<String>) -> Element {
    Element::new("li").child(link(href, text))
}

fn header_row(titles: &[&str]) -> Element {
    Element::new("tr").children(titles.iter().map(|title| Element::new("th").text(*title)))
}

fn row(cells: Vec<String>) -> Element {
    Element::new("tr").children(cells.into_iter().map(|cell| Element::new("td").text(cell)))
}

fn property_row(title: &str, value: Element) -> Element {
    Element::new("tr")
        .child(Element::new("th").text(title))
        .child(value)
}

fn yes_no(value: bool) -> String {
    let text = if value { "yes" } else { "no" };
    text.to_string()
}

fn object_href(index: u16) -> String {
    format!("object_{index:04X}")
}

/// Localized labels, one block per language in sorted order
fn label_blocks(labels: &[Label]) -> Vec<Element> {
    let mut langs: Vec<&str> = labels.iter().map(|l| l.lang.as_str()).collect();
    langs.sort_unstable();
    langs.dedup();

    let mut blocks = Vec::new();
    for (i, lang) in langs.into_iter().enumerate() {
        let Some(label) = labels.iter().find(|l| l.lang == lang) else {
            continue;
        };
        if label.label.is_empty() && label.description.is_empty() {
            continue;
        }
        if i > 0 {
            blocks.push(Element::new("br"));
        }
        let mut block = Element::new("div")
            .class(format!("description lang_{lang}"))
            .child(Element::new("h4").text(format!("{lang}: {}", label.label)));
        if !label.description.is_empty() {
            let mut description = Element::new("div");
            for (n, line) in label.description.lines().enumerate() {
                if n > 0 {
                    description.push(Element::new("br"));
                }
                description = description.text(line);
            }
            block.push(description);
        }
        if let Some(uri) = &label.uri {
            block.push(link(uri.as_str(), "More...").attr("target", "infoWindow"));
        }
        blocks.push(block);
    }
    blocks
}

fn labels_cell(list: &[Label]) -> Element {
    Element::new("td").children(label_blocks(list))
}

fn identity_table(identity: &DeviceIdentity) -> Element {
    let text = |value: &str| Element::new("td").text(value);
    let mut table = Element::new("table");
    let mut add = |title: &str, present: bool, value: Element| {
        if present {
            table.push(property_row(title, value));
        }
    };

    add("Vendor name", !identity.vendor_name.is_empty(), text(&identity.vendor_name));
    add("Vendor ID", !identity.vendor_id.is_empty(), text(&identity.vendor_id));
    add(
        "Vendor Text",
        !identity.vendor_text.is_empty(),
        labels_cell(&identity.vendor_text),
    );
    add("Product Name", !identity.product_name.is_empty(), text(&identity.product_name));
    add(
        "Product Family",
        !identity.product_family.is_empty(),
        text(&identity.product_family),
    );
    add("Product ID", !identity.product_id.is_empty(), text(&identity.product_id));
    add(
        "Product Text",
        !identity.product_text.is_empty(),
        labels_cell(&identity.product_text),
    );
    add(
        "Device Family",
        !identity.device_family.is_empty(),
        labels_cell(&identity.device_family),
    );
    add(
        "Order Number",
        !identity.order_numbers.is_empty(),
        Element::new("td").children(
            identity
                .order_numbers
                .iter()
                .map(|number| Element::new("div").text(number.as_str())),
        ),
    );
    add(
        "Version",
        !identity.versions.is_empty(),
        Element::new("td").children(identity.versions.iter().map(|version| {
            Element::new("div").text(format!(
                "Version Type={}, version={}",
                version.version_type, version.value
            ))
        })),
    );
    add("Build Date", !identity.build_date.is_empty(), text(&identity.build_date));
    add(
        "Specification Revision",
        !identity.specification_revision.is_empty(),
        text(&identity.specification_revision),
    );
    add(
        "Instance Name",
        !identity.instance_name.is_empty(),
        text(&identity.instance_name),
    );
    table
}

fn file_info_table(description: &DeviceDescription) -> Element {
    let file = &description.file;
    let rows = [
        ("File Name", &file.file_name),
        ("File Version", &file.file_version),
        ("Creation Time", &file.file_creation_time),
        ("Creation Date", &file.file_creation_date),
        ("Created By", &file.file_creator),
    ];
    Element::new("table").children(
        rows.into_iter()
            .map(|(title, value)| property_row(title, Element::new("td").text(value.as_str()))),
    )
}

fn feature_href(summary: &FeatureSummary) -> String {
    format!("feature_{}", summary.macro_name)
}

fn feature_section(feature: &Feature, summary: &FeatureSummary, sheets: &[ObjectSheet]) -> Element {
    let object_name = |index: u16| {
        sheets
            .iter()
            .find(|sheet| sheet.index == index)
            .map(|sheet| sheet.name.clone())
            .unwrap_or_default()
    };

    let mut section = Element::new("div")
        .id(feature_href(summary))
        .class("elements")
        .child(Element::new("h3").text(format!("{}, value = {}", summary.name, summary.value)))
        .child(Element::new("h4").text("Associated objects:"));

    if !feature.associated_objects.is_empty() {
        let rows = feature.associated_objects.iter().map(|object| {
            row(vec![
                object_name(object.index),
                format!("{:04X}", object.index),
                object
                    .index_max
                    .map(|max| format!("{max:04X}"))
                    .unwrap_or_default(),
                object
                    .index_step
                    .map(|step| step.to_string())
                    .unwrap_or_default(),
            ])
        });
        section.push(
            Element::new("table")
                .child(header_row(&["Name", "Index", "Max Index", "Index step"]))
                .children(rows),
        );
    }
    section.children(label_blocks(&feature.labels))
}

fn value_table(sheet: &ObjectSheet, value: &SheetEntry) -> Vec<Element> {
    vec![Element::new("table")
        .child(header_row(&[
            "Object Type",
            "Memory Type",
            "Data Type",
            "Access Type",
            "PDO Mapping",
            "TPDO detects COS",
            "Default value",
            "Actual value",
        ]))
        .child(row(vec![
            "Var".into(),
            sheet.memory_type.to_string(),
            value.data_type.to_string(),
            value.access_type.to_string(),
            value.pdo_mapping.to_string(),
            yes_no(value.tpdo_detect_cos),
            value.default_value.clone(),
            value.actual_value.clone(),
        ]))]
}

fn array_tables(sheet: &ObjectSheet, value: &SheetEntry) -> Vec<Element> {
    let elements = sheet.subs.iter().map(|sub| {
        row(vec![
            format!("{:02X}", sub.sub_index),
            sub.name.clone(),
            sub.default_value.clone(),
            sub.actual_value.clone(),
        ])
    });
    vec![
        Element::new("table")
            .child(header_row(&[
                "Object Type",
                "Sub Number",
                "Memory Type",
                "Data Type",
                "Access Type",
                "PDO Mapping",
                "TPDO detects COS",
            ]))
            .child(row(vec![
                "Array".into(),
                sheet.subs.len().to_string(),
                sheet.memory_type.to_string(),
                value.data_type.to_string(),
                value.access_type.to_string(),
                value.pdo_mapping.to_string(),
                yes_no(value.tpdo_detect_cos),
            ])),
        Element::new("br"),
        Element::new("table")
            .child(header_row(&["Subindex", "Name", "Default value", "Actual value"]))
            .children(elements),
    ]
}

fn record_tables(sheet: &ObjectSheet) -> Vec<Element> {
    let fields = sheet.subs.iter().map(|sub| {
        row(vec![
            format!("{:02X}", sub.sub_index),
            sub.name.clone(),
            sub.data_type.to_string(),
            sub.access_type.to_string(),
            sub.pdo_mapping.to_string(),
            yes_no(sub.tpdo_detect_cos),
            sub.default_value.clone(),
            sub.actual_value.clone(),
        ])
    });
    vec![
        Element::new("table")
            .child(header_row(&["Object Type", "Sub Number", "Memory Type"]))
            .child(row(vec![
                "Record".into(),
                sheet.subs.len().to_string(),
                sheet.memory_type.to_string(),
            ])),
        Element::new("br"),
        Element::new("table")
            .child(header_row(&[
                "Subindex",
                "Name",
                "Data Type",
                "Access Type",
                "PDO Mapping",
                "TPDO detects COS",
                "Default value",
                "Actual value",
            ]))
            .children(fields),
    ]
}

fn access_notice(access: &SheetAccess) -> Option<Element> {
    match access {
        SheetAccess::Default => None,
        SheetAccess::External(name) => Some(Element::new("h4").text(format!(
            "Default SDO Server access to object is replaced by external function: \"{name}\"."
        ))),
        SheetAccess::Injected(function) => Some(
            Element::new("div")
                .child(Element::new("h4").text(
                    "Default SDO Server access to object is overrode by user defined function:",
                ))
                .child(Element::new("pre").text(function.trim_end())),
        ),
    }
}

fn object_section(sheet: &ObjectSheet) -> Element {
    let contents = match (sheet.object_code, &sheet.value) {
        (ObjectCode::Var, Some(value)) => value_table(sheet, value),
        (ObjectCode::Array, Some(value)) => array_tables(sheet, value),
        _ => record_tables(sheet),
    };
    Element::new("div")
        .id(object_href(sheet.index))
        .class("elements")
        .child(Element::new("h3").text(format!("{:04X} - {}", sheet.index, sheet.name)))
        .children(contents)
        .children(access_notice(&sheet.access))
        .children(label_blocks(&sheet.labels))
}

fn division_sheets(sheets: &[ObjectSheet], division: Division) -> impl Iterator<Item = &ObjectSheet> {
    sheets
        .iter()
        .filter(move |sheet| Division::of(sheet.index) == division)
}

fn object_links(sheets: &[ObjectSheet], division: Division) -> Element {
    Element::new("ul").children(division_sheets(sheets, division).map(|sheet| {
        Element::new("li")
            .child(link(format!("#{}", object_href(sheet.index)), format!("{:04X}", sheet.index)))
            .text(format!(" - {}", sheet.name))
    }))
}

const DIVISIONS: [(Division, &str, &str); 3] = [
    (Division::Communication, "objDictComm", "Communication Profile"),
    (Division::Manufacturer, "objDictManuf", "Manufacturer specific"),
    (Division::DeviceProfile, "objDictProfile", "Device Profile"),
];

/// Render the HTML documentation
pub fn render(description: &DeviceDescription, analysis: &Analysis) -> Result<String, CompileError> {
    let file_name = &description.file.file_name;
    let sheets = &analysis.tables.sheets;
    let enabled_features: Vec<(&Feature, &FeatureSummary)> = description
        .features
        .iter()
        .zip(&analysis.features)
        .filter(|(_, summary)| summary.value != 0)
        .collect();

    let head = Element::new("head")
        .child(
            Element::new("meta")
                .attr("http-equiv", "Content-Type")
                .attr("content", "text/html; charset=UTF-8"),
        )
        .child(Element::new("title").text(format!("{file_name} - odgen")))
        .child(Element::new("style").attr("type", "text/css").text(STYLE))
        .child(
            Element::new("link")
                .attr("rel", "stylesheet")
                .attr("type", "text/css")
                .attr("href", "stylesheet.css"),
        );

    let title = Element::new("div")
        .id("title")
        .class("main_chapters")
        .child(Element::new("h1").text("Documentation for CANopen device"))
        .child(Element::new("h2").text(file_name.as_str()));

    let object_index = Element::new("div")
        .id("object_index")
        .child(
            Element::new("a")
                .attr("href", "#")
                .attr("title", "Top")
                .child(Element::new("b").text("Index:")),
        )
        .children(sheets.iter().map(|sheet| {
            link(format!("#{}", object_href(sheet.index)), format!("{:04X}", sheet.index))
                .attr("title", sheet.name.as_str())
        }));

    let features_index = Element::new("ul").children(enabled_features.iter().map(|(_, summary)| {
        Element::new("li")
            .child(link(format!("#{}", feature_href(summary)), summary.name.as_str()))
            .text(format!(" (value = {})", summary.value))
    }));
    let mut dictionary_index = Element::new("ul");
    for (division, id, title) in DIVISIONS {
        dictionary_index.push(list_item(format!("#{id}"), title));
        dictionary_index.push(object_links(sheets, division));
    }
    let contents = Element::new("div")
        .id("contents")
        .class("main_chapters")
        .child(Element::new("h2").text("Contents"))
        .child(
            Element::new("ul")
                .child(list_item("#intro", "Introduction"))
                .child(list_item("#identity", "Device Identity"))
                .child(list_item("#features", "CANopen features"))
                .child(features_index)
                .child(list_item("#objDict", "Object Dictionary"))
                .child(dictionary_index),
        );

    let intro = Element::new("div")
        .id("intro")
        .class("main_chapters")
        .child(Element::new("h2").text("Introduction"))
        .child(Element::new("p").text(
            "This document contains description for CANopen Device specified in Device Identity section.",
        ))
        .child(Element::new("p").text("File information:"))
        .child(file_info_table(description))
        .child(Element::new("p").text("This document was generated by odgen."));

    let identity = Element::new("div")
        .id("identity")
        .class("main_chapters")
        .child(Element::new("h2").text("Device Identity"))
        .child(identity_table(&description.identity));

    let features = Element::new("div")
        .id("features")
        .class("main_chapters")
        .child(Element::new("h2").text("CANopen features"))
        .children(
            enabled_features
                .iter()
                .map(|(feature, summary)| feature_section(feature, summary, sheets)),
        );

    let mut dictionary = Element::new("div")
        .id("objDict")
        .class("main_chapters")
        .child(Element::new("h2").text("Object Dictionary"));
    for (division, id, title) in DIVISIONS {
        dictionary.push(
            Element::new("div")
                .id(id)
                .child(Element::new("h3").text(title))
                .children(division_sheets(sheets, division).map(object_section)),
        );
    }

    let footer = Element::new("div")
        .id("footer")
        .class("main_chapters")
        .child(Element::new("hr"))
        .child(Element::new("em").text("Generated by odgen."));

    let html = Element::new("html")
        .attr("xmlns", "http://www.w3.org/1999/xhtml")
        .child(head)
        .child(
            Element::new("body")
                .child(title)
                .child(object_index)
                .child(contents)
                .child(intro)
                .child(identity)
                .child(features)
                .child(dictionary)
                .child(footer),
        );

    let body = markup::render(&html).context(MarkupSnafu)?;
    Ok(format!("{DOCTYPE}{body}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use assertables::{assert_contains, assert_not_contains};
    use odgen_common::device_description::{
        AssociatedObjectRef, CanOpenObject, ObjectKind, VarDefinition,
    };
    use odgen_common::objects::{AccessType, DataType, MemoryType};

    fn var(index: u16, name: &str) -> CanOpenObject {
        CanOpenObject {
            index,
            name: name.into(),
            memory_type: MemoryType::Ram,
            disabled: false,
            access_function: None,
            access_function_pre_code: None,
            access_function_post_code: None,
            labels: Vec::new(),
            kind: ObjectKind::Var(VarDefinition {
                data_type: DataType::Unsigned8,
                access_type: AccessType::Rw,
                default_value: "0".into(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_doc_sections() {
        let mut description = DeviceDescription {
            features: vec![
                Feature {
                    name: "SYNC".into(),
                    value: 1,
                    associated_objects: vec![AssociatedObjectRef {
                        index: 0x1005,
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                Feature {
                    name: "Time".into(),
                    value: 0,
                    ..Default::default()
                },
            ],
            objects: vec![var(0x1005, "COB ID SYNC"), var(0x2100, "Status <bits>")],
            ..Default::default()
        };
        description.file.file_name = "demo.toml".into();
        description.identity.vendor_name = "ACME".into();
        description.objects[1].access_function = Some("CO_ODF_status".into());
        description.objects[1].labels = vec![Label {
            lang: "en".into(),
            label: "Status".into(),
            description: "First line\nSecond line".into(),
            uri: Some("http://example.com/status".into()),
        }];

        let doc = render(&description, &analyze(&description)).expect("renders");

        assert!(doc.starts_with("<!DOCTYPE html PUBLIC"));
        assert_contains!(doc, "<title>demo.toml - odgen</title>");
        assert_contains!(doc, "<th>Vendor name</th>");
        assert_not_contains!(doc, "<th>Vendor ID</th>");
        assert_contains!(doc, "<a href=\"#object_2100\" title=\"Status &lt;bits&gt;\">2100</a>");
        assert_contains!(doc, "<h3>SYNC, value = 1</h3>");
        assert_not_contains!(doc, "Time, value");
        assert_contains!(doc, "<td>COB ID SYNC</td>");
        assert_contains!(doc, "<h3>2100 - Status &lt;bits&gt;</h3>");
        assert_contains!(
            doc,
            "<h4>Default SDO Server access to object is replaced by external function: "
        );
        assert_contains!(doc, "CO_ODF_status");
        assert_contains!(doc, "<div class=\"description lang_en\">");
        assert_contains!(doc, "<h4>en: Status</h4>");
        assert_contains!(doc, "First line<br/>Second line");
        assert_contains!(doc, "target=\"infoWindow\">More...</a>");

        let comm = doc.find("<div id=\"objDictComm\">").unwrap_or(usize::MAX);
        let manuf = doc.find("<div id=\"objDictManuf\">").unwrap_or(0);
        let status = doc.find("<h3>2100 - ").unwrap_or(0);
        assert!(comm < manuf && manuf < status);
    }

    #[test]
    fn test_injected_function_is_shown() {
        let mut object = var(0x2000, "Counter");
        object.access_function_pre_code = Some("if (WRITING) counter++;".into());
        let description = DeviceDescription {
            objects: vec![object],
            ..Default::default()
        };

        let doc = render(&description, &analyze(&description)).expect("renders");
        assert_contains!(doc, "overrode by user defined function:</h4>");
        assert_contains!(doc, "<pre>UNSIGNED32 CO_ODF_2000(");
        assert_contains!(doc, "  if (WRITING) counter++;\n");
    }
}
