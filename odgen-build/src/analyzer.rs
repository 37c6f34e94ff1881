//! Object analysis
//!
//! Resolves every enabled object of a description into the storage it is generated into: its own
//! variable, or a slot of the combined group it belongs to. Group members are checked against
//! their anchor before any code is generated, so the outcome does not depend on the order in which
//! objects are declared.
use std::collections::{HashMap, HashSet};

use odgen_common::device_description::{AccessOverride, CanOpenObject, ObjectKind};
use odgen_common::objects::MemoryType;
use odgen_common::DeviceDescription;

use crate::codegen::{self, element_size, record_fields};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::features::{analyze_features, FeatureSummary};
use crate::groups::{GroupTable, SharedAttributes, SharedLayout, ValueLayout};
use crate::tables::{access_function_prototype, OdTables, SheetAccess, DEFAULT_ACCESS_FUNCTION};
use crate::values::{storage_name, storage_size};

/// Everything learned from a device description, ready to be emitted
#[derive(Debug)]
pub struct Analysis {
    /// One summary per feature, in declaration order
    pub features: Vec<FeatureSummary>,
    /// The generated tables
    pub tables: OdTables,
    /// Problems found along the way
    pub diagnostics: Vec<Diagnostic>,
}

/// Slot of an object in a combined group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placement {
    pub anchor: u16,
    pub slot: usize,
    pub count: usize,
}

/// An object together with the storage it is generated into
#[derive(Debug)]
pub(crate) struct ResolvedObject<'a> {
    pub object: &'a CanOpenObject,
    /// C name of the storage; the anchor's name for group members
    pub name: String,
    /// Memory of the storage; the anchor's memory for group members
    pub memory_type: MemoryType,
    pub group: Option<Placement>,
    /// Name of the SDO access function
    pub function: String,
    pub access: SheetAccess,
}

impl ResolvedObject<'_> {
    pub fn index(&self) -> u16 {
        self.object.index
    }

    /// True when the object declares its storage, i.e. it is ungrouped or a group anchor
    pub fn declares_storage(&self) -> bool {
        self.group.is_none_or(|g| g.anchor == self.index())
    }

    /// Array dimension added to the declaration of a group anchor
    pub fn dims(&self) -> String {
        match self.group {
            Some(group) => format!("[{}]", group.count),
            None => String::new(),
        }
    }

    /// Subscript selecting the object's slot in its group
    pub fn subscript(&self) -> String {
        match self.group {
            Some(group) => format!("[{}]", group.slot),
            None => String::new(),
        }
    }

    /// The `/*<index><dims>` comment opening a declaration, padded to a fixed width
    pub fn index_range(&self) -> String {
        format!("/*{:04X}{:<6.6}", self.index(), self.dims())
    }
}

/// Analyze a device description and generate the object dictionary tables
pub fn analyze(description: &DeviceDescription) -> Analysis {
    let mut groups = GroupTable::default();
    let features = analyze_features(&description.features, &mut groups);
    let mut diagnostics = Diagnostics::default();

    let objects = enabled_objects(&description.objects, &mut diagnostics);
    let present: HashMap<u16, &CanOpenObject> = objects.iter().map(|o| (o.index, *o)).collect();

    let mut tables = OdTables::default();
    let mut names: HashMap<String, u16> = HashMap::new();
    let mut external_functions: HashSet<String> = HashSet::new();

    for object in objects {
        let (function, access) = access_function(object, &mut tables, &mut external_functions);
        let resolved = resolve(object, &groups, &present, function, access, &mut diagnostics);

        if resolved.declares_storage() {
            if names.contains_key(&resolved.name) {
                diagnostics.push(Diagnostic::DuplicateName {
                    index: object.index,
                    name: resolved.name.clone(),
                });
            } else {
                names.insert(resolved.name.clone(), object.index);
            }
        }

        codegen::generate(&resolved, &mut tables, &mut diagnostics);
    }

    log::info!(
        "Generated {} objects with {} combined groups",
        tables.entries.len(),
        groups.anchors().count()
    );

    Analysis {
        features,
        tables,
        diagnostics: diagnostics.into_vec(),
    }
}

/// Drop disabled objects, and every repeat of an index already seen
fn enabled_objects<'a>(
    objects: &'a [CanOpenObject],
    diagnostics: &mut Diagnostics,
) -> Vec<&'a CanOpenObject> {
    let mut seen = HashSet::new();
    let mut enabled = Vec::new();
    for object in objects {
        if object.disabled {
            log::debug!("Skipping disabled object {:04X}", object.index);
            continue;
        }
        if !seen.insert(object.index) {
            diagnostics.push(Diagnostic::DuplicateIndex {
                index: object.index,
            });
            continue;
        }
        enabled.push(object);
    }
    enabled
}

fn resolve<'a>(
    object: &'a CanOpenObject,
    groups: &GroupTable,
    present: &HashMap<u16, &CanOpenObject>,
    function: String,
    access: SheetAccess,
    diagnostics: &mut Diagnostics,
) -> ResolvedObject<'a> {
    let mut resolved = ResolvedObject {
        object,
        name: storage_name(&object.name),
        memory_type: object.memory_type,
        group: None,
        function,
        access,
    };

    let Some(membership) = groups.membership(object.index) else {
        return resolved;
    };
    let Some(anchor) = present.get(&membership.anchor) else {
        diagnostics.push(Diagnostic::MissingGroupAnchor {
            index: object.index,
            anchor: membership.anchor,
        });
        return resolved;
    };

    if membership.anchor != object.index {
        let expected = shared_attributes(anchor);
        for field in expected.mismatches(&shared_attributes(object)) {
            diagnostics.push(Diagnostic::CombinedGroupMismatch {
                index: object.index,
                anchor: membership.anchor,
                field,
            });
        }
        resolved.name = storage_name(&anchor.name);
        resolved.memory_type = anchor.memory_type;
    }
    resolved.group = Some(Placement {
        anchor: membership.anchor,
        slot: membership.slot,
        count: groups.count(membership.anchor).unwrap_or(1),
    });
    resolved
}

/// Collect the attributes a combined group member has to share with its anchor
fn shared_attributes(object: &CanOpenObject) -> SharedAttributes {
    let layout = match &object.kind {
        ObjectKind::Var(def) => SharedLayout::Var(ValueLayout {
            data_type: def.data_type,
            access_type: def.access_type,
            pdo_mapping: def.pdo_mapping,
            size: storage_size(def.data_type, &def.default_value),
        }),
        ObjectKind::Array(def) => SharedLayout::Array(ValueLayout {
            data_type: def.data_type,
            access_type: def.access_type,
            pdo_mapping: def.pdo_mapping,
            size: element_size(def),
        }),
        ObjectKind::Record(def) => {
            let fields = record_fields(&def.subs, object.memory_type);
            SharedLayout::Record {
                fields: fields.iter().map(|f| f.declaration.clone()).collect(),
                attributes: fields.iter().map(|f| f.attribute.bits()).collect(),
            }
        }
    };
    SharedAttributes {
        name: object.name.clone(),
        object_code: object.object_code(),
        sub_number: object.subs().len(),
        memory_type: object.memory_type,
        layout,
    }
}

/// Resolve the SDO access function of an object, generating its prototype or wrapper as needed
fn access_function(
    object: &CanOpenObject,
    tables: &mut OdTables,
    external_functions: &mut HashSet<String>,
) -> (String, SheetAccess) {
    match object.access_override() {
        AccessOverride::Default => (DEFAULT_ACCESS_FUNCTION.to_string(), SheetAccess::Default),
        AccessOverride::External(name) => {
            if external_functions.insert(name.to_string()) {
                tables.functions.push(access_function_prototype(name));
            }
            (name.to_string(), SheetAccess::External(name.to_string()))
        }
        AccessOverride::Injected { pre, post } => {
            let name = format!("CO_ODF_{:04X}", object.index);
            let body = injected_function(&name, pre, post);
            tables.functions.push(format!("{body}\n"));
            (name, SheetAccess::Injected(body))
        }
    }
}

fn indent_lines(code: &str) -> String {
    code.lines().map(|line| format!("  {line}\n")).collect()
}

fn injected_function(name: &str, pre: &str, post: &str) -> String {
    format!(
        "UNSIGNED32 {name}(void *object, UNSIGNED16 index, UNSIGNED8 subIndex, UNSIGNED16* pLength,\n\
         \x20                      UNSIGNED16 attribute, UNSIGNED8 dir, void* dataBuff, const void* pData){{\n\
         \x20 UNSIGNED32 abortCode;\n\
         {}\
         \x20 abortCode = {DEFAULT_ACCESS_FUNCTION}(object, index, subIndex, pLength, attribute, dir, dataBuff, pData);\n\
         {}\
         \x20 return abortCode;\n\
         }}",
        indent_lines(pre),
        indent_lines(post)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertables::assert_contains;
    use odgen_common::device_description::{AssociatedObjectRef, Feature, VarDefinition};
    use odgen_common::objects::{AccessType, DataType};

    fn var(index: u16, name: &str, data_type: DataType, default_value: &str) -> CanOpenObject {
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
                data_type,
                access_type: AccessType::Rw,
                default_value: default_value.into(),
                ..Default::default()
            }),
        }
    }

    fn grouped(anchor: u16, index_max: u16, value: u32) -> Feature {
        Feature {
            name: "Channel".into(),
            value,
            associated_objects: vec![AssociatedObjectRef {
                index: anchor,
                index_max: Some(index_max),
                index_step: Some(1),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_duplicate_name_reported_once() {
        let description = DeviceDescription {
            objects: vec![
                var(0x2000, "Speed", DataType::Unsigned8, "1"),
                var(0x2001, "speed", DataType::Unsigned8, "2"),
                var(0x2002, "Torque", DataType::Unsigned8, "3"),
            ],
            ..Default::default()
        };
        let analysis = analyze(&description);
        assert_eq!(
            vec![Diagnostic::DuplicateName {
                index: 0x2001,
                name: "speed".into()
            }],
            analysis.diagnostics
        );
        assert_eq!(3, analysis.tables.entries.len());
    }

    #[test]
    fn test_disabled_and_repeated_indices_are_skipped() {
        let mut disabled = var(0x2001, "Off", DataType::Unsigned8, "0");
        disabled.disabled = true;
        let description = DeviceDescription {
            objects: vec![
                var(0x2000, "First", DataType::Unsigned8, "1"),
                disabled,
                var(0x2000, "Second", DataType::Unsigned8, "2"),
            ],
            ..Default::default()
        };
        let analysis = analyze(&description);
        assert_eq!(
            vec![Diagnostic::DuplicateIndex { index: 0x2000 }],
            analysis.diagnostics
        );
        assert_eq!(vec![0x2000], analysis.tables.entries.keys().copied().collect::<Vec<_>>());
        assert_eq!("First", analysis.tables.sheets[0].name);
    }

    #[test]
    fn test_group_member_mismatch() {
        let description = DeviceDescription {
            features: vec![grouped(0x2100, 0x21FF, 2)],
            objects: vec![
                var(0x2101, "Channel value", DataType::Unsigned16, "0"),
                var(0x2100, "Channel value", DataType::Unsigned8, "0"),
            ],
            ..Default::default()
        };
        let analysis = analyze(&description);
        assert_eq!(
            vec![
                Diagnostic::CombinedGroupMismatch {
                    index: 0x2101,
                    anchor: 0x2100,
                    field: crate::GroupField::DataType,
                },
                Diagnostic::CombinedGroupMismatch {
                    index: 0x2101,
                    anchor: 0x2100,
                    field: crate::GroupField::DefaultValueSize,
                },
            ],
            analysis.diagnostics
        );
    }

    #[test]
    fn test_missing_anchor_generates_member_alone() {
        let mut anchor = var(0x2100, "Channel value", DataType::Unsigned8, "0");
        anchor.disabled = true;
        let description = DeviceDescription {
            features: vec![grouped(0x2100, 0x21FF, 2)],
            objects: vec![anchor, var(0x2101, "Channel value", DataType::Unsigned8, "7")],
            ..Default::default()
        };
        let analysis = analyze(&description);
        assert_eq!(
            vec![Diagnostic::MissingGroupAnchor {
                index: 0x2101,
                anchor: 0x2100
            }],
            analysis.diagnostics
        );
        let bucket = analysis.tables.buckets.get(MemoryType::Ram);
        assert_eq!(vec!["/*2101*/ 0x7,"], bucket.initializer_lines());
        assert_contains!(bucket.declarations()[0], "channelValue;");
    }

    #[test]
    fn test_injected_access_function() {
        let mut object = var(0x2000, "Speed", DataType::Unsigned8, "1");
        object.access_function_pre_code = Some("if (WRITING) {\n  x++;\n}".into());
        let description = DeviceDescription {
            objects: vec![object],
            ..Default::default()
        };
        let analysis = analyze(&description);
        let function = &analysis.tables.functions[1];
        assert!(function.starts_with("UNSIGNED32 CO_ODF_2000(void *object"));
        assert_contains!(function, "  if (WRITING) {\n    x++;\n  }\n  abortCode = CO_ODF(");
        assert_contains!(analysis.tables.entries[&0x2000], "CO_ODF_2000},");
    }

    #[test]
    fn test_external_function_declared_once() {
        let mut a = var(0x2000, "A", DataType::Unsigned8, "1");
        a.access_function = Some("CO_ODF_app".into());
        let mut b = var(0x2001, "B", DataType::Unsigned8, "1");
        b.access_function = Some("CO_ODF_app".into());
        let description = DeviceDescription {
            objects: vec![a, b],
            ..Default::default()
        };
        let analysis = analyze(&description);
        assert_eq!(2, analysis.tables.functions.len());
        assert_eq!(
            SheetAccess::External("CO_ODF_app".into()),
            analysis.tables.sheets[1].access
        );
    }
}
