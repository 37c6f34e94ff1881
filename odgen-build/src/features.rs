//! Feature analysis
//!
//! Features enable optional communication services of a device, like a number of PDOs or SDO
//! servers. Each one may reference a range of object indices, one per enabled instance, and these
//! ranges become the combined groups of the dictionary.
use odgen_common::device_description::{AssociatedObjectRef, Feature};

use crate::groups::GroupTable;
use crate::values::macro_name;

/// Summaries longer than this are collapsed into a first/last/count comment
const MAX_LISTED_OBJECTS: usize = 16;

/// The result of analyzing one feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSummary {
    /// Feature name
    pub name: String,
    /// Suffix of the `CO_NO_` macro
    pub macro_name: String,
    /// Number of enabled instances
    pub value: u32,
    /// All associated object indices, in expansion order
    pub objects: Vec<u16>,
}

impl FeatureSummary {
    /// Human readable list of the associated objects, as a C line comment
    pub fn comment(&self) -> String {
        if self.objects.len() > MAX_LISTED_OBJECTS {
            let mut sorted = self.objects.clone();
            sorted.sort_unstable();
            format!(
                "//Associated objects from index {:04X} to {:04X}, count = {}",
                sorted[0],
                sorted[sorted.len() - 1],
                sorted.len()
            )
        } else if !self.objects.is_empty() {
            let list: Vec<String> = self.objects.iter().map(|i| format!("{i:04X}")).collect();
            format!("//Associated objects: {}", list.join(", "))
        } else {
            String::new()
        }
    }
}

/// Expand an index range, producing at most `limit` indices
pub fn expand_range(object: &AssociatedObjectRef, limit: u32) -> Vec<u16> {
    let Some(index_max) = object.index_max else {
        return vec![object.index];
    };
    let step = object.index_step.unwrap_or(1).max(1) as u32;

    let mut indices = Vec::new();
    let mut index = object.index as u32;
    while index <= index_max as u32 && (indices.len() as u32) < limit {
        indices.push(index as u16);
        index += step;
    }
    indices
}

/// Analyze all features, registering the combined groups their ranges create
pub fn analyze_features(features: &[Feature], groups: &mut GroupTable) -> Vec<FeatureSummary> {
    features
        .iter()
        .map(|feature| {
            let mut objects = Vec::new();
            if feature.value != 0 {
                for object in &feature.associated_objects {
                    let indices = expand_range(object, feature.value);
                    if object.index_max.is_some() {
                        groups.register(&indices);
                    }
                    objects.extend(indices);
                }
            }
            log::debug!(
                "Feature {} = {}: {} associated objects",
                feature.name,
                feature.value,
                objects.len()
            );
            FeatureSummary {
                name: feature.name.clone(),
                macro_name: macro_name(&feature.name),
                value: feature.value,
                objects,
            }
        })
        .collect()
}
