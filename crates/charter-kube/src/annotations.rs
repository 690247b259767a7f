//! Annotations written onto resources at install time

use charter_core::Chartfile;
use std::collections::BTreeMap;

pub use charter_core::ORIGIN_FILE_ANNOTATION as ORIGIN_FILE;

/// Name of the chart that installed the resource
pub const CHART_NAME: &str = "charter.sh/chart-name";
/// Version of that chart
pub const CHART_VERSION: &str = "charter.sh/chart-version";
/// Description of that chart
pub const CHART_DESCRIPTION: &str = "charter.sh/chart-description";

/// Retain on reinstall: the resource is applied instead of created
pub const KEEP: &str = "charter.sh/keep";

/// Annotations stamped on every resource of `chart` before install
pub fn install_annotations(chart: &Chartfile, source: &str) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    annotations.insert(ORIGIN_FILE.to_string(), source.to_string());
    annotations.insert(CHART_NAME.to_string(), chart.name.clone());
    annotations.insert(CHART_VERSION.to_string(), chart.version.clone());
    if !chart.description.is_empty() {
        annotations.insert(CHART_DESCRIPTION.to_string(), chart.description.clone());
    }
    annotations
}

/// Whether a [`KEEP`] annotation value turns the marker on
pub fn is_keep(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_annotations() {
        let chart = Chartfile {
            name: "demo".to_string(),
            version: "0.1.0".to_string(),
            ..Default::default()
        };

        let annotations = install_annotations(&chart, "web/pod.yaml");
        assert_eq!(annotations[ORIGIN_FILE], "web/pod.yaml");
        assert_eq!(annotations[CHART_NAME], "demo");
        assert_eq!(annotations[CHART_VERSION], "0.1.0");
        assert!(!annotations.contains_key(CHART_DESCRIPTION));
    }

    #[test]
    fn test_is_keep() {
        assert!(is_keep("true"));
        assert!(is_keep(" TRUE "));
        assert!(is_keep("yes"));
        assert!(!is_keep("false"));
        assert!(!is_keep(""));
    }
}
