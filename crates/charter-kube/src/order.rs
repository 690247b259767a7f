//! Install and uninstall ordering
//!
//! Both orders are fixed tables over resource kinds. Install puts kinds that
//! others depend on first and dispatches unlisted kinds last. Uninstall stops
//! traffic first and deletes unlisted kinds before anything in the table.

use charter_core::Manifest;
use k8s_openapi::Resource;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, PersistentVolume, Pod, ReplicationController, Secret, Service,
    ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;

/// Kind order for install
pub const INSTALL_ORDER: &[&str] = &[
    Namespace::KIND,
    Secret::KIND,
    ConfigMap::KIND,
    PersistentVolume::KIND,
    ServiceAccount::KIND,
    Service::KIND,
    Pod::KIND,
    ReplicationController::KIND,
    Deployment::KIND,
    DaemonSet::KIND,
    Ingress::KIND,
    Job::KIND,
];

/// Kind order for uninstall
pub const UNINSTALL_ORDER: &[&str] = &[
    Service::KIND,
    Pod::KIND,
    ReplicationController::KIND,
    Deployment::KIND,
    DaemonSet::KIND,
    ConfigMap::KIND,
    Secret::KIND,
    PersistentVolume::KIND,
    ServiceAccount::KIND,
    Ingress::KIND,
    Job::KIND,
    Namespace::KIND,
];

fn position(table: &[&str], kind: &str) -> Option<usize> {
    table.iter().position(|k| *k == kind)
}

/// Manifests in install order; ties keep discovery order
pub fn install_order(manifests: &[Manifest]) -> Vec<&Manifest> {
    let mut ordered: Vec<&Manifest> = manifests.iter().collect();
    ordered.sort_by_key(|m| position(INSTALL_ORDER, m.kind()).unwrap_or(INSTALL_ORDER.len()));
    ordered
}

/// Manifests in uninstall order; ties keep discovery order
pub fn uninstall_order(manifests: &[Manifest]) -> Vec<&Manifest> {
    let mut ordered: Vec<&Manifest> = manifests.iter().collect();
    ordered.sort_by_key(|m| position(UNINSTALL_ORDER, m.kind()).map_or(0, |p| p + 1));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_core::{Document, Encoding};

    fn manifest(kind: &str, name: &str) -> Manifest {
        let yaml = format!("apiVersion: v1\nkind: {kind}\nmetadata:\n  name: {name}\n");
        Manifest::new("all.yaml", Document::new(yaml, Encoding::Yaml).unwrap())
    }

    fn targets(ordered: Vec<&Manifest>) -> Vec<String> {
        ordered.iter().map(|m| m.reference().to_string()).collect()
    }

    #[test]
    fn test_tables_cover_same_kinds() {
        let mut install = INSTALL_ORDER.to_vec();
        let mut uninstall = UNINSTALL_ORDER.to_vec();
        install.sort();
        uninstall.sort();
        assert_eq!(install, uninstall);
    }

    #[test]
    fn test_install_order() {
        let manifests = vec![
            manifest("Pod", "web"),
            manifest("Service", "web"),
            manifest("Namespace", "prod"),
        ];
        assert_eq!(
            targets(install_order(&manifests)),
            vec!["Namespace/prod", "Service/web", "Pod/web"]
        );
    }

    #[test]
    fn test_install_unknown_kinds_last_in_encounter_order() {
        let manifests = vec![
            manifest("Widget", "a"),
            manifest("Pod", "p"),
            manifest("Gadget", "b"),
            manifest("Widget", "c"),
            manifest("Secret", "s"),
        ];
        assert_eq!(
            targets(install_order(&manifests)),
            vec!["Secret/s", "Pod/p", "Widget/a", "Gadget/b", "Widget/c"]
        );
    }

    #[test]
    fn test_uninstall_order() {
        let manifests = vec![
            manifest("Namespace", "prod"),
            manifest("Pod", "web"),
            manifest("Widget", "w"),
            manifest("Secret", "creds"),
            manifest("Service", "web"),
        ];
        assert_eq!(
            targets(uninstall_order(&manifests)),
            vec![
                "Widget/w",
                "Service/web",
                "Pod/web",
                "Secret/creds",
                "Namespace/prod"
            ]
        );
    }

    #[test]
    fn test_same_kind_keeps_discovery_order() {
        let manifests = vec![manifest("Pod", "b"), manifest("Pod", "a")];
        assert_eq!(targets(install_order(&manifests)), vec!["Pod/b", "Pod/a"]);
        assert_eq!(targets(uninstall_order(&manifests)), vec!["Pod/b", "Pod/a"]);
    }
}
