use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::CustomResource;
use kube::core::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Subset of the KubeVirt `VirtualMachine` API needed to declare inert,
/// never-started machines. Unknown fields are ignored when reading.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq)]
#[kube(
    group = "kubevirt.io",
    version = "v1",
    kind = "VirtualMachine",
    plural = "virtualmachines",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running: Option<bool>,
    /// Alternative to `running` used by newer KubeVirt releases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_strategy: Option<String>,
    #[serde(default)]
    pub template: VirtualMachineTemplate,
}

impl VirtualMachineSpec {
    pub fn is_running(&self) -> bool {
        match (self.running, self.run_strategy.as_deref()) {
            (Some(running), _) => running,
            (None, Some(strategy)) => {
                matches!(strategy, "Always" | "RerunOnFailure")
            }
            (None, None) => false,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct VirtualMachineTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<InstanceSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct InstanceSpec {
    #[serde(default)]
    pub domain: DomainSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct DomainSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequests>,
    #[serde(default)]
    pub devices: Devices,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct CpuSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct ResourceRequests {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, Quantity>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Devices {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<Disk>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Disk {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskTarget>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct DiskTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Volume {
    pub name: String,
    #[serde(flatten)]
    pub source: VolumeSource,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum VolumeSource {
    ContainerDisk { image: String },
    EmptyDisk { capacity: Quantity },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn volume_sources_use_kubevirt_field_names() {
        let vols = vec![
            Volume {
                name: "containerdisk".into(),
                source: VolumeSource::ContainerDisk {
                    image: "quay.io/kubevirt/cirros-container-disk-demo"
                        .into(),
                },
            },
            Volume {
                name: "emptydisk".into(),
                source: VolumeSource::EmptyDisk {
                    capacity: Quantity("12Gi".into()),
                },
            },
        ];
        let v = serde_json::to_value(&vols).unwrap();
        assert_eq!(
            v,
            json!([
                {
                    "name": "containerdisk",
                    "containerDisk": {
                        "image": "quay.io/kubevirt/cirros-container-disk-demo"
                    }
                },
                {"name": "emptydisk", "emptyDisk": {"capacity": "12Gi"}}
            ])
        );
    }

    #[test]
    fn running_falls_back_to_run_strategy() {
        let mut spec = VirtualMachineSpec {
            running: None,
            run_strategy: Some("Always".into()),
            template: Default::default(),
        };
        assert!(spec.is_running());
        spec.run_strategy = Some("Halted".into());
        assert!(!spec.is_running());
        spec.running = Some(true);
        assert!(spec.is_running());
    }

    #[test]
    fn foreign_vm_with_extra_fields_deserializes() {
        let vm: VirtualMachine = serde_json::from_value(json!({
            "apiVersion": "kubevirt.io/v1",
            "kind": "VirtualMachine",
            "metadata": {"name": "hand-made", "namespace": "qe-ns-001"},
            "spec": {
                "runStrategy": "Halted",
                "dataVolumeTemplates": [],
                "template": {"spec": {"domain": {"devices": {}}}}
            }
        }))
        .unwrap();
        assert_eq!(vm.metadata.name.as_deref(), Some("hand-made"));
        assert!(!vm.spec.is_running());
    }
}
