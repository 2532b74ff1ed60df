use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::core::ObjectMeta;
use std::collections::BTreeMap;
use vmscale_cluster::Tag;
use vmscale_cluster::crd::{
    CpuSpec, Devices, Disk, DiskTarget, DomainSpec, InstanceSpec,
    ResourceRequests, VirtualMachine, VirtualMachineSpec,
    VirtualMachineTemplate, Volume, VolumeSource,
};

use crate::planner::ResourceSpec;

pub const VM_INDEX_LABEL: &str = "vm-index";
pub const VM_NAME_LABEL: &str = "kubevirt.io/vm";

const CONTAINER_DISK: &str = "containerdisk";
const EMPTY_DISK: &str = "emptydisk";

fn gib(n: u32) -> Quantity {
    Quantity(format!("{n}Gi"))
}

fn virtio_disk(name: &str) -> Disk {
    Disk {
        name: name.to_string(),
        disk: Some(DiskTarget {
            bus: Some("virtio".into()),
        }),
    }
}

/// Builds a stopped VirtualMachine: a read-only boot disk from
/// `container_image` plus an empty data disk sized from `spec`.
pub fn virtual_machine(
    spec: &ResourceSpec,
    tag: &Tag,
    container_image: &str,
) -> VirtualMachine {
    let mut labels = tag.as_labels();
    labels.insert(VM_INDEX_LABEL.into(), format!("{:03}", spec.index));

    let mut template_labels = tag.as_labels();
    template_labels.insert(VM_NAME_LABEL.into(), spec.name.clone());

    let vm_spec = VirtualMachineSpec {
        running: Some(false),
        run_strategy: None,
        template: VirtualMachineTemplate {
            metadata: Some(ObjectMeta {
                labels: Some(template_labels),
                ..Default::default()
            }),
            spec: Some(InstanceSpec {
                domain: DomainSpec {
                    cpu: Some(CpuSpec {
                        cores: Some(spec.cpu),
                    }),
                    resources: Some(ResourceRequests {
                        requests: BTreeMap::from([(
                            "memory".to_string(),
                            gib(spec.memory_gib),
                        )]),
                    }),
                    devices: Devices {
                        disks: vec![
                            virtio_disk(CONTAINER_DISK),
                            virtio_disk(EMPTY_DISK),
                        ],
                    },
                },
                volumes: vec![
                    Volume {
                        name: CONTAINER_DISK.into(),
                        source: VolumeSource::ContainerDisk {
                            image: container_image.to_string(),
                        },
                    },
                    Volume {
                        name: EMPTY_DISK.into(),
                        source: VolumeSource::EmptyDisk {
                            capacity: gib(spec.disk_gib),
                        },
                    },
                ],
            }),
        },
    };

    let mut vm = VirtualMachine::new(&spec.name, vm_spec);
    vm.metadata.namespace = Some(spec.namespace.clone());
    vm.metadata.labels = Some(labels);
    vm
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn manifest_matches_kubevirt_shape() {
        let spec = ResourceSpec {
            name: "qe-virt-007-ab12c".into(),
            namespace: "qe-ns-002".into(),
            index: 7,
            cpu: 3,
            memory_gib: 6,
            disk_gib: 42,
        };
        let tag = Tag::new("cnv-scale-test", "synthetic-workload");
        let vm = virtual_machine(&spec, &tag, "quay.io/kubevirt/cirros");
        let v = serde_json::to_value(&vm).unwrap();

        assert_eq!(v["apiVersion"], "kubevirt.io/v1");
        assert_eq!(v["kind"], "VirtualMachine");
        assert_eq!(v["metadata"]["namespace"], "qe-ns-002");
        assert_eq!(
            v["metadata"]["labels"],
            json!({"cnv-scale-test": "synthetic-workload", "vm-index": "007"})
        );
        assert_eq!(v["spec"]["running"], false);
        assert_eq!(
            v["spec"]["template"]["metadata"]["labels"]["kubevirt.io/vm"],
            "qe-virt-007-ab12c"
        );
        let inst = &v["spec"]["template"]["spec"];
        assert_eq!(inst["domain"]["cpu"]["cores"], 3);
        assert_eq!(inst["domain"]["resources"]["requests"]["memory"], "6Gi");
        let disks = &inst["domain"]["devices"]["disks"];
        assert_eq!(disks[1]["disk"]["bus"], "virtio");
        assert_eq!(
            inst["volumes"][0]["containerDisk"]["image"],
            "quay.io/kubevirt/cirros"
        );
        assert_eq!(inst["volumes"][1]["emptyDisk"]["capacity"], "42Gi");
    }
}
