use crate::crd::VirtualMachine;
use crate::error::ClusterError;
use crate::traits::*;
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Operations that can be made to fail for a given namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetNamespace,
    CreateNamespace,
    DeleteNamespace,
    ListVms,
    CreateVm,
    DeleteVm,
}

#[derive(Default)]
struct State {
    namespaces: BTreeMap<String, Labels>,
    // keyed by (namespace, name)
    vms: BTreeMap<(String, String), VirtualMachine>,
    faults: HashSet<(Op, String)>,
    fail_namespace_listing: bool,
    // every attempted call, denied ones included, in arrival order
    ops: Vec<(Op, String)>,
}

impl State {
    fn check(&mut self, op: Op, namespace: &str) -> ClusterResult<()> {
        self.ops.push((op, namespace.to_string()));
        if self.faults.contains(&(op, namespace.to_string())) {
            return Err(ClusterError::Forbidden(format!(
                "{op:?} denied in namespace {namespace}"
            )));
        }
        Ok(())
    }
}

/// In-process cluster. Deleting a namespace removes its VMs, as the API
/// server's garbage collector would.
#[derive(Clone, Default)]
pub struct MemoryCluster {
    state: Arc<RwLock<State>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `op` against `namespace` fail with `Forbidden`.
    pub async fn deny(&self, op: Op, namespace: &str) {
        let mut state = self.state.write().await;
        state.faults.insert((op, namespace.to_string()));
    }

    pub async fn deny_namespace_listing(&self) {
        self.state.write().await.fail_namespace_listing = true;
    }

    pub async fn namespace_names(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.namespaces.keys().cloned().collect()
    }

    pub async fn vm(
        &self,
        namespace: &str,
        name: &str,
    ) -> Option<VirtualMachine> {
        let state = self.state.read().await;
        state
            .vms
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub async fn vm_count(&self) -> usize {
        self.state.read().await.vms.len()
    }

    /// Log of namespaced calls made so far, oldest first.
    pub async fn ops(&self) -> Vec<(Op, String)> {
        self.state.read().await.ops.clone()
    }
}

#[async_trait]
impl ClusterApi for MemoryCluster {
    async fn get_namespace(
        &self,
        name: &str,
    ) -> ClusterResult<Option<NamespaceInfo>> {
        let mut state = self.state.write().await;
        state.check(Op::GetNamespace, name)?;
        Ok(state.namespaces.get(name).map(|labels| NamespaceInfo {
            name: name.to_string(),
            labels: labels.clone(),
        }))
    }

    async fn create_namespace(
        &self,
        name: &str,
        labels: &Labels,
    ) -> ClusterResult<()> {
        let mut state = self.state.write().await;
        state.check(Op::CreateNamespace, name)?;
        if state.namespaces.contains_key(name) {
            return Err(ClusterError::Conflict(format!(
                "namespaces \"{name}\" already exists"
            )));
        }
        state.namespaces.insert(name.to_string(), labels.clone());
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> ClusterResult<()> {
        let mut state = self.state.write().await;
        state.check(Op::DeleteNamespace, name)?;
        if state.namespaces.remove(name).is_none() {
            return Err(ClusterError::NotFound(format!(
                "namespaces \"{name}\" not found"
            )));
        }
        state.vms.retain(|(ns, _), _| ns != name);
        Ok(())
    }

    async fn list_namespaces(
        &self,
        tag: &Tag,
    ) -> ClusterResult<Vec<NamespaceInfo>> {
        let state = self.state.read().await;
        if state.fail_namespace_listing {
            return Err(ClusterError::Forbidden(
                "namespaces is forbidden".into(),
            ));
        }
        Ok(state
            .namespaces
            .iter()
            .filter(|(_, labels)| tag.matches(labels))
            .map(|(name, labels)| NamespaceInfo {
                name: name.clone(),
                labels: labels.clone(),
            })
            .collect())
    }

    async fn list_vms(
        &self,
        namespace: &str,
        tag: Option<&Tag>,
    ) -> ClusterResult<Vec<VmSummary>> {
        let mut state = self.state.write().await;
        state.check(Op::ListVms, namespace)?;
        Ok(state
            .vms
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .filter(|(_, vm)| tag.is_none_or(|t| t.matches(vm.labels())))
            .map(|(_, vm)| VmSummary::from(vm))
            .collect())
    }

    async fn create_vm(&self, vm: &VirtualMachine) -> ClusterResult<()> {
        let namespace = vm.namespace().ok_or_else(|| {
            ClusterError::Invalid(format!(
                "VirtualMachine {} has no namespace",
                vm.name_any()
            ))
        })?;
        let mut state = self.state.write().await;
        state.check(Op::CreateVm, &namespace)?;
        if !state.namespaces.contains_key(&namespace) {
            return Err(ClusterError::NotFound(format!(
                "namespaces \"{namespace}\" not found"
            )));
        }
        let key = (namespace, vm.name_any());
        if state.vms.contains_key(&key) {
            return Err(ClusterError::Conflict(format!(
                "virtualmachines.kubevirt.io \"{}\" already exists",
                key.1
            )));
        }
        state.vms.insert(key, vm.clone());
        Ok(())
    }

    async fn delete_vm(
        &self,
        namespace: &str,
        name: &str,
    ) -> ClusterResult<()> {
        let mut state = self.state.write().await;
        state.check(Op::DeleteVm, namespace)?;
        state
            .vms
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| {
                ClusterError::NotFound(format!(
                    "virtualmachines.kubevirt.io \"{name}\" not found"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::VirtualMachineSpec;

    fn vm(ns: &str, name: &str, labels: Labels) -> VirtualMachine {
        let mut vm = VirtualMachine::new(
            name,
            VirtualMachineSpec {
                running: Some(false),
                run_strategy: None,
                template: Default::default(),
            },
        );
        vm.metadata.namespace = Some(ns.to_string());
        vm.metadata.labels = Some(labels);
        vm
    }

    #[tokio::test]
    async fn list_vms_filters_by_tag() {
        let cluster = MemoryCluster::new();
        let tag = Tag::new("cnv-scale-test", "synthetic-workload");
        cluster.create_namespace("ns", &Labels::new()).await.unwrap();
        cluster.create_vm(&vm("ns", "a", tag.as_labels())).await.unwrap();
        cluster.create_vm(&vm("ns", "b", Labels::new())).await.unwrap();

        let tagged = cluster.list_vms("ns", Some(&tag)).await.unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].name, "a");
        assert_eq!(cluster.list_vms("ns", None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_vm_requires_namespace_and_unique_name() {
        let cluster = MemoryCluster::new();
        let err = cluster
            .create_vm(&vm("missing", "a", Labels::new()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        cluster.create_namespace("ns", &Labels::new()).await.unwrap();
        cluster.create_vm(&vm("ns", "a", Labels::new())).await.unwrap();
        let err = cluster
            .create_vm(&vm("ns", "a", Labels::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleting_namespace_removes_its_vms() {
        let cluster = MemoryCluster::new();
        cluster.create_namespace("ns", &Labels::new()).await.unwrap();
        cluster.create_vm(&vm("ns", "a", Labels::new())).await.unwrap();
        cluster.delete_namespace("ns").await.unwrap();
        assert_eq!(cluster.vm_count().await, 0);
        assert!(
            cluster
                .delete_namespace("ns")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn denied_operations_fail_forbidden() {
        let cluster = MemoryCluster::new();
        cluster.deny(Op::CreateNamespace, "ns").await;
        let err = cluster
            .create_namespace("ns", &Labels::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::Forbidden(_)));
        cluster.create_namespace("other", &Labels::new()).await.unwrap();
        assert_eq!(
            cluster.ops().await,
            vec![
                (Op::CreateNamespace, "ns".to_string()),
                (Op::CreateNamespace, "other".to_string()),
            ]
        );
    }
}
