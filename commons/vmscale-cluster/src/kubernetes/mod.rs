use crate::crd::VirtualMachine;
use crate::error::ClusterError;
use crate::traits::*;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{
    Api, DeleteParams, DynamicObject, ListParams, PostParams,
};
use kube::core::ObjectMeta;
use kube::discovery::ApiResource;
use kube::{Client, ResourceExt};
use tracing::debug;

/// Cluster access through the Kubernetes API server.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    vm_resource: ApiResource,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            vm_resource: ApiResource::erase::<VirtualMachine>(&()),
        }
    }

    /// Connects using the local kubeconfig, falling back to the in-cluster
    /// service account environment.
    pub async fn try_default() -> ClusterResult<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Connection(e.to_string()))?;
        Ok(Self::new(client))
    }

    fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }

    fn vms(&self, namespace: &str) -> Api<VirtualMachine> {
        Api::namespaced(self.client.clone(), namespace)
    }

    // Listing and deletion go through the dynamic API so VMs whose specs we
    // do not model never fail deserialization.
    fn dyn_vms(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.vm_resource)
    }
}

fn namespace_info(ns: &Namespace) -> NamespaceInfo {
    NamespaceInfo {
        name: ns.name_any(),
        labels: ns.labels().clone(),
    }
}

fn vm_summary(obj: &DynamicObject) -> VmSummary {
    let spec = obj.data.get("spec");
    let running = spec
        .and_then(|s| s.get("running"))
        .and_then(|v| v.as_bool())
        .or_else(|| {
            spec.and_then(|s| s.get("runStrategy"))
                .and_then(|v| v.as_str())
                .map(|s| matches!(s, "Always" | "RerunOnFailure"))
        })
        .unwrap_or(false);
    VmSummary {
        name: obj.name_any(),
        labels: obj.labels().clone(),
        running,
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn get_namespace(
        &self,
        name: &str,
    ) -> ClusterResult<Option<NamespaceInfo>> {
        let ns = self.namespaces().get_opt(name).await?;
        Ok(ns.as_ref().map(namespace_info))
    }

    async fn create_namespace(
        &self,
        name: &str,
        labels: &Labels,
    ) -> ClusterResult<()> {
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            ..Default::default()
        };
        self.namespaces().create(&PostParams::default(), &ns).await?;
        debug!(namespace = %name, "namespace created");
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> ClusterResult<()> {
        self.namespaces()
            .delete(name, &DeleteParams::default())
            .await?;
        debug!(namespace = %name, "namespace deletion requested");
        Ok(())
    }

    async fn list_namespaces(
        &self,
        tag: &Tag,
    ) -> ClusterResult<Vec<NamespaceInfo>> {
        let lp = ListParams::default().labels(&tag.selector());
        let list = self.namespaces().list(&lp).await?;
        Ok(list.items.iter().map(namespace_info).collect())
    }

    async fn list_vms(
        &self,
        namespace: &str,
        tag: Option<&Tag>,
    ) -> ClusterResult<Vec<VmSummary>> {
        let lp = match tag {
            Some(tag) => ListParams::default().labels(&tag.selector()),
            None => ListParams::default(),
        };
        let list = self.dyn_vms(namespace).list(&lp).await?;
        Ok(list.items.iter().map(vm_summary).collect())
    }

    async fn create_vm(&self, vm: &VirtualMachine) -> ClusterResult<()> {
        let namespace = vm.namespace().ok_or_else(|| {
            ClusterError::Invalid(format!(
                "VirtualMachine {} has no namespace",
                vm.name_any()
            ))
        })?;
        self.vms(&namespace)
            .create(&PostParams::default(), vm)
            .await?;
        Ok(())
    }

    async fn delete_vm(
        &self,
        namespace: &str,
        name: &str,
    ) -> ClusterResult<()> {
        // The response body is the VM itself while its finalizer runs, so
        // it must not be decoded into the typed subset.
        self.dyn_vms(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }
}
