use crate::crd::VirtualMachine;
use crate::traits::*;
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;
use tracing::info;

#[derive(Default)]
struct Projection {
    created_namespaces: BTreeMap<String, Labels>,
    deleted_namespaces: HashSet<String>,
    deleted_vms: HashSet<(String, String)>,
}

/// Wraps a cluster so that reads reach the backend while every mutating
/// call is suppressed. Suppressed writes are remembered for the lifetime of
/// the wrapper and folded into later reads, so a dry run reports the
/// outcome the real run would have produced.
pub struct DryRun<C> {
    inner: C,
    projection: Mutex<Projection>,
}

impl<C> DryRun<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            projection: Mutex::new(Projection::default()),
        }
    }
}

#[async_trait]
impl<C: ClusterApi> ClusterApi for DryRun<C> {
    async fn get_namespace(
        &self,
        name: &str,
    ) -> ClusterResult<Option<NamespaceInfo>> {
        {
            let p = self.projection.lock().await;
            if p.deleted_namespaces.contains(name) {
                return Ok(None);
            }
            if let Some(labels) = p.created_namespaces.get(name) {
                return Ok(Some(NamespaceInfo {
                    name: name.to_string(),
                    labels: labels.clone(),
                }));
            }
        }
        self.inner.get_namespace(name).await
    }

    async fn create_namespace(
        &self,
        name: &str,
        labels: &Labels,
    ) -> ClusterResult<()> {
        info!(namespace = %name, "[dry-run] would create namespace");
        let mut p = self.projection.lock().await;
        p.deleted_namespaces.remove(name);
        p.created_namespaces.insert(name.to_string(), labels.clone());
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> ClusterResult<()> {
        info!(namespace = %name, "[dry-run] would delete namespace");
        let mut p = self.projection.lock().await;
        p.created_namespaces.remove(name);
        p.deleted_namespaces.insert(name.to_string());
        Ok(())
    }

    async fn list_namespaces(
        &self,
        tag: &Tag,
    ) -> ClusterResult<Vec<NamespaceInfo>> {
        let mut found = self.inner.list_namespaces(tag).await?;
        let p = self.projection.lock().await;
        found.retain(|ns| !p.deleted_namespaces.contains(&ns.name));
        for (name, labels) in &p.created_namespaces {
            if tag.matches(labels) && !found.iter().any(|ns| &ns.name == name)
            {
                found.push(NamespaceInfo {
                    name: name.clone(),
                    labels: labels.clone(),
                });
            }
        }
        Ok(found)
    }

    async fn list_vms(
        &self,
        namespace: &str,
        tag: Option<&Tag>,
    ) -> ClusterResult<Vec<VmSummary>> {
        {
            let p = self.projection.lock().await;
            if p.deleted_namespaces.contains(namespace)
                || p.created_namespaces.contains_key(namespace)
            {
                return Ok(Vec::new());
            }
        }
        let mut vms = self.inner.list_vms(namespace, tag).await?;
        let p = self.projection.lock().await;
        vms.retain(|vm| {
            !p.deleted_vms
                .contains(&(namespace.to_string(), vm.name.clone()))
        });
        Ok(vms)
    }

    async fn create_vm(&self, vm: &VirtualMachine) -> ClusterResult<()> {
        info!(
            namespace = %vm.namespace().unwrap_or_default(),
            name = %vm.name_any(),
            "[dry-run] would create VirtualMachine"
        );
        Ok(())
    }

    async fn delete_vm(
        &self,
        namespace: &str,
        name: &str,
    ) -> ClusterResult<()> {
        info!(%namespace, %name, "[dry-run] would delete VirtualMachine");
        let mut p = self.projection.lock().await;
        p.deleted_vms.insert((namespace.to_string(), name.to_string()));
        Ok(())
    }
}
