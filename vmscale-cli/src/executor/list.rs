use tracing::{error, warn};
use vmscale_cluster::{ClusterApi, VmSummary};

use super::{Executor, Failure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceListing {
    pub namespace: String,
    pub vms: Vec<VmSummary>,
}

#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Namespaces holding at least one tagged VM, sorted by name.
    pub namespaces: Vec<NamespaceListing>,
    pub errors: Vec<Failure>,
    pub list_error: Option<String>,
    pub preview: usize,
}

impl Listing {
    pub fn total(&self) -> usize {
        self.namespaces.iter().map(|n| n.vms.len()).sum()
    }
}

impl<C: ClusterApi> Executor<C> {
    /// Read-only view of every tagged VM in every tagged namespace.
    pub async fn list_all(&self) -> Listing {
        let mut listing = Listing {
            preview: self.cfg.list_preview,
            ..Default::default()
        };
        let namespaces =
            match self.cluster.list_namespaces(&self.namespace_tag()).await {
                Ok(list) => list,
                Err(e) => {
                    error!(error = %e, "failed to list namespaces");
                    listing.list_error = Some(e.to_string());
                    return listing;
                }
            };

        let vm_tag = self.vm_tag();
        for ns in namespaces {
            match self.cluster.list_vms(&ns.name, Some(&vm_tag)).await {
                Ok(vms) if vms.is_empty() => {}
                Ok(vms) => listing.namespaces.push(NamespaceListing {
                    namespace: ns.name,
                    vms,
                }),
                Err(e) => {
                    warn!(
                        namespace = %ns.name,
                        error = %e,
                        "failed to list VMs"
                    );
                    listing.errors.push(Failure::for_namespace(&ns.name, e));
                }
            }
        }
        listing.namespaces.sort_by(|a, b| a.namespace.cmp(&b.namespace));
        listing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScaleConfig;
    use crate::planner::Planner;
    use envconfig::Envconfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;
    use vmscale_cluster::memory::{MemoryCluster, Op};

    fn cfg() -> ScaleConfig {
        ScaleConfig::init_from_hashmap(&HashMap::new()).unwrap()
    }

    #[tokio::test]
    async fn lists_created_vms_sorted_and_skips_failures() {
        let cluster = MemoryCluster::new();
        let exec = Executor::new(cluster.clone(), cfg());
        let plan = Planner::new("qe-ns", "qe-virt", 4..=4, 999)
            .plan(12, &mut StdRng::seed_from_u64(2))
            .unwrap();
        exec.create_all(&plan).await;
        cluster.deny(Op::ListVms, "qe-ns-002").await;

        let listing = exec.list_all().await;
        assert_eq!(listing.total(), 8);
        let names: Vec<_> = listing
            .namespaces
            .iter()
            .map(|n| n.namespace.as_str())
            .collect();
        assert_eq!(names, ["qe-ns-001", "qe-ns-003"]);
        assert_eq!(listing.errors.len(), 1);
        assert!(
            listing
                .namespaces
                .iter()
                .flat_map(|n| &n.vms)
                .all(|vm| !vm.running)
        );
    }

    #[tokio::test]
    async fn empty_cluster_lists_nothing() {
        let listing =
            Executor::new(MemoryCluster::new(), cfg()).list_all().await;
        assert_eq!(listing.total(), 0);
        assert!(listing.namespaces.is_empty());
    }
}
