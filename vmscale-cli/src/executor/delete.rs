use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use vmscale_cluster::{ClusterApi, VmSummary};

use super::{Executor, Failure};
use crate::progress;

/// Result of the emptiness check that gates namespace deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Deleted,
    /// The namespace vanished before (or while) it was checked.
    AlreadyGone,
    NotTagged,
    TaggedVmsRemain(usize),
    /// VirtualMachines without the harness label live here.
    OtherVmsRemain(usize),
    Failed(String),
}

impl fmt::Display for GuardOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deleted => write!(f, "deleted"),
            Self::AlreadyGone => write!(f, "not found"),
            Self::NotTagged => write!(f, "missing harness label"),
            Self::TaggedVmsRemain(n) => write!(f, "still has {n} test VMs"),
            Self::OtherVmsRemain(n) => write!(f, "has {n} other VMs"),
            Self::Failed(reason) => write!(f, "error: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceSweep {
    pub namespace: String,
    pub found: usize,
    pub deleted: u32,
    pub failed: u32,
    pub list_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteReport {
    pub dry_run: bool,
    pub namespaces_found: Vec<String>,
    pub sweeps: Vec<NamespaceSweep>,
    pub failures: Vec<Failure>,
    pub namespaces_deleted: Vec<String>,
    pub namespaces_gone: Vec<String>,
    pub namespaces_retained: Vec<(String, GuardOutcome)>,
    /// Set when the tagged namespaces could not be discovered at all.
    pub list_error: Option<String>,
    pub duration: Duration,
    pub failure_sample: usize,
}

impl DeleteReport {
    pub fn resources_deleted(&self) -> u32 {
        self.sweeps.iter().map(|s| s.deleted).sum()
    }

    pub fn resources_failed(&self) -> u32 {
        self.sweeps.iter().map(|s| s.failed).sum()
    }

    /// `(resources_deleted, namespaces_deleted)`
    pub fn counts(&self) -> (u32, usize) {
        (self.resources_deleted(), self.namespaces_deleted.len())
    }
}

impl<C: ClusterApi> Executor<C> {
    /// Deletes `name` only when it carries the namespace tag and holds no
    /// VirtualMachine at all, tagged or not. Every other outcome keeps it.
    pub async fn delete_namespace_if_empty(&self, name: &str) -> GuardOutcome {
        let ns = match self.cluster.get_namespace(name).await {
            Ok(Some(ns)) => ns,
            Ok(None) => return GuardOutcome::AlreadyGone,
            Err(e) if e.is_not_found() => return GuardOutcome::AlreadyGone,
            Err(e) => return GuardOutcome::Failed(e.to_string()),
        };
        if !ns.has_tag(&self.namespace_tag()) {
            return GuardOutcome::NotTagged;
        }

        match self.cluster.list_vms(name, Some(&self.vm_tag())).await {
            Ok(vms) if !vms.is_empty() => {
                return GuardOutcome::TaggedVmsRemain(vms.len());
            }
            Ok(_) => {}
            Err(e) => return GuardOutcome::Failed(e.to_string()),
        }
        match self.cluster.list_vms(name, None).await {
            Ok(vms) if !vms.is_empty() => {
                return GuardOutcome::OtherVmsRemain(vms.len());
            }
            Ok(_) => {}
            Err(e) => return GuardOutcome::Failed(e.to_string()),
        }

        // A VM created between the checks above and this call is not
        // detected; the API server then tears it down with the namespace.
        match self.cluster.delete_namespace(name).await {
            Ok(()) => GuardOutcome::Deleted,
            Err(e) if e.is_not_found() => GuardOutcome::AlreadyGone,
            Err(e) => GuardOutcome::Failed(e.to_string()),
        }
    }

    /// Removes every tagged VM in every tagged namespace, then removes the
    /// namespaces left empty. No namespace is touched until the VM sweep
    /// has visited all of them.
    pub async fn delete_all(&self) -> DeleteReport {
        let started = Instant::now();
        let mut report = DeleteReport {
            dry_run: self.dry_run,
            failure_sample: self.cfg.failure_sample,
            ..Default::default()
        };
        let ns_tag = self.namespace_tag();
        let vm_tag = self.vm_tag();

        let namespaces: Vec<String> =
            match self.cluster.list_namespaces(&ns_tag).await {
                Ok(list) => list.into_iter().map(|ns| ns.name).collect(),
                Err(e) => {
                    error!(error = %e, "failed to list namespaces");
                    report.list_error = Some(e.to_string());
                    report.duration = started.elapsed();
                    return report;
                }
            };
        if namespaces.is_empty() {
            info!(label = %ns_tag, "no namespaces found with label");
            report.duration = started.elapsed();
            return report;
        }
        info!(count = namespaces.len(), "found labelled namespaces");
        report.namespaces_found = namespaces.clone();

        // Enumerate up front so the progress bar knows the total.
        let mut targets: Vec<(String, Result<Vec<VmSummary>, String>)> =
            Vec::with_capacity(namespaces.len());
        for ns in &namespaces {
            let listed = self
                .cluster
                .list_vms(ns, Some(&vm_tag))
                .await
                .map_err(|e| {
                    warn!(namespace = %ns, error = %e, "failed to list VMs");
                    e.to_string()
                });
            targets.push((ns.clone(), listed));
        }
        let total: usize = targets
            .iter()
            .filter_map(|(_, listed)| listed.as_ref().ok())
            .map(Vec::len)
            .sum();

        let bar = progress::counter(total as u64, "Deleting VMs");
        for (ns, listed) in targets {
            let mut sweep = NamespaceSweep {
                namespace: ns.clone(),
                ..Default::default()
            };
            match listed {
                Err(reason) => sweep.list_error = Some(reason),
                Ok(vms) => {
                    sweep.found = vms.len();
                    for vm in vms {
                        match self.cluster.delete_vm(&ns, &vm.name).await {
                            Ok(()) => sweep.deleted += 1,
                            Err(e) if e.is_not_found() => {
                                debug!(
                                    namespace = %ns,
                                    name = %vm.name,
                                    "VM already gone"
                                );
                                sweep.deleted += 1;
                            }
                            Err(e) => {
                                warn!(
                                    namespace = %ns,
                                    name = %vm.name,
                                    error = %e,
                                    "failed to delete VirtualMachine"
                                );
                                sweep.failed += 1;
                                report
                                    .failures
                                    .push(Failure::new(&ns, &vm.name, e));
                            }
                        }
                        bar.inc(1);
                        bar.set_message(format!(
                            "namespace={ns} failed={}",
                            report.failures.len()
                        ));
                    }
                }
            }
            report.sweeps.push(sweep);
        }
        bar.finish_and_clear();

        let settle = self.cfg.settle_delay();
        if !self.dry_run && !settle.is_zero() {
            debug!(?settle, "waiting for VM deletions to propagate");
            tokio::time::sleep(settle).await;
        }

        for ns in &namespaces {
            match self.delete_namespace_if_empty(ns).await {
                GuardOutcome::Deleted => {
                    info!(
                        namespace = %ns,
                        dry_run = self.dry_run,
                        "deleted namespace"
                    );
                    report.namespaces_deleted.push(ns.clone());
                }
                GuardOutcome::AlreadyGone => {
                    debug!(namespace = %ns, "namespace not found");
                    report.namespaces_gone.push(ns.clone());
                }
                outcome => {
                    if let GuardOutcome::Failed(reason) = &outcome {
                        warn!(
                            namespace = %ns,
                            %reason,
                            "namespace check failed"
                        );
                    } else {
                        debug!(
                            namespace = %ns,
                            %outcome,
                            "retaining namespace"
                        );
                    }
                    report.namespaces_retained.push((ns.clone(), outcome));
                }
            }
        }

        report.duration = started.elapsed();
        report
    }
}
