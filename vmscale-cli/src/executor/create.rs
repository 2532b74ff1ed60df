use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use vmscale_cluster::{ClusterApi, ClusterResult};

use super::{Executor, Failure};
use crate::manifest;
use crate::planner::{Plan, ResourceSpec};
use crate::progress;
use crate::stats::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceOutcome {
    Created,
    /// The namespace already existed. `tagged == false` means it was adopted
    /// even though it does not carry the harness label.
    Reused { tagged: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutcome {
    Created,
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct CreateReport {
    pub dry_run: bool,
    pub requested: u32,
    pub planned: u32,
    /// Namespace cap the plan was drawn under.
    pub max_namespaces: u32,
    pub created: u32,
    /// VMs never attempted because their namespace could not be ensured.
    pub skipped: u32,
    pub failures: Vec<Failure>,
    pub namespaces_created: Vec<String>,
    pub namespaces_reused: Vec<String>,
    /// Subset of `namespaces_reused` that lacked the harness label.
    pub namespaces_adopted: Vec<String>,
    pub namespace_failures: Vec<Failure>,
    pub vms_per_namespace: Stats,
    pub cpu: Stats,
    pub memory_gib: Stats,
    pub disk_gib: Stats,
    pub duration: Duration,
    pub failure_sample: usize,
}

impl CreateReport {
    pub fn namespaces_used(&self) -> usize {
        self.namespaces_created.len() + self.namespaces_reused.len()
    }

    /// VMs the plan could not place because the namespace cap was reached.
    pub fn truncated_by(&self) -> u32 {
        self.requested - self.planned
    }

    fn record_created(&mut self, spec: &ResourceSpec) {
        self.created += 1;
        self.cpu.observe(spec.cpu);
        self.memory_gib.observe(spec.memory_gib);
        self.disk_gib.observe(spec.disk_gib);
    }
}

impl<C: ClusterApi> Executor<C> {
    /// Gets the namespace or creates it with the namespace tag.
    pub async fn ensure_namespace(
        &self,
        name: &str,
    ) -> ClusterResult<NamespaceOutcome> {
        let tag = self.namespace_tag();
        match self.cluster.get_namespace(name).await? {
            Some(ns) if ns.has_tag(&tag) => {
                debug!(namespace = %name, "reusing existing namespace");
                Ok(NamespaceOutcome::Reused { tagged: true })
            }
            Some(_) => {
                warn!(
                    namespace = %name,
                    label = %tag,
                    "namespace exists but lacks label, reusing anyway"
                );
                Ok(NamespaceOutcome::Reused { tagged: false })
            }
            None => {
                self.cluster.create_namespace(name, &tag.as_labels()).await?;
                info!(
                    namespace = %name,
                    dry_run = self.dry_run,
                    "created namespace"
                );
                Ok(NamespaceOutcome::Created)
            }
        }
    }

    pub async fn create_resource(
        &self,
        spec: &ResourceSpec,
    ) -> ResourceOutcome {
        let vm = manifest::virtual_machine(
            spec,
            &self.vm_tag(),
            &self.cfg.container_image,
        );
        match self.cluster.create_vm(&vm).await {
            Ok(()) => {
                debug!(
                    namespace = %spec.namespace,
                    name = %spec.name,
                    "created VirtualMachine"
                );
                ResourceOutcome::Created
            }
            Err(e) => {
                warn!(
                    namespace = %spec.namespace,
                    name = %spec.name,
                    error = %e,
                    "failed to create VirtualMachine"
                );
                ResourceOutcome::Failed(e.to_string())
            }
        }
    }

    /// Walks the plan in order: ensure each namespace, then create its VMs.
    pub async fn create_all(&self, plan: &Plan) -> CreateReport {
        let started = Instant::now();
        let mut report = CreateReport {
            dry_run: self.dry_run,
            requested: plan.requested,
            planned: plan.planned(),
            max_namespaces: self.cfg.distribution.max_namespaces,
            failure_sample: self.cfg.failure_sample,
            ..Default::default()
        };
        if plan.is_truncated() {
            warn!(
                requested = plan.requested,
                planned = plan.planned(),
                max_namespaces = report.max_namespaces,
                "namespace limit reached, plan truncated"
            );
        }

        let bar = progress::counter(u64::from(report.planned), "Creating VMs");
        for entry in &plan.entries {
            match self.ensure_namespace(&entry.name).await {
                Ok(NamespaceOutcome::Created) => {
                    report.namespaces_created.push(entry.name.clone())
                }
                Ok(NamespaceOutcome::Reused { tagged }) => {
                    report.namespaces_reused.push(entry.name.clone());
                    if !tagged {
                        report.namespaces_adopted.push(entry.name.clone());
                    }
                }
                Err(e) => {
                    warn!(
                        namespace = %entry.name,
                        error = %e,
                        skipped = entry.vm_count,
                        "cannot use namespace, skipping its VMs"
                    );
                    report
                        .namespace_failures
                        .push(Failure::for_namespace(&entry.name, e));
                    report.skipped += entry.vm_count;
                    bar.inc(u64::from(entry.vm_count));
                    continue;
                }
            }

            let mut created_here = 0;
            for spec in &entry.resources {
                match self.create_resource(spec).await {
                    ResourceOutcome::Created => {
                        report.record_created(spec);
                        created_here += 1;
                    }
                    ResourceOutcome::Failed(reason) => {
                        report.failures.push(Failure::new(
                            &spec.namespace,
                            &spec.name,
                            reason,
                        ))
                    }
                }
                bar.inc(1);
                bar.set_message(format!(
                    "namespaces={} failed={}",
                    report.namespaces_used(),
                    report.failures.len()
                ));
            }
            report.vms_per_namespace.observe(created_here);
        }
        bar.finish_and_clear();

        report.duration = started.elapsed();
        report
    }
}
