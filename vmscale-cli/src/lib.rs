pub mod config;
pub mod executor;
pub mod manifest;
pub mod planner;
mod progress;
mod report;
pub mod stats;
mod types;

use anyhow::Context;
use envconfig::Envconfig;
use std::fmt;
use tracing::info;
use vmscale_cluster::{ClusterApi, DryRun, KubeCluster};

use config::ScaleConfig;
use executor::{CreateReport, DeleteReport, Executor, Listing};
use planner::{Plan, Planner};

pub use types::{DryRunArgs, VmScaleCli, VmScaleCommands};

/// A command with its arguments checked and, for `create`, its plan drawn.
/// Building one never touches the cluster.
#[derive(Debug, Clone)]
pub enum Task {
    Create { plan: Plan, dry_run: bool },
    Delete { dry_run: bool },
    List,
}

#[derive(Debug)]
pub enum Outcome {
    Created(CreateReport),
    Deleted(DeleteReport),
    Listed(Listing),
}

impl Task {
    pub fn prepare(
        command: &VmScaleCommands,
        cfg: &ScaleConfig,
    ) -> anyhow::Result<Self> {
        let task = match command {
            VmScaleCommands::Create { count, opt } => {
                let plan = Planner::from_config(cfg)
                    .plan(*count, &mut rand::rng())?;
                Task::Create {
                    plan,
                    dry_run: opt.dry_run,
                }
            }
            VmScaleCommands::Delete { opt } => Task::Delete {
                dry_run: opt.dry_run,
            },
            VmScaleCommands::List => Task::List,
        };
        Ok(task)
    }

    fn dry_run(&self) -> bool {
        match self {
            Task::Create { dry_run, .. } | Task::Delete { dry_run } => *dry_run,
            Task::List => false,
        }
    }

    /// Runs against `cluster`. Writes are routed through [`DryRun`] when the
    /// task asks for it.
    pub async fn execute<C: ClusterApi>(
        &self,
        cluster: C,
        cfg: ScaleConfig,
    ) -> Outcome {
        if self.dry_run() {
            let exec = Executor::new(DryRun::new(cluster), cfg).dry_run(true);
            self.execute_with(&exec).await
        } else {
            self.execute_with(&Executor::new(cluster, cfg)).await
        }
    }

    async fn execute_with<C: ClusterApi>(
        &self,
        exec: &Executor<C>,
    ) -> Outcome {
        match self {
            Task::Create { plan, .. } => {
                Outcome::Created(exec.create_all(plan).await)
            }
            Task::Delete { .. } => Outcome::Deleted(exec.delete_all().await),
            Task::List => Outcome::Listed(exec.list_all().await),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created(r) => fmt::Display::fmt(r, f),
            Outcome::Deleted(r) => fmt::Display::fmt(r, f),
            Outcome::Listed(r) => fmt::Display::fmt(r, f),
        }
    }
}

fn banner(task: &Task, cfg: &ScaleConfig) {
    let ns_tag = cfg.labels.namespace_tag();
    let vm_tag = cfg.labels.vm_tag();
    let d = &cfg.distribution;
    match task {
        Task::Create { plan, dry_run } => {
            println!("Creating {} VMs", plan.requested);
            println!(
                "Distribution: {}-{} VMs per namespace, up to {} namespaces",
                d.min_per_namespace, d.max_per_namespace, d.max_namespaces
            );
            println!(
                "Planned: {} VMs across {} namespaces",
                plan.planned(),
                plan.entries.len()
            );
            println!("Namespace label: {ns_tag}");
            println!("VM label: {vm_tag}");
            println!("Dry run: {dry_run}\n");
        }
        Task::Delete { dry_run } => {
            println!("Deleting VMs labelled {vm_tag}");
            println!("in namespaces labelled {ns_tag}");
            println!("Dry run: {dry_run}\n");
        }
        Task::List => {
            println!("Listing VMs labelled {vm_tag}");
            println!("in namespaces labelled {ns_tag}\n");
        }
    }
}

/// Loads configuration from the environment, prepares the task, connects
/// with the ambient kubeconfig and prints the resulting report. Only setup
/// problems are returned as errors; per-item failures live in the report.
pub async fn run(cli: VmScaleCli) -> anyhow::Result<()> {
    let cfg = ScaleConfig::init_from_env().context("invalid configuration")?;
    cfg.validate().context("invalid configuration")?;
    let task = Task::prepare(&cli.command, &cfg)?;

    let cluster = KubeCluster::try_default()
        .await
        .context("failed to connect to the cluster")?;
    info!(dry_run = task.dry_run(), "connected to cluster");

    banner(&task, &cfg);
    let outcome = task.execute(cluster, cfg).await;
    println!("{outcome}");
    Ok(())
}
