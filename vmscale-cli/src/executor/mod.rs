mod create;
mod delete;
mod list;

pub use create::*;
pub use delete::*;
pub use list::*;

use vmscale_cluster::{ClusterApi, Tag};

use crate::config::ScaleConfig;

/// A per-item failure kept for the end-of-run summary. `name` is `None`
/// when the namespace itself failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub namespace: String,
    pub name: Option<String>,
    pub reason: String,
}

impl Failure {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: Some(name.into()),
            reason: reason.to_string(),
        }
    }

    pub fn for_namespace(
        namespace: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: None,
            reason: reason.to_string(),
        }
    }
}

/// Drives the cluster one request at a time. Item failures are recorded in
/// the returned reports and never abort a batch.
pub struct Executor<C> {
    cluster: C,
    cfg: ScaleConfig,
    dry_run: bool,
}

impl<C: ClusterApi> Executor<C> {
    pub fn new(cluster: C, cfg: ScaleConfig) -> Self {
        Self {
            cluster,
            cfg,
            dry_run: false,
        }
    }

    /// Marks reports as projections. Pair with a `DryRun` cluster so no
    /// write reaches the backend.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn namespace_tag(&self) -> Tag {
        self.cfg.labels.namespace_tag()
    }

    fn vm_tag(&self) -> Tag {
        self.cfg.labels.vm_tag()
    }
}
