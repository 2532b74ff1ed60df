use crate::crd::VirtualMachine;
use crate::error::ClusterError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

pub type ClusterResult<T> = Result<T, ClusterError>;

pub type Labels = BTreeMap<String, String>;

/// A single `key=value` label used to mark objects owned by the harness.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Equality-based label selector understood by the API server.
    pub fn selector(&self) -> String {
        format!("{}={}", self.key, self.value)
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        labels.get(&self.key) == Some(&self.value)
    }

    pub fn as_labels(&self) -> Labels {
        Labels::from([(self.key.clone(), self.value.clone())])
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceInfo {
    pub name: String,
    pub labels: Labels,
}

impl NamespaceInfo {
    pub fn has_tag(&self, tag: &Tag) -> bool {
        tag.matches(&self.labels)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmSummary {
    pub name: String,
    pub labels: Labels,
    pub running: bool,
}

impl From<&VirtualMachine> for VmSummary {
    fn from(vm: &VirtualMachine) -> Self {
        Self {
            name: vm.metadata.name.clone().unwrap_or_default(),
            labels: vm.metadata.labels.clone().unwrap_or_default(),
            running: vm.spec.is_running(),
        }
    }
}

/// The subset of the orchestration API the harness talks to. Every call is
/// a single request; implementations never retry.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// `Ok(None)` when the namespace does not exist.
    async fn get_namespace(
        &self,
        name: &str,
    ) -> ClusterResult<Option<NamespaceInfo>>;

    async fn create_namespace(
        &self,
        name: &str,
        labels: &Labels,
    ) -> ClusterResult<()>;

    async fn delete_namespace(&self, name: &str) -> ClusterResult<()>;

    async fn list_namespaces(
        &self,
        tag: &Tag,
    ) -> ClusterResult<Vec<NamespaceInfo>>;

    /// Lists VirtualMachines in `namespace`. With `tag = None` every VM is
    /// returned regardless of its labels.
    async fn list_vms(
        &self,
        namespace: &str,
        tag: Option<&Tag>,
    ) -> ClusterResult<Vec<VmSummary>>;

    /// Creates `vm` in the namespace recorded in its metadata.
    async fn create_vm(&self, vm: &VirtualMachine) -> ClusterResult<()>;

    async fn delete_vm(&self, namespace: &str, name: &str) -> ClusterResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_matches_only_exact_value() {
        let tag = Tag::new("cnv-scale-test", "synthetic-workload");
        assert_eq!(tag.selector(), "cnv-scale-test=synthetic-workload");
        assert!(tag.matches(&tag.as_labels()));

        let other = Labels::from([(
            "cnv-scale-test".to_string(),
            "something-else".to_string(),
        )]);
        assert!(!tag.matches(&other));
        assert!(!tag.matches(&Labels::new()));
    }
}
