use envconfig::Envconfig;
use std::ops::RangeInclusive;
use std::time::Duration;
use vmscale_cluster::Tag;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} range {min}..={max} is empty")]
    EmptyRange {
        name: &'static str,
        min: u32,
        max: u32,
    },
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    #[error("{0} must not be empty")]
    Blank(&'static str),
}

#[derive(Envconfig, Clone, Debug)]
pub struct ScaleConfig {
    #[envconfig(from = "VMSCALE_NS_PREFIX", default = "qe-ns")]
    pub ns_prefix: String,

    #[envconfig(from = "VMSCALE_VM_PREFIX", default = "qe-virt")]
    pub vm_prefix: String,

    #[envconfig(nested)]
    pub labels: LabelConfig,

    #[envconfig(nested)]
    pub distribution: DistributionConfig,

    #[envconfig(nested)]
    pub specs: SpecRangeConfig,

    /// Small image backing the read-only boot disk shared by every VM.
    /// Env: VMSCALE_CONTAINER_IMAGE
    #[envconfig(
        from = "VMSCALE_CONTAINER_IMAGE",
        default = "quay.io/kubevirt/cirros-container-disk-demo"
    )]
    pub container_image: String,

    /// Pause between the VM sweep and the namespace checks on delete.
    /// Env: VMSCALE_SETTLE_SECS
    #[envconfig(from = "VMSCALE_SETTLE_SECS", default = "2")]
    pub settle_secs: u64,

    /// Number of failures printed in a summary before eliding the rest.
    #[envconfig(from = "VMSCALE_FAILURE_SAMPLE", default = "10")]
    pub failure_sample: usize,

    /// VMs shown per namespace by `list`.
    #[envconfig(from = "VMSCALE_LIST_PREVIEW", default = "5")]
    pub list_preview: usize,
}

#[derive(Envconfig, Clone, Debug)]
pub struct LabelConfig {
    #[envconfig(from = "VMSCALE_NS_LABEL_KEY", default = "cnv-scale-test")]
    pub namespace_key: String,
    #[envconfig(
        from = "VMSCALE_NS_LABEL_VALUE",
        default = "synthetic-workload"
    )]
    pub namespace_value: String,
    #[envconfig(from = "VMSCALE_VM_LABEL_KEY", default = "cnv-scale-test")]
    pub vm_key: String,
    #[envconfig(
        from = "VMSCALE_VM_LABEL_VALUE",
        default = "synthetic-workload"
    )]
    pub vm_value: String,
}

impl LabelConfig {
    pub fn namespace_tag(&self) -> Tag {
        Tag::new(&self.namespace_key, &self.namespace_value)
    }

    pub fn vm_tag(&self) -> Tag {
        Tag::new(&self.vm_key, &self.vm_value)
    }
}

#[derive(Envconfig, Clone, Debug)]
pub struct DistributionConfig {
    #[envconfig(from = "VMSCALE_MIN_VMS_PER_NS", default = "1")]
    pub min_per_namespace: u32,
    #[envconfig(from = "VMSCALE_MAX_VMS_PER_NS", default = "20")]
    pub max_per_namespace: u32,
    #[envconfig(from = "VMSCALE_MAX_NAMESPACES", default = "999")]
    pub max_namespaces: u32,
}

impl DistributionConfig {
    pub fn per_namespace(&self) -> RangeInclusive<u32> {
        self.min_per_namespace..=self.max_per_namespace
    }
}

#[derive(Envconfig, Clone, Debug)]
pub struct SpecRangeConfig {
    #[envconfig(from = "VMSCALE_CPU_MIN", default = "1")]
    pub cpu_min: u32,
    #[envconfig(from = "VMSCALE_CPU_MAX", default = "4")]
    pub cpu_max: u32,
    #[envconfig(from = "VMSCALE_MEMORY_MIN_GIB", default = "1")]
    pub memory_min_gib: u32,
    #[envconfig(from = "VMSCALE_MEMORY_MAX_GIB", default = "8")]
    pub memory_max_gib: u32,
    #[envconfig(from = "VMSCALE_DISK_MIN_GIB", default = "10")]
    pub disk_min_gib: u32,
    #[envconfig(from = "VMSCALE_DISK_MAX_GIB", default = "50")]
    pub disk_max_gib: u32,
}

fn check_range(
    name: &'static str,
    min: u32,
    max: u32,
) -> Result<(), ConfigError> {
    if min == 0 {
        return Err(ConfigError::Zero(name));
    }
    if min > max {
        return Err(ConfigError::EmptyRange { name, min, max });
    }
    Ok(())
}

impl ScaleConfig {
    /// Rejects settings that would make planning or manifests meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ns_prefix.is_empty() {
            return Err(ConfigError::Blank("namespace prefix"));
        }
        if self.vm_prefix.is_empty() {
            return Err(ConfigError::Blank("VM prefix"));
        }
        if self.labels.namespace_key.is_empty() {
            return Err(ConfigError::Blank("namespace label key"));
        }
        if self.labels.vm_key.is_empty() {
            return Err(ConfigError::Blank("VM label key"));
        }
        let d = &self.distribution;
        check_range(
            "VMs per namespace",
            d.min_per_namespace,
            d.max_per_namespace,
        )?;
        if d.max_namespaces == 0 {
            return Err(ConfigError::Zero("max namespaces"));
        }
        let s = &self.specs;
        check_range("cpu", s.cpu_min, s.cpu_max)?;
        check_range("memory", s.memory_min_gib, s.memory_max_gib)?;
        check_range("disk", s.disk_min_gib, s.disk_max_gib)?;
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> ScaleConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ScaleConfig::init_from_hashmap(&env).unwrap()
    }

    #[test]
    fn defaults_match_harness_conventions() {
        let cfg = from(&[]);
        assert_eq!(cfg.ns_prefix, "qe-ns");
        assert_eq!(cfg.vm_prefix, "qe-virt");
        assert_eq!(
            cfg.labels.namespace_tag().selector(),
            "cnv-scale-test=synthetic-workload"
        );
        assert_eq!(cfg.labels.vm_tag(), cfg.labels.namespace_tag());
        assert_eq!(cfg.distribution.per_namespace(), 1..=20);
        assert_eq!(cfg.distribution.max_namespaces, 999);
        assert_eq!((cfg.specs.cpu_min, cfg.specs.cpu_max), (1, 4));
        assert_eq!(
            (cfg.specs.memory_min_gib, cfg.specs.memory_max_gib),
            (1, 8)
        );
        assert_eq!((cfg.specs.disk_min_gib, cfg.specs.disk_max_gib), (10, 50));
        assert_eq!(cfg.settle_delay(), Duration::from_secs(2));
        assert_eq!(cfg.failure_sample, 10);
        assert_eq!(cfg.list_preview, 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let cfg = from(&[
            ("VMSCALE_NS_PREFIX", "perf-ns"),
            ("VMSCALE_MAX_VMS_PER_NS", "5"),
            ("VMSCALE_VM_LABEL_VALUE", "other"),
        ]);
        assert_eq!(cfg.ns_prefix, "perf-ns");
        assert_eq!(cfg.distribution.per_namespace(), 1..=5);
        assert_eq!(cfg.labels.vm_tag().selector(), "cnv-scale-test=other");
    }

    #[test]
    fn inverted_or_zero_ranges_are_rejected() {
        let cfg = from(&[
            ("VMSCALE_MIN_VMS_PER_NS", "30"),
            ("VMSCALE_MAX_VMS_PER_NS", "20"),
        ]);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::EmptyRange {
                name: "VMs per namespace",
                min: 30,
                max: 20
            })
        );

        let cfg = from(&[("VMSCALE_CPU_MIN", "0")]);
        assert_eq!(cfg.validate(), Err(ConfigError::Zero("cpu")));

        let cfg = from(&[("VMSCALE_MAX_NAMESPACES", "0")]);
        assert_eq!(cfg.validate(), Err(ConfigError::Zero("max namespaces")));
    }
}
