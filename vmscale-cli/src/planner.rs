use rand::Rng;
use std::ops::RangeInclusive;

use crate::config::ScaleConfig;

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("VM count must be at least 1, got {0}")]
    InvalidCount(u32),
    #[error("VMs per namespace range {min}..={max} is invalid")]
    InvalidRange { min: u32, max: u32 },
}

/// Randomized sizing of a single VirtualMachine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    pub name: String,
    pub namespace: String,
    /// Position of this VM across the whole run, starting at 1.
    pub index: u32,
    pub cpu: u32,
    pub memory_gib: u32,
    pub disk_gib: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespacePlanEntry {
    pub index: u32,
    pub name: String,
    pub vm_count: u32,
    pub resources: Vec<ResourceSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub requested: u32,
    pub entries: Vec<NamespacePlanEntry>,
}

impl Plan {
    pub fn planned(&self) -> u32 {
        self.entries.iter().map(|e| e.vm_count).sum()
    }

    /// True when the namespace cap was hit before every VM was placed.
    pub fn is_truncated(&self) -> bool {
        self.planned() < self.requested
    }

    pub fn shortfall(&self) -> u32 {
        self.requested - self.planned()
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceSpec> {
        self.entries.iter().flat_map(|e| e.resources.iter())
    }
}

#[derive(Debug, Clone)]
pub struct SpecRanges {
    pub cpu: RangeInclusive<u32>,
    pub memory_gib: RangeInclusive<u32>,
    pub disk_gib: RangeInclusive<u32>,
}

impl Default for SpecRanges {
    fn default() -> Self {
        Self {
            cpu: 1..=4,
            memory_gib: 1..=8,
            disk_gib: 10..=50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Planner {
    ns_prefix: String,
    vm_prefix: String,
    per_namespace: RangeInclusive<u32>,
    max_namespaces: u32,
    specs: SpecRanges,
}

impl Planner {
    pub fn new(
        ns_prefix: impl Into<String>,
        vm_prefix: impl Into<String>,
        per_namespace: RangeInclusive<u32>,
        max_namespaces: u32,
    ) -> Self {
        Self {
            ns_prefix: ns_prefix.into(),
            vm_prefix: vm_prefix.into(),
            per_namespace,
            max_namespaces,
            specs: SpecRanges::default(),
        }
    }

    pub fn with_specs(mut self, specs: SpecRanges) -> Self {
        self.specs = specs;
        self
    }

    pub fn from_config(cfg: &ScaleConfig) -> Self {
        let s = &cfg.specs;
        Self::new(
            &cfg.ns_prefix,
            &cfg.vm_prefix,
            cfg.distribution.per_namespace(),
            cfg.distribution.max_namespaces,
        )
        .with_specs(SpecRanges {
            cpu: s.cpu_min..=s.cpu_max,
            memory_gib: s.memory_min_gib..=s.memory_max_gib,
            disk_gib: s.disk_min_gib..=s.disk_max_gib,
        })
    }

    /// Splits `total` VMs into namespace batches. Every batch is drawn from
    /// the per-namespace range, shrunk to what is left so the sum never
    /// overshoots. Planning stops early, without error, once
    /// `max_namespaces` batches exist.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        total: u32,
        rng: &mut R,
    ) -> Result<Plan, PlanError> {
        if total < 1 {
            return Err(PlanError::InvalidCount(total));
        }
        let (min, max) =
            (*self.per_namespace.start(), *self.per_namespace.end());
        if min == 0 || min > max {
            return Err(PlanError::InvalidRange { min, max });
        }

        let mut entries = Vec::new();
        let mut remaining = total;
        let mut ns_index = 1;
        let mut vm_index = 1;
        while remaining > 0 && ns_index <= self.max_namespaces {
            let upper = remaining.min(max);
            let lower = min.min(upper);
            let batch = rng.random_range(lower..=upper);

            let name = namespace_name(&self.ns_prefix, ns_index);
            let resources = (vm_index..vm_index + batch)
                .map(|i| self.resource_spec(&name, i, rng))
                .collect();
            entries.push(NamespacePlanEntry {
                index: ns_index,
                name,
                vm_count: batch,
                resources,
            });

            remaining -= batch;
            vm_index += batch;
            ns_index += 1;
        }

        Ok(Plan {
            requested: total,
            entries,
        })
    }

    fn resource_spec<R: Rng + ?Sized>(
        &self,
        namespace: &str,
        index: u32,
        rng: &mut R,
    ) -> ResourceSpec {
        ResourceSpec {
            name: vm_name(&self.vm_prefix, index, rng),
            namespace: namespace.to_string(),
            index,
            cpu: rng.random_range(self.specs.cpu.clone()),
            memory_gib: rng.random_range(self.specs.memory_gib.clone()),
            disk_gib: rng.random_range(self.specs.disk_gib.clone()),
        }
    }
}

/// `qe-ns-001` style name.
pub fn namespace_name(prefix: &str, index: u32) -> String {
    format!("{prefix}-{index:03}")
}

/// `qe-virt-001-x7k2p` style name. The suffix keeps repeated runs from
/// colliding in practice but does not guarantee uniqueness.
pub fn vm_name<R: Rng + ?Sized>(
    prefix: &str,
    index: u32,
    rng: &mut R,
) -> String {
    format!("{prefix}-{index:03}-{}", random_suffix(rng, SUFFIX_LEN))
}

pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| {
            SUFFIX_CHARSET[rng.random_range(0..SUFFIX_CHARSET.len())] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn planner(range: RangeInclusive<u32>, max_ns: u32) -> Planner {
        Planner::new("qe-ns", "qe-virt", range, max_ns)
    }

    #[test]
    fn rejects_zero_total() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            planner(1..=20, 999).plan(0, &mut rng),
            Err(PlanError::InvalidCount(0))
        );
    }

    #[test]
    fn rejects_bad_range() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            planner(5..=2, 999).plan(10, &mut rng),
            Err(PlanError::InvalidRange { min: 5, max: 2 })
        );
        assert_eq!(
            planner(0..=2, 999).plan(10, &mut rng),
            Err(PlanError::InvalidRange { min: 0, max: 2 })
        );
    }

    #[test]
    fn counts_sum_to_total_and_respect_range() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            for total in [1, 2, 7, 19, 20, 21, 25, 100, 500] {
                let plan = planner(3..=20, 999).plan(total, &mut rng).unwrap();
                assert_eq!(plan.planned(), total);
                assert!(!plan.is_truncated());
                let (last, rest) = plan.entries.split_last().unwrap();
                for e in rest {
                    assert!((3..=20).contains(&e.vm_count), "{e:?}");
                }
                assert!(last.vm_count >= 1 && last.vm_count <= 20);
                for e in &plan.entries {
                    assert_eq!(e.vm_count as usize, e.resources.len());
                }
            }
        }
    }

    #[test]
    fn twenty_five_needs_at_least_two_namespaces() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = planner(1..=20, 999).plan(25, &mut rng).unwrap();
            assert!(plan.entries.len() >= 2);
            let last = plan.entries.last().unwrap();
            assert!(last.vm_count <= 20);
            let before: u32 = plan.entries[..plan.entries.len() - 1]
                .iter()
                .map(|e| e.vm_count)
                .sum();
            assert!(last.vm_count <= 25 - before);
        }
    }

    #[test]
    fn namespace_cap_truncates_plan() {
        let mut rng = StdRng::seed_from_u64(7);
        let plan = planner(1..=2, 3).plan(100, &mut rng).unwrap();
        assert_eq!(plan.entries.len(), 3);
        assert!(plan.is_truncated());
        assert!(plan.planned() <= 6);
        assert_eq!(plan.shortfall(), 100 - plan.planned());
    }

    #[test]
    fn names_and_indexes_are_sequential() {
        let mut rng = StdRng::seed_from_u64(3);
        let plan = planner(4..=4, 999).plan(10, &mut rng).unwrap();
        let names: Vec<_> =
            plan.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["qe-ns-001", "qe-ns-002", "qe-ns-003"]);
        assert_eq!(plan.entries[2].vm_count, 2);

        let indexes: Vec<_> = plan.resources().map(|r| r.index).collect();
        assert_eq!(indexes, (1..=10).collect::<Vec<_>>());
        for r in plan.resources() {
            let prefix = format!("qe-virt-{:03}-", r.index);
            assert!(r.name.starts_with(&prefix), "{}", r.name);
            let suffix = &r.name[prefix.len()..];
            assert_eq!(suffix.len(), 5);
            assert!(
                suffix
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            );
        }
        assert_eq!(plan.entries[1].resources[0].namespace, "qe-ns-002");
    }

    #[test]
    fn specs_stay_within_ranges() {
        let mut rng = StdRng::seed_from_u64(11);
        let plan = planner(1..=20, 999).plan(500, &mut rng).unwrap();
        for r in plan.resources() {
            assert!((1..=4).contains(&r.cpu));
            assert!((1..=8).contains(&r.memory_gib));
            assert!((10..=50).contains(&r.disk_gib));
        }
    }

    #[test]
    fn repeated_runs_differ_in_names_only() {
        let p = planner(5..=5, 999);
        let a = p.plan(10, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = p.plan(10, &mut StdRng::seed_from_u64(2)).unwrap();
        let counts = |p: &Plan| {
            p.entries.iter().map(|e| e.vm_count).collect::<Vec<_>>()
        };
        assert_eq!(counts(&a), counts(&b));
        assert_ne!(
            a.resources().map(|r| &r.name).collect::<Vec<_>>(),
            b.resources().map(|r| &r.name).collect::<Vec<_>>()
        );
    }
}
