use std::fmt;

use crate::executor::{CreateReport, DeleteReport, Failure, Listing};

const WIDTH: usize = 80;

fn rule(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", "=".repeat(WIDTH))
}

fn heading(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    rule(f)?;
    writeln!(f, "{title}")?;
    rule(f)
}

fn failures(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    items: &[Failure],
    cap: usize,
) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(f, "\n{title}:")?;
    for item in items.iter().take(cap) {
        match &item.name {
            Some(name) => writeln!(
                f,
                "  - {name} in {}: {}",
                item.namespace, item.reason
            )?,
            None => writeln!(f, "  - {}: {}", item.namespace, item.reason)?,
        }
    }
    if items.len() > cap {
        writeln!(f, "  ... and {} more", items.len() - cap)?;
    }
    Ok(())
}

fn per_item(f: &mut fmt::Formatter<'_>, secs: f64, n: u32) -> fmt::Result {
    if n > 0 {
        writeln!(f, "Average: {:.2} seconds per VM", secs / f64::from(n))?;
    }
    Ok(())
}

impl fmt::Display for CreateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = if self.dry_run {
            "VM Creation Summary (dry run)"
        } else {
            "VM Creation Summary"
        };
        heading(f, title)?;
        writeln!(f, "Total requested: {}", self.requested)?;
        if self.planned < self.requested {
            writeln!(
                f,
                "Planned: {} ({} not placed: limit of {} namespaces reached)",
                self.planned,
                self.truncated_by(),
                self.max_namespaces
            )?;
        }
        writeln!(f, "Successfully created: {}", self.created)?;
        writeln!(f, "Failed: {}", self.failures.len())?;
        if self.skipped > 0 {
            writeln!(f, "Skipped (namespace unavailable): {}", self.skipped)?;
        }
        let secs = self.duration.as_secs_f64();
        writeln!(f, "Duration: {secs:.2} seconds")?;
        per_item(f, secs, self.created)?;

        writeln!(f, "\nNamespace Statistics:")?;
        writeln!(f, "  Total namespaces used: {}", self.namespaces_used())?;
        writeln!(f, "  Newly created: {}", self.namespaces_created.len())?;
        writeln!(f, "  Reused existing: {}", self.namespaces_reused.len())?;
        if !self.namespaces_adopted.is_empty() {
            writeln!(
                f,
                "  Reused without label: {}",
                self.namespaces_adopted.join(", ")
            )?;
        }
        if !self.namespace_failures.is_empty() {
            writeln!(f, "  Unavailable: {}", self.namespace_failures.len())?;
        }

        if self.created > 0 {
            writeln!(f, "\nRandomized Specifications:")?;
            writeln!(f, "  CPU cores:   {}", self.cpu)?;
            writeln!(f, "  Memory (Gi): {}", self.memory_gib)?;
            writeln!(f, "  Disk (Gi):   {}", self.disk_gib)?;
            writeln!(f, "\nVMs per Namespace:")?;
            writeln!(f, "  {}", self.vms_per_namespace)?;
        }

        let cap = self.failure_sample;
        failures(f, "Failed namespaces", &self.namespace_failures, cap)?;
        failures(f, "Failed VMs", &self.failures, cap)?;
        rule(f)
    }
}

impl fmt::Display for DeleteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = if self.dry_run {
            "Deletion Summary (dry run)"
        } else {
            "Deletion Summary"
        };
        heading(f, title)?;
        if let Some(err) = &self.list_error {
            writeln!(f, "Error listing namespaces: {err}")?;
            return rule(f);
        }
        if self.namespaces_found.is_empty() {
            writeln!(f, "No labelled namespaces found. Nothing to delete.")?;
            return rule(f);
        }
        writeln!(f, "Namespaces scanned: {}", self.namespaces_found.len())?;
        writeln!(f, "Total VMs deleted: {}", self.resources_deleted())?;
        writeln!(f, "Failed VM deletions: {}", self.resources_failed())?;
        writeln!(f, "Namespaces deleted: {}", self.namespaces_deleted.len())?;
        writeln!(f, "Namespaces retained: {}", self.namespaces_retained.len())?;
        if !self.namespaces_gone.is_empty() {
            writeln!(
                f,
                "Namespaces already gone: {}",
                self.namespaces_gone.len()
            )?;
        }
        let secs = self.duration.as_secs_f64();
        writeln!(f, "Duration: {secs:.2} seconds")?;
        per_item(f, secs, self.resources_deleted())?;

        let cap = self.failure_sample;
        if !self.namespaces_retained.is_empty() {
            writeln!(f, "\nRetained namespaces:")?;
            for (ns, why) in self.namespaces_retained.iter().take(cap) {
                writeln!(f, "  - {ns}: {why}")?;
            }
            if self.namespaces_retained.len() > cap {
                let more = self.namespaces_retained.len() - cap;
                writeln!(f, "  ... and {more} more")?;
            }
        }
        for sweep in &self.sweeps {
            if let Some(err) = &sweep.list_error {
                writeln!(f, "Error listing VMs in {}: {err}", sweep.namespace)?;
            }
        }
        failures(f, "Failed VM deletions", &self.failures, cap)?;
        rule(f)
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(err) = &self.list_error {
            writeln!(f, "Error listing namespaces: {err}")?;
            return rule(f);
        }
        writeln!(
            f,
            "Total: {} VMs across {} namespaces\n",
            self.total(),
            self.namespaces.len()
        )?;
        for ns in &self.namespaces {
            writeln!(f, "{}: {} VMs", ns.namespace, ns.vms.len())?;
            for vm in ns.vms.iter().take(self.preview) {
                writeln!(f, "  - {} (running: {})", vm.name, vm.running)?;
            }
            if ns.vms.len() > self.preview {
                writeln!(f, "  ... and {} more", ns.vms.len() - self.preview)?;
            }
            writeln!(f)?;
        }
        for err in &self.errors {
            writeln!(
                f,
                "Error listing VMs in {}: {}",
                err.namespace, err.reason
            )?;
        }
        rule(f)
    }
}
