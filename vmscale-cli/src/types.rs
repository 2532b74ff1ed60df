/// Scale-test harness for KubeVirt VirtualMachines
#[derive(clap::Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct VmScaleCli {
    #[command(subcommand)]
    pub command: VmScaleCommands,
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum VmScaleCommands {
    /// Create labelled VirtualMachines spread across generated namespaces
    #[clap(aliases = &["c"])]
    Create {
        /// Total number of VMs to create
        #[arg(short = 'c', long, default_value_t = 500)]
        count: u32,
        #[clap(flatten)]
        opt: DryRunArgs,
    },
    /// Delete labelled VMs, then every labelled namespace left empty
    #[clap(aliases = &["rm", "d"])]
    Delete {
        #[clap(flatten)]
        opt: DryRunArgs,
    },
    /// List labelled VMs per labelled namespace
    #[clap(aliases = &["ls", "l"])]
    List,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct DryRunArgs {
    /// Plan and report without sending any create or delete request
    #[arg(long)]
    pub dry_run: bool,
}
