pub mod crd;
pub mod dry_run;
pub mod error;
pub mod kubernetes;
pub mod traits;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use crd::VirtualMachine;
pub use dry_run::DryRun;
pub use error::*;
pub use kubernetes::KubeCluster;
pub use traits::*;
