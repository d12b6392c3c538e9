use std::path::PathBuf;
use std::str::FromStr;

use crate::Error;

/// Which directive family the annotations are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// OpenACC directives; the only target with device routines.
    #[default]
    Accelerator,
    /// OpenMP directives offloaded to a GPU.
    HostGpu,
    /// OpenMP directives on the host CPU.
    HostCpu,
}

impl Target {
    pub fn is_accelerator(self) -> bool {
        self == Target::Accelerator
    }

    /// The directive used for a loop that is known to be parallel.
    pub fn parallel_loop_directive(self) -> &'static str {
        match self {
            Target::Accelerator => "#pragma acc loop independent",
            Target::HostGpu | Target::HostCpu => "#pragma omp parallel for",
        }
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "acc" | "0" => Ok(Target::Accelerator),
            "omp-gpu" | "1" => Ok(Target::HostGpu),
            "omp-cpu" | "2" => Ok(Target::HostCpu),
            _ => Err(Error::InvalidTarget(s.to_string())),
        }
    }
}

/// How a function's region tree is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Annotate loops carrying upstream parallel metadata.
    LoopMetadata,
    /// Annotate whole regions as kernels with a closing scope marker.
    MemoryCoalescing,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub target: Target,
    /// Emit parallel-loop directives from the `parallel` latch marker.
    pub emit_parallel: bool,
    /// Treat loops marked `divergent` as not parallel.
    pub discard_divergent: bool,
    /// Use the memory-coalescing traversal.
    pub coalescing: bool,
    /// Line-number to directive file used to seed the output.
    pub pragma_file: Option<PathBuf>,
}

impl Config {
    #[must_use]
    pub fn policy(&self) -> Policy {
        if self.coalescing {
            Policy::MemoryCoalescing
        } else {
            Policy::LoopMetadata
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_str() {
        assert_eq!("acc".parse::<Target>().unwrap(), Target::Accelerator);
        assert_eq!("1".parse::<Target>().unwrap(), Target::HostGpu);
        assert_eq!("omp-cpu".parse::<Target>().unwrap(), Target::HostCpu);
        assert!(matches!(
            "cuda".parse::<Target>(),
            Err(Error::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_policy_selection() {
        let mut config = Config::default();
        assert_eq!(config.policy(), Policy::LoopMetadata);
        config.coalescing = true;
        assert_eq!(config.policy(), Policy::MemoryCoalescing);
    }
}
