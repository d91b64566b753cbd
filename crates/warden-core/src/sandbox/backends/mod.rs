//! Concrete sandbox backends

mod container;
mod microvm;
mod process;
mod wasm;

pub use container::ContainerBackend;
pub(crate) use container::KILL_TIMEOUT;
pub use microvm::MicroVmBackend;
pub use process::ResourceLimitedBackend;
pub use wasm::WasmBackend;

use std::sync::Arc;
use std::time::Duration;

use super::SandboxBackend;
use super::config::SandboxConfig;
use super::process::ProcessOutcome;
use super::types::{BackendKind, ExecutionResult};

/// Build one backend per entry of `config.preference`, in order
///
/// Duplicate entries are dropped; the first occurrence keeps its position.
pub fn build_backends(config: &SandboxConfig) -> Vec<Arc<dyn SandboxBackend>> {
    let mut seen = Vec::new();
    let mut backends: Vec<Arc<dyn SandboxBackend>> = Vec::new();

    for kind in &config.preference {
        if seen.contains(kind) {
            continue;
        }
        seen.push(*kind);

        let backend: Arc<dyn SandboxBackend> = match kind {
            BackendKind::Wasm => Arc::new(WasmBackend::new(config)),
            BackendKind::Microvm => Arc::new(MicroVmBackend::new(config)),
            BackendKind::Container => Arc::new(ContainerBackend::new(config)),
            BackendKind::Process => Arc::new(ResourceLimitedBackend::new(config)),
        };
        backends.push(backend);
    }

    backends
}

/// Classify a supervised process outcome
fn outcome_to_result(kind: BackendKind, outcome: ProcessOutcome, limit: Duration) -> ExecutionResult {
    if outcome.timed_out {
        ExecutionResult::timed_out(kind, limit, outcome.stdout, outcome.stderr)
    } else {
        ExecutionResult::completed(kind, outcome.stdout, outcome.stderr, outcome.exit_code)
    }
}
