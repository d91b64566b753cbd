//! Python compiled to WASI, hosted in-process by wasmtime

use async_trait::async_trait;
#[cfg(feature = "wasm-runtime")]
use std::sync::Arc;
use tracing::{debug, warn};

use crate::sandbox::SandboxBackend;
use crate::sandbox::config::SandboxConfig;
use crate::sandbox::types::{BackendKind, ExecutionRequest, ExecutionResult};

/// Embedded interpreter backend
///
/// The interpreter module is compiled once at construction. When the
/// `wasm-runtime` feature is off, or no module is configured, or it fails to
/// load, the backend reports itself unavailable and the orchestrator moves on.
pub struct WasmBackend {
    #[cfg(feature = "wasm-runtime")]
    runtime: Option<Arc<runtime::WasmRuntime>>,
    #[cfg(not(feature = "wasm-runtime"))]
    _config: SandboxConfig,
}

impl std::fmt::Debug for WasmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmBackend")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl WasmBackend {
    #[cfg(feature = "wasm-runtime")]
    pub fn new(config: &SandboxConfig) -> Self {
        let runtime = match &config.wasm_module {
            Some(path) => match runtime::WasmRuntime::load(path, config) {
                Ok(rt) => {
                    debug!("Loaded WASI interpreter from {}", path.display());
                    Some(Arc::new(rt))
                }
                Err(e) => {
                    warn!("Failed to load WASI interpreter {}: {}", path.display(), e);
                    None
                }
            },
            None => {
                debug!("No WASI interpreter configured");
                None
            }
        };
        Self { runtime }
    }

    #[cfg(not(feature = "wasm-runtime"))]
    pub fn new(config: &SandboxConfig) -> Self {
        if config.wasm_module.is_some() {
            warn!("wasm_module is configured but warden was built without the wasm-runtime feature");
        } else {
            debug!("WASM backend disabled at compile time");
        }
        Self {
            _config: config.clone(),
        }
    }

    /// Whether the embedded runtime loaded at startup
    pub fn is_loaded(&self) -> bool {
        #[cfg(feature = "wasm-runtime")]
        {
            self.runtime.is_some()
        }
        #[cfg(not(feature = "wasm-runtime"))]
        {
            false
        }
    }
}

#[async_trait]
impl SandboxBackend for WasmBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Wasm
    }

    async fn available(&self) -> bool {
        self.is_loaded()
    }

    async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        self.run(request).await
    }
}

impl WasmBackend {
    #[cfg(feature = "wasm-runtime")]
    async fn run(&self, request: &ExecutionRequest) -> ExecutionResult {
        let Some(runtime) = self.runtime.clone() else {
            return ExecutionResult::error(Some(BackendKind::Wasm), "WASM runtime not loaded");
        };
        let request = request.clone();
        let limit = request.timeout();

        match tokio::task::spawn_blocking(move || runtime.run(&request)).await {
            Ok(Ok(run)) if run.interrupted => {
                ExecutionResult::timed_out(BackendKind::Wasm, limit, run.stdout, run.stderr)
            }
            Ok(Ok(run)) => {
                ExecutionResult::completed(BackendKind::Wasm, run.stdout, run.stderr, Some(run.exit_code))
            }
            Ok(Err(e)) => ExecutionResult::error(Some(BackendKind::Wasm), e.to_string()),
            Err(e) => ExecutionResult::error(Some(BackendKind::Wasm), format!("WASM task failed: {}", e)),
        }
    }

    #[cfg(not(feature = "wasm-runtime"))]
    async fn run(&self, _request: &ExecutionRequest) -> ExecutionResult {
        ExecutionResult::error(
            Some(BackendKind::Wasm),
            "WASM runtime support is not compiled in",
        )
    }
}

#[cfg(feature = "wasm-runtime")]
mod runtime {
    use std::path::{Path, PathBuf};
    use std::sync::mpsc;
    use std::time::Duration;

    use wasmtime::{Config, Engine, Linker, Module, Store, StoreLimits, StoreLimitsBuilder, Trap};
    use wasmtime_wasi::pipe::MemoryOutputPipe;
    use wasmtime_wasi::preview1::{self, WasiP1Ctx};
    use wasmtime_wasi::{DirPerms, FilePerms, I32Exit, WasiCtxBuilder};

    use crate::sandbox::config::SandboxConfig;
    use crate::sandbox::types::ExecutionRequest;

    /// Guest path where the interpreter expects its standard library
    const STDLIB_GUEST_PATH: &str = "/usr/local/lib";

    struct State {
        wasi: WasiP1Ctx,
        limits: StoreLimits,
    }

    pub(super) struct RunOutput {
        pub stdout: String,
        pub stderr: String,
        pub exit_code: i32,
        pub interrupted: bool,
    }

    pub(super) struct WasmRuntime {
        engine: Engine,
        module: Module,
        stdlib_dir: Option<PathBuf>,
        max_output_bytes: usize,
    }

    impl WasmRuntime {
        pub fn load(path: &Path, config: &SandboxConfig) -> wasmtime::Result<Self> {
            let mut wasm_config = Config::new();
            wasm_config.epoch_interruption(true);
            let engine = Engine::new(&wasm_config)?;
            let module = Module::from_file(&engine, path)?;
            Ok(Self {
                engine,
                module,
                stdlib_dir: config.wasm_stdlib_dir.clone(),
                max_output_bytes: usize::try_from(config.max_output_bytes).unwrap_or(usize::MAX),
            })
        }

        /// Instantiate a fresh store and run the interpreter's `_start`
        pub fn run(&self, request: &ExecutionRequest) -> wasmtime::Result<RunOutput> {
            let stdout = MemoryOutputPipe::new(self.max_output_bytes);
            let stderr = MemoryOutputPipe::new(self.max_output_bytes);

            let mut builder = WasiCtxBuilder::new();
            builder
                .args(&["python", "-c", request.code.as_str()])
                .stdout(stdout.clone())
                .stderr(stderr.clone());
            if let Some(dir) = &self.stdlib_dir {
                builder.preopened_dir(dir, STDLIB_GUEST_PATH, DirPerms::READ, FilePerms::READ)?;
            }

            let memory_bytes = usize::try_from(request.memory_mb.saturating_mul(1024 * 1024))
                .unwrap_or(usize::MAX);
            let state = State {
                wasi: builder.build_p1(),
                limits: StoreLimitsBuilder::new().memory_size(memory_bytes).build(),
            };

            let mut store = Store::new(&self.engine, state);
            store.limiter(|s| &mut s.limits);
            store.set_epoch_deadline(1);

            let mut linker: Linker<State> = Linker::new(&self.engine);
            preview1::add_to_linker_sync(&mut linker, |s: &mut State| &mut s.wasi)?;

            let _ticker = EpochTicker::start(self.engine.clone(), request.timeout());

            let instance = linker.instantiate(&mut store, &self.module)?;
            let start = instance.get_typed_func::<(), ()>(&mut store, "_start")?;

            let (exit_code, interrupted) = match start.call(&mut store, ()) {
                Ok(()) => (0, false),
                Err(e) => {
                    if let Some(exit) = e.downcast_ref::<I32Exit>() {
                        (exit.0, false)
                    } else if e.downcast_ref::<Trap>() == Some(&Trap::Interrupt) {
                        (-1, true)
                    } else {
                        return Err(e);
                    }
                }
            };
            drop(store);

            Ok(RunOutput {
                stdout: String::from_utf8_lossy(&stdout.contents()).into_owned(),
                stderr: String::from_utf8_lossy(&stderr.contents()).into_owned(),
                exit_code,
                interrupted,
            })
        }
    }

    /// Bumps the engine epoch once `limit` passes, unless dropped first
    struct EpochTicker {
        _cancel: mpsc::Sender<()>,
    }

    impl EpochTicker {
        fn start(engine: Engine, limit: Duration) -> Self {
            let (tx, rx) = mpsc::channel::<()>();
            std::thread::spawn(move || {
                if let Err(mpsc::RecvTimeoutError::Timeout) = rx.recv_timeout(limit) {
                    engine.increment_epoch();
                }
            });
            Self { _cancel: tx }
        }
    }
}
