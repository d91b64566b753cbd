//! Platform-specific resource limit handling

use crate::sandbox::limits::ResourceLimits;
use tokio::process::Command;

/// Apply Unix resource limits to the child before exec
#[cfg(unix)]
pub(crate) fn apply_unix_limits(cmd: &mut Command, limits: &ResourceLimits) {
    let max_memory = limits.max_memory_bytes;
    let max_cpu = limits.max_cpu_seconds;
    let max_processes = limits.max_processes.map(u64::from);
    let max_files = limits.max_open_files.map(u64::from);
    let disable_core = limits.disable_core_dumps;

    // Hard and soft limits are set together so the child cannot raise them.
    // A limit that cannot be applied aborts the spawn.
    macro_rules! set_limit {
        ($resource:expr, $value:expr) => {{
            let limit = libc::rlimit {
                rlim_cur: $value as libc::rlim_t,
                rlim_max: $value as libc::rlim_t,
            };
            if libc::setrlimit($resource, &limit) != 0 {
                return Err(std::io::Error::last_os_error());
            }
        }};
    }

    // SAFETY: pre_exec runs between fork() and exec() in the child process.
    // The closure only calls async-signal-safe libc functions (setrlimit).
    // All captured values are Copy types moved into the closure, so no shared
    // mutable state exists. The parent process is not affected.
    unsafe {
        cmd.pre_exec(move || {
            if let Some(mem) = max_memory {
                set_limit!(libc::RLIMIT_AS, mem);
            }
            if let Some(cpu) = max_cpu {
                set_limit!(libc::RLIMIT_CPU, cpu);
            }
            if let Some(procs) = max_processes {
                set_limit!(libc::RLIMIT_NPROC, procs);
            }
            if let Some(files) = max_files {
                set_limit!(libc::RLIMIT_NOFILE, files);
            }
            if disable_core {
                set_limit!(libc::RLIMIT_CORE, 0u64);
            }
            Ok(())
        });
    }
}

/// No-op for non-Unix platforms
#[cfg(not(unix))]
pub(crate) fn apply_unix_limits(_cmd: &mut Command, _limits: &ResourceLimits) {}
