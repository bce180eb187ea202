//! Runtime environment probing
//!
//! Detects the facts about the host that influence which commands the stack
//! builds: GPU availability (selects the CPU or GPU compose profile), the
//! host OS family (selects the browser-open command form), and whether the
//! process runs under WSL (which gets the Windows browser-open form even
//! though the kernel is Linux).
//!
//! Probing happens once at process start and the result is immutable. It
//! never fails: if the vendor diagnostic tool is absent or errors, and the
//! kernel driver marker file is missing, the result is simply "no
//! accelerator". There are no retries and no timeout.

use std::env;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Path checked as a fallback when the vendor diagnostic tool is unavailable.
const NVIDIA_DRIVER_MARKER: &str = "/proc/driver/nvidia/version";

/// Host OS family, as far as this tool cares: it only selects which
/// browser-open command form to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    Posix,
}

/// Facts about the runtime environment, computed once per process invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentFacts {
    /// An NVIDIA GPU is usable on this host.
    pub has_accelerator: bool,

    /// Host OS family.
    pub host_os: HostOs,

    /// The process runs inside WSL (`WSL_DISTRO_NAME` is set).
    pub is_wsl: bool,
}

impl EnvironmentFacts {
    /// Probes the environment. Infallible; any probe error degrades to
    /// `has_accelerator = false`.
    pub fn detect() -> Self {
        let has_accelerator = probe_accelerator();
        let is_wsl = env::var("WSL_DISTRO_NAME")
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        let host_os = if cfg!(windows) {
            HostOs::Windows
        } else {
            HostOs::Posix
        };

        let facts = Self {
            has_accelerator,
            host_os,
            is_wsl,
        };
        debug!(?facts, "environment probe complete");
        facts
    }

    /// Whether the browser-open command should use the Windows form.
    /// WSL counts as Windows here: `powershell.exe` is reachable from
    /// inside the distro and opens the browser on the Windows side.
    pub fn windows_style_open(&self) -> bool {
        self.host_os == HostOs::Windows || self.is_wsl
    }

    /// Suffix appended to version and mode lines when a GPU is active.
    pub fn gpu_tag(&self) -> &'static str {
        if self.has_accelerator {
            " [gpu=on]"
        } else {
            ""
        }
    }
}

/// Runs `nvidia-smi` with captured output; if that cannot run or exits
/// non-zero, falls back to checking for the kernel driver marker file.
fn probe_accelerator() -> bool {
    match Command::new("nvidia-smi").output() {
        Ok(output) if output.status.success() => {
            debug!("nvidia-smi reported a usable GPU");
            true
        }
        Ok(output) => {
            debug!(code = ?output.status.code(), "nvidia-smi exited non-zero");
            Path::new(NVIDIA_DRIVER_MARKER).exists()
        }
        Err(e) => {
            debug!(error = %e, "nvidia-smi not runnable");
            Path::new(NVIDIA_DRIVER_MARKER).exists()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_never_panics() {
        // Probe failure must degrade to "no accelerator", not an error.
        let facts = EnvironmentFacts::detect();
        assert!(facts.host_os == HostOs::Windows || facts.host_os == HostOs::Posix);
    }

    #[test]
    fn test_windows_style_open_on_windows() {
        let facts = EnvironmentFacts {
            has_accelerator: false,
            host_os: HostOs::Windows,
            is_wsl: false,
        };
        assert!(facts.windows_style_open());
    }

    #[test]
    fn test_windows_style_open_under_wsl() {
        let facts = EnvironmentFacts {
            has_accelerator: false,
            host_os: HostOs::Posix,
            is_wsl: true,
        };
        assert!(facts.windows_style_open());
    }

    #[test]
    fn test_posix_open_without_wsl() {
        let facts = EnvironmentFacts {
            has_accelerator: true,
            host_os: HostOs::Posix,
            is_wsl: false,
        };
        assert!(!facts.windows_style_open());
    }

    #[test]
    fn test_gpu_tag() {
        let mut facts = EnvironmentFacts {
            has_accelerator: true,
            host_os: HostOs::Posix,
            is_wsl: false,
        };
        assert_eq!(facts.gpu_tag(), " [gpu=on]");
        facts.has_accelerator = false;
        assert_eq!(facts.gpu_tag(), "");
    }
}
