//! Runs the installed binary in place of the launcher.
//!
//! Arguments are passed through verbatim and the child inherits all three
//! standard streams. The launcher then ends the same way the child did: with
//! its exit code, or by re-raising the signal that terminated it.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use anyhow::Result;
use log::debug;
use tokio::process::Command;

use crate::config::Settings;
use crate::error::BootstrapError;
use crate::install::binary_path;
use crate::runtime::Runtime;

mod signal;

pub use signal::exit_like;

/// How the child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    Code(i32),
    /// Terminated by this signal number without an exit code.
    Signal(i32),
}

impl From<ExitStatus> for ChildExit {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ChildExit::Code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signo) = status.signal() {
                return ChildExit::Signal(signo);
            }
        }

        ChildExit::Code(1)
    }
}

pub struct Launcher<R: Runtime> {
    runtime: R,
    settings: Settings,
}

impl<R: Runtime> Launcher<R> {
    pub fn new(runtime: R, settings: Settings) -> Self {
        Self { runtime, settings }
    }

    /// Path of the installed binary for the configured platform.
    ///
    /// Fails if the platform has no prebuilt target or nothing is installed
    /// there yet. Never downloads.
    pub fn locate(&self) -> Result<PathBuf, BootstrapError> {
        let target = self.settings.platform.resolve()?;
        let path = binary_path(&self.settings.install_root, target);

        if !self.runtime.exists(&path) || self.runtime.is_dir(&path) {
            return Err(BootstrapError::BinaryNotFound { path });
        }
        Ok(path)
    }

    /// Spawns the installed binary with `args` and waits for it to exit.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, args: Vec<OsString>) -> Result<ChildExit> {
        let path = self.locate()?;
        debug!("Launching {:?} with {} argument(s)", path, args.len());

        let relay = signal::SignalRelay::install()?;
        let child = Command::new(&path)
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| BootstrapError::Spawn {
                path: path.clone(),
                source,
            })?;

        let status = relay.wait(child).await?;
        let exit = ChildExit::from(status);
        debug!("{:?} exited: {:?}", path, exit);
        Ok(exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::find_bootstrap_error;
    use crate::platform::Platform;
    use crate::runtime::{MockRuntime, RealRuntime};
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    fn settings(root: &Path) -> Settings {
        Settings {
            platform: Platform::new("linux", "x86_64"),
            install_root: root.to_path_buf(),
            skip_download: false,
            base_url: "http://127.0.0.1:1".to_string(),
            release_tag: "v0.1.0".to_string(),
        }
    }

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    /// Root whose installed binary is a link to `/bin/sh`.
    #[cfg(unix)]
    fn shell_install() -> TempDir {
        let root = tempdir().unwrap();
        let dir = root.path().join("linux-x64");
        std::fs::create_dir_all(&dir).unwrap();
        std::os::unix::fs::symlink("/bin/sh", dir.join("codex-litellm")).unwrap();
        root
    }

    #[test]
    fn test_locate_unsupported_platform() {
        let mut settings = settings(Path::new("/opt/dist"));
        settings.platform = Platform::new("plan9", "mips");

        // No expectations = strict mode: nothing is looked up on disk
        let launcher = Launcher::new(MockRuntime::new(), settings);
        let err = launcher.locate().unwrap_err();
        assert!(matches!(err, BootstrapError::UnsupportedPlatform { .. }));
        assert!(err.to_string().contains("plan9/mips"));
    }

    #[test]
    fn test_locate_missing_binary() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);
        runtime.expect_is_dir().returning(|_| false);

        let launcher = Launcher::new(runtime, settings(Path::new("/opt/dist")));
        let err = launcher.locate().unwrap_err();

        match &err {
            BootstrapError::BinaryNotFound { path } => {
                assert_eq!(path, Path::new("/opt/dist/linux-x64/codex-litellm"));
            }
            other => panic!("expected BinaryNotFound, got {:?}", other),
        }
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn test_locate_rejects_directory() {
        let root = tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("linux-x64/codex-litellm")).unwrap();

        let launcher = Launcher::new(RealRuntime, settings(root.path()));
        assert!(matches!(
            launcher.locate(),
            Err(BootstrapError::BinaryNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_missing_binary_does_not_spawn() {
        let root = tempdir().unwrap();
        let launcher = Launcher::new(RealRuntime, settings(root.path()));

        let err = launcher.run(args(&["--help"])).await.unwrap_err();
        assert!(matches!(
            find_bootstrap_error(&err),
            Some(BootstrapError::BinaryNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_relays_exit_codes() {
        let root = shell_install();
        let launcher = Launcher::new(RealRuntime, settings(root.path()));

        for code in [0, 1, 42] {
            let script = format!("exit {}", code);
            let exit = launcher.run(args(&["-c", script.as_str()])).await.unwrap();
            assert_eq!(exit, ChildExit::Code(code));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_passes_arguments_verbatim() {
        let root = shell_install();
        let launcher = Launcher::new(RealRuntime, settings(root.path()));

        let script = r#"[ "$#" -eq 3 ] && [ "$1" = "a b" ] && [ "$2" = "" ] && [ "$3" = "--flag=*" ] && exit 7"#;
        let exit = launcher
            .run(args(&["-c", script, "sh", "a b", "", "--flag=*"]))
            .await
            .unwrap();
        assert_eq!(exit, ChildExit::Code(7));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_terminating_signal() {
        let root = shell_install();
        let launcher = Launcher::new(RealRuntime, settings(root.path()));

        let exit = launcher.run(args(&["-c", "kill -TERM $$"])).await.unwrap();
        assert_eq!(exit, ChildExit::Signal(15));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_non_executable_is_spawn_error() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempdir().unwrap();
        let dir = root.path().join("linux-x64");
        std::fs::create_dir_all(&dir).unwrap();
        let binary = dir.join("codex-litellm");
        std::fs::write(&binary, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o644)).unwrap();

        let launcher = Launcher::new(RealRuntime, settings(root.path()));
        let err = launcher.run(Vec::new()).await.unwrap_err();

        let typed = find_bootstrap_error(&err).unwrap();
        assert!(matches!(typed, BootstrapError::Spawn { .. }));
        assert_eq!(typed.exit_code(), 126);
    }

    #[cfg(unix)]
    #[test]
    fn test_child_exit_from_status() {
        use std::os::unix::process::ExitStatusExt;

        assert_eq!(
            ChildExit::from(ExitStatus::from_raw(42 << 8)),
            ChildExit::Code(42)
        );
        assert_eq!(ChildExit::from(ExitStatus::from_raw(9)), ChildExit::Signal(9));
    }
}
