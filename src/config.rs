//! Explicit configuration for the installer and the launcher.
//!
//! All process-wide lookups (host platform, environment variables, home
//! directories) happen once here. Components receive a [`Settings`] value and
//! never consult the environment themselves.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use log::debug;

use crate::platform::{Platform, TOOL_NAME};
use crate::runtime::Runtime;

/// Set to `1` to skip the download entirely (binary provisioned elsewhere).
pub const SKIP_DOWNLOAD_ENV: &str = "CODEX_LITELLM_SKIP_DOWNLOAD";

/// Overrides the install root.
pub const ROOT_ENV: &str = "CODEX_LITELLM_ROOT";

/// Overrides the base URL release artifacts are downloaded from.
pub const BASE_URL_ENV: &str = "CODEX_LITELLM_BASE_URL";

/// Log filter for both binaries (`RUST_LOG` is left to the child tool).
pub const LOG_ENV: &str = "CODEX_LITELLM_LOG";

pub const DEFAULT_BASE_URL: &str = "https://github.com/avikalpa/codex-litellm/releases/download";

/// Release version whose artifacts the installer fetches, fixed at build time.
pub const RELEASE_VERSION: &str = env!("CODEX_LITELLM_RELEASE_VERSION");

/// Values given explicitly on the command line; they win over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub install_root: Option<PathBuf>,
    pub base_url: Option<String>,
    pub release_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub platform: Platform,
    /// Directory holding one subdirectory per installed target.
    pub install_root: PathBuf,
    pub skip_download: bool,
    pub base_url: String,
    pub release_tag: String,
}

impl Settings {
    #[tracing::instrument(skip(runtime))]
    pub fn from_runtime<R: Runtime>(runtime: &R, overrides: Overrides) -> Result<Self> {
        let skip_download = runtime
            .env_var(SKIP_DOWNLOAD_ENV)
            .map(|v| v == "1")
            .unwrap_or(false);

        let install_root = match overrides.install_root {
            Some(path) => path,
            None => match non_empty_env(runtime, ROOT_ENV) {
                Some(path) => PathBuf::from(path),
                None => match default_install_root(runtime) {
                    Ok(path) => path,
                    // Nothing is written when skipping, so no root is needed.
                    Err(e) if skip_download => {
                        debug!("{}", e);
                        PathBuf::new()
                    }
                    Err(e) => return Err(e),
                },
            },
        };

        let base_url = overrides
            .base_url
            .or_else(|| non_empty_env(runtime, BASE_URL_ENV))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let release_tag = release_tag(overrides.release_tag.as_deref().unwrap_or(RELEASE_VERSION));

        let settings = Self {
            platform: Platform::detect(),
            install_root,
            skip_download,
            base_url,
            release_tag,
        };
        debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }
}

/// Normalizes a version to its release tag (`1.2.3` and `v1.2.3` both give `v1.2.3`).
pub fn release_tag(version: &str) -> String {
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{}", version)
    }
}

/// `<data-local>/codex-litellm/dist`, or `~/.codex-litellm/dist` when the
/// platform has no data directory.
pub fn default_install_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    if let Some(data) = runtime.data_local_dir() {
        return Ok(data.join(TOOL_NAME).join("dist"));
    }
    runtime
        .home_dir()
        .map(|home| home.join(format!(".{}", TOOL_NAME)).join("dist"))
        .ok_or_else(|| {
            anyhow!(
                "Could not determine an install root. Set {} to a writable directory.",
                ROOT_ENV
            )
        })
}

fn non_empty_env<R: Runtime>(runtime: &R, key: &str) -> Option<String> {
    runtime.env_var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::test_utils::test_home;
    use std::env::VarError;

    fn runtime_with_env(vars: &'static [(&'static str, &'static str)]) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime.expect_env_var().returning(move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
                .ok_or(VarError::NotPresent)
        });
        runtime
            .expect_data_local_dir()
            .returning(|| Some(test_home().join(".local/share")));
        runtime.expect_home_dir().returning(|| Some(test_home()));
        runtime
    }

    #[test]
    fn test_defaults() {
        let runtime = runtime_with_env(&[]);
        let settings = Settings::from_runtime(&runtime, Overrides::default()).unwrap();

        assert_eq!(
            settings.install_root,
            test_home().join(".local/share/codex-litellm/dist")
        );
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.release_tag, format!("v{}", RELEASE_VERSION));
        assert!(!settings.skip_download);
        assert_eq!(settings.platform, Platform::detect());
    }

    #[test]
    fn test_env_overrides() {
        let runtime = runtime_with_env(&[
            (ROOT_ENV, "/srv/codex"),
            (BASE_URL_ENV, "https://mirror.example.com/releases"),
            (SKIP_DOWNLOAD_ENV, "1"),
        ]);
        let settings = Settings::from_runtime(&runtime, Overrides::default()).unwrap();

        assert_eq!(settings.install_root, PathBuf::from("/srv/codex"));
        assert_eq!(settings.base_url, "https://mirror.example.com/releases");
        assert!(settings.skip_download);
    }

    #[test]
    fn test_explicit_overrides_win_over_env() {
        let runtime = runtime_with_env(&[
            (ROOT_ENV, "/srv/codex"),
            (BASE_URL_ENV, "https://mirror.example.com/releases"),
        ]);
        let overrides = Overrides {
            install_root: Some(PathBuf::from("/tmp/root")),
            base_url: Some("http://127.0.0.1:9000".into()),
            release_tag: Some("2.0.0".into()),
        };
        let settings = Settings::from_runtime(&runtime, overrides).unwrap();

        assert_eq!(settings.install_root, PathBuf::from("/tmp/root"));
        assert_eq!(settings.base_url, "http://127.0.0.1:9000");
        assert_eq!(settings.release_tag, "v2.0.0");
    }

    #[test]
    fn test_skip_download_requires_exactly_one() {
        for value in ["0", "true", "yes", " 1", ""] {
            let mut runtime = MockRuntime::new();
            runtime.expect_env_var().returning(move |key| {
                if key == SKIP_DOWNLOAD_ENV {
                    Ok(value.to_string())
                } else {
                    Err(VarError::NotPresent)
                }
            });
            runtime
                .expect_data_local_dir()
                .returning(|| Some(test_home()));

            let settings = Settings::from_runtime(&runtime, Overrides::default()).unwrap();
            assert!(!settings.skip_download, "{:?} must not skip", value);
        }
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let runtime = runtime_with_env(&[(ROOT_ENV, ""), (BASE_URL_ENV, "")]);
        let settings = Settings::from_runtime(&runtime, Overrides::default()).unwrap();

        assert_eq!(
            settings.install_root,
            test_home().join(".local/share/codex-litellm/dist")
        );
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_default_install_root_falls_back_to_home() {
        let mut runtime = MockRuntime::new();
        runtime.expect_data_local_dir().returning(|| None);
        runtime.expect_home_dir().returning(|| Some(test_home()));

        let root = default_install_root(&runtime).unwrap();
        assert_eq!(root, test_home().join(".codex-litellm").join("dist"));
    }

    #[test]
    fn test_default_install_root_without_any_dir() {
        let mut runtime = MockRuntime::new();
        runtime.expect_data_local_dir().returning(|| None);
        runtime.expect_home_dir().returning(|| None);

        let err = default_install_root(&runtime).unwrap_err();
        assert!(err.to_string().contains(ROOT_ENV));
    }

    #[test]
    fn test_skip_download_without_any_dir() {
        let mut runtime = MockRuntime::new();
        runtime.expect_env_var().returning(|key| {
            if key == SKIP_DOWNLOAD_ENV {
                Ok("1".to_string())
            } else {
                Err(VarError::NotPresent)
            }
        });
        runtime.expect_data_local_dir().returning(|| None);
        runtime.expect_home_dir().returning(|| None);

        let settings = Settings::from_runtime(&runtime, Overrides::default()).unwrap();
        assert!(settings.skip_download);
    }

    #[test]
    fn test_missing_root_is_an_error_without_skip() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_env_var()
            .returning(|_| Err(VarError::NotPresent));
        runtime.expect_data_local_dir().returning(|| None);
        runtime.expect_home_dir().returning(|| None);

        let err = Settings::from_runtime(&runtime, Overrides::default()).unwrap_err();
        assert!(err.to_string().contains(ROOT_ENV));
    }

    #[test]
    fn test_release_tag() {
        assert_eq!(release_tag("1.2.3"), "v1.2.3");
        assert_eq!(release_tag("v1.2.3"), "v1.2.3");
    }
}
