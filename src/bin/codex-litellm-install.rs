use clap::Parser;
use codex_litellm_shim::{
    config::{BASE_URL_ENV, LOG_ENV, Overrides, ROOT_ENV, Settings},
    error::{PROJECT_URL, find_bootstrap_error},
    install::{InstallOutcome, install},
    runtime::RealRuntime,
};
use std::path::PathBuf;

/// codex-litellm-install - fetch the prebuilt codex-litellm binary
///
/// Downloads the release archive for this host, verifies its SHA-256
/// checksum and unpacks it into the install root used by `codex-litellm`.
///
/// Set CODEX_LITELLM_SKIP_DOWNLOAD=1 to skip the download entirely.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Install root directory (overrides defaults; also via CODEX_LITELLM_ROOT)
    #[arg(long = "root", short = 'r', env = ROOT_ENV, value_name = "PATH")]
    pub install_root: Option<PathBuf>,

    /// Base URL release archives are downloaded from
    #[arg(long = "base-url", env = BASE_URL_ENV, value_name = "URL")]
    pub base_url: Option<String>,

    /// Release to install instead of the one this build targets (e.g. 0.2.1)
    #[arg(long = "tag", value_name = "TAG")]
    pub tag: Option<String>,
}

impl Cli {
    fn overrides(self) -> Overrides {
        Overrides {
            install_root: self.install_root,
            base_url: self.base_url,
            release_tag: self.tag,
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_ENV, "warn")).init();
    let cli = Cli::parse();

    let result = match Settings::from_runtime(&RealRuntime, cli.overrides()) {
        Ok(settings) => install(&settings).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(InstallOutcome::Unsupported(platform)) => {
            eprintln!(
                "codex-litellm: no prebuilt binary for platform/arch combination {}.",
                platform
            );
            eprintln!("Please build from source instead: {}", PROJECT_URL);
        }
        Ok(InstallOutcome::Skipped | InstallOutcome::Installed { .. }) => {}
        Err(err) => {
            eprintln!("Failed to install codex-litellm prebuilt binary: {:#}", err);
            match find_bootstrap_error(&err) {
                Some(e) => eprintln!("{}", e.remediation()),
                None => eprintln!(
                    "You can build manually with ./build.sh from {}.",
                    PROJECT_URL
                ),
            }
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["codex-litellm-install"]).unwrap();
        assert_eq!(cli.tag, None);
    }

    #[test]
    fn test_cli_root_parsing() {
        let cli = Cli::try_parse_from(["codex-litellm-install", "--root", "/tmp"]).unwrap();
        assert_eq!(cli.install_root, Some(PathBuf::from("/tmp")));

        let cli = Cli::try_parse_from(["codex-litellm-install", "-r", "/opt/dist"]).unwrap();
        assert_eq!(cli.install_root, Some(PathBuf::from("/opt/dist")));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "codex-litellm-install",
            "--root",
            "/tmp/root",
            "--base-url",
            "http://127.0.0.1:8080",
            "--tag",
            "0.2.1",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.install_root, Some(PathBuf::from("/tmp/root")));
        assert_eq!(overrides.base_url.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(overrides.release_tag.as_deref(), Some("0.2.1"));
    }

    #[test]
    fn test_cli_rejects_positional_arguments() {
        let result = Cli::try_parse_from(["codex-litellm-install", "owner/repo"]);
        assert!(result.is_err());
    }
}
