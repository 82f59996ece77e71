use codex_litellm_shim::{
    config::{LOG_ENV, Overrides, Settings},
    error::find_bootstrap_error,
    launcher::{Launcher, exit_like},
    runtime::RealRuntime,
};

/// codex-litellm launcher
///
/// Runs the prebuilt codex-litellm binary installed for this host, passing
/// all arguments and standard streams through unchanged.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_ENV, "warn")).init();

    let settings = match Settings::from_runtime(&RealRuntime, Overrides::default()) {
        Ok(settings) => settings,
        Err(err) => fail(err),
    };

    let launcher = Launcher::new(RealRuntime, settings);
    match launcher.run(std::env::args_os().skip(1).collect()).await {
        Ok(exit) => exit_like(exit),
        Err(err) => fail(err),
    }
}

fn fail(err: anyhow::Error) -> ! {
    eprintln!("codex-litellm: {:#}", err);
    let code = match find_bootstrap_error(&err) {
        Some(e) => {
            eprintln!("{}", e.remediation());
            e.exit_code()
        }
        None => 1,
    };
    std::process::exit(code)
}
