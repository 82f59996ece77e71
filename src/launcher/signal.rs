use std::process::ExitStatus;

use anyhow::{Context, Result};
use tokio::process::Child;

use super::ChildExit;

/// Termination requests sent to the launcher while the child runs.
///
/// SIGTERM and SIGHUP are forwarded to the child. SIGINT and SIGQUIT are
/// only swallowed: the terminal already delivers them to the whole
/// foreground process group, child included.
#[cfg(unix)]
pub(super) struct SignalRelay {
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalRelay {
    /// Starts capturing signals. Call before spawning so none are missed.
    pub(super) fn install() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            terminate: signal(SignalKind::terminate()).context("Failed to watch SIGTERM")?,
            hangup: signal(SignalKind::hangup()).context("Failed to watch SIGHUP")?,
            interrupt: signal(SignalKind::interrupt()).context("Failed to watch SIGINT")?,
            quit: signal(SignalKind::quit()).context("Failed to watch SIGQUIT")?,
        })
    }

    /// Waits for `child`, relaying signals until it exits.
    pub(super) async fn wait(mut self, mut child: Child) -> Result<ExitStatus> {
        use log::debug;
        use nix::sys::signal::Signal;
        use nix::unistd::Pid;

        let pid = child.id().map(|id| Pid::from_raw(id as i32));
        let forward = |sig: Signal| {
            if let Some(pid) = pid {
                debug!("Forwarding {} to child {}", sig, pid);
                if let Err(e) = nix::sys::signal::kill(pid, sig) {
                    debug!("Could not forward {}: {}", sig, e);
                }
            }
        };

        loop {
            tokio::select! {
                status = child.wait() => {
                    return status.context("Failed to wait for child process");
                }
                _ = self.terminate.recv() => forward(Signal::SIGTERM),
                _ = self.hangup.recv() => forward(Signal::SIGHUP),
                _ = self.interrupt.recv() => debug!("SIGINT received; waiting for child"),
                _ = self.quit.recv() => debug!("SIGQUIT received; waiting for child"),
            }
        }
    }
}

#[cfg(not(unix))]
pub(super) struct SignalRelay;

#[cfg(not(unix))]
impl SignalRelay {
    pub(super) fn install() -> Result<Self> {
        Ok(Self)
    }

    pub(super) async fn wait(self, mut child: Child) -> Result<ExitStatus> {
        child
            .wait()
            .await
            .context("Failed to wait for child process")
    }
}

/// Ends the current process the way the child ended.
///
/// A signal death is reproduced by restoring the default disposition and
/// raising the same signal, so the parent of the launcher observes it too.
/// If the signal does not end the process, exits with `128 + signo`.
pub fn exit_like(exit: ChildExit) -> ! {
    match exit {
        ChildExit::Code(code) => std::process::exit(code),
        ChildExit::Signal(signo) => {
            #[cfg(unix)]
            reraise(signo);
            std::process::exit(128 + signo)
        }
    }
}

#[cfg(unix)]
fn reraise(signo: i32) {
    use nix::sys::signal::{self, SigHandler, SigSet, Signal};

    let Ok(sig) = Signal::try_from(signo) else {
        return;
    };

    // SAFETY: installs the default disposition, no handler code is involved.
    let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };

    let mut mask = SigSet::empty();
    mask.add(sig);
    let _ = mask.thread_unblock();

    let _ = signal::raise(sig);
}
