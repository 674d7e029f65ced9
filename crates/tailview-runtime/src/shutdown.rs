//! Graceful termination of a source's child process.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;

/// How long a child gets to exit after SIGTERM before escalation.
const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Terminate a child process: SIGTERM, a grace period, then SIGKILL,
/// then reap (a kill without a wait leaves a zombie).
///
/// On non-unix targets there is no graceful signal; the child is killed
/// immediately.
pub async fn shutdown_child(mut child: Child) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => {
                    if let Ok(result) = tokio::time::timeout(GRACE_PERIOD, child.wait()).await {
                        return result;
                    }
                    // Grace period elapsed; fall through to SIGKILL.
                }
                // ESRCH: already exited, just reap below.
                Err(nix::errno::Errno::ESRCH) => return child.wait().await,
                Err(e) => return Err(io::Error::other(e)),
            }
        }
    }

    child.kill().await?;
    child.wait().await
}
