// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::libc;
use nix::pty::{forkpty, ForkptyResult, Winsize};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{execvp, Pid};
use tokio::io::unix::AsyncFd;

use crate::error::SpawnErrorCause;

use super::{ExitStatus, SpawnError};

/// Check that a spawn can plausibly succeed, classifying the failure when
/// it cannot. Run before `forkpty` so exec errors surface as structured
/// causes instead of an instant child death.
pub fn preflight(program: &str, workdir: &Path) -> Result<PathBuf, SpawnError> {
    if !workdir.is_dir() {
        return Err(SpawnError {
            cause: SpawnErrorCause::InvalidWorkdir,
            message: format!("{} is not a directory", workdir.display()),
        });
    }
    resolve_executable(program)
}

/// Resolve `program` against PATH (or directly when it contains a slash)
/// and verify it is an executable file.
pub fn resolve_executable(program: &str) -> Result<PathBuf, SpawnError> {
    let candidates: Vec<PathBuf> = if program.contains('/') {
        vec![PathBuf::from(program)]
    } else {
        std::env::var_os("PATH")
            .map(|path| std::env::split_paths(&path).map(|dir| dir.join(program)).collect())
            .unwrap_or_default()
    };

    let mut found_non_executable = false;
    for candidate in &candidates {
        let Ok(meta) = std::fs::metadata(candidate) else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        if meta.permissions().mode() & 0o111 != 0 {
            return Ok(candidate.clone());
        }
        found_non_executable = true;
    }

    if found_non_executable {
        Err(SpawnError {
            cause: SpawnErrorCause::PermissionDenied,
            message: format!("{program} exists but is not executable"),
        })
    } else {
        Err(SpawnError {
            cause: SpawnErrorCause::CommandNotFound,
            message: format!("{program} not found on PATH"),
        })
    }
}

/// PTY master fd, wrapped so [`AsyncFd`] can register it with the reactor.
#[derive(Debug)]
struct MasterFd(OwnedFd);

impl AsRawFd for MasterFd {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.0.as_raw_fd()
    }
}

/// A child process attached to a fresh PTY.
///
/// The session's reader task owns all [`read_into`](Self::read_into)
/// calls and its write pump owns all [`write_all`](Self::write_all)
/// calls; resize and signal delivery touch only the fd number and the
/// pid, so the handle is safe to share behind the session.
pub struct PtyChild {
    master: AsyncFd<MasterFd>,
    child_pid: Pid,
}

impl PtyChild {
    /// Fork a child on a new PTY and exec `command` inside `workdir` with
    /// the given environment delta applied.
    // forkpty requires unsafe: post-fork child is partially initialized
    #[allow(unsafe_code)]
    pub fn spawn(
        command: &[String],
        workdir: &Path,
        env: &[(String, String)],
        cols: u16,
        rows: u16,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!command.is_empty(), "empty command");

        let winsize = Winsize { ws_col: cols, ws_row: rows, ws_xpixel: 0, ws_ypixel: 0 };

        // SAFETY: forkpty is unsafe because the child is in a
        // partially-initialized state after fork. We only set env,
        // chdir, and exec.
        let result = unsafe { forkpty(&winsize, None) }.context("forkpty failed")?;

        match result {
            ForkptyResult::Child => {
                std::env::set_var("TERM", "xterm-256color");
                std::env::set_var("PARALLAX", "1");
                for (key, value) in env {
                    std::env::set_var(key, value);
                }
                if std::env::set_current_dir(workdir).is_err() {
                    std::process::exit(126);
                }

                let c_args: Vec<CString> = command
                    .iter()
                    .filter_map(|s| CString::new(s.as_bytes()).ok())
                    .collect();
                if c_args.len() == command.len() {
                    let _ = execvp(&c_args[0], &c_args);
                }
                // exec failed; the conventional not-found code.
                std::process::exit(127);
            }
            ForkptyResult::Parent { child, master } => {
                set_nonblocking(&master)?;
                let master = AsyncFd::new(MasterFd(master)).context("AsyncFd::new failed")?;
                Ok(Self { master, child_pid: child })
            }
        }
    }

    pub fn pid(&self) -> u32 {
        self.child_pid.as_raw() as u32
    }

    /// Read the next available chunk of child output into `buf`.
    ///
    /// Suspends until the master is readable. `Ok(0)` means the child
    /// closed its side; `EIO` is surfaced as an error and means the same
    /// on most platforms.
    pub async fn read_into(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.master.readable().await?;
            match guard.try_io(|inner| {
                let n = nix::unistd::read(inner, buf).map_err(io_err)?;
                Ok(n)
            }) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }

    /// Write all of `data` to the child's input, suspending as the PTY
    /// buffer drains.
    pub async fn write_all(&self, data: &[u8]) -> io::Result<()> {
        let mut offset = 0;
        while offset < data.len() {
            let mut guard = self.master.writable().await?;
            match guard.try_io(|inner| {
                let n = nix::unistd::write(&inner.get_ref().0, &data[offset..]).map_err(io_err)?;
                Ok(n)
            }) {
                Ok(Ok(n)) => offset += n,
                Ok(Err(e)) => return Err(e),
                Err(_would_block) => continue,
            }
        }
        Ok(())
    }

    /// Deliver a signal to the child.
    pub fn signal(&self, sig: Signal) -> anyhow::Result<()> {
        kill(self.child_pid, sig).context("kill failed")?;
        Ok(())
    }

    /// Update the PTY window size.
    // TIOCSWINSZ ioctl requires unsafe for the libc::ioctl call
    #[allow(unsafe_code)]
    pub fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()> {
        let ws = Winsize { ws_col: cols, ws_row: rows, ws_xpixel: 0, ws_ypixel: 0 };

        // SAFETY: TIOCSWINSZ is a well-defined ioctl that sets the window
        // size on the PTY master fd. The Winsize struct is properly
        // initialized.
        let ret = unsafe { libc::ioctl(self.master.as_raw_fd(), libc::TIOCSWINSZ, &ws) };
        if ret < 0 {
            bail!("TIOCSWINSZ ioctl failed: {}", std::io::Error::last_os_error());
        }

        Ok(())
    }

    /// Non-blocking reap attempt.
    pub fn try_wait(&self) -> anyhow::Result<Option<ExitStatus>> {
        match waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => Ok(None),
            Ok(WaitStatus::Exited(_, code)) => Ok(Some(ExitStatus { code: Some(code), signal: None })),
            Ok(WaitStatus::Signaled(_, sig, _)) => {
                Ok(Some(ExitStatus { code: None, signal: Some(sig as i32) }))
            }
            Ok(_) => Ok(None),
            Err(nix::errno::Errno::ECHILD) => Ok(Some(ExitStatus { code: None, signal: None })),
            Err(e) => bail!("waitpid failed: {e}"),
        }
    }

    /// Reap the child on a blocking thread.
    pub async fn wait(&self) -> anyhow::Result<ExitStatus> {
        let pid = self.child_pid;
        tokio::task::spawn_blocking(move || wait_for_exit(pid)).await.context("join wait thread")?
    }
}

impl Drop for PtyChild {
    fn drop(&mut self) {
        // Best-effort cleanup if the session never stopped the child.
        let _ = kill(self.child_pid, Signal::SIGHUP);
        let _ = waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG));
    }
}

/// Put the master fd into non-blocking mode for the reactor.
fn set_nonblocking(fd: &impl std::os::fd::AsFd) -> io::Result<()> {
    let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(io_err)?;
    let flags = OFlag::from_bits_truncate(flags);
    fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK)).map_err(io_err)?;
    Ok(())
}

fn io_err(e: nix::errno::Errno) -> io::Error {
    io::Error::from_raw_os_error(e as i32)
}

/// Block until the child exits and convert to our `ExitStatus`.
pub fn wait_for_exit(pid: Pid) -> anyhow::Result<ExitStatus> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                return Ok(ExitStatus { code: Some(code), signal: None });
            }
            Ok(WaitStatus::Signaled(_, sig, _)) => {
                return Ok(ExitStatus { code: None, signal: Some(sig as i32) });
            }
            Ok(_) => continue,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(nix::errno::Errno::ECHILD) => {
                return Ok(ExitStatus { code: None, signal: None });
            }
            Err(e) => bail!("waitpid failed: {e}"),
        }
    }
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
