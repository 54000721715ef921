//! # Runner Process Module / 运行器进程模块
//!
//! Spawns the external runner in its own process group, forwards its stdout
//! lines to the scheduling thread through a channel, and reclaims the whole
//! process tree on termination.
//!
//! 在独立的进程组中启动外部运行器，通过通道将其 stdout 行转发给调度线程，
//! 并在终止时回收整个进程树。

use std::io;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::SplitStream;

use crate::core::protocol::LaunchSpec;

/// Lines taken from the runner's stdout by one [`RunnerProcess::drain`] call.
#[derive(Debug, Default)]
pub struct Drained {
    pub lines: Vec<String>,
    /// The reader reached end of file and every line has been delivered.
    /// 读取器已到达文件末尾，且所有行都已交付。
    pub closed: bool,
}

/// A live runner process.
/// 一个正在运行的运行器进程。
#[derive(Debug)]
pub struct RunnerProcess {
    child: Child,
    pid: Option<u32>,
    lines: mpsc::UnboundedReceiver<String>,
    closed: bool,
    exit: Option<ExitStatus>,
}

impl RunnerProcess {
    /// Spawns the runner described by `spec`. Must be called inside a tokio runtime.
    ///
    /// stdout is split on `\n` and decoded lossily so that binary noise from a
    /// probe cannot stop the reader. stderr lines are logged at debug level.
    pub fn spawn(spec: &LaunchSpec, module: &str) -> io::Result<Self> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }
        set_process_group(&mut cmd);

        let mut child = cmd.spawn()?;
        let pid = child.id();

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("failed to capture runner stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("failed to capture runner stderr"))?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut segments = SplitStream::new(BufReader::new(stdout).split(b'\n'));
            while let Some(segment) = segments.next().await {
                let Ok(bytes) = segment else { break };
                if tx.send(String::from_utf8_lossy(&bytes).into_owned()).is_err() {
                    break;
                }
            }
        });

        let module = module.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(module = %module, "runner stderr: {line}");
            }
        });

        Ok(Self {
            child,
            pid,
            lines: rx,
            closed: false,
            exit: None,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Takes every stdout line currently available without waiting.
    pub fn drain(&mut self) -> Drained {
        let mut drained = Drained::default();
        if self.closed {
            drained.closed = true;
            return drained;
        }
        loop {
            match self.lines.try_recv() {
                Ok(line) => drained.lines.push(line),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        drained.closed = self.closed;
        drained
    }

    /// Returns the exit status if the runner has exited, without waiting.
    pub fn try_exit(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.exit.is_none() {
            self.exit = self.child.try_wait()?;
        }
        Ok(self.exit)
    }

    /// Forcibly ends the runner and every process in its process group.
    /// Safe to call repeatedly.
    ///
    /// 强制结束运行器及其进程组中的所有进程。可重复调用。
    pub fn kill_tree(&mut self) {
        if let Some(pid) = self.pid {
            kill_process_group(pid);
        }
        if self.exit.is_none() {
            if let Err(e) = self.child.start_kill() {
                tracing::debug!("runner already gone: {e}");
            }
            self.exit = self.child.try_wait().ok().flatten();
        }
    }
}

#[cfg(unix)]
fn set_process_group(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn set_process_group(_cmd: &mut Command) {}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // The runner was spawned with process_group(0), so its pgid equals its pid.
    // SAFETY: kill has no memory-safety preconditions.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(pgid, "kill(-pgid) failed: {}", io::Error::last_os_error());
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
