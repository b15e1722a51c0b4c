// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Task Processes
//!
//! A `TaskHandle` is one independently scheduled unit of the export: the
//! single extractor process, or the chain of pipeline stage processes
//! joined by anonymous pipes. Every task runs in its own process group so
//! that termination also reaches grandchildren (the chunk-splitter's
//! filter shells and their compressors/uploaders).

use crate::domain::command::{PipelineStage, StageCommand};
use crate::domain::entities::TaskState;
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::shell::{display_command, to_command};
use log::{debug, info, warn};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Shared flag raised when the caller asks the export to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Shell convention: a signal-terminated process reports `128 + signo`.
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

fn spawn_stage(cmd: &StageCommand, pgid: i32, stdin: Stdio, last: bool) -> Result<Child> {
    let mut command = to_command(cmd)?;
    command.process_group(pgid).stdin(stdin);
    if !last {
        command.stdout(Stdio::piped());
    }
    command
        .spawn()
        .map_err(|e| ExportError::CommandError(format!("failed to start {}: {}", cmd.program, e)))
}

/// One running task: a process group of one or more children.
#[derive(Debug)]
pub struct TaskHandle {
    label: &'static str,
    children: Vec<Child>,
    exit_codes: Vec<Option<i32>>,
    pgid: Pid,
    state: TaskState,
}

impl TaskHandle {
    /// Spawns a single command as its own process group.
    pub fn spawn_command(label: &'static str, cmd: &StageCommand) -> Result<Self> {
        let mut command = to_command(cmd)?;
        command.process_group(0);
        let child = command.spawn().map_err(|e| {
            ExportError::CommandError(format!("failed to start {}: {}", cmd.program, e))
        })?;
        info!("{} task started, pid: {}", label, child.id());
        debug!("{} command: {}", label, display_command(cmd));
        Ok(Self::from_children(label, vec![child]))
    }

    /// Spawns the stages left to right, stdout of each feeding stdin of the next.
    pub fn spawn_pipeline(label: &'static str, stages: &[PipelineStage]) -> Result<Self> {
        if stages.is_empty() {
            return Err(ExportError::CommandError("empty pipeline".to_string()));
        }

        let mut children: Vec<Child> = Vec::with_capacity(stages.len());
        let mut upstream: Option<std::process::ChildStdout> = None;

        for (i, stage) in stages.iter().enumerate() {
            let pgid = children.first().map(|c| c.id() as i32).unwrap_or(0);
            let stdin = match upstream.take() {
                Some(out) => Stdio::from(out),
                None => Stdio::null(),
            };
            let last = i + 1 == stages.len();

            match spawn_stage(&stage.command, pgid, stdin, last) {
                Ok(mut child) => {
                    debug!(
                        "{} stage {:?} started, pid: {}: {}",
                        label,
                        stage.role,
                        child.id(),
                        display_command(&stage.command)
                    );
                    upstream = child.stdout.take();
                    children.push(child);
                }
                Err(e) => {
                    if !children.is_empty() {
                        let mut partial = Self::from_children(label, children);
                        partial.terminate(Duration::from_millis(500));
                    }
                    return Err(e);
                }
            }
        }

        info!("{} task started, pid: {}", label, children[0].id());
        Ok(Self::from_children(label, children))
    }

    fn from_children(label: &'static str, children: Vec<Child>) -> Self {
        let pgid = Pid::from_raw(children[0].id() as i32);
        let exit_codes = vec![None; children.len()];
        Self {
            label,
            children,
            exit_codes,
            pgid,
            state: TaskState::Running,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn pids(&self) -> Vec<u32> {
        self.children.iter().map(Child::id).collect()
    }

    /// Non-blocking status check.
    ///
    /// The task finishes once every child has exited; its code is the
    /// rightmost non-zero child code (`pipefail`), else zero.
    pub fn poll(&mut self) -> Result<TaskState> {
        if self.state.is_finished() {
            return Ok(self.state);
        }
        for (child, code) in self.children.iter_mut().zip(self.exit_codes.iter_mut()) {
            if code.is_none() {
                if let Some(status) = child.try_wait()? {
                    *code = Some(exit_code(status));
                }
            }
        }
        if self.exit_codes.iter().all(Option::is_some) {
            let code = self
                .exit_codes
                .iter()
                .rev()
                .flatten()
                .copied()
                .find(|c| *c != 0)
                .unwrap_or(0);
            self.state = TaskState::from_exit_code(code);
            debug!("{} task finished: {:?}", self.label, self.state);
        }
        Ok(self.state)
    }

    /// Rightmost non-zero code among the children that have already exited,
    /// even while others are still running.
    pub fn failed_stage_code(&mut self) -> Result<Option<i32>> {
        self.poll()?;
        Ok(self
            .exit_codes
            .iter()
            .rev()
            .flatten()
            .copied()
            .find(|c| *c != 0))
    }

    /// Waits for the task to finish. Returns `None` if `cancel` was raised first.
    pub fn wait(&mut self, interval: Duration, cancel: &CancelToken) -> Result<Option<TaskState>> {
        loop {
            let state = self.poll()?;
            if state.is_finished() {
                return Ok(Some(state));
            }
            if cancel.is_cancelled() {
                return Ok(None);
            }
            thread::sleep(interval);
        }
    }

    /// SIGTERM to the group, up to `grace` to exit, then SIGKILL. Always reaps.
    pub fn terminate(&mut self, grace: Duration) -> TaskState {
        if let Ok(state) = self.poll() {
            if state.is_finished() {
                return state;
            }
        }

        info!("Terminating {} task (pgid {})", self.label, self.pgid);
        self.signal(Signal::SIGTERM);

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            match self.poll() {
                Ok(state) if state.is_finished() => return state,
                Ok(_) => thread::sleep(Duration::from_millis(20)),
                Err(e) => {
                    warn!("Polling {} task failed: {}", self.label, e);
                    break;
                }
            }
        }

        warn!(
            "{} task still running after {:?}, sending SIGKILL",
            self.label, grace
        );
        self.signal(Signal::SIGKILL);
        for (child, code) in self.children.iter_mut().zip(self.exit_codes.iter_mut()) {
            if code.is_none() {
                *code = Some(match child.wait() {
                    Ok(status) => exit_code(status),
                    Err(_) => 128 + Signal::SIGKILL as i32,
                });
            }
        }
        self.poll().unwrap_or(TaskState::Failed(128 + Signal::SIGKILL as i32))
    }

    fn signal(&self, signal: Signal) {
        match killpg(self.pgid, signal) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!("Failed to send {} to {} task: {}", signal, self.label, e),
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if !self.state.is_finished() {
            self.terminate(Duration::from_secs(1));
        }
    }
}
