/*!
 * Supervised Process
 *
 * Spawning, handshake consumption, shutdown and reaping of one component
 * process. Each child gets a monitor task that owns the OS handle, waits for
 * its termination, records the exit status and wakes waiters; everything
 * else (reading the handshake, signalling, retracting names) happens in
 * explicit calls on `Process`.
 */

use super::command::{render_output, CommandLine};
use super::core::types::{ExitStatus, HandshakeError, ProcessError, ProcessResult, ProcessState};
use super::descriptor::ProcessDescriptor;
use super::handshake::{HandshakeChannel, HandshakeReadError, ReadProgress};
use super::options::SpawnOptions;
use super::supervisor::SupervisorContext;
use crate::core::limits::HANDSHAKE_EXIT_GRACE;
use crate::core::types::Pid;
use crate::naming::{Handle, HandleMap, LocalRegistry};
use crate::task::{RemoteError, TaskRef};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid as NixPid;
use parking_lot::Mutex;
use std::fs::File;
use std::future::Future;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// How to stop a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillOptions {
    /// Join the process after signalling it
    pub wait: bool,
    /// Explicit signal; overrides `hard`
    pub signal: Option<Signal>,
    /// Use SIGKILL instead of SIGINT
    pub hard: bool,
    /// Ask every task to shut down before signalling; defaults to true
    /// unless an explicit signal is given
    pub cleanup: Option<bool>,
}

impl Default for KillOptions {
    fn default() -> Self {
        Self {
            wait: true,
            signal: None,
            hard: false,
            cleanup: None,
        }
    }
}

impl KillOptions {
    /// SIGKILL, waited
    pub fn hard() -> Self {
        Self {
            hard: true,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    pub fn effective_signal(&self) -> Signal {
        match (self.signal, self.hard) {
            (Some(signal), _) => signal,
            (None, true) => Signal::SIGKILL,
            (None, false) => Signal::SIGINT,
        }
    }

    pub fn should_cleanup(&self) -> bool {
        self.cleanup.unwrap_or(self.signal.is_none())
    }
}

/// Termination as seen by waiters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Running,
    Reaped(Option<ExitStatus>),
}

impl Exit {
    fn is_reaped(&self) -> bool {
        matches!(self, Exit::Reaped(_))
    }
}

/// How long one `wait_running` call may block
#[derive(Debug, Clone, Copy)]
enum Budget {
    Poll,
    Until { deadline: Instant, limit: Duration },
    Forever,
}

impl Budget {
    fn new(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(limit) if limit.is_zero() => Budget::Poll,
            Some(limit) => Instant::now()
                .checked_add(limit)
                .map_or(Budget::Forever, |deadline| Budget::Until { deadline, limit }),
            None => Budget::Forever,
        }
    }
}

/// Result of waiting on the handshake channel
enum Progress {
    Pending,
    Closed,
    Exited,
}

#[derive(Debug)]
struct Lifecycle {
    state: ProcessState,
    pid: Option<Pid>,
    handles: Option<HandleMap>,
    handshake_error: Option<HandshakeError>,
    exit_status: Option<ExitStatus>,
    sent_signal: Option<Signal>,
    handshake_timeout: Option<Duration>,
    names_retracted: bool,
}

impl Lifecycle {
    fn transition(&mut self, name: &str, to: ProcessState) -> ProcessResult<()> {
        if self.state == to {
            return Ok(());
        }
        if !self.state.can_transition_to(to) {
            return Err(ProcessError::InvalidStateTransition {
                from: self.state,
                to,
            });
        }
        debug!(process = %name, from = ?self.state, to = ?to, "state transition");
        self.state = to;
        Ok(())
    }
}

pub(crate) struct ProcessInner {
    descriptor: ProcessDescriptor,
    context: Arc<SupervisorContext>,
    lifecycle: Mutex<Lifecycle>,
    channel: tokio::sync::Mutex<Option<HandshakeChannel>>,
    exit: watch::Receiver<Exit>,
    output: Option<PathBuf>,
}

impl ProcessInner {
    /// Called by the monitor once the child is reaped
    fn record_exit(&self, status: Option<ExitStatus>) {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.pid = None;
        lifecycle.exit_status = status;
        if let Err(e) = lifecycle.transition(self.descriptor.name(), ProcessState::Terminated) {
            warn!(process = %self.descriptor.name(), error = %e, "unexpected exit notification");
        }
    }
}

/// A supervised component process
///
/// Cheap to clone; clones share the same process.
#[derive(Clone)]
pub struct Process {
    inner: Arc<ProcessInner>,
}

impl Process {
    /// Start `descriptor` and return once the child exists
    pub(crate) async fn spawn(
        context: &Arc<SupervisorContext>,
        descriptor: ProcessDescriptor,
        options: SpawnOptions,
    ) -> ProcessResult<Process> {
        let span = context.span("spawn", descriptor.name());
        let name = descriptor.name().to_string();

        let mut mappings = descriptor.name_mappings().clone();
        mappings.extend(options.name_mappings.clone());
        let descriptor = descriptor.with_name_mappings(mappings.clone());
        let mut options = options.with_defaults(context.config());
        options.name_mappings = mappings;

        let (channel, write_end) =
            HandshakeChannel::open().map_err(|e| ProcessError::io(&name, e))?;
        let child_fd = write_end.as_raw_fd();
        let cmdline = CommandLine::build(&descriptor.model().binary, &options, child_fd)?;

        let mut command = Command::new(&cmdline.program);
        command
            .args(&cmdline.args)
            .envs(cmdline.env.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::null())
            .process_group(0)
            .kill_on_drop(false);
        if let Some(dir) = &options.working_directory {
            command.current_dir(dir);
        }

        let output = match &options.output {
            Some(template) => Some(OutputFile::create(template, &name)?),
            None => None,
        };
        if let Some(output) = &output {
            command.stdout(output.stdio(&name)?);
            command.stderr(output.stdio(&name)?);
        }

        // SAFETY: runs in the forked child before exec; fcntl is
        // async-signal-safe and only touches the inherited write end.
        unsafe {
            command.pre_exec(move || {
                fcntl(child_fd, FcntlArg::F_SETFD(FdFlag::empty()))?;
                Ok(())
            });
        }

        let child = command.spawn().map_err(|e| {
            span.record_error(&e);
            ProcessError::spawn_failed(&name, e)
        })?;
        drop(write_end);

        let Some(pid) = child.id() else {
            return Err(ProcessError::spawn_failed(&name, "child vanished during spawn"));
        };
        let output = output.and_then(|output| output.persist(&name, pid));

        let (exit_tx, exit_rx) = watch::channel(Exit::Running);
        let inner = Arc::new(ProcessInner {
            descriptor,
            context: Arc::clone(context),
            lifecycle: Mutex::new(Lifecycle {
                state: ProcessState::Starting,
                pid: Some(pid),
                handles: None,
                handshake_error: None,
                exit_status: None,
                sent_signal: None,
                handshake_timeout: None,
                names_retracted: false,
            }),
            channel: tokio::sync::Mutex::new(Some(channel)),
            exit: exit_rx,
            output,
        });

        context.track(pid, &inner);
        tokio::spawn(monitor(
            child,
            pid,
            Arc::downgrade(&inner),
            Arc::clone(context),
            exit_tx,
        ));

        info!(process = %name, pid, trace_id = %span.trace_id(), "spawned process");
        span.record_result(true);
        Ok(Process { inner })
    }

    pub(crate) fn from_inner(inner: Arc<ProcessInner>) -> Self {
        Self { inner }
    }

    pub fn name(&self) -> &str {
        self.inner.descriptor.name()
    }

    pub fn descriptor(&self) -> &ProcessDescriptor {
        &self.inner.descriptor
    }

    /// OS pid while the process is known to be running
    pub fn pid(&self) -> Option<Pid> {
        self.inner.lifecycle.lock().pid
    }

    pub fn state(&self) -> ProcessState {
        self.inner.lifecycle.lock().state
    }

    pub fn is_alive(&self) -> bool {
        self.pid().is_some()
    }

    /// Handles reported by the handshake, once it completed
    pub fn handles(&self) -> Option<HandleMap> {
        self.inner.lifecycle.lock().handles.clone()
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.inner.lifecycle.lock().exit_status
    }

    /// Where stdout and stderr were redirected to
    pub fn output_path(&self) -> Option<&Path> {
        self.inner.output.as_deref()
    }

    /// Wait until the process reported its tasks
    ///
    /// `None` waits forever and `Some(Duration::ZERO)` polls once, returning
    /// `Ok(None)` when the handshake is not complete yet, or when another
    /// caller is reading the channel. A timeout closes the channel; later
    /// calls report the same timeout until the process is reaped.
    pub async fn wait_running(&self, timeout: Option<Duration>) -> ProcessResult<Option<HandleMap>> {
        // only a wait that used up its whole budget counts as slow
        let budget = timeout.unwrap_or(Duration::MAX);
        let span = self
            .inner
            .context
            .span("wait_running", self.name())
            .with_threshold(budget);
        let result = self.wait_running_inner(timeout).await;
        match &result {
            Ok(Some(_)) => span.record_result(true),
            Ok(None) => {}
            Err(e) => span.record_error(e),
        }
        result
    }

    async fn wait_running_inner(
        &self,
        timeout: Option<Duration>,
    ) -> ProcessResult<Option<HandleMap>> {
        if let Some(handles) = self.settled()? {
            return Ok(Some(handles));
        }

        let budget = Budget::new(timeout);
        let mut guard = match budget {
            Budget::Poll => match self.inner.channel.try_lock() {
                Ok(guard) => guard,
                Err(_) => return Ok(None),
            },
            // one deadline covers waiting for a concurrent reader and reading
            Budget::Until { deadline, limit } => {
                match tokio::time::timeout_at(deadline, self.inner.channel.lock()).await {
                    Ok(guard) => guard,
                    Err(_) => return Err(self.timed_out(limit)),
                }
            }
            Budget::Forever => self.inner.channel.lock().await,
        };
        if let Some(handles) = self.settled()? {
            return Ok(Some(handles));
        }
        let Some(channel) = guard.as_mut() else {
            return Err(self.abandoned());
        };

        let progress = match budget {
            Budget::Poll => self.poll_channel(channel),
            Budget::Until { deadline, limit } => {
                match tokio::time::timeout_at(deadline, self.read_channel(channel)).await {
                    Ok(progress) => progress,
                    Err(_) => {
                        // the read end goes away with the wait
                        guard.take();
                        self.inner.lifecycle.lock().handshake_timeout = Some(limit);
                        return Err(self.timed_out(limit));
                    }
                }
            }
            Budget::Forever => self.read_channel(channel).await,
        };

        match progress {
            Ok(Progress::Pending) => Ok(None),
            Ok(Progress::Closed) => {
                let Some(channel) = guard.take() else {
                    return Err(self.crashed());
                };
                self.complete_handshake(channel).await.map(Some)
            }
            Ok(Progress::Exited) => {
                guard.take();
                Err(self.crashed())
            }
            Err(HandshakeReadError::Protocol(err)) => {
                guard.take();
                Err(self.reject(err))
            }
            Err(HandshakeReadError::Io(e)) => {
                guard.take();
                Err(ProcessError::io(self.name(), e))
            }
        }
    }

    fn timed_out(&self, limit: Duration) -> ProcessError {
        warn!(process = %self.name(), timeout = ?limit, "handshake timed out");
        ProcessError::HandshakeTimeout {
            name: self.name().to_string(),
            timeout: limit,
        }
    }

    /// Error for a wait on a channel that is already gone
    ///
    /// A channel dropped by an expired wait keeps reporting that timeout
    /// until the process dies.
    fn abandoned(&self) -> ProcessError {
        let expired = self.inner.lifecycle.lock().handshake_timeout;
        match expired {
            Some(limit) if !self.inner.exit.borrow().is_reaped() => ProcessError::HandshakeTimeout {
                name: self.name().to_string(),
                timeout: limit,
            },
            _ => self.crashed(),
        }
    }

    /// Outcome already decided by an earlier call
    fn settled(&self) -> ProcessResult<Option<HandleMap>> {
        let lifecycle = self.inner.lifecycle.lock();
        if let Some(handles) = &lifecycle.handles {
            return Ok(Some(handles.clone()));
        }
        if let Some(err) = &lifecycle.handshake_error {
            return Err(ProcessError::InvalidHandshakeMessage {
                name: self.name().to_string(),
                source: err.clone(),
            });
        }
        if lifecycle.state == ProcessState::NotStarted {
            return Err(ProcessError::NotStarted(self.name().to_string()));
        }
        Ok(None)
    }

    fn poll_channel(&self, channel: &mut HandshakeChannel) -> Result<Progress, HandshakeReadError> {
        Ok(match channel.poll()? {
            ReadProgress::Closed => Progress::Closed,
            ReadProgress::Pending if self.inner.exit.borrow().is_reaped() => Progress::Exited,
            ReadProgress::Pending => Progress::Pending,
        })
    }

    async fn read_channel(
        &self,
        channel: &mut HandshakeChannel,
    ) -> Result<Progress, HandshakeReadError> {
        let mut exit = self.inner.exit.clone();
        let reaped = async move {
            let _ = exit.wait_for(Exit::is_reaped).await;
        };

        tokio::select! {
            biased;
            read = channel.read_to_close() => read.map(|_| Progress::Closed),
            _ = reaped => {
                // the child may have closed its end right before dying
                match channel.poll()? {
                    ReadProgress::Closed => Ok(Progress::Closed),
                    ReadProgress::Pending => Ok(Progress::Exited),
                }
            }
        }
    }

    async fn complete_handshake(&self, channel: HandshakeChannel) -> ProcessResult<HandleMap> {
        let expected = self.inner.descriptor.deployed_task_names();
        match channel.parse(&expected) {
            Ok(addresses) => {
                let handles: HandleMap = addresses
                    .into_iter()
                    .map(|(task, address)| {
                        let handle = Handle::new(address, task.as_str());
                        (task, handle)
                    })
                    .collect();

                let mut lifecycle = self.inner.lifecycle.lock();
                if lifecycle.state == ProcessState::Starting {
                    lifecycle.transition(self.name(), ProcessState::Running)?;
                }
                lifecycle.handles = Some(handles.clone());
                info!(process = %self.name(), tasks = handles.len(), "process running");
                Ok(handles)
            }
            Err(err @ HandshakeError::Malformed(_)) => {
                // an unusable message at EOF is a crash if the process dies
                drop(channel);
                if self.wait_reaped(HANDSHAKE_EXIT_GRACE).await {
                    return Err(self.crashed());
                }
                Err(self.reject(err))
            }
            Err(err) => Err(self.reject(err)),
        }
    }

    fn reject(&self, err: HandshakeError) -> ProcessError {
        error!(process = %self.name(), error = %err, "invalid handshake");
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state.is_alive() {
            if let Err(e) = lifecycle.transition(self.name(), ProcessState::RuntimeError) {
                warn!(process = %self.name(), error = %e, "cannot flag runtime error");
            }
        }
        lifecycle.handshake_error = Some(err.clone());
        ProcessError::InvalidHandshakeMessage {
            name: self.name().to_string(),
            source: err,
        }
    }

    fn crashed(&self) -> ProcessError {
        let status = self.exit_status();
        warn!(process = %self.name(), status = ?status, "process died before it was running");
        ProcessError::ProcessCrashed {
            name: self.name().to_string(),
            status,
        }
    }

    async fn wait_reaped(&self, limit: Duration) -> bool {
        let mut exit = self.inner.exit.clone();
        tokio::time::timeout(limit, async move {
            let _ = exit.wait_for(Exit::is_reaped).await;
        })
        .await
        .is_ok()
    }

    /// Stop the process
    ///
    /// Optionally asks every task to shut down first, then signals the whole
    /// process group. Killing a dead process is a no-op, and repeating a
    /// signal only has an effect when it escalates to SIGKILL.
    pub async fn kill(&self, options: KillOptions) -> ProcessResult<Option<ExitStatus>> {
        let span = self
            .inner
            .context
            .span("kill", self.name())
            .with_threshold(self.inner.context.config().kill_grace);
        let signal = options.effective_signal();

        let Some(pid) = self.pid() else {
            debug!(process = %self.name(), "kill on a dead process");
            return Ok(self.exit_status());
        };

        let previous = self.inner.lifecycle.lock().sent_signal;
        let escalates = match previous {
            None => true,
            Some(sent) => signal == Signal::SIGKILL && sent != Signal::SIGKILL,
        };

        if escalates {
            if previous.is_none() && options.should_cleanup() {
                self.graceful_sweep().await;
            }
            if let Err(e) = self.signal_group(pid, signal) {
                span.record_error(&e);
                return Err(e);
            }
        } else {
            debug!(process = %self.name(), signal = %signal, "signal already sent");
        }

        if !options.wait {
            return Ok(None);
        }

        let status = self.join_after(signal).await?;
        if let Some(status) = status {
            if status.signal() != Some(signal) {
                warn!(
                    process = %self.name(),
                    requested = %signal,
                    status = %status,
                    "process did not terminate with the requested signal"
                );
            }
        }
        span.record_result(true);
        Ok(status)
    }

    async fn join_after(&self, signal: Signal) -> ProcessResult<Option<ExitStatus>> {
        if signal == Signal::SIGKILL {
            return self.join().await;
        }

        let grace = self.inner.context.config().kill_grace;
        match tokio::time::timeout(grace, self.join()).await {
            Ok(status) => status,
            Err(_) => {
                warn!(process = %self.name(), grace = ?grace, "process ignored {}, escalating", signal);
                if let Some(pid) = self.pid() {
                    self.signal_group(pid, Signal::SIGKILL)?;
                }
                self.join().await
            }
        }
    }

    fn signal_group(&self, pid: Pid, signal: Signal) -> ProcessResult<()> {
        let group = NixPid::from_raw(pid as i32);
        match killpg(group, signal) {
            Ok(()) => {
                info!(process = %self.name(), pid, signal = %signal, "signalled process group");
                self.inner.lifecycle.lock().sent_signal = Some(signal);
                Ok(())
            }
            Err(Errno::ESRCH) => {
                debug!(process = %self.name(), pid, "process group already gone");
                Ok(())
            }
            Err(e) => Err(ProcessError::io(self.name(), e)),
        }
    }

    /// Ask every known task to stop and drop its connections
    async fn graceful_sweep(&self) {
        let Some(runtime) = self.inner.context.runtime() else {
            return;
        };
        let Some(handles) = self.handles() else {
            return;
        };
        let grace = self.inner.context.config().kill_grace;

        for (task, handle) in &handles {
            self.best_effort("shutdown", task, grace, runtime.shutdown(handle))
                .await;
            self.best_effort("disconnect", task, grace, runtime.disconnect(handle))
                .await;
        }
    }

    async fn best_effort<F>(&self, step: &str, task: &str, limit: Duration, call: F)
    where
        F: Future<Output = Result<(), RemoteError>>,
    {
        match tokio::time::timeout(limit, call).await {
            Ok(Ok(())) => debug!(process = %self.name(), task, step, "graceful step done"),
            Ok(Err(e)) => {
                warn!(process = %self.name(), task, step, error = %e, "graceful step failed")
            }
            Err(_) => warn!(process = %self.name(), task, step, "graceful step timed out"),
        }
    }

    /// Wait until the process is reaped and release what it held
    ///
    /// Returns the exit status; a no-op on a process that is already dead.
    pub async fn join(&self) -> ProcessResult<Option<ExitStatus>> {
        if self.state() == ProcessState::NotStarted {
            return Ok(None);
        }

        let mut exit = self.inner.exit.clone();
        let _ = exit.wait_for(Exit::is_reaped).await.map(|_| ());

        self.inner.channel.lock().await.take();
        self.retract_names().await;
        Ok(self.exit_status())
    }

    /// Deregister the names of a dead process from the publish directory
    async fn retract_names(&self) {
        let first = {
            let mut lifecycle = self.inner.lifecycle.lock();
            !std::mem::replace(&mut lifecycle.names_retracted, true)
        };
        let Some(directory) = self.inner.context.publish_directory().filter(|_| first) else {
            return;
        };

        for task in self.inner.descriptor.deployed_task_names() {
            match directory.deregister(&task).await {
                Ok(true) => debug!(process = %self.name(), task = %task, "retracted dangling name"),
                Ok(false) => {}
                Err(e) => {
                    warn!(process = %self.name(), task = %task, error = %e, "cannot retract name")
                }
            }
        }
    }

    /// Typed view of one of the tasks of this process
    ///
    /// Accepts the deployed name or the declared one.
    pub fn task(&self, name: &str) -> ProcessResult<TaskRef> {
        let handles = self
            .handles()
            .ok_or_else(|| ProcessError::NotRunning(self.name().to_string()))?;
        let descriptor = &self.inner.descriptor;

        let handle = handles
            .get(name)
            .or_else(|| handles.get(descriptor.map_name(name)))
            .ok_or_else(|| ProcessError::UnknownTask {
                name: self.name().to_string(),
                task: name.to_string(),
            })?;

        let deployed = handle.logical_name();
        let model = descriptor
            .declared_name(deployed)
            .and_then(|declared| descriptor.model().find_task(declared));
        Ok(match model {
            Some(model) => TaskRef::from_model(deployed, handle.clone(), model),
            None => TaskRef::new(deployed, handle.clone()),
        })
    }

    /// Local registry holding the typed tasks of this process
    pub fn registry(&self) -> ProcessResult<LocalRegistry> {
        let handles = self
            .handles()
            .ok_or_else(|| ProcessError::NotRunning(self.name().to_string()))?;

        let mut registry = LocalRegistry::new();
        if let Some(runtime) = self.inner.context.runtime() {
            registry = registry.with_runtime(runtime);
        }
        for name in handles.keys() {
            registry.register_task(Arc::new(self.task(name)?));
        }
        Ok(registry)
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lifecycle = self.inner.lifecycle.lock();
        f.debug_struct("Process")
            .field("name", &self.name())
            .field("state", &lifecycle.state)
            .field("pid", &lifecycle.pid)
            .finish()
    }
}

/// Reap the child and record its termination
async fn monitor(
    mut child: Child,
    pid: Pid,
    process: Weak<ProcessInner>,
    context: Arc<SupervisorContext>,
    exit: watch::Sender<Exit>,
) {
    let status = match child.wait().await {
        Ok(status) => Some(ExitStatus::from(status)),
        Err(e) => {
            warn!(pid, error = %e, "failed to reap child");
            None
        }
    };

    context.untrack(pid, &process);
    if let Some(inner) = process.upgrade() {
        inner.record_exit(status);
    }
    exit.send_replace(Exit::Reaped(status));
}

/// Output file created before the pid is known and renamed afterwards
struct OutputFile {
    file: NamedTempFile,
    template: String,
}

impl OutputFile {
    fn create(template: &str, name: &str) -> ProcessResult<Self> {
        let with_name = template.replace("%m", name);
        let dir = Path::new(&with_name)
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let file = tempfile::Builder::new()
            .prefix("taskhost-")
            .tempfile_in(&dir)
            .map_err(|e| ProcessError::io(name, e))?;
        Ok(Self {
            file,
            template: template.to_string(),
        })
    }

    fn stdio(&self, name: &str) -> ProcessResult<File> {
        self.file
            .as_file()
            .try_clone()
            .map_err(|e| ProcessError::io(name, e))
    }

    fn persist(self, name: &str, pid: Pid) -> Option<PathBuf> {
        let path = render_output(&self.template, name, pid);
        match self.file.persist(&path) {
            Ok(_) => Some(path),
            Err(e) => {
                warn!(process = %name, path = %path.display(), error = %e, "cannot rename output file");
                None
            }
        }
    }
}
