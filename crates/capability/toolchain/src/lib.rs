//! 外部固件工具链调用。
//!
//! 工具链是黑盒子进程：`<program> compile <file>`、
//! `<program> upload <file> [--device <addr>]`。每次调用都返回 `BuildResult`，
//! 非零退出与超时都是结果数据，不是错误。
//!
//! 子进程以新进程组组长启动；超时或调用方的 future 被取消时，
//! 整个进程组被 SIGKILL（`GroupGuard`），不留下孤儿编译进程。

use async_trait::async_trait;
use domain::BuildResult;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// 超时后等待输出管道关闭的上限。
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// 工具链动作。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainAction {
    Compile,
    /// `device` 为空时由工具链走本地/串口路径。
    Upload { device: Option<String> },
}

impl ToolchainAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainAction::Compile => "compile",
            ToolchainAction::Upload { .. } => "upload",
        }
    }
}

/// 一次工具链调用。
#[derive(Debug, Clone)]
pub struct ToolchainInvocation {
    pub action: ToolchainAction,
    pub config_file: PathBuf,
    pub timeout: Duration,
}

impl ToolchainInvocation {
    pub fn compile(config_file: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            action: ToolchainAction::Compile,
            config_file: config_file.into(),
            timeout,
        }
    }

    pub fn upload(config_file: impl Into<PathBuf>, device: Option<String>, timeout: Duration) -> Self {
        Self {
            action: ToolchainAction::Upload { device },
            config_file: config_file.into(),
            timeout,
        }
    }

    /// 工具链命令行参数（不含程序名）。
    pub fn args(&self) -> Vec<OsString> {
        let mut args = vec![
            OsString::from(self.action.as_str()),
            self.config_file.clone().into_os_string(),
        ];
        if let ToolchainAction::Upload {
            device: Some(device),
        } = &self.action
        {
            args.push(OsString::from("--device"));
            args.push(OsString::from(device));
        }
        args
    }
}

/// 工具链抽象。测试用计数替身实现它。
#[async_trait]
pub trait Toolchain: Send + Sync {
    async fn run(&self, invocation: &ToolchainInvocation) -> BuildResult;
}

/// 以子进程方式调用工具链。
#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    program: String,
    prefix_args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ProcessToolchain {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
            working_dir: None,
        }
    }

    /// 在动作参数之前插入的固定参数（如包装脚本）。
    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn command(&self, invocation: &ToolchainInvocation) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.prefix_args)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        command.process_group(0);
        command
    }
}

#[async_trait]
impl Toolchain for ProcessToolchain {
    async fn run(&self, invocation: &ToolchainInvocation) -> BuildResult {
        let action = invocation.action.as_str();
        let started = Instant::now();
        let mut child = match self.command(invocation).spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(
                    target: "sites.build",
                    program = %self.program,
                    action,
                    error = %err,
                    "toolchain_spawn_failed"
                );
                return BuildResult::failed(format!("failed to start {}: {err}", self.program));
            }
        };
        tracing::info!(
            target: "sites.build",
            action,
            pid = child.id().unwrap_or_default(),
            file = %invocation.config_file.display(),
            "toolchain_started"
        );

        // future 在任一 await 点被丢弃时，由 guard 杀掉整个进程组
        let mut group = GroupGuard::new(&child);
        let stdout = tokio::spawn(read_all(child.stdout.take()));
        let stderr = tokio::spawn(read_all(child.stderr.take()));

        let result = match tokio::time::timeout(invocation.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                // 组长已被回收，不再对其 pgid 发信号
                group.disarm();
                BuildResult {
                    success: status.success(),
                    stdout: drain(stdout).await,
                    stderr: drain(stderr).await,
                    exit_code: status.code(),
                    timed_out: false,
                }
            }
            Ok(Err(err)) => {
                terminate(&mut child, &mut group).await;
                BuildResult::failed(format!("waiting for {} failed: {err}", self.program))
            }
            Err(_) => {
                terminate(&mut child, &mut group).await;
                let partial = drain(stdout).await;
                stderr.abort();
                BuildResult::timed_out(
                    partial,
                    format!(
                        "{action} timed out after {}s",
                        invocation.timeout.as_secs_f64()
                    ),
                )
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if result.timed_out {
            tracing::warn!(target: "sites.build", action, elapsed_ms, "toolchain_timeout");
        } else {
            tracing::info!(
                target: "sites.build",
                action,
                elapsed_ms,
                success = result.success,
                exit_code = ?result.exit_code,
                "toolchain_finished"
            );
        }
        result
    }
}

async fn read_all<R>(reader: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        let _ = reader.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// 等待输出读取任务结束；孙进程仍占着管道时最多等 `DRAIN_GRACE`。
async fn drain(mut task: JoinHandle<String>) -> String {
    match tokio::time::timeout(DRAIN_GRACE, &mut task).await {
        Ok(Ok(text)) => text,
        Ok(Err(_)) => String::new(),
        Err(_) => {
            task.abort();
            String::new()
        }
    }
}

/// 持有子进程的进程组；drop 时若仍处于 armed 状态则 SIGKILL 整组。
struct GroupGuard {
    pgid: Option<u32>,
}

impl GroupGuard {
    /// 子进程以 process_group(0) 启动，pgid == pid。
    fn new(child: &Child) -> Self {
        Self { pgid: child.id() }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    unsafe {
        libc::killpg(pgid as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

/// 杀掉整个进程组并回收组长。
async fn terminate(child: &mut Child, group: &mut GroupGuard) {
    group.kill();
    let _ = child.kill().await;
}
