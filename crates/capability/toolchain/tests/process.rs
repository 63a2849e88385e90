#![cfg(unix)]

use sites_toolchain::{ProcessToolchain, Toolchain, ToolchainAction, ToolchainInvocation};
use std::path::PathBuf;
use std::time::Duration;

fn temp_file(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sites-toolchain-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("mkdir");
    dir.join(name)
}

fn sh(script: &str) -> ProcessToolchain {
    // sh -c '<script>' sh <action> <file> ...：$1 为动作，$2 为配置文件
    ProcessToolchain::new("sh").with_prefix_args(["-c", script, "sh"])
}

#[test]
fn upload_args_include_device_only_when_given() {
    let with = ToolchainInvocation::upload(
        "/x/a.yaml",
        Some("10.0.0.7".to_string()),
        Duration::from_secs(1),
    );
    let args: Vec<String> = with
        .args()
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    assert_eq!(args, vec!["upload", "/x/a.yaml", "--device", "10.0.0.7"]);

    let without = ToolchainInvocation::upload("/x/a.yaml", None, Duration::from_secs(1));
    assert_eq!(without.args().len(), 2);
    assert_eq!(without.action, ToolchainAction::Upload { device: None });
}

#[tokio::test]
async fn successful_run_captures_stdout() {
    let file = temp_file("gate.yaml");
    let toolchain = sh("echo \"$1 $(basename \"$2\")\"");
    let result = toolchain
        .run(&ToolchainInvocation::compile(&file, Duration::from_secs(10)))
        .await;
    assert!(result.success);
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.stdout.trim(), "compile gate.yaml");
    assert!(!result.timed_out);
}

#[tokio::test]
async fn non_zero_exit_is_a_failed_result() {
    let file = temp_file("gate.yaml");
    let toolchain = sh("echo boom >&2; exit 3");
    let result = toolchain
        .run(&ToolchainInvocation::compile(&file, Duration::from_secs(10)))
        .await;
    assert!(!result.success);
    assert_eq!(result.exit_code, Some(3));
    assert_eq!(result.stderr.trim(), "boom");
    assert!(!result.timed_out);
}

#[tokio::test]
async fn missing_program_is_a_failed_result() {
    let file = temp_file("gate.yaml");
    let toolchain = ProcessToolchain::new("/nonexistent/esphome-toolchain");
    let result = toolchain
        .run(&ToolchainInvocation::compile(&file, Duration::from_secs(1)))
        .await;
    assert!(!result.success);
    assert!(result.exit_code.is_none());
    assert!(!result.stderr.is_empty());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn timeout_kills_the_whole_process_group() {
    let file = temp_file("slow.yaml");
    // 后台孙进程记录自己的 pid，组长随后阻塞等待
    let toolchain = sh("sleep 30 & echo $! > \"$2.pid\"; echo started; wait");
    let invocation = ToolchainInvocation::compile(&file, Duration::from_millis(500));
    let result = toolchain.run(&invocation).await;
    assert!(!result.success);
    assert!(result.timed_out);
    assert!(result.exit_code.is_none());

    let pid_path = PathBuf::from(format!("{}.pid", file.display()));
    let pid = std::fs::read_to_string(&pid_path)
        .expect("pid file")
        .trim()
        .to_string();
    let mut gone = false;
    for _ in 0..30 {
        let stat = std::fs::read_to_string(format!("/proc/{pid}/stat"));
        match stat {
            Err(_) => {
                gone = true;
                break;
            }
            Ok(stat) if stat.contains(") Z ") => {
                gone = true;
                break;
            }
            Ok(_) => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
    assert!(gone, "background child {pid} still running");
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn cancelled_run_kills_the_whole_process_group() {
    let file = temp_file("cancelled.yaml");
    let toolchain = sh("sleep 30 & echo $! > \"$2.pid\"; wait");
    let invocation = ToolchainInvocation::compile(&file, Duration::from_secs(60));
    let task = tokio::spawn(async move { toolchain.run(&invocation).await });

    let pid_path = PathBuf::from(format!("{}.pid", file.display()));
    let mut pid = String::new();
    for _ in 0..50 {
        if let Ok(text) = std::fs::read_to_string(&pid_path) {
            if !text.trim().is_empty() {
                pid = text.trim().to_string();
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(!pid.is_empty(), "pid file never written");

    task.abort();
    let _ = task.await;
    assert!(wait_until_gone(&pid).await, "background child {pid} survived cancellation");
}

#[cfg(target_os = "linux")]
async fn wait_until_gone(pid: &str) -> bool {
    for _ in 0..30 {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Err(_) => return true,
            Ok(stat) if stat.contains(") Z ") => return true,
            Ok(_) => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
    false
}

#[tokio::test]
async fn detached_pipe_holder_does_not_stall_a_finished_run() {
    let file = temp_file("daemon.yaml");
    // 孙进程继承 stdout 后组长立即退出
    let toolchain = sh("sleep 20 & echo done");
    let started = std::time::Instant::now();
    let result = toolchain
        .run(&ToolchainInvocation::compile(&file, Duration::from_secs(10)))
        .await;
    assert!(result.success);
    // 两个读取任务各自最多等一个宽限期
    assert!(started.elapsed() < Duration::from_secs(10));
}
