//! 编译/烧录状态与构建结果。

/// 编译状态。一次尝试内单调：pending → compiling → success | error。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningStatus {
    Pending,
    Compiling,
    Success,
    Error,
}

impl ProvisioningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Compiling => "compiling",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "compiling" => Some(Self::Compiling),
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// 是否允许从当前状态迁移到 `next`。
    ///
    /// 终态（success/error）只能由新一次尝试重新进入 compiling。
    pub fn can_transition_to(&self, next: ProvisioningStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Compiling)
                | (Self::Compiling, Self::Success)
                | (Self::Compiling, Self::Error)
                | (Self::Success, Self::Compiling)
                | (Self::Error, Self::Compiling)
        )
    }
}

/// 烧录状态（与编译状态独立）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    Uploading,
    Uploaded,
    Error,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "idle" => Some(Self::Idle),
            "uploading" => Some(Self::Uploading),
            "uploaded" => Some(Self::Uploaded),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// 工具链失败类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildFailure {
    Timeout,
    ToolchainFailure,
}

/// 一次工具链调用的结果。失败也是数据，不作为错误抛出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl BuildResult {
    /// 未能得到退出码的失败（如进程无法启动）。
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: message.into(),
            exit_code: None,
            timed_out: false,
        }
    }

    /// 超时产生的合成失败结果。
    pub fn timed_out(stdout: String, message: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout,
            stderr: message.into(),
            exit_code: None,
            timed_out: true,
        }
    }

    pub fn failure(&self) -> Option<BuildFailure> {
        if self.success {
            None
        } else if self.timed_out {
            Some(BuildFailure::Timeout)
        } else {
            Some(BuildFailure::ToolchainFailure)
        }
    }
}
