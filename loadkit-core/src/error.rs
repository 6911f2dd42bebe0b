use thiserror::Error;

/// 统一的宽松错误类型
///
/// 启动辅助代码中使用 anyhow::Result，通过 .context() 补充上下文信息。
pub use anyhow::Result;

/// 应用级错误
///
/// 覆盖配置加载、日志初始化等启动阶段的失败。
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type ApplicationResult<T> = std::result::Result<T, ApplicationError>;
