// loadkit-core: 配置、日志与启动支持
//
// 提供：
// - 分层配置（TOML 文件、环境变量、内存配置源）
// - 基于 tracing 的日志初始化
// - 统一的应用错误类型

pub mod application;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;

pub use application::Application;
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use error::{ApplicationError, ApplicationResult, Result};
pub use logging::{LogFormat, LogLevel, LoggingConfig};

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::application::Application;
    pub use crate::config::{
        ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
        TomlPropertySource,
    };
    pub use crate::constants;
    pub use crate::error::{ApplicationError, ApplicationResult};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use anyhow::{anyhow, Context};
}
