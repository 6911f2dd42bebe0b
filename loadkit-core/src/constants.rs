//! 配置常量定义
//!
//! 定义框架使用的全部配置键名称

// ==================== Logging 配置 ====================

pub const LOGGING_LEVEL: &str = "logging.level";
pub const LOGGING_FORMAT: &str = "logging.format";

/// 自定义过滤器，例如 "loadkit_web=debug,tower=warn"
pub const LOGGING_FILTER: &str = "logging.filter";

// ==================== Server 配置 ====================

pub const SERVER_HOST: &str = "server.host";
pub const SERVER_PORT: &str = "server.port";

// ==================== 实体加载配置 ====================

/// 是否注册参数加载拦截器
pub const LOAD_ENABLED: &str = "loadkit.load.enabled";

/// 参数加载拦截器的优先级（数字越小越先执行）
pub const LOAD_PRIORITY: &str = "loadkit.load.priority";

/// Flash 参数的最长保留时间（秒）
pub const FLASH_MAX_AGE_SECONDS: &str = "loadkit.flash.max-age-seconds";

/// 读取表单请求体的上限（字节）
pub const WEB_MAX_FORM_BYTES: &str = "loadkit.web.max-form-bytes";
