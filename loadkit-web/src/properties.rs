//! 实体加载相关配置

use loadkit_core::{
    constants::{LOAD_ENABLED, LOAD_PRIORITY, WEB_MAX_FORM_BYTES},
    Environment,
};
use serde::{Deserialize, Serialize};

/// 实体加载配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadProperties {
    /// 是否注册参数加载拦截器
    pub enabled: bool,

    /// 拦截器优先级
    pub priority: i32,

    /// 表单请求体上限（字节）
    pub max_form_bytes: usize,
}

impl Default for LoadProperties {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 50,
            max_form_bytes: 64 * 1024,
        }
    }
}

impl LoadProperties {
    /// 从 Environment 加载配置
    pub fn from_environment(env: &Environment) -> Self {
        let defaults = Self::default();
        Self {
            enabled: env.get_bool_or(LOAD_ENABLED, defaults.enabled),
            priority: env
                .get_i64(LOAD_PRIORITY)
                .and_then(|v| i32::try_from(v).ok())
                .unwrap_or(defaults.priority),
            max_form_bytes: env
                .get_i64(WEB_MAX_FORM_BYTES)
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(defaults.max_form_bytes),
        }
    }
}
