use crate::error::{ApplicationError, ApplicationResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 配置值类型
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    /// 转换为字符串
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 转换为整数
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 转换为布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

/// 配置源 trait
pub trait PropertySource: Send + Sync {
    /// 获取配置源名称
    fn name(&self) -> &str;

    /// 获取配置值
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// 获取所有配置键
    fn keys(&self) -> Vec<String>;

    /// 配置源优先级（数字越大优先级越高）
    fn priority(&self) -> i32 {
        0
    }
}

/// Environment - 配置管理器
///
/// 按优先级依次查询各个配置源，第一个命中的值生效
pub struct Environment {
    sources: RwLock<Vec<Box<dyn PropertySource>>>,
    active_profiles: RwLock<Vec<String>>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("active_profiles", &*self.active_profiles.read())
            .field("sources_count", &self.sources.read().len())
            .finish()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
            active_profiles: RwLock::new(Vec::new()),
        }
    }

    /// 添加配置源
    pub fn add_property_source(&self, source: Box<dyn PropertySource>) {
        let mut sources = self.sources.write();
        tracing::debug!(source = source.name(), priority = source.priority(), "Adding property source");
        sources.push(source);
        // 按优先级降序排序
        sources.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// 构建器风格的 add_property_source
    pub fn with_property_source(self, source: impl PropertySource + 'static) -> Self {
        self.add_property_source(Box::new(source));
        self
    }

    /// 获取配置值
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        let sources = self.sources.read();
        for source in sources.iter() {
            if let Some(value) = source.get(key) {
                tracing::trace!("Config '{}' found in source '{}'", key, source.name());
                return Some(value);
            }
        }
        tracing::trace!("Config '{}' not found in any source", key);
        None
    }

    /// 获取字符串配置
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(String::from))
    }

    /// 获取字符串配置（带默认值）
    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    /// 获取整数配置
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// 获取整数配置（带默认值）
    pub fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.get_i64(key).unwrap_or(default)
    }

    /// 获取布尔值配置
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// 获取布尔值配置（带默认值）
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// 获取字符串数组配置
    /// 支持两种格式:
    /// 1. TOML数组: key = ["a", "b", "c"]
    /// 2. 逗号分隔字符串: key = "a, b, c"
    pub fn get_string_array(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key)? {
            ConfigValue::Array(arr) => Some(
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect(),
            ),
            ConfigValue::String(s) => Some(
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn set_active_profiles(&self, profiles: Vec<String>) {
        *self.active_profiles.write() = profiles;
    }

    pub fn active_profiles(&self) -> Vec<String> {
        self.active_profiles.read().clone()
    }

    /// 检查是否包含指定的 profile
    pub fn accepts_profile(&self, profile: &str) -> bool {
        self.active_profiles.read().iter().any(|p| p == profile)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// ========== Property Sources ==========

/// 环境变量配置源
pub struct EnvironmentPropertySource {
    prefix: String,
    priority: i32,
}

impl EnvironmentPropertySource {
    /// * `prefix` - 环境变量前缀，例如 "APP_"
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            priority: 100, // 环境变量优先级较高
        }
    }

    /// 例如: APP_LOADKIT_LOAD_PRIORITY -> loadkit.load.priority
    fn env_to_key(&self, env_key: &str) -> String {
        let stripped = env_key.strip_prefix(&self.prefix).unwrap_or(env_key);
        stripped.to_lowercase().replace('_', ".")
    }

    /// 例如: server.port -> APP_SERVER_PORT
    fn key_to_env(&self, key: &str) -> String {
        format!(
            "{}{}",
            self.prefix,
            key.replace(['.', '-'], "_").to_uppercase()
        )
    }
}

impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        std::env::var(self.key_to_env(key))
            .ok()
            .map(ConfigValue::String)
    }

    fn keys(&self) -> Vec<String> {
        std::env::vars()
            .filter(|(k, _)| k.starts_with(&self.prefix))
            .map(|(k, _)| self.env_to_key(&k))
            .collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// TOML 文件配置源
pub struct TomlPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl TomlPropertySource {
    /// 从文件加载 TOML 配置
    pub fn from_file(path: impl AsRef<Path>) -> ApplicationResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse(&content, path.to_string_lossy().to_string())
    }

    /// 从字符串解析 TOML 配置
    pub fn parse(content: &str, name: impl Into<String>) -> ApplicationResult<Self> {
        let value: toml::Value = toml::from_str(content)
            .map_err(|e| ApplicationError::Config(format!("Failed to parse TOML: {}", e)))?;

        let mut properties = HashMap::new();
        Self::flatten_toml(&value, String::new(), &mut properties);

        Ok(Self {
            name: name.into(),
            properties,
            priority: 0, // 文件配置优先级最低
        })
    }

    /// 展平 TOML 结构
    /// 例如: { server: { port: 8080 } } -> { "server.port": 8080 }
    fn flatten_toml(value: &toml::Value, prefix: String, result: &mut HashMap<String, ConfigValue>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    Self::flatten_toml(val, new_prefix, result);
                }
            }
            other => {
                result.insert(prefix, Self::toml_value_to_config(other));
            }
        }
    }

    fn toml_value_to_config(value: &toml::Value) -> ConfigValue {
        match value {
            toml::Value::String(s) => ConfigValue::String(s.clone()),
            toml::Value::Integer(i) => ConfigValue::Int(*i),
            toml::Value::Float(f) => ConfigValue::Float(*f),
            toml::Value::Boolean(b) => ConfigValue::Bool(*b),
            toml::Value::Array(arr) => {
                ConfigValue::Array(arr.iter().map(Self::toml_value_to_config).collect())
            }
            toml::Value::Table(table) => ConfigValue::Object(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::toml_value_to_config(v)))
                    .collect(),
            ),
            toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for TomlPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 内存配置源（用于测试或运行时配置）
pub struct MapPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            priority: 50,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_is_flattened_to_dotted_keys() {
        let source = TomlPropertySource::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9090

            [loadkit.load]
            enabled = false
            "#,
            "inline",
        )
        .unwrap();

        assert_eq!(source.get("server.host").unwrap().as_str(), Some("127.0.0.1"));
        assert_eq!(source.get("server.port").unwrap().as_i64(), Some(9090));
        assert_eq!(source.get("loadkit.load.enabled").unwrap().as_bool(), Some(false));
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let err = TomlPropertySource::parse("server = [", "broken").err().unwrap();
        assert!(matches!(err, ApplicationError::Config(_)));
    }

    #[test]
    fn test_higher_priority_source_wins() {
        let env = Environment::new()
            .with_property_source(
                MapPropertySource::new("low")
                    .with_property("server.port", ConfigValue::Int(1))
                    .with_priority(1),
            )
            .with_property_source(
                MapPropertySource::new("high")
                    .with_property("server.port", ConfigValue::String("2".into()))
                    .with_priority(10),
            );

        assert_eq!(env.get_i64("server.port"), Some(2));
        assert_eq!(env.get_i64_or("server.workers", 4), 4);
    }

    #[test]
    fn test_string_array_accepts_comma_separated_value() {
        let env = Environment::new().with_property_source(
            MapPropertySource::new("test")
                .with_property("profiles", ConfigValue::String("dev, ,test".into())),
        );

        assert_eq!(
            env.get_string_array("profiles"),
            Some(vec!["dev".to_string(), "test".to_string()])
        );
    }

    #[test]
    fn test_environment_key_mapping() {
        let source = EnvironmentPropertySource::new("APP_");
        assert_eq!(
            source.key_to_env("loadkit.flash.max-age-seconds"),
            "APP_LOADKIT_FLASH_MAX_AGE_SECONDS"
        );
        assert_eq!(source.env_to_key("APP_SERVER_PORT"), "server.port");
    }

    #[test]
    fn test_active_profiles() {
        let env = Environment::new();
        env.set_active_profiles(vec!["dev".to_string()]);
        assert!(env.accepts_profile("dev"));
        assert!(!env.accepts_profile("prod"));
    }
}
