use crate::config::{Environment, EnvironmentPropertySource, TomlPropertySource};
use crate::error::ApplicationResult;
use crate::logging::LoggingConfig;
use std::path::Path;
use std::sync::Arc;

/// 应用启动器
///
/// 负责加载配置文件、环境变量并初始化日志，返回装配好的 Environment
pub struct Application {
    name: String,
    config_files: Vec<String>,
    env_prefix: String,
    profiles: Vec<String>,
    logging_config: Option<LoggingConfig>,
    init_logging: bool,
}

impl Application {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_files: vec!["application.toml".to_string()],
            env_prefix: "APP_".to_string(),
            profiles: Vec::new(),
            logging_config: None,
            init_logging: true,
        }
    }

    /// 设置配置文件路径
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_files = vec![path.into()];
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn profiles(mut self, profiles: Vec<String>) -> Self {
        self.profiles = profiles;
        self
    }

    /// 设置日志配置
    ///
    /// 如果不设置，将从 Environment 中的 logging.* 读取
    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    /// 跳过日志初始化（测试或由宿主自行初始化时使用）
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// 构建 Environment 并初始化日志
    pub fn run(self) -> ApplicationResult<Arc<Environment>> {
        let environment = Environment::new();

        // 优先级：代码设置 > 环境变量 APP_PROFILES_ACTIVE
        let mut active_profiles = self.profiles.clone();
        if active_profiles.is_empty() {
            if let Ok(profiles) = std::env::var(format!("{}PROFILES_ACTIVE", self.env_prefix)) {
                active_profiles = profiles
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
        }

        self.load_configurations(&environment, &active_profiles)?;
        environment.add_property_source(Box::new(EnvironmentPropertySource::new(&self.env_prefix)));
        environment.set_active_profiles(active_profiles.clone());

        if self.init_logging {
            let logging = self
                .logging_config
                .clone()
                .unwrap_or_else(|| LoggingConfig::from_environment(&environment));
            logging.init()?;
        }

        tracing::info!(
            application = %self.name,
            profiles = ?active_profiles,
            "Environment prepared"
        );

        Ok(Arc::new(environment))
    }

    /// 加载顺序（优先级从低到高）：
    /// 1. application.toml
    /// 2. application-{profile}.toml
    fn load_configurations(&self, environment: &Environment, profiles: &[String]) -> ApplicationResult<()> {
        for base in &self.config_files {
            Self::try_load_config_file(environment, base, 0)?;
        }

        for (index, profile) in profiles.iter().enumerate() {
            for base in &self.config_files {
                let profile_config = profile_config_path(base, profile);
                Self::try_load_config_file(environment, &profile_config, 10 + index as i32)?;
            }
        }

        Ok(())
    }

    /// 文件不存在时跳过；存在但无法解析时视为启动失败
    fn try_load_config_file(environment: &Environment, config_file: &str, priority: i32) -> ApplicationResult<()> {
        if !Path::new(config_file).exists() {
            tracing::debug!("Configuration file not found: {}", config_file);
            return Ok(());
        }

        let source = TomlPropertySource::from_file(config_file)?.with_priority(priority);
        environment.add_property_source(Box::new(source));
        tracing::info!("Loaded configuration from: {} (priority: {})", config_file, priority);
        Ok(())
    }
}

/// 例如：application.toml -> application-dev.toml
fn profile_config_path(base_path: &str, profile: &str) -> String {
    match base_path.rfind('.') {
        Some(dot_pos) => {
            let (name, ext) = base_path.split_at(dot_pos);
            format!("{}-{}{}", name, profile, ext)
        }
        None => format!("{}-{}", base_path, profile),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_profile_config_path() {
        assert_eq!(profile_config_path("application.toml", "dev"), "application-dev.toml");
        assert_eq!(profile_config_path("config/app", "prod"), "config/app-prod");
    }

    #[test]
    fn test_profile_file_overrides_base_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("application.toml");
        fs::write(&base, "[server]\nport = 8080\nhost = \"0.0.0.0\"\n").unwrap();
        fs::write(dir.path().join("application-dev.toml"), "[server]\nport = 9000\n").unwrap();

        let environment = Application::new("test")
            .config_file(base.to_string_lossy().to_string())
            .env_prefix("LOADKIT_TEST_UNUSED_")
            .profiles(vec!["dev".to_string()])
            .without_logging()
            .run()
            .unwrap();

        assert_eq!(environment.get_i64("server.port"), Some(9000));
        assert_eq!(environment.get_string("server.host").as_deref(), Some("0.0.0.0"));
        assert!(environment.accepts_profile("dev"));
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let environment = Application::new("test")
            .config_file("does-not-exist.toml")
            .env_prefix("LOADKIT_TEST_UNUSED_")
            .without_logging()
            .run()
            .unwrap();

        assert_eq!(environment.get_i64("server.port"), None);
    }
}
