//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ORCA__*` 覆盖（双下划线表示嵌套，如 `ORCA__API__BASE_URL=http://localhost:8888`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::CoreError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub api: ApiSection,
    pub polling: PollingSection,
}

/// [app] 段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [api] 段：后端地址、超时、环境
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 单次请求超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 启动时选中的环境 id
    pub environment: Option<String>,
    /// 携带环境 id 的请求头
    #[serde(default = "default_environment_header")]
    pub environment_header: String,
}

fn default_base_url() -> String {
    "http://localhost:8888".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_environment_header() -> String {
    "X-Inmanta-Tid".to_string()
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            environment: None,
            environment_header: default_environment_header(),
        }
    }
}

/// [polling] 段：两档轮询间隔（毫秒）
#[derive(Debug, Clone, Deserialize)]
pub struct PollingSection {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// 低频资源（如环境详情）的间隔
    #[serde(default = "default_slow_delay_ms")]
    pub slow_delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    5000
}

fn default_slow_delay_ms() -> u64 {
    30000
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            slow_delay_ms: default_slow_delay_ms(),
        }
    }
}

impl PollingSection {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn slow_delay(&self) -> Duration {
        Duration::from_millis(self.slow_delay_ms)
    }
}

impl AppConfig {
    /// 检查取值是否可用：间隔不能为 0，base_url 不能为空
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.api.base_url.trim().is_empty() {
            return Err(CoreError::InvalidOption {
                name: "api.base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        for (name, value) in [
            ("polling.delay_ms", self.polling.delay_ms),
            ("polling.slow_delay_ms", self.polling.slow_delay_ms),
            ("api.timeout_secs", self.api.timeout_secs),
        ] {
            if value == 0 {
                return Err(CoreError::InvalidOption {
                    name: name.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// 从 config 目录加载配置，环境变量 ORCA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ORCA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, CoreError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default", "default"] {
        if std::path::Path::new(&format!("{name}.toml")).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path.filter(|p| p.exists()) {
        builder = builder.add_source(config::File::from(path).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ORCA")
            .separator("__")
            .try_parsing(true),
    );

    let config: AppConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.polling.delay(), Duration::from_millis(5000));
        assert_eq!(config.polling.slow_delay(), Duration::from_millis(30000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[api]\nbase_url = \"http://orchestrator:8888\"\nenvironment = \"env-1\"\n\n[polling]\ndelay_ms = 1000"
        )
        .unwrap();

        let config = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.api.base_url, "http://orchestrator:8888");
        assert_eq!(config.api.environment.as_deref(), Some("env-1"));
        assert_eq!(config.polling.delay_ms, 1000);
        assert_eq!(config.polling.slow_delay_ms, 30000);
    }

    #[test]
    fn test_zero_delay_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[polling]\ndelay_ms = 0").unwrap();

        let err = load_config(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOption { ref name, .. } if name == "polling.delay_ms"));
    }
}
