use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use toml::{Table, Value};

use crate::error::SettingsError;

/// 基础配置文件名，必须存在。
pub const BASE_FILE: &str = "appsettings.toml";
/// 指定运行环境的环境变量，决定叠加层文件名。
pub const ENVIRONMENT_VAR: &str = "BEACON_ENVIRONMENT";
/// 指定配置目录的环境变量，缺省为当前工作目录。
pub const SETTINGS_DIR_VAR: &str = "BEACON_SETTINGS_DIR";
pub const DEFAULT_ENVIRONMENT: &str = "Production";

/// 宿主配置根节点。
///
/// # 契约说明（What）
/// - 各节均带 `#[serde(default)]`，缺省的节使用内置默认值；
/// - 未识别的键被忽略，便于同一份文件被多个组件共享。
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HostSettings {
    pub application: ApplicationSettings,
    pub logging: LoggingSettings,
    pub heartbeat: HeartbeatSettings,
}

impl HostSettings {
    /// 直接从单份 TOML 文本解析，不做分层合并。
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApplicationSettings {
    pub name: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            name: "beacon-host".to_owned(),
        }
    }
}

/// 日志接线配置。
///
/// - `level`：`EnvFilter` 指令串，仅在未设置 `RUST_LOG` 时生效；
/// - `format`：输出格式；
/// - `ansi`：是否输出终端颜色控制符。
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
    pub ansi: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Full,
            ansi: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HeartbeatSettings {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl HeartbeatSettings {
    /// 心跳间隔，下限 1 毫秒。
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 1_000,
        }
    }
}

/// 分层配置加载器：基础文件 + 按环境命名的可选叠加层。
///
/// # 教案式说明
/// - **意图（Why）**：同一份制品在不同环境运行，差异部分集中在 `appsettings.{环境}.toml` 中，
///   基础文件保存全部默认值；
/// - **逻辑（How）**：
///   1. 读取并解析 `appsettings.toml`，缺失即报错；
///   2. 读取 `appsettings.{environment}.toml`，缺失则跳过；
///   3. 表与表递归合并，其余值（标量、数组）由叠加层整体替换；
///   4. 将合并结果反序列化为 [`HostSettings`]。
/// - **契约（What）**：返回的错误携带出错文件路径；叠加层解析失败同样视为致命错误。
#[derive(Clone, Debug)]
pub struct SettingsLoader {
    base_dir: PathBuf,
    environment: String,
}

impl SettingsLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            environment: DEFAULT_ENVIRONMENT.to_owned(),
        }
    }

    /// 依据 `BEACON_SETTINGS_DIR` 与 `BEACON_ENVIRONMENT` 构造加载器。
    pub fn from_env() -> Self {
        let base_dir = std::env::var_os(SETTINGS_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let loader = Self::new(base_dir);
        match std::env::var(ENVIRONMENT_VAR) {
            Ok(environment) if !environment.trim().is_empty() => {
                loader.with_environment(environment.trim())
            }
            _ => loader,
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn base_path(&self) -> PathBuf {
        self.base_dir.join(BASE_FILE)
    }

    pub fn overlay_path(&self) -> PathBuf {
        self.base_dir
            .join(format!("appsettings.{}.toml", self.environment))
    }

    pub fn load(&self) -> Result<HostSettings, SettingsError> {
        let base_path = self.base_path();
        let mut merged = read_table(&base_path)?.ok_or(SettingsError::Missing { path: base_path })?;

        let overlay_path = self.overlay_path();
        if let Some(overlay) = read_table(&overlay_path)? {
            tracing::debug!(path = %overlay_path.display(), "applying settings overlay");
            merge_tables(&mut merged, overlay);
        }

        Value::Table(merged)
            .try_into()
            .map_err(SettingsError::Invalid)
    }
}

fn read_table(path: &Path) -> Result<Option<Table>, SettingsError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_owned(),
                source,
            });
        }
    };
    contents
        .parse::<Table>()
        .map(Some)
        .map_err(|source| SettingsError::Parse {
            path: path.to_owned(),
            source,
        })
}

fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
