use aurum_core::config::{AppConfig, ConfigError};
use config::{Config, Environment, File};
use std::path::Path;

/// 环境变量前缀，形如 `AURUM__TELEGRAM__CHAT_ID`
const ENV_PREFIX: &str = "AURUM";
const ENV_SEPARATOR: &str = "__";

/// 未指定 `AURUM_CONFIG` 时读取的配置文件
pub const DEFAULT_CONFIG_PATH: &str = "aurum.toml";

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
}

/// # Summary
/// 合并配置源并反序列化为 `AppConfig`，随后做整体校验。
///
/// # Logic
/// 1. 可选的 TOML 文件，不存在时跳过。
/// 2. 环境变量覆盖文件中的同名字段。
/// 3. 未出现的字段使用默认值。
fn load_from(path: &Path, env: Environment) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(env)
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::Load(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// # Summary
/// 加载并校验应用配置。
///
/// # Arguments
/// * `path`: TOML 配置文件路径，允许不存在。
///
/// # Returns
/// 校验通过的配置；缺少凭据或取值非法时返回 `ConfigError`。
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    load_from(path, environment())
}
