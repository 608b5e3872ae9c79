use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub ingest: IngestSettings,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ServerSettings {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestSettings {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_max_datagram_bytes")]
    pub max_datagram_bytes: usize,
}

impl IngestSettings {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_max_datagram_bytes() -> usize {
    4096
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT");

    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(format!("{}.yaml", environment.as_str())),
        ))
        .add_source(
            config::Environment::with_prefix("DR")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings: Settings = settings.try_deserialize::<Settings>()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parses_case_insensitively() {
        let level: LogLevel = "DEBUG".to_string().try_into().unwrap();
        assert_eq!(level.as_str(), "debug");
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let result: Result<LogLevel, _> = "verbose".to_string().try_into();
        assert!(result.is_err());
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let result: Result<Environment, _> = "staging".to_string().try_into();
        assert!(result.is_err());
    }

    #[test]
    fn ingest_defaults_fill_in_missing_fields() {
        let settings: IngestSettings =
            serde_json::from_str(r#"{"host": "0.0.0.0", "port": 12345}"#).unwrap();
        assert_eq!(settings.max_datagram_bytes, 4096);
        assert_eq!(settings.get_address(), "0.0.0.0:12345");
    }

    #[test]
    fn server_defaults_fill_in_missing_fields() {
        let settings: ServerSettings =
            serde_json::from_str(r#"{"host": "127.0.0.1", "port": 8000}"#).unwrap();
        assert_eq!(settings.static_dir, "static");
        assert_eq!(settings.request_timeout_secs, 10);
    }
}
