use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub template: TemplateConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_template_path")]
    pub path: String,
    #[serde(default = "default_reload_each_frame")]
    pub reload_each_frame: bool,
}

/// Which contour comparison runs in the live pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchAlgorithm {
    /// Compare the largest Hu invariant of each contour within `span`.
    MomentSpan,
    /// Log-scale Hu distance below `comp_factor`.
    #[default]
    ShapeDistance,
}

impl MatchAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchAlgorithm::MomentSpan => "moment_span",
            MatchAlgorithm::ShapeDistance => "shape_distance",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatcherConfig {
    #[serde(default)]
    pub algorithm: MatchAlgorithm,
    #[serde(default = "default_span")]
    pub span: f64,
    #[serde(default = "default_comp_factor")]
    pub comp_factor: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_source_url")]
    pub source_url: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_mirror")]
    pub mirror: bool,
    #[serde(default = "default_quality")]
    pub quality: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            jpeg_quality: default_quality(),
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            path: default_template_path(),
            reload_each_frame: default_reload_each_frame(),
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            algorithm: MatchAlgorithm::default(),
            span: default_span(),
            comp_factor: default_comp_factor(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            source_url: default_source_url(),
            mode: default_mode(),
            fps: default_fps(),
            mirror: default_mirror(),
            quality: default_quality(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.matcher.span > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "matcher.span must be positive, got {}",
                self.matcher.span
            )));
        }
        if !(self.matcher.comp_factor > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "matcher.comp_factor must be positive, got {}",
                self.matcher.comp_factor
            )));
        }
        for (name, quality) in [
            ("server.jpeg_quality", self.server.jpeg_quality),
            ("client.quality", self.client.quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within 1..=100, got {quality}"
                )));
            }
        }
        if !(self.client.fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "client.fps must be positive, got {}",
                self.client.fps
            )));
        }
        Ok(())
    }

    /// Socket address string the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5000
}
fn default_quality() -> u8 {
    80
}
fn default_template_path() -> String {
    "images/book.jpg".into()
}
fn default_reload_each_frame() -> bool {
    true
}
fn default_span() -> f64 {
    0.028
}
fn default_comp_factor() -> f64 {
    0.1
}
fn default_server_url() -> String {
    "http://127.0.0.1:5000/".into()
}
fn default_source_url() -> String {
    "http://127.0.0.1:8080/stream".into()
}
fn default_mode() -> String {
    "mjpeg".into()
}
fn default_fps() -> f64 {
    10.0
}
fn default_mirror() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}
