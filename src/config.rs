use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KioskConfig {
    pub api: ApiConfig,
    pub camera: CameraConfig,
    pub scanner: ScannerConfig,
    pub modal: ModalConfig,
    pub ui: UiConfig,
    pub registration: RegistrationConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    /// Spreadsheet-script `/exec` endpoint
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_api_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Preferred camera orientation
    #[serde(default)]
    pub facing: FacingMode,

    /// Capture backend
    #[serde(default)]
    pub backend: CameraBackend,

    /// Release the capture handle on stop; when false a stop keeps it for reuse
    #[serde(default = "default_release_on_stop")]
    pub release_on_stop: bool,

    /// Start the camera as soon as the talk is loaded
    #[serde(default)]
    pub auto_start: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScannerConfig {
    #[serde(default)]
    pub strategy: ScanStrategy,

    /// Sampling period for the interval strategy
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,

    /// Quiet window after every decode and after the modal closes
    #[serde(default = "default_rescan_cooldown_ms")]
    pub rescan_cooldown_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModalConfig {
    #[serde(default = "default_confirmed_close_ms")]
    pub confirmed_close_ms: u64,

    #[serde(default = "default_already_confirmed_close_ms")]
    pub already_confirmed_close_ms: u64,

    #[serde(default = "default_failure_close_ms")]
    pub failure_close_ms: u64,

    #[serde(default = "default_confirmed_toast_ms")]
    pub confirmed_toast_ms: u64,

    #[serde(default = "default_already_confirmed_toast_ms")]
    pub already_confirmed_toast_ms: u64,

    #[serde(default = "default_failure_toast_ms")]
    pub failure_toast_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UiConfig {
    /// IANA timezone used for the modal timestamp
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegistrationConfig {
    /// Rendered QR code edge in pixels
    #[serde(default = "default_qr_size")]
    pub qr_size: u32,

    /// Directory receiving `qrcode.png`
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    #[default]
    Environment,
    User,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CameraBackend {
    Gstreamer,
    #[default]
    Mock,
}

/// How sampling ticks are produced
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanStrategy {
    /// Fixed-period polling
    #[default]
    Interval,
    /// One tick per delivered camera frame
    PerFrame,
}

impl ScannerConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn rescan_cooldown(&self) -> Duration {
        Duration::from_millis(self.rescan_cooldown_ms)
    }
}

impl KioskConfig {
    /// Load and validate configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("api.base_url", default_api_base_url())?
            .set_default("api.timeout_ms", default_api_timeout_ms())?
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.facing", "environment")?
            .set_default("camera.backend", "mock")?
            .set_default("camera.release_on_stop", default_release_on_stop())?
            .set_default("camera.auto_start", false)?
            .set_default("scanner.strategy", "interval")?
            .set_default("scanner.scan_interval_ms", default_scan_interval_ms())?
            .set_default("scanner.rescan_cooldown_ms", default_rescan_cooldown_ms())?
            .set_default("modal.confirmed_close_ms", default_confirmed_close_ms())?
            .set_default(
                "modal.already_confirmed_close_ms",
                default_already_confirmed_close_ms(),
            )?
            .set_default("modal.failure_close_ms", default_failure_close_ms())?
            .set_default("modal.confirmed_toast_ms", default_confirmed_toast_ms())?
            .set_default(
                "modal.already_confirmed_toast_ms",
                default_already_confirmed_toast_ms(),
            )?
            .set_default("modal.failure_toast_ms", default_failure_toast_ms())?
            .set_default("ui.timezone", default_timezone())?
            .set_default("registration.qr_size", default_qr_size())?
            .set_default("registration.output_dir", default_output_dir())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with CHECKIN_ prefix
            .add_source(
                Environment::with_prefix("CHECKIN")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: KioskConfig = settings.try_deserialize()?;
        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Message(
                "API base_url must not be empty".to_string(),
            ));
        }

        if reqwest::Url::parse(&self.api.base_url).is_err() {
            return Err(ConfigError::Message(format!(
                "API base_url is not a valid URL: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "API timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.scanner.scan_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Scanner scan_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.modal.already_confirmed_close_ms <= self.modal.confirmed_close_ms {
            return Err(ConfigError::Message(
                "Modal already_confirmed_close_ms must exceed confirmed_close_ms".to_string(),
            ));
        }

        if self.ui.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ConfigError::Message(format!(
                "Unknown timezone: {}",
                self.ui.timezone
            )));
        }

        if self.registration.qr_size == 0 {
            return Err(ConfigError::Message(
                "Registration qr_size must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: default_api_base_url(),
                timeout_ms: default_api_timeout_ms(),
            },
            camera: CameraConfig {
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
                facing: FacingMode::default(),
                backend: CameraBackend::default(),
                release_on_stop: default_release_on_stop(),
                auto_start: false,
            },
            scanner: ScannerConfig {
                strategy: ScanStrategy::default(),
                scan_interval_ms: default_scan_interval_ms(),
                rescan_cooldown_ms: default_rescan_cooldown_ms(),
            },
            modal: ModalConfig {
                confirmed_close_ms: default_confirmed_close_ms(),
                already_confirmed_close_ms: default_already_confirmed_close_ms(),
                failure_close_ms: default_failure_close_ms(),
                confirmed_toast_ms: default_confirmed_toast_ms(),
                already_confirmed_toast_ms: default_already_confirmed_toast_ms(),
                failure_toast_ms: default_failure_toast_ms(),
            },
            ui: UiConfig {
                timezone: default_timezone(),
            },
            registration: RegistrationConfig {
                qr_size: default_qr_size(),
                output_dir: default_output_dir(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_api_base_url() -> String {
    "https://script.google.com/macros/s/REPLACE_WITH_DEPLOYMENT_ID/exec".to_string()
}
fn default_api_timeout_ms() -> u64 {
    15_000
}

fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    30
}
fn default_release_on_stop() -> bool {
    true
}

fn default_scan_interval_ms() -> u64 {
    250
}
fn default_rescan_cooldown_ms() -> u64 {
    350
}

fn default_confirmed_close_ms() -> u64 {
    1600
}
fn default_already_confirmed_close_ms() -> u64 {
    2600
}
fn default_failure_close_ms() -> u64 {
    2000
}
fn default_confirmed_toast_ms() -> u64 {
    2400
}
fn default_already_confirmed_toast_ms() -> u64 {
    3200
}
fn default_failure_toast_ms() -> u64 {
    2500
}

fn default_timezone() -> String {
    "America/Sao_Paulo".to_string()
}

fn default_qr_size() -> u32 {
    250
}
fn default_output_dir() -> String {
    ".".to_string()
}

fn default_event_bus_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = KioskConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scanner.scan_interval(), Duration::from_millis(250));
        assert_eq!(config.scanner.rescan_cooldown(), Duration::from_millis(350));
        assert_eq!(config.camera.facing, FacingMode::Environment);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[api]
base_url = "https://example.test/exec"

[scanner]
strategy = "per_frame"
rescan_cooldown_ms = 300

[camera]
release_on_stop = false
"#
        )
        .unwrap();

        let config = KioskConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.api.base_url, "https://example.test/exec");
        assert_eq!(config.scanner.strategy, ScanStrategy::PerFrame);
        assert_eq!(config.scanner.rescan_cooldown_ms, 300);
        assert_eq!(config.scanner.scan_interval_ms, 250);
        assert!(!config.camera.release_on_stop);
        assert_eq!(config.modal.already_confirmed_close_ms, 2600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = KioskConfig::load_from_file(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.api.timeout_ms, 15_000);
        assert_eq!(config.registration.qr_size, 250);
    }

    #[test]
    fn test_load_rejects_zero_scan_interval() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[scanner]\nscan_interval_ms = 0").unwrap();

        let err = KioskConfig::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("scan_interval_ms"));
    }

    #[test]
    fn test_load_rejects_zero_event_bus_capacity() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[system]\nevent_bus_capacity = 0").unwrap();

        assert!(KioskConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_environment_overrides_use_single_underscore_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("CHECKIN_CAMERA__FPS", "7");
        let loaded = KioskConfig::load_from_file(dir.path().join("absent.toml"));
        std::env::remove_var("CHECKIN_CAMERA__FPS");

        assert_eq!(loaded.unwrap().camera.fps, 7);
    }

    #[test]
    fn test_config_validation() {
        let mut config = KioskConfig::default();

        config.camera.resolution = (0, 0);
        assert!(config.validate().is_err());
        config.camera.resolution = (640, 480);

        config.modal.already_confirmed_close_ms = config.modal.confirmed_close_ms;
        assert!(config.validate().is_err());
        config.modal.already_confirmed_close_ms = 2600;

        config.ui.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());
        config.ui.timezone = default_timezone();

        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_serializes_to_toml() {
        let rendered = toml::to_string_pretty(&KioskConfig::default()).unwrap();
        assert!(rendered.contains("[scanner]"));
        assert!(rendered.contains("strategy = \"interval\""));
    }
}
