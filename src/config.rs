//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for SafeVision, supporting:
//! - Environment variables for all configurable values
//! - Sensible defaults for the hosted Gemini endpoint and camera hints
//! - Builder pattern for programmatic configuration
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SAFEVISION_GEMINI_ENDPOINT` | Gemini REST base URL | `https://generativelanguage.googleapis.com/v1beta` |
//! | `SAFEVISION_GEMINI_MODEL` | Model used for hazard analysis | `gemini-3-pro-preview` |
//! | `SAFEVISION_REQUEST_TIMEOUT` | Total timeout of the analysis call (seconds) | `120` |
//! | `SAFEVISION_CONNECT_TIMEOUT` | Connection timeout (seconds) | `10` |
//! | `SAFEVISION_API_KEY` | API key for the analysis provider | unset |
//! | `SAFEVISION_CAMERA_WIDTH` | Ideal capture width (pixels) | `1280` |
//! | `SAFEVISION_CAMERA_HEIGHT` | Ideal capture height (pixels) | `720` |
//!
//! # Example
//!
//! ```bash
//! export SAFEVISION_API_KEY="..."
//! export SAFEVISION_GEMINI_MODEL="gemini-2.5-flash"
//! ```

use std::env;
use std::sync::OnceLock;

// ============================================================================
// Default Values
// ============================================================================

/// Default Gemini REST base URL
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model name
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-pro-preview";

/// Default total request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 120;

/// Default connection timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Default ideal camera width (pixels)
pub const DEFAULT_CAMERA_WIDTH: u32 = 1280;

/// Default ideal camera height (pixels)
pub const DEFAULT_CAMERA_HEIGHT: u32 = 720;

/// Container type of recorded clips
pub const RECORDING_MIME_TYPE: &str = "video/webm";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the Gemini endpoint
pub const ENV_GEMINI_ENDPOINT: &str = "SAFEVISION_GEMINI_ENDPOINT";

/// Environment variable for the Gemini model
pub const ENV_GEMINI_MODEL: &str = "SAFEVISION_GEMINI_MODEL";

/// Environment variable for the request timeout
pub const ENV_REQUEST_TIMEOUT: &str = "SAFEVISION_REQUEST_TIMEOUT";

/// Environment variable for the connection timeout
pub const ENV_CONNECT_TIMEOUT: &str = "SAFEVISION_CONNECT_TIMEOUT";

/// Environment variable for the API key
pub const ENV_API_KEY: &str = "SAFEVISION_API_KEY";

/// Environment variable for the ideal camera width
pub const ENV_CAMERA_WIDTH: &str = "SAFEVISION_CAMERA_WIDTH";

/// Environment variable for the ideal camera height
pub const ENV_CAMERA_HEIGHT: &str = "SAFEVISION_CAMERA_HEIGHT";

// ============================================================================
// Legacy Environment Variable Support
// ============================================================================

/// Key variable injected by hosted notebook environments
pub const ENV_API_KEY_LEGACY: &str = "API_KEY";

/// Key variable used by the Gemini SDKs
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for SafeVision
#[derive(Debug, Clone)]
pub struct Config {
    /// Analysis provider configuration
    pub gemini: GeminiSettings,
    /// Camera acquisition hints
    pub camera: CameraSettings,
}

/// Analysis provider settings
#[derive(Clone)]
pub struct GeminiSettings {
    /// REST base URL (without the `/models/...` suffix)
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// API key, if one is configured
    pub api_key: Option<String>,
    /// Total request timeout (seconds)
    pub request_timeout: u64,
    /// Connection timeout (seconds)
    pub connect_timeout: u64,
}

// Keeps the key out of debug logs.
impl std::fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Camera acquisition hints
#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Ideal capture width
    pub width: u32,
    /// Ideal capture height
    pub height: u32,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            gemini: GeminiSettings::from_env(),
            camera: CameraSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            gemini: GeminiSettings::defaults(),
            camera: CameraSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl GeminiSettings {
    /// Create provider settings from environment variables
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var(ENV_GEMINI_ENDPOINT)
                .unwrap_or_else(|_| DEFAULT_GEMINI_ENDPOINT.to_string()),
            model: env::var(ENV_GEMINI_MODEL).unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            api_key: api_key_from_env(),
            request_timeout: parse_env(ENV_REQUEST_TIMEOUT).unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            connect_timeout: parse_env(ENV_CONNECT_TIMEOUT).unwrap_or(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// Create provider settings with defaults
    pub fn defaults() -> Self {
        Self {
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl CameraSettings {
    /// Create camera settings from environment variables
    pub fn from_env() -> Self {
        Self {
            width: parse_env(ENV_CAMERA_WIDTH).unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: parse_env(ENV_CAMERA_HEIGHT).unwrap_or(DEFAULT_CAMERA_HEIGHT),
        }
    }

    /// Create camera settings with defaults
    pub fn defaults() -> Self {
        Self {
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Read the API key, honouring the legacy variable names in order.
///
/// Empty values count as unset.
pub fn api_key_from_env() -> Option<String> {
    [ENV_API_KEY, ENV_API_KEY_LEGACY, ENV_GEMINI_API_KEY]
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| parse_value(&s))
}

fn parse_value<T: std::str::FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}
