//! Registry configuration

/// Placeholder name for devices that register without one
pub const DEFAULT_DEVICE_NAME: &str = "Dispositivo Móvil";

/// Placeholder user agent for devices that register without one
pub const DEFAULT_USER_AGENT: &str = "Unknown";

/// Configuration for the device registry and frame store
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Name used when a registration carries no usable name
    pub default_device_name: String,

    /// User agent used when a registration carries none
    pub default_user_agent: String,

    /// Keep the latest frame of each device for `get-stream` requests
    pub frame_cache_enabled: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_device_name: DEFAULT_DEVICE_NAME.to_string(),
            default_user_agent: DEFAULT_USER_AGENT.to_string(),
            frame_cache_enabled: true,
        }
    }
}

impl RegistryConfig {
    /// Set the placeholder device name
    pub fn default_device_name(mut self, name: impl Into<String>) -> Self {
        self.default_device_name = name.into();
        self
    }

    /// Set the placeholder user agent
    pub fn default_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.default_user_agent = user_agent.into();
        self
    }

    /// Disable the latest-frame cache
    pub fn disable_frame_cache(mut self) -> Self {
        self.frame_cache_enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.default_device_name, DEFAULT_DEVICE_NAME);
        assert_eq!(config.default_user_agent, DEFAULT_USER_AGENT);
        assert!(config.frame_cache_enabled);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .default_device_name("Camera")
            .default_user_agent("n/a")
            .disable_frame_cache();

        assert_eq!(config.default_device_name, "Camera");
        assert_eq!(config.default_user_agent, "n/a");
        assert!(!config.frame_cache_enabled);
    }
}
