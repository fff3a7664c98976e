//! Plugin Error Types
//!
//! Error handling for capability registration, configuration and loading.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

/// Error types for plugin operations
#[derive(Error, Debug, Clone)]
pub enum PluginError {
    /// Plugin not found in the registry
    #[error("Plugin not found: {plugin_name}")]
    PluginNotFound { plugin_name: String },

    /// A configured value could not be parsed as the schema type
    #[error("Invalid value for {plugin_name}.{field}: {message}")]
    InvalidField { plugin_name: String, field: String, message: String },

    /// A required schema field has no value
    #[error("Required field '{label}' is missing for plugin {plugin_name}")]
    MissingRequiredField { plugin_name: String, label: String },

    /// Descriptor parsing error
    #[error("Descriptor parse error: {message}")]
    DescriptorParseError { message: String },

    /// Descriptor names an entry point that is not in the factory table
    #[error("Unknown plugin entry point '{entry}' in {}", path.display())]
    UnknownEntryPoint { entry: String, path: PathBuf },

    /// Plugin loading error
    #[error("Plugin loading error: {message}")]
    LoadingFailed { message: String },

    /// Installed tool discovery error
    #[error("Discovery error: {message}")]
    DiscoveryError { message: String },

    /// Filesystem error
    #[error("IO error: {message}")]
    Io { message: String },
}

impl PluginError {
    /// Create a plugin not found error
    pub fn plugin_not_found<S: Into<String>>(plugin_name: S) -> Self {
        Self::PluginNotFound { plugin_name: plugin_name.into() }
    }

    /// Create an invalid field error
    pub fn invalid_field<P, F, M>(plugin_name: P, field: F, message: M) -> Self
    where
        P: Into<String>,
        F: Into<String>,
        M: Into<String>,
    {
        Self::InvalidField {
            plugin_name: plugin_name.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a missing required field error
    pub fn missing_required_field<P: Into<String>, L: Into<String>>(plugin_name: P, label: L) -> Self {
        Self::MissingRequiredField { plugin_name: plugin_name.into(), label: label.into() }
    }

    /// Create a descriptor parse error
    pub fn descriptor_parse_error<S: Into<String>>(message: S) -> Self {
        Self::DescriptorParseError { message: message.into() }
    }

    /// Create an unknown entry point error
    pub fn unknown_entry_point<S: Into<String>>(entry: S, path: PathBuf) -> Self {
        Self::UnknownEntryPoint { entry: entry.into(), path }
    }

    /// Create a loading failed error
    pub fn loading_failed<S: Into<String>>(message: S) -> Self {
        Self::LoadingFailed { message: message.into() }
    }

    /// Create a discovery error
    pub fn discovery_error<S: Into<String>>(message: S) -> Self {
        Self::DiscoveryError { message: message.into() }
    }

    /// Check if error is a configuration issue
    pub fn is_configuration_error(&self) -> bool {
        matches!(self,
            PluginError::InvalidField { .. } |
            PluginError::MissingRequiredField { .. }
        )
    }

    /// Check if error is related to loading plugin modules
    pub fn is_loading_error(&self) -> bool {
        matches!(self,
            PluginError::DescriptorParseError { .. } |
            PluginError::UnknownEntryPoint { .. } |
            PluginError::LoadingFailed { .. }
        )
    }
}

impl From<std::io::Error> for PluginError {
    fn from(err: std::io::Error) -> Self {
        PluginError::Io { message: err.to_string() }
    }
}

impl From<serde_yaml::Error> for PluginError {
    fn from(err: serde_yaml::Error) -> Self {
        PluginError::descriptor_parse_error(format!("YAML error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PluginError::plugin_not_found("antimicrox");
        assert_eq!(error.to_string(), "Plugin not found: antimicrox");

        let error = PluginError::invalid_field("rclone", "backup_on_exit", "expected a boolean, got 'maybe'");
        assert_eq!(
            error.to_string(),
            "Invalid value for rclone.backup_on_exit: expected a boolean, got 'maybe'"
        );
    }

    #[test]
    fn test_error_classification() {
        let config_error = PluginError::missing_required_field("rclone", "Remote Name");
        assert!(config_error.is_configuration_error());
        assert!(!config_error.is_loading_error());

        let load_error = PluginError::unknown_entry_point("nope", PathBuf::from("/tmp/x.yaml"));
        assert!(load_error.is_loading_error());
        assert!(load_error.to_string().contains("/tmp/x.yaml"));
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let plugin_error: PluginError = io_error.into();
        assert!(matches!(plugin_error, PluginError::Io { .. }));
        assert!(plugin_error.to_string().contains("File not found"));
    }
}
