//! Discovery errors

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum NamingError {
    /// Address is already registered for the service
    #[error("Registry failed: '{address}' is already registered for '{service}'")]
    RegistryFailed { service: String, address: String },

    /// Address (or service) is not registered
    #[error("Removal failed: '{address}' is not registered for '{service}'")]
    RemovalFailed { service: String, address: String },

    /// Only one primary may be registered per service
    #[error("Service '{service}' already has a primary at '{address}'")]
    PrimaryAlreadyRegistered { service: String, address: String },

    #[error("Service '{service}' already holds the maximum of {max} servers")]
    ServiceFull { service: String, max: usize },
}

impl NamingError {
    pub fn registry_failed(service: impl Into<String>, address: impl Into<String>) -> Self {
        Self::RegistryFailed {
            service: service.into(),
            address: address.into(),
        }
    }

    pub fn removal_failed(service: impl Into<String>, address: impl Into<String>) -> Self {
        Self::RemovalFailed {
            service: service.into(),
            address: address.into(),
        }
    }
}

pub type NamingResult<T> = std::result::Result<T, NamingError>;
