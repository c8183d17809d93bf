//! Tender service categories

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    Construction,
    #[serde(rename = "IT")]
    It,
    Consulting,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Construction => "Construction",
            ServiceType::It => "IT",
            ServiceType::Consulting => "Consulting",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Construction" => Some(ServiceType::Construction),
            "IT" => Some(ServiceType::It),
            "Consulting" => Some(ServiceType::Consulting),
            _ => None,
        }
    }

    /// Like [`ServiceType::from_str`], but unknown values are an input error.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        Self::from_str(s.trim())
            .ok_or_else(|| DomainError::ValidationError(format!("unknown service type: {}", s)))
    }
}
