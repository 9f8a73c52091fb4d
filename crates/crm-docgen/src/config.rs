//! Generation configuration
//!
//! The only setting is the timezone used when a request does not name one.
//! It is a deployment default, read from `CRM_DEFAULT_TIMEZONE`.

use chrono_tz::Tz;

use crate::error::ConfigError;

pub const DEFAULT_TIMEZONE: &str = "America/New_York";
pub const TIMEZONE_ENV: &str = "CRM_DEFAULT_TIMEZONE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocgenConfig {
    pub default_timezone: Tz,
}

impl Default for DocgenConfig {
    fn default() -> Self {
        Self {
            default_timezone: chrono_tz::America::New_York,
        }
    }
}

impl DocgenConfig {
    pub fn new(default_timezone: Tz) -> Self {
        Self { default_timezone }
    }

    /// Build a configuration from an IANA zone name
    pub fn with_timezone(name: &str) -> Result<Self, ConfigError> {
        let zone = parse_zone(name).ok_or_else(|| ConfigError::UnknownTimezone(name.to_string()))?;
        Ok(Self::new(zone))
    }

    /// Load configuration from environment variables
    ///
    /// Expected variables:
    /// - CRM_DEFAULT_TIMEZONE: IANA zone name (default: "America/New_York")
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(TIMEZONE_ENV) {
            Ok(name) if !name.trim().is_empty() => Self::with_timezone(&name),
            _ => Ok(Self::default()),
        }
    }

    /// Zone for a request: the hint when it names a known zone, otherwise
    /// the configured default
    pub fn resolve_zone(&self, hint: Option<&str>) -> Tz {
        let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) else {
            return self.default_timezone;
        };

        parse_zone(hint).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown timezone {:?}, falling back to {}",
                hint,
                self.default_timezone.name()
            );
            self.default_timezone
        })
    }
}

fn parse_zone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}
