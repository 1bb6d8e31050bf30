use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use super::{parse_or, VarSource};
use crate::core::{AppError, Result};

pub const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
pub const PRODUCTION_BASE_URL: &str = "https://api.safaricom.co.ke";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpesaEnvironment {
    Sandbox,
    Production,
}

impl MpesaEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            MpesaEnvironment::Sandbox => SANDBOX_BASE_URL,
            MpesaEnvironment::Production => PRODUCTION_BASE_URL,
        }
    }
}

impl std::str::FromStr for MpesaEnvironment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "sandbox" => Ok(MpesaEnvironment::Sandbox),
            "production" => Ok(MpesaEnvironment::Production),
            _ => Err(format!("Invalid MPESA_ENV: {}", s)),
        }
    }
}

/// Initiator settings needed only for transaction reversals
#[derive(Debug)]
pub struct ReversalConfig {
    pub initiator_name: String,
    pub initiator_password: SecretString,
    pub public_key_path: PathBuf,
    pub result_url: String,
    pub timeout_url: String,
}

/// M-Pesa Daraja API credentials and endpoints
#[derive(Debug)]
pub struct MpesaConfig {
    pub consumer_key: String,
    pub consumer_secret: SecretString,
    pub business_short_code: String,
    pub pass_key: SecretString,
    pub callback_url: String,
    pub environment: MpesaEnvironment,
    /// Overrides the environment's base URL (sandbox proxies, tests)
    pub base_url_override: Option<String>,
    pub request_timeout: Duration,
    pub reversal: Option<ReversalConfig>,
}

impl MpesaConfig {
    /// Load gateway configuration from environment variables.
    ///
    /// Returns `Ok(None)` when the consumer credentials are absent: the service
    /// runs without a gateway and push/reversal calls fail with a configuration error.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_source(&|key| std::env::var(key).ok())
    }

    pub(crate) fn from_source(vars: VarSource<'_>) -> Result<Option<Self>> {
        let consumer_key = vars("MPESA_CONSUMER_KEY").unwrap_or_default();
        let consumer_secret = vars("MPESA_CONSUMER_SECRET").unwrap_or_default();
        if consumer_key.is_empty() || consumer_secret.is_empty() {
            return Ok(None);
        }

        let environment = vars("MPESA_ENV")
            .unwrap_or_default()
            .parse::<MpesaEnvironment>()
            .map_err(AppError::Configuration)?;

        let timeout_secs: u64 = parse_or(vars, "MPESA_TIMEOUT_SECS", 30)?;

        Ok(Some(MpesaConfig {
            consumer_key,
            consumer_secret: SecretString::new(consumer_secret),
            business_short_code: vars("MPESA_BUSINESS_SHORTCODE").unwrap_or_default(),
            pass_key: SecretString::new(vars("MPESA_PASSKEY").unwrap_or_default()),
            callback_url: vars("MPESA_CALLBACK_URL").unwrap_or_default(),
            environment,
            base_url_override: vars("MPESA_BASE_URL").filter(|url| !url.is_empty()),
            request_timeout: Duration::from_secs(timeout_secs),
            reversal: ReversalConfig::from_source(vars),
        }))
    }

    /// Effective API base URL without trailing slash
    pub fn base_url(&self) -> String {
        self.base_url_override
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn validate(&self) -> Result<()> {
        if self.business_short_code.is_empty() {
            return Err(AppError::configuration("MPESA_BUSINESS_SHORTCODE not set"));
        }
        if self.pass_key.expose_secret().is_empty() {
            return Err(AppError::configuration("MPESA_PASSKEY not set"));
        }
        if self.callback_url.is_empty() {
            return Err(AppError::configuration("MPESA_CALLBACK_URL not set"));
        }
        if self.request_timeout.is_zero() {
            return Err(AppError::configuration(
                "MPESA_TIMEOUT_SECS must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl ReversalConfig {
    /// All three initiator settings must be present, otherwise reversals stay disabled
    fn from_source(vars: VarSource<'_>) -> Option<Self> {
        let initiator_name = vars("MPESA_INITIATOR_NAME").filter(|v| !v.is_empty())?;
        let initiator_password = vars("MPESA_INITIATOR_PASSWORD").filter(|v| !v.is_empty())?;
        let public_key_path = vars("MPESA_PUBLIC_KEY_PATH").filter(|v| !v.is_empty())?;

        Some(ReversalConfig {
            initiator_name,
            initiator_password: SecretString::new(initiator_password),
            public_key_path: PathBuf::from(public_key_path),
            result_url: vars("MPESA_REVERSAL_RESULT_URL").unwrap_or_default(),
            timeout_url: vars("MPESA_REVERSAL_TIMEOUT_URL").unwrap_or_default(),
        })
    }
}
