use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use tracing::warn;

use crate::allocator::AllocationConfig;
use crate::catalog::{default_carriers, load_catalog};
use crate::model::CarrierConfig;
use crate::policy::AllocationMode;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub engine: EngineConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            engine: EngineConfig::from_env(),
            catalog: CatalogConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "CARRIER_FIT_API_HOST";
    const PORT_VAR: &'static str = "CARRIER_FIT_API_PORT";

    fn from_env() -> Self {
        let default_ip = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (default_ip, Self::DEFAULT_HOST.to_string())
            }
        };

        let port = match env_string(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "⚠️ {} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Default run parameters for the allocation engine.
///
/// Requests may override threshold and mode per call.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    allocation: AllocationConfig,
}

impl EngineConfig {
    const THRESHOLD_VAR: &'static str = "CARRIER_FIT_BORDERLINE_THRESHOLD_MM";
    const MODE_VAR: &'static str = "CARRIER_FIT_ALLOCATION_MODE";
    const CAP_BY_WEIGHT_VAR: &'static str = "CARRIER_FIT_CAP_UNITS_BY_WEIGHT";
    const PARALLEL_VAR: &'static str = "CARRIER_FIT_PARALLEL";

    fn from_env() -> Self {
        let threshold = load_f64_with_warning(
            Self::THRESHOLD_VAR,
            AllocationConfig::DEFAULT_BORDERLINE_THRESHOLD_MM,
            |value| value.is_finite() && value >= 0.0,
            "must be a finite value >= 0",
            "Adjusted borderline threshold changes which fits count as borderline",
        );

        let mode = env_string(Self::MODE_VAR)
            .and_then(|raw| match raw.parse::<AllocationMode>() {
                Ok(mode) => Some(mode),
                Err(err) => {
                    warn!(
                        "⚠️ {}: {}. Using {}.",
                        Self::MODE_VAR,
                        err,
                        AllocationConfig::DEFAULT_MODE
                    );
                    None
                }
            })
            .unwrap_or(AllocationConfig::DEFAULT_MODE);

        let cap_units_by_weight = env_string(Self::CAP_BY_WEIGHT_VAR)
            .and_then(|raw| parse_bool(&raw, Self::CAP_BY_WEIGHT_VAR))
            .unwrap_or(AllocationConfig::DEFAULT_CAP_UNITS_BY_WEIGHT);

        let parallel = env_string(Self::PARALLEL_VAR)
            .and_then(|raw| parse_bool(&raw, Self::PARALLEL_VAR))
            .unwrap_or(AllocationConfig::DEFAULT_PARALLEL);

        let allocation = AllocationConfig::builder()
            .borderline_threshold_mm(threshold)
            .mode(mode)
            .cap_units_by_weight(cap_units_by_weight)
            .parallel(parallel)
            .build();

        Self { allocation }
    }

    /// Returns the configured AllocationConfig.
    pub fn allocation_config(&self) -> AllocationConfig {
        self.allocation
    }
}

/// Where the carrier catalog comes from.
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    path: Option<PathBuf>,
}

impl CatalogConfig {
    const PATH_VAR: &'static str = "CARRIER_FIT_CARRIERS_FILE";

    fn from_env() -> Self {
        Self {
            path: env_string(Self::PATH_VAR).map(PathBuf::from),
        }
    }

    /// Configured catalog file, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Loads the catalog file, falling back to the built-in carriers when no file is
    /// configured or the file cannot be used.
    pub fn load_carriers(&self) -> Vec<CarrierConfig> {
        let Some(path) = &self.path else {
            return default_carriers();
        };
        match load_catalog(path) {
            Ok(carriers) => carriers,
            Err(err) => {
                warn!(
                    "⚠️ {} ('{}') unusable: {}. Using built-in carriers.",
                    Self::PATH_VAR,
                    path.display(),
                    err
                );
                default_carriers()
            }
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => parse_f64_with_warning(var_name, &raw, default, validator, invalid_hint, notice),
        None => default,
    }
}

fn parse_f64_with_warning(
    var_name: &str,
    raw: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: &str,
) -> f64 {
    match raw.parse::<f64>() {
        Ok(value) => {
            if !validator(value) {
                warn!(
                    "⚠️ {} contains invalid value '{}': {}. Using {}.",
                    var_name, raw, invalid_hint, default
                );
                default
            } else {
                let tolerance = (default.abs().max(1.0)) * 1e-9;
                if (value - default).abs() > tolerance {
                    warn!("⚠️ {} ({} = {}).", notice, var_name, value);
                }
                value
            }
        }
        Err(err) => {
            warn!(
                "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}
