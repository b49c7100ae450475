use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tracing::warn;

use crate::optimizer::PackingConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub optimizer: OptimizerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            optimizer: OptimizerConfig::from_env(),
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
    const HOST_VAR: &'static str = "ROLL_PACK_API_HOST";
    const PORT_VAR: &'static str = "ROLL_PACK_API_PORT";
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        Self::from_values(env_string(Self::HOST_VAR), env_string(Self::PORT_VAR))
    }

    fn from_values(host: Option<String>, port: Option<String>) -> Self {
        let host_value = host.unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (Self::DEFAULT_BIND_IP, Self::DEFAULT_HOST.to_string())
            }
        };

        let port = match port {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "{} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
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
            display_host,
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

/// Configuration for the strategy optimizer.
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
    packing: PackingConfig,
}

impl OptimizerConfig {
    const SUPPORT_RATIO_VAR: &'static str = "ROLL_PACK_SUPPORT_RATIO";
    const WALL_STEP_VAR: &'static str = "ROLL_PACK_WALL_STEP";
    const GRID_STEP_VAR: &'static str = "ROLL_PACK_GRID_STEP";
    const WALL_BONUS_VAR: &'static str = "ROLL_PACK_WALL_CONTACT_BONUS";
    const NEIGHBOR_BONUS_VAR: &'static str = "ROLL_PACK_NEIGHBOR_CONTACT_BONUS";
    const PARALLEL_VAR: &'static str = "ROLL_PACK_PARALLEL_STRATEGIES";
    const TIME_LIMIT_VAR: &'static str = "ROLL_PACK_TIME_LIMIT_MS";

    fn from_env() -> Self {
        let support_ratio = load_f64_with_warning(
            Self::SUPPORT_RATIO_VAR,
            PackingConfig::DEFAULT_SUPPORT_RATIO,
            |value| (0.0..=1.0).contains(&value),
            "must be between 0 and 1",
            "Adjusted minimum support may lead to unstable stacks",
        );

        let wall_step = load_f64_with_warning(
            Self::WALL_STEP_VAR,
            PackingConfig::DEFAULT_WALL_STEP,
            |value| value >= PackingConfig::MIN_SEARCH_STEP,
            "must be at least 0.1 cm",
            "Coarser wall sweeps leave gaps along the walls",
        );

        let grid_step = load_f64_with_warning(
            Self::GRID_STEP_VAR,
            PackingConfig::DEFAULT_GRID_STEP,
            |value| value >= PackingConfig::MIN_SEARCH_STEP,
            "must be at least 0.1 cm",
            "Adjusted grid step changes search time and placement quality",
        );

        let wall_contact_bonus = load_f64_with_warning(
            Self::WALL_BONUS_VAR,
            PackingConfig::DEFAULT_WALL_CONTACT_BONUS,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted wall contact bonus changes tie-breaking",
        );

        let neighbor_contact_bonus = load_f64_with_warning(
            Self::NEIGHBOR_BONUS_VAR,
            PackingConfig::DEFAULT_NEIGHBOR_CONTACT_BONUS,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted neighbour contact bonus changes tie-breaking",
        );

        let parallel_strategies = env_string(Self::PARALLEL_VAR)
            .and_then(|raw| parse_bool(&raw, Self::PARALLEL_VAR))
            .unwrap_or(PackingConfig::DEFAULT_PARALLEL_STRATEGIES);

        let time_limit = env_string(Self::TIME_LIMIT_VAR)
            .and_then(|raw| parse_millis(&raw, Self::TIME_LIMIT_VAR));

        let packing = PackingConfig::builder()
            .support_ratio(support_ratio)
            .wall_step(wall_step)
            .grid_step(grid_step)
            .wall_contact_bonus(wall_contact_bonus)
            .neighbor_contact_bonus(neighbor_contact_bonus)
            .parallel_strategies(parallel_strategies)
            .time_limit(time_limit)
            .build();

        Self { packing }
    }

    /// Returns the configured PackingConfig.
    pub fn packing_config(&self) -> PackingConfig {
        self.packing
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
            warn!("Access to {} failed: {}. Using default value.", name, err);
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
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn parse_millis(raw: &str, var_name: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(err) => {
            warn!(
                "Could not parse {} ('{}') as milliseconds: {}. Running without a time limit.",
                var_name, raw, err
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
    warning: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => parse_f64_with_warning(&raw, var_name, default, validator, invalid_hint, warning),
        None => default,
    }
}

fn parse_f64_with_warning(
    raw: &str,
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && validator(value) => {
            let tolerance = default.abs().max(1.0) * 1e-9;
            if (value - default).abs() > tolerance {
                warn!("{} ({} = {}).", warning, var_name, value);
            }
            value
        }
        Ok(_) => {
            warn!(
                "{} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}
