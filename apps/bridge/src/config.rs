// Bridge configuration
//
// Read from the environment (after `.env` is loaded by the binary). Every
// setting has a default; values that fail to parse are reported and replaced
// by the default.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;

/// Port the browser client connects to
pub const DEFAULT_PORT: u16 = 3001;

/// Top-level configuration of the bridge process
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub addr: SocketAddr,
    pub demo_enabled: bool,
    pub timings: Timings,
}

/// Delays used by the hub's timers
#[derive(Debug, Clone, PartialEq)]
pub struct Timings {
    /// Completed agents go back to idle after this long
    pub idle_revert: Duration,
    /// How long to wait for real input before considering demo mode
    pub demo_grace: Duration,
    /// Period between demo tasks
    pub demo_interval: Duration,
    /// Delay of the coordinator's delegation message
    pub delegation_delay: Duration,
    /// Delay of a demo worker's reply after it completes
    pub report_delay: Duration,
    /// Shortest simulated demo task
    pub completion_min: Duration,
    /// Longest simulated demo task
    pub completion_max: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            idle_revert: Duration::from_millis(2000),
            demo_grace: Duration::from_millis(3000),
            demo_interval: Duration::from_millis(4000),
            delegation_delay: Duration::from_millis(500),
            report_delay: Duration::from_millis(300),
            completion_min: Duration::from_millis(3000),
            completion_max: Duration::from_millis(5000),
        }
    }
}

impl Timings {
    /// Random duration for a simulated demo task
    pub fn completion_delay(&self) -> Duration {
        let (low, high) = if self.completion_min <= self.completion_max {
            (self.completion_min, self.completion_max)
        } else {
            (self.completion_max, self.completion_min)
        };
        if low == high {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            demo_enabled: true,
            timings: Timings::default(),
        }
    }
}

impl BridgeConfig {
    /// Reads the configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`
    ///
    /// # Variables
    /// - `BRIDGE_HOST` - listen address (default `0.0.0.0`)
    /// - `BRIDGE_PORT` - listen port (default `3001`)
    /// - `BRIDGE_DEMO` - allow demo mode (default `true`)
    /// - `BRIDGE_IDLE_REVERT_MS` - completed to idle delay (default `2000`)
    /// - `BRIDGE_DEMO_GRACE_MS` - wait for input before demo (default `3000`)
    /// - `BRIDGE_DEMO_INTERVAL_MS` - demo task period, above zero (default `4000`)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let host: IpAddr = setting(&lookup, "BRIDGE_HOST", defaults.addr.ip());
        let port: u16 = setting(&lookup, "BRIDGE_PORT", defaults.addr.port());
        let millis = |key: &str, default: Duration| {
            Duration::from_millis(setting(&lookup, key, default.as_millis() as u64))
        };
        let period = |key: &str, default: Duration| {
            let value = millis(key, default);
            if value.is_zero() {
                tracing::warn!(
                    "{} must be greater than zero, using default {}",
                    key,
                    default.as_millis()
                );
                return default;
            }
            value
        };

        Self {
            addr: SocketAddr::new(host, port),
            demo_enabled: setting(&lookup, "BRIDGE_DEMO", defaults.demo_enabled),
            timings: Timings {
                idle_revert: millis("BRIDGE_IDLE_REVERT_MS", defaults.timings.idle_revert),
                demo_grace: millis("BRIDGE_DEMO_GRACE_MS", defaults.timings.demo_grace),
                demo_interval: period("BRIDGE_DEMO_INTERVAL_MS", defaults.timings.demo_interval),
                ..defaults.timings
            },
        }
    }
}

fn setting<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = BridgeConfig::from_lookup(lookup(&[]));

        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.addr.port(), 3001);
        assert!(config.demo_enabled);
        assert_eq!(config.timings.idle_revert, Duration::from_secs(2));
    }

    #[test]
    fn variables_override_defaults() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("BRIDGE_HOST", "127.0.0.1"),
            ("BRIDGE_PORT", "4100"),
            ("BRIDGE_DEMO", "false"),
            ("BRIDGE_IDLE_REVERT_MS", "250"),
            ("BRIDGE_DEMO_INTERVAL_MS", "1000"),
        ]));

        assert_eq!(config.addr, "127.0.0.1:4100".parse::<SocketAddr>().unwrap());
        assert!(!config.demo_enabled);
        assert_eq!(config.timings.idle_revert, Duration::from_millis(250));
        assert_eq!(config.timings.demo_interval, Duration::from_secs(1));
        assert_eq!(config.timings.demo_grace, Duration::from_secs(3));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("BRIDGE_PORT", "not-a-port"),
            ("BRIDGE_DEMO", "maybe"),
        ]));

        assert_eq!(config.addr.port(), DEFAULT_PORT);
        assert!(config.demo_enabled);
    }

    #[test]
    fn zero_demo_interval_falls_back_to_default() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("BRIDGE_DEMO_INTERVAL_MS", "0"),
            ("BRIDGE_IDLE_REVERT_MS", "0"),
        ]));

        assert_eq!(config.timings.demo_interval, Timings::default().demo_interval);
        assert_eq!(config.timings.idle_revert, Duration::ZERO);
    }

    #[test]
    fn completion_delay_stays_in_range() {
        let timings = Timings::default();

        for _ in 0..100 {
            let delay = timings.completion_delay();
            assert!(delay >= timings.completion_min && delay <= timings.completion_max);
        }
    }

    #[test]
    fn completion_delay_tolerates_swapped_bounds() {
        let timings = Timings {
            completion_min: Duration::from_millis(50),
            completion_max: Duration::from_millis(10),
            ..Timings::default()
        };

        let delay = timings.completion_delay();

        assert!(delay >= Duration::from_millis(10) && delay <= Duration::from_millis(50));
    }
}
