// ── Runtime coordinator configuration ──
//
// Describes *which* device to poll and how. Never touches disk; the CLI
// (via cresctl-config) constructs a `CoordinatorConfig` and hands it in.

use std::time::Duration;

use cresctl_api::TransportConfig;
use cresctl_api::subsystem::inputs::DEFAULT_INPUTS;
use cresctl_api::subsystem::outputs::{DEFAULT_OUTPUTS, DEFAULT_PWM_OUTPUTS};
use cresctl_api::subsystem::switches::{DEFAULT_PWM_SWITCHES, DEFAULT_SWITCHES};
use cresctl_api::transport::DEFAULT_TIMEOUT;

/// Interval between periodic refresh cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for one managed device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Host, `host:port` or URL of the device.
    pub address: String,
    /// Per-request transport timeout.
    pub timeout: Duration,
    /// Periodic refresh interval. `Duration::ZERO` disables polling.
    pub poll_interval: Duration,
    pub outputs: Vec<String>,
    /// Subset of `outputs` that are PWM-capable.
    pub pwm_outputs: Vec<String>,
    pub inputs: Vec<String>,
    pub switches: Vec<String>,
    pub pwm_switches: Vec<String>,
}

fn owned(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| (*s).to_owned()).collect()
}

impl CoordinatorConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            outputs: owned(&DEFAULT_OUTPUTS),
            pwm_outputs: owned(&DEFAULT_PWM_OUTPUTS),
            inputs: owned(&DEFAULT_INPUTS),
            switches: owned(&DEFAULT_SWITCHES),
            pwm_switches: owned(&DEFAULT_PWM_SWITCHES),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig::default().with_timeout(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_hardware() {
        let cfg = CoordinatorConfig::new("192.168.1.50");
        assert_eq!(cfg.outputs, ["a", "b", "c", "d", "e", "f"]);
        assert_eq!(cfg.pwm_outputs, ["a", "b"]);
        assert_eq!(cfg.inputs, ["a", "b"]);
        assert_eq!(cfg.switches, ["12v", "24v-a", "24v-b"]);
        assert_eq!(cfg.pwm_switches, cfg.switches);
        assert_eq!(cfg.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(cfg.transport().timeout, Duration::from_secs(5));
    }
}
