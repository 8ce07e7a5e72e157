//! Control server configuration.
//!
//! [`ControlConfig`] is a plain struct filled in by `main.rs` from CLI
//! arguments.  Nothing in this module reads the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default listen address: every interface, port 5000.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Default port used by the client subcommands.
pub const DEFAULT_PORT: u16 = 5000;

/// Inter-character delay used when a `/type` request omits `delay`.
pub const DEFAULT_TYPE_DELAY: Duration = Duration::from_millis(50);

/// All runtime configuration for the control server.
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,

    /// HID gadget device node written by the Typist.
    pub hid_device: PathBuf,

    /// Delay between characters when a request does not set one.
    pub default_type_delay: Duration,

    /// Pause after each named key press.
    pub key_press_delay: Duration,

    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ControlConfig {
    /// | Field              | Default        |
    /// |--------------------|----------------|
    /// | bind_addr          | `0.0.0.0:5000` |
    /// | hid_device         | `/dev/hidg0`   |
    /// | default_type_delay | 50 ms          |
    /// | key_press_delay    | 100 ms         |
    /// | max_body_bytes     | 64 KiB         |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            hid_device: PathBuf::from(typist_agent::infrastructure::hid_gadget::DEFAULT_HID_DEVICE),
            default_type_delay: DEFAULT_TYPE_DELAY,
            key_press_delay: typist_agent::application::typist::DEFAULT_KEY_PRESS_DELAY,
            max_body_bytes: 64 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_binds_all_interfaces_on_5000() {
        let cfg = ControlConfig::default();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn test_default_type_delay_is_fifty_millis() {
        assert_eq!(ControlConfig::default().default_type_delay, Duration::from_millis(50));
    }

    #[test]
    fn test_default_device_is_hidg0() {
        assert_eq!(ControlConfig::default().hid_device, PathBuf::from("/dev/hidg0"));
    }
}
