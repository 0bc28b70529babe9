//! Connectivity classifications

use serde::{Deserialize, Serialize};

/// Deduplicated reachability status exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityStatus {
    /// Unmetered connection (Wi-Fi or wired)
    WiFi,
    /// Mobile data
    Cellular,
    /// No usable connection, or the platform could not tell
    Offline,
}

impl ConnectivityStatus {
    /// Whether requests are worth attempting
    pub fn is_connected(&self) -> bool {
        !matches!(self, ConnectivityStatus::Offline)
    }

    /// Stable string tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityStatus::WiFi => "wifi",
            ConnectivityStatus::Cellular => "cellular",
            ConnectivityStatus::Offline => "offline",
        }
    }
}

impl std::fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interface type as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawConnectivity {
    /// Wi-Fi
    Wifi,
    /// Mobile data
    Mobile,
    /// Wired
    Ethernet,
    /// VPN without a known underlying interface
    Vpn,
    /// Bluetooth tethering
    Bluetooth,
    /// Anything the platform could not name
    Other,
    /// No interface
    None,
}

impl RawConnectivity {
    /// Collapse to the status callers see
    pub fn classify(self) -> ConnectivityStatus {
        match self {
            RawConnectivity::Wifi | RawConnectivity::Ethernet => ConnectivityStatus::WiFi,
            RawConnectivity::Mobile => ConnectivityStatus::Cellular,
            RawConnectivity::Vpn
            | RawConnectivity::Bluetooth
            | RawConnectivity::Other
            | RawConnectivity::None => ConnectivityStatus::Offline,
        }
    }
}

impl From<RawConnectivity> for ConnectivityStatus {
    fn from(raw: RawConnectivity) -> Self {
        raw.classify()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(RawConnectivity::Wifi.classify(), ConnectivityStatus::WiFi);
        assert_eq!(RawConnectivity::Ethernet.classify(), ConnectivityStatus::WiFi);
        assert_eq!(RawConnectivity::Mobile.classify(), ConnectivityStatus::Cellular);
        assert_eq!(RawConnectivity::None.classify(), ConnectivityStatus::Offline);
        assert_eq!(RawConnectivity::Other.classify(), ConnectivityStatus::Offline);
    }

    #[test]
    fn test_is_connected() {
        assert!(ConnectivityStatus::WiFi.is_connected());
        assert!(ConnectivityStatus::Cellular.is_connected());
        assert!(!ConnectivityStatus::Offline.is_connected());
    }

    #[test]
    fn test_stable_tags() {
        assert_eq!(ConnectivityStatus::WiFi.to_string(), "wifi");
        assert_eq!(
            serde_json::to_string(&ConnectivityStatus::Cellular).unwrap(),
            "\"cellular\""
        );
        let parsed: ConnectivityStatus = serde_json::from_str("\"offline\"").unwrap();
        assert_eq!(parsed, ConnectivityStatus::Offline);
    }
}
