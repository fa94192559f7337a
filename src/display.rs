//! Display payloads returned by TRMNL and BYOS servers.
//!
//! These mirror what the server sends to the device firmware.
//! See: <https://github.com/usetrmnl/trmnl-firmware>

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::{DEFAULT_REFRESH_SECS, MIN_REFRESH_SECS};

/// Response for GET /api/current_screen.
///
/// Describes the image the device is showing right now. Fetching it does
/// not advance the device playlist.
///
/// # Example
///
/// ```
/// use trmnl_mirror::CurrentScreen;
///
/// let json = r#"{"status":200,"image_url":"https://example.com/a.png","filename":"a","refresh_rate":900}"#;
/// let screen: CurrentScreen = serde_json::from_str(json).unwrap();
///
/// assert!(screen.is_ok());
/// assert_eq!(screen.refresh_interval().as_secs(), 900);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentScreen {
    /// Status code (0 or 200 = success)
    #[serde(default)]
    pub status: u32,

    /// Full URL to the display image
    #[serde(default)]
    pub image_url: String,

    /// Filename used by firmware for change detection
    #[serde(default)]
    pub filename: Option<String>,

    /// Refresh rate in seconds
    #[serde(default, deserialize_with = "deserialize_refresh_rate")]
    pub refresh_rate: Option<u32>,

    /// When the image was rendered (server-formatted timestamp)
    #[serde(default)]
    pub rendered_at: Option<String>,

    /// Error message, if the server could not provide an image
    #[serde(default)]
    pub error: Option<String>,
}

impl CurrentScreen {
    /// Whether the payload carries a usable image.
    pub fn is_ok(&self) -> bool {
        is_success_status(self.status) && !self.image_url.is_empty()
    }

    /// How long to wait before polling again.
    ///
    /// Falls back to 5 minutes when the server sends no rate.
    pub fn refresh_interval(&self) -> Duration {
        refresh_interval(self.refresh_rate)
    }
}

/// Response for GET /api/display.
///
/// This is what the device itself receives. On the hosted API, fetching it
/// advances the playlist; BYOS servers may only implement this endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DisplayResponse {
    /// Status code (0 = success)
    #[serde(default)]
    pub status: u32,

    /// Full URL to the display image
    #[serde(default)]
    pub image_url: String,

    /// Filename for change detection.
    ///
    /// If it matches the previous filename the image has not changed.
    #[serde(default)]
    pub filename: Option<String>,

    /// Refresh rate in seconds.
    ///
    /// Firmware servers usually send this as a string; numbers are accepted too.
    #[serde(default, deserialize_with = "deserialize_refresh_rate")]
    pub refresh_rate: Option<u32>,

    /// Whether the device should update firmware
    #[serde(default)]
    pub update_firmware: bool,

    /// URL to firmware binary (if update_firmware is true)
    #[serde(default)]
    pub firmware_url: Option<String>,

    /// Whether the device should reset
    #[serde(default)]
    pub reset_firmware: bool,

    /// Error message, if the server could not provide an image
    #[serde(default)]
    pub error: Option<String>,
}

impl DisplayResponse {
    /// Whether the payload carries a usable image.
    pub fn is_ok(&self) -> bool {
        is_success_status(self.status) && !self.image_url.is_empty()
    }

    /// How long to wait before polling again.
    pub fn refresh_interval(&self) -> Duration {
        refresh_interval(self.refresh_rate)
    }

    /// Whether the image changed compared to a previously seen filename.
    pub fn is_new_image(&self, previous_filename: Option<&str>) -> bool {
        match (self.filename.as_deref(), previous_filename) {
            (Some(current), Some(previous)) => current != previous,
            _ => true,
        }
    }
}

/// Device headers sent with GET /api/display.
///
/// BYOS servers identify the device by these headers:
/// - `ID`: MAC address
/// - `Battery-Voltage`: Battery voltage as float (e.g., "4.2")
/// - `FW-Version`: Firmware version string
/// - `RSSI`: WiFi signal strength in dBm
/// - `Refresh-Rate`: Current refresh rate in seconds
///
/// # Example
///
/// ```
/// use trmnl_mirror::DeviceInfo;
///
/// let device = DeviceInfo::new("AA:BB:CC:DD:EE:FF")
///     .with_firmware_version("1.5.2")
///     .with_rssi(-50);
///
/// let headers = device.headers();
/// assert_eq!(headers[0], ("ID", "AA:BB:CC:DD:EE:FF".to_string()));
/// assert_eq!(headers.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceInfo {
    /// Device MAC address
    pub mac_address: String,

    /// Battery voltage in volts
    pub battery_voltage: Option<f32>,

    /// Firmware version
    pub firmware_version: Option<String>,

    /// WiFi signal strength in dBm
    pub rssi: Option<i32>,

    /// Current refresh rate in seconds
    pub refresh_rate: Option<u32>,
}

impl DeviceInfo {
    /// Create new device info with MAC address.
    pub fn new(mac_address: impl Into<String>) -> Self {
        Self {
            mac_address: mac_address.into(),
            ..Default::default()
        }
    }

    /// Set battery voltage.
    #[must_use]
    pub fn with_battery_voltage(mut self, voltage: f32) -> Self {
        self.battery_voltage = Some(voltage);
        self
    }

    /// Set firmware version.
    #[must_use]
    pub fn with_firmware_version(mut self, version: impl Into<String>) -> Self {
        self.firmware_version = Some(version.into());
        self
    }

    /// Set WiFi RSSI.
    #[must_use]
    pub fn with_rssi(mut self, rssi: i32) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Set refresh rate.
    #[must_use]
    pub fn with_refresh_rate(mut self, rate: u32) -> Self {
        self.refresh_rate = Some(rate);
        self
    }

    /// Header name/value pairs for the fields that are set.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("ID", self.mac_address.clone())];

        if let Some(voltage) = self.battery_voltage {
            headers.push(("Battery-Voltage", format!("{:.2}", voltage)));
        }
        if let Some(version) = &self.firmware_version {
            headers.push(("FW-Version", version.clone()));
        }
        if let Some(rssi) = self.rssi {
            headers.push(("RSSI", rssi.to_string()));
        }
        if let Some(rate) = self.refresh_rate {
            headers.push(("Refresh-Rate", rate.to_string()));
        }

        headers
    }
}

fn is_success_status(status: u32) -> bool {
    matches!(status, 0 | 200)
}

fn refresh_interval(rate: Option<u32>) -> Duration {
    let secs = rate.unwrap_or(DEFAULT_REFRESH_SECS).max(MIN_REFRESH_SECS);
    Duration::from_secs(u64::from(secs))
}

/// Accept `"900"`, `900` or `null`.
fn deserialize_refresh_rate<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => Ok(s.trim().parse().ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_screen_parsing() {
        let json = r#"{
            "status": 200,
            "refresh_rate": 1800,
            "image_url": "https://usetrmnl.com/plugin-renders/abc.png",
            "filename": "plugin-abc-1700000000",
            "rendered_at": "2024-11-14T12:00:00Z"
        }"#;
        let screen: CurrentScreen = serde_json::from_str(json).unwrap();

        assert!(screen.is_ok());
        assert_eq!(screen.refresh_rate, Some(1800));
        assert_eq!(screen.filename.as_deref(), Some("plugin-abc-1700000000"));
        assert_eq!(screen.refresh_interval(), Duration::from_secs(1800));
    }

    #[test]
    fn test_current_screen_error_payload() {
        let json = r#"{"status": 500, "error": "Device not found"}"#;
        let screen: CurrentScreen = serde_json::from_str(json).unwrap();

        assert!(!screen.is_ok());
        assert_eq!(screen.error.as_deref(), Some("Device not found"));
        assert_eq!(screen.refresh_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_display_response_string_refresh_rate() {
        let json = r#"{
            "status": 0,
            "image_url": "https://example.com/screen.png",
            "filename": "screen.png",
            "update_firmware": false,
            "firmware_url": null,
            "refresh_rate": "120",
            "reset_firmware": false
        }"#;
        let response: DisplayResponse = serde_json::from_str(json).unwrap();

        assert!(response.is_ok());
        assert_eq!(response.refresh_rate, Some(120));
        assert!(!response.update_firmware);
    }

    #[test]
    fn test_refresh_rate_variants() {
        let parse = |json: &str| serde_json::from_str::<DisplayResponse>(json).unwrap().refresh_rate;

        assert_eq!(parse(r#"{"refresh_rate": 60}"#), Some(60));
        assert_eq!(parse(r#"{"refresh_rate": " 60 "}"#), Some(60));
        assert_eq!(parse(r#"{"refresh_rate": "soon"}"#), None);
        assert_eq!(parse(r#"{"refresh_rate": null}"#), None);
        assert_eq!(parse(r#"{}"#), None);
    }

    #[test]
    fn test_refresh_interval_floor() {
        let response: DisplayResponse = serde_json::from_str(r#"{"refresh_rate": 0}"#).unwrap();
        assert_eq!(response.refresh_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_empty_image_url_is_not_ok() {
        let response: DisplayResponse = serde_json::from_str(r#"{"status": 0}"#).unwrap();
        assert!(!response.is_ok());
    }

    #[test]
    fn test_is_new_image() {
        let response: DisplayResponse =
            serde_json::from_str(r#"{"image_url": "x", "filename": "b.png"}"#).unwrap();

        assert!(response.is_new_image(Some("a.png")));
        assert!(!response.is_new_image(Some("b.png")));
        assert!(response.is_new_image(None));
    }

    #[test]
    fn test_device_headers() {
        let device = DeviceInfo::new("AA:BB:CC:DD:EE:FF")
            .with_battery_voltage(4.2)
            .with_firmware_version("1.0.0")
            .with_rssi(-50)
            .with_refresh_rate(900);

        let headers = device.headers();
        assert_eq!(
            headers,
            vec![
                ("ID", "AA:BB:CC:DD:EE:FF".to_string()),
                ("Battery-Voltage", "4.20".to_string()),
                ("FW-Version", "1.0.0".to_string()),
                ("RSSI", "-50".to_string()),
                ("Refresh-Rate", "900".to_string()),
            ]
        );
    }
}
