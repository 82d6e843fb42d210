//! Device identity derived from the ESP32 station MAC address.
//!
//! ESP-NOW addresses peers by station MAC, so this is also the address the
//! other device must have configured.  The short ID `MW-XXYYZZ` (last three
//! bytes, uppercase hex) goes into the boot banner.

use crate::radio::transport::MacAddress;

/// Fixed-size device ID string: "MW-XXYYZZ".
pub type DeviceIdString = heapless::String<16>;

/// Read the WiFi station MAC.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_read_mac(
            mac.as_mut_ptr(),
            esp_idf_svc::sys::esp_mac_type_t_ESP_MAC_WIFI_STA,
        );
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Format: `MW-XXYYZZ` (e.g., `MW-EFCAFE`).
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    use core::fmt::Write;
    let _ = write!(id, "MW-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_format() {
        let mac = [0x00, 0x11, 0x22, 0xAA, 0xBB, 0xCC];
        assert_eq!(device_id(&mac).as_str(), "MW-AABBCC");
    }

    #[test]
    fn device_id_from_sim_mac() {
        let mac = read_mac();
        assert_eq!(read_mac(), mac);
        assert_eq!(device_id(&mac).as_str(), "MW-EFCAFE");
    }

    #[test]
    fn configured_node_ids() {
        assert_eq!(device_id(&crate::config::SENSOR_MAC).as_str(), "MW-0D82EC");
        assert_eq!(device_id(&crate::config::MASTER_MAC).as_str(), "MW-0BE150");
    }
}
