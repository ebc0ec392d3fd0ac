use core::fmt::Write as _;

use heapless::String;

/// Cloud identity of the device: its station MAC as 12 lowercase hex digits.
pub type DeviceId = String<12>;

pub fn device_id_from_mac(mac: [u8; 6]) -> DeviceId {
    let mut id = DeviceId::new();
    for byte in mac {
        let _ = write!(id, "{:02x}", byte);
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_from_mac() {
        let id = device_id_from_mac([0x84, 0xF7, 0x03, 0x0A, 0xB1, 0x5C]);
        assert_eq!(id.as_str(), "84f7030ab15c");
    }
}
