//! Advertising-data (AD structure) parsing.

use crate::config::BLE_MAX_NAME_LEN;
use heapless::String;

/// AD type: Complete Local Name.
const AD_TYPE_NAME_COMPLETE: u8 = 0x09;

/// Find the payload of the first AD structure of type `wanted`.
///
/// A zero length byte or a structure running past the buffer ends parsing.
pub fn find_ad_structure(data: &[u8], wanted: u8) -> Option<&[u8]> {
    let mut i = 0;
    while i < data.len() {
        let len = data[i] as usize;
        if len == 0 || i + len >= data.len() {
            break;
        }
        let ad_type = data[i + 1];
        if ad_type == wanted {
            return Some(&data[i + 2..i + 1 + len]);
        }
        i += len + 1;
    }
    None
}

/// Extract the complete local name, if the advertiser sent one.
///
/// Shortened names (0x08) are not accepted. The name stops at the first
/// NUL byte and is truncated to 32 bytes.
pub fn complete_local_name(data: &[u8]) -> Option<String<BLE_MAX_NAME_LEN>> {
    let raw = find_ad_structure(data, AD_TYPE_NAME_COMPLETE)?;
    let raw = raw.split(|&b| b == 0).next().unwrap_or(&[]);
    if raw.is_empty() {
        return None;
    }

    let mut name = String::new();
    for &b in raw {
        let c = if b.is_ascii() { b as char } else { '?' };
        if name.push(c).is_err() {
            break;
        }
    }
    Some(name)
}
