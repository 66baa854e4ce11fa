//! Identification data of the devices left in the namespace.

use inspector_acpi::resource::{self, ResourceItem};
use log::{debug, info};

use crate::context::Context;
use crate::interpreter::Interpreter;
use crate::namespace::NodeId;
use crate::prt::{self, PrtEntry};
use crate::value::{Unresolved, Value};

const STA_PRESENT: u64 = 1 << 0;
const STA_ENABLED: u64 = 1 << 1;
const STA_FUNCTIONING: u64 = 1 << 3;

/// Decodes a compressed EISA ID such as `0x030AD041` into `PNP0A03`.
///
/// Returns `None` when the manufacturer letters are out of range; callers
/// fall back to the hexadecimal value.
#[must_use]
pub fn eisa_id(id: u64) -> Option<String> {
    let id = id & 0xFFFF_FFFF;
    let letters = [
        (id & 0x7C) >> 2,
        ((id & 0x3) << 3) | ((id & 0xE000) >> 13),
        (id & 0x1F00) >> 8,
    ];
    if letters.iter().any(|&c| c > 26) {
        return None;
    }
    let digits = [
        (id & 0x00F0_0000) >> 20,
        (id & 0x000F_0000) >> 16,
        (id & 0xF000_0000) >> 28,
        (id & 0x0F00_0000) >> 24,
    ];
    let mut s: String = letters
        .iter()
        .filter_map(|&c| u8::try_from(c + 0x40).ok())
        .map(char::from)
        .collect();
    for d in digits {
        s.push(char::from_digit(u32::try_from(d).ok()?, 16)?.to_ascii_uppercase());
    }
    Some(s)
}

/// What the namespace says about one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub node: NodeId,
    pub path: String,
    /// `_STA`, if it evaluates statically.
    pub status: Option<u64>,
    pub hid: Option<String>,
    pub cids: Vec<String>,
    pub uid: Option<String>,
    pub adr: Option<u64>,
    pub bbn: Option<u64>,
    /// `_STR` decoded from UTF-16.
    pub description: Option<String>,
    pub resources: Vec<ResourceItem>,
    pub routing: Vec<PrtEntry>,
}

impl DeviceInfo {
    /// Whether `_STA` reports the device present. Unknown counts as present.
    #[must_use]
    pub fn present(&self) -> bool {
        self.status.is_none_or(|s| s & STA_PRESENT != 0)
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.status.is_none_or(|s| s & STA_ENABLED != 0)
    }

    #[must_use]
    pub fn functioning(&self) -> bool {
        self.status.is_none_or(|s| s & STA_FUNCTIONING != 0)
    }
}

/// Collects [`DeviceInfo`] for every live device, sorted by path.
///
/// `\_PIC(1)` is called first so that routing tables report APIC mode, and
/// every device's `_INI` runs before its other objects are read. With
/// `check_status`, devices whose `_STA` clears the present bit are left out.
pub fn extract_devices(ctx: &mut Context, check_status: bool) -> Vec<DeviceInfo> {
    let mut interpreter = ctx.interpreter();
    if let Some(pic) = interpreter.namespace().lookup_path("\\_PIC")
        && let Err(e) = interpreter.call(pic, vec![Value::Integer(1)])
    {
        info!("cannot switch to APIC mode: {e}");
    }

    let mut devices: Vec<DeviceInfo> = interpreter
        .namespace()
        .devices()
        .into_iter()
        .filter_map(|node| device_info(&mut interpreter, node, check_status))
        .collect();
    devices.sort_by(|a, b| a.path.cmp(&b.path));
    devices
}

fn device_info(interpreter: &mut Interpreter<'_>, node: NodeId, check_status: bool) -> Option<DeviceInfo> {
    let path = interpreter.namespace().path(node);
    match interpreter.evaluate_child(node, "_INI") {
        Some(Err(Unresolved::Undefined(_))) | None | Some(Ok(_)) => {}
        Some(Err(e)) => debug!("{path}._INI: {e}"),
    }

    let status = integer(interpreter, node, &path, "_STA");
    if check_status && status.is_some_and(|s| s & STA_PRESENT == 0) {
        debug!("{path} is not present");
        return None;
    }

    let hid = object(interpreter, node, &path, "_HID").map(|v| identifier(&v).unwrap_or_else(|| "<unknown>".into()));
    let cids = match object(interpreter, node, &path, "_CID") {
        Some(Value::Package(ids)) => ids.iter().filter_map(identifier).collect(),
        Some(v) => identifier(&v).into_iter().collect(),
        None => Vec::new(),
    };
    let uid = object(interpreter, node, &path, "_UID").and_then(|v| match v {
        Value::Integer(i) => Some(i.to_string()),
        Value::String(s) => Some(s),
        _ => None,
    });
    let description = object(interpreter, node, &path, "_STR").and_then(|v| match v {
        Value::Buffer(b) => Some(utf16(&b)),
        _ => None,
    });
    let adr = integer(interpreter, node, &path, "_ADR");
    let bbn = if status.is_none_or(|s| s & STA_PRESENT != 0) {
        integer(interpreter, node, &path, "_BBN")
    } else {
        None
    };
    let resources = match object(interpreter, node, &path, "_CRS") {
        Some(Value::Buffer(b)) => resource::decode(&b),
        _ => Vec::new(),
    };
    let routing = object(interpreter, node, &path, "_PRT")
        .map(|v| prt::decode(interpreter.namespace(), &v))
        .unwrap_or_default();

    Some(DeviceInfo {
        node,
        path,
        status,
        hid,
        cids,
        uid,
        adr,
        bbn,
        description,
        resources,
        routing,
    })
}

fn object(interpreter: &mut Interpreter<'_>, node: NodeId, path: &str, name: &str) -> Option<Value> {
    match interpreter.evaluate_child(node, name)? {
        Ok(v) => Some(v),
        Err(e) => {
            debug!("{path}.{name}: {e}");
            None
        }
    }
}

fn integer(interpreter: &mut Interpreter<'_>, node: NodeId, path: &str, name: &str) -> Option<u64> {
    object(interpreter, node, path, name).and_then(|v| v.as_integer())
}

/// A hardware ID: a string as is, an integer as an EISA ID or in hex.
fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(eisa_id(*i).unwrap_or_else(|| format!("{i:#x}"))),
        _ => None,
    }
}

fn utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units).trim_end_matches('\0').to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eisa_ids() {
        assert_eq!(eisa_id(0x030A_D041).as_deref(), Some("PNP0A03"));
        assert_eq!(eisa_id(0x0C09_D041).as_deref(), Some("PNP090C"));
        assert_eq!(eisa_id(0x7F), None);
    }

    #[test]
    fn identifiers_fall_back_to_hex() {
        assert_eq!(identifier(&Value::String("ACPI0007".into())).as_deref(), Some("ACPI0007"));
        assert_eq!(identifier(&Value::Integer(0x7F)).as_deref(), Some("0x7f"));
        assert_eq!(identifier(&Value::Buffer(vec![])), None);
    }

    #[test]
    fn utf16_description() {
        let bytes: Vec<u8> = "COM1\0".encode_utf16().flat_map(u16::to_le_bytes).collect();
        assert_eq!(utf16(&bytes), "COM1");
    }

    #[test]
    fn status_bits() {
        let mut d = DeviceInfo {
            node: crate::namespace::Namespace::new().root(),
            path: "\\".into(),
            status: None,
            hid: None,
            cids: Vec::new(),
            uid: None,
            adr: None,
            bbn: None,
            description: None,
            resources: Vec::new(),
            routing: Vec::new(),
        };
        assert!(d.present() && d.enabled() && d.functioning());
        d.status = Some(0x0B);
        assert!(d.present() && d.enabled() && d.functioning());
        d.status = Some(0x08);
        assert!(!d.present() && !d.enabled() && d.functioning());
    }
}
