//! PCI interrupt routing tables returned by `_PRT`.

use core::fmt;

use log::debug;

use crate::namespace::Namespace;
use crate::value::{Reference, Value};

/// What a PCI interrupt pin is wired to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingSource {
    /// Hard-wired to the global system interrupt in
    /// [`PrtEntry::source_index`].
    Gsi,
    /// Routed through a link device; the index selects one of its
    /// interrupts.
    Link(String),
}

/// One `Package { Address, Pin, Source, SourceIndex }` of a `_PRT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrtEntry {
    /// Device number in the upper word, `0xFFFF` in the lower.
    pub address: u64,
    /// 0 for INTA# through 3 for INTD#.
    pub pin: u8,
    pub source: RoutingSource,
    pub source_index: u64,
}

impl PrtEntry {
    #[must_use]
    pub const fn device(&self) -> u64 {
        self.address >> 16
    }

    #[must_use]
    pub const fn pin_name(&self) -> &'static str {
        match self.pin {
            0 => "INTA#",
            1 => "INTB#",
            2 => "INTC#",
            3 => "INTD#",
            _ => "INT?#",
        }
    }
}

impl fmt::Display for PrtEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x} {} -> ", self.address, self.pin_name())?;
        match &self.source {
            RoutingSource::Gsi => write!(f, "GSI {}", self.source_index),
            RoutingSource::Link(path) => write!(f, "{path}[{}]", self.source_index),
        }
    }
}

/// Decodes the value of a `_PRT` object.
///
/// Malformed mappings are skipped with a debug message.
#[must_use]
pub fn decode(namespace: &Namespace, value: &Value) -> Vec<PrtEntry> {
    let Value::Package(mappings) = value else {
        debug!("_PRT is a {}, not a package", value.type_name());
        return Vec::new();
    };
    mappings.iter().filter_map(|m| mapping(namespace, m)).collect()
}

fn mapping(namespace: &Namespace, value: &Value) -> Option<PrtEntry> {
    let Value::Package(fields) = value else {
        debug!("skipping _PRT mapping of type {}", value.type_name());
        return None;
    };
    let [address, pin, source, source_index] = fields.as_slice() else {
        debug!("skipping _PRT mapping with {} fields", fields.len());
        return None;
    };
    let address = address.to_integer().ok()?;
    let pin = u8::try_from(pin.to_integer().ok()?).ok()?;
    let source_index = source_index.to_integer().ok()?;
    let source = match source {
        Value::Integer(0) => RoutingSource::Gsi,
        Value::Reference(Reference::Named(node)) => RoutingSource::Link(namespace.path(*node)),
        Value::String(path) => RoutingSource::Link(path.clone()),
        other => {
            debug!("skipping _PRT mapping with source {other}");
            return None;
        }
    };
    Some(PrtEntry {
        address,
        pin,
        source,
        source_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: Value, index: u64) -> Value {
        Value::Package(vec![
            Value::Integer(0x001F_FFFF),
            Value::Integer(1),
            source,
            Value::Integer(index),
        ])
    }

    #[test]
    fn gsi_and_link_sources() {
        let ns = Namespace::new();
        let sb = ns.lookup_path("\\_SB").unwrap();
        let prt = Value::Package(vec![
            entry(Value::Integer(0), 17),
            entry(Value::Reference(Reference::Named(sb)), 0),
            entry(Value::String("\\_SB.LNKA".into()), 0),
        ]);
        let routes = decode(&ns, &prt);
        assert_eq!(routes.len(), 3);
        assert_eq!(routes[0].source, RoutingSource::Gsi);
        assert_eq!(routes[0].device(), 0x1F);
        assert_eq!(routes[0].pin_name(), "INTB#");
        assert_eq!(routes[1].source, RoutingSource::Link("\\_SB_".into()));
        assert_eq!(routes[0].to_string(), "0x1fffff INTB# -> GSI 17");
    }

    #[test]
    fn malformed_mappings_are_skipped() {
        let ns = Namespace::new();
        let prt = Value::Package(vec![
            Value::Integer(3),
            Value::Package(vec![Value::Integer(0)]),
            entry(Value::Integer(5), 0),
        ]);
        assert!(decode(&ns, &prt).is_empty());
        assert!(decode(&ns, &Value::Integer(0)).is_empty());
    }
}
