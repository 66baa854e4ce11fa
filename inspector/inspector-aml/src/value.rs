//! Values produced by static evaluation.

use core::fmt;

use crate::namespace::NodeId;

/// Why an expression could not be evaluated without running the platform.
///
/// This is not a load failure. Consumers treat an unresolved result as
/// "unknown" and stay conservative.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unresolved {
    #[error("{0} is not statically evaluable")]
    Unsupported(&'static str),
    #[error("undefined name {0}")]
    Undefined(String),
    #[error("{0} is backed by an operation region")]
    Region(String),
    #[error("cannot convert {from} to {to}")]
    Conversion { from: &'static str, to: &'static str },
    #[error("{0} was never parsed")]
    Deferred(String),
    #[error("call depth limit reached when calling {0}")]
    Depth(String),
    #[error("while loop exceeded {0} iterations")]
    LoopBudget(usize),
    #[error("division by zero")]
    DivideByZero,
    #[error("index {index} out of range for {len} element(s)")]
    OutOfRange { index: u64, len: usize },
    #[error("read of an uninitialized object")]
    Uninitialized,
}

/// Where a buffer lives, so a field created over it can write back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Named(NodeId),
    Local { frame: usize, index: u8 },
    Arg { frame: usize, index: u8 },
}

/// A bit range over a buffer, created by `CreateXField`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferField {
    pub location: Location,
    pub bit_offset: u64,
    pub bit_width: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Named(NodeId),
    Element { container: Box<Value>, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    #[default]
    Uninitialized,
    Integer(u64),
    String(String),
    Buffer(Vec<u8>),
    Package(Vec<Value>),
    /// A named object without a data value: device, mutex, region, method.
    Object(NodeId),
    BufferField(BufferField),
    Reference(Reference),
}

/// Logical true as produced by the comparison operators.
pub const TRUE: u64 = u64::MAX;

impl Value {
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Integer(_) => "integer",
            Self::String(_) => "string",
            Self::Buffer(_) => "buffer",
            Self::Package(_) => "package",
            Self::Object(_) => "object",
            Self::BufferField(_) => "buffer field",
            Self::Reference(_) => "reference",
        }
    }

    #[must_use]
    pub const fn from_bool(b: bool) -> Self {
        Self::Integer(if b { TRUE } else { 0 })
    }

    #[must_use]
    pub const fn as_integer(&self) -> Option<u64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Implicit conversion to an integer.
    ///
    /// Buffers contribute their first eight bytes, little-endian. Strings are
    /// read as hexadecimal.
    ///
    /// # Errors
    /// [`Unresolved::Conversion`] for values without an integer form.
    pub fn to_integer(&self) -> Result<u64, Unresolved> {
        match self {
            Self::Integer(v) => Ok(*v),
            Self::Buffer(b) => Ok(buffer_integer(b)),
            Self::String(s) => parse_radix(s.trim(), 16).ok_or_else(|| self.conversion("integer")),
            Self::Uninitialized => Err(Unresolved::Uninitialized),
            _ => Err(self.conversion("integer")),
        }
    }

    /// `ToInteger`: strings with a `0x` prefix are hexadecimal, others decimal.
    ///
    /// # Errors
    /// [`Unresolved::Conversion`] for values without an integer form.
    pub fn to_integer_explicit(&self) -> Result<u64, Unresolved> {
        match self {
            Self::String(s) => {
                let s = s.trim();
                let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    Some(hex) => parse_radix(hex, 16),
                    None => parse_radix(s, 10),
                };
                parsed.ok_or_else(|| self.conversion("integer"))
            }
            other => other.to_integer(),
        }
    }

    /// # Errors
    /// [`Unresolved::Conversion`] for values without a buffer form.
    pub fn to_buffer(&self) -> Result<Vec<u8>, Unresolved> {
        match self {
            Self::Integer(v) => Ok(v.to_le_bytes().to_vec()),
            Self::Buffer(b) => Ok(b.clone()),
            Self::String(s) => {
                let mut b = s.as_bytes().to_vec();
                b.push(0);
                Ok(b)
            }
            Self::Uninitialized => Err(Unresolved::Uninitialized),
            _ => Err(self.conversion("buffer")),
        }
    }

    /// # Errors
    /// [`Unresolved::Conversion`] for values without a string form.
    pub fn to_hex_string(&self) -> Result<String, Unresolved> {
        match self {
            Self::Integer(v) => Ok(format!("{v:x}")),
            Self::String(s) => Ok(s.clone()),
            Self::Buffer(b) => Ok(b.iter().map(|x| format!("{x:x}")).collect::<Vec<_>>().join(",")),
            Self::Uninitialized => Err(Unresolved::Uninitialized),
            _ => Err(self.conversion("string")),
        }
    }

    /// # Errors
    /// [`Unresolved::Conversion`] for values without a string form.
    pub fn to_decimal_string(&self) -> Result<String, Unresolved> {
        match self {
            Self::Integer(v) => Ok(v.to_string()),
            Self::String(s) => Ok(s.clone()),
            Self::Buffer(b) => Ok(b.iter().map(u8::to_string).collect::<Vec<_>>().join(",")),
            Self::Uninitialized => Err(Unresolved::Uninitialized),
            _ => Err(self.conversion("string")),
        }
    }

    /// Implicit conversion to a string, as used by `Concatenate`.
    ///
    /// # Errors
    /// [`Unresolved::Conversion`] for values without a string form.
    pub fn to_string_implicit(&self) -> Result<String, Unresolved> {
        match self {
            Self::Integer(v) => Ok(format!("{v:016X}")),
            other => other.to_hex_string(),
        }
    }

    const fn conversion(&self, to: &'static str) -> Unresolved {
        Unresolved::Conversion {
            from: self.type_name(),
            to,
        }
    }
}

fn buffer_integer(b: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    let n = b.len().min(8);
    bytes[..n].copy_from_slice(&b[..n]);
    u64::from_le_bytes(bytes)
}

fn parse_radix(s: &str, radix: u32) -> Option<u64> {
    u64::from_str_radix(s, radix).ok()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("<uninitialized>"),
            Self::Integer(v) => write!(f, "{v:#x}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Buffer(b) => {
                f.write_str("Buffer {")?;
                for (i, x) in b.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {x:#04x}")?;
                }
                f.write_str(" }")
            }
            Self::Package(p) => {
                f.write_str("Package {")?;
                for (i, v) in p.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {v}")?;
                }
                f.write_str(" }")
            }
            Self::Object(id) => write!(f, "<object {id}>"),
            Self::BufferField(bf) => write!(f, "<field {}:{}>", bf.bit_offset, bf.bit_width),
            Self::Reference(_) => f.write_str("<reference>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_integer_conversions() {
        assert_eq!(Value::Buffer(vec![0x34, 0x12]).to_integer(), Ok(0x1234));
        assert_eq!(Value::Buffer((1..=10).collect()).to_integer(), Ok(0x0807_0605_0403_0201));
        assert_eq!(Value::String("1F".into()).to_integer(), Ok(0x1F));
        assert!(Value::Package(vec![]).to_integer().is_err());
        assert_eq!(Value::Uninitialized.to_integer(), Err(Unresolved::Uninitialized));
    }

    #[test]
    fn explicit_integer_conversion_honours_prefix() {
        assert_eq!(Value::String("0x10".into()).to_integer_explicit(), Ok(16));
        assert_eq!(Value::String("10".into()).to_integer_explicit(), Ok(10));
        assert!(Value::String("zz".into()).to_integer_explicit().is_err());
    }

    #[test]
    fn string_forms() {
        assert_eq!(Value::Integer(0xAB).to_hex_string().unwrap(), "ab");
        assert_eq!(Value::Buffer(vec![1, 0x1F]).to_hex_string().unwrap(), "1,1f");
        assert_eq!(Value::Integer(42).to_decimal_string().unwrap(), "42");
        assert_eq!(Value::String("ab".into()).to_buffer().unwrap(), b"ab\0");
    }

    #[test]
    fn display_is_asl_like() {
        let v = Value::Package(vec![Value::Integer(1), Value::Buffer(vec![0xA])]);
        assert_eq!(v.to_string(), "Package { 0x1, Buffer { 0x0a } }");
    }
}
