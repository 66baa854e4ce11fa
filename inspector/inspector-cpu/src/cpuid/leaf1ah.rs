use super::CpuidResult;

pub const LEAF_1AH: u32 = 0x1A;

/// CPUID.1AH: hybrid core type of the executing logical processor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Leaf1Ah {
    pub core_type: CoreType,
    /// Native model ID (EAX 23:0).
    pub native_model_id: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CoreType {
    Atom,
    Core,
    Reserved(u8),
}

impl CoreType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Atom => "Atom",
            Self::Core => "Core",
            Self::Reserved(_) => "Reserved",
        }
    }
}

impl Leaf1Ah {
    #[must_use]
    pub const fn from(r: CpuidResult) -> Self {
        let core_type = match r.eax.to_le_bytes()[3] {
            0x20 => CoreType::Atom,
            0x40 => CoreType::Core,
            other => CoreType::Reserved(other),
        };
        Self {
            core_type,
            native_model_id: r.eax & 0x00FF_FFFF,
        }
    }
}
