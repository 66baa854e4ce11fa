//! AML opcode values and the operand shapes of the generic operators.
//!
//! Single-byte opcodes are their own value. Extended opcodes (prefix `0x5B`)
//! are `0x5B00 | second byte`.

pub const EXT_PREFIX: u8 = 0x5B;

pub const ZERO: u16 = 0x00;
pub const ONE: u16 = 0x01;
pub const ALIAS: u16 = 0x06;
pub const NAME: u16 = 0x08;
pub const BYTE_PREFIX: u16 = 0x0A;
pub const WORD_PREFIX: u16 = 0x0B;
pub const DWORD_PREFIX: u16 = 0x0C;
pub const STRING_PREFIX: u16 = 0x0D;
pub const QWORD_PREFIX: u16 = 0x0E;
pub const SCOPE: u16 = 0x10;
pub const BUFFER: u16 = 0x11;
pub const PACKAGE: u16 = 0x12;
pub const VAR_PACKAGE: u16 = 0x13;
pub const METHOD: u16 = 0x14;
pub const EXTERNAL: u16 = 0x15;
pub const LOCAL0: u16 = 0x60;
pub const LOCAL7: u16 = 0x67;
pub const ARG0: u16 = 0x68;
pub const ARG6: u16 = 0x6E;
pub const STORE: u16 = 0x70;
pub const REF_OF: u16 = 0x71;
pub const ADD: u16 = 0x72;
pub const CONCAT: u16 = 0x73;
pub const SUBTRACT: u16 = 0x74;
pub const INCREMENT: u16 = 0x75;
pub const DECREMENT: u16 = 0x76;
pub const MULTIPLY: u16 = 0x77;
pub const DIVIDE: u16 = 0x78;
pub const SHIFT_LEFT: u16 = 0x79;
pub const SHIFT_RIGHT: u16 = 0x7A;
pub const AND: u16 = 0x7B;
pub const NAND: u16 = 0x7C;
pub const OR: u16 = 0x7D;
pub const NOR: u16 = 0x7E;
pub const XOR: u16 = 0x7F;
pub const NOT: u16 = 0x80;
pub const FIND_SET_LEFT_BIT: u16 = 0x81;
pub const FIND_SET_RIGHT_BIT: u16 = 0x82;
pub const DEREF_OF: u16 = 0x83;
pub const CONCAT_RES: u16 = 0x84;
pub const MOD: u16 = 0x85;
pub const NOTIFY: u16 = 0x86;
pub const SIZE_OF: u16 = 0x87;
pub const INDEX: u16 = 0x88;
pub const MATCH: u16 = 0x89;
pub const CREATE_DWORD_FIELD: u16 = 0x8A;
pub const CREATE_WORD_FIELD: u16 = 0x8B;
pub const CREATE_BYTE_FIELD: u16 = 0x8C;
pub const CREATE_BIT_FIELD: u16 = 0x8D;
pub const OBJECT_TYPE: u16 = 0x8E;
pub const CREATE_QWORD_FIELD: u16 = 0x8F;
pub const LAND: u16 = 0x90;
pub const LOR: u16 = 0x91;
pub const LNOT: u16 = 0x92;
pub const LEQUAL: u16 = 0x93;
pub const LGREATER: u16 = 0x94;
pub const LLESS: u16 = 0x95;
pub const TO_BUFFER: u16 = 0x96;
pub const TO_DECIMAL_STRING: u16 = 0x97;
pub const TO_HEX_STRING: u16 = 0x98;
pub const TO_INTEGER: u16 = 0x99;
pub const TO_STRING: u16 = 0x9C;
pub const COPY_OBJECT: u16 = 0x9D;
pub const MID: u16 = 0x9E;
pub const CONTINUE: u16 = 0x9F;
pub const IF: u16 = 0xA0;
pub const ELSE: u16 = 0xA1;
pub const WHILE: u16 = 0xA2;
pub const NOOP: u16 = 0xA3;
pub const RETURN: u16 = 0xA4;
pub const BREAK: u16 = 0xA5;
pub const BREAK_POINT: u16 = 0xCC;
pub const ONES: u16 = 0xFF;

pub const MUTEX: u16 = 0x5B01;
pub const EVENT: u16 = 0x5B02;
pub const COND_REF_OF: u16 = 0x5B12;
pub const CREATE_FIELD: u16 = 0x5B13;
pub const LOAD_TABLE: u16 = 0x5B1F;
pub const LOAD: u16 = 0x5B20;
pub const STALL: u16 = 0x5B21;
pub const SLEEP: u16 = 0x5B22;
pub const ACQUIRE: u16 = 0x5B23;
pub const SIGNAL: u16 = 0x5B24;
pub const WAIT: u16 = 0x5B25;
pub const RESET: u16 = 0x5B26;
pub const RELEASE: u16 = 0x5B27;
pub const FROM_BCD: u16 = 0x5B28;
pub const TO_BCD: u16 = 0x5B29;
pub const UNLOAD: u16 = 0x5B2A;
pub const REVISION: u16 = 0x5B30;
pub const DEBUG: u16 = 0x5B31;
pub const FATAL: u16 = 0x5B32;
pub const TIMER: u16 = 0x5B33;
pub const OP_REGION: u16 = 0x5B80;
pub const FIELD: u16 = 0x5B81;
pub const DEVICE: u16 = 0x5B82;
pub const PROCESSOR: u16 = 0x5B83;
pub const POWER_RES: u16 = 0x5B84;
pub const THERMAL_ZONE: u16 = 0x5B85;
pub const INDEX_FIELD: u16 = 0x5B86;
pub const BANK_FIELD: u16 = 0x5B87;
pub const DATA_REGION: u16 = 0x5B88;

/// Name prefixes and lead characters.
pub const ROOT_CHAR: u8 = b'\\';
pub const PARENT_PREFIX: u8 = b'^';
pub const DUAL_NAME_PREFIX: u8 = 0x2E;
pub const MULTI_NAME_PREFIX: u8 = 0x2F;
pub const NULL_NAME: u8 = 0x00;

/// The revision reported by `Revision` and `\_REV`.
pub const INTERPRETER_REVISION: u64 = 2;

/// Operand encodings of the generic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    TermArg,
    SuperName,
    /// A `SuperName` or a `NullName` (`0x00`).
    Target,
    SimpleName,
    NameString,
    ByteData,
    WordData,
    DWordData,
}

/// Where an operator may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// A `Type2Opcode`; usable wherever a `TermArg` is expected.
    Expression,
    /// A `Type1Opcode`; only valid as a statement in a term list.
    Statement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    pub code: u16,
    pub name: &'static str,
    pub kind: OpKind,
    pub operands: &'static [Operand],
}

use OpKind::{Expression, Statement};
use Operand::{ByteData, DWordData, NameString, SimpleName, SuperName, Target, TermArg, WordData};

const fn op(code: u16, name: &'static str, kind: OpKind, operands: &'static [Operand]) -> OpInfo {
    OpInfo {
        code,
        name,
        kind,
        operands,
    }
}

/// Operators whose operands follow a fixed shape and carry no name
/// definition or package length.
pub const GENERIC: &[OpInfo] = &[
    op(STORE, "Store", Expression, &[TermArg, SuperName]),
    op(REF_OF, "RefOf", Expression, &[SuperName]),
    op(ADD, "Add", Expression, &[TermArg, TermArg, Target]),
    op(CONCAT, "Concatenate", Expression, &[TermArg, TermArg, Target]),
    op(SUBTRACT, "Subtract", Expression, &[TermArg, TermArg, Target]),
    op(INCREMENT, "Increment", Expression, &[SuperName]),
    op(DECREMENT, "Decrement", Expression, &[SuperName]),
    op(MULTIPLY, "Multiply", Expression, &[TermArg, TermArg, Target]),
    op(DIVIDE, "Divide", Expression, &[TermArg, TermArg, Target, Target]),
    op(SHIFT_LEFT, "ShiftLeft", Expression, &[TermArg, TermArg, Target]),
    op(SHIFT_RIGHT, "ShiftRight", Expression, &[TermArg, TermArg, Target]),
    op(AND, "And", Expression, &[TermArg, TermArg, Target]),
    op(NAND, "NAnd", Expression, &[TermArg, TermArg, Target]),
    op(OR, "Or", Expression, &[TermArg, TermArg, Target]),
    op(NOR, "NOr", Expression, &[TermArg, TermArg, Target]),
    op(XOR, "XOr", Expression, &[TermArg, TermArg, Target]),
    op(NOT, "Not", Expression, &[TermArg, Target]),
    op(FIND_SET_LEFT_BIT, "FindSetLeftBit", Expression, &[TermArg, Target]),
    op(FIND_SET_RIGHT_BIT, "FindSetRightBit", Expression, &[TermArg, Target]),
    op(DEREF_OF, "DerefOf", Expression, &[TermArg]),
    op(CONCAT_RES, "ConcatenateResTemplate", Expression, &[TermArg, TermArg, Target]),
    op(MOD, "Mod", Expression, &[TermArg, TermArg, Target]),
    op(NOTIFY, "Notify", Statement, &[SuperName, TermArg]),
    op(SIZE_OF, "SizeOf", Expression, &[SuperName]),
    op(INDEX, "Index", Expression, &[TermArg, TermArg, Target]),
    op(MATCH, "Match", Expression, &[TermArg, ByteData, TermArg, ByteData, TermArg, TermArg]),
    op(OBJECT_TYPE, "ObjectType", Expression, &[SuperName]),
    op(LAND, "LAnd", Expression, &[TermArg, TermArg]),
    op(LOR, "LOr", Expression, &[TermArg, TermArg]),
    op(LNOT, "LNot", Expression, &[TermArg]),
    op(LEQUAL, "LEqual", Expression, &[TermArg, TermArg]),
    op(LGREATER, "LGreater", Expression, &[TermArg, TermArg]),
    op(LLESS, "LLess", Expression, &[TermArg, TermArg]),
    op(TO_BUFFER, "ToBuffer", Expression, &[TermArg, Target]),
    op(TO_DECIMAL_STRING, "ToDecimalString", Expression, &[TermArg, Target]),
    op(TO_HEX_STRING, "ToHexString", Expression, &[TermArg, Target]),
    op(TO_INTEGER, "ToInteger", Expression, &[TermArg, Target]),
    op(TO_STRING, "ToString", Expression, &[TermArg, TermArg, Target]),
    op(COPY_OBJECT, "CopyObject", Expression, &[TermArg, SimpleName]),
    op(MID, "Mid", Expression, &[TermArg, TermArg, TermArg, Target]),
    op(CONTINUE, "Continue", Statement, &[]),
    op(NOOP, "Noop", Statement, &[]),
    op(RETURN, "Return", Statement, &[TermArg]),
    op(BREAK, "Break", Statement, &[]),
    op(BREAK_POINT, "BreakPoint", Statement, &[]),
    op(COND_REF_OF, "CondRefOf", Expression, &[SuperName, Target]),
    op(LOAD_TABLE, "LoadTable", Expression, &[TermArg, TermArg, TermArg, TermArg, TermArg, TermArg]),
    op(LOAD, "Load", Statement, &[NameString, Target]),
    op(STALL, "Stall", Statement, &[TermArg]),
    op(SLEEP, "Sleep", Statement, &[TermArg]),
    op(ACQUIRE, "Acquire", Expression, &[SuperName, WordData]),
    op(SIGNAL, "Signal", Statement, &[SuperName]),
    op(WAIT, "Wait", Expression, &[SuperName, TermArg]),
    op(RESET, "Reset", Statement, &[SuperName]),
    op(RELEASE, "Release", Statement, &[SuperName]),
    op(FROM_BCD, "FromBCD", Expression, &[TermArg, Target]),
    op(TO_BCD, "ToBCD", Expression, &[TermArg, Target]),
    op(UNLOAD, "Unload", Statement, &[SuperName]),
    op(REVISION, "Revision", Expression, &[]),
    op(FATAL, "Fatal", Statement, &[ByteData, DWordData, TermArg]),
    op(TIMER, "Timer", Expression, &[]),
];

/// Looks up a generic operator by opcode.
#[must_use]
pub fn generic(code: u16) -> Option<&'static OpInfo> {
    GENERIC.iter().find(|info| info.code == code)
}

/// A human-readable name for any opcode, used in diagnostics.
#[must_use]
pub fn name(code: u16) -> &'static str {
    if let Some(info) = generic(code) {
        return info.name;
    }
    match code {
        ZERO => "Zero",
        ONE => "One",
        ONES => "Ones",
        ALIAS => "Alias",
        NAME => "Name",
        BYTE_PREFIX | WORD_PREFIX | DWORD_PREFIX | QWORD_PREFIX => "Integer",
        STRING_PREFIX => "String",
        SCOPE => "Scope",
        BUFFER => "Buffer",
        PACKAGE => "Package",
        VAR_PACKAGE => "VarPackage",
        METHOD => "Method",
        EXTERNAL => "External",
        LOCAL0..=LOCAL7 => "Local",
        ARG0..=ARG6 => "Arg",
        CREATE_DWORD_FIELD => "CreateDWordField",
        CREATE_WORD_FIELD => "CreateWordField",
        CREATE_BYTE_FIELD => "CreateByteField",
        CREATE_BIT_FIELD => "CreateBitField",
        CREATE_QWORD_FIELD => "CreateQWordField",
        CREATE_FIELD => "CreateField",
        IF => "If",
        ELSE => "Else",
        WHILE => "While",
        MUTEX => "Mutex",
        EVENT => "Event",
        DEBUG => "Debug",
        OP_REGION => "OperationRegion",
        FIELD => "Field",
        DEVICE => "Device",
        PROCESSOR => "Processor",
        POWER_RES => "PowerResource",
        THERMAL_ZONE => "ThermalZone",
        INDEX_FIELD => "IndexField",
        BANK_FIELD => "BankField",
        DATA_REGION => "DataTableRegion",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_table_has_unique_codes() {
        for (i, a) in GENERIC.iter().enumerate() {
            assert!(
                GENERIC[i + 1..].iter().all(|b| b.code != a.code),
                "{} listed twice",
                a.name
            );
        }
    }

    #[test]
    fn names_cover_special_forms() {
        assert_eq!(name(ADD), "Add");
        assert_eq!(name(DEVICE), "Device");
        assert_eq!(name(0x62), "Local");
        assert_eq!(name(0x5BFF), "unknown");
        assert_eq!(generic(RETURN).map(|i| i.kind), Some(OpKind::Statement));
    }
}
