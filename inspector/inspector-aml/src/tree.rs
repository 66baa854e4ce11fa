//! Parsed AML terms, stored in an arena and addressed by [`TreeId`].
//!
//! Every term remembers the table and offset it was read from and the
//! namespace scope that was current, so names inside it can be resolved
//! again at evaluation time.

use core::fmt;

use bitfield_struct::bitfield;

use crate::name::{NameSeg, NameString};
use crate::namespace::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeId(u32);

impl TreeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// `MethodFlags` byte of a method definition.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct MethodFlags {
    #[bits(3)]
    pub arg_count: u8,
    pub serialized: bool,
    #[bits(4)]
    pub sync_level: u8,
}

/// `FieldFlags` byte of `Field`, `IndexField` and `BankField`.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct FieldFlags {
    /// 0 any, 1 byte, 2 word, 3 dword, 4 qword, 5 buffer.
    #[bits(4)]
    pub access_type: u8,
    pub lock: bool,
    #[bits(2)]
    pub update_rule: u8,
    #[bits(1)]
    _reserved: u8,
}

impl FieldFlags {
    /// Access width in bits implied by the access type.
    #[must_use]
    pub const fn access_width(self) -> u8 {
        access_width(self.access_type())
    }
}

#[must_use]
pub const fn access_width(access_type: u8) -> u8 {
    match access_type {
        2 => 16,
        3 => 32,
        4 => 64,
        _ => 8,
    }
}

/// A named unit of a field list with its resolved position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUnit {
    pub name: NameSeg,
    pub node: NodeId,
    pub bit_offset: u64,
    pub bit_width: u64,
    pub access_width: u8,
}

/// A package whose contents could not be parsed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deferred {
    pub opcode: u16,
    pub table: usize,
    /// First byte after the package length.
    pub start: usize,
    pub end: usize,
    /// Scope the package itself appears in.
    pub scope: NodeId,
    /// The `Else` following a deferred `If`.
    pub attached: Option<TreeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// Allocated but not filled yet.
    Placeholder,
    Integer(u64),
    String(String),
    Buffer {
        size: TreeId,
        data: Vec<u8>,
    },
    Package {
        count: u8,
        elements: Vec<TreeId>,
    },
    VarPackage {
        count: TreeId,
        elements: Vec<TreeId>,
    },
    Local(u8),
    Arg(u8),
    Debug,
    NullName,
    /// A reference to a named object.
    Name(NameString),
    /// A name nothing defines, even after every table was loaded.
    Unresolved(NameString),
    Invoke {
        name: NameString,
        args: Vec<TreeId>,
    },
    Scope {
        name: NameString,
        node: NodeId,
        body: Vec<TreeId>,
    },
    DefName {
        name: NameString,
        node: NodeId,
        value: TreeId,
    },
    Alias {
        source: NameString,
        alias: NameString,
        node: NodeId,
    },
    Device {
        name: NameString,
        node: NodeId,
        body: Vec<TreeId>,
    },
    Method {
        name: NameString,
        node: NodeId,
        flags: MethodFlags,
        body: Vec<TreeId>,
    },
    Processor {
        name: NameString,
        node: NodeId,
        id: u8,
        pblk_address: u32,
        pblk_len: u8,
        body: Vec<TreeId>,
    },
    PowerResource {
        name: NameString,
        node: NodeId,
        system_level: u8,
        resource_order: u16,
        body: Vec<TreeId>,
    },
    ThermalZone {
        name: NameString,
        node: NodeId,
        body: Vec<TreeId>,
    },
    OpRegion {
        name: NameString,
        node: NodeId,
        space: u8,
        offset: TreeId,
        length: TreeId,
    },
    Field {
        region: NameString,
        flags: FieldFlags,
        units: Vec<FieldUnit>,
    },
    IndexField {
        index: NameString,
        data: NameString,
        flags: FieldFlags,
        units: Vec<FieldUnit>,
    },
    BankField {
        region: NameString,
        bank: NameString,
        value: TreeId,
        flags: FieldFlags,
        units: Vec<FieldUnit>,
    },
    /// `CreateBitField` ... `CreateQWordField` and `CreateField`.
    CreateField {
        opcode: u16,
        source: TreeId,
        index: TreeId,
        /// Bit count operand of `CreateField`.
        width: Option<TreeId>,
        name: NameString,
        node: NodeId,
    },
    Mutex {
        name: NameString,
        node: NodeId,
        sync_level: u8,
    },
    Event {
        name: NameString,
        node: NodeId,
    },
    DataRegion {
        name: NameString,
        node: NodeId,
        signature: TreeId,
        oem_id: TreeId,
        oem_table_id: TreeId,
    },
    External {
        name: NameString,
        node: NodeId,
        object_type: u8,
        args: u8,
    },
    If {
        predicate: TreeId,
        then: Vec<TreeId>,
        /// The [`Term::Else`] node that follows, if any.
        otherwise: Option<TreeId>,
    },
    Else {
        body: Vec<TreeId>,
    },
    While {
        predicate: TreeId,
        body: Vec<TreeId>,
    },
    /// Any operator from [`crate::opcode::GENERIC`].
    Op {
        code: u16,
        operands: Vec<TreeId>,
    },
    Deferred(Deferred),
}

impl Term {
    /// Direct children in source order.
    #[must_use]
    pub fn children(&self) -> Vec<TreeId> {
        match self {
            Self::Buffer { size, .. } => vec![*size],
            Self::Package { elements, .. } => elements.clone(),
            Self::VarPackage { count, elements } => {
                let mut v = vec![*count];
                v.extend_from_slice(elements);
                v
            }
            Self::Invoke { args, .. } => args.clone(),
            Self::Scope { body, .. }
            | Self::Device { body, .. }
            | Self::Method { body, .. }
            | Self::Processor { body, .. }
            | Self::PowerResource { body, .. }
            | Self::ThermalZone { body, .. }
            | Self::Else { body } => body.clone(),
            Self::DefName { value, .. } | Self::BankField { value, .. } => vec![*value],
            Self::OpRegion { offset, length, .. } => vec![*offset, *length],
            Self::CreateField {
                source, index, width, ..
            } => {
                let mut v = vec![*source, *index];
                v.extend(width);
                v
            }
            Self::DataRegion {
                signature,
                oem_id,
                oem_table_id,
                ..
            } => vec![*signature, *oem_id, *oem_table_id],
            Self::If {
                predicate,
                then,
                otherwise,
            } => {
                let mut v = vec![*predicate];
                v.extend_from_slice(then);
                v.extend(otherwise);
                v
            }
            Self::While { predicate, body } => {
                let mut v = vec![*predicate];
                v.extend_from_slice(body);
                v
            }
            Self::Op { operands, .. } => operands.clone(),
            _ => Vec::new(),
        }
    }

    /// The namespace node this term defines, if it defines one.
    #[must_use]
    pub const fn defines(&self) -> Option<NodeId> {
        match self {
            Self::DefName { node, .. }
            | Self::Alias { node, .. }
            | Self::Device { node, .. }
            | Self::Method { node, .. }
            | Self::Processor { node, .. }
            | Self::PowerResource { node, .. }
            | Self::ThermalZone { node, .. }
            | Self::OpRegion { node, .. }
            | Self::CreateField { node, .. }
            | Self::Mutex { node, .. }
            | Self::Event { node, .. }
            | Self::DataRegion { node, .. }
            | Self::External { node, .. } => Some(*node),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub term: Term,
    pub table: usize,
    pub offset: usize,
    pub scope: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a node whose term is filled in later with [`Tree::set`].
    pub fn alloc(&mut self, table: usize, offset: usize, scope: NodeId) -> TreeId {
        self.push(Term::Placeholder, table, offset, scope)
    }

    pub fn push(&mut self, term: Term, table: usize, offset: usize, scope: NodeId) -> TreeId {
        let id = TreeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(TreeNode {
            term,
            table,
            offset,
            scope,
        });
        id
    }

    pub fn set(&mut self, id: TreeId, term: Term) {
        if let Some(n) = self.nodes.get_mut(id.index()) {
            n.term = term;
        }
    }

    #[must_use]
    pub fn get(&self, id: TreeId) -> Option<&TreeNode> {
        self.nodes.get(id.index())
    }

    /// The term of `id`, or a placeholder for foreign ids.
    #[must_use]
    pub fn term(&self, id: TreeId) -> &Term {
        self.nodes.get(id.index()).map_or(&Term::Placeholder, |n| &n.term)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order walk below `roots`.
    pub fn walk(&self, roots: &[TreeId], f: &mut impl FnMut(TreeId, &TreeNode)) {
        let mut stack: Vec<TreeId> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            f(id, node);
            stack.extend(node.term.children().into_iter().rev());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::Namespace;

    #[test]
    fn method_flags_layout() {
        let f = MethodFlags::from_bits(0x0B);
        assert_eq!(f.arg_count(), 3);
        assert!(f.serialized());
        assert_eq!(f.sync_level(), 0);
    }

    #[test]
    fn field_access_widths() {
        assert_eq!(FieldFlags::from_bits(0x01).access_width(), 8);
        assert_eq!(FieldFlags::from_bits(0x03).access_width(), 32);
        assert_eq!(FieldFlags::from_bits(0x14).access_width(), 64);
        assert!(FieldFlags::from_bits(0x10).lock());
    }

    #[test]
    fn walk_is_pre_order() {
        let root = Namespace::new().root();
        let mut t = Tree::new();
        let a = t.push(Term::Integer(1), 0, 0, root);
        let b = t.push(Term::Integer(2), 0, 1, root);
        let op = t.push(
            Term::Op {
                code: crate::opcode::ADD,
                operands: vec![a, b],
            },
            0,
            2,
            root,
        );
        let mut seen = Vec::new();
        t.walk(&[op], &mut |id, _| seen.push(id));
        assert_eq!(seen, vec![op, a, b]);
    }
}
