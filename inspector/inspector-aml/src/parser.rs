//! Recursive-descent parser for AML term lists.
//!
//! Each production either consumes its bytes and returns the [`TreeId`] of
//! the term it built, or fails. Callers that try alternatives take a
//! [`crate::stream::Mark`] first and reset to it on failure.
//!
//! Named definitions are registered in the namespace as they are parsed.
//! Methods are registered as soon as their flags are known, so a method body
//! may call the method itself.
//!
//! A name that is not yet defined cannot be parsed: whether it is a method
//! call, and with how many arguments, depends on the definition. The failure
//! unwinds to the closest enclosing deferrable package (`Scope`, `Device`,
//! `Method`, `Processor`, `PowerResource`, `ThermalZone`, `If`, `Else`,
//! `While`), which is recorded as [`Term::Deferred`] and skipped. Deferred
//! packages are parsed again once every table is loaded. In tolerant mode
//! undefined names become [`Term::Unresolved`] instead of failing.

use log::debug;

use crate::AmlError;
use crate::name::{NameSeg, NameString, starts_name_string};
use crate::namespace::{Namespace, NodeId, ObjectKind};
use crate::opcode::{self, OpKind, Operand};
use crate::stream::AmlStream;
use crate::tree::{Deferred, FieldFlags, FieldUnit, MethodFlags, Term, Tree, TreeId, access_width};

/// Packages recorded for a later pass when their contents fail to parse.
const DEFERRABLE: [u16; 9] = [
    opcode::SCOPE,
    opcode::DEVICE,
    opcode::METHOD,
    opcode::PROCESSOR,
    opcode::POWER_RES,
    opcode::THERMAL_ZONE,
    opcode::IF,
    opcode::ELSE,
    opcode::WHILE,
];

pub(crate) struct Parser<'c> {
    pub(crate) stream: &'c mut AmlStream,
    pub(crate) namespace: &'c mut Namespace,
    pub(crate) tree: &'c mut Tree,
    pub(crate) deferred: &'c mut Vec<TreeId>,
    pub(crate) scope: NodeId,
    pub(crate) tolerant: bool,
}

impl Parser<'_> {
    fn push(&mut self, term: Term, offset: usize) -> TreeId {
        self.tree.push(term, self.stream.current_table(), offset, self.scope)
    }

    fn decode_error(&self, production: &'static str) -> AmlError {
        AmlError::Decode {
            opcode: self.stream.peek_opcode().unwrap_or(0),
            offset: self.stream.position(),
            production,
        }
    }

    /// Runs `f` and rewinds the stream if it fails.
    fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, AmlError>) -> Result<T, AmlError> {
        let mark = self.stream.mark();
        let saved_scope = self.scope;
        let result = f(self);
        if result.is_err() {
            self.stream.reset(mark);
            self.scope = saved_scope;
        }
        result
    }

    /// Parses the top level of the active table.
    ///
    /// A top-level term that names something undefined has no package to
    /// defer to; it is parsed again in tolerant mode.
    pub(crate) fn definition_block(&mut self) -> Result<Vec<TreeId>, AmlError> {
        let mut terms = Vec::new();
        while !self.stream.at_end() {
            let mark = self.stream.mark();
            match self.term_obj() {
                Ok(id) => terms.push(id),
                Err(AmlError::UndefinedSymbol { name, scope }) if !self.tolerant => {
                    debug!("{name} in {scope} is undefined at the top level; tagging it");
                    self.stream.reset(mark);
                    self.tolerant = true;
                    let retry = self.term_obj();
                    self.tolerant = false;
                    terms.push(retry?);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(terms)
    }

    pub(crate) fn term_list(&mut self) -> Result<Vec<TreeId>, AmlError> {
        let mut terms = Vec::new();
        while !self.stream.at_end() {
            terms.push(self.term_obj()?);
        }
        Ok(terms)
    }

    fn term_obj(&mut self) -> Result<TreeId, AmlError> {
        self.attempt(|p| {
            let op = p.stream.peek_opcode().ok_or_else(|| p.decode_error("TermObj"))?;
            match op {
                opcode::SCOPE
                | opcode::DEVICE
                | opcode::METHOD
                | opcode::PROCESSOR
                | opcode::POWER_RES
                | opcode::THERMAL_ZONE
                | opcode::IF
                | opcode::WHILE => p.package_term(op),
                opcode::NAME => p.def_name(),
                opcode::ALIAS => p.def_alias(),
                opcode::EXTERNAL => p.def_external(),
                opcode::OP_REGION => p.def_op_region(),
                opcode::FIELD | opcode::INDEX_FIELD | opcode::BANK_FIELD => p.def_field(op),
                opcode::CREATE_BIT_FIELD
                | opcode::CREATE_BYTE_FIELD
                | opcode::CREATE_WORD_FIELD
                | opcode::CREATE_DWORD_FIELD
                | opcode::CREATE_QWORD_FIELD
                | opcode::CREATE_FIELD => p.def_create_field(op),
                opcode::MUTEX => p.def_mutex(),
                opcode::EVENT => p.def_event(),
                opcode::DATA_REGION => p.def_data_region(),
                _ => match opcode::generic(op) {
                    Some(info) if info.kind == OpKind::Statement => p.generic_op(op),
                    _ => p.term_arg(),
                },
            }
        })
    }

    /// A deferrable package: opcode, package length, contents.
    fn package_term(&mut self, op: u16) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        let slot = self.tree.alloc(self.stream.current_table(), offset, self.scope);
        self.stream.read_opcode()?;
        let end = self.stream.read_pkg_length()?;
        let start = self.stream.position();
        self.expand_package(op, slot, start, end, None)?;

        if op == opcode::IF && self.stream.peek_opcode() == Some(opcode::ELSE) {
            let else_slot = self.package_term(opcode::ELSE)?;
            let patched = match self.tree.term(slot).clone() {
                Term::If { predicate, then, .. } => Term::If {
                    predicate,
                    then,
                    otherwise: Some(else_slot),
                },
                Term::Deferred(d) => Term::Deferred(Deferred {
                    attached: Some(else_slot),
                    ..d
                }),
                other => other,
            };
            self.tree.set(slot, patched);
        }
        Ok(slot)
    }

    /// Parses the contents `start..end` of a package into `slot`.
    ///
    /// When a deferrable package fails softly the slot becomes
    /// [`Term::Deferred`] and the stream continues after the package.
    pub(crate) fn expand_package(
        &mut self,
        op: u16,
        slot: TreeId,
        start: usize,
        end: usize,
        attached: Option<TreeId>,
    ) -> Result<(), AmlError> {
        let outer = self.stream.mark();
        let saved_scope = self.scope;
        self.stream.seek(start)?;
        self.stream.push_limit(end)?;
        let result = self.package_body(op, slot, attached);
        self.scope = saved_scope;
        self.stream.reset(outer);
        self.stream.seek(end)?;

        match result {
            Ok(term) => {
                self.tree.set(slot, term);
                Ok(())
            }
            Err(e) if e.is_deferrable() && DEFERRABLE.contains(&op) => {
                debug!(
                    "deferring {} at {}:{start:#x}: {e}",
                    opcode::name(op),
                    self.stream.table_name()
                );
                self.tree.set(
                    slot,
                    Term::Deferred(Deferred {
                        opcode: op,
                        table: self.stream.current_table(),
                        start,
                        end,
                        scope: saved_scope,
                        attached,
                    }),
                );
                self.deferred.push(slot);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn package_body(&mut self, op: u16, slot: TreeId, attached: Option<TreeId>) -> Result<Term, AmlError> {
        match op {
            opcode::SCOPE => {
                let name = self.stream.read_name_string()?;
                let node = self.namespace.open_scope(self.scope, &name)?;
                self.scope = node;
                let body = self.term_list()?;
                Ok(Term::Scope { name, node, body })
            }
            opcode::DEVICE => {
                let name = self.stream.read_name_string()?;
                let node = self.define(&name, ObjectKind::Device, slot)?;
                self.scope = node;
                let body = self.term_list()?;
                Ok(Term::Device { name, node, body })
            }
            opcode::METHOD => {
                let name = self.stream.read_name_string()?;
                let flags = MethodFlags::from_bits(self.stream.read_u8()?);
                let kind = ObjectKind::Method {
                    args: flags.arg_count(),
                    serialized: flags.serialized(),
                };
                let node = self.define(&name, kind, slot)?;
                self.scope = node;
                let body = self.term_list()?;
                Ok(Term::Method {
                    name,
                    node,
                    flags,
                    body,
                })
            }
            opcode::PROCESSOR => {
                let name = self.stream.read_name_string()?;
                let id = self.stream.read_u8()?;
                let pblk_address = self.stream.read_u32()?;
                let pblk_len = self.stream.read_u8()?;
                let node = self.define(&name, ObjectKind::Processor, slot)?;
                self.scope = node;
                let body = self.term_list()?;
                Ok(Term::Processor {
                    name,
                    node,
                    id,
                    pblk_address,
                    pblk_len,
                    body,
                })
            }
            opcode::POWER_RES => {
                let name = self.stream.read_name_string()?;
                let system_level = self.stream.read_u8()?;
                let resource_order = self.stream.read_u16()?;
                let node = self.define(&name, ObjectKind::PowerResource, slot)?;
                self.scope = node;
                let body = self.term_list()?;
                Ok(Term::PowerResource {
                    name,
                    node,
                    system_level,
                    resource_order,
                    body,
                })
            }
            opcode::THERMAL_ZONE => {
                let name = self.stream.read_name_string()?;
                let node = self.define(&name, ObjectKind::ThermalZone, slot)?;
                self.scope = node;
                let body = self.term_list()?;
                Ok(Term::ThermalZone { name, node, body })
            }
            opcode::IF => {
                let predicate = self.term_arg()?;
                let then = self.term_list()?;
                Ok(Term::If {
                    predicate,
                    then,
                    otherwise: attached,
                })
            }
            opcode::ELSE => Ok(Term::Else {
                body: self.term_list()?,
            }),
            opcode::WHILE => {
                let predicate = self.term_arg()?;
                let body = self.term_list()?;
                Ok(Term::While { predicate, body })
            }
            _ => Err(self.decode_error("package")),
        }
    }

    fn define(&mut self, name: &NameString, kind: ObjectKind, slot: TreeId) -> Result<NodeId, AmlError> {
        self.namespace.register(self.scope, name, kind, Some(slot))
    }

    fn def_name(&mut self) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        let slot = self.tree.alloc(self.stream.current_table(), offset, self.scope);
        self.stream.read_opcode()?;
        let name = self.stream.read_name_string()?;
        let node = self.define(&name, ObjectKind::Name, slot)?;
        let value = self.term_arg()?;
        self.tree.set(slot, Term::DefName { name, node, value });
        Ok(slot)
    }

    fn def_alias(&mut self) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        let slot = self.tree.alloc(self.stream.current_table(), offset, self.scope);
        self.stream.read_opcode()?;
        let source = self.stream.read_name_string()?;
        let alias = self.stream.read_name_string()?;
        let node = self.define(&alias, ObjectKind::Alias, slot)?;
        self.tree.set(slot, Term::Alias { source, alias, node });
        Ok(slot)
    }

    fn def_external(&mut self) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        let slot = self.tree.alloc(self.stream.current_table(), offset, self.scope);
        self.stream.read_opcode()?;
        let name = self.stream.read_name_string()?;
        let object_type = self.stream.read_u8()?;
        let args = self.stream.read_u8()? & 0x07;
        let node = self.define(&name, ObjectKind::External { object_type, args }, slot)?;
        self.tree.set(
            slot,
            Term::External {
                name,
                node,
                object_type,
                args,
            },
        );
        Ok(slot)
    }

    fn def_op_region(&mut self) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        let slot = self.tree.alloc(self.stream.current_table(), offset, self.scope);
        self.stream.read_opcode()?;
        let name = self.stream.read_name_string()?;
        let space = self.stream.read_u8()?;
        let node = self.define(&name, ObjectKind::OperationRegion, slot)?;
        let region_offset = self.term_arg()?;
        let length = self.term_arg()?;
        self.tree.set(
            slot,
            Term::OpRegion {
                name,
                node,
                space,
                offset: region_offset,
                length,
            },
        );
        Ok(slot)
    }

    fn def_field(&mut self, op: u16) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        let slot = self.tree.alloc(self.stream.current_table(), offset, self.scope);
        self.stream.read_opcode()?;
        let end = self.stream.read_pkg_length()?;
        self.stream.push_limit(end)?;
        let term = match op {
            opcode::FIELD => {
                let region = self.stream.read_name_string()?;
                let flags = FieldFlags::from_bits(self.stream.read_u8()?);
                let units = self.field_list(flags, slot)?;
                Term::Field { region, flags, units }
            }
            opcode::INDEX_FIELD => {
                let index = self.stream.read_name_string()?;
                let data = self.stream.read_name_string()?;
                let flags = FieldFlags::from_bits(self.stream.read_u8()?);
                let units = self.field_list(flags, slot)?;
                Term::IndexField {
                    index,
                    data,
                    flags,
                    units,
                }
            }
            _ => {
                let region = self.stream.read_name_string()?;
                let bank = self.stream.read_name_string()?;
                let value = self.term_arg()?;
                let flags = FieldFlags::from_bits(self.stream.read_u8()?);
                let units = self.field_list(flags, slot)?;
                Term::BankField {
                    region,
                    bank,
                    value,
                    flags,
                    units,
                }
            }
        };
        self.stream.pop_limit();
        self.tree.set(slot, term);
        Ok(slot)
    }

    /// Field elements up to the package end. Reserved and access elements
    /// only move the bit position and access width.
    fn field_list(&mut self, flags: FieldFlags, slot: TreeId) -> Result<Vec<FieldUnit>, AmlError> {
        let mut units = Vec::new();
        let mut bit_offset = 0u64;
        let mut width = flags.access_width();
        while let Some(lead) = self.stream.peek() {
            if self.stream.at_end() {
                break;
            }
            match lead {
                0x00 => {
                    self.stream.read_u8()?;
                    bit_offset += u64::from(self.stream.read_encoded_length()?);
                }
                0x01 => {
                    self.stream.read_u8()?;
                    width = access_width(self.stream.read_u8()? & 0x0F);
                    self.stream.read_u8()?;
                }
                0x02 => {
                    self.stream.read_u8()?;
                    if self.stream.peek_opcode() == Some(opcode::BUFFER) {
                        self.buffer()?;
                    } else {
                        self.stream.read_name_string()?;
                    }
                }
                0x03 => {
                    self.stream.read_u8()?;
                    width = access_width(self.stream.read_u8()? & 0x0F);
                    self.stream.read_u8()?;
                    self.stream.read_u8()?;
                }
                _ => {
                    let b = self.stream.read_bytes(4)?;
                    let name = NameSeg([b[0], b[1], b[2], b[3]]);
                    let bit_width = u64::from(self.stream.read_encoded_length()?);
                    let node = self.define(&NameString::single(name), ObjectKind::FieldUnit, slot)?;
                    units.push(FieldUnit {
                        name,
                        node,
                        bit_offset,
                        bit_width,
                        access_width: width,
                    });
                    bit_offset += bit_width;
                }
            }
        }
        Ok(units)
    }

    fn def_create_field(&mut self, op: u16) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        let slot = self.tree.alloc(self.stream.current_table(), offset, self.scope);
        self.stream.read_opcode()?;
        let source = self.term_arg()?;
        let index = self.term_arg()?;
        let width = if op == opcode::CREATE_FIELD {
            Some(self.term_arg()?)
        } else {
            None
        };
        let name = self.stream.read_name_string()?;
        let node = self.define(&name, ObjectKind::BufferField, slot)?;
        self.tree.set(
            slot,
            Term::CreateField {
                opcode: op,
                source,
                index,
                width,
                name,
                node,
            },
        );
        Ok(slot)
    }

    fn def_mutex(&mut self) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        let slot = self.tree.alloc(self.stream.current_table(), offset, self.scope);
        self.stream.read_opcode()?;
        let name = self.stream.read_name_string()?;
        let sync_level = self.stream.read_u8()? & 0x0F;
        let node = self.define(&name, ObjectKind::Mutex, slot)?;
        self.tree.set(slot, Term::Mutex { name, node, sync_level });
        Ok(slot)
    }

    fn def_event(&mut self) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        let slot = self.tree.alloc(self.stream.current_table(), offset, self.scope);
        self.stream.read_opcode()?;
        let name = self.stream.read_name_string()?;
        let node = self.define(&name, ObjectKind::Event, slot)?;
        self.tree.set(slot, Term::Event { name, node });
        Ok(slot)
    }

    fn def_data_region(&mut self) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        let slot = self.tree.alloc(self.stream.current_table(), offset, self.scope);
        self.stream.read_opcode()?;
        let name = self.stream.read_name_string()?;
        let node = self.define(&name, ObjectKind::DataRegion, slot)?;
        let signature = self.term_arg()?;
        let oem_id = self.term_arg()?;
        let oem_table_id = self.term_arg()?;
        self.tree.set(
            slot,
            Term::DataRegion {
                name,
                node,
                signature,
                oem_id,
                oem_table_id,
            },
        );
        Ok(slot)
    }

    /// An operator from the generic table, operands as the table says.
    fn generic_op(&mut self, op: u16) -> Result<TreeId, AmlError> {
        let info = opcode::generic(op).ok_or_else(|| self.decode_error("operator"))?;
        let offset = self.stream.position();
        self.stream.read_opcode()?;
        let mut operands = Vec::with_capacity(info.operands.len());
        for operand in info.operands {
            let at = self.stream.position();
            let id = match operand {
                Operand::TermArg => self.term_arg()?,
                Operand::SuperName => self.super_name()?,
                Operand::Target => self.target()?,
                Operand::SimpleName => self.simple_name()?,
                Operand::NameString => {
                    let name = self.stream.read_name_string()?;
                    self.push(Term::Name(name), at)
                }
                Operand::ByteData => {
                    let v = self.stream.read_u8()?;
                    self.push(Term::Integer(u64::from(v)), at)
                }
                Operand::WordData => {
                    let v = self.stream.read_u16()?;
                    self.push(Term::Integer(u64::from(v)), at)
                }
                Operand::DWordData => {
                    let v = self.stream.read_u32()?;
                    self.push(Term::Integer(u64::from(v)), at)
                }
            };
            operands.push(id);
        }
        Ok(self.push(Term::Op { code: op, operands }, offset))
    }

    /// `TermArg`: an expression, a data object, a local or argument, or a
    /// name (possibly a method invocation).
    pub(crate) fn term_arg(&mut self) -> Result<TreeId, AmlError> {
        let op = self.stream.peek_opcode().ok_or_else(|| self.decode_error("TermArg"))?;
        match op {
            opcode::LOCAL0..=opcode::LOCAL7 | opcode::ARG0..=opcode::ARG6 => self.simple_name(),
            _ if op < 0x100 && starts_name_string(op as u8) => self.name_or_invocation(),
            _ => match opcode::generic(op) {
                Some(info) if info.kind == OpKind::Expression => self.generic_op(op),
                _ => self.data_object(),
            },
        }
    }

    /// `DataObject`: constants, strings, buffers and packages.
    fn data_object(&mut self) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        let op = self.stream.peek_opcode().ok_or_else(|| self.decode_error("DataObject"))?;
        let term = match op {
            opcode::ZERO | opcode::ONE | opcode::ONES => {
                self.stream.read_u8()?;
                Term::Integer(match op {
                    opcode::ZERO => 0,
                    opcode::ONE => 1,
                    _ => u64::MAX,
                })
            }
            opcode::BYTE_PREFIX => {
                self.stream.read_u8()?;
                Term::Integer(u64::from(self.stream.read_u8()?))
            }
            opcode::WORD_PREFIX => {
                self.stream.read_u8()?;
                Term::Integer(u64::from(self.stream.read_u16()?))
            }
            opcode::DWORD_PREFIX => {
                self.stream.read_u8()?;
                Term::Integer(u64::from(self.stream.read_u32()?))
            }
            opcode::QWORD_PREFIX => {
                self.stream.read_u8()?;
                Term::Integer(self.stream.read_u64()?)
            }
            opcode::STRING_PREFIX => {
                self.stream.read_u8()?;
                Term::String(self.stream.read_string()?)
            }
            opcode::BUFFER => return self.buffer(),
            opcode::PACKAGE | opcode::VAR_PACKAGE => return self.package(op),
            _ => return Err(self.decode_error("DataObject")),
        };
        Ok(self.push(term, offset))
    }

    fn buffer(&mut self) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        self.stream.read_opcode()?;
        let end = self.stream.read_pkg_length()?;
        self.stream.push_limit(end)?;
        let size = self.term_arg()?;
        let data = self.stream.read_rest();
        self.stream.pop_limit();
        Ok(self.push(Term::Buffer { size, data }, offset))
    }

    fn package(&mut self, op: u16) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        self.stream.read_opcode()?;
        let end = self.stream.read_pkg_length()?;
        self.stream.push_limit(end)?;
        let count = if op == opcode::PACKAGE {
            Err(self.stream.read_u8()?)
        } else {
            Ok(self.term_arg()?)
        };
        let mut elements = Vec::new();
        while !self.stream.at_end() {
            elements.push(self.package_element()?);
        }
        self.stream.pop_limit();
        let term = match count {
            Err(count) => Term::Package { count, elements },
            Ok(count) => Term::VarPackage { count, elements },
        };
        Ok(self.push(term, offset))
    }

    /// `PackageElement := DataRefObject | NameString`. Names inside a
    /// package are references and are never invoked.
    fn package_element(&mut self) -> Result<TreeId, AmlError> {
        let mark = self.stream.mark();
        match self.data_object() {
            Ok(id) => Ok(id),
            Err(first) => {
                self.stream.reset(mark);
                let offset = self.stream.position();
                match self.stream.read_name_string() {
                    Ok(name) => Ok(self.push(Term::Name(name), offset)),
                    Err(_) => {
                        self.stream.reset(mark);
                        Err(first)
                    }
                }
            }
        }
    }

    /// `SimpleName := NameString | ArgObj | LocalObj`, without invocation.
    fn simple_name(&mut self) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        let op = self.stream.peek_opcode().ok_or_else(|| self.decode_error("SimpleName"))?;
        let term = match op {
            opcode::LOCAL0..=opcode::LOCAL7 => {
                self.stream.read_u8()?;
                Term::Local((op - opcode::LOCAL0) as u8)
            }
            opcode::ARG0..=opcode::ARG6 => {
                self.stream.read_u8()?;
                Term::Arg((op - opcode::ARG0) as u8)
            }
            _ => {
                let name = self.stream.read_name_string()?;
                self.reference(name)?
            }
        };
        Ok(self.push(term, offset))
    }

    /// `SuperName := SimpleName | DebugObj | RefOf | DerefOf | Index`.
    ///
    /// A name here is a reference to the object; a method is not invoked and
    /// its argument count does not apply.
    fn super_name(&mut self) -> Result<TreeId, AmlError> {
        let op = self.stream.peek_opcode().ok_or_else(|| self.decode_error("SuperName"))?;
        match op {
            opcode::DEBUG => {
                let offset = self.stream.position();
                self.stream.read_opcode()?;
                Ok(self.push(Term::Debug, offset))
            }
            opcode::REF_OF | opcode::DEREF_OF | opcode::INDEX => self.generic_op(op),
            opcode::LOCAL0..=opcode::LOCAL7 | opcode::ARG0..=opcode::ARG6 => self.simple_name(),
            _ if op < 0x100 && starts_name_string(op as u8) => self.simple_name(),
            _ => Err(self.decode_error("SuperName")),
        }
    }

    /// `Target := SuperName | NullName`.
    fn target(&mut self) -> Result<TreeId, AmlError> {
        if self.stream.peek() == Some(opcode::NULL_NAME) {
            let offset = self.stream.position();
            self.stream.read_u8()?;
            return Ok(self.push(Term::NullName, offset));
        }
        self.super_name()
    }

    /// A name used as a value; calls the object when it is a method.
    fn name_or_invocation(&mut self) -> Result<TreeId, AmlError> {
        let offset = self.stream.position();
        let name = self.stream.read_name_string()?;
        if name.is_null() {
            return Ok(self.push(Term::NullName, offset));
        }
        let args = self
            .namespace
            .lookup(self.scope, &name)
            .and_then(|id| self.namespace.kind(id))
            .and_then(|k| k.method_args());
        let term = match args {
            Some(n) => {
                let mut args = Vec::with_capacity(usize::from(n));
                for _ in 0..n {
                    args.push(self.term_arg()?);
                }
                Term::Invoke { name, args }
            }
            None => self.reference(name)?,
        };
        Ok(self.push(term, offset))
    }

    /// A non-invoking reference to `name`, which must exist unless tolerant.
    fn reference(&self, name: NameString) -> Result<Term, AmlError> {
        if self.namespace.lookup(self.scope, &name).is_some() {
            return Ok(Term::Name(name));
        }
        if self.tolerant {
            debug!("{name} is undefined in {}; leaving it unresolved", self.namespace.path(self.scope));
            return Ok(Term::Unresolved(name));
        }
        Err(AmlError::UndefinedSymbol {
            name: name.to_string(),
            scope: self.namespace.path(self.scope),
        })
    }
}
