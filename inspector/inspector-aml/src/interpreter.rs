//! Static evaluation of parsed AML.
//!
//! The interpreter covers the part of AML that needs no hardware: integer,
//! string and buffer operators, comparisons, `If`/`Else`/`While`, method
//! calls, locals and arguments, named objects with constant values and
//! buffer fields over such objects. Anything else evaluates to an
//! [`Unresolved`] reason:
//!
//! * fields and operation regions ([`Unresolved::Region`]);
//! * `Timer`, `Wait`, `Load`, `LoadTable`, `Unload`, `Fatal` and stores
//!   through references ([`Unresolved::Unsupported`]);
//! * packages that were never parsed ([`Unresolved::Deferred`]).
//!
//! Results of named objects are cached in [`crate::namespace::NsNode::value`].

use core::cmp::Ordering;

use log::debug;

use crate::name::{NameSeg, NameString};
use crate::namespace::{EXTERNAL_METHOD, Namespace, NodeId, ObjectKind, Predefined};
use crate::opcode::{self, INTERPRETER_REVISION};
use crate::tree::{Term, Tree, TreeId};
use crate::value::{BufferField, Location, Reference, TRUE, Unresolved, Value};

/// Method frames that may be active at once.
pub const MAX_CALL_DEPTH: usize = 32;

/// Iterations a single `While` may run.
pub const WHILE_BUDGET: usize = 4096;

/// Largest `Buffer` a `BufferSize` may ask for.
pub const MAX_BUFFER_LEN: usize = 64 * 1024;

/// Largest element count of a `VarPackage`.
pub const MAX_PACKAGE_LEN: usize = 4096;

/// Value of `\_OS_`.
const OS_NAME: &str = "Microsoft Windows NT";

/// Resource template end tag.
const END_TAG: u8 = 0x79;

type Eval<T> = Result<T, Unresolved>;

#[derive(Debug, Default)]
struct Frame {
    args: [Value; 7],
    locals: [Value; 8],
}

#[derive(Debug)]
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Interpreter<'c> {
    tree: &'c Tree,
    namespace: &'c mut Namespace,
    frames: Vec<Frame>,
}

impl<'c> Interpreter<'c> {
    pub const fn new(tree: &'c Tree, namespace: &'c mut Namespace) -> Self {
        Self {
            tree,
            namespace,
            frames: Vec::new(),
        }
    }

    #[must_use]
    pub const fn tree(&self) -> &'c Tree {
        self.tree
    }

    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &*self.namespace
    }

    pub fn namespace_mut(&mut self) -> &mut Namespace {
        &mut *self.namespace
    }

    /// The value of a named object. Methods are called without arguments.
    ///
    /// # Errors
    /// Why the value cannot be known statically.
    pub fn evaluate(&mut self, node: NodeId) -> Eval<Value> {
        self.read_named(node)
    }

    /// [`Interpreter::evaluate`] for an absolute path such as `\_SB.PCI0._ADR`.
    ///
    /// # Errors
    /// [`Unresolved::Undefined`] if the path names nothing.
    pub fn evaluate_path(&mut self, path: &str) -> Eval<Value> {
        let node = self
            .namespace
            .lookup_path(path)
            .ok_or_else(|| Unresolved::Undefined(path.to_owned()))?;
        self.evaluate(node)
    }

    /// Evaluates the object `name` directly below `scope`, if there is one.
    pub fn evaluate_child(&mut self, scope: NodeId, name: &str) -> Option<Eval<Value>> {
        let seg = NameSeg::parse(name).ok()?;
        let node = self.namespace.child(scope, seg)?;
        if self.namespace.kind(node).is_some_and(|k| k.is_external()) {
            return None;
        }
        Some(self.evaluate(node))
    }

    /// Evaluates a single term outside of any method.
    ///
    /// # Errors
    /// Why the value cannot be known statically.
    pub fn evaluate_term(&mut self, id: TreeId) -> Eval<Value> {
        self.eval(id)
    }

    /// Calls a method with `args`; missing arguments stay uninitialized.
    ///
    /// # Errors
    /// Why the result cannot be known statically.
    pub fn call(&mut self, method: NodeId, args: Vec<Value>) -> Eval<Value> {
        match self.namespace.kind(method) {
            Some(ObjectKind::Method { .. }) => {}
            Some(ObjectKind::Predefined(Predefined::Osi)) => {
                return match args.first() {
                    Some(Value::String(feature)) => Ok(Value::Integer(osi(feature))),
                    Some(other) => Err(Unresolved::Conversion {
                        from: other.type_name(),
                        to: "string",
                    }),
                    None => Err(Unresolved::Uninitialized),
                };
            }
            Some(ObjectKind::External {
                object_type: EXTERNAL_METHOD,
                ..
            })
            | None => return Err(Unresolved::Undefined(self.namespace.path(method))),
            Some(_) => return self.read_named(method),
        }
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(Unresolved::Depth(self.namespace.path(method)));
        }
        let Some(Term::Method { body, .. }) = self.definition(method) else {
            return Err(Unresolved::Deferred(self.namespace.path(method)));
        };

        let mut frame = Frame::default();
        for (slot, value) in frame.args.iter_mut().zip(args) {
            *slot = value;
        }
        self.frames.push(frame);
        let flow = self.exec_list(body);
        self.frames.pop();
        match flow? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::Uninitialized),
        }
    }

    fn definition(&self, node: NodeId) -> Option<&'c Term> {
        let tree = self.tree;
        self.namespace.get(node)?.definition.map(|d| tree.term(d))
    }

    fn resolve(&self, at: TreeId, name: &NameString) -> Eval<NodeId> {
        let scope = self.tree.get(at).map_or(self.namespace.root(), |n| n.scope);
        self.namespace
            .lookup_defined(scope, name)
            .ok_or_else(|| Unresolved::Undefined(name.to_string()))
    }

    /// Follows aliases to the object they name.
    fn dealias(&self, mut node: NodeId) -> Eval<NodeId> {
        for _ in 0..MAX_CALL_DEPTH {
            if self.namespace.kind(node) != Some(ObjectKind::Alias) {
                return Ok(node);
            }
            let def = self.namespace.get(node).and_then(|n| n.definition);
            let Some((def, Term::Alias { source, .. })) = def.map(|d| (d, self.tree.term(d))) else {
                return Err(Unresolved::Deferred(self.namespace.path(node)));
            };
            node = self.resolve(def, source)?;
        }
        Err(Unresolved::Depth(self.namespace.path(node)))
    }

    fn read_named(&mut self, node: NodeId) -> Eval<Value> {
        let node = self.dealias(node)?;
        let Some(n) = self.namespace.get(node) else {
            return Err(Unresolved::Undefined(node.to_string()));
        };
        let (kind, cached) = (n.kind, n.value.clone());
        match kind {
            ObjectKind::Predefined(Predefined::Os) => Ok(Value::String(OS_NAME.to_owned())),
            ObjectKind::Predefined(Predefined::Rev) => Ok(Value::Integer(INTERPRETER_REVISION)),
            ObjectKind::Method { .. } => self.call(node, Vec::new()),
            ObjectKind::Name => {
                if let Some(v) = cached {
                    return Ok(v);
                }
                let Some(Term::DefName { value, .. }) = self.definition(node) else {
                    return Err(Unresolved::Deferred(self.namespace.path(node)));
                };
                let v = self.eval(*value)?;
                self.namespace.set_value(node, v.clone());
                Ok(v)
            }
            ObjectKind::BufferField => {
                let field = self.buffer_field(node, cached)?;
                self.read_field(field)
            }
            ObjectKind::FieldUnit | ObjectKind::OperationRegion => Err(Unresolved::Region(self.namespace.path(node))),
            ObjectKind::External { .. } => Err(Unresolved::Undefined(self.namespace.path(node))),
            _ => Ok(Value::Object(node)),
        }
    }

    /// The field bound to a `BufferField` node, creating it from its
    /// definition when no method has done so yet.
    fn buffer_field(&mut self, node: NodeId, cached: Option<Value>) -> Eval<BufferField> {
        if let Some(Value::BufferField(f)) = cached {
            return Ok(f);
        }
        let def = self.namespace.get(node).and_then(|n| n.definition);
        match def {
            Some(id) if matches!(self.tree.term(id), Term::CreateField { .. }) => self.create_field(id),
            _ => Err(Unresolved::Deferred(self.namespace.path(node))),
        }
    }

    fn frame(&self) -> Eval<&Frame> {
        self.frames
            .last()
            .ok_or(Unresolved::Unsupported("local or argument outside a method"))
    }

    fn frame_index(&self) -> Eval<usize> {
        self.frame().map(|_| self.frames.len() - 1)
    }

    fn slot_mut(&mut self, location: Location) -> Eval<&mut Value> {
        let stale = Unresolved::Unsupported("buffer field over a finished method");
        match location {
            Location::Local { frame, index } => self
                .frames
                .get_mut(frame)
                .and_then(|f| f.locals.get_mut(usize::from(index)))
                .ok_or(stale),
            Location::Arg { frame, index } => self
                .frames
                .get_mut(frame)
                .and_then(|f| f.args.get_mut(usize::from(index)))
                .ok_or(stale),
            Location::Named(_) => Err(Unresolved::Unsupported("named location")),
        }
    }

    fn read_location(&mut self, location: Location) -> Eval<Vec<u8>> {
        match location {
            Location::Named(node) => self.read_named(node)?.to_buffer(),
            other => self.slot_mut(other)?.to_buffer(),
        }
    }

    fn write_location(&mut self, location: Location, bytes: Vec<u8>) -> Eval<()> {
        match location {
            Location::Named(node) => self.namespace.set_value(node, Value::Buffer(bytes)),
            other => *self.slot_mut(other)? = Value::Buffer(bytes),
        }
        Ok(())
    }

    fn read_field(&mut self, field: BufferField) -> Eval<Value> {
        let bytes = self.read_location(field.location)?;
        extract_bits(&bytes, field.bit_offset, field.bit_width)
    }

    fn write_field(&mut self, field: BufferField, value: &Value) -> Eval<()> {
        let mut bytes = self.read_location(field.location)?;
        insert_bits(&mut bytes, field.bit_offset, field.bit_width, value)?;
        self.write_location(field.location, bytes)
    }

    /// Where the source operand of a `CreateXField` lives.
    fn location(&self, source: TreeId) -> Eval<Location> {
        match self.tree.term(source) {
            Term::Local(index) => Ok(Location::Local {
                frame: self.frame_index()?,
                index: *index,
            }),
            Term::Arg(index) => Ok(Location::Arg {
                frame: self.frame_index()?,
                index: *index,
            }),
            Term::Name(name) | Term::Unresolved(name) => {
                let node = self.dealias(self.resolve(source, name)?)?;
                match self.namespace.kind(node) {
                    Some(ObjectKind::Name) => Ok(Location::Named(node)),
                    Some(ObjectKind::FieldUnit | ObjectKind::OperationRegion) => {
                        Err(Unresolved::Region(self.namespace.path(node)))
                    }
                    _ => Err(Unresolved::Unsupported("buffer field over a non-data object")),
                }
            }
            _ => Err(Unresolved::Unsupported("buffer field over a temporary buffer")),
        }
    }

    fn create_field(&mut self, id: TreeId) -> Eval<BufferField> {
        let tree = self.tree;
        let Term::CreateField {
            opcode: op,
            source,
            index,
            width,
            node,
            ..
        } = tree.term(id)
        else {
            return Err(Unresolved::Unsupported("CreateField"));
        };
        let location = self.location(*source)?;
        let index = self.eval_int(*index)?;
        let bytes = |bits: u64| index.checked_mul(8).map(|offset| (offset, bits));
        let range = match *op {
            opcode::CREATE_BIT_FIELD => Some((index, 1)),
            opcode::CREATE_BYTE_FIELD => bytes(8),
            opcode::CREATE_WORD_FIELD => bytes(16),
            opcode::CREATE_DWORD_FIELD => bytes(32),
            opcode::CREATE_QWORD_FIELD => bytes(64),
            _ => {
                let width = width.ok_or(Unresolved::Unsupported("CreateField without a width"))?;
                Some((index, self.eval_int(width)?))
            }
        };
        let Some((bit_offset, bit_width)) = range else {
            let len = self.read_location(location).map_or(0, |b| b.len());
            return Err(Unresolved::OutOfRange { index, len });
        };
        let field = BufferField {
            location,
            bit_offset,
            bit_width,
        };
        self.namespace.set_value(*node, Value::BufferField(field));
        Ok(field)
    }

    fn eval_int(&mut self, id: TreeId) -> Eval<u64> {
        self.eval(id)?.to_integer()
    }

    fn eval(&mut self, id: TreeId) -> Eval<Value> {
        let tree = self.tree;
        match tree.term(id) {
            Term::Integer(v) => Ok(Value::Integer(*v)),
            Term::String(s) => Ok(Value::String(s.clone())),
            Term::Buffer { size, data } => {
                let requested = self.eval_int(*size)?;
                let size = usize::try_from(requested)
                    .ok()
                    .filter(|&n| n <= MAX_BUFFER_LEN.max(data.len()))
                    .ok_or(Unresolved::OutOfRange {
                        index: requested,
                        len: MAX_BUFFER_LEN,
                    })?;
                let mut bytes = data.clone();
                if bytes.len() < size {
                    bytes.resize(size, 0);
                }
                Ok(Value::Buffer(bytes))
            }
            Term::Package { count, elements } => self.package(id, u64::from(*count), elements),
            Term::VarPackage { count, elements } => {
                let count = self.eval_int(*count)?;
                self.package(id, count, elements)
            }
            Term::Local(index) => self.read_slot(|f| f.locals.get(usize::from(*index))),
            Term::Arg(index) => self.read_slot(|f| f.args.get(usize::from(*index))),
            Term::NullName => Ok(Value::Uninitialized),
            Term::Debug => Err(Unresolved::Unsupported("Debug")),
            Term::Name(name) | Term::Unresolved(name) => {
                let node = self.resolve(id, name)?;
                self.read_named(node)
            }
            Term::Invoke { name, args } => {
                let node = self.resolve(id, name)?;
                let mut values = Vec::with_capacity(args.len());
                for &arg in args {
                    values.push(self.eval(arg)?);
                }
                self.call(node, values)
            }
            Term::Op { code, operands } => self.eval_op(*code, operands),
            Term::Deferred(d) => Err(Unresolved::Deferred(format!("{} at {:#x}", opcode::name(d.opcode), d.start))),
            Term::Placeholder => Err(Unresolved::Deferred(format!("term {id}"))),
            _ => Err(Unresolved::Unsupported("statement used as a value")),
        }
    }

    fn read_slot(&self, pick: impl FnOnce(&Frame) -> Option<&Value>) -> Eval<Value> {
        match pick(self.frame()?) {
            Some(Value::Uninitialized) | None => Err(Unresolved::Uninitialized),
            Some(v) => Ok(v.clone()),
        }
    }

    /// Names inside a package are references; names nothing defines are
    /// kept as strings holding the path.
    fn package(&mut self, id: TreeId, count: u64, elements: &[TreeId]) -> Eval<Value> {
        let mut values = Vec::with_capacity(elements.len());
        for &e in elements {
            let v = match self.tree.term(e) {
                Term::Name(name) | Term::Unresolved(name) => match self.resolve(e, name) {
                    Ok(node) => Value::Reference(Reference::Named(node)),
                    Err(_) => Value::String(name.to_string()),
                },
                _ => self.eval(e)?,
            };
            values.push(v);
        }
        let count = usize::try_from(count)
            .ok()
            .filter(|&n| n <= MAX_PACKAGE_LEN.max(values.len()))
            .ok_or(Unresolved::OutOfRange {
                index: count,
                len: MAX_PACKAGE_LEN,
            })?;
        if values.len() < count {
            values.resize(count, Value::Uninitialized);
        } else if values.len() > count {
            debug!("package {id} holds more elements than its count of {count}");
        }
        Ok(Value::Package(values))
    }

    fn exec_list(&mut self, body: &[TreeId]) -> Eval<Flow> {
        for &id in body {
            match self.exec(id)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, id: TreeId) -> Eval<Flow> {
        let tree = self.tree;
        match tree.term(id) {
            Term::If {
                predicate,
                then,
                otherwise,
            } => {
                if self.eval_int(*predicate)? != 0 {
                    return self.exec_list(then);
                }
                match otherwise.map(|e| tree.term(e)) {
                    Some(Term::Else { body }) => self.exec_list(body),
                    Some(Term::Deferred(_) | Term::Placeholder) => {
                        Err(Unresolved::Deferred(format!("Else of term {id}")))
                    }
                    _ => Ok(Flow::Normal),
                }
            }
            Term::While { predicate, body } => {
                let mut iterations = 0;
                while self.eval_int(*predicate)? != 0 {
                    iterations += 1;
                    if iterations > WHILE_BUDGET {
                        return Err(Unresolved::LoopBudget(WHILE_BUDGET));
                    }
                    match self.exec_list(body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Term::DefName { node, value, .. } => {
                let v = self.eval(*value)?;
                self.namespace.set_value(*node, v);
                Ok(Flow::Normal)
            }
            Term::CreateField { .. } => {
                self.create_field(id)?;
                Ok(Flow::Normal)
            }
            Term::Op {
                code: opcode::RETURN,
                operands,
            } => {
                let v = match operands.first() {
                    Some(&o) => self.eval(o)?,
                    None => Value::Uninitialized,
                };
                Ok(Flow::Return(v))
            }
            Term::Op { code: opcode::BREAK, .. } => Ok(Flow::Break),
            Term::Op {
                code: opcode::CONTINUE, ..
            } => Ok(Flow::Continue),
            Term::Op { .. } | Term::Invoke { .. } => {
                self.eval(id)?;
                Ok(Flow::Normal)
            }
            Term::Deferred(_) | Term::Placeholder => Err(Unresolved::Deferred(format!("term {id}"))),
            // Named definitions are bound while parsing.
            _ => Ok(Flow::Normal),
        }
    }

    fn store(&mut self, target: TreeId, value: Value) -> Eval<()> {
        let tree = self.tree;
        match tree.term(target) {
            Term::NullName => Ok(()),
            Term::Debug => {
                debug!("Debug = {value}");
                Ok(())
            }
            Term::Local(index) => {
                let frame = self.frame_index()?;
                *self.slot_mut(Location::Local { frame, index: *index })? = value;
                Ok(())
            }
            Term::Arg(index) => {
                let frame = self.frame_index()?;
                *self.slot_mut(Location::Arg { frame, index: *index })? = value;
                Ok(())
            }
            Term::Name(name) | Term::Unresolved(name) => {
                let node = self.dealias(self.resolve(target, name)?)?;
                self.store_named(node, value)
            }
            Term::Op { .. } => Err(Unresolved::Unsupported("store through a reference")),
            _ => Err(Unresolved::Unsupported("store target")),
        }
    }

    fn store_named(&mut self, node: NodeId, value: Value) -> Eval<()> {
        let Some(n) = self.namespace.get(node) else {
            return Err(Unresolved::Undefined(node.to_string()));
        };
        let (kind, cached) = (n.kind, n.value.clone());
        match kind {
            ObjectKind::Name => {
                self.namespace.set_value(node, value);
                Ok(())
            }
            ObjectKind::BufferField => {
                let field = self.buffer_field(node, cached)?;
                self.write_field(field, &value)
            }
            ObjectKind::FieldUnit | ObjectKind::OperationRegion => Err(Unresolved::Region(self.namespace.path(node))),
            _ => Err(Unresolved::Unsupported("store to a named object")),
        }
    }

    /// Stores `value` in `target` and hands it back as the operator result.
    fn store_result(&mut self, target: Option<TreeId>, value: Value) -> Eval<Value> {
        if let Some(t) = target {
            self.store(t, value.clone())?;
        }
        Ok(value)
    }

    #[allow(clippy::too_many_lines)]
    fn eval_op(&mut self, code: u16, ops: &[TreeId]) -> Eval<Value> {
        let operand = |i: usize| {
            ops.get(i)
                .copied()
                .ok_or(Unresolved::Unsupported("operator with missing operands"))
        };
        let target = |i: usize| ops.get(i).copied();

        match code {
            opcode::STORE | opcode::COPY_OBJECT => {
                let v = self.eval(operand(0)?)?;
                self.store(operand(1)?, v.clone())?;
                Ok(v)
            }
            opcode::ADD
            | opcode::SUBTRACT
            | opcode::MULTIPLY
            | opcode::SHIFT_LEFT
            | opcode::SHIFT_RIGHT
            | opcode::AND
            | opcode::NAND
            | opcode::OR
            | opcode::NOR
            | opcode::XOR
            | opcode::MOD => {
                let a = self.eval_int(operand(0)?)?;
                let b = self.eval_int(operand(1)?)?;
                let r = binary(code, a, b)?;
                self.store_result(target(2), Value::Integer(r))
            }
            opcode::DIVIDE => {
                let a = self.eval_int(operand(0)?)?;
                let b = self.eval_int(operand(1)?)?;
                if b == 0 {
                    return Err(Unresolved::DivideByZero);
                }
                self.store_result(target(2), Value::Integer(a % b))?;
                self.store_result(target(3), Value::Integer(a / b))
            }
            opcode::INCREMENT | opcode::DECREMENT => {
                let t = operand(0)?;
                let v = self.eval_int(t)?;
                let r = if code == opcode::INCREMENT {
                    v.wrapping_add(1)
                } else {
                    v.wrapping_sub(1)
                };
                self.store_result(Some(t), Value::Integer(r))
            }
            opcode::NOT => {
                let a = self.eval_int(operand(0)?)?;
                self.store_result(target(1), Value::Integer(!a))
            }
            opcode::FIND_SET_LEFT_BIT => {
                let a = self.eval_int(operand(0)?)?;
                let r = if a == 0 { 0 } else { 64 - u64::from(a.leading_zeros()) };
                self.store_result(target(1), Value::Integer(r))
            }
            opcode::FIND_SET_RIGHT_BIT => {
                let a = self.eval_int(operand(0)?)?;
                let r = if a == 0 { 0 } else { u64::from(a.trailing_zeros()) + 1 };
                self.store_result(target(1), Value::Integer(r))
            }
            opcode::LAND | opcode::LOR => {
                let a = self.eval_int(operand(0)?)? != 0;
                let b = self.eval_int(operand(1)?)? != 0;
                Ok(Value::from_bool(if code == opcode::LAND { a && b } else { a || b }))
            }
            opcode::LNOT => Ok(Value::from_bool(self.eval_int(operand(0)?)? == 0)),
            opcode::LEQUAL | opcode::LGREATER | opcode::LLESS => {
                let a = self.eval(operand(0)?)?;
                let b = self.eval(operand(1)?)?;
                let ord = compare(&a, &b)?;
                Ok(Value::from_bool(match code {
                    opcode::LEQUAL => ord == Ordering::Equal,
                    opcode::LGREATER => ord == Ordering::Greater,
                    _ => ord == Ordering::Less,
                }))
            }
            opcode::CONCAT => {
                let a = self.eval(operand(0)?)?;
                let b = self.eval(operand(1)?)?;
                let r = concat(&a, &b)?;
                self.store_result(target(2), r)
            }
            opcode::CONCAT_RES => {
                let a = self.eval(operand(0)?)?.to_buffer()?;
                let b = self.eval(operand(1)?)?.to_buffer()?;
                let mut r = strip_end_tag(&a).to_vec();
                r.extend_from_slice(strip_end_tag(&b));
                r.extend_from_slice(&[END_TAG, 0]);
                self.store_result(target(2), Value::Buffer(r))
            }
            opcode::TO_BUFFER => {
                let r = self.eval(operand(0)?)?.to_buffer()?;
                self.store_result(target(1), Value::Buffer(r))
            }
            opcode::TO_DECIMAL_STRING => {
                let r = self.eval(operand(0)?)?.to_decimal_string()?;
                self.store_result(target(1), Value::String(r))
            }
            opcode::TO_HEX_STRING => {
                let r = self.eval(operand(0)?)?.to_hex_string()?;
                self.store_result(target(1), Value::String(r))
            }
            opcode::TO_INTEGER => {
                let r = self.eval(operand(0)?)?.to_integer_explicit()?;
                self.store_result(target(1), Value::Integer(r))
            }
            opcode::TO_STRING => {
                let bytes = self.eval(operand(0)?)?.to_buffer()?;
                let limit = self.eval_int(operand(1)?)?;
                let r = buffer_string(&bytes, limit);
                self.store_result(target(2), Value::String(r))
            }
            opcode::MID => {
                let src = self.eval(operand(0)?)?;
                let index = self.eval_int(operand(1)?)?;
                let length = self.eval_int(operand(2)?)?;
                let r = mid(&src, index, length)?;
                self.store_result(target(3), r)
            }
            opcode::SIZE_OF => {
                let v = self.eval(operand(0)?)?;
                let len = match &v {
                    Value::String(s) => s.len(),
                    Value::Buffer(b) => b.len(),
                    Value::Package(p) => p.len(),
                    other => {
                        return Err(Unresolved::Conversion {
                            from: other.type_name(),
                            to: "sized object",
                        });
                    }
                };
                Ok(Value::Integer(len as u64))
            }
            opcode::INDEX => {
                let container = self.eval(operand(0)?)?;
                let index = self.eval_int(operand(1)?)?;
                let len = match &container {
                    Value::String(s) => s.len(),
                    Value::Buffer(b) => b.len(),
                    Value::Package(p) => p.len(),
                    other => {
                        return Err(Unresolved::Conversion {
                            from: other.type_name(),
                            to: "indexable object",
                        });
                    }
                };
                let i = usize::try_from(index)
                    .ok()
                    .filter(|&i| i < len)
                    .ok_or(Unresolved::OutOfRange { index, len })?;
                let r = Value::Reference(Reference::Element {
                    container: Box::new(container),
                    index: i,
                });
                self.store_result(target(2), r)
            }
            opcode::DEREF_OF => {
                let v = self.eval(operand(0)?)?;
                self.deref(v)
            }
            opcode::REF_OF => {
                let o = operand(0)?;
                match self.tree.term(o) {
                    Term::Name(name) | Term::Unresolved(name) => {
                        Ok(Value::Reference(Reference::Named(self.resolve(o, name)?)))
                    }
                    _ => Err(Unresolved::Unsupported("RefOf a local or argument")),
                }
            }
            opcode::COND_REF_OF => {
                let o = operand(0)?;
                let found = match self.tree.term(o) {
                    Term::Name(name) | Term::Unresolved(name) => self.resolve(o, name).ok(),
                    _ => return Err(Unresolved::Unsupported("CondRefOf a local or argument")),
                };
                match found {
                    Some(node) => {
                        self.store_result(target(1), Value::Reference(Reference::Named(node)))?;
                        Ok(Value::Integer(TRUE))
                    }
                    None => Ok(Value::Integer(0)),
                }
            }
            opcode::OBJECT_TYPE => {
                let o = operand(0)?;
                if let Term::Name(name) | Term::Unresolved(name) = self.tree.term(o) {
                    let node = self.dealias(self.resolve(o, name)?)?;
                    if let Some(t) = self.namespace.kind(node).and_then(object_type) {
                        return Ok(Value::Integer(t));
                    }
                }
                let v = self.eval(o)?;
                Ok(Value::Integer(self.value_type(&v)))
            }
            opcode::MATCH => {
                let Value::Package(elements) = self.eval(operand(0)?)? else {
                    return Err(Unresolved::Unsupported("Match over a non-package"));
                };
                let op1 = self.eval_int(operand(1)?)?;
                let obj1 = self.eval(operand(2)?)?;
                let op2 = self.eval_int(operand(3)?)?;
                let obj2 = self.eval(operand(4)?)?;
                let start = self.eval_int(operand(5)?)?;
                let start = usize::try_from(start).unwrap_or(usize::MAX);
                let hit = elements
                    .iter()
                    .enumerate()
                    .skip(start)
                    .find(|(_, e)| match_term(op1, e, &obj1) && match_term(op2, e, &obj2));
                Ok(Value::Integer(hit.map_or(TRUE, |(i, _)| i as u64)))
            }
            opcode::FROM_BCD => {
                let a = self.eval_int(operand(0)?)?;
                self.store_result(target(1), Value::Integer(from_bcd(a)))
            }
            opcode::TO_BCD => {
                let a = self.eval_int(operand(0)?)?;
                self.store_result(target(1), Value::Integer(to_bcd(a)))
            }
            opcode::REVISION => Ok(Value::Integer(INTERPRETER_REVISION)),
            // Mutexes are always free.
            opcode::ACQUIRE => Ok(Value::Integer(0)),
            opcode::NOTIFY
            | opcode::RELEASE
            | opcode::SIGNAL
            | opcode::RESET
            | opcode::STALL
            | opcode::SLEEP
            | opcode::NOOP
            | opcode::BREAK_POINT => Ok(Value::Uninitialized),
            _ => Err(Unresolved::Unsupported(opcode::name(code))),
        }
    }

    fn deref(&mut self, v: Value) -> Eval<Value> {
        match v {
            Value::Reference(Reference::Named(node)) => self.read_named(node),
            Value::Reference(Reference::Element { container, index }) => element(&container, index),
            Value::String(path) => {
                let node = self
                    .namespace
                    .lookup_path(&path)
                    .ok_or(Unresolved::Undefined(path))?;
                self.read_named(node)
            }
            other => Err(Unresolved::Conversion {
                from: other.type_name(),
                to: "reference",
            }),
        }
    }

    fn value_type(&self, v: &Value) -> u64 {
        match v {
            Value::Uninitialized | Value::Reference(_) => 0,
            Value::Integer(_) => 1,
            Value::String(_) => 2,
            Value::Buffer(_) => 3,
            Value::Package(_) => 4,
            Value::BufferField(_) => 14,
            Value::Object(node) => self.namespace.kind(*node).and_then(object_type).unwrap_or(0),
        }
    }
}

/// `\_OSI`: every interface is claimed except those of other systems.
fn osi(feature: &str) -> u64 {
    const OTHERS: [&str; 4] = ["Windows", "FreeBSD", "HP-UX", "OpenVMS"];
    if feature.starts_with("Linux") || !OTHERS.iter().any(|o| feature.starts_with(o)) {
        0xFFFF_FFFF
    } else {
        0
    }
}

/// `ObjectType` code of a namespace object; `None` when it depends on the
/// value.
fn object_type(kind: ObjectKind) -> Option<u64> {
    Some(match kind {
        ObjectKind::Name | ObjectKind::Alias => return None,
        ObjectKind::Scope => 0,
        ObjectKind::FieldUnit => 5,
        ObjectKind::Device => 6,
        ObjectKind::Event => 7,
        ObjectKind::Method { .. } | ObjectKind::Predefined(Predefined::Osi) => 8,
        ObjectKind::Mutex | ObjectKind::Predefined(Predefined::GlobalLock) => 9,
        ObjectKind::OperationRegion | ObjectKind::DataRegion => 10,
        ObjectKind::PowerResource => 11,
        ObjectKind::Processor => 12,
        ObjectKind::ThermalZone => 13,
        ObjectKind::BufferField => 14,
        ObjectKind::Predefined(Predefined::Os) => 2,
        ObjectKind::Predefined(Predefined::Rev) => 1,
        ObjectKind::Predefined(Predefined::Dlm) => 4,
        ObjectKind::External { object_type, .. } => u64::from(object_type),
    })
}

fn binary(code: u16, a: u64, b: u64) -> Eval<u64> {
    Ok(match code {
        opcode::ADD => a.wrapping_add(b),
        opcode::SUBTRACT => a.wrapping_sub(b),
        opcode::MULTIPLY => a.wrapping_mul(b),
        opcode::SHIFT_LEFT => {
            if b >= 64 {
                0
            } else {
                a << b
            }
        }
        opcode::SHIFT_RIGHT => {
            if b >= 64 {
                0
            } else {
                a >> b
            }
        }
        opcode::AND => a & b,
        opcode::NAND => !(a & b),
        opcode::OR => a | b,
        opcode::NOR => !(a | b),
        opcode::XOR => a ^ b,
        opcode::MOD => a.checked_rem(b).ok_or(Unresolved::DivideByZero)?,
        _ => return Err(Unresolved::Unsupported(opcode::name(code))),
    })
}

/// Strings and buffers compare directly with their own kind; everything
/// else compares as integers.
fn compare(a: &Value, b: &Value) -> Eval<Ordering> {
    Ok(match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Buffer(x), Value::Buffer(y)) => x.cmp(y),
        _ => a.to_integer()?.cmp(&b.to_integer()?),
    })
}

fn concat(a: &Value, b: &Value) -> Eval<Value> {
    Ok(match a {
        Value::String(s) => Value::String(format!("{s}{}", b.to_string_implicit()?)),
        Value::Buffer(x) => {
            let mut r = x.clone();
            r.extend_from_slice(&b.to_buffer()?);
            Value::Buffer(r)
        }
        _ => {
            let mut r = a.to_integer()?.to_le_bytes().to_vec();
            r.extend_from_slice(&b.to_integer()?.to_le_bytes());
            Value::Buffer(r)
        }
    })
}

fn strip_end_tag(template: &[u8]) -> &[u8] {
    match template {
        [head @ .., END_TAG, _] => head,
        other => other,
    }
}

fn buffer_string(bytes: &[u8], limit: u64) -> String {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let text: Vec<u8> = bytes.iter().copied().take_while(|&b| b != 0).take(limit).collect();
    String::from_utf8_lossy(&text).into_owned()
}

fn mid(src: &Value, index: u64, length: u64) -> Eval<Value> {
    let range = |len: usize| {
        let start = usize::try_from(index).unwrap_or(usize::MAX).min(len);
        let end = start.saturating_add(usize::try_from(length).unwrap_or(usize::MAX)).min(len);
        start..end
    };
    match src {
        Value::String(s) => {
            let bytes = s.as_bytes();
            Ok(Value::String(
                String::from_utf8_lossy(&bytes[range(bytes.len())]).into_owned(),
            ))
        }
        Value::Buffer(b) => Ok(Value::Buffer(b[range(b.len())].to_vec())),
        other => Err(Unresolved::Conversion {
            from: other.type_name(),
            to: "string or buffer",
        }),
    }
}

fn element(container: &Value, index: usize) -> Eval<Value> {
    let len = match container {
        Value::Package(p) => p.len(),
        Value::Buffer(b) => b.len(),
        Value::String(s) => s.len(),
        _ => 0,
    };
    let out_of_range = Unresolved::OutOfRange {
        index: index as u64,
        len,
    };
    match container {
        Value::Package(p) => p.get(index).cloned().ok_or(out_of_range),
        Value::Buffer(b) => b.get(index).map(|&x| Value::Integer(u64::from(x))).ok_or(out_of_range),
        Value::String(s) => s
            .as_bytes()
            .get(index)
            .map(|&x| Value::Integer(u64::from(x)))
            .ok_or(out_of_range),
        other => Err(Unresolved::Conversion {
            from: other.type_name(),
            to: "indexable object",
        }),
    }
}

/// One comparison of `Match`: 0 true, 1 equal, 2 less or equal, 3 less,
/// 4 greater or equal, 5 greater.
fn match_term(op: u64, element: &Value, operand: &Value) -> bool {
    if op == 0 {
        return true;
    }
    let Ok(ord) = compare(element, operand) else {
        return false;
    };
    match op {
        1 => ord == Ordering::Equal,
        2 => ord != Ordering::Greater,
        3 => ord == Ordering::Less,
        4 => ord != Ordering::Less,
        5 => ord == Ordering::Greater,
        _ => false,
    }
}

fn from_bcd(mut v: u64) -> u64 {
    let (mut r, mut scale) = (0u64, 1u64);
    while v != 0 {
        r = r.wrapping_add((v & 0xF).wrapping_mul(scale));
        scale = scale.wrapping_mul(10);
        v >>= 4;
    }
    r
}

fn to_bcd(mut v: u64) -> u64 {
    let (mut r, mut shift) = (0u64, 0u32);
    while v != 0 && shift < 64 {
        r |= (v % 10) << shift;
        shift += 4;
        v /= 10;
    }
    r
}

fn bit_range(bytes: &[u8], offset: u64, width: u64) -> Eval<(usize, usize)> {
    let end = offset.saturating_add(width);
    let fits = end <= (bytes.len() as u64) * 8;
    match (usize::try_from(offset), usize::try_from(width)) {
        (Ok(o), Ok(w)) if fits => Ok((o, w)),
        _ => Err(Unresolved::OutOfRange {
            index: end.div_ceil(8),
            len: bytes.len(),
        }),
    }
}

fn bit(bytes: &[u8], i: usize) -> bool {
    bytes.get(i / 8).is_some_and(|b| (b >> (i % 8)) & 1 == 1)
}

fn set_bit(bytes: &mut [u8], i: usize, on: bool) {
    if let Some(b) = bytes.get_mut(i / 8) {
        let mask = 1u8 << (i % 8);
        if on {
            *b |= mask;
        } else {
            *b &= !mask;
        }
    }
}

/// Reads `width` bits at `offset`: an integer up to 64 bits, a buffer
/// beyond.
fn extract_bits(bytes: &[u8], offset: u64, width: u64) -> Eval<Value> {
    let (offset, width) = bit_range(bytes, offset, width)?;
    if width <= 64 {
        let v = (0..width)
            .filter(|&i| bit(bytes, offset + i))
            .fold(0u64, |v, i| v | (1 << i));
        return Ok(Value::Integer(v));
    }
    let mut out = vec![0u8; width.div_ceil(8)];
    for i in 0..width {
        set_bit(&mut out, i, bit(bytes, offset + i));
    }
    Ok(Value::Buffer(out))
}

fn insert_bits(bytes: &mut [u8], offset: u64, width: u64, value: &Value) -> Eval<()> {
    let (offset, width) = bit_range(bytes, offset, width)?;
    let source = if width <= 64 {
        value.to_integer()?.to_le_bytes().to_vec()
    } else {
        value.to_buffer()?
    };
    for i in 0..width {
        set_bit(bytes, offset + i, bit(&source, i));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::stream::test_util::definition_block;

    fn load(body: &[u8]) -> Context {
        let mut ctx = Context::new();
        ctx.load_table("DSDT", &definition_block(b"DSDT", body)).unwrap();
        ctx.expand_deferred();
        ctx
    }

    fn node(ctx: &Context, path: &str) -> NodeId {
        ctx.namespace().lookup_path(path).unwrap()
    }

    #[test]
    fn method_returns_arithmetic() {
        // Method (FOO) { Return (Add (2, 3)) }
        let mut ctx = load(&[
            0x14, 0x0D, b'F', b'O', b'O', b'_', 0x00, 0xA4, 0x72, 0x0A, 0x02, 0x0A, 0x03, 0x00,
        ]);
        assert_eq!(ctx.interpreter().evaluate_path("\\FOO"), Ok(Value::Integer(5)));
    }

    #[test]
    fn if_else_follows_the_argument() {
        // Method (TST, 1) { If (LEqual (Arg0, 1)) { Return (10) } Else { Return (11) } }
        let mut ctx = load(&[
            0x14, 0x13, b'T', b'S', b'T', b'_', 0x01, //
            0xA0, 0x07, 0x93, 0x68, 0x01, 0xA4, 0x0A, 0x0A, //
            0xA1, 0x04, 0xA4, 0x0A, 0x0B,
        ]);
        let tst = node(&ctx, "\\TST");
        let mut i = ctx.interpreter();
        assert_eq!(i.call(tst, vec![Value::Integer(1)]), Ok(Value::Integer(10)));
        assert_eq!(i.call(tst, vec![Value::Integer(2)]), Ok(Value::Integer(11)));
    }

    #[test]
    fn while_loop_counts_in_a_local() {
        // Method (LOOP) { Store (0, Local0) While (LLess (Local0, 5)) { Increment (Local0) } Return (Local0) }
        let mut ctx = load(&[
            0x14, 0x13, b'L', b'O', b'O', b'P', 0x00, //
            0x70, 0x00, 0x60, //
            0xA2, 0x07, 0x95, 0x60, 0x0A, 0x05, 0x75, 0x60, //
            0xA4, 0x60,
        ]);
        assert_eq!(ctx.interpreter().evaluate_path("\\LOOP"), Ok(Value::Integer(5)));
    }

    #[test]
    fn field_units_are_region_backed() {
        // OperationRegion (GNVS, SystemMemory, 0x1000, 0x10)
        // Field (GNVS, AnyAcc, NoLock, Preserve) { FLD1, 8 }
        let mut ctx = load(&[
            0x5B, 0x80, b'G', b'N', b'V', b'S', 0x00, 0x0B, 0x00, 0x10, 0x0A, 0x10, //
            0x5B, 0x81, 0x0B, b'G', b'N', b'V', b'S', 0x00, b'F', b'L', b'D', b'1', 0x08,
        ]);
        assert!(matches!(
            ctx.interpreter().evaluate_path("\\FLD1"),
            Err(Unresolved::Region(_))
        ));
    }

    #[test]
    fn predefined_objects() {
        let mut ctx = Context::new();
        let osi = node(&ctx, "\\_OSI");
        let mut i = ctx.interpreter();
        let call = |i: &mut Interpreter<'_>, s: &str| i.call(osi, vec![Value::String(s.into())]);
        assert_eq!(call(&mut i, "Windows 2015"), Ok(Value::Integer(0)));
        assert_eq!(call(&mut i, "Linux"), Ok(Value::Integer(0xFFFF_FFFF)));
        assert_eq!(call(&mut i, "Module Device"), Ok(Value::Integer(0xFFFF_FFFF)));
        assert_eq!(i.evaluate_path("\\_REV"), Ok(Value::Integer(2)));
        assert_eq!(i.evaluate_path("\\_OS"), Ok(Value::String(OS_NAME.into())));
    }

    #[test]
    fn dword_field_writes_into_a_method_buffer() {
        // Method (CRS) {
        //   Name (RBUF, Buffer (8) {})
        //   CreateDWordField (RBUF, 4, BASE)
        //   Store (0x12345678, BASE)
        //   Return (RBUF)
        // }
        let mut ctx = load(&[
            0x14, 0x29, b'C', b'R', b'S', b'_', 0x00, //
            0x08, b'R', b'B', b'U', b'F', 0x11, 0x03, 0x0A, 0x08, //
            0x8A, b'R', b'B', b'U', b'F', 0x0A, 0x04, b'B', b'A', b'S', b'E', //
            0x70, 0x0C, 0x78, 0x56, 0x34, 0x12, b'B', b'A', b'S', b'E', //
            0xA4, b'R', b'B', b'U', b'F',
        ]);
        assert_eq!(
            ctx.interpreter().evaluate_path("\\CRS"),
            Ok(Value::Buffer(vec![0, 0, 0, 0, 0x78, 0x56, 0x34, 0x12]))
        );
    }

    #[test]
    fn byte_index_overflow_is_out_of_range() {
        // Method (HUGE) {
        //   Name (RBUF, Buffer (8) {})
        //   CreateDWordField (RBUF, 0x2000000000000000, BASE)
        //   Return (BASE)
        // }
        let mut ctx = load(&[
            0x14, 0x27, b'H', b'U', b'G', b'E', 0x00, //
            0x08, b'R', b'B', b'U', b'F', 0x11, 0x03, 0x0A, 0x08, //
            0x8A, b'R', b'B', b'U', b'F', 0x0E, 0, 0, 0, 0, 0, 0, 0, 0x20, b'B', b'A', b'S', b'E', //
            0xA4, b'B', b'A', b'S', b'E',
        ]);
        assert_eq!(
            ctx.interpreter().evaluate_path("\\HUGE"),
            Err(Unresolved::OutOfRange {
                index: 0x2000_0000_0000_0000,
                len: 8
            })
        );
    }

    #[test]
    fn oversized_buffers_and_packages_are_refused() {
        // Name (BIG_, Buffer (0xFFFFFFFFFFFF) {})
        // Name (PKG_, VarPackage (0x10000) {})
        // Name (SML_, Buffer (0x10) {})
        let mut ctx = load(&[
            0x08, b'B', b'I', b'G', b'_', 0x11, 0x0A, 0x0E, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, //
            0x08, b'P', b'K', b'G', b'_', 0x13, 0x06, 0x0C, 0x00, 0x00, 0x01, 0x00, //
            0x08, b'S', b'M', b'L', b'_', 0x11, 0x03, 0x0A, 0x10,
        ]);
        let mut i = ctx.interpreter();
        assert_eq!(
            i.evaluate_path("\\BIG_"),
            Err(Unresolved::OutOfRange {
                index: 0xFFFF_FFFF_FFFF,
                len: MAX_BUFFER_LEN
            })
        );
        assert_eq!(
            i.evaluate_path("\\PKG_"),
            Err(Unresolved::OutOfRange {
                index: 0x1_0000,
                len: MAX_PACKAGE_LEN
            })
        );
        assert_eq!(i.evaluate_path("\\SML_"), Ok(Value::Buffer(vec![0; 16])));
    }

    #[test]
    fn cond_ref_of_does_not_invoke_a_method() {
        // Method (M1, 1) { Return (Arg0) }
        // Method (TST) { If (CondRefOf (M1)) { Return (One) } Return (Zero) }
        let mut ctx = load(&[
            0x14, 0x08, b'M', b'1', b'_', b'_', 0x01, 0xA4, 0x68, //
            0x14, 0x13, b'T', b'S', b'T', b'_', 0x00, //
            0xA0, 0x0A, 0x5B, 0x12, b'M', b'1', b'_', b'_', 0x00, 0xA4, 0x01, //
            0xA4, 0x00,
        ]);
        assert!(ctx.deferred().is_empty());
        assert_eq!(ctx.interpreter().evaluate_path("\\TST"), Ok(Value::Integer(1)));
    }

    #[test]
    fn unbounded_recursion_is_cut_off() {
        // Method (RECR) { Return (RECR ()) }
        let mut ctx = load(&[
            0x14, 0x0B, b'R', b'E', b'C', b'R', 0x00, 0xA4, b'R', b'E', b'C', b'R',
        ]);
        assert!(matches!(
            ctx.interpreter().evaluate_path("\\RECR"),
            Err(Unresolved::Depth(_))
        ));
    }

    #[test]
    fn bit_helpers() {
        let bytes = [0b1010_0000, 0x01];
        assert_eq!(extract_bits(&bytes, 5, 4), Ok(Value::Integer(0b1101)));
        let mut b = [0u8; 2];
        insert_bits(&mut b, 4, 8, &Value::Integer(0xAB)).unwrap();
        assert_eq!(b, [0xB0, 0x0A]);
        assert!(extract_bits(&bytes, 10, 8).is_err());
    }

    #[test]
    fn conversions_and_helpers() {
        assert_eq!(from_bcd(0x1234), 1234);
        assert_eq!(to_bcd(1234), 0x1234);
        assert_eq!(strip_end_tag(&[0x47, 0x79, 0x00]), &[0x47]);
        assert_eq!(buffer_string(b"abc\0def", u64::MAX), "abc");
        assert_eq!(
            concat(&Value::String("a".into()), &Value::Integer(1)),
            Ok(Value::String("a0000000000000001".into()))
        );
        assert_eq!(
            mid(&Value::Buffer(vec![1, 2, 3, 4]), 1, 2),
            Ok(Value::Buffer(vec![2, 3]))
        );
    }
}
