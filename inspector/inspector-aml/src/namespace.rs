//! The ACPI namespace as an arena of nodes.
//!
//! Each node is a scope holding a map from name segment to child handle.
//! Handles stay valid for the life of the namespace. Redefining a name
//! replaces the object bound to the existing handle, so earlier references
//! and children remain attached.
//!
//! Lookup rules:
//! * a bare single segment is searched in the given scope, then in each
//!   parent up to the root;
//! * `\` names start at the root and `^` prefixes climb from the given scope;
//!   neither searches.

use std::collections::BTreeMap;
use core::fmt;

use log::debug;

use crate::AmlError;
use crate::name::{NameSeg, NameString};
use crate::tree::TreeId;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    const ROOT: Self = Self(0);

    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Objects every namespace starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predefined {
    /// `\_OSI(Arg0)`: operating system interface query.
    Osi,
    /// `\_OS_`: operating system name.
    Os,
    /// `\_REV`: supported ACPI revision.
    Rev,
    /// `\_GL_`: global lock mutex.
    GlobalLock,
    /// `\_DLM`: device lock mutex list.
    Dlm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// The root, a predefined scope, or a parent created for a name whose
    /// scope was never defined.
    Scope,
    Device,
    Method { args: u8, serialized: bool },
    Name,
    Alias,
    OperationRegion,
    FieldUnit,
    BufferField,
    Mutex,
    Event,
    Processor,
    PowerResource,
    ThermalZone,
    DataRegion,
    External { object_type: u8, args: u8 },
    Predefined(Predefined),
}

/// `ObjectType` value of an external method declaration.
pub const EXTERNAL_METHOD: u8 = 8;

impl ObjectKind {
    /// Number of arguments if invoking this object consumes arguments.
    #[must_use]
    pub const fn method_args(&self) -> Option<u8> {
        match self {
            Self::Method { args, .. } => Some(*args),
            Self::External {
                object_type: EXTERNAL_METHOD,
                args,
            } => Some(*args),
            Self::Predefined(Predefined::Osi) => Some(1),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Scope => "Scope",
            Self::Device => "Device",
            Self::Method { .. } => "Method",
            Self::Name => "Name",
            Self::Alias => "Alias",
            Self::OperationRegion => "OperationRegion",
            Self::FieldUnit => "Field",
            Self::BufferField => "BufferField",
            Self::Mutex => "Mutex",
            Self::Event => "Event",
            Self::Processor => "Processor",
            Self::PowerResource => "PowerResource",
            Self::ThermalZone => "ThermalZone",
            Self::DataRegion => "DataTableRegion",
            Self::External { .. } => "External",
            Self::Predefined(_) => "Predefined",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NsNode {
    pub name: NameSeg,
    pub parent: Option<NodeId>,
    pub kind: ObjectKind,
    /// The term that defines the object.
    pub definition: Option<TreeId>,
    /// Cached result of evaluating the object.
    pub value: Option<Value>,
    children: BTreeMap<NameSeg, NodeId>,
    live: bool,
}

#[derive(Debug, Clone)]
pub struct Namespace {
    nodes: Vec<NsNode>,
}

const PREDEFINED_SCOPES: [&[u8; 4]; 5] = [b"_GPE", b"_PR_", b"_SB_", b"_SI_", b"_TZ_"];

const PREDEFINED_OBJECTS: [(&[u8; 4], Predefined); 5] = [
    (b"_GL_", Predefined::GlobalLock),
    (b"_OSI", Predefined::Osi),
    (b"_OS_", Predefined::Os),
    (b"_REV", Predefined::Rev),
    (b"_DLM", Predefined::Dlm),
];

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    /// A namespace holding the root, the predefined scopes and the
    /// predefined objects.
    #[must_use]
    pub fn new() -> Self {
        let mut ns = Self {
            nodes: vec![NsNode {
                name: NameSeg(*b"\\___"),
                parent: None,
                kind: ObjectKind::Scope,
                definition: None,
                value: None,
                children: BTreeMap::new(),
                live: true,
            }],
        };
        for seg in PREDEFINED_SCOPES {
            ns.insert(NodeId::ROOT, NameSeg(*seg), ObjectKind::Scope, None);
        }
        for (seg, p) in PREDEFINED_OBJECTS {
            ns.insert(NodeId::ROOT, NameSeg(*seg), ObjectKind::Predefined(p), None);
        }
        ns
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NsNode> {
        self.nodes.get(id.index())
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<ObjectKind> {
        self.get(id).map(|n| n.kind)
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    #[must_use]
    pub fn child(&self, scope: NodeId, seg: NameSeg) -> Option<NodeId> {
        self.get(scope).and_then(|n| n.children.get(&seg).copied())
    }

    /// Children of `id` in name order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id)
            .map(|n| n.children.values().copied().collect())
            .unwrap_or_default()
    }

    /// Whether `id` is still reachable from the root.
    #[must_use]
    pub fn is_live(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.live)
    }

    /// Number of nodes ever allocated, including unregistered ones.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Absolute path of `id`, e.g. `\_SB_.PCI0`.
    #[must_use]
    pub fn path(&self, id: NodeId) -> String {
        let mut segs = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == NodeId::ROOT {
                break;
            }
            let Some(n) = self.get(c) else { break };
            segs.push(n.name.to_string());
            cur = n.parent;
        }
        segs.reverse();
        format!("\\{}", segs.join("."))
    }

    pub fn set_value(&mut self, id: NodeId, value: Value) {
        if let Some(n) = self.nodes.get_mut(id.index()) {
            n.value = Some(value);
        }
    }

    fn insert(&mut self, parent: NodeId, name: NameSeg, kind: ObjectKind, definition: Option<TreeId>) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(NsNode {
            name,
            parent: Some(parent),
            kind,
            definition,
            value: None,
            children: BTreeMap::new(),
            live: true,
        });
        if let Some(p) = self.nodes.get_mut(parent.index()) {
            p.children.insert(name, id);
        }
        id
    }

    /// The node a prefixed name starts from: the root for `\`, otherwise
    /// `scope` climbed once per `^`.
    fn base(&self, scope: NodeId, name: &NameString) -> Result<NodeId, AmlError> {
        if name.root {
            return Ok(NodeId::ROOT);
        }
        let mut base = scope;
        for _ in 0..name.parents {
            base = self.parent(base).ok_or_else(|| AmlError::ScopeMismatch {
                offset: 0,
                reason: format!("{name} climbs above the root from {}", self.path(scope)),
            })?;
        }
        Ok(base)
    }

    /// Resolves `name` as seen from `scope`.
    #[must_use]
    pub fn lookup(&self, scope: NodeId, name: &NameString) -> Option<NodeId> {
        self.search(scope, name, false)
    }

    /// Like [`Namespace::lookup`], but `External` declarations are passed
    /// over as if absent.
    #[must_use]
    pub fn lookup_defined(&self, scope: NodeId, name: &NameString) -> Option<NodeId> {
        self.search(scope, name, true)
    }

    fn search(&self, scope: NodeId, name: &NameString, skip_external: bool) -> Option<NodeId> {
        let accept = |id: NodeId| !(skip_external && self.kind(id).is_some_and(|k| k.is_external()));

        if name.is_search_candidate() {
            let seg = name.last()?;
            let mut cur = Some(scope);
            while let Some(s) = cur {
                if let Some(id) = self.child(s, seg)
                    && accept(id)
                {
                    return Some(id);
                }
                cur = self.parent(s);
            }
            return None;
        }

        let mut node = self.base(scope, name).ok()?;
        for &seg in &name.segments {
            node = self.child(node, seg)?;
        }
        accept(node).then_some(node)
    }

    /// Resolves an absolute path written in ASL spelling, e.g. `\_SB.PCI0`.
    #[must_use]
    pub fn lookup_path(&self, path: &str) -> Option<NodeId> {
        let name: NameString = path.parse().ok()?;
        self.lookup(NodeId::ROOT, &name)
    }

    /// The scope a definition of `name` lands in, creating missing
    /// intermediate scopes.
    fn definition_scope(&mut self, scope: NodeId, name: &NameString) -> Result<NodeId, AmlError> {
        let mut node = self.base(scope, name)?;
        let parents = name.segments.len().saturating_sub(1);
        for &seg in &name.segments[..parents] {
            node = match self.child(node, seg) {
                Some(id) => id,
                None => {
                    debug!("{}.{seg} is used as a scope before it is defined", self.path(node));
                    self.insert(node, seg, ObjectKind::Scope, None)
                }
            };
        }
        Ok(node)
    }

    /// Binds `name` (relative to `scope`) to a new object.
    ///
    /// * An existing `External` declaration or implicit scope is replaced.
    /// * A new `External` declaration never replaces an existing object.
    /// * Otherwise the later definition wins.
    ///
    /// The handle of an existing name is kept, so its children survive.
    ///
    /// # Errors
    /// * [`AmlError::Malformed`] for a name without segments.
    /// * [`AmlError::ScopeMismatch`] if the name climbs above the root.
    pub fn register(
        &mut self,
        scope: NodeId,
        name: &NameString,
        kind: ObjectKind,
        definition: Option<TreeId>,
    ) -> Result<NodeId, AmlError> {
        let seg = name
            .last()
            .ok_or_else(|| AmlError::Malformed(format!("cannot define the null name in {}", self.path(scope))))?;
        let parent = self.definition_scope(scope, name)?;

        let Some(id) = self.child(parent, seg) else {
            return Ok(self.insert(parent, seg, kind, definition));
        };
        let Some(existing) = self.nodes.get_mut(id.index()) else {
            return Ok(id);
        };

        if definition.is_some() && existing.definition == definition {
            existing.kind = kind;
        } else if kind.is_external() {
            // keep whatever is there
        } else {
            if !existing.kind.is_external() && existing.kind != ObjectKind::Scope {
                debug!(
                    "{} is redefined as {} (previously {})",
                    self.path(id),
                    kind.label(),
                    self.nodes[id.index()].kind.label()
                );
            }
            let n = &mut self.nodes[id.index()];
            n.kind = kind;
            n.definition = definition;
            n.value = None;
        }
        Ok(id)
    }

    /// Resolves the target of `Scope(name)`.
    ///
    /// Unknown targets are created as implicit scopes so that their contents
    /// still land at the right path.
    ///
    /// # Errors
    /// [`AmlError::ScopeMismatch`] if the name climbs above the root.
    pub fn open_scope(&mut self, scope: NodeId, name: &NameString) -> Result<NodeId, AmlError> {
        if name.is_null() {
            return Ok(scope);
        }
        if name.root && name.segments.is_empty() {
            return Ok(NodeId::ROOT);
        }
        if let Some(id) = self.lookup(scope, name) {
            return Ok(id);
        }
        self.register(scope, name, ObjectKind::Scope, None)
    }

    /// Removes `id` and everything below it from the namespace.
    pub fn unregister(&mut self, id: NodeId) {
        if id == NodeId::ROOT {
            return;
        }
        let Some(n) = self.get(id) else { return };
        let (name, parent) = (n.name, n.parent);
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p.index()))
            && p.children.get(&name) == Some(&id)
        {
            p.children.remove(&name);
        }
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(n) = self.nodes.get_mut(cur.index()) {
                n.live = false;
                stack.extend(n.children.values().copied());
            }
        }
    }

    /// Live devices in definition order.
    #[must_use]
    pub fn devices(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.live && n.kind == ObjectKind::Device)
            .filter_map(|(i, _)| u32::try_from(i).ok().map(NodeId))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> NameString {
        s.parse().unwrap()
    }

    #[test]
    fn predefined_objects_exist() {
        let ns = Namespace::new();
        let osi = ns.lookup_path("\\_OSI").unwrap();
        assert_eq!(ns.kind(osi).and_then(|k| k.method_args()), Some(1));
        assert!(ns.lookup_path("\\_SB").is_some());
        assert_eq!(ns.path(ns.root()), "\\");
    }

    #[test]
    fn single_segments_search_outward() {
        let mut ns = Namespace::new();
        let root = ns.root();
        let sb = ns.lookup_path("\\_SB").unwrap();
        let pci = ns.register(sb, &name("PCI0"), ObjectKind::Device, None).unwrap();
        let gnvs = ns.register(root, &name("GNVS"), ObjectKind::OperationRegion, None).unwrap();

        assert_eq!(ns.lookup(pci, &name("GNVS")), Some(gnvs));
        assert_eq!(ns.lookup(pci, &name("PCI0")), Some(pci));
        assert_eq!(ns.path(pci), "\\_SB_.PCI0");
        // dotted names do not search
        assert_eq!(ns.lookup(pci, &name("_SB.PCI0")), None);
        assert_eq!(ns.lookup(root, &name("_SB.PCI0")), Some(pci));
    }

    #[test]
    fn parent_prefix_climbs() {
        let mut ns = Namespace::new();
        let sb = ns.lookup_path("\\_SB").unwrap();
        let pci = ns.register(sb, &name("PCI0"), ObjectKind::Device, None).unwrap();
        let lpc = ns.register(pci, &name("LPCB"), ObjectKind::Device, None).unwrap();
        let ec = ns.register(lpc, &name("EC0"), ObjectKind::Device, None).unwrap();
        assert_eq!(ns.lookup(ec, &name("^^LPCB")), Some(lpc));
        assert_eq!(ns.lookup(ec, &name("^EC0")), Some(ec));
        assert!(ns.register(ns.root(), &name("^FOO"), ObjectKind::Name, None).is_err());
    }

    #[test]
    fn later_definition_wins_and_keeps_children() {
        let mut ns = Namespace::new();
        let root = ns.root();
        let first = ns.register(root, &name("DEV0"), ObjectKind::Device, None).unwrap();
        let child = ns.register(first, &name("_ADR"), ObjectKind::Name, None).unwrap();
        let second = ns.register(root, &name("DEV0"), ObjectKind::PowerResource, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(ns.kind(first), Some(ObjectKind::PowerResource));
        assert_eq!(ns.lookup_path("\\DEV0._ADR"), Some(child));
    }

    #[test]
    fn externals_yield_to_definitions() {
        let mut ns = Namespace::new();
        let root = ns.root();
        let ext = ObjectKind::External {
            object_type: EXTERNAL_METHOD,
            args: 2,
        };
        let id = ns.register(root, &name("MTHD"), ext, None).unwrap();
        assert_eq!(ns.lookup_defined(root, &name("MTHD")), None);

        let method = ObjectKind::Method {
            args: 2,
            serialized: false,
        };
        ns.register(root, &name("MTHD"), method, None).unwrap();
        ns.register(root, &name("MTHD"), ext, None).unwrap();
        assert_eq!(ns.kind(id), Some(method));
        assert_eq!(ns.lookup_defined(root, &name("MTHD")), Some(id));
    }

    #[test]
    fn definitions_create_missing_scopes() {
        let mut ns = Namespace::new();
        let id = ns.register(ns.root(), &name("\\_SB.PCI0.FOO"), ObjectKind::Name, None).unwrap();
        let pci = ns.lookup_path("\\_SB.PCI0").unwrap();
        assert_eq!(ns.kind(pci), Some(ObjectKind::Scope));
        assert_eq!(ns.parent(id), Some(pci));

        let dev = ns.register(ns.lookup_path("\\_SB").unwrap(), &name("PCI0"), ObjectKind::Device, None);
        assert_eq!(dev.unwrap(), pci);
    }

    #[test]
    fn unregister_removes_the_subtree() {
        let mut ns = Namespace::new();
        let root = ns.root();
        let dev = ns.register(root, &name("DEV0"), ObjectKind::Device, None).unwrap();
        let sta = ns.register(dev, &name("_STA"), ObjectKind::Name, None).unwrap();
        assert_eq!(ns.devices(), vec![dev]);

        ns.unregister(dev);
        assert!(!ns.is_live(dev) && !ns.is_live(sta));
        assert_eq!(ns.lookup_path("\\DEV0"), None);
        assert!(ns.devices().is_empty());
    }
}
