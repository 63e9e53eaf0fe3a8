use crate::{object::Object, AmlError};
use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use core::{fmt, str, str::FromStr};
use log::warn;

/// The maximum number of times a name is re-resolved while evaluating it. AML can legally
/// chain names (a name whose value is another name), but a chain longer than this is
/// assumed to be cyclic and evaluation fails with [`AmlError::ResolutionDidNotConverge`].
pub const MAX_RESOLUTION_DEPTH: usize = 10;

/// Identifies a node in the namespace arena. Ids are allocated from a monotonic counter
/// and are never reused, so a stale id held across a name-group teardown can never
/// silently alias a newer node - it simply stops resolving.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct NodeId(u32);

impl NodeId {
    fn bump(&mut self) -> NodeId {
        let current = *self;
        self.0 += 1;
        current
    }
}

/// A single named node. The children list is kept in reverse creation order (new nodes go
/// to the front), matching the namespace construction order dependence of real tables.
#[derive(Clone, Debug)]
pub struct Node {
    pub seg: NameSeg,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub object: Object,
}

/// Name groups batch together every node created while they are active, so a method
/// invocation can reclaim everything it defined in one pass at return.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NameGroupKind {
    Root,
    MethodInvocation,
}

#[derive(Clone, Debug)]
struct NameGroup {
    kind: NameGroupKind,
    members: Vec<NodeId>,
}

#[derive(Clone)]
pub struct Namespace {
    nodes: BTreeMap<NodeId, Node>,
    next_id: NodeId,
    root: NodeId,
    groups: Vec<NameGroup>,
}

impl Namespace {
    pub fn new() -> Namespace {
        let mut next_id = NodeId(0);
        let root = next_id.bump();
        let mut nodes = BTreeMap::new();
        nodes.insert(
            root,
            Node { seg: NameSeg([b'\\', b'_', b'_', b'_']), parent: None, children: Vec::new(), object: Object::Uninitialized },
        );

        Namespace {
            nodes,
            next_id,
            root,
            groups: vec![NameGroup { kind: NameGroupKind::Root, members: Vec::new() }],
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, AmlError> {
        self.nodes.get(&id).ok_or(AmlError::StaleNode)
    }

    pub fn object(&self, id: NodeId) -> Result<&Object, AmlError> {
        Ok(&self.node(id)?.object)
    }

    pub fn object_mut(&mut self, id: NodeId) -> Result<&mut Object, AmlError> {
        Ok(&mut self.nodes.get_mut(&id).ok_or(AmlError::StaleNode)?.object)
    }

    /// Look for a direct child of `parent` with the given segment. Absence is an expected
    /// outcome, not an error - `create` and lookup both build on this.
    pub fn find(&self, parent: NodeId, seg: NameSeg) -> Option<NodeId> {
        let parent = self.nodes.get(&parent)?;
        parent.children.iter().copied().find(|&child| {
            self.nodes.get(&child).map(|node| node.seg == seg).unwrap_or(false)
        })
    }

    /// Find-or-create a direct child of `parent`. Creating the same name twice returns the
    /// node made the first time. New nodes join the currently active name group, and go to
    /// the front of the parent's child list.
    pub fn create(&mut self, parent: NodeId, seg: NameSeg) -> Result<NodeId, AmlError> {
        if let Some(existing) = self.find(parent, seg) {
            return Ok(existing);
        }
        if !self.nodes.contains_key(&parent) {
            return Err(AmlError::StaleNode);
        }

        let id = self.next_id.bump();
        self.nodes.insert(id, Node { seg, parent: Some(parent), children: Vec::new(), object: Object::Uninitialized });
        self.nodes.get_mut(&parent).unwrap().children.insert(0, id);
        self.groups.last_mut().unwrap().members.push(id);
        Ok(id)
    }

    /// Walk `path` (which must be absolute) from the root, without creating anything.
    pub fn id_for_path(&self, path: &AmlName) -> Result<NodeId, AmlError> {
        assert!(path.is_absolute());
        let path = path.clone().normalize()?;

        let mut current = self.root;
        for component in &path.components[1..] {
            let NameComponent::Segment(seg) = component else {
                return Err(AmlError::InvalidNormalizedName(path.clone()));
            };
            current = self.find(current, *seg).ok_or_else(|| AmlError::ObjectDoesNotExist(path.clone()))?;
        }
        Ok(current)
    }

    /// Walk `path` from the root, creating any missing interior and leaf nodes. Used while
    /// loading tables and defining names inside methods.
    pub fn create_path(&mut self, path: &AmlName) -> Result<NodeId, AmlError> {
        assert!(path.is_absolute());
        let path = path.clone().normalize()?;

        let mut current = self.root;
        for component in &path.components[1..] {
            let NameComponent::Segment(seg) = component else {
                return Err(AmlError::InvalidNormalizedName(path.clone()));
            };
            current = self.create(current, *seg)?;
        }
        Ok(current)
    }

    /// Attach `object` to the node at `path`, creating the node if needed. Real tables
    /// redefine names now and then, so a collision replaces the old object rather than
    /// erroring (we warn, as it can break things).
    pub fn insert(&mut self, path: &AmlName, object: Object) -> Result<NodeId, AmlError> {
        let id = self.create_path(path)?;
        let slot = self.object_mut(id)?;
        if !matches!(slot, Object::Uninitialized) {
            warn!("AML name collision at {}. Replacing object.", path);
        }
        *slot = object;
        Ok(id)
    }

    /// Find an object by path, applying the namespace search rules: a bare single-segment
    /// relative name that is not found in the starting scope is retried in each enclosing
    /// scope up to the root. Longer or absolute paths resolve exactly. Returns the
    /// absolute name the object was found under together with its node.
    pub fn search(&self, path: &AmlName, starting_scope: &AmlName) -> Result<(AmlName, NodeId), AmlError> {
        assert!(starting_scope.is_absolute());

        if path.search_rules_apply() {
            let mut scope = starting_scope.clone().normalize()?;
            loop {
                let candidate = path.resolve(&scope)?;
                if let Ok(id) = self.id_for_path(&candidate) {
                    return Ok((candidate, id));
                }

                match scope.parent() {
                    Ok(parent) => scope = parent,
                    Err(AmlError::RootHasNoParent) => return Err(AmlError::ObjectDoesNotExist(path.clone())),
                    Err(err) => return Err(err),
                }
            }
        } else {
            let name = path.resolve(starting_scope)?;
            let id = self.id_for_path(&name)?;
            Ok((name, id))
        }
    }

    /// The absolute name of a node, reconstructed by walking its parent links.
    pub fn path_of(&self, id: NodeId) -> Result<AmlName, AmlError> {
        let mut segments = Vec::new();
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            segments.push(NameComponent::Segment(current.seg));
            current = self.node(parent)?;
        }
        segments.push(NameComponent::Root);
        segments.reverse();
        Ok(AmlName::from_components(segments))
    }

    /// Open a new name group. Every node created until the matching `end_group` belongs to
    /// it. Called at method invocation entry.
    pub fn begin_group(&mut self) {
        self.groups.push(NameGroup { kind: NameGroupKind::MethodInvocation, members: Vec::new() });
    }

    /// Close the most recent name group, destroying every node it collected. Members are
    /// destroyed in reverse creation order, so children always go before their parents;
    /// the root group is never closed.
    pub fn end_group(&mut self) {
        if self.groups.last().map(|group| group.kind) != Some(NameGroupKind::MethodInvocation) {
            return;
        }

        let group = self.groups.pop().unwrap();
        for id in group.members.into_iter().rev() {
            self.remove_node(id);
        }
    }

    fn remove_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        if let Some(parent) = node.parent {
            if let Some(parent) = self.nodes.get_mut(&parent) {
                parent.children.retain(|&child| child != id);
            }
        }
    }

    /// Visit every node in the namespace, depth-first. `f` returns whether the node's
    /// children should be visited too; errors abort the walk.
    pub fn walk<F>(&self, mut f: F) -> Result<(), AmlError>
    where
        F: FnMut(&AmlName, &Node) -> Result<bool, AmlError>,
    {
        fn walk_node<F>(namespace: &Namespace, id: NodeId, name: &AmlName, f: &mut F) -> Result<(), AmlError>
        where
            F: FnMut(&AmlName, &Node) -> Result<bool, AmlError>,
        {
            let node = namespace.node(id)?;
            if f(name, node)? {
                for &child in &node.children {
                    let child_name = AmlName::from_name_seg(namespace.node(child)?.seg).resolve(name)?;
                    walk_node(namespace, child, &child_name, f)?;
                }
            }
            Ok(())
        }

        walk_node(self, self.root, &AmlName::root(), &mut f)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn print_node(
            namespace: &Namespace,
            f: &mut fmt::Formatter<'_>,
            id: NodeId,
            indent: usize,
        ) -> fmt::Result {
            let node = namespace.nodes.get(&id).unwrap();
            for &child in &node.children {
                let child_node = namespace.nodes.get(&child).unwrap();
                writeln!(f, "{:indent$}{}: {}", "", child_node.seg.as_str(), child_node.object, indent = indent)?;
                print_node(namespace, f, child, indent + 4)?;
            }
            Ok(())
        }

        writeln!(f, "\\:")?;
        print_node(self, f, self.root, 4)
    }
}

/// A path through the namespace: an optional root anchor, zero or more parent prefixes,
/// and a list of 4-byte segments.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AmlName {
    components: Vec<NameComponent>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NameComponent {
    Root,
    Prefix,
    Segment(NameSeg),
}

impl AmlName {
    pub fn root() -> AmlName {
        AmlName { components: vec![NameComponent::Root] }
    }

    pub fn from_name_seg(seg: NameSeg) -> AmlName {
        AmlName { components: vec![NameComponent::Segment(seg)] }
    }

    pub fn from_components(components: Vec<NameComponent>) -> AmlName {
        assert!(!components.is_empty());
        AmlName { components }
    }

    pub fn is_absolute(&self) -> bool {
        self.components.first() == Some(&NameComponent::Root)
    }

    /// A name is normal when it carries no `^` prefixes.
    pub fn is_normal(&self) -> bool {
        !self.components.contains(&NameComponent::Prefix)
    }

    /// The upward search rules only apply to names that are a single bare segment.
    pub fn search_rules_apply(&self) -> bool {
        self.components.len() == 1 && matches!(self.components[0], NameComponent::Segment(_))
    }

    /// Fold away `^` prefixes by dropping the segment before each one. A prefix with no
    /// segment to consume (e.g. `\^FOO`) makes the name invalid.
    pub fn normalize(self) -> Result<AmlName, AmlError> {
        if self.is_normal() {
            return Ok(self);
        }

        let mut normalized: Vec<NameComponent> = Vec::with_capacity(self.components.len());
        for &component in &self.components {
            match component {
                NameComponent::Root | NameComponent::Segment(_) => normalized.push(component),
                NameComponent::Prefix => match normalized.last() {
                    Some(NameComponent::Segment(_)) => {
                        normalized.pop();
                    }
                    _ => return Err(AmlError::InvalidNormalizedName(self.clone())),
                },
            }
        }
        Ok(AmlName { components: normalized })
    }

    /// The scope containing this name. The root has no parent.
    pub fn parent(&self) -> Result<AmlName, AmlError> {
        let mut normalized = self.clone().normalize()?;
        match normalized.components.last() {
            None | Some(NameComponent::Root) => Err(AmlError::RootHasNoParent),
            Some(NameComponent::Segment(_)) => {
                normalized.components.pop();
                Ok(normalized)
            }
            Some(NameComponent::Prefix) => unreachable!(),
        }
    }

    /// Make this name absolute by resolving it against `scope` (which must itself be
    /// absolute). Absolute names pass through untouched; the result is normalized, so a
    /// `^` prefix that climbs past the root is reported here.
    pub fn resolve(&self, scope: &AmlName) -> Result<AmlName, AmlError> {
        assert!(scope.is_absolute());

        if self.is_absolute() {
            return self.clone().normalize();
        }

        let mut resolved = scope.clone();
        resolved.components.extend_from_slice(&self.components);
        resolved.normalize()
    }

    pub fn as_string(&self) -> String {
        let mut out = String::new();
        for component in &self.components {
            match component {
                NameComponent::Root => out.push('\\'),
                NameComponent::Prefix => out.push('^'),
                NameComponent::Segment(seg) => {
                    out.push_str(seg.as_str());
                    out.push('.');
                }
            }
        }
        out.trim_end_matches('.').to_string()
    }
}

impl FromStr for AmlName {
    type Err = AmlError;

    fn from_str(mut string: &str) -> Result<Self, Self::Err> {
        if string.is_empty() {
            return Err(AmlError::EmptyNamesAreInvalid);
        }

        let mut components = Vec::new();
        if let Some(rest) = string.strip_prefix('\\') {
            components.push(NameComponent::Root);
            string = rest;
        }

        if !string.is_empty() {
            for mut part in string.split('.') {
                while let Some(rest) = part.strip_prefix('^') {
                    components.push(NameComponent::Prefix);
                    part = rest;
                }
                components.push(NameComponent::Segment(NameSeg::from_str(part)?));
            }
        }

        Ok(AmlName { components })
    }
}

impl fmt::Display for AmlName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

/// A 4-character name segment. Segments shorter than 4 characters are padded with `_`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NameSeg(pub(crate) [u8; 4]);

impl NameSeg {
    pub fn from_str(string: &str) -> Result<NameSeg, AmlError> {
        if string.is_empty() || string.len() > 4 {
            return Err(AmlError::InvalidNameSeg([0xff, 0xff, 0xff, 0xff]));
        }

        let bytes = string.as_bytes();
        let mut seg = [b'_'; 4];
        seg[..bytes.len()].copy_from_slice(bytes);
        NameSeg::from_bytes(seg)
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Result<NameSeg, AmlError> {
        if !is_lead_name_char(bytes[0])
            || !is_name_char(bytes[1])
            || !is_name_char(bytes[2])
            || !is_name_char(bytes[3])
        {
            return Err(AmlError::InvalidNameSeg(bytes));
        }
        Ok(NameSeg(bytes))
    }

    pub fn as_str(&self) -> &str {
        // Construction guarantees the bytes are printable ASCII
        unsafe { str::from_utf8_unchecked(&self.0) }
    }
}

impl fmt::Debug for NameSeg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

pub fn is_lead_name_char(c: u8) -> bool {
    c.is_ascii_uppercase() || c == b'_'
}

pub fn is_name_char(c: u8) -> bool {
    is_lead_name_char(c) || c.is_ascii_digit()
}
