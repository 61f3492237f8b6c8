use crate::fields::{Entry, Field, FieldSource};
use crate::movie::{
    AudioSampleEntry, HandlerBox, HintSampleEntry, MediaHeader, MovieHeader, SampleDescription,
    TrackHeader, VisualSampleEntry,
};
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const MOOV: FourCC = FourCC(*b"moov");
    pub const TRAK: FourCC = FourCC(*b"trak");
    pub const MDIA: FourCC = FourCC(*b"mdia");
    pub const HDLR: FourCC = FourCC(*b"hdlr");
    pub const UUID: FourCC = FourCC(*b"uuid");

    /// Builds a tag from exactly four bytes of text.
    pub fn new(s: &str) -> Option<Self> {
        let b: [u8; 4] = s.as_bytes().try_into().ok()?;
        Some(FourCC(b))
    }

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl From<&[u8; 4]> for FourCC {
    fn from(b: &[u8; 4]) -> Self {
        FourCC(*b)
    }
}

#[derive(Debug, Clone)]
pub struct BoxHeader {
    /// Total size including the header. A declared size of 0 is resolved to
    /// the end of the enclosing span and flagged with `to_end`.
    pub size: u64,
    pub typ: FourCC,
    pub uuid: Option<[u8; 16]>,
    /// 8, 16, 24 or 32 bytes.
    pub header_size: u64,
    /// Offset of the first header byte.
    pub start: u64,
    pub to_end: bool,
}

impl BoxHeader {
    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    pub fn payload_size(&self) -> u64 {
        self.size - self.header_size
    }

    pub fn key(&self) -> BoxKey {
        match self.uuid {
            Some(u) => BoxKey::Uuid(u),
            None => BoxKey::FourCC(self.typ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoxKey {
    FourCC(FourCC),
    Uuid([u8; 16]),
}

/// Version and flags prefix shared by "full" boxes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullBoxHeader {
    pub version: u8,
    pub flags: u32,
}

/// Decoded payload of a node.
#[derive(Debug)]
pub enum BoxBody {
    /// Geometry only; the payload was skipped.
    Opaque,
    /// Payload is a sequence of child boxes.
    Container,
    MovieHeader(MovieHeader),
    TrackHeader(TrackHeader),
    MediaHeader(MediaHeader),
    Handler(HandlerBox),
    SampleDescription(SampleDescription),
    VisualSampleEntry(VisualSampleEntry),
    AudioSampleEntry(AudioSampleEntry),
    HintSampleEntry(HintSampleEntry),
    /// Body produced by a decoder registered outside this crate.
    Custom(Box<dyn FieldSource>),
}

impl BoxBody {
    pub fn fields(&self) -> Vec<Field> {
        match self {
            BoxBody::Opaque | BoxBody::Container => Vec::new(),
            BoxBody::MovieHeader(b) => b.fields(),
            BoxBody::TrackHeader(b) => b.fields(),
            BoxBody::MediaHeader(b) => b.fields(),
            BoxBody::Handler(b) => b.fields(),
            BoxBody::SampleDescription(b) => b.fields(),
            BoxBody::VisualSampleEntry(b) => b.fields(),
            BoxBody::AudioSampleEntry(b) => b.fields(),
            BoxBody::HintSampleEntry(b) => b.fields(),
            BoxBody::Custom(b) => b.fields(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct Node {
    pub header: BoxHeader,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Bytes of this box read so far, header included.
    pub consumed: u64,
    pub depth: usize,
    pub body: BoxBody,
}

/// Arena holding every parsed box. Parents refer to children by index and
/// children to parents by index, so the tree has no ownership cycles.
#[derive(Debug, Default)]
pub struct BoxTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) roots: Vec<NodeId>,
}

impl BoxTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn view(&self, id: NodeId) -> BoxView<'_> {
        BoxView { tree: self, id }
    }

    pub fn roots(&self) -> impl Iterator<Item = BoxView<'_>> + '_ {
        self.roots.iter().map(move |&id| self.view(id))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Nearest strict ancestor of `id` tagged `tag`.
    pub fn find_parent(&self, id: NodeId, tag: FourCC) -> Option<NodeId> {
        let mut cur = self.node(id).parent;
        while let Some(p) = cur {
            let node = self.node(p);
            if node.header.typ == tag {
                return Some(p);
            }
            cur = node.parent;
        }
        None
    }

    /// First immediate child of `id` tagged `tag`.
    pub fn find_child(&self, id: NodeId, tag: FourCC) -> Option<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|&c| self.node(c).header.typ == tag)
    }

    /// Every box in file order (depth first, parents before children).
    pub fn iter(&self) -> impl Iterator<Item = BoxView<'_>> + '_ {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.node(id).children.iter().rev().copied());
            Some(self.view(id))
        })
    }

    pub fn find_all(&self, tag: FourCC) -> impl Iterator<Item = BoxView<'_>> + '_ {
        self.iter().filter(move |b| b.typ() == tag)
    }
}

/// Borrowed handle to one box of a [`BoxTree`].
#[derive(Clone, Copy)]
pub struct BoxView<'t> {
    tree: &'t BoxTree,
    id: NodeId,
}

impl<'t> BoxView<'t> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t BoxTree {
        self.tree
    }

    pub fn node(&self) -> &'t Node {
        self.tree.node(self.id)
    }

    pub fn header(&self) -> &'t BoxHeader {
        &self.node().header
    }

    pub fn typ(&self) -> FourCC {
        self.node().header.typ
    }

    pub fn size(&self) -> u64 {
        self.node().header.size
    }

    pub fn consumed(&self) -> u64 {
        self.node().consumed
    }

    pub fn body(&self) -> &'t BoxBody {
        &self.node().body
    }

    pub fn parent(&self) -> Option<BoxView<'t>> {
        self.node().parent.map(|p| self.tree.view(p))
    }

    pub fn children(self) -> impl Iterator<Item = BoxView<'t>> {
        let tree = self.tree;
        self.node().children.iter().map(move |&c| tree.view(c))
    }

    pub fn find_parent(&self, tag: FourCC) -> Option<BoxView<'t>> {
        self.tree
            .find_parent(self.id, tag)
            .map(|p| self.tree.view(p))
    }

    pub fn find_child(&self, tag: FourCC) -> Option<BoxView<'t>> {
        self.tree
            .find_child(self.id, tag)
            .map(|c| self.tree.view(c))
    }

    /// This box's own fields, base fields first.
    pub fn fields(&self) -> Vec<Field> {
        self.body().fields()
    }

    /// Own fields followed by every child as a nested entry. Each call
    /// starts a fresh sequence.
    pub fn entries(self) -> impl Iterator<Item = Entry<'t>> {
        let fields = self.fields().into_iter().map(Entry::Field);
        fields.chain(self.children().map(Entry::Box))
    }
}

impl fmt::Debug for BoxView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxView")
            .field("typ", &self.typ())
            .field("offset", &self.header().start)
            .field("size", &self.size())
            .finish()
    }
}
