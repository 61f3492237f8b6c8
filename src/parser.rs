use crate::boxes::{BoxBody, BoxHeader, BoxTree, FourCC, FullBoxHeader, Node, NodeId};
use crate::cursor::ByteCursor;
use crate::error::{ParseError, Result};
use crate::registry::{BoxDecoder, Registry, default_registry};

/// 32-bit size plus 4CC.
const MIN_HEADER_SIZE: u64 = 8;

/// Reads a box header, where `available` is the number of bytes left in the
/// enclosing span (the whole buffer for top-level boxes).
pub fn read_box_header(cur: &mut ByteCursor<'_>, available: u64) -> Result<BoxHeader> {
    let start = cur.position();
    let need = |needed: u64| -> Result<()> {
        if needed > available {
            return Err(ParseError::Truncated {
                offset: start,
                needed,
                available,
            });
        }
        Ok(())
    };

    need(MIN_HEADER_SIZE)?;
    let size32 = cur.read_u32()?;
    let typ = cur.read_fourcc()?;
    let mut header_size = MIN_HEADER_SIZE;
    let mut size = size32 as u64;

    if size32 == 1 {
        need(header_size + 8)?;
        size = cur.read_u64()?;
        header_size += 8;
    }

    let mut uuid = None;
    if typ == FourCC::UUID {
        need(header_size + 16)?;
        uuid = Some(cur.read_array::<16>()?);
        header_size += 16;
    }

    let to_end = size32 == 0;
    if to_end {
        size = available;
    }

    if size < header_size {
        return Err(ParseError::InvalidSize {
            typ,
            offset: start,
            size,
            header_size,
        });
    }
    if size > available {
        return Err(ParseError::OutOfBounds {
            typ,
            offset: start,
            size,
            available,
        });
    }

    Ok(BoxHeader {
        size,
        typ,
        uuid,
        header_size,
        start,
        to_end,
    })
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Deepest nesting level accepted; top-level boxes are depth 0.
    pub max_depth: usize,
    /// When false, a box whose decoder leaves trailing bytes unread has them
    /// skipped with a warning instead of failing the parse. Over-reads are
    /// always fatal.
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            strict: true,
        }
    }
}

/// Builds box trees from in-memory buffers.
pub struct Parser {
    registry: Registry,
    options: ParseOptions,
}

impl Parser {
    /// Parser using [`default_registry`] and default options.
    pub fn new() -> Self {
        Self::with_registry(default_registry())
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parses `data` as a sequence of top-level boxes.
    pub fn parse(&self, data: &[u8]) -> Result<BoxTree> {
        let mut session = Session {
            cursor: ByteCursor::new(data),
            tree: BoxTree::default(),
            registry: &self.registry,
            options: &self.options,
        };
        while session.cursor.remaining() > 0 {
            let available = session.cursor.remaining();
            session.parse_box(None, available, None)?;
        }
        log::debug!(
            "parsed {} boxes ({} top-level) from {} bytes",
            session.tree.len(),
            session.tree.roots.len(),
            data.len()
        );
        Ok(session.tree)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses `data` with the default registry and options.
pub fn parse(data: &[u8]) -> Result<BoxTree> {
    Parser::new().parse(data)
}

pub(crate) struct Session<'a> {
    cursor: ByteCursor<'a>,
    tree: BoxTree,
    registry: &'a Registry,
    options: &'a ParseOptions,
}

impl Session<'_> {
    fn parse_box(
        &mut self,
        parent: Option<NodeId>,
        available: u64,
        forced: Option<&dyn BoxDecoder>,
    ) -> Result<NodeId> {
        let header = read_box_header(&mut self.cursor, available)?;
        let (typ, offset) = (header.typ, header.start);
        let depth = parent.map_or(0, |p| self.tree.node(p).depth + 1);
        if depth > self.options.max_depth {
            return Err(ParseError::TooDeep { typ, offset, depth });
        }
        log::trace!(
            "box '{}' at {:#x}: size={} header={} depth={}",
            typ,
            offset,
            header.size,
            header.header_size,
            depth
        );

        let key = header.key();
        let id = self.tree.push(Node {
            consumed: header.header_size,
            header,
            parent,
            children: Vec::new(),
            depth,
            body: BoxBody::Opaque,
        });

        let registry = self.registry;
        let decoder = match forced {
            Some(d) => d,
            None => registry.decoder_for(&key),
        };
        let body = {
            let mut reader = BoxReader { session: self, id };
            decoder.decode(&mut reader)
        }
        .map_err(|e| e.in_box(typ, offset))?;
        self.finish(id)?;

        self.tree.node_mut(id).body = body;
        match parent {
            Some(p) => self.tree.node_mut(p).children.push(id),
            None => self.tree.roots.push(id),
        }
        Ok(id)
    }

    /// Enforces `consumed == size` once a decoder has returned.
    fn finish(&mut self, id: NodeId) -> Result<()> {
        let node = self.tree.node(id);
        let (typ, offset) = (node.header.typ, node.header.start);
        let (declared, consumed) = (node.header.size, node.consumed);
        if consumed == declared {
            return Ok(());
        }
        if self.options.strict || consumed > declared {
            return Err(ParseError::StructuralMismatch {
                typ,
                offset,
                declared,
                consumed,
            });
        }
        log::warn!(
            "box '{}' at {:#x}: skipping {} undecoded trailing bytes",
            typ,
            offset,
            declared - consumed
        );
        self.cursor
            .skip(declared - consumed)
            .map_err(|e| e.in_box(typ, offset))?;
        self.tree.node_mut(id).consumed = declared;
        Ok(())
    }
}

/// Handle given to a [`BoxDecoder`] while one box is being parsed.
///
/// All reads are bounded by the box's declared size and counted towards its
/// consumed bytes. Reading past the declared size is a
/// [`ParseError::StructuralMismatch`].
pub struct BoxReader<'s, 'a> {
    session: &'s mut Session<'a>,
    id: NodeId,
}

impl<'a> BoxReader<'_, 'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn node(&self) -> &Node {
        self.session.tree.node(self.id)
    }

    pub fn header(&self) -> &BoxHeader {
        &self.node().header
    }

    pub fn typ(&self) -> FourCC {
        self.node().header.typ
    }

    pub fn offset(&self) -> u64 {
        self.node().header.start
    }

    pub fn consumed(&self) -> u64 {
        self.node().consumed
    }

    /// Bytes of this box not yet read.
    pub fn remaining(&self) -> u64 {
        let node = self.node();
        node.header.size - node.consumed
    }

    /// The partially built tree: every ancestor of this box and every
    /// completed earlier sibling is present.
    pub fn tree(&self) -> &BoxTree {
        &self.session.tree
    }

    fn take<T>(
        &mut self,
        n: u64,
        read: impl FnOnce(&mut ByteCursor<'a>) -> Result<T>,
    ) -> Result<T> {
        if n > self.remaining() {
            let node = self.node();
            return Err(ParseError::StructuralMismatch {
                typ: node.header.typ,
                offset: node.header.start,
                declared: node.header.size,
                consumed: node.consumed + n,
            });
        }
        let v = read(&mut self.session.cursor)?;
        self.session.tree.node_mut(self.id).consumed += n;
        Ok(v)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.take(1, ByteCursor::read_u8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.take(2, ByteCursor::read_u16)
    }

    pub fn read_u24(&mut self) -> Result<u32> {
        self.take(3, ByteCursor::read_u24)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.take(4, ByteCursor::read_u32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.take(8, ByteCursor::read_u64)
    }

    pub fn read_fourcc(&mut self) -> Result<FourCC> {
        self.take(4, ByteCursor::read_fourcc)
    }

    pub fn read_bytes(&mut self, n: u64) -> Result<&'a [u8]> {
        self.take(n, |c| c.read_bytes(n))
    }

    pub fn read_fixed_string(&mut self, n: u64) -> Result<String> {
        self.take(n, |c| c.read_fixed_string(n))
    }

    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.take(n, |c| c.skip(n))
    }

    pub fn skip_remaining(&mut self) -> Result<()> {
        let n = self.remaining();
        self.skip(n)
    }

    /// Reads the 1-byte version and 24-bit flags of a full box.
    pub fn read_full_box_prefix(&mut self) -> Result<FullBoxHeader> {
        let version = self.read_u8()?;
        let flags = self.read_u24()?;
        Ok(FullBoxHeader { version, flags })
    }

    /// Fails unless `version` is 0 or 1.
    pub fn require_version(&self, version: u8) -> Result<()> {
        if version > 1 {
            return Err(ParseError::UnsupportedVersion {
                typ: self.typ(),
                offset: self.offset(),
                version,
            });
        }
        Ok(())
    }

    /// Reads a 64-bit value for version 1 boxes, a 32-bit one otherwise.
    pub fn read_versioned(&mut self, version: u8) -> Result<u64> {
        if version == 1 {
            self.read_u64()
        } else {
            Ok(self.read_u32()? as u64)
        }
    }

    /// Parses child boxes until this box's declared span is exhausted.
    ///
    /// In lenient mode a tail too short to hold a box header is left for
    /// the engine to skip.
    pub fn parse_children(&mut self) -> Result<()> {
        while self.remaining() > 0 {
            if !self.session.options.strict && self.remaining() < MIN_HEADER_SIZE {
                log::debug!(
                    "box '{}' at {:#x}: {} trailing bytes cannot hold a child box",
                    self.typ(),
                    self.offset(),
                    self.remaining()
                );
                break;
            }
            self.parse_child()?;
        }
        Ok(())
    }

    /// Parses one child, dispatched through the registry.
    pub fn parse_child(&mut self) -> Result<NodeId> {
        self.child(None)
    }

    /// Parses one child with a specific decoder, bypassing the registry.
    pub fn parse_child_with(&mut self, decoder: &dyn BoxDecoder) -> Result<NodeId> {
        self.child(Some(decoder))
    }

    fn child(&mut self, decoder: Option<&dyn BoxDecoder>) -> Result<NodeId> {
        let available = self.remaining();
        let child = self.session.parse_box(Some(self.id), available, decoder)?;
        let size = self.session.tree.node(child).header.size;
        self.session.tree.node_mut(self.id).consumed += size;
        Ok(child)
    }

    pub fn find_parent(&self, tag: FourCC) -> Option<NodeId> {
        self.session.tree.find_parent(self.id, tag)
    }

    /// Handler type of the enclosing media box: nearest `mdia` ancestor, then
    /// its `hdlr` child.
    pub fn media_handler(&self) -> Option<FourCC> {
        let tree = &self.session.tree;
        let media = tree.find_parent(self.id, FourCC::MDIA)?;
        let hdlr = tree.find_child(media, FourCC::HDLR)?;
        match &tree.node(hdlr).body {
            BoxBody::Handler(h) => Some(h.handler),
            _ => None,
        }
    }
}
