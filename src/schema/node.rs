//! Schema nodes and the node arena.
//!
//! Nodes form intrusive doubly-linked sibling chains: `next` runs
//! forward, `prev` runs backward, and the first sibling's `prev` points
//! at the last one, giving O(1) append. Top-level chains are anchored in
//! the owning main module's `data` field; all other chains hang off
//! their parent's `child` field.

use std::any::Any;
use std::ops::{Index, IndexMut};

use crate::context::Context;
use crate::dict::Sym;
use crate::error::{YangError, YangResult};
use crate::schema::typ::YangType;
use crate::schema::{FeatureRef, ModuleId, ModuleKind, NodeId, Typedef};

/// NACM extension flag: `default-deny-write`
pub const NACM_DENY_WRITE: u8 = 0x01;
/// NACM extension flag: `default-deny-all`
pub const NACM_DENY_ALL: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Current,
    Deprecated,
    Obsolete,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Current => "current",
            Status::Deprecated => "deprecated",
            Status::Obsolete => "obsolete",
        }
    }
}

/// An XPath `must` constraint, kept syntactically.
#[derive(Debug, Clone)]
pub struct Must {
    pub expr: Sym,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
    pub emsg: Option<Sym>,
    pub eapptag: Option<Sym>,
}

/// An XPath `when` condition, kept syntactically.
#[derive(Debug, Clone)]
pub struct When {
    pub cond: Sym,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
}

/// One `refine` under a `uses`.
#[derive(Debug, Clone)]
pub struct Refine {
    pub target_path: Sym,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
    pub presence: Option<Sym>,
    pub default: Option<Sym>,
    pub config: Option<bool>,
    pub mandatory: Option<bool>,
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub musts: Vec<Must>,
}

#[derive(Debug, Default)]
pub struct ContainerBody {
    pub presence: Option<Sym>,
    pub typedefs: Vec<Typedef>,
    pub musts: Vec<Must>,
    pub when: Option<When>,
}

#[derive(Debug)]
pub struct ListBody {
    /// Ordered key leaves, resolved from the `key` argument
    pub keys: Vec<NodeId>,
    /// Resolved `unique` leaf groups, one per `unique` statement
    pub uniques: Vec<Vec<NodeId>>,
    /// The `unique` arguments as written, for printing
    pub uniques_raw: Vec<Sym>,
    pub min: u32,
    /// 0 means unbounded
    pub max: u32,
    pub min_set: bool,
    pub max_set: bool,
    pub ordered_by_user: bool,
    pub typedefs: Vec<Typedef>,
    pub musts: Vec<Must>,
    pub when: Option<When>,
}

impl Default for ListBody {
    fn default() -> Self {
        ListBody {
            keys: Vec::new(),
            uniques: Vec::new(),
            uniques_raw: Vec::new(),
            min: 0,
            max: 0,
            min_set: false,
            max_set: false,
            ordered_by_user: false,
            typedefs: Vec::new(),
            musts: Vec::new(),
            when: None,
        }
    }
}

#[derive(Debug)]
pub struct LeafBody {
    pub typ: YangType,
    pub units: Option<Sym>,
    pub default: Option<Sym>,
    pub musts: Vec<Must>,
    pub when: Option<When>,
    /// Leaves whose leafref type targets this leaf
    pub backlinks: Vec<NodeId>,
}

#[derive(Debug)]
pub struct LeafListBody {
    pub typ: YangType,
    pub units: Option<Sym>,
    pub musts: Vec<Must>,
    pub when: Option<When>,
    pub backlinks: Vec<NodeId>,
    pub min: u32,
    /// 0 means unbounded
    pub max: u32,
    pub min_set: bool,
    pub max_set: bool,
    pub ordered_by_user: bool,
}

#[derive(Debug, Default)]
pub struct ChoiceBody {
    /// Default case (or shorthand member), resolved from its name
    pub default: Option<NodeId>,
    pub when: Option<When>,
}

#[derive(Debug, Default)]
pub struct CaseBody {
    pub when: Option<When>,
}

#[derive(Debug, Default)]
pub struct AnyXmlBody {
    pub musts: Vec<Must>,
    pub when: Option<When>,
}

#[derive(Debug)]
pub struct UsesBody {
    /// `prefix:name` of the grouping as written
    pub grouping_name: Sym,
    pub grouping: Option<NodeId>,
    pub refines: Vec<Refine>,
    /// Augment nodes with targets relative to this uses
    pub augments: Vec<NodeId>,
    pub when: Option<When>,
}

#[derive(Debug, Default)]
pub struct GroupingBody {
    pub typedefs: Vec<Typedef>,
}

#[derive(Debug)]
pub struct AugmentBody {
    pub target_path: Sym,
    pub target: Option<NodeId>,
    pub when: Option<When>,
    /// Children spliced into the target, in splice order
    pub spliced: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct RpcBody {
    pub typedefs: Vec<Typedef>,
}

#[derive(Debug, Default)]
pub struct InOutBody {
    pub typedefs: Vec<Typedef>,
}

#[derive(Debug, Default)]
pub struct NotifBody {
    pub typedefs: Vec<Typedef>,
}

/// Nodetype-specific body.
#[derive(Debug)]
pub enum NodeKind {
    Container(ContainerBody),
    List(ListBody),
    Leaf(LeafBody),
    LeafList(LeafListBody),
    Choice(ChoiceBody),
    Case(CaseBody),
    AnyXml(AnyXmlBody),
    Uses(UsesBody),
    Grouping(GroupingBody),
    Augment(AugmentBody),
    Rpc(RpcBody),
    Input(InOutBody),
    Output(InOutBody),
    Notification(NotifBody),
}

impl NodeKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            NodeKind::Container(_) => "container",
            NodeKind::List(_) => "list",
            NodeKind::Leaf(_) => "leaf",
            NodeKind::LeafList(_) => "leaf-list",
            NodeKind::Choice(_) => "choice",
            NodeKind::Case(_) => "case",
            NodeKind::AnyXml(_) => "anyxml",
            NodeKind::Uses(_) => "uses",
            NodeKind::Grouping(_) => "grouping",
            NodeKind::Augment(_) => "augment",
            NodeKind::Rpc(_) => "rpc",
            NodeKind::Input(_) => "input",
            NodeKind::Output(_) => "output",
            NodeKind::Notification(_) => "notification",
        }
    }

    /// true for node kinds that carry instance data themselves
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            NodeKind::Container(_)
                | NodeKind::List(_)
                | NodeKind::Leaf(_)
                | NodeKind::LeafList(_)
                | NodeKind::AnyXml(_)
        )
    }
}

/// A node of the schema tree.
pub struct SchemaNode {
    pub name: Sym,
    pub dsc: Option<Sym>,
    pub reference: Option<Sym>,
    pub status: Status,
    /// Effective config, after inheritance
    pub config: bool,
    /// true when `config` was written on the node itself
    pub config_set: bool,
    pub mandatory: bool,
    pub mandatory_set: bool,
    pub iffeatures: Vec<FeatureRef>,
    pub nacm: u8,
    pub parent: Option<NodeId>,
    pub child: Option<NodeId>,
    pub next: Option<NodeId>,
    /// Last sibling when this node is the first of its chain
    pub prev: Option<NodeId>,
    pub module: ModuleId,
    pub kind: NodeKind,
    /// Opaque application slot; the only field mutable after sealing
    /// besides feature and deviation state
    pub private: Option<Box<dyn Any>>,
}

impl SchemaNode {
    pub fn new(name: Sym, module: ModuleId, kind: NodeKind) -> Self {
        SchemaNode {
            name,
            dsc: None,
            reference: None,
            status: Status::Current,
            config: true,
            config_set: false,
            mandatory: false,
            mandatory_set: false,
            iffeatures: Vec::new(),
            nacm: 0,
            parent: None,
            child: None,
            next: None,
            prev: None,
            module,
            kind,
            private: None,
        }
    }

    pub fn musts(&self) -> &[Must] {
        match &self.kind {
            NodeKind::Container(b) => &b.musts,
            NodeKind::List(b) => &b.musts,
            NodeKind::Leaf(b) => &b.musts,
            NodeKind::LeafList(b) => &b.musts,
            NodeKind::AnyXml(b) => &b.musts,
            _ => &[],
        }
    }

    pub fn when(&self) -> Option<&When> {
        match &self.kind {
            NodeKind::Container(b) => b.when.as_ref(),
            NodeKind::List(b) => b.when.as_ref(),
            NodeKind::Leaf(b) => b.when.as_ref(),
            NodeKind::LeafList(b) => b.when.as_ref(),
            NodeKind::Choice(b) => b.when.as_ref(),
            NodeKind::Case(b) => b.when.as_ref(),
            NodeKind::AnyXml(b) => b.when.as_ref(),
            NodeKind::Uses(b) => b.when.as_ref(),
            NodeKind::Augment(b) => b.when.as_ref(),
            _ => None,
        }
    }

    pub fn typedefs(&self) -> &[Typedef] {
        match &self.kind {
            NodeKind::Container(b) => &b.typedefs,
            NodeKind::List(b) => &b.typedefs,
            NodeKind::Grouping(b) => &b.typedefs,
            NodeKind::Rpc(b) => &b.typedefs,
            NodeKind::Input(b) => &b.typedefs,
            NodeKind::Output(b) => &b.typedefs,
            NodeKind::Notification(b) => &b.typedefs,
            _ => &[],
        }
    }

    pub(crate) fn typedefs_mut(&mut self) -> &mut Vec<Typedef> {
        let keyword = self.kind.keyword();
        match &mut self.kind {
            NodeKind::Container(b) => &mut b.typedefs,
            NodeKind::List(b) => &mut b.typedefs,
            NodeKind::Grouping(b) => &mut b.typedefs,
            NodeKind::Rpc(b) => &mut b.typedefs,
            NodeKind::Input(b) => &mut b.typedefs,
            NodeKind::Output(b) => &mut b.typedefs,
            NodeKind::Notification(b) => &mut b.typedefs,
            _ => panic!("node kind {keyword:?} carries no typedefs"),
        }
    }

    pub fn leaf_type(&self) -> Option<&YangType> {
        match &self.kind {
            NodeKind::Leaf(b) => Some(&b.typ),
            NodeKind::LeafList(b) => Some(&b.typ),
            _ => None,
        }
    }
}

impl std::fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaNode")
            .field("name", &self.name)
            .field("kind", &self.kind.keyword())
            .field("module", &self.module)
            .finish()
    }
}

/// Slab arena holding every schema node of a repository.
#[derive(Default)]
pub struct NodeArena {
    slots: Vec<Option<SchemaNode>>,
    free: Vec<u32>,
}

impl NodeArena {
    pub fn alloc(&mut self, node: SchemaNode) -> NodeId {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx as usize] = Some(node);
                NodeId(idx)
            }
            None => {
                self.slots.push(Some(node));
                NodeId((self.slots.len() - 1) as u32)
            }
        }
    }

    pub fn dealloc(&mut self, id: NodeId) -> Option<SchemaNode> {
        let slot = self.slots.get_mut(id.index())?;
        let node = slot.take();
        if node.is_some() {
            self.free.push(id.0);
        }
        node
    }

    pub fn get(&self, id: NodeId) -> Option<&SchemaNode> {
        self.slots.get(id.index()).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SchemaNode> {
        self.slots.get_mut(id.index()).and_then(|s| s.as_mut())
    }

    /// All live node ids, in slot order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| NodeId(i as u32))
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `new_id` to the chain starting at `first`; returns the
    /// (possibly unchanged) chain head.
    pub fn append_to_chain(&mut self, first: Option<NodeId>, new_id: NodeId) -> NodeId {
        match first {
            None => {
                let node = &mut self[new_id];
                node.prev = Some(new_id);
                node.next = None;
                new_id
            }
            Some(head) => {
                let last = self[head].prev.unwrap_or(head);
                self[last].next = Some(new_id);
                self[new_id].prev = Some(last);
                self[new_id].next = None;
                self[head].prev = Some(new_id);
                head
            }
        }
    }

    /// Remove `id` from the chain starting at `head`; returns the new
    /// head. The caller stores it back into the anchor (`parent.child`
    /// or the module's `data`).
    pub fn unlink_from_chain(&mut self, head: NodeId, id: NodeId) -> Option<NodeId> {
        let prev = self[id].prev;
        let next = self[id].next;
        let new_head = if head == id {
            match next {
                Some(n) => {
                    // keep the head's back pointer on the last sibling
                    self[n].prev = if prev == Some(id) { Some(n) } else { prev };
                    Some(n)
                }
                None => None,
            }
        } else {
            let p = prev.unwrap_or(head);
            self[p].next = next;
            match next {
                Some(n) => self[n].prev = prev,
                None => self[head].prev = prev,
            }
            Some(head)
        };
        let node = &mut self[id];
        node.parent = None;
        node.prev = None;
        node.next = None;
        new_head
    }

    /// Walk a sibling chain front to back.
    pub fn chain(&self, first: Option<NodeId>) -> ChainIter<'_> {
        ChainIter { arena: self, cur: first }
    }
}

impl Index<NodeId> for NodeArena {
    type Output = SchemaNode;

    fn index(&self, id: NodeId) -> &SchemaNode {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node id {:?}", id),
        }
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale node id {:?}", id),
        }
    }
}

pub struct ChainIter<'a> {
    arena: &'a NodeArena,
    cur: Option<NodeId>,
}

impl Iterator for ChainIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.cur?;
        self.cur = self.arena[id].next;
        Some(id)
    }
}

/// Main module of the module that owns `node` (resolves submodules to
/// their owner).
pub fn main_module(ctx: &Context, mid: ModuleId) -> ModuleId {
    match ctx.module(mid).kind {
        ModuleKind::Module => mid,
        ModuleKind::Submodule { belongs_to } => belongs_to,
    }
}

/// true when the node sits inside a grouping definition.
pub(crate) fn in_grouping(ctx: &Context, node: NodeId) -> bool {
    let mut cur = Some(node);
    while let Some(id) = cur {
        if matches!(ctx.nodes[id].kind, NodeKind::Grouping(_)) {
            return true;
        }
        cur = ctx.nodes[id].parent;
    }
    false
}

/// Slash-separated breadcrumb of a node, used in error messages.
pub fn schema_path(ctx: &Context, node: NodeId) -> String {
    let mut parts = Vec::new();
    let mut cur = Some(node);
    while let Some(id) = cur {
        let n = &ctx.nodes[id];
        let module = ctx.module(main_module(ctx, n.module));
        parts.push(format!("{}:{}", module.name, n.name));
        cur = n.parent;
    }
    parts.reverse();
    format!("/{}", parts.join("/"))
}

/// A node is disabled when it, or any schema ancestor, carries an
/// `if-feature` whose feature is not enabled.
pub fn is_disabled(ctx: &Context, node: NodeId) -> bool {
    let mut cur = Some(node);
    while let Some(id) = cur {
        let n = &ctx.nodes[id];
        for ff in &n.iffeatures {
            if !ctx.feature_enabled(*ff) {
                return true;
            }
        }
        cur = n.parent;
    }
    false
}

/// Names visible at a data level: direct children, descending through
/// choice, case and uses bodies, which share the namespace of their
/// parent level. Grouping definitions are a separate namespace and are
/// skipped.
pub(crate) fn visible_names(
    ctx: &Context,
    first: Option<NodeId>,
    out: &mut Vec<(ModuleId, Sym, NodeId)>,
) {
    for id in ctx.nodes.chain(first) {
        let n = &ctx.nodes[id];
        match &n.kind {
            NodeKind::Grouping(_) | NodeKind::Augment(_) => {}
            // a uses is transparent; its name is the grouping reference,
            // not a data identifier
            NodeKind::Uses(_) => visible_names(ctx, n.child, out),
            NodeKind::Choice(_) | NodeKind::Case(_) => {
                out.push((main_module(ctx, n.module), n.name.clone(), id));
                visible_names(ctx, n.child, out);
            }
            _ => out.push((main_module(ctx, n.module), n.name.clone(), id)),
        }
    }
}

/// Check that `name` (of module `mid`) does not collide at the level of
/// `first` (a chain head).
pub(crate) fn check_name_free(
    ctx: &Context,
    first: Option<NodeId>,
    mid: ModuleId,
    name: &str,
    except: Option<NodeId>,
) -> YangResult<()> {
    let mut names = Vec::new();
    visible_names(ctx, first, &mut names);
    let main = main_module(ctx, mid);
    for (m, n, id) in names {
        if Some(id) == except {
            continue;
        }
        if m == main && n == name {
            return Err(YangError::DuplicateIdentifier(format!(
                "{name:?} already used at {}",
                schema_path(ctx, id)
            )));
        }
    }
    Ok(())
}

/// Chain head of the instantiated level a new child of `parent` will
/// surface at: choice and case are transparent namespaces, so the
/// uniqueness scope is the nearest real ancestor's child chain.
pub(crate) fn level_chain(
    ctx: &Context,
    parent: Option<NodeId>,
    mid: ModuleId,
) -> Option<NodeId> {
    let mut anchor = parent;
    while let Some(p) = anchor {
        match ctx.nodes[p].kind {
            NodeKind::Choice(_) | NodeKind::Case(_) => anchor = ctx.nodes[p].parent,
            _ => break,
        }
    }
    match anchor {
        Some(p) => ctx.nodes[p].child,
        None => ctx.module(main_module(ctx, mid)).data,
    }
}

/// Children as instance data sees them: descends through choice, case
/// and uses; skips groupings, rpcs and notifications live at the top
/// level only.
pub fn data_children(ctx: &Context, first: Option<NodeId>, out: &mut Vec<NodeId>) {
    for id in ctx.nodes.chain(first) {
        let n = &ctx.nodes[id];
        match &n.kind {
            NodeKind::Grouping(_) | NodeKind::Augment(_) => {}
            NodeKind::Choice(_) | NodeKind::Case(_) | NodeKind::Uses(_) => {
                data_children(ctx, n.child, out)
            }
            _ => out.push(id),
        }
    }
}

/// Find a data child by name below `parent` (or at the top level of
/// `module` when `parent` is `None`), transparently through choice,
/// case and uses.
pub fn find_data_child(
    ctx: &Context,
    parent: Option<NodeId>,
    module: ModuleId,
    name: &str,
) -> Option<NodeId> {
    let first = match parent {
        Some(p) => ctx.nodes[p].child,
        None => ctx.module(main_module(ctx, module)).data,
    };
    let mut kids = Vec::new();
    data_children(ctx, first, &mut kids);
    kids.into_iter().find(|&id| ctx.nodes[id].name == name)
}

/// Like [`find_data_child`], but the match is also qualified by the
/// owning main module; used by leafref path walking, where each
/// segment may carry its own prefix.
pub(crate) fn find_data_child_in(
    ctx: &Context,
    parent: Option<NodeId>,
    chain_module: ModuleId,
    want: ModuleId,
    name: &str,
) -> Option<NodeId> {
    let first = match parent {
        Some(p) => ctx.nodes[p].child,
        None => ctx.module(main_module(ctx, chain_module)).data,
    };
    let mut kids = Vec::new();
    data_children(ctx, first, &mut kids);
    kids.into_iter().find(|&id| {
        let n = &ctx.nodes[id];
        n.name == name && main_module(ctx, n.module) == want
    })
}

/// Find any schema child by name (no transparency), as schema node id
/// paths address nodes.
pub fn find_schema_child(
    ctx: &Context,
    parent: Option<NodeId>,
    module: ModuleId,
    name: &str,
    in_module: Option<ModuleId>,
) -> Option<NodeId> {
    let first = match parent {
        Some(p) => ctx.nodes[p].child,
        None => ctx.module(main_module(ctx, module)).data,
    };
    ctx.nodes.chain(first).find(|&id| {
        let n = &ctx.nodes[id];
        if matches!(n.kind, NodeKind::Grouping(_) | NodeKind::Augment(_)) {
            return false;
        }
        if let Some(want) = in_module {
            if main_module(ctx, n.module) != want {
                return false;
            }
        }
        n.name == name
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::Sym;
    use crate::schema::ModuleId;

    fn mknode(name: &str) -> SchemaNode {
        SchemaNode::new(
            Sym::detached(name),
            ModuleId(0),
            NodeKind::Container(ContainerBody::default()),
        )
    }

    #[test]
    fn test_chain_append_and_back_pointer() {
        let mut arena = NodeArena::default();
        let a = arena.alloc(mknode("a"));
        let b = arena.alloc(mknode("b"));
        let c = arena.alloc(mknode("c"));
        let head = arena.append_to_chain(None, a);
        let head = arena.append_to_chain(Some(head), b);
        let head = arena.append_to_chain(Some(head), c);
        assert_eq!(head, a);
        // first sibling's prev points at the last for O(1) append
        assert_eq!(arena[a].prev, Some(c));
        assert_eq!(arena[a].next, Some(b));
        assert_eq!(arena[b].next, Some(c));
        assert_eq!(arena[c].next, None);
    }

    #[test]
    fn test_chain_unlink_middle_and_head() {
        let mut arena = NodeArena::default();
        let a = arena.alloc(mknode("a"));
        let b = arena.alloc(mknode("b"));
        let c = arena.alloc(mknode("c"));
        let mut head = arena.append_to_chain(None, a);
        head = arena.append_to_chain(Some(head), b);
        head = arena.append_to_chain(Some(head), c);

        let head = arena.unlink_from_chain(head, b).unwrap();
        assert_eq!(head, a);
        assert_eq!(arena[a].next, Some(c));
        assert_eq!(arena[c].prev, Some(a));
        assert_eq!(arena[a].prev, Some(c));

        let head = arena.unlink_from_chain(head, a).unwrap();
        assert_eq!(head, c);
        assert_eq!(arena[c].prev, Some(c));
        assert_eq!(arena[c].next, None);

        assert!(arena.unlink_from_chain(head, c).is_none());
    }
}
