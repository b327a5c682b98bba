//! The shared tree representation.
//!
//! One arena owns every node of a compilation; child lists are id vectors in
//! source order. Nodes are mutated in place during analysis: resolved types
//! are cached, operator tags filled, and a node's kind is occasionally
//! replaced outright (field access becoming an enum-value reference).

use bitflags::bitflags;
use serde::Serialize;
use std::ops::{Index, IndexMut};

use crate::diagnostics::Loc;
use crate::scope::SymbolId;
use crate::types::BuiltinType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeFlags: u8 {
        /// Compiler-generated, not from source.
        const SYNTHETIC = 1 << 0;
        const ANALYZED = 1 << 1;
        const LOWERED = 1 << 2;
        /// Compiler-allocated slot, not a user name.
        const TEMPORARY = 1 << 3;
        /// Already sitting in the pending-dependency list.
        const PENDING_DEP = 1 << 4;
        /// Already sitting in the work queue.
        const QUEUED = 1 << 5;
    }
}

impl Serialize for NodeFlags {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(self.bits())
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Qualifiers: u8 {
        /// Exported to the interface file.
        const PUB = 1 << 0;
        /// Declared elsewhere; no definition emitted.
        const EXTERN = 1 << 1;
        /// Translation-unit-local storage.
        const STATIC = 1 << 2;
        const VOLATILE = 1 << 3;
        /// `var` (mutable) rather than `let`.
        const VAR = 1 << 4;
        /// Synthetic forward-declaration stub.
        const FORWARD_DECL = 1 << 5;
    }
}

impl Serialize for Qualifiers {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(self.bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
    AddrOf,
    Deref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    SatAdd,
    SatSub,
    SatMul,
    SatDiv,
    WrapAdd,
    WrapSub,
    WrapMul,
    WrapDiv,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Orelse,
}

/// Semantic operation category, independent of the surface spelling. Filled
/// during analysis; the emitter turns the tag plus the resolved type into a
/// runtime helper name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuiltinOp {
    SatAdd,
    SatSub,
    SatMul,
    SatDiv,
    WrapAdd,
    WrapSub,
    WrapMul,
    WrapDiv,
    CheckedAdd,
    CheckedSub,
    CheckedMul,
    CheckedDiv,
    CheckedMod,
    CheckedShl,
    CheckedShr,
    CheckedNeg,
    CheckedCast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CastStrategy {
    /// Plain C cast.
    Bare,
    /// Runtime-checked narrowing via a helper.
    Checked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalysisState {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

/// Per-declaration analysis progress: the overall state drives the work
/// queue, signature/body track function declarations.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeclStates {
    pub overall: AnalysisState,
    pub signature: AnalysisState,
    pub body: AnalysisState,
}

impl DeclStates {
    pub fn not_started() -> Self {
        DeclStates {
            overall: AnalysisState::NotStarted,
            signature: AnalysisState::NotStarted,
            body: AnalysisState::NotStarted,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeclData {
    pub name: String,
    pub quals: Qualifiers,
    /// Temporary slot id; zero for user names.
    pub tmp_id: u32,
    pub ty: Option<NodeId>,
    pub init: Option<NodeId>,
    pub states: DeclStates,
}

#[derive(Debug, Clone, Serialize)]
pub enum NodeKind {
    // --- Types ---
    NamedType {
        name: String,
        builtin: BuiltinType,
        /// Cached slot in the type table.
        entry: Option<usize>,
    },
    PointerType {
        pointee: NodeId,
    },
    ArrayType {
        elem: NodeId,
        /// Must be reducible to a literal.
        size: NodeId,
    },
    FnType {
        params: Vec<NodeId>,
        ret: NodeId,
    },
    OptionalType {
        inner: NodeId,
    },
    ErrorUnionType {
        inner: NodeId,
    },
    SliceType {
        elem: NodeId,
    },

    // --- Expressions ---
    IntLit {
        value: i64,
    },
    UintLit {
        value: u64,
    },
    BoolLit {
        value: bool,
    },
    StrLit {
        value: Vec<u8>,
    },
    NullLit,
    UndefinedLit,
    Ident {
        name: String,
        symbol: Option<SymbolId>,
        needs_user_prefix: bool,
    },
    Unary {
        op: UnOp,
        operand: NodeId,
        builtin: Option<BuiltinOp>,
    },
    Binary {
        op: BinOp,
        lhs: NodeId,
        rhs: NodeId,
        builtin: Option<BuiltinOp>,
    },
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    Index {
        object: NodeId,
        index: NodeId,
    },
    Field {
        object: NodeId,
        name: String,
        /// Object needed an implicit dereference.
        object_is_pointer: bool,
    },
    Cast {
        value: NodeId,
        target: NodeId,
        strategy: CastStrategy,
        runtime_func: Option<String>,
    },
    StructInit {
        fields: Vec<(String, NodeId)>,
    },
    ArrayInit {
        elems: Vec<NodeId>,
    },
    EnumValueRef {
        name: String,
        /// The enum's containing declaration.
        parent: NodeId,
    },
    Unwrap {
        operand: NodeId,
    },

    // --- Statements and declarations ---
    Block {
        stmts: Vec<NodeId>,
    },
    If {
        cond: NodeId,
        then_blk: NodeId,
        else_blk: Option<NodeId>,
    },
    For {
        init: Option<NodeId>,
        cond: Option<NodeId>,
        step: Option<NodeId>,
        body: NodeId,
    },
    Switch {
        value: NodeId,
        cases: Vec<NodeId>,
    },
    Case {
        /// Empty for the default case.
        values: Vec<NodeId>,
        stmts: Vec<NodeId>,
        /// Filled by analysis; cases always emit as blocks.
        block: Option<NodeId>,
    },
    Return {
        value: Option<NodeId>,
    },
    Break,
    Continue,
    Goto {
        label: String,
    },
    Label {
        name: String,
    },
    Assign {
        lhs: NodeId,
        rhs: NodeId,
    },
    ExprStmt {
        expr: NodeId,
    },
    Decl(DeclData),
    Param {
        name: String,
        ty: NodeId,
    },
    FieldDef {
        name: String,
        ty: NodeId,
        align: Option<NodeId>,
    },
    EnumDecl {
        underlying: Option<NodeId>,
        values: Vec<NodeId>,
    },
    EnumMember {
        name: String,
        value: Option<NodeId>,
        /// Containing declaration, for fully-qualified emission.
        parent: Option<NodeId>,
    },
    StructDecl {
        fields: Vec<NodeId>,
        align: Option<NodeId>,
        packed: bool,
    },
    UnionDecl {
        fields: Vec<NodeId>,
        align: Option<NodeId>,
        /// Tag type reference; non-null after analysis.
        tag: Option<NodeId>,
    },
    Function {
        params: Vec<NodeId>,
        ret: NodeId,
        /// None for extern functions.
        body: Option<NodeId>,
    },
    Module {
        decls: Vec<NodeId>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub loc: Loc,
    pub flags: NodeFlags,
    /// Cached resolved type, pointing at a type node.
    pub ty: Option<NodeId>,
    pub kind: NodeKind,
}

/// Flat arena owning every node. Dropping it releases the whole tree.
#[derive(Debug, Default, Serialize)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        NodeArena::default()
    }

    pub fn alloc(&mut self, loc: Loc, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            loc,
            flags: NodeFlags::empty(),
            ty: None,
            kind,
        });
        id
    }

    pub fn alloc_synthetic(&mut self, loc: Loc, kind: NodeKind) -> NodeId {
        let id = self.alloc(loc, kind);
        self[id].flags |= NodeFlags::SYNTHETIC;
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self[id].kind
    }

    pub fn loc(&self, id: NodeId) -> Loc {
        self[id].loc
    }

    pub fn is_synthetic(&self, id: NodeId) -> bool {
        self[id].flags.contains(NodeFlags::SYNTHETIC)
    }

    /// Deep-copy a (small) expression subtree. Used when one source
    /// expression must appear as the base of several synthesized accesses.
    pub fn clone_expr(&mut self, id: NodeId) -> NodeId {
        let node = self[id].clone();
        let kind = match node.kind {
            NodeKind::Ident {
                ref name,
                symbol,
                needs_user_prefix,
            } => NodeKind::Ident {
                name: name.clone(),
                symbol,
                needs_user_prefix,
            },
            NodeKind::Field {
                object,
                ref name,
                object_is_pointer,
            } => {
                let name = name.clone();
                let object = self.clone_expr(object);
                NodeKind::Field {
                    object,
                    name,
                    object_is_pointer,
                }
            }
            NodeKind::Index { object, index } => {
                let object = self.clone_expr(object);
                let index = self.clone_expr(index);
                NodeKind::Index { object, index }
            }
            NodeKind::Unary {
                op,
                operand,
                builtin,
            } => {
                let operand = self.clone_expr(operand);
                NodeKind::Unary {
                    op,
                    operand,
                    builtin,
                }
            }
            other => other,
        };
        let id = self.alloc(node.loc, kind);
        self[id].flags = node.flags;
        self[id].ty = node.ty;
        id
    }
}

impl Index<NodeId> for NodeArena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }
}
