//! Abstract syntax tree
//!
//! Produced by the parser, consumed by the single-pass compiler. Every
//! node carries the 1-based source line it started on.

/// A parsed compilation unit (one source file)
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub stmts: Vec<Stmt>,
}

/// Statement forms
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `name := value` or `nonlocal name := value`
    Assign {
        nonlocal: bool,
        name: String,
        value: Expr,
        line: u32,
    },
    /// `&name := value` (receiver field write)
    FieldAssign {
        name: String,
        value: Expr,
        line: u32,
    },
    /// `Ns fn recv selector { body }` (top level only)
    Method(MethodDef),
    /// `type Name` (top level only)
    Type { name: String, line: u32 },
    /// `if cond return value`
    ReturnIf { cond: Expr, value: Expr, line: u32 },
    /// `loop` — restart the enclosing function body
    Loop { line: u32 },
    /// Bare expression
    Expr(Expr),
}

/// A method definition: selector labels are already concatenated and
/// parameter names validated for duplicates by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    /// Namespace the method installs into
    pub namespace: String,
    /// Receiver parameter name (slot 0)
    pub receiver: String,
    /// Full selector (`x:y:`, `string`, `+`, …)
    pub selector: String,
    /// Explicit parameter names (slots 1..)
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub line: u32,
}

/// A keyword-send argument
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    /// Keyword label including the trailing colon
    pub key: String,
    /// Rank attached to this argument (0 = none)
    pub rank: u16,
    pub value: Expr,
}

/// Expression forms
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Keyword message send; `selector` is the concatenated labels
    Call {
        recv: Box<Expr>,
        recv_rank: u16,
        selector: String,
        args: Vec<Arg>,
        line: u32,
    },
    /// Binary operator send
    Binary {
        lhs: Box<Expr>,
        lhs_rank: u16,
        op: String,
        rhs: Box<Expr>,
        rhs_rank: u16,
        line: u32,
    },
    /// `value type Ns` role test
    TypeTest {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        line: u32,
    },
    /// Unary message send (`x string`, `p &x`)
    Unary {
        recv: Box<Expr>,
        recv_rank: u16,
        method: String,
        line: u32,
    },
    /// `x[y]`, sugar for `x at_: y`
    Index {
        recv: Box<Expr>,
        index: Box<Expr>,
        line: u32,
    },
    /// `{ |params| body }`
    Lambda {
        params: Vec<String>,
        body: Vec<Stmt>,
        line: u32,
    },
    /// `[a, b, c]`
    List { items: Vec<Expr>, line: u32 },
    /// `#[k: v, …]`
    Table {
        entries: Vec<(Expr, Expr)>,
        line: u32,
    },
    /// `'name`
    SymbolLit { name: String, line: u32 },
    /// Bare identifier
    Name { name: String, line: u32 },
    /// `&name` field read of the receiver
    Field { name: String, line: u32 },
    /// Numeric literal
    Number { value: f64, line: u32 },
    /// Uninterpolated string segment
    Str { value: String, line: u32 },
    /// `#'…'` regex literal (pattern source)
    Regex { pattern: String, line: u32 },
    /// Interpolated string; parts are literal segments and embedded
    /// expressions in order
    Interp { parts: Vec<Expr>, line: u32 },
}

impl Expr {
    /// Source line the expression starts on
    pub fn line(&self) -> u32 {
        match self {
            Expr::Call { line, .. }
            | Expr::Binary { line, .. }
            | Expr::TypeTest { line, .. }
            | Expr::Unary { line, .. }
            | Expr::Index { line, .. }
            | Expr::Lambda { line, .. }
            | Expr::List { line, .. }
            | Expr::Table { line, .. }
            | Expr::SymbolLit { line, .. }
            | Expr::Name { line, .. }
            | Expr::Field { line, .. }
            | Expr::Number { line, .. }
            | Expr::Str { line, .. }
            | Expr::Regex { line, .. }
            | Expr::Interp { line, .. } => *line,
        }
    }
}
