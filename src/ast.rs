#![allow(dead_code)]

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Number {
        pos: Position,
        value: f64,
    },
    Str {
        pos: Position,
        value: String,
    },
    Bool {
        pos: Position,
        value: bool,
    },
    Null {
        pos: Position,
    },
    Ident {
        pos: Position,
        name: String,
    },
    Member {
        pos: Position,
        object: Box<Expr>,
        property: String,
    },
    Call {
        pos: Position,
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        pos: Position,
        op: String,
        operand: Box<Expr>,
    },
    Postfix {
        pos: Position,
        op: String,
        operand: Box<Expr>,
    },
    Binary {
        pos: Position,
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        pos: Position,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Object {
        pos: Position,
        entries: Vec<(String, Expr)>,
    },
    Array {
        pos: Position,
        items: Vec<Expr>,
    },
    Function {
        pos: Position,
        name: Option<String>,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    Arrow {
        pos: Position,
        params: Vec<String>,
        body: ArrowBody,
    },
}

#[derive(Debug, Clone)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

impl Expr {
    pub fn pos(&self) -> Position {
        match self {
            Expr::Number { pos, .. }
            | Expr::Str { pos, .. }
            | Expr::Bool { pos, .. }
            | Expr::Null { pos, .. }
            | Expr::Ident { pos, .. }
            | Expr::Member { pos, .. }
            | Expr::Call { pos, .. }
            | Expr::Unary { pos, .. }
            | Expr::Postfix { pos, .. }
            | Expr::Binary { pos, .. }
            | Expr::Assign { pos, .. }
            | Expr::Object { pos, .. }
            | Expr::Array { pos, .. }
            | Expr::Function { pos, .. }
            | Expr::Arrow { pos, .. } => *pos,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ForInit {
    VarDecl { name: String, init: Option<Expr> },
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr {
        pos: Position,
        expr: Expr,
    },
    VarDecl {
        pos: Position,
        name: String,
        init: Option<Expr>,
    },
    FunctionDecl {
        pos: Position,
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    Return {
        pos: Position,
        value: Option<Expr>,
    },
    If {
        pos: Position,
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        pos: Position,
        condition: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        pos: Position,
        body: Box<Stmt>,
        condition: Expr,
    },
    For {
        pos: Position,
        init: Option<ForInit>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForIn {
        pos: Position,
        decl: bool,
        var_name: String,
        object: Expr,
        body: Box<Stmt>,
    },
    ForOf {
        pos: Position,
        decl: bool,
        var_name: String,
        object: Expr,
        body: Box<Stmt>,
    },
    Block {
        pos: Position,
        body: Vec<Stmt>,
    },
    Break {
        pos: Position,
    },
    Continue {
        pos: Position,
    },
    Empty {
        pos: Position,
    },
}

impl Stmt {
    pub fn pos(&self) -> Position {
        match self {
            Stmt::Expr { pos, .. }
            | Stmt::VarDecl { pos, .. }
            | Stmt::FunctionDecl { pos, .. }
            | Stmt::Return { pos, .. }
            | Stmt::If { pos, .. }
            | Stmt::While { pos, .. }
            | Stmt::DoWhile { pos, .. }
            | Stmt::For { pos, .. }
            | Stmt::ForIn { pos, .. }
            | Stmt::ForOf { pos, .. }
            | Stmt::Block { pos, .. }
            | Stmt::Break { pos, .. }
            | Stmt::Continue { pos, .. }
            | Stmt::Empty { pos, .. } => *pos,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    pub pos: Position,
    pub body: Vec<Stmt>,
}
