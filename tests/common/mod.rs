//! Minimal tree-walking evaluator for the generated script subset. Stands in
//! for the external execution runtime: `httpPost` captures requests instead
//! of sending them and the guard identifier is bound to a counting (and
//! optionally aborting) budget check.

use robotblocks_core::ast::{Expr, ForInit, Program, Stmt};
use robotblocks_core::lexer::Lexer;
use robotblocks_core::parser::Parser;
use serde_json::{Map, Value as Json};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub body: Json,
}

#[derive(Debug, Default)]
pub struct RunResult {
    pub requests: Vec<Request>,
    pub guard_calls: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
    Null,
    Json(Json),
}

impl Value {
    fn to_json(&self) -> Json {
        match self {
            Value::Num(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Json::from(*n as i64)
                } else {
                    Json::from(*n)
                }
            }
            Value::Str(s) => Json::from(s.clone()),
            Value::Bool(b) => Json::from(*b),
            Value::Null => Json::Null,
            Value::Json(j) => j.clone(),
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Null => false,
            Value::Json(j) => !j.is_null(),
        }
    }

    fn as_num(&self, what: &str) -> Result<f64, String> {
        match self {
            Value::Num(n) => Ok(*n),
            Value::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("{}: non-numeric string '{}'", what, s)),
            other => Err(format!("{}: expected number, got {:?}", what, other)),
        }
    }
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

struct Interp {
    vars: HashMap<String, Value>,
    functions: HashMap<String, (Vec<String>, Vec<Stmt>)>,
    guard_name: String,
    guard_limit: Option<usize>,
    result: RunResult,
}

pub fn parse(source: &str) -> Program {
    let tokens = Lexer::new(source).tokenize().expect("tokenize script");
    Parser::new(tokens).parse_program().expect("parse script")
}

pub fn run_script(source: &str, guard_name: &str) -> RunResult {
    try_run_script(source, guard_name, None).expect("script execution failed")
}

pub fn try_run_script(
    source: &str,
    guard_name: &str,
    guard_limit: Option<usize>,
) -> Result<RunResult, String> {
    let program = parse(source);
    let mut interp = Interp {
        vars: HashMap::new(),
        functions: HashMap::new(),
        guard_name: guard_name.to_string(),
        guard_limit,
        result: RunResult::default(),
    };
    interp
        .vars
        .insert("baseUrl".to_string(), Value::Str("http://robot.test".to_string()));
    for stmt in &program.body {
        if let Stmt::FunctionDecl { name, params, body, .. } = stmt {
            interp
                .functions
                .insert(name.clone(), (params.clone(), body.clone()));
        }
    }
    for stmt in &program.body {
        match interp.exec(stmt)? {
            Flow::Normal => {}
            Flow::Return(_) | Flow::Break | Flow::Continue => break,
        }
    }
    Ok(interp.result)
}

impl Interp {
    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, String> {
        match stmt {
            Stmt::Expr { expr, .. } => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::VarDecl { name, init, .. } => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                self.vars.insert(name.clone(), value);
                Ok(Flow::Normal)
            }
            Stmt::FunctionDecl { name, params, body, .. } => {
                self.functions
                    .insert(name.clone(), (params.clone(), body.clone()));
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let returned = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(returned))
            }
            Stmt::If { condition, then_branch, else_branch, .. } => {
                if self.eval(condition)?.truthy() {
                    self.exec(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.exec(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { condition, body, .. } => {
                while self.eval(condition)?.truthy() {
                    match self.exec(body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::DoWhile { body, condition, .. } => {
                loop {
                    match self.exec(body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if !self.eval(condition)?.truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For { init, condition, update, body, .. } => {
                match init {
                    Some(ForInit::VarDecl { name, init }) => {
                        let value = match init {
                            Some(expr) => self.eval(expr)?,
                            None => Value::Null,
                        };
                        self.vars.insert(name.clone(), value);
                    }
                    Some(ForInit::Expr(expr)) => {
                        self.eval(expr)?;
                    }
                    None => {}
                }
                loop {
                    if let Some(expr) = condition {
                        if !self.eval(expr)?.truthy() {
                            break;
                        }
                    }
                    match self.exec(body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if let Some(expr) = update {
                        self.eval(expr)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::ForIn { .. } | Stmt::ForOf { .. } => {
                Err("for-in/for-of execution is not supported by the stub runtime".to_string())
            }
            Stmt::Block { body, .. } => {
                for inner in body {
                    match self.exec(inner)? {
                        Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break { .. } => Ok(Flow::Break),
            Stmt::Continue { .. } => Ok(Flow::Continue),
            Stmt::Empty { .. } => Ok(Flow::Normal),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, String> {
        match expr {
            Expr::Number { value, .. } => Ok(Value::Num(*value)),
            Expr::Str { value, .. } => Ok(Value::Str(value.clone())),
            Expr::Bool { value, .. } => Ok(Value::Bool(*value)),
            Expr::Null { .. } => Ok(Value::Null),
            Expr::Ident { name, .. } => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| format!("unbound identifier '{}'", name)),
            Expr::Call { callee, args, .. } => self.call(callee, args),
            Expr::Unary { op, operand, .. } => {
                let value = self.eval(operand)?;
                match op.as_str() {
                    "-" => Ok(Value::Num(-value.as_num("unary minus")?)),
                    "!" => Ok(Value::Bool(!value.truthy())),
                    other => Err(format!("unsupported unary operator '{}'", other)),
                }
            }
            Expr::Postfix { op, operand, .. } => {
                let name = match &**operand {
                    Expr::Ident { name, .. } => name.clone(),
                    other => return Err(format!("bad increment target {:?}", other)),
                };
                let old = self
                    .vars
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| format!("unbound identifier '{}'", name))?
                    .as_num("increment")?;
                let new = if op == "++" { old + 1.0 } else { old - 1.0 };
                self.vars.insert(name, Value::Num(new));
                Ok(Value::Num(old))
            }
            Expr::Binary { op, left, right, .. } => self.binary(op, left, right),
            Expr::Assign { target, value, .. } => {
                let name = match &**target {
                    Expr::Ident { name, .. } => name.clone(),
                    other => return Err(format!("bad assignment target {:?}", other)),
                };
                let evaluated = self.eval(value)?;
                self.vars.insert(name, evaluated.clone());
                Ok(evaluated)
            }
            Expr::Object { entries, .. } => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval(value)?.to_json());
                }
                Ok(Value::Json(Json::Object(map)))
            }
            Expr::Array { items, .. } => {
                let mut out = Vec::new();
                for item in items {
                    out.push(self.eval(item)?.to_json());
                }
                Ok(Value::Json(Json::Array(out)))
            }
            Expr::Member { .. } | Expr::Function { .. } | Expr::Arrow { .. } => {
                Err("member/function expressions are not supported by the stub runtime".to_string())
            }
        }
    }

    fn binary(&mut self, op: &str, left: &Expr, right: &Expr) -> Result<Value, String> {
        if op == "&&" {
            let lhs = self.eval(left)?;
            if !lhs.truthy() {
                return Ok(lhs);
            }
            return self.eval(right);
        }
        if op == "||" {
            let lhs = self.eval(left)?;
            if lhs.truthy() {
                return Ok(lhs);
            }
            return self.eval(right);
        }
        let lhs = self.eval(left)?;
        let rhs = self.eval(right)?;
        match op {
            "+" => match (&lhs, &rhs) {
                (Value::Str(a), b) => Ok(Value::Str(format!("{}{}", a, render(b)))),
                (a, Value::Str(b)) => Ok(Value::Str(format!("{}{}", render(a), b))),
                (a, b) => Ok(Value::Num(a.as_num("+")? + b.as_num("+")?)),
            },
            "-" => Ok(Value::Num(lhs.as_num("-")? - rhs.as_num("-")?)),
            "*" => Ok(Value::Num(lhs.as_num("*")? * rhs.as_num("*")?)),
            "/" => Ok(Value::Num(lhs.as_num("/")? / rhs.as_num("/")?)),
            "%" => Ok(Value::Num(lhs.as_num("%")? % rhs.as_num("%")?)),
            "<" => Ok(Value::Bool(lhs.as_num("<")? < rhs.as_num("<")?)),
            "<=" => Ok(Value::Bool(lhs.as_num("<=")? <= rhs.as_num("<=")?)),
            ">" => Ok(Value::Bool(lhs.as_num(">")? > rhs.as_num(">")?)),
            ">=" => Ok(Value::Bool(lhs.as_num(">=")? >= rhs.as_num(">=")?)),
            "==" | "===" => Ok(Value::Bool(lhs.to_json() == rhs.to_json())),
            "!=" | "!==" => Ok(Value::Bool(lhs.to_json() != rhs.to_json())),
            other => Err(format!("unsupported binary operator '{}'", other)),
        }
    }

    fn call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value, String> {
        let name = match callee {
            Expr::Ident { name, .. } => name.clone(),
            other => return Err(format!("bad callee {:?}", other)),
        };
        if name == self.guard_name {
            self.result.guard_calls += 1;
            if let Some(limit) = self.guard_limit {
                if self.result.guard_calls > limit {
                    return Err(format!("guard budget exceeded after {} calls", limit));
                }
            }
            return Ok(Value::Null);
        }
        if name == "httpPost" {
            if args.len() != 2 {
                return Err(format!("httpPost expects 2 arguments, got {}", args.len()));
            }
            let url = match self.eval(&args[0])? {
                Value::Str(s) => s,
                other => return Err(format!("httpPost url must be a string, got {:?}", other)),
            };
            let body = self.eval(&args[1])?.to_json();
            self.result.requests.push(Request { url, body });
            return Ok(Value::Null);
        }
        if let Some((params, body)) = self.functions.get(&name).cloned() {
            let mut saved = Vec::new();
            for (param, arg) in params.iter().zip(args.iter()) {
                let value = self.eval(arg)?;
                saved.push((param.clone(), self.vars.insert(param.clone(), value)));
            }
            let mut out = Value::Null;
            for stmt in &body {
                match self.exec(stmt)? {
                    Flow::Return(v) => {
                        out = v;
                        break;
                    }
                    Flow::Break | Flow::Continue => break,
                    Flow::Normal => {}
                }
            }
            for (param, previous) in saved.into_iter().rev() {
                match previous {
                    Some(value) => {
                        self.vars.insert(param, value);
                    }
                    None => {
                        self.vars.remove(&param);
                    }
                }
            }
            return Ok(out);
        }
        Err(format!("unbound function '{}'", name))
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Num(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Json(j) => j.to_string(),
    }
}
