use crate::ast::{ArrowBody, Expr, ForInit, Position, Program, Stmt};
use crate::emit::emit;
use crate::lexer::Lexer;
use crate::parser::Parser;
use rand::distributions::Alphanumeric;
use rand::Rng;

pub const GUARD_NAME_PREFIX: &str = "__guard_";

/// Sentinel returned when the source could not be parsed. A program carrying
/// this name has no loop protection; callers must check `is_protected` and
/// refuse to run it (or run it under an external time limit).
pub const FALLBACK_GUARD_NAME: &str = "__guard_disabled";

#[derive(Debug, Clone)]
pub struct InstrumentedProgram {
    pub source_text: String,
    pub guard_function_name: String,
}

impl InstrumentedProgram {
    pub fn is_protected(&self) -> bool {
        self.guard_function_name != FALLBACK_GUARD_NAME
    }
}

/// Injects a call to a compilation-unique guard function as the first
/// statement of every loop body and every function body, so the execution
/// runtime can bound iteration and call budgets. Parse failures degrade to
/// the original text plus the fallback sentinel; this never errors.
pub fn instrument(source: &str) -> InstrumentedProgram {
    let guard_name = fresh_guard_name();
    let tokens = match Lexer::new(source).tokenize() {
        Ok(tokens) => tokens,
        Err(_) => return fallback(source),
    };
    let mut program = match Parser::new(tokens).parse_program() {
        Ok(program) => program,
        Err(_) => return fallback(source),
    };
    inject_program(&mut program, &guard_name);
    InstrumentedProgram {
        source_text: emit(&program),
        guard_function_name: guard_name,
    }
}

fn fallback(source: &str) -> InstrumentedProgram {
    InstrumentedProgram {
        source_text: source.to_string(),
        guard_function_name: FALLBACK_GUARD_NAME.to_string(),
    }
}

/// Fresh per compilation so the guard never collides with user identifiers or
/// with guards from a concurrently compiled program.
fn fresh_guard_name() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}{}", GUARD_NAME_PREFIX, suffix)
}

fn guard_call(guard: &str) -> Stmt {
    let pos = Position::new(0, 0);
    Stmt::Expr {
        pos,
        expr: Expr::Call {
            pos,
            callee: Box::new(Expr::Ident { pos, name: guard.to_string() }),
            args: Vec::new(),
        },
    }
}

fn inject_program(program: &mut Program, guard: &str) {
    for stmt in &mut program.body {
        inject_stmt(stmt, guard);
    }
}

fn inject_stmt(stmt: &mut Stmt, guard: &str) {
    match stmt {
        Stmt::Expr { expr, .. } => inject_expr(expr, guard),
        Stmt::VarDecl { init, .. } => {
            if let Some(expr) = init {
                inject_expr(expr, guard);
            }
        }
        Stmt::FunctionDecl { body, .. } => {
            for inner in body.iter_mut() {
                inject_stmt(inner, guard);
            }
            body.insert(0, guard_call(guard));
        }
        Stmt::Return { value, .. } => {
            if let Some(expr) = value {
                inject_expr(expr, guard);
            }
        }
        Stmt::If { condition, then_branch, else_branch, .. } => {
            inject_expr(condition, guard);
            inject_stmt(then_branch, guard);
            if let Some(else_stmt) = else_branch {
                inject_stmt(else_stmt, guard);
            }
        }
        Stmt::While { condition, body, .. } => {
            inject_expr(condition, guard);
            inject_loop_body(body, guard);
        }
        Stmt::DoWhile { body, condition, .. } => {
            inject_expr(condition, guard);
            inject_loop_body(body, guard);
        }
        Stmt::For { init, condition, update, body, .. } => {
            match init {
                Some(ForInit::VarDecl { init: Some(expr), .. }) => inject_expr(expr, guard),
                Some(ForInit::Expr(expr)) => inject_expr(expr, guard),
                _ => {}
            }
            if let Some(expr) = condition {
                inject_expr(expr, guard);
            }
            if let Some(expr) = update {
                inject_expr(expr, guard);
            }
            inject_loop_body(body, guard);
        }
        Stmt::ForIn { object, body, .. } | Stmt::ForOf { object, body, .. } => {
            inject_expr(object, guard);
            inject_loop_body(body, guard);
        }
        Stmt::Block { body, .. } => {
            for inner in body.iter_mut() {
                inject_stmt(inner, guard);
            }
        }
        Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Empty { .. } => {}
    }
}

/// Prepends the guard call, normalizing a braceless body into a block first.
/// The wrapped statement itself is still visited for nested loops/functions.
fn inject_loop_body(body: &mut Box<Stmt>, guard: &str) {
    inject_stmt(body, guard);
    match body.as_mut() {
        Stmt::Block { body: stmts, .. } => {
            stmts.insert(0, guard_call(guard));
        }
        other => {
            let pos = other.pos();
            let original = std::mem::replace(other, Stmt::Empty { pos });
            *body = Box::new(Stmt::Block {
                pos,
                body: vec![guard_call(guard), original],
            });
        }
    }
}

fn inject_expr(expr: &mut Expr, guard: &str) {
    match expr {
        Expr::Number { .. }
        | Expr::Str { .. }
        | Expr::Bool { .. }
        | Expr::Null { .. }
        | Expr::Ident { .. } => {}
        Expr::Member { object, .. } => inject_expr(object, guard),
        Expr::Call { callee, args, .. } => {
            inject_expr(callee, guard);
            for arg in args.iter_mut() {
                inject_expr(arg, guard);
            }
        }
        Expr::Unary { operand, .. } | Expr::Postfix { operand, .. } => {
            inject_expr(operand, guard);
        }
        Expr::Binary { left, right, .. } => {
            inject_expr(left, guard);
            inject_expr(right, guard);
        }
        Expr::Assign { target, value, .. } => {
            inject_expr(target, guard);
            inject_expr(value, guard);
        }
        Expr::Object { entries, .. } => {
            for (_, value) in entries.iter_mut() {
                inject_expr(value, guard);
            }
        }
        Expr::Array { items, .. } => {
            for item in items.iter_mut() {
                inject_expr(item, guard);
            }
        }
        Expr::Function { body, .. } => {
            for inner in body.iter_mut() {
                inject_stmt(inner, guard);
            }
            body.insert(0, guard_call(guard));
        }
        Expr::Arrow { body, .. } => match body {
            ArrowBody::Block(stmts) => {
                for inner in stmts.iter_mut() {
                    inject_stmt(inner, guard);
                }
                stmts.insert(0, guard_call(guard));
            }
            ArrowBody::Expr(value) => {
                // Expression bodies become `{ guard(); return <expr>; }`,
                // which preserves the returned value exactly.
                inject_expr(value, guard);
                let pos = value.pos();
                let returned = std::mem::replace(
                    value.as_mut(),
                    Expr::Null { pos },
                );
                *body = ArrowBody::Block(vec![
                    guard_call(guard),
                    Stmt::Return { pos, value: Some(returned) },
                ]);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArrowBody, Expr, Stmt};
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn parse(source: &str) -> Program {
        let tokens = Lexer::new(source).tokenize().expect("tokenize");
        Parser::new(tokens).parse_program().expect("parse")
    }

    fn is_guard_call(stmt: &Stmt, guard: &str) -> bool {
        match stmt {
            Stmt::Expr { expr: Expr::Call { callee, args, .. }, .. } => {
                args.is_empty()
                    && matches!(&**callee, Expr::Ident { name, .. } if name == guard)
            }
            _ => false,
        }
    }

    fn assert_all_bodies_guarded(stmts: &[Stmt], guard: &str) {
        for stmt in stmts {
            check_stmt(stmt, guard);
        }
    }

    fn check_body(body: &Stmt, guard: &str) {
        match body {
            Stmt::Block { body, .. } => {
                assert!(
                    body.first().map(|s| is_guard_call(s, guard)).unwrap_or(false),
                    "body does not start with guard call"
                );
                assert_all_bodies_guarded(body, guard);
            }
            other => panic!("loop/function body was not normalized to a block: {:?}", other),
        }
    }

    fn check_stmt(stmt: &Stmt, guard: &str) {
        match stmt {
            Stmt::While { body, .. }
            | Stmt::DoWhile { body, .. }
            | Stmt::For { body, .. }
            | Stmt::ForIn { body, .. }
            | Stmt::ForOf { body, .. } => check_body(body, guard),
            Stmt::FunctionDecl { body, .. } => {
                assert!(is_guard_call(&body[0], guard));
                assert_all_bodies_guarded(body, guard);
            }
            Stmt::If { then_branch, else_branch, .. } => {
                check_stmt(then_branch, guard);
                if let Some(else_stmt) = else_branch {
                    check_stmt(else_stmt, guard);
                }
            }
            Stmt::Block { body, .. } => assert_all_bodies_guarded(body, guard),
            _ => {}
        }
    }

    #[test]
    fn guard_is_first_statement_of_every_loop_and_function() {
        let source = r#"
            for (var i = 0; i < 10; i++) { run(i); }
            while (ready()) step();
            do { tick(); } while (more());
            for (var k in table) use(k);
            for (item of items) use(item);
            function helper(a) { return a + 1; }
        "#;
        let out = instrument(source);
        assert!(out.is_protected());
        let reparsed = parse(&out.source_text);
        assert_all_bodies_guarded(&reparsed.body, &out.guard_function_name);
    }

    #[test]
    fn braceless_loop_body_is_preserved_after_the_guard() {
        let out = instrument("while (go()) step();");
        let reparsed = parse(&out.source_text);
        match &reparsed.body[0] {
            Stmt::While { body, .. } => match &**body {
                Stmt::Block { body, .. } => {
                    assert_eq!(body.len(), 2);
                    assert!(is_guard_call(&body[0], &out.guard_function_name));
                    assert!(matches!(&body[1], Stmt::Expr { .. }));
                }
                other => panic!("expected block body, got {:?}", other),
            },
            other => panic!("expected while, got {:?}", other),
        }
    }

    #[test]
    fn expression_arrow_becomes_guarded_return() {
        let out = instrument("var f = x => x + 1;");
        let reparsed = parse(&out.source_text);
        match &reparsed.body[0] {
            Stmt::VarDecl { init: Some(Expr::Arrow { body, .. }), .. } => match body {
                ArrowBody::Block(stmts) => {
                    assert!(is_guard_call(&stmts[0], &out.guard_function_name));
                    assert!(matches!(&stmts[1], Stmt::Return { value: Some(_), .. }));
                }
                other => panic!("expected block arrow body, got {:?}", other),
            },
            other => panic!("expected arrow var decl, got {:?}", other),
        }
    }

    #[test]
    fn function_expressions_inside_calls_are_guarded() {
        let out = instrument("schedule(function () { fire(); });");
        assert!(out
            .source_text
            .contains(&format!("{}();", out.guard_function_name)));
    }

    #[test]
    fn guard_names_are_unique_per_run() {
        let first = instrument("var x = 1;");
        let second = instrument("var x = 1;");
        assert_ne!(first.guard_function_name, second.guard_function_name);
        assert!(first.guard_function_name.starts_with(GUARD_NAME_PREFIX));
    }

    #[test]
    fn malformed_source_falls_back_unchanged() {
        let source = "for (var i = 0; i <";
        let out = instrument(source);
        assert_eq!(out.source_text, source);
        assert_eq!(out.guard_function_name, FALLBACK_GUARD_NAME);
        assert!(!out.is_protected());
    }

    #[test]
    fn instrumenting_twice_adds_a_second_distinct_guard() {
        let first = instrument("for (var i = 0; i < 3; i++) { run(); }");
        let second = instrument(&first.source_text);
        assert!(second.is_protected());
        assert_ne!(first.guard_function_name, second.guard_function_name);
        let reparsed = parse(&second.source_text);
        assert_all_bodies_guarded(&reparsed.body, &second.guard_function_name);
        // The first run's guard call survives as the second statement.
        assert!(second.source_text.contains(&first.guard_function_name));
    }
}
