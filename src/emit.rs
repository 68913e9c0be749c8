use crate::ast::{ArrowBody, Expr, ForInit, Program, Stmt};

const INDENT: &str = "  ";

pub fn emit(program: &Program) -> String {
    let mut out = String::new();
    for stmt in &program.body {
        emit_stmt(&mut out, stmt, 0);
    }
    out
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn emit_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    match stmt {
        Stmt::Expr { expr, .. } => {
            push_indent(out, depth);
            out.push_str(&emit_expr(expr, depth));
            out.push_str(";\n");
        }
        Stmt::VarDecl { name, init, .. } => {
            push_indent(out, depth);
            out.push_str("var ");
            out.push_str(name);
            if let Some(value) = init {
                out.push_str(" = ");
                out.push_str(&emit_expr(value, depth));
            }
            out.push_str(";\n");
        }
        Stmt::FunctionDecl { name, params, body, .. } => {
            push_indent(out, depth);
            out.push_str("function ");
            out.push_str(name);
            out.push('(');
            out.push_str(&params.join(", "));
            out.push_str(") {\n");
            for inner in body {
                emit_stmt(out, inner, depth + 1);
            }
            push_indent(out, depth);
            out.push_str("}\n");
        }
        Stmt::Return { value, .. } => {
            push_indent(out, depth);
            out.push_str("return");
            if let Some(expr) = value {
                out.push(' ');
                out.push_str(&emit_expr(expr, depth));
            }
            out.push_str(";\n");
        }
        Stmt::If { condition, then_branch, else_branch, .. } => {
            push_indent(out, depth);
            out.push_str("if (");
            out.push_str(&emit_expr(condition, depth));
            out.push_str(")");
            emit_attached_body(out, then_branch, depth);
            if let Some(else_stmt) = else_branch {
                push_indent(out, depth);
                out.push_str("else");
                emit_attached_body(out, else_stmt, depth);
            }
        }
        Stmt::While { condition, body, .. } => {
            push_indent(out, depth);
            out.push_str("while (");
            out.push_str(&emit_expr(condition, depth));
            out.push_str(")");
            emit_attached_body(out, body, depth);
        }
        Stmt::DoWhile { body, condition, .. } => {
            push_indent(out, depth);
            out.push_str("do {\n");
            emit_body_stmts(out, body, depth + 1);
            push_indent(out, depth);
            out.push_str("} while (");
            out.push_str(&emit_expr(condition, depth));
            out.push_str(");\n");
        }
        Stmt::For { init, condition, update, body, .. } => {
            push_indent(out, depth);
            out.push_str("for (");
            match init {
                Some(ForInit::VarDecl { name, init }) => {
                    out.push_str("var ");
                    out.push_str(name);
                    if let Some(value) = init {
                        out.push_str(" = ");
                        out.push_str(&emit_expr(value, depth));
                    }
                }
                Some(ForInit::Expr(expr)) => out.push_str(&emit_expr(expr, depth)),
                None => {}
            }
            out.push_str("; ");
            if let Some(expr) = condition {
                out.push_str(&emit_expr(expr, depth));
            }
            out.push_str("; ");
            if let Some(expr) = update {
                out.push_str(&emit_expr(expr, depth));
            }
            out.push(')');
            emit_attached_body(out, body, depth);
        }
        Stmt::ForIn { decl, var_name, object, body, .. } => {
            push_indent(out, depth);
            out.push_str("for (");
            if *decl {
                out.push_str("var ");
            }
            out.push_str(var_name);
            out.push_str(" in ");
            out.push_str(&emit_expr(object, depth));
            out.push(')');
            emit_attached_body(out, body, depth);
        }
        Stmt::ForOf { decl, var_name, object, body, .. } => {
            push_indent(out, depth);
            out.push_str("for (");
            if *decl {
                out.push_str("var ");
            }
            out.push_str(var_name);
            out.push_str(" of ");
            out.push_str(&emit_expr(object, depth));
            out.push(')');
            emit_attached_body(out, body, depth);
        }
        Stmt::Block { body, .. } => {
            push_indent(out, depth);
            out.push_str("{\n");
            for inner in body {
                emit_stmt(out, inner, depth + 1);
            }
            push_indent(out, depth);
            out.push_str("}\n");
        }
        Stmt::Break { .. } => {
            push_indent(out, depth);
            out.push_str("break;\n");
        }
        Stmt::Continue { .. } => {
            push_indent(out, depth);
            out.push_str("continue;\n");
        }
        Stmt::Empty { .. } => {
            push_indent(out, depth);
            out.push_str(";\n");
        }
    }
}

// Loop/if bodies always print braced; single statements get wrapped so the
// output re-parses to the same tree shape modulo the synthetic block.
fn emit_attached_body(out: &mut String, body: &Stmt, depth: usize) {
    out.push_str(" {\n");
    emit_body_stmts(out, body, depth + 1);
    push_indent(out, depth);
    out.push_str("}\n");
}

fn emit_body_stmts(out: &mut String, body: &Stmt, depth: usize) {
    match body {
        Stmt::Block { body, .. } => {
            for inner in body {
                emit_stmt(out, inner, depth);
            }
        }
        other => emit_stmt(out, other, depth),
    }
}

pub fn emit_expr(expr: &Expr, depth: usize) -> String {
    match expr {
        Expr::Number { value, .. } => format_number(*value),
        Expr::Str { value, .. } => format_string(value),
        Expr::Bool { value, .. } => value.to_string(),
        Expr::Null { .. } => "null".to_string(),
        Expr::Ident { name, .. } => name.clone(),
        Expr::Member { object, property, .. } => {
            format!("{}.{}", emit_operand(object, depth), property)
        }
        Expr::Call { callee, args, .. } => {
            let rendered: Vec<String> = args.iter().map(|a| emit_expr(a, depth)).collect();
            format!("{}({})", emit_operand(callee, depth), rendered.join(", "))
        }
        Expr::Unary { op, operand, .. } => format!("{}{}", op, emit_operand(operand, depth)),
        Expr::Postfix { op, operand, .. } => format!("{}{}", emit_operand(operand, depth), op),
        Expr::Binary { op, left, right, .. } => format!(
            "{} {} {}",
            emit_operand(left, depth),
            op,
            emit_operand(right, depth)
        ),
        Expr::Assign { target, value, .. } => {
            format!("{} = {}", emit_expr(target, depth), emit_expr(value, depth))
        }
        Expr::Object { entries, .. } => {
            let rendered: Vec<String> = entries
                .iter()
                .map(|(key, value)| format!("{}: {}", format_string(key), emit_expr(value, depth)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
        Expr::Array { items, .. } => {
            let rendered: Vec<String> = items.iter().map(|i| emit_expr(i, depth)).collect();
            format!("[{}]", rendered.join(", "))
        }
        Expr::Function { name, params, body, .. } => {
            let mut out = String::from("function ");
            if let Some(n) = name {
                out.push_str(n);
            }
            out.push('(');
            out.push_str(&params.join(", "));
            out.push_str(") {\n");
            for stmt in body {
                emit_stmt(&mut out, stmt, depth + 1);
            }
            push_indent(&mut out, depth);
            out.push('}');
            out
        }
        Expr::Arrow { params, body, .. } => {
            let mut out = format!("({})", params.join(", "));
            out.push_str(" => ");
            match body {
                ArrowBody::Expr(expr) => out.push_str(&emit_expr(expr, depth)),
                ArrowBody::Block(stmts) => {
                    out.push_str("{\n");
                    for stmt in stmts {
                        emit_stmt(&mut out, stmt, depth + 1);
                    }
                    push_indent(&mut out, depth);
                    out.push('}');
                }
            }
            out
        }
    }
}

// Nested compound expressions get parenthesized rather than tracking operator
// precedence through the printer; the parser strips redundant parens on the
// next round trip.
fn emit_operand(expr: &Expr, depth: usize) -> String {
    match expr {
        Expr::Binary { .. } | Expr::Assign { .. } | Expr::Arrow { .. } | Expr::Function { .. } => {
            format!("({})", emit_expr(expr, depth))
        }
        _ => emit_expr(expr, depth),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn format_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000c}' => out.push_str("\\f"),
            ch if (ch as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", ch as u32));
            }
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}
