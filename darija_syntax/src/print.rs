//! Renders syntax trees back to DarijaScript source. Compound
//! sub-expressions are always parenthesized, so the printed text
//! parses back to the same tree.

use std::fmt::{self, Display, Formatter, Write};

use crate::ast::{
    DeclKind, Expr, Function, Literal, Property, Source, Stmt, SwitchCase,
};

const INDENT: &str = "    ";

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_items(f, &self.body, 0)
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_stmt(f, self, 0)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_expr(f, self, 0)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            // Overflowing literals such as `1e999` parse to infinity
            Self::Number(n) if n.is_infinite() => f.write_str("1e999"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => write_string(f, s),
            Self::Boolean(true) => f.write_str("s7i7"),
            Self::Boolean(false) => f.write_str("ghalat"),
            Self::Null => f.write_str("farkha"),
            Self::Undefined => f.write_str("mchmcha"),
        }
    }
}

fn indent(f: &mut Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn write_items(f: &mut Formatter<'_>, items: &[Stmt], depth: usize) -> fmt::Result {
    for item in items {
        indent(f, depth)?;
        write_stmt(f, item, depth)?;
        f.write_char('\n')?;
    }
    Ok(())
}

fn write_block(f: &mut Formatter<'_>, items: &[Stmt], depth: usize) -> fmt::Result {
    f.write_str("{\n")?;
    write_items(f, items, depth + 1)?;
    indent(f, depth)?;
    f.write_char('}')
}

/// Writes a statement without leading indentation or trailing newline
fn write_stmt(f: &mut Formatter<'_>, stmt: &Stmt, depth: usize) -> fmt::Result {
    match stmt {
        Stmt::VarDecl { .. } => {
            write_decl(f, stmt, depth)?;
            f.write_char(';')
        }
        Stmt::Function(func) => write_function(f, func, depth),
        Stmt::Block(items) => write_block(f, items, depth),
        Stmt::If {
            test,
            consequent,
            alternate,
        } => {
            f.write_str("ila (")?;
            write_expr(f, test, depth)?;
            f.write_str(") ")?;
            write_stmt(f, consequent, depth)?;
            if let Some(alternate) = alternate {
                f.write_str(" ella ")?;
                write_stmt(f, alternate, depth)?;
            }
            Ok(())
        }
        Stmt::While { test, body } => {
            f.write_str("madamt (")?;
            write_expr(f, test, depth)?;
            f.write_str(") ")?;
            write_stmt(f, body, depth)
        }
        Stmt::DoWhile { body, test } => {
            f.write_str("dir ")?;
            write_stmt(f, body, depth)?;
            f.write_str(" madamt (")?;
            write_expr(f, test, depth)?;
            f.write_str(");")
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            f.write_str("douz (")?;
            match init.as_deref() {
                Some(Stmt::Expr(expr)) => write_expr_stmt(f, expr, depth)?,
                Some(decl) => write_decl(f, decl, depth)?,
                None => (),
            }
            f.write_str("; ")?;
            if let Some(test) = test {
                write_expr(f, test, depth)?;
            }
            f.write_str("; ")?;
            if let Some(update) = update {
                write_expr(f, update, depth)?;
            }
            f.write_str(") ")?;
            write_stmt(f, body, depth)
        }
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            f.write_str("jrb ")?;
            write_block(f, block, depth)?;
            if let Some(handler) = handler {
                write!(f, " msk ({}) ", handler.param.name)?;
                write_block(f, &handler.body, depth)?;
            }
            if let Some(finalizer) = finalizer {
                f.write_str(" fakhr ")?;
                write_block(f, finalizer, depth)?;
            }
            Ok(())
        }
        Stmt::Switch {
            discriminant,
            cases,
        } => {
            f.write_str("bdl3la (")?;
            write_expr(f, discriminant, depth)?;
            f.write_str(") {\n")?;
            for SwitchCase { test, consequent } in cases {
                indent(f, depth + 1)?;
                match test {
                    Some(test) => {
                        f.write_str("7ala ")?;
                        write_expr(f, test, depth + 1)?;
                        f.write_str(":\n")?;
                    }
                    None => f.write_str("3adi:\n")?,
                }
                write_items(f, consequent, depth + 2)?;
            }
            indent(f, depth)?;
            f.write_char('}')
        }
        Stmt::Return(None) => f.write_str("rj3;"),
        Stmt::Return(Some(arg)) => {
            f.write_str("rj3 ")?;
            write_expr(f, arg, depth)?;
            f.write_char(';')
        }
        Stmt::Break => f.write_str("wa9f;"),
        Stmt::Continue => f.write_str("kamml;"),
        Stmt::Expr(expr) => {
            write_expr_stmt(f, expr, depth)?;
            f.write_char(';')
        }
        Stmt::Empty => f.write_char(';'),
    }
}

fn write_decl(f: &mut Formatter<'_>, decl: &Stmt, depth: usize) -> fmt::Result {
    let Stmt::VarDecl { kind, ident, init } = decl else {
        return write_stmt(f, decl, depth);
    };
    let kw = match kind {
        DeclKind::Const => "tabit",
        DeclKind::Let => "bdl",
    };
    write!(f, "{kw} {}", ident.name)?;
    if let Some(init) = init {
        f.write_str(" = ")?;
        write_expr(f, init, depth)?;
    }
    Ok(())
}

/// An expression at statement start must not read as a block or a
/// function declaration
fn write_expr_stmt(f: &mut Formatter<'_>, expr: &Expr, depth: usize) -> fmt::Result {
    let mut text = String::new();
    write_expr(&mut text, expr, depth)?;
    if text.starts_with('{') || text.starts_with("dala") {
        write!(f, "({text})")
    } else {
        f.write_str(&text)
    }
}

fn write_function<W: Write>(f: &mut W, func: &Function, depth: usize) -> fmt::Result {
    f.write_str("dala")?;
    if let Some(name) = &func.name {
        write!(f, " {}", name.name)?;
    }
    let params = func
        .params
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>();
    write!(f, "({}) ", params.join(", "))?;
    // Bodies are rendered through a nested formatter
    write!(f, "{}", BlockDisplay(&func.body, depth))
}

struct BlockDisplay<'a>(&'a [Stmt], usize);

impl Display for BlockDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_block(f, self.0, self.1)
    }
}

fn is_compound(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Assign { .. }
            | Expr::Logical { .. }
            | Expr::Binary { .. }
            | Expr::Unary { .. }
            | Expr::Update { .. }
            | Expr::Function(_)
    )
}

/// Constructors are limited to member chains over a primary
fn is_constructor_safe(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(_) | Expr::This => true,
        Expr::Member { object, .. } => is_constructor_safe(object),
        _ => false,
    }
}

fn write_operand<W: Write>(f: &mut W, expr: &Expr, depth: usize) -> fmt::Result {
    if is_compound(expr) {
        f.write_char('(')?;
        write_expr(f, expr, depth)?;
        f.write_char(')')
    } else {
        write_expr(f, expr, depth)
    }
}

fn write_args<W: Write>(f: &mut W, args: &[Expr], depth: usize) -> fmt::Result {
    f.write_char('(')?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_expr(f, arg, depth)?;
    }
    f.write_char(')')
}

fn write_expr<W: Write>(f: &mut W, expr: &Expr, depth: usize) -> fmt::Result {
    match expr {
        Expr::Assign {
            op, target, value, ..
        } => {
            write_expr(f, target, depth)?;
            write!(f, " {op} ")?;
            write_expr(f, value, depth)
        }
        Expr::Logical { lhs, op, rhs } => {
            write_operand(f, lhs, depth)?;
            write!(f, " {op} ")?;
            write_operand(f, rhs, depth)
        }
        Expr::Binary { lhs, op, rhs } => {
            write_operand(f, lhs, depth)?;
            write!(f, " {op} ")?;
            write_operand(f, rhs, depth)
        }
        Expr::Unary { op, expr } => {
            write!(f, "{op}")?;
            write_operand(f, expr, depth)
        }
        Expr::Update {
            op, prefix, target, ..
        } => {
            if *prefix {
                write!(f, "{op}")?;
                write_operand(f, target, depth)
            } else {
                write_operand(f, target, depth)?;
                write!(f, "{op}")
            }
        }
        Expr::Call { callee, args, .. } => {
            write_operand(f, callee, depth)?;
            write_args(f, args, depth)
        }
        Expr::New { callee, args, .. } => {
            f.write_str("jdid ")?;
            if is_constructor_safe(callee) {
                write_expr(f, callee, depth)?;
            } else {
                f.write_char('(')?;
                write_expr(f, callee, depth)?;
                f.write_char(')')?;
            }
            write_args(f, args, depth)
        }
        Expr::Member {
            object, property, ..
        } => {
            write_operand(f, object, depth)?;
            match property {
                Property::Named(name) => write!(f, ".{name}"),
                Property::Computed(key) => {
                    f.write_char('[')?;
                    write_expr(f, key, depth)?;
                    f.write_char(']')
                }
            }
        }
        Expr::Ident(ident) => f.write_str(&ident.name),
        Expr::Literal(lit) => write!(f, "{lit}"),
        Expr::This => f.write_str("hadi"),
        Expr::Array(elements) => {
            f.write_char('[')?;
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_expr(f, element, depth)?;
            }
            f.write_char(']')
        }
        Expr::Object(entries) => {
            f.write_char('{')?;
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}: ", Literal::Str(key.clone()))?;
                write_expr(f, value, depth)?;
            }
            f.write_char('}')
        }
        Expr::Function(func) => write_function(f, func, depth),
    }
}

fn write_string<W: Write>(f: &mut W, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\0' => f.write_str("\\0")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use crate::{ast::Source, lex::Lexer, parse::Parser};

    fn parse(input: &str) -> Source {
        let tokens = Lexer::new(input).lex_all().unwrap();
        Parser::new(&tokens).parse_all().unwrap()
    }

    fn round_trip_test(input: &str) {
        let source = parse(input);
        let printed = source.to_string();
        assert_eq!(parse(&printed), source, "printed as:\n{printed}");
    }

    #[test]
    fn prints_parenthesized_operands() {
        let source = parse("tbe3(1 + 2 * 3, -(-x), a = b = 1);");
        assert_eq!(
            source.to_string(),
            "tbe3(1 + (2 * 3), -(-x), a = b = 1);\n"
        );
    }

    #[test]
    fn prints_nested_blocks() {
        let source = parse("ila (a) { bdl x = 1; } ella { tbe3(\"q\\\"\"); }");
        assert_eq!(
            source.to_string(),
            "ila (a) {\n    bdl x = 1;\n} ella {\n    tbe3(\"q\\\"\");\n}\n"
        );
    }

    #[test]
    fn statement_level_object_is_wrapped() {
        let source = parse("({a: 1}).a;");
        assert_eq!(source.to_string(), "({\"a\": 1}.a);\n");
    }

    #[test]
    fn round_trip_program() {
        round_trip_test(
            r#"
            tabit n = 10;
            bdl total = 0;
            dala fib(n) {
                ila (n < 2) rj3 n;
                rj3 fib(n - 1) + fib(n - 2);
            }
            douz (bdl i = 0; i < 5; i++) {
                ila (i === 2) { kamml; } wa9ila (i % 4 == 0) wa9f; ella tbe3(fib(i));
            }
            bdl o = {name: "x", "two words": [1, 2.5, s7i7, farkha, mchmcha]};
            o.name += "y";
            o["k"] = jdid Tarikh(0);
            tabit f = dala (a, b) { rj3 no3 a + !b; };
            (dala () { tbe3(hadi); })();
            madamt (s7i7) { wa9f; }
            dir { --total; } madamt (total > 0 && !(total == 3) || ghalat);
            jrb { rmmi("e"); } msk (err) { tbe3(err); } fakhr { ; }
            bdl3la (n) {
                7ala 1:
                7ala 2: tbe3("a"); wa9f;
                3adi: tbe3("b");
            }
            douz (;;) { wa9f; }
            "#,
        );
    }
}
