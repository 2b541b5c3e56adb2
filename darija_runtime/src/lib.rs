pub mod environment;
pub mod error;
pub mod host;
pub mod interpret;
pub mod methods;
pub mod stdlib;
pub mod timers;
pub mod types;

use std::fmt::Display;

use darija_syntax::{
    error::{Error, Phase},
    lex::Lexer,
    parse::Parser,
};
use log::trace;

use crate::{
    error::Exception,
    host::{Host, StdHost},
    interpret::Interpreter,
    types::Value,
};

/// Everything a run produced. Output printed before a runtime
/// failure is kept.
#[derive(Debug)]
pub struct Outcome {
    pub output: Vec<String>,
    pub error: Option<Failure>,
}

#[derive(Debug)]
pub enum Failure {
    /// Lex or parse errors. Nothing was executed.
    Syntax(Vec<Error>),
    Runtime(Error),
    /// A value raised with `rmmi` that no `msk` handled
    Raised {
        value: Value,
        line: usize,
        column: usize,
    },
}

impl Failure {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Syntax(errors) => errors.first().map_or(Phase::Parse, |e| e.phase),
            Self::Runtime(_) | Self::Raised { .. } => Phase::Runtime,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Syntax(errors) => errors
                .iter()
                .map(|e| e.msg.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Runtime(e) => e.msg.clone(),
            Self::Raised { value, .. } => value.to_string(),
        }
    }

    /// Position of the first error
    pub fn line(&self) -> usize {
        match self {
            Self::Syntax(errors) => errors.first().map_or(0, |e| e.line),
            Self::Runtime(e) => e.line,
            Self::Raised { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            Self::Syntax(errors) => errors.first().map_or(0, |e| e.column),
            Self::Runtime(e) => e.column,
            Self::Raised { column, .. } => *column,
        }
    }
}

impl From<Exception> for Failure {
    fn from(exception: Exception) -> Self {
        match exception {
            Exception::Error(e) => Self::Runtime(e),
            Exception::Raised {
                value,
                line,
                column,
            } => Self::Raised {
                value,
                line,
                column,
            },
        }
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(errors) => {
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
            Self::Runtime(e) => write!(f, "{e}"),
            Self::Raised {
                value,
                line,
                column,
            } => write!(
                f,
                "{}",
                Exception::Raised {
                    value: value.clone(),
                    line: *line,
                    column: *column,
                }
            ),
        }
    }
}

/// Runs a program against the standard host
pub fn run(source: &str) -> Outcome {
    run_with_host(source, Box::new(StdHost))
}

pub fn run_with_host(source: &str, host: Box<dyn Host>) -> Outcome {
    let lexer = Lexer::new(source);
    trace!("Lexing {source}");
    let tokens = match lexer.lex_all() {
        Ok(tokens) => tokens,
        Err(e) => {
            return Outcome {
                output: vec![],
                error: Some(Failure::Syntax(vec![e])),
            }
        }
    };
    trace!("Parsing {} tokens", tokens.len());
    let parser = Parser::new(&tokens);
    let root = match parser.parse_all() {
        Ok(root) => root,
        Err(errors) => {
            return Outcome {
                output: vec![],
                error: Some(Failure::Syntax(errors)),
            }
        }
    };
    trace!("Interpreting {root:#?}");
    let mut interpreter = Interpreter::new(host);
    let res = interpreter.interpret_all(&root);
    Outcome {
        output: interpreter.output,
        error: res.err().map(Failure::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestHost;

    impl Host for TestHost {
        fn prompt(&mut self, _: &str) -> Option<String> {
            Some("Ali".to_string())
        }

        fn now_ms(&mut self) -> f64 {
            1_000.0
        }

        fn random(&mut self) -> f64 {
            0.5
        }
    }

    fn run_test(source: &str) -> Outcome {
        run_with_host(source, Box::new(TestHost))
    }

    fn output_test(source: &str, expected: &[&str]) {
        let outcome = run_test(source);
        if let Some(failure) = &outcome.error {
            panic!("unexpected failure: {failure}");
        }
        assert_eq!(outcome.output, expected);
    }

    fn runtime_err_test(source: &str, output: &[&str], message: &str) {
        let outcome = run_test(source);
        assert_eq!(outcome.output, output);
        let failure = outcome.error.expect("run should fail");
        assert_eq!(failure.phase(), Phase::Runtime);
        assert_eq!(failure.message(), message);
    }

    #[test]
    fn const_reassignment() {
        runtime_err_test(
            "tabit x = 1; tbe3(x); x = 2; tbe3(\"never\");",
            &["1"],
            "assignment to constant `x`",
        );
    }

    #[test]
    fn uninitialized_let() {
        output_test("bdl x; tbe3(x); x = 3; tbe3(x);", &["mchmcha", "3"]);
    }

    #[test]
    fn switch_fallthrough() {
        output_test(
            "bdl3la(2){ 7ala 1: tbe3(\"a\"); 7ala 2: tbe3(\"b\"); 7ala 3: tbe3(\"c\"); wa9f; 3adi: tbe3(\"d\"); }",
            &["b", "c"],
        );
        // The default clause is entered wherever it appears
        output_test(
            "bdl3la(\"z\"){ 3adi: tbe3(\"d\"); 7ala \"a\": tbe3(\"a\"); }",
            &["d", "a"],
        );
        // Strict equality
        output_test("bdl3la(1){ 7ala \"1\": tbe3(\"loose\"); }", &[]);
    }

    #[test]
    fn try_catch_finally() {
        output_test(
            "jrb { rmmi(\"x\"); } msk (e) { tbe3(e); } fakhr { tbe3(\"done\"); }",
            &["x", "done"],
        );
        output_test(
            "jrb { bla(); } msk (e) { tbe3(e); }",
            &["undefined variable `bla`"],
        );
        output_test(
            "dala f() { jrb { rj3 1; } fakhr { rj3 2; } } tbe3(f());",
            &["2"],
        );
        runtime_err_test(
            "jrb { tbe3(1); } fakhr { rmmi(\"late\"); }",
            &["1"],
            "late",
        );
    }

    #[test]
    fn functions() {
        output_test("dala add(a,b){ rj3 a+b; } tbe3(add(2,3));", &["5"]);
        // Hoisting, missing arguments and no return value
        output_test(
            "tbe3(f(1)); dala f(a, b) { tbe3(a, b); }",
            &["1 mchmcha", "mchmcha"],
        );
        output_test(
            "dala counter() { bdl n = 0; rj3 dala () { n += 1; rj3 n; }; } tabit c = counter(); c(); tbe3(c());",
            &["2"],
        );
        output_test("dala f(a) {} tbe3(f);", &["dala f(a)"]);
    }

    #[test]
    fn for_loop() {
        output_test(
            "douz(bdl i=0;i<5;i=i+1){ ila(i===2){kamml;} ila(i===4){wa9f;} tbe3(i); }",
            &["0", "1", "3"],
        );
        // Closures see the binding of their own iteration
        output_test(
            "bdl fs = []; douz (bdl i = 0; i < 3; i++) { fs.zid(dala () { rj3 i; }); } tbe3(fs[0](), fs[2]());",
            &["0 2"],
        );
    }

    #[test]
    fn other_loops() {
        output_test(
            "bdl i = 0; madamt (i < 3) { i++; ila (i == 2) { kamml; } tbe3(i); }",
            &["1", "3"],
        );
        output_test("bdl n = 5; dir { tbe3(n); } madamt (n < 0);", &["5"]);
    }

    #[test]
    fn objects_and_methods() {
        output_test(
            "bdl o = {name: \"Ali\", greet: dala () { rj3 \"salam \" + hadi.name; }}; tbe3(o.greet());",
            &["salam Ali"],
        );
        output_test(
            "dala Point(x, y) { hadi.x = x; hadi.y = y; } tabit p = jdid Point(1, 2); tbe3(p.x + p.y, no3 p);",
            &["3 object"],
        );
        output_test(
            "tbe3([1, 2, 3].7awl(dala (x) { rj3 x * 2; }).lsse9(\"-\"));",
            &["2-4-6"],
        );
        output_test(
            "tbe3(\"Salam\".twil, \"abc\".kbir(), \" x \".n9i(), mfati7({a: 1, b: 2}));",
            &["5 ABC x [\"a\", \"b\"]"],
        );
        output_test("bdl a = []; a[2] = 1; a[0] += 1; tbe3(a);", &["[NaN, mchmcha, 1]"]);
        runtime_err_test("bdl o = {}; o.x;", &[], "undefined member `x`");
        runtime_err_test("bdl n = 1; n();", &[], "not a function `1`");
    }

    #[test]
    fn operators() {
        output_test(
            "tbe3(1 + \"2\", \"3\" * \"4\", 1 == \"1\", 1 === \"1\", farkha == mchmcha, no3 farkha, no3 nope);",
            &["12 12 s7i7 ghalat s7i7 object undefined"],
        );
        output_test(
            "tbe3(0 || \"x\", 1 && 0, !\"\", \"b\" > \"a\", 7 % 3, 1 / 0);",
            &["x 0 s7i7 s7i7 1 Infinity"],
        );
    }

    #[test]
    fn uncaught_raise() {
        let outcome = run_test("tbe3(1);\nrmmi({code: 2});");
        assert_eq!(outcome.output, vec!["1"]);
        let failure = outcome.error.expect("run should fail");
        assert!(matches!(failure, Failure::Raised { .. }));
        assert_eq!(failure.message(), "{code: 2}");
        assert_eq!(failure.line(), 2);
    }

    #[test]
    fn syntax_errors_produce_no_output() {
        let outcome = run_test("tbe3(1);\nbdl = ;\ntbe3(2)");
        assert!(outcome.output.is_empty());
        let failure = outcome.error.expect("parse should fail");
        assert_eq!(failure.phase(), Phase::Parse);
        assert_eq!(failure.line(), 2);
        match failure {
            Failure::Syntax(errors) => assert_eq!(errors.len(), 2),
            _ => panic!("expected syntax errors"),
        }

        let outcome = run_test("tbe3(1); #");
        assert!(outcome.output.is_empty());
        assert_eq!(outcome.error.map(|f| f.phase()), Some(Phase::Lex));
    }

    #[test]
    fn timers() {
        output_test(
            "m2a9it(dala () { tbe3(\"late\"); }, 20);
             m2a9it(dala () { tbe3(\"early\"); }, 10);
             bdl n = 0;
             bdl id = tkrar(dala () { n++; tbe3(\"tick \" + n); ila (n === 3) { lghi(id); } }, 5);
             tbe3(\"main\");",
            &["main", "tick 1", "early", "tick 2", "tick 3", "late"],
        );
        output_test(
            "tabit id = m2a9it(dala (a) { tbe3(a); }, 0, \"never\"); lghi(id); m2a9it(dala () { tbe3(daba()); }, 50);",
            &["1050"],
        );
        runtime_err_test(
            "tkrar(dala () {}, 1);",
            &[],
            "timer callbacks exceeded the limit of `10000`",
        );
    }

    #[test]
    fn host_hooks() {
        output_test(
            "tbe3(sowel(\"smitek?\")); nbh(\"salam\"); tbe3(t2kd(\"wach?\"), tsadof(), l3am(Tarikh(0)));",
            &["Ali", "salam", "ghalat 0.5 1970"],
        );
        output_test("tabit d = jdid Tarikh(); tbe3(d.wa9t);", &["1000"]);
    }

    #[test]
    fn deterministic_runs() {
        let source = "bdl s = 0; douz (bdl i = 0; i < 10; i++) { s += i * i; } tbe3(s, [s].lsse9());";
        let first = run(source);
        let second = run(source);
        assert_eq!(first.output, vec!["285 285"]);
        assert_eq!(first.output, second.output);
    }

    #[test]
    fn call_depth_is_limited() {
        runtime_err_test(
            "tbe3(\"start\"); dala f(n) { rj3 f(n + 1); } f(0);",
            &["start"],
            "maximum call depth exceeded in `dala f(n)`",
        );
    }

    #[test]
    fn nested_statements_count_towards_the_limit() {
        let outcome = run_test(
            "dala f(n) {
                 ila (s7i7) { madamt (s7i7) { jrb { douz (;;) { rj3 f(n + 1); } } fakhr { } } }
             }
             f(0);
             tbe3(\"after\");",
        );
        assert!(outcome.output.is_empty());
        let failure = outcome.error.expect("run should fail");
        assert_eq!(failure.phase(), Phase::Runtime);
        assert!(failure
            .message()
            .starts_with("evaluation nested deeper than the limit of"));

        // The counters unwind, so a caught failure leaves the run usable
        output_test(
            "dala f() { rj3 f(); }
             jrb { f(); } msk (e) { tbe3(\"caught\"); }
             dala g(n) { ila (n > 0) { rj3 g(n - 1); } rj3 n; }
             tbe3(g(20));",
            &["caught", "0"],
        );
    }

    #[test]
    fn deeply_nested_source_is_rejected() {
        let depth = 20_000;
        let source = format!("tbe3({}1{});", "(".repeat(depth), ")".repeat(depth));
        let outcome = run_test(&source);
        assert!(outcome.output.is_empty());
        match outcome.error {
            Some(Failure::Syntax(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].msg.starts_with("nesting too deep at"));
            }
            _ => panic!("expected syntax errors"),
        }
    }

    #[test]
    fn huge_array_index() {
        runtime_err_test(
            "bdl a = []; a[4000000000] = 1; tbe3(\"after\");",
            &[],
            "invalid array index `4000000000`",
        );
        output_test("bdl a = []; a[3] = 1; tbe3(a.twil);", &["4"]);
    }

    #[test]
    fn misplaced_jumps_are_syntax_errors() {
        for source in [
            "tbe3(1); wa9f; tbe3(2);",
            "tbe3(1); kamml; tbe3(2);",
            "tbe3(1); rj3 5; tbe3(2);",
            "dala f() { wa9f; } tbe3(1);",
            "madamt (ghalat) { dala f() { kamml; } }",
            "bdl3la (1) { 7ala 1: kamml; }",
        ] {
            let outcome = run_test(source);
            assert!(outcome.output.is_empty(), "{source}");
            assert_eq!(outcome.error.map(|f| f.phase()), Some(Phase::Parse), "{source}");
        }

        output_test(
            "douz (bdl i = 0; i < 3; i++) {
                 bdl3la (i) { 7ala 1: kamml; 3adi: wa9f; }
                 tbe3(i);
             }",
            &["0", "2"],
        );
    }

    #[test]
    fn failure_display() {
        let outcome = run_test("tbe3(x);");
        let failure = outcome.error.expect("run should fail");
        assert_eq!(
            failure.to_string(),
            "Runtime error at line 1, column 6: undefined variable `x`"
        );
        assert_eq!((failure.line(), failure.column()), (1, 6));
    }
}
