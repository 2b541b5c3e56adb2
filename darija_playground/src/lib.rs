mod host;

use darija_runtime::{run_with_host, Outcome};
use darija_syntax::{lex::Lexer, parse::Parser};
use host::BrowserHost;
use std::env;
use wasm_bindgen::prelude::*;

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen]
pub fn init() -> String {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    format!(
        "DarijaScript v{} on {} ({})",
        env!("CARGO_PKG_VERSION"),
        env::consts::OS,
        env::consts::ARCH,
    )
}

/// Runs a program with the browser as its host and returns what it
/// printed, followed by the error if it failed
#[wasm_bindgen]
pub fn execute(src: &str) -> String {
    render(&run_with_host(src, Box::new(BrowserHost)))
}

/// Reformats a program, or returns its syntax errors
#[wasm_bindgen]
pub fn format(src: &str) -> Result<String, String> {
    let tokens = Lexer::new(src).lex_all().map_err(|e| e.to_string())?;
    let source = Parser::new(&tokens).parse_all().map_err(|errors| {
        errors
            .into_iter()
            .fold(String::default(), |a, b| a + &b.to_string() + "\n")
            .trim()
            .to_string()
    })?;
    Ok(source.to_string())
}

fn render(outcome: &Outcome) -> String {
    let mut lines = outcome.output.clone();
    if let Some(failure) = &outcome.error {
        lines.push(failure.to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use darija_runtime::run;

    #[test]
    fn banner() {
        assert!(init().starts_with("DarijaScript v0.1.0 on "));
    }

    #[test]
    fn render_output() {
        assert_eq!(render(&run("tbe3(1); tbe3(\"a\", s7i7);")), "1\na s7i7");
        assert_eq!(render(&run("")), "");
    }

    #[test]
    fn render_errors() {
        assert_eq!(
            render(&run("tbe3(1); rmmi(\"bad\");")),
            "1\nRuntime error at line 1, column 14: uncaught \"bad\""
        );
        assert_eq!(
            render(&run("tbe3(1)")),
            "Parse error at line 1, column 8: expected `;`, found `end of file`"
        );
    }

    #[test]
    fn format_source() {
        assert_eq!(
            format("bdl   x=1+2*3;ila(x){tbe3(x);}").unwrap(),
            "bdl x = 1 + (2 * 3);\nila (x) {\n    tbe3(x);\n}\n"
        );
        assert!(format("bdl = ;").is_err());
    }
}
