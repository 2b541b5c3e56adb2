use darija_runtime::{run, Failure, Outcome};
use darija_syntax::error::Phase;
use std::{
    env, fs,
    io::{self, Write},
    process,
};

// Exit codes from sysexits.h
const EX_USAGE: i32 = 64;
const EX_DATAERR: i32 = 65;
const EX_SOFTWARE: i32 = 70;
const EX_IOERR: i32 = 74;

fn main() {
    pretty_env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() > 1 {
        eprintln!("Usage: darija [script]");
        process::exit(EX_USAGE);
    }
    if args.is_empty() {
        run_repl();
    } else {
        run_file(&args[0]);
    }
}

fn run_repl() {
    let (stdin, mut stdout) = (io::stdin(), io::stdout());
    loop {
        let mut line = String::default();
        print!(">>> ");
        if stdout.flush().is_err() {
            process::exit(EX_IOERR);
        }
        let n = match stdin.read_line(&mut line) {
            Ok(n) => n,
            Err(e) => {
                eprintln!("Failed to read line: {e}");
                process::exit(EX_IOERR);
            }
        };
        // If zero bytes are read, then exit (usually triggered by Ctrl-D)
        if n == 0 {
            break;
        }
        // Every line is a program of its own
        report(run(&line));
    }
}

fn run_file(file_path: &str) {
    let source = match fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read {file_path}: {e}");
            process::exit(EX_IOERR);
        }
    };
    if let Some(failure) = report(run(&source)) {
        process::exit(exit_code(&failure));
    }
}

/// Prints the output lines and the error of a run, handing the error
/// back to the caller
fn report(outcome: Outcome) -> Option<Failure> {
    outcome.output.iter().for_each(|line| println!("{line}"));
    if let Some(failure) = &outcome.error {
        eprintln!("{failure}");
    }
    outcome.error
}

fn exit_code(failure: &Failure) -> i32 {
    match failure.phase() {
        Phase::Lex | Phase::Parse => EX_DATAERR,
        Phase::Runtime => EX_SOFTWARE,
    }
}
