#![deny(warnings)]

extern crate pascal;
extern crate toml;
extern crate serde;
extern crate clap;

use std::fs::read_to_string;
use std::io::{self, BufRead, Write};
use std::process::exit;
use std::thread;

use clap::{Arg, App};
use log::info;
use serde::Deserialize;

use pascal::error::Error;
use pascal::interpreter::{
    ActivationRecord, Interpreter, DEFAULT_MAX_CALL_DEPTH, MAX_CALL_DEPTH_LIMIT,
};
use pascal::lexer::lex;
use pascal::notation::{to_prefix, to_postfix};
use pascal::parser::{parse, parse_expression};
use pascal::sem::analyze;
use pascal::{evaluate_source_with, Outcome};


// interpreter thread stack: a fixed base plus room for every nested call
const BASE_STACK_SIZE: usize = 8 * 1024 * 1024;
const STACK_SIZE_PER_CALL: usize = 64 * 1024;

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ReplConfig {
    prompt: String,
}

impl Default for ReplConfig {
    fn default() -> ReplConfig {
        ReplConfig { prompt: "pascal> ".to_string() }
    }
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct OutputConfig {
    verbose: bool,
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RuntimeConfig {
    max_call_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> RuntimeConfig {
        RuntimeConfig { max_call_depth: DEFAULT_MAX_CALL_DEPTH }
    }
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct Config {
    repl: ReplConfig,
    output: OutputConfig,
    runtime: RuntimeConfig,
}


fn load_config(path: &str) -> Config {
    let config_str = read_to_string(path).unwrap_or_else(|err| {
        eprintln!("could not read config file: {}", err);
        exit(1);
    });
    let config: Config = toml::from_str(&config_str).unwrap_or_else(|err| {
        eprintln!("incorrect configuration: {}", err);
        exit(1);
    });

    let depth = config.runtime.max_call_depth;
    if depth == 0 || depth > MAX_CALL_DEPTH_LIMIT {
        eprintln!(
            "incorrect configuration: runtime.max_call_depth must be between 1 and {}, got {}",
            MAX_CALL_DEPTH_LIMIT, depth);
        exit(1);
    }
    config
}


fn run_program(
    source: &str,
    interpreter: &Interpreter,
    verbose: bool
) -> Result<ActivationRecord, Error> {
    if verbose {
        println!("Tokens: {:?}", lex(source));
    }
    let program = parse(source)?;
    if verbose {
        println!("Parse: {:#?}", program);
    }
    let table = analyze(&program)?;
    if verbose {
        for scope in table.scopes() {
            let mut names: Vec<&str> = scope.symbols().map(|s| s.name()).collect();
            names.sort();
            println!("Sem: scope {} (level {}): {}", scope.name, scope.level, names.join(", "));
        }
    }
    interpreter.interpret(&program)
}


fn run_expression(source: &str, notation: Option<&str>, interpreter: &Interpreter) -> i32 {
    let result = parse_expression(source).and_then(|expr| match notation {
        Some("prefix") => Ok(to_prefix(&expr)),
        Some("postfix") => Ok(to_postfix(&expr)),
        _ => interpreter.evaluate(&expr).map(|n| n.to_string()),
    });

    match result {
        Ok(s) => {
            println!("{}", s);
            0
        }
        Err(err) => {
            eprintln!("error: {}", err);
            1
        }
    }
}


fn repl(prompt: &str, interpreter: &Interpreter) {
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("{}", prompt);
        // a closed stdout is noticed by the next println
        let _ = io::stdout().flush();

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                eprintln!("could not read input: {}", err);
                exit(1);
            }
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match evaluate_source_with(interpreter, input) {
            Ok(Outcome::Value(n)) => println!("{}", n),
            Ok(Outcome::Program(frame)) => println!("{}", frame),
            Err(err) => eprintln!("error: {}", err),
        }
    }
    println!();
}


struct Options {
    expr: Option<String>,
    notation: Option<String>,
    sources: Vec<String>,
    verbose: bool,
    prompt: String,
    max_call_depth: usize,
}

fn execute(options: Options) -> i32 {
    let interpreter = Interpreter::with_max_call_depth(options.max_call_depth);

    if let Some(expr) = &options.expr {
        return run_expression(expr, options.notation.as_deref(), &interpreter);
    }

    if options.sources.is_empty() {
        repl(&options.prompt, &interpreter);
        return 0;
    }

    let mut failed = false;
    for path in &options.sources {
        let source = match read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("could not read source file: {}", err);
                failed = true;
                continue;
            }
        };

        info!("running {}", path);
        match run_program(&source, &interpreter, options.verbose) {
            Ok(frame) => println!("{}", frame),
            Err(err) => {
                eprintln!("{}: error: {}", path, err);
                failed = true;
            }
        }
    }

    if failed { 1 } else { 0 }
}


fn main() {
    env_logger::init();

    let arg_matches = App::new("Pascal interpreter")
        .author("Pawel Stiasny <pawelstiasny@gmail.com>")
        .about("Interpreter for a small subset of Pascal")
        .arg(Arg::with_name("config")
             .short("-c")
             .value_name("FILE")
             .help("Interpreter config TOML file")
             .takes_value(true))
        .arg(Arg::with_name("expr")
             .short("-e")
             .value_name("EXPR")
             .help("Evaluate an arithmetic expression")
             .takes_value(true))
        .arg(Arg::with_name("notation")
             .long("notation")
             .value_name("NOTATION")
             .help("Print the expression given with -e in another notation")
             .possible_values(&["prefix", "postfix"])
             .requires("expr")
             .takes_value(true))
        .arg(Arg::with_name("verbose")
             .short("-v")
             .help("Print tokens, syntax tree and scopes"))
        .arg(Arg::with_name("SOURCES")
             .help("Program files; without any an interactive prompt starts")
             .multiple(true)
             .index(1))
        .get_matches();

    let config = match arg_matches.value_of("config") {
        Some(path) => load_config(path),
        None => Config::default(),
    };

    let options = Options {
        expr: arg_matches.value_of("expr").map(String::from),
        notation: arg_matches.value_of("notation").map(String::from),
        sources: arg_matches.values_of("SOURCES")
            .map(|paths| paths.map(String::from).collect())
            .unwrap_or_default(),
        verbose: arg_matches.is_present("verbose") || config.output.verbose,
        prompt: config.repl.prompt,
        max_call_depth: config.runtime.max_call_depth,
    };

    let stack_size = BASE_STACK_SIZE + STACK_SIZE_PER_CALL * options.max_call_depth;
    let worker = thread::Builder::new()
        .name("interpreter".to_string())
        .stack_size(stack_size)
        .spawn(move || execute(options));

    let code = match worker {
        Ok(handle) => handle.join().unwrap_or(1),
        Err(err) => {
            eprintln!("could not start interpreter thread: {}", err);
            1
        }
    };
    exit(code);
}
