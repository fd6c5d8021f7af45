//! Differentiate each line read from stdin.
//!
//! Pass `--steps` to also print the rules that were used, the suggested
//! approach, and the chain of variables for simple compositions. Set
//! `RUST_LOG=calculus_steps=debug` to see what the engine is doing.

use calculus_steps::{
    chain_layers, classify, normalize, parse, parse_and_differentiate,
    Derivation,
};
use std::io::{BufRead, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Copy, Clone, PartialEq)]
enum DisplayMode {
    Compact,
    Steps,
}

impl DisplayMode {
    fn from_args<I: Iterator<Item = String>>(args: I) -> Self {
        let mut mode = DisplayMode::Compact;

        for arg in args {
            match arg.as_str() {
                "--steps" | "-s" => mode = DisplayMode::Steps,
                "--compact" | "-c" => mode = DisplayMode::Compact,
                other => eprintln!("Ignoring unknown argument \"{}\"", other),
            }
        }

        mode
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mode = DisplayMode::from_args(std::env::args().skip(1));
    let stdin = std::io::stdin();

    for line in BufReader::new(stdin.lock()).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match parse_and_differentiate(&line) {
            Ok(derivation) => print_derivation(&line, &derivation, mode),
            Err(e) => {
                eprintln!("Unable to parse \"{}\": {}", line, e);
                eprintln!("Please check your input.");
            },
        }
    }

    Ok(())
}

fn print_derivation(raw: &str, derivation: &Derivation, mode: DisplayMode) {
    println!("f(x)  = {}", derivation.original);
    println!("f'(x) = {}", derivation.derivative);

    // these must always be shown, otherwise a 0 looks like a real answer
    for note in derivation.notes() {
        println!("{}", note);
    }

    if mode == DisplayMode::Compact {
        println!();
        return;
    }

    println!("\nRules used:");
    for (i, line) in derivation.trace_lines().iter().enumerate() {
        println!("  {}. {}", i + 1, line);
    }

    if let Ok(classification) = classify(raw) {
        println!("\nSuggested order:");
        for rule in classification.rule_order() {
            println!("  - {}", rule);
        }
        println!("Recommended: {}", classification.recommended_tool());
    }

    let work = parse(&normalize(raw)).ok().and_then(|e| chain_layers(&e));
    if let Some(work) = work {
        println!("\nChain of variables:");
        for line in work.to_string().lines() {
            println!("  {}", line);
        }
    }

    println!();
}
