//! YAIL CLI: run script files against the process's standard streams.

use std::env;
use std::fs;
use std::io;
use std::process;

/// CLI options parsed from arguments.
struct Options {
    files: Vec<String>,
    disassemble: bool,
    seed: Option<u64>,
}

fn print_usage() {
    eprintln!("YAIL - Yet Another Interpreted Language");
    eprintln!();
    eprintln!("Usage: yail [options] <script>...");
    eprintln!();
    eprintln!("Runs each script in order against stdin/stdout.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --disassemble   Print bytecode instead of running");
    eprintln!("  --seed N        Seed the random number generator");
    eprintln!("  --help, -h      Show this help message");
}

fn parse_args() -> Options {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut options = Options {
        files: Vec::new(),
        disassemble: false,
        seed: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            "--disassemble" => options.disassemble = true,
            "--seed" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    eprintln!("--seed requires a value");
                    process::exit(1);
                };
                match value.parse() {
                    Ok(seed) => options.seed = Some(seed),
                    Err(_) => {
                        eprintln!("--seed requires an integer, got '{}'", value);
                        process::exit(1);
                    }
                }
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown option '{}'", arg);
                print_usage();
                process::exit(1);
            }
            _ => options.files.push(args[i].clone()),
        }
        i += 1;
    }

    if options.files.is_empty() {
        eprintln!("Please pass a script file as an argument.");
        print_usage();
        process::exit(1);
    }
    options
}

fn main() {
    let options = parse_args();

    for file in &options.files {
        let source = match fs::read_to_string(file) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("Could not read '{}': {}", file, err);
                process::exit(1);
            }
        };

        if options.disassemble {
            match yail::parse(&source) {
                Ok(code) => print!("{}", yail::disassemble(&code)),
                Err(err) => {
                    eprintln!("{}", err);
                    process::exit(1);
                }
            }
            continue;
        }

        let stdin = io::stdin();
        let stdout = io::stdout();
        let result = match options.seed {
            Some(seed) => yail::interpret_with_seed(&source, stdin.lock(), stdout.lock(), seed),
            None => yail::interpret(&source, stdin.lock(), stdout.lock()),
        };
        if let Err(err) = result {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}
