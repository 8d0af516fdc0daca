use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::PathBuf;

use clap::Parser as ClapParser;
use clap::Subcommand;
use log::info;

use treelox::ast::Stmt;
use treelox::ast_printer::AstPrinter;
use treelox::error::LoxError;
use treelox::interpreter::Interpreter;
use treelox::parser::Parser;
use treelox::resolver::Resolver;
use treelox::scanner::Scanner;
use treelox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes the provided input from a given valid filepath
    Tokenize { filename: Option<PathBuf> },

    /// Parses the provided input and prints the tree in prefix form
    Parse { filename: Option<PathBuf> },

    /// Runs the program from a given valid filepath
    Run { filename: Option<PathBuf> },
}

// sysexits convention: EX_DATAERR for compile-stage diagnostics, EX_SOFTWARE
// for a runtime failure.
const EXIT_COMPILE_ERROR: i32 = 65;
const EXIT_RUNTIME_ERROR: i32 = 70;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    match args.commands {
        Commands::Tokenize { filename } => match filename {
            Some(filename) => {
                let source: String = read_source(&filename)?;

                let mut tokenized = true;

                for token in Scanner::new(&source) {
                    match token {
                        Ok(token) => println!("{}", token),

                        Err(e) => {
                            tokenized = false;
                            eprintln!("{}", e);
                        }
                    }
                }

                if !tokenized {
                    std::process::exit(EXIT_COMPILE_ERROR);
                }
            }

            None => missing_input(),
        },

        Commands::Parse { filename } => match filename {
            Some(filename) => {
                let source: String = read_source(&filename)?;

                match front_end(&source) {
                    Ok(statements) => {
                        println!("{}", AstPrinter::print_program(&statements));
                    }

                    Err(errors) => {
                        report_all(&errors);
                        std::process::exit(EXIT_COMPILE_ERROR);
                    }
                }
            }

            None => missing_input(),
        },

        Commands::Run { filename } => match filename {
            Some(filename) => {
                let source: String = read_source(&filename)?;

                let statements: Vec<Stmt> = match front_end(&source) {
                    Ok(statements) => statements,

                    Err(errors) => {
                        report_all(&errors);
                        std::process::exit(EXIT_COMPILE_ERROR);
                    }
                };

                let mut interpreter: Interpreter = Interpreter::new();

                let mut resolver: Resolver = Resolver::new(&mut interpreter);

                if let Err(e) = resolver.resolve(&statements) {
                    eprintln!("{}", e);
                    std::process::exit(EXIT_COMPILE_ERROR);
                }

                if let Err(e) = interpreter.interpret(&statements) {
                    eprintln!("{}", e);
                    std::process::exit(EXIT_RUNTIME_ERROR);
                }
            }

            None => missing_input(),
        },
    }

    Ok(())
}

/// Scan, then parse.  Diagnostics from both phases come back together; any
/// diagnostic aborts the pipeline before execution.
fn front_end(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
    info!("Scanning {} bytes", source.len());

    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<LoxError> = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),

            Err(e) => errors.push(e),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    info!("Parsing {} token(s)", tokens.len());

    let mut parser: Parser = Parser::new(tokens);

    parser.parse()
}

fn report_all(errors: &[LoxError]) {
    for e in errors {
        eprintln!("{}", e);
    }
}

fn missing_input() {
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn read_source(filename: &PathBuf) -> anyhow::Result<String> {
    info!("Reading source from {}", filename.display());

    let mut buf: Vec<u8> = Vec::new();

    let mut reader: BufReader<File> = BufReader::new(File::open(filename)?);
    reader.read_to_end(&mut buf)?;

    Ok(String::from_utf8(buf)?)
}
