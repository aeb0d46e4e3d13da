//! Command-line front end for the cpplex preprocessor.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use cpplex::{Charset, Config, Preprocessor, Token, TokenKind, tokens_to_string};

#[derive(Parser)]
#[command(
    name = "cpplex",
    version,
    about = "Preprocess C/C++ sources into an expanded token stream"
)]
struct Cli {
    /// Input source file; '-' reads standard input
    input: PathBuf,

    /// Write output here instead of standard output
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Add a directory to the include search path
    #[arg(short = 'I', long = "include-dir", value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Define a macro: NAME, NAME=VALUE or 'NAME(params)=VALUE'
    #[arg(short = 'D', long = "define", value_name = "MACRO")]
    defines: Vec<String>,

    /// Preprocess a file before the input, sharing its macro state
    #[arg(long = "force-include", value_name = "FILE")]
    force_includes: Vec<PathBuf>,

    /// Encoding of all read files
    #[arg(long, value_enum, default_value_t = CharsetArg::Utf8)]
    charset: CharsetArg,

    /// Recursion bound for macro expansion
    #[arg(long, value_name = "N", default_value_t = 128)]
    max_expansion_depth: usize,

    /// Turn recoverable problems into hard errors
    #[arg(long)]
    strict: bool,

    /// Print one token per line with its position and kind
    #[arg(long)]
    tokens: bool,

    /// Suppress recovered diagnostics
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum CharsetArg {
    Utf8,
    Latin1,
}

impl From<CharsetArg> for Charset {
    fn from(arg: CharsetArg) -> Self {
        match arg {
            CharsetArg::Utf8 => Charset::Utf8,
            CharsetArg::Latin1 => Charset::Latin1,
        }
    }
}

/// Turn `NAME=VALUE` into the `NAME VALUE` form of the `#define` grammar.
fn define_to_definition(define: &str) -> String {
    match define.split_once('=') {
        Some((name, value)) => format!("{name} {value}"),
        None => define.to_string(),
    }
}

fn dump_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for t in tokens {
        if t.kind == TokenKind::Eof {
            continue;
        }
        out.push_str(&format!("{}:{}\t{:?}\t{}\n", t.line, t.column, t.kind, t.value));
    }
    out
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let charset: Charset = cli.charset.into();
    let mut config = Config::default()
        .with_charset(charset)
        .with_include_dirs(cli.include_dirs.iter().cloned())
        .with_error_recovery(!cli.strict)
        .with_max_expansion_depth(cli.max_expansion_depth);
    for define in &cli.defines {
        config = config.with_define(define_to_definition(define));
    }
    for path in &cli.force_includes {
        config = config.with_force_include(path);
    }

    let mut pp = Preprocessor::new(config);
    let tokens = if cli.input.as_os_str() == "-" {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("failed to read standard input")?;
        pp.set_file("<stdin>");
        pp.preprocess(&charset.decode(&bytes))
    } else {
        pp.preprocess_file(&cli.input)
    }
    .with_context(|| format!("failed to preprocess '{}'", cli.input.display()))?;

    if !cli.quiet {
        for diagnostic in pp.diagnostics() {
            eprintln!("{} {diagnostic}", "warning:".yellow().bold());
        }
    }

    let rendered = if cli.tokens {
        dump_tokens(&tokens)
    } else {
        let mut text = tokens_to_string(&tokens);
        text.push('\n');
        text
    };
    match &cli.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write '{}'", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_argument_forms() {
        assert_eq!(define_to_definition("NDEBUG"), "NDEBUG");
        assert_eq!(define_to_definition("VERSION=2"), "VERSION 2");
        assert_eq!(define_to_definition("MAX(a,b)=((a)>(b)?(a):(b))"), "MAX(a,b) ((a)>(b)?(a):(b))");
    }

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
