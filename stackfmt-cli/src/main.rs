//! stackfmt CLI - コマンドラインインターフェース
//!
//! 実行中のプロセス自身のスタックを取得し、書式指定で表示する。

mod command;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use command::Command;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use stackfmt_core::{
    set_write_error_handler, simplify, CaptureOptions, Directive, FrameResolver, Render, Stack,
    StackTracer, SymbolizerKind, DEFAULT_MAX_DEPTH,
};
use std::io::{self, Write};
use std::num::NonZeroUsize;

/// stackfmt - call stack capture and formatting
#[derive(Parser)]
#[command(name = "stackfmt")]
#[command(version = "0.1.0")]
#[command(about = "Capture and format call stacks of the running process", long_about = None)]
struct Cli {
    /// Symbolization backend (auto, dwarf or backtrace)
    #[arg(long, global = true, default_value_t = SymbolizerKind::Auto)]
    symbolizer: SymbolizerKind,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Capture a stack through nested demo frames and print it
    Trace {
        /// Formatting directive: %s, %d, %n or %v with optional + or # flag
        #[arg(short, long, default_value = "%+v")]
        format: String,

        /// Number of frames to skip above the capture point
        #[arg(short, long, default_value_t = 0)]
        skip: usize,

        /// Maximum number of frames to capture
        #[arg(short, long, default_value_t = DEFAULT_MAX_DEPTH)]
        depth: NonZeroUsize,

        /// Number of demo frames between main and the capture point
        #[arg(short, long, default_value_t = 3)]
        nest: usize,
    },

    /// Print simplified function names
    Simplify {
        /// Fully qualified function names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Start an interactive session
    Repl,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    set_write_error_handler(|err| eprintln!("stackfmt: {}", err));
    install_resolver(cli.symbolizer)?;

    match cli.command {
        CliCommand::Trace {
            format,
            skip,
            depth,
            nest,
        } => run_trace(&format, CaptureOptions { max_depth: depth, skip }, nest),
        CliCommand::Simplify { names } => {
            for name in &names {
                println!("{}", simplify(name));
            }
            Ok(())
        }
        CliCommand::Repl => run_repl(),
    }
}

/// プロセス全体の解決器を選択したバックエンドで初期化する
fn install_resolver(kind: SymbolizerKind) -> Result<()> {
    let resolver = FrameResolver::from_kind(kind)
        .with_context(|| format!("Failed to initialize {} symbolizer", kind))?;
    tracing::debug!(?resolver, "installing frame resolver");

    if FrameResolver::install(resolver).is_err() {
        anyhow::bail!("Frame resolver was already initialized");
    }
    Ok(())
}

/// デモ用のフレームを `depth` 段重ねてからスタックを取得する
#[inline(never)]
fn nested_capture(depth: usize, options: CaptureOptions) -> Stack {
    if depth == 0 {
        return Stack::capture_with(options);
    }
    let stack = nested_capture(depth - 1, options);
    std::hint::black_box(stack)
}

fn run_trace(format: &str, options: CaptureOptions, nest: usize) -> Result<()> {
    let directive = Directive::parse(format)?;
    let stack = nested_capture(nest, options);

    let mut out = io::stdout().lock();
    stack.write_to(&mut out, &directive);
    writeln!(out)?;
    Ok(())
}

/// REPLループを実行する
fn run_repl() -> Result<()> {
    println!("stackfmt {}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for available commands, 'quit' to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline("(stackfmt) ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)?;

                match Command::parse(line) {
                    Some(Command::Quit) => break,
                    Some(command) => {
                        if let Err(e) = handle_command(command) {
                            eprintln!("Error: {}", e);
                        }
                    }
                    None => {
                        println!("Unknown command: {}", line);
                        println!("Type 'help' for available commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

/// 省略時の書式は `%+v`
fn parse_directive(directive: Option<&str>) -> Result<Directive> {
    Ok(Directive::parse(directive.unwrap_or("%+v"))?)
}

#[inline(never)]
fn handle_command(command: Command) -> Result<()> {
    match command {
        Command::Backtrace(directive) => {
            let directive = parse_directive(directive.as_deref())?;
            let trace = Stack::capture_skip(0).stack_trace();
            println!("{}", trace.display(directive));
        }
        Command::Frame { index, directive } => {
            let directive = parse_directive(directive.as_deref())?;
            let trace = Stack::capture_skip(0).stack_trace();
            let frame = trace
                .get(index)
                .with_context(|| format!("No frame {} (stack has {} frames)", index, trace.len()))?;
            println!("#{} {}", index, frame.display(directive));
        }
        Command::Simplify(name) => println!("{}", simplify(&name)),
        Command::Help => print_help(),
        Command::Quit => {}
    }
    Ok(())
}

fn print_help() {
    println!("Available commands:");
    println!();
    println!("  help                  - Show this help message");
    println!("  quit/exit/q           - Exit");
    println!();
    println!("Stack commands:");
    println!("  bt [directive]        - Show the current stack (default %+v)");
    println!("  frame <i> [directive] - Show frame i of the current stack");
    println!("  simplify <name>       - Show the short form of a function name");
    println!();
    println!("Directives:");
    println!("  %s  source file       %+s  function and file path");
    println!("  %d  line number       %n   short function name");
    println!("  %v  file:line         %+v  function, path and line");
    println!("  %#v debug list (traces only)");
    println!();
    println!("Examples:");
    println!("  bt %v");
    println!("  frame 0 %+s");
    println!("  simplify github.com/pkg/errors.(*fundamental).Format");
}
