//! Purpose: `gfq` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs load/query, prints results.
//! Invariants: Query output is tab-separated records on stdout, nothing else.
//! Invariants: Diagnostics are one line on stderr naming the failing stage.
//! Invariants: Process exit code is derived from `core::error::to_exit_code`.
//! Invariants: Store capability init runs exactly once, before any open.
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::aot::Shell;
use tracing_subscriber::EnvFilter;

use gfq::core::error::{Error, ErrorKind, to_exit_code};
use gfq::core::{loader, query, store};

fn main() {
    init_logging();
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("gfq: {err}");
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    // Store extension capabilities initialize once per process, before any
    // store is opened. Failure here is fatal.
    store::init()?;

    match cli.command {
        Command::Load { input, store } => {
            let count = loader::load(&input, &store)?;
            println!("Loaded {count} GFF records");
            Ok(())
        }
        Command::Query { store, range } => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            query::query_features(&store, &range, |record| {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    record.sequence, record.begin, record.end, record.payload
                )
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to write record to stdout")
                        .with_source(err)
                })
            })?;
            Ok(())
        }
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "gfq", &mut io::stdout());
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(
    name = "gfq",
    version,
    about = "Indexed genomic feature stores: bulk-load GFF lines, query ranges",
    long_about = None,
    before_help = r#"Two commands share one store file:
  - `load` streams a GFF file into a fresh, range-indexed store (all or nothing)
  - `query` prints every stored record overlapping a genomic range
"#,
    after_help = r#"EXAMPLES
  $ gfq load annotations.gff3 annotations.db
  Loaded 2547 GFF records
  $ gfq query annotations.db chr1:150000-160000
  chr1	149851	160522	ensembl	gene	...

LEARN MORE
  $ gfq <command> --help"#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Load a GFF file into a new store",
        long_about = r#"Load tab-delimited feature records into a new store file.

The whole file loads inside one transaction and the range index is built
before commit: either every record is persisted and indexed, or the store is
left untouched. Blank lines are skipped; a malformed line aborts the load."#,
        after_help = r#"EXAMPLES
  $ gfq load annotations.gff3 annotations.db

NOTES
  - Records need at least four tab-separated fields: sequence, begin, end, payload
  - The store must not already contain a feature relation; use a fresh path to re-load"#
    )]
    Load {
        #[arg(help = "GFF input file", value_hint = ValueHint::FilePath)]
        input: PathBuf,
        #[arg(help = "Store file to create", value_hint = ValueHint::FilePath)]
        store: PathBuf,
    },
    #[command(
        arg_required_else_help = true,
        about = "Print records overlapping a genomic range",
        long_about = r#"Query a loaded store for records overlapping a range.

Each match prints as four tab-separated fields (sequence, begin, end,
payload) in rowid-resolution order; no coordinate sort is promised. Zero
matches is success."#,
        after_help = r#"EXAMPLES
  $ gfq query annotations.db chr1:150000-160000
  $ gfq query annotations.db "chr1:1,500,000-1,600,000"

NOTES
  - Range syntax is SEQ:BEGIN-END; commas in coordinates are allowed
  - Coordinates are closed-interval and compared at face value"#
    )]
    Query {
        #[arg(help = "Store file produced by `gfq load`", value_hint = ValueHint::FilePath)]
        store: PathBuf,
        #[arg(help = "Range expression, e.g. chr1:1000-2000")]
        range: String,
    },
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        after_help = r#"EXAMPLES
  $ gfq completion bash > ~/.local/share/bash-completion/completions/gfq
  $ gfq completion zsh > ~/.zfunc/_gfq"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}
