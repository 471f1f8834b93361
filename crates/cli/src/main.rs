//! Command-line front end: batch mode (one SQL file) or an interactive REPL.
//!
//! Carries no parsing or planning logic of its own; every statement is
//! handed verbatim to [`database::Database::execute`].

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use common::pretty::{self, TableStyleKind};
use common::RecordBatch;
use database::{Database, QueryResult};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const DEFAULT_DATA_DIR: &str = "./minidb_data";
const DEFAULT_BUFFER_PAGES: usize = 256;

#[derive(Parser, Debug)]
#[command(name = "minidb", about = "A teaching-grade relational database engine")]
struct Args {
    /// SQL file to run in batch mode. Omit to start an interactive REPL.
    script: Option<PathBuf>,

    /// Directory holding the data file and catalog sidecar.
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Number of pages held resident in the buffer pool.
    #[arg(long, default_value_t = DEFAULT_BUFFER_PAGES)]
    buffer_pages: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut db = Database::new(&args.data_dir, args.buffer_pages)
        .with_context(|| format!("opening database at {}", args.data_dir.display()))?;

    match &args.script {
        Some(path) => run_batch(&mut db, path)?,
        None => run_repl(&mut db)?,
    }

    db.close().context("closing database")?;
    Ok(())
}

fn run_batch(db: &mut Database, path: &PathBuf) -> Result<()> {
    let sql = fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    let result = db.execute(&sql);
    print_result(&result);
    if !result.success {
        anyhow::bail!("{}", result.message);
    }
    Ok(())
}

fn run_repl(db: &mut Database) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("minidb REPL. Type `help` for commands, `exit` or `quit` to leave.");

    let mut pending = String::new();
    loop {
        let prompt = if pending.is_empty() { "minidb> " } else { "    -> " };
        let line = match rl.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => return Err(err.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());

        if pending.is_empty() {
            match trimmed.to_ascii_lowercase().as_str() {
                "exit" | "quit" => break,
                "help" => {
                    print_help();
                    continue;
                }
                "show tables" => {
                    print_tables(db);
                    continue;
                }
                _ => {}
            }
        }

        pending.push_str(&line);
        pending.push('\n');
        if trimmed.ends_with(';') {
            let statement = std::mem::take(&mut pending);
            let result = db.execute(&statement);
            print_result(&result);
        }
    }

    Ok(())
}

fn print_result(result: &QueryResult) {
    if !result.success {
        eprintln!("Error: {}", result.message);
        return;
    }

    if result.columns.is_empty() && result.rows.is_empty() {
        println!("{}", result.message);
        return;
    }

    let batch = RecordBatch {
        columns: result.columns.clone(),
        rows: result.rows.clone(),
    };
    println!("{}", pretty::render_record_batch(&batch, TableStyleKind::Modern));
    println!("{}", result.message);
}

fn print_tables(db: &Database) {
    let tables = db.list_tables();
    if tables.is_empty() {
        println!("<no tables>");
        return;
    }
    let rows: Vec<Vec<String>> = tables.into_iter().map(|name| vec![name]).collect();
    println!("{}", pretty::render_string_table(&["table"], rows, TableStyleKind::Modern));
}

fn print_help() {
    println!("Commands:");
    println!("  help          Show this help");
    println!("  show tables   List tables in the current database");
    println!("  exit, quit    Leave the REPL");
    println!();
    println!("Anything else is sent as SQL to the database. Statements may");
    println!("span multiple lines; the REPL executes once it sees a ';'.");
}
