//! vtframe Headless Runner
//!
//! Feeds a byte stream (stdin or a file) through the terminal engine and
//! prints the resulting screen as text, as a JSON snapshot, or as the frame
//! the differential renderer would send to a real terminal.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use vtframe::{Config, Display, Snapshot, Terminal};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut cols: Option<usize> = None;
    let mut rows: Option<usize> = None;
    let mut chunk: Option<usize> = None;
    let mut input_file: Option<String> = None;
    let mut config_file: Option<PathBuf> = None;
    let mut output_format = OutputFormat::Text;
    let mut show_help = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--cols" => {
                i += 1;
                cols = args.get(i).and_then(|v| v.parse().ok());
            },
            "-r" | "--rows" => {
                i += 1;
                rows = args.get(i).and_then(|v| v.parse().ok());
            },
            "-f" | "--file" => {
                i += 1;
                input_file = args.get(i).cloned();
            },
            "--chunk" => {
                i += 1;
                chunk = args.get(i).and_then(|v| v.parse().ok()).filter(|&n| n > 0);
            },
            "--config" => {
                i += 1;
                config_file = args.get(i).map(PathBuf::from);
            },
            "-j" | "--json" => output_format = OutputFormat::Json,
            "-t" | "--text" => output_format = OutputFormat::Text,
            "-d" | "--diff" => output_format = OutputFormat::Diff,
            "-h" | "--help" => show_help = true,
            _ => {
                // Treat as input file if no flag
                if input_file.is_none() && !args[i].starts_with('-') {
                    input_file = Some(args[i].clone());
                }
            },
        }
        i += 1;
    }

    if show_help {
        print_help();
        return ExitCode::SUCCESS;
    }

    let mut config = match &config_file {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            },
        },
        None => Config::load_or_default(),
    };
    config.cols = cols.unwrap_or(config.cols).max(1);
    config.rows = rows.unwrap_or(config.rows).max(1);

    let input_data = match &input_file {
        Some(path) => match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path, e);
                return ExitCode::FAILURE;
            },
        },
        None => {
            let mut data = Vec::new();
            if let Err(e) = io::stdin().read_to_end(&mut data) {
                eprintln!("Error reading stdin: {}", e);
                return ExitCode::FAILURE;
            }
            data
        },
    };

    let mut terminal = Terminal::with_config(&config);
    let blank = terminal.framebuffer().clone();
    let mut replies = Vec::new();
    for piece in input_data.chunks(chunk.unwrap_or(input_data.len().max(1))) {
        replies.extend(terminal.act(piece));
    }
    if !replies.is_empty() {
        tracing::info!(bytes = replies.len(), "discarding replies to host");
    }

    match output_format {
        OutputFormat::Text => {
            let fb = terminal.framebuffer();
            println!("Terminal State ({}x{}):", fb.cols(), fb.rows());
            println!("Cursor: ({}, {})", fb.cursor().row, fb.cursor().col);
            if !fb.title().is_empty() {
                println!("Title: {}", fb.title());
            }
            println!("---");
            println!("{}", fb.text());
            println!("---");
        },
        OutputFormat::Json => match terminal.snapshot().to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing snapshot: {}", e);
                return ExitCode::FAILURE;
            },
        },
        OutputFormat::Diff => {
            let frame = Display::new().new_frame(true, &blank, terminal.framebuffer());
            let mut stdout = io::stdout().lock();
            if let Err(e) = stdout.write_all(&frame).and_then(|_| stdout.flush()) {
                eprintln!("Error writing frame: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    tracing::debug!(
        text = %Snapshot::from_framebuffer(terminal.framebuffer()).to_text(),
        "final screen"
    );
    ExitCode::SUCCESS
}

#[derive(Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
    Diff,
}

fn print_help() {
    println!("vtframe Headless Runner");
    println!();
    println!("Usage: vtframe-headless [OPTIONS] [INPUT_FILE]");
    println!();
    println!("Options:");
    println!("  -c, --cols <N>       Set terminal width (default: from config, 80)");
    println!("  -r, --rows <N>       Set terminal height (default: from config, 24)");
    println!("  -f, --file <PATH>    Read input from file");
    println!("      --chunk <N>      Feed the input in chunks of N bytes");
    println!("      --config <PATH>  Load configuration from a JSON file");
    println!("  -j, --json           Output snapshot as JSON");
    println!("  -t, --text           Output screen as text (default)");
    println!("  -d, --diff           Output the frame that draws the screen on a blank terminal");
    println!("  -h, --help           Show this help message");
    println!();
    println!("If no input file is specified, reads from stdin.");
    println!();
    println!("Examples:");
    println!("  printf 'Hello\\033[31mWorld\\033[0m' | vtframe-headless");
    println!("  vtframe-headless -c 120 -r 40 input.txt");
    println!("  vtframe-headless --json < test.bin > snapshot.json");
}
