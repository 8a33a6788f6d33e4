//! vtframe Action Dump
//!
//! Prints the actions the parser produces for a byte stream, one per line,
//! either as a short readable form or as JSON lines.

use std::io::{self, Read, Write};
use std::process::ExitCode;

use vtframe::parser::{Action, Parser, DEFAULT_MAX_OSC_LEN};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut json = false;
    let mut input_file: Option<String> = None;
    let mut max_osc_len = DEFAULT_MAX_OSC_LEN;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-j" | "--json" => json = true,
            "--max-osc" => {
                i += 1;
                max_osc_len = args
                    .get(i)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_MAX_OSC_LEN);
            },
            "-h" | "--help" => {
                println!("Usage: vtframe-parse [--json] [--max-osc <N>] [INPUT_FILE]");
                return ExitCode::SUCCESS;
            },
            arg if !arg.starts_with('-') => input_file = Some(arg.to_string()),
            arg => {
                eprintln!("Unknown option: {}", arg);
                return ExitCode::FAILURE;
            },
        }
        i += 1;
    }

    let data = match &input_file {
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

    let mut parser = Parser::with_max_osc_len(max_osc_len);
    let mut stdout = io::stdout().lock();
    let mut result = Ok(());
    parser.parse_with(&data, |action| {
        if result.is_err() {
            return;
        }
        result = if json {
            match serde_json::to_string(&action) {
                Ok(line) => writeln!(stdout, "{}", line),
                Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
            }
        } else {
            writeln!(stdout, "{}", describe(&action))
        };
    });

    match result.and_then(|_| stdout.flush()) {
        Ok(()) => ExitCode::SUCCESS,
        // A closed pipe (e.g. `| head`) is not an error worth reporting
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error writing output: {}", e);
            ExitCode::FAILURE
        },
    }
}

fn describe(action: &Action) -> String {
    match action {
        Action::Print(c) => format!("{} {:?}", action.name(), c),
        Action::Execute(b) => format!("{} 0x{:02x}", action.name(), b),
        Action::CsiDispatch(csi) => {
            let mut s = format!("{} ", action.name());
            if let Some(marker) = csi.marker {
                s.push(marker as char);
            }
            let params: Vec<String> = csi.params.iter().map(u16::to_string).collect();
            s.push_str(&params.join(";"));
            s.extend(csi.intermediates.iter().map(|&b| b as char));
            s.push(csi.final_byte as char);
            s
        },
        Action::OscDispatch(osc) => format!("{} {:?}", action.name(), osc.payload),
        Action::EscDispatch(esc) => {
            let mut s = format!("{} ", action.name());
            s.extend(esc.intermediates.iter().map(|&b| b as char));
            s.push(esc.final_byte as char);
            s
        },
        Action::Resize { cols, rows } => format!("{} {}x{}", action.name(), cols, rows),
        Action::UserByte(b) => format!("{} 0x{:02x}", action.name(), b),
        Action::Ignore => action.name().to_string(),
    }
}
