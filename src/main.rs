use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use mavdialect::{
    compile, CompileError, CompileOptions, MergePolicy, XmlSource, MAX_MESSAGE_SIZE,
};

/// Compile MAVLink dialect XML files and print the resulting codec table.
#[derive(Parser)]
struct Cli {
    /// Dialect definition files; every `<include>` target must be listed too.
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Collect `<description>` text while compiling.
    #[arg(long)]
    descriptions: bool,
    /// Let later files override colliding enum entries and messages.
    #[arg(long)]
    allow_override: bool,
}

fn run(args: &Cli) -> Result<(), CompileError> {
    let mut sources = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let xml = fs::read_to_string(path).map_err(|err| CompileError::ReadSource {
            err,
            path: path.clone(),
        })?;
        sources.push(XmlSource {
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            xml,
        });
    }

    let options = CompileOptions {
        descriptions: args.descriptions,
        merge: if args.allow_override {
            MergePolicy::Override
        } else {
            MergePolicy::Strict
        },
    };
    let table = compile(&sources, &options)?;

    println!(
        "{} messages, {} enum groups from {} source(s)",
        table.messages_by_id.len(),
        table.enums.groups.len(),
        table.sources.len(),
    );
    for message in table.messages_by_id.values() {
        println!(
            "{:>6}  {:<40} payload {:>3}B  extended {:>3}B  crc 0x{:02x}",
            message.id,
            message.name,
            message.payload_size,
            message.extension_payload_size,
            message.crc_extra,
        );
        if message.extension_payload_size > MAX_MESSAGE_SIZE {
            eprintln!(
                "warning: {} exceeds the {MAX_MESSAGE_SIZE}-byte payload ceiling",
                message.name,
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Cli::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
