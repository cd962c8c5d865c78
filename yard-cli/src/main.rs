use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use wasmi::{Caller, Engine, Linker, Module, Store};
use yard_core::{CompilationArtifact, CompileOptions, Compiler};

/// コマンドライン引数
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, help = "Source file (reads stdin when omitted)")]
    input: Option<String>,

    #[arg(short, long)]
    output: String,

    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "wasm",
        help = "Output format: wasm, html"
    )]
    emit: String,

    #[arg(
        long,
        value_name = "NAME",
        default_value = "Main",
        help = "Function the host calls after instantiation"
    )]
    entry: String,

    #[arg(long, help = "Run the entry function after compiling")]
    run: bool,
}

fn main() -> Result<()> {
    env_logger::builder().format_timestamp(None).init();

    let cli = Cli::parse();
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {path}"))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read source from stdin")?;
            buffer
        }
    };

    let compiler = Compiler::new(CompileOptions { entry: cli.entry });

    match cli.emit.as_str() {
        "wasm" => {
            let artifact = compiler
                .compile(&source)
                .context("failed to compile source")?;
            write_output(&cli.output, &artifact.wasm)?;
            info!("wrote {} bytes to {}", artifact.wasm.len(), cli.output);
            if cli.run {
                run_wasm(&artifact, &compiler.options().entry)?;
            }
        }
        "html" => {
            let page = compiler
                .compile_html(&source)
                .context("failed to compile source")?;
            write_output(&cli.output, page.as_bytes())?;
            info!("wrote page to {}", cli.output);
            if cli.run {
                eprintln!("--run is ignored for html output");
            }
        }
        other => return Err(anyhow::anyhow!("unsupported emit format: {other}")),
    }

    Ok(())
}

fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = PathBuf::from(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {path}"))?;
    Ok(())
}

/// Runs `entry` with `env.Print` printing each value on its own line.
fn run_wasm(artifact: &CompilationArtifact, entry: &str) -> Result<()> {
    let engine = Engine::default();
    let module = Module::new(&engine, &artifact.wasm).context("failed to compile wasm artifact")?;
    let mut linker = Linker::new(&engine);
    linker
        .func_wrap("env", "Print", |_caller: Caller<'_, ()>, value: f32| {
            println!("{value}");
        })
        .context("failed to link env.Print")?;
    let mut store = Store::new(&engine, ());
    let instance = linker
        .instantiate_and_start(&mut store, &module)
        .context("failed to instantiate module")?;
    let function = instance
        .get_typed_func::<(), ()>(&store, entry)
        .with_context(|| format!("exported {entry} function missing or has wrong type"))?;
    debug!("calling {entry}");
    function
        .call(&mut store, ())
        .with_context(|| format!("failed to execute {entry}"))?;
    Ok(())
}
