//! dxrip - extract and disassemble DXBC shader blobs from dumped Unity shader objects

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use dxrip::container::{DEFAULT_MAX_SIZE, DEFAULT_MIN_SIZE};
use dxrip::{
    extract_blobs, write_blobs, Disassembler, DumpReader, ScanLimits, ShaderSource,
};

#[derive(Parser, Debug)]
#[command(name = "dxrip")]
#[command(about = "Extract DXBC shader blobs and disassemble them via DXDecompiler")]
struct Args {
    /// Dump directory containing <object>.blob / <object>.json pairs
    #[arg(default_value = "shader_dump")]
    dump: PathBuf,

    /// Shader object to extract (defaults to the first object in the dump)
    #[arg(long)]
    object: Option<String>,

    /// Output directory for .dxbc and .asm artifacts
    #[arg(short, long, default_value = "extracted_shaders")]
    output: PathBuf,

    /// Smallest declared container size the scanner accepts
    #[arg(long, default_value_t = DEFAULT_MIN_SIZE)]
    min_blob_size: usize,

    /// Largest declared container size the scanner accepts
    #[arg(long, default_value_t = DEFAULT_MAX_SIZE)]
    max_blob_size: usize,

    /// Directory where DXDecompiler is looked up or cloned
    #[arg(long, default_value = "tools")]
    tools_dir: PathBuf,

    /// Write .dxbc files only, skip disassembly
    #[arg(long)]
    no_disassemble: bool,

    /// Per-invocation disassembler timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let object = match args.object {
        Some(name) => name,
        None => DumpReader::discover(&args.dump)
            .with_context(|| format!("Failed to read dump directory {}", args.dump.display()))?
            .into_iter()
            .next()
            .with_context(|| format!("No dumped shader objects in {}", args.dump.display()))?,
    };

    println!("Loading {} from {}...", object, args.dump.display());
    let source = DumpReader::open(&args.dump, &object)
        .with_context(|| format!("Failed to open shader object '{}'", object))?;
    let descriptors = source
        .chunk_descriptors()
        .with_context(|| format!("Shader object '{}' is not extractable", object))?;

    let limits = ScanLimits {
        min_size: args.min_blob_size,
        max_size: args.max_blob_size,
    };
    let extraction = extract_blobs(&descriptors, source.compressed_blob(), &limits);

    for failure in &extraction.chunk_failures {
        eprintln!(
            "Chunk {} decompression failed: {}",
            failure.chunk_index, failure.error
        );
    }

    if extraction.blobs.is_empty() {
        eprintln!("No DXBC blobs found in decompressed shader data");
        std::process::exit(1);
    }

    let paths = write_blobs(&args.output, source.object_name(), &extraction.blobs)
        .with_context(|| format!("Failed to write artifacts to {}", args.output.display()))?;
    for (path, blob) in paths.iter().zip(extraction.blobs.iter()) {
        println!(
            "  Saved {} ({} bytes)",
            path.file_name().unwrap_or_default().to_string_lossy(),
            blob.len()
        );
    }
    println!(
        "\nExtracted {} DXBC blob(s) to {}",
        paths.len(),
        args.output.display()
    );

    if args.no_disassemble {
        return Ok(());
    }

    // Disassembly is best effort: the .dxbc artifacts above are already on
    // disk and stay valid even if the tool cannot be obtained or fails.
    let tool = match Disassembler::ensure_available(&args.tools_dir) {
        Ok(tool) => tool.with_timeout(Duration::from_secs(args.timeout_secs)),
        Err(e) => {
            eprintln!("\nDisassembler unavailable: {}", e);
            eprintln!("Extracted .dxbc files were kept; rerun once DXDecompiler builds.");
            return Ok(());
        }
    };

    println!(
        "\nDisassembling with {}...",
        tool.exe().file_name().unwrap_or_default().to_string_lossy()
    );
    let report = tool.disassemble_all(&paths);
    for asm in &report.succeeded {
        println!(
            "  {}",
            asm.file_name().unwrap_or_default().to_string_lossy()
        );
    }
    for (path, error) in &report.failed {
        eprintln!(
            "  {}: failed ({})",
            path.file_name().unwrap_or_default().to_string_lossy(),
            error
        );
    }
    if !report.failed.is_empty() {
        println!("  ({} failed)", report.failed.len());
    }

    println!(
        "\nDone. Assembly (.asm) files in {}",
        args.output.display()
    );
    Ok(())
}
