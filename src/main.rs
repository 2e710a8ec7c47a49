// emc: compiler driver for the Em language.
//
// Runs the front end (lex → parse → emit) per input file and writes the
// resulting LLIR module as textual IR. Native object/assembly output is the
// job of the external LLIR backend; requesting it here reports as much.

use anyhow::{bail, Context};
use emc::driver::{self, CompileOptions};
use std::env;
use std::path::Path;
use std::process;
use std::time::Instant;

const LANGUAGE_FILE_EXTENSION: &str = "em";

/// Known CPU names and their target triples, recorded in the emitted module
/// for the backend.
const CPU_TARGETS: &[(&str, &str)] = &[
    // Windows/Linux x86 systems
    ("x86-64", "x86_64-unknown-linux-gnu"),
    // Embedded / microcontrollers (ARM 32-bit)
    ("cortex-m3", "armv7m-none-eabi"),
    ("cortex-m4", "armv7em-none-eabi"),
    ("cortex-m7", "armv7em-none-eabi"),
    // Raspberry Pi / ARM 64-bit
    ("cortex-a7", "armv7a-unknown-linux-gnueabihf"),
    ("cortex-a53", "aarch64-unknown-linux-gnu"),
    ("cortex-a72", "aarch64-unknown-linux-gnu"),
    // Modern phones
    ("cortex-a76", "aarch64-unknown-linux-gnu"),
    ("cortex-a78", "aarch64-unknown-linux-gnu"),
    ("cortex-x1", "aarch64-unknown-linux-gnu"),
    // Apple
    ("apple-m1", "arm64-apple-darwin"),
    ("apple-m2", "arm64-apple-darwin"),
    // Cloud ARM servers
    ("neoverse-n1", "aarch64-unknown-linux-gnu"),
    ("neoverse-v1", "aarch64-unknown-linux-gnu"),
    ("neoverse-n2", "aarch64-unknown-linux-gnu"),
];

fn target_triple_for(cpu: &str) -> Option<&'static str> {
    CPU_TARGETS
        .iter()
        .find(|(name, _)| *name == cpu)
        .map(|(_, triple)| *triple)
}

fn usage(program: &str) {
    eprintln!(
        "Usage: {} FILE... [-pout] [-llout] [-ll] [-asm] [-cpu NAME] [-o NAME] [-benchmark]",
        program
    );
    eprintln!();
    eprintln!("  -pout        dump the AST");
    eprintln!("  -llout       dump the IR to stdout");
    eprintln!("  -ll          write textual IR to FILE.ll (the default)");
    eprintln!("  -asm         emit assembly (requires the native backend)");
    eprintln!("  -cpu NAME    record the target triple for NAME in the module");
    eprintln!("  -o NAME      output file name");
    eprintln!("  -benchmark   report frontend timing");
    eprintln!();
    eprintln!("Example: {} demos/powers.em -llout -benchmark", program);
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("emc");

    if args.len() < 2 {
        eprintln!("ERROR: Provide the path of the file to be compiled.");
        eprintln!();
        usage(program);
        process::exit(1);
    }

    let mut files: Vec<String> = Vec::new();
    let mut options = CompileOptions::default();
    let mut emit_asm = false;
    let mut benchmark = false;
    let mut cpu: Option<String> = None;
    let mut output_name: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-pout" => options.dump_ast = true,
            "-llout" => options.dump_ir = true,
            // Textual IR is the only output this binary produces, so -ll
            // names the default.
            "-ll" => {}
            "-asm" => emit_asm = true,
            "-benchmark" => benchmark = true,
            "-cpu" => {
                i += 1;
                cpu = Some(
                    args.get(i)
                        .context("-cpu requires a CPU name")?
                        .clone(),
                );
            }
            "-o" => {
                i += 1;
                output_name = Some(
                    args.get(i)
                        .context("-o requires an output file name")?
                        .clone(),
                );
            }
            flag if flag.starts_with('-') => bail!("unknown flag: {}", flag),
            file => files.push(file.to_string()),
        }
        i += 1;
    }

    if files.is_empty() {
        bail!("no input files");
    }
    if emit_asm {
        bail!("assembly output requires the native LLIR backend; use -ll or -llout for textual IR");
    }
    if output_name.is_some() && files.len() > 1 {
        bail!("-o cannot be used with more than one input file");
    }

    let triple = match &cpu {
        Some(cpu) => {
            let triple = target_triple_for(cpu);
            if triple.is_none() {
                // Same fallback as an unknown CPU name anywhere else: build
                // for a generic target, just without a recorded triple.
                eprintln!("WARNING: Unknown CPU type '{}'. Using a generic target.", cpu);
            }
            triple
        }
        None => None,
    };

    for file in &files {
        let path = Path::new(file);
        if path.extension().and_then(|e| e.to_str()) != Some(LANGUAGE_FILE_EXTENSION) {
            eprintln!("ERROR: Invalid file type. File must have a .em extension.");
            process::exit(1);
        }

        let frontend_start = Instant::now();
        let unit = match driver::compile_file(path, &options) {
            Ok(unit) => unit,
            Err(error) => {
                eprintln!("{}", error.render());
                process::exit(1);
            }
        };
        let frontend_elapsed = frontend_start.elapsed();

        let mut module = unit.module;
        if let Some(triple) = triple {
            module.target_triple = Some(triple.to_string());
        }

        let ll_file_name = output_name
            .clone()
            .unwrap_or_else(|| format!("{}.ll", file));
        std::fs::write(&ll_file_name, module.to_string())
            .with_context(|| format!("Failed to write IR to {}", ll_file_name))?;

        if benchmark {
            println!("\n         Performance metrics");
            println!("-------------------------------------");
            println!(
                "Frontend time elapsed: \t{:.6} sec",
                frontend_elapsed.as_secs_f64()
            );
            println!("Lines processed: \t{}", unit.total_lines);
        }
    }

    Ok(())
}
