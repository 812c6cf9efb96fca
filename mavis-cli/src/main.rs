use std::collections::HashSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use mavis_catalog::Builder;

#[derive(Parser)]
#[command(name = "mavis", about = "Decode opcodes against a declarative JSON instruction catalog")]
struct Cli {
    /// ISA catalog JSON file; repeat for multiple files, processed in order
    #[arg(long = "isa", required = true)]
    isa: Vec<PathBuf>,

    /// Annotation (uArchInfo) catalog JSON file; repeat for multiple files
    #[arg(long = "annotation")]
    annotation: Vec<PathBuf>,

    /// Keep only entries carrying at least one of these tags
    #[arg(long = "include")]
    include: Vec<String>,

    /// Drop entries carrying any of these tags
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    /// Override the default 1023-slot direct-mapped cache size
    #[arg(long = "cache-size")]
    cache_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode one or more hex opcodes
    Decode {
        /// Opcodes as hex strings, e.g. 0x9002
        opcodes: Vec<String>,
    },
    /// Print summary information about the built catalog
    Info,
    /// Build an instruction straight from a mnemonic, bypassing opcode
    /// decode entirely (for pseudo-instructions or pre-decoded operands)
    Direct {
        /// Mnemonic to resolve (a pseudo-instruction or any registered one)
        mnemonic: String,
        /// Resolve by numeric UID instead of mnemonic name
        #[arg(long)]
        uid: Option<u32>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let mut builder = Builder::new();
    if let Some(size) = cli.cache_size {
        builder = builder.with_cache_size(size);
    }
    let inclusions: HashSet<String> = cli.include.into_iter().collect();
    let exclusions: HashSet<String> = cli.exclude.into_iter().collect();

    let mut catalog = match builder.configure(&cli.isa, &cli.annotation, &inclusions, &exclusions) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Decode { opcodes } => {
            for opcode_str in opcodes {
                decode_and_print(&mut catalog, &opcode_str);
            }
        }
        Commands::Info => {
            println!("{} mnemonics registered", catalog.leaf_count());
        }
        Commands::Direct { mnemonic, uid } => {
            let mut direct = mavis_catalog::DirectInfo::new(mnemonic, mavis_core::OperandInfo::default());
            if let Some(uid) = uid {
                direct = direct.with_uid(uid);
            }
            match catalog.make_inst_directly(&direct) {
                Ok(inst) => println!("{} (uid={})", inst.mnemonic, inst.uid),
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

fn decode_and_print(catalog: &mut mavis_catalog::Catalog, opcode_str: &str) {
    let Some(opcode) = parse_opcode(opcode_str) else {
        eprintln!("invalid opcode: {opcode_str}");
        return;
    };
    match catalog.make_inst(opcode) {
        Ok(inst) => println!("{opcode:#010x}: {}", inst.mnemonic),
        Err(e) => eprintln!("{opcode:#010x}: {e}"),
    }
}

fn parse_opcode(s: &str) -> Option<u64> {
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u64::from_str_radix(s, 16).ok()
}
