use std::env;
use std::process;

use anyhow::Context;
use riscv_tools::cli::{SplatArgs, SPLAT_USAGE};
use riscv_tools::splat;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = SplatArgs::parse(env::args_os()).unwrap_or_else(|e| {
        log::debug!("bad arguments: {}", e);
        println!("{}", SPLAT_USAGE);
        process::exit(1);
    });

    let result = splat::splat_file(&args.src, &args.dst)
        .with_context(|| format!("couldn't splat {} into {}", args.src.display(), args.dst.display()))?;

    if result.matches == 0 {
        println!("Error: Splat marker not found in the given destination file, destination file unchanged");
    } else if result.matches > 1 {
        println!("Warning: Splat marker found several times in the given destination file");
        println!("Destination file contains multiple copies of the source file");
    }
    Ok(())
}
