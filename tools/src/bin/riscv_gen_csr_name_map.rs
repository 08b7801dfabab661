use std::env;
use std::io::{self, Write};
use std::process;

use anyhow::Context;
use riscv_tools::cli::{GenCsrNameMapArgs, GEN_CSR_NAME_MAP_USAGE};
use riscv_tools::csr_name_map;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = GenCsrNameMapArgs::parse(env::args_os()).unwrap_or_else(|e| {
        log::debug!("bad arguments: {}", e);
        println!("{}", GEN_CSR_NAME_MAP_USAGE);
        process::exit(1);
    });

    let map = csr_name_map::scan_model_dir(&args.model_dir)
        .with_context(|| format!("couldn't scan model directory {}", args.model_dir.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    csr_name_map::generate(&map, &mut out).context("couldn't write generated cases")?;
    out.flush()?;
    Ok(())
}
