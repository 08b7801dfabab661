//! Argument handling shared by the `riscv_gen_csr_name_map` and `riscv_splat`
//! binaries. Both tools accept exactly one argument shape and answer anything
//! else with their usage text and exit status 1.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{App, AppSettings, Arg};

pub const GEN_CSR_NAME_MAP_USAGE: &str = "Usage: riscv_gen_csr_name_map <path-to-model-directory>";

pub const SPLAT_USAGE: &str = "Usage: riscv_splat <src-file> --into <dst-file>
(OR
    riscv_splat --into <dst-file> <src-file>
)";

#[derive(Debug, PartialEq, Eq)]
pub enum UsageError {
    /// Wrong number of arguments, not counting the program name
    ArgumentCount { expected: usize, found: usize },

    /// The right number of arguments, but not in a shape the tool accepts
    Malformed(String),
}

impl core::fmt::Display for UsageError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            UsageError::ArgumentCount { expected, found } => {
                write!(f, "expected {} arguments, got {}", expected, found)
            }
            UsageError::Malformed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for UsageError {}

fn collect_args<I, T>(args: I, expected: usize) -> Result<Vec<OsString>, UsageError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let found = args.len().saturating_sub(1);
    if found != expected {
        return Err(UsageError::ArgumentCount { expected, found });
    }
    Ok(args)
}

fn gen_csr_name_map_app<'a, 'b>() -> App<'a, 'b> {
    App::new("riscv_gen_csr_name_map")
        .version(clap::crate_version!())
        .about("Generate the csr_name_map() switch cases from the Sail model")
        .setting(AppSettings::AllowLeadingHyphen)
        .arg(
            Arg::with_name("model")
                .value_name("MODEL_DIR")
                .required(true)
                .index(1)
                .help("Directory holding the model's .sail files"),
        )
}

fn splat_app<'a, 'b>() -> App<'a, 'b> {
    App::new("riscv_splat")
        .version(clap::crate_version!())
        .about("Splice a file into another one after its instruction marker")
        .setting(AppSettings::AllowLeadingHyphen)
        .arg(
            Arg::with_name("src")
                .value_name("SRC_FILE")
                .required(true)
                .index(1)
                .help("File whose contents get spliced in"),
        )
        .arg(
            Arg::with_name("into")
                .long("into")
                .value_name("DST_FILE")
                .takes_value(true)
                .required(true)
                .help("File to splice into, rewritten in place"),
        )
}

#[derive(Debug, PartialEq, Eq)]
pub struct GenCsrNameMapArgs {
    pub model_dir: PathBuf,
}

impl GenCsrNameMapArgs {
    /// Parse a full argument list, program name included.
    pub fn parse<I, T>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args = collect_args(args, 1)?;
        let matches =
            gen_csr_name_map_app().get_matches_from_safe(args).map_err(|e| UsageError::Malformed(e.message))?;
        let model_dir = matches
            .value_of_os("model")
            .ok_or_else(|| UsageError::Malformed("missing model directory".to_owned()))?;
        Ok(GenCsrNameMapArgs { model_dir: PathBuf::from(model_dir) })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct SplatArgs {
    pub src: PathBuf,
    pub dst: PathBuf,
}

impl SplatArgs {
    /// Parse a full argument list, program name included. The destination
    /// always follows `--into`; the source may come before or after the pair.
    pub fn parse<I, T>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args = collect_args(args, 3)?;
        let matches = splat_app().get_matches_from_safe(args).map_err(|e| UsageError::Malformed(e.message))?;
        let src = matches
            .value_of_os("src")
            .ok_or_else(|| UsageError::Malformed("missing source file".to_owned()))?;
        let dst = matches
            .value_of_os("into")
            .ok_or_else(|| UsageError::Malformed("missing destination file".to_owned()))?;
        Ok(SplatArgs { src: PathBuf::from(src), dst: PathBuf::from(dst) })
    }
}
