use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;

/// Model files are the `.sail` sources sitting directly in the model directory.
pub const MODEL_FILE_PATTERN: &str = "*.sail";

lazy_static! {
    static ref CSR_NAME_MAP: Regex = Regex::new(
        r#"csr_name_map =\s+(?P<num>0x[0-9a-fA-F]+)\s+<->\s+(?P<str>".*")\s+"#
    )
    .unwrap();
}

#[derive(Debug)]
pub enum GenerateError {
    /// The model path does not name a directory
    NotADirectory(PathBuf),

    /// Couldn't build the model file pattern
    PatternError(glob::PatternError),

    /// The model directory couldn't be listed
    ListError(PathBuf, io::Error),

    /// A model file couldn't be opened or read
    ReadError(PathBuf, io::Error),
}

impl core::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use GenerateError::*;
        match self {
            NotADirectory(path) => write!(f, "no such model directory: {}", path.display()),
            PatternError(e) => write!(f, "bad model file pattern: {}", e),
            ListError(path, e) => write!(f, "unable to list model files in {}: {}", path.display(), e),
            ReadError(path, e) => write!(f, "unable to read {}: {}", path.display(), e),
        }
    }
}

impl std::error::Error for GenerateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerateError::PatternError(e) => Some(e),
            GenerateError::ListError(_, e) => Some(e),
            GenerateError::ReadError(_, e) => Some(e),
            _ => None,
        }
    }
}

/// One `csr_name_map = <address> <-> "<name>"` clause from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrName {
    /// Hex literal, lowercased. Used as the dedup key.
    pub address: String,
    /// The quoted name exactly as it appears in the model, quotes included.
    pub name: String,
}

/// Match a single model line against the declaration pattern.
///
/// `line` should still carry its line terminator: the pattern wants at least
/// one whitespace character after the closing quote.
pub fn parse_line(line: &str) -> Option<CsrName> {
    let caps = CSR_NAME_MAP.captures(line)?;
    Some(CsrName { address: caps["num"].to_lowercase(), name: caps["str"].to_owned() })
}

/// The address-to-name entries collected so far, in first-seen order.
///
/// The model repeats some clauses, so every address is kept only the first
/// time it shows up and later clauses for it are dropped, whatever their name.
#[derive(Debug, Default)]
pub struct CsrNameMap {
    entries: Vec<CsrName>,
    seen: HashSet<String>,
    duplicates: usize,
}

impl CsrNameMap {
    pub fn new() -> Self { Default::default() }

    /// Returns `false` if the address was already present.
    pub fn insert(&mut self, entry: CsrName) -> bool {
        if self.seen.contains(&entry.address) {
            debug!("dropping duplicate clause {} <-> {}", entry.address, entry.name);
            self.duplicates += 1;
            return false;
        }
        self.seen.insert(entry.address.clone());
        self.entries.push(entry);
        true
    }

    /// Scan `reader` line by line, returning how many new addresses it added.
    pub fn scan<R: BufRead>(&mut self, mut reader: R) -> io::Result<usize> {
        let mut added = 0;
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            if let Some(entry) = parse_line(&line) {
                if self.insert(entry) {
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    pub fn entries(&self) -> &[CsrName] { &self.entries }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Number of clauses dropped because their address was already mapped.
    pub fn duplicates(&self) -> usize { self.duplicates }
}

/// List the model files directly inside `model_dir`, sorted by path.
pub fn model_files(model_dir: &Path) -> Result<Vec<PathBuf>, GenerateError> {
    if !model_dir.is_dir() {
        return Err(GenerateError::NotADirectory(model_dir.to_path_buf()));
    }
    let pattern = Pattern::new(MODEL_FILE_PATTERN).map_err(GenerateError::PatternError)?;
    let options = MatchOptions { case_sensitive: true, require_literal_separator: true, require_literal_leading_dot: true };
    let list_error = |e| GenerateError::ListError(model_dir.to_path_buf(), e);

    let mut files = vec![];
    for entry in fs::read_dir(model_dir).map_err(list_error)? {
        let entry = entry.map_err(list_error)?;
        if !pattern.matches_with(&entry.file_name().to_string_lossy(), options) {
            continue;
        }
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    // directory order is arbitrary, and the winner of a duplicate depends on it
    files.sort();
    Ok(files)
}

/// Collect every clause from the model files in `model_dir`.
pub fn scan_model_dir(model_dir: &Path) -> Result<CsrNameMap, GenerateError> {
    let mut map = CsrNameMap::new();
    let files = model_files(model_dir)?;
    for path in &files {
        let added = File::open(path)
            .and_then(|file| map.scan(BufReader::new(file)))
            .map_err(|e| GenerateError::ReadError(path.clone(), e))?;
        debug!("{}: {} new entries", path.display(), added);
    }
    info!(
        "scanned {} model files: {} entries, {} duplicates dropped",
        files.len(),
        map.len(),
        map.duplicates()
    );
    Ok(map)
}

fn print_case<U: Write>(entry: &CsrName, out: &mut U) -> io::Result<()> {
    writeln!(out, "case {}:", entry.address)?;
    writeln!(out, "    SStream_concat(ss, {});", entry.name)?;
    writeln!(out, "    return;")?;
    writeln!(out)
}

fn print_default<U: Write>(out: &mut U) -> io::Result<()> {
    writeln!(out, "default:")?;
    writeln!(out, "    hex_bits_12(csr, ss, ctx);")?;
    writeln!(out, "    return;")
}

/// Emit the body of the `csr_name_map()` switch: one case per entry, then
/// the fallback that prints the raw 12-bit CSR number.
pub fn generate<U: Write>(map: &CsrNameMap, out: &mut U) -> io::Result<()> {
    for entry in map.entries() {
        print_case(entry, out)?;
    }
    print_default(out)
}
