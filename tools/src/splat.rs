use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use tempfile::NamedTempFile;

/// Line after which the source file gets spliced in.
pub const SPLAT_MARKER: &str = "//> RISCV instruction";
/// Line closing the region that the spliced text replaces.
pub const END_SPLAT_MARKER: &str = "};";

#[derive(Debug)]
pub enum SplatError {
    /// Couldn't read the destination file
    ReadDestination(PathBuf, io::Error),

    /// Couldn't read the source file
    ReadSource(PathBuf, io::Error),

    /// Couldn't write the new contents over the destination file
    WriteDestination(PathBuf, io::Error),
}

impl core::fmt::Display for SplatError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use SplatError::*;
        match self {
            ReadDestination(path, e) => write!(f, "unable to read destination {}: {}", path.display(), e),
            ReadSource(path, e) => write!(f, "unable to read source {}: {}", path.display(), e),
            WriteDestination(path, e) => write!(f, "unable to write destination {}: {}", path.display(), e),
        }
    }
}

impl std::error::Error for SplatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use SplatError::*;
        match self {
            ReadDestination(_, e) | ReadSource(_, e) | WriteDestination(_, e) => Some(e),
        }
    }
}

/// The new destination contents along with how many markers were found.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Splat {
    pub content: String,
    pub matches: usize,
}

/// Markers match on the whole line, ignoring case and surrounding whitespace.
pub fn is_marker(line: &str, marker: &str) -> bool { line.trim().to_lowercase() == marker.to_lowercase() }

/// Copy `dst` through, splicing the source text in after every splat marker.
///
/// Destination lines following a marker are dropped up to and including the
/// next end marker, or to the end of the input if there is none. The source
/// is only loaded when the first marker turns up, and reused after that.
pub fn splat<F, E>(dst: &str, mut load_source: F) -> Result<Splat, E>
where
    F: FnMut() -> Result<String, E>,
{
    let mut result = Splat::default();
    let mut source: Option<String> = None;
    let mut skipping = false;

    for (index, line) in dst.split_inclusive('\n').enumerate() {
        if skipping {
            if is_marker(line, END_SPLAT_MARKER) {
                debug!("end marker on line {}", index + 1);
                skipping = false;
            }
            continue;
        }

        result.content.push_str(line);
        if is_marker(line, SPLAT_MARKER) {
            debug!("splat marker on line {}", index + 1);
            result.matches += 1;
            if source.is_none() {
                source = Some(load_source()?);
            }
            if let Some(text) = &source {
                result.content.push_str(text);
            }
            skipping = true;
        }
    }

    if skipping {
        debug!("no end marker after the last splat marker, dropped the rest of the file");
    }
    Ok(result)
}

/// Replace `dst` with `content`.
///
/// The text goes to a temporary file next to `dst`, which then takes the
/// place of `dst`, so a failed write leaves the old file intact. Symlinks are
/// followed: the file they point at gets replaced, the link stays.
pub fn write_in_place(dst: &Path, content: &str) -> io::Result<()> {
    let dst = fs::canonicalize(dst)?;
    let dir = match dst.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(&dst)?.permissions();

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.as_file().set_permissions(permissions)?;
    tmp.persist(&dst)?;
    Ok(())
}

/// Splice `src` into `dst` and rewrite `dst`, whether or not anything matched.
pub fn splat_file(src: &Path, dst: &Path) -> Result<Splat, SplatError> {
    let original = fs::read_to_string(dst).map_err(|e| SplatError::ReadDestination(dst.to_path_buf(), e))?;
    let result =
        splat(&original, || fs::read_to_string(src).map_err(|e| SplatError::ReadSource(src.to_path_buf(), e)))?;

    write_in_place(dst, &result.content).map_err(|e| SplatError::WriteDestination(dst.to_path_buf(), e))?;
    info!("spliced {} into {} at {} marker(s)", src.display(), dst.display(), result.matches);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splat_str(dst: &str, src: &str) -> Splat {
        splat(dst, || Ok::<_, io::Error>(src.to_owned())).unwrap()
    }

    #[test]
    fn marker_matching() {
        assert!(is_marker("//> RISCV instruction\n", SPLAT_MARKER));
        assert!(is_marker("   //> riscv INSTRUCTION \t\r\n", SPLAT_MARKER));
        assert!(!is_marker("//> RISCV instruction here\n", SPLAT_MARKER));
        assert!(!is_marker("// > RISCV instruction\n", SPLAT_MARKER));
        assert!(is_marker("  };\n", END_SPLAT_MARKER));
        assert!(!is_marker("  } ;\n", END_SPLAT_MARKER));
    }

    #[test]
    fn keeps_marker_drops_region() {
        let result = splat_str("A\n//> RISCV instruction\nB\n};\nC\n", "X\n");
        assert_eq!(result.content, "A\n//> RISCV instruction\nX\nC\n");
        assert_eq!(result.matches, 1);
    }

    #[test]
    fn no_marker_is_identity() {
        let dst = "static const insn_desc insns[] = {\n  { 1, 2 },\n};\n";
        let result = splat(dst, || -> io::Result<String> { panic!("source loaded without a marker") }).unwrap();
        assert_eq!(result.content, dst);
        assert_eq!(result.matches, 0);
    }

    #[test]
    fn every_marker_gets_a_copy() {
        let dst = "//> RISCV instruction\nold\n};\nmid\n  //> riscv instruction  \nold\n};\nend";
        let mut loads = 0;
        let result = splat(dst, || {
            loads += 1;
            Ok::<_, io::Error>("X\nY\n".to_owned())
        })
        .unwrap();
        assert_eq!(result.content, "//> RISCV instruction\nX\nY\nmid\n  //> riscv instruction  \nX\nY\nend");
        assert_eq!(result.matches, 2);
        assert_eq!(loads, 1);
    }

    #[test]
    fn unterminated_region_drops_the_tail() {
        let result = splat_str("A\n//> RISCV instruction\nB\nC\n", "X\n");
        assert_eq!(result.content, "A\n//> RISCV instruction\nX\n");
    }

    #[test]
    fn marker_inside_region_is_not_counted() {
        let result = splat_str("//> RISCV instruction\n//> RISCV instruction\n};\nC\n", "X\n");
        assert_eq!(result.content, "//> RISCV instruction\nX\nC\n");
        assert_eq!(result.matches, 1);
    }

    #[test]
    fn source_without_trailing_newline() {
        let result = splat_str("//> RISCV instruction\n};\nC\n", "X");
        assert_eq!(result.content, "//> RISCV instruction\nXC\n");
    }

    #[test]
    fn crlf_is_preserved() {
        let result = splat_str("A\r\n//> RISCV instruction\r\nB\r\n};\r\nC\r\n", "X\r\n");
        assert_eq!(result.content, "A\r\n//> RISCV instruction\r\nX\r\nC\r\n");
    }

    #[test]
    fn source_error_propagates() {
        let result = splat("//> RISCV instruction\n", || Err::<String, _>("no source"));
        assert_eq!(result, Err("no source"));
    }

    #[test]
    fn rewrites_destination() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("insn.inc");
        let dst = dir.path().join("table.c");
        fs::write(&src, "X\n").unwrap();
        fs::write(&dst, "A\n//> RISCV instruction\nB\n};\nC\n").unwrap();

        let result = splat_file(&src, &dst).unwrap();
        assert_eq!(result.matches, 1);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "A\n//> RISCV instruction\nX\nC\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn rewrites_through_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("insn.inc");
        let real = dir.path().join("real.c");
        let link = dir.path().join("link.c");
        fs::write(&src, "X\n").unwrap();
        fs::write(&real, "//> RISCV instruction\nB\n};\n").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(splat_file(&src, &link).unwrap().matches, 1);
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), real);
        assert_eq!(fs::read_to_string(&real).unwrap(), "//> RISCV instruction\nX\n");
    }

    #[test]
    fn missing_source_only_matters_with_a_marker() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("missing.inc");
        let dst = dir.path().join("table.c");

        fs::write(&dst, "A\n").unwrap();
        assert_eq!(splat_file(&src, &dst).unwrap().matches, 0);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "A\n");

        fs::write(&dst, "//> RISCV instruction\n};\n").unwrap();
        match splat_file(&src, &dst) {
            Err(SplatError::ReadSource(path, _)) => assert_eq!(path, src),
            other => panic!("expected ReadSource, got {:?}", other),
        }
        assert_eq!(fs::read_to_string(&dst).unwrap(), "//> RISCV instruction\n};\n");
    }

    #[test]
    fn missing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("insn.inc");
        fs::write(&src, "X\n").unwrap();
        assert!(matches!(splat_file(&src, &dir.path().join("nope.c")), Err(SplatError::ReadDestination(..))));
    }
}
