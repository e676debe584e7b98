//! Marker recognition and the single-pass scan that fans a master document
//! out into section files.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::bytes::Regex;
use tracing::{debug, info, warn};

use crate::error::{Result, SplitError};

/// Written at the top of every section file, before the section body.
pub const HEADER: &str = "syntax = 'proto3';\n\nimport \"common.proto\";\n\n";

/// `// # begin(name)`, keyword and punctuation matched case-insensitively.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static MARKER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*//\s*#\s*begin\s*\(\s*(\w+)\s*\)").expect("valid regex")
});

/// Returns the section name if `line` is a begin marker.
///
/// Only the prefix of the line has to match; anything after the closing
/// parenthesis is ignored. The name is returned exactly as written.
///
/// ```
/// use protosplit::parse_marker;
///
/// assert_eq!(parse_marker(b"// # begin(accounts)\n"), Some("accounts"));
/// assert_eq!(parse_marker(b"message Account {}\n"), None);
/// ```
pub fn parse_marker(line: &[u8]) -> Option<&str> {
    let name = MARKER_PATTERN.captures(line)?.get(1)?;
    // \w only matches complete UTF-8 sequences, so this never fails in practice
    std::str::from_utf8(name.as_bytes())
        .ok()
        .filter(|name| !name.is_empty())
}

/// A section file that was written out and closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub path: PathBuf,
    /// Body lines written after the header.
    pub lines: usize,
}

/// Outcome of one split.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SplitReport {
    /// One entry per marker, in input order. A name that occurs twice is
    /// listed twice; only the last occurrence survives on disk.
    pub sections: Vec<Section>,
    /// Lines discarded because no marker had been seen yet.
    pub skipped: usize,
}

/// The output file of the section currently being written.
struct SectionWriter {
    name: String,
    path: PathBuf,
    out: BufWriter<File>,
    lines: usize,
}

impl SectionWriter {
    fn create(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(format!("{name}.proto"));
        let file = File::create(&path).map_err(|e| SplitError::output(&path, e))?;
        let mut out = BufWriter::new(file);
        out.write_all(HEADER.as_bytes())
            .map_err(|e| SplitError::output(&path, e))?;

        Ok(SectionWriter {
            name: name.to_string(),
            path,
            out,
            lines: 0,
        })
    }

    fn append(&mut self, line: &[u8]) -> Result<()> {
        self.out
            .write_all(line)
            .map_err(|e| SplitError::output(&self.path, e))?;
        self.lines += 1;
        Ok(())
    }

    /// Flushes and closes the file.
    fn finish(mut self) -> Result<Section> {
        self.out.flush().map_err(|e| SplitError::output(&self.path, e))?;
        debug!(section = %self.name, lines = self.lines, "closed section");

        Ok(Section {
            name: self.name,
            path: self.path,
            lines: self.lines,
        })
    }
}

/// Splits master documents into `<name>.proto` files inside one directory.
#[derive(Debug, Clone, Default)]
pub struct Splitter {
    out_dir: PathBuf,
}

impl Splitter {
    /// A splitter writing into `out_dir`. [`Splitter::default`] writes into
    /// the current working directory.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Splitter {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Opens `master` and splits it.
    pub fn split_file(&self, master: impl AsRef<Path>) -> Result<SplitReport> {
        let master = master.as_ref();
        info!(path = %master.display(), "splitting master document");

        let file = File::open(master).map_err(|e| SplitError::input(master, e))?;
        let report = self.split_reader(BufReader::new(file), master)?;

        info!(
            sections = report.sections.len(),
            skipped = report.skipped,
            "split complete"
        );
        Ok(report)
    }

    /// Splits an already opened master document. `source` names it in
    /// read errors.
    ///
    /// Lines are copied byte for byte, including their terminators. The scan
    /// stops at the first I/O error; files written up to that point are left
    /// in place.
    pub fn split_reader<R: BufRead>(&self, mut reader: R, source: &Path) -> Result<SplitReport> {
        let mut report = SplitReport::default();
        let mut seen = HashSet::new();
        let mut current: Option<SectionWriter> = None;
        let mut line = Vec::new();

        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| SplitError::input(source, e))?;
            if read == 0 {
                break;
            }

            if let Some(name) = parse_marker(&line) {
                if let Some(previous) = current.take() {
                    report.sections.push(previous.finish()?);
                }
                if !seen.insert(name.to_string()) {
                    warn!(section = %name, "section repeated, earlier content is overwritten");
                }
                let writer = SectionWriter::create(&self.out_dir, name)?;
                info!(section = %name, path = %writer.path.display(), "writing section");
                current = Some(writer);
            } else if let Some(writer) = current.as_mut() {
                writer.append(&line)?;
            } else {
                report.skipped += 1;
                debug!(
                    line = %String::from_utf8_lossy(&line).trim_end(),
                    "skipping line before first marker"
                );
            }
        }

        if let Some(last) = current.take() {
            report.sections.push(last.finish()?);
        }

        Ok(report)
    }
}

/// Splits `master` into section files in the current working directory.
pub fn split(master: impl AsRef<Path>) -> Result<SplitReport> {
    Splitter::default().split_file(master)
}
