//! Entry list ingestion: byte decoding, row parsing and roster fallback.

pub mod decode;
pub mod parse;

use std::path::{Path, PathBuf};

use pitboard_types::{roster::EntryRoster, PitboardError, Result};
use tracing::{info, warn};

pub use decode::{DecodedText, TextEncoding};
pub use parse::{parse_entries, ParsedEntries, RowDiagnostic};

/// Outcome of reading an entry list.
#[derive(Debug, Clone)]
pub struct RosterImport {
    pub roster: EntryRoster,
    pub encoding: Option<TextEncoding>,
    pub diagnostics: Vec<RowDiagnostic>,
    /// `true` when the built-in placeholder roster was installed instead.
    pub fallback: bool,
}

/// Reads an entry list file from disk.
#[derive(Debug, Clone)]
pub struct FileEntrySource {
    path: PathBuf,
}

impl FileEntrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the file, failing when it is missing or yields no
    /// usable rows.
    pub async fn read(&self) -> Result<RosterImport> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|err| {
            source_error(format!("unable to read {}: {err}", self.path.display()))
        })?;
        let import = import_bytes(&bytes);
        if import.fallback {
            return Err(source_error(format!(
                "{} contains no usable entries",
                self.path.display()
            )));
        }
        info!(
            "Loaded {} entrants from {:?} ({})",
            import.roster.len(),
            self.path,
            import
                .encoding
                .map(|enc| enc.to_string())
                .unwrap_or_default()
        );
        Ok(import)
    }

    /// Like [`FileEntrySource::read`] but never fails: any problem installs
    /// the placeholder roster and is logged.
    pub async fn read_or_placeholder(&self) -> RosterImport {
        match self.read().await {
            Ok(import) => import,
            Err(err) => {
                warn!("{err}; using placeholder roster");
                placeholder_import()
            }
        }
    }
}

/// Decodes and parses raw entry-list bytes.
pub fn import_bytes(bytes: &[u8]) -> RosterImport {
    let decoded = decode::decode(bytes);
    if decoded.replacements > 0 {
        warn!(
            "Entry list decoded as {} with {} unreadable characters",
            decoded.encoding, decoded.replacements
        );
    }

    let parsed = parse_entries(&decoded.text);
    for diagnostic in &parsed.diagnostics {
        warn!(
            "Skipping entry list line {}: {}",
            diagnostic.line, diagnostic.reason
        );
    }

    let fallback = parsed.entrants.is_empty();
    let mut roster = EntryRoster::empty();
    roster.load(parsed.entrants);
    RosterImport {
        roster,
        encoding: Some(decoded.encoding),
        diagnostics: parsed.diagnostics,
        fallback,
    }
}

pub fn placeholder_import() -> RosterImport {
    RosterImport {
        roster: EntryRoster::placeholder(),
        encoding: None,
        diagnostics: Vec::new(),
        fallback: true,
    }
}

pub fn source_error(message: impl Into<String>) -> PitboardError {
    PitboardError::SourceUnavailable(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn import_bytes_builds_roster() {
        let import = import_bytes("No,Name,Robot\n1,Alpha,Rover\n2,Beta,Bolt\n".as_bytes());
        assert!(!import.fallback);
        assert_eq!(import.roster.len(), 2);
        assert_eq!(import.roster.current().number, "#001");
        assert_eq!(import.encoding, Some(TextEncoding::Utf8));
    }

    #[test]
    fn header_only_file_falls_back() {
        let import = import_bytes(b"No,Name\n");
        assert!(import.fallback);
        assert_eq!(import.roster.len(), EntryRoster::PLACEHOLDER_COUNT);
    }

    #[tokio::test]
    async fn missing_file_uses_placeholder() {
        let dir = tempfile::tempdir().expect("temp dir");
        let source = FileEntrySource::new(dir.path().join("entry_lists.csv"));
        assert!(matches!(
            source.read().await,
            Err(PitboardError::SourceUnavailable(_))
        ));
        let import = source.read_or_placeholder().await;
        assert!(import.fallback);
        assert_eq!(import.roster.current().name, "Entry 1");
    }

    #[tokio::test]
    async fn reads_file_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("entry_lists.csv");
        fs::write(&path, "1\tAlpha\tRover\n2\tBeta\n").expect("write entries");
        let import = FileEntrySource::new(&path).read().await.expect("read");
        assert_eq!(import.roster.len(), 2);
        assert_eq!(import.roster.entries()[1].robot_name, "");
    }
}
