// src/core/status.rs

//! Reads the per-project status files written by the status record.
//!
//! Each line is `<rfc3339-timestamp> <command> <failed>`. Lines are appended in run
//! order, so the last line for a command is its latest outcome.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub timestamp: String,
    pub command: String,
    pub failed: bool,
}

/// Latest entry per command name.
pub type CompactedStatus = BTreeMap<String, StatusEntry>;

/// `None` for blank or malformed lines.
pub fn parse_status_line(line: &str) -> Option<StatusEntry> {
    let mut parts = line.split_whitespace();
    let timestamp = parts.next()?;
    let command = parts.next()?;
    let failed = parts.next()?.parse::<bool>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(StatusEntry {
        timestamp: timestamp.to_string(),
        command: command.to_string(),
        failed,
    })
}

pub fn compact_status(content: &str) -> CompactedStatus {
    let mut compacted = CompactedStatus::new();
    for (number, line) in content.lines().enumerate() {
        match parse_status_line(line) {
            Some(entry) => {
                compacted.insert(entry.command.clone(), entry);
            }
            None if line.trim().is_empty() => {}
            None => log::debug!("Ignoring malformed status line {}: '{}'", number + 1, line),
        }
    }
    compacted
}

/// A missing file is an empty status.
pub fn read_status(path: &Path) -> io::Result<CompactedStatus> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(compact_status(&content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CompactedStatus::new()),
        Err(e) => Err(e),
    }
}

pub fn format_compacted(status: &CompactedStatus) -> String {
    status
        .values()
        .map(|e| format!("{} {} {}\n", e.timestamp, e.command, e.failed))
        .collect()
}

/// Replaces the file with one line per command.
pub fn write_compacted_status(path: &Path, status: &CompactedStatus) -> io::Result<()> {
    fs::write(path, format_compacted(status))
}

/// One row per project, one column per command seen in any project.
pub fn status_table(rows: &[(String, CompactedStatus)]) -> String {
    let commands: BTreeSet<&str> = rows
        .iter()
        .flat_map(|(_, status)| status.keys().map(String::as_str))
        .collect();
    let mut header = vec!["project"];
    header.extend(commands.iter().copied());

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|(project, status)| {
            let mut row = vec![project.clone()];
            row.extend(commands.iter().map(|c| match status.get(*c) {
                Some(e) if e.failed => "failed".to_string(),
                Some(_) => "ok".to_string(),
                None => String::new(),
            }));
            row
        })
        .collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(String::len)
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let mut out = String::new();
    let render = |out: &mut String, row: &[&str]| {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
    };
    render(&mut out, &header);
    for row in &cells {
        let row: Vec<&str> = row.iter().map(String::as_str).collect();
        render(&mut out, &row);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = "\
2024-05-01T10:00:00+00:00 test true
2024-05-01T10:00:00+00:00 compile false
garbage
2024-05-02T09:30:00+00:00 test false

";

    #[test]
    fn test_latest_line_per_command_wins() {
        let status = compact_status(CONTENT);
        assert_eq!(status.len(), 2);
        assert!(!status["test"].failed);
        assert_eq!(status["test"].timestamp, "2024-05-02T09:30:00+00:00");
        assert!(!status["compile"].failed);
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(parse_status_line("").is_none());
        assert!(parse_status_line("ts cmd maybe").is_none());
        assert!(parse_status_line("ts cmd true extra").is_none());
    }

    #[test]
    fn test_compaction_rewrites_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".status");
        assert!(read_status(&path).unwrap().is_empty());

        fs::write(&path, CONTENT).unwrap();
        let status = read_status(&path).unwrap();
        write_compacted_status(&path, &status).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "2024-05-01T10:00:00+00:00 compile false\n2024-05-02T09:30:00+00:00 test false\n"
        );
    }

    #[test]
    fn test_table_has_a_column_per_command() {
        let rows = vec![
            ("api".to_string(), compact_status("t1 test true\nt1 compile false")),
            ("ui".to_string(), compact_status("t1 lint false")),
        ];
        let table = status_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "project  compile  lint  test");
        assert_eq!(lines[1], "api      ok             failed");
        assert_eq!(lines[2], "ui                ok");
    }
}
