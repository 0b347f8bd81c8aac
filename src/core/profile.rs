// src/core/profile.rs

//! Reads the per-project profile files: one `<script> <command> <millis>` line per
//! named command execution.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileStats {
    pub latest: u64,
    pub total: u64,
    pub count: u64,
}

impl ProfileStats {
    pub fn average(&self) -> u64 {
        self.total.checked_div(self.count).unwrap_or_default()
    }
}

/// Keyed by `"<script> <command>"`.
pub type ProfileSummary = BTreeMap<String, ProfileStats>;

pub fn parse_profile_line(line: &str) -> Option<(String, u64)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [script, command, millis] => Some((format!("{} {}", script, command), millis.parse().ok()?)),
        _ => None,
    }
}

pub fn summarize_profile(content: &str) -> ProfileSummary {
    let mut summary = ProfileSummary::new();
    for (key, millis) in content.lines().filter_map(parse_profile_line) {
        let stats = summary.entry(key).or_default();
        stats.latest = millis;
        stats.total += millis;
        stats.count += 1;
    }
    summary
}

/// A missing file is an empty summary.
pub fn read_profile(path: &Path) -> io::Result<ProfileSummary> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(summarize_profile(&content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ProfileSummary::new()),
        Err(e) => Err(e),
    }
}

/// A block per project listing latest and average milliseconds per key.
pub fn format_profiles(rows: &[(String, ProfileSummary)]) -> String {
    let width = rows
        .iter()
        .flat_map(|(_, s)| s.keys().map(String::len))
        .max()
        .unwrap_or_default();
    let mut out = String::new();
    for (project, summary) in rows {
        let _ = writeln!(out, "{}", project);
        if summary.is_empty() {
            let _ = writeln!(out, "  (no profile)");
            continue;
        }
        for (key, stats) in summary {
            let _ = writeln!(
                out,
                "  {:<width$}  latest {:>6}ms  average {:>6}ms  runs {}",
                key,
                stats.latest,
                stats.average(),
                stats.count,
                width = width
            );
        }
    }
    out
}
