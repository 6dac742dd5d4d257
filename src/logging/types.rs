//! Core logging types: entry records, status, and the [`Log`] trait.

/// Result of handling one top-level entry, kept for the run summary.
#[derive(Debug, Clone)]
pub struct EntryRecord {
    /// Top-level name of the entry (e.g. `.bashrc`).
    pub name: String,
    /// Final status of the entry.
    pub status: EntryStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a handled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Entry was moved into the repository.
    Relocated,
    /// Entry was left in place (repository already holds it, already linked, ...).
    Skipped,
    /// Dry-run mode; the entry would have been relocated.
    DryRun,
    /// Relocation or re-linking failed.
    Failed,
}

/// Abstraction over logging backends.
///
/// Both [`Logger`](super::logger::Logger) (direct output) and
/// [`BufferedLog`](super::buffered::BufferedLog) (in-memory capture) implement
/// this trait, so engine code logs without knowing where output goes.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record an entry result for the summary.
    fn record_entry(&self, name: &str, status: EntryStatus, message: Option<&str>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_status_equality() {
        assert_eq!(EntryStatus::Relocated, EntryStatus::Relocated);
        assert_ne!(EntryStatus::Relocated, EntryStatus::Failed);
        assert_ne!(EntryStatus::Skipped, EntryStatus::DryRun);
    }

    #[test]
    fn entry_record_clone() {
        let entry = EntryRecord {
            name: ".bashrc".to_string(),
            status: EntryStatus::Relocated,
            message: Some("backed up".to_string()),
        };
        let cloned = entry.clone();
        assert_eq!(cloned.name, entry.name);
        assert_eq!(cloned.status, entry.status);
        assert_eq!(cloned.message, entry.message);
    }
}
