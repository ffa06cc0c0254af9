//! Credential storage
//!
//! A flat, ordered list of `name password` pairs loaded once at startup and
//! never mutated afterwards, so handlers share it through an `Arc` without
//! locking.

use log::debug;
use std::fs;
use std::path::Path;

use crate::error::CredentialError;

/// One `(name, password)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub name: String,
    pub password: String,
}

/// Immutable credential table.
#[derive(Debug, Default)]
pub struct CredentialStore {
    entries: Vec<Credential>,
}

impl CredentialStore {
    /// Builds a store directly from pairs, keeping their order.
    pub fn from_entries<I, N, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, password)| Credential {
                    name: name.into(),
                    password: password.into(),
                })
                .collect(),
        }
    }

    /// Reads and parses the credentials file at `path`.
    pub fn load(
        path: &Path,
        max_entries: usize,
        max_field_length: usize,
    ) -> Result<Self, CredentialError> {
        let text = fs::read_to_string(path).map_err(|source| CredentialError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let store = Self::parse(&text, max_entries, max_field_length)?;
        debug!("Loaded {} credentials from {}", store.len(), path.display());
        Ok(store)
    }

    /// Parses `name password` lines. Blank lines and `#` comments are skipped.
    pub fn parse(
        text: &str,
        max_entries: usize,
        max_field_length: usize,
    ) -> Result<Self, CredentialError> {
        let mut entries = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            let [name, password] = fields.as_slice() else {
                return Err(CredentialError::MalformedLine { line });
            };

            if name.len() > max_field_length || password.len() > max_field_length {
                return Err(CredentialError::FieldTooLong {
                    line,
                    max: max_field_length,
                });
            }

            if entries.len() == max_entries {
                return Err(CredentialError::TooManyEntries { max: max_entries });
            }

            entries.push(Credential {
                name: name.to_string(),
                password: password.to_string(),
            });
        }

        Ok(Self { entries })
    }

    /// Linear scan for an exact match on both fields.
    ///
    /// An empty name or password never matches.
    pub fn authenticate(&self, name: &str, password: &str) -> bool {
        if name.is_empty() || password.is_empty() {
            return false;
        }

        self.entries
            .iter()
            .any(|entry| entry.name == name && entry.password == password)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store() -> CredentialStore {
        CredentialStore::from_entries([("alice", "pw1"), ("bob", "pw2")])
    }

    #[test]
    fn test_authenticate_exact_match() {
        let store = store();
        assert!(store.authenticate("alice", "pw1"));
        assert!(store.authenticate("bob", "pw2"));
        assert!(!store.authenticate("alice", "pw2"));
        assert!(!store.authenticate("Alice", "pw1"));
        assert!(!store.authenticate("carol", "pw1"));
    }

    #[test]
    fn test_authenticate_empty_fields_fail() {
        let store = CredentialStore::from_entries([("", ""), ("dave", "")]);
        assert!(!store.authenticate("", ""));
        assert!(!store.authenticate("dave", ""));
        assert!(!store.authenticate("", "pw1"));
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let text = "# users\n\nalice pw1\n   \nbob\tpw2\n";
        let store = CredentialStore::parse(text, 10, 31).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.authenticate("bob", "pw2"));
    }

    #[test]
    fn test_parse_reports_malformed_line() {
        let text = "alice pw1\nbob\n";
        let err = CredentialStore::parse(text, 10, 31).unwrap_err();
        assert!(matches!(err, CredentialError::MalformedLine { line: 2 }));

        let err = CredentialStore::parse("alice pw1 extra\n", 10, 31).unwrap_err();
        assert!(matches!(err, CredentialError::MalformedLine { line: 1 }));
    }

    #[test]
    fn test_parse_enforces_field_length() {
        let long = "x".repeat(32);
        let text = format!("{} pw1\n", long);
        let err = CredentialStore::parse(&text, 10, 31).unwrap_err();
        assert!(matches!(err, CredentialError::FieldTooLong { line: 1, max: 31 }));
    }

    #[test]
    fn test_parse_enforces_entry_limit() {
        let text = "a 1\nb 2\nc 3\n";
        let err = CredentialStore::parse(text, 2, 31).unwrap_err();
        assert!(matches!(err, CredentialError::TooManyEntries { max: 2 }));
        assert_eq!(CredentialStore::parse(text, 3, 31).unwrap().len(), 3);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alice pw1").unwrap();
        writeln!(file, "bob pw2").unwrap();

        let store = CredentialStore::load(file.path(), 64, 31).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.authenticate("alice", "pw1"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CredentialStore::load(&dir.path().join("nope.txt"), 64, 31).unwrap_err();
        assert!(matches!(err, CredentialError::Unreadable { .. }));
    }
}
