//! Alias table and persistence
//!
//! Aliases rewrite only the first whitespace-delimited token of a line,
//! and only once: the resolved command name is never re-checked against
//! the alias table. Targets must be resolvable commands at creation time
//! (checked by the engine), which also means an alias can never point at
//! another alias. Removing the target command later leaves a dangling
//! alias; that is documented behavior, not auto-cleaned.
//!
//! The table persists as an ordered JSON array of `{Alias, Command, Type}`
//! records, loaded once at startup and rewritten in full on every
//! successful mutation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{ShellType, UnknownShellType};
use crate::switches::split_first_token;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AliasError {
    #[error("alias '{alias}' already exists in {scope} scope")]
    AlreadyExists { alias: String, scope: ShellType },
    #[error("'{target}' is not a command in {scope} scope")]
    NoSuchCommand { target: String, scope: ShellType },
    #[error("no such alias '{alias}' in {scope} scope")]
    NoSuchAlias { alias: String, scope: ShellType },
    #[error(transparent)]
    NoSuchType(#[from] UnknownShellType),
    #[error("cannot alias '{0}' to itself")]
    SelfAlias(String),
}

/// One alias, scoped to a shell type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub alias: String,
    pub target: String,
    pub scope: ShellType,
}

/// In-memory alias table, ordered by insertion (the persisted order).
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

impl AliasTable {
    pub fn new() -> Self {
        AliasTable::default()
    }

    /// Append an alias. The target-resolvability check against the command
    /// catalog is the engine's responsibility; this only enforces the
    /// table-local invariants.
    pub fn add(&mut self, alias: &str, target: &str, scope: ShellType) -> Result<(), AliasError> {
        if alias == target {
            return Err(AliasError::SelfAlias(alias.to_string()));
        }
        if self.exists(alias, scope) {
            return Err(AliasError::AlreadyExists {
                alias: alias.to_string(),
                scope,
            });
        }
        self.entries.push(AliasEntry {
            alias: alias.to_string(),
            target: target.to_string(),
            scope,
        });
        Ok(())
    }

    pub fn remove(&mut self, alias: &str, scope: ShellType) -> Result<(), AliasError> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.alias == alias && e.scope == scope)
            .ok_or_else(|| AliasError::NoSuchAlias {
                alias: alias.to_string(),
                scope,
            })?;
        self.entries.remove(pos);
        Ok(())
    }

    pub fn exists(&self, alias: &str, scope: ShellType) -> bool {
        self.entries.iter().any(|e| e.alias == alias && e.scope == scope)
    }

    pub fn get(&self, alias: &str, scope: ShellType) -> Result<&AliasEntry, AliasError> {
        self.entries
            .iter()
            .find(|e| e.alias == alias && e.scope == scope)
            .ok_or_else(|| AliasError::NoSuchAlias {
                alias: alias.to_string(),
                scope,
            })
    }

    /// All entries for one scope, in insertion order.
    pub fn entries_for(&self, scope: ShellType) -> Vec<&AliasEntry> {
        self.entries.iter().filter(|e| e.scope == scope).collect()
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn replace_all(&mut self, entries: Vec<AliasEntry>) {
        self.entries = entries;
    }

    /// Rewrite the leading token of a line if it names an alias in this
    /// scope; otherwise return the line unchanged. Single-level: the
    /// result is not resolved again.
    pub fn resolve(&self, line: &str, scope: ShellType) -> String {
        let (first, rest) = split_first_token(line);
        if first.is_empty() {
            return line.to_string();
        }
        match self.entries.iter().find(|e| e.alias == first && e.scope == scope) {
            Some(entry) if rest.is_empty() => entry.target.clone(),
            Some(entry) => format!("{} {}", entry.target, rest),
            None => line.to_string(),
        }
    }
}

/// Serialized record shape, matching the external alias-store format.
#[derive(Debug, Serialize, Deserialize)]
struct AliasRecord {
    #[serde(rename = "Alias")]
    alias: String,
    #[serde(rename = "Command")]
    command: String,
    #[serde(rename = "Type")]
    shell_type: String,
}

#[derive(Error, Debug)]
pub enum AliasStoreError {
    #[error("alias store I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("alias store format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// File-backed alias persistence. The file is the single source of truth:
/// every save rewrites it wholesale, no incremental diffing.
#[derive(Debug, Clone)]
pub struct AliasStore {
    path: PathBuf,
}

impl AliasStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        AliasStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all entries. A missing file is an empty table; records with an
    /// unknown shell type are skipped with a warning.
    pub fn load(&self) -> Result<Vec<AliasEntry>, AliasStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let records: Vec<AliasRecord> = serde_json::from_str(&raw)?;

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            match record.shell_type.parse::<ShellType>() {
                Ok(scope) => entries.push(AliasEntry {
                    alias: record.alias,
                    target: record.command,
                    scope,
                }),
                Err(e) => {
                    log::warn!("skipping alias '{}': {}", record.alias, e);
                }
            }
        }
        Ok(entries)
    }

    /// Rewrite the store in full with the given entries.
    pub fn save(&self, entries: &[AliasEntry]) -> Result<(), AliasStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let records: Vec<AliasRecord> = entries
            .iter()
            .map(|e| AliasRecord {
                alias: e.alias.clone(),
                command: e.target.clone(),
                shell_type: e.scope.name().to_string(),
            })
            .collect();
        let raw = serde_json::to_string_pretty(&records)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}
