//! Engine: explicitly constructed shared state for one interpreter
//!
//! The catalog and alias table are process-wide shared state, but they
//! live in an `Engine` value handed to the entry points rather than in
//! global statics, so tests (and embedders) can run several independent
//! engines. Readers may overlap freely; mutations serialize through the
//! write locks with no snapshot isolation.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock};

use crate::alias::{AliasEntry, AliasError, AliasStore, AliasTable};
use crate::catalog::{Catalog, CommandInfo, ShellType};

pub struct Engine {
    catalog: RwLock<Catalog>,
    aliases: RwLock<AliasTable>,
    store: Mutex<Option<AliasStore>>,
    /// Cooperative interrupt flag (Ctrl+C), polled by paging and workers.
    interrupt: Arc<AtomicBool>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            catalog: RwLock::new(Catalog::new()),
            aliases: RwLock::new(AliasTable::new()),
            store: Mutex::new(None),
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn interrupt(&self) -> &Arc<AtomicBool> {
        &self.interrupt
    }

    // --- catalog ---------------------------------------------------------

    pub fn register(&self, info: CommandInfo) {
        self.write_catalog().register(info);
    }

    pub fn unregister(&self, name: &str, scope: ShellType) -> bool {
        self.write_catalog().unregister(name, scope)
    }

    /// Clone a command's contract out of the catalog so no lock is held
    /// while its body runs (bodies may re-enter the engine).
    pub fn lookup(&self, name: &str, scope: ShellType) -> Option<CommandInfo> {
        self.read_catalog().lookup(name, scope).cloned()
    }

    pub fn has_command(&self, name: &str, scope: ShellType) -> bool {
        self.read_catalog().contains(name, scope)
    }

    pub fn command_names(&self, scope: ShellType) -> Vec<String> {
        self.read_catalog().names(scope)
    }

    // --- aliases ---------------------------------------------------------

    /// Add an alias after checking that the target resolves to a command
    /// in the same scope, then rewrite the store.
    pub fn add_alias(&self, alias: &str, target: &str, scope: ShellType) -> Result<(), AliasError> {
        if alias == target {
            return Err(AliasError::SelfAlias(alias.to_string()));
        }
        if !self.has_command(target, scope) {
            return Err(AliasError::NoSuchCommand {
                target: target.to_string(),
                scope,
            });
        }
        self.write_aliases().add(alias, target, scope)?;
        self.persist_aliases();
        Ok(())
    }

    pub fn remove_alias(&self, alias: &str, scope: ShellType) -> Result<(), AliasError> {
        self.write_aliases().remove(alias, scope)?;
        self.persist_aliases();
        Ok(())
    }

    pub fn alias_exists(&self, alias: &str, scope: ShellType) -> bool {
        self.read_aliases().exists(alias, scope)
    }

    pub fn get_alias(&self, alias: &str, scope: ShellType) -> Result<AliasEntry, AliasError> {
        self.read_aliases().get(alias, scope).cloned()
    }

    pub fn aliases_for(&self, scope: ShellType) -> Vec<AliasEntry> {
        self.read_aliases()
            .entries_for(scope)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn resolve_alias(&self, line: &str, scope: ShellType) -> String {
        self.read_aliases().resolve(line, scope)
    }

    /// Attach a persistent store and load its entries into the table.
    /// Called once at startup, before any session runs.
    pub fn attach_alias_store(&self, store: AliasStore) {
        match store.load() {
            Ok(entries) => {
                log::debug!("loaded {} alias(es) from {}", entries.len(), store.path().display());
                self.write_aliases().replace_all(entries);
            }
            Err(e) => log::warn!("could not load alias store: {e}"),
        }
        if let Ok(mut slot) = self.store.lock() {
            *slot = Some(store);
        }
    }

    /// Rewrite the alias store in full after a successful mutation.
    fn persist_aliases(&self) {
        let slot = match self.store.lock() {
            Ok(slot) => slot,
            Err(_) => return,
        };
        if let Some(store) = slot.as_ref() {
            let entries: Vec<AliasEntry> = self.read_aliases().entries().to_vec();
            if let Err(e) = store.save(&entries) {
                log::warn!("could not rewrite alias store: {e}");
            }
        }
    }

    // Lock poisoning only happens if a panic escaped a lock holder; the
    // engine treats that as unrecoverable for the shared tables.
    fn read_catalog(&self) -> std::sync::RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_catalog(&self) -> std::sync::RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_aliases(&self) -> std::sync::RwLockReadGuard<'_, AliasTable> {
        self.aliases.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_aliases(&self) -> std::sync::RwLockWriteGuard<'_, AliasTable> {
        self.aliases.write().unwrap_or_else(|e| e.into_inner())
    }
}
