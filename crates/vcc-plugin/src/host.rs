//! The plugin host: runs hooks in order and collects plugin commands.
//!
//! # Ordering
//!
//! Plugins run in the order they were registered, and within the chain
//! each hook sees the previous hook's output:
//!
//! ```text
//! text ─→ [ban] ─→ [cqd] ─→ [beep] ─→ out
//!            │
//!            └─ None: stop here, nothing is sent or shown
//! ```
//!
//! # Concurrency
//!
//! The receive loop runs incoming hooks while the input loop may be
//! inserting a plugin (`-pins`), so the list sits behind an `RwLock`. Hooks
//! run on a snapshot of the list, never under the lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use vcc_protocol::Request;

use crate::builtin::{BanPlugin, BeepPlugin, CqdPlugin};
use crate::{Command, Console, Plugin, PluginError, ProviderLoadError};

// ---------------------------------------------------------------------------
// PluginCatalog
// ---------------------------------------------------------------------------

type Constructor = Box<dyn Fn() -> Arc<dyn Plugin> + Send + Sync>;

/// The plugins that can be loaded by name.
///
/// Each entry builds a fresh instance, so a plugin's state (a ban list,
/// say) belongs to the host that loaded it.
pub struct PluginCatalog {
    entries: Vec<(String, Constructor)>,
}

impl PluginCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The plugins that ship with the client: `ban`, `beep` and `cqd`.
    pub fn builtin() -> Self {
        Self::new()
            .with("ban", || Arc::new(BanPlugin::new()))
            .with("beep", || Arc::new(BeepPlugin))
            .with("cqd", || Arc::new(CqdPlugin))
    }

    /// Adds (or replaces) an entry.
    pub fn with<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        let name = name.into();
        self.entries.retain(|(n, _)| *n != name);
        self.entries.push((name, Box::new(constructor)));
        self
    }

    /// Entry names in the order they were added.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Builds a new instance of the named plugin.
    pub fn create(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, constructor)| constructor())
    }
}

impl Default for PluginCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// ---------------------------------------------------------------------------
// PluginHost
// ---------------------------------------------------------------------------

/// A registered plugin and the commands it contributed.
#[derive(Clone)]
struct Loaded {
    plugin: Arc<dyn Plugin>,
    commands: Vec<Arc<dyn Command>>,
}

/// The set of plugins active in one client.
pub struct PluginHost {
    catalog: PluginCatalog,
    loaded: RwLock<Vec<Loaded>>,
    shut_down: AtomicBool,
}

impl PluginHost {
    /// Creates a host with no plugins registered yet.
    pub fn new(catalog: PluginCatalog) -> Self {
        Self {
            catalog,
            loaded: RwLock::new(Vec::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    /// The catalog `insert` and `load` draw from.
    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    /// Registers a plugin after running its `init()`.
    ///
    /// # Errors
    /// - [`PluginError::AlreadyLoaded`]: a plugin with that name is in
    /// - whatever `init()` returned; the plugin is not registered then
    pub fn register(&self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        let name = plugin.name().to_owned();
        if self.is_loaded(&name) {
            return Err(PluginError::AlreadyLoaded(name));
        }

        plugin.init()?;
        let commands = plugin.commands();

        let mut loaded = self.write();
        // A concurrent register of the same name may have won meanwhile.
        if loaded.iter().any(|l| l.plugin.name() == name) {
            return Err(PluginError::AlreadyLoaded(name));
        }
        tracing::info!(plugin = %name, commands = commands.len(), "plugin loaded");
        loaded.push(Loaded { plugin, commands });
        Ok(())
    }

    /// Builds the named plugin from the catalog and registers it.
    pub fn insert(&self, name: &str) -> Result<(), PluginError> {
        let plugin = self
            .catalog
            .create(name)
            .ok_or_else(|| PluginError::UnknownProvider(name.to_owned()))?;
        self.register(plugin)
    }

    /// Inserts each named plugin in order.
    ///
    /// A name that fails is skipped and reported in the returned list; the
    /// rest still load.
    pub fn load<I, S>(&self, names: I) -> Vec<ProviderLoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut failures = Vec::new();
        for name in names {
            let name = name.as_ref();
            if let Err(source) = self.insert(name) {
                tracing::warn!(plugin = %name, error = %source, "plugin skipped");
                failures.push(ProviderLoadError {
                    name: name.to_owned(),
                    source,
                });
            }
        }
        failures
    }

    /// Names of the registered plugins, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.read()
            .iter()
            .map(|l| l.plugin.name().to_owned())
            .collect()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.read().iter().any(|l| l.plugin.name() == name)
    }

    // -- Hooks ------------------------------------------------------------

    /// Runs `text` through every outgoing hook. `None` means drop it.
    pub fn apply_send(&self, text: String) -> Option<String> {
        self.snapshot()
            .iter()
            .try_fold(text, |text, l| l.plugin.on_send(text))
    }

    /// Runs `request` through every incoming hook. `None` means drop it.
    pub fn apply_receive(
        &self,
        request: Request,
        console: &dyn Console,
    ) -> Option<Request> {
        self.snapshot()
            .iter()
            .try_fold(request, |request, l| l.plugin.on_receive(request, console))
    }

    // -- Commands ---------------------------------------------------------

    /// Finds a plugin command. When two plugins define the same name, the
    /// one registered last wins.
    pub fn command(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.read()
            .iter()
            .rev()
            .flat_map(|l| l.commands.iter())
            .find(|c| c.name() == name)
            .cloned()
    }

    /// Every plugin command, in registration order.
    pub fn commands(&self) -> Vec<Arc<dyn Command>> {
        self.read()
            .iter()
            .flat_map(|l| l.commands.iter().cloned())
            .collect()
    }

    // -- Shutdown ---------------------------------------------------------

    /// Calls every plugin's `shutdown()` in registration order.
    ///
    /// Only the first call does anything.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        for l in self.snapshot() {
            tracing::debug!(plugin = %l.plugin.name(), "plugin shutdown");
            l.plugin.shutdown();
        }
    }

    fn snapshot(&self) -> Vec<Loaded> {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Loaded>> {
        self.loaded.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Loaded>> {
        self.loaded.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PluginHost {
    fn default() -> Self {
        Self::new(PluginCatalog::builtin())
    }
}

impl std::fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHost")
            .field("catalog", &self.catalog)
            .field("loaded", &self.names())
            .finish()
    }
}
