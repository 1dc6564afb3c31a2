//! Coordinating log service
//!
//! One `LogService` owns the registry of module loggers plus the global
//! output policy: the level allow-list, the module allow-list, production
//! silencing and fixed-width alignment. Each policy knob can be set once;
//! repeated attempts are reported through the console error channel and
//! dropped instead of failing the host.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Color;
use crate::console::Console;
use crate::display;
use crate::level::Level;
use crate::logger::{LogData, Logger, LoggerState};
use crate::tick::TaskQueue;

// =============================================================================
// OPTIONS
// =============================================================================

/// Startup options for a [`LogService`]. Every field routes through the
/// same one-time setters as the imperative API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogServiceOptions {
    /// Levels logging is limited to; `None` leaves all levels enabled
    pub levels: Option<Vec<Level>>,
    /// Modules logging is limited to; `None` leaves all modules enabled
    pub modules: Option<Vec<String>>,
    /// Whether to start in production mode (console logging disabled)
    pub production_mode: bool,
    /// Column width module names are padded to while a level filter is active
    pub fixed_width: Option<usize>,
}

/// Failure loading options from a file.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("Failed to read options file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse options file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl LogServiceOptions {
    /// Load options from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OptionsError> {
        let raw = fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

// =============================================================================
// SHARED STATE
// =============================================================================

/// State shared by a service handle, its clones and every logger handle.
pub(crate) struct ServiceState {
    instances: RwLock<HashMap<String, Arc<LoggerState>>>,
    levels: RwLock<Vec<Level>>,
    modules: RwLock<HashSet<String>>,
    fixed_width: RwLock<Option<usize>>,
    production: AtomicBool,
    level_filter_set: AtomicBool,
    module_filter_set: AtomicBool,
    mode_set: AtomicBool,
    width_set: AtomicBool,
    console: Console,
    tasks: TaskQueue,
}

impl ServiceState {
    fn new(console: Console) -> Self {
        ServiceState {
            instances: RwLock::new(HashMap::new()),
            levels: RwLock::new(Vec::new()),
            modules: RwLock::new(HashSet::new()),
            fixed_width: RwLock::new(None),
            production: AtomicBool::new(false),
            level_filter_set: AtomicBool::new(false),
            module_filter_set: AtomicBool::new(false),
            mode_set: AtomicBool::new(false),
            width_set: AtomicBool::new(false),
            console,
            tasks: TaskQueue::new(),
        }
    }

    /// Shared dispatch target of every logger handle. Order matters:
    /// deferred tasks first (a pending silence belongs to an earlier
    /// tick), then the production gate, then the level filter.
    pub(crate) fn dispatch<T: fmt::Debug>(
        &self,
        logger_name: &str,
        data: LogData<T>,
        level: Level,
        module_name: &str,
    ) {
        self.tasks.run_pending();

        if self.production.load(Ordering::SeqCst) {
            return;
        }

        let level_allowed = match self.levels.read() {
            Ok(levels) => levels.is_empty() || levels.contains(&level),
            Err(_) => true,
        };
        if !level_allowed {
            return;
        }

        // Dispatch only runs for registered modules; a miss is dropped
        // rather than surfaced, logging must never take the host down.
        let instance = match self.instances.read() {
            Ok(instances) => instances.get(module_name).cloned(),
            Err(_) => None,
        };
        let Some(instance) = instance else {
            return;
        };

        display::msg(
            logger_name,
            &data,
            &instance.color,
            level,
            instance.fixed_width,
            &self.console,
        );
    }

    /// True when a module filter is active and does not list `name`
    fn is_module_muted(&self, name: &str) -> bool {
        match self.modules.read() {
            Ok(modules) => !modules.is_empty() && !modules.contains(name),
            Err(_) => false,
        }
    }

    /// Retroactive mute pass over already-registered loggers
    fn mute_all_other_modules(&self) {
        let allowed = match self.modules.read() {
            Ok(modules) => modules.clone(),
            Err(_) => return,
        };
        if let Ok(instances) = self.instances.read() {
            for (name, instance) in instances.iter() {
                if !allowed.contains(name) {
                    instance.mute();
                }
            }
        }
    }

    fn only_levels(&self, levels: &[Level]) {
        if self.level_filter_set.swap(true, Ordering::SeqCst) {
            self.console
                .error("Log levels are already set. only_levels can be used only once");
            return;
        }
        if levels.is_empty() {
            return;
        }
        if let Ok(mut current) = self.levels.write() {
            *current = levels.to_vec();
        }
    }

    fn only_modules(&self, modules: &[String]) {
        if self.module_filter_set.swap(true, Ordering::SeqCst) {
            self.console
                .error("Module filter is already set. only_modules can be used only once");
            return;
        }
        if modules.is_empty() {
            return;
        }
        if let Ok(mut current) = self.modules.write() {
            *current = modules.iter().cloned().collect();
        }
        self.mute_all_other_modules();
    }

    fn set_production_mode(&self) {
        if self.mode_set.swap(true, Ordering::SeqCst) {
            self.console
                .error("Mode is already set. set_production_mode can be used only once");
            return;
        }
        self.production.store(true, Ordering::SeqCst);
        // The console stays live until the next tick so whatever code
        // path requested production mode finishes printing normally.
        let console = self.console.clone();
        self.tasks.schedule(Box::new(move || console.silence()));
    }

    fn set_fixed_width(&self, width: usize) {
        if self.width_set.swap(true, Ordering::SeqCst) {
            self.console
                .error("Fixed width is already set. set_fixed_width can be used only once");
            return;
        }
        if let Ok(mut current) = self.fixed_width.write() {
            *current = Some(width);
        }
    }

    pub(crate) fn run_pending(&self) -> usize {
        self.tasks.run_pending()
    }
}

// =============================================================================
// SERVICE HANDLE
// =============================================================================

/// Coordinating handle over the logger registry and output policy.
/// Clones share one registry; pass clones wherever loggers are created.
#[derive(Clone)]
pub struct LogService {
    state: Arc<ServiceState>,
}

impl LogService {
    /// Service with no filters, printing to the process terminal
    pub fn new() -> Self {
        Self::with_options(LogServiceOptions::default())
    }

    /// Service configured from an options bundle at startup
    pub fn with_options(options: LogServiceOptions) -> Self {
        Self::with_console(options, Console::term())
    }

    /// Service writing through a caller-supplied console
    pub fn with_console(options: LogServiceOptions, console: Console) -> Self {
        let service = LogService {
            state: Arc::new(ServiceState::new(console)),
        };
        service.configure(options);
        service
    }

    /// Apply an options bundle. Present fields route through their
    /// one-time setters, so a field already set on this service is
    /// reported and dropped like any repeated setter call.
    pub fn configure(&self, options: LogServiceOptions) {
        if let Some(levels) = options.levels.as_deref() {
            self.state.only_levels(levels);
        }
        if let Some(modules) = options.modules.as_deref() {
            self.state.only_modules(modules);
        }
        if let Some(width) = options.fixed_width {
            self.state.set_fixed_width(width);
        }
        if options.production_mode {
            self.state.set_production_mode();
        }
    }

    /// Return the logger registered under `name`, creating it on first
    /// use. Repeated calls return the same instance even when
    /// `allowed_levels` differs; that list is captured only at creation.
    pub fn create<T>(&self, name: &str, allowed_levels: &[Level]) -> Logger<T> {
        self.state.run_pending();

        if let Ok(instances) = self.state.instances.read() {
            if let Some(existing) = instances.get(name) {
                return Logger::from_parts(existing.clone(), self.state.clone());
            }
        }

        // Creation-time snapshot: the module filter decides muted at
        // birth, an active level filter decides whether the width hint
        // propagates to the new instance.
        let muted = self.state.is_module_muted(name);
        let fixed_width = {
            let filter_active = match self.state.levels.read() {
                Ok(levels) => !levels.is_empty(),
                Err(_) => false,
            };
            if filter_active {
                self.state.fixed_width.read().ok().and_then(|width| *width)
            } else {
                None
            }
        };

        let created = Arc::new(LoggerState {
            name: name.to_string(),
            color: Color::random(),
            muted: AtomicBool::new(muted),
            allowed_levels: allowed_levels.to_vec(),
            fixed_width,
        });

        let state = match self.state.instances.write() {
            Ok(mut instances) => instances
                .entry(name.to_string())
                .or_insert_with(|| created)
                .clone(),
            // Poisoned registry: hand back an unregistered instance
            // rather than panic inside a logging call
            Err(_) => created,
        };
        Logger::from_parts(state, self.state.clone())
    }

    /// Limit logging to the given levels. Usable once; an empty list
    /// still consumes the single use without restricting anything.
    pub fn only_levels(&self, levels: &[Level]) {
        self.state.only_levels(levels);
    }

    /// Limit logging to the given modules, muting every other registered
    /// logger now and future loggers at creation. Usable once; an empty
    /// list still consumes the single use without restricting anything.
    pub fn only_modules<S: AsRef<str>>(&self, modules: &[S]) {
        let modules: Vec<String> = modules.iter().map(|m| m.as_ref().to_string()).collect();
        self.state.only_modules(&modules);
    }

    /// Enter production mode: dispatch stops immediately and the console
    /// is cleared and silenced on the next tick. Irreversible.
    pub fn set_production_mode(&self) {
        self.state.set_production_mode();
    }

    /// Set the column width module names are padded to. Applies only to
    /// loggers created while a level filter is active. Usable once.
    pub fn set_fixed_width(&self, width: usize) {
        self.state.set_fixed_width(width);
    }

    /// True once production mode has been requested
    pub fn is_production(&self) -> bool {
        self.state.production.load(Ordering::SeqCst)
    }

    /// Number of module loggers registered so far
    pub fn instance_count(&self) -> usize {
        match self.state.instances.read() {
            Ok(instances) => instances.len(),
            Err(_) => 0,
        }
    }

    /// Run tasks deferred to the next tick and return how many ran.
    /// Logger creation and dispatch drain the queue on entry; call this
    /// when neither happens, e.g. right after `set_production_mode` in a
    /// shutdown path.
    pub fn run_pending(&self) -> usize {
        self.state.run_pending()
    }
}

impl Default for LogService {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{Channel, MemorySink};
    use serde_json::Value;

    fn test_service() -> (LogService, Console, MemorySink) {
        test_service_with(LogServiceOptions::default())
    }

    fn test_service_with(options: LogServiceOptions) -> (LogService, Console, MemorySink) {
        let sink = MemorySink::new();
        let console = Console::with_sink(Box::new(sink.clone()));
        let service = LogService::with_console(options, console.clone());
        (service, console, sink)
    }

    #[test]
    fn test_create_registers_instance() {
        let (service, _console, _sink) = test_service();
        assert_eq!(service.instance_count(), 0);

        let net: Logger = service.create("net", &[]);
        assert_eq!(net.name(), "net");
        assert_eq!(service.instance_count(), 1);

        service.create::<Value>("db", &[]);
        assert_eq!(service.instance_count(), 2);
    }

    #[test]
    fn test_create_same_name_returns_same_instance() {
        let (service, _console, _sink) = test_service();

        let first: Logger = service.create("net", &[Level::Info]);
        let second: Logger<String> = service.create("net", &[Level::Warn, Level::Error]);

        assert!(first.same_instance(&second));
        assert_eq!(service.instance_count(), 1);
        // The level list is captured at creation and never replaced
        assert_eq!(second.allowed_levels(), &[Level::Info]);
        assert_eq!(first.color().hex(), second.color().hex());
    }

    #[test]
    fn test_logger_methods_route_channels() {
        let (service, _console, sink) = test_service();
        let log: Logger<i64> = service.create("net", &[]);

        log.data("payload", vec![1, 2]);
        log.error("boom", vec![]);
        log.info("up", vec![]);
        log.warn("slow", vec![]);

        assert_eq!(sink.lines_for(Channel::Log).len(), 1);
        assert_eq!(sink.lines_for(Channel::Error).len(), 1);
        assert_eq!(sink.lines_for(Channel::Info).len(), 1);
        assert_eq!(sink.lines_for(Channel::Warn).len(), 1);
        assert!(sink.lines_for(Channel::Log)[0].contains("payload 1 2"));
    }

    #[test]
    fn test_level_filter_allows_only_listed() {
        let (service, _console, sink) = test_service();
        service.only_levels(&[Level::Info, Level::Warn]);

        let log: Logger = service.create("net", &[]);
        log.data("dropped", vec![]);
        log.error("dropped", vec![]);
        log.info("kept", vec![]);
        log.warn("kept", vec![]);

        assert_eq!(sink.lines().len(), 2);
        assert_eq!(sink.lines_for(Channel::Info).len(), 1);
        assert_eq!(sink.lines_for(Channel::Warn).len(), 1);
    }

    #[test]
    fn test_level_filter_only_once() {
        let (service, _console, sink) = test_service();
        service.only_levels(&[Level::Info]);
        service.only_levels(&[Level::Warn]);

        let misuse = sink.lines_for(Channel::Error);
        assert_eq!(misuse.len(), 1);
        assert!(misuse[0].contains("only_levels"));

        // First filter stays in force
        let log: Logger = service.create("net", &[]);
        log.warn("dropped", vec![]);
        log.info("kept", vec![]);
        assert_eq!(sink.lines_for(Channel::Warn).len(), 0);
        assert_eq!(sink.lines_for(Channel::Info).len(), 1);
    }

    #[test]
    fn test_empty_level_filter_consumes_use_without_restricting() {
        let (service, _console, sink) = test_service();
        service.only_levels(&[]);
        service.only_levels(&[Level::Info]);
        assert_eq!(sink.lines_for(Channel::Error).len(), 1);

        let log: Logger = service.create("net", &[]);
        log.data("kept", vec![]);
        log.warn("kept", vec![]);
        assert_eq!(sink.lines_for(Channel::Log).len(), 1);
        assert_eq!(sink.lines_for(Channel::Warn).len(), 1);
    }

    #[test]
    fn test_module_filter_mutes_retroactively() {
        let (service, _console, sink) = test_service();
        let kept: Logger = service.create("net", &[]);
        let muted: Logger = service.create("db", &[]);

        service.only_modules(&["net"]);
        assert!(!kept.is_muted());
        assert!(muted.is_muted());

        muted.info("dropped", vec![]);
        kept.info("kept", vec![]);
        assert_eq!(sink.lines_for(Channel::Info).len(), 1);
        assert!(sink.lines_for(Channel::Info)[0].contains("kept"));
    }

    #[test]
    fn test_module_filter_mutes_at_creation() {
        let (service, _console, sink) = test_service();
        service.only_modules(&["net"]);

        let muted: Logger = service.create("db", &[]);
        assert!(muted.is_muted());
        muted.warn("dropped", vec![]);
        assert!(sink.lines().is_empty());

        let kept: Logger = service.create("net", &[]);
        assert!(!kept.is_muted());
    }

    #[test]
    fn test_module_filter_only_once() {
        let (service, _console, sink) = test_service();
        let net: Logger = service.create("net", &[]);

        service.only_modules(&["net"]);
        service.only_modules(&["db"]);

        let misuse = sink.lines_for(Channel::Error);
        assert_eq!(misuse.len(), 1);
        assert!(misuse[0].contains("only_modules"));
        assert!(!net.is_muted(), "second call must not re-filter");
    }

    #[test]
    fn test_empty_module_filter_consumes_use_without_restricting() {
        let (service, _console, sink) = test_service();
        let net: Logger = service.create("net", &[]);

        service.only_modules::<&str>(&[]);
        assert!(!net.is_muted());

        service.only_modules(&["db"]);
        assert!(!net.is_muted());
        assert_eq!(sink.lines_for(Channel::Error).len(), 1);
    }

    #[test]
    fn test_production_mode_silences_on_next_tick() {
        let (service, _console, sink) = test_service();
        let log: Logger = service.create("net", &[]);
        log.info("before", vec![]);
        assert_eq!(sink.lines().len(), 1);

        service.set_production_mode();
        assert!(service.is_production());
        assert!(!log.is_muted(), "production does not mute loggers");
        assert_eq!(sink.lines().len(), 1, "console stays live until the next tick");
        assert_eq!(sink.clear_count(), 0);

        // The next dispatch drains the queue: console cleared and
        // silenced, then the record itself is dropped
        log.info("after", vec![]);
        assert!(sink.lines().is_empty());
        assert_eq!(sink.clear_count(), 1);
    }

    #[test]
    fn test_production_mode_misuse_visible_until_tick() {
        let (service, console, sink) = test_service();
        service.set_production_mode();
        service.set_production_mode();

        // Same tick, console still live: the misuse report is visible
        let misuse = sink.lines_for(Channel::Error);
        assert_eq!(misuse.len(), 1);
        assert!(misuse[0].contains("Mode is already set"));

        assert_eq!(service.run_pending(), 1);
        assert!(sink.lines().is_empty(), "silencing clears the report too");
        assert_eq!(sink.clear_count(), 1);

        console.error("ignored");
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_fixed_width_applies_with_active_level_filter() {
        let (service, _console, _sink) = test_service();
        service.set_fixed_width(12);

        let unpadded: Logger = service.create("net", &[]);
        assert_eq!(unpadded.fixed_width(), None, "no level filter, no width");

        service.only_levels(&[Level::Info]);
        let padded: Logger = service.create("db", &[]);
        assert_eq!(padded.fixed_width(), Some(12));
    }

    #[test]
    fn test_fixed_width_only_once() {
        let (service, _console, sink) = test_service();
        service.only_levels(&[Level::Info]);
        service.set_fixed_width(12);
        service.set_fixed_width(20);

        let misuse = sink.lines_for(Channel::Error);
        assert_eq!(misuse.len(), 1);
        assert!(misuse[0].contains("set_fixed_width"));

        let log: Logger = service.create("net", &[]);
        assert_eq!(log.fixed_width(), Some(12));
    }

    #[test]
    fn test_configure_applies_bundle_once() {
        let options = LogServiceOptions {
            levels: Some(vec![Level::Info]),
            modules: Some(vec!["net".to_string()]),
            fixed_width: Some(8),
            production_mode: false,
        };
        let (service, _console, sink) = test_service_with(options);

        let net: Logger = service.create("net", &[]);
        let db: Logger = service.create("db", &[]);
        assert_eq!(net.fixed_width(), Some(8));
        assert!(db.is_muted());

        net.warn("dropped", vec![]);
        net.info("kept", vec![]);
        assert_eq!(sink.lines().len(), 1);

        // A second bundle hits the one-time guards field by field
        service.configure(LogServiceOptions {
            levels: Some(vec![Level::Warn]),
            ..Default::default()
        });
        assert_eq!(sink.lines_for(Channel::Error).len(), 1);
    }

    #[test]
    fn test_configure_production_bundle() {
        let options = LogServiceOptions {
            production_mode: true,
            ..Default::default()
        };
        let (service, _console, sink) = test_service_with(options);
        assert!(service.is_production());

        let log: Logger = service.create("net", &[]);
        log.info("dropped", vec![]);
        assert!(sink.lines().is_empty());
        assert_eq!(sink.clear_count(), 1);
    }

    #[test]
    fn test_dispatch_unknown_module_is_dropped() {
        let (service, _console, sink) = test_service();
        let data = LogData {
            message: "ghost".to_string(),
            params: Vec::<Value>::new(),
        };
        service.state.dispatch("ghost", data, Level::Info, "ghost");
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_colors_stable_and_well_formed() {
        let (service, _console, _sink) = test_service();
        let first: Logger = service.create("net", &[]);
        let again: Logger = service.create("net", &[]);

        assert_eq!(first.color().hex(), again.color().hex());
        assert_eq!(first.color().hex().len(), 6);
        assert!(first
            .color()
            .hex()
            .bytes()
            .all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_options_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.toml");
        std::fs::write(
            &path,
            r#"
levels = ["info", "warn"]
modules = ["net"]
fixed_width = 12
"#,
        )
        .unwrap();

        let options = LogServiceOptions::load(&path).unwrap();
        assert_eq!(options.levels, Some(vec![Level::Info, Level::Warn]));
        assert_eq!(options.modules, Some(vec!["net".to_string()]));
        assert_eq!(options.fixed_width, Some(12));
        assert!(!options.production_mode);
    }

    #[test]
    fn test_options_empty_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.toml");
        std::fs::write(&path, "").unwrap();

        let options = LogServiceOptions::load(&path).unwrap();
        assert!(options.levels.is_none());
        assert!(options.modules.is_none());
        assert!(options.fixed_width.is_none());
        assert!(!options.production_mode);
    }

    #[test]
    fn test_options_load_errors() {
        let missing = LogServiceOptions::load("/nonexistent/log.toml");
        assert!(matches!(missing, Err(OptionsError::Io(_))));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.toml");
        std::fs::write(&path, "levels = [not toml").unwrap();
        let garbled = LogServiceOptions::load(&path);
        assert!(matches!(garbled, Err(OptionsError::Parse(_))));
    }
}
