//! Per-module logger handles
//!
//! A `Logger` is a cheap clonable handle over registry state owned by the
//! coordinating [`LogService`]. The four severity methods forward to the
//! service's shared dispatch unless this module has been muted by the
//! module filter.
//!
//! [`LogService`]: crate::service::LogService

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::color::Color;
use crate::level::Level;
use crate::service::ServiceState;

/// Message plus the extra values of one log call.
#[derive(Debug, Clone)]
pub struct LogData<T> {
    pub message: String,
    pub params: Vec<T>,
}

/// Registry-owned state of one module logger. Lives behind an `Arc` in
/// the service registry; handles and lookups share it.
pub(crate) struct LoggerState {
    pub(crate) name: String,
    pub(crate) color: Color,
    pub(crate) muted: AtomicBool,
    pub(crate) allowed_levels: Vec<Level>,
    pub(crate) fixed_width: Option<usize>,
}

impl LoggerState {
    pub(crate) fn mute(&self) {
        self.muted.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }
}

/// Handle to a named module logger.
///
/// Obtained from [`LogService::create`]; clones and repeated lookups of
/// the same name refer to the same underlying instance. `T` is the type
/// of the extra values accepted by the logging methods and defaults to
/// [`serde_json::Value`] for mixed payloads.
///
/// [`LogService::create`]: crate::service::LogService::create
pub struct Logger<T = Value> {
    state: Arc<LoggerState>,
    service: Arc<ServiceState>,
    _payload: PhantomData<fn(T)>,
}

impl<T> Clone for Logger<T> {
    fn clone(&self) -> Self {
        Logger {
            state: self.state.clone(),
            service: self.service.clone(),
            _payload: PhantomData,
        }
    }
}

impl<T> Logger<T> {
    pub(crate) fn from_parts(state: Arc<LoggerState>, service: Arc<ServiceState>) -> Self {
        Logger {
            state,
            service,
            _payload: PhantomData,
        }
    }

    /// Module name this logger was registered under
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Display color assigned at creation
    pub fn color(&self) -> &Color {
        &self.state.color
    }

    /// True once the module filter has muted this logger
    pub fn is_muted(&self) -> bool {
        self.state.is_muted()
    }

    /// Levels requested at creation. Kept for introspection; dispatch
    /// filters on the service-wide level list only.
    pub fn allowed_levels(&self) -> &[Level] {
        &self.state.allowed_levels
    }

    /// Column width captured at creation, if any
    pub fn fixed_width(&self) -> Option<usize> {
        self.state.fixed_width
    }

    /// True if `other` is a handle to the same registered instance
    pub fn same_instance<U>(&self, other: &Logger<U>) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl<T: fmt::Debug> Logger<T> {
    /// Log a raw data payload
    pub fn data(&self, message: &str, params: Vec<T>) {
        self.log(Level::Data, message, params);
    }

    /// Log a critical failure
    pub fn error(&self, message: &str, params: Vec<T>) {
        self.log(Level::Error, message, params);
    }

    /// Log a standard operational message
    pub fn info(&self, message: &str, params: Vec<T>) {
        self.log(Level::Info, message, params);
    }

    /// Log an issue that needs attention
    pub fn warn(&self, message: &str, params: Vec<T>) {
        self.log(Level::Warn, message, params);
    }

    fn log(&self, level: Level, message: &str, params: Vec<T>) {
        if self.state.is_muted() {
            return;
        }
        let data = LogData {
            message: message.to_string(),
            params,
        };
        self.service
            .dispatch(&self.state.name, data, level, &self.state.name);
    }
}
