//! Log line formatting and printing
//!
//! Builds the single console line for a dispatched record and sends it
//! through the channel matching the severity. Layout is
//! `time [module] [LEVEL] message params...` with the module tag painted
//! in the logger's color and padded to the fixed width when one applies.

use std::fmt;

use chrono::Local;
use colored::{ColoredString, Colorize};

use crate::color::Color;
use crate::console::Console;
use crate::level::Level;
use crate::logger::LogData;

/// Display configuration
const SHOW_DATE: bool = false;
const SHOW_TIME: bool = true;

/// Width of the severity column ("ERROR" is the longest tag)
const LEVEL_WIDTH: usize = 5;

/// Format one record and print it through the severity's channel.
pub(crate) fn msg<T: fmt::Debug>(
    name: &str,
    data: &LogData<T>,
    color: &Color,
    level: Level,
    fixed_width: Option<usize>,
    console: &Console,
) {
    let line = render(name, data, color, level, fixed_width);
    console.write(level.channel(), &line);
}

/// Build the printed line without sending it anywhere
fn render<T: fmt::Debug>(
    name: &str,
    data: &LogData<T>,
    color: &Color,
    level: Level,
    fixed_width: Option<usize>,
) -> String {
    let tag = match fixed_width {
        Some(width) => format!("{:<width$}", name, width = width),
        None => name.to_string(),
    };
    let tag = color.paint(&tag).bold();

    format!(
        "{}[{}] [{}] {}",
        time_prefix(),
        tag,
        level_tag(level),
        payload(data)
    )
}

/// Dimmed local-time prefix, e.g. "14:03:51 "
fn time_prefix() -> String {
    let now = Local::now();
    let mut prefix = String::new();
    if SHOW_DATE {
        prefix.push_str(&now.format("%Y-%m-%d ").to_string());
    }
    if SHOW_TIME {
        prefix.push_str(&now.format("%H:%M:%S ").to_string());
    }
    if prefix.is_empty() {
        prefix
    } else {
        prefix.dimmed().to_string()
    }
}

/// Severity column, red for errors
fn level_tag(level: Level) -> ColoredString {
    let padded = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        Level::Error => padded.bright_red().bold(),
        _ => padded.white().bold(),
    }
}

/// Message followed by the debug-rendered extra parameters
fn payload<T: fmt::Debug>(data: &LogData<T>) -> String {
    if data.params.is_empty() {
        return data.message.clone();
    }
    let params = data
        .params
        .iter()
        .map(|p| format!("{:?}", p))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {}", data.message, params)
}
