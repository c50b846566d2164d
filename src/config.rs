//! Immutable session configuration and output filename templating.

use crate::error::{Error, Result};
use crate::timing::TimingMode;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

/// Where the byte stream comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    /// Read our own standard input.
    Stdin,
    /// A character device opened for read/write.
    Device(String),
    /// Stdout (or stderr, per config) of a launched subprocess.
    Command(String),
}

/// Expansion of the `--output` argument. Template kinds differ in when the
/// strftime expansion happens: once at open, or again at each daily rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTemplate {
    /// Plain filename, used as-is.
    Literal(String),
    /// strftime template expanded once when the file is opened.
    Stamped(String),
    /// strftime template with a date component, re-expanded when the
    /// wall-clock date advances.
    Rotating(String),
}

/// Template used when the output argument is a bare `%`.
const DEFAULT_STAMP_TEMPLATE: &str = "%Y-%m-%dT%H:%M:%S";

impl OutputTemplate {
    /// Classify an `--output` argument.
    pub fn parse(arg: &str) -> Result<Self> {
        let template = if arg == "%" {
            DEFAULT_STAMP_TEMPLATE.to_string()
        } else {
            arg.to_string()
        };
        if !template.contains('%') {
            return Ok(OutputTemplate::Literal(template));
        }
        validate_strftime(&template)
            .map_err(|e| Error::Config(format!("invalid output template '{arg}': {e}")))?;
        if template.contains("%d") {
            Ok(OutputTemplate::Rotating(template))
        } else {
            Ok(OutputTemplate::Stamped(template))
        }
    }

    /// Whether this template re-expands at date boundaries.
    pub fn rotates(&self) -> bool {
        matches!(self, OutputTemplate::Rotating(_))
    }

    /// The filename this template yields at `now`.
    pub fn filename_at(&self, now: DateTime<Local>) -> String {
        match self {
            OutputTemplate::Literal(name) => name.clone(),
            OutputTemplate::Stamped(tmpl) | OutputTemplate::Rotating(tmpl) => {
                now.format(tmpl).to_string()
            }
        }
    }
}

/// Reject strftime format strings chrono cannot render, since a bad
/// specifier would otherwise abort formatting mid-run.
pub fn validate_strftime(fmt: &str) -> std::result::Result<(), String> {
    for item in StrftimeItems::new(fmt) {
        if matches!(item, Item::Error) {
            return Err("unrecognized strftime specifier".to_string());
        }
    }
    Ok(())
}

/// Immutable per-session options, parsed once and shared by every engine
/// invocation of the session (restarts reuse the identical configuration).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub source: SourceMode,
    pub timing: Option<TimingMode>,
    /// Silence the live sink entirely; the file sink is unaffected.
    pub quiet: bool,
    pub append: bool,
    /// Promote `\r` to `\n` instead of discarding it.
    pub cr_to_newline: bool,
    /// Capture subprocess stderr instead of stdout.
    pub read_stderr: bool,
    pub base_pattern: Option<String>,
    pub inline_pattern: Option<String>,
    pub quit_pattern: Option<String>,
    /// Deadline offset in seconds from engine start.
    pub endtime: Option<f64>,
    pub restart: bool,
    /// Set basetime when the engine starts rather than at the first byte.
    pub launchtime: bool,
    pub output: Option<OutputTemplate>,
}

impl SessionConfig {
    /// Cross-field validation beyond what option parsing enforces.
    pub fn validate(&self) -> Result<()> {
        if let Some(TimingMode::Absolute { format, .. }) = &self.timing {
            validate_strftime(format)
                .map_err(|e| Error::Config(format!("invalid time format '{format}': {e}")))?;
        }
        if let Some(secs) = self.endtime {
            if !secs.is_finite() || secs < 0.0 {
                return Err(Error::Config(format!(
                    "end time must be a non-negative number of seconds, got {secs}"
                )));
            }
        }
        if self.read_stderr && !matches!(self.source, SourceMode::Command(_)) {
            return Err(Error::Config(
                "--stderr only applies when launching a command".to_string(),
            ));
        }
        Ok(())
    }
}
