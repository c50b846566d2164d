//! The byte-stream engine: a blocking read-one-byte loop with line/timing
//! bookkeeping.
//!
//! Each invocation owns a fresh run state and drives the source until a stop
//! condition fires. Run-time stream failures never propagate as errors; they
//! are classified into a stop reason and reported. The only error that
//! escapes is an invalid pattern failing at first use, which is a
//! configuration problem.

use crate::config::SessionConfig;
use crate::encoding::LossyDecoder;
use crate::error::Result;
use crate::forward::InputForwarder;
use crate::patterns::LinePatterns;
use crate::sink::OutputSink;
use crate::source::ByteSource;
use crate::timing::{epoch_seconds, TimingTracker};
use chrono::Local;
use std::fmt;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// Why a run stopped. Terminal once reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndOfInput,
    TimeExpiration,
    /// Carries the literal pattern text for the operator-visible message.
    QuitPattern(String),
    ExternalError,
    Interrupted,
    Unknown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndOfInput => write!(f, "end of input"),
            StopReason::TimeExpiration => write!(f, "time expiration"),
            StopReason::QuitPattern(pat) => write!(f, "quit pattern '{pat}' matched"),
            StopReason::ExternalError => write!(f, "external error"),
            StopReason::Interrupted => write!(f, "interrupted"),
            StopReason::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of one engine invocation: why it stopped and whether the session
/// driver should invoke it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutcome {
    pub reason: StopReason,
    pub restart: bool,
}

/// Mutated over one invocation, discarded at the end.
struct RunState {
    tracker: TimingTracker,
    decoder: LossyDecoder,
    current_line: String,
    at_line_start: bool,
    /// Timestamp of the current line's first byte; rebase target.
    line_time: f64,
    /// Timestamp of the first inline-pattern match, set at most once; the
    /// elapsed time is computed against the final basetime at report time.
    inline_match_time: Option<f64>,
    /// Absolute deadline in epoch seconds, from the end-time offset.
    deadline: Option<f64>,
}

pub struct Engine<'a> {
    config: &'a SessionConfig,
    patterns: LinePatterns,
    stop_requested: &'a AtomicBool,
}

impl<'a> Engine<'a> {
    pub fn new(config: &'a SessionConfig, stop_requested: &'a AtomicBool) -> Self {
        let patterns = LinePatterns::new(
            config.base_pattern.clone(),
            config.inline_pattern.clone(),
            config.quit_pattern.clone(),
        );
        Self {
            config,
            patterns,
            stop_requested,
        }
    }

    /// Drive the source until a stop condition fires.
    pub fn run(
        &self,
        source: &mut dyn ByteSource,
        sink: &mut OutputSink,
        forwarder: Option<&InputForwarder>,
    ) -> Result<EngineOutcome> {
        let start = Local::now();
        let mut state = RunState {
            tracker: TimingTracker::new(self.config.timing.clone()),
            decoder: LossyDecoder::new(),
            current_line: String::new(),
            at_line_start: true,
            line_time: 0.0,
            inline_match_time: None,
            deadline: self.config.endtime.map(|secs| epoch_seconds(start) + secs),
        };
        if self.config.launchtime {
            state.tracker.ensure_basetime(start);
        }

        let loop_result = self.run_loop(source, sink, forwarder, &mut state);

        source.release();
        if let Some(match_time) = state.inline_match_time {
            let elapsed = state.tracker.elapsed_at(match_time);
            let report = format!(
                "\nPattern '{}' matched at {elapsed:.6} seconds\n",
                self.patterns.inline.text()
            );
            if let Err(e) = sink.write_annotation(&report).and_then(|_| sink.flush()) {
                warn!("failed to write inline-match report: {e}");
            }
        }
        sink.close_file();

        let reason = loop_result?;
        info!("stopped: {reason}");
        let restart = match reason {
            // Non-restartable failures clear the restart flag.
            StopReason::ExternalError | StopReason::Interrupted => false,
            _ => self.config.restart,
        };
        Ok(EngineOutcome { reason, restart })
    }

    fn run_loop(
        &self,
        source: &mut dyn ByteSource,
        sink: &mut OutputSink,
        forwarder: Option<&InputForwarder>,
        state: &mut RunState,
    ) -> Result<StopReason> {
        loop {
            if self.stop_requested.load(Ordering::Relaxed) {
                return Ok(StopReason::Interrupted);
            }

            if let Some(forwarder) = forwarder {
                if let Some(line) = forwarder.try_take() {
                    if let Err(e) = source.write_line(&line) {
                        error!("failed to forward input: {e}");
                        return Ok(StopReason::ExternalError);
                    }
                }
            }

            // A zero-length read means end of input. For non-stdin sources
            // this cannot be told apart from "no data right now"; the
            // conflation is a documented limitation.
            let byte = match source.read_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => return Ok(StopReason::EndOfInput),
                Err(e) if e.kind() == ErrorKind::Interrupted => {
                    return Ok(StopReason::Interrupted)
                }
                Err(e) => {
                    error!("read failed: {e}");
                    return Ok(StopReason::ExternalError);
                }
            };

            let now = Local::now();
            let now_secs = epoch_seconds(now);
            if let Some(deadline) = state.deadline {
                if now_secs > deadline {
                    return Ok(StopReason::TimeExpiration);
                }
            }

            let byte = match byte {
                b'\r' if self.config.cr_to_newline => b'\n',
                b'\r' => continue,
                other => other,
            };

            state.tracker.ensure_basetime(now);

            if state.at_line_start {
                state.line_time = now_secs;
                // Rotation only happens at line boundaries and never while a
                // deadline is counting down.
                if state.deadline.is_none() {
                    if let Err(e) = sink.maybe_rotate(now) {
                        error!("rotation failed: {e}");
                        return Ok(StopReason::ExternalError);
                    }
                }
                if let Some(annotation) = state.tracker.annotate(now) {
                    if let Err(e) = sink.write_annotation(&annotation) {
                        error!("annotation write failed: {e}");
                        return Ok(StopReason::ExternalError);
                    }
                }
                state.at_line_start = false;
            }

            if let Err(e) = sink.write_raw(&[byte]) {
                error!("file write failed: {e}");
                return Ok(StopReason::ExternalError);
            }
            if let Some(text) = state.decoder.push(byte) {
                if let Err(e) = sink.write_decoded(&text) {
                    error!("live write failed: {e}");
                    return Ok(StopReason::ExternalError);
                }
                state.current_line.push_str(&text);
            }

            if state.inline_match_time.is_none()
                && self.patterns.inline.matches(&state.current_line)?
            {
                debug!(
                    "inline pattern '{}' matched at {now_secs:.6}",
                    self.patterns.inline.text()
                );
                state.inline_match_time = Some(now_secs);
            }
            if self.patterns.quit.matches(&state.current_line)? {
                if let Err(e) = sink.flush() {
                    warn!("flush failed while stopping: {e}");
                }
                return Ok(StopReason::QuitPattern(
                    self.patterns.quit.text().to_string(),
                ));
            }

            if byte == b'\n' {
                state.at_line_start = true;
                if self.patterns.base.matches(&state.current_line)? {
                    debug!("base pattern matched, rebasing to {}", state.line_time);
                    state.tracker.rebase(state.line_time);
                }
                state.current_line.clear();
            }

            if let Err(e) = sink.flush() {
                error!("flush failed: {e}");
                return Ok(StopReason::ExternalError);
            }
        }
    }
}
