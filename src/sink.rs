//! Dual-target output: a live writer and an optional persistent file.
//!
//! The live sink sees decoded text (annotations plus permissively decoded
//! stream bytes); the file sink sees annotation text through the encoder
//! fallback chain and the raw byte stream untouched. The file side supports
//! daily rotation when its name came from a date-bearing template.

use crate::config::OutputTemplate;
use crate::encoding::{encode_with_fallback, Encoding, DEFAULT_ENCODERS};
use crate::error::Result;
use chrono::{DateTime, Local, NaiveDate};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use tracing::{debug, info};

/// The optional persistent file target.
struct FileSink {
    file: File,
    template: OutputTemplate,
    path: String,
    opened_on: NaiveDate,
    append: bool,
}

impl FileSink {
    fn open(template: OutputTemplate, append: bool, now: DateTime<Local>) -> Result<Self> {
        let path = template.filename_at(now);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)?;
        debug!("opened output file {path}");
        Ok(Self {
            file,
            template,
            path,
            opened_on: now.date_naive(),
            append,
        })
    }
}

/// Dual-target writer used by the engine for every annotation and byte.
pub struct OutputSink {
    live: Option<Box<dyn Write + Send>>,
    file: Option<FileSink>,
    encoders: &'static [Encoding],
}

impl OutputSink {
    /// Build a sink. `live` is `None` in quiet mode. Opening the output file
    /// is the only fallible step; its failure is a resource error.
    pub fn new(
        live: Option<Box<dyn Write + Send>>,
        template: Option<OutputTemplate>,
        append: bool,
    ) -> Result<Self> {
        let file = template
            .map(|t| FileSink::open(t, append, Local::now()))
            .transpose()?;
        Ok(Self {
            live,
            file,
            encoders: DEFAULT_ENCODERS,
        })
    }

    /// Write a timing annotation to both targets.
    pub fn write_annotation(&mut self, text: &str) -> io::Result<()> {
        let live_result = match &mut self.live {
            Some(w) => w.write_all(text.as_bytes()),
            None => Ok(()),
        };
        if let Some(sink) = &mut self.file {
            let encoded = encode_with_fallback(text, self.encoders);
            sink.file.write_all(&encoded)?;
        }
        live_result
    }

    /// Write permissively decoded stream text to the live target only.
    pub fn write_decoded(&mut self, text: &str) -> io::Result<()> {
        match &mut self.live {
            Some(w) => w.write_all(text.as_bytes()),
            None => Ok(()),
        }
    }

    /// Write raw stream bytes to the file target only.
    pub fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        match &mut self.file {
            Some(sink) => sink.file.write_all(bytes),
            None => Ok(()),
        }
    }

    /// Flush both targets; the live flush still happens if the file flush
    /// fails, and the first failure is reported.
    pub fn flush(&mut self) -> io::Result<()> {
        let file_result = match &mut self.file {
            Some(sink) => sink.file.flush(),
            None => Ok(()),
        };
        let live_result = match &mut self.live {
            Some(w) => w.flush(),
            None => Ok(()),
        };
        file_result.and(live_result)
    }

    /// Rotate the output file if its template is date-bearing and the date
    /// has advanced since it was opened. The caller guarantees the stream is
    /// at a line boundary and no deadline is active.
    pub fn maybe_rotate(&mut self, now: DateTime<Local>) -> Result<()> {
        let due = match &self.file {
            Some(sink) => sink.template.rotates() && now.date_naive() > sink.opened_on,
            None => false,
        };
        if due {
            if let Some(old) = self.file.take() {
                info!("rotating output file {} at date boundary", old.path);
                drop(old.file);
                self.file = Some(FileSink::open(old.template, old.append, now)?);
            }
        }
        Ok(())
    }

    /// Close the file target, if open.
    pub fn close_file(&mut self) {
        if let Some(sink) = self.file.take() {
            debug!("closing output file {}", sink.path);
        }
    }
}

/// Live writer that captures output for test assertions.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct CaptureWriter(pub(crate) std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl CaptureWriter {
    pub(crate) fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
