//! Byte sources: stdin, a character device, or a launched subprocess.
//!
//! The engine only needs a blocking read-one-byte primitive and, for
//! device/subprocess sources, a write side to forward interactive input to.

use crate::config::{SessionConfig, SourceMode};
use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use tracing::{debug, warn};

/// A blocking byte stream with an optional write side.
pub trait ByteSource {
    /// Block until one byte is available. `Ok(None)` means a zero-length
    /// read. For non-stdin sources this conflates true end-of-stream with
    /// "no data right now"; that ambiguity is inherited and kept.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Forward one line of interactive input to the write side. Sources
    /// without a write side accept and drop it.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Release underlying handles at end of run.
    fn release(&mut self);
}

fn read_one(reader: &mut impl Read) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    match reader.read(&mut buf)? {
        0 => Ok(None),
        _ => Ok(Some(buf[0])),
    }
}

/// Our own standard input; read-only. Holds the `Stdin` handle rather than
/// its lock so the source stays `Send`.
pub struct StdinSource {
    stdin: io::Stdin,
}

impl ByteSource for StdinSource {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        read_one(&mut self.stdin)
    }

    fn write_line(&mut self, _line: &str) -> io::Result<()> {
        Ok(())
    }

    fn release(&mut self) {}
}

/// A character device opened read/write.
pub struct DeviceSource {
    file: File,
    path: String,
}

impl ByteSource for DeviceSource {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        read_one(&mut self.file)
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")
    }

    fn release(&mut self) {
        debug!("releasing device {}", self.path);
    }
}

/// A launched subprocess; we read its stdout or stderr and may write its stdin.
pub struct SubprocessSource {
    child: Child,
    reader: Box<dyn Read + Send>,
    stdin: Option<ChildStdin>,
    command: String,
}

impl ByteSource for SubprocessSource {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        read_one(&mut self.reader)
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match &mut self.stdin {
            Some(stdin) => {
                stdin.write_all(line.as_bytes())?;
                stdin.write_all(b"\n")?;
                stdin.flush()
            }
            None => Ok(()),
        }
    }

    fn release(&mut self) {
        self.stdin.take();
        if let Err(e) = self.child.kill() {
            debug!("child for '{}' already gone: {e}", self.command);
        }
        match self.child.wait() {
            Ok(status) => debug!("command '{}' exited: {status}", self.command),
            Err(e) => warn!("failed to reap command '{}': {e}", self.command),
        }
    }
}

/// Open the byte source this session is configured for. Open failures are
/// resource errors and carry the underlying OS error.
pub fn open_source(config: &SessionConfig) -> Result<Box<dyn ByteSource + Send>> {
    match &config.source {
        SourceMode::Stdin => Ok(Box::new(StdinSource { stdin: io::stdin() })),
        SourceMode::Device(path) => {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)
                .map_err(|e| Error::Source(format!("cannot open device '{path}': {e}")))?;
            debug!("opened device {path}");
            Ok(Box::new(DeviceSource {
                file,
                path: path.clone(),
            }))
        }
        SourceMode::Command(cmdline) => {
            let argv = shell_words::split(cmdline)
                .map_err(|e| Error::Config(format!("cannot parse command '{cmdline}': {e}")))?;
            let program = argv
                .first()
                .ok_or_else(|| Error::Config("empty command".to_string()))?;
            let mut command = Command::new(program);
            command.args(&argv[1..]).stdin(Stdio::piped());
            if config.read_stderr {
                command.stdout(Stdio::inherit()).stderr(Stdio::piped());
            } else {
                command.stdout(Stdio::piped()).stderr(Stdio::inherit());
            }
            let mut child = command
                .spawn()
                .map_err(|e| Error::Source(format!("cannot launch '{cmdline}': {e}")))?;
            let reader: Box<dyn Read + Send> = if config.read_stderr {
                Box::new(child.stderr.take().ok_or_else(|| {
                    Error::Source(format!("no stderr handle for '{cmdline}'"))
                })?)
            } else {
                Box::new(child.stdout.take().ok_or_else(|| {
                    Error::Source(format!("no stdout handle for '{cmdline}'"))
                })?)
            };
            let stdin = child.stdin.take();
            debug!("launched command '{cmdline}' (pid {})", child.id());
            Ok(Box::new(SubprocessSource {
                child,
                reader,
                stdin,
                command: cmdline.clone(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_config(cmd: &str) -> SessionConfig {
        SessionConfig {
            source: SourceMode::Command(cmd.to_string()),
            timing: None,
            quiet: false,
            append: false,
            cr_to_newline: false,
            read_stderr: false,
            base_pattern: None,
            inline_pattern: None,
            quit_pattern: None,
            endtime: None,
            restart: false,
            launchtime: false,
            output: None,
        }
    }

    #[test]
    fn test_subprocess_source_reads_stdout() {
        let config = command_config("printf ab");
        let mut source = open_source(&config).unwrap();
        assert_eq!(source.read_byte().unwrap(), Some(b'a'));
        assert_eq!(source.read_byte().unwrap(), Some(b'b'));
        assert_eq!(source.read_byte().unwrap(), None);
        source.release();
    }

    #[test]
    fn test_empty_command_is_config_error() {
        let config = command_config("   ");
        assert!(open_source(&config).is_err());
    }

    #[test]
    fn test_stdin_source_is_send() {
        fn assert_send(_: &(dyn ByteSource + Send)) {}
        let mut config = command_config("true");
        config.source = SourceMode::Stdin;
        let source = open_source(&config).unwrap();
        assert_send(source.as_ref());
    }

    #[test]
    fn test_missing_device_is_resource_error() {
        let mut config = command_config("true");
        config.source = SourceMode::Device("/nonexistent/device".to_string());
        let err = open_source(&config).err().unwrap();
        assert!(!err.is_config());
    }
}
