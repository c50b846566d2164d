//! Background forwarding of interactive input to a driven device/subprocess.
//!
//! Only used when the byte source is not our own stdin (which the engine is
//! then free to read). A dedicated thread reads whole lines and hands them to
//! the engine over a bounded channel of capacity one; the sender blocks when
//! the engine has not drained the previous line yet.

use std::io::{self, BufRead};
use std::sync::mpsc::{sync_channel, Receiver, TryRecvError};
use std::thread;
use tracing::{debug, warn};

pub struct InputForwarder {
    rx: Receiver<String>,
}

impl InputForwarder {
    /// Start the forwarding thread. Spawn failure is reported and the
    /// session proceeds without forwarding.
    pub fn spawn() -> Option<Self> {
        let (tx, rx) = sync_channel::<String>(1);
        let spawned = thread::Builder::new()
            .name("input-forwarder".to_string())
            .spawn(move || {
                let stdin = io::stdin();
                for line in stdin.lock().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            debug!("input forwarder read error: {e}");
                            break;
                        }
                    }
                }
                // Our stdin hit EOF; the engine owns process lifetime, so
                // idle rather than exit.
                debug!("input forwarder idle after end of input");
                loop {
                    thread::park();
                }
            });
        match spawned {
            Ok(_) => Some(Self { rx }),
            Err(e) => {
                warn!("cannot start input forwarding: {e}");
                None
            }
        }
    }

    /// Take the pending line, if one is staged.
    pub fn try_take(&self) -> Option<String> {
        match self.rx.try_recv() {
            Ok(line) => Some(line),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}
