//! Session driver: opens the configured resources, runs the byte-stream
//! engine, and re-invokes it with identical configuration while the engine
//! asks for a restart. There is no backoff and no retry limit; restart is
//! operator intent, not failure recovery.

use crate::config::{SessionConfig, SourceMode};
use crate::engine::Engine;
use crate::error::Result;
use crate::forward::InputForwarder;
use crate::sink::OutputSink;
use crate::source::open_source;
use chrono::Local;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Set from the signal handler, observed by the engine between bytes and
/// via EINTR on the blocking read.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_interrupt(_signal: nix::libc::c_int) {
    INTERRUPTED.store(true, Ordering::Relaxed);
}

/// Install the SIGINT handler without SA_RESTART: a read blocked on a silent
/// source must return EINTR rather than be transparently restarted, or the
/// interrupt could not surface until the next byte arrives.
fn install_interrupt_handler() {
    INTERRUPTED.store(false, Ordering::Relaxed);
    let action = SigAction::new(
        SigHandler::Handler(on_interrupt),
        SaFlags::empty(),
        SigSet::empty(),
    );
    if let Err(e) = unsafe { sigaction(Signal::SIGINT, &action) } {
        warn!("cannot register interrupt handler: {e}");
    }
}

/// Run one session until the engine stops without requesting a restart.
pub fn run_session(config: &SessionConfig) -> Result<()> {
    config.validate()?;

    install_interrupt_handler();

    // Only device/subprocess sources leave our stdin free for forwarding.
    let forwarder = match config.source {
        SourceMode::Stdin => None,
        _ => InputForwarder::spawn(),
    };

    loop {
        let mut source = open_source(config)?;
        let live: Option<Box<dyn Write + Send>> = if config.quiet {
            None
        } else {
            Some(Box::new(io::stdout()))
        };
        let mut sink = OutputSink::new(live, config.output.clone(), config.append)?;

        let engine = Engine::new(config, &INTERRUPTED);
        let outcome = engine.run(source.as_mut(), &mut sink, forwarder.as_ref())?;
        if !outcome.restart {
            return Ok(());
        }
        info!(
            "restarting capture at {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.6f")
        );
    }
}
