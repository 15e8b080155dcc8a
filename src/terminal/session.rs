//! One PTY-backed shell process, exclusively owned, with byte channels in
//! both directions. The process dies with the session, on every exit path.

use crate::errors::AppError;
use bytes::Bytes;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use std::path::Path;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Bounded output queue. When the remote peer falls behind by this many
/// chunks, the newest chunk is dropped (drop-newest overflow policy).
const OUTPUT_QUEUE: usize = 64;
const INPUT_QUEUE: usize = 64;
const READ_BUF: usize = 8192;

pub fn default_shell() -> String {
    if cfg!(windows) {
        "powershell.exe".to_string()
    } else {
        std::env::var("SHELL").unwrap_or_else(|_| "bash".to_string())
    }
}

pub struct ShellSession {
    child: Box<dyn Child + Send + Sync>,
    input_tx: mpsc::Sender<Bytes>,
    output_rx: Option<mpsc::Receiver<Bytes>>,
    // holds the controlling side of the PTY open for the child's lifetime
    _master: Box<dyn MasterPty + Send>,
}

impl ShellSession {
    /// Spawns `shell` on a fresh PTY with `workdir` as its cwd and the
    /// host environment inherited. Fails synchronously; on error no process
    /// exists and no session is created.
    pub fn spawn(workdir: &Path, shell: &str) -> Result<Self, AppError> {
        let pty = native_pty_system();
        let pair = pty
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| AppError::SpawnFailed(e.to_string()))?;

        let mut cmd = CommandBuilder::new(shell);
        cmd.cwd(workdir);
        cmd.env("TERM", "xterm-256color");
        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| AppError::SpawnFailed(e.to_string()))?;
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| AppError::SpawnFailed(e.to_string()))?;
        let mut writer = pair
            .master
            .take_writer()
            .map_err(|e| AppError::SpawnFailed(e.to_string()))?;

        let (output_tx, output_rx) = mpsc::channel(OUTPUT_QUEUE);
        std::thread::spawn(move || {
            let mut buf = [0u8; READ_BUF];
            loop {
                match reader.read(&mut buf) {
                    // EOF or EIO: the shell side of the PTY is gone
                    Ok(0) | Err(_) => break,
                    Ok(n) => match output_tx.try_send(Bytes::copy_from_slice(&buf[..n])) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            debug!(dropped = n, "output queue full, chunk dropped");
                        }
                        Err(TrySendError::Closed(_)) => break,
                    },
                }
            }
        });

        let (input_tx, mut input_rx) = mpsc::channel::<Bytes>(INPUT_QUEUE);
        std::thread::spawn(move || {
            while let Some(chunk) = input_rx.blocking_recv() {
                if writer.write_all(&chunk).is_err() {
                    break;
                }
                let _ = writer.flush();
            }
        });

        Ok(Self {
            child,
            input_tx,
            output_rx: Some(output_rx),
            _master: pair.master,
        })
    }

    /// Sender for bytes destined to the shell's input. Order-preserving;
    /// awaits when the input queue is full.
    pub fn writer(&self) -> mpsc::Sender<Bytes> {
        self.input_tx.clone()
    }

    /// Receiver for shell output. Closes when the shell exits. Can only be
    /// taken once; the session has exactly one consumer.
    pub fn take_output(&mut self) -> Option<mpsc::Receiver<Bytes>> {
        self.output_rx.take()
    }

    pub fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }

    pub fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }
}

impl Drop for ShellSession {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        // reap; returns promptly after kill, immediately if already exited
        let _ = self.child.wait();
    }
}
