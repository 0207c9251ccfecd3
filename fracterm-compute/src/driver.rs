//! Runs a [`Session`] on its own thread so the host's input loop never blocks
//! on a frame.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::cancellation::GenerationCounter;
use crate::commands::Command;
use crate::session::{FrameReport, Session};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("frame driver has stopped")]
pub struct DriverClosed;

enum DriverMessage {
    Command(Command),
    Render,
    Shutdown,
}

pub struct FrameDriver;

impl FrameDriver {
    /// Move `session` onto a new thread. Reports arrive on the returned receiver.
    pub fn spawn(
        session: Session,
    ) -> std::io::Result<(FrameDriverHandle, Receiver<FrameReport>)> {
        let (tx, rx) = mpsc::channel();
        let (report_tx, report_rx) = mpsc::channel();
        let generations = session.generations();

        let thread = thread::Builder::new()
            .name("fracterm-frames".to_string())
            .spawn(move || run(session, rx, report_tx))?;

        let handle = FrameDriverHandle {
            tx,
            generations,
            thread: Some(thread),
        };
        Ok((handle, report_rx))
    }
}

fn run(mut session: Session, rx: Receiver<DriverMessage>, reports: Sender<FrameReport>) {
    log::debug!("frame driver started");
    while let Ok(message) = rx.recv() {
        match message {
            DriverMessage::Command(command) => session.queue(command),
            DriverMessage::Render => {
                // Fold everything already waiting into this frame.
                let mut stop = false;
                loop {
                    match rx.try_recv() {
                        Ok(DriverMessage::Command(command)) => session.queue(command),
                        Ok(DriverMessage::Render) => {}
                        Ok(DriverMessage::Shutdown) | Err(TryRecvError::Disconnected) => {
                            stop = true;
                            break;
                        }
                        Err(TryRecvError::Empty) => break,
                    }
                }
                if stop {
                    break;
                }
                if reports.send(session.render_frame()).is_err() {
                    break;
                }
            }
            DriverMessage::Shutdown => break,
        }
    }
    log::debug!("frame driver stopped");
}

/// Host side of a running [`FrameDriver`].
pub struct FrameDriverHandle {
    tx: Sender<DriverMessage>,
    generations: GenerationCounter,
    thread: Option<JoinHandle<()>>,
}

impl FrameDriverHandle {
    /// Queue a command for the next frame.
    pub fn send(&self, command: Command) -> Result<(), DriverClosed> {
        self.tx
            .send(DriverMessage::Command(command))
            .map_err(|_| DriverClosed)
    }

    /// Ask for a frame, abandoning the one in progress.
    pub fn request_frame(&self) -> Result<(), DriverClosed> {
        self.generations.advance();
        self.tx.send(DriverMessage::Render).map_err(|_| DriverClosed)
    }

    /// Stop the driver and wait for its thread to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.tx.send(DriverMessage::Shutdown);
        self.generations.advance();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("frame driver thread panicked");
            }
        }
    }
}

impl Drop for FrameDriverHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
