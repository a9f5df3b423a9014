// src/manager/debounce.rs
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, trace};

use crate::error::Result;

enum TimerCommand {
    Reset,
    Cancel,
}

/// Single-shot timer that fires `delay` after the most recent `trigger`.
///
/// Each trigger pushes the deadline back; the callback runs at most once per
/// quiet period, on the timer's own thread.
pub struct Debouncer {
    delay: Duration,
    sender: Option<Sender<TimerCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new<F>(delay: Duration, on_fire: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (sender, receiver) = unbounded();
        let worker = thread::Builder::new()
            .name("cluster-debounce".to_string())
            .spawn(move || run_timer(receiver, delay, on_fire))?;

        Ok(Self {
            delay,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)starts the countdown.
    pub fn trigger(&self) {
        self.send(TimerCommand::Reset);
    }

    /// Drops a pending countdown without firing.
    pub fn cancel(&self) {
        self.send(TimerCommand::Cancel);
    }

    fn send(&self, command: TimerCommand) {
        if let Some(sender) = &self.sender {
            if sender.send(command).is_err() {
                debug!("Debounce timer has already stopped");
            }
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        // Disconnecting the channel stops the timer thread
        self.sender = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Debounce timer thread panicked");
            }
        }
    }
}

fn run_timer<F: Fn()>(receiver: Receiver<TimerCommand>, delay: Duration, on_fire: F) {
    let mut deadline: Option<Instant> = None;
    loop {
        let command = match deadline {
            None => match receiver.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
            Some(at) => match receiver.recv_deadline(at) {
                Ok(command) => command,
                Err(RecvTimeoutError::Timeout) => {
                    deadline = None;
                    trace!("Debounce timer fired");
                    on_fire();
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
        };

        deadline = match command {
            TimerCommand::Reset => Some(Instant::now() + delay),
            TimerCommand::Cancel => None,
        };
    }
    trace!("Debounce timer stopped");
}
