// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Background driver thread for a REQ socket.
//!
//! [`Req`] is a plain single-owner state machine: resends only happen when
//! somebody calls [`Req::process_timers`]. The driver owns the socket on a
//! dedicated thread, fires timers as they come due and serializes every
//! application call through a command channel, so resends and user
//! operations never overlap.
//!
//! # Architecture
//!
//! ```text
//! +------------------------------+          +------------------------------+
//! |   Application thread         |          |   spreq-driver thread        |
//! |                              |  Command |                              |
//! |   ReqHandle ------------------+--------->|   loop {                     |
//! |     send / recv_timeout      |          |     process_timers()         |
//! |     request / options        |<---------+     retry pending recv       |
//! |                              |  reply   |     wait for next command,   |
//! +------------------------------+ (bounded)|     timer or poll tick       |
//!                                           |   }                          |
//!                                           +------------------------------+
//! ```
//!
//! The driver computes the wait from the socket's [`Timer`] deadline, so it
//! must be paired with a wall-clock timer (the default [`DeadlineTimer`]).
//!
//! [`DeadlineTimer`]: crate::timer::DeadlineTimer

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::config::ReqConfig;
use crate::error::{Error, Result};
use crate::metrics::ReqMetrics;
use crate::raw::RawSocket;
use crate::req::Req;
use crate::timer::{self, Timer};

/// Driver thread name
const THREAD_NAME: &str = "spreq-driver";

// ============================================================================
// Commands (handle -> driver)
// ============================================================================

enum Command {
    Send {
        payload: Vec<u8>,
        reply: Sender<Result<()>>,
    },
    /// `deadline: None` tries exactly once
    Recv {
        deadline: Option<Instant>,
        reply: Sender<Result<Vec<u8>>>,
    },
    SetResendInterval {
        interval: Duration,
        reply: Sender<Result<()>>,
    },
    GetResendInterval {
        reply: Sender<Duration>,
    },
    Shutdown,
}

/// A `recv` parked until a reply arrives or its deadline passes.
struct WaitingRecv {
    deadline: Instant,
    reply: Sender<Result<Vec<u8>>>,
}

// ============================================================================
// Driver (thread side)
// ============================================================================

/// Owns a [`Req`] on a background thread.
pub struct ReqDriver<R: RawSocket, T: Timer> {
    req: Req<R, T>,
    commands: Receiver<Command>,
    poll_interval: Duration,
    waiting: Option<WaitingRecv>,
}

impl<R, T> ReqDriver<R, T>
where
    R: RawSocket + 'static,
    T: Timer + 'static,
{
    /// Move `req` onto a new driver thread and return the handle that talks
    /// to it.
    ///
    /// `config.poll_interval` bounds how long a blocked receive waits before
    /// checking the raw socket again. The socket keeps its own resend
    /// interval.
    pub fn spawn(req: Req<R, T>, config: &ReqConfig) -> Result<ReqHandle> {
        config.validate()?;

        let (tx, rx) = channel::unbounded();
        let metrics = Arc::clone(req.metrics());
        let driver = Self {
            req,
            commands: rx,
            poll_interval: config.poll_interval,
            waiting: None,
        };

        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || driver.run())?;

        log::debug!(
            "[req-driver] Spawned {} (poll interval {:?})",
            THREAD_NAME,
            config.poll_interval
        );

        Ok(ReqHandle {
            commands: tx,
            metrics,
            thread: Some(thread),
        })
    }

    fn run(mut self) {
        loop {
            self.req.process_timers();
            self.retry_waiting();

            let command = match self.next_wait() {
                Some(wait) => match self.commands.recv_timeout(wait) {
                    Ok(command) => command,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match self.commands.recv() {
                    Ok(command) => command,
                    Err(_) => break,
                },
            };

            if !self.handle(command) {
                break;
            }
        }

        log::debug!("[req-driver] Stopped");
    }

    /// Apply one command. Returns `false` on shutdown.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Send { payload, reply } => {
                let _ = reply.send(self.req.send(&payload));
            }
            Command::Recv { deadline, reply } => match (self.req.recv(), deadline) {
                (Err(Error::WouldBlock), Some(deadline)) => {
                    self.waiting = Some(WaitingRecv { deadline, reply });
                }
                (result, _) => {
                    let _ = reply.send(result);
                }
            },
            Command::SetResendInterval { interval, reply } => {
                let _ = reply.send(self.req.set_resend_interval(interval));
            }
            Command::GetResendInterval { reply } => {
                let _ = reply.send(self.req.resend_interval());
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn retry_waiting(&mut self) {
        let Some(waiting) = self.waiting.take() else {
            return;
        };

        match self.req.recv() {
            Err(Error::WouldBlock) if Instant::now() < waiting.deadline => {
                self.waiting = Some(waiting);
            }
            Err(Error::WouldBlock) => {
                let _ = waiting.reply.send(Err(Error::Timeout));
            }
            result => {
                let _ = waiting.reply.send(result);
            }
        }
    }

    /// How long to block for the next command; `None` means indefinitely.
    fn next_wait(&self) -> Option<Duration> {
        let now = Instant::now();
        let mut wait = self
            .req
            .next_timer_deadline()
            .map(|deadline| deadline.saturating_duration_since(now));

        if let Some(waiting) = &self.waiting {
            let until = waiting
                .deadline
                .saturating_duration_since(now)
                .min(self.poll_interval);
            wait = Some(wait.map_or(until, |w| w.min(until)));
        }
        wait
    }
}

// ============================================================================
// Handle (application side)
// ============================================================================

/// Application-side handle to a driven REQ socket.
///
/// Dropping the handle stops the driver thread and closes the socket.
pub struct ReqHandle {
    commands: Sender<Command>,
    metrics: Arc<ReqMetrics>,
    thread: Option<JoinHandle<()>>,
}

impl ReqHandle {
    /// Send a request, superseding any request still in progress.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        let (reply, rx) = channel::bounded(1);
        self.call(
            Command::Send {
                payload: payload.to_vec(),
                reply,
            },
            &rx,
        )?
    }

    /// Check once for the reply without waiting.
    pub fn try_recv(&mut self) -> Result<Vec<u8>> {
        let (reply, rx) = channel::bounded(1);
        self.call(
            Command::Recv {
                deadline: None,
                reply,
            },
            &rx,
        )?
    }

    /// Wait up to `timeout` for the reply. Resends keep going while waiting.
    /// Timeouts beyond [`MAX_DELAY`](crate::timer::MAX_DELAY) are capped.
    ///
    /// Returns [`Error::Timeout`] if no reply arrives in time; the request
    /// stays in progress and can be waited on again.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let (reply, rx) = channel::bounded(1);
        self.call(
            Command::Recv {
                deadline: Some(timer::deadline_after(Instant::now(), timeout)),
                reply,
            },
            &rx,
        )?
    }

    /// Send `payload` and wait up to `timeout` for its reply.
    pub fn request(&mut self, payload: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        self.send(payload)?;
        self.recv_timeout(timeout)
    }

    /// Change the resend interval; an already armed timer keeps its deadline.
    ///
    /// Intervals the socket cannot represent are rejected with
    /// `InvalidArgument`.
    pub fn set_resend_interval(&mut self, interval: Duration) -> Result<()> {
        let (reply, rx) = channel::bounded(1);
        self.call(Command::SetResendInterval { interval, reply }, &rx)?
    }

    /// Current resend interval of the driven socket.
    pub fn resend_interval(&mut self) -> Result<Duration> {
        let (reply, rx) = channel::bounded(1);
        self.call(Command::GetResendInterval { reply }, &rx)
    }

    /// Counters of the driven socket.
    pub fn metrics(&self) -> Arc<ReqMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Stop the driver and close the socket. Equivalent to dropping.
    pub fn close(self) {
        drop(self);
    }

    fn call<V>(&self, command: Command, rx: &Receiver<V>) -> Result<V> {
        self.commands.send(command).map_err(|_| Error::Closed)?;
        rx.recv().map_err(|_| Error::Closed)
    }
}

impl Drop for ReqHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("[req-driver] {} panicked", THREAD_NAME);
            }
        }
    }
}
