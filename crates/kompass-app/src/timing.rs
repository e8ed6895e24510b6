// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Deferred work driven by caller-supplied instants. Nothing here sleeps or
//! spawns; the event loop polls with the current time.

use std::time::{Duration, Instant};

pub const SUMMARY_DEBOUNCE: Duration = Duration::from_millis(10);
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(50);
pub const CLICK_WINDOW: Duration = Duration::from_millis(200);

/// Collapses a burst of pokes into one firing `window` after the last poke.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn poke(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction<T> {
    Single(T),
    Double(T),
}

/// Tells single clicks from double clicks on the same target.
///
/// A single click is only reported once the window has passed without a
/// second click, so a double click never also produces a single.
#[derive(Debug, Clone)]
pub struct ClickResolver<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T: PartialEq> ClickResolver<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Registers a click. Returns a double click when it pairs with the
    /// pending one, or flushes an unrelated pending click as a single.
    pub fn click(&mut self, target: T, now: Instant) -> Option<ClickAction<T>> {
        match self.pending.take() {
            Some((pending, at)) if pending == target && now.duration_since(at) < self.window => {
                Some(ClickAction::Double(target))
            }
            previous => {
                self.pending = Some((target, now));
                previous.map(|(pending, _)| ClickAction::Single(pending))
            }
        }
    }

    pub fn poll(&mut self, now: Instant) -> Option<ClickAction<T>> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|(_, at)| now.duration_since(*at) >= self.window);
        if !due {
            return None;
        }
        self.pending.take().map(|(target, _)| ClickAction::Single(target))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.window)
    }
}
