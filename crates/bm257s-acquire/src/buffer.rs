use std::collections::VecDeque;
use std::time::Duration;

use bm257s_frame::Frame;
use chrono::{DateTime, Local};
use parking_lot::{Condvar, Mutex};

use crate::error::{AcquireError, Result};

/// Items that can live in a time-windowed [`RollingBuffer`].
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Local>;
}

impl Timestamped for Frame {
    fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

/// How long items stay in a [`RollingBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Keep the last `n` items (at least one).
    Count(usize),
    /// Keep items whose timestamps lie within this span of the newest one.
    Window(Duration),
}

impl Default for Retention {
    fn default() -> Self {
        Retention::Count(1)
    }
}

enum Limit<T> {
    Count(usize),
    Window {
        span: Duration,
        timestamp: fn(&T) -> DateTime<Local>,
    },
}

/// Thread-safe store of recent items.
///
/// Every mutation happens under one mutex; [`wait`](Self::wait) blocks on a
/// condition variable tied to that mutex, so a waiting consumer never holds
/// the lock the producer needs to append.
pub struct RollingBuffer<T> {
    items: Mutex<VecDeque<T>>,
    nonempty: Condvar,
    limit: Limit<T>,
}

impl<T> RollingBuffer<T> {
    /// A buffer that keeps only the newest item.
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// A buffer that keeps the newest `capacity` items. A capacity of zero is
    /// treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            nonempty: Condvar::new(),
            limit: Limit::Count(capacity),
        }
    }

    /// A buffer that keeps items no older than `span` relative to the newest.
    pub fn with_window(span: Duration) -> Self
    where
        T: Timestamped,
    {
        Self {
            items: Mutex::new(VecDeque::new()),
            nonempty: Condvar::new(),
            limit: Limit::Window {
                span,
                timestamp: T::timestamp,
            },
        }
    }

    pub fn from_retention(retention: Retention) -> Self
    where
        T: Timestamped,
    {
        match retention {
            Retention::Count(capacity) => Self::with_capacity(capacity),
            Retention::Window(span) => Self::with_window(span),
        }
    }

    /// Add an item, evicting whatever the retention no longer allows.
    pub fn append(&self, item: T) {
        let mut items = self.items.lock();
        items.push_back(item);
        match &self.limit {
            Limit::Count(capacity) => {
                while items.len() > *capacity {
                    items.pop_front();
                }
            }
            Limit::Window { span, timestamp } => {
                if let Some(newest) = items.back().map(timestamp) {
                    // Items stamped after the newest one (the clock stepped
                    // back) are evicted as well.
                    items.retain(|item| {
                        (newest - timestamp(item))
                            .to_std()
                            .is_ok_and(|age| age <= *span)
                    });
                }
            }
        }
        self.nonempty.notify_all();
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Block until the buffer holds something or `timeout` elapses. Returns
    /// whether there was data.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut items = self.items.lock();
        if items.is_empty() {
            self.nonempty
                .wait_while_for(&mut items, |items| items.is_empty(), timeout);
        }
        !items.is_empty()
    }

    /// The newest item. With `clear`, the buffer is emptied in the same
    /// critical section.
    pub fn read_latest(&self, clear: bool) -> Result<T>
    where
        T: Clone,
    {
        let mut items = self.items.lock();
        if clear {
            let latest = items.pop_back().ok_or(AcquireError::EmptyBuffer)?;
            items.clear();
            Ok(latest)
        } else {
            items.back().cloned().ok_or(AcquireError::EmptyBuffer)
        }
    }

    /// Every item, oldest first. With `clear`, the buffer is emptied in the
    /// same critical section.
    pub fn read_all(&self, clear: bool) -> Vec<T>
    where
        T: Clone,
    {
        let mut items = self.items.lock();
        if clear {
            items.drain(..).collect()
        } else {
            items.iter().cloned().collect()
        }
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }
}

impl<T> Default for RollingBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for RollingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let retention = match &self.limit {
            Limit::Count(capacity) => Retention::Count(*capacity),
            Limit::Window { span, .. } => Retention::Window(*span),
        };
        f.debug_struct("RollingBuffer")
            .field("len", &self.len())
            .field("retention", &retention)
            .finish()
    }
}
