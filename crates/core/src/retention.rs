// Retention buffer
//
// Time-bounded, timestamp-ordered sequence of events. The coordinator is the
// only writer, so insertion order is time order and trimming is always a
// prefix drop located by binary search.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::message::Event;

/// Default retention horizon (7 days)
pub fn default_max_age() -> Duration {
    Duration::days(7)
}

/// Ordered, time-bounded event history
#[derive(Debug, Clone)]
pub struct RetentionBuffer {
    events: VecDeque<Event>,
    max_age: Duration,
}

impl RetentionBuffer {
    pub fn new(max_age: Duration) -> Self {
        Self {
            events: VecDeque::new(),
            max_age,
        }
    }

    /// Rebuild a buffer from persisted events.
    ///
    /// Events are stably sorted by timestamp (ties keep their stored order)
    /// and anything older than the horizon relative to `now` is dropped.
    pub fn from_events(mut events: Vec<Event>, max_age: Duration, now: DateTime<Utc>) -> Self {
        events.sort_by_key(|e| e.time);
        let mut buffer = Self {
            events: events.into(),
            max_age,
        };
        buffer.trim(now - max_age);
        buffer
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Append an event to the tail, trimming with `now - max_age` first.
    pub fn append(&mut self, event: Event, now: DateTime<Utc>) {
        self.trim(now - self.max_age);
        debug_assert!(self.latest().map_or(true, |last| last.time <= event.time));
        self.events.push_back(event);
    }

    /// Remove every event with `time <= before`. Returns how many were dropped.
    pub fn trim(&mut self, before: DateTime<Utc>) -> usize {
        let keep_from = self.events.partition_point(|e| e.time <= before);
        self.events.drain(..keep_from);
        keep_from
    }

    /// Copy of up to `limit` most recent events, oldest first.
    pub fn snapshot(&self, limit: Option<usize>) -> Vec<Event> {
        let skip = limit.map_or(0, |limit| self.events.len().saturating_sub(limit));
        self.events.iter().skip(skip).cloned().collect()
    }

    pub fn latest(&self) -> Option<&Event> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for RetentionBuffer {
    fn default() -> Self {
        Self::new(default_max_age())
    }
}
