use std::collections::{HashMap, VecDeque};

use rental_hub_core::{Address, Envelope, Kind};

/// A reply remembered together with the request that produced it.
#[derive(Debug)]
struct Entry {
    kind: Kind,
    body: String,
    reply: Envelope,
}

/// Bounded memory of replies already sent, keyed by `(sender, thread)`.
///
/// A retried request carries the thread and content of the first send;
/// answering it from here keeps its effect exactly-once. A request that reuses
/// a thread with different content is a new request and is not answered from
/// here.
#[derive(Debug)]
pub(crate) struct ReplyCache {
    capacity: usize,
    order: VecDeque<(Address, u64)>,
    replies: HashMap<(Address, u64), Entry>,
}

impl ReplyCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            replies: HashMap::with_capacity(capacity),
        }
    }

    /// The reply sent for an identical earlier `request`, if remembered.
    pub(crate) fn get(&self, request: &Envelope) -> Option<&Envelope> {
        let thread = request.thread?;
        self.replies
            .get(&(request.sender.clone(), thread))
            .filter(|entry| entry.kind == request.kind && entry.body == request.body)
            .map(|entry| &entry.reply)
    }

    /// Remembers `reply` as the answer to `request`. Requests without a thread
    /// cannot be retried and are not remembered.
    pub(crate) fn insert(&mut self, request: &Envelope, reply: Envelope) {
        let Some(thread) = request.thread else { return };
        if self.capacity == 0 {
            return;
        }
        let key = (request.sender.clone(), thread);
        let entry = Entry {
            kind: request.kind,
            body: request.body.clone(),
            reply,
        };
        if self.replies.insert(key.clone(), entry).is_none() {
            self.order.push_back(key);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.replies.remove(&oldest);
            }
        }
    }
}
