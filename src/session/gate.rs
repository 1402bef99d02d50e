//! Producer announcement gate
//!
//! Announcements that arrive before both transports exist are held here in
//! arrival order. Opening the gate hands the whole backlog back in one step
//! and from then on every announcement passes straight through.

use std::collections::VecDeque;

use crate::signaling::ProducerAnnouncement;

/// What to do with an announcement
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Consume it now
    Consume(ProducerAnnouncement),
    /// Held until the gate opens
    Queued,
    /// Session is gone
    Rejected,
}

/// Gate state
#[derive(Debug, Clone, PartialEq)]
pub enum ProducerGate {
    /// Not ready yet; announcements are held
    Queueing(VecDeque<ProducerAnnouncement>),
    /// Ready; announcements pass through
    Open,
    /// Terminated; announcements are ignored
    Closed,
}

impl Default for ProducerGate {
    fn default() -> Self {
        ProducerGate::Queueing(VecDeque::new())
    }
}

impl ProducerGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one announcement
    pub fn admit(&mut self, announcement: ProducerAnnouncement) -> Admission {
        match self {
            ProducerGate::Queueing(queue) => {
                tracing::debug!(
                    producer = %announcement.producer_id,
                    peer = %announcement.socket_id,
                    pending = queue.len() + 1,
                    "Producer queued until ready"
                );
                queue.push_back(announcement);
                Admission::Queued
            }
            ProducerGate::Open => Admission::Consume(announcement),
            ProducerGate::Closed => Admission::Rejected,
        }
    }

    /// Open the gate and take the backlog, oldest first
    ///
    /// State swap and hand-over are one step. Opening an open or closed gate
    /// returns nothing.
    pub fn open(&mut self) -> Vec<ProducerAnnouncement> {
        if !matches!(self, ProducerGate::Queueing(_)) {
            return Vec::new();
        }
        match std::mem::replace(self, ProducerGate::Open) {
            ProducerGate::Queueing(queue) => queue.into(),
            _ => Vec::new(),
        }
    }

    /// Forget every held announcement from one peer
    pub fn discard_peer(&mut self, peer_id: &str) -> usize {
        match self {
            ProducerGate::Queueing(queue) => {
                let before = queue.len();
                queue.retain(|a| a.socket_id != peer_id);
                before - queue.len()
            }
            _ => 0,
        }
    }

    /// Close for good, dropping the backlog
    pub fn close(&mut self) -> usize {
        match std::mem::replace(self, ProducerGate::Closed) {
            ProducerGate::Queueing(queue) => queue.len(),
            _ => 0,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ProducerGate::Open)
    }

    /// Number of held announcements
    pub fn pending(&self) -> usize {
        match self {
            ProducerGate::Queueing(queue) => queue.len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann(producer: &str, peer: &str) -> ProducerAnnouncement {
        ProducerAnnouncement::new(producer, peer)
    }

    #[test]
    fn test_queue_then_drain_in_order() {
        let mut gate = ProducerGate::new();

        assert_eq!(gate.admit(ann("p1", "a")), Admission::Queued);
        assert_eq!(gate.admit(ann("p2", "b")), Admission::Queued);
        assert_eq!(gate.admit(ann("p3", "a")), Admission::Queued);

        let backlog: Vec<String> = gate.open().into_iter().map(|a| a.producer_id).collect();
        assert_eq!(backlog, vec!["p1", "p2", "p3"]);
        assert!(gate.is_open());

        // Drained exactly once
        assert!(gate.open().is_empty());
        assert_eq!(gate.admit(ann("p4", "c")), Admission::Consume(ann("p4", "c")));
    }

    #[test]
    fn test_discard_peer() {
        let mut gate = ProducerGate::new();
        gate.admit(ann("p1", "a"));
        gate.admit(ann("p2", "b"));
        gate.admit(ann("p3", "a"));

        assert_eq!(gate.discard_peer("a"), 2);
        assert_eq!(gate.discard_peer("a"), 0);

        let backlog = gate.open();
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].socket_id, "b");
    }

    #[test]
    fn test_closed_rejects() {
        let mut gate = ProducerGate::new();
        gate.admit(ann("p1", "a"));

        assert_eq!(gate.close(), 1);
        assert_eq!(gate.admit(ann("p2", "a")), Admission::Rejected);
        assert!(gate.open().is_empty());
        assert!(!gate.is_open());
    }
}
