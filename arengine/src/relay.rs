//! Transport for `Remoted` animations shared between participants.
//!
//! Every participant holds a [`Peer`] of the same [`RelayHub`]. A sent
//! message is parked in the hub until the hub is stepped, then it is
//! delivered to every peer, the sender included. The sender's own copy is
//! the echo that finally starts the animation locally, so all participants
//! start it from the same tick.

use crate::units::Ticks;
use std::{cell::RefCell, collections::VecDeque, rc::Rc};
use thiserror::Error;
use tracing::{debug, trace};

pub trait RelayMessage {
    /// Short label for the trace output
    fn label(&self) -> &str;
}

/// An animation activation offered to, or echoed back by, the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteAnimation {
    pub name: String,
    /// Tick the sender wanted the animation to start from
    pub start: Ticks,
}

impl RelayMessage for RemoteAnimation {
    fn label(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("The relay is holding {0} undelivered messages already")]
    Backlogged(usize),
    #[error("Inbox of peer {0} is full")]
    InboxFull(usize),
}

/// Stepping delivers whatever is in flight
pub trait Step {
    /// Returns the number of messages delivered.
    fn step(&mut self) -> Result<usize, RelayError>;
}

#[derive(Debug, Clone)]
struct Envelope<T> {
    from: usize,
    seq: u64,
    item: T,
}

#[derive(Debug)]
struct Mailbox<T> {
    inbox: VecDeque<Envelope<T>>,
    capacity: Option<usize>,
}

#[derive(Debug)]
struct Shared<T> {
    in_flight: VecDeque<Envelope<T>>,
    max_in_flight: Option<usize>,
    next_seq: u64,
}

#[derive(Debug)]
pub struct RelayHub<T> {
    shared: Rc<RefCell<Shared<T>>>,
    peers: Vec<Rc<RefCell<Mailbox<T>>>>,
}

impl<T> Default for RelayHub<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<T> RelayHub<T> {
    /// `max_in_flight` bounds the messages sent but not yet delivered.
    pub fn new(max_in_flight: impl Into<Option<usize>>) -> Self {
        RelayHub {
            shared: Rc::new(RefCell::new(Shared {
                in_flight: VecDeque::new(),
                max_in_flight: max_in_flight.into(),
                next_seq: 0,
            })),
            peers: Vec::new(),
        }
    }

    /// Joins a new participant, optionally with a bounded inbox.
    pub fn join(&mut self, inbox_capacity: impl Into<Option<usize>>) -> Peer<T> {
        let mailbox = Rc::new(RefCell::new(Mailbox {
            inbox: VecDeque::new(),
            capacity: inbox_capacity.into(),
        }));
        self.peers.push(mailbox.clone());
        Peer {
            id: self.peers.len() - 1,
            shared: self.shared.clone(),
            mailbox,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.shared.borrow().in_flight.len()
    }
}

impl<T: Clone + RelayMessage> Step for RelayHub<T> {
    fn step(&mut self) -> Result<usize, RelayError> {
        let mut shared = self.shared.borrow_mut();
        let mut delivered = 0;
        while let Some(env) = shared.in_flight.front() {
            for (peer, mailbox) in self.peers.iter().enumerate() {
                let mailbox = mailbox.borrow();
                if mailbox.capacity.is_some_and(|c| mailbox.inbox.len() >= c) {
                    return Err(RelayError::InboxFull(peer));
                }
            }
            for mailbox in self.peers.iter() {
                mailbox.borrow_mut().inbox.push_back(env.clone());
            }
            trace!(
                animation = env.item.label(),
                from = env.from,
                seq = env.seq,
                "Relay deliver"
            );
            shared.in_flight.pop_front();
            delivered += 1;
        }
        if delivered > 0 {
            debug!(delivered, peers = self.peers.len(), "Relay stepped");
        }
        Ok(delivered)
    }
}

/// One participant's handle on the relay. Clones share the same inbox.
#[derive(Debug)]
pub struct Peer<T> {
    id: usize,
    shared: Rc<RefCell<Shared<T>>>,
    mailbox: Rc<RefCell<Mailbox<T>>>,
}

impl<T> Clone for Peer<T> {
    fn clone(&self) -> Self {
        Peer {
            id: self.id,
            shared: self.shared.clone(),
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<T: RelayMessage> Peer<T> {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn send(&self, item: T) -> Result<(), RelayError> {
        let mut shared = self.shared.borrow_mut();
        if let Some(max) = shared.max_in_flight {
            if shared.in_flight.len() >= max {
                return Err(RelayError::Backlogged(max));
            }
        }
        let seq = shared.next_seq;
        shared.next_seq += 1;
        trace!(animation = item.label(), from = self.id, seq, "Relay send");
        shared.in_flight.push_back(Envelope {
            from: self.id,
            seq,
            item,
        });
        Ok(())
    }

    pub fn recv(&self) -> Option<T> {
        let env = self.mailbox.borrow_mut().inbox.pop_front()?;
        trace!(
            animation = env.item.label(),
            peer = self.id,
            from = env.from,
            seq = env.seq,
            "Relay recv"
        );
        Some(env.item)
    }

    /// Drops everything delivered but not yet received.
    pub fn clear(&self) {
        self.mailbox.borrow_mut().inbox.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anim(name: &str) -> RemoteAnimation {
        RemoteAnimation {
            name: name.to_owned(),
            start: Ticks::ZERO,
        }
    }

    #[test]
    fn delivery_waits_for_step_and_echoes_to_sender() {
        let mut hub = RelayHub::default();
        let alice = hub.join(None);
        let bob = hub.join(None);

        alice.send(anim("spin")).unwrap();
        assert!(alice.recv().is_none());
        assert!(bob.recv().is_none());
        assert_eq!(hub.in_flight(), 1);

        assert_eq!(hub.step(), Ok(1));
        assert_eq!(alice.recv(), Some(anim("spin")));
        assert_eq!(bob.recv(), Some(anim("spin")));
        assert!(alice.recv().is_none());
        assert_eq!(hub.step(), Ok(0));
    }

    #[test]
    fn clones_share_an_inbox() {
        let mut hub = RelayHub::default();
        let peer = hub.join(None);
        let other_handle = peer.clone();
        peer.send(anim("a")).unwrap();
        hub.step().unwrap();
        assert_eq!(other_handle.id(), peer.id());
        assert_eq!(other_handle.recv(), Some(anim("a")));
        assert!(peer.recv().is_none());
    }

    #[test]
    fn backlog_is_bounded() {
        let mut hub = RelayHub::new(1);
        let peer = hub.join(None);
        peer.send(anim("a")).unwrap();
        assert_eq!(peer.send(anim("b")), Err(RelayError::Backlogged(1)));
        hub.step().unwrap();
        peer.send(anim("c")).unwrap();
    }

    #[test]
    fn full_inbox_keeps_message_in_flight() {
        let mut hub = RelayHub::default();
        let peer = hub.join(1);
        peer.send(anim("a")).unwrap();
        peer.send(anim("b")).unwrap();
        assert_eq!(hub.step(), Err(RelayError::InboxFull(0)));
        assert_eq!(hub.in_flight(), 1);

        peer.clear();
        assert_eq!(hub.step(), Ok(1));
        assert_eq!(peer.recv(), Some(anim("b")));
    }
}
