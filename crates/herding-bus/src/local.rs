//! In-process bus for a cohort running inside one process.
//!
//! [`LocalHub`] holds the roster of registered agents and their inboxes;
//! each agent talks through its own [`LocalBus`] handle. Delivery is an
//! immediate append to the receiver's inbox.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use herding_types::{CoordinationMessage, Envelope};
use tracing::debug;

use crate::MessageBus;
use crate::error::BusError;
use crate::inbox::Inbox;

/// Registry of every agent's inbox.
#[derive(Debug, Clone, Default)]
pub struct LocalHub {
    inboxes: Arc<Mutex<BTreeMap<String, Inbox>>>,
}

impl LocalHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the hub as `name` and get a bus handle for it.
    ///
    /// Registering the same name twice returns a handle to the existing
    /// inbox.
    pub fn register(&self, name: impl Into<String>) -> LocalBus {
        let name = name.into();
        let inbox = self.lock().entry(name.clone()).or_default().clone();
        debug!(agent = %name, "registered on local bus");
        LocalBus {
            name,
            hub: self.clone(),
            inbox,
        }
    }

    /// Names of every registered agent, sorted.
    pub fn roster(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn deliver(&self, to: &str, envelope: Envelope) -> Result<(), BusError> {
        let inboxes = self.lock();
        let inbox = inboxes
            .get(to)
            .ok_or_else(|| BusError::UnknownPeer(to.to_owned()))?;
        inbox.push(envelope);
        Ok(())
    }

    fn deliver_to_all_except(&self, sender: &str, envelope: &Envelope) {
        for (name, inbox) in self.lock().iter() {
            if name != sender {
                inbox.push(envelope.clone());
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Inbox>> {
        self.inboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One agent's handle onto a [`LocalHub`].
#[derive(Debug, Clone)]
pub struct LocalBus {
    name: String,
    hub: LocalHub,
    inbox: Inbox,
}

impl MessageBus for LocalBus {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, peer: &str, message: CoordinationMessage) -> Result<(), BusError> {
        self.hub
            .deliver(peer, Envelope::new(self.name.clone(), message))
    }

    fn broadcast(&self, message: CoordinationMessage) -> Result<(), BusError> {
        self.hub
            .deliver_to_all_except(&self.name, &Envelope::new(self.name.clone(), message));
        Ok(())
    }

    fn take_all(&self) -> Vec<Envelope> {
        self.inbox.take_all()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn send_reaches_only_the_addressee() {
        let hub = LocalHub::new();
        let b1 = hub.register("b1");
        let b2 = hub.register("b2");
        let b3 = hub.register("b3");

        b1.send("b2", CoordinationMessage::Scout).unwrap();

        let got = b2.take_all();
        assert_eq!(got, vec![Envelope::new("b1", CoordinationMessage::Scout)]);
        assert!(b3.take_all().is_empty());
        assert!(b1.take_all().is_empty());
    }

    #[test]
    fn broadcast_skips_the_sender() {
        let hub = LocalHub::new();
        let b1 = hub.register("b1");
        let b2 = hub.register("b2");
        let b3 = hub.register("b3");

        b2.broadcast(CoordinationMessage::MyNumber(50)).unwrap();

        assert!(b2.take_all().is_empty());
        assert_eq!(b1.take_all().len(), 1);
        assert_eq!(b3.take_all().len(), 1);
    }

    #[test]
    fn unknown_peer_is_an_error() {
        let hub = LocalHub::new();
        let b1 = hub.register("b1");
        let err = b1.send("ghost", CoordinationMessage::Reset).unwrap_err();
        assert!(matches!(err, BusError::UnknownPeer(name) if name == "ghost"));
    }

    #[test]
    fn per_sender_order_is_preserved() {
        let hub = LocalHub::new();
        let b1 = hub.register("b1");
        let b2 = hub.register("b2");
        for n in 0..5 {
            b1.broadcast(CoordinationMessage::MyNumber(n)).unwrap();
        }
        let numbers: Vec<_> = b2.take_all().into_iter().map(|e| e.message).collect();
        let expected: Vec<_> = (0..5).map(CoordinationMessage::MyNumber).collect();
        assert_eq!(numbers, expected);
    }

    #[test]
    fn reregistering_shares_the_inbox() {
        let hub = LocalHub::new();
        let b1 = hub.register("b1");
        let again = hub.register("b1");
        let b2 = hub.register("b2");
        b2.send("b1", CoordinationMessage::IdleWalk).unwrap();
        assert_eq!(again.take_all().len(), 1);
        assert!(b1.take_all().is_empty());
        assert_eq!(hub.roster(), vec!["b1".to_owned(), "b2".to_owned()]);
    }
}
