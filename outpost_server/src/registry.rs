// Fixed-capacity connection-slot registry.
//
// One `Slot` per potential participant: the buffered write half of the TCP
// stream, liveness bookkeeping (`last_activity`, `retry_count`), and the
// per-slot game fields (`phase`, `secret`, `attempts`) that must be zeroed
// when the slot is reclaimed. Identities are slot indices, stable for the
// lifetime of a connection and reused only after `release`.
//
// The registry is the single owner of client writers. `send_to` serializes a
// `ServerMessage` to JSON, frames it, and writes it out; a write failure
// bumps the slot's retry counter and, at the configured limit, flags the slot
// for eviction instead of propagating the error — broadcast stays best-effort
// per recipient, and the session drains `take_evictions()` to finish the
// teardown. All mutation happens on the dispatcher thread; no locking.

use std::io::BufWriter;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use outpost_protocol::framing::write_frame;
use outpost_protocol::message::ServerMessage;
use outpost_protocol::types::PlayerId;

use crate::guess::Digits;

/// Per-participant game sub-state, owned by the slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlotPhase {
    /// Connected, no match running.
    #[default]
    Waiting,
    /// Choosing a secret number.
    Setting,
    /// Secret accepted, waiting for the opponent's.
    Ready,
    /// Acting participant: may submit a guess.
    Turn,
    /// Non-acting participant: guesses are rejected.
    WaitingTurn,
}

/// One connection slot.
pub struct Slot {
    writer: Option<BufWriter<TcpStream>>,
    pub connected: bool,
    pub last_activity: Instant,
    pub retry_count: u32,
    pub phase: SlotPhase,
    pub secret: Option<Digits>,
    pub attempts: u32,
}

impl Slot {
    fn vacant() -> Self {
        Self {
            writer: None,
            connected: false,
            last_activity: Instant::now(),
            retry_count: 0,
            phase: SlotPhase::Waiting,
            secret: None,
            attempts: 0,
        }
    }
}

/// Capacity condition: every slot is taken. No state was mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryFull;

pub struct Registry {
    slots: Vec<Slot>,
    max_retries: u32,
    evictions: Vec<PlayerId>,
}

impl Registry {
    pub fn new(capacity: usize, max_retries: u32) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::vacant()).collect(),
            max_retries,
            evictions: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn connected_count(&self) -> usize {
        self.slots.iter().filter(|s| s.connected).count()
    }

    pub fn has_vacancy(&self) -> bool {
        self.slots.iter().any(|s| !s.connected)
    }

    pub fn is_connected(&self, id: PlayerId) -> bool {
        self.slots.get(id.index()).is_some_and(|s| s.connected)
    }

    /// Identities of all connected slots, in slot order.
    pub fn connected_ids(&self) -> Vec<PlayerId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.connected)
            .map(|(i, _)| id_of(i))
            .collect()
    }

    pub fn slot(&self, id: PlayerId) -> &Slot {
        &self.slots[id.index()]
    }

    pub fn slot_mut(&mut self, id: PlayerId) -> &mut Slot {
        &mut self.slots[id.index()]
    }

    /// Claim the first free slot in index order for this connection.
    ///
    /// Stamps `last_activity` and returns the slot's identity, or
    /// `RegistryFull` (no mutation) when every slot is taken — the caller
    /// must notify and close the connection without registering it.
    pub fn accept(&mut self, stream: TcpStream) -> Result<PlayerId, RegistryFull> {
        let index = self
            .slots
            .iter()
            .position(|s| !s.connected)
            .ok_or(RegistryFull)?;
        let slot = &mut self.slots[index];
        *slot = Slot::vacant();
        slot.writer = Some(BufWriter::new(stream));
        slot.connected = true;
        Ok(id_of(index))
    }

    /// Release a slot: close the transport and zero every per-slot game
    /// field. Idempotent.
    pub fn release(&mut self, id: PlayerId) {
        let Some(slot) = self.slots.get_mut(id.index()) else {
            return;
        };
        if slot.writer.is_some() || slot.connected {
            debug!(player = id.0, "slot released");
        }
        *slot = Slot::vacant();
    }

    /// Refresh a slot's activity stamp. Called on every successful receive
    /// and every successful game-message send.
    pub fn touch(&mut self, id: PlayerId) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            slot.last_activity = Instant::now();
        }
    }

    /// Connected slots whose inactivity exceeds `timeout`.
    pub fn stale(&self, now: Instant, timeout: Duration) -> Vec<PlayerId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.connected && now.duration_since(s.last_activity) > timeout)
            .map(|(i, _)| id_of(i))
            .collect()
    }

    /// Send a message to one slot. Touches the slot on success; on failure
    /// bumps the retry counter and flags the slot for eviction once the
    /// limit is reached.
    pub fn send_to(&mut self, id: PlayerId, msg: &ServerMessage) {
        let max_retries = self.max_retries;
        let Some(slot) = self.slots.get_mut(id.index()) else {
            return;
        };
        if !slot.connected {
            return;
        }
        match slot.writer.as_mut().map(|w| send_message(w, msg)) {
            Some(Ok(())) => {
                slot.last_activity = Instant::now();
            }
            _ => {
                slot.retry_count += 1;
                warn!(
                    player = id.0,
                    retries = slot.retry_count,
                    "send failed"
                );
                if slot.retry_count >= max_retries {
                    slot.connected = false;
                    self.evictions.push(id);
                }
            }
        }
    }

    /// Send a liveness probe. Unlike `send_to`, a probe never refreshes
    /// `last_activity` — otherwise the probe itself would keep a dead peer
    /// alive forever.
    pub fn probe(&mut self, id: PlayerId, msg: &ServerMessage) {
        let Some(slot) = self.slots.get_mut(id.index()) else {
            return;
        };
        if !slot.connected {
            return;
        }
        if let Some(Err(e)) = slot.writer.as_mut().map(|w| send_message(w, msg)) {
            warn!(player = id.0, error = %e, "probe failed");
        }
    }

    /// Broadcast a message to all connected slots, best-effort per recipient.
    pub fn broadcast(&mut self, msg: &ServerMessage) {
        for id in self.connected_ids() {
            self.send_to(id, msg);
        }
    }

    /// Drain the slots whose sends exhausted their retries. The session
    /// completes their teardown as disconnects.
    pub fn take_evictions(&mut self) -> Vec<PlayerId> {
        std::mem::take(&mut self.evictions)
    }
}

fn id_of(index: usize) -> PlayerId {
    #[expect(clippy::cast_possible_truncation)]
    PlayerId(index as u8)
}

/// Serialize a `ServerMessage` to JSON and write it with length-delimited
/// framing.
fn send_message(writer: &mut BufWriter<TcpStream>, msg: &ServerMessage) -> std::io::Result<()> {
    let json = serde_json::to_vec(msg).map_err(std::io::Error::other)?;
    write_frame(writer, &json)
}

#[cfg(test)]
mod tests {
    use std::io::BufReader;
    use std::net::TcpListener;

    use outpost_protocol::framing::read_frame;

    use super::*;

    /// Create a TCP pair: (client_stream, server_stream) on localhost.
    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn recv_msg(reader: &mut BufReader<TcpStream>) -> ServerMessage {
        let bytes = read_frame(reader).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn accept_claims_slots_in_order() {
        let (_c1, s1) = tcp_pair();
        let (_c2, s2) = tcp_pair();
        let mut registry = Registry::new(2, 3);

        assert_eq!(registry.accept(s1), Ok(PlayerId(0)));
        assert_eq!(registry.accept(s2), Ok(PlayerId(1)));
        assert_eq!(registry.connected_count(), 2);
        assert!(!registry.has_vacancy());
    }

    #[test]
    fn accept_full_is_rejected_without_mutation() {
        let (_c1, s1) = tcp_pair();
        let (_c2, s2) = tcp_pair();
        let mut registry = Registry::new(1, 3);

        registry.accept(s1).unwrap();
        assert_eq!(registry.accept(s2), Err(RegistryFull));
        assert_eq!(registry.connected_count(), 1);
    }

    #[test]
    fn release_zeroes_slot_and_allows_reclaim() {
        let (_c1, s1) = tcp_pair();
        let (_c2, s2) = tcp_pair();
        let mut registry = Registry::new(2, 3);

        let id = registry.accept(s1).unwrap();
        {
            let slot = registry.slot_mut(id);
            slot.phase = SlotPhase::Turn;
            slot.secret = Some([1, 2, 3]);
            slot.attempts = 7;
            slot.retry_count = 2;
        }

        registry.release(id);
        // Idempotent.
        registry.release(id);
        assert!(!registry.is_connected(id));

        // The same slot is claimed again with a clean state.
        let id2 = registry.accept(s2).unwrap();
        assert_eq!(id2, id);
        let slot = registry.slot(id2);
        assert_eq!(slot.phase, SlotPhase::Waiting);
        assert_eq!(slot.secret, None);
        assert_eq!(slot.attempts, 0);
        assert_eq!(slot.retry_count, 0);
    }

    #[test]
    fn send_to_delivers_and_touches() {
        let (client, server) = tcp_pair();
        let mut registry = Registry::new(2, 3);
        let id = registry.accept(server).unwrap();

        let before = registry.slot(id).last_activity;
        std::thread::sleep(Duration::from_millis(5));
        registry.send_to(id, &ServerMessage::Heartbeat);
        assert!(registry.slot(id).last_activity > before);

        let mut reader = BufReader::new(client);
        assert_eq!(recv_msg(&mut reader), ServerMessage::Heartbeat);
    }

    #[test]
    fn probe_does_not_touch() {
        let (_client, server) = tcp_pair();
        let mut registry = Registry::new(2, 3);
        let id = registry.accept(server).unwrap();

        let before = registry.slot(id).last_activity;
        std::thread::sleep(Duration::from_millis(5));
        registry.probe(id, &ServerMessage::Heartbeat);
        assert_eq!(registry.slot(id).last_activity, before);
    }

    #[test]
    fn repeated_send_failures_flag_eviction() {
        let (client, server) = tcp_pair();
        let mut registry = Registry::new(1, 3);
        let id = registry.accept(server).unwrap();

        // Close the peer so writes fail once buffers drain.
        drop(client);
        std::thread::sleep(Duration::from_millis(20));

        for _ in 0..10 {
            registry.send_to(
                id,
                &ServerMessage::Error {
                    message: "x".repeat(2000),
                },
            );
            if !registry.is_connected(id) {
                break;
            }
        }

        assert!(!registry.is_connected(id));
        assert_eq!(registry.take_evictions(), vec![id]);
        // Drained.
        assert!(registry.take_evictions().is_empty());
    }

    #[test]
    fn stale_reports_idle_slots() {
        let (_client, server) = tcp_pair();
        let mut registry = Registry::new(2, 3);
        let id = registry.accept(server).unwrap();

        let now = Instant::now();
        assert!(registry.stale(now, Duration::from_secs(30)).is_empty());

        let later = now + Duration::from_secs(31);
        assert_eq!(registry.stale(later, Duration::from_secs(30)), vec![id]);

        // A touch refreshes the stamp; checking against the old horizon no
        // longer reports the slot.
        registry.touch(id);
        assert!(
            registry
                .stale(Instant::now(), Duration::from_secs(30))
                .is_empty()
        );
    }
}
