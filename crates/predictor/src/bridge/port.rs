//! Peer endpoints attached to either side of the bridge.
//!
//! The bridge owns both of its peers. The upstream peer issues requests and
//! receives responses; the downstream peer receives requests and issues
//! responses. Peers never call back into the bridge directly: a peer that
//! refused a packet later signals readiness through the bridge's retry entry
//! points, driven by the host scheduler.

use crate::common::{AddrRange, Packet, Tick};

/// A packet refused by a full endpoint, handed back to its sender.
#[derive(Debug, PartialEq, Eq)]
pub struct Busy(pub Box<Packet>);

impl Busy {
    /// Wraps a refused packet.
    pub fn new(pkt: Packet) -> Self {
        Self(Box::new(pkt))
    }

    /// Recovers the refused packet.
    pub fn into_packet(self) -> Packet {
        *self.0
    }
}

/// Trait for the endpoints the bridge forwards traffic to.
///
/// Implementors must be `Send` so a bridge can be moved to a simulation thread.
pub trait Peer: Send {
    /// Offers a packet to the peer.
    ///
    /// # Arguments
    ///
    /// * `pkt` - Request (downstream peer) or response (upstream peer).
    /// * `now` - Current tick.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the peer took ownership, or [`Busy`] with the packet when
    /// it has no room. A busy peer must later trigger the matching bridge retry.
    fn try_accept(&mut self, pkt: Packet, now: Tick) -> Result<(), Busy>;

    /// Tells the peer that the bridge has room for a packet it refused earlier.
    fn notify_space_available(&mut self, _now: Tick) {}

    /// Address ranges served behind this peer.
    fn address_ranges(&self) -> Vec<AddrRange> {
        Vec::new()
    }

    /// Returns the most recent packet the peer holds that overlaps `range`.
    fn functional_probe(&self, _range: AddrRange) -> Option<Packet> {
        None
    }

    /// Returns the latency in ticks of an atomic (untimed) access.
    fn atomic_latency(&mut self, _pkt: &Packet) -> Tick {
        0
    }
}
