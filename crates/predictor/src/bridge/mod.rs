//! Timing bridge with an embedded write predictor.
//!
//! The bridge sits between an upstream and a downstream peer and forwards
//! traffic in both directions with a fixed per-hop delay. It provides:
//! 1. **Backpressure:** Bounded request and response queues; a full bridge refuses intake.
//! 2. **Reservation:** Every accepted request that expects a reply holds a response slot.
//! 3. **Retry:** Refused senders are told when room frees up; busy peers are retried on signal.
//! 4. **Prediction:** Line-sized writes are classified by the `PredictionEngine` on intake;
//!    writebacks feed its writeback-distance statistics.
//! 5. **Untimed access:** Atomic latency and functional probes through the queues.
//!
//! Time is driven by an external [`Scheduler`]: the bridge only registers the
//! tick at which it wants to forward next and acts when `process` is called.

/// Peer endpoint trait and refusal type.
pub mod port;

/// Deferred request and response queues.
pub mod queue;

use tracing::{debug, info, trace};

use self::port::{Busy, Peer};
use self::queue::{DeferredItem, DeferredQueue, RequestQueue, ResponseQueue};
use crate::common::{AddrRange, ConfigError, Packet, RecvError, Tick};
use crate::config::{BridgeConfig, Config};
use crate::predictor::PredictionEngine;
use crate::sim::Scheduler;
use crate::stats::{BridgeStats, Report};

/// Work the bridge asks the scheduler to run later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BridgeEvent {
    /// Forward the head of the request queue downstream.
    SendRequest,
    /// Forward the head of the response queue upstream.
    SendResponse,
}

/// Sending state of one direction.
#[derive(Clone, Copy, Debug, Default)]
struct Direction {
    /// A send event is registered with the scheduler.
    scheduled: bool,
    /// The peer refused the head and has not signalled a retry yet.
    waiting: bool,
}

/// Buffering bridge between two peers.
pub struct Bridge<U: Peer, D: Peer> {
    upstream: U,
    downstream: D,
    requests: RequestQueue,
    responses: ResponseQueue,
    req_dir: Direction,
    resp_dir: Direction,
    delay: Tick,
    ranges: Vec<AddrRange>,
    engine: Option<PredictionEngine>,
    stats: BridgeStats,
}

impl<U: Peer, D: Peer> Bridge<U, D> {
    /// Builds a bridge, and its predictor when enabled in `config`.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value in `config`.
    pub fn new(config: &Config, upstream: U, downstream: D) -> Result<Self, ConfigError> {
        config.validate()?;
        let engine = if config.predictor.enabled {
            Some(PredictionEngine::new(&config.predictor)?)
        } else {
            None
        };
        Self::with_engine(&config.bridge, upstream, downstream, engine)
    }

    /// Builds a bridge around an existing engine, e.g. one sharing tables
    /// with other bridges. `None` disables prediction.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value in `config`.
    pub fn with_engine(
        config: &BridgeConfig,
        upstream: U,
        downstream: D,
        engine: Option<PredictionEngine>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            req_limit = config.req_queue_limit,
            resp_limit = config.resp_queue_limit,
            delay = config.delay,
            predictor = engine.is_some(),
            "bridge ready"
        );
        Ok(Self {
            upstream,
            downstream,
            requests: RequestQueue::new(config.req_queue_limit),
            responses: ResponseQueue::new(config.resp_queue_limit),
            req_dir: Direction::default(),
            resp_dir: Direction::default(),
            delay: config.delay,
            ranges: config.ranges.clone(),
            engine,
            stats: BridgeStats::default(),
        })
    }

    /// Takes a request from the upstream peer.
    ///
    /// Writes the predictor observes are classified here and leave the bridge
    /// annotated with their outcome.
    ///
    /// # Errors
    ///
    /// [`RecvError::Busy`] hands the packet back when the request queue is
    /// full, when no response slot can be reserved, or while an earlier
    /// refusal is still waiting for its retry. The upstream peer is notified
    /// through [`Peer::notify_space_available`] once it may re-offer.
    /// [`RecvError::Predictor`] reports a predictor invariant violation; the
    /// packet is not queued.
    pub fn recv_request<S: Scheduler>(
        &mut self,
        mut pkt: Packet,
        now: Tick,
        sched: &mut S,
    ) -> Result<(), RecvError> {
        let needs_response = pkt.expects_response();
        if self.requests.retry_pending
            || self.requests.is_full()
            || (needs_response && self.responses.is_full())
        {
            trace!(addr = %pkt.addr, "request refused");
            self.requests.retry_pending = true;
            self.stats.requests_refused += 1;
            return Err(RecvError::Busy(Box::new(pkt)));
        }

        if pkt.is_write() {
            match self.engine.as_mut() {
                Some(engine) if engine.observes(&pkt) => {
                    let prediction = engine.observe_write(&pkt, now)?;
                    pkt.prediction = Some(prediction.outcome);
                }
                _ => self.stats.predictor_bypassed_writes += 1,
            }
        } else if pkt.is_writeback()
            && let Some(engine) = self.engine.as_mut()
        {
            let _ = engine.observe_writeback(&pkt, now);
        }

        if needs_response {
            self.responses.reserve();
        }
        self.stats.requests_accepted += 1;
        let ready_at = now.saturating_add(self.delay);
        trace!(addr = %pkt.addr, ready_at, "request queued");
        let _ = self.requests.queue.push(pkt, ready_at);
        Self::schedule_send(
            &self.requests.queue,
            &mut self.req_dir,
            BridgeEvent::SendRequest,
            now,
            sched,
        );
        Ok(())
    }

    /// Takes a response from the downstream peer.
    ///
    /// # Errors
    ///
    /// Returns [`Busy`] with the packet if it had no slot reserved and the
    /// unreserved space is used up. Reserved slots are never handed to
    /// unexpected responses. The downstream peer is notified once room frees up.
    pub fn recv_response<S: Scheduler>(
        &mut self,
        pkt: Packet,
        now: Tick,
        sched: &mut S,
    ) -> Result<(), Busy> {
        if !self.responses.release() && self.responses.is_full() {
            trace!(addr = %pkt.addr, "response refused");
            self.responses.retry_pending = true;
            self.stats.responses_refused += 1;
            return Err(Busy::new(pkt));
        }

        self.stats.responses_accepted += 1;
        let ready_at = now.saturating_add(self.delay);
        trace!(addr = %pkt.addr, ready_at, "response queued");
        let _ = self.responses.queue.push(pkt, ready_at);
        Self::schedule_send(
            &self.responses.queue,
            &mut self.resp_dir,
            BridgeEvent::SendResponse,
            now,
            sched,
        );
        Ok(())
    }

    /// Runs an event previously registered with the scheduler.
    pub fn process<S: Scheduler>(&mut self, event: BridgeEvent, now: Tick, sched: &mut S) {
        match event {
            BridgeEvent::SendRequest => self.send_request(now, sched),
            BridgeEvent::SendResponse => self.send_response(now, sched),
        }
    }

    /// The downstream peer has room again after refusing a request.
    pub fn recv_request_retry<S: Scheduler>(&mut self, now: Tick, sched: &mut S) {
        self.req_dir.waiting = false;
        Self::schedule_send(
            &self.requests.queue,
            &mut self.req_dir,
            BridgeEvent::SendRequest,
            now,
            sched,
        );
    }

    /// The upstream peer has room again after refusing a response.
    pub fn recv_response_retry<S: Scheduler>(&mut self, now: Tick, sched: &mut S) {
        self.resp_dir.waiting = false;
        Self::schedule_send(
            &self.responses.queue,
            &mut self.resp_dir,
            BridgeEvent::SendResponse,
            now,
            sched,
        );
    }

    /// Untimed access: returns the latency of `pkt` through the bridge.
    ///
    /// Atomic traffic bypasses the queues and the predictor.
    pub fn recv_atomic(&mut self, pkt: &Packet) -> Tick {
        self.stats.atomic_accesses += 1;
        self.delay.saturating_add(self.downstream.atomic_latency(pkt))
    }

    /// Untimed probe for the most recent data covering `range`.
    ///
    /// Queued responses are newer than queued requests, so the response queue
    /// is searched first, then the request queue, then the downstream peer.
    pub fn recv_functional(&mut self, range: AddrRange) -> Option<Packet> {
        let queued = self
            .responses
            .queue
            .probe(range)
            .or_else(|| self.requests.queue.probe(range))
            .cloned();
        if queued.is_some() {
            self.stats.functional_hits += 1;
            return queued;
        }
        self.downstream.functional_probe(range)
    }

    /// Address ranges the bridge answers for: the configured ranges, or the
    /// downstream peer's when none are configured.
    pub fn address_ranges(&self) -> Vec<AddrRange> {
        if self.ranges.is_empty() {
            self.downstream.address_ranges()
        } else {
            self.ranges.clone()
        }
    }

    /// Bridge counters.
    pub const fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// Borrowed statistics view for reporting.
    pub fn report(&self) -> Report<'_> {
        Report {
            bridge: &self.stats,
            predictor: self.engine.as_ref().map(PredictionEngine::stats),
        }
    }

    /// The predictor, if enabled.
    pub const fn engine(&self) -> Option<&PredictionEngine> {
        self.engine.as_ref()
    }

    /// Mutable access to the predictor, e.g. to register observers.
    pub const fn engine_mut(&mut self) -> Option<&mut PredictionEngine> {
        self.engine.as_mut()
    }

    /// The upstream peer.
    pub const fn upstream(&self) -> &U {
        &self.upstream
    }

    /// Mutable access to the upstream peer.
    pub const fn upstream_mut(&mut self) -> &mut U {
        &mut self.upstream
    }

    /// The downstream peer.
    pub const fn downstream(&self) -> &D {
        &self.downstream
    }

    /// Mutable access to the downstream peer.
    pub const fn downstream_mut(&mut self) -> &mut D {
        &mut self.downstream
    }

    /// Requests waiting to be forwarded.
    pub fn pending_requests(&self) -> usize {
        self.requests.queue.len()
    }

    /// Responses waiting to be forwarded.
    pub fn pending_responses(&self) -> usize {
        self.responses.queue.len()
    }

    /// Response slots held by accepted requests.
    pub const fn reserved_responses(&self) -> usize {
        self.responses.reserved()
    }

    /// Returns `true` if an upstream request was refused and not yet re-invited.
    pub const fn request_retry_pending(&self) -> bool {
        self.requests.retry_pending
    }

    fn send_request<S: Scheduler>(&mut self, now: Tick, sched: &mut S) {
        self.req_dir.scheduled = false;
        let Some(item) = Self::ready_head(
            &mut self.requests.queue,
            &mut self.req_dir,
            BridgeEvent::SendRequest,
            now,
            sched,
        ) else {
            return;
        };

        let addr = item.pkt.addr;
        match self.downstream.try_accept(item.pkt, now) {
            Ok(()) => {
                trace!(%addr, "request forwarded");
                self.stats.requests_forwarded += 1;
                if !self.requests.is_full() {
                    self.retry_stalled_request(now);
                }
            }
            Err(busy) => {
                debug!(%addr, "downstream busy");
                self.stats.peer_busy_stalls += 1;
                self.req_dir.waiting = true;
                self.requests.queue.requeue(DeferredItem {
                    ready_at: item.ready_at,
                    pkt: busy.into_packet(),
                });
                return;
            }
        }
        Self::schedule_send(
            &self.requests.queue,
            &mut self.req_dir,
            BridgeEvent::SendRequest,
            now,
            sched,
        );
    }

    fn send_response<S: Scheduler>(&mut self, now: Tick, sched: &mut S) {
        self.resp_dir.scheduled = false;
        let Some(item) = Self::ready_head(
            &mut self.responses.queue,
            &mut self.resp_dir,
            BridgeEvent::SendResponse,
            now,
            sched,
        ) else {
            return;
        };

        let addr = item.pkt.addr;
        match self.upstream.try_accept(item.pkt, now) {
            Ok(()) => {
                trace!(%addr, "response forwarded");
                self.stats.responses_forwarded += 1;
                self.retry_stalled_request(now);
                if self.responses.retry_pending {
                    self.responses.retry_pending = false;
                    self.downstream.notify_space_available(now);
                }
            }
            Err(busy) => {
                debug!(%addr, "upstream busy");
                self.stats.peer_busy_stalls += 1;
                self.resp_dir.waiting = true;
                self.responses.queue.requeue(DeferredItem {
                    ready_at: item.ready_at,
                    pkt: busy.into_packet(),
                });
                return;
            }
        }
        Self::schedule_send(
            &self.responses.queue,
            &mut self.resp_dir,
            BridgeEvent::SendResponse,
            now,
            sched,
        );
    }

    /// Invites a previously refused upstream request to be re-offered.
    fn retry_stalled_request(&mut self, now: Tick) {
        if self.requests.retry_pending {
            self.requests.retry_pending = false;
            self.stats.stalled_request_retries += 1;
            trace!("retrying stalled request");
            self.upstream.notify_space_available(now);
        }
    }

    /// Pops the head if it is ready to go, otherwise re-registers for its ready tick.
    fn ready_head<S: Scheduler>(
        queue: &mut DeferredQueue,
        dir: &mut Direction,
        event: BridgeEvent,
        now: Tick,
        sched: &mut S,
    ) -> Option<DeferredItem> {
        if dir.waiting {
            return None;
        }
        let ready_at = queue.front()?.ready_at;
        if ready_at > now {
            dir.scheduled = true;
            sched.schedule(ready_at, event);
            return None;
        }
        queue.pop()
    }

    /// Registers a send for the head of `queue` unless one is already pending.
    fn schedule_send<S: Scheduler>(
        queue: &DeferredQueue,
        dir: &mut Direction,
        event: BridgeEvent,
        now: Tick,
        sched: &mut S,
    ) {
        if dir.scheduled || dir.waiting {
            return;
        }
        if let Some(head) = queue.front() {
            dir.scheduled = true;
            sched.schedule(head.ready_at.max(now), event);
        }
    }
}

impl<U: Peer, D: Peer> std::fmt::Debug for Bridge<U, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("requests", &self.requests)
            .field("responses", &self.responses)
            .field("delay", &self.delay)
            .field("engine", &self.engine)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
