//! Request/response correlation over the multiplexed stream.
//!
//! A correlated call sends one request and then polls the transport until
//! its [`PendingRequest`] reaches a terminal state:
//!
//! ```text
//!   Waiting ──send──► Collecting ──terminal id / early code──► Complete
//!                         │
//!                         └──────────deadline passed─────────► TimedOut
//! ```
//!
//! Per decoded message:
//! - id in the expected set (and same request id) → collected; end
//!   markers complete the call without adding a record
//! - notice whose code is an early-terminal code → Complete
//! - anything else, including undecodable messages with an expected id →
//!   stray queue, in arrival order

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use gateway_core::{InboundMessage, Notice};
use gateway_protocol::{Decoded, Frame, IncomingId, MessageRegistry, ProtocolVersion};
use indexmap::IndexSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::ClientResult;
use crate::transport::Transport;

/// Which inbound messages answer a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    /// Ordered; the terminal id is always the last entry.
    ids: IndexSet<IncomingId>,
    terminal: IncomingId,
    early_codes: IndexSet<i32>,
    req_id: Option<i32>,
}

impl Expectation {
    /// Answered by exactly one message type.
    pub fn single(id: IncomingId) -> Self {
        Expectation {
            ids: IndexSet::from([id]),
            terminal: id,
            early_codes: IndexSet::new(),
            req_id: None,
        }
    }

    /// Zero or more `records` followed by `end`.
    pub fn stream(records: impl IntoIterator<Item = IncomingId>, end: IncomingId) -> Self {
        let mut ids: IndexSet<IncomingId> = records.into_iter().collect();
        ids.shift_remove(&end);
        ids.insert(end);
        Expectation {
            ids,
            terminal: end,
            early_codes: IndexSet::new(),
            req_id: None,
        }
    }

    /// Ordered set whose last entry is the terminal id; `None` if empty.
    pub fn from_ids(ids: impl IntoIterator<Item = IncomingId>) -> Option<Self> {
        let mut ids: IndexSet<IncomingId> = ids.into_iter().collect();
        let end = ids.pop()?;
        Some(Self::stream(ids, end))
    }

    /// Notice codes that end the wait early.
    pub fn with_early_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.early_codes.extend(codes);
        self
    }

    /// Only messages for `req_id` (or carrying no request id) match.
    pub fn for_request(mut self, req_id: i32) -> Self {
        self.req_id = Some(req_id);
        self
    }

    pub fn terminal(&self) -> IncomingId {
        self.terminal
    }

    /// Expected ids in order, terminal last.
    pub fn ids(&self) -> impl Iterator<Item = IncomingId> + '_ {
        self.ids.iter().copied()
    }

    pub fn expects(&self, id: IncomingId) -> bool {
        self.ids.contains(&id)
    }

    pub fn request_id(&self) -> Option<i32> {
        self.req_id
    }

    fn is_early_terminal(&self, notice: &Notice) -> bool {
        self.early_codes.contains(&notice.code)
            && match self.req_id {
                Some(req_id) => notice.id == req_id || notice.id == -1,
                None => true,
            }
    }

    fn matches_request(&self, msg: &InboundMessage) -> bool {
        match (self.req_id, msg.request_id()) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestState {
    Waiting,
    Collecting,
    Complete,
    TimedOut,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Complete | RequestState::TimedOut)
    }
}

/// How a correlated call ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    TimedOut,
}

/// One outstanding correlated call.
#[derive(Debug)]
pub struct PendingRequest {
    expectation: Expectation,
    deadline: Instant,
    state: RequestState,
    collected: Vec<InboundMessage>,
    terminated_by: Option<Notice>,
}

impl PendingRequest {
    pub fn new(expectation: Expectation, deadline: Instant) -> Self {
        PendingRequest {
            expectation,
            deadline,
            state: RequestState::Waiting,
            collected: Vec::new(),
            terminated_by: None,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn collected(&self) -> &[InboundMessage] {
        &self.collected
    }

    /// The request has been sent; replies may now arrive.
    pub fn start(&mut self) {
        if self.state == RequestState::Waiting {
            self.state = RequestState::Collecting;
        }
    }

    /// Offers one decoded message. Returns it back when it does not belong
    /// to this call.
    pub fn accept(&mut self, decoded: Decoded) -> Option<InboundMessage> {
        let Decoded { id, message, .. } = decoded;
        if self.state.is_terminal() {
            return Some(message);
        }

        // A known id that failed to decode still arrives as `Unrecognized`;
        // it never answers a call.
        let recognised = !matches!(message, InboundMessage::Unrecognized { .. });
        if let Some(id) = id.filter(|_| recognised) {
            if self.expectation.expects(id) && self.expectation.matches_request(&message) {
                let terminal = id == self.expectation.terminal();
                if !message.is_end_marker() {
                    self.collected.push(message);
                }
                if terminal {
                    self.state = RequestState::Complete;
                }
                return None;
            }
        }

        if let Some(notice) = message.as_notice() {
            if self.expectation.is_early_terminal(notice) {
                info!(
                    code = notice.code,
                    id = notice.id,
                    "call ended early by gateway notice: {}",
                    notice.message
                );
                self.terminated_by = Some(notice.clone());
                self.state = RequestState::Complete;
            }
        }

        Some(message)
    }

    /// Moves to `TimedOut` if `now` is past the deadline.
    pub fn check_deadline(&mut self, now: Instant) -> bool {
        if !self.state.is_terminal() && now >= self.deadline {
            self.state = RequestState::TimedOut;
            return true;
        }
        false
    }

    pub fn finish(self) -> Correlated<InboundMessage> {
        let outcome = match self.state {
            RequestState::TimedOut => Outcome::TimedOut,
            _ => Outcome::Complete,
        };
        Correlated {
            records: self.collected,
            outcome,
            terminated_by: self.terminated_by,
        }
    }
}

/// Records collected by a call and how it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlated<T> {
    pub records: Vec<T>,
    pub outcome: Outcome,
    /// Notice that ended the call early, if any.
    pub terminated_by: Option<Notice>,
}

impl<T> Correlated<T> {
    pub fn is_timed_out(&self) -> bool {
        self.outcome == Outcome::TimedOut
    }

    /// Replaces each record by the payload items it carries.
    pub fn flat_map<U, I, F>(self, f: F) -> Correlated<U>
    where
        F: FnMut(T) -> I,
        I: IntoIterator<Item = U>,
    {
        Correlated {
            records: self.records.into_iter().flat_map(f).collect(),
            outcome: self.outcome,
            terminated_by: self.terminated_by,
        }
    }

    /// The default return shape: a timeout looks like "no data".
    pub fn into_reply(self) -> Option<Reply<T>> {
        Reply::from_vec(self.records)
    }
}

/// Zero records is `None`; one is returned bare; more keep arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Single(T),
    Many(Vec<T>),
}

impl<T> Reply<T> {
    pub fn from_vec(mut records: Vec<T>) -> Option<Self> {
        match records.len() {
            0 => None,
            1 => records.pop().map(Reply::Single),
            _ => Some(Reply::Many(records)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Reply::Single(_) => 1,
            Reply::Many(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Reply::Single(one) => vec![one],
            Reply::Many(many) => many,
        }
    }

    pub fn single(self) -> Option<T> {
        match self {
            Reply::Single(one) => Some(one),
            Reply::Many(_) => None,
        }
    }
}

impl<T> IntoIterator for Reply<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

/// Messages that arrived while no call claimed them.
///
/// Append-only from the correlation side; consumers managing their own
/// subscriptions inspect or drain it.
#[derive(Debug, Default)]
pub struct StrayQueue {
    inner: Mutex<VecDeque<InboundMessage>>,
}

impl StrayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, msg: InboundMessage) {
        self.lock().push_back(msg);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the queue, oldest first.
    pub fn snapshot(&self) -> Vec<InboundMessage> {
        self.lock().iter().cloned().collect()
    }

    pub fn drain(&self) -> Vec<InboundMessage> {
        self.lock().drain(..).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<InboundMessage>> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Decodes a frame, turning failures into `Unrecognized` records.
pub(crate) fn decode_frame(
    registry: &MessageRegistry,
    frame: &Frame,
    version: ProtocolVersion,
) -> Decoded {
    let (decoded, err) = registry.decode_lossy(frame.payload(), version);
    match err {
        Some(err) => warn!(wire_id = decoded.wire_id, "undecodable message: {}", err),
        None => debug!(
            wire_id = decoded.wire_id,
            name = decoded.id.map(|id| id.name()).unwrap_or("?"),
            "received"
        ),
    }
    if let Some(notice) = decoded.message.as_notice() {
        log_notice(notice);
    }
    decoded
}

fn log_notice(notice: &Notice) {
    if notice.is_status() {
        info!(code = notice.code, id = notice.id, "{}", notice.message);
    } else {
        warn!(code = notice.code, id = notice.id, "{}", notice.message);
    }
}

/// Runs correlated calls against one transport.
pub struct Correlator<'a> {
    pub transport: &'a Transport,
    pub registry: &'a MessageRegistry,
    pub strays: &'a StrayQueue,
    pub version: ProtocolVersion,
    pub request_timeout: Duration,
}

impl Correlator<'_> {
    /// Sends `frame` and collects replies until `expectation` is met or the
    /// request timeout passes. A timeout is reported in the outcome, not as
    /// an error.
    pub async fn run(
        &self,
        frame: &Frame,
        expectation: Expectation,
    ) -> ClientResult<Correlated<InboundMessage>> {
        let terminal = expectation.terminal();
        let mut pending = PendingRequest::new(expectation, Instant::now() + self.request_timeout);

        self.transport.send_frame(frame).await?;
        pending.start();

        while !pending.state().is_terminal() {
            for frame in self.transport.receive_frames().await? {
                let decoded = decode_frame(self.registry, &frame, self.version);
                if let Some(stray) = pending.accept(decoded) {
                    self.strays.push(stray);
                }
            }

            if pending.check_deadline(Instant::now()) {
                warn!(
                    waiting_for = terminal.name(),
                    collected = pending.collected().len(),
                    "request timed out"
                );
            }
        }

        Ok(pending.finish())
    }
}

#[cfg(test)]
mod tests {
    use gateway_core::Position;

    use super::*;

    fn decoded(id: IncomingId, message: InboundMessage) -> Decoded {
        Decoded {
            wire_id: id.id(),
            id: Some(id),
            message,
        }
    }

    fn notice(id: i32, code: i32) -> Decoded {
        decoded(
            IncomingId::ErrorMessage,
            InboundMessage::Notice(Notice {
                id,
                code,
                message: "x".into(),
                advanced_order_reject_json: String::new(),
            }),
        )
    }

    fn position() -> InboundMessage {
        InboundMessage::Position(Position {
            account: "DU1".into(),
            contract: Default::default(),
            position: 1.0,
            avg_cost: 2.0,
        })
    }

    fn pending(exp: Expectation) -> PendingRequest {
        let mut p = PendingRequest::new(exp, Instant::now() + Duration::from_secs(60));
        p.start();
        p
    }

    #[test]
    fn end_marker_completes_without_a_record() {
        let mut p = pending(Expectation::stream([IncomingId::PositionData], IncomingId::PositionEnd));
        assert_eq!(p.state(), RequestState::Collecting);
        for _ in 0..3 {
            assert!(p.accept(decoded(IncomingId::PositionData, position())).is_none());
        }
        assert_eq!(p.state(), RequestState::Collecting);
        assert!(p
            .accept(decoded(IncomingId::PositionEnd, InboundMessage::PositionEnd))
            .is_none());
        assert_eq!(p.state(), RequestState::Complete);
        let out = p.finish();
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.outcome, Outcome::Complete);
    }

    #[test]
    fn unrelated_messages_are_handed_back() {
        let mut p = pending(Expectation::single(IncomingId::CurrentTime));
        let stray = p.accept(decoded(IncomingId::NextValidId, InboundMessage::NextValidId(5)));
        assert_eq!(stray, Some(InboundMessage::NextValidId(5)));
        assert!(p.collected().is_empty());
    }

    #[test]
    fn malformed_terminal_message_does_not_complete_the_call() {
        let mut p = pending(Expectation::single(IncomingId::CurrentTime));
        let garbage = InboundMessage::Unrecognized {
            wire_id: IncomingId::CurrentTime.id(),
            name: Some("current_time"),
            fields: vec!["1".into(), "garbage".into()],
        };
        assert_eq!(
            p.accept(decoded(IncomingId::CurrentTime, garbage.clone())),
            Some(garbage)
        );
        assert_eq!(p.state(), RequestState::Collecting);
        assert!(p.collected().is_empty());

        assert!(p
            .accept(decoded(IncomingId::CurrentTime, InboundMessage::CurrentTime(1)))
            .is_none());
        assert_eq!(p.finish().records, vec![InboundMessage::CurrentTime(1)]);
    }

    #[test]
    fn other_request_ids_are_strays() {
        let mut p = pending(Expectation::single(IncomingId::FundamentalData).for_request(7));
        let other = InboundMessage::FundamentalData {
            req_id: 8,
            data: "<x/>".into(),
        };
        assert!(p.accept(decoded(IncomingId::FundamentalData, other)).is_some());
        assert_eq!(p.state(), RequestState::Collecting);
    }

    #[test]
    fn early_code_completes_only_for_this_request() {
        let exp = Expectation::single(IncomingId::FundamentalData)
            .for_request(7)
            .with_early_codes([430]);

        let mut p = pending(exp.clone());
        // Notices are still queued as strays.
        assert!(p.accept(notice(9, 430)).is_some());
        assert_eq!(p.state(), RequestState::Collecting);
        assert!(p.accept(notice(7, 2104)).is_some());
        assert_eq!(p.state(), RequestState::Collecting);
        assert!(p.accept(notice(7, 430)).is_some());
        assert_eq!(p.state(), RequestState::Complete);
        let out = p.finish();
        assert!(out.records.is_empty());
        assert_eq!(out.terminated_by.map(|n| n.code), Some(430));

        let mut p = pending(exp);
        p.accept(notice(-1, 430));
        assert_eq!(p.state(), RequestState::Complete);
    }

    #[test]
    fn deadline_moves_to_timed_out_and_keeps_partials() {
        let mut p = PendingRequest::new(
            Expectation::stream([IncomingId::PositionData], IncomingId::PositionEnd),
            Instant::now(),
        );
        p.start();
        p.accept(decoded(IncomingId::PositionData, position()));
        assert!(p.check_deadline(Instant::now()));
        assert!(!p.check_deadline(Instant::now()));
        let out = p.finish();
        assert!(out.is_timed_out());
        assert_eq!(out.records.len(), 1);
    }

    #[test]
    fn terminal_is_last() {
        let e = Expectation::from_ids([IncomingId::ContractData, IncomingId::ContractDataEnd])
            .unwrap();
        assert_eq!(e.terminal(), IncomingId::ContractDataEnd);
        assert!(e.expects(IncomingId::ContractData));

        let e = Expectation::stream([IncomingId::PositionEnd, IncomingId::PositionData], IncomingId::PositionEnd);
        assert_eq!(e.ids().last(), Some(IncomingId::PositionEnd));
        assert!(Expectation::from_ids([]).is_none());
    }

    #[test]
    fn reply_arity() {
        assert_eq!(Reply::<i32>::from_vec(vec![]), None);
        assert_eq!(Reply::from_vec(vec![1]), Some(Reply::Single(1)));
        assert_eq!(Reply::from_vec(vec![1, 2, 3]), Some(Reply::Many(vec![1, 2, 3])));
        assert_eq!(
            Reply::from_vec(vec![4, 5]).map(|r| r.into_vec()),
            Some(vec![4, 5])
        );
    }

    #[test]
    fn flat_map_then_reply_applies_arity_to_payload_items() {
        let c = Correlated {
            records: vec![vec![1, 2], vec![3]],
            outcome: Outcome::Complete,
            terminated_by: None,
        };
        assert_eq!(c.flat_map(|v| v).into_reply(), Some(Reply::Many(vec![1, 2, 3])));
    }

    #[test]
    fn stray_queue_keeps_order() {
        let q = StrayQueue::new();
        q.push(InboundMessage::NextValidId(1));
        q.push(InboundMessage::CurrentTime(2));
        assert_eq!(q.len(), 2);
        assert_eq!(q.snapshot().len(), 2);
        assert_eq!(
            q.drain(),
            vec![InboundMessage::NextValidId(1), InboundMessage::CurrentTime(2)]
        );
        assert!(q.is_empty());
    }
}
