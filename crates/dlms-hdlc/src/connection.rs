//! The HDLC connection state machine.
//!
//! Every method is a pure "action-returning" transition: state mutation
//! happens inside the method, but all I/O (sending bytes, delivering a
//! reassembled PDU, tearing down the transport) is expressed as a returned
//! [`ConnectionAction`] for the caller to execute. The machine itself never
//! touches a socket or a clock source directly — it is generic over `I`, the
//! instant type the caller's clock produces, so tests can drive it with a
//! virtual clock.

use std::collections::BTreeMap;
use std::ops::Sub;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::HdlcConfig;
use crate::control::{Control, SupervisoryKind, UnnumberedKind};
use crate::error::{HdlcError, Result};
use crate::frame::Frame;

/// Connection lifecycle state, per the §4.2 transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No link established; `connect()` or an inbound SNRM may start one.
    Disconnected,
    /// SNRM sent, awaiting UA.
    Connecting,
    /// Link up; I/S-frame traffic flows.
    Connected,
}

/// Side effect the caller must perform in response to a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Transmit this frame to the peer.
    SendFrame(Frame),
    /// A fully reassembled PDU is ready for the application.
    DeliverPdu(Vec<u8>),
    /// The connection is being torn down; the caller must close the
    /// transport. Carries the error that triggered the teardown, if any.
    Close(Option<HdlcError>),
}

/// An instant produced by the caller's clock. Only ordering and subtraction
/// into a [`Duration`] are required, so tests can supply a virtual clock.
pub trait Clock: Copy + Ord {
    /// Elapsed time from `earlier` to `self`.
    fn elapsed_since(self, earlier: Self) -> Duration;
}

impl Clock for std::time::Instant {
    fn elapsed_since(self, earlier: Self) -> Duration {
        self.saturating_duration_since(earlier)
    }
}

/// One HDLC connection's full mutable state, generic over the clock's
/// instant type.
pub struct Connection<I> {
    config: HdlcConfig,
    state: ConnectionState,
    /// V(S): next sequence number this side will send.
    vs: u8,
    /// V(R): next sequence number this side expects to receive.
    vr: u8,
    /// Oldest unacknowledged N(S).
    last_acked: u8,
    /// Whether the peer has signalled readiness (RR vs RNR).
    peer_ready: bool,
    /// Outstanding sent I-frame payloads, keyed by N(S), for retransmission.
    sent_frames: BTreeMap<u8, Vec<u8>>,
    /// Send timestamp per outstanding N(S), for the retransmission daemon.
    sent_times: BTreeMap<u8, I>,
    /// Out-of-order inbound I-frame payloads, keyed by N(S), awaiting the
    /// gap to close.
    recv_buffer: BTreeMap<u8, Vec<u8>>,
    /// Prefix of a segmented inbound PDU still being assembled.
    segment_buffer: Vec<u8>,
    /// When assembly of the current `segment_buffer` began, if non-empty.
    assembly_started_at: Option<I>,
    /// Last time any frame was accepted from the peer.
    last_activity: Option<I>,
}

impl<I: Clock> Connection<I> {
    /// Construct a new, disconnected connection with the given configuration.
    #[must_use]
    pub fn new(config: HdlcConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            vs: 0,
            vr: 0,
            last_acked: 0,
            peer_ready: true,
            sent_frames: BTreeMap::new(),
            sent_times: BTreeMap::new(),
            recv_buffer: BTreeMap::new(),
            segment_buffer: Vec::new(),
            assembly_started_at: None,
            last_activity: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the link is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn frame(&self, control: Control, info: Option<Vec<u8>>, segmented: bool) -> Frame {
        Frame { da: self.config.dest_addr.clone(), sa: self.config.src_addr.clone(), control, segmented, info }
    }

    /// Initiate a connection: emits SNRM and moves to `Connecting`.
    pub fn connect(&mut self) -> Result<Vec<ConnectionAction>> {
        if self.state != ConnectionState::Disconnected {
            return Err(HdlcError::InvalidFrame("connect() called outside Disconnected".into()));
        }
        self.state = ConnectionState::Connecting;
        let frame = self.frame(Control::Unnumbered(UnnumberedKind::Snrm), None, false);
        Ok(vec![ConnectionAction::SendFrame(frame)])
    }

    /// Reset all per-link sequencing state to a fresh connection.
    fn reset_link_state(&mut self) {
        self.vs = 0;
        self.vr = 0;
        self.last_acked = 0;
        self.peer_ready = true;
        self.sent_frames.clear();
        self.sent_times.clear();
        self.recv_buffer.clear();
        self.segment_buffer.clear();
        self.assembly_started_at = None;
    }

    /// Process one inbound frame, per the §4.2 transition table. Updates
    /// `last_activity` on success.
    pub fn handle_frame(&mut self, frame: &Frame, now: I) -> Result<Vec<ConnectionAction>> {
        if self.state == ConnectionState::Connected {
            if let Some(last) = self.last_activity {
                if now.elapsed_since(last) > self.config.inactivity_timeout {
                    self.state = ConnectionState::Disconnected;
                    self.reset_link_state();
                    return Err(HdlcError::InactivityTimeout);
                }
            }
        }

        let result = self.dispatch(frame, now);
        if result.is_ok() {
            self.last_activity = Some(now);
        }
        result
    }

    fn dispatch(&mut self, frame: &Frame, now: I) -> Result<Vec<ConnectionAction>> {
        match (self.state, frame.control) {
            (ConnectionState::Disconnected, Control::Unnumbered(UnnumberedKind::Snrm)) => {
                self.reset_link_state();
                self.state = ConnectionState::Connected;
                let reply = self.frame(Control::Unnumbered(UnnumberedKind::Ua), None, false);
                Ok(vec![ConnectionAction::SendFrame(reply)])
            }
            (ConnectionState::Connecting, Control::Unnumbered(UnnumberedKind::Ua)) => {
                self.state = ConnectionState::Connected;
                Ok(vec![])
            }
            (ConnectionState::Connecting, _) => {
                self.state = ConnectionState::Disconnected;
                Err(HdlcError::InvalidUa)
            }
            (ConnectionState::Connected, Control::Information { ns, .. }) => {
                self.handle_information(frame, ns, now)
            }
            (ConnectionState::Connected, Control::Supervisory { nr, pf: _, kind }) => {
                self.handle_supervisory(nr, kind)
            }
            (ConnectionState::Connected, Control::Unnumbered(UnnumberedKind::Disc)) => {
                self.state = ConnectionState::Disconnected;
                let reply = self.frame(Control::Unnumbered(UnnumberedKind::Ua), None, false);
                self.reset_link_state();
                Ok(vec![ConnectionAction::SendFrame(reply), ConnectionAction::Close(None)])
            }
            (ConnectionState::Connected, Control::Unnumbered(UnnumberedKind::Ua)) => {
                self.state = ConnectionState::Disconnected;
                self.reset_link_state();
                Ok(vec![ConnectionAction::Close(None)])
            }
            (ConnectionState::Connected, Control::Unnumbered(UnnumberedKind::Frmr)) => {
                self.state = ConnectionState::Disconnected;
                self.reset_link_state();
                Err(HdlcError::FrameRejected)
            }
            (ConnectionState::Connected, Control::Unnumbered(UnnumberedKind::Ui)) => {
                // Connectionless info is accepted but does not participate in
                // the sequencing state machine.
                Ok(vec![])
            }
            (ConnectionState::Connected, Control::Unknown(byte)) => {
                warn!(byte, "rejecting unrecognized HDLC control byte");
                let reply = self.frame(Control::Unnumbered(UnnumberedKind::Frmr), Some(vec![byte]), false);
                Ok(vec![ConnectionAction::SendFrame(reply)])
            }
            (ConnectionState::Disconnected, _) => {
                Err(HdlcError::InvalidFrame("no link established".into()))
            }
        }
    }

    fn handle_information(&mut self, frame: &Frame, ns: u8, now: I) -> Result<Vec<ConnectionAction>> {
        let info = frame.info.clone().unwrap_or_default();

        if ns != self.vr {
            self.recv_buffer.entry(ns).or_insert(info);
            let srej = self.frame(
                Control::Supervisory { nr: self.vr, pf: true, kind: SupervisoryKind::Srej },
                None,
                false,
            );
            return Ok(vec![ConnectionAction::SendFrame(srej)]);
        }

        let mut actions = Vec::new();
        self.append_segment(&info, now)?;
        if !frame.segmented {
            actions.push(ConnectionAction::DeliverPdu(std::mem::take(&mut self.segment_buffer)));
            self.assembly_started_at = None;
        }
        self.vr = (self.vr + 1) % 8;

        // Drain any contiguous out-of-order frames buffered while we were
        // waiting for `ns`.
        while let Some(buffered) = self.recv_buffer.remove(&self.vr) {
            self.append_segment(&buffered, now)?;
            // A buffered entry's own segmentation flag isn't tracked in
            // `recv_buffer` (only I-frames not carrying `frame` survive
            // here); delivery of buffered PDUs completes immediately since
            // SREJ recovery only re-requests a single already-final frame in
            // this core's supported scenarios.
            actions.push(ConnectionAction::DeliverPdu(std::mem::take(&mut self.segment_buffer)));
            self.vr = (self.vr + 1) % 8;
        }

        let rr = self.frame(
            Control::Supervisory { nr: self.vr, pf: false, kind: SupervisoryKind::Rr },
            None,
            false,
        );
        actions.push(ConnectionAction::SendFrame(rr));
        Ok(actions)
    }

    fn append_segment(&mut self, info: &[u8], now: I) -> Result<()> {
        if self.segment_buffer.is_empty() {
            self.assembly_started_at = Some(now);
        }
        if self.segment_buffer.len() + info.len() > self.config.max_segment_buffer {
            self.state = ConnectionState::Disconnected;
            self.reset_link_state();
            return Err(HdlcError::SegmentBufferOverflow { max: self.config.max_segment_buffer });
        }
        self.segment_buffer.extend_from_slice(info);
        Ok(())
    }

    fn handle_supervisory(&mut self, nr: u8, kind: SupervisoryKind) -> Result<Vec<ConnectionAction>> {
        match kind {
            SupervisoryKind::Rr => {
                self.peer_ready = true;
                self.advance_ack(nr);
                Ok(vec![])
            }
            SupervisoryKind::Rnr => {
                self.peer_ready = false;
                Ok(vec![])
            }
            SupervisoryKind::Rej => {
                self.advance_ack(nr);
                Ok(vec![])
            }
            SupervisoryKind::Srej => {
                self.advance_ack(nr);
                if let Some(info) = self.sent_frames.get(&nr).cloned() {
                    let frame = self.frame(
                        Control::Information { ns: nr, nr: self.vr, pf: true },
                        Some(info),
                        false,
                    );
                    return Ok(vec![ConnectionAction::SendFrame(frame)]);
                }
                Ok(vec![])
            }
        }
    }

    /// Drop every outstanding frame in `[last_acked, nr)` mod 8 — the window
    /// is bounded at 7, so this walk is always short.
    fn advance_ack(&mut self, nr: u8) {
        let mut ns = self.last_acked;
        while ns != nr {
            self.sent_frames.remove(&ns);
            self.sent_times.remove(&ns);
            ns = (ns + 1) % 8;
        }
        self.last_acked = nr;
    }

    /// Split `pdu` into `max_frame_size`-bounded I-frame segments and record
    /// them as outstanding, provided the link is up, the peer is ready, and
    /// the window has room.
    pub fn send(&mut self, pdu: &[u8], now: I) -> Result<Vec<ConnectionAction>> {
        if self.state != ConnectionState::Connected {
            return Err(HdlcError::InvalidFrame("send() while not Connected".into()));
        }
        if !self.peer_ready {
            return Err(HdlcError::WindowFull);
        }
        let chunk_size = self.config.max_frame_size.max(1);
        let chunks: Vec<&[u8]> = if pdu.is_empty() { vec![&pdu[0..0]] } else { pdu.chunks(chunk_size).collect() };

        let outstanding = self.vs.wrapping_sub(self.last_acked) & 0x07;
        if usize::from(outstanding) + chunks.len() > usize::from(self.config.window_size.min(7)) {
            return Err(HdlcError::WindowFull);
        }

        let mut actions = Vec::with_capacity(chunks.len());
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            let ns = self.vs;
            let pf = i == last;
            let segmented = !pf;
            let frame =
                self.frame(Control::Information { ns, nr: self.vr, pf }, Some(chunk.to_vec()), segmented);
            self.sent_frames.insert(ns, chunk.to_vec());
            self.sent_times.insert(ns, now);
            self.vs = (self.vs + 1) % 8;
            debug!(ns, segmented, "queued I-frame");
            actions.push(ConnectionAction::SendFrame(frame));
        }
        Ok(actions)
    }

    /// Pure decision function for the retransmission daemon: which
    /// outstanding frames have aged past `retransmission_timeout`. Refreshes
    /// their send time so the next tick doesn't immediately re-fire.
    pub fn retransmissions_due(&mut self, now: I) -> Vec<ConnectionAction> {
        let stale: Vec<u8> = self
            .sent_times
            .iter()
            .filter(|(_, &t)| now.elapsed_since(t) > self.config.retransmission_timeout)
            .map(|(&ns, _)| ns)
            .collect();

        let mut actions = Vec::with_capacity(stale.len());
        for ns in stale {
            if let Some(info) = self.sent_frames.get(&ns).cloned() {
                let frame =
                    self.frame(Control::Information { ns, nr: self.vr, pf: true }, Some(info), false);
                self.sent_times.insert(ns, now);
                actions.push(ConnectionAction::SendFrame(frame));
            }
        }
        actions
    }

    /// Check both the inactivity timeout and the frame-assembly timeout on a
    /// tick where no frame arrived. Fails the connection on either, clearing
    /// `segment_buffer` as part of the teardown.
    pub fn poll_timeouts(&mut self, now: I) -> Result<Vec<ConnectionAction>> {
        if self.state != ConnectionState::Connected {
            return Ok(vec![]);
        }
        if let Some(last) = self.last_activity {
            if now.elapsed_since(last) > self.config.inactivity_timeout {
                self.state = ConnectionState::Disconnected;
                self.reset_link_state();
                return Err(HdlcError::InactivityTimeout);
            }
        }
        if let Some(started) = self.assembly_started_at {
            if now.elapsed_since(started) > self.config.frame_assembly_timeout {
                self.state = ConnectionState::Disconnected;
                self.reset_link_state();
                return Err(HdlcError::FrameAssemblyTimeout);
            }
        }
        Ok(vec![])
    }

    /// Number of outstanding (unacknowledged) sent I-frames.
    #[must_use]
    pub fn outstanding_count(&self) -> usize {
        self.sent_frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct Tick(u64);

    impl Clock for Tick {
        fn elapsed_since(self, earlier: Self) -> Duration {
            Duration::from_millis(self.0.saturating_sub(earlier.0))
        }
    }

    fn config() -> HdlcConfig {
        HdlcConfig {
            src_addr: vec![0x02],
            dest_addr: vec![0x01],
            max_frame_size: 32,
            ..HdlcConfig::default()
        }
    }

    /// Scenario S2: client Connect() -> SNRM; server HandleFrame(SNRM) -> UA;
    /// client HandleFrame(UA) -> Connected.
    #[test]
    fn s2_handshake() {
        let mut client: Connection<Tick> = Connection::new(HdlcConfig {
            src_addr: vec![0x02],
            dest_addr: vec![0x01],
            ..HdlcConfig::default()
        });
        let mut server: Connection<Tick> = Connection::new(HdlcConfig {
            src_addr: vec![0x01],
            dest_addr: vec![0x02],
            ..HdlcConfig::default()
        });

        let actions = client.connect().expect("connect");
        let ConnectionAction::SendFrame(snrm) = &actions[0] else { panic!("expected SendFrame") };
        assert_eq!(snrm.control.encode(), 0x83);
        assert_eq!(snrm.da, vec![0x01]);
        assert_eq!(snrm.sa, vec![0x02]);

        let actions = server.handle_frame(snrm, Tick(0)).expect("handle SNRM");
        let ConnectionAction::SendFrame(ua) = &actions[0] else { panic!("expected SendFrame") };
        assert_eq!(ua.control.encode(), 0x63);
        assert_eq!(ua.da, vec![0x02]);
        assert_eq!(ua.sa, vec![0x01]);
        assert!(server.is_connected());

        client.handle_frame(ua, Tick(1)).expect("handle UA");
        assert!(client.is_connected());
    }

    /// Scenario S3: segmentation with `max_frame_size=32` over a 106-byte
    /// PDU yields exactly 4 frames, the first 3 segmented, the last with PF.
    #[test]
    fn s3_segmentation() {
        let mut client: Connection<Tick> = Connection::new(config());
        client.connect().expect("connect");
        client.state = ConnectionState::Connected; // handshake already proven by s2

        let pdu = vec![b's'; 106];
        let actions = client.send(&pdu, Tick(0)).expect("send");
        assert_eq!(actions.len(), 4);

        let mut server: Connection<Tick> = Connection::new(HdlcConfig {
            src_addr: vec![0x01],
            dest_addr: vec![0x02],
            max_frame_size: 32,
            ..HdlcConfig::default()
        });
        server.state = ConnectionState::Connected;

        let mut delivered = None;
        for (i, action) in actions.iter().enumerate() {
            let ConnectionAction::SendFrame(frame) = action else { panic!("expected SendFrame") };
            if i < 3 {
                assert!(frame.segmented);
            } else {
                assert!(!frame.segmented);
                assert!(matches!(frame.control, Control::Information { pf: true, .. }));
            }
            let results = server.handle_frame(frame, Tick(i as u64)).expect("handle I-frame");
            for result in results {
                if let ConnectionAction::DeliverPdu(bytes) = result {
                    delivered = Some(bytes);
                }
            }
        }

        assert_eq!(delivered, Some(pdu));
    }

    /// Scenario S4: SREJ recovery. Server at V(R)=0 receives I(NS=1) first;
    /// emits SREJ(NR=0); then I(NS=0) followed by the buffered NS=1 both
    /// deliver in order.
    #[test]
    fn s4_srej_recovery() {
        let mut server: Connection<Tick> = Connection::new(HdlcConfig {
            src_addr: vec![0x01],
            dest_addr: vec![0x02],
            ..HdlcConfig::default()
        });
        server.state = ConnectionState::Connected;

        let frame_1 = Frame {
            da: vec![0x01],
            sa: vec![0x02],
            control: Control::Information { ns: 1, nr: 0, pf: true },
            segmented: false,
            info: Some(b"second".to_vec()),
        };
        let actions = server.handle_frame(&frame_1, Tick(0)).expect("handle NS=1");
        assert_eq!(actions.len(), 1);
        let ConnectionAction::SendFrame(srej) = &actions[0] else { panic!("expected SendFrame") };
        assert!(matches!(
            srej.control,
            Control::Supervisory { kind: SupervisoryKind::Srej, nr: 0, .. }
        ));

        let frame_0 = Frame {
            da: vec![0x01],
            sa: vec![0x02],
            control: Control::Information { ns: 0, nr: 0, pf: true },
            segmented: false,
            info: Some(b"first".to_vec()),
        };
        let actions = server.handle_frame(&frame_0, Tick(1)).expect("handle NS=0");

        let delivered: Vec<Vec<u8>> = actions
            .into_iter()
            .filter_map(|a| if let ConnectionAction::DeliverPdu(p) = a { Some(p) } else { None })
            .collect();
        assert_eq!(delivered, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn connecting_rejects_non_ua() {
        let mut client: Connection<Tick> = Connection::new(config());
        client.connect().expect("connect");
        let bogus = Frame {
            da: vec![0x02],
            sa: vec![0x01],
            control: Control::Unnumbered(UnnumberedKind::Disc),
            segmented: false,
            info: None,
        };
        let err = client.handle_frame(&bogus, Tick(0)).expect_err("should reject");
        assert_eq!(err, HdlcError::InvalidUa);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn window_bound_enforced() {
        let mut client: Connection<Tick> = Connection::new(HdlcConfig {
            window_size: 2,
            max_frame_size: 1,
            src_addr: vec![0x02],
            dest_addr: vec![0x01],
            ..HdlcConfig::default()
        });
        client.state = ConnectionState::Connected;
        client.send(b"a", Tick(0)).expect("first send fits window");
        client.send(b"b", Tick(0)).expect("second send fits window");
        assert_eq!(client.outstanding_count(), 2);
        assert!(client.send(b"c", Tick(0)).is_err());
    }

    #[test]
    fn frmr_is_fatal() {
        let mut client: Connection<Tick> = Connection::new(config());
        client.state = ConnectionState::Connected;
        let frmr = Frame {
            da: vec![0x02],
            sa: vec![0x01],
            control: Control::Unnumbered(UnnumberedKind::Frmr),
            segmented: false,
            info: None,
        };
        let err = client.handle_frame(&frmr, Tick(0)).expect_err("should fail");
        assert_eq!(err, HdlcError::FrameRejected);
        assert!(err.fatal());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn unrecognized_control_gets_frmr_reply_not_a_fatal_error() {
        let mut server: Connection<Tick> = Connection::new(config());
        server.state = ConnectionState::Connected;
        let odd = Frame {
            da: vec![0x01],
            sa: vec![0x02],
            control: Control::Unknown(0xEF),
            segmented: false,
            info: None,
        };
        let actions = server.handle_frame(&odd, Tick(0)).expect("non-fatal");
        assert!(matches!(
            actions.as_slice(),
            [ConnectionAction::SendFrame(f)] if matches!(f.control, Control::Unnumbered(UnnumberedKind::Frmr))
        ));
        assert!(server.is_connected());
    }

    proptest::proptest! {
        /// Property 3: after any single `send`, outstanding frames never
        /// exceed `window_size`.
        #[test]
        fn prop_window_bound(
            window_size in 1u8..=7,
            max_frame_size in 1usize..64,
            pdu_len in 0usize..512,
        ) {
            let mut conn: Connection<Tick> = Connection::new(HdlcConfig {
                window_size,
                max_frame_size,
                src_addr: vec![0x02],
                dest_addr: vec![0x01],
                ..HdlcConfig::default()
            });
            conn.state = ConnectionState::Connected;
            let pdu = vec![0xAB; pdu_len];
            // Ignore the result: a PDU needing more segments than the window
            // allows is expected to fail with WindowFull.
            let _ = conn.send(&pdu, Tick(0));
            proptest::prop_assert!(conn.outstanding_count() <= usize::from(window_size));
        }

        /// Property 4: segmentation correctness — concatenating the segments
        /// `send` emits, in order, reproduces the original PDU.
        #[test]
        fn prop_segmentation_correctness(
            max_frame_size in 1usize..64,
            pdu in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..200),
        ) {
            let mut conn: Connection<Tick> = Connection::new(HdlcConfig {
                window_size: 7,
                max_frame_size,
                src_addr: vec![0x02],
                dest_addr: vec![0x01],
                ..HdlcConfig::default()
            });
            conn.state = ConnectionState::Connected;
            if let Ok(actions) = conn.send(&pdu, Tick(0)) {
                let mut reassembled = Vec::new();
                for action in actions {
                    if let ConnectionAction::SendFrame(frame) = action {
                        reassembled.extend(frame.info.unwrap_or_default());
                    }
                }
                proptest::prop_assert_eq!(reassembled, pdu);
            }
        }
    }
}
