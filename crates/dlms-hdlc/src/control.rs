//! HDLC control byte, structured per ISO 13239.
//!
//! I-frames and S-frames follow the standard modulo-8 layout exactly:
//! I-frame bit0=0, bits1-3=N(S), bit4=P/F, bits5-7=N(R); S-frame bits0-1=01,
//! bits2-3=subtype, bit4=P/F, bits5-7=N(R). U-frame command bytes (SNRM, UA,
//! DISC, FRMR, UI) are connection-management commands always sent with P/F
//! set in this core, so each is represented as a single fixed byte rather
//! than a general modifier-bit formula.

/// Supervisory-frame subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisoryKind {
    /// Receive Ready: acknowledges up to N(R), peer ready for more.
    Rr,
    /// Receive Not Ready: acknowledges up to N(R), peer not ready for more.
    Rnr,
    /// Reject: go-back-N retransmit request from N(R).
    Rej,
    /// Selective Reject: retransmit only frame N(R).
    Srej,
}

/// Unnumbered-frame command/response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnnumberedKind {
    /// Set Normal Response Mode: connection request.
    Snrm,
    /// Unnumbered Acknowledge: accepts SNRM or DISC.
    Ua,
    /// Disconnect: connection teardown request.
    Disc,
    /// Frame Reject: a received frame could not be processed.
    Frmr,
    /// Unnumbered Information: connectionless info (not used by the core
    /// connection state machine, recognized for completeness).
    Ui,
}

impl UnnumberedKind {
    const fn byte(self) -> u8 {
        match self {
            UnnumberedKind::Snrm => 0x83,
            UnnumberedKind::Ua => 0x63,
            UnnumberedKind::Disc => 0x53,
            UnnumberedKind::Frmr => 0x87,
            UnnumberedKind::Ui => 0x03,
        }
    }

    const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x83 => Some(UnnumberedKind::Snrm),
            0x63 => Some(UnnumberedKind::Ua),
            0x53 => Some(UnnumberedKind::Disc),
            0x87 => Some(UnnumberedKind::Frmr),
            0x03 => Some(UnnumberedKind::Ui),
            _ => None,
        }
    }
}

/// A decoded HDLC control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Information frame carrying a segment of a PDU.
    Information {
        /// Sender sequence number, mod 8.
        ns: u8,
        /// Receiver sequence number (cumulative ack), mod 8.
        nr: u8,
        /// Poll/Final bit.
        pf: bool,
    },
    /// Supervisory frame (RR/RNR/REJ/SREJ).
    Supervisory {
        /// Receiver sequence number.
        nr: u8,
        /// Poll/Final bit.
        pf: bool,
        /// Subtype.
        kind: SupervisoryKind,
    },
    /// Unnumbered frame (SNRM/UA/DISC/FRMR/UI).
    Unnumbered(UnnumberedKind),
    /// A byte matching neither a known I/S-frame shape nor a known U-frame
    /// command. Distinct from `Unnumbered(Frmr)`, which is the peer
    /// *telling us* it rejected one of our frames.
    Unknown(u8),
}

impl Control {
    /// Encode this control field to its single on-wire byte.
    #[must_use]
    pub fn encode(&self) -> u8 {
        match *self {
            Control::Information { ns, nr, pf } => {
                ((nr & 0x07) << 5) | (u8::from(pf) << 4) | ((ns & 0x07) << 1)
            }
            Control::Supervisory { nr, pf, kind } => {
                let subtype = match kind {
                    SupervisoryKind::Rr => 0b00,
                    SupervisoryKind::Rnr => 0b01,
                    SupervisoryKind::Rej => 0b10,
                    SupervisoryKind::Srej => 0b11,
                };
                ((nr & 0x07) << 5) | (u8::from(pf) << 4) | (subtype << 2) | 0b01
            }
            Control::Unnumbered(kind) => kind.byte(),
            Control::Unknown(byte) => byte,
        }
    }

    /// Decode a control byte.
    #[must_use]
    pub fn decode(byte: u8) -> Control {
        if byte & 0x01 == 0 {
            return Control::Information {
                ns: (byte >> 1) & 0x07,
                pf: (byte & 0x10) != 0,
                nr: (byte >> 5) & 0x07,
            };
        }
        if byte & 0x03 == 0b01 {
            let subtype = (byte >> 2) & 0x03;
            let kind = match subtype {
                0b00 => SupervisoryKind::Rr,
                0b01 => SupervisoryKind::Rnr,
                0b10 => SupervisoryKind::Rej,
                _ => SupervisoryKind::Srej,
            };
            return Control::Supervisory { nr: (byte >> 5) & 0x07, pf: (byte & 0x10) != 0, kind };
        }
        match UnnumberedKind::from_byte(byte) {
            Some(kind) => Control::Unnumbered(kind),
            // An unrecognized control byte is not a framing error: §4.2's
            // state table handles it as a Connected-state transition (emit
            // FRMR naming the rejected byte), not a decode failure.
            None => Control::Unknown(byte),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snrm_matches_scenario_byte() {
        assert_eq!(Control::Unnumbered(UnnumberedKind::Snrm).encode(), 0x83);
    }

    #[test]
    fn ua_matches_scenario_byte() {
        assert_eq!(Control::Unnumbered(UnnumberedKind::Ua).encode(), 0x63);
    }

    #[test]
    fn information_round_trip() {
        let c = Control::Information { ns: 3, nr: 5, pf: true };
        let byte = c.encode();
        assert_eq!(Control::decode(byte), c);
    }

    #[test]
    fn supervisory_round_trip() {
        for kind in [SupervisoryKind::Rr, SupervisoryKind::Rnr, SupervisoryKind::Rej, SupervisoryKind::Srej] {
            let c = Control::Supervisory { nr: 2, pf: false, kind };
            let byte = c.encode();
            assert_eq!(Control::decode(byte), c);
        }
    }
}
