//! ACSE: association establishment and release, per §4.4.
//!
//! `AARQ`/`AARE` carry the negotiation (application context, authentication
//! mechanism, the nested `InitiateRequest`/`InitiateResponse`); `RLRQ`/`RLRE`
//! release it. LLS resolves within `process_aarq`; HLS additionally needs
//! [`begin_hls`] (derive GUEK/GAK from the client's ephemeral public key) and
//! [`confirm_hls`] (accept the client's reply-to-HLS challenge response).

use dlms_crypto::{DerivedKeys, EphemeralKeyAgreement};
use tracing::{debug, warn};

use crate::association::{Association, AssociationStatus, AuthMechanism};
use crate::error::{AssociationError, AssociationResult};

/// The nested negotiation PDU carried as AARQ user-information, fields
/// grounded on common DLMS xDLMS-Initiate-request practice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateRequest {
    /// Dedicated key for this association, if the client supplied one.
    pub dedicated_key: Option<Vec<u8>>,
    /// Whether the client accepts a response at all (always true in practice).
    pub response_allowed: bool,
    /// Proposed quality of service, vendor-specific.
    pub proposed_quality_of_service: Option<i8>,
    /// Proposed DLMS version number.
    pub proposed_dlms_version_number: u8,
    /// Proposed 24-bit conformance bitstring, packed as 3 bytes.
    pub proposed_conformance: [u8; 3],
    /// Maximum PDU size the client is willing to receive.
    pub client_max_receive_pdu_size: u16,
}

impl InitiateRequest {
    /// Encode to its wire form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_optional_bytes(&mut out, self.dedicated_key.as_deref());
        out.push(u8::from(self.response_allowed));
        encode_optional_i8(&mut out, self.proposed_quality_of_service);
        out.push(self.proposed_dlms_version_number);
        out.extend_from_slice(&self.proposed_conformance);
        out.extend_from_slice(&self.client_max_receive_pdu_size.to_be_bytes());
        out
    }

    /// Decode from its wire form.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let mut cursor = Cursor::new(bytes);
        let dedicated_key = cursor.read_optional_bytes()?;
        let response_allowed = cursor.read_u8()? != 0;
        let proposed_quality_of_service = cursor.read_optional_i8()?;
        let proposed_dlms_version_number = cursor.read_u8()?;
        let proposed_conformance = cursor.read_array_3()?;
        let client_max_receive_pdu_size = cursor.read_u16()?;
        Some(Self {
            dedicated_key,
            response_allowed,
            proposed_quality_of_service,
            proposed_dlms_version_number,
            proposed_conformance,
            client_max_receive_pdu_size,
        })
    }
}

/// The nested negotiation PDU carried as AARE user-information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateResponse {
    /// Negotiated quality of service, if the server overrides the proposal.
    pub negotiated_quality_of_service: Option<i8>,
    /// Negotiated DLMS version number.
    pub negotiated_dlms_version_number: u8,
    /// Negotiated conformance, the bitwise AND of client and server support.
    pub negotiated_conformance: [u8; 3],
    /// Maximum PDU size the server is willing to send.
    pub server_max_receive_pdu_size: u16,
    /// VAA (Value Attribute Association) name for this association.
    pub vaa_name: u16,
}

impl InitiateResponse {
    /// Encode to its wire form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_optional_i8(&mut out, self.negotiated_quality_of_service);
        out.push(self.negotiated_dlms_version_number);
        out.extend_from_slice(&self.negotiated_conformance);
        out.extend_from_slice(&self.server_max_receive_pdu_size.to_be_bytes());
        out.extend_from_slice(&self.vaa_name.to_be_bytes());
        out
    }

    /// Decode from its wire form.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let mut cursor = Cursor::new(bytes);
        let negotiated_quality_of_service = cursor.read_optional_i8()?;
        let negotiated_dlms_version_number = cursor.read_u8()?;
        let negotiated_conformance = cursor.read_array_3()?;
        let server_max_receive_pdu_size = cursor.read_u16()?;
        let vaa_name = cursor.read_u16()?;
        Some(Self {
            negotiated_quality_of_service,
            negotiated_dlms_version_number,
            negotiated_conformance,
            server_max_receive_pdu_size,
            vaa_name,
        })
    }
}

/// Which authentication mechanism an AARQ names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMechanismName {
    /// No authentication (lowest security).
    None,
    /// Low-Level Security: a plain password.
    Lls,
    /// High-Level Security: ephemeral ECDH plus a reply-to-HLS challenge.
    Hls,
}

/// An association request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aarq {
    /// Negotiated authentication mechanism.
    pub mechanism_name: AuthMechanismName,
    /// LLS password, or the client's ephemeral public key for HLS.
    pub calling_authentication_value: Option<Vec<u8>>,
    /// Encoded `InitiateRequest`.
    pub user_information: Vec<u8>,
}

/// The outcome of an association request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationResultCode {
    /// Accepted; the association moves to `Associated` (LLS) or
    /// `AssociationPending` (HLS).
    Accepted,
    /// Rejected; no retry will help without renegotiation.
    RejectedPermanent,
    /// Rejected; a retry may succeed (e.g. a concurrent association limit).
    RejectedTransient,
}

/// An association response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aare {
    /// Outcome of the request.
    pub result: AssociationResultCode,
    /// For HLS: the server's ephemeral public key, to complete key agreement.
    pub responding_authentication_value: Option<Vec<u8>>,
    /// Encoded `InitiateResponse`, present only when `result` is `Accepted`.
    pub user_information: Option<Vec<u8>>,
}

/// A release request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rlrq {
    /// Release reason, vendor-specific; 0 means normal.
    pub reason: u8,
}

/// A release response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rlre {
    /// Release reason, mirrors the request.
    pub reason: u8,
}

/// Validate an LLS AARQ against the stored password and transition the
/// association straight to `Associated`.
pub fn process_lls_aarq(assoc: &mut Association, aarq: &Aarq, stored_password: &[u8]) -> AssociationResult<Aare> {
    if aarq.mechanism_name != AuthMechanismName::Lls {
        return Err(AssociationError::BadPassword);
    }
    let supplied = aarq.calling_authentication_value.as_deref().unwrap_or(&[]);
    if supplied != stored_password {
        warn!(logical_name = %assoc.logical_name, "LLS AARQ rejected: password mismatch");
        return Err(AssociationError::BadPassword);
    }
    assoc.auth_mechanism = AuthMechanism::Lls;
    assoc.status = AssociationStatus::Associated;
    debug!(logical_name = %assoc.logical_name, "LLS association established");
    Ok(Aare { result: AssociationResultCode::Accepted, responding_authentication_value: None, user_information: None })
}

/// Begin an HLS AARQ: derive GUEK/GAK from the client's ephemeral public key
/// and move the association to `AssociationPending`, awaiting the client's
/// reply-to-HLS confirmation.
pub fn begin_hls(assoc: &mut Association, aarq: &Aarq) -> AssociationResult<(Aare, DerivedKeys)> {
    if aarq.mechanism_name != AuthMechanismName::Hls {
        return Err(AssociationError::KeyAgreementFailed);
    }
    let peer_public_key = aarq.calling_authentication_value.as_deref().ok_or(AssociationError::KeyAgreementFailed)?;

    let server_keys = EphemeralKeyAgreement::generate();
    let derived = server_keys.derive(peer_public_key).map_err(|_| {
        warn!(logical_name = %assoc.logical_name, "HLS key agreement failed");
        AssociationError::KeyAgreementFailed
    })?;

    assoc.auth_mechanism = AuthMechanism::Hls;
    assoc.status = AssociationStatus::AssociationPending;
    debug!(logical_name = %assoc.logical_name, "HLS association pending reply-to-HLS confirmation");

    let aare = Aare {
        result: AssociationResultCode::Accepted,
        responding_authentication_value: Some(server_keys.public_key_bytes()),
        user_information: None,
    };
    Ok((aare, derived))
}

/// Accept the client's reply-to-HLS confirmation, moving the association
/// from `AssociationPending` to `Associated`.
pub fn confirm_hls(assoc: &mut Association) -> AssociationResult<()> {
    if assoc.status != AssociationStatus::AssociationPending {
        return Err(AssociationError::NotPending);
    }
    assoc.status = AssociationStatus::Associated;
    debug!(logical_name = %assoc.logical_name, "HLS association confirmed");
    Ok(())
}

/// Release an association, idempotently resetting it to `NonAssociated`.
pub fn process_rlrq(assoc: &mut Association, rlrq: Rlrq) -> Rlre {
    assoc.release();
    Rlre { reason: rlrq.reason }
}

fn encode_optional_bytes(out: &mut Vec<u8>, value: Option<&[u8]>) {
    match value {
        Some(bytes) => {
            out.push(1);
            out.push(bytes.len() as u8);
            out.extend_from_slice(bytes);
        }
        None => out.push(0),
    }
}

fn encode_optional_i8(out: &mut Vec<u8>, value: Option<i8>) {
    match value {
        Some(v) => {
            out.push(1);
            out.push(v as u8);
        }
        None => out.push(0),
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn read_u16(&mut self) -> Option<u16> {
        let hi = self.read_u8()?;
        let lo = self.read_u8()?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    fn read_array_3(&mut self) -> Option<[u8; 3]> {
        let a = self.read_u8()?;
        let b = self.read_u8()?;
        let c = self.read_u8()?;
        Some([a, b, c])
    }

    fn read_optional_bytes(&mut self) -> Option<Option<Vec<u8>>> {
        let present = self.read_u8()?;
        if present == 0 {
            return Some(None);
        }
        let len = self.read_u8()? as usize;
        let start = self.pos;
        let end = start.checked_add(len)?;
        let slice = self.bytes.get(start..end)?;
        self.pos = end;
        Some(Some(slice.to_vec()))
    }

    fn read_optional_i8(&mut self) -> Option<Option<i8>> {
        let present = self.read_u8()?;
        if present == 0 {
            return Some(None);
        }
        Some(Some(self.read_u8()? as i8))
    }
}
