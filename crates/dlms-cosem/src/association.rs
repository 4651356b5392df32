//! Association state: object-list membership, per-attribute/method access
//! rights, and the ACSE status lifecycle.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::obis::ObisCode;
use crate::object::AccessMask;

bitflags! {
    /// The security requirements an association (or a single request) must
    /// satisfy, checked against the secured-APDU security-control byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[allow(missing_docs)]
    pub struct SecurityPolicy: u8 {
        const AUTH_REQUIRED = 0b0000_0001;
        const ENCRYPT_REQUIRED = 0b0000_0010;
        const SIGNED_REQUIRED = 0b0000_0100;
        const AUTH_REQUIRED_RESPONSE = 0b0000_1000;
        const ENCRYPT_REQUIRED_RESPONSE = 0b0001_0000;
        const SIGNED_REQUIRED_RESPONSE = 0b0010_0000;
    }
}

/// The ACSE status lifecycle of one association, per §3/§4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationStatus {
    /// No AARQ has been accepted yet (or a prior one was released).
    NonAssociated,
    /// An LLS AARQ is being validated; transient, resolves within the same
    /// call that produced it.
    Pending,
    /// An HLS AARQ has been accepted and GUEK/GAK derived, but the
    /// reply-to-HLS confirmation has not yet arrived.
    AssociationPending,
    /// The association is fully established; requests may be routed.
    Associated,
}

/// Access rights granted to one OBIS code within an association.
#[derive(Debug, Clone, Default)]
pub struct ObjectAccessRights {
    /// Per-attribute access mask.
    pub attrs: HashMap<u8, AccessMask>,
    /// Per-method allow/deny.
    pub methods: HashMap<u8, bool>,
}

/// Negotiated application-context/conformance state, carried from the
/// InitiateRequest/InitiateResponse exchange (see [`crate::acse`]).
#[derive(Debug, Clone, Default)]
pub struct ContextInfo {
    /// Negotiated 24-bit conformance bitstring (stored as its 3 packed bytes).
    pub conformance: [u8; 3],
    /// Negotiated maximum PDU size, the smaller of client/server proposals.
    pub max_pdu_size: u16,
}

/// How the client authenticated during AARQ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMechanism {
    /// Low-Level Security: a plain password compared against a stored secret.
    Lls,
    /// High-Level Security: an ephemeral ECDH exchange followed by a
    /// reply-to-HLS confirmation.
    Hls,
}

/// One client's association to this server, per §3.
pub struct Association {
    /// This association's own logical-name OBIS code.
    pub logical_name: ObisCode,
    /// OBIS codes this association may address.
    pub object_list: Vec<ObisCode>,
    /// Per-object access rights, keyed by OBIS code.
    pub access_rights: HashMap<ObisCode, ObjectAccessRights>,
    /// Current ACSE status.
    pub status: AssociationStatus,
    /// Monotonic counter for this association's own outbound secured frames.
    pub server_invocation_counter: u32,
    /// Negotiated context from the Initiate exchange.
    pub context_info: ContextInfo,
    /// Authentication mechanism negotiated during AARQ.
    pub auth_mechanism: AuthMechanism,
    /// Security policy this association must satisfy.
    pub security_policy: SecurityPolicy,
}

impl Association {
    /// Build a fresh, not-yet-associated association.
    #[must_use]
    pub fn new(logical_name: ObisCode, auth_mechanism: AuthMechanism, security_policy: SecurityPolicy) -> Self {
        Self {
            logical_name,
            object_list: Vec::new(),
            access_rights: HashMap::new(),
            status: AssociationStatus::NonAssociated,
            server_invocation_counter: 0,
            context_info: ContextInfo::default(),
            auth_mechanism,
            security_policy,
        }
    }

    /// Whether `obis` is reachable by this association — the routing
    /// algorithm's step-3 membership check.
    #[must_use]
    pub fn can_address(&self, obis: ObisCode) -> bool {
        self.object_list.contains(&obis)
    }

    /// Back-fill a newly registered OBIS code into this association's
    /// `object_list`, unless it is already present (idempotent, per the
    /// registry's "Cyclic registration" contract).
    pub fn backfill(&mut self, obis: ObisCode) {
        if !self.object_list.contains(&obis) {
            self.object_list.push(obis);
        }
    }

    /// Grant attribute access for `obis`/`attribute_id`.
    pub fn grant_attribute(&mut self, obis: ObisCode, attribute_id: u8, mask: AccessMask) {
        self.access_rights.entry(obis).or_default().attrs.insert(attribute_id, mask);
        self.backfill(obis);
    }

    /// Grant method access for `obis`/`method_id`.
    pub fn grant_method(&mut self, obis: ObisCode, method_id: u8, allowed: bool) {
        self.access_rights.entry(obis).or_default().methods.insert(method_id, allowed);
        self.backfill(obis);
    }

    /// This association's declared rights for `attribute_id` on `obis`,
    /// if any were granted.
    #[must_use]
    pub fn attribute_rights(&self, obis: ObisCode, attribute_id: u8) -> Option<AccessMask> {
        self.access_rights.get(&obis)?.attrs.get(&attribute_id).copied()
    }

    /// This association's declared rights for `method_id` on `obis`.
    #[must_use]
    pub fn method_rights(&self, obis: ObisCode, method_id: u8) -> Option<bool> {
        self.access_rights.get(&obis)?.methods.get(&method_id).copied()
    }

    /// Reset to `NonAssociated`, per RLRQ/RLRE (§4.4), idempotent.
    pub fn release(&mut self) {
        self.status = AssociationStatus::NonAssociated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::AccessMask;

    fn obis() -> ObisCode {
        ObisCode::new(1, 0, 0, 3, 0, 255)
    }

    #[test]
    fn grant_backfills_object_list() {
        let mut assoc = Association::new(ObisCode::new(0, 0, 40, 0, 0, 255), AuthMechanism::Lls, SecurityPolicy::empty());
        assert!(!assoc.can_address(obis()));
        assoc.grant_attribute(obis(), 2, AccessMask::READ);
        assert!(assoc.can_address(obis()));
        assert_eq!(assoc.attribute_rights(obis(), 2), Some(AccessMask::READ));
    }

    #[test]
    fn backfill_is_idempotent() {
        let mut assoc = Association::new(ObisCode::new(0, 0, 40, 0, 0, 255), AuthMechanism::Lls, SecurityPolicy::empty());
        assoc.backfill(obis());
        assoc.backfill(obis());
        assert_eq!(assoc.object_list.iter().filter(|&&o| o == obis()).count(), 1);
    }

    #[test]
    fn release_resets_status() {
        let mut assoc = Association::new(ObisCode::new(0, 0, 40, 0, 0, 255), AuthMechanism::Lls, SecurityPolicy::empty());
        assoc.status = AssociationStatus::Associated;
        assoc.release();
        assert_eq!(assoc.status, AssociationStatus::NonAssociated);
    }
}
