//! Application-layer error taxonomy.
//!
//! [`CosemError`] is the internal error surface; [`CosemError::to_data_access_result`]
//! maps it onto the wire-level [`crate::apdu::DataAccessResult`] enum per the
//! §4.3 routing algorithm's error-mapping rules. Association-establishment
//! failures (AARQ/AARE, RLRQ/RLRE) are reported separately through
//! [`AssociationError`], since they precede any object dispatch.

use thiserror::Error;

use crate::apdu::DataAccessResult;

/// Errors raised while routing or dispatching one APDU.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CosemError {
    /// No association is registered for the calling client address.
    #[error("no association registered for this client")]
    NoSuchAssociation,

    /// No object is registered under the requested OBIS code.
    #[error("object undefined")]
    ObjectUndefined,

    /// The requested `class_id` does not match the registered object's class.
    #[error("object class inconsistent")]
    ObjectClassInconsistent,

    /// The target OBIS code is not in the calling association's object list,
    /// or the association lacks the right for this attribute/method.
    #[error("read/write denied")]
    ReadWriteDenied,

    /// A handler reported it does not support the requested operation.
    #[error("object unavailable")]
    ObjectUnavailable,

    /// A SET/ACTION payload did not match the attribute's/parameter's
    /// declared type.
    #[error("type unmatched")]
    TypeUnmatched,

    /// A handler reported an error with no closer mapping.
    #[error("other reason")]
    OtherReason,

    /// The request's security-control byte did not satisfy the
    /// association's security policy.
    #[error("security policy violated: {0}")]
    SecurityPolicyViolated(&'static str),

    /// The secured-APDU payload failed decryption or authentication.
    #[error("secured APDU rejected: {0}")]
    Security(#[from] dlms_crypto::SecurityError),

    /// The inner APDU failed to decode as A-XDR.
    #[error("malformed APDU: {0}")]
    Malformed(#[from] dlms_axdr::AxdrError),

    /// The APDU tag byte did not match any known request/response type.
    #[error("unrecognized APDU tag: {0:#04x}")]
    UnrecognizedTag(u8),
}

impl CosemError {
    /// Map to the wire-level data-access-result, per §4.3 step 4's
    /// dispatch-error mapping table.
    #[must_use]
    pub fn to_data_access_result(&self) -> DataAccessResult {
        match self {
            CosemError::NoSuchAssociation | CosemError::ReadWriteDenied => DataAccessResult::ReadWriteDenied,
            CosemError::ObjectUndefined => DataAccessResult::ObjectUndefined,
            CosemError::ObjectClassInconsistent => DataAccessResult::ObjectClassInconsistent,
            CosemError::ObjectUnavailable => DataAccessResult::ObjectUnavailable,
            CosemError::TypeUnmatched => DataAccessResult::TypeUnmatched,
            CosemError::SecurityPolicyViolated(_) | CosemError::Security(_) => DataAccessResult::ScopeOfAccessViolated,
            CosemError::OtherReason | CosemError::Malformed(_) | CosemError::UnrecognizedTag(_) => {
                DataAccessResult::OtherReason
            }
        }
    }
}

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, CosemError>;

/// Errors raised during ACSE establishment/release, distinct from
/// [`CosemError`] since they occur before any association exists to route
/// through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssociationError {
    /// LLS password did not match the stored secret.
    #[error("authentication failed: password mismatch")]
    BadPassword,

    /// HLS key agreement failed.
    #[error("authentication failed: key agreement error")]
    KeyAgreementFailed,

    /// An AARQ/RLRQ arrived for a client address with no prior association.
    #[error("no association exists for this client")]
    NoSuchAssociation,

    /// A reply-to-HLS challenge arrived while the association was not in
    /// `AssociationPending`.
    #[error("association is not pending HLS confirmation")]
    NotPending,
}

/// Convenience alias for ACSE results.
pub type AssociationResult<T> = std::result::Result<T, AssociationError>;
