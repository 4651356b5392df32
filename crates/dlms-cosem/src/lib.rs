//! COSEM: the DLMS application layer built on top of [`dlms_axdr`]'s A-XDR
//! codec and [`dlms_crypto`]'s security suites.
//!
//! [`obis`] and [`object`] define what can be addressed; [`apdu`] defines the
//! wire forms that address it; [`association`] and [`acse`] establish who is
//! allowed to address it; [`router`] ties all four together into the
//! request-in, response-out dispatch loop.

pub mod acse;
pub mod apdu;
pub mod association;
pub mod error;
pub mod obis;
pub mod object;
pub mod router;

pub use acse::{
    begin_hls, confirm_hls, process_lls_aarq, process_rlrq, Aare, Aarq, AssociationResultCode, AuthMechanismName,
    InitiateRequest, InitiateResponse, Rlre, Rlrq,
};
pub use apdu::{
    ActionRequest, ActionResponse, AttributeDescriptor, DataAccessResult, GetRequest, GetResponse, MethodDescriptor,
    ResponseData, SetRequest, SetResponse,
};
pub use association::{Association, AssociationStatus, AuthMechanism, SecurityPolicy};
pub use error::{AssociationError, AssociationResult, CosemError, Result};
pub use obis::ObisCode;
pub use object::{AccessMask, AttrDesc, MethodDesc, MethodHandler, Object, PostActionHook, PostWriteHook, ReadHook, Registry, Validator};
pub use router::{ClientAddress, Router};
