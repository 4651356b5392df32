//! The application-layer routing algorithm, per §4.3:
//!
//! 1. Look up the association for the calling client address.
//! 2. Look up the target object by OBIS code.
//! 3. Check object-list membership and the association's granted rights.
//! 4. Dispatch GET/SET/ACTION, mapping any failure through
//!    [`crate::error::CosemError::to_data_access_result`].
//! 5. Encode the response APDU, re-wrapping it under the association's
//!    security suite if the request arrived secured.

use std::collections::HashMap;

use dlms_axdr::Value;
use dlms_crypto::{SecurityHeader, SecuritySetup};
use tracing::{debug, warn};

use crate::apdu::{
    tag, ActionRequest, ActionResponse, AttributeDescriptor, DataAccessResult, GetRequest, GetResponse,
    MethodDescriptor, ResponseData, SetRequest, SetResponse,
};
use crate::association::{Association, SecurityPolicy};
use crate::error::{CosemError, Result};
use crate::object::{AccessMask, Registry};

/// A calling client's logical HDLC/WRAPPER address, used purely as a lookup
/// key here; this crate does not interpret transport addressing itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientAddress(pub u32);

/// Owns every association and its security state, plus the shared object
/// registry all of them dispatch against.
#[derive(Default)]
pub struct Router {
    /// Per-client association state.
    pub associations: HashMap<ClientAddress, Association>,
    /// Per-client security setup, present only for associations using a
    /// secured suite.
    pub security: HashMap<ClientAddress, SecuritySetup>,
    /// Object registry shared by every association.
    pub registry: Registry,
}

impl Router {
    /// Build an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new association, back-filling its `object_list` with every
    /// OBIS code already in the shared registry before it starts routing.
    /// Objects registered later still reach this association only through an
    /// explicit [`Association::grant_attribute`]/[`Association::grant_method`]
    /// call, which calls [`Association::backfill`] itself.
    pub fn add_association(&mut self, client: ClientAddress, mut assoc: Association) {
        for obis in self.registry.obis_codes() {
            assoc.backfill(obis);
        }
        self.associations.insert(client, assoc);
    }

    /// Route one inbound APDU (tag byte included) from `client`, returning
    /// the encoded response APDU.
    ///
    /// # Errors
    ///
    /// Returns an error only for conditions that prevent producing any
    /// response at all (malformed security wrapper, unrecognized tag);
    /// attribute/method-level failures, *and* a missing association, are
    /// instead reported inside the response APDU as a `DataAccessResult`
    /// (an association miss is treated exactly like an object-list miss:
    /// `ReadWriteDenied`).
    pub fn route(&mut self, client: ClientAddress, apdu: &[u8]) -> Result<Vec<u8>> {
        let (&wire_tag, body) = apdu.split_first().ok_or(CosemError::UnrecognizedTag(0))?;
        let plain_tag = tag::unsecured(wire_tag);
        let secured = tag::is_secured(wire_tag);
        debug!(client = client.0, tag = wire_tag, secured, "routing inbound APDU");

        // A secured request's ciphertext wraps the complete plaintext APDU,
        // tag byte included, so a second tag needs stripping after decryption.
        let (body, header) = if secured {
            let (decrypted, header) = self.unwrap_security(client, body)?;
            let (&inner_tag, rest) = decrypted.split_first().ok_or(CosemError::UnrecognizedTag(0))?;
            if tag::unsecured(inner_tag) != plain_tag {
                return Err(CosemError::UnrecognizedTag(inner_tag));
            }
            (rest.to_vec(), header)
        } else {
            (body.to_vec(), SecurityHeader { security_control: 0, frame_counter: 0 })
        };

        let assoc = self.associations.get(&client);
        if assoc.is_none() {
            warn!(client = client.0, "no association for this client address");
        }
        if let Some(assoc) = assoc {
            check_security_policy(assoc, secured, header)?;
        }

        let response = match plain_tag {
            tag::GET_REQUEST => {
                let request = GetRequest::decode_body(&body)?;
                let resp = match assoc {
                    Some(assoc) => dispatch_get(assoc, &self.registry, &request),
                    None => denied_get_response(&request),
                };
                resp.encode()?
            }
            tag::SET_REQUEST => {
                let request = SetRequest::decode_body(&body)?;
                let resp = match assoc {
                    Some(_) => dispatch_set(
                        self.associations.get(&client).expect("checked Some above"),
                        &mut self.registry,
                        &request,
                    ),
                    None => denied_set_response(&request),
                };
                resp.encode()
            }
            tag::ACTION_REQUEST => {
                let request = ActionRequest::decode_body(&body)?;
                let resp = match assoc {
                    Some(assoc) => dispatch_action(assoc, &self.registry, &request),
                    None => denied_action_response(&request),
                };
                resp.encode()?
            }
            other => return Err(CosemError::UnrecognizedTag(other)),
        };

        if secured {
            self.wrap_security(client, &response)
        } else {
            Ok(response)
        }
    }

    fn unwrap_security(&mut self, client: ClientAddress, body: &[u8]) -> Result<(Vec<u8>, SecurityHeader)> {
        if body.len() < SecurityHeader::SIZE {
            return Err(CosemError::SecurityPolicyViolated("secured APDU shorter than the security header"));
        }
        let (header_bytes, sealed) = body.split_at(SecurityHeader::SIZE);
        let mut header_array = [0u8; SecurityHeader::SIZE];
        header_array.copy_from_slice(header_bytes);
        let header = SecurityHeader::decode(&header_array);

        let setup = self
            .security
            .get_mut(&client)
            .ok_or(CosemError::SecurityPolicyViolated("no security setup for this association"))?;
        let plaintext = setup.decrypt_and_verify(false, header, sealed).map_err(|err| {
            warn!(client = client.0, %err, "secured APDU rejected");
            CosemError::from(err)
        })?;
        Ok((plaintext, header))
    }

    fn wrap_security(&mut self, client: ClientAddress, plaintext: &[u8]) -> Result<Vec<u8>> {
        let assoc = self.associations.get_mut(&client).ok_or(CosemError::NoSuchAssociation)?;
        let setup = self
            .security
            .get_mut(&client)
            .ok_or(CosemError::SecurityPolicyViolated("no security setup for this association"))?;
        let sealed = setup.encrypt_and_tag(false, plaintext)?;
        assoc.server_invocation_counter += 1;

        let mut out = Vec::with_capacity(1 + SecurityHeader::SIZE + sealed.len());
        let response_tag = match plaintext.first().copied() {
            Some(t) => tag::unsecured(t),
            None => return Err(CosemError::OtherReason),
        };
        let secured_tag = secure_tag_for(response_tag)?;
        out.push(secured_tag);
        let header = SecurityHeader {
            security_control: dlms_crypto::SC_AUTH_ENCRYPTED,
            frame_counter: setup.next_outbound_frame_counter - 1,
        };
        out.extend_from_slice(&header.encode());
        out.extend_from_slice(&sealed);
        Ok(out)
    }
}

fn secure_tag_for(plain_tag: u8) -> Result<u8> {
    Ok(match plain_tag {
        tag::GET_RESPONSE => tag::GET_RESPONSE_SECURED,
        tag::SET_RESPONSE => tag::SET_RESPONSE_SECURED,
        tag::ACTION_RESPONSE => tag::ACTION_RESPONSE_SECURED,
        other => return Err(CosemError::UnrecognizedTag(other)),
    })
}

/// Reject a request that does not meet the association's security policy
/// before any dispatch happens. `SIGNED_REQUIRED`/`SIGNED_REQUIRED_RESPONSE`
/// are reserved: no signing suite is wired up here, only the GCM
/// authenticate/encrypt suites, so those bits go unchecked.
fn check_security_policy(assoc: &Association, secured: bool, header: SecurityHeader) -> Result<()> {
    let policy = assoc.security_policy;
    if policy.contains(SecurityPolicy::AUTH_REQUIRED) && !(secured && header.is_authenticated()) {
        return Err(CosemError::SecurityPolicyViolated("association requires an authenticated request"));
    }
    if policy.contains(SecurityPolicy::ENCRYPT_REQUIRED) && !(secured && header.is_encrypted()) {
        return Err(CosemError::SecurityPolicyViolated("association requires an encrypted request"));
    }
    Ok(())
}

fn check_attribute_access(assoc: &Association, descriptor: AttributeDescriptor, needed: AccessMask) -> Result<()> {
    if !assoc.can_address(descriptor.instance_id) {
        return Err(CosemError::ReadWriteDenied);
    }
    let rights = assoc
        .attribute_rights(descriptor.instance_id, descriptor.attribute_id as u8)
        .ok_or(CosemError::ReadWriteDenied)?;
    if !rights.contains(needed) {
        return Err(CosemError::ReadWriteDenied);
    }
    Ok(())
}

fn check_method_access(assoc: &Association, descriptor: MethodDescriptor) -> Result<()> {
    if !assoc.can_address(descriptor.instance_id) {
        return Err(CosemError::ReadWriteDenied);
    }
    let allowed = assoc
        .method_rights(descriptor.instance_id, descriptor.method_id as u8)
        .ok_or(CosemError::ReadWriteDenied)?;
    if !allowed {
        return Err(CosemError::ReadWriteDenied);
    }
    Ok(())
}

fn get_one(assoc: &Association, registry: &Registry, descriptor: AttributeDescriptor) -> Result<Value> {
    check_attribute_access(assoc, descriptor, AccessMask::READ)?;
    let object = registry.get(descriptor.instance_id).ok_or(CosemError::ObjectUndefined)?;
    if object.class_id != descriptor.class_id {
        return Err(CosemError::ObjectClassInconsistent);
    }
    object.get_attribute(descriptor.attribute_id)
}

/// A `ReadWriteDenied` response for a GET-Request with no association to
/// dispatch against, per §4.3 routing step 1: treated as if the object is
/// not listed.
#[must_use]
fn denied_get_response(request: &GetRequest) -> GetResponse {
    GetResponse {
        invoke_id_priority: request.invoke_id_priority,
        result: ResponseData::Result(DataAccessResult::ReadWriteDenied),
    }
}

/// A `ReadWriteDenied` response for a SET-Request with no association.
#[must_use]
fn denied_set_response(request: &SetRequest) -> SetResponse {
    SetResponse { invoke_id_priority: request.invoke_id_priority, result: DataAccessResult::ReadWriteDenied }
}

/// A `ReadWriteDenied` response for an Action-Request with no association.
#[must_use]
fn denied_action_response(request: &ActionRequest) -> ActionResponse {
    ActionResponse {
        invoke_id_priority: request.invoke_id_priority,
        result: ResponseData::Result(DataAccessResult::ReadWriteDenied),
    }
}

/// Dispatch one GET-Request, never failing outright: any error becomes a
/// `DataAccessResult` inside the response.
#[must_use]
pub fn dispatch_get(assoc: &Association, registry: &Registry, request: &GetRequest) -> GetResponse {
    let result = match get_one(assoc, registry, request.descriptor) {
        Ok(value) => ResponseData::Data(value),
        Err(err) => {
            warn!(obis = %request.descriptor.instance_id, attribute = request.descriptor.attribute_id, %err, "GET denied");
            ResponseData::Result(err.to_data_access_result())
        }
    };
    GetResponse { invoke_id_priority: request.invoke_id_priority, result }
}

fn set_one(assoc: &Association, registry: &mut Registry, descriptor: AttributeDescriptor, value: Value) -> Result<()> {
    check_attribute_access(assoc, descriptor, AccessMask::WRITE)?;
    let object = registry.get_mut(descriptor.instance_id).ok_or(CosemError::ObjectUndefined)?;
    if object.class_id != descriptor.class_id {
        return Err(CosemError::ObjectClassInconsistent);
    }
    object.set_attribute(descriptor.attribute_id, value)
}

/// Dispatch one SET-Request.
#[must_use]
pub fn dispatch_set(assoc: &Association, registry: &mut Registry, request: &SetRequest) -> SetResponse {
    let result = match set_one(assoc, registry, request.descriptor, request.value.clone()) {
        Ok(()) => DataAccessResult::Success,
        Err(err) => {
            warn!(obis = %request.descriptor.instance_id, attribute = request.descriptor.attribute_id, %err, "SET denied");
            err.to_data_access_result()
        }
    };
    SetResponse { invoke_id_priority: request.invoke_id_priority, result }
}

fn invoke_one(assoc: &Association, registry: &Registry, descriptor: MethodDescriptor, params: &Value) -> Result<Value> {
    check_method_access(assoc, descriptor)?;
    let object = registry.get(descriptor.instance_id).ok_or(CosemError::ObjectUndefined)?;
    if object.class_id != descriptor.class_id {
        return Err(CosemError::ObjectClassInconsistent);
    }
    object.invoke(descriptor.method_id, params)
}

/// Dispatch one Action-Request.
#[must_use]
pub fn dispatch_action(assoc: &Association, registry: &Registry, request: &ActionRequest) -> ActionResponse {
    let result = match invoke_one(assoc, registry, request.descriptor, &request.parameters) {
        Ok(value) => ResponseData::Data(value),
        Err(err) => {
            warn!(obis = %request.descriptor.instance_id, method = request.descriptor.method_id, %err, "ACTION denied");
            ResponseData::Result(err.to_data_access_result())
        }
    };
    ActionResponse { invoke_id_priority: request.invoke_id_priority, result }
}
