//! GET/SET/ACTION APDU structures: tags, descriptors, and the
//! data-access-result enum, per §3/§4.3.

use dlms_axdr::{decode_value, AxdrError, Value};

use crate::error::{CosemError, Result};
use crate::obis::ObisCode;

/// Wire tags for every APDU type this core dispatches.
pub mod tag {
    /// Get-Request, unsecured.
    pub const GET_REQUEST: u8 = 0xC0;
    /// Set-Request, unsecured.
    pub const SET_REQUEST: u8 = 0xC1;
    /// Action-Request, unsecured.
    pub const ACTION_REQUEST: u8 = 0xC3;
    /// Get-Response, unsecured.
    pub const GET_RESPONSE: u8 = 0xC4;
    /// Set-Response, unsecured.
    pub const SET_RESPONSE: u8 = 0xC5;
    /// Action-Response, unsecured.
    pub const ACTION_RESPONSE: u8 = 0xC7;
    /// Get-Request, secured.
    pub const GET_REQUEST_SECURED: u8 = 0xC8;
    /// Set-Request, secured.
    pub const SET_REQUEST_SECURED: u8 = 0xC9;
    /// Action-Request, secured.
    pub const ACTION_REQUEST_SECURED: u8 = 0xCB;
    /// Get-Response, secured.
    pub const GET_RESPONSE_SECURED: u8 = 0xCC;
    /// Set-Response, secured.
    pub const SET_RESPONSE_SECURED: u8 = 0xCD;
    /// Action-Response, secured.
    pub const ACTION_RESPONSE_SECURED: u8 = 0xCF;

    /// Whether `t` is one of the secured variants.
    #[must_use]
    pub const fn is_secured(t: u8) -> bool {
        matches!(t, GET_REQUEST_SECURED | SET_REQUEST_SECURED | ACTION_REQUEST_SECURED)
            || matches!(t, GET_RESPONSE_SECURED | SET_RESPONSE_SECURED | ACTION_RESPONSE_SECURED)
    }

    /// Strip the "secured" bit, mapping a secured tag to its plaintext
    /// counterpart (and leaving an already-plaintext tag unchanged).
    #[must_use]
    pub const fn unsecured(t: u8) -> u8 {
        match t {
            GET_REQUEST_SECURED => GET_REQUEST,
            SET_REQUEST_SECURED => SET_REQUEST,
            ACTION_REQUEST_SECURED => ACTION_REQUEST,
            GET_RESPONSE_SECURED => GET_RESPONSE,
            SET_RESPONSE_SECURED => SET_RESPONSE,
            ACTION_RESPONSE_SECURED => ACTION_RESPONSE,
            other => other,
        }
    }
}

/// `{class_id, instance_id, attribute_id}`, addressing one attribute for
/// GET/SET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// COSEM interface class identifier.
    pub class_id: u16,
    /// OBIS code of the object instance.
    pub instance_id: ObisCode,
    /// Attribute number, 1-based.
    pub attribute_id: i8,
}

impl AttributeDescriptor {
    const SIZE: usize = 2 + 6 + 1;

    fn encode_into(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.class_id.to_be_bytes());
        out.extend_from_slice(&self.instance_id.to_bytes());
        out.push(self.attribute_id as u8);
    }

    fn decode(buf: &[u8]) -> Result<(Self, &[u8])> {
        if buf.len() < Self::SIZE {
            return Err(CosemError::Malformed(AxdrError::LengthOverflow {
                needed: Self::SIZE,
                available: buf.len(),
            }));
        }
        let class_id = u16::from_be_bytes([buf[0], buf[1]]);
        let instance_id = ObisCode::from_bytes([buf[2], buf[3], buf[4], buf[5], buf[6], buf[7]]);
        let attribute_id = buf[8] as i8;
        Ok((Self { class_id, instance_id, attribute_id }, &buf[Self::SIZE..]))
    }
}

/// `{class_id, instance_id, method_id}`, addressing one method for ACTION.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// COSEM interface class identifier.
    pub class_id: u16,
    /// OBIS code of the object instance.
    pub instance_id: ObisCode,
    /// Method number, 1-based.
    pub method_id: i8,
}

impl MethodDescriptor {
    const SIZE: usize = 2 + 6 + 1;

    fn encode_into(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.class_id.to_be_bytes());
        out.extend_from_slice(&self.instance_id.to_bytes());
        out.push(self.method_id as u8);
    }

    fn decode(buf: &[u8]) -> Result<(Self, &[u8])> {
        if buf.len() < Self::SIZE {
            return Err(CosemError::Malformed(AxdrError::LengthOverflow {
                needed: Self::SIZE,
                available: buf.len(),
            }));
        }
        let class_id = u16::from_be_bytes([buf[0], buf[1]]);
        let instance_id = ObisCode::from_bytes([buf[2], buf[3], buf[4], buf[5], buf[6], buf[7]]);
        let method_id = buf[8] as i8;
        Ok((Self { class_id, instance_id, method_id }, &buf[Self::SIZE..]))
    }
}

/// The data-access-result enum, selected values per §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataAccessResult {
    /// Request succeeded.
    Success,
    /// Underlying hardware reported a fault.
    HardwareFault,
    /// Request could not complete now; retry may succeed later.
    TemporaryFailure,
    /// Calling association lacks the right for this attribute/method.
    ReadWriteDenied,
    /// Requested OBIS/class combination is not registered.
    ObjectUndefined,
    /// Requested class_id does not match the registered object's class.
    ObjectClassInconsistent,
    /// Object exists but is not currently available.
    ObjectUnavailable,
    /// Payload type did not match the attribute's/parameter's declared type.
    TypeUnmatched,
    /// Requested access falls outside what is authorized.
    ScopeOfAccessViolated,
    /// No closer mapping applies.
    OtherReason,
}

impl DataAccessResult {
    /// Encode to the one-byte wire form.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            DataAccessResult::Success => 0,
            DataAccessResult::HardwareFault => 1,
            DataAccessResult::TemporaryFailure => 2,
            DataAccessResult::ReadWriteDenied => 3,
            DataAccessResult::ObjectUndefined => 4,
            DataAccessResult::ObjectClassInconsistent => 9,
            DataAccessResult::ObjectUnavailable => 11,
            DataAccessResult::TypeUnmatched => 12,
            DataAccessResult::ScopeOfAccessViolated => 13,
            DataAccessResult::OtherReason => 250,
        }
    }

    /// Decode from the one-byte wire form.
    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            0 => DataAccessResult::Success,
            1 => DataAccessResult::HardwareFault,
            2 => DataAccessResult::TemporaryFailure,
            3 => DataAccessResult::ReadWriteDenied,
            4 => DataAccessResult::ObjectUndefined,
            9 => DataAccessResult::ObjectClassInconsistent,
            11 => DataAccessResult::ObjectUnavailable,
            12 => DataAccessResult::TypeUnmatched,
            13 => DataAccessResult::ScopeOfAccessViolated,
            250 => DataAccessResult::OtherReason,
            other => return Err(CosemError::Malformed(AxdrError::UnsupportedTag { tag: other })),
        })
    }
}

/// The CHOICE every response carries: normal data, or a data-access-result.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// Tag `0x00`: the attribute's/action's return value.
    Data(Value),
    /// Tag `0x01`: a failure result in lieu of data.
    Result(DataAccessResult),
}

impl ResponseData {
    fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            ResponseData::Data(value) => {
                out.push(0x00);
                value.encode_into(out)?;
            }
            ResponseData::Result(result) => {
                out.push(0x01);
                out.push(result.to_byte());
            }
        }
        Ok(())
    }

    fn decode(buf: &[u8]) -> Result<(Self, &[u8])> {
        let (&choice, rest) = buf.split_first().ok_or(CosemError::Malformed(AxdrError::LengthOverflow {
            needed: 1,
            available: 0,
        }))?;
        match choice {
            0x00 => {
                let (value, rest) = decode_value(rest)?;
                Ok((ResponseData::Data(value), rest))
            }
            0x01 => {
                let (&byte, rest) = rest.split_first().ok_or(CosemError::Malformed(AxdrError::LengthOverflow {
                    needed: 1,
                    available: 0,
                }))?;
                Ok((ResponseData::Result(DataAccessResult::from_byte(byte)?), rest))
            }
            other => Err(CosemError::Malformed(AxdrError::UnsupportedTag { tag: other })),
        }
    }
}

/// Get-Request-Normal: read one attribute, no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetRequest {
    /// Invoke-id and priority, opaque to this core.
    pub invoke_id_priority: u8,
    /// Attribute being read.
    pub descriptor: AttributeDescriptor,
}

impl GetRequest {
    /// Encode with the unsecured tag.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![tag::GET_REQUEST, self.invoke_id_priority];
        self.descriptor.encode_into(&mut out);
        out
    }

    /// Decode the body following the tag byte (already stripped by the caller).
    pub fn decode_body(body: &[u8]) -> Result<Self> {
        let (&invoke_id_priority, rest) = body.split_first().ok_or(CosemError::Malformed(AxdrError::LengthOverflow {
            needed: 1,
            available: 0,
        }))?;
        let (descriptor, rest) = AttributeDescriptor::decode(rest)?;
        if !rest.is_empty() {
            return Err(CosemError::Malformed(AxdrError::TrailingBytes(rest.len())));
        }
        Ok(Self { invoke_id_priority, descriptor })
    }
}

/// Get-Response-Normal: the CHOICE result of a GET.
#[derive(Debug, Clone, PartialEq)]
pub struct GetResponse {
    /// Echoes the request's invoke-id/priority.
    pub invoke_id_priority: u8,
    /// The read result.
    pub result: ResponseData,
}

impl GetResponse {
    /// Encode with the unsecured tag.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = vec![tag::GET_RESPONSE, self.invoke_id_priority];
        self.result.encode_into(&mut out)?;
        Ok(out)
    }

    /// Decode the body following the tag byte.
    pub fn decode_body(body: &[u8]) -> Result<Self> {
        let (&invoke_id_priority, rest) = body.split_first().ok_or(CosemError::Malformed(AxdrError::LengthOverflow {
            needed: 1,
            available: 0,
        }))?;
        let (result, rest) = ResponseData::decode(rest)?;
        if !rest.is_empty() {
            return Err(CosemError::Malformed(AxdrError::TrailingBytes(rest.len())));
        }
        Ok(Self { invoke_id_priority, result })
    }
}

/// Set-Request-Normal: write one attribute, carrying the new value.
#[derive(Debug, Clone, PartialEq)]
pub struct SetRequest {
    /// Invoke-id and priority.
    pub invoke_id_priority: u8,
    /// Attribute being written.
    pub descriptor: AttributeDescriptor,
    /// New value.
    pub value: Value,
}

impl SetRequest {
    /// Encode with the unsecured tag.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = vec![tag::SET_REQUEST, self.invoke_id_priority];
        self.descriptor.encode_into(&mut out);
        out.push(0x00); // Data choice: the request always carries data, never a result.
        self.value.encode_into(&mut out)?;
        Ok(out)
    }

    /// Decode the body following the tag byte.
    pub fn decode_body(body: &[u8]) -> Result<Self> {
        let (&invoke_id_priority, rest) = body.split_first().ok_or(CosemError::Malformed(AxdrError::LengthOverflow {
            needed: 1,
            available: 0,
        }))?;
        let (descriptor, rest) = AttributeDescriptor::decode(rest)?;
        let (&choice, rest) = rest.split_first().ok_or(CosemError::Malformed(AxdrError::LengthOverflow {
            needed: 1,
            available: 0,
        }))?;
        if choice != 0x00 {
            return Err(CosemError::Malformed(AxdrError::UnsupportedTag { tag: choice }));
        }
        let (value, rest) = decode_value(rest)?;
        if !rest.is_empty() {
            return Err(CosemError::Malformed(AxdrError::TrailingBytes(rest.len())));
        }
        Ok(Self { invoke_id_priority, descriptor, value })
    }
}

/// Set-Response-Normal: always a data-access-result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetResponse {
    /// Echoes the request's invoke-id/priority.
    pub invoke_id_priority: u8,
    /// The write result.
    pub result: DataAccessResult,
}

impl SetResponse {
    /// Encode with the unsecured tag.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        vec![tag::SET_RESPONSE, self.invoke_id_priority, self.result.to_byte()]
    }

    /// Decode the body following the tag byte.
    pub fn decode_body(body: &[u8]) -> Result<Self> {
        let &[invoke_id_priority, result_byte] = body else {
            return Err(CosemError::Malformed(AxdrError::TrailingBytes(body.len())));
        };
        Ok(Self { invoke_id_priority, result: DataAccessResult::from_byte(result_byte)? })
    }
}

/// Action-Request-Normal: invoke one method, carrying its parameters as a
/// single tagged value (often `Value::Array`/`Value::Structure`).
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    /// Invoke-id and priority.
    pub invoke_id_priority: u8,
    /// Method being invoked.
    pub descriptor: MethodDescriptor,
    /// Method parameters.
    pub parameters: Value,
}

impl ActionRequest {
    /// Encode with the unsecured tag.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = vec![tag::ACTION_REQUEST, self.invoke_id_priority];
        self.descriptor.encode_into(&mut out);
        self.parameters.encode_into(&mut out)?;
        Ok(out)
    }

    /// Decode the body following the tag byte.
    pub fn decode_body(body: &[u8]) -> Result<Self> {
        let (&invoke_id_priority, rest) = body.split_first().ok_or(CosemError::Malformed(AxdrError::LengthOverflow {
            needed: 1,
            available: 0,
        }))?;
        let (descriptor, rest) = MethodDescriptor::decode(rest)?;
        let (parameters, rest) = decode_value(rest)?;
        if !rest.is_empty() {
            return Err(CosemError::Malformed(AxdrError::TrailingBytes(rest.len())));
        }
        Ok(Self { invoke_id_priority, descriptor, parameters })
    }
}

/// Action-Response-Normal: the CHOICE result of an ACTION.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResponse {
    /// Echoes the request's invoke-id/priority.
    pub invoke_id_priority: u8,
    /// The invocation result.
    pub result: ResponseData,
}

impl ActionResponse {
    /// Encode with the unsecured tag.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = vec![tag::ACTION_RESPONSE, self.invoke_id_priority];
        self.result.encode_into(&mut out)?;
        Ok(out)
    }

    /// Decode the body following the tag byte.
    pub fn decode_body(body: &[u8]) -> Result<Self> {
        let (&invoke_id_priority, rest) = body.split_first().ok_or(CosemError::Malformed(AxdrError::LengthOverflow {
            needed: 1,
            available: 0,
        }))?;
        let (result, rest) = ResponseData::decode(rest)?;
        if !rest.is_empty() {
            return Err(CosemError::Malformed(AxdrError::TrailingBytes(rest.len())));
        }
        Ok(Self { invoke_id_priority, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(class_id: u16, obis: (u8, u8, u8, u8, u8, u8), attribute_id: i8) -> AttributeDescriptor {
        AttributeDescriptor {
            class_id,
            instance_id: ObisCode::new(obis.0, obis.1, obis.2, obis.3, obis.4, obis.5),
            attribute_id,
        }
    }

    /// Scenario S5: GET request for class=1, OBIS 1.0.0.3.0.255, attribute=2.
    #[test]
    fn s5_get_request_round_trip() {
        let req = GetRequest { invoke_id_priority: 0x81, descriptor: attr(1, (1, 0, 0, 3, 0, 255), 2) };
        let wire = req.encode();
        assert_eq!(wire[0], tag::GET_REQUEST);
        let decoded = GetRequest::decode_body(&wire[1..]).expect("should decode");
        assert_eq!(decoded, req);
    }

    /// Scenario S5: GET response carrying uint32 12345.
    #[test]
    fn s5_get_response_round_trip() {
        let resp = GetResponse { invoke_id_priority: 0x81, result: ResponseData::Data(Value::Uint32(12345)) };
        let wire = resp.encode().expect("should encode");
        assert_eq!(wire[0], tag::GET_RESPONSE);
        let decoded = GetResponse::decode_body(&wire[1..]).expect("should decode");
        assert_eq!(decoded, resp);
    }

    #[test]
    fn get_response_error_round_trip() {
        let resp = GetResponse { invoke_id_priority: 1, result: ResponseData::Result(DataAccessResult::ObjectUndefined) };
        let wire = resp.encode().expect("should encode");
        let decoded = GetResponse::decode_body(&wire[1..]).expect("should decode");
        assert_eq!(decoded, resp);
    }

    #[test]
    fn set_request_round_trip() {
        let req = SetRequest {
            invoke_id_priority: 1,
            descriptor: attr(3, (0, 0, 1, 0, 0, 255), 2),
            value: Value::OctetString(vec![1, 2, 3]),
        };
        let wire = req.encode().expect("should encode");
        assert_eq!(wire[0], tag::SET_REQUEST);
        let decoded = SetRequest::decode_body(&wire[1..]).expect("should decode");
        assert_eq!(decoded, req);
    }

    #[test]
    fn set_response_round_trip() {
        let resp = SetResponse { invoke_id_priority: 1, result: DataAccessResult::Success };
        let wire = resp.encode();
        let decoded = SetResponse::decode_body(&wire[1..]).expect("should decode");
        assert_eq!(decoded, resp);
    }

    #[test]
    fn action_request_round_trip() {
        let req = ActionRequest {
            invoke_id_priority: 1,
            descriptor: MethodDescriptor { class_id: 8, instance_id: ObisCode::new(0, 0, 1, 0, 0, 255), method_id: 1 },
            parameters: Value::Array(vec![Value::Uint8(1), Value::Boolean(true)]),
        };
        let wire = req.encode().expect("should encode");
        assert_eq!(wire[0], tag::ACTION_REQUEST);
        let decoded = ActionRequest::decode_body(&wire[1..]).expect("should decode");
        assert_eq!(decoded, req);
    }

    #[test]
    fn data_access_result_byte_values_match_spec() {
        assert_eq!(DataAccessResult::Success.to_byte(), 0);
        assert_eq!(DataAccessResult::ObjectClassInconsistent.to_byte(), 9);
        assert_eq!(DataAccessResult::OtherReason.to_byte(), 250);
    }

    #[test]
    fn secured_tags_map_to_plaintext_tags() {
        assert_eq!(tag::unsecured(tag::GET_REQUEST_SECURED), tag::GET_REQUEST);
        assert_eq!(tag::unsecured(tag::ACTION_RESPONSE_SECURED), tag::ACTION_RESPONSE);
        assert!(tag::is_secured(tag::SET_REQUEST_SECURED));
        assert!(!tag::is_secured(tag::SET_REQUEST));
    }
}
