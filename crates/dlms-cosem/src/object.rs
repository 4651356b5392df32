//! COSEM objects: attribute/method descriptors and the process-wide
//! OBIS→Object registry.
//!
//! Every object exposes the same three operations regardless of its
//! interface class — `get_attribute`, `set_attribute`, `invoke` — with
//! pre/post callbacks and the type/validator checks of §4.3 built in once,
//! here, rather than per interface class.

use std::collections::HashMap;

use bitflags::bitflags;
use dlms_axdr::Value;

use crate::error::{CosemError, Result};
use crate::obis::ObisCode;

bitflags! {
    /// Access rights a single attribute or method can carry, both as the
    /// object's own declared mask and as an association's granted rights.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[allow(missing_docs)]
    pub struct AccessMask: u8 {
        /// GET is allowed.
        const READ = 0b0000_0001;
        /// SET/ACTION is allowed.
        const WRITE = 0b0000_0010;
        /// The request must be authenticated.
        const AUTHENTICATED_REQUEST = 0b0000_0100;
        /// The request must be encrypted.
        const ENCRYPTED_REQUEST = 0b0000_1000;
        /// The request must be digitally signed.
        const DIGITALLY_SIGNED_REQUEST = 0b0001_0000;
        /// The response must be authenticated.
        const AUTHENTICATED_RESPONSE = 0b0010_0000;
        /// The response must be encrypted.
        const ENCRYPTED_RESPONSE = 0b0100_0000;
        /// The response must be digitally signed.
        const DIGITALLY_SIGNED_RESPONSE = 0b1000_0000;
    }
}

/// A validator callback, run after the type check and before assignment.
pub type Validator = Box<dyn Fn(&Value) -> Result<()> + Send + Sync>;

/// A method handler: parameters in, a `Value` result out.
pub type MethodHandler = Box<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// A read callback, run in place of a stored value when present.
pub type ReadHook = Box<dyn Fn() -> Result<Value> + Send + Sync>;

/// A write callback, run after assignment succeeds.
pub type PostWriteHook = Box<dyn Fn(&Value) + Send + Sync>;

/// A post-action callback, run after the handler succeeds.
pub type PostActionHook = Box<dyn Fn(&Value) + Send + Sync>;

/// One attribute of a COSEM object.
pub struct AttrDesc {
    /// Current stored value.
    value: Value,
    /// The A-XDR tag every assigned value must carry.
    type_tag: u8,
    /// Read/write/security rights for this attribute.
    pub access_mask: AccessMask,
    /// Optional pre-assignment validator.
    pub validator: Option<Validator>,
    /// Optional override: compute the value on read instead of returning
    /// the stored one.
    pub read_hook: Option<ReadHook>,
    /// Optional callback invoked with the new value after a successful write.
    pub post_write: Option<PostWriteHook>,
}

impl AttrDesc {
    /// Build a plain stored attribute with no hooks.
    #[must_use]
    pub fn new(value: Value, access_mask: AccessMask) -> Self {
        let type_tag = value.tag();
        Self { value, type_tag, access_mask, validator: None, read_hook: None, post_write: None }
    }
}

/// One method of a COSEM object.
pub struct MethodDesc {
    /// Access rights for this method.
    pub access: AccessMask,
    /// Declared parameter count; `invoke` rejects mismatches before calling
    /// the handler. `None` means any arity (handler decodes the structure
    /// itself).
    pub param_count: Option<usize>,
    /// Declared A-XDR tag for each parameter, checked positionally against
    /// the actual call before the handler runs. `None` means the handler
    /// validates parameter types itself (e.g. when `param_count` is also
    /// `None`).
    pub param_types: Option<Vec<u8>>,
    /// Declared A-XDR tag of the handler's result, checked after a
    /// successful call. `None` means any return type is accepted.
    pub return_type: Option<u8>,
    /// Invocation handler.
    pub handler: MethodHandler,
    /// Optional callback invoked with the result after a successful call.
    pub post_action: Option<PostActionHook>,
}

/// A COSEM object instance: `{class_id, instance_id, attributes, methods}`.
pub struct Object {
    /// COSEM interface class identifier.
    pub class_id: u16,
    /// OBIS code of this instance.
    pub instance_id: ObisCode,
    attributes: HashMap<u8, AttrDesc>,
    methods: HashMap<u8, MethodDesc>,
}

impl Object {
    /// Build an object with no attributes or methods registered yet.
    #[must_use]
    pub fn new(class_id: u16, instance_id: ObisCode) -> Self {
        Self { class_id, instance_id, attributes: HashMap::new(), methods: HashMap::new() }
    }

    /// Register (or replace) attribute `id`.
    pub fn with_attribute(mut self, id: u8, attr: AttrDesc) -> Self {
        self.attributes.insert(id, attr);
        self
    }

    /// Register (or replace) method `id`.
    pub fn with_method(mut self, id: u8, method: MethodDesc) -> Self {
        self.methods.insert(id, method);
        self
    }

    /// Look up an attribute's declared access mask, for policy enforcement
    /// ahead of dispatch.
    #[must_use]
    pub fn attribute_access(&self, id: i8) -> Option<AccessMask> {
        self.attributes.get(&(id as u8)).map(|a| a.access_mask)
    }

    /// Look up a method's declared access mask.
    #[must_use]
    pub fn method_access(&self, id: i8) -> Option<AccessMask> {
        self.methods.get(&(id as u8)).map(|m| m.access)
    }

    /// Read attribute `id`: runs the read hook if present, else returns the
    /// stored value.
    pub fn get_attribute(&self, id: i8) -> Result<Value> {
        let attr = self.attributes.get(&(id as u8)).ok_or(CosemError::ObjectUnavailable)?;
        if let Some(hook) = &attr.read_hook {
            return hook();
        }
        Ok(attr.value.clone())
    }

    /// Write attribute `id`: type check, then custom validator, then
    /// assignment, then the post-write callback.
    pub fn set_attribute(&mut self, id: i8, value: Value) -> Result<()> {
        let attr = self.attributes.get_mut(&(id as u8)).ok_or(CosemError::ObjectUnavailable)?;
        if value.tag() != attr.type_tag {
            return Err(CosemError::TypeUnmatched);
        }
        if let Some(validator) = &attr.validator {
            validator(&value)?;
        }
        attr.value = value.clone();
        if let Some(post_write) = &attr.post_write {
            post_write(&value);
        }
        Ok(())
    }

    /// Invoke method `id`: arity check, per-parameter type check, handler
    /// call, then the post-action callback.
    pub fn invoke(&self, id: i8, params: &Value) -> Result<Value> {
        let method = self.methods.get(&(id as u8)).ok_or(CosemError::ObjectUnavailable)?;
        let items: Vec<&Value> = match params {
            Value::Array(items) | Value::Structure(items) => items.iter().collect(),
            Value::Null => Vec::new(),
            other => vec![other],
        };
        if let Some(expected) = method.param_count {
            if items.len() != expected {
                return Err(CosemError::TypeUnmatched);
            }
        }
        if let Some(expected_types) = &method.param_types {
            if items.len() != expected_types.len() {
                return Err(CosemError::TypeUnmatched);
            }
            for (item, expected_tag) in items.iter().zip(expected_types) {
                if item.tag() != *expected_tag {
                    return Err(CosemError::TypeUnmatched);
                }
            }
        }
        let result = (method.handler)(params)?;
        if let Some(expected_tag) = method.return_type {
            if result.tag() != expected_tag {
                return Err(CosemError::TypeUnmatched);
            }
        }
        if let Some(post_action) = &method.post_action {
            post_action(&result);
        }
        Ok(result)
    }
}

/// The process-wide `ObisCode -> Object` registry.
///
/// Registration is idempotent: re-registering under an existing OBIS code
/// overwrites the previous object.
#[derive(Default)]
pub struct Registry {
    objects: HashMap<ObisCode, Object>,
}

impl Registry {
    /// Build an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` under its own `instance_id`, overwriting any
    /// previous object at that OBIS code.
    pub fn register(&mut self, object: Object) {
        self.objects.insert(object.instance_id, object);
    }

    /// Look up an object by OBIS code.
    #[must_use]
    pub fn get(&self, obis: ObisCode) -> Option<&Object> {
        self.objects.get(&obis)
    }

    /// Look up an object mutably, for SET/ACTION dispatch.
    pub fn get_mut(&mut self, obis: ObisCode) -> Option<&mut Object> {
        self.objects.get_mut(&obis)
    }

    /// Every registered OBIS code, for back-filling new associations'
    /// `object_list`.
    pub fn obis_codes(&self) -> impl Iterator<Item = ObisCode> + '_ {
        self.objects.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_obis() -> ObisCode {
        ObisCode::new(1, 0, 0, 3, 0, 255)
    }

    #[test]
    fn get_attribute_returns_stored_value() {
        let obj = Object::new(1, data_obis())
            .with_attribute(2, AttrDesc::new(Value::Uint32(12345), AccessMask::READ));
        assert_eq!(obj.get_attribute(2).expect("should read"), Value::Uint32(12345));
    }

    #[test]
    fn set_attribute_rejects_type_mismatch() {
        let mut obj = Object::new(1, data_obis())
            .with_attribute(2, AttrDesc::new(Value::Uint32(0), AccessMask::READ | AccessMask::WRITE));
        let err = obj.set_attribute(2, Value::Boolean(true)).expect_err("must reject");
        assert_eq!(err, CosemError::TypeUnmatched);
    }

    #[test]
    fn set_attribute_runs_validator_and_post_write_hook() {
        let observed = std::sync::Arc::new(std::sync::Mutex::new(None));
        let observed_clone = observed.clone();
        let mut attr = AttrDesc::new(Value::Uint32(0), AccessMask::READ | AccessMask::WRITE);
        attr.validator = Some(Box::new(|v| match v {
            Value::Uint32(n) if *n < 100 => Ok(()),
            _ => Err(CosemError::TypeUnmatched),
        }));
        attr.post_write = Some(Box::new(move |v| *observed_clone.lock().expect("lock") = Some(v.clone())));
        let mut obj = Object::new(1, data_obis()).with_attribute(2, attr);

        obj.set_attribute(2, Value::Uint32(50)).expect("should pass validator");
        assert_eq!(*observed.lock().expect("lock"), Some(Value::Uint32(50)));

        let err = obj.set_attribute(2, Value::Uint32(200)).expect_err("validator should reject");
        assert_eq!(err, CosemError::TypeUnmatched);
    }

    #[test]
    fn invoke_checks_param_count() {
        let method = MethodDesc {
            access: AccessMask::WRITE,
            param_count: Some(2),
            param_types: None,
            return_type: None,
            handler: Box::new(|_| Ok(Value::Boolean(true))),
            post_action: None,
        };
        let obj = Object::new(1, data_obis()).with_method(1, method);

        let err = obj.invoke(1, &Value::Array(vec![Value::Uint8(1)])).expect_err("must reject arity mismatch");
        assert_eq!(err, CosemError::TypeUnmatched);

        let ok = obj.invoke(1, &Value::Array(vec![Value::Uint8(1), Value::Uint8(2)])).expect("should invoke");
        assert_eq!(ok, Value::Boolean(true));
    }

    #[test]
    fn invoke_checks_param_types() {
        let method = MethodDesc {
            access: AccessMask::WRITE,
            param_count: Some(2),
            param_types: Some(vec![dlms_axdr::tag::UINT8, dlms_axdr::tag::BOOLEAN]),
            return_type: None,
            handler: Box::new(|_| Ok(Value::Boolean(true))),
            post_action: None,
        };
        let obj = Object::new(1, data_obis()).with_method(1, method);

        let err = obj
            .invoke(1, &Value::Array(vec![Value::Uint8(1), Value::Uint8(2)]))
            .expect_err("must reject type mismatch");
        assert_eq!(err, CosemError::TypeUnmatched);

        let ok = obj
            .invoke(1, &Value::Array(vec![Value::Uint8(1), Value::Boolean(true)]))
            .expect("should invoke");
        assert_eq!(ok, Value::Boolean(true));
    }

    #[test]
    fn registry_is_idempotent_overwrite() {
        let mut registry = Registry::new();
        registry.register(Object::new(1, data_obis()).with_attribute(2, AttrDesc::new(Value::Uint32(1), AccessMask::READ)));
        registry.register(Object::new(1, data_obis()).with_attribute(2, AttrDesc::new(Value::Uint32(2), AccessMask::READ)));

        let obj = registry.get(data_obis()).expect("should be registered");
        assert_eq!(obj.get_attribute(2).expect("should read"), Value::Uint32(2));
        assert_eq!(registry.obis_codes().count(), 1);
    }
}
