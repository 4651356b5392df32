//! Shared `proptest` strategies for `Value` and HDLC `Frame` inputs, reused
//! across the workspace's integration tests so each crate doesn't hand-roll
//! its own arbitrary-input generator.

use dlms_axdr::Value;
use dlms_crypto::SecurityHeader;
use dlms_hdlc::control::{Control, SupervisoryKind};
use dlms_hdlc::Frame;
use proptest::prelude::*;

/// A non-compound `Value`: every primitive except array/structure/compact-array.
pub fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Boolean),
        any::<i8>().prop_map(Value::Int8),
        any::<i16>().prop_map(Value::Int16),
        any::<i32>().prop_map(Value::Int32),
        any::<i64>().prop_map(Value::Int64),
        any::<u8>().prop_map(Value::Uint8),
        any::<u16>().prop_map(Value::Uint16),
        any::<u32>().prop_map(Value::Uint32),
        any::<u64>().prop_map(Value::Uint64),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::OctetString),
        prop::collection::vec(0x20u8..0x7F, 0..32).prop_map(Value::VisibleString),
    ]
}

/// A possibly-nested `Value`, bounded in depth and breadth so shrinking
/// terminates quickly.
pub fn any_value() -> impl Strategy<Value = Value> {
    leaf_value().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(inner, 0..4).prop_map(Value::Structure),
        ]
    })
}

/// A logical HDLC address of valid length (1, 2, or 4 bytes).
pub fn hdlc_address() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 1),
        prop::collection::vec(any::<u8>(), 2),
        prop::collection::vec(any::<u8>(), 4),
    ]
}

/// An arbitrary well-formed I-frame or supervisory frame (never U-frame,
/// whose control bytes are a small fixed set better covered by literal
/// tests).
pub fn numbered_frame() -> impl Strategy<Value = Frame> {
    (
        hdlc_address(),
        hdlc_address(),
        0u8..8,
        0u8..8,
        any::<bool>(),
        any::<bool>(),
        prop::collection::vec(any::<u8>(), 0..64),
    )
        .prop_map(|(da, sa, ns, nr, pf, is_information, info)| {
            let control = if is_information {
                Control::Information { ns, nr, pf }
            } else {
                Control::Supervisory { nr, pf, kind: SupervisoryKind::Rr }
            };
            let carries_info = matches!(control, Control::Information { .. });
            Frame { da, sa, control, segmented: false, info: carries_info.then_some(info) }
        })
}

/// An arbitrary secured-APDU body: a header paired with an opaque
/// ciphertext-plus-tag payload the sender never actually produced, for
/// fuzzing a security suite's `decrypt_and_verify` against garbage input.
pub fn secured_apdu_body() -> impl Strategy<Value = (SecurityHeader, Vec<u8>)> {
    (any::<u8>(), any::<u32>(), prop::collection::vec(any::<u8>(), 0..64)).prop_map(
        |(security_control, frame_counter, sealed)| {
            (SecurityHeader { security_control, frame_counter }, sealed)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn numbered_frames_round_trip(frame in numbered_frame()) {
            let wire = frame.encode().expect("should encode");
            let decoded = Frame::decode(&wire).expect("should decode");
            prop_assert_eq!(decoded, frame);
        }
    }
}
