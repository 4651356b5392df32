//! Fuzzes `decrypt_and_verify` against garbage headers/ciphertext that no
//! sender ever actually produced: it must only ever return `Ok` or a
//! `SecurityError`, never panic.

use dlms_crypto::{SecuritySetup, Suite};
use dlms_harness::strategies::secured_apdu_body;
use proptest::prelude::*;

fn gcm_setup() -> SecuritySetup {
    SecuritySetup {
        suite: Suite::Gcm128,
        client_system_title: *b"CLIENT01",
        server_system_title: *b"SERVER01",
        encryption_key: vec![0x11; 16],
        authentication_key: vec![0x11; 16],
        suite3_keys: None,
        last_inbound_frame_counter: 0,
        next_outbound_frame_counter: 1,
    }
}

proptest! {
    #[test]
    fn decrypt_and_verify_never_panics_on_garbage((header, sealed) in secured_apdu_body()) {
        let mut setup = gcm_setup();
        let _ = setup.decrypt_and_verify(false, header, &sealed);
    }
}
