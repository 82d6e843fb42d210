//! Fuzz target: status frame decoding on the receiver.
//!
//! Arbitrary datagrams go through the tolerant field split, the strict
//! decoder and the receiver's frame handler.  None of them may panic, and
//! the decoded text must stay within the fixed field.
//!
//! cargo fuzz run fuzz_status_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use mailwatch::radio::codec::{self, MAX_TEXT_LEN};
use mailwatch::radio::transport::Datagram;
use mailwatch::receiver::{self, MailboxIndicator};

fuzz_target!(|data: &[u8]| {
    if let Ok(fields) = codec::decode_fields(data) {
        assert!(fields.text.len() <= MAX_TEXT_LEN, "text exceeds field");
    }

    if let Ok(msg) = codec::decode(data) {
        // A strictly decoded frame re-encodes to something that decodes
        // to the same message.
        let again = codec::decode(&codec::encode(&msg)).expect("re-encoded frame decodes");
        assert_eq!(again, msg);
    }

    let mut indicator = MailboxIndicator::new();
    let _ = receiver::handle_datagram(&mut indicator, &Datagram::new([0; 6], data));
});
