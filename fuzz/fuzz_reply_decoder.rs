//! Fuzz target for the response decoder.
//!
//! Run with: cargo +nightly fuzz run fuzz_reply_decoder
//!
//! Feeds arbitrary status codes and body bytes through `decode_reply` to
//! find panics in JSON decoding and failure-record construction.

#![no_main]

use hyper::StatusCode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let raw = u16::from(data[0]) | (u16::from(data[1] & 0x03) << 8);
    if let Ok(status) = StatusCode::from_u16(raw) {
        let _ = didsock_client::decode_reply(status, &data[2..]);
    }
});
