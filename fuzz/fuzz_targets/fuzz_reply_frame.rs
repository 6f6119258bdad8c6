// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use spreq::raw::{MemoryRaw, RawSocket};
use spreq::wire::{self, TAG_LEN};
use spreq::{Error, Req};

fuzz_target!(|data: &[u8]| {
    // Reply decoder on its own
    let decoded = wire::decode_reply(data);

    // Same bytes as a reply to a pending request: they must either be
    // delivered (tag matches) or dropped without disturbing the request
    let (raw, mut peer) = MemoryRaw::pair(4);
    let mut req = Req::open(raw);
    req.send(b"fuzz").unwrap();
    let request = peer.recv().unwrap();

    peer.send(data).unwrap();
    match req.recv() {
        Ok(body) => {
            assert_eq!(&data[..TAG_LEN], &request[..TAG_LEN]);
            assert_eq!(body, &data[TAG_LEN..]);
            assert!(decoded.is_ok());
            assert!(!req.is_in_progress());
        }
        Err(Error::WouldBlock) => {
            assert!(req.is_in_progress());
            assert_eq!(req.timer().armed(), 1);
        }
        Err(e) => panic!("unexpected error: {}", e),
    }
});
