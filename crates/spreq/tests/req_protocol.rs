// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// REQ protocol behaviour through the public API: a REQ socket over an
// in-memory raw pair, with a manual clock standing in for wall time and the
// test playing the REP peer by hand.

#![allow(clippy::unreadable_literal)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_panics_doc)]

use spreq::entropy::SeededEntropy;
use spreq::raw::{MemoryRaw, RawSocket};
use spreq::timer::{Clock, DeadlineTimer, ManualClock};
use spreq::wire::{self, RequestId, ID_MASK, REQUEST_MARKER, TAG_LEN};
use spreq::{Error, Req, ReqConfig, SocketBase, RESEND_IVL};
use std::time::Duration;

type ManualReq = Req<MemoryRaw, DeadlineTimer<ManualClock>>;

const IVL: Duration = Duration::from_millis(50);

fn open(seed: u32) -> (ManualReq, MemoryRaw, ManualClock) {
    let (raw, peer) = MemoryRaw::pair(64);
    let clock = ManualClock::new();
    let req = Req::with_parts(
        raw,
        DeadlineTimer::with_clock(clock.clone()),
        &mut SeededEntropy(seed),
        &ReqConfig::default().with_resend_interval(IVL),
    );
    (req, peer, clock)
}

/// Answer `request` with `body`, echoing its tag.
fn answer(peer: &mut MemoryRaw, request: &[u8], body: &[u8]) {
    let mut reply = request[..TAG_LEN].to_vec();
    reply.extend_from_slice(body);
    peer.send(&reply).unwrap();
}

fn tagged(id: RequestId, body: &[u8]) -> Vec<u8> {
    let mut frame = id.tag().to_be_bytes().to_vec();
    frame.extend_from_slice(body);
    frame
}

#[test]
fn ping_pong() {
    let (mut req, mut peer, _clock) = open(0x1234);

    req.send(b"ping").unwrap();
    let request = peer.recv().unwrap();
    assert_eq!(wire::get_u32(&request), 0x1235 | REQUEST_MARKER);

    answer(&mut peer, &request, b"pong");
    assert_eq!(req.recv().unwrap(), b"pong");
    assert!(matches!(req.recv(), Err(Error::BadState)));
}

#[test]
fn every_request_frame_is_marked_with_fresh_id() {
    let (mut req, mut peer, _clock) = open(ID_MASK - 3);
    let mut last = None;

    for i in 0..10u8 {
        req.send(&[i]).unwrap();
        let frame = peer.recv().unwrap();
        let tag = wire::get_u32(&frame);
        assert_ne!(tag & REQUEST_MARKER, 0);
        assert_eq!(&frame[TAG_LEN..], &[i]);

        let id = tag & ID_MASK;
        if let Some(prev) = last {
            assert_eq!(id, (prev + 1) & ID_MASK);
        }
        last = Some(id);
    }
}

#[test]
fn late_reply_to_superseded_request_is_ignored() {
    let (mut req, mut peer, _clock) = open(0);

    req.send(b"A").unwrap();
    let first = peer.recv().unwrap();
    req.send(b"B").unwrap();
    let second = peer.recv().unwrap();

    answer(&mut peer, &first, b"for-A");
    answer(&mut peer, &second, b"for-B");

    assert!(matches!(req.recv(), Err(Error::WouldBlock)));
    assert_eq!(req.recv().unwrap(), b"for-B");
    assert_eq!(req.metrics().snapshot().replies_stale, 1);
}

#[test]
fn lost_request_is_resent_until_answered() {
    let (mut req, mut peer, clock) = open(77);
    req.send(b"important").unwrap();
    let original = peer.recv().unwrap(); // "lost"

    for _ in 0..3 {
        clock.advance(IVL);
        assert_eq!(req.process_timers(), 1);
        assert_eq!(peer.recv().unwrap(), original);
    }

    answer(&mut peer, &original, b"done");
    assert_eq!(req.recv().unwrap(), b"done");

    clock.advance(IVL * 4);
    assert_eq!(req.process_timers(), 0);
    assert!(matches!(peer.recv(), Err(Error::WouldBlock)));
    assert_eq!(req.metrics().snapshot().resends, 3);
}

#[test]
fn timer_does_not_fire_early() {
    let (mut req, mut peer, clock) = open(1);
    req.send(b"x").unwrap();
    let _ = peer.recv().unwrap();

    clock.advance(IVL - Duration::from_millis(1));
    assert_eq!(req.process_timers(), 0);
    assert_eq!(req.next_timer_deadline().map(|d| d > clock.now()), Some(true));

    clock.advance(Duration::from_millis(1));
    assert_eq!(req.process_timers(), 1);
}

#[test]
fn garbage_replies_never_complete_the_request() {
    let (mut req, mut peer, _clock) = open(500);
    req.send(b"q").unwrap();
    let request = peer.recv().unwrap();
    let id = RequestId::new(501);

    let junk: Vec<Vec<u8>> = vec![
        Vec::new(),
        vec![0xff],
        vec![0x80, 0x00],
        (id.get()).to_be_bytes().to_vec(),
        tagged(RequestId::new(502), b"wrong"),
        tagged(RequestId::new(500), b"older"),
    ];
    for frame in &junk {
        peer.send(frame).unwrap();
    }
    for _ in &junk {
        assert!(matches!(req.recv(), Err(Error::WouldBlock)));
        assert!(req.is_in_progress());
    }
    assert_eq!(req.metrics().snapshot().replies_discarded(), junk.len() as u64);

    answer(&mut peer, &request, b"ok");
    assert_eq!(req.recv().unwrap(), b"ok");
}

#[test]
fn random_interleavings_keep_single_request_invariants() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    let (mut req, mut peer, clock) = open(rng.u32(..));
    let mut in_flight: Vec<Vec<u8>> = Vec::new();
    let mut expected: Option<Vec<u8>> = None;

    for step in 0..2000u32 {
        match rng.u8(..5) {
            0 => {
                let payload = step.to_le_bytes().to_vec();
                req.send(&payload).unwrap();
                expected = Some(payload);
            }
            1 => {
                while let Ok(frame) = peer.recv() {
                    in_flight.push(frame);
                }
                if !in_flight.is_empty() {
                    let idx = rng.usize(..in_flight.len());
                    let request = in_flight.swap_remove(idx);
                    // echo the request back; a full queue just loses it
                    let _ = peer.send(&request);
                }
            }
            2 => {
                let len = rng.usize(..8);
                let junk: Vec<u8> = (0..len).map(|_| rng.u8(..)).collect();
                let _ = peer.send(&junk);
            }
            3 => {
                clock.advance(IVL);
                req.process_timers();
            }
            _ => match req.recv() {
                Ok(body) => {
                    assert_eq!(Some(body), expected.take());
                    assert!(!req.is_in_progress());
                }
                Err(Error::WouldBlock) => assert!(req.is_in_progress()),
                Err(Error::BadState) => assert!(expected.is_none()),
                Err(e) => panic!("unexpected error: {e}"),
            },
        }

        let armed = req.timer().armed();
        assert!(armed <= 1);
        assert_eq!(armed == 1, req.is_in_progress());
    }
}

#[test]
fn resend_interval_option() {
    let (mut req, _peer, _clock) = open(0);
    let mut out = [0u8; 8];

    assert_eq!(req.get_option(RESEND_IVL, &mut out).unwrap(), 4);
    assert_eq!(i32::from_ne_bytes(out[..4].try_into().unwrap()), 50);

    req.set_option(RESEND_IVL, &0i32.to_ne_bytes()).unwrap();
    assert_eq!(req.resend_interval(), Duration::ZERO);

    assert!(matches!(
        req.set_option(RESEND_IVL, &[1, 2, 3, 4, 5]),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        req.set_option(RESEND_IVL + 1, &0i32.to_ne_bytes()),
        Err(Error::NotSupported(_))
    ));
}

#[test]
fn generic_interface_drives_resends() {
    let (raw, mut peer) = MemoryRaw::pair(8);
    let clock = ManualClock::new();
    let mut sock: Box<dyn SocketBase> = Box::new(Req::with_parts(
        raw,
        DeadlineTimer::with_clock(clock.clone()),
        &mut SeededEntropy(9),
        &ReqConfig::default(),
    ));

    sock.send(b"hello").unwrap();
    let request = peer.recv().unwrap();

    // interval changes apply from the next arm, the first timer keeps 60s
    sock.set_option(RESEND_IVL, &10i32.to_ne_bytes()).unwrap();
    clock.advance(Duration::from_secs(60));
    assert_eq!(sock.process_timers(), 1);
    assert_eq!(peer.recv().unwrap(), request);
    clock.advance(Duration::from_millis(10));
    assert_eq!(sock.process_timers(), 1);

    answer(&mut peer, &request, b"world!");
    let mut buf = [0u8; 3];
    assert_eq!(sock.recv(&mut buf).unwrap(), 6);
    assert_eq!(&buf, b"wor");
    sock.close();
}
