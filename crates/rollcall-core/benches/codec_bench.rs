//! Criterion benchmarks for the Rollcall wire codecs and the scramble
//! function.
//!
//! The close handshake runs `scramble` once on each side and streams one
//! 28-byte frame per mark, so these are the only per-message costs.
//!
//! Run with:
//! ```bash
//! cargo bench --package rollcall-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rollcall_core::auth::scramble;
use rollcall_core::protocol::{
    decode_attendance_reply, decode_identity_request, encode_attendance, encode_identity,
};
use rollcall_core::{
    AttendanceMark, AttendanceMessage, AttendanceReply, IdentityMessage, IdentityRecord,
    IdentityRequest, MacAddress, Timestamp,
};

fn bench_scramble(c: &mut Criterion) {
    c.bench_function("scramble", |b| b.iter(|| scramble(black_box(0xDEAD_BEEF))));
}

fn bench_attendance_codec(c: &mut Criterion) {
    let msg = AttendanceMessage::Reply(AttendanceReply::Data(AttendanceMark::new(
        19100009,
        Timestamp::new(1_700_000_000, 123_456),
    )));
    let bytes = encode_attendance(&msg);

    let mut group = c.benchmark_group("attendance");
    group.bench_function("encode_data", |b| b.iter(|| encode_attendance(black_box(&msg))));
    group.bench_function("decode_data", |b| {
        b.iter(|| decode_attendance_reply(black_box(&bytes)))
    });
    group.finish();
}

fn bench_identity_codec(c: &mut Criterion) {
    let msg = IdentityMessage::Request(IdentityRequest::Put(IdentityRecord::new(
        19100009,
        MacAddress::new([0xC0, 0xBD, 0xD1, 0x24, 0x26, 0xD9]),
        "Awais",
    )));
    let bytes = match encode_identity(&msg) {
        Ok(bytes) => bytes,
        Err(e) => panic!("fixture must encode: {e}"),
    };

    let mut group = c.benchmark_group("identity");
    group.bench_function("encode_put", |b| b.iter(|| encode_identity(black_box(&msg))));
    group.bench_function("decode_put", |b| {
        b.iter(|| decode_identity_request(black_box(&bytes)))
    });
    group.finish();
}

criterion_group!(benches, bench_scramble, bench_attendance_codec, bench_identity_codec);
criterion_main!(benches);
