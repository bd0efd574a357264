//! Faceoff Example Benchmarks
//!
//! Compares three hex encoders that share one interface. The last version
//! registered is the subject under test; the first is the baseline.
//!
//! Run with:
//!   cargo run --example compare_versions                  # Run everything
//!   cargo run --example compare_versions -- --list        # List benchmarks
//!   cargo run --example compare_versions -- --isolated    # One worker per version
//!   cargo run --example compare_versions -- "^encode"     # Filter by heading
//!   cargo run --example compare_versions -- -n 200        # Fixed sample count

use faceoff::prelude::*;
use std::fmt::Write as _;
use std::hint::black_box;

/// One version of the library under test
struct HexCodec {
    encode: fn(&[u8]) -> String,
}

fn encode_format(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn encode_write(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn encode_table(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = Vec::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(DIGITS[(b >> 4) as usize]);
        out.push(DIGITS[(b & 0x0f) as usize]);
    }
    String::from_utf8(out).unwrap_or_default()
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn main() -> anyhow::Result<()> {
    let mut faceoff: Faceoff<HexCodec, Vec<u8>> = Faceoff::new([
        ("format", VersionSource::module(HexCodec { encode: encode_format }, ".")),
        ("write", VersionSource::module(HexCodec { encode: encode_write }, ".")),
        ("table", VersionSource::module(HexCodec { encode: encode_table }, ".")),
    ])?;

    // Each version gets a fresh payload; teardown checks the encoder left it intact
    let fixture = Options::new()
        .setup(|_, _| Ok(payload(4096)))
        .teardown(|_, bytes| {
            if bytes.len() == 4096 {
                Ok(())
            } else {
                Err("payload was modified".into())
            }
        });

    faceoff.suite("encode", fixture, |s| {
        s.add(
            "4 KiB",
            |codec, bytes| {
                black_box((codec.encode)(black_box(bytes)));
                Ok(())
            },
            Options::new(),
        )?;

        s.suite("small", Options::new().setup(|_, _| Ok(payload(16))), |s| {
            s.add(
                "16 B",
                |codec, bytes| {
                    black_box((codec.encode)(black_box(bytes)));
                    Ok(())
                },
                Options::new().teardown(|_, _| Ok(())),
            )
        })
    })?;

    faceoff.add_async(
        "awaited encode",
        |codec, bytes| {
            Box::pin(async move {
                black_box((codec.encode)(bytes));
                Ok::<(), BoxError>(())
            })
        },
        Options::new().setup(|_, _| Ok(payload(256))).skip(["format"]),
    )?;

    faceoff::run(&faceoff)
}
