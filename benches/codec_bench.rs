//! Encode/decode throughput benchmarks

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use aac_lan_streamer::codec::{AdtsDecoder, AdtsEncoder, EncodedPacket, PacketDescription};
use aac_lan_streamer::config::CodecConfig;

fn bench_packet() -> EncodedPacket {
    let mut data = Vec::new();
    let mut descriptions = Vec::new();
    for i in 0..8u8 {
        descriptions.push(PacketDescription::new(data.len() as u32, 256));
        data.extend(std::iter::repeat(i).take(256));
    }
    EncodedPacket::new(Bytes::from(data), descriptions, None).unwrap()
}

fn encode_benchmark(c: &mut Criterion) {
    let mut encoder = AdtsEncoder::new(CodecConfig::default());
    let packet = bench_packet();

    c.bench_function("encode 8x256B sub-frames with crc", |b| {
        b.iter(|| encoder.encode(black_box(&packet)).unwrap())
    });
}

fn decode_benchmark(c: &mut Criterion) {
    let config = CodecConfig {
        recognize_sync_header: false,
        ..CodecConfig::default()
    };
    let mut encoder = AdtsEncoder::new(config.clone());
    let encoded = encoder.encode(&bench_packet()).unwrap();

    c.bench_function("decode 8x256B sub-frames with crc", |b| {
        b.iter(|| {
            let mut decoder = AdtsDecoder::new(config.clone());
            decoder.decode(black_box(&encoded)).unwrap()
        })
    });
}

criterion_group!(benches, encode_benchmark, decode_benchmark);
criterion_main!(benches);
