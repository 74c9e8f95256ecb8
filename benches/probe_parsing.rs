//! Benchmarks for probe output parsing
//!
//! Measures extracting the first video stream's duration from ffprobe JSON.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use reelforge_av::parse_duration;

/// Single video stream, duration as a string (ffprobe's usual form)
const FFPROBE_SIMPLE: &str = r#"{
    "streams": [
        {
            "index": 0,
            "codec_name": "h264",
            "codec_type": "video",
            "width": 1920,
            "height": 1080,
            "r_frame_rate": "24000/1001",
            "duration_ts": 8775000,
            "duration": "97.500000",
            "bit_rate": "4800000"
        }
    ]
}"#;

/// A stream with the full set of fields ffprobe emits for an H.264 upload
const FFPROBE_DETAILED: &str = r#"{
    "streams": [
        {
            "index": 0,
            "codec_name": "h264",
            "codec_long_name": "H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10",
            "profile": "High",
            "codec_type": "video",
            "codec_tag_string": "avc1",
            "codec_tag": "0x31637661",
            "width": 3840,
            "height": 2160,
            "coded_width": 3840,
            "coded_height": 2160,
            "closed_captions": 0,
            "film_grain": 0,
            "has_b_frames": 2,
            "sample_aspect_ratio": "1:1",
            "display_aspect_ratio": "16:9",
            "pix_fmt": "yuv420p",
            "level": 51,
            "color_range": "tv",
            "color_space": "bt709",
            "chroma_location": "left",
            "field_order": "progressive",
            "refs": 1,
            "is_avc": "true",
            "nal_length_size": "4",
            "r_frame_rate": "30/1",
            "avg_frame_rate": "30/1",
            "time_base": "1/15360",
            "start_pts": 0,
            "start_time": "0.000000",
            "duration_ts": 110592000,
            "duration": "7200.000000",
            "bit_rate": "24000000",
            "bits_per_raw_sample": "8",
            "nb_frames": "216000",
            "extradata_size": 48,
            "disposition": {
                "default": 1,
                "dub": 0,
                "original": 0,
                "comment": 0,
                "lyrics": 0,
                "karaoke": 0,
                "forced": 0
            },
            "tags": {
                "language": "und",
                "handler_name": "VideoHandler",
                "vendor_id": "[0][0][0][0]"
            }
        }
    ]
}"#;

/// Duration reported as a bare number
const FFPROBE_NUMERIC: &str = r#"{"streams":[{"codec_type":"video","duration":97.5}]}"#;

fn bench_parse_duration(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_duration");

    for (name, json) in [
        ("simple", FFPROBE_SIMPLE),
        ("detailed", FFPROBE_DETAILED),
        ("numeric", FFPROBE_NUMERIC),
    ] {
        group.throughput(Throughput::Bytes(json.len() as u64));
        group.bench_with_input(BenchmarkId::new("ffprobe", name), &json, |b, json| {
            b.iter(|| parse_duration(black_box(json)).unwrap());
        });
    }

    group.finish();
}

fn bench_parse_failures(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_failures");

    group.bench_function("no_streams", |b| {
        b.iter(|| parse_duration(black_box(r#"{"streams":[]}"#)).is_err());
    });

    group.bench_function("not_json", |b| {
        b.iter(|| parse_duration(black_box("ffprobe: command not found")).is_err());
    });

    group.finish();
}

criterion_group!(benches, bench_parse_duration, bench_parse_failures);
criterion_main!(benches);
