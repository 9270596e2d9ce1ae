//! Stream buffering benchmarks.

use std::os::fd::AsRawFd;
use std::path::PathBuf;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use widestream_core::{BufferedFileStream, FileStream, MemFile, OpenMode, Whence, parse_mode};

const PAYLOAD: usize = 64 * 1024;

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("widestream-bench-{name}-{}", std::process::id()))
}

fn payload() -> Vec<u8> {
    (0..PAYLOAD).map(|i| (i % 251) as u8).collect()
}

fn bench_byte_writes(c: &mut Criterion) {
    let capacities: &[usize] = &[0, 16, 256, 4096, 65536];
    let data = payload();
    let flags = parse_mode(b"w+b").unwrap();
    let mut group = c.benchmark_group("write_byte");
    group.throughput(Throughput::Bytes(PAYLOAD as u64));

    for &cap in capacities {
        group.bench_with_input(BenchmarkId::new("mem", cap), &cap, |b, &cap| {
            b.iter(|| {
                let mut s: BufferedFileStream<'_, MemFile> = BufferedFileStream::new();
                s.set_buffer_capacity(cap).unwrap();
                s.attach(MemFile::new(), flags).unwrap();
                for &byte in &data {
                    s.write_byte(byte).unwrap();
                }
                s.sync().unwrap();
                black_box(s.stats().native_writes);
            });
        });
    }
    group.finish();
}

fn bench_block_writes(c: &mut Criterion) {
    let chunks: &[usize] = &[1, 7, 64, 512, 8192];
    let data = payload();
    let path = scratch("block-write");
    let mut group = c.benchmark_group("write_block");
    group.throughput(Throughput::Bytes(PAYLOAD as u64));

    for &chunk in chunks {
        group.bench_with_input(BenchmarkId::new("widestream", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut s = FileStream::new();
                s.open_path(&path, OpenMode::OUT | OpenMode::TRUNC | OpenMode::BINARY)
                    .unwrap();
                for piece in data.chunks(chunk) {
                    s.write_block(piece).unwrap();
                }
                s.close().unwrap();
            });
        });

        // Baseline: one write(2) per chunk.
        group.bench_with_input(BenchmarkId::new("raw_write", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let file = std::fs::File::create(&path).unwrap();
                let fd = file.as_raw_fd();
                for piece in data.chunks(chunk) {
                    // SAFETY: `piece` is a valid slice and `fd` stays open for the call.
                    let n = unsafe { libc::write(fd, piece.as_ptr().cast(), piece.len()) };
                    black_box(n);
                }
            });
        });
    }
    group.finish();
    let _ = std::fs::remove_file(&path);
}

fn bench_block_reads(c: &mut Criterion) {
    let chunks: &[usize] = &[1, 7, 64, 512, 8192];
    let path = scratch("block-read");
    std::fs::write(&path, payload()).unwrap();
    let mut group = c.benchmark_group("read_block");
    group.throughput(Throughput::Bytes(PAYLOAD as u64));

    for &chunk in chunks {
        group.bench_with_input(BenchmarkId::new("widestream", chunk), &chunk, |b, &chunk| {
            let mut dest = vec![0u8; chunk];
            b.iter(|| {
                let mut s = FileStream::new();
                s.open_path(&path, OpenMode::IN | OpenMode::BINARY).unwrap();
                let mut total = 0;
                loop {
                    let n = s.read_block(&mut dest).unwrap();
                    if n == 0 {
                        break;
                    }
                    total += n;
                }
                black_box(total);
            });
        });
    }
    group.finish();
    let _ = std::fs::remove_file(&path);
}

fn bench_seek_peek(c: &mut Criterion) {
    let flags = parse_mode(b"rb").unwrap();
    let data = payload();
    c.bench_function("seek_peek_mem", |b| {
        let mut s: BufferedFileStream<'_, MemFile> = BufferedFileStream::new();
        s.attach(MemFile::with_data(data.clone()), flags).unwrap();
        let mut pos: i64 = 0;
        b.iter(|| {
            pos = (pos * 31 + 17) % PAYLOAD as i64;
            s.seek(pos, Whence::Start).unwrap();
            black_box(s.peek_byte().unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_byte_writes,
    bench_block_writes,
    bench_block_reads,
    bench_seek_peek
);
criterion_main!(benches);
