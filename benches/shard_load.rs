use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dedup::index::Shard;
use dedup::{Codec, Record};
use tempfile::TempDir;

fn populated_shard(dir: &TempDir, codec: Codec, compressed: bool, records: u64) -> Shard {
    let path = dir.path().join(format!("{:?}-{}.idx", codec, compressed));
    let mut shard = Shard::new(path.clone(), codec, compressed);
    shard.load().unwrap();
    for i in 0..records {
        // Every fourth record rewrites an earlier path.
        let relative = format!("dir{}/file{}.bin", i % 97, i - i % 4);
        let hash = blake3::hash(&i.to_le_bytes()).to_hex().to_string();
        shard.add(Record::new(hash, relative, 1024 + i, i)).unwrap();
    }
    shard.close().unwrap();
    Shard::new(&path, codec, compressed)
}

fn bench_shard_load(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let mut group = c.benchmark_group("shard_load");
    for (codec, compressed) in [
        (Codec::Json, false),
        (Codec::Json, true),
        (Codec::Binary, false),
        (Codec::Binary, true),
    ] {
        let mut shard = populated_shard(&dir, codec, compressed, 10_000);
        group.bench_with_input(
            BenchmarkId::new(format!("{:?}", codec), compressed),
            &compressed,
            |b, _| b.iter(|| black_box(shard.load().unwrap())),
        );
    }
    group.finish();
}

fn bench_hash_lookup(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let mut shard = populated_shard(&dir, Codec::Json, false, 10_000);
    shard.load().unwrap();
    let hash = blake3::hash(&5_000u64.to_le_bytes()).to_hex().to_string();
    c.bench_function("shard_get_by_hash", |b| {
        b.iter(|| black_box(shard.get_by_hash(black_box(&hash))))
    });
}

criterion_group!(benches, bench_shard_load, bench_hash_lookup);
criterion_main!(benches);
