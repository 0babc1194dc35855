use super::support::{shard_lines, write, Fixture};
use dedup::catalogue::RepoCatalogue;
use dedup::prune::{prune_repo, PruneOptions};
use dedup::Codec;
use std::fs;

#[test]
fn prune_after_churn_keeps_only_live_records() {
    let fx = Fixture::new();
    let repo = fx.create_repo("churn", 2, Codec::Json);
    let a = write(&repo, "a.bin", &[1u8; 100]);
    write(&repo, "b.bin", &[2u8; 101]);
    let c = write(&repo, "c.bin", &[3u8; 102]);
    fx.update(&repo);

    fs::write(&a, [7u8; 103]).unwrap();
    fs::remove_file(c).unwrap();
    fx.update(&repo);
    assert!(shard_lines(&fx.loaded("churn")) > 3);

    let summary = prune_repo(&fx.catalogue, "churn", PruneOptions::default()).unwrap();
    assert_eq!(summary.written, 2);
    // The stale copy of a.bin in its old shard and the c.bin tombstone.
    assert_eq!(summary.dropped, 2);

    let manager = fx.loaded("churn");
    assert_eq!(shard_lines(&manager), 2);
    assert_eq!(manager.get_by_path("a.bin").unwrap().size, 103);
    assert!(manager.get_by_path("c.bin").is_none());

    // The pruned repo still short-circuits unchanged files.
    drop(manager);
    let again = fx.update(&repo);
    assert_eq!(again.hashed, 0);
    assert_eq!(again.unchanged, 2);
}

#[test]
fn prune_can_switch_codec_and_compression() {
    let fx = Fixture::new();
    let repo = fx.create_repo("switch", 1, Codec::Json);
    write(&repo, "x/one.png", &[1u8; 512]);
    write(&repo, "x/two.png", &[2u8; 513]);
    fx.update(&repo);
    let mut before = fx.loaded("switch").stream();
    before.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    let options = PruneOptions {
        shard_count: Some(4),
        codec: Some(Codec::Binary),
        compressed: Some(true),
        keep_tombstones: false,
    };
    prune_repo(&fx.catalogue, "switch", options).unwrap();

    let stored = fx.catalogue.get_repo("switch").unwrap().unwrap();
    assert_eq!(stored.shard_count, 4);
    assert_eq!(stored.codec, Codec::Binary);
    assert!(stored.compressed);
    assert_eq!(stored.absolute_path, repo.absolute_path);

    let manager = fx.loaded("switch");
    let mut after = manager.stream();
    after.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    assert_eq!(after, before);
    let names: Vec<_> = fx
        .catalogue
        .get_repos()
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["switch"]);
}
