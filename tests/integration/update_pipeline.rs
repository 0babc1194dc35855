use super::support::{counting, set_mtime, shard_lines, write, Fixture};
use dedup::catalogue::RepoCatalogue;
use dedup::hasher::FileHasher;
use dedup::Codec;
use std::fs;
use std::sync::Arc;

#[test]
fn first_update_indexes_every_file() {
    let fx = Fixture::new();
    let repo = fx.create_repo("docs", 3, Codec::Json);
    write(&repo, "a.txt", b"short");
    write(&repo, "nested/b.bin", &[9u8; 300]);
    write(&repo, "nested/deeper/c.bin", &[4u8; 5000]);

    let summary = fx.update(&repo);
    assert_eq!(summary.files, 3);
    assert_eq!(summary.hashed, 3);
    assert_eq!(summary.dirs, 3);
    assert_eq!(summary.errors, 0);

    let manager = fx.loaded("docs");
    let record = manager.get_by_path("nested/deeper/c.bin").unwrap();
    assert_eq!(record.size, 5000);
    assert_eq!(record.hash, blake3::hash(&[4u8; 5000]).to_hex().to_string());
    assert_eq!(manager.get_by_path("a.txt").unwrap().hash, hex::encode(b"short"));
}

#[test]
fn second_update_rehashes_nothing() {
    let fx = Fixture::new();
    let repo = fx.create_repo("stable", 2, Codec::Json);
    write(&repo, "one.bin", &[1u8; 64]);
    write(&repo, "two.bin", &[2u8; 65]);
    fx.update(&repo);
    let lines_before = shard_lines(&fx.loaded("stable"));

    let hasher = counting();
    let summary = fx
        .updater()
        .with_hasher(hasher.clone() as Arc<dyn FileHasher>)
        .update(&repo, fx.catalogue.index_dir("stable"))
        .unwrap();

    assert_eq!(summary.unchanged, 2);
    assert_eq!(summary.hashed, 0);
    assert_eq!(hasher.calls(), 0);
    assert_eq!(shard_lines(&fx.loaded("stable")), lines_before);
}

#[test]
fn unobserved_paths_are_tombstoned() {
    let fx = Fixture::new();
    let repo = fx.create_repo("tomb", 1, Codec::Binary);
    write(&repo, "a.bin", &[1u8; 100]);
    write(&repo, "b.bin", &[2u8; 100]);
    let c = write(&repo, "c.bin", &[3u8; 100]);
    fx.update(&repo);
    let a_before = fx.loaded("tomb").get_by_path("a.bin").unwrap();

    fs::remove_file(c).unwrap();
    let summary = fx.update(&repo);
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.unchanged, 2);

    let manager = fx.loaded("tomb");
    let c = manager.get_by_path("c.bin").unwrap();
    assert!(c.missing);
    assert_eq!(c.hash, blake3::hash(&[3u8; 100]).to_hex().to_string());
    assert_eq!(manager.get_by_path("a.bin").unwrap(), a_before);
    assert!(!manager.get_by_path("b.bin").unwrap().missing);
}

#[test]
fn modified_file_is_rehashed() {
    let fx = Fixture::new();
    let repo = fx.create_repo("mod", 4, Codec::Json);
    let path = write(&repo, "notes.md", &[b'a'; 40]);
    fx.update(&repo);

    fs::write(&path, [b'b'; 41]).unwrap();
    let summary = fx.update(&repo);
    assert_eq!(summary.hashed, 1);

    let manager = fx.loaded("mod");
    let record = manager.get_by_path("notes.md").unwrap();
    assert_eq!(record.size, 41);
    assert!(!record.missing);
    assert_eq!(record.mime_type.as_deref(), Some("text/markdown"));
    assert_eq!(
        manager
            .stream()
            .iter()
            .filter(|r| r.relative_path == "notes.md" && !r.missing)
            .count(),
        1
    );
}

#[test]
fn reappearing_file_is_revived_without_hashing() {
    let fx = Fixture::new();
    let repo = fx.create_repo("back", 1, Codec::Json);
    let path = write(&repo, "photo.jpg", &[7u8; 256]);
    set_mtime(&path, 1_500_000_000);
    fx.update(&repo);

    fs::remove_file(&path).unwrap();
    fx.update(&repo);
    assert!(fx.loaded("back").get_by_path("photo.jpg").unwrap().missing);

    write(&repo, "photo.jpg", &[7u8; 256]);
    set_mtime(&path, 1_500_000_000);
    let hasher = counting();
    fx.updater()
        .with_hasher(hasher.clone() as Arc<dyn FileHasher>)
        .update(&repo, fx.catalogue.index_dir("back"))
        .unwrap();

    assert_eq!(hasher.calls(), 0);
    let record = fx.loaded("back").get_by_path("photo.jpg").unwrap();
    assert!(!record.missing);
    assert_eq!(record.last_modified, 1_500_000_000_000);
}

#[test]
fn load_rebuilds_reverse_index() {
    let fx = Fixture::new();
    let repo = fx.create_repo("rev", 2, Codec::Json);
    write(&repo, "x/a.bin", &[5u8; 128]);
    write(&repo, "y/b.bin", &[5u8; 128]);
    write(&repo, "z.bin", &[6u8; 129]);
    fx.update(&repo);

    let manager = fx.loaded("rev");
    for record in manager.stream() {
        let holders: Vec<_> = manager
            .get_by_hash(&record.hash)
            .into_iter()
            .map(|r| r.relative_path)
            .collect();
        assert!(holders.contains(&record.relative_path));
        for other in manager.stream().iter().filter(|o| o.hash != record.hash) {
            assert!(!manager
                .get_by_hash(&other.hash)
                .iter()
                .any(|r| r.relative_path == record.relative_path));
        }
    }
    assert_eq!(manager.get_by_hash(&blake3::hash(&[5u8; 128]).to_hex().to_string()).len(), 2);
}

#[test]
fn empty_files_are_stable_across_updates() {
    let fx = Fixture::new();
    let repo = fx.create_repo("empty", 2, Codec::Json);
    let empty = write(&repo, "empty.txt", b"");
    write(&repo, "big.bin", &[1u8; 333]);
    fx.update(&repo);

    let second = fx.update(&repo);
    assert_eq!(second.load.corrupt, 0);
    assert_eq!(second.hashed, 0);
    assert_eq!(second.unchanged, 2);
    let record = fx.loaded("empty").get_by_path("empty.txt").unwrap();
    assert_eq!(record.size, 0);
    assert!(!record.missing);
    assert!(!fx.catalogue.index_dir("empty").join("0.idx.bak").exists());

    fs::remove_file(empty).unwrap();
    let third = fx.update(&repo);
    assert_eq!(third.deleted, 1);
    assert!(fx.loaded("empty").get_by_path("empty.txt").unwrap().missing);
}
