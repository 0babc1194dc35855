use super::support::{counting, write, Fixture};
use dedup::catalogue::RepoCatalogue;
use dedup::diff::{DiffEngine, DiffKind, RecordFilter};
use dedup::dupes::{duplicate_count, find_duplicates};
use dedup::hasher::FileHasher;
use dedup::Codec;
use std::fs;
use std::sync::Arc;

#[test]
fn synced_copies_are_not_rehashed_by_target_update() {
    let fx = Fixture::new();
    let source = fx.create_repo("src", 3, Codec::Json);
    let target = fx.create_repo("dst", 2, Codec::Binary);
    write(&source, "albums/one.flac", &[1u8; 900]);
    write(&source, "albums/two.flac", &[2u8; 901]);
    write(&source, "shared.txt", b"already in both repos");
    write(&target, "elsewhere/shared.txt", b"already in both repos");
    fx.update(&source);
    fx.update(&target);

    let (src, dst) = (fx.loaded("src"), fx.loaded("dst"));
    let counters = DiffEngine::new(&src, &dst).sync(true, false);
    assert_eq!(counters.new, 2);
    assert_eq!(counters.copied, 2);
    assert_eq!(counters.equal, 1);
    assert_eq!(counters.errors, 0);
    assert_eq!(
        fs::read(target.absolute_path.join("albums/two.flac")).unwrap(),
        vec![2u8; 901]
    );
    drop(src);
    drop(dst);

    // Sync records the copies in the target index with the source mtime.
    let hasher = counting();
    let summary = fx
        .updater()
        .with_hasher(hasher.clone() as Arc<dyn FileHasher>)
        .update(&target, fx.catalogue.index_dir("dst"))
        .unwrap();
    assert_eq!(hasher.calls(), 0);
    assert_eq!(summary.unchanged, 3);

    let src = fx.loaded("src");
    let dst = fx.loaded("dst");
    let engine = DiffEngine::new(&src, &dst);
    assert!(engine
        .print(false)
        .iter()
        .all(|entry| entry.kind == DiffKind::Equal));
    assert_eq!(
        src.get_by_path("albums/one.flac").unwrap().last_modified,
        dst.get_by_path("albums/one.flac").unwrap().last_modified
    );
}

#[test]
fn sync_does_not_overwrite_occupied_paths() {
    let fx = Fixture::new();
    let source = fx.create_repo("src", 1, Codec::Json);
    let target = fx.create_repo("dst", 1, Codec::Json);
    write(&source, "notes.txt", b"source version of the notes");
    write(&target, "notes.txt", b"target keeps its own notes file");
    fx.update(&source);
    fx.update(&target);

    let (src, dst) = (fx.loaded("src"), fx.loaded("dst"));
    let counters = DiffEngine::new(&src, &dst).sync(true, false);
    assert_eq!(counters.new, 1);
    assert_eq!(counters.skipped, 1);
    assert_eq!(counters.copied, 0);
    assert_eq!(
        fs::read(target.absolute_path.join("notes.txt")).unwrap(),
        b"target keeps its own notes file"
    );
}

#[test]
fn sync_propagates_source_deletions() {
    let fx = Fixture::new();
    let source = fx.create_repo("src", 2, Codec::Json);
    let target = fx.create_repo("dst", 2, Codec::Json);
    let gone = write(&source, "old/report.pdf", &[8u8; 2048]);
    write(&source, "keep.pdf", &[9u8; 2048]);
    write(&target, "mirror/report.pdf", &[8u8; 2048]);
    write(&target, "mirror/keep.pdf", &[9u8; 2048]);
    fx.update(&source);
    fx.update(&target);

    fs::remove_file(gone).unwrap();
    fx.update(&source);

    let (src, dst) = (fx.loaded("src"), fx.loaded("dst"));
    let counters = DiffEngine::new(&src, &dst).sync(false, true);
    assert_eq!(counters.deleted, 1);
    assert_eq!(counters.removed, 1);
    assert_eq!(counters.equal, 1);
    assert!(!target.absolute_path.join("mirror/report.pdf").exists());
    assert!(target.absolute_path.join("mirror/keep.pdf").exists());
    assert!(dst.get_by_path("mirror/report.pdf").unwrap().missing);
}

#[test]
fn filtered_diff_only_considers_matching_records() {
    let fx = Fixture::new();
    let source = fx.create_repo("src", 1, Codec::Json);
    let target = fx.create_repo("dst", 1, Codec::Json);
    write(&source, "a.jpg", &[1u8; 300]);
    write(&source, "b.txt", &[2u8; 300]);
    fx.update(&source);
    fx.update(&target);

    let (src, dst) = (fx.loaded("src"), fx.loaded("dst"));
    let entries = DiffEngine::new(&src, &dst)
        .with_filter(RecordFilter::parse("mime:image/"))
        .print(false);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].record.relative_path, "a.jpg");
    assert_eq!(entries[0].kind, DiffKind::New);
}

#[test]
fn duplicates_are_found_across_repos() {
    let fx = Fixture::new();
    let left = fx.create_repo("left", 2, Codec::Json);
    let right = fx.create_repo("right", 3, Codec::Binary);
    write(&left, "a/photo.jpg", &[3u8; 4096]);
    write(&left, "b/photo-copy.jpg", &[3u8; 4096]);
    write(&right, "backup/photo.jpg", &[3u8; 4096]);
    write(&right, "unique.bin", &[4u8; 4096]);
    fx.update(&left);
    fx.update(&right);

    let (l, r) = (fx.loaded("left"), fx.loaded("right"));
    let groups = find_duplicates(&[&l, &r]);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].members.len(), 3);
    assert_eq!(duplicate_count(&groups), 2);
    assert_eq!(groups[0].wasted_bytes(), 8192);
}

#[test]
fn sync_counts_failed_copies_and_keeps_going() {
    let fx = Fixture::new();
    let source = fx.create_repo("src", 2, Codec::Json);
    let target = fx.create_repo("dst", 2, Codec::Json);
    write(&source, "a.bin", &[1u8; 300]);
    let vanished = write(&source, "b.bin", &[2u8; 301]);
    write(&source, "c.bin", &[3u8; 302]);
    fx.update(&source);
    fx.update(&target);
    fs::remove_file(vanished).unwrap();

    let (src, dst) = (fx.loaded("src"), fx.loaded("dst"));
    let counters = DiffEngine::new(&src, &dst).sync(true, false);
    assert_eq!(counters.new, 3);
    assert_eq!(counters.errors, 1);
    assert_eq!(counters.copied, 2);
    assert!(target.absolute_path.join("a.bin").exists());
    assert!(target.absolute_path.join("c.bin").exists());
    assert!(!target.absolute_path.join("b.bin").exists());
    assert!(dst.get_by_path("b.bin").is_none());
}
