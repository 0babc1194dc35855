use super::support::{write, Fixture};
use dedup::catalogue::yaml::REPO_FILE;
use dedup::catalogue::{RepoCatalogue, RepoSettings};
use dedup::Codec;
use std::fs;

#[test]
fn shard_files_hold_one_json_record_per_line() {
    let fx = Fixture::new();
    let repo = fx.create_repo("lines", 2, Codec::Json);
    write(&repo, "even.bin", &[0u8; 64]);
    write(&repo, "odd.bin", &[0u8; 65]);
    fx.update(&repo);

    let dir = fx.catalogue.index_dir("lines");
    let even = fs::read_to_string(dir.join("0.idx")).unwrap();
    let odd = fs::read_to_string(dir.join("1.idx")).unwrap();
    assert_eq!(even.lines().count(), 1);
    assert_eq!(odd.lines().count(), 1);

    let value: serde_json::Value = serde_json::from_str(even.trim()).unwrap();
    assert_eq!(value["p"], "even.bin");
    assert_eq!(value["s"], 64);
    assert!(value.get("d").is_none());
}

#[test]
fn repo_yaml_describes_layout() {
    let fx = Fixture::new();
    fx.catalogue
        .create_repo(
            "photos",
            fx.temp.path(),
            RepoSettings {
                shard_count: 5,
                codec: Codec::Binary,
                compressed: true,
            },
        )
        .unwrap();

    let yaml = fs::read_to_string(fx.catalogue.index_dir("photos").join(REPO_FILE)).unwrap();
    let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(value["name"].as_str(), Some("photos"));
    assert_eq!(value["indices"].as_u64(), Some(5));
    assert_eq!(value["codec"].as_str(), Some("BINARY"));
    assert_eq!(value["compressed"].as_bool(), Some(true));
}

#[test]
fn corrupt_shard_is_repaired_on_load() {
    let fx = Fixture::new();
    let repo = fx.create_repo("broken", 1, Codec::Json);
    write(&repo, "fine.bin", &[5u8; 200]);
    fx.update(&repo);

    let shard = fx.catalogue.index_dir("broken").join("0.idx");
    let mut content = fs::read_to_string(&shard).unwrap();
    content.push_str("{not json at all\n");
    fs::write(&shard, content).unwrap();

    let mut manager = fx.catalogue.open("broken").unwrap();
    let stats = manager.load().unwrap();
    assert_eq!(stats.corrupt, 1);
    assert_eq!(stats.files, 1);
    assert!(manager.get_by_path("fine.bin").is_some());
    drop(manager);

    let mut backup = shard.as_os_str().to_owned();
    backup.push(".bak");
    assert!(std::path::Path::new(&backup).exists());
    assert_eq!(fs::read_to_string(&shard).unwrap().lines().count(), 1);
    let mut reopened = fx.catalogue.open("broken").unwrap();
    assert_eq!(reopened.load().unwrap().corrupt, 0);
}
