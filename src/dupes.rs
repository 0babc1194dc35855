//! Duplicate discovery across one or more loaded repos.

use crate::index::RepoManager;
use crate::types::{ContentKey, Record};
use std::collections::BTreeMap;

/// A record together with the repo it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub repo: String,
    pub record: Record,
}

/// Live records sharing one content identity, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub key: ContentKey,
    pub members: Vec<Member>,
}

impl DuplicateGroup {
    /// The copy to keep: the oldest by modification time.
    pub fn keep(&self) -> Option<&Member> {
        self.members.first()
    }

    pub fn redundant(&self) -> &[Member] {
        self.members.get(1..).unwrap_or_default()
    }

    /// Bytes freed by removing every redundant copy.
    pub fn wasted_bytes(&self) -> u64 {
        self.key.size * self.redundant().len() as u64
    }
}

/// Records whose fingerprints are within the similarity threshold of the
/// group's first member.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarGroup {
    pub members: Vec<(Member, f64)>,
}

fn live_members<'a>(repos: &'a [&'a RepoManager]) -> impl Iterator<Item = Member> + 'a {
    repos.iter().flat_map(|manager| {
        let repo = manager.repo().name.clone();
        manager
            .stream()
            .into_iter()
            .filter(Record::is_live)
            .map(move |record| Member {
                repo: repo.clone(),
                record,
            })
    })
}

/// Group live records by (hash, size); only groups with more than one member
/// are returned, largest files first.
pub fn find_duplicates(repos: &[&RepoManager]) -> Vec<DuplicateGroup> {
    let mut by_key: BTreeMap<ContentKey, Vec<Member>> = BTreeMap::new();
    for member in live_members(repos) {
        by_key.entry(member.record.key()).or_default().push(member);
    }

    let mut groups: Vec<DuplicateGroup> = by_key
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(key, mut members)| {
            members.sort_by(|a, b| {
                a.record
                    .last_modified
                    .cmp(&b.record.last_modified)
                    .then_with(|| a.repo.cmp(&b.repo))
                    .then_with(|| a.record.relative_path.cmp(&b.record.relative_path))
            });
            DuplicateGroup { key, members }
        })
        .collect();
    groups.sort_by(|a, b| b.key.size.cmp(&a.key.size).then_with(|| a.key.cmp(&b.key)));
    groups
}

/// Σ(group size − 1) over all groups.
pub fn duplicate_count(groups: &[DuplicateGroup]) -> u64 {
    groups.iter().map(|g| g.redundant().len() as u64).sum()
}

/// Percentage of equal bits between two 64-bit fingerprints.
pub fn similarity(a: u64, b: u64) -> f64 {
    let distance = (a ^ b).count_ones();
    (1.0 - f64::from(distance) / 64.0) * 100.0
}

/// Greedy grouping of fingerprinted records by Hamming similarity.
///
/// Each record joins the first group whose leading member is at least
/// `threshold` percent similar. Records without a parseable hex fingerprint
/// are ignored.
pub fn find_similar(repos: &[&RepoManager], threshold: f64) -> Vec<SimilarGroup> {
    let mut groups: Vec<(u64, Vec<(Member, f64)>)> = Vec::new();

    for member in live_members(repos) {
        let Some(fp) = member
            .record
            .fingerprint
            .as_deref()
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
        else {
            continue;
        };

        match groups
            .iter()
            .position(|(lead, _)| similarity(*lead, fp) >= threshold)
        {
            Some(index) => {
                let score = similarity(groups[index].0, fp);
                groups[index].1.push((member, score));
            }
            None => groups.push((fp, vec![(member, 100.0)])),
        }
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(_, members)| SimilarGroup { members })
        .collect()
}
