//! Manifest merge reducer.
//!
//! Folding is a pure function of the accumulator and the next manifest:
//! - global namespaces (`variables`, `lists`, `broadcasts`): first write wins
//!   per key
//! - non-stage targets: last write wins per `name`; the winner is appended
//! - stage targets of later manifests are ignored
//! - all other top-level fields stay as the first manifest had them

use sb3_bundle::{Namespace, NamespaceKind, ProjectManifest};
use serde::Serialize;
use serde_json::map::Entry;
use std::ops::AddAssign;
use tracing::debug;

/// Counters describing what a merge step did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Targets appended under a name not seen before.
    pub targets_appended: usize,
    /// Targets that replaced an earlier target with the same name.
    pub targets_replaced: usize,
    /// Stage targets dropped from later manifests.
    pub stages_ignored: usize,
    /// Namespace keys added to the accumulator.
    pub keys_added: usize,
    /// Namespace keys already present and left untouched.
    pub keys_kept: usize,
}

impl AddAssign for MergeStats {
    fn add_assign(&mut self, other: Self) {
        self.targets_appended += other.targets_appended;
        self.targets_replaced += other.targets_replaced;
        self.stages_ignored += other.stages_ignored;
        self.keys_added += other.keys_added;
        self.keys_kept += other.keys_kept;
    }
}

/// Fold `next` into `accumulator` and return the new accumulator.
pub fn merge(accumulator: ProjectManifest, next: ProjectManifest) -> ProjectManifest {
    merge_with_stats(accumulator, next).0
}

/// Like [`merge`], also reporting what changed.
pub fn merge_with_stats(
    mut accumulator: ProjectManifest,
    next: ProjectManifest,
) -> (ProjectManifest, MergeStats) {
    let mut stats = MergeStats::default();

    let ProjectManifest {
        targets,
        variables,
        lists,
        broadcasts,
        extra: _,
    } = next;

    for (kind, incoming) in [
        (NamespaceKind::Variables, variables),
        (NamespaceKind::Lists, lists),
        (NamespaceKind::Broadcasts, broadcasts),
    ] {
        merge_namespace(accumulator.namespace_slot(kind), incoming, &mut stats);
    }

    for target in targets {
        if target.is_stage {
            stats.stages_ignored += 1;
            continue;
        }

        let existing = accumulator
            .targets
            .iter()
            .position(|t| !t.is_stage && t.name == target.name);

        match existing {
            Some(index) => {
                accumulator.targets.remove(index);
                stats.targets_replaced += 1;
                debug!(name = %target.name, "Target replaced");
            }
            None => stats.targets_appended += 1,
        }
        accumulator.targets.push(target);
    }

    (accumulator, stats)
}

/// Start the accumulator from the first manifest or fold into it.
///
/// The first manifest is adopted as-is, including its stage and metadata.
pub fn fold(
    accumulator: Option<ProjectManifest>,
    next: ProjectManifest,
) -> (ProjectManifest, MergeStats) {
    match accumulator {
        Some(accumulator) => merge_with_stats(accumulator, next),
        None => (next, MergeStats::default()),
    }
}

/// Fold a whole sequence left to right.
pub fn merge_all<I>(manifests: I) -> Option<ProjectManifest>
where
    I: IntoIterator<Item = ProjectManifest>,
{
    manifests
        .into_iter()
        .fold(None, |acc, next| Some(fold(acc, next).0))
}

fn merge_namespace(slot: &mut Option<Namespace>, incoming: Option<Namespace>, stats: &mut MergeStats) {
    let Some(incoming) = incoming else {
        return;
    };
    if incoming.is_empty() {
        return;
    }

    let existing = slot.get_or_insert_with(Namespace::new);
    for (key, value) in incoming {
        match existing.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(value);
                stats.keys_added += 1;
            }
            Entry::Occupied(_) => stats.keys_kept += 1,
        }
    }
}
