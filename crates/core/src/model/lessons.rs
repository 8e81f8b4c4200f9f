use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::ids::LessonIndex;

/// Largest curriculum the progress model accepts. Indices at or above this are
/// ignored rather than expanded.
pub const MAX_LESSONS: u32 = 10_000;

//
// ─── COMPLETED LESSONS ────────────────────────────────────────────────────────
//

/// Lessons the current identity has finished.
///
/// Always prefix-dense: when non-empty it holds every index from `0` up to
/// its maximum. Out-of-order completions are absorbed by filling the gap,
/// never rejected.
///
/// ```
/// # use progress_core::model::{CompletedLessons, LessonIndex};
/// let set = CompletedLessons::from_indices([LessonIndex::new(3)]);
/// assert_eq!(set.len(), 4);
/// assert_eq!(set.next_lesson(), LessonIndex::new(4));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LessonIndex>", into = "Vec<LessonIndex>")]
pub struct CompletedLessons {
    lessons: BTreeSet<LessonIndex>,
}

impl CompletedLessons {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dense set from arbitrary indices (duplicates and gaps allowed).
    ///
    /// Indices at or above [`MAX_LESSONS`] are dropped.
    #[must_use]
    pub fn from_indices(indices: impl IntoIterator<Item = LessonIndex>) -> Self {
        let max = indices
            .into_iter()
            .filter(|index| index.value() < MAX_LESSONS)
            .max();
        Self {
            lessons: expand_prefix(max),
        }
    }

    /// Union of both sets, re-expanded to stay dense.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::from_indices(self.iter().chain(other.iter()))
    }

    /// Union with raw indices, e.g. a remote list.
    #[must_use]
    pub fn merged_with(&self, indices: &[LessonIndex]) -> Self {
        Self::from_indices(self.iter().chain(indices.iter().copied()))
    }

    /// Mark `index` completed, filling any lower gaps.
    ///
    /// Returns `false` and leaves the set untouched when `index` was already
    /// present or is at or above [`MAX_LESSONS`].
    pub fn insert_expanding(&mut self, index: LessonIndex) -> bool {
        if self.lessons.contains(&index) || index.value() >= MAX_LESSONS {
            return false;
        }
        self.lessons = expand_prefix(Some(index));
        true
    }

    #[must_use]
    pub fn contains(&self, index: LessonIndex) -> bool {
        self.lessons.contains(&index)
    }

    #[must_use]
    pub fn max(&self) -> Option<LessonIndex> {
        self.lessons.last().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = LessonIndex> + '_ {
        self.lessons.iter().copied()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<LessonIndex> {
        self.iter().collect()
    }

    /// The lowest lesson not yet completed.
    #[must_use]
    pub fn next_lesson(&self) -> LessonIndex {
        self.max().map_or(LessonIndex::new(0), LessonIndex::next)
    }

    /// How a lesson should be presented given the current progress.
    #[must_use]
    pub fn status_of(&self, index: LessonIndex) -> LessonStatus {
        if self.contains(index) {
            LessonStatus::Completed
        } else if index == self.next_lesson() {
            LessonStatus::Next
        } else {
            LessonStatus::Locked
        }
    }
}

impl From<Vec<LessonIndex>> for CompletedLessons {
    fn from(value: Vec<LessonIndex>) -> Self {
        Self::from_indices(value)
    }
}

impl From<CompletedLessons> for Vec<LessonIndex> {
    fn from(value: CompletedLessons) -> Self {
        value.lessons.into_iter().collect()
    }
}

fn expand_prefix(max: Option<LessonIndex>) -> BTreeSet<LessonIndex> {
    match max {
        Some(max) => (0..=max.value()).map(LessonIndex::new).collect(),
        None => BTreeSet::new(),
    }
}

//
// ─── LESSON STATUS ────────────────────────────────────────────────────────────
//

/// Presentation state of a single lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonStatus {
    Completed,
    /// The lowest uncompleted lesson.
    Next,
    /// Further ahead. Opening it means skipping lessons.
    Locked,
}

//
// ─── PROGRESS SUMMARY ─────────────────────────────────────────────────────────
//

/// Aggregated view of curriculum progress, useful for progress bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
    pub completed: u32,
    pub total: u32,
    /// Completion percentage clamped to `0..=100`.
    pub percent: u8,
    pub next_lesson: LessonIndex,
    pub is_finished: bool,
}

impl ProgressSummary {
    #[must_use]
    pub fn new(lessons: &CompletedLessons, total: u32) -> Self {
        let completed = u32::try_from(lessons.len())
            .unwrap_or(u32::MAX)
            .min(total);
        let percent = if total == 0 {
            0
        } else {
            let raw = u64::from(completed) * 100 / u64::from(total);
            u8::try_from(raw.min(100)).unwrap_or(100)
        };

        Self {
            completed,
            total,
            percent,
            next_lesson: lessons.next_lesson(),
            is_finished: total > 0 && completed >= total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(values: &[u32]) -> Vec<LessonIndex> {
        values.iter().copied().map(LessonIndex::new).collect()
    }

    #[test]
    fn empty_set_starts_at_first_lesson() {
        let set = CompletedLessons::new();
        assert!(set.is_empty());
        assert_eq!(set.max(), None);
        assert_eq!(set.next_lesson(), LessonIndex::new(0));
        assert_eq!(set.status_of(LessonIndex::new(0)), LessonStatus::Next);
        assert_eq!(set.status_of(LessonIndex::new(1)), LessonStatus::Locked);
    }

    #[test]
    fn indices_beyond_cap_are_ignored() {
        let set = CompletedLessons::from_indices(idx(&[2, u32::MAX]));
        assert_eq!(set.len(), 3);
        assert!(CompletedLessons::from_indices(idx(&[MAX_LESSONS])).is_empty());

        let mut set = CompletedLessons::new();
        assert!(!set.insert_expanding(LessonIndex::new(u32::MAX)));
        assert!(set.is_empty());

        let decoded: CompletedLessons = serde_json::from_str("[0,4294967295]").unwrap();
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn from_indices_fills_gaps() {
        let set = CompletedLessons::from_indices(idx(&[5, 2, 2]));
        assert_eq!(set.to_vec(), idx(&[0, 1, 2, 3, 4, 5]));
    }

    #[test]
    fn union_with_remote_expands_to_max() {
        let local = CompletedLessons::from_indices(idx(&[0, 1, 2]));
        let merged = local.merged_with(&idx(&[0, 1, 2, 5]));
        assert_eq!(merged.to_vec(), idx(&[0, 1, 2, 3, 4, 5]));
    }

    #[test]
    fn union_keeps_larger_side() {
        let a = CompletedLessons::from_indices(idx(&[7]));
        let b = CompletedLessons::from_indices(idx(&[2]));
        assert_eq!(a.union(&b), a);
        assert_eq!(b.union(&a), a);
    }

    #[test]
    fn insert_expanding_is_idempotent() {
        let mut set = CompletedLessons::new();
        assert!(set.insert_expanding(LessonIndex::new(3)));
        assert_eq!(set.len(), 4);

        let before = set.clone();
        assert!(!set.insert_expanding(LessonIndex::new(3)));
        assert!(!set.insert_expanding(LessonIndex::new(1)));
        assert_eq!(set, before);
    }

    #[test]
    fn every_insert_keeps_prefix_density() {
        let mut set = CompletedLessons::new();
        for raw in [4_u32, 1, 9, 0, 9, 12, 3] {
            set.insert_expanding(LessonIndex::new(raw));
            let max = set.max().unwrap().value();
            assert_eq!(set.to_vec(), (0..=max).map(LessonIndex::new).collect::<Vec<_>>());
        }
    }

    #[test]
    fn status_tracks_next_lesson() {
        let set = CompletedLessons::from_indices(idx(&[2]));
        assert_eq!(set.status_of(LessonIndex::new(1)), LessonStatus::Completed);
        assert_eq!(set.status_of(LessonIndex::new(3)), LessonStatus::Next);
        assert_eq!(set.status_of(LessonIndex::new(4)), LessonStatus::Locked);
    }

    #[test]
    fn deserializing_sparse_json_yields_dense_set() {
        let set: CompletedLessons = serde_json::from_str("[0, 3]").unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(serde_json::to_string(&set).unwrap(), "[0,1,2,3]");
    }

    #[test]
    fn summary_clamps_percent() {
        let set = CompletedLessons::from_indices(idx(&[9]));
        let summary = ProgressSummary::new(&set, 8);
        assert_eq!(summary.completed, 8);
        assert_eq!(summary.percent, 100);
        assert!(summary.is_finished);

        let half = ProgressSummary::new(&CompletedLessons::from_indices(idx(&[1])), 4);
        assert_eq!(half.percent, 50);
        assert!(!half.is_finished);
        assert_eq!(half.next_lesson, LessonIndex::new(2));
    }

    #[test]
    fn summary_without_curriculum_is_zero() {
        let summary = ProgressSummary::new(&CompletedLessons::new(), 0);
        assert_eq!(summary.percent, 0);
        assert!(!summary.is_finished);
    }
}
