use std::collections::BTreeSet;

/// Days before a birthday on which to send a reminder.
///
/// `0` (the day itself) is always present, duplicates collapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceOffsets(BTreeSet<u32>);

impl AdvanceOffsets {
    pub fn new(days: impl IntoIterator<Item = u32>) -> Self {
        let mut set: BTreeSet<u32> = days.into_iter().collect();
        set.insert(0);
        Self(set)
    }

    /// Ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, days: u32) -> bool {
        self.0.contains(&days)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AdvanceOffsets {
    fn default() -> Self {
        Self::new([])
    }
}
