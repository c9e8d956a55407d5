use serde::Deserialize;

/// Fixed window size of every listing.
pub const PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, Default, Ord, PartialOrd, Eq, PartialEq, Hash, Deserialize)]
#[serde(transparent)]
pub struct PageOffset(pub u32);

impl PageOffset {
    pub fn limit(&self) -> i64 {
        PAGE_SIZE as i64
    }

    pub fn offset(&self) -> i64 {
        self.0 as i64
    }

    /// Slices an already ordered in-memory result the same way `LIMIT/OFFSET` does.
    pub fn window<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.0 as usize)
            .take(PAGE_SIZE as usize)
            .collect()
    }
}
