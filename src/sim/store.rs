//! Hour-indexed state table for one dispatch pass.

use super::series::is_leap_day;
use super::types::HourRecord;

/// Ordered hour records of a single trial. Reused across trials through
/// [`DispatchStateStore::reset`]; never shared between scenarios.
#[derive(Debug, Clone, Default)]
pub struct DispatchStateStore {
    records: Vec<HourRecord>,
}

impl DispatchStateStore {
    pub fn with_capacity(hours: usize) -> Self {
        Self {
            records: Vec::with_capacity(hours),
        }
    }

    /// Clears every record, keeping the allocation.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub fn push(&mut self, record: HourRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HourRecord> {
        self.records.get(index)
    }

    /// Record of the hour before `index`; `None` for the first hour.
    pub fn previous(&self, index: usize) -> Option<&HourRecord> {
        index.checked_sub(1).and_then(|i| self.records.get(i))
    }

    pub fn last(&self) -> Option<&HourRecord> {
        self.records.last()
    }

    /// Drops Feb 29 hours so every year reports on the same basis.
    pub fn drop_leap_days(&mut self) {
        self.records.retain(|r| !is_leap_day(&r.timestamp));
    }

    pub fn records(&self) -> &[HourRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<HourRecord> {
        self.records
    }
}
