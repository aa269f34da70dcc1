mod engine;
mod report;
mod snapshot;

pub use engine::{
    MissingPrice, RefreshError, RefreshOutcome, ValuationEngine, DEFAULT_REFRESH_TIMEOUT,
};
pub use report::{Report, ReportRow};
pub use snapshot::{SnapshotDocument, SnapshotEntry, SnapshotPrice};

use rust_decimal::Decimal;

/// Sum that clamps at `Decimal::MAX` instead of overflowing.
pub(crate) fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
        .unwrap_or(Decimal::MAX)
}
