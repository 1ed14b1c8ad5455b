pub mod import;
pub mod ledger;
pub mod reconcile;
mod record;
mod sorting;

pub use record::{Line, Record};
pub use sorting::sort_for_display;

pub type Decimal = rust_decimal::Decimal;

pub use anyhow::Result;

/// Amounts closer than this are considered equal (one cent).
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub(crate) fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    a.checked_sub(b).is_some_and(|delta| delta.abs() <= TOLERANCE)
}
