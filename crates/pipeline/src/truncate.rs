//! Context Truncator: bounds list-shaped fields before synthesis.

use campusfed_core::context::ContextBag;
use serde_json::Value;

/// Default cap on items per list field.
pub const DEFAULT_MAX_ITEMS: usize = 50;

pub const TOTAL_COUNT_SUFFIX: &str = "_total_count";

/// Keep the first `max_items` elements of every array field. A truncated
/// field gains a `<field>_total_count` sibling with the original length.
/// Order is preserved and nothing is filtered, so applying it twice is the
/// same as applying it once.
pub fn truncate(mut bag: ContextBag, max_items: usize) -> ContextBag {
    let mut totals = Vec::new();

    for (field, value) in bag.fields.iter_mut() {
        if let Value::Array(items) = value
            && items.len() > max_items
        {
            totals.push((format!("{field}{TOTAL_COUNT_SUFFIX}"), items.len()));
            items.truncate(max_items);
        }
    }

    for (key, total) in totals {
        bag.fields.insert(key, Value::from(total));
    }
    bag
}
