//! Per-user default values for courier requests.
//!
//! Users who turn on both auto-fill and automation get their saved sender,
//! courier type, category, priority and tags copied into courier requests
//! that leave those fields empty.

mod fill;
mod preferences;

pub use fill::{AutoFill, AUTO_FILLED_FIELD};
pub use preferences::{PreferenceStore, UserPreferences, FILLED_FIELDS};
