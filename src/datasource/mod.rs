//! Datasource selection and label-values federation
//!
//! Chooses the backend best suited for a query and fans label-values
//! lookups out to every backend.

pub mod label_values;
pub mod selector;

pub use label_values::{LabelValuesAggregator, LabelValuesResponse};
pub use selector::{RangeQuery, select_for_instant, select_for_range};
