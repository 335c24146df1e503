//! Helpers shared by the query and label-values handlers

pub mod forward;
pub mod params;
