//! Safety module root.
//!
//! Input channel monitoring, output supervision and fault aggregation.

pub mod fault;
pub mod monitor;
pub mod output;
