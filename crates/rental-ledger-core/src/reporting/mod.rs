pub mod aggregate;
pub mod filter;
pub mod report;

pub use aggregate::{aggregate, AggregationResult};
pub use filter::{narrow, ResolvedScope, ScopeFilter};
