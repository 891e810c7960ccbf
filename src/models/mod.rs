pub mod debug;
pub mod query;
pub mod sales;

pub use debug::{DebugCall, DebugOperation, HashParams};
pub use query::{AggregateParams, ColumnOverrides, DateRange, MatchMode, RegionFilter, SalesQuery};
pub use sales::{parse_date, SalesRecord};
