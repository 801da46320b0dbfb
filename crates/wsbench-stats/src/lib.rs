//! # wsbench-stats
//!
//! Call statistics shared between request handlers and the statistics
//! consolidation path.
//!
//! ```rust,ignore
//! use wsbench_stats::{CallRecord, StatisticsCache};
//!
//! let cache = Arc::new(StatisticsCache::new());
//!
//! // request handler
//! cache.register(CallRecord::new("rest", "list", 1).with_server_times(t0, t1));
//!
//! // consolidation, once the client reports
//! let mut call = CallRecord::new("rest", "list", 1).with_client_times(c0, c1);
//! cache.merge(&mut call);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod cache;
pub mod call;

pub use cache::StatisticsCache;
pub use call::{CallKey, CallRecord, UNSET};
