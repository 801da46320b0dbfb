//! # wsbench-dao
//!
//! Data access for the wsbench benchmark service: customers (with address
//! and phones) and test statistics, on top of the wsbench-rdbc bridge.
//!
//! ```rust,ignore
//! use wsbench_dao::{CustomerDao, CustomerDaoConfig};
//!
//! let customers = CustomerDao::new(&sources, CustomerDaoConfig::new("customer"))?;
//! let mut all = customers.list_all().await?;
//! while let Some(customer) = all.next().await {
//!     let customer = customer?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod customer;
pub mod error;
pub mod model;
pub mod statistics;

pub use config::{CustomerDaoConfig, ServerInfo, StatisticsDaoConfig};
pub use customer::CustomerDao;
pub use error::{DaoError, Result};
pub use model::{Address, Customer, Phone, PhoneType, TestSuite};
pub use statistics::StatisticsDao;
