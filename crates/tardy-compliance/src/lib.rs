//! # tardy-compliance
//!
//! Who owes a report right now.
//!
//! - [`ComplianceFeed`]: the two remote calls the bot needs (periods, paged
//!   non-compliant users)
//! - [`select_current_period`]: pick the active reporting period
//! - [`ComplianceSource`]: lazy record stream that drains every page, plus
//!   single-identity re-checks
//! - [`TockClient`]: HTTP implementation against the Tock audit API

#![deny(unsafe_code)]

pub mod errors;
pub mod feed;
pub mod period;
pub mod source;
pub mod tock;
pub mod types;

pub use errors::{ComplianceError, Result};
pub use feed::ComplianceFeed;
pub use period::{parse_period_date, select_current_period};
pub use source::{ComplianceSource, RecordStream};
pub use tock::TockClient;
pub use types::{ComplianceRecord, NonCompliantPage, NonCompliantUser, PageToken, ReportingPeriod};
