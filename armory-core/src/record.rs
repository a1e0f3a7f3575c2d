//! Statistics reported by learning steps.
//!
//! Learning operations of agent modules return a [`Record`] holding values
//! such as the training loss or the accumulated sample weight.
//!
//! ```rust
//! use armory_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("loss", 0.25);
//! record.merge_prefixed("arm0", Record::from_slice(&[("sum_weight", RecordValue::Scalar(3.0))]));
//! assert_eq!(record.get_scalar("loss").unwrap(), 0.25);
//! assert_eq!(record.get_scalar("arm0/sum_weight").unwrap(), 3.0);
//! ```
mod base;

pub use base::{Record, RecordValue};
