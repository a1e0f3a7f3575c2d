//! Structural comparison of agent modules.
//!
//! A module describes its tracked state once, in [`CompareFields::compare_fields`],
//! by feeding pairs of fields to a [`Comparison`]. The blanket implementation of
//! [`Compare`] adds the parts every module shares:
//!
//! * comparing a module with itself returns no difference without looking at
//!   its fields,
//! * comparing modules of different kinds returns a single line naming both
//!   kinds instead of failing.
//!
//! ```rust
//! use armory_core::{Compare, CompareFields, Comparison};
//!
//! struct Ucb {
//!     alpha: f64,
//! }
//!
//! impl CompareFields for Ucb {
//!     const KIND: &'static str = "Ucb";
//!
//!     fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
//!         cmp.field("alpha", &self.alpha, &other.alpha);
//!     }
//! }
//!
//! let a = Ucb { alpha: 1.0 };
//! let b = Ucb { alpha: 0.5 };
//! assert!(a.compare(&a).is_empty());
//! assert_eq!(a.compare(&b).to_string(), "alpha: 1.0 != 0.5");
//! ```
mod base;
mod comparison;
mod differences;

pub use base::{Compare, CompareFields};
pub use comparison::Comparison;
pub use differences::Differences;
