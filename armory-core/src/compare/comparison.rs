use super::{Compare, Differences};
use ndarray::{ArrayBase, Data, Dimension};
use std::fmt::{Debug, Display};

/// Collects the discrepancies of one pair of modules.
///
/// Methods are called in field declaration order, which is the order of the
/// resulting lines.
#[derive(Debug, Default)]
pub struct Comparison {
    diffs: Differences,
}

// NaN elements of learned parameters are considered equal to each other.
fn same_element<A: PartialEq>(a: &A, b: &A) -> bool {
    #[allow(clippy::eq_op)]
    let both_nan = a != a && b != b;
    a == b || both_nan
}

impl Comparison {
    /// Creates an empty comparison.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares a configuration field with exact equality.
    pub fn field<T>(&mut self, name: &str, lhs: &T, rhs: &T) -> &mut Self
    where
        T: PartialEq + Debug + ?Sized,
    {
        if lhs != rhs {
            self.diffs.push(format!("{}: {:?} != {:?}", name, lhs, rhs));
        }
        self
    }

    /// Compares a numeric parameter element-wise.
    ///
    /// A shape mismatch is reported without looking at the elements.
    pub fn array<A, S1, S2, D>(
        &mut self,
        name: &str,
        lhs: &ArrayBase<S1, D>,
        rhs: &ArrayBase<S2, D>,
    ) -> &mut Self
    where
        A: PartialEq + Debug,
        S1: Data<Elem = A>,
        S2: Data<Elem = A>,
        D: Dimension,
    {
        if lhs.shape() != rhs.shape() {
            self.diffs.push(format!(
                "{}: shape {:?} != {:?}",
                name,
                lhs.shape(),
                rhs.shape()
            ));
            return self;
        }

        let mut n_diffs = 0;
        let mut first = None;
        for (i, (l, r)) in lhs.iter().zip(rhs.iter()).enumerate() {
            if !same_element(l, r) {
                n_diffs += 1;
                if first.is_none() {
                    first = Some((i, l, r));
                }
            }
        }

        if let Some((i, l, r)) = first {
            self.diffs.push(format!(
                "{}: {} of {} elements differ (first at flat index {}: {:?} != {:?})",
                name,
                n_diffs,
                lhs.len(),
                i,
                l,
                r
            ));
        }
        self
    }

    /// Compares a nested module, prefixing its discrepancies with `name`.
    pub fn nested(&mut self, name: &str, lhs: &dyn Compare, rhs: &dyn Compare) -> &mut Self {
        let nested = lhs.compare(rhs);
        self.diffs.extend_prefixed(name, nested);
        self
    }

    /// Compares a nested module that may be absent on either side.
    pub fn optional(
        &mut self,
        name: &str,
        lhs: Option<&dyn Compare>,
        rhs: Option<&dyn Compare>,
    ) -> &mut Self {
        match (lhs, rhs) {
            (None, None) => {}
            (Some(lhs), Some(rhs)) => {
                self.nested(name, lhs, rhs);
            }
            (Some(lhs), None) => {
                self.diffs
                    .push(format!("{}: {} != missing", name, lhs.kind()));
            }
            (None, Some(rhs)) => {
                self.diffs
                    .push(format!("{}: missing != {}", name, rhs.kind()));
            }
        }
        self
    }

    /// Compares sequences of nested modules position by position.
    ///
    /// Different lengths are a discrepancy of their own; the common prefix is
    /// still compared.
    pub fn sequence(
        &mut self,
        name: &str,
        lhs: &[&dyn Compare],
        rhs: &[&dyn Compare],
    ) -> &mut Self {
        if lhs.len() != rhs.len() {
            self.diffs
                .push(format!("{}: length {} != {}", name, lhs.len(), rhs.len()));
        }
        for (i, (l, r)) in lhs.iter().zip(rhs.iter()).enumerate() {
            let nested = l.compare(*r);
            self.diffs.extend_prefixed(&format!("{}[{}]", name, i), nested);
        }
        self
    }

    /// Records that a field could not be compared.
    pub fn failure(&mut self, name: &str, err: impl Display) -> &mut Self {
        self.diffs
            .push(format!("{}: comparison failed: {}", name, err));
        self
    }

    /// Records a free-form discrepancy.
    pub fn push(&mut self, line: impl Into<String>) -> &mut Self {
        self.diffs.push(line);
        self
    }

    /// Returns the collected discrepancies.
    pub fn finish(self) -> Differences {
        self.diffs
    }
}
