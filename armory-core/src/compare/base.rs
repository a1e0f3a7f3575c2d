use super::{Comparison, Differences};
use log::trace;
use std::any::Any;

/// Object-safe comparison capability of agent modules.
///
/// Composite modules hold their children as trait objects whose traits extend
/// [`Compare`], so a parent can compare children without knowing their
/// concrete types. Do not implement this trait directly; implement
/// [`CompareFields`] instead.
pub trait Compare {
    /// Declared kind of the module.
    fn kind(&self) -> &'static str;

    /// Returns `self` as [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable version of [`Compare::as_any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Returns `self` as a [`Compare`] trait object.
    ///
    /// Lets a `&dyn Trait` with `Trait: Compare` be passed where a `&dyn Compare`
    /// is expected.
    fn as_compare(&self) -> &dyn Compare;

    /// Lists every discrepancy between `self` and `other`.
    ///
    /// The result is empty if and only if both are of the same kind and all
    /// tracked fields, parameters and nested modules are equivalent.
    fn compare(&self, other: &dyn Compare) -> Differences;
}

/// Field-level description of a comparable module.
pub trait CompareFields: Any {
    /// Kind name reported in type mismatches.
    const KIND: &'static str;

    /// Feeds every tracked field of `self` and `other` to `cmp`, in declaration order.
    ///
    /// Transient state, such as step counters, is left out.
    fn compare_fields(&self, other: &Self, cmp: &mut Comparison);
}

impl<T: CompareFields> Compare for T {
    fn kind(&self) -> &'static str {
        T::KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_compare(&self) -> &dyn Compare {
        self
    }

    fn compare(&self, other: &dyn Compare) -> Differences {
        match other.as_any().downcast_ref::<T>() {
            None => {
                trace!("Compare {} with {}", T::KIND, other.kind());
                Differences::from_line(format!("kind: {} != {}", T::KIND, other.kind()))
            }
            Some(other) if std::ptr::eq(self, other) => Differences::new(),
            Some(other) => {
                let mut cmp = Comparison::new();
                self.compare_fields(other, &mut cmp);
                cmp.finish()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Egreedy {
        epsilon: f64,
        steps: usize,
    }

    impl CompareFields for Egreedy {
        const KIND: &'static str = "Egreedy";

        fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
            cmp.field("epsilon", &self.epsilon, &other.epsilon);
        }
    }

    struct Greedy;

    impl CompareFields for Greedy {
        const KIND: &'static str = "Greedy";

        fn compare_fields(&self, _other: &Self, _cmp: &mut Comparison) {}
    }

    #[test]
    fn test_reflexive_even_with_nan() {
        let e = Egreedy {
            epsilon: f64::NAN,
            steps: 0,
        };
        assert!(e.compare(&e).is_empty());
    }

    #[test]
    fn test_untracked_field_is_ignored() {
        let e1 = Egreedy {
            epsilon: 0.1,
            steps: 0,
        };
        let e2 = Egreedy {
            epsilon: 0.1,
            steps: 10,
        };
        assert_eq!(e1.steps + 10, e2.steps);
        assert!(e1.compare(&e2).is_empty());
    }

    #[test]
    fn test_kind_mismatch() {
        let e = Egreedy {
            epsilon: 0.1,
            steps: 0,
        };
        let diffs = e.compare(&Greedy);
        assert_eq!(diffs.to_string(), "kind: Egreedy != Greedy");
        assert!(!Greedy.compare(&e).is_empty());
    }

    #[test]
    fn test_through_trait_object() {
        let boxed: Vec<Box<dyn Compare>> = vec![
            Box::new(Egreedy {
                epsilon: 0.1,
                steps: 0,
            }),
            Box::new(Egreedy {
                epsilon: 0.2,
                steps: 0,
            }),
        ];
        assert_eq!(boxed[0].kind(), "Egreedy");
        let diffs = boxed[0].compare(boxed[1].as_compare());
        assert_eq!(diffs.lines(), &["epsilon: 0.1 != 0.2".to_string()]);

        let mut boxed = boxed;
        if let Some(e) = boxed[1].as_any_mut().downcast_mut::<Egreedy>() {
            e.epsilon = 0.1;
        }
        assert!(boxed[0].compare(boxed[1].as_compare()).is_empty());
    }
}
