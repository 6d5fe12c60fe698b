//! Property-based tests for the reactive graph
//!
//! Uses proptest to verify:
//! 1. Writes of unchanged values never re-run effects
//! 2. A memo computes at most once per distinct dependency change
//! 3. Any number of writes inside a batch runs an effect at most once

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use ripple_core::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Effects run once per write that actually changes the value.
    #[test]
    fn effect_runs_track_distinct_changes(writes in prop::collection::vec(0u8..4, 0..40)) {
        let rt = Runtime::new();
        let cell = rt.signal(0u8);
        let runs = Rc::new(Cell::new(0usize));

        rt.effect({
            let cell = cell.clone();
            let runs = Rc::clone(&runs);
            move || {
                cell.get();
                runs.set(runs.get() + 1);
            }
        });

        let mut current = 0u8;
        let mut changes = 0usize;
        for value in writes {
            if value != current {
                changes += 1;
                current = value;
            }
            cell.set(value);
        }

        prop_assert_eq!(runs.get(), 1 + changes);
    }

    /// Reading a memo repeatedly never recomputes it without a change.
    #[test]
    fn memo_recomputes_only_after_changes(
        steps in prop::collection::vec((any::<bool>(), 0i32..8), 1..40),
    ) {
        let rt = Runtime::new();
        let cell = rt.signal(0i32);
        let computes = Rc::new(Cell::new(0usize));

        let doubled = rt.memo({
            let cell = cell.clone();
            let computes = Rc::clone(&computes);
            move || {
                computes.set(computes.get() + 1);
                cell.get() * 2
            }
        });

        let mut expected = 0usize;
        let mut stale = true;
        let mut current = 0i32;
        for (write, value) in steps {
            if write {
                if value != current {
                    stale = true;
                    current = value;
                }
                cell.set(value);
            } else {
                if stale {
                    expected += 1;
                    stale = false;
                }
                prop_assert_eq!(doubled.get(), current * 2);
            }
        }

        prop_assert_eq!(computes.get(), expected);
    }

    /// A batch of writes runs dependents at most once and they observe the
    /// final value.
    #[test]
    fn batched_writes_coalesce(writes in prop::collection::vec(any::<i16>(), 1..20)) {
        let rt = Runtime::new();
        let cell = rt.signal(0i16);
        let runs = Rc::new(Cell::new(0usize));
        let last = Rc::new(Cell::new(0i16));

        rt.effect({
            let cell = cell.clone();
            let runs = Rc::clone(&runs);
            let last = Rc::clone(&last);
            move || {
                last.set(cell.get());
                runs.set(runs.get() + 1);
            }
        });

        let final_value = *writes.last().unwrap();
        rt.batch(|| {
            for value in &writes {
                cell.set(*value);
            }
        });

        let expected_runs = if writes.iter().any(|v| *v != 0) { 2 } else { 1 };
        prop_assert_eq!(runs.get(), expected_runs);
        prop_assert_eq!(last.get(), final_value);
    }
}
