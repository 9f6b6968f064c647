//! Property-Based Tests for zoom stop computation and conversion
//!
//! Run with: cargo test --test zoom_props

use lenscam::types::LensKind;
use lenscam::zoom::{
    available_zoom_factors, logical_from_physical, physical_from_logical, LensTopology,
    ZoomFactorSet, STOP_TOLERANCE,
};
use proptest::prelude::*;

/// Ascending, distinct switch-over thresholds.
fn switch_over() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.1f64..9.0, 1..4).prop_map(|mut values| {
        values.sort_by(f64::total_cmp);
        values.dedup_by(|a, b| (*a - *b).abs() < 0.05);
        values
    })
}

/// A fused topology whose primary wide lens sits at an arbitrary constituent index.
fn fused_topology() -> impl Strategy<Value = LensTopology> {
    (switch_over(), 0usize..4, any::<bool>(), 0.3f64..2.0, 2.0f64..30.0).prop_map(
        |(switch_over, wide_seed, first_is_ultra_wide, min, max)| {
            let count = switch_over.len() + 1;
            let wide_index = wide_seed % count;
            let constituents: Vec<LensKind> = (0..count)
                .map(|i| {
                    if i == wide_index {
                        LensKind::Wide
                    } else if i == 0 && first_is_ultra_wide {
                        LensKind::UltraWide
                    } else {
                        LensKind::Telephoto
                    }
                })
                .collect();
            LensTopology::fused(&switch_over, &constituents, min, max)
        },
    )
}

fn single_topology() -> impl Strategy<Value = LensTopology> {
    (0.3f64..3.0, 0.0f64..40.0).prop_map(|(min, span)| LensTopology::single(min, min + span))
}

fn any_topology() -> impl Strategy<Value = LensTopology> {
    prop_oneof![fused_topology(), single_topology()]
}

fn assert_set_shape(set: &ZoomFactorSet) -> Result<(), TestCaseError> {
    let values = set.as_slice();
    prop_assert!(!values.is_empty(), "set must not be empty");
    prop_assert!(values.contains(&1.0), "set must contain 1.0: {:?}", values);
    for pair in values.windows(2) {
        prop_assert!(pair[0] < pair[1], "set must be ascending: {:?}", values);
        prop_assert!(
            pair[1] - pair[0] > STOP_TOLERANCE,
            "stops closer than tolerance: {:?}",
            values
        );
    }
    Ok(())
}

proptest! {
    /// INVARIANT: Every device yields a non-empty, ascending, tolerance-separated set containing 1.0
    #[test]
    fn available_factors_have_valid_shape(topology in any_topology()) {
        let set = available_zoom_factors(&topology);
        assert_set_shape(&set)?;
    }

    /// INVARIANT: Probing is deterministic
    #[test]
    fn probing_is_deterministic(topology in any_topology()) {
        prop_assert_eq!(available_zoom_factors(&topology), available_zoom_factors(&topology));
    }

    /// INVARIANT: Arbitrary candidate lists collapse to a valid set
    #[test]
    fn from_factors_has_valid_shape(candidates in prop::collection::vec(-1.0f64..40.0, 0..40)) {
        let set = ZoomFactorSet::from_factors(candidates, STOP_TOLERANCE);
        assert_set_shape(&set)?;
    }

    /// INVARIANT: logical -> physical -> logical is the identity for lens-derived stops,
    /// except for the ultra-wide reading at exactly physical 1.0
    #[test]
    fn conversion_round_trips(topology in fused_topology()) {
        let reference = topology.reference_factor().unwrap();
        for stop in topology.physical_stops() {
            let logical = stop / reference;
            let physical = physical_from_logical(logical, &topology);
            if topology.has_ultra_wide() && (physical - 1.0).abs() <= 1e-9 {
                continue;
            }
            let back = logical_from_physical(physical, &topology, None);
            prop_assert!(
                (back - logical).abs() <= 1e-9 * logical.max(1.0),
                "{} -> {} -> {}",
                logical,
                physical,
                back
            );
        }
    }

    /// INVARIANT: Single lenses convert as the identity
    #[test]
    fn single_lens_conversion_is_identity(topology in single_topology(), value in 0.1f64..50.0) {
        prop_assert_eq!(physical_from_logical(value, &topology), value);
        prop_assert_eq!(logical_from_physical(value, &topology, None), value);
    }

    /// INVARIANT: Logical 1.0 always maps to the primary wide lens' physical stop
    #[test]
    fn one_x_is_primary_wide(topology in fused_topology()) {
        let index = topology.primary_wide_index().unwrap();
        let expected = topology.physical_stops()[index];
        prop_assert_eq!(physical_from_logical(1.0, &topology), expected);
    }
}
