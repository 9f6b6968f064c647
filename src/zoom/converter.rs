//! Logical/physical zoom conversion.
//!
//! Every function here is total: when a device's reference factor cannot be
//! determined the input is returned unchanged.

use super::{LensTopology, EPSILON};
use crate::types::LensKind;

/// Physical zoom to request from the driver for a logical factor.
pub fn physical_from_logical(logical: f64, topology: &LensTopology) -> f64 {
    match topology.reference_factor() {
        Some(reference) => logical * reference,
        None => logical,
    }
}

/// Logical zoom for a physical reading taken from the device.
///
/// Some fused devices sitting on their ultra-wide lens report a physical zoom
/// of exactly 1.0 regardless of their reference factor; that reading maps to
/// 0.5x. When the driver reports which lens is active (`active_lens`), that
/// report decides instead.
pub fn logical_from_physical(
    physical: f64,
    topology: &LensTopology,
    active_lens: Option<LensKind>,
) -> f64 {
    let Some(reference) = topology.reference_factor() else {
        return physical;
    };

    if topology.has_ultra_wide() && (physical - 1.0).abs() <= EPSILON {
        match active_lens {
            Some(LensKind::UltraWide) | None => return 0.5,
            Some(_) => {}
        }
    }

    physical / reference
}

/// Plain division by the reference factor, for expressing device bounds in logical space.
pub fn scale_to_logical(physical: f64, topology: &LensTopology) -> f64 {
    match topology.reference_factor() {
        Some(reference) => physical / reference,
        None => physical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple() -> LensTopology {
        LensTopology::fused(
            &[2.0, 6.0],
            &[LensKind::UltraWide, LensKind::Wide, LensKind::Telephoto],
            1.0,
            15.0,
        )
    }

    #[test]
    fn test_single_lens_is_identity() {
        let topology = LensTopology::single(1.0, 10.0);
        assert_eq!(physical_from_logical(2.5, &topology), 2.5);
        assert_eq!(logical_from_physical(2.5, &topology, None), 2.5);
        assert_eq!(scale_to_logical(10.0, &topology), 10.0);
    }

    #[test]
    fn test_fused_scales_by_reference() {
        let topology = triple();
        assert_eq!(physical_from_logical(0.5, &topology), 1.0);
        assert_eq!(physical_from_logical(3.0, &topology), 6.0);
        assert_eq!(logical_from_physical(6.0, &topology, None), 3.0);
        assert_eq!(scale_to_logical(15.0, &topology), 7.5);
    }

    #[test]
    fn test_ultra_wide_reading_heuristic() {
        // Reference 3.0 would otherwise give 1/3.
        let topology =
            LensTopology::fused(&[3.0], &[LensKind::UltraWide, LensKind::Wide], 1.0, 10.0);
        assert_eq!(logical_from_physical(1.0, &topology, None), 0.5);
        assert_eq!(
            logical_from_physical(1.0, &topology, Some(LensKind::UltraWide)),
            0.5
        );
        let reported = logical_from_physical(1.0, &topology, Some(LensKind::Wide));
        assert!((reported - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_reference_is_identity() {
        let topology = LensTopology::fused(
            &[2.0],
            &[LensKind::UltraWide, LensKind::Telephoto],
            1.0,
            10.0,
        );
        assert_eq!(physical_from_logical(2.0, &topology), 2.0);
        assert_eq!(logical_from_physical(1.0, &topology, None), 1.0);
    }
}
