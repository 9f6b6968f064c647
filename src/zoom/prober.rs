//! Capability prober: which logical zoom levels a device can actually reach.

use super::{LensTopology, ZoomFactorSet, ZoomPolicy, EPSILON};

fn within(value: f64, min: f64, max: f64) -> bool {
    value >= min - EPSILON && value <= max + EPSILON
}

/// Computes [`ZoomFactorSet`]s for device topologies under a [`ZoomPolicy`].
///
/// Probing is pure: it only looks at the topology snapshot and never touches hardware.
#[derive(Debug, Clone, Default)]
pub struct ZoomProber {
    policy: ZoomPolicy,
}

impl ZoomProber {
    pub fn new(policy: ZoomPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ZoomPolicy {
        &self.policy
    }

    pub fn probe(&self, topology: &LensTopology) -> ZoomFactorSet {
        if topology.is_fused() {
            if let Some(reference) = topology.reference_factor() {
                return self.probe_fused(topology, reference);
            }
            log::debug!(
                "Fused device without a primary wide lens, using single-lens stops: {:?}",
                topology.constituents
            );
        }
        self.probe_single(topology)
    }

    fn probe_fused(&self, topology: &LensTopology, reference: f64) -> ZoomFactorSet {
        let tolerance = self.policy.tolerance;
        let logical: Vec<f64> = topology
            .physical_stops()
            .into_iter()
            .map(|stop| stop / reference)
            .collect();

        let mut candidates: Vec<f64> = logical
            .iter()
            .copied()
            .filter(|value| within(*value, topology.min_zoom, topology.max_zoom))
            .collect();

        let has_ultra_wide = topology.has_ultra_wide();
        for &stop in &self.policy.canonical_stops {
            let near_lens = logical
                .iter()
                .any(|value| (value - stop).abs() <= tolerance + EPSILON);
            let ultra_wide_stop = stop < 1.0 && has_ultra_wide;
            let reachable = within(stop * reference, topology.min_zoom, topology.max_zoom);
            if (near_lens || ultra_wide_stop) && reachable {
                candidates.push(stop);
            }
        }

        log::trace!(
            "Fused probe: reference={} lens stops={:?} candidates={:?}",
            reference,
            logical,
            candidates
        );
        ZoomFactorSet::from_factors_with(candidates, tolerance, &self.policy.canonical_stops)
    }

    fn probe_single(&self, topology: &LensTopology) -> ZoomFactorSet {
        let tolerance = self.policy.tolerance;
        let mut candidates: Vec<f64> = self
            .policy
            .canonical_stops
            .iter()
            .copied()
            .filter(|stop| within(*stop, topology.min_zoom, topology.max_zoom))
            .collect();

        let largest_stop = self
            .policy
            .canonical_stops
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let max = topology.max_zoom;
        let already_offered = candidates
            .iter()
            .any(|stop| (stop - max).abs() <= tolerance + EPSILON);
        if max.is_finite() && max > largest_stop && !already_offered {
            candidates.push(max);
        }

        ZoomFactorSet::from_factors_with(candidates, tolerance, &self.policy.canonical_stops)
    }
}

/// Zoom factors for `topology` under the default policy.
pub fn available_zoom_factors(topology: &LensTopology) -> ZoomFactorSet {
    ZoomProber::default().probe(topology)
}
