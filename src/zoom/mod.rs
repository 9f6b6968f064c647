//! Logical zoom model.
//!
//! A *logical* zoom factor is what the user sees (0.5x, 1x, 2x, ...), where 1.0
//! is always the primary wide lens. A *physical* factor is what the device
//! driver expects. On fused multi-lens devices the two differ by the
//! device's reference factor, the physical zoom at which the primary wide
//! lens takes over.
//!
//! - [`LensTopology`] is an immutable snapshot of the zoom-relevant parts of a device.
//! - [`prober`] turns a topology into a [`ZoomFactorSet`].
//! - [`converter`] maps single factors between the two spaces.

pub mod converter;
pub mod prober;

use crate::assert_invariant;
use crate::platform::CaptureDevice;
use crate::types::LensKind;
use serde::{Deserialize, Serialize};

pub use converter::{logical_from_physical, physical_from_logical, scale_to_logical};
pub use prober::{available_zoom_factors, ZoomProber};

/// User-facing stops offered whenever the hardware can reach them.
pub const CANONICAL_STOPS: [f64; 5] = [0.5, 1.0, 2.0, 3.0, 5.0];

/// Two logical factors closer than this are the same stop.
pub const STOP_TOLERANCE: f64 = 0.1;

const EPSILON: f64 = 1e-9;

/// Tunables for zoom factor computation and conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomPolicy {
    pub canonical_stops: Vec<f64>,
    pub tolerance: f64,
    /// Trust a device-reported active lens over the ultra-wide-at-1.0 heuristic.
    pub prefer_active_lens_signal: bool,
}

impl Default for ZoomPolicy {
    fn default() -> Self {
        Self {
            canonical_stops: CANONICAL_STOPS.to_vec(),
            tolerance: STOP_TOLERANCE,
            prefer_active_lens_signal: true,
        }
    }
}

/// Sorted, tolerance-deduplicated logical zoom factors. Always contains 1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ZoomFactorSet(Vec<f64>);

impl Default for ZoomFactorSet {
    fn default() -> Self {
        Self(vec![1.0])
    }
}

impl ZoomFactorSet {
    /// Builds a set from arbitrary candidates using the default canonical stops.
    pub fn from_factors<I>(factors: I, tolerance: f64) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        Self::from_factors_with(factors, tolerance, &CANONICAL_STOPS)
    }

    /// Builds a set from arbitrary candidates.
    ///
    /// Non-finite and non-positive values are dropped and 1.0 is always added.
    /// When two candidates fall within `tolerance`, 1.0 wins over a canonical
    /// stop, which wins over anything else; ties keep the smaller value.
    pub fn from_factors_with<I>(factors: I, tolerance: f64, canonical: &[f64]) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let priority = |value: f64| -> u8 {
            if (value - 1.0).abs() <= EPSILON {
                2
            } else if canonical.iter().any(|c| (c - value).abs() <= EPSILON) {
                1
            } else {
                0
            }
        };

        let mut candidates: Vec<f64> = factors
            .into_iter()
            .filter(|v| v.is_finite() && *v > 0.0)
            .chain(std::iter::once(1.0))
            .collect();
        candidates.sort_by(f64::total_cmp);

        let mut kept: Vec<f64> = Vec::with_capacity(candidates.len());
        for value in candidates {
            match kept.last_mut() {
                Some(last) if value - *last <= tolerance + EPSILON => {
                    if priority(value) > priority(*last) {
                        *last = value;
                    }
                }
                _ => kept.push(value),
            }
        }

        assert_invariant!(
            !kept.is_empty(),
            "Zoom factor set is never empty",
            "zoom::ZoomFactorSet"
        );
        assert_invariant!(
            kept.windows(2).all(|pair| pair[0] < pair[1]),
            "Zoom factor set is sorted ascending",
            "zoom::ZoomFactorSet"
        );
        assert_invariant!(
            kept.iter().any(|v| (v - 1.0).abs() <= EPSILON),
            "Zoom factor set contains 1.0",
            "zoom::ZoomFactorSet"
        );

        Self(kept)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_approx(&self, value: f64, tolerance: f64) -> bool {
        self.0.iter().any(|v| (v - value).abs() <= tolerance + EPSILON)
    }

    pub fn min(&self) -> f64 {
        self.0.first().copied().unwrap_or(1.0)
    }

    pub fn max(&self) -> f64 {
        self.0.last().copied().unwrap_or(1.0)
    }

    /// An ultra-wide stop (0.5x) is on offer.
    pub fn supports_ultra_wide(&self) -> bool {
        self.contains_approx(0.5, STOP_TOLERANCE)
    }

    /// A telephoto stop (3x or beyond) is on offer.
    pub fn supports_telephoto(&self) -> bool {
        self.0.iter().any(|v| *v >= 3.0 - EPSILON)
    }
}

impl<'a> IntoIterator for &'a ZoomFactorSet {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Zoom-relevant snapshot of a capture device.
#[derive(Debug, Clone, PartialEq)]
pub struct LensTopology {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Ascending physical thresholds; empty for a single lens.
    pub switch_over: Vec<f64>,
    /// Constituent lens kinds, widest first; empty for a single lens.
    pub constituents: Vec<LensKind>,
}

impl LensTopology {
    pub fn single(min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            min_zoom,
            max_zoom,
            switch_over: Vec::new(),
            constituents: Vec::new(),
        }
    }

    pub fn fused(
        switch_over: &[f64],
        constituents: &[LensKind],
        min_zoom: f64,
        max_zoom: f64,
    ) -> Self {
        Self {
            min_zoom,
            max_zoom,
            switch_over: switch_over.to_vec(),
            constituents: constituents.to_vec(),
        }
    }

    /// Reads the topology of a live device through its virtual-zoom capability.
    pub fn of(device: &dyn CaptureDevice) -> Self {
        let min_zoom = device.min_available_zoom_factor();
        let max_zoom = device.max_available_zoom_factor();
        match device.as_virtual() {
            Some(virtual_zoom) => Self {
                min_zoom,
                max_zoom,
                switch_over: virtual_zoom.switch_over_zoom_factors(),
                constituents: virtual_zoom
                    .constituent_devices()
                    .into_iter()
                    .map(|lens| lens.kind)
                    .collect(),
            },
            None => Self::single(min_zoom, max_zoom),
        }
    }

    pub fn is_fused(&self) -> bool {
        !self.switch_over.is_empty()
    }

    pub fn has_ultra_wide(&self) -> bool {
        self.constituents.contains(&LensKind::UltraWide)
    }

    /// Physical zoom at which each constituent takes over: `[1.0] + switch_over`.
    pub fn physical_stops(&self) -> Vec<f64> {
        std::iter::once(1.0)
            .chain(self.switch_over.iter().copied())
            .collect()
    }

    pub fn primary_wide_index(&self) -> Option<usize> {
        self.constituents
            .iter()
            .position(|kind| *kind == LensKind::Wide)
    }

    /// Physical zoom of the primary wide lens, i.e. the physical value of logical 1.0.
    ///
    /// `None` for single lenses and whenever the value would be unusable as a divisor.
    pub fn reference_factor(&self) -> Option<f64> {
        if !self.is_fused() {
            return None;
        }
        let index = self.primary_wide_index()?;
        self.physical_stops()
            .get(index)
            .copied()
            .filter(|factor| factor.is_finite() && *factor > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_factors_always_has_one() {
        let set = ZoomFactorSet::from_factors(Vec::new(), STOP_TOLERANCE);
        assert_eq!(set.as_slice(), &[1.0]);

        let set = ZoomFactorSet::from_factors(vec![3.0, 2.0], STOP_TOLERANCE);
        assert_eq!(set.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_factors_prefers_canonical_within_tolerance() {
        let set = ZoomFactorSet::from_factors(vec![0.95, 2.04, 1.98, 0.5], STOP_TOLERANCE);
        assert_eq!(set.as_slice(), &[0.5, 1.0, 1.98]);

        let set = ZoomFactorSet::from_factors(vec![1.96, 2.0], STOP_TOLERANCE);
        assert_eq!(set.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn test_from_factors_drops_garbage() {
        let set = ZoomFactorSet::from_factors(
            vec![f64::NAN, f64::INFINITY, -2.0, 0.0, 4.0],
            STOP_TOLERANCE,
        );
        assert_eq!(set.as_slice(), &[1.0, 4.0]);
    }

    #[test]
    fn test_capabilities() {
        let set = ZoomFactorSet::from_factors(vec![0.5, 3.0], STOP_TOLERANCE);
        assert!(set.supports_ultra_wide());
        assert!(set.supports_telephoto());
        assert_eq!(set.min(), 0.5);
        assert_eq!(set.max(), 3.0);

        let set = ZoomFactorSet::from_factors(vec![2.0], STOP_TOLERANCE);
        assert!(!set.supports_ultra_wide());
        assert!(!set.supports_telephoto());
    }

    #[test]
    fn test_reference_factor() {
        let triple = LensTopology::fused(
            &[2.0, 6.0],
            &[LensKind::UltraWide, LensKind::Wide, LensKind::Telephoto],
            0.5,
            15.0,
        );
        assert_eq!(triple.physical_stops(), vec![1.0, 2.0, 6.0]);
        assert_eq!(triple.primary_wide_index(), Some(1));
        assert_eq!(triple.reference_factor(), Some(2.0));

        let dual = LensTopology::fused(&[2.0], &[LensKind::Wide, LensKind::Telephoto], 1.0, 10.0);
        assert_eq!(dual.reference_factor(), Some(1.0));

        let no_wide = LensTopology::fused(
            &[2.0],
            &[LensKind::UltraWide, LensKind::Telephoto],
            1.0,
            10.0,
        );
        assert_eq!(no_wide.reference_factor(), None);

        assert_eq!(LensTopology::single(1.0, 5.0).reference_factor(), None);
    }

    #[test]
    fn test_reference_factor_out_of_bounds_index() {
        // More constituents than physical stops.
        let topology = LensTopology::fused(
            &[2.0],
            &[LensKind::UltraWide, LensKind::Telephoto, LensKind::Wide],
            1.0,
            10.0,
        );
        assert_eq!(topology.reference_factor(), None);
    }
}
