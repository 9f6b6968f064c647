//! Zoom stop computation against known handset topologies.

#[cfg(test)]
mod zoom_factors_tests {
    use lenscam::invariant_ppt::{clear_invariant_log, contract_test};
    use lenscam::platform::{DeviceSpec, SharedDevice};
    use lenscam::types::{CameraPosition, LensKind};
    use lenscam::zoom::{available_zoom_factors, LensTopology};

    #[test]
    fn test_triple_camera_14_pro_max() {
        let topology = LensTopology::fused(
            &[2.0, 6.0],
            &[LensKind::UltraWide, LensKind::Wide, LensKind::Telephoto],
            0.5,
            15.0,
        );
        assert_eq!(available_zoom_factors(&topology).as_slice(), &[0.5, 1.0, 3.0]);
    }

    #[test]
    fn test_dual_wide_camera() {
        let topology =
            LensTopology::fused(&[2.0], &[LensKind::UltraWide, LensKind::Wide], 0.5, 10.0);
        assert_eq!(available_zoom_factors(&topology).as_slice(), &[0.5, 1.0]);
    }

    #[test]
    fn test_dual_camera_without_ultra_wide() {
        let topology =
            LensTopology::fused(&[2.0], &[LensKind::Wide, LensKind::Telephoto], 1.0, 10.0);
        let factors = available_zoom_factors(&topology);
        assert_eq!(factors.as_slice(), &[1.0, 2.0]);
        assert!(!factors.supports_ultra_wide());
    }

    #[test]
    fn test_single_lens_limited_range() {
        let topology = LensTopology::single(1.0, 1.5);
        assert_eq!(available_zoom_factors(&topology).as_slice(), &[1.0]);
    }

    #[test]
    fn test_single_lens_standard_range() {
        let topology = LensTopology::single(1.0, 5.0);
        assert_eq!(available_zoom_factors(&topology).as_slice(), &[1.0, 2.0, 3.0, 5.0]);
    }

    #[test]
    fn test_single_lens_long_range_offers_max() {
        let topology = LensTopology::single(1.0, 25.0);
        assert_eq!(
            available_zoom_factors(&topology).as_slice(),
            &[1.0, 2.0, 3.0, 5.0, 25.0]
        );
    }

    #[test]
    fn test_single_ultra_wide_capable_lens() {
        let topology = LensTopology::single(0.5, 3.0);
        assert_eq!(available_zoom_factors(&topology).as_slice(), &[0.5, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_topology_read_from_device() {
        let device: SharedDevice = DeviceSpec::fused(
            "triple",
            CameraPosition::Back,
            LensKind::Triple,
            &[2.0, 6.0],
            &[LensKind::UltraWide, LensKind::Wide, LensKind::Telephoto],
            1.0,
            15.0,
        )
        .build()
        .unwrap();

        let topology = LensTopology::of(device.as_ref());
        assert!(topology.is_fused());
        assert_eq!(topology.reference_factor(), Some(2.0));
        assert_eq!(available_zoom_factors(&topology).as_slice(), &[0.5, 1.0, 3.0]);

        let single: SharedDevice =
            DeviceSpec::single("front", CameraPosition::Front, LensKind::Wide, 1.0, 3.0)
                .build()
                .unwrap();
        let topology = LensTopology::of(single.as_ref());
        assert!(!topology.is_fused());
        assert_eq!(topology.reference_factor(), None);
    }

    #[test]
    fn contract_zoom_factor_set_shape() {
        clear_invariant_log();
        let _ = available_zoom_factors(&LensTopology::single(1.0, 5.0));
        contract_test(
            "zoom factor set shape",
            &[
                "Zoom factor set is never empty",
                "Zoom factor set is sorted ascending",
                "Zoom factor set contains 1.0",
            ],
        );
    }
}
