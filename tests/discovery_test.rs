//! Camera listing and selection over a full handset rig.

mod discovery_tests {
    use lenscam::platform::{DeviceSpec, Journal, RigDescription, SimulatedCatalog};
    use lenscam::types::{CameraPosition, LensKind, MediaType};
    use lenscam::{DeviceDiscovery, ZoomPolicy};
    use std::io::Write;
    use std::sync::Arc;

    fn phone() -> DeviceDiscovery {
        let catalog =
            SimulatedCatalog::from_rig(&RigDescription::triple_camera_phone(), &Journal::new())
                .unwrap();
        DeviceDiscovery::new(Arc::new(catalog))
    }

    #[test]
    fn test_list_all_cameras() {
        let cameras = phone().list_cameras(None, &ZoomPolicy::default());
        let names: Vec<&str> = cameras.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Back Wide", "Back Ultra Wide", "Back Triple", "Front Wide"]
        );

        let triple = cameras.iter().find(|c| c.kind == LensKind::Triple).unwrap();
        assert_eq!(triple.zoom_factors.as_slice(), &[0.5, 1.0, 3.0]);
        assert_eq!((triple.min_zoom, triple.max_zoom), (1.0, 15.0));

        let ultra_wide = cameras.iter().find(|c| c.id == "back-ultra-wide").unwrap();
        assert_eq!(ultra_wide.zoom_factors.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_list_front_cameras_only() {
        let cameras = phone().list_cameras(Some(CameraPosition::Front), &ZoomPolicy::default());
        assert_eq!(cameras.len(), 1);
        assert_eq!(cameras[0].id, "front-wide");
        assert_eq!(cameras[0].zoom_factors.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_fused_device_preferred_per_position() {
        let discovery = phone();
        let back = discovery.discover(CameraPosition::Back).unwrap();
        assert_eq!(back.unique_id(), "back-triple");
        let front = discovery.discover(CameraPosition::Front).unwrap();
        assert_eq!(front.unique_id(), "front-wide");
    }

    #[test]
    fn test_ultra_wide_alone_is_never_selected() {
        let catalog = SimulatedCatalog::new();
        catalog.push(
            DeviceSpec::single("uw", CameraPosition::Back, LensKind::UltraWide, 1.0, 4.0)
                .build()
                .unwrap(),
        );
        let discovery = DeviceDiscovery::new(Arc::new(catalog));
        assert!(discovery.discover(CameraPosition::Back).is_none());
        assert!(discovery.find("uw").is_some());
        assert!(discovery.input(MediaType::Video, CameraPosition::Back).is_none());
    }

    #[test]
    fn test_rig_loaded_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
microphone = false

[[device]]
id = "tablet-dual"
position = "back"
kind = "dual"
switch_over = [2.0]
constituents = ["wide", "telephoto"]
min_zoom = 1.0
max_zoom = 10.0
"#
        )
        .unwrap();

        let rig = RigDescription::load(file.path()).unwrap();
        let catalog = SimulatedCatalog::from_rig(&rig, &Journal::new()).unwrap();
        let discovery = DeviceDiscovery::new(Arc::new(catalog));

        let device = discovery.discover(CameraPosition::Back).unwrap();
        assert_eq!(device.unique_id(), "tablet-dual");
        assert!(discovery.input(MediaType::Audio, CameraPosition::Back).is_none());
        let cameras = discovery.list_cameras(None, &ZoomPolicy::default());
        assert_eq!(cameras[0].display_name, "Back Dual");
        assert_eq!(cameras[0].zoom_factors.as_slice(), &[1.0, 2.0]);
    }
}
