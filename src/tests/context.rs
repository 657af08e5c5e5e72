//! Context creation, device selection and partial-failure teardown.

use crate::tests::sim_registry;
use crate::{
    Context, DeviceSpecifier, DeviceType, Error, Handle, Platform, Wrapper,
};

#[test]
fn builder_selects_first_device() {
    let (reg, _driver) = sim_registry();
    let context = Context::builder(&reg).devices(DeviceSpecifier::First).build().unwrap();
    assert_eq!(context.num_devices().unwrap(), 1);
    assert_eq!(context.devices().unwrap().len(), 1);
}

#[test]
fn builder_with_type_flags() {
    let (reg, _driver) = sim_registry();
    let context = Context::builder(&reg).devices(DeviceType::GPU).build().unwrap();
    let devices = context.devices().unwrap();
    assert_eq!(devices.len(), 1);
    assert!(devices[0].device_type().unwrap().contains(DeviceType::GPU));
}

#[test]
fn empty_device_list_is_an_argument_error() {
    let (reg, _driver) = sim_registry();
    let err = Context::from_devices(&reg, &[]).unwrap_err();
    assert!(err.is_args());
}

#[test]
fn specifier_single_out_of_range() {
    let (reg, _driver) = sim_registry();
    let platform = Platform::first(&reg).unwrap();
    match DeviceSpecifier::Single(99).to_device_list(&platform) {
        Err(Error::DeviceNotFound) => {}
        other => panic!("expected DeviceNotFound, got {:?}", other.map(|v| v.len())),
    }
}

#[test]
fn specifier_wrapping_indices() {
    let (reg, _driver) = sim_registry();
    let platform = Platform::first(&reg).unwrap();
    let devices = DeviceSpecifier::WrappingIndices(vec![0, 1, 2, 3])
        .to_device_list(&platform)
        .unwrap();
    assert_eq!(devices.len(), 4);
    assert_eq!(devices[0].handle(), devices[2].handle());
    assert_eq!(devices[1].handle(), devices[3].handle());
}

#[test]
fn specifier_name_filter() {
    let (reg, _driver) = sim_registry();
    let platform = Platform::first(&reg).unwrap();
    let gpus = DeviceSpecifier::NameContains("GPU".to_string())
        .to_device_list(&platform)
        .unwrap();
    assert_eq!(gpus.len(), 1);
    assert!(gpus[0].name().unwrap().contains("gpu"));

    let none = DeviceSpecifier::NameContains("fpga".to_string())
        .to_device_list(&platform)
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn unmatched_type_filter_yields_empty_not_error() {
    let (reg, _driver) = sim_registry();
    let platform = Platform::first(&reg).unwrap();
    let accels = platform.devices(DeviceType::ACCELERATOR).unwrap();
    assert!(accels.is_empty());
}

#[test]
fn partial_failure_tears_down_cleanly() {
    let (reg, _driver) = sim_registry();
    {
        let platform = Platform::first(&reg).unwrap();
        let good = platform.devices(DeviceType::ALL).unwrap()[0].handle();
        let err = Context::from_device_handles(&reg, &[good, Handle::null()]).unwrap_err();
        assert!(err.is_args());
    }
    // Everything wrapped before the failure has been dropped again.
    assert!(reg.memcheck());
}

#[test]
fn context_keeps_its_platform_wrapper_alive() {
    let (reg, _driver) = sim_registry();
    let context = Context::builder(&reg).build().unwrap();

    let platform = context.platform().unwrap();
    let platform_handle = platform.handle();
    drop(platform);

    // The context owns the platform wrapper through its dependency edge,
    // so it survives the last external reference with its cache intact.
    assert!(reg.get(platform_handle).is_some());
    let again = context.platform().unwrap();
    assert!(std::sync::Arc::ptr_eq(again.obj(), reg.get(platform_handle).as_ref().unwrap()));
}

#[test]
fn context_platform_matches_device_platform() {
    let (reg, _driver) = sim_registry();
    let platform = Platform::first(&reg).unwrap();
    let context = Context::builder(&reg).platform(platform.clone()).build().unwrap();
    assert_eq!(context.platform().unwrap().handle(), platform.handle());
}
