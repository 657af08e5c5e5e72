//! Information cache behavior, observed through the simulated driver's
//! native-call counter.

use crate::tests::{env, sim_registry};
use crate::{
    Buffer, ContextInfo, Error, ImageInfo, MemFlags, MemInfo, Platform, PlatformInfo, Wrapper,
};

#[test]
fn repeated_query_hits_native_api_once() {
    let (reg, driver) = sim_registry();
    let platform = Platform::first(&reg).unwrap();

    let before = driver.info_call_count();
    let first = platform.name().unwrap();
    assert_eq!(driver.info_call_count(), before + 1);
    let second = platform.name().unwrap();
    assert_eq!(driver.info_call_count(), before + 1);
    assert_eq!(first, second);
}

#[test]
fn cache_is_per_object_and_per_key() {
    let (reg, driver) = sim_registry();
    let platform = Platform::first(&reg).unwrap();

    platform.name().unwrap();
    let before = driver.info_call_count();
    platform.vendor().unwrap();
    assert_eq!(driver.info_call_count(), before + 1);
    platform.vendor().unwrap();
    assert_eq!(driver.info_call_count(), before + 1);
}

#[test]
fn mutable_attributes_bypass_the_cache() {
    let (reg, driver) = sim_registry();
    let e = env(&reg);

    e.context.reference_count().unwrap();
    let before = driver.info_call_count();
    e.context.reference_count().unwrap();
    assert_eq!(driver.info_call_count(), before + 1);
}

#[test]
fn shared_object_shares_its_cache() {
    let (reg, driver) = sim_registry();
    let e = env(&reg);

    let via_queue = e.queue.context().unwrap();
    via_queue.info_scalar::<u32, _>(ContextInfo::NumDevices).unwrap();
    let before = driver.info_call_count();
    e.context.info_scalar::<u32, _>(ContextInfo::NumDevices).unwrap();
    assert_eq!(driver.info_call_count(), before);
}

#[test]
fn inapplicable_query_is_rejected_without_a_native_call() {
    let (reg, driver) = sim_registry();
    let e = env(&reg);
    let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 4).unwrap();

    let before = driver.info_call_count();
    let err = buf.info_raw(ImageInfo::Width).unwrap_err();
    assert!(err.is_args());
    assert_eq!(driver.info_call_count(), before);
}

#[test]
fn absent_attribute_reports_unavailable() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let buf = Buffer::<u32>::new(&e.context, MemFlags::READ_WRITE, 4).unwrap();

    match buf.info_raw(MemInfo::HostPtr) {
        Err(Error::InfoUnavailable(_)) => {}
        other => panic!("expected InfoUnavailable, got {:?}", other),
    }
}

#[test]
fn info_size_reports_raw_byte_length() {
    let (reg, _driver) = sim_registry();
    let platform = Platform::first(&reg).unwrap();

    // NUL-terminated native string.
    let size = platform.info_size(PlatformInfo::Name).unwrap();
    assert_eq!(size, platform.name().unwrap().len() + 1);
}
