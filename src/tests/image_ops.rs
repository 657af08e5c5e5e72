//! Image creation, region transfers, fills and mapping.

use rand::distributions::Standard;
use rand::{self, Rng};

use crate::tests::{env, sim_registry, Env};
use crate::{
    Buffer, EventList, Image, ImageChannelDataType, ImageChannelOrder, ImageDescriptor,
    ImageFormat, MapFlags, MemFlags, MemObjectType, Wrapper,
};

const W: usize = 16;
const H: usize = 16;

fn rgba_format() -> ImageFormat {
    ImageFormat::new(ImageChannelOrder::Rgba, ImageChannelDataType::UnormInt8)
}

fn desc_2d() -> ImageDescriptor {
    ImageDescriptor::new(MemObjectType::Image2d, W, H, 1)
}

fn random_pixels(len: usize) -> Vec<u8> {
    rand::thread_rng().sample_iter(Standard).take(len).collect()
}

fn test_image(e: &Env, host: Option<&[u8]>) -> Image {
    Image::new(&e.context, MemFlags::READ_WRITE, rgba_format(), desc_2d(), host).unwrap()
}

#[test]
fn create_info_destroy() {
    let (reg, _driver) = sim_registry();
    {
        let e = env(&reg);
        let img = test_image(&e, None);

        assert_eq!(img.element_size(), 4);
        assert_eq!(img.width().unwrap(), W);
        assert_eq!(img.height().unwrap(), H);
        assert_eq!(img.native_element_size().unwrap(), 4);
        assert_eq!(img.row_pitch().unwrap(), W * 4);
        assert_eq!(img.native_format().unwrap(), rgba_format());
    }
    assert!(reg.memcheck());
}

#[test]
fn image_ref_counting() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let img = test_image(&e, None);

    assert_eq!(img.ref_count(), 1);
    let img2 = img.clone();
    assert_eq!(img.ref_count(), 2);
    let img3 = img2.clone();
    assert_eq!(img.ref_count(), 3);
    drop(img3);
    drop(img2);
    assert_eq!(img.ref_count(), 1);
    assert_eq!(img.reference_count().unwrap(), 1);
}

#[test]
fn write_then_read_region() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();
    let img = test_image(&e, None);

    let region = [4, 4, 1];
    let pixels = random_pixels(4 * 4 * 4);
    img.write(&e.queue, [2, 3, 0], region, &pixels, &wait).unwrap();

    let mut host = vec![0u8; pixels.len()];
    img.read(&e.queue, [2, 3, 0], region, &mut host, &wait).unwrap();
    assert_eq!(host, pixels);
}

#[test]
fn copy_to_an_offset_origin() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();

    let pixels = random_pixels(W * H * 4);
    let src = test_image(&e, Some(&pixels));
    let dst = test_image(&e, None);

    let region = [8, 8, 1];
    src.copy_to(&e.queue, &dst, [0, 0, 0], [4, 4, 0], region, &wait).unwrap();

    let mut host = vec![0u8; 8 * 8 * 4];
    dst.read(&e.queue, [4, 4, 0], region, &mut host, &wait).unwrap();
    for row in 0..8 {
        let copied = &host[row * 8 * 4..(row + 1) * 8 * 4];
        let original = &pixels[row * W * 4..row * W * 4 + 8 * 4];
        assert_eq!(copied, original);
    }
}

#[test]
fn fill_a_region() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();
    let img = test_image(&e, None);

    let pixel = [0x11, 0x22, 0x33, 0x44];
    img.fill(&e.queue, &pixel, [1, 1, 0], [2, 2, 1], &wait).unwrap();

    let mut host = vec![0u8; 4 * 4 * 4];
    img.read(&e.queue, [0, 0, 0], [4, 4, 1], &mut host, &wait).unwrap();
    for y in 0..4 {
        for x in 0..4 {
            let px = &host[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
            if (1..3).contains(&x) && (1..3).contains(&y) {
                assert_eq!(px, &pixel);
            } else {
                assert_eq!(px, &[0u8; 4]);
            }
        }
    }
}

#[test]
fn image_buffer_round_trip() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();

    let pixels = random_pixels(W * H * 4);
    let src = test_image(&e, Some(&pixels));
    let staging = Buffer::<u8>::new(&e.context, MemFlags::READ_WRITE, W * H * 4).unwrap();
    let dst = test_image(&e, None);

    src.copy_to_buffer(&e.queue, &staging, [0, 0, 0], [W, H, 1], 0, &wait).unwrap();
    dst.copy_from_buffer(&e.queue, &staging, 0, [0, 0, 0], [W, H, 1], &wait).unwrap();

    let mut host = vec![0u8; pixels.len()];
    dst.read(&e.queue, [0, 0, 0], [W, H, 1], &mut host, &wait).unwrap();
    assert_eq!(host, pixels);
}

#[test]
fn map_write_back() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();
    let img = test_image(&e, None);

    {
        let mut map = img.map(&e.queue, MapFlags::WRITE, [0, 0, 0], [2, 2, 1]).unwrap();
        assert_eq!(map.row_pitch(), 2 * 4);
        assert_eq!(img.map_count().unwrap(), 1);
        for v in map.iter_mut() {
            *v = 0xAB;
        }
        map.unmap().unwrap();
    }
    assert_eq!(img.map_count().unwrap(), 0);

    let mut host = vec![0u8; 2 * 2 * 4];
    img.read(&e.queue, [0, 0, 0], [2, 2, 1], &mut host, &wait).unwrap();
    assert!(host.iter().all(|&v| v == 0xAB));
}

#[test]
fn map_subregion_reads_packed_rows() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let pixels = random_pixels(W * H * 4);
    let img = test_image(&e, Some(&pixels));

    // A narrow region of a wider image maps to tightly packed rows of
    // exactly region-width times element-size bytes, never pitch bytes.
    let map = img.map(&e.queue, MapFlags::READ, [1, 2, 0], [3, 4, 1]).unwrap();
    assert_eq!(map.row_pitch(), 3 * 4);
    assert_eq!(map.len(), 3 * 4 * 4);
    for row in 0..4 {
        let expect = &pixels[((row + 2) * W + 1) * 4..((row + 2) * W + 1) * 4 + 3 * 4];
        assert_eq!(&map[row * 3 * 4..(row + 1) * 3 * 4], expect);
    }
}

#[test]
fn out_of_bounds_region_fails() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();
    let img = test_image(&e, None);

    let mut host = vec![0u8; 8 * 8 * 4];
    let err = img.read(&e.queue, [12, 12, 0], [8, 8, 1], &mut host, &wait).unwrap_err();
    assert!(err.api_status().is_some());
}

#[test]
fn host_data_size_must_match() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let short = vec![0u8; 16];
    let err = Image::new(
        &e.context,
        MemFlags::READ_WRITE,
        rgba_format(),
        desc_2d(),
        Some(&short),
    )
    .unwrap_err();
    assert!(err.is_args());
}

#[test]
fn zero_height_2d_image_is_rejected() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let desc = ImageDescriptor::new(MemObjectType::Image2d, W, 0, 1);
    let err = Image::new(&e.context, MemFlags::READ_WRITE, rgba_format(), desc, None)
        .unwrap_err();
    assert!(err.is_args());
}

#[test]
fn device_reports_image_support() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    assert!(e.device.image_support().unwrap());
}
