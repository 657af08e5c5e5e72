//! Image format and shape descriptors.

use crate::error::{Error, Result};

/// cl_mem_object_type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MemObjectType {
    Buffer = 0x10F0,
    Image2d = 0x10F1,
    Image3d = 0x10F2,
    Image2dArray = 0x10F3,
    Image1d = 0x10F4,
    Image1dArray = 0x10F5,
    Image1dBuffer = 0x10F6,
}

/// cl_channel_order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ImageChannelOrder {
    R = 0x10B0,
    A = 0x10B1,
    Rg = 0x10B2,
    Ra = 0x10B3,
    Rgb = 0x10B4,
    Rgba = 0x10B5,
    Bgra = 0x10B6,
    Argb = 0x10B7,
    Intensity = 0x10B8,
    Luminance = 0x10B9,
}

impl ImageChannelOrder {
    pub fn from_raw(raw: u32) -> Option<ImageChannelOrder> {
        use self::ImageChannelOrder::*;
        Some(match raw {
            0x10B0 => R,
            0x10B1 => A,
            0x10B2 => Rg,
            0x10B3 => Ra,
            0x10B4 => Rgb,
            0x10B5 => Rgba,
            0x10B6 => Bgra,
            0x10B7 => Argb,
            0x10B8 => Intensity,
            0x10B9 => Luminance,
            _ => return None,
        })
    }

    pub fn channel_count(self) -> usize {
        match self {
            ImageChannelOrder::R
            | ImageChannelOrder::A
            | ImageChannelOrder::Intensity
            | ImageChannelOrder::Luminance => 1,
            ImageChannelOrder::Rg | ImageChannelOrder::Ra => 2,
            ImageChannelOrder::Rgb => 3,
            ImageChannelOrder::Rgba | ImageChannelOrder::Bgra | ImageChannelOrder::Argb => 4,
        }
    }
}

/// cl_channel_type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ImageChannelDataType {
    SnormInt8 = 0x10D0,
    SnormInt16 = 0x10D1,
    UnormInt8 = 0x10D2,
    UnormInt16 = 0x10D3,
    SignedInt8 = 0x10D7,
    SignedInt16 = 0x10D8,
    SignedInt32 = 0x10D9,
    UnsignedInt8 = 0x10DA,
    UnsignedInt16 = 0x10DB,
    UnsignedInt32 = 0x10DC,
    HalfFloat = 0x10DD,
    Float = 0x10DE,
}

impl ImageChannelDataType {
    pub fn from_raw(raw: u32) -> Option<ImageChannelDataType> {
        use self::ImageChannelDataType::*;
        Some(match raw {
            0x10D0 => SnormInt8,
            0x10D1 => SnormInt16,
            0x10D2 => UnormInt8,
            0x10D3 => UnormInt16,
            0x10D7 => SignedInt8,
            0x10D8 => SignedInt16,
            0x10D9 => SignedInt32,
            0x10DA => UnsignedInt8,
            0x10DB => UnsignedInt16,
            0x10DC => UnsignedInt32,
            0x10DD => HalfFloat,
            0x10DE => Float,
            _ => return None,
        })
    }

    pub fn byte_size(self) -> usize {
        match self {
            ImageChannelDataType::SnormInt8
            | ImageChannelDataType::UnormInt8
            | ImageChannelDataType::SignedInt8
            | ImageChannelDataType::UnsignedInt8 => 1,
            ImageChannelDataType::SnormInt16
            | ImageChannelDataType::UnormInt16
            | ImageChannelDataType::SignedInt16
            | ImageChannelDataType::UnsignedInt16
            | ImageChannelDataType::HalfFloat => 2,
            ImageChannelDataType::SignedInt32
            | ImageChannelDataType::UnsignedInt32
            | ImageChannelDataType::Float => 4,
        }
    }

    /// Whether the channel is an (unnormalized) integer type; fill colors
    /// are interpreted as integer lanes for these and float lanes otherwise.
    pub fn is_integer(self) -> bool {
        match self {
            ImageChannelDataType::SignedInt8
            | ImageChannelDataType::SignedInt16
            | ImageChannelDataType::SignedInt32
            | ImageChannelDataType::UnsignedInt8
            | ImageChannelDataType::UnsignedInt16
            | ImageChannelDataType::UnsignedInt32 => true,
            _ => false,
        }
    }
}

/// cl_image_format: channel order plus channel data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageFormat {
    pub channel_order: ImageChannelOrder,
    pub channel_data_type: ImageChannelDataType,
}

impl ImageFormat {
    pub fn new(channel_order: ImageChannelOrder, channel_data_type: ImageChannelDataType) -> ImageFormat {
        ImageFormat { channel_order, channel_data_type }
    }

    /// Decodes the native `(cl_channel_order, cl_channel_type)` pair.
    pub fn from_raw(order: u32, data_type: u32) -> Result<ImageFormat> {
        let channel_order = ImageChannelOrder::from_raw(order)
            .ok_or_else(|| Error::InvalidData(format!("unknown channel order {:#x}", order)))?;
        let channel_data_type = ImageChannelDataType::from_raw(data_type).ok_or_else(|| {
            Error::InvalidData(format!("unknown channel data type {:#x}", data_type))
        })?;
        Ok(ImageFormat { channel_order, channel_data_type })
    }

    /// Bytes per image element (pixel).
    pub fn pixel_bytes(&self) -> usize {
        self.channel_order.channel_count() * self.channel_data_type.byte_size()
    }
}

/// cl_image_desc: image type and shape.
///
/// Pitches of zero mean tightly packed, as in the native API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDescriptor {
    pub image_type: MemObjectType,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub row_pitch: usize,
    pub slice_pitch: usize,
}

impl ImageDescriptor {
    pub fn new(image_type: MemObjectType, width: usize, height: usize, depth: usize) -> ImageDescriptor {
        ImageDescriptor {
            image_type,
            width,
            height,
            depth,
            row_pitch: 0,
            slice_pitch: 0,
        }
    }

    /// Shape as a `[width, height, depth]` region covering the whole image.
    pub fn dims(&self) -> [usize; 3] {
        [self.width, self.height.max(1), self.depth.max(1)]
    }

    /// Total byte size of a tightly packed image with `format`.
    pub fn required_bytes(&self, format: &ImageFormat) -> usize {
        let [w, h, d] = self.dims();
        w * h * d * format.pixel_bytes()
    }

    /// Rejects zero-sized shapes before they reach the native layer.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(Error::Args("image width must be non-zero"));
        }
        match self.image_type {
            MemObjectType::Image2d | MemObjectType::Image2dArray if self.height == 0 => {
                Err(Error::Args("2d image height must be non-zero"))
            }
            MemObjectType::Image3d if self.height == 0 || self.depth == 0 => {
                Err(Error::Args("3d image height and depth must be non-zero"))
            }
            _ => Ok(()),
        }
    }
}
