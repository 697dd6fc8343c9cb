//! Optional cover preprocessing applied before LSB embedding.

use image::{imageops, DynamicImage, RgbImage};
use std::fmt;
use std::str::FromStr;

#[rustfmt::skip]
const BLUR_KERNEL: [f32; 9] = [
    1.0 / 9.0, 1.0 / 9.0, 1.0 / 9.0,
    1.0 / 9.0, 1.0 / 9.0, 1.0 / 9.0,
    1.0 / 9.0, 1.0 / 9.0, 1.0 / 9.0,
];

#[rustfmt::skip]
const SHARPEN_KERNEL: [f32; 9] = [
    0.0, -1.0, 0.0,
    -1.0, 5.0, -1.0,
    0.0, -1.0, 0.0,
];

/// Filter applied to the cover image before it carries a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoverFilter {
    #[default]
    None,
    Blur,
    Sharpen,
    Grayscale,
}

impl CoverFilter {
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        match self {
            CoverFilter::None => image.clone(),
            CoverFilter::Blur => imageops::filter3x3(image, &BLUR_KERNEL),
            CoverFilter::Sharpen => imageops::filter3x3(image, &SHARPEN_KERNEL),
            CoverFilter::Grayscale => {
                DynamicImage::ImageLuma8(imageops::grayscale(image)).to_rgb8()
            }
        }
    }
}

impl fmt::Display for CoverFilter {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CoverFilter::None => "none",
            CoverFilter::Blur => "blur",
            CoverFilter::Sharpen => "sharpen",
            CoverFilter::Grayscale => "grayscale",
        };
        formatter.write_str(name)
    }
}

impl FromStr for CoverFilter {
    type Err = String;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "none" => Ok(CoverFilter::None),
            "blur" => Ok(CoverFilter::Blur),
            "sharpen" => Ok(CoverFilter::Sharpen),
            "grayscale" | "greyscale" => Ok(CoverFilter::Grayscale),
            other => Err(format!("unknown filter '{}'", other)),
        }
    }
}
