#![allow(dead_code)]

use std::path::Path;

use image::{Rgb, RgbImage};
use yingxi::input::SourceImage;

pub const GREY: Rgb<u8> = Rgb([128, 128, 128]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);

pub fn grey_image(width: u32, height: u32) -> RgbImage {
  RgbImage::from_pixel(width, height, GREY)
}

pub fn write_png(path: &Path, width: u32, height: u32) {
  grey_image(width, height).save(path).expect("write png fixture");
}

pub fn png_source(name: &str, width: u32, height: u32) -> SourceImage {
  let mut bytes = Vec::new();
  grey_image(width, height)
    .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
    .expect("encode png fixture");
  SourceImage::from_bytes(name, bytes).expect("decode png fixture")
}
