use image::{GrayAlphaImage, GrayImage, Luma, LumaA, Rgb, RgbImage, Rgba, RgbaImage};

use super::*;

fn count_filled<P: Pixel<Subpixel = u8>>(image: &ImageBuffer<P, Vec<u8>>) -> usize {
  image
    .pixels()
    .filter(|p| p.channels().iter().any(|&c| c != 0))
    .count()
}

/// One seed texel grows one ring per iteration.
#[test]
fn test_rings_grow_per_iteration() {
  let mut image = RgbImage::new(9, 9);
  image.put_pixel(4, 4, Rgb([200, 100, 50]));

  inpaint(&mut image, 2);

  assert_eq!(count_filled(&image), 25, "5x5 block after two rings");
  for y in 2..=6 {
    for x in 2..=6 {
      assert_eq!(*image.get_pixel(x, y), Rgb([200, 100, 50]), "texel ({x}, {y})");
    }
  }
  assert_eq!(*image.get_pixel(1, 4), Rgb([0, 0, 0]), "third ring untouched");
}

#[test]
fn test_zero_iterations_is_noop() {
  let mut image = RgbImage::new(4, 4);
  image.put_pixel(1, 1, Rgb([9, 9, 9]));
  let before = image.clone();
  inpaint(&mut image, 0);
  assert_eq!(image, before);
}

/// Frontier texels average their filled neighbors.
#[test]
fn test_frontier_averages_neighbors() {
  let mut image = GrayImage::new(3, 1);
  image.put_pixel(0, 0, Luma([100]));
  image.put_pixel(2, 0, Luma([200]));

  inpaint(&mut image, 1);

  assert_eq!(*image.get_pixel(1, 0), Luma([150]));
}

/// Faint neighbors whose rounded average is zero still fill the texel.
#[test]
fn test_faint_average_is_not_blank() {
  let mut image = RgbImage::new(3, 3);
  image.put_pixel(0, 1, Rgb([1, 0, 0]));
  image.put_pixel(1, 0, Rgb([0, 1, 0]));
  image.put_pixel(2, 1, Rgb([0, 0, 1]));

  inpaint(&mut image, 3);

  assert_ne!(*image.get_pixel(1, 1), Rgb([0, 0, 0]));
  assert_eq!(count_filled(&image), 9);
}

/// Filled texels are never modified.
#[test]
fn test_filled_texels_untouched() {
  let mut image = RgbaImage::new(6, 6);
  for x in 0..3 {
    image.put_pixel(x, 2, Rgba([10 + x as u8, 20, 30, 255]));
  }
  let before = image.clone();

  inpaint(&mut image, 3);

  for x in 0..3 {
    assert_eq!(image.get_pixel(x, 2), before.get_pixel(x, 2));
  }
}

#[test]
fn test_enough_iterations_fill_everything() {
  let mut image = RgbImage::new(16, 8);
  image.put_pixel(0, 0, Rgb([1, 2, 3]));
  inpaint(&mut image, 16);
  assert_eq!(count_filled(&image), 16 * 8);
}

#[test]
fn test_blank_image_stays_blank() {
  let mut image = RgbImage::new(5, 5);
  inpaint(&mut image, 4);
  assert_eq!(count_filled(&image), 0);
}

#[test]
fn test_dynamic_dispatch_by_channel_count() {
  let mut gray = GrayImage::new(3, 3);
  gray.put_pixel(1, 1, Luma([7]));
  let mut gray_alpha = GrayAlphaImage::new(3, 3);
  gray_alpha.put_pixel(1, 1, LumaA([7, 9]));
  let mut rgb = RgbImage::new(3, 3);
  rgb.put_pixel(1, 1, Rgb([7, 8, 9]));
  let mut rgba = RgbaImage::new(3, 3);
  rgba.put_pixel(1, 1, Rgba([7, 8, 9, 10]));

  let mut images = [
    DynamicImage::ImageLuma8(gray),
    DynamicImage::ImageLumaA8(gray_alpha),
    DynamicImage::ImageRgb8(rgb),
    DynamicImage::ImageRgba8(rgba),
  ];
  for image in &mut images {
    assert!(inpaint_dynamic(image, 1));
    let raw = image.as_bytes();
    assert!(raw.iter().all(|&b| b != 0), "all texels filled for {:?}", image.color());
  }

  let mut wide = DynamicImage::new_rgb16(2, 2);
  assert!(!inpaint_dynamic(&mut wide, 1), "16-bit images are not inpainted");
}
