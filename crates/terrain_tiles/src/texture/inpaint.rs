//! Grow chart colors into the blank texels around them.
//!
//! A texel is blank when all of its channels are zero. Each iteration fills the
//! current frontier (blank texels with at least one filled 8-neighbor) with the
//! average of their filled neighbors, then moves the frontier one ring outward.
//! Texels beyond `iterations` rings stay blank.

use image::{DynamicImage, ImageBuffer, Pixel};

const NEIGHBORS: [(i32, i32); 8] = [
  (-1, -1),
  (0, -1),
  (1, -1),
  (-1, 0),
  (1, 0),
  (-1, 1),
  (0, 1),
  (1, 1),
];

/// Inpaint any 8-bit image, dispatching on its channel layout.
///
/// Returns `false` for layouts other than 8-bit L, LA, RGB and RGBA, which are
/// left untouched.
pub fn inpaint_dynamic(image: &mut DynamicImage, iterations: u32) -> bool {
  match image {
    DynamicImage::ImageLuma8(buffer) => inpaint(buffer, iterations),
    DynamicImage::ImageLumaA8(buffer) => inpaint(buffer, iterations),
    DynamicImage::ImageRgb8(buffer) => inpaint(buffer, iterations),
    DynamicImage::ImageRgba8(buffer) => inpaint(buffer, iterations),
    _ => return false,
  }
  true
}

/// Inpaint an 8-bit image buffer in place.
pub fn inpaint<P>(image: &mut ImageBuffer<P, Vec<u8>>, iterations: u32)
where
  P: Pixel<Subpixel = u8>,
{
  let (width, height) = image.dimensions();
  if iterations == 0 || width == 0 || height == 0 {
    return;
  }
  let index = |x: u32, y: u32| (y * width + x) as usize;
  let neighbors = move |x: u32, y: u32| {
    NEIGHBORS.iter().filter_map(move |&(dx, dy)| {
      let nx = x as i32 + dx;
      let ny = y as i32 + dy;
      (nx >= 0 && ny >= 0 && (nx as u32) < width && (ny as u32) < height).then_some((nx as u32, ny as u32))
    })
  };

  let mut filled: Vec<bool> = image
    .pixels()
    .map(|p| p.channels().iter().any(|&c| c != 0))
    .collect();
  // Texels already in a frontier, so each one is queued once.
  let mut queued = filled.clone();

  let mut frontier = Vec::new();
  for y in 0..height {
    for x in 0..width {
      if !filled[index(x, y)] && neighbors(x, y).any(|(nx, ny)| filled[index(nx, ny)]) {
        frontier.push((x, y));
        queued[index(x, y)] = true;
      }
    }
  }

  let channels = P::CHANNEL_COUNT as usize;
  for ring in 0..iterations {
    if frontier.is_empty() {
      break;
    }

    // Averages come from the state before this ring, so the ring fills uniformly.
    let mut averaged = Vec::with_capacity(frontier.len());
    for &(x, y) in &frontier {
      let mut sum = [0u32; 4];
      let mut count = 0u32;
      for (nx, ny) in neighbors(x, y) {
        if !filled[index(nx, ny)] {
          continue;
        }
        for (c, &v) in image.get_pixel(nx, ny).channels().iter().enumerate() {
          sum[c] += v as u32;
        }
        count += 1;
      }
      let mut texel = [0u8; 4];
      for c in 0..channels {
        texel[c] = ((sum[c] + count / 2) / count.max(1)) as u8;
      }
      // Rounding can average faint neighbors down to blank.
      if count > 0 && texel[..channels].iter().all(|&c| c == 0) {
        texel[0] = 1;
      }
      averaged.push(texel);
    }

    for (&(x, y), texel) in frontier.iter().zip(&averaged) {
      image.put_pixel(x, y, *P::from_slice(&texel[..channels]));
      filled[index(x, y)] = true;
    }

    if ring + 1 == iterations {
      break;
    }
    let mut next = Vec::new();
    for &(x, y) in &frontier {
      for (nx, ny) in neighbors(x, y) {
        let i = index(nx, ny);
        if !queued[i] {
          queued[i] = true;
          next.push((nx, ny));
        }
      }
    }
    frontier = next;
  }
}

#[cfg(test)]
#[path = "inpaint_test.rs"]
mod inpaint_test;
