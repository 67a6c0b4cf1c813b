// Synthetic frames shared by unit tests

use image::{Rgb, RgbImage};

/// Backdrop blue, hue 120
pub const BLUE: [u8; 3] = [0, 0, 255];
/// Healthy green, hue 60
pub const GREEN: [u8; 3] = [40, 160, 40];
/// Necrotic brown, hue 9
pub const BROWN: [u8; 3] = [150, 60, 20];
/// Chlorotic yellow, hue 25
pub const YELLOW: [u8; 3] = [230, 200, 40];

/// Fill a `width` x `height` rectangle whose top-left corner is (`x`, `y`)
pub fn paint_rect(image: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: [u8; 3]) {
    for py in y..y + height {
        for px in x..x + width {
            image.put_pixel(px, py, Rgb(color));
        }
    }
}

/// Blue frame holding one green leaf of the given size at (`x`, `y`)
pub fn frame_with_leaf(frame: (u32, u32), x: u32, y: u32, width: u32, height: u32) -> RgbImage {
    let mut image = RgbImage::from_pixel(frame.0, frame.1, Rgb(BLUE));
    paint_rect(&mut image, x, y, width, height, GREEN);
    image
}
