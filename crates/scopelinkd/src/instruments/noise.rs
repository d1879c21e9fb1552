//! Random detector images.

use rand::Rng;

use scopelink_wire::ArrayPayload;

use crate::dispatch::HandlerError;

/// Square `u8` image with values in `0..255`.
pub(crate) fn u8_image(edge: usize) -> Result<ArrayPayload, HandlerError> {
    let mut rng = rand::thread_rng();
    let values = (0..edge * edge).map(|_| rng.gen_range(0..255_u8)).collect();
    Ok(ArrayPayload::from_u8(vec![edge, edge], values)?)
}

/// Square `u16` image with values in `0..255`.
pub(crate) fn u16_image(edge: usize) -> Result<ArrayPayload, HandlerError> {
    let mut rng = rand::thread_rng();
    let values: Vec<u16> = (0..edge * edge).map(|_| rng.gen_range(0..255_u16)).collect();
    Ok(ArrayPayload::from_u16(vec![edge, edge], &values)?)
}

/// Square `f32` map of a Gaussian spot with added noise.
pub(crate) fn f32_tableau(edge: usize, spread: f32) -> Result<ArrayPayload, HandlerError> {
    let mut rng = rand::thread_rng();
    let centre = edge as f32 / 2.0;
    let width = (spread * edge as f32).max(1.0);
    let mut values = Vec::with_capacity(edge * edge);
    for row in 0..edge {
        for column in 0..edge {
            let dy = row as f32 - centre;
            let dx = column as f32 - centre;
            let spot = (-(dx * dx + dy * dy) / (2.0 * width * width)).exp();
            values.push(spot + rng.gen_range(0.0..0.05_f32));
        }
    }
    Ok(ArrayPayload::from_f32(vec![edge, edge], &values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopelink_wire::ElementType;

    #[test]
    fn u8_images_stay_below_255() {
        let image = u8_image(16).expect("image");
        assert_eq!(image.shape(), &[16, 16]);
        assert_eq!(image.element_type(), ElementType::U8);
        assert!(image.data().iter().all(|value| *value < 255));
    }

    #[test]
    fn u16_images_have_two_bytes_per_pixel() {
        let image = u16_image(8).expect("image");
        assert_eq!(image.data().len(), 8 * 8 * 2);
        assert!(image.to_f64_vec().iter().all(|value| *value < 255.0));
    }

    #[test]
    fn tableau_peaks_near_the_centre() {
        let tableau = f32_tableau(9, 0.2).expect("tableau");
        let values = tableau.to_f64_vec();
        let centre = values[4 * 9 + 4];
        let corner = values[0];
        assert!(centre > corner);
    }
}
