//! Multi-scale template matching over grayscale frames

use super::{MatchResult, MatcherConfig, MatchingMethod, Template, MAX_SCALE_FACTOR};
use crate::utils::ImageUtils;
use image::GrayImage;
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};
use tracing::debug;

/// Finds the single best placement of a template across several frame scales
#[derive(Debug, Clone, Default)]
pub struct TemplateMatcher {
    config: MatcherConfig,
}

impl TemplateMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Resize the frame by each configured scale and keep the highest-scoring
    /// placement. Returns `None` if the template does not fit at any scale.
    pub fn find_match(&self, frame: &GrayImage, template: &Template) -> Option<MatchResult> {
        let (t_w, t_h) = template.dimensions();
        if frame.width() == 0 || frame.height() == 0 || t_w == 0 || t_h == 0 {
            return None;
        }
        let mut best: Option<MatchResult> = None;

        for scale in self.config.scale_factors() {
            if !(scale > 0.0 && scale <= MAX_SCALE_FACTOR) {
                debug!("Skipping unsupported scale {}", scale);
                continue;
            }
            let (r_w, r_h) = ImageUtils::scaled_dimensions(frame.width(), frame.height(), scale);
            if r_w < t_w || r_h < t_h {
                debug!(
                    "Skipping scale {:.2} for {}: frame {}x{} smaller than template {}x{}",
                    scale, template.label, r_w, r_h, t_w, t_h
                );
                continue;
            }

            let resized = ImageUtils::resize_by(frame, scale);
            let (score, location) = self.match_single_scale(&resized, &template.image);

            // Strict comparison keeps the earlier scale on ties
            if best.map_or(true, |b| score > b.score) {
                best = Some(MatchResult::from_scaled(score, location, (t_w, t_h), scale));
            }
        }

        best
    }

    /// Best score and top-left location at a single scale
    fn match_single_scale(&self, image: &GrayImage, template: &GrayImage) -> (f64, (u32, u32)) {
        let method = self.config.method;
        let (score, location) = match method {
            MatchingMethod::CCoeffNormed => ccoeff_normed_best(image, template),
            MatchingMethod::CCorrNormed | MatchingMethod::SqDiffNormed => {
                let kind = if method.is_inverted() {
                    MatchTemplateMethod::SumOfSquaredErrorsNormalized
                } else {
                    MatchTemplateMethod::CrossCorrelationNormalized
                };
                let extremes = find_extremes(&match_template(image, template, kind));
                if method.is_inverted() {
                    // Convert to "higher is better"
                    (1.0 - extremes.min_value as f64, extremes.min_value_location)
                } else {
                    (extremes.max_value as f64, extremes.max_value_location)
                }
            }
        };

        if score.is_finite() {
            (score, location)
        } else {
            (0.0, location)
        }
    }
}

/// Summed-area tables of pixel values and squared pixel values, one row and
/// column larger than the image.
struct IntegralTables {
    stride: usize,
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
}

impl IntegralTables {
    fn new(image: &GrayImage) -> Self {
        let (w, h) = (image.width() as usize, image.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sq_sum = vec![0u64; stride * (h + 1)];
        let raw = image.as_raw();

        for y in 0..h {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w {
                let v = raw[y * w + x] as u64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sq_sum[idx] = sq_sum[idx - stride] + row_sq;
            }
        }

        Self {
            stride,
            sum,
            sq_sum,
        }
    }

    fn window(&self, table: &[u64], x: usize, y: usize, w: usize, h: usize) -> u64 {
        let top_left = table[y * self.stride + x];
        let top_right = table[y * self.stride + x + w];
        let bottom_left = table[(y + h) * self.stride + x];
        let bottom_right = table[(y + h) * self.stride + x + w];
        bottom_right + top_left - top_right - bottom_left
    }
}

/// Largest run of u8 products whose sum cannot overflow a u32
const ROW_CHUNK: usize = (u32::MAX / (255 * 255)) as usize;

/// Zero-mean normalized cross-correlation, returning the first maximum in
/// row-major order.
///
/// All sums are exact integers; flat windows and flat templates score 0.
pub fn ccoeff_normed_best(image: &GrayImage, template: &GrayImage) -> (f64, (u32, u32)) {
    let (i_w, i_h) = (image.width() as usize, image.height() as usize);
    let (t_w, t_h) = (template.width() as usize, template.height() as usize);
    debug_assert!(i_w >= t_w && i_h >= t_h);

    let n = (t_w * t_h) as i128;
    let t_raw = template.as_raw();
    let t_sum: u64 = t_raw.iter().map(|&v| v as u64).sum();
    let t_sq_sum: u64 = t_raw.iter().map(|&v| (v as u64) * (v as u64)).sum();
    let t_var_n = n * t_sq_sum as i128 - (t_sum as i128) * (t_sum as i128);
    if t_var_n <= 0 {
        return (0.0, (0, 0));
    }

    let tables = IntegralTables::new(image);
    let i_raw = image.as_raw();

    let score_at = |x: usize, y: usize| -> f64 {
        let w_sum = tables.window(&tables.sum, x, y, t_w, t_h) as i128;
        let w_sq_sum = tables.window(&tables.sq_sum, x, y, t_w, t_h) as i128;
        let w_var_n = n * w_sq_sum - w_sum * w_sum;
        if w_var_n <= 0 {
            return 0.0;
        }

        // Per-chunk sums stay in u32
        let mut cross = 0u64;
        for ty in 0..t_h {
            let i_row = &i_raw[(y + ty) * i_w + x..(y + ty) * i_w + x + t_w];
            let t_row = &t_raw[ty * t_w..(ty + 1) * t_w];
            for (i_chunk, t_chunk) in i_row.chunks(ROW_CHUNK).zip(t_row.chunks(ROW_CHUNK)) {
                cross += i_chunk
                    .iter()
                    .zip(t_chunk)
                    .map(|(&a, &b)| a as u32 * b as u32)
                    .sum::<u32>() as u64;
            }
        }

        let numerator = n * cross as i128 - w_sum * t_sum as i128;
        let denominator = ((t_var_n as f64) * (w_var_n as f64)).sqrt();
        (numerator as f64 / denominator).clamp(-1.0, 1.0)
    };

    let max_x = i_w - t_w;
    let best_in_row = |y: usize| -> (f64, usize) {
        let mut best = (score_at(0, y), 0);
        for x in 1..=max_x {
            let score = score_at(x, y);
            if score > best.0 {
                best = (score, x);
            }
        }
        best
    };

    #[cfg(feature = "parallel")]
    let rows: Vec<(f64, usize)> = {
        use rayon::prelude::*;
        (0..=i_h - t_h).into_par_iter().map(best_in_row).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let rows: Vec<(f64, usize)> = (0..=i_h - t_h).map(best_in_row).collect();

    let mut best = (rows[0].0, (rows[0].1 as u32, 0u32));
    for (y, &(score, x)) in rows.iter().enumerate().skip(1) {
        if score > best.0 {
            best = (score, (x as u32, y as u32));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightcam_core::Label;
    use image::Luma;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn noise(width: u32, height: u32, seed: u64) -> GrayImage {
        let mut rng = StdRng::seed_from_u64(seed);
        GrayImage::from_fn(width, height, |_, _| Luma([rng.gen()]))
    }

    fn paste(frame: &mut GrayImage, patch: &GrayImage, x: u32, y: u32) {
        image::imageops::replace(frame, patch, x as i64, y as i64);
    }

    #[test]
    fn test_exact_match_at_native_scale() {
        let template_img = noise(24, 24, 1);
        let mut frame = noise(120, 90, 2);
        paste(&mut frame, &template_img, 37, 21);

        let template = Template::new(Label::A, template_img);
        let result = TemplateMatcher::default()
            .find_match(&frame, &template)
            .unwrap();

        assert!(result.score > 0.99);
        assert_eq!(result.scale, 1.0);
        assert_eq!(result.location, (37, 21));
        assert_eq!(result.size, (24, 24));
    }

    #[test]
    fn test_ccoeff_is_brightness_invariant() {
        let template_img = noise(16, 16, 3);
        let brighter = GrayImage::from_fn(16, 16, |x, y| {
            Luma([(template_img.get_pixel(x, y)[0] / 2).saturating_add(100)])
        });
        let mut frame = GrayImage::from_pixel(64, 64, Luma([30]));
        paste(&mut frame, &brighter, 10, 40);

        let (score, location) = ccoeff_normed_best(&frame, &template_img);
        assert!(score > 0.98);
        assert_eq!(location, (10, 40));
    }

    #[test]
    fn test_saturated_wide_template() {
        let template = GrayImage::from_fn(400, 3, |x, y| {
            Luma([if (x + y) % 3 == 0 { 0 } else { 255 }])
        });
        let mut frame = GrayImage::from_pixel(420, 10, Luma([255]));
        paste(&mut frame, &template, 7, 4);

        let (score, location) = ccoeff_normed_best(&frame, &template);
        assert!((score - 1.0).abs() < 1e-9);
        assert_eq!(location, (7, 4));
    }

    #[test]
    fn test_flat_inputs_score_zero() {
        let frame = GrayImage::from_pixel(50, 50, Luma([90]));
        let textured = noise(8, 8, 4);
        assert_eq!(ccoeff_normed_best(&frame, &textured), (0.0, (0, 0)));

        let flat_template = GrayImage::from_pixel(8, 8, Luma([90]));
        assert_eq!(ccoeff_normed_best(&noise(50, 50, 5), &flat_template).0, 0.0);
    }

    #[test]
    fn test_ties_keep_first_scale() {
        let frame = GrayImage::from_pixel(100, 100, Luma([200]));
        let template = Template::new(Label::B, GrayImage::from_pixel(10, 10, Luma([200])));

        let result = TemplateMatcher::default()
            .find_match(&frame, &template)
            .unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(result.scale, 0.5);
    }

    #[test]
    fn test_too_small_at_every_scale() {
        let frame = noise(20, 20, 6);
        let template = Template::new(Label::A, noise(50, 50, 7));
        assert!(TemplateMatcher::default().find_match(&frame, &template).is_none());
    }

    #[test]
    fn test_empty_images_have_no_match() {
        let matcher = TemplateMatcher::default();
        let tiny = Template::new(Label::A, noise(1, 1, 12));
        assert!(matcher.find_match(&GrayImage::new(0, 0), &tiny).is_none());
        assert!(matcher.find_match(&GrayImage::new(30, 0), &tiny).is_none());

        let empty = Template::new(Label::B, GrayImage::new(0, 0));
        assert!(matcher.find_match(&noise(30, 30, 13), &empty).is_none());
    }

    #[test]
    fn test_oversized_scales_skipped() {
        let template_img = noise(12, 12, 14);
        let mut frame = noise(40, 40, 15);
        paste(&mut frame, &template_img, 9, 17);

        let matcher = TemplateMatcher::new(MatcherConfig {
            scale_min: 1.0,
            scale_max: 1e9,
            scale_count: 2,
            ..Default::default()
        });
        let result = matcher
            .find_match(&frame, &Template::new(Label::A, template_img))
            .unwrap();
        assert_eq!(result.scale, 1.0);
        assert_eq!(result.location, (9, 17));
    }

    #[test]
    fn test_small_scales_skipped() {
        // Fits only once the frame is enlarged to 1.25x or more
        let frame = noise(40, 40, 8);
        let template = Template::new(Label::A, noise(48, 48, 9));
        let result = TemplateMatcher::default()
            .find_match(&frame, &template)
            .unwrap();
        assert!(result.scale >= 1.25);
    }

    #[test]
    fn test_imageproc_methods_locate_template() {
        let template_img = noise(20, 20, 10);
        let mut frame = noise(80, 60, 11);
        paste(&mut frame, &template_img, 44, 12);
        let template = Template::new(Label::A, template_img);

        for method in [MatchingMethod::CCorrNormed, MatchingMethod::SqDiffNormed] {
            let matcher = TemplateMatcher::new(MatcherConfig {
                method,
                ..Default::default()
            });
            let result = matcher.find_match(&frame, &template).unwrap();
            assert_eq!(result.location, (44, 12), "{:?}", method);
            assert_eq!(result.scale, 1.0, "{:?}", method);
            assert!(result.score > 0.99, "{:?}", method);
        }
    }
}
