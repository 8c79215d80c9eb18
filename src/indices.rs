//! Spectral indices over aligned composites.
//!
//! Every formula yields `NaN` (no-data) instead of dividing by zero or
//! producing an infinity, and `NaN` inputs stay `NaN`.

use log::info;
use ndarray::{Array2, ArrayView2, Zip};
use num_traits::Float;

use crate::{
    components::raster::{Grid, Raster},
    errors::Result,
    sensors::BandRoles,
};

/// Added to the pre-fire burn ratio in the relativized change denominator.
pub const RBR_OFFSET: f32 = 1.001;

/// `(a - b) / (a + b)`.
pub fn normalized_difference<F: Float>(a: F, b: F) -> F {
    let sum = a + b;
    if sum.is_zero() {
        return F::nan();
    }
    finite_or_nan((a - b) / sum)
}

fn finite_or_nan<F: Float>(value: F) -> F {
    if value.is_finite() {
        value
    } else {
        F::nan()
    }
}

fn normalized_difference_array(a: ArrayView2<f32>, b: ArrayView2<f32>) -> Array2<f32> {
    Zip::from(a)
        .and(b)
        .map_collect(|&a, &b| normalized_difference(a, b))
}

/// Water index, `(green - nir) / (green + nir)`.
pub fn ndwi(raster: &Raster<f32>, roles: &BandRoles) -> Result<Grid<f32>> {
    let data = normalized_difference_array(raster.band(&roles.green)?, raster.band(&roles.nir)?);
    Ok(Grid::new(data, *raster.transform()))
}

/// Sets every band of water cells (water index > 0) to no-data, as well as
/// cells whose water index is itself no-data.
///
/// Returns the number of newly masked cells.
pub fn mask_water(raster: &mut Raster<f32>, roles: &BandRoles) -> Result<usize> {
    let water = ndwi(raster, roles)?;
    let already_masked = raster.band(&roles.nir)?.map(|value| value.is_nan());
    let mask = water.data().map(|&index| index.is_nan() || index > 0.);
    let masked = Zip::from(&mask)
        .and(&already_masked)
        .fold(0, |count, &mask, &already| count + usize::from(mask && !already));
    raster.mask_cells(mask.view(), f32::NAN)?;
    info!("masked {masked} water or no-data cells");
    Ok(masked)
}

/// Burn ratio, `(nir - swir) / (nir + swir)`.
pub fn nbr(raster: &Raster<f32>, roles: &BandRoles) -> Result<Grid<f32>> {
    let data = normalized_difference_array(raster.band(&roles.nir)?, raster.band(&roles.swir)?);
    Ok(Grid::new(data, *raster.transform()))
}

/// Relativized burn ratio, `(pre - post) / (pre + 1.001)`.
pub fn rbr(pre: &Grid<f32>, post: &Grid<f32>) -> Result<Grid<f32>> {
    pre.check_grid(post)?;
    let data = Zip::from(pre.data())
        .and(post.data())
        .map_collect(|&pre, &post| finite_or_nan((pre - post) / (pre + RBR_OFFSET)));
    Ok(Grid::new(data, *pre.transform()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        components::{band::BandId, transforms::GeoTransform},
        errors::BurnscarError,
        sensors::{Sensor, Sentinel2},
    };
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rstest::{fixture, rstest};

    #[fixture]
    fn roles() -> BandRoles {
        Sentinel2::roles()
    }

    fn transform() -> GeoTransform {
        GeoTransform::new(0., 20., 10., -10.)
    }

    fn composite(green: Array2<f32>, nir: Array2<f32>, swir: Array2<f32>) -> Raster<f32> {
        Raster::stack(
            vec![
                (BandId::new("B03"), green),
                (BandId::new("B08"), nir),
                (BandId::new("B12"), swir),
            ],
            transform(),
        )
        .unwrap()
    }

    #[rstest]
    #[case(0.5f32, 0.5, 0.)]
    #[case(0.3, 0.1, 0.5)]
    #[case(0.1, 0.3, -0.5)]
    #[case(1., 0., 1.)]
    #[case(0., 1., -1.)]
    fn normalized_difference_values(#[case] a: f32, #[case] b: f32, #[case] expected: f32) {
        assert_abs_diff_eq!(normalized_difference(a, b), expected, epsilon = 1e-6);
    }

    #[rstest]
    #[case(0f32, 0.)]
    #[case(0.25, -0.25)]
    #[case(f32::NAN, 0.5)]
    #[case(f32::INFINITY, 0.5)]
    fn degenerate_inputs_are_no_data(#[case] a: f32, #[case] b: f32) {
        assert!(normalized_difference(a, b).is_nan());
    }

    #[rstest]
    fn non_negative_bands_stay_in_unit_range() {
        let values = [0f64, 1e-6, 0.05, 0.1, 0.5, 0.9, 1., 10_000.];
        for &a in &values {
            for &b in &values {
                let index = normalized_difference(a, b);
                assert!(index.is_nan() || (-1. ..=1.).contains(&index), "{a} {b} {index}");
            }
        }
    }

    #[rstest]
    fn masks_water_and_zero_sums(roles: BandRoles) {
        let mut raster = composite(
            array![[0.5, 0.1], [0., 0.2]],
            array![[0.1, 0.5], [0., 0.2]],
            array![[0.3, 0.3], [0.3, 0.3]],
        );
        let masked = mask_water(&mut raster, &roles).unwrap();
        assert_eq!(masked, 2);
        let swir = raster.band(&roles.swir).unwrap();
        // green > nir is water, a zero sum is no-data, equality is kept
        assert!(swir[[0, 0]].is_nan());
        assert_eq!(swir[[0, 1]], 0.3);
        assert!(swir[[1, 0]].is_nan());
        assert_eq!(swir[[1, 1]], 0.3);
    }

    #[rstest]
    fn bright_green_corner_is_treated_as_water(roles: BandRoles) {
        // green 0.5, nir 0.1, swir 0.05
        let mut raster = composite(
            array![[0.5, 0.5]],
            array![[0.1, 0.5]],
            array![[0.05, 0.5]],
        );
        mask_water(&mut raster, &roles).unwrap();
        let burn_ratio = nbr(&raster, &roles).unwrap();
        assert!(burn_ratio.get(0, 0).unwrap().is_nan());
        assert_eq!(burn_ratio.get(0, 1), Some(0.));
    }

    #[rstest]
    fn burn_ratio_of_composite(roles: BandRoles) {
        let raster = composite(
            array![[0.05, 0.5]],
            array![[0.1, 0.5]],
            array![[0.5, 0.]],
        );
        let burn_ratio = nbr(&raster, &roles).unwrap();
        assert_abs_diff_eq!(burn_ratio.get(0, 0).unwrap(), -0.4 / 0.6, epsilon = 1e-6);
        assert_eq!(burn_ratio.get(0, 1), Some(1.));
    }

    #[rstest]
    fn relativized_change() {
        let pre = Grid::new(array![[0., 0.5, f32::NAN, -1.001]], transform());
        let post = Grid::new(array![[0., -0.6666667, 0.2, 0.]], transform());
        let change = rbr(&pre, &post).unwrap();
        assert_eq!(change.get(0, 0), Some(0.));
        assert_abs_diff_eq!(change.get(0, 1).unwrap(), 1.1666667 / 1.501, epsilon = 1e-6);
        assert!(change.get(0, 2).unwrap().is_nan());
        assert!(change.get(0, 3).unwrap().is_nan());
    }

    #[rstest]
    fn relativized_change_needs_one_grid() {
        let pre = Grid::new(array![[0f32, 0.5]], transform());
        let post = Grid::new(array![[0f32], [0.5]], transform());
        assert!(matches!(rbr(&pre, &post), Err(BurnscarError::GridMismatch(_))));
    }
}
