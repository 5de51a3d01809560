// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Convolutional gridding of single-dish spectra onto a regular image grid.
//!
//! Every unmasked (spectrum, polarization, channel) sample is spread over the
//! pixels within `support` pixels of its position, weighted by a tabulated
//! convolution kernel (see [`crate::conv_table`]). Input polarizations and
//! channels are folded onto output planes by caller-supplied maps. Three
//! outputs are accumulated (never overwritten):
//!
//! - `grid[y, x, pol, chan]`: the weighted sum of values;
//! - `weight_of_grid[y, x, pol, chan]`: the sum of weights;
//! - `weight_sum[pol, chan]`: the total weight that landed in each plane.
//!
//! The grid is *not* normalised; see [`GridAccumulators::normalised_grid`].

mod error;
mod gridder;

pub use error::GridError;
pub use gridder::Gridder;

use std::ops::AddAssign;

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::buffer::AlignedBuffer;

/// The size of the output grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub width: usize,
    pub height: usize,
    pub num_output_polarizations: usize,
    pub num_output_channels: usize,
}

impl GridGeometry {
    /// The shape of `grid` and `weight_of_grid`:
    /// `[height, width, num_output_polarizations, num_output_channels]`.
    pub fn grid_shape(&self) -> [usize; 4] {
        [
            self.height,
            self.width,
            self.num_output_polarizations,
            self.num_output_channels,
        ]
    }

    /// The shape of `weight_sum`: `[num_output_polarizations,
    /// num_output_channels]`.
    pub fn weight_sum_shape(&self) -> [usize; 2] {
        [self.num_output_polarizations, self.num_output_channels]
    }

    pub(crate) fn validate(&self) -> Result<(), GridError> {
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("num_output_polarizations", self.num_output_polarizations),
            ("num_output_channels", self.num_output_channels),
        ] {
            if value == 0 {
                return Err(GridError::ZeroDimension { name });
            }
        }
        Ok(())
    }
}

/// Borrowed per-spectrum inputs to the gridder. The shapes are checked for
/// consistency on construction.
#[derive(Debug, Clone)]
pub struct SpectraView<'a> {
    /// `[num_spectra]`; spectra with a `false` entry are skipped entirely.
    spectrum_mask: ArrayView1<'a, bool>,
    x: ArrayView1<'a, f64>,
    y: ArrayView1<'a, f64>,
    /// `[num_spectra, num_polarizations, num_channels]`
    element_mask: ArrayView3<'a, bool>,
    /// `[num_spectra, num_polarizations, num_channels]`
    value: ArrayView3<'a, f32>,
    /// `[num_spectra, num_channels]`
    weight: ArrayView2<'a, f32>,
}

impl<'a> SpectraView<'a> {
    pub fn new(
        spectrum_mask: ArrayView1<'a, bool>,
        x: ArrayView1<'a, f64>,
        y: ArrayView1<'a, f64>,
        element_mask: ArrayView3<'a, bool>,
        value: ArrayView3<'a, f32>,
        weight: ArrayView2<'a, f32>,
    ) -> Result<SpectraView<'a>, GridError> {
        let (num_spectra, num_polarizations, num_channels) = value.dim();
        check_shape("spectrum_mask", &[num_spectra], spectrum_mask.shape())?;
        check_shape("x", &[num_spectra], x.shape())?;
        check_shape("y", &[num_spectra], y.shape())?;
        check_shape(
            "element_mask",
            &[num_spectra, num_polarizations, num_channels],
            element_mask.shape(),
        )?;
        check_shape("weight", &[num_spectra, num_channels], weight.shape())?;

        Ok(SpectraView {
            spectrum_mask,
            x,
            y,
            element_mask,
            value,
            weight,
        })
    }

    /// Interpret flat, row-major slices with the given dimensions.
    #[allow(clippy::too_many_arguments)]
    pub fn from_slices(
        num_spectra: usize,
        num_polarizations: usize,
        num_channels: usize,
        spectrum_mask: &'a [bool],
        x: &'a [f64],
        y: &'a [f64],
        element_mask: &'a [bool],
        value: &'a [f32],
        weight: &'a [f32],
    ) -> Result<SpectraView<'a>, GridError> {
        let (s, p, c) = (num_spectra, num_polarizations, num_channels);
        SpectraView::new(
            ArrayView1::from_shape(s, spectrum_mask)
                .map_err(|_| shape_error("spectrum_mask", &[s], spectrum_mask.len()))?,
            ArrayView1::from_shape(s, x).map_err(|_| shape_error("x", &[s], x.len()))?,
            ArrayView1::from_shape(s, y).map_err(|_| shape_error("y", &[s], y.len()))?,
            ArrayView3::from_shape((s, p, c), element_mask)
                .map_err(|_| shape_error("element_mask", &[s, p, c], element_mask.len()))?,
            ArrayView3::from_shape((s, p, c), value)
                .map_err(|_| shape_error("value", &[s, p, c], value.len()))?,
            ArrayView2::from_shape((s, c), weight)
                .map_err(|_| shape_error("weight", &[s, c], weight.len()))?,
        )
    }

    pub fn num_spectra(&self) -> usize {
        self.value.len_of(Axis(0))
    }

    pub fn num_polarizations(&self) -> usize {
        self.value.len_of(Axis(1))
    }

    pub fn num_channels(&self) -> usize {
        self.value.len_of(Axis(2))
    }
}

/// The three gridding outputs, owned.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAccumulators {
    /// `[height, width, num_output_polarizations, num_output_channels]`
    pub grid: Array4<f32>,
    /// `[height, width, num_output_polarizations, num_output_channels]`
    pub weight_of_grid: Array4<f32>,
    /// `[num_output_polarizations, num_output_channels]`
    pub weight_sum: Array2<f64>,
}

impl GridAccumulators {
    pub fn zeros(geometry: GridGeometry) -> GridAccumulators {
        GridAccumulators {
            grid: Array4::zeros(geometry.grid_shape()),
            weight_of_grid: Array4::zeros(geometry.grid_shape()),
            weight_sum: Array2::zeros(geometry.weight_sum_shape()),
        }
    }

    /// The geometry implied by the shape of `grid`.
    pub fn geometry(&self) -> GridGeometry {
        let (height, width, num_output_polarizations, num_output_channels) = self.grid.dim();
        GridGeometry {
            width,
            height,
            num_output_polarizations,
            num_output_channels,
        }
    }

    /// Divide the grid by its weights. Pixels without any weight are zero.
    pub fn normalised_grid(&self) -> Array4<f32> {
        let mut out = self.grid.clone();
        out.iter_mut()
            .zip(self.weight_of_grid.iter())
            .for_each(|(g, &w)| {
                if w > 0.0 {
                    *g /= w;
                } else {
                    *g = 0.0;
                }
            });
        out
    }

    fn check_against(&self, geometry: GridGeometry) -> Result<(), GridError> {
        check_shape("grid", &geometry.grid_shape(), self.grid.shape())?;
        check_shape(
            "weight_of_grid",
            &geometry.grid_shape(),
            self.weight_of_grid.shape(),
        )?;
        check_shape(
            "weight_sum",
            &geometry.weight_sum_shape(),
            self.weight_sum.shape(),
        )?;
        Ok(())
    }

    fn view_mut(&mut self) -> GridTargets<'_> {
        GridTargets {
            grid: self.grid.view_mut(),
            weight_of_grid: self.weight_of_grid.view_mut(),
            weight_sum: self.weight_sum.view_mut(),
        }
    }
}

/// Element-wise accumulation. Panics if the shapes differ.
impl AddAssign<&GridAccumulators> for GridAccumulators {
    fn add_assign(&mut self, rhs: &GridAccumulators) {
        self.grid += &rhs.grid;
        self.weight_of_grid += &rhs.weight_of_grid;
        self.weight_sum += &rhs.weight_sum;
    }
}

/// Mutable views of the outputs that the gridder writes into.
pub(crate) struct GridTargets<'a> {
    grid: ArrayViewMut4<'a, f32>,
    weight_of_grid: ArrayViewMut4<'a, f32>,
    weight_sum: ArrayViewMut2<'a, f64>,
}

/// Grid spectra `start_spectrum..end_spectrum` onto caller-owned aligned
/// buffers.
///
/// Buffers are treated as flat row-major arrays: their element counts must
/// match the dimensions below, but their declared shapes are not inspected.
///
/// - `spectrum_mask`, `x`, `y`: `[num_spectra]`
/// - `polarization_map`: `[num_polarizations]`, entries in
///   `[0, num_output_polarizations)`
/// - `channel_map`: `[num_channels]`, entries in `[0, num_output_channels)`
/// - `element_mask`, `value`: `[num_spectra, num_polarizations, num_channels]`
/// - `weight`: `[num_spectra, num_channels]`
/// - `weight_sum`: `[num_output_polarizations, num_output_channels]`
/// - `weight_of_grid`, `grid`: `[height, width, num_output_polarizations,
///   num_output_channels]`
///
/// Every argument is checked before any output is touched; on error the
/// outputs are unchanged.
#[allow(clippy::too_many_arguments)]
pub fn grid_convolving(
    num_spectra: usize,
    start_spectrum: usize,
    end_spectrum: usize,
    spectrum_mask: &AlignedBuffer<bool>,
    x: &AlignedBuffer<f64>,
    y: &AlignedBuffer<f64>,
    support: usize,
    sampling: usize,
    num_polarizations: usize,
    polarization_map: &AlignedBuffer<i32>,
    num_channels: usize,
    channel_map: &AlignedBuffer<i32>,
    element_mask: &AlignedBuffer<bool>,
    value: &AlignedBuffer<f32>,
    weight: &AlignedBuffer<f32>,
    weight_only: bool,
    convolution_table: &AlignedBuffer<f32>,
    num_output_polarizations: usize,
    num_output_channels: usize,
    width: usize,
    height: usize,
    weight_sum: &mut AlignedBuffer<f64>,
    weight_of_grid: &mut AlignedBuffer<f32>,
    grid: &mut AlignedBuffer<f32>,
) -> Result<(), GridError> {
    if num_polarizations == 0 {
        return Err(GridError::ZeroDimension {
            name: "num_polarizations",
        });
    }
    if num_channels == 0 {
        return Err(GridError::ZeroDimension {
            name: "num_channels",
        });
    }
    check_shape("polarization_map", &[num_polarizations], &[polarization_map.len()])?;
    check_shape("channel_map", &[num_channels], &[channel_map.len()])?;

    let geometry = GridGeometry {
        width,
        height,
        num_output_polarizations,
        num_output_channels,
    };
    let gridder = Gridder::new(
        geometry,
        support,
        sampling,
        convolution_table,
        polarization_map,
        channel_map,
    )?;
    let spectra = SpectraView::from_slices(
        num_spectra,
        num_polarizations,
        num_channels,
        spectrum_mask,
        x,
        y,
        element_mask,
        value,
        weight,
    )?;
    gridder.check_inputs(&spectra, start_spectrum..end_spectrum)?;

    let grid_shape = geometry.grid_shape();
    let weight_sum_shape = geometry.weight_sum_shape();
    let (grid_len, weight_of_grid_len, weight_sum_len) =
        (grid.len(), weight_of_grid.len(), weight_sum.len());
    let targets = GridTargets {
        grid: ArrayViewMut4::from_shape(grid_shape, grid.as_mut_slice())
            .map_err(|_| shape_error("grid", &grid_shape, grid_len))?,
        weight_of_grid: ArrayViewMut4::from_shape(grid_shape, weight_of_grid.as_mut_slice())
            .map_err(|_| shape_error("weight_of_grid", &grid_shape, weight_of_grid_len))?,
        weight_sum: ArrayViewMut2::from_shape(weight_sum_shape, weight_sum.as_mut_slice())
            .map_err(|_| shape_error("weight_sum", &weight_sum_shape, weight_sum_len))?,
    };
    gridder.accumulate(&spectra, start_spectrum..end_spectrum, weight_only, targets);
    Ok(())
}

fn check_shape(name: &'static str, expected: &[usize], actual: &[usize]) -> Result<(), GridError> {
    if expected != actual {
        return Err(GridError::ShapeMismatch {
            name,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

/// A flat buffer of `actual_len` elements can't be viewed with shape
/// `expected`.
fn shape_error(name: &'static str, expected: &[usize], actual_len: usize) -> GridError {
    GridError::ShapeMismatch {
        name,
        expected: expected.to_vec(),
        actual: vec![actual_len],
    }
}
