// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The gridding engine proper.

use std::ops::{Range, RangeInclusive};

use log::{debug, trace};
use ndarray::prelude::*;
use rayon::prelude::*;

use super::{GridAccumulators, GridError, GridGeometry, GridTargets, SpectraView};
use crate::conv_table::ConvolutionTable;

/// Validated, reusable gridding state: the output geometry, the convolution
/// table and the polarization and channel maps. Once constructed, a
/// `Gridder` can grid any number of spectrum sets whose polarization and
/// channel counts match its maps.
#[derive(Debug, Clone)]
pub struct Gridder<'a> {
    geometry: GridGeometry,
    support: usize,
    sampling: usize,
    table: &'a [f32],
    /// Input polarization index -> output polarization index.
    polarization_map: Vec<usize>,
    /// Input channel index -> output channel index.
    channel_map: Vec<usize>,
}

impl<'a> Gridder<'a> {
    /// Validate the geometry, sampling and maps. Every map entry must be a
    /// valid output index; nothing is clipped.
    pub fn new(
        geometry: GridGeometry,
        support: usize,
        sampling: usize,
        table: &'a [f32],
        polarization_map: &[i32],
        channel_map: &[i32],
    ) -> Result<Gridder<'a>, GridError> {
        if sampling == 0 {
            return Err(GridError::ZeroSampling);
        }
        geometry.validate()?;
        if polarization_map.is_empty() {
            return Err(GridError::ZeroDimension {
                name: "num_polarizations",
            });
        }
        if channel_map.is_empty() {
            return Err(GridError::ZeroDimension {
                name: "num_channels",
            });
        }
        let polarization_map = validate_map(
            "polarization_map",
            polarization_map,
            geometry.num_output_polarizations,
        )?;
        let channel_map = validate_map("channel_map", channel_map, geometry.num_output_channels)?;

        Ok(Gridder {
            geometry,
            support,
            sampling,
            table,
            polarization_map,
            channel_map,
        })
    }

    /// Like [`Gridder::new`], but take the support, sampling and values from
    /// a [`ConvolutionTable`].
    pub fn with_table(
        geometry: GridGeometry,
        table: &'a ConvolutionTable,
        polarization_map: &[i32],
        channel_map: &[i32],
    ) -> Result<Gridder<'a>, GridError> {
        Gridder::new(
            geometry,
            table.support(),
            table.sampling(),
            table.as_slice(),
            polarization_map,
            channel_map,
        )
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    pub fn support(&self) -> usize {
        self.support
    }

    pub fn sampling(&self) -> usize {
        self.sampling
    }

    pub fn num_polarizations(&self) -> usize {
        self.polarization_map.len()
    }

    pub fn num_channels(&self) -> usize {
        self.channel_map.len()
    }

    /// Accumulate spectra `range` of `spectra` into `out`.
    ///
    /// Spectra are visited in ascending order, then channels, then
    /// polarizations. On error, `out` is untouched.
    pub fn grid(
        &self,
        spectra: &SpectraView,
        range: Range<usize>,
        weight_only: bool,
        out: &mut GridAccumulators,
    ) -> Result<(), GridError> {
        self.check_inputs(spectra, range.clone())?;
        out.check_against(self.geometry)?;
        debug!(
            "Gridding spectra {}..{} onto a {}x{} grid ({} output polarizations, {} output channels); weight only: {weight_only}",
            range.start,
            range.end,
            self.geometry.width,
            self.geometry.height,
            self.geometry.num_output_polarizations,
            self.geometry.num_output_channels,
        );

        self.accumulate(spectra, range, weight_only, out.view_mut());
        Ok(())
    }

    /// As [`Gridder::grid`], but split `range` into one contiguous chunk per
    /// rayon thread. Each chunk is gridded into its own accumulators, and the
    /// chunks are added into `out` in order. The results match the serial
    /// path to within floating-point rounding.
    pub fn grid_parallel(
        &self,
        spectra: &SpectraView,
        range: Range<usize>,
        weight_only: bool,
        out: &mut GridAccumulators,
    ) -> Result<(), GridError> {
        self.check_inputs(spectra, range.clone())?;
        out.check_against(self.geometry)?;

        let num_threads = rayon::current_num_threads();
        let chunks = split_range(range.clone(), num_threads);
        debug!(
            "Gridding spectra {}..{} in {} chunks over {num_threads} threads; weight only: {weight_only}",
            range.start,
            range.end,
            chunks.len(),
        );

        let partials: Vec<GridAccumulators> = chunks
            .into_par_iter()
            .map(|chunk| {
                trace!("Gridding chunk {}..{}", chunk.start, chunk.end);
                let mut partial = GridAccumulators::zeros(self.geometry);
                self.accumulate(spectra, chunk, weight_only, partial.view_mut());
                partial
            })
            .collect();

        for partial in &partials {
            *out += partial;
        }
        Ok(())
    }

    /// Check that `spectra` agrees with the maps and that `range` lies within
    /// it.
    pub(super) fn check_inputs(
        &self,
        spectra: &SpectraView,
        range: Range<usize>,
    ) -> Result<(), GridError> {
        let num_spectra = spectra.num_spectra();
        if spectra.num_polarizations() != self.num_polarizations()
            || spectra.num_channels() != self.num_channels()
        {
            return Err(GridError::ShapeMismatch {
                name: "value",
                expected: vec![num_spectra, self.num_polarizations(), self.num_channels()],
                actual: spectra.value.shape().to_vec(),
            });
        }
        if range.start > range.end || range.end > num_spectra {
            return Err(GridError::SpectrumRange {
                start: range.start,
                end: range.end,
                num_spectra,
            });
        }
        Ok(())
    }

    /// The real work. Everything must already have been validated.
    pub(super) fn accumulate(
        &self,
        spectra: &SpectraView,
        range: Range<usize>,
        weight_only: bool,
        mut targets: GridTargets<'_>,
    ) {
        let span = 2_usize.saturating_mul(self.support).saturating_add(1);
        let mut footprint = Vec::with_capacity(
            span.min(self.geometry.width)
                .saturating_mul(span.min(self.geometry.height)),
        );

        for i_spectrum in range {
            if !spectra.spectrum_mask[i_spectrum] {
                continue;
            }
            self.footprint(spectra.x[i_spectrum], spectra.y[i_spectrum], &mut footprint);
            if footprint.is_empty() {
                continue;
            }

            let element_mask = spectra.element_mask.index_axis(Axis(0), i_spectrum);
            let values = spectra.value.index_axis(Axis(0), i_spectrum);
            let weights = spectra.weight.row(i_spectrum);

            for (i_chan, (&weight, &o_chan)) in weights.iter().zip(&self.channel_map).enumerate() {
                // NaN and infinite weights are flags; negative weights would
                // make weight_of_grid negative.
                if !weight.is_finite() || weight <= 0.0 {
                    continue;
                }

                for (i_pol, &o_pol) in self.polarization_map.iter().enumerate() {
                    if !element_mask[[i_pol, i_chan]] {
                        continue;
                    }
                    let value = values[[i_pol, i_chan]];

                    for &(py, px, conv) in &footprint {
                        let contribution = conv * weight;
                        targets.weight_of_grid[[py, px, o_pol, o_chan]] += contribution;
                        targets.weight_sum[[o_pol, o_chan]] += f64::from(contribution);
                        if !weight_only {
                            targets.grid[[py, px, o_pol, o_chan]] += contribution * value;
                        }
                    }
                }
            }
        }
    }

    /// Fill `footprint` with the `(y, x, kernel value)` of every grid pixel
    /// that a sample at `(x, y)` touches with a non-zero kernel value.
    fn footprint(&self, x: f64, y: f64, footprint: &mut Vec<(usize, usize, f32)>) {
        footprint.clear();
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        let (Some(xs), Some(ys)) = (
            pixel_span(x, self.support, self.geometry.width),
            pixel_span(y, self.support, self.geometry.height),
        ) else {
            return;
        };

        let sampling = self.sampling as f64;
        let table_len = self.table.len() as f64;
        for py in ys {
            let dy = py as f64 - y;
            for px in xs.clone() {
                let dx = px as f64 - x;
                let index = (dx.hypot(dy) * sampling).round();
                if index >= table_len {
                    continue;
                }
                let conv = self.table[index as usize];
                if conv != 0.0 {
                    footprint.push((py, px, conv));
                }
            }
        }
    }
}

/// The pixels within `support` of `floor(centre)`, clipped to `[0, size)`.
/// `None` if none of them are on the grid.
fn pixel_span(centre: f64, support: usize, size: usize) -> Option<RangeInclusive<usize>> {
    let support = support as f64;
    let centre = centre.floor();
    let lo = (centre - support).max(0.0);
    let hi = (centre + support).min((size - 1) as f64);
    if lo > hi {
        None
    } else {
        Some(lo as usize..=hi as usize)
    }
}

/// Convert an `i32` map into output indices, rejecting anything outside of
/// `[0, limit)`.
fn validate_map(map: &'static str, entries: &[i32], limit: usize) -> Result<Vec<usize>, GridError> {
    entries
        .iter()
        .enumerate()
        .map(|(index, &value)| match usize::try_from(value) {
            Ok(v) if v < limit => Ok(v),
            _ => Err(GridError::MapOutOfRange {
                map,
                index,
                value,
                limit,
            }),
        })
        .collect()
}

/// Split `range` into at most `num_chunks` contiguous, non-empty, ordered
/// chunks.
fn split_range(range: Range<usize>, num_chunks: usize) -> Vec<Range<usize>> {
    let len = range.end.saturating_sub(range.start);
    if len == 0 {
        return vec![];
    }
    let chunk_size = len.div_ceil(num_chunks.max(1));
    range
        .clone()
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(range.end))
        .collect()
}
