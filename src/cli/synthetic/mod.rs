// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Grid a deterministic, synthetic set of spectra. This is useful for
//! benchmarking and for sanity-checking kernels and grid geometries.


use std::{f64::consts::TAU, path::PathBuf, time::Instant};

use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::common::{GridArgs, ARG_FILE_HELP};
use super::SdgridCliError;
use crate::{
    buffer::AlignedBuffer,
    gridding::{GridAccumulators, GridError, Gridder, SpectraView},
    mask, GridConfig, SdgridError,
};

const DEFAULT_NUM_SPECTRA: usize = 10000;
const DEFAULT_NUM_POLARIZATIONS: usize = 2;
const DEFAULT_NUM_CHANNELS: usize = 64;

/// The number of times the spiral of spectrum positions winds around the
/// grid centre.
const SPIRAL_TURNS: f64 = 12.0;

/// The spectrum range is gridded in this many pieces so that progress can be
/// reported.
const NUM_BATCHES: usize = 20;

lazy_static::lazy_static! {
    static ref NUM_SPECTRA_HELP: String =
        format!("The number of synthetic spectra. Default: {DEFAULT_NUM_SPECTRA}");

    static ref NUM_POLARIZATIONS_HELP: String =
        format!("The number of polarizations per spectrum. Default: {DEFAULT_NUM_POLARIZATIONS}");

    static ref NUM_CHANNELS_HELP: String =
        format!("The number of channels per spectrum. Default: {DEFAULT_NUM_CHANNELS}");
}

#[derive(Parser, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct SyntheticCliArgs {
    #[clap(short, long, help = NUM_SPECTRA_HELP.as_str(), help_heading = "SYNTHETIC DATA")]
    pub(super) num_spectra: Option<usize>,

    #[clap(long, help = NUM_POLARIZATIONS_HELP.as_str(), help_heading = "SYNTHETIC DATA")]
    pub(super) num_polarizations: Option<usize>,

    #[clap(short = 'c', long, help = NUM_CHANNELS_HELP.as_str(), help_heading = "SYNTHETIC DATA")]
    pub(super) num_channels: Option<usize>,
}

impl SyntheticCliArgs {
    fn merge(self, other: Self) -> Self {
        Self {
            num_spectra: self.num_spectra.or(other.num_spectra),
            num_polarizations: self.num_polarizations.or(other.num_polarizations),
            num_channels: self.num_channels.or(other.num_channels),
        }
    }
}

#[derive(Parser, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    #[clap(flatten)]
    #[serde(rename = "grid")]
    #[serde(default)]
    pub(super) grid_args: GridArgs,

    #[clap(flatten)]
    #[serde(rename = "synthetic")]
    #[serde(default)]
    pub(super) synthetic_args: SyntheticCliArgs,
}

impl SyntheticArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified
    /// into a single struct. Where applicable, it will prefer CLI parameters
    /// over those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<SyntheticArgs, SdgridCliError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let SyntheticArgs {
                args_file: _,
                grid_args,
                synthetic_args,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when available.
            Ok(SyntheticArgs {
                args_file: None,
                grid_args: cli_args.grid_args.merge(grid_args),
                synthetic_args: cli_args.synthetic_args.merge(synthetic_args),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<SyntheticParams, SdgridCliError> {
        debug!("{:#?}", self);

        let SyntheticArgs {
            args_file: _,
            grid_args,
            synthetic_args:
                SyntheticCliArgs {
                    num_spectra,
                    num_polarizations,
                    num_channels,
                },
        } = self;

        let config = grid_args.parse()?;
        let num_spectra = num_spectra.unwrap_or(DEFAULT_NUM_SPECTRA);
        let num_polarizations = num_polarizations.unwrap_or(DEFAULT_NUM_POLARIZATIONS);
        let num_channels = num_channels.unwrap_or(DEFAULT_NUM_CHANNELS);
        for (name, value) in [
            ("num_spectra", num_spectra),
            ("num_polarizations", num_polarizations),
            ("num_channels", num_channels),
        ] {
            if value == 0 {
                return Err(SdgridError::from(GridError::ZeroDimension { name }).into());
            }
        }

        Ok(SyntheticParams {
            config,
            num_spectra,
            num_polarizations,
            num_channels,
        })
    }

    pub(super) fn run(self, dry_run: bool, progress_bars: bool) -> Result<(), SdgridCliError> {
        let params = self.parse()?;
        info!(
            "{} spectra with {} polarizations and {} channels",
            params.num_spectra, params.num_polarizations, params.num_channels
        );
        info!(
            "{} kernel, support {}, sampling {}",
            params.config.kernel, params.config.support, params.config.sampling
        );
        info!(
            "{}x{} grid with {} output polarizations and {} output channels",
            params.config.width,
            params.config.height,
            params.config.num_output_polarizations,
            params.config.num_output_channels
        );
        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        params.run(progress_bars)?;
        Ok(())
    }
}

/// Validated parameters for a synthetic gridding run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SyntheticParams {
    pub(super) config: GridConfig,
    pub(super) num_spectra: usize,
    pub(super) num_polarizations: usize,
    pub(super) num_channels: usize,
}

impl SyntheticParams {
    pub(super) fn run(&self, progress_bars: bool) -> Result<GridAccumulators, SdgridCliError> {
        let config = &self.config;
        let geometry = config.geometry();
        let spectra = SyntheticSpectra::generate(
            self.num_spectra,
            self.num_polarizations,
            self.num_channels,
            config.width,
            config.height,
        )?;
        let polarization_map = fold_map(self.num_polarizations, config.num_output_polarizations)?;
        let channel_map = spread_map(self.num_channels, config.num_output_channels)?;
        debug!("Polarization map: {polarization_map:?}");
        debug!("Channel map: {channel_map:?}");

        let table = config.convolution_table()?;
        let gridder = Gridder::with_table(geometry, &table, &polarization_map, &channel_map)?;
        let view = spectra.view()?;
        let mut out = GridAccumulators::zeros(geometry);

        let pool = match config.num_threads {
            Some(n) => Some(rayon::ThreadPoolBuilder::new().num_threads(n).build()?),
            None => None,
        };

        let progress = ProgressBar::with_draw_target(
            Some(self.num_spectra as _),
            if progress_bars {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template(
                    "{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} spectra ({elapsed_precise}<{eta_precise})",
                )
                .map_err(|e| SdgridCliError::Generic(e.to_string()))?
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message("Gridding");

        let start = Instant::now();
        let batch_size = self.num_spectra.div_ceil(NUM_BATCHES).max(1);
        for batch_start in (0..self.num_spectra).step_by(batch_size) {
            let batch = batch_start..(batch_start + batch_size).min(self.num_spectra);
            let len = batch.len();
            match &pool {
                Some(pool) => pool.install(|| {
                    gridder.grid_parallel(&view, batch, config.weight_only, &mut out)
                })?,
                None => gridder.grid(&view, batch, config.weight_only, &mut out)?,
            }
            progress.inc(len as _);
        }
        progress.abandon_with_message("Finished gridding");
        let elapsed = start.elapsed();

        info!(
            "Gridded {} spectra {} in {elapsed:.3?}",
            self.num_spectra,
            match config.num_threads {
                Some(n) => format!("over {n} threads"),
                None => "serially".to_string(),
            }
        );
        for ((op, oc), weight_sum) in out.weight_sum.indexed_iter() {
            info!("weight_sum[{op}, {oc}] = {weight_sum:.6}");
        }
        let num_weighted = out.weight_of_grid.iter().filter(|&&w| w > 0.0).count();
        info!(
            "{num_weighted} of {} grid cells have non-zero weight",
            out.weight_of_grid.len()
        );

        Ok(out)
    }
}

/// Synthetic single-dish data, in the buffers the gridder consumes.
pub(super) struct SyntheticSpectra {
    num_spectra: usize,
    num_polarizations: usize,
    num_channels: usize,
    spectrum_mask: AlignedBuffer<bool>,
    x: AlignedBuffer<f64>,
    y: AlignedBuffer<f64>,
    element_mask: AlignedBuffer<bool>,
    value: AlignedBuffer<f32>,
    weight: AlignedBuffer<f32>,
}

impl SyntheticSpectra {
    /// Spectra sit on a spiral centred on the grid. Each is a Gaussian line on
    /// a flat baseline. Masks are derived the way a real pipeline would: from
    /// integer flags, from non-finite values (every 23rd spectrum has a
    /// corrupted first channel) and from a set of excluded edge channels.
    pub(super) fn generate(
        num_spectra: usize,
        num_polarizations: usize,
        num_channels: usize,
        width: usize,
        height: usize,
    ) -> Result<SyntheticSpectra, SdgridError> {
        let (n, p, c) = (num_spectra, num_polarizations, num_channels);

        let mut x = AlignedBuffer::<f64>::uninitialized(&[n])?;
        let mut y = AlignedBuffer::<f64>::uninitialized(&[n])?;
        let centre_x = (width as f64 - 1.0) / 2.0;
        let centre_y = (height as f64 - 1.0) / 2.0;
        let max_radius = 0.45 * width.min(height) as f64;
        x.iter_mut()
            .zip(y.iter_mut())
            .enumerate()
            .for_each(|(i, (x, y))| {
                let t = i as f64 / n as f64;
                let r = max_radius * t.sqrt();
                let theta = SPIRAL_TURNS * TAU * t;
                *x = centre_x + r * theta.cos();
                *y = centre_y + r * theta.sin();
            });

        let mut value = AlignedBuffer::<f32>::uninitialized(&[n, p, c])?;
        let line_centre = (c as f64 - 1.0) / 2.0;
        let line_width = (c as f64 / 8.0).max(1.0);
        value
            .chunks_exact_mut(c)
            .enumerate()
            .for_each(|(i_row, row)| {
                let i_spectrum = i_row / p;
                let i_pol = i_row % p;
                let amplitude = 1.0 + 0.5 * i_pol as f64 + 0.1 * (i_spectrum % 5) as f64;
                row.iter_mut().enumerate().for_each(|(i_chan, v)| {
                    let d = (i_chan as f64 - line_centre) / line_width;
                    *v = (0.1 + amplitude * (-0.5 * d * d).exp()) as f32;
                });
                if i_spectrum % 23 == 0 {
                    row[0] = f32::NAN;
                }
            });

        // Element masks.
        let mut flags = AlignedBuffer::<i32>::uninitialized(&[n, p, c])?;
        flags
            .iter_mut()
            .enumerate()
            .for_each(|(i, f)| *f = i32::from(i % 17 == 3));
        let unflagged = mask::invert(&mask::to_boolean(&flags)?)?;
        let finite = mask::mask_invalid(&value)?;
        let element_mask = mask::logical_and(&unflagged, &finite)?;

        // Spectrum masks.
        let mut spectrum_flags = AlignedBuffer::<i8>::uninitialized(&[n])?;
        spectrum_flags
            .iter_mut()
            .enumerate()
            .for_each(|(i, f)| *f = i8::from(i % 50 == 49));
        let mut spectrum_mask = mask::to_boolean(&spectrum_flags)?;
        mask::invert_in_place(&mut spectrum_mask);

        // The outer sixteenth of channels on either side of the band get no
        // weight.
        let mut channels = AlignedBuffer::<f64>::uninitialized(&[c])?;
        channels
            .iter_mut()
            .enumerate()
            .for_each(|(i, ch)| *ch = i as f64);
        let edge = (c / 16) as f64;
        let band_end = c as f64;
        let edge_channels = mask::mark_in_ranges_exclusive(
            &channels,
            &[-1.0, band_end - edge - 1.0],
            &[edge, band_end],
        )?;
        let mut weight = AlignedBuffer::<f32>::uninitialized(&[n, c])?;
        weight.chunks_exact_mut(c).for_each(|row| {
            row.iter_mut()
                .zip(edge_channels.iter())
                .for_each(|(w, &edge)| *w = if edge { 0.0 } else { 1.0 });
        });

        Ok(SyntheticSpectra {
            num_spectra,
            num_polarizations,
            num_channels,
            spectrum_mask,
            x,
            y,
            element_mask,
            value,
            weight,
        })
    }

    pub(super) fn view(&self) -> Result<SpectraView<'_>, GridError> {
        SpectraView::from_slices(
            self.num_spectra,
            self.num_polarizations,
            self.num_channels,
            &self.spectrum_mask,
            &self.x,
            &self.y,
            &self.element_mask,
            &self.value,
            &self.weight,
        )
    }
}

fn map_entry(index: usize) -> Result<i32, SdgridCliError> {
    i32::try_from(index)
        .map_err(|_| SdgridCliError::Generic(format!("Plane index {index} doesn't fit in a map")))
}

/// Input plane `i` goes to output plane `i % num_out`.
fn fold_map(num_in: usize, num_out: usize) -> Result<Vec<i32>, SdgridCliError> {
    (0..num_in).map(|i| map_entry(i % num_out)).collect()
}

/// Input planes are spread evenly (and contiguously) over the output planes.
fn spread_map(num_in: usize, num_out: usize) -> Result<Vec<i32>, SdgridCliError> {
    (0..num_in)
        .map(|i| map_entry(spread_index(i, num_in, num_out)))
        .collect()
}

/// `i * num_out / num_in` without overflow. The result is less than
/// `num_out` for `i < num_in`.
fn spread_index(i: usize, num_in: usize, num_out: usize) -> usize {
    (i as u128 * num_out as u128 / num_in as u128) as usize
}
