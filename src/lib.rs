// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Convolutional gridding of single-dish spectral radio data.

Spectra sampled at arbitrary sky positions are spread onto a regular image grid
with a tabulated convolution kernel. The pieces, bottom-up:

- [`buffer`]: aligned, typed, fixed-size buffers that every kernel reads and
  writes;
- [`mask`]: elementwise kernels that turn flags and data into boolean masks;
- [`conv_table`]: tabulated, radially-symmetric convolution kernels;
- [`gridding`]: the gridding engine itself (serial and parallel).
 */

pub mod buffer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod conv_table;
mod error;
pub mod gridding;
pub mod mask;

// Re-exports.
pub use buffer::{AlignedBuffer, AnyBuffer, ElementType, InitPolicy, ALIGNMENT};
pub use config::GridConfig;
pub use conv_table::{ConvolutionTable, KernelKind};
pub use error::SdgridError;
pub use gridding::{grid_convolving, GridAccumulators, GridGeometry, Gridder, SpectraView};
