// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Scalar gridding parameters, as they appear in argument files.

mod error;
#[cfg(test)]
mod tests;

pub use error::ConfigError;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    constants::*,
    conv_table::{ConvTableError, ConvolutionTable, KernelKind},
    gridding::GridGeometry,
};

/// Everything about a gridding run that isn't data. Missing fields in an
/// argument file take their defaults from [`crate::constants`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub kernel: KernelKind,

    /// The kernel support \[grid pixels\].
    pub support: usize,

    /// The number of table entries per grid pixel.
    pub sampling: usize,

    pub width: usize,
    pub height: usize,
    pub num_output_polarizations: usize,
    pub num_output_channels: usize,

    /// Only accumulate weights; leave the grid alone.
    pub weight_only: bool,

    /// If set, grid in parallel over this many threads. Otherwise, grid
    /// serially.
    pub num_threads: Option<usize>,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            kernel: DEFAULT_KERNEL,
            support: DEFAULT_SUPPORT,
            sampling: DEFAULT_SAMPLING,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            num_output_polarizations: DEFAULT_NUM_OUTPUT_POLARIZATIONS,
            num_output_channels: DEFAULT_NUM_OUTPUT_CHANNELS,
            weight_only: false,
            num_threads: None,
        }
    }
}

impl GridConfig {
    pub fn geometry(&self) -> GridGeometry {
        GridGeometry {
            width: self.width,
            height: self.height,
            num_output_polarizations: self.num_output_polarizations,
            num_output_channels: self.num_output_channels,
        }
    }

    /// Check the scalar preconditions of the table builder and the gridder.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.support == 0 {
            return Err(ConvTableError::ZeroSupport.into());
        }
        if self.sampling == 0 {
            return Err(ConvTableError::ZeroSampling.into());
        }
        if self.num_threads == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }
        self.geometry().validate()?;
        Ok(())
    }

    /// Validate, then tabulate the configured kernel.
    pub fn convolution_table(&self) -> Result<ConvolutionTable, ConfigError> {
        self.validate()?;
        debug!(
            "Using a {} kernel with support {} and sampling {}",
            self.kernel, self.support, self.sampling
        );
        Ok(ConvolutionTable::new(
            self.kernel,
            self.support,
            self.sampling,
        )?)
    }
}

