// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Invalid spectrum range {start}..{end}; there are {num_spectra} spectra")]
    SpectrumRange {
        start: usize,
        end: usize,
        num_spectra: usize,
    },

    #[error("The convolution table sampling must be positive")]
    ZeroSampling,

    #[error("{name} must be positive")]
    ZeroDimension { name: &'static str },

    #[error("{map}[{index}] = {value} is outside of [0, {limit})")]
    MapOutOfRange {
        map: &'static str,
        index: usize,
        value: i32,
        limit: usize,
    },

    #[error("{name} has shape {actual:?}, but {expected:?} was expected")]
    ShapeMismatch {
        name: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}
