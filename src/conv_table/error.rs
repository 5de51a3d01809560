// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::buffer::BufferError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvTableError {
    #[error("'{0}' is not a supported convolution kernel; supported kernels are: {}", *super::KERNEL_KINDS_COMMA_SEPARATED)]
    UnsupportedKernel(String),

    #[error("The convolution kernel support must be positive")]
    ZeroSupport,

    #[error("The convolution kernel sampling must be positive")]
    ZeroSampling,

    #[error("A convolution table with support {support} and sampling {sampling} needs {expected} elements, but the output has {actual}")]
    ShapeMismatch {
        support: usize,
        sampling: usize,
        expected: usize,
        actual: usize,
    },

    #[error("A convolution table with support {support} and sampling {sampling} is too large to allocate")]
    TooLarge { support: usize, sampling: usize },

    #[error(transparent)]
    Buffer(#[from] BufferError),
}
