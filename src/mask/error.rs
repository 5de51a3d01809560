// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::buffer::BufferError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaskError {
    #[error("Length mismatch: {what} has {actual} elements, but {expected} were expected")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("There are {lower} lower bounds but {upper} upper bounds")]
    RangeCountMismatch { lower: usize, upper: usize },

    #[error("Range {index} has a lower bound greater than its upper bound")]
    InvertedRange { index: usize },

    #[error(transparent)]
    Buffer(#[from] BufferError),
}
