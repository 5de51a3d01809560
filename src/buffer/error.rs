// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use super::ElementType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Buffer shape {shape:?} holds {expected} elements, but {actual} values were supplied")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Buffer shape {shape:?} is too large to be allocated")]
    TooLarge { shape: Vec<usize> },

    #[error("Expected a buffer of {expected} elements, but got {actual}")]
    ElementTypeMismatch {
        expected: ElementType,
        actual: ElementType,
    },
}
