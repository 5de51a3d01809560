// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all sdgrid library errors.

use thiserror::Error;

use crate::{
    buffer::BufferError, config::ConfigError, conv_table::ConvTableError, gridding::GridError,
    mask::MaskError,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SdgridError {
    #[error("{0}")]
    Buffer(#[from] BufferError),

    #[error("{0}")]
    Mask(#[from] MaskError),

    #[error("{0}")]
    ConvTable(#[from] ConvTableError),

    #[error("{0}")]
    Grid(#[from] GridError),

    #[error("{0}")]
    Config(#[from] ConfigError),
}
