// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::{conv_table::ConvTableError, gridding::GridError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("The number of threads must be positive")]
    ZeroThreads,

    #[error(transparent)]
    ConvTable(#[from] ConvTableError),

    #[error(transparent)]
    Grid(#[from] GridError),
}
