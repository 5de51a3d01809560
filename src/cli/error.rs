// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all sdgrid command-line errors. This should be the *only*
//! error enum that the binary sees.

use thiserror::Error;

use super::common::ARG_FILE_TYPES_COMMA_SEPARATED;
use crate::{
    config::ConfigError, conv_table::ConvTableError, gridding::GridError, mask::MaskError,
    SdgridError,
};

#[derive(Error, Debug)]
pub enum SdgridCliError {
    /// An error related to gridding parameters (kernel, geometry, maps).
    #[error("{0}\n\nThe gridding arguments are described by: sdgrid synthetic --help")]
    Gridding(String),

    /// An error related to building the synthetic data (buffers or masks).
    #[error("{0}")]
    Data(String),

    /// An error related to argument files.
    #[error("{0}\n\nSupported argument file formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED)]
    ArgFile(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

impl From<SdgridError> for SdgridCliError {
    fn from(e: SdgridError) -> Self {
        let s = e.to_string();
        match e {
            SdgridError::Buffer(_) | SdgridError::Mask(_) => Self::Data(s),
            SdgridError::ConvTable(_) | SdgridError::Grid(_) | SdgridError::Config(_) => {
                Self::Gridding(s)
            }
        }
    }
}

impl From<ConfigError> for SdgridCliError {
    fn from(e: ConfigError) -> Self {
        Self::from(SdgridError::from(e))
    }
}

impl From<ConvTableError> for SdgridCliError {
    fn from(e: ConvTableError) -> Self {
        Self::from(SdgridError::from(e))
    }
}

impl From<GridError> for SdgridCliError {
    fn from(e: GridError) -> Self {
        Self::from(SdgridError::from(e))
    }
}

impl From<MaskError> for SdgridCliError {
    fn from(e: MaskError) -> Self {
        Self::from(SdgridError::from(e))
    }
}

impl From<crate::buffer::BufferError> for SdgridCliError {
    fn from(e: crate::buffer::BufferError) -> Self {
        Self::from(SdgridError::from(e))
    }
}

impl From<std::io::Error> for SdgridCliError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for SdgridCliError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<toml::ser::Error> for SdgridCliError {
    fn from(e: toml::ser::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
