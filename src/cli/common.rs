// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Arguments shared between sdgrid subcommands, and the machinery for reading
//! arguments out of files.

use clap::Parser;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use super::SdgridCliError;
use crate::{
    constants::*,
    conv_table::{KernelKind, KERNEL_KINDS_COMMA_SEPARATED},
    GridConfig,
};

lazy_static::lazy_static! {
    pub(super) static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");

    pub(super) static ref ARG_FILE_HELP: String =
        format!("All arguments may be specified in a file. Any CLI arguments override arguments set in the file. Supported formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED);

    static ref KERNEL_HELP: String =
        format!("The convolution kernel. Supported kernels: {}. Default: {DEFAULT_KERNEL}", *KERNEL_KINDS_COMMA_SEPARATED);

    static ref SUPPORT_HELP: String =
        format!("The kernel support [grid pixels]. Default: {DEFAULT_SUPPORT}");

    static ref SAMPLING_HELP: String =
        format!("The number of convolution-table entries per grid pixel. Default: {DEFAULT_SAMPLING}");

    static ref WIDTH_HELP: String =
        format!("The width of the output grid [pixels]. Default: {DEFAULT_WIDTH}");

    static ref HEIGHT_HELP: String =
        format!("The height of the output grid [pixels]. Default: {DEFAULT_HEIGHT}");

    static ref NUM_OUTPUT_POLS_HELP: String =
        format!("The number of output polarization planes. Default: {DEFAULT_NUM_OUTPUT_POLARIZATIONS}");

    static ref NUM_OUTPUT_CHANS_HELP: String =
        format!("The number of output channel planes. Default: {DEFAULT_NUM_OUTPUT_CHANNELS}");
}

#[derive(Debug, Display, EnumIter, EnumString)]
pub(super) enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

/// Read an argument file into whatever type the caller wants. The file type is
/// determined by the extension. This returns early with an
/// [`SdgridCliError`] on failure.
macro_rules! unpack_arg_file {
    ($arg_file:expr) => ({
        use std::{fs::File, io::Read, str::FromStr};

        use crate::cli::common::{ArgFileTypes, ARG_FILE_TYPES_COMMA_SEPARATED};

        debug!("Attempting to parse argument file {}", $arg_file.display());

        let mut contents = String::new();
        let arg_file_type = $arg_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ArgFileTypes::from_str(&e).ok());

        match arg_file_type {
            Some(ArgFileTypes::Toml) => {
                debug!("Parsing toml file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match toml::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(SdgridCliError::ArgFile(format!(
                            "Couldn't decode toml structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }
            Some(ArgFileTypes::Json) => {
                debug!("Parsing json file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match serde_json::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(SdgridCliError::ArgFile(format!(
                            "Couldn't decode json structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }

            _ => {
                return Err(SdgridCliError::ArgFile(format!(
                    "Argument file '{:?}' doesn't have a recognised file extension! Valid extensions are: {}", $arg_file, *ARG_FILE_TYPES_COMMA_SEPARATED)
                ))
            }
        }
    });
}

/// Gridding arguments. Everything is optional so that these can be merged with
/// an argument file; defaults are applied in [`GridArgs::parse`].
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct GridArgs {
    #[clap(short, long, help = KERNEL_HELP.as_str(), help_heading = "GRIDDING")]
    pub(super) kernel: Option<String>,

    #[clap(short, long, help = SUPPORT_HELP.as_str(), help_heading = "GRIDDING")]
    pub(super) support: Option<usize>,

    #[clap(long, help = SAMPLING_HELP.as_str(), help_heading = "GRIDDING")]
    pub(super) sampling: Option<usize>,

    #[clap(long, help = WIDTH_HELP.as_str(), help_heading = "GRID")]
    pub(super) width: Option<usize>,

    #[clap(long, help = HEIGHT_HELP.as_str(), help_heading = "GRID")]
    pub(super) height: Option<usize>,

    #[clap(long, help = NUM_OUTPUT_POLS_HELP.as_str(), help_heading = "GRID")]
    pub(super) num_output_polarizations: Option<usize>,

    #[clap(long, help = NUM_OUTPUT_CHANS_HELP.as_str(), help_heading = "GRID")]
    pub(super) num_output_channels: Option<usize>,

    /// Only accumulate weights; the grid itself stays zero.
    #[clap(long, help_heading = "GRIDDING")]
    #[serde(default)]
    pub(super) weight_only: bool,

    /// Grid in parallel over this many threads. If not given, gridding is
    /// serial.
    #[clap(short = 'j', long, help_heading = "GRIDDING")]
    pub(super) num_threads: Option<usize>,
}

impl GridArgs {
    /// Prefer our arguments over `other`'s.
    pub(super) fn merge(self, other: Self) -> Self {
        Self {
            kernel: self.kernel.or(other.kernel),
            support: self.support.or(other.support),
            sampling: self.sampling.or(other.sampling),
            width: self.width.or(other.width),
            height: self.height.or(other.height),
            num_output_polarizations: self
                .num_output_polarizations
                .or(other.num_output_polarizations),
            num_output_channels: self.num_output_channels.or(other.num_output_channels),
            weight_only: self.weight_only || other.weight_only,
            num_threads: self.num_threads.or(other.num_threads),
        }
    }

    /// Apply defaults and validate.
    pub(super) fn parse(self) -> Result<GridConfig, SdgridCliError> {
        let GridArgs {
            kernel,
            support,
            sampling,
            width,
            height,
            num_output_polarizations,
            num_output_channels,
            weight_only,
            num_threads,
        } = self;

        let kernel = match kernel {
            Some(k) => KernelKind::parse(&k)?,
            None => DEFAULT_KERNEL,
        };
        let config = GridConfig {
            kernel,
            support: support.unwrap_or(DEFAULT_SUPPORT),
            sampling: sampling.unwrap_or(DEFAULT_SAMPLING),
            width: width.unwrap_or(DEFAULT_WIDTH),
            height: height.unwrap_or(DEFAULT_HEIGHT),
            num_output_polarizations: num_output_polarizations
                .unwrap_or(DEFAULT_NUM_OUTPUT_POLARIZATIONS),
            num_output_channels: num_output_channels.unwrap_or(DEFAULT_NUM_OUTPUT_CHANNELS),
            weight_only,
            num_threads,
        };
        config.validate()?;
        debug!("Gridding configuration: {config:?}");
        Ok(config)
    }
}
