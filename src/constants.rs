// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

Defaults here are used when neither the command line nor an argument file say
otherwise.
 */

use crate::conv_table::KernelKind;

pub const DEFAULT_KERNEL: KernelKind = KernelKind::Spheroidal;

/// The kernel support \[grid pixels\].
pub const DEFAULT_SUPPORT: usize = 3;

/// The number of table entries per grid pixel.
pub const DEFAULT_SAMPLING: usize = 100;

pub const DEFAULT_WIDTH: usize = 64;

pub const DEFAULT_HEIGHT: usize = 64;

pub const DEFAULT_NUM_OUTPUT_POLARIZATIONS: usize = 1;

pub const DEFAULT_NUM_OUTPUT_CHANNELS: usize = 1;
