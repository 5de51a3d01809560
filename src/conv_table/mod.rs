// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Radially-symmetric convolution kernels, tabulated at a fixed oversampling.
//!
//! Entry `i` of a table holds the kernel value at a radial distance of
//! `i / sampling` grid pixels. A table for a kernel with `support` pixels has
//! [`table_len`] entries, which is enough to cover the corner of the
//! `(2 * support + 1)`-pixel-wide footprint used by the gridder.

mod error;
#[cfg(test)]
mod tests;

pub use error::ConvTableError;

use std::f64::consts::{LN_2, PI, SQRT_2};
use std::str::FromStr;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::buffer::AlignedBuffer;

/// The convolution kernels that we know how to tabulate.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumIter,
    strum_macros::EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum KernelKind {
    /// A Gaussian whose half width at half maximum is half of the support.
    #[strum(serialize = "gaussian")]
    Gaussian,

    /// Unity within half a pixel of the centre, zero elsewhere.
    #[strum(to_string = "pillbox", serialize = "box")]
    #[serde(alias = "box")]
    Pillbox,

    /// The prolate spheroidal wave function (Schwab's rational approximation)
    /// multiplied by `1 - nu^2`, where `nu` is the distance as a fraction of
    /// the support.
    #[strum(to_string = "spheroidal", serialize = "sf")]
    #[serde(alias = "sf")]
    Spheroidal,

    #[strum(serialize = "hanning")]
    Hanning,

    #[strum(serialize = "hamming")]
    Hamming,
}

lazy_static::lazy_static! {
    pub static ref KERNEL_KINDS_COMMA_SEPARATED: String = KernelKind::iter().join(", ");
}

impl KernelKind {
    /// Parse a kernel name (case insensitive, aliases accepted).
    pub fn parse(name: &str) -> Result<KernelKind, ConvTableError> {
        KernelKind::from_str(name.trim())
            .map_err(|_| ConvTableError::UnsupportedKernel(name.to_string()))
    }

    /// The kernel's value at a radial distance of `r` grid pixels.
    pub fn evaluate(self, r: f64, support: usize) -> f64 {
        let support = support as f64;
        match self {
            KernelKind::Gaussian => {
                let hwhm = support / 2.0;
                (-LN_2 * (r / hwhm).powi(2)).exp()
            }

            KernelKind::Pillbox => {
                if r <= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }

            KernelKind::Spheroidal => {
                let nu = r / support;
                if nu >= 1.0 {
                    0.0
                } else {
                    (1.0 - nu * nu) * spheroidal(nu)
                }
            }

            KernelKind::Hanning | KernelKind::Hamming => {
                let width = support + 1.0;
                if r >= width {
                    return 0.0;
                }
                let a = if self == KernelKind::Hanning { 0.5 } else { 0.54 };
                a + (1.0 - a) * (PI * r / width).cos()
            }
        }
    }
}

/// Schwab's rational approximation to the zeroth-order prolate spheroidal
/// wave function with m = 6, alpha = 1, for `0 <= nu <= 1`.
fn spheroidal(nu: f64) -> f64 {
    const P: [[f64; 5]; 2] = [
        [8.203343e-2, -3.644705e-1, 6.278660e-1, -5.335581e-1, 2.312756e-1],
        [4.028559e-3, -3.697768e-2, 1.021332e-1, -1.201436e-1, 6.412774e-2],
    ];
    const Q: [[f64; 3]; 2] = [[1.0, 8.212018e-1, 2.078043e-1], [1.0, 9.599102e-1, 2.918724e-1]];

    let (part, nu_end) = if nu < 0.75 {
        (0, 0.75)
    } else if nu <= 1.0 {
        (1, 1.0)
    } else {
        return 0.0;
    };
    let del_nu_sq = nu * nu - nu_end * nu_end;
    let top = P[part].iter().rev().fold(0.0, |acc, p| acc * del_nu_sq + p);
    let bottom = Q[part].iter().rev().fold(0.0, |acc, q| acc * del_nu_sq + q);
    if bottom > 0.0 {
        top / bottom
    } else {
        0.0
    }
}

/// The number of entries in a table for a kernel with the given support and
/// sampling: `ceil(sqrt(2) * (support + 1) * sampling)`. Saturates at
/// `usize::MAX`.
pub fn table_len(support: usize, sampling: usize) -> usize {
    table_len_f64(support, sampling) as usize
}

fn table_len_f64(support: usize, sampling: usize) -> f64 {
    ((support as f64 + 1.0) * SQRT_2 * sampling as f64).ceil()
}

/// [`table_len`], but an error if no buffer of `f32`s could be that long.
fn checked_table_len(support: usize, sampling: usize) -> Result<usize, ConvTableError> {
    let max_len = isize::MAX as usize / std::mem::size_of::<f32>();
    let len = table_len_f64(support, sampling);
    if len > max_len as f64 {
        return Err(ConvTableError::TooLarge { support, sampling });
    }
    Ok(len as usize)
}

/// Fill `output` with the tabulated kernel. `output` must have exactly
/// [`table_len`] elements.
pub fn build_table(
    kind: KernelKind,
    support: usize,
    sampling: usize,
    output: &mut [f32],
) -> Result<(), ConvTableError> {
    if support == 0 {
        return Err(ConvTableError::ZeroSupport);
    }
    if sampling == 0 {
        return Err(ConvTableError::ZeroSampling);
    }
    let expected = checked_table_len(support, sampling)?;
    if output.len() != expected {
        return Err(ConvTableError::ShapeMismatch {
            support,
            sampling,
            expected,
            actual: output.len(),
        });
    }

    let sampling_f = sampling as f64;
    output.iter_mut().enumerate().for_each(|(i, o)| {
        *o = kind.evaluate(i as f64 / sampling_f, support) as f32;
    });
    Ok(())
}

/// A tabulated kernel in its own aligned buffer, together with the parameters
/// that made it.
#[derive(Debug, Clone)]
pub struct ConvolutionTable {
    kind: KernelKind,
    support: usize,
    sampling: usize,
    values: AlignedBuffer<f32>,
}

impl ConvolutionTable {
    pub fn new(
        kind: KernelKind,
        support: usize,
        sampling: usize,
    ) -> Result<ConvolutionTable, ConvTableError> {
        // Check the parameters before sizing the allocation.
        if support == 0 {
            return Err(ConvTableError::ZeroSupport);
        }
        if sampling == 0 {
            return Err(ConvTableError::ZeroSampling);
        }
        let len = checked_table_len(support, sampling)?;
        let mut values = AlignedBuffer::uninitialized(&[len])?;
        build_table(kind, support, sampling, &mut values)?;
        debug!("Built a {kind} convolution table with support {support}, sampling {sampling} ({len} entries)");

        Ok(ConvolutionTable {
            kind,
            support,
            sampling,
            values,
        })
    }

    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    pub fn support(&self) -> usize {
        self.support
    }

    pub fn sampling(&self) -> usize {
        self.sampling
    }

    pub fn values(&self) -> &AlignedBuffer<f32> {
        &self.values
    }

    pub fn as_slice(&self) -> &[f32] {
        self.values.as_slice()
    }

    /// Consume the table, keeping only its values.
    pub fn into_values(self) -> AlignedBuffer<f32> {
        self.values
    }
}
