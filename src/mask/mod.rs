// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Elementwise kernels that build the boolean masks consumed by the gridder.
//!
//! Each kernel comes in two flavours: one that writes into a caller-supplied
//! slice (`*_into`), and one that allocates and returns a new
//! [`AlignedBuffer`] with the same shape as its (first) input. Input and
//! output lengths must always agree.
//!
//! Note that "masks" here follow the convention of the gridder: `true` means
//! "use this datum".

mod error;

pub use error::MaskError;

use num_traits::{Float, Zero};

use crate::buffer::{AlignedBuffer, Element};

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), MaskError> {
    if expected != actual {
        return Err(MaskError::ShapeMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

/// `output[i]` is true iff `input[i]` is non-zero.
pub fn to_boolean_into<T>(input: &[T], output: &mut [bool]) -> Result<(), MaskError>
where
    T: Element + Zero,
{
    check_len("output", input.len(), output.len())?;
    output
        .iter_mut()
        .zip(input)
        .for_each(|(o, i)| *o = !i.is_zero());
    Ok(())
}

/// Convert an integer (or float) buffer to a boolean buffer; elements are true
/// iff they are non-zero.
pub fn to_boolean<T>(input: &AlignedBuffer<T>) -> Result<AlignedBuffer<bool>, MaskError>
where
    T: Element + Zero,
{
    let mut output = AlignedBuffer::uninitialized(input.shape())?;
    to_boolean_into(input, &mut output)?;
    Ok(output)
}

/// `output[i] = a[i] && b[i]`.
pub fn logical_and_into(a: &[bool], b: &[bool], output: &mut [bool]) -> Result<(), MaskError> {
    check_len("second operand", a.len(), b.len())?;
    check_len("output", a.len(), output.len())?;
    output
        .iter_mut()
        .zip(a.iter().zip(b))
        .for_each(|(o, (&a, &b))| *o = a && b);
    Ok(())
}

/// Logical AND of two boolean buffers.
pub fn logical_and(
    a: &AlignedBuffer<bool>,
    b: &AlignedBuffer<bool>,
) -> Result<AlignedBuffer<bool>, MaskError> {
    let mut output = AlignedBuffer::uninitialized(a.shape())?;
    logical_and_into(a, b, &mut output)?;
    Ok(output)
}

/// `output[i] = !input[i]`.
pub fn invert_into(input: &[bool], output: &mut [bool]) -> Result<(), MaskError> {
    check_len("output", input.len(), output.len())?;
    output.iter_mut().zip(input).for_each(|(o, &i)| *o = !i);
    Ok(())
}

/// Logical NOT of a boolean buffer.
pub fn invert(input: &AlignedBuffer<bool>) -> Result<AlignedBuffer<bool>, MaskError> {
    let mut output = AlignedBuffer::uninitialized(input.shape())?;
    invert_into(input, &mut output)?;
    Ok(output)
}

pub fn invert_in_place(data: &mut [bool]) {
    data.iter_mut().for_each(|d| *d = !*d);
}

/// `output[i]` is false wherever `input[i]` is NaN or infinite.
pub fn mask_invalid_into<T>(input: &[T], output: &mut [bool]) -> Result<(), MaskError>
where
    T: Element + Float,
{
    check_len("output", input.len(), output.len())?;
    output
        .iter_mut()
        .zip(input)
        .for_each(|(o, i)| *o = i.is_finite());
    Ok(())
}

/// Get a validity mask for a float buffer: elements are false wherever the
/// input is NaN or infinite.
pub fn mask_invalid<T>(input: &AlignedBuffer<T>) -> Result<AlignedBuffer<bool>, MaskError>
where
    T: Element + Float,
{
    let mut output = AlignedBuffer::uninitialized(input.shape())?;
    mask_invalid_into(input, &mut output)?;
    Ok(output)
}

fn check_ranges<T: PartialOrd>(lower: &[T], upper: &[T]) -> Result<(), MaskError> {
    if lower.len() != upper.len() {
        return Err(MaskError::RangeCountMismatch {
            lower: lower.len(),
            upper: upper.len(),
        });
    }
    if let Some(index) = lower.iter().zip(upper).position(|(l, u)| l > u) {
        return Err(MaskError::InvertedRange { index });
    }
    Ok(())
}

fn mark_in_ranges_into<T, F>(
    data: &[T],
    lower: &[T],
    upper: &[T],
    output: &mut [bool],
    inside: F,
) -> Result<(), MaskError>
where
    T: Element + PartialOrd,
    F: Fn(&T, &T, &T) -> bool,
{
    check_len("output", data.len(), output.len())?;
    check_ranges(lower, upper)?;
    output.iter_mut().zip(data).for_each(|(o, d)| {
        *o = lower.iter().zip(upper).any(|(l, u)| inside(d, l, u));
    });
    Ok(())
}

/// `output[i]` is true wherever `lower[k] < data[i] < upper[k]` for at least
/// one `k`.
pub fn mark_in_ranges_exclusive_into<T>(
    data: &[T],
    lower: &[T],
    upper: &[T],
    output: &mut [bool],
) -> Result<(), MaskError>
where
    T: Element + PartialOrd,
{
    mark_in_ranges_into(data, lower, upper, output, |d, l, u| l < d && d < u)
}

/// Mark the elements of `data` that lie strictly inside any of the ranges
/// `(lower[k], upper[k])`.
pub fn mark_in_ranges_exclusive<T>(
    data: &AlignedBuffer<T>,
    lower: &[T],
    upper: &[T],
) -> Result<AlignedBuffer<bool>, MaskError>
where
    T: Element + PartialOrd,
{
    let mut output = AlignedBuffer::uninitialized(data.shape())?;
    mark_in_ranges_exclusive_into(data, lower, upper, &mut output)?;
    Ok(output)
}

/// `output[i]` is true wherever `lower[k] <= data[i] <= upper[k]` for at least
/// one `k`.
pub fn mark_in_ranges_inclusive_into<T>(
    data: &[T],
    lower: &[T],
    upper: &[T],
    output: &mut [bool],
) -> Result<(), MaskError>
where
    T: Element + PartialOrd,
{
    mark_in_ranges_into(data, lower, upper, output, |d, l, u| l <= d && d <= u)
}

/// Mark the elements of `data` that lie inside (or on the edge of) any of the
/// ranges `[lower[k], upper[k]]`.
pub fn mark_in_ranges_inclusive<T>(
    data: &AlignedBuffer<T>,
    lower: &[T],
    upper: &[T],
) -> Result<AlignedBuffer<bool>, MaskError>
where
    T: Element + PartialOrd,
{
    let mut output = AlignedBuffer::uninitialized(data.shape())?;
    mark_in_ranges_inclusive_into(data, lower, upper, &mut output)?;
    Ok(output)
}
