// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Drive the library the way an external caller would: allocate buffers,
//! build masks, tabulate a kernel and grid.

use approx::assert_abs_diff_eq;

use sdgrid::{
    buffer::Scalars, conv_table::build_table, conv_table::table_len, grid_convolving, mask,
    AlignedBuffer, AnyBuffer, ConvolutionTable, ElementType, InitPolicy, KernelKind,
};

const WIDTH: usize = 10;
const HEIGHT: usize = 10;

struct Outputs {
    weight_sum: AlignedBuffer<f64>,
    weight_of_grid: AlignedBuffer<f32>,
    grid: AlignedBuffer<f32>,
}

impl Outputs {
    fn new() -> Outputs {
        Outputs {
            weight_sum: AlignedBuffer::zeros(&[1, 1]).unwrap(),
            weight_of_grid: AlignedBuffer::zeros(&[HEIGHT, WIDTH, 1, 1]).unwrap(),
            grid: AlignedBuffer::zeros(&[HEIGHT, WIDTH, 1, 1]).unwrap(),
        }
    }

    /// Index into a `[HEIGHT, WIDTH, 1, 1]` output.
    fn at(y: usize, x: usize) -> usize {
        y * WIDTH + x
    }
}

#[test]
fn test_buffers_to_grid() {
    let (n, p, c) = (3, 2, 2);

    // Spectrum 2 is flagged.
    let spectrum_flags = AlignedBuffer::<i8>::from_values(&[n], &[0, 0, 1]).unwrap();
    let mut spectrum_mask = mask::to_boolean(&spectrum_flags).unwrap();
    mask::invert_in_place(&mut spectrum_mask);

    let x = AlignedBuffer::<f64>::from_values(&[n], &[5.0, 2.0, 5.0]).unwrap();
    let y = AlignedBuffer::<f64>::from_values(&[n], &[5.0, 7.0, 5.0]).unwrap();

    #[rustfmt::skip]
    let value = AlignedBuffer::<f32>::from_values(&[n, p, c], &[
        1.0, f32::NAN,
        3.0, 4.0,

        10.0, 20.0,
        30.0, 40.0,

        100.0, 100.0,
        100.0, 100.0,
    ]).unwrap();
    #[rustfmt::skip]
    let flags = AlignedBuffer::<i32>::from_values(&[n, p, c], &[
        0, 0,
        0, 0,

        0, 0,
        1, 0,

        0, 0,
        0, 0,
    ]).unwrap();
    let element_mask = mask::logical_and(
        &mask::mask_invalid(&value).unwrap(),
        &mask::invert(&mask::to_boolean(&flags).unwrap()).unwrap(),
    )
    .unwrap();
    assert_eq!(
        element_mask.as_slice(),
        &[true, false, true, true, true, true, false, true, true, true, true, true]
    );

    let weight =
        AlignedBuffer::<f32>::from_values(&[n, c], &[1.0, 1.0, 1.0, 2.0, 1.0, 1.0]).unwrap();

    // Both polarizations and both channels go to one output plane.
    let polarization_map = AlignedBuffer::<i32>::from_values(&[p], &[0, 0]).unwrap();
    let channel_map = AlignedBuffer::<i32>::from_values(&[c], &[0, 0]).unwrap();

    // Only the pixel containing a sample is touched.
    let (support, sampling) = (1, 4);
    let table = ConvolutionTable::new(KernelKind::Pillbox, support, sampling)
        .unwrap()
        .into_values();

    let mut out = Outputs::new();
    grid_convolving(
        n,
        0,
        n,
        &spectrum_mask,
        &x,
        &y,
        support,
        sampling,
        p,
        &polarization_map,
        c,
        &channel_map,
        &element_mask,
        &value,
        &weight,
        false,
        &table,
        1,
        1,
        WIDTH,
        HEIGHT,
        &mut out.weight_sum,
        &mut out.weight_of_grid,
        &mut out.grid,
    )
    .unwrap();

    // Spectrum 0: 1 + 3 + 4 with three unit weights.
    assert_abs_diff_eq!(out.grid[Outputs::at(5, 5)], 8.0);
    assert_abs_diff_eq!(out.weight_of_grid[Outputs::at(5, 5)], 3.0);
    // Spectrum 1: 10 + 2 * (20 + 40).
    assert_abs_diff_eq!(out.grid[Outputs::at(7, 2)], 130.0);
    assert_abs_diff_eq!(out.weight_of_grid[Outputs::at(7, 2)], 5.0);
    assert_abs_diff_eq!(out.weight_sum[0], 8.0);

    let touched = out.weight_of_grid.iter().filter(|&&w| w != 0.0).count();
    assert_eq!(touched, 2);

    // A second pass over spectrum 1 alone accumulates.
    grid_convolving(
        n,
        1,
        2,
        &spectrum_mask,
        &x,
        &y,
        support,
        sampling,
        p,
        &polarization_map,
        c,
        &channel_map,
        &element_mask,
        &value,
        &weight,
        true,
        &table,
        1,
        1,
        WIDTH,
        HEIGHT,
        &mut out.weight_sum,
        &mut out.weight_of_grid,
        &mut out.grid,
    )
    .unwrap();
    assert_abs_diff_eq!(out.grid[Outputs::at(7, 2)], 130.0);
    assert_abs_diff_eq!(out.weight_of_grid[Outputs::at(7, 2)], 10.0);
    assert_abs_diff_eq!(out.weight_sum[0], 13.0);
}

#[test]
fn test_type_erased_buffers() {
    let (support, sampling) = (3, 16);
    let len = table_len(support, sampling);
    let mut table =
        AnyBuffer::allocate(ElementType::Float, &[len], InitPolicy::Uninitialized).unwrap();
    assert_eq!(table.element_type(), ElementType::Float);
    build_table(
        KernelKind::Spheroidal,
        support,
        sampling,
        table.downcast_mut::<f32>().unwrap(),
    )
    .unwrap();

    let from_owned = ConvolutionTable::new(KernelKind::Spheroidal, support, sampling).unwrap();
    let table = table.into_typed::<f32>().unwrap();
    assert_eq!(table.as_slice(), from_owned.as_slice());

    let flags = [0_i32, 3, 0, -1];
    let flags = AnyBuffer::allocate(
        ElementType::Int32,
        &[4],
        InitPolicy::FromValues(Scalars::from(&flags[..])),
    )
    .unwrap();
    let mask = mask::to_boolean(flags.downcast_ref::<i32>().unwrap()).unwrap();
    assert_eq!(mask.as_slice(), &[false, true, false, true]);
    assert!(flags.downcast_ref::<f64>().is_none());
}
