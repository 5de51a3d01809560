// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::buffer::is_aligned;

#[test]
fn test_table_len() {
    // ceil(sqrt(2) * 3 * 1) = ceil(4.24...)
    assert_eq!(table_len(2, 1), 5);
    // ceil(sqrt(2) * 4 * 100) = ceil(565.68...)
    assert_eq!(table_len(3, 100), 566);
    assert_eq!(table_len(0, 10), 15);
}

#[test]
fn test_pillbox() {
    let mut table = [f32::NAN; 5];
    build_table(KernelKind::Pillbox, 2, 1, &mut table).unwrap();
    assert_eq!(table, [1.0, 0.0, 0.0, 0.0, 0.0]);

    let table = ConvolutionTable::new(KernelKind::Pillbox, 3, 4).unwrap();
    // Distances 0, 0.25 and 0.5 are inside.
    assert_eq!(&table.as_slice()[..4], &[1.0, 1.0, 1.0, 0.0]);
    assert!(table.as_slice()[3..].iter().all(|&v| v == 0.0));
}

#[test]
fn test_gaussian() {
    let support = 3;
    let sampling = 100;
    let table = ConvolutionTable::new(KernelKind::Gaussian, support, sampling).unwrap();
    let t = table.as_slice();
    assert_eq!(t.len(), table_len(support, sampling));
    assert_abs_diff_eq!(t[0], 1.0);
    // Half maximum at half the support.
    assert_abs_diff_eq!(t[150], 0.5, epsilon = 1e-6);
    assert!(t.windows(2).all(|w| w[1] <= w[0]));
    assert!(t.iter().all(|v| v.is_finite() && *v >= 0.0));
}

#[test]
fn test_spheroidal() {
    let support = 3;
    let sampling = 10;
    let table = ConvolutionTable::new(KernelKind::Spheroidal, support, sampling).unwrap();
    let t = table.as_slice();
    assert_abs_diff_eq!(t[0], 1.0, epsilon = 1e-3);
    // Zero from the edge of the support onwards.
    assert!(t[support * sampling..].iter().all(|&v| v == 0.0));
    assert!(t[..support * sampling].iter().all(|&v| v > 0.0));
    assert!(t.windows(2).all(|w| w[1] <= w[0]));

    // Both halves of the approximation meet at nu = 0.75.
    assert_abs_diff_eq!(spheroidal(0.75 - 1e-9), spheroidal(0.75), epsilon = 1e-4);
    assert_eq!(spheroidal(1.5), 0.0);
}

#[test]
fn test_hanning_and_hamming() {
    let support = 2;
    let sampling = 2;
    let hanning = ConvolutionTable::new(KernelKind::Hanning, support, sampling).unwrap();
    let hamming = ConvolutionTable::new(KernelKind::Hamming, support, sampling).unwrap();
    assert_abs_diff_eq!(hanning.as_slice()[0], 1.0);
    assert_abs_diff_eq!(hamming.as_slice()[0], 1.0);
    // Halfway to the edge of the window (r = 1.5 of 3).
    assert_abs_diff_eq!(hanning.as_slice()[3], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(hamming.as_slice()[3], 0.54, epsilon = 1e-6);
    // At and beyond support + 1.
    assert_eq!(hanning.as_slice()[6], 0.0);
    assert_eq!(hamming.as_slice()[6], 0.0);
}

#[test]
fn test_table_is_aligned() {
    for kind in KernelKind::iter() {
        let table = ConvolutionTable::new(kind, 5, 7).unwrap();
        assert!(is_aligned(table.values().as_ptr()));
        assert_eq!(table.kind(), kind);
        assert_eq!(table.support(), 5);
        assert_eq!(table.sampling(), 7);
        assert_eq!(table.into_values().len(), table_len(5, 7));
    }
}

#[test]
fn test_bad_parameters() {
    let mut table = [0.0; 20];
    assert_eq!(
        build_table(KernelKind::Gaussian, 0, 1, &mut table),
        Err(ConvTableError::ZeroSupport)
    );
    assert_eq!(
        build_table(KernelKind::Gaussian, 1, 0, &mut table),
        Err(ConvTableError::ZeroSampling)
    );
    assert_eq!(
        build_table(KernelKind::Gaussian, 2, 1, &mut table),
        Err(ConvTableError::ShapeMismatch {
            support: 2,
            sampling: 1,
            expected: 5,
            actual: 20
        })
    );
    assert!(matches!(
        ConvolutionTable::new(KernelKind::Spheroidal, 0, 100),
        Err(ConvTableError::ZeroSupport)
    ));
}

#[test]
fn test_kernel_names() {
    for kind in KernelKind::iter() {
        assert_eq!(KernelKind::parse(&kind.to_string()).unwrap(), kind);
    }
    assert_eq!(KernelKind::parse("BOX").unwrap(), KernelKind::Pillbox);
    assert_eq!(KernelKind::parse("sf").unwrap(), KernelKind::Spheroidal);
    assert_eq!(KernelKind::parse(" Gaussian ").unwrap(), KernelKind::Gaussian);

    let err = KernelKind::parse("gjinc").unwrap_err();
    assert_eq!(err, ConvTableError::UnsupportedKernel("gjinc".to_string()));
    assert!(err.to_string().contains("gaussian, pillbox, spheroidal"));
}

#[test]
fn test_huge_support_is_an_error() {
    // The length saturates instead of overflowing.
    assert_eq!(table_len(usize::MAX, 1), usize::MAX);
    assert!(table_len(usize::MAX / 2, 3) > usize::MAX / 2);

    let mut table = [0.0; 5];
    assert_eq!(
        build_table(KernelKind::Pillbox, usize::MAX, 1, &mut table),
        Err(ConvTableError::TooLarge {
            support: usize::MAX,
            sampling: 1
        })
    );
    assert!(matches!(
        ConvolutionTable::new(KernelKind::Pillbox, usize::MAX, 1),
        Err(ConvTableError::TooLarge { .. })
    ));
    assert!(matches!(
        ConvolutionTable::new(KernelKind::Gaussian, 1, usize::MAX / 2),
        Err(ConvTableError::TooLarge { .. })
    ));
}
