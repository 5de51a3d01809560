// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use indoc::indoc;

use super::*;
use crate::gridding::GridError;

#[test]
fn test_default_is_valid() {
    let config = GridConfig::default();
    assert!(config.validate().is_ok());
    let table = config.convolution_table().unwrap();
    assert_eq!(table.kind(), DEFAULT_KERNEL);
    assert_eq!(
        config.geometry().grid_shape(),
        [DEFAULT_HEIGHT, DEFAULT_WIDTH, 1, 1]
    );
}

#[test]
fn test_partial_toml() {
    let config: GridConfig = toml::from_str(indoc! {r#"
        kernel = "gaussian"
        support = 5
        width = 100
        weight_only = true
    "#})
    .unwrap();
    assert_eq!(config.kernel, KernelKind::Gaussian);
    assert_eq!(config.support, 5);
    assert_eq!(config.width, 100);
    assert!(config.weight_only);
    // Everything else is defaulted.
    assert_eq!(config.sampling, DEFAULT_SAMPLING);
    assert_eq!(config.height, DEFAULT_HEIGHT);
    assert_eq!(config.num_threads, None);
}

#[test]
fn test_json_with_alias() {
    let config: GridConfig = serde_json::from_str(indoc! {r#"
        {
            "kernel": "box",
            "num_output_channels": 8,
            "num_threads": 2
        }
    "#})
    .unwrap();
    assert_eq!(config.kernel, KernelKind::Pillbox);
    assert_eq!(config.num_output_channels, 8);
    assert_eq!(config.num_threads, Some(2));
}

#[test]
fn test_toml_round_trip() {
    let config = GridConfig {
        kernel: KernelKind::Hamming,
        num_threads: Some(3),
        ..Default::default()
    };
    let s = toml::to_string(&config).unwrap();
    assert!(s.contains(r#"kernel = "hamming""#));
    let parsed: GridConfig = toml::from_str(&s).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_unknown_kernel_is_rejected() {
    let result: Result<GridConfig, _> = toml::from_str(r#"kernel = "gjinc""#);
    assert!(result.is_err());
}

#[test]
fn test_invalid_configs() {
    let config = GridConfig {
        support: 0,
        ..Default::default()
    };
    assert_eq!(
        config.validate(),
        Err(ConfigError::ConvTable(ConvTableError::ZeroSupport))
    );

    let config = GridConfig {
        support: usize::MAX,
        ..Default::default()
    };
    assert!(matches!(
        config.convolution_table(),
        Err(ConfigError::ConvTable(ConvTableError::TooLarge { .. }))
    ));

    let config = GridConfig {
        sampling: 0,
        ..Default::default()
    };
    assert!(matches!(
        config.convolution_table(),
        Err(ConfigError::ConvTable(ConvTableError::ZeroSampling))
    ));

    let config = GridConfig {
        height: 0,
        ..Default::default()
    };
    assert_eq!(
        config.validate(),
        Err(ConfigError::Grid(GridError::ZeroDimension { name: "height" }))
    );

    let config = GridConfig {
        num_threads: Some(0),
        ..Default::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::ZeroThreads));
}
