// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Print a file's header and its features, optionally limited to a rectangle.
//!
//! ```text
//! cargo run -p flatfeature_reader --example dump -- layer.ffb [min_x min_y max_x max_y]
//! ```

use std::process::ExitCode;

use flatfeature_reader::{Aabb2D, FeatureRequest, Provider};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(path) = args.first() else {
        eprintln!("usage: dump <file> [min_x min_y max_x max_y]");
        return ExitCode::FAILURE;
    };

    let provider = Provider::new(path);
    if let Some(err) = provider.error() {
        eprintln!("{path}: {err}");
        return ExitCode::FAILURE;
    }
    println!(
        "{} ({}): {} {} features, extent {:?}",
        provider.layer_name().unwrap_or_default(),
        provider.storage_type(),
        provider.feature_count(),
        provider.geometry_type(),
        provider.extent(),
    );

    let mut request = FeatureRequest::new();
    if args.len() == 5 {
        let v: Result<Vec<f64>, _> = args[1..].iter().map(|a| a.parse::<f64>()).collect();
        match v.as_deref() {
            Ok(&[min_x, min_y, max_x, max_y]) => {
                request = request.with_filter_rect(Aabb2D::new(min_x, min_y, max_x, max_y));
            }
            _ => {
                eprintln!("rectangle must be four numbers");
                return ExitCode::FAILURE;
            }
        }
    }

    let Some(features) = provider.features(request) else {
        return ExitCode::FAILURE;
    };
    for feature in features {
        match feature {
            Ok(f) => println!(
                "{:>8} {:<16} {:?} {} attribute bytes",
                f.fid,
                f.geometry.geometry_type().to_string(),
                f.geometry.bounds(),
                f.attributes.len()
            ),
            Err(e) => {
                eprintln!("read failed: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
