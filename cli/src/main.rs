// Copyright 2023 Viktor Reusch
//
// This file is part of stops_kml_convert.
//
// stops_kml_convert is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// stops_kml_convert is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with stops_kml_convert. If not, see <https://www.gnu.org/licenses/>.

//! This is a very simple command-line interface for the stops-to-KML
//! converter.

use std::{path::Path, process::ExitCode};

use log::{error, info};

use stops_kml_convert::convert_files;

/// Default path of the stops JSON input file.
const INPUT_PATH: &str = "./stops.json";
/// Default path of the KML output file.
const OUTPUT_PATH: &str = "./stops.kml";

/// Currently, this simply converts `./stops.json` to `./stops.kml`.
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match convert_files(Path::new(INPUT_PATH), Path::new(OUTPUT_PATH)) {
        Ok(converted) => {
            info!("converted {converted} stops from {INPUT_PATH} to {OUTPUT_PATH}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("conversion failed with: {err}");
            ExitCode::FAILURE
        }
    }
}
