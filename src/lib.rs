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

//! Library for converting stop registries from JSON to
//! [KML](https://developers.google.com/kml).
//!
//! It reads in named stop positions, grouped by region, and converts them to
//! KML placemarks for visualization.
//!
//! See [`convert`] for information on how to use this library.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

use kml::types::{Coord, Geometry, Placemark, Point};
use kml::{types::Element, Kml, KmlDocument, KmlVersion, KmlWriter};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// This line needs to be prepended to the KML output.
const XML_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
/// Namespace attributes for the `<kml>` tag.
const NAMESPACES: &[(&str, &str)] = &[("xmlns", "http://www.opengis.net/kml/2.2")];
/// Name of the main KML _Document_.
const DOCUMENT_NAME: &str = "Telegram Locations";

/// Region group converted by [`convert`] and [`convert_files`].
pub const DEFAULT_REGION: &str = "0";

/// Use double precision for coordinate values.
type CoordValue = f64;

/// A single stop record from the registry.
///
/// Additional fields on a record are tolerated and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Stop {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Human-readable stop name, if the registry carries one.
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

/// Deserialize an optional string, discarding values of any other type.
///
/// Only `lat` and `lon` are required on a record; a `name` of the wrong type
/// must not reject it.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(name) => Some(name),
        _ => None,
    })
}

/// Error returned from the conversion functions.
#[derive(Error, Debug)]
pub enum Error {
    /// JSON reading failed.
    #[error("reading JSON failed: {0}")]
    Json(#[from] serde_json::Error),
    /// The requested region group is absent from the input document.
    #[error("region {0:?} not found in the input")]
    MissingRegion(String),
    /// The region group is not an object mapping identifiers to stops.
    #[error("region {region:?} is malformed: {source}")]
    MalformedRegion {
        region: String,
        source: serde_json::Error,
    },
    /// A stop record lacks `lat`/`lon` or carries non-numeric values.
    #[error("stop {id:?} is malformed: {source}")]
    MalformedStop {
        id: String,
        source: serde_json::Error,
    },
    /// KML writing failed.
    #[error("writing KML failed: {0}")]
    Kml(#[from] kml::Error),
    /// Reading the input file or writing the output file failed.
    #[error("file access failed: {0}")]
    Io(#[from] io::Error),
}

/// Read a stops JSON file and write a KML file.
///
/// A complete stops document is read from `source` and the [`DEFAULT_REGION`]
/// group is extracted. The converted data is written as a complete KML file
/// to `sink`. Returns the number of placemarks written.
///
/// If an error occurs, the function returns immediately. The `source` and
/// `sink` might have been modified in this case.
///
/// # Example
/// ```
/// # use stops_kml_convert::convert;
/// #
/// let source = r#"{
///     "0": {
///         "42": { "lat": 51.5, "lon": -0.12 }
///     }
/// }"#;
/// let mut sink = vec![];
///
/// let converted = convert(source.as_bytes(), &mut sink).expect("conversion failed");
///
/// let kml = String::from_utf8(sink).expect("KML data is not valid UTF-8");
/// assert_eq!(converted, 1);
/// assert!(kml.contains("<kml"));
/// assert!(kml.contains("<name>42</name>"));
/// assert!(kml.contains("-0.12,51.5"));
/// ```
pub fn convert(source: impl Read, sink: impl io::Write) -> Result<usize, Error> {
    convert_region(source, sink, DEFAULT_REGION)
}

/// Read a stops JSON file and write a KML file for one region group.
///
/// Like [`convert`] but extracting the group under the given `region` key
/// instead of [`DEFAULT_REGION`].
pub fn convert_region(
    source: impl Read,
    mut sink: impl io::Write,
    region: &str,
) -> Result<usize, Error> {
    let stops = read_stops(source, region)?;
    let converted = stops.len();

    let mut elements = vec![simple_kelem("name", DOCUMENT_NAME)];
    for (id, stop) in stops {
        elements.push(convert_stop(id, stop));
    }

    let document = Kml::Document {
        elements,
        attrs: Default::default(),
    };
    let namespaces = NAMESPACES
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let kml = Kml::<CoordValue>::KmlDocument(KmlDocument {
        version: KmlVersion::V22,
        attrs: namespaces,
        elements: vec![document],
    });

    writeln!(&mut sink, "{XML_HEAD}")?;
    let mut writer = KmlWriter::from_writer(&mut sink);
    writer.write(&kml)?;
    writeln!(&mut sink)?;

    Ok(converted)
}

/// Convert the stops JSON file at `input` to a KML file at `output`.
///
/// The KML document is built in memory first. `output` is only created (or
/// overwritten) after the conversion succeeded, so a malformed input does
/// not clobber an existing file. Returns the number of placemarks written.
pub fn convert_files(input: &Path, output: &Path) -> Result<usize, Error> {
    let source = BufReader::new(File::open(input)?);
    let mut sink = vec![];
    let converted = convert(source, &mut sink)?;
    fs::write(output, sink)?;
    Ok(converted)
}

/// Read the stops document from `source` and extract the `region` group.
///
/// The group is returned keyed by stop identifier. A `BTreeMap` fixes the
/// otherwise unspecified JSON object order, so the generated KML is
/// reproducible.
fn read_stops(source: impl Read, region: &str) -> Result<BTreeMap<String, Stop>, Error> {
    let mut document: Value = serde_json::from_reader(source)?;
    let group = document
        .get_mut(region)
        .map(Value::take)
        .ok_or_else(|| Error::MissingRegion(region.to_string()))?;
    let entries: BTreeMap<String, Value> =
        serde_json::from_value(group).map_err(|source| Error::MalformedRegion {
            region: region.to_string(),
            source,
        })?;

    let mut stops = BTreeMap::new();
    for (id, value) in entries {
        let stop = serde_json::from_value(value).map_err(|source| Error::MalformedStop {
            id: id.clone(),
            source,
        })?;
        stops.insert(id, stop);
    }

    Ok(stops)
}

/// Convert a single stop to a KML _Placemark_.
///
/// The stop is rendered as a KML _Point_ named after its identifier. A stop
/// name, if known, becomes the placemark description.
fn convert_stop(id: String, stop: Stop) -> Kml<CoordValue> {
    let geometry = Geometry::Point(Point {
        coord: Coord {
            x: stop.lon,
            y: stop.lat,
            z: None,
        },
        ..Default::default()
    });

    Kml::Placemark(Placemark {
        name: Some(id),
        description: stop.name.filter(|n| !n.is_empty()),
        geometry: Some(geometry),
        ..Default::default()
    })
}

/// Create a simple KML element with `name` and `content`.
fn simple_kelem(name: impl Into<String>, content: impl Into<String>) -> Kml<CoordValue> {
    Kml::Element(Element {
        name: name.into(),
        content: Some(content.into()),
        ..Default::default()
    })
}
