use exr::meta::attribute::{AttributeValue, Chromaticities as ExrChromaticities, SampleType as ExrSampleType};
use exr::meta::header::Header;
use exr::meta::MetaData;
use indexmap::IndexMap;
use std::path::Path;
use tracing::debug;

use crate::common::{Channel, Chromaticities, Chromaticity, SampleType};
use crate::error::DecodeError;

/// Header attributes that commonly carry a color space name.
const COLOR_TAG_ATTRIBUTES: [&str; 4] = ["colorSpace", "oiio:ColorSpace", "colorspace", "interim.clr"];

/// What the first part of an OpenEXR header tells us before any pixel is read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExrHeaderInfo {
    pub compression: Option<String>,
    pub chromaticities: Option<Chromaticities>,
    pub sample_types: IndexMap<Channel, SampleType>,
    pub color_tag: Option<String>,
}

impl From<exr::error::Error> for DecodeError {
    fn from(error: exr::error::Error) -> Self {
        match error {
            exr::error::Error::Io(io) => DecodeError::Io(io),
            exr::error::Error::NotSupported(reason) => DecodeError::unsupported(reason),
            exr::error::Error::Invalid(reason) => DecodeError::corrupt(reason),
            exr::error::Error::Aborted => DecodeError::corrupt("header read aborted"),
        }
    }
}

pub fn is_exr(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("exr"))
}

/// Reads only the header; pixel data is left to the image decoder.
pub fn read_header(path: &Path) -> Result<ExrHeaderInfo, DecodeError> {
    let meta = MetaData::read_from_file(path, false)?;
    let header = meta
        .headers
        .first()
        .ok_or_else(|| DecodeError::corrupt("no image parts in header"))?;

    let info = ExrHeaderInfo {
        compression: Some(format!("{:?}", header.compression)),
        chromaticities: header
            .shared_attributes
            .chromaticities
            .as_ref()
            .map(convert_chromaticities),
        sample_types: sample_types(header),
        color_tag: color_tag(header),
    };
    debug!(
        "EXR header: {} parts, compression {:?}, {} known channels",
        meta.headers.len(),
        info.compression,
        info.sample_types.len()
    );
    Ok(info)
}

fn convert_chromaticities(c: &ExrChromaticities) -> Chromaticities {
    Chromaticities {
        red: Chromaticity::new(c.red.0, c.red.1),
        green: Chromaticity::new(c.green.0, c.green.1),
        blue: Chromaticity::new(c.blue.0, c.blue.1),
        white: Chromaticity::new(c.white.0, c.white.1),
    }
}

fn sample_types(header: &Header) -> IndexMap<Channel, SampleType> {
    let mut types = IndexMap::new();
    for description in &header.channels.list {
        let Some(channel) = Channel::from_name(&description.name.to_string()) else {
            continue;
        };
        let sample_type = match description.sample_type {
            ExrSampleType::F16 => SampleType::Half,
            ExrSampleType::F32 => SampleType::Float,
            ExrSampleType::U32 => SampleType::Uint,
        };
        // first layer wins when several carry the same channel letter
        types.entry(channel).or_insert(sample_type);
    }
    types.sort_keys();
    types
}

fn color_tag(header: &Header) -> Option<String> {
    header
        .own_attributes
        .other
        .iter()
        .chain(header.shared_attributes.other.iter())
        .find_map(|(name, value)| {
            let name = name.to_string();
            if !COLOR_TAG_ATTRIBUTES.iter().any(|key| name.eq_ignore_ascii_case(key)) {
                return None;
            }
            match value {
                AttributeValue::Text(text) => Some(text.to_string()),
                _ => None,
            }
        })
}
