//! Embedded fields of an image file.
//!
//! PNG text chunks are reported as `PNG:<keyword>` and primary-IFD EXIF
//! fields as `EXIF:<tag name>`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{CatalogError, Result};

pub type EmbeddedFields = BTreeMap<String, String>;

pub fn read_embedded_fields(path: &Path) -> Result<EmbeddedFields> {
    let mut fields = EmbeddedFields::new();

    let format = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| CatalogError::io(path, e))?
        .format();

    if format == Some(image::ImageFormat::Png) {
        read_png_text(path, &mut fields)?;
    }
    read_exif(path, &mut fields)?;

    tracing::debug!("Read {} embedded fields from {:?}", fields.len(), path);
    Ok(fields)
}

/// Text chunks that precede the image data.
fn read_png_text(path: &Path, fields: &mut EmbeddedFields) -> Result<()> {
    let file = File::open(path).map_err(|e| CatalogError::io(path, e))?;
    let decoder = png::Decoder::new(BufReader::new(file));
    let reader = match decoder.read_info() {
        Ok(reader) => reader,
        Err(e) => {
            tracing::warn!("Cannot decode PNG header of {:?}: {}", path, e);
            return Ok(());
        }
    };
    let info = reader.info();

    for chunk in &info.uncompressed_latin1_text {
        fields.insert(format!("PNG:{}", chunk.keyword), chunk.text.clone());
    }
    for chunk in &info.compressed_latin1_text {
        match chunk.get_text() {
            Ok(text) => {
                fields.insert(format!("PNG:{}", chunk.keyword), text);
            }
            Err(e) => tracing::warn!("Bad zTXt chunk '{}' in {:?}: {}", chunk.keyword, path, e),
        }
    }
    for chunk in &info.utf8_text {
        match chunk.get_text() {
            Ok(text) => {
                fields.insert(format!("PNG:{}", chunk.keyword), text);
            }
            Err(e) => tracing::warn!("Bad iTXt chunk '{}' in {:?}: {}", chunk.keyword, path, e),
        }
    }
    Ok(())
}

fn read_exif(path: &Path, fields: &mut EmbeddedFields) -> Result<()> {
    let file = File::open(path).map_err(|e| CatalogError::io(path, e))?;
    let mut bufreader = BufReader::new(file);

    let exif = match exif::Reader::new().read_from_container(&mut bufreader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(()),
        Err(e) => {
            tracing::debug!("No readable EXIF in {:?}: {}", path, e);
            return Ok(());
        }
    };

    for field in exif.fields().filter(|f| f.ifd_num == exif::In::PRIMARY) {
        let value = field
            .display_value()
            .to_string()
            .trim_matches('"')
            .to_string();
        fields.insert(format!("EXIF:{}", field.tag), value);
    }
    Ok(())
}

/// Case-insensitive field lookup; generators disagree on keyword case.
pub fn lookup<'a>(fields: &'a EmbeddedFields, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .or_else(|| {
            fields
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
        .map(String::as_str)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs::File;
    use std::io::BufWriter;
    use std::path::Path;

    /// A 1x1 PNG carrying the given tEXt chunks.
    pub fn write_png(path: &Path, chunks: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut encoder = png::Encoder::new(BufWriter::new(file), 1, 1);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        for (keyword, text) in chunks {
            encoder
                .add_text_chunk(keyword.to_string(), text.to_string())
                .unwrap();
        }
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&[0, 0, 0, 255]).unwrap();
        writer.finish().unwrap();
    }
}
