//! Image decoding into PDF-ready samples

use crate::types::*;
use barcode_store::AssetRepository;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{ColorType, DynamicImage, GenericImageView};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;
use std::path::Path;

/// Decoded image samples, 8 bits per component.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    gray: bool,
    samples: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

impl RasterImage {
    /// Read and decode the image at `path`.
    pub fn load(repo: &dyn AssetRepository, path: &Path) -> Result<Self> {
        if !repo.is_file(path) {
            return Err(OverlayError::ImageNotFound(path.to_path_buf()));
        }
        let bytes = repo.read(path)?;
        let img = image::load_from_memory(&bytes).map_err(|source| {
            OverlayError::ImageUnreadable {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Self::from_image(&img))
    }

    pub fn from_image(img: &DynamicImage) -> Self {
        let (width, height) = img.dimensions();

        let (gray, samples, alpha) = match img.color() {
            ColorType::L8 | ColorType::L16 => (true, img.to_luma8().into_raw(), None),
            ColorType::La8 | ColorType::La16 => {
                let la = img.to_luma_alpha8();
                let (gray, alpha): (Vec<u8>, Vec<u8>) =
                    la.pixels().map(|p| (p.0[0], p.0[1])).unzip();
                (true, gray, Some(alpha))
            }
            color if color.has_alpha() => {
                let rgba = img.to_rgba8();
                let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
                let mut alpha = Vec::with_capacity(rgba.len() / 4);
                for p in rgba.pixels() {
                    rgb.extend_from_slice(&p.0[..3]);
                    alpha.push(p.0[3]);
                }
                (false, rgb, Some(alpha))
            }
            _ => (false, img.to_rgb8().into_raw(), None),
        };

        // a fully opaque alpha channel needs no mask
        let alpha = alpha.filter(|a: &Vec<u8>| a.iter().any(|&v| v != u8::MAX));

        Self {
            width,
            height,
            gray,
            samples,
            alpha,
        }
    }

    /// Aspect ratio, width over height.
    pub fn ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Add this image to `doc` as an Image XObject, with its alpha channel as
    /// a soft mask.
    pub(crate) fn add_xobject(&self, doc: &mut Document) -> Result<ObjectId> {
        let color_space = if self.gray { "DeviceGray" } else { "DeviceRGB" };
        let mut dict = self.image_dict(color_space);

        if let Some(alpha) = &self.alpha {
            let mask = Stream::new(self.image_dict("DeviceGray"), deflate(alpha)?);
            let mask_id = doc.add_object(mask);
            dict.set("SMask", Object::Reference(mask_id));
        }

        Ok(doc.add_object(Stream::new(dict, deflate(&self.samples)?)))
    }

    fn image_dict(&self, color_space: &str) -> Dictionary {
        Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(self.width as i64)),
            ("Height", Object::Integer(self.height as i64)),
            ("ColorSpace", Object::Name(color_space.as_bytes().to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
            ("Filter", Object::Name(b"FlateDecode".to_vec())),
        ])
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(OverlayError::Encode)?;
    encoder.finish().map_err(OverlayError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    #[test]
    fn opaque_alpha_is_dropped() {
        let img = RgbaImage::from_pixel(4, 2, Rgba([10, 20, 30, 255]));
        let raster = RasterImage::from_image(&DynamicImage::ImageRgba8(img));
        assert!(raster.alpha.is_none());
        assert_eq!(raster.samples.len(), 4 * 2 * 3);
        assert_eq!(raster.ratio(), 2.0);
    }

    #[test]
    fn translucent_alpha_becomes_mask() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 128]));
        let raster = RasterImage::from_image(&DynamicImage::ImageRgba8(img));
        assert_eq!(raster.alpha.as_ref().map(Vec::len), Some(9));

        let mut doc = Document::with_version("1.7");
        let id = raster.add_xobject(&mut doc).unwrap();
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert!(stream.dict.get(b"SMask").is_ok());
    }

    #[test]
    fn grayscale_keeps_one_component() {
        let img = GrayImage::from_pixel(5, 5, Luma([200]));
        let raster = RasterImage::from_image(&DynamicImage::ImageLuma8(img));
        assert!(raster.gray);
        assert_eq!(raster.samples.len(), 25);
    }
}
