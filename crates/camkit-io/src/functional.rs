use std::path::{Path, PathBuf};

use camkit_image::{Image, ImageSize};

use crate::error::IoError;

/// Read any supported image file as RGB8.
///
/// Format detection and decoding are delegated to the `image` crate.
pub fn read_image_any_rgb8(file_path: impl AsRef<Path>) -> Result<Image<u8, 3>, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let rgb = image::open(file_path)?.to_rgb8();
    let size = ImageSize {
        width: rgb.width() as usize,
        height: rgb.height() as usize,
    };
    Ok(Image::new(size, rgb.into_raw())?)
}

/// Read any supported image file as grayscale.
pub fn read_image_any_gray8(file_path: impl AsRef<Path>) -> Result<Image<u8, 1>, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let gray = image::open(file_path)?.to_luma8();
    let size = ImageSize {
        width: gray.width() as usize,
        height: gray.height() as usize,
    };
    Ok(Image::new(size, gray.into_raw())?)
}

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "tiff"];

/// List the image files in a directory, sorted by name.
pub fn list_image_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, IoError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Load every image in a directory as grayscale, sorted by file name.
///
/// Unreadable files are logged and skipped rather than failing the batch.
pub fn load_images_gray8(dir: impl AsRef<Path>) -> Result<Vec<Image<u8, 1>>, IoError> {
    let files = list_image_files(dir)?;
    let mut images = Vec::with_capacity(files.len());
    for file in &files {
        match read_image_any_gray8(file) {
            Ok(img) => images.push(img),
            Err(err) => log::warn!("could not read {}: {}", file.display(), err),
        }
    }
    log::info!("loaded {} images", images.len());
    Ok(images)
}

/// Split a side-by-side stereo frame into its left and right halves.
pub fn split_stereo_frame(frame: &Image<u8, 1>) -> Result<(Image<u8, 1>, Image<u8, 1>), IoError> {
    let half = frame.width() / 2;
    let size = ImageSize {
        width: half,
        height: frame.height(),
    };

    let mut left = Vec::with_capacity(half * frame.height());
    let mut right = Vec::with_capacity(half * frame.height());

    let data = frame.as_slice();
    for row in data.chunks_exact(frame.width()) {
        left.extend_from_slice(&row[..half]);
        right.extend_from_slice(&row[half..2 * half]);
    }

    Ok((Image::new(size, left)?, Image::new(size, right)?))
}

/// Load a directory of side-by-side stereo frames as (left, right) sets.
pub fn load_stereo_pairs_gray8(
    dir: impl AsRef<Path>,
) -> Result<(Vec<Image<u8, 1>>, Vec<Image<u8, 1>>), IoError> {
    let frames = load_images_gray8(dir)?;
    let mut lefts = Vec::with_capacity(frames.len());
    let mut rights = Vec::with_capacity(frames.len());
    for frame in &frames {
        let (l, r) = split_stereo_frame(frame)?;
        lefts.push(l);
        rights.push(r);
    }
    Ok((lefts, rights))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_halves_a_frame() -> Result<(), IoError> {
        let size = ImageSize {
            width: 6,
            height: 2,
        };
        #[rustfmt::skip]
        let data = vec![
            1, 2, 3, 4, 5, 6,
            7, 8, 9, 10, 11, 12,
        ];
        let frame = Image::<u8, 1>::new(size, data)?;
        let (l, r) = split_stereo_frame(&frame)?;
        assert_eq!(l.as_slice(), &[1, 2, 3, 7, 8, 9]);
        assert_eq!(r.as_slice(), &[4, 5, 6, 10, 11, 12]);
        Ok(())
    }

    #[test]
    fn missing_file_errors() {
        assert!(matches!(
            read_image_any_rgb8("/definitely/not/here.png"),
            Err(IoError::FileDoesNotExist(_))
        ));
    }

    #[test]
    fn directory_listing_is_sorted_and_filtered() -> Result<(), IoError> {
        let dir = tempfile::tempdir()?;
        for name in ["b.png", "a.jpg", "notes.txt", "c.jpeg"] {
            std::fs::write(dir.path().join(name), b"x")?;
        }
        let files = list_image_files(dir.path())?;
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png", "c.jpeg"]);
        Ok(())
    }
}
