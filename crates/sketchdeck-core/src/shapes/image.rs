//! Image objects referencing an external source.

/// Where an image's pixels come from: a URL or a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub src: String,
}

impl ImageSource {
    pub fn new(src: impl Into<String>) -> Self {
        Self { src: src.into() }
    }

    pub fn is_data_url(&self) -> bool {
        self.src.starts_with("data:")
    }

    /// MIME type of a `data:` URL, if present.
    pub fn mime_type(&self) -> Option<&str> {
        let rest = self.src.strip_prefix("data:")?;
        let end = rest.find([';', ','])?;
        Some(&rest[..end])
    }
}

/// Scale `(width, height)` to fit within `max`, preserving aspect ratio.
/// Sizes already inside the box are returned unchanged.
pub fn fit_within(width: f64, height: f64, max_width: f64, max_height: f64) -> (f64, f64) {
    if width <= 0.0 || height <= 0.0 {
        return (max_width, max_height);
    }
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let aspect = width / height;
    if aspect > max_width / max_height {
        (max_width, max_width / aspect)
    } else {
        (max_height * aspect, max_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_mime() {
        let src = ImageSource::new("data:image/png;base64,AAAA");
        assert!(src.is_data_url());
        assert_eq!(src.mime_type(), Some("image/png"));
        assert_eq!(ImageSource::new("https://x/y.png").mime_type(), None);
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(1000.0, 500.0, 400.0, 400.0), (400.0, 200.0));
        assert_eq!(fit_within(500.0, 1000.0, 400.0, 400.0), (200.0, 400.0));
        assert_eq!(fit_within(100.0, 50.0, 400.0, 400.0), (100.0, 50.0));
    }
}
