//! The course record managed by the service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A course offered in the catalog.
///
/// `name` is the natural key: it is unique, immutable once the course has
/// been created, and it is the only field either storage tier looks a
/// course up by. Every other field is optional and omitted from the JSON
/// representation when absent.
///
/// # Example
///
/// ```
/// use course_core::Course;
///
/// let course = Course::new("algebra").with_price(10.0);
/// assert_eq!(course.name, "algebra");
/// assert_eq!(course.price, Some(10.0));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Course {
    /// Unique natural key.
    #[serde(default)]
    pub name: String,

    /// Price of the course.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Reference to the cover picture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// URL of the preview video.
    #[serde(
        default,
        rename = "preview-url-video",
        skip_serializing_if = "Option::is_none"
    )]
    pub preview_url_video: Option<String>,
}

impl Course {
    /// Creates a course with only its natural key set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the price.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Sets the picture reference.
    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }

    /// Sets the preview video URL.
    pub fn with_preview_url_video(mut self, url: impl Into<String>) -> Self {
        self.preview_url_video = Some(url.into());
        self
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
