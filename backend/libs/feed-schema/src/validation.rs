//! Local content validation
//!
//! Runs before any remote call; content that fails here never reaches the
//! store. Lengths are counted in code points.

use crate::limits::{
    ALLOWED_IMAGE_TYPES, AVATAR_MAX_BYTES, COMMENT_MAX_CHARS, POST_BODY_MAX_CHARS,
    POST_IMAGE_MAX_BYTES,
};
use crate::models::{ImagePayload, NewPost};
use thiserror::Error;

pub type ValidationResult<T> = Result<T, ValidationError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Empty(&'static str),

    #[error("{field} is too long (max {max} characters, got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{field} is too large (max {max_bytes} bytes, got {actual_bytes})")]
    TooLarge {
        field: &'static str,
        max_bytes: usize,
        actual_bytes: usize,
    },

    #[error("Unsupported image type: {0}")]
    UnsupportedImageType(String),
}

fn check_length(field: &'static str, text: &str, max: usize) -> ValidationResult<()> {
    let actual = text.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(())
}

fn check_image(field: &'static str, image: &ImagePayload, max_bytes: usize) -> ValidationResult<()> {
    let content_type = image.content_type.to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(ValidationError::UnsupportedImageType(
            image.content_type.clone(),
        ));
    }

    let actual_bytes = image.data.len();
    if actual_bytes > max_bytes {
        return Err(ValidationError::TooLarge {
            field,
            max_bytes,
            actual_bytes,
        });
    }
    Ok(())
}

/// Validate a new post, returning its trimmed body.
///
/// A post needs a body, an image, or both.
pub fn validate_post(post: &NewPost) -> ValidationResult<&str> {
    let body = post.content.trim();
    if body.is_empty() && post.image.is_none() {
        return Err(ValidationError::Empty("post content or image"));
    }

    check_length("post", body, POST_BODY_MAX_CHARS)?;

    if let Some(image) = &post.image {
        check_image("image", image, POST_IMAGE_MAX_BYTES)?;
    }

    Ok(body)
}

/// Validate comment text, returning it trimmed
pub fn validate_comment(text: &str) -> ValidationResult<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::Empty("comment"));
    }
    check_length("comment", text, COMMENT_MAX_CHARS)?;
    Ok(text)
}

pub fn validate_avatar(image: &ImagePayload) -> ValidationResult<()> {
    check_image("profile picture", image, AVATAR_MAX_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(bytes: usize) -> ImagePayload {
        ImagePayload {
            content_type: "image/png".into(),
            data: "x".repeat(bytes),
        }
    }

    #[test]
    fn test_post_requires_body_or_image() {
        let post = NewPost {
            content: "   ".into(),
            image: None,
        };
        assert_eq!(
            validate_post(&post),
            Err(ValidationError::Empty("post content or image"))
        );

        let image_only = NewPost {
            content: String::new(),
            image: Some(png(10)),
        };
        assert_eq!(validate_post(&image_only), Ok(""));
    }

    #[test]
    fn test_post_length_counts_code_points() {
        // 5000 multi-byte characters are still within the limit
        let post = NewPost {
            content: "é".repeat(POST_BODY_MAX_CHARS),
            image: None,
        };
        assert!(validate_post(&post).is_ok());

        let too_long = NewPost {
            content: "a".repeat(POST_BODY_MAX_CHARS + 1),
            image: None,
        };
        assert!(matches!(
            validate_post(&too_long),
            Err(ValidationError::TooLong { actual: 5001, .. })
        ));
    }

    #[test]
    fn test_post_image_limits() {
        let too_big = NewPost {
            content: "hi".into(),
            image: Some(png(POST_IMAGE_MAX_BYTES + 1)),
        };
        assert!(matches!(
            validate_post(&too_big),
            Err(ValidationError::TooLarge { .. })
        ));

        let bmp = NewPost {
            content: "hi".into(),
            image: Some(ImagePayload {
                content_type: "image/bmp".into(),
                data: "x".into(),
            }),
        };
        assert_eq!(
            validate_post(&bmp),
            Err(ValidationError::UnsupportedImageType("image/bmp".into()))
        );
    }

    #[test]
    fn test_comment_validation() {
        assert_eq!(validate_comment("  nice  "), Ok("nice"));
        assert_eq!(validate_comment(" "), Err(ValidationError::Empty("comment")));
        assert!(validate_comment(&"b".repeat(COMMENT_MAX_CHARS + 1)).is_err());
        assert!(validate_comment(&"b".repeat(COMMENT_MAX_CHARS)).is_ok());
    }

    #[test]
    fn test_avatar_limit_is_smaller_than_post_image_limit() {
        assert!(validate_avatar(&png(AVATAR_MAX_BYTES)).is_ok());
        assert!(validate_avatar(&png(AVATAR_MAX_BYTES + 1)).is_err());
    }
}
