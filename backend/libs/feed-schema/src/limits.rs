//! Content and query limits

/// Max post body length, in code points
pub const POST_BODY_MAX_CHARS: usize = 5000;

/// Max encoded size of a post image
pub const POST_IMAGE_MAX_BYTES: usize = 1024 * 1024;

/// Max comment length, in code points
pub const COMMENT_MAX_CHARS: usize = 500;

/// Max encoded size of a profile picture
pub const AVATAR_MAX_BYTES: usize = 500 * 1024;

/// Image content types accepted for posts and avatars
pub const ALLOWED_IMAGE_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Feed window size (snapshot page size and cache cap)
pub const FEED_WINDOW: usize = 50;

/// Store-level cap on values in one any-of tag query
pub const DISCOVERY_MAX_QUERY_TAGS: usize = 10;

/// Max candidates fetched for discovery
pub const DISCOVERY_MAX_RESULTS: usize = 50;

/// Display name used when an author has none
pub const ANONYMOUS: &str = "Anonymous";
