/// Largest image that may be inlined as a data URI when the image host fails (2MB)
pub const MAX_INLINE_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Default request body limit for uploads (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Items kept by the in-process memory tier
pub const MEMORY_GALLERY_CAP: usize = 50;

/// Items kept by the local uploads backup folder
pub const UPLOADS_BACKUP_CAP: usize = 100;

/// Default session token lifetime (7 days)
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;

/// Default timeout for image host requests
pub const DEFAULT_CDN_TIMEOUT_SECS: u64 = 30;

/// Folder used on the image hosts
pub const IMAGE_HOST_FOLDER: &str = "creepy-gallery";

// =============================================================================
// Validation Limits
// =============================================================================

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 30;
pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_TAGS: usize = 10;
pub const MIN_CHILL_LEVEL: i32 = 1;
pub const MAX_CHILL_LEVEL: i32 = 5;

/// Chill level used when an upload omits it
pub const DEFAULT_CHILL_LEVEL: i32 = 3;

// =============================================================================
// Recovered Item Placeholders
// =============================================================================

/// Author shown for items only known from an image host listing
pub const RECOVERED_AUTHOR: &str = "Unknown";

/// Single tag given to items only known from an image host listing
pub const RECOVERED_TAG: &str = "recovered";

/// User id given to items only known from an image host listing
pub const RECOVERED_USER_ID: &str = "unknown";

/// Chill level given to items only known from an image host listing
pub const RECOVERED_CHILL_LEVEL: i32 = DEFAULT_CHILL_LEVEL;

// =============================================================================
// Error Messages
// =============================================================================

/// Login failures never reveal whether the email exists
pub const ERR_INVALID_CREDENTIALS: &str = "Invalid email or password";

pub const ERR_SIGNUP_FIELDS_REQUIRED: &str = "Email, username, and password are required";

pub const ERR_LOGIN_FIELDS_REQUIRED: &str = "Email and password are required";

pub const ERR_PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters long";
pub const ERR_PASSWORD_NO_UPPERCASE: &str = "Password must contain at least one uppercase letter";
pub const ERR_PASSWORD_NO_LOWERCASE: &str = "Password must contain at least one lowercase letter";
pub const ERR_PASSWORD_NO_DIGIT: &str = "Password must contain at least one number";
