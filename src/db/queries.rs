//! Literal queries issued against the relational tier.
//!
//! The SQL shim recognizes these exact statements, so any new query added
//! here needs a matching arm in `shim::ShimOp::classify`.

pub const INSERT_USER: &str = "INSERT INTO users (id, email, username, password, created_at) \
     VALUES ($1, $2, $3, $4, $5) RETURNING *";

pub const SELECT_USER_BY_EMAIL: &str = "SELECT * FROM users WHERE LOWER(email) = LOWER($1)";

pub const SELECT_USER_BY_ID: &str = "SELECT * FROM users WHERE id = $1";

pub const LIST_USERS: &str = "SELECT * FROM users ORDER BY created_at DESC";

pub const COUNT_USERS: &str = "SELECT COUNT(*) AS count FROM users";

pub const DELETE_USER_BY_ID: &str = "DELETE FROM users WHERE id = $1 RETURNING *";

pub const DELETE_ALL_USERS: &str = "DELETE FROM users RETURNING *";

pub const INSERT_GALLERY_ITEM: &str = "INSERT INTO gallery \
     (id, title, image_url, date_uploaded, downloads, author, tags, chill_level, user_id) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *";

pub const LIST_GALLERY: &str = "SELECT * FROM gallery ORDER BY date_uploaded DESC";

pub const SELECT_GALLERY_BY_ID: &str = "SELECT * FROM gallery WHERE id = $1";

pub const INCREMENT_DOWNLOADS: &str =
    "UPDATE gallery SET downloads = downloads + 1 WHERE id = $1 RETURNING *";

pub const COUNT_GALLERY: &str = "SELECT COUNT(*) AS count FROM gallery";

pub const DELETE_GALLERY_BY_ID: &str = "DELETE FROM gallery WHERE id = $1 RETURNING *";

pub const DELETE_ALL_GALLERY: &str = "DELETE FROM gallery RETURNING *";
