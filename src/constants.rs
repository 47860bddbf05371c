/// Maximum number of entries returned by the follower feed.
pub const FEED_LIMIT: usize = 4;

/// Minimum password length, in characters, unless overridden by `auth.min_password_length`.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

/// Config file picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

// Plain-text success bodies
pub const MSG_USER_CREATED: &str = "User created successfully";
pub const MSG_TWEET_CREATED: &str = "Created a Tweet";
pub const MSG_TWEET_REMOVED: &str = "Tweet Removed";
