pub const PUBLIC_URL_BASE: &str = "https://storage.googleapis.com";
const DEFAULT_EXTENSION: &str = ".jpg";

/// Everything from the last `.` of `original`, or `.jpg`.
pub fn upload_extension(original: Option<&str>) -> &str {
    original
        .and_then(|name| name.rfind('.').map(|idx| &name[idx..]))
        .unwrap_or(DEFAULT_EXTENSION)
}

/// Stored object name for an upload received at `millis` since the epoch.
pub fn upload_filename(original: Option<&str>, millis: i64) -> String {
    format!("{millis}-upload{}", upload_extension(original))
}

pub fn public_url(bucket: &str, name: &str) -> String {
    format!("{PUBLIC_URL_BASE}/{bucket}/{name}")
}
