/// Weak dedup identifier for an uploaded screenshot: file name plus byte
/// length, not a content hash. Good enough to stop the same file being
/// cashed in twice for the same video, nothing more.
pub fn file_fingerprint(file_name: &str, byte_len: usize) -> String {
    format!("{file_name}:{byte_len}")
}
