/// Minimal blocking HTTP seam so sources can be fetched from a fake in tests.
pub trait HttpClient {
    /// Performs a GET and returns the response body.
    ///
    /// Implementations must treat non-success statuses as errors.
    fn get_bytes(&self, url: &str) -> reqwest::Result<Vec<u8>>;
}
