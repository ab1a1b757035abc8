use super::client::HttpClient;

/// [`HttpClient`] backed by a plain blocking `reqwest` client.
pub struct BasicClient(reqwest::blocking::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::blocking::Client::new())
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for BasicClient {
    fn get_bytes(&self, url: &str) -> reqwest::Result<Vec<u8>> {
        let resp = self.0.get(url).send()?.error_for_status()?;
        Ok(resp.bytes()?.to_vec())
    }
}
