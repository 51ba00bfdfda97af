// HTTP transport for Conduit.
// POSTs a form body and hands back the raw response bytes.

use reqwest::blocking::{Client, ClientBuilder};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};

use crate::error::{PhabStatsError, Result};

/// Capability to POST a form-encoded body and receive the raw response.
pub trait Transport {
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Vec<u8>>;
}

/// Blocking reqwest transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Self::builder().build().map_err(PhabStatsError::Http)?;
        Ok(Self { client })
    }

    fn builder() -> ClientBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("phab-stats/", env!("CARGO_PKG_VERSION"))),
        );

        Client::builder().default_headers(headers)
    }
}

impl Transport for HttpTransport {
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Vec<u8>> {
        let response = self.client.post(url).form(form).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(PhabStatsError::Status {
                status,
                body: response.text().unwrap_or_default(),
            });
        }

        Ok(response.bytes()?.to_vec())
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Vec<u8>> {
        (**self).post_form(url, form)
    }
}
