use log::*;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::{HttpSettings, NetworkApiError};

pub(crate) fn build_client(settings: &HttpSettings) -> Result<Client, NetworkApiError> {
    Client::builder().timeout(settings.timeout).build().map_err(|e| NetworkApiError::Initialization(e.to_string()))
}

/// Sends the request and deserializes a successful JSON body. Non-2xx responses are classified by
/// [`NetworkApiError::from_status`].
pub(crate) async fn send_json<T: DeserializeOwned>(req: RequestBuilder, desc: &str) -> Result<T, NetworkApiError> {
    let response = req.send().await.map_err(|e| {
        debug!("🌐️ {desc}: no response. {e}");
        NetworkApiError::from(e)
    })?;
    let status = response.status();
    if status.is_success() {
        trace!("🌐️ {desc}: {status}");
        response.json::<T>().await.map_err(|e| NetworkApiError::JsonError(e.to_string()))
    } else {
        let message = response.text().await.unwrap_or_default();
        debug!("🌐️ {desc}: failed with {status}");
        Err(NetworkApiError::from_status(status, message))
    }
}
