use satya_api::ErrorBody;

/// A non-2xx answer from one of the remote services.
///
/// `Display` is the server's own message so callers can surface it verbatim.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    pub status: u16,
    pub message: String,
}

impl HttpError {
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404 || self.status == 406
    }
}

/// Parse an HTTP response: return the deserialized body on 2xx, or an
/// [`HttpError`] carrying the best message the body offers.
pub(crate) async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> anyhow::Result<T> {
    let resp = check_status(resp).await?;
    Ok(resp.json().await?)
}

/// Turn a non-2xx response into an [`HttpError`], passing 2xx through.
pub(crate) async fn check_status(resp: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.best_message().map(str::to_string))
        .unwrap_or_else(|| format!("{status}: {body}"));
    Err(HttpError {
        status: status.as_u16(),
        message,
    }
    .into())
}
