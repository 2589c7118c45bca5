use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum HistoryError {
    #[snafu(display("invalid history base url '{base_url}': {source}"))]
    InvalidBaseUrl {
        stage: &'static str,
        base_url: String,
        source: url::ParseError,
    },
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("history request to {url} failed on `{stage}`: {source}"))]
    Request {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("history endpoint {url} returned status {status}: {body}"))]
    Status {
        stage: &'static str,
        url: String,
        status: u16,
        body: String,
    },
    #[snafu(display("failed to decode history response from {url}: {source}"))]
    Decode {
        stage: &'static str,
        url: String,
        source: serde_json::Error,
    },
}

pub type HistoryResult<T> = Result<T, HistoryError>;
