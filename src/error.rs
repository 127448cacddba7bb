use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported http version")]
    UnsupportedVersion,

    #[error("content-length header not a number")]
    BadContentLengthHeader,

    #[error("more than one content-length header")]
    TooManyContentLengthHeaders,

    #[error("chunk length is not ascii")]
    ChunkLenNotAscii,

    #[error("chunk length cannot be read as a number")]
    ChunkLenNotANumber,

    #[error("chunk expected crlf as next character")]
    ChunkExpectedCrLf,

    #[error("http parse fail: {0}")]
    HttpParseFail(String),

    #[error("http response invalid status")]
    ResponseInvalidStatus,
}

impl From<httparse::Error> for Error {
    fn from(value: httparse::Error) -> Self {
        Error::HttpParseFail(value.to_string())
    }
}
