use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image has no frames")]
    EmptyFrame,

    #[error("svg render failed: {0}")]
    Svg(String),

    #[error("vector renderer unavailable")]
    SvgUnavailable,
}
