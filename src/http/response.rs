//! Translation of downstream outcomes into HTTP responses.
//!
//! | ErrorKind            | Status |
//! |----------------------|--------|
//! | Timeout              | 504    |
//! | ConnectionFailure    | 502    |
//! | NonSuccessStatus(_)  | 502    |
//! | Unknown              | 502    |
//! | Interrupted          | 503    |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::downstream::{ErrorKind, FetchError};

/// Prefix the BFF puts in front of the downstream body.
pub const GOODS_DETAIL_PREFIX: &str = "商品详情 + ";

/// Compose the goods-detail body from the logistics payload.
pub fn goods_detail_body(logistics: &str) -> String {
    format!("{}{}", GOODS_DETAIL_PREFIX, logistics)
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Interrupted => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ConnectionFailure | ErrorKind::NonSuccessStatus(_) | ErrorKind::Unknown => {
            StatusCode::BAD_GATEWAY
        }
    }
}

/// A downstream failure rendered as an error response.
#[derive(Debug)]
pub struct DownstreamFailure(pub FetchError);

impl IntoResponse for DownstreamFailure {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        (status, format!("Downstream call failed: {}", self.0.message())).into_response()
    }
}
