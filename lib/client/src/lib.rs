//! HTTP client for the OpenSchool REST API.
//!
//! Provides [`ApiClient`] (connection + auth glue) and [`HttpGateway`], the
//! [`openschool_forum::CommentGateway`] implementation the view-model runs
//! against in production.

pub mod http;

pub use http::{ApiClient, HttpGateway};
