//! Concrete [`ConfigBackend`](crate::ConfigBackend) implementations

pub mod http;

pub use http::{AuthStatus, HttpBackend, LoginResponse, Role};
