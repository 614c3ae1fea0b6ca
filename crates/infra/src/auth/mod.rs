//! Authorization header providers
//!
//! One provider per authentication mode; see
//! [`AuthorizationProvider`](warden_core::AuthorizationProvider).

pub mod basic;
pub mod certificate;
pub mod mode;
pub mod oauth;

pub use basic::BasicAuthorization;
pub use certificate::CertificateAuthorization;
pub use mode::AuthMode;
pub use oauth::OAuthAuthorization;
