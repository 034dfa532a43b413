//! Auth endpoints, cookies and request gates.
//!
//! Flow overview:
//! - `POST /sign_up` and `POST /sign_in` sit behind the guest gate.
//! - `POST /sign_in` sets the `Authorization` (access) and `X-Refresh` (refresh) cookies.
//! - `POST /_refresh` reads the refresh token from the cookie or the body and resets
//!   the access cookie.
//! - `POST /logout`, `GET /info` and `GET /sessions` sit behind the auth gate, which
//!   binds the token subject as [`gate::AuthSubject`].

pub mod cookies;
pub mod gate;
pub mod logout;
pub mod me;
pub mod refresh;
pub mod sign_in;
pub mod sign_up;
pub mod state;

pub use state::{AuthConfig, AuthState};
