pub mod auth;
pub mod response;

pub use auth::jwt_decode_middleware;
pub use response::{Envelope, EnvelopeBody, Responder};
