//! Connection credentials

mod jwt;

pub use jwt::{Claims, JwtService};
