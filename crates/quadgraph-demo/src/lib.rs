//! QuadGraph demo programs
//!
//! Record types and helpers behind the `quadgraph-demo` binary:
//!
//! - `models` - Admin, User, Post, UserAndPosts, Clinic and OpeningHours
//! - `credentials` - Email validation, password hashing and admin login
//! - `feed` - Follows and news feeds over reverse edges
//! - `clinics` - Clinic registration, updates and deletion

pub mod clinics;
pub mod credentials;
pub mod feed;
pub mod models;

pub use models::{Admin, Clinic, OpeningHours, Post, User, UserAndPosts};
