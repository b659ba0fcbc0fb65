//! Administrator credentials

use crate::models::{ADMIN_TYPE, Admin};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use quadgraph_core::{Error, NodeRef, Result, vocab};
use quadgraph_graph::Graph;
use quadgraph_query::Path;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static EMAIL: LazyLock<std::result::Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
});

/// Reject malformed email addresses
pub fn validate_email(email: &str) -> Result<()> {
    let pattern = EMAIL
        .as_ref()
        .map_err(|e| Error::InvalidPattern(e.to_string()))?;
    if email.len() > 254 || !pattern.is_match(email) {
        return Err(Error::Validation(format!("invalid email address: {:?}", email)));
    }
    Ok(())
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Generation(format!("Failed to hash password: {}", e)))?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| Error::Validation(format!("Invalid password hash: {}", e)))?;

    let argon2 = Argon2::default();

    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Path to the administrators registered under an email address
fn admins_with_email(email: &str) -> Path {
    Path::start_all()
        .has("email", email)
        .has(vocab::rdf_type(), NodeRef::iri(ADMIN_TYPE))
}

/// Build an administrator with a checked email and hashed password
pub fn new_admin(name: &str, email: &str, password: &str) -> Result<Admin> {
    validate_email(email)?;
    if password.is_empty() {
        return Err(Error::Validation("password must not be empty".to_string()));
    }

    Ok(Admin {
        id: None,
        name: name.to_string(),
        email: email.to_string(),
        hashed_password: hash_password(password)?,
        password: String::new(),
    })
}

/// Register a new administrator
///
/// Fails with `Validation` if the email is malformed or already taken.
pub fn create_admin(graph: &Graph, name: &str, email: &str, password: &str) -> Result<Admin> {
    let mut admin = new_admin(name, email, password)?;
    if find_admin_id(graph, email)?.is_some() {
        return Err(Error::Validation(format!("an administrator already uses {}", email)));
    }

    let id = graph.insert(&mut admin)?;
    info!("Created administrator {} ({})", email, id);
    Ok(admin)
}

/// Node of the administrator with this email, if any
pub fn find_admin_id(graph: &Graph, email: &str) -> Result<Option<NodeRef>> {
    let first = graph.query().first_value(&admins_with_email(email))?;
    Ok(first.and_then(|value| value.as_node().cloned()))
}

/// The administrator with this email, if any
pub fn find_admin_by_email(graph: &Graph, email: &str) -> Result<Option<Admin>> {
    graph.load_first(&admins_with_email(email))
}

/// Check an administrator's credentials
///
/// Returns the administrator on success and `None` for an unknown email or
/// a wrong password.
pub fn login_admin(graph: &Graph, email: &str, password: &str) -> Result<Option<Admin>> {
    validate_email(email)?;

    let Some(admin) = find_admin_by_email(graph, email)? else {
        debug!("No administrator registered as {}", email);
        return Ok(None);
    };

    if verify_password(password, &admin.hashed_password)? {
        info!("Administrator {} logged in", email);
        Ok(Some(admin))
    } else {
        warn!("Wrong password for {}", email);
        Ok(None)
    }
}

/// Administrators whose email matches a regular expression
pub fn admins_matching(graph: &Graph, pattern: &str) -> Result<Vec<Admin>> {
    let path = Path::start_all()
        .has(vocab::rdf_type(), NodeRef::iri(ADMIN_TYPE))
        .has_regex("email", pattern)?;
    graph.load_path(&path)
}
