/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and initial password generation
/// - [`jwt`]: JWT token generation and validation
/// - [`middleware`]: Bearer token extraction for the HTTP layer
/// - [`authorization`]: Actor resolution and record scoping
///
/// # Example
///
/// ```no_run
/// use leadcrm_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use leadcrm_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("correct horse battery")?;
/// assert!(verify_password("correct horse battery", &hash)?);
///
/// let secret = "a-secret-of-at-least-thirty-two-bytes!";
/// let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), secret)?;
/// let claims = validate_access_token(&token, secret)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
