//! # Buyer Accounts
//!
//! User records and the request bodies used to create and authenticate them.

use crate::account::EU_REGION;
use crate::error::{StorefrontError, StorefrontResult};
use serde::{Deserialize, Serialize};

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// An authenticated buyer as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub company_name: String,
    pub country: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl User {
    /// Whether the buyer routes to the EU settlement account
    pub fn is_eu(&self) -> bool {
        self.region == EU_REGION
    }
}

/// `POST /api/auth/login` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

fn default_region() -> String {
    EU_REGION.to_string()
}

/// `POST /api/auth/register` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub company_name: String,
    pub country: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl RegisterRequest {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        company_name: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            company_name: company_name.into(),
            country: country.into(),
            region: default_region(),
            street_address: None,
            city: None,
            postal_code: None,
            phone: None,
        }
    }

    /// Builder: set region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Builder: set delivery address
    pub fn with_address(
        mut self,
        street_address: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        self.street_address = Some(street_address.into());
        self.city = Some(city.into());
        self.postal_code = Some(postal_code.into());
        self
    }

    /// Builder: set phone
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Field checks shared by the client form and the backend
    pub fn validate(&self) -> StorefrontResult<()> {
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        if self.company_name.trim().is_empty() {
            return Err(StorefrontError::Validation(
                "Company name is required".to_string(),
            ));
        }
        if self.country.trim().is_empty() {
            return Err(StorefrontError::Validation("Country is required".to_string()));
        }
        Ok(())
    }

    /// Blank optional fields are sent as absent
    pub fn normalized(mut self) -> Self {
        fn blank_to_none(field: &mut Option<String>) {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
        blank_to_none(&mut self.street_address);
        blank_to_none(&mut self.city);
        blank_to_none(&mut self.postal_code);
        blank_to_none(&mut self.phone);
        self
    }
}

/// Registration form as typed by the buyer, including the confirmation field.
///
/// `validate` runs before any request is made.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub request: RegisterRequest,
    pub confirm_password: String,
}

impl RegistrationForm {
    pub fn new(request: RegisterRequest, confirm_password: impl Into<String>) -> Self {
        Self {
            request,
            confirm_password: confirm_password.into(),
        }
    }

    /// Check the form and hand back the request to send
    pub fn into_request(self) -> StorefrontResult<RegisterRequest> {
        if self.request.password != self.confirm_password {
            return Err(StorefrontError::Validation(
                "Passwords do not match".to_string(),
            ));
        }
        self.request.validate()?;
        Ok(self.request.normalized())
    }
}

pub fn validate_password(password: &str) -> StorefrontResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(StorefrontError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Shape check only: one `@` with a non-empty local part and a dotted domain
pub fn validate_email(email: &str) -> StorefrontResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    };
    if valid && !email.chars().any(char::is_whitespace) {
        Ok(())
    } else {
        Err(StorefrontError::Validation(format!("Invalid email: {email}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest::new("buyer@hotel.de", "secret1", "Hotel GmbH", "Germany")
    }

    #[test]
    fn test_password_mismatch_rejected_first() {
        let form = RegistrationForm::new(request(), "secret2");
        let err = form.into_request().unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");
    }

    #[test]
    fn test_short_password_rejected() {
        let mut req = request();
        req.password = "abc".into();
        let form = RegistrationForm::new(req, "abc");
        let err = form.into_request().unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 6 characters");
    }

    #[test]
    fn test_valid_form_normalizes_blank_fields() {
        let req = request().with_phone("  ");
        let sent = RegistrationForm::new(req, "secret1").into_request().unwrap();
        assert_eq!(sent.phone, None);
        assert_eq!(sent.region, "EU");
    }

    #[test]
    fn test_email_shape() {
        assert!(validate_email("demo@restaurant.com").is_ok());
        assert!(validate_email("demo@restaurant").is_err());
        assert!(validate_email("@restaurant.com").is_err());
        assert!(validate_email("demo restaurant@x.com").is_err());
        assert!(validate_email("a@b@c.com").is_err());
    }

    #[test]
    fn test_register_region_defaults_to_eu() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@b.com","password":"secret1","company_name":"A","country":"France"}"#,
        )
        .unwrap();
        assert_eq!(req.region, "EU");
        assert!(req.street_address.is_none());
    }

    #[test]
    fn test_user_wire_format() {
        let user: User = serde_json::from_str(
            r#"{"id":1,"email":"demo@restaurant.com","company_name":"Demo Restaurant Chain","country":"Germany","region":"EU","city":null}"#,
        )
        .unwrap();
        assert!(user.is_eu());
        assert_eq!(user.city, None);

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("phone").is_none());
    }
}
