use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};
use secrecy::{ExposeSecret as _, SecretString};

use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(serialize_with = "crate::model::serialize_key")]
    pub id: Record<User>,
    pub email: String,
    pub name: String,
    pub photo_url: String,
}

define_table!("users" : User = id);

define_relation! {
    User > find(id: &Record<User>) > Option<User>
        where "SELECT * FROM $id"
}

define_relation! {
    User > create(id: &Record<User>, email: &str, name: &str, photo_url: &str) > Vec<User>
        where "CREATE $id SET email = $email, name = $name, photo_url = $photo_url RETURN AFTER"
}

impl User {
    /// Returns the stored user for this identity, creating it on first sign-in. An existing user is never updated.
    #[instrument(skip(db), fields(uid = %identity.uid))]
    pub async fn register(identity: &Identity, db: &Database) -> Result<User, AuthError> {
        let id = Record::<User>::new(identity.uid.clone());

        if let Some(user) = User::find(&id, db).await.context(RegisterSnafu {
            uid: &identity.uid,
        })? {
            return Ok(user);
        }

        let Only(user) = User::create(
            &id,
            &identity.email,
            &identity.display_name,
            &identity.photo_url,
            db,
        )
        .await
        .and_then(Only::try_from)
        .context(RegisterSnafu {
            uid: &identity.uid,
        })?;

        tracing::info!(email = %user.email, "registered a new user");
        Ok(user)
    }
}

/// Who the identity provider says is signing in.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub photo_url: String,
}

/// Claims of an ID token issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct IdentityClaims {
    pub exp: i64,
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: String,
}

impl From<IdentityClaims> for Identity {
    fn from(claims: IdentityClaims) -> Self {
        Identity {
            uid: claims.sub,
            email: claims.email,
            display_name: claims.name,
            photo_url: claims.picture,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Visitor,
    Admin,
}

/// A signed-in user together with the role resolved when they signed in.
#[derive(Debug, Clone, PartialEq, Serialize, new)]
pub struct Principal {
    pub user: User,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AuthError {
    #[snafu(display("failed to decode the identity token"))]
    Decode {
        source: jsonwebtoken::errors::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to encode the identity token"))]
    Encode {
        source: jsonwebtoken::errors::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to register user `{uid}`"))]
    Register {
        uid: String,
        source: DatabaseQueryError,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Verifies identity tokens and resolves who is an admin.
#[derive(Clone)]
pub struct Authenticator {
    secret: SecretString,
    algorithm: Algorithm,
    validation: Validation,
    admin_email: String,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("algorithm", &self.algorithm)
            .field("admin_email", &self.admin_email)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    pub fn new(secret: SecretString, admin_email: impl Into<String>) -> Self {
        let algorithm = Algorithm::HS256;
        Self {
            secret,
            algorithm,
            validation: Validation::new(algorithm),
            admin_email: admin_email.into(),
        }
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }

    pub fn decode(&self, token: &str) -> Result<Identity, AuthError> {
        jsonwebtoken::decode::<IdentityClaims>(token, &self.decoding_key(), &self.validation)
            .map(|data| data.claims.into())
            .context(DecodeSnafu)
    }

    /// Issues a token the same way the identity provider does. Used by local tooling and tests.
    pub fn encode(&self, claims: &IdentityClaims) -> Result<String, AuthError> {
        let header = jsonwebtoken::Header::new(self.algorithm);
        jsonwebtoken::encode(&header, claims, &self.encoding_key()).context(EncodeSnafu)
    }

    pub fn expiration(&self) -> i64 {
        (Utc::now() + Duration::hours(1)).timestamp()
    }

    pub fn role_of(&self, email: &str) -> Role {
        if email == self.admin_email {
            Role::Admin
        } else {
            Role::Visitor
        }
    }

    /// Verifies the token, registers the user on first sign-in and resolves their role once.
    #[instrument(skip(self, token, db))]
    pub async fn signin(&self, token: &str, db: &Database) -> Result<Principal, AuthError> {
        let identity = self.decode(token)?;
        let user = User::register(&identity, db).await?;
        let role = self.role_of(&user.email);

        tracing::info!(email = %user.email, ?role, "signed in");
        Ok(Principal::new(user, role))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const ADMIN: &str = "admin@example.com";

    pub(crate) fn authenticator() -> Authenticator {
        Authenticator::new(SecretString::new("test-secret".into()), ADMIN)
    }

    pub(crate) fn claims(uid: &str, email: &str) -> IdentityClaims {
        IdentityClaims::new(
            authenticator().expiration(),
            uid.to_string(),
            email.to_string(),
            format!("{uid} name"),
            format!("https://example.com/{uid}.png"),
        )
    }

    pub(crate) fn principal(email: &str) -> Principal {
        let user = User {
            id: Record::new(email.to_string()),
            email: email.to_string(),
            name: "Test User".to_string(),
            photo_url: String::new(),
        };
        let role = authenticator().role_of(email);
        Principal::new(user, role)
    }

    #[test]
    fn tokens_round_trip_to_identities() {
        let auth = authenticator();
        let token = auth.encode(&claims("u1", "u1@example.com")).unwrap();

        let identity = auth.decode(&token).unwrap();
        assert_eq!(identity.uid, "u1");
        assert_eq!(identity.email, "u1@example.com");
        assert_eq!(identity.display_name, "u1 name");
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let other = Authenticator::new(SecretString::new("other".into()), ADMIN);
        let token = other.encode(&claims("u1", "u1@example.com")).unwrap();

        assert!(matches!(
            authenticator().decode(&token),
            Err(AuthError::Decode { .. })
        ));
    }

    #[test]
    fn only_the_configured_email_is_admin() {
        let auth = authenticator();
        assert_eq!(auth.role_of(ADMIN), Role::Admin);
        assert_eq!(auth.role_of("ADMIN@example.com"), Role::Visitor);
        assert_eq!(auth.role_of("someone@example.com"), Role::Visitor);
    }

    #[tokio::test]
    async fn first_signin_registers_and_later_ones_do_not_update() {
        let db = Database::memory().await.unwrap();
        let auth = authenticator();

        let token = auth.encode(&claims("u1", ADMIN)).unwrap();
        let principal = auth.signin(&token, &db).await.unwrap();
        assert!(principal.is_admin());
        assert_eq!(principal.user.name, "u1 name");

        let mut renamed = claims("u1", ADMIN);
        renamed.name = "Renamed".into();
        let token = auth.encode(&renamed).unwrap();
        let again = auth.signin(&token, &db).await.unwrap();

        assert_eq!(again.user, principal.user);
        assert_eq!(again.user.name, "u1 name");
    }
}
