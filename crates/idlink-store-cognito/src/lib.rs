//! Amazon Cognito user pool backend for idlink.

mod error;

use aws_sdk_cognitoidentityprovider::Client;
use aws_sdk_cognitoidentityprovider::types::{
    AttributeType, MessageActionType, ProviderUserIdentifierType, UserType,
};
use idlink_core::{DirectoryError, DirectoryUser, ProviderUser, UserAttribute};
use tracing::{debug, info};

use crate::error::classify;

/// Connection settings for [`CognitoDirectory::connect`].
#[derive(Debug, Clone, Default)]
pub struct CognitoSettings {
    /// Region of the user pool; the default provider chain decides when unset.
    pub region: Option<String>,
    /// Endpoint override, e.g. a local Cognito emulator.
    pub endpoint_url: Option<String>,
}

/// User pool access through the Cognito identity provider API.
#[derive(Debug, Clone)]
pub struct CognitoDirectory {
    client: Client,
}

impl CognitoDirectory {
    /// Build a client from the environment's AWS configuration.
    pub async fn connect(settings: &CognitoSettings) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;

        info!(
            region = ?sdk_config.region().map(ToString::to_string),
            endpoint_override = settings.endpoint_url.is_some(),
            "Cognito directory client initialized"
        );

        Self::from_client(Client::new(&sdk_config))
    }

    /// Wrap an already configured SDK client.
    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// List up to `limit` users whose email equals `email`.
    ///
    /// # Errors
    /// Returns an error if the `ListUsers` call fails.
    pub async fn list_users_by_email(
        &self,
        user_pool_id: &str,
        email: &str,
        limit: u32,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        let filter = email_filter(email);
        debug!(user_pool_id, %filter, limit, "ListUsers");
        let output = self
            .client
            .list_users()
            .user_pool_id(user_pool_id)
            .filter(filter)
            .limit(i32::try_from(limit).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|err| classify("ListUsers", err))?;

        Ok(output.users().iter().map(user_from_sdk).collect())
    }

    /// Fetch a single user with its full attribute set.
    ///
    /// # Errors
    /// Returns an error if the `AdminGetUser` call fails.
    pub async fn get_user(
        &self,
        user_pool_id: &str,
        username: &str,
    ) -> Result<DirectoryUser, DirectoryError> {
        debug!(user_pool_id, username, "AdminGetUser");
        let output = self
            .client
            .admin_get_user()
            .user_pool_id(user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(|err| classify("AdminGetUser", err))?;

        Ok(DirectoryUser {
            username: Some(output.username().to_owned()),
            attributes: output
                .user_attributes()
                .iter()
                .map(attribute_from_sdk)
                .collect(),
        })
    }

    /// Create a native user keyed by `email` with a verified email and no welcome message.
    ///
    /// Returns the username the pool assigned, if the response carried one.
    ///
    /// # Errors
    /// Returns an error if the `AdminCreateUser` call fails.
    pub async fn create_native_user(
        &self,
        user_pool_id: &str,
        email: &str,
    ) -> Result<Option<String>, DirectoryError> {
        const OPERATION: &str = "AdminCreateUser";
        debug!(user_pool_id, email, "AdminCreateUser");
        let output = self
            .client
            .admin_create_user()
            .user_pool_id(user_pool_id)
            .username(email)
            .message_action(MessageActionType::Suppress)
            .user_attributes(attribute(OPERATION, "email", email)?)
            .user_attributes(attribute(OPERATION, "email_verified", "true")?)
            .send()
            .await
            .map_err(|err| classify(OPERATION, err))?;

        Ok(output
            .user()
            .and_then(UserType::username)
            .filter(|username| !username.is_empty())
            .map(str::to_owned))
    }

    /// Set a permanent password, skipping the force-change-password state.
    ///
    /// # Errors
    /// Returns an error if the `AdminSetUserPassword` call fails.
    pub async fn set_permanent_password(
        &self,
        user_pool_id: &str,
        username: &str,
        password: &str,
    ) -> Result<(), DirectoryError> {
        debug!(user_pool_id, username, "AdminSetUserPassword");
        self.client
            .admin_set_user_password()
            .user_pool_id(user_pool_id)
            .username(username)
            .password(password)
            .permanent(true)
            .send()
            .await
            .map_err(|err| classify("AdminSetUserPassword", err))?;
        Ok(())
    }

    /// Link `source` into `destination`.
    ///
    /// # Errors
    /// Returns [`DirectoryError::AlreadyLinked`] when the pool refuses to merge the
    /// identities, or another error if the `AdminLinkProviderForUser` call fails.
    pub async fn link_identities(
        &self,
        user_pool_id: &str,
        destination: &ProviderUser,
        source: &ProviderUser,
    ) -> Result<(), DirectoryError> {
        debug!(user_pool_id, %destination, %source, "AdminLinkProviderForUser");
        self.client
            .admin_link_provider_for_user()
            .user_pool_id(user_pool_id)
            .destination_user(identifier(destination))
            .source_user(identifier(source))
            .send()
            .await
            .map_err(|err| classify("AdminLinkProviderForUser", err))?;
        Ok(())
    }

    /// Detach `identity` from whichever user it is linked to.
    ///
    /// # Errors
    /// Returns an error if the `AdminDisableProviderForUser` call fails.
    pub async fn disable_linked_identity(
        &self,
        user_pool_id: &str,
        target_username: &str,
        identity: &ProviderUser,
    ) -> Result<(), DirectoryError> {
        debug!(user_pool_id, target_username, %identity, "AdminDisableProviderForUser");
        self.client
            .admin_disable_provider_for_user()
            .user_pool_id(user_pool_id)
            .user(identifier(identity))
            .send()
            .await
            .map_err(|err| classify("AdminDisableProviderForUser", err))?;
        Ok(())
    }
}

/// `ListUsers` filter matching `email` exactly.
fn email_filter(email: &str) -> String {
    let escaped = email.replace('\\', "\\\\").replace('"', "\\\"");
    format!("email = \"{escaped}\"")
}

fn user_from_sdk(user: &UserType) -> DirectoryUser {
    DirectoryUser {
        username: user.username().map(str::to_owned),
        attributes: user.attributes().iter().map(attribute_from_sdk).collect(),
    }
}

fn attribute_from_sdk(attribute: &AttributeType) -> UserAttribute {
    UserAttribute {
        name: attribute.name().to_owned(),
        value: attribute.value().map(str::to_owned),
    }
}

fn attribute(
    operation: &'static str,
    name: &str,
    value: &str,
) -> Result<AttributeType, DirectoryError> {
    AttributeType::builder()
        .name(name)
        .value(value)
        .build()
        .map_err(|err| DirectoryError::InvalidRequest {
            operation,
            message: err.to_string(),
        })
}

fn identifier(user: &ProviderUser) -> ProviderUserIdentifierType {
    ProviderUserIdentifierType::builder()
        .provider_name(&user.provider_name)
        .set_provider_attribute_name(user.attribute_name.clone())
        .provider_attribute_value(&user.attribute_value)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_quotes_the_email() {
        assert_eq!(email_filter("test@gmail.com"), r#"email = "test@gmail.com""#);
    }

    #[test]
    fn filter_escapes_quotes_and_backslashes() {
        assert_eq!(email_filter(r#"a"b\c@x.io"#), r#"email = "a\"b\\c@x.io""#);
    }

    #[test]
    fn identifiers_carry_the_subject_attribute_only_for_sources() {
        let source = identifier(&ProviderUser::subject("Google", "42"));
        assert_eq!(source.provider_name(), Some("Google"));
        assert_eq!(source.provider_attribute_name(), Some("Cognito_Subject"));
        assert_eq!(source.provider_attribute_value(), Some("42"));

        let destination = identifier(&ProviderUser::native("person@example.com"));
        assert_eq!(destination.provider_name(), Some("Cognito"));
        assert_eq!(destination.provider_attribute_name(), None);
    }

    #[test]
    fn sdk_users_convert_to_directory_users() {
        let user = UserType::builder()
            .username("person@example.com")
            .attributes(
                AttributeType::builder()
                    .name("email")
                    .value("person@example.com")
                    .build()
                    .unwrap_or_else(|_| unreachable!("name is set")),
            )
            .build();
        let converted = user_from_sdk(&user);
        assert_eq!(converted.username.as_deref(), Some("person@example.com"));
        assert_eq!(converted.attribute("email"), Some("person@example.com"));
    }
}
