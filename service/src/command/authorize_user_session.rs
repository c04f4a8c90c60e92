//! [`Command`] for authorizing a [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by a [`Session`] token issued by
/// the authentication provider.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = user::Initiator;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config.jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        let user = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::UserNotExists(session.user_id))
            .map_err(tracerr::wrap!())?;

        Ok(user.as_initiator())
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use jsonwebtoken::{EncodingKey, Header};

    use crate::{
        domain::user::{self, session, Session},
        infra::database::memory,
        Command as _,
    };

    use super::{AuthorizeUserSession, ExecutionError as E};

    fn token(user_id: user::Id, ttl_secs: i64) -> session::Token {
        let expires_at = DateTime::from_unix_timestamp(
            DateTime::now().unix_timestamp() + ttl_secs,
        )
        .unwrap()
        .coerce();
        jsonwebtoken::encode(
            &Header::default(),
            &Session {
                user_id,
                expires_at,
            },
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap()
        .parse()
        .unwrap()
    }

    #[tokio::test]
    async fn resolves_initiator() {
        let svc = memory::service();
        let owner = svc.database().user(user::Role::Owner);

        let initiator = svc
            .execute(AuthorizeUserSession {
                token: token(owner.id, 3600),
            })
            .await
            .unwrap();

        assert_eq!(initiator, owner);
    }

    #[tokio::test]
    async fn refuses_expired_session() {
        let svc = memory::service();
        let owner = svc.database().user(user::Role::Owner);

        let err = svc
            .execute(AuthorizeUserSession {
                token: token(owner.id, -3600),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::JsonWebTokenDecodeError(_)));
    }

    #[tokio::test]
    async fn refuses_unknown_user() {
        let svc = memory::service();

        let err = svc
            .execute(AuthorizeUserSession {
                token: token(user::Id::new(), 3600),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::UserNotExists(_)));
    }
}
