//! [`User`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<User>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, role, name, email, phone, created_at \
            FROM users \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| User {
                id: row.get("id"),
                role: row.get("role"),
                name: row.get("name"),
                email: row.get("email"),
                phone: row.get("phone"),
                created_at: row.get("created_at"),
            }))
    }
}

impl<C> Database<Insert<user::Association>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(association): Insert<user::Association>,
    ) -> Result<Self::Ok, Self::Err> {
        let user::Association {
            owner_id,
            tenant_id,
            created_at,
        } = association;

        const SQL: &str = "\
            INSERT INTO owner_tenants (owner_id, tenant_id, created_at) \
            VALUES ($1::UUID, $2::UUID, $3::TIMESTAMPTZ) \
            ON CONFLICT (owner_id, tenant_id) DO NOTHING";
        self.exec(SQL, &[&owner_id, &tenant_id, &created_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
