pub mod entities;

use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveModelTrait, ActiveValue, Database, DatabaseConnection, DbErr, PaginatorTrait,
    QueryFilter, QueryOrder, Schema,
};
use time::OffsetDateTime;

use cosproxy_pool::{Account, AccountStore, PoolError};

#[derive(Clone)]
pub struct AccountStorage {
    db: DatabaseConnection,
}

impl AccountStorage {
    pub async fn connect(database_url: &str) -> Result<Self, DbErr> {
        let db = Database::connect(database_url).await?;
        Ok(Self { db })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn sync(&self) -> Result<(), DbErr> {
        Schema::new(self.db.get_database_backend())
            .builder()
            .register(entities::Accounts)
            .sync(&self.db)
            .await
    }

    pub async fn insert_account(
        &self,
        auth: String,
        team_id: String,
        donor: Option<String>,
    ) -> Result<Account, DbErr> {
        let now = OffsetDateTime::now_utc();
        let active = entities::accounts::ActiveModel {
            id: ActiveValue::NotSet,
            auth: ActiveValue::Set(auth),
            team_id: ActiveValue::Set(team_id),
            donor: ActiveValue::Set(donor),
            is_active: ActiveValue::Set(true),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        let model = active.insert(&self.db).await?;
        Ok(account_from_model(model))
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, DbErr> {
        let models = entities::Accounts::find()
            .order_by_asc(entities::accounts::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(account_from_model).collect())
    }

    async fn active_accounts(&self) -> Result<Vec<Account>, DbErr> {
        let models = entities::Accounts::find()
            .filter(entities::accounts::Column::IsActive.eq(true))
            .order_by_asc(entities::accounts::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(account_from_model).collect())
    }

    async fn deactivate(&self, id: i64) -> Result<(), DbErr> {
        entities::Accounts::update_many()
            .col_expr(
                entities::accounts::Column::IsActive,
                Expr::value(false),
            )
            .col_expr(
                entities::accounts::Column::UpdatedAt,
                Expr::value(OffsetDateTime::now_utc()),
            )
            .filter(entities::accounts::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}

fn account_from_model(model: entities::accounts::Model) -> Account {
    Account {
        id: model.id,
        secret: model.auth,
        team_id: model.team_id,
        donor: model.donor,
        is_active: model.is_active,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[async_trait]
impl AccountStore for AccountStorage {
    async fn list_active(&self) -> Result<Vec<Account>, PoolError> {
        self.active_accounts()
            .await
            .map_err(|err| PoolError::Store(err.to_string()))
    }

    async fn set_inactive(&self, id: i64) -> Result<(), PoolError> {
        self.deactivate(id)
            .await
            .map_err(|err| PoolError::Store(err.to_string()))
    }

    async fn count_active(&self) -> Result<u64, PoolError> {
        entities::Accounts::find()
            .filter(entities::accounts::Column::IsActive.eq(true))
            .count(&self.db)
            .await
            .map_err(|err| PoolError::Store(err.to_string()))
    }
}
