use std::collections::HashMap;
use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_tiberius::ConnectionManager;
use rust_decimal::Decimal;
use serenity::model::id::GuildId;
use tiberius::{AuthMethod, Config};
use tracing::{debug, info};

use crate::Error;
use crate::models::panel_models::*;
use crate::services::panel_store::GuildConfigStore;

// Each batch compiles on its own, so the schema exists before the tables reference it.
const SCHEMA: [&str; 3] = [
"IF SCHEMA_ID('RPPanel') IS NULL EXEC('CREATE SCHEMA [RPPanel]');",
"IF OBJECT_ID('[RPPanel].[Guild]', 'U') IS NULL
    CREATE TABLE [RPPanel].[Guild] (
        namespace NVARCHAR(64) NOT NULL,
        guild_id DECIMAL(20, 0) NOT NULL,
        enabled BIT NOT NULL DEFAULT 1,
        PRIMARY KEY (namespace, guild_id)
    );",
"IF OBJECT_ID('[RPPanel].[Record]', 'U') IS NULL
    CREATE TABLE [RPPanel].[Record] (
        namespace NVARCHAR(64) NOT NULL,
        guild_id DECIMAL(20, 0) NOT NULL,
        record_key NVARCHAR(300) NOT NULL,
        body NVARCHAR(MAX) NOT NULL,
        PRIMARY KEY (namespace, guild_id, record_key)
    );"
];

/// SQL Server backed guild storage. Each record is one row holding its JSON body,
/// so edits only ever lock the row they touch.
pub struct Database {
    pub pool: Pool<ConnectionManager>
}

impl Database {
    pub async fn new(ip: &str, port: u16, username: &str, password: &str) -> Result<Self, Error> {
        let mut config = Config::new();
        config.host(ip);
        config.port(port);
        config.authentication(AuthMethod::sql_server(username, password));
        config.trust_cert();

        let manager = ConnectionManager::new(config);
        let pool = Pool::builder().max_size(8).build(manager).await?;

        let database = Database { pool };
        database.ensure_schema().await?;
        info!("Connected to SQL Server at {}:{}", ip, port);

        Ok(database)
    }

    async fn ensure_schema(&self) -> Result<(), Error> {
        let mut conn = self.pool.get().await?;
        for batch in SCHEMA {
            Self::run_batch(&mut conn, batch).await?;
        }

        Ok(())
    }

    async fn run_batch(conn: &mut PooledConnection<'_, ConnectionManager>, batch: &str) -> Result<(), Error> {
        conn.simple_query(batch).await?.into_results().await?;
        Ok(())
    }

    async fn edit_locked(conn: &mut PooledConnection<'_, ConnectionManager>, namespace: &str, guild: &Decimal, key: &str, edit: &RecordEdit) -> Result<Option<EditOutcome>, Error> {
        let row = conn.query(
            "SELECT body FROM [RPPanel].[Record] WITH (UPDLOCK, HOLDLOCK) WHERE namespace = @P1 AND guild_id = @P2 AND record_key = @P3;",
            &[&namespace, guild, &key])
            .await?
            .into_row()
            .await?;

        let body = match row {
            Some(row) => row.try_get::<&str, _>(0)?.map(str::to_string),
            None => None
        };

        let mut record: Record = match body {
            Some(body) => serde_json::from_str(&body)?,
            None => return Ok(None)
        };

        let outcome = edit.apply(&mut record);

        if outcome.is_write() {
            let body = serde_json::to_string(&record)?;
            conn.execute(
                "UPDATE [RPPanel].[Record] SET body = @P4 WHERE namespace = @P1 AND guild_id = @P2 AND record_key = @P3;",
                &[&namespace, guild, &key, &body.as_str()])
                .await?;
        }

        Ok(Some(outcome))
    }
}

fn parse_body(body: Option<&str>) -> Result<Option<Record>, Error> {
    match body {
        Some(body) => Ok(Some(serde_json::from_str(body)?)),
        None => Ok(None)
    }
}

#[async_trait]
impl GuildConfigStore for Database {
    async fn load(&self, namespace: &str, guild_id: GuildId) -> Result<GuildDocument, Error> {
        let mut conn = self.pool.get().await?;
        let guild = Decimal::from(guild_id.get());

        let enabled = match conn.query(
            "SELECT enabled FROM [RPPanel].[Guild] WHERE namespace = @P1 AND guild_id = @P2;",
            &[&namespace, &guild])
            .await?
            .into_row()
            .await? {
            Some(row) => row.try_get::<bool, _>(0)?.unwrap_or(true),
            None => true
        };

        let rows = conn.query(
            "SELECT record_key, body FROM [RPPanel].[Record] WHERE namespace = @P1 AND guild_id = @P2;",
            &[&namespace, &guild])
            .await?
            .into_first_result()
            .await?;

        let mut records = HashMap::new();
        for row in rows {
            let key: Option<&str> = row.try_get(0)?;
            let record = parse_body(row.try_get(1)?)?;

            if let (Some(key), Some(record)) = (key, record) {
                records.insert(key.to_string(), record);
            }
        }

        Ok(GuildDocument { enabled, records })
    }

    async fn get_record(&self, namespace: &str, guild_id: GuildId, key: &str) -> Result<Option<Record>, Error> {
        let mut conn = self.pool.get().await?;
        let guild = Decimal::from(guild_id.get());

        let row = conn.query(
            "SELECT body FROM [RPPanel].[Record] WHERE namespace = @P1 AND guild_id = @P2 AND record_key = @P3;",
            &[&namespace, &guild, &key])
            .await?
            .into_row()
            .await?;

        match row {
            Some(row) => parse_body(row.try_get(0)?),
            None => Ok(None)
        }
    }

    async fn insert_record(&self, namespace: &str, guild_id: GuildId, key: &str, record: &Record) -> Result<bool, Error> {
        let mut conn = self.pool.get().await?;
        let guild = Decimal::from(guild_id.get());
        let body = serde_json::to_string(record)?;

        let res = conn.execute(
            "INSERT INTO [RPPanel].[Record] (namespace, guild_id, record_key, body) \
             SELECT @P1, @P2, @P3, @P4 \
             WHERE NOT EXISTS (SELECT 1 FROM [RPPanel].[Record] WITH (UPDLOCK, HOLDLOCK) WHERE namespace = @P1 AND guild_id = @P2 AND record_key = @P3);",
            &[&namespace, &guild, &key, &body.as_str()])
            .await?;

        Ok(res.total() > 0)
    }

    async fn delete_record(&self, namespace: &str, guild_id: GuildId, key: &str) -> Result<Option<Record>, Error> {
        let mut conn = self.pool.get().await?;
        let guild = Decimal::from(guild_id.get());

        let row = conn.query(
            "DELETE FROM [RPPanel].[Record] OUTPUT DELETED.body WHERE namespace = @P1 AND guild_id = @P2 AND record_key = @P3;",
            &[&namespace, &guild, &key])
            .await?
            .into_row()
            .await?;

        match row {
            Some(row) => parse_body(row.try_get(0)?),
            None => Ok(None)
        }
    }

    async fn edit_record(&self, namespace: &str, guild_id: GuildId, key: &str, edit: &RecordEdit) -> Result<Option<EditOutcome>, Error> {
        let mut conn = self.pool.get().await?;
        let guild = Decimal::from(guild_id.get());

        Self::run_batch(&mut conn, "BEGIN TRANSACTION;").await?;

        let result = match Self::edit_locked(&mut conn, namespace, &guild, key, edit).await {
            Ok(outcome) => Self::run_batch(&mut conn, "COMMIT TRANSACTION;").await.map(|_| outcome),
            Err(ex) => Err(ex)
        };

        // A failed commit may leave the transaction open on a pooled connection.
        if result.is_err() {
            if let Err(rollback) = Self::run_batch(&mut conn, "ROLLBACK TRANSACTION;").await {
                debug!("Rollback after failed edit also failed: {}", rollback);
            }
        }

        result
    }

    async fn toggle_enabled(&self, namespace: &str, guild_id: GuildId) -> Result<bool, Error> {
        let mut conn = self.pool.get().await?;
        let guild = Decimal::from(guild_id.get());

        let row = conn.query(
            "MERGE [RPPanel].[Guild] WITH (HOLDLOCK) AS target \
             USING (SELECT @P1 AS namespace, @P2 AS guild_id) AS source \
             ON target.namespace = source.namespace AND target.guild_id = source.guild_id \
             WHEN MATCHED THEN UPDATE SET enabled = CASE WHEN target.enabled = 1 THEN 0 ELSE 1 END \
             WHEN NOT MATCHED THEN INSERT (namespace, guild_id, enabled) VALUES (source.namespace, source.guild_id, 0) \
             OUTPUT INSERTED.enabled;",
            &[&namespace, &guild])
            .await?
            .into_row()
            .await?;

        match row {
            Some(row) => Ok(row.try_get::<bool, _>(0)?.unwrap_or(false)),
            None => Err("Toggling the guild flag returned nothing".into())
        }
    }
}
