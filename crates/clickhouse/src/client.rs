//! ClickHouse client wrapper.

use crate::config::ClickHouseConfig;
use crate::schema::database_ident;
use clickhouse::Client;
use std::sync::Arc;
use tracing::info;
use watch_core::Result;

/// ClickHouse client wrapper bound to the configured database.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: Arc<ClickHouseConfig>,
}

impl ClickHouseClient {
    /// Creates a new ClickHouse client. Fails if the database name is not a
    /// plain identifier.
    pub fn new(config: ClickHouseConfig) -> Result<Self> {
        database_ident(&config.database)?;
        let client = Self::base(&config).with_database(&config.database);

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse client"
        );

        Ok(Self {
            inner: client,
            config: Arc::new(config),
        })
    }

    fn base(config: &ClickHouseConfig) -> Client {
        let mut client = Client::default().with_url(&config.url);

        if let Some(ref user) = config.username {
            client = client.with_user(user);
        }

        if let Some(ref pass) = config.password {
            client = client.with_password(pass);
        }
        client
    }

    /// Returns the inner clickhouse client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// A client not bound to any database, for creating the database itself.
    pub fn server(&self) -> Client {
        Self::base(&self.config)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }
}
