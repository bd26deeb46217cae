use crate::Result;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

/// Server settings for the Snaplink schema.
///
/// The migrations declare `utf8mb4` tables with `ascii_bin` short-code
/// columns, and alias reservation relies on InnoDB gap locking, so the
/// image must be MySQL 8 or later.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    /// `mysql` image tag.
    #[builder(default = "8.4".to_string())]
    tag: String,
    #[builder(default = "snaplink".to_string())]
    database: String,
    #[builder(default = "snaplink".to_string())]
    username: String,
    #[builder(default = "snaplink".to_string())]
    password: String,
}

/// A throwaway MySQL server for store integration tests.
///
/// The server runs with a `utf8mb4` default character set so that click
/// fields round-trip arbitrary user-agent and referer text. The container
/// stops when this is dropped.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", config.tag.as_str())
            .with_exposed_port(3306_u16.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.username.as_str())
            .with_env_var("MYSQL_PASSWORD", config.password.as_str())
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .with_cmd([
                "--character-set-server=utf8mb4",
                "--collation-server=utf8mb4_0900_ai_ci",
            ])
            .start()
            .await?;

        Ok(Self { container, config })
    }

    /// DSN for the test database, reachable from the host.
    pub async fn database_url(&self) -> Result<String> {
        let host = self.container.get_host().await?;
        let port = self.container.get_host_port_ipv4(3306).await?;
        Ok(format!(
            "mysql://{}:{}@{}:{}/{}",
            self.config.username, self.config.password, host, port, self.config.database
        ))
    }
}
