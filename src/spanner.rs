use anyhow::{Context, Result};
use async_trait::async_trait;
use gcloud_gax::grpc::Code;
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation::{delete as delete_mutation, insert_or_update, update};
use gcloud_spanner::statement::Statement;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

use crate::config::Config;
use crate::error::OpError;
use crate::models::{Product, RatingSum};
use crate::store::{token_start_id, ProductStore, ScanPage};

const TABLE: &str = "products";

/// Shareable Spanner-backed product store
///
/// Constructed once at startup and injected into the dispatcher through
/// application state; the underlying client is reused across invocations.
#[derive(Clone)]
pub struct SpannerStore {
    inner: Arc<Client>,
}

impl SpannerStore {
    /// Create a new store from configuration
    ///
    /// The gcloud-spanner library automatically detects the
    /// SPANNER_EMULATOR_HOST environment variable and connects to the
    /// emulator when set, or production Spanner otherwise.
    ///
    /// Also performs auto-provisioning: the instance, database, and
    /// products table are created if they don't exist.
    pub async fn from_config(config: &Config) -> Result<Self> {
        auto_provision(config).await?;

        let database_path = format!(
            "projects/{}/instances/{}/databases/{}",
            config.spanner_project, config.spanner_instance, config.spanner_database
        );

        if let Some(host) = &config.spanner_emulator_host {
            tracing::info!("Connecting to Spanner emulator at: {}", host);
        } else {
            tracing::info!("Connecting to production Spanner");
        }

        // ClientConfig::default() automatically uses SPANNER_EMULATOR_HOST if set
        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!("Connected to Spanner database: {}", database_path);

        Ok(Self {
            inner: Arc::new(client),
        })
    }

    /// Perform a health check by executing a simple query
    ///
    /// # Errors
    /// Returns an error if the Spanner query fails or if the transaction
    /// cannot be created
    pub async fn health_check(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self
            .inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }

    async fn row_exists(&self, id: &str) -> Result<bool> {
        let mut statement = Statement::new("SELECT id FROM products WHERE id = @id");
        let id_str = id.to_string();
        statement.add_param("id", &id_str);

        let mut tx = self
            .inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query product existence")?;

        Ok(result_set.next().await?.is_some())
    }
}

#[async_trait]
impl ProductStore for SpannerStore {
    async fn scan(&self, limit: i64, start_key: Option<JsonValue>) -> Result<ScanPage, OpError> {
        let after = match &start_key {
            Some(token) => Some(token_start_id(token)?),
            None => None,
        };

        // Fetch one row past the page so the token is only set when more
        // rows actually remain
        let fetch = limit + 1;
        let query = if after.is_some() {
            format!(
                "SELECT id, category, title, rating_sum, rating_count FROM products \
                 WHERE id > @after ORDER BY id LIMIT {}",
                fetch
            )
        } else {
            format!(
                "SELECT id, category, title, rating_sum, rating_count FROM products \
                 ORDER BY id LIMIT {}",
                fetch
            )
        };

        let mut statement = Statement::new(&query);
        if let Some(after) = &after {
            statement.add_param("after", after);
        }

        let mut tx = self
            .inner
            .single()
            .await
            .context("Failed to create read transaction for scan")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute scan query")?;

        let mut items = Vec::new();
        while let Some(row) = result_set.next().await.context("Failed to read scan row")? {
            let id: String = row.column_by_name("id").context("missing id column")?;
            let category: String = row
                .column_by_name("category")
                .context("missing category column")?;
            let title: String = row
                .column_by_name("title")
                .context("missing title column")?;
            let rating_sum: f64 = row
                .column_by_name("rating_sum")
                .context("missing rating_sum column")?;
            let rating_count: i64 = row
                .column_by_name("rating_count")
                .context("missing rating_count column")?;

            items.push(Product {
                id,
                category,
                title,
                rating_sum: RatingSum(rating_sum),
                rating_count,
            });
        }

        let last_evaluated_key = if items.len() as i64 > limit {
            items.truncate(limit as usize);
            items.last().map(|p| json!({"id": p.id}))
        } else {
            None
        };

        tracing::debug!(
            "Scanned {} products (limit: {}, resumed: {})",
            items.len(),
            limit,
            after.is_some()
        );

        Ok(ScanPage {
            items,
            last_evaluated_key,
        })
    }

    async fn get(&self, id: &str) -> Result<Option<Product>, OpError> {
        let mut statement = Statement::new(
            "SELECT id, category, title, rating_sum, rating_count FROM products WHERE id = @id",
        );
        let id_str = id.to_string();
        statement.add_param("id", &id_str);

        let mut tx = self
            .inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query product")?;

        if let Some(row) = result_set.next().await.context("Failed to read product row")? {
            let category: String = row
                .column_by_name("category")
                .context("missing category column")?;
            let title: String = row
                .column_by_name("title")
                .context("missing title column")?;
            let rating_sum: f64 = row
                .column_by_name("rating_sum")
                .context("missing rating_sum column")?;
            let rating_count: i64 = row
                .column_by_name("rating_count")
                .context("missing rating_count column")?;

            tracing::debug!("Read product with id: {}", id);
            Ok(Some(Product {
                id: id_str,
                category,
                title,
                rating_sum: RatingSum(rating_sum),
                rating_count,
            }))
        } else {
            tracing::debug!("Product not found with id: {}", id);
            Ok(None)
        }
    }

    async fn put(&self, product: &Product) -> Result<(), OpError> {
        let mutation = insert_or_update(
            TABLE,
            &["id", "category", "title", "rating_sum", "rating_count"],
            &[
                &product.id,
                &product.category,
                &product.title,
                &product.rating_sum.0,
                &product.rating_count,
            ],
        );

        self.inner
            .apply(vec![mutation])
            .await
            .context("Failed to write product to Spanner")?;

        tracing::debug!("Put product with id: {}", product.id);
        Ok(())
    }

    async fn update_existing(
        &self,
        id: &str,
        category: &str,
        title: &str,
    ) -> Result<(), OpError> {
        // Existence check first so a missing row surfaces as a condition
        // failure; the update mutation itself also refuses to insert
        if !self.row_exists(id).await? {
            tracing::debug!("Conditional update rejected, no product with id: {}", id);
            return Err(OpError::ConditionFailed(id.to_string()));
        }

        let id_str = id.to_string();
        let category_str = category.to_string();
        let title_str = title.to_string();
        let mutation = update(
            TABLE,
            &["id", "category", "title"],
            &[&id_str, &category_str, &title_str],
        );

        self.inner
            .apply(vec![mutation])
            .await
            .context("Failed to update product in Spanner")?;

        tracing::debug!("Updated product with id: {}", id);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), OpError> {
        let id_str = id.to_string();
        let mutation = delete_mutation(TABLE, Key::new(&id_str));

        self.inner
            .apply(vec![mutation])
            .await
            .context("Failed to delete product from Spanner")?;

        tracing::debug!("Deleted product with id: {}", id);
        Ok(())
    }
}

/// Automatically provision Spanner instance, database, and table
///
/// Checks whether the configured resources exist and creates them if
/// needed, enabling zero-setup local development with the emulator.
async fn auto_provision(config: &Config) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_client = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.spanner_project);
    let instance_path = format!("{}/instances/{}", project_path, config.spanner_instance);
    let database_path = format!("{}/databases/{}", instance_path, config.spanner_database);

    ensure_instance_exists(&admin_client, config, &project_path, &instance_path).await?;
    ensure_database_exists(&admin_client, &instance_path, &database_path).await?;
    ensure_table_exists(&admin_client, &database_path).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

/// Ensure the Spanner instance exists, creating it if necessary
async fn ensure_instance_exists(
    admin_client: &AdminClient,
    config: &Config,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let get_request = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };

    match admin_client.instance().get_instance(get_request, None).await {
        Ok(_) => {
            tracing::info!("Instance already exists: {}", instance_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Instance not found, creating: {}", instance_path);

            let instance_config = if config.spanner_emulator_host.is_some() {
                format!("{}/instanceConfigs/emulator-config", project_path)
            } else {
                format!("{}/instanceConfigs/regional-us-central1", project_path)
            };

            let create_request = CreateInstanceRequest {
                parent: project_path.to_string(),
                instance_id: config.spanner_instance.clone(),
                instance: Some(Instance {
                    name: instance_path.to_string(),
                    config: instance_config,
                    display_name: format!("{} instance", config.spanner_instance),
                    node_count: 1,
                    ..Default::default()
                }),
            };

            let mut operation = admin_client
                .instance()
                .create_instance(create_request, None)
                .await
                .context("Failed to start instance creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create instance")?;

            tracing::info!("Instance created successfully: {}", instance_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check instance existence: {}",
            e.message()
        )),
    }
}

/// Ensure the Spanner database exists, creating it if necessary
async fn ensure_database_exists(
    admin_client: &AdminClient,
    instance_path: &str,
    database_path: &str,
) -> Result<()> {
    let get_request = GetDatabaseRequest {
        name: database_path.to_string(),
    };

    match admin_client
        .database()
        .get_database(get_request, None)
        .await
    {
        Ok(_) => {
            tracing::info!("Database already exists: {}", database_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Database not found, creating: {}", database_path);

            let database_id = database_path
                .split('/')
                .next_back()
                .context("Invalid database path")?;

            let create_request = CreateDatabaseRequest {
                parent: instance_path.to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: vec![],
                encryption_config: None,
                database_dialect: 1, // Google Standard SQL
                proto_descriptors: vec![],
            };

            let mut operation = admin_client
                .database()
                .create_database(create_request, None)
                .await
                .context("Failed to start database creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create database")?;

            tracing::info!("Database created successfully: {}", database_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check database existence: {}",
            e.message()
        )),
    }
}

/// Ensure the products table exists, creating it if necessary
async fn ensure_table_exists(admin_client: &AdminClient, database_path: &str) -> Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let ddl_response = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?;

    let table_exists = ddl_response
        .into_inner()
        .statements
        .iter()
        .any(|stmt| {
            stmt.contains("CREATE TABLE products") || stmt.contains("CREATE TABLE `products`")
        });

    if table_exists {
        tracing::info!("Table 'products' already exists");
        Ok(())
    } else {
        tracing::info!("Table 'products' not found, creating...");

        let create_table_ddl = r#"
CREATE TABLE products (
    id STRING(36) NOT NULL,
    category STRING(MAX) NOT NULL,
    title STRING(MAX) NOT NULL,
    rating_sum FLOAT64 NOT NULL,
    rating_count INT64 NOT NULL,
) PRIMARY KEY (id)
"#
        .trim()
        .to_string();

        let update_request = UpdateDatabaseDdlRequest {
            database: database_path.to_string(),
            statements: vec![create_table_ddl],
            operation_id: String::new(),
            proto_descriptors: vec![],
            throughput_mode: false,
        };

        let mut operation = admin_client
            .database()
            .update_database_ddl(update_request, None)
            .await
            .context("Failed to start table creation")?;

        operation
            .wait(None)
            .await
            .context("Failed to create table")?;

        tracing::info!("Table 'products' created successfully");
        Ok(())
    }
}
