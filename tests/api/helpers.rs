use chrono::{DateTime, Utc};
use reqwest::Response;
use sqlx::{migrate, postgres::PgRow, Connection, Executor, PgConnection, PgPool, Row};
use uuid::Uuid;
use wiremock::MockServer;

use newsletter_engine::{
    config::{get_configuration, DatabaseSettings, Settings},
    startup::{get_connection_db_pool, Application},
};

pub struct TestApp {
    pub config: Settings,
    pub address: String,
    pub db_pool: PgPool,
    pub email_server: MockServer,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        let mut config = get_configuration().expect("Missing configuration file.");
        let db_test_name = format!("db_{}", Uuid::new_v4().to_string().replace('-', "_"));
        let email_server = MockServer::start().await;

        // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
        // take into account: when port is 0, the OS will search for the first available port
        config.set_app_port(0);
        config.set_email_client_base_url(email_server.uri());

        let db_pool = configure_db(&mut config.database, db_test_name.clone()).await;

        let application = Application::build(config.clone())
            .await
            .expect("Failed to build application.");

        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            config: config.clone(),
            db_pool,
            email_server,
        }
    }

    pub async fn post_broadcast(&self, body: serde_json::Value) -> Response {
        let client = reqwest::Client::new();
        let url = format!("{}/newsletter/broadcasts", self.address);

        client
            .post(&url)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_send_stats(&self, limit: Option<i64>) -> Response {
        let client = reqwest::Client::new();
        let url = match limit {
            Some(limit) => format!("{}/newsletter/stats?limit={}", self.address, limit),
            None => format!("{}/newsletter/stats", self.address),
        };

        client
            .get(&url)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_tracking_pixel(&self, subscriber_id: Uuid, send_id: Uuid) -> Response {
        let client = reqwest::Client::new();
        let url = format!(
            "{}/newsletter/track/{}/{}",
            self.address, subscriber_id, send_id
        );

        client
            .get(&url)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_templates(&self) -> Response {
        let client = reqwest::Client::new();
        let url = format!("{}/newsletter/templates", self.address);

        client
            .get(&url)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn insert_subscriber(&self, email: &str, active: bool) -> Uuid {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO subscribers (id, email, active, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await
        .expect("Failed to insert test subscriber.");

        id
    }

    pub async fn deactivate_subscriber(&self, id: Uuid) {
        sqlx::query("UPDATE subscribers SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await
            .expect("Failed to deactivate test subscriber.");
    }

    pub async fn insert_article(&self, title: &str) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO articles (title, excerpt, image, category, created_at)
            VALUES ($1, $2, NULL, $3, $4)
            RETURNING id
            "#,
        )
        .bind(title)
        .bind("A short excerpt.")
        .bind("General")
        .bind(Utc::now())
        .map(|row: PgRow| row.get::<i64, _>("id"))
        .fetch_one(&self.db_pool)
        .await
        .expect("Failed to insert test article.")
    }

    /// Writes a ledger row directly, bypassing the broadcast endpoint.
    /// `sent_at` is explicit so ordering assertions never hinge on two rows
    /// landing on the same clock tick.
    pub async fn insert_send(&self, subscriber_count: i32, sent_at: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO sends (id, sent_at, article_count, subscriber_count)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(sent_at)
        .bind(1)
        .bind(subscriber_count)
        .execute(&self.db_pool)
        .await
        .expect("Failed to insert test send.");

        id
    }

    pub async fn count_sends(&self) -> i64 {
        sqlx::query("SELECT COUNT(*) AS total FROM sends")
            .map(|row: PgRow| row.get::<i64, _>("total"))
            .fetch_one(&self.db_pool)
            .await
            .expect("Failed to count sends.")
    }

    pub async fn count_opens(&self, send_id: Uuid) -> i64 {
        sqlx::query("SELECT COUNT(*) AS total FROM opens WHERE send_id = $1")
            .bind(send_id)
            .map(|row: PgRow| row.get::<i64, _>("total"))
            .fetch_one(&self.db_pool)
            .await
            .expect("Failed to count opens.")
    }
}

async fn configure_db(db_config: &mut DatabaseSettings, db_test_name: String) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect_with(&db_config.get_db_options())
        .await
        .expect("Failed to connect to Postgres.");

    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, db_test_name))
        .await
        .expect("Failed to create database.");

    connection
        .close()
        .await
        .expect("Failed to close connection.");

    // Execute migrations
    db_config.set_name(db_test_name.clone());

    let db_pool = get_connection_db_pool(db_config);

    migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations.");

    db_pool
}
