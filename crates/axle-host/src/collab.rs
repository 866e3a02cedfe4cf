//! Default collaborator stand-ins.
//!
//! Real deployments inject their own [`MailSender`], [`SqlRunner`], and
//! [`DirectoryLookup`] implementations through the host builder. These
//! stand-ins keep the host runnable without any external system: mail is
//! logged, the directory serves configured entries, and SQL reports that
//! no driver is wired in.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use axle_core::config::{DirectoryConfig, SmtpConfig, SqlConfig};
use axle_core::error::HostError;
use axle_core::result::HostResult;
use axle_core::traits::{DirectoryLookup, DirectoryUser, MailMessage, MailSender, SqlRow, SqlRunner};

/// Mail stand-in that logs every message instead of delivering it.
#[derive(Debug)]
pub struct LoggingMail {
    host: String,
    port: u16,
    from: String,
    sent: AtomicU64,
}

impl LoggingMail {
    /// Build from the `[smtp]` settings.
    pub fn new(config: &SmtpConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            from: config.from.clone(),
            sent: AtomicU64::new(0),
        }
    }

    /// Number of messages accepted so far.
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

impl Default for LoggingMail {
    fn default() -> Self {
        Self::new(&SmtpConfig::default())
    }
}

#[async_trait]
impl MailSender for LoggingMail {
    async fn send(&self, message: &MailMessage) -> HostResult<()> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        info!(
            relay = %format!("{}:{}", self.host, self.port),
            from = %self.from,
            to = ?message.to,
            subject = %message.subject,
            body_bytes = message.body.len(),
            "Mail accepted (logging stand-in, nothing delivered)"
        );
        Ok(())
    }
}

/// Directory stand-in serving the `[[directory.users]]` entries.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    users: Vec<DirectoryUser>,
}

impl StaticDirectory {
    /// Build from the `[directory]` settings. Distinguished names and
    /// principal names are synthesized from the configured domain.
    pub fn new(config: &DirectoryConfig) -> Self {
        let dn_suffix: String = config
            .domain
            .split('.')
            .map(|part| format!("DC={part}"))
            .collect::<Vec<_>>()
            .join(",");

        let users = config
            .users
            .iter()
            .map(|entry| DirectoryUser {
                account: entry.account.clone(),
                display_name: entry.display_name.clone(),
                email: entry.email.clone(),
                distinguished_name: format!(
                    "CN={},OU=Users,{dn_suffix}",
                    entry.display_name
                ),
                principal_name: format!("{}@{}", entry.account, config.domain),
                id: Uuid::new_v4(),
                groups: entry.groups.clone(),
            })
            .collect();

        Self { users }
    }
}

#[async_trait]
impl DirectoryLookup for StaticDirectory {
    async fn lookup_user(&self, account: &str) -> HostResult<Option<DirectoryUser>> {
        Ok(self
            .users
            .iter()
            .find(|user| user.account.eq_ignore_ascii_case(account))
            .cloned())
    }
}

/// SQL stand-in used when no driver is injected.
#[derive(Debug, Default)]
pub struct UnconfiguredSql {
    connections: Vec<String>,
}

impl UnconfiguredSql {
    /// Build from the `[sql]` settings, remembering the configured
    /// connection names for clearer error messages.
    pub fn new(config: &SqlConfig) -> Self {
        let mut connections: Vec<String> = config.connections.keys().cloned().collect();
        connections.sort();
        Self { connections }
    }

    fn refuse(&self, connection: &str) -> HostError {
        if self.connections.iter().any(|c| c == connection) {
            HostError::collaborator(format!(
                "SQL connection '{connection}' is configured but no SQL driver is wired into this host"
            ))
        } else {
            HostError::collaborator(format!("Unknown SQL connection '{connection}'"))
        }
    }
}

#[async_trait]
impl SqlRunner for UnconfiguredSql {
    async fn query(&self, connection: &str, _sql: &str) -> HostResult<Vec<SqlRow>> {
        Err(self.refuse(connection))
    }

    async fn execute(&self, connection: &str, _sql: &str) -> HostResult<u64> {
        Err(self.refuse(connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axle_core::config::DirectoryUserEntry;
    use axle_core::error::ErrorKind;

    #[tokio::test]
    async fn test_logging_mail_counts_sends() {
        let mail = LoggingMail::default();
        mail.send(&MailMessage::new("ops@example.org", "subject", "body"))
            .await
            .expect("send");
        mail.send(&MailMessage::new("ops@example.org", "again", "body"))
            .await
            .expect("send");
        assert_eq!(mail.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_static_directory_lookup() {
        let directory = StaticDirectory::new(&DirectoryConfig {
            domain: "corp.example.org".to_string(),
            users: vec![DirectoryUserEntry {
                account: "jan".to_string(),
                display_name: "Jan Jensen".to_string(),
                email: Some("jan@example.org".to_string()),
                groups: vec!["staff".to_string()],
            }],
        });

        let user = directory
            .lookup_user("JAN")
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(user.display_name, "Jan Jensen");
        assert_eq!(user.principal_name, "jan@corp.example.org");
        assert_eq!(
            user.distinguished_name,
            "CN=Jan Jensen,OU=Users,DC=corp,DC=example,DC=org"
        );
        assert_eq!(user.groups, vec!["staff"]);

        assert!(
            directory
                .lookup_user("absent")
                .await
                .expect("lookup")
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_unconfigured_sql_refuses() {
        let mut config = SqlConfig::default();
        config.connections.insert(
            "DEMO".to_string(),
            axle_core::config::SqlConnectionConfig {
                host: "db.internal".to_string(),
                database: "demo".to_string(),
                username: None,
                password: None,
            },
        );
        let sql = UnconfiguredSql::new(&config);

        let err = sql.query("DEMO", "SELECT 1").await.expect_err("no driver");
        assert_eq!(err.kind, ErrorKind::Collaborator);
        assert!(err.message.contains("no SQL driver"));

        let err = sql.execute("OTHER", "DELETE").await.expect_err("unknown");
        assert!(err.message.contains("Unknown SQL connection"));
    }
}
