//! Demo plugin.
//!
//! Walks every part of the host surface a plugin can touch: logging at
//! several levels, the resolved configuration snapshot, the host
//! arguments, the mail / SQL / directory collaborators, and event
//! publication. Its final step is configurable deliberate failure, which
//! demonstrates that one plugin's fault never affects the rest of the
//! host.
//!
//! Configuration keys (all optional):
//!
//! - `AdminMail` — recipient for the demo mail; no mail is sent when
//!   absent.
//! - `SqlConnection` — named connection for the demo query (default
//!   `DEMO`).
//! - `LookupUser` — account name for the directory lookup; falls back to
//!   the `USER` environment variable.
//! - `SimulateFailure` — `true`/`1` makes the run end with an error.

use axle_plugin_sdk::prelude::*;
use tracing::{debug, error, info, warn};
use uuid::uuid;

/// Event kind published by the demo plugin on every run.
pub const DEMO_EVENT: EventKind = EventKind(1042);

/// The stable demo plugin id.
pub const DEMO_PLUGIN_ID: PluginId = PluginId(uuid!("84fc7623-0b20-40e1-96bf-8b7f0a5bbd94"));

const EMAIL_BODY: &str = include_str!("../resources/email_message.txt");

/// Resources compiled into the plugin, as `(name, content)` pairs.
const RESOURCES: &[(&str, &str)] = &[("email_message.txt", EMAIL_BODY)];

/// The built-in demo plugin.
#[derive(Debug, Default)]
pub struct DemoPlugin;

impl DemoPlugin {
    /// Create the demo plugin.
    pub fn new() -> Self {
        Self
    }

    async fn demo_mail(&self, ctx: &PluginContext) {
        info!("E-MAIL");
        match ctx.config.value("AdminMail") {
            Some(recipient) => {
                info!(recipient, "Sending the embedded demo message");
                let message = MailMessage::new(recipient, "Axle Demo Plugin", EMAIL_BODY);
                if let Err(error) = ctx.mail.send(&message).await {
                    warn!(error = %error, "Mail collaborator refused the message");
                }
            }
            None => info!("No 'AdminMail' configured, skipping the demo mail"),
        }
    }

    async fn demo_sql(&self, ctx: &PluginContext) {
        info!("DATABASE");
        let connection = ctx.config.value("SqlConnection").unwrap_or("DEMO");
        match ctx
            .sql
            .query(connection, "SELECT name FROM sys.databases ORDER BY name")
            .await
        {
            Ok(rows) => {
                info!(connection, rows = rows.len(), "Query returned");
                for row in &rows {
                    if let Some(name) = row.get("name") {
                        info!("   {name}");
                    }
                }
            }
            // Expected with the default stand-in: no driver is wired in.
            Err(error) => warn!(connection, error = %error, "Demo query failed"),
        }
    }

    async fn demo_directory(&self, ctx: &PluginContext) {
        info!("USERS AND GROUPS");
        let account = match ctx.config.value("LookupUser") {
            Some(account) => account.to_string(),
            None => match std::env::var("USER") {
                Ok(account) => account,
                Err(_) => {
                    info!("No 'LookupUser' configured and no USER variable, skipping lookup");
                    return;
                }
            },
        };

        match ctx.directory.lookup_user(&account).await {
            Ok(Some(user)) => {
                info!("         Display Name: {}", user.display_name);
                info!("        Email Address: {}", user.email.as_deref().unwrap_or("-"));
                info!("   Distinguished Name: {}", user.distinguished_name);
                info!("  User Principal Name: {}", user.principal_name);
                info!("                   Id: {}", user.id);
                for group in &user.groups {
                    info!("                Group: {group}");
                }
            }
            Ok(None) => info!(account, "No such user in the directory"),
            Err(error) => warn!(account, error = %error, "Directory lookup failed"),
        }
    }
}

#[async_trait]
impl Plugin for DemoPlugin {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity::new(DEMO_PLUGIN_ID, "Axle Demo Plugin")
    }

    async fn run(&self, ctx: &PluginContext) -> anyhow::Result<()> {
        info!("***** DEMO PLUGIN *****");
        info!("This plugin demonstrates how to implement an Axle plugin and");
        info!("exercises the functionality the host provides.");

        info!("LOGGING");
        info!("This is a normal log line.");
        debug!("This is a debug log line.");
        error!("This is an error log line.");

        info!("CONFIGURATION");
        info!(
            "{} properties exist in the resolved configuration.",
            ctx.config.len()
        );
        for (key, values) in ctx.config.iter() {
            for value in values {
                info!("   {key} = {value}");
            }
        }

        info!("ARGUMENTS");
        info!("{} arguments passed on the command line.", ctx.args.len());
        for arg in ctx.args.iter() {
            info!("   {arg}");
        }

        info!("RESOURCES");
        info!("{} resources exist in the plugin.", RESOURCES.len());
        for (name, content) in RESOURCES {
            info!("   {name} ({} bytes)", content.len());
        }

        self.demo_mail(ctx).await;
        self.demo_sql(ctx).await;
        self.demo_directory(ctx).await;

        info!("EVENTS");
        let payload = EventPayload::new()
            .with_string("source", "demo")
            .with_string("greeting", "hello from the demo plugin");
        let delivered = ctx.events.publish(DEMO_EVENT, payload).await?;
        info!(kind = %DEMO_EVENT, delivered, "Published the demo event");

        if ctx.config.bool_value("SimulateFailure").unwrap_or(false) {
            info!("FAILURE");
            anyhow::bail!("This happens when a plugin fails and the host carries on!");
        }

        Ok(())
    }

    async fn run_event(&self, _ctx: &PluginContext, event: &Event) -> anyhow::Result<()> {
        debug!(
            kind = %event.kind,
            sender = %event.sender,
            "Demo plugin ignoring event"
        );
        Ok(())
    }
}
