//! One-shot client commands that talk to a running relay.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use foreign_relay::{
    DurableCache, HtmlPurifier, Relay, RelayCache, RelayError, RelayResponse, UserIdentity,
};
use relay_config_and_utils::Paths;
use relay_protocol_types::{HttpMethod, QueryValue, RequestBody, RequestDescriptor};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Arguments for `tbrelay request`.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: HttpMethod,

    /// Endpoint path such as /api/me.json
    pub endpoint: String,

    /// Query parameter as key=value (repeatable)
    #[arg(short, long = "query", value_parser = parse_key_value)]
    pub query: Vec<(String, String)>,

    /// Raw request body
    #[arg(long, conflicts_with = "form")]
    pub body: Option<String>,

    /// Form field as key=value (repeatable)
    #[arg(long, value_parser = parse_key_value)]
    pub form: Vec<(String, String)>,

    /// Send through the OAuth host with the bearer token
    #[arg(long)]
    pub oauth: bool,

    /// Treat non-2xx responses as failures
    #[arg(long)]
    pub ok_only: bool,
}

/// `tbrelay cache` subcommands.
#[derive(Subcommand, Debug)]
pub enum CacheArgs {
    /// Print a cached value
    Get { namespace: String, key: String },
    /// Store a value (parsed as JSON, or stored as a string)
    Set {
        namespace: String,
        key: String,
        value: String,
    },
    /// Remove a value
    Delete { namespace: String, key: String },
    /// Remove every value
    Clear,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

fn relay(paths: &Paths) -> Relay {
    Relay::connect(&paths.socket_file().to_string_lossy())
}

fn not_running(error: RelayError) -> anyhow::Error {
    match error {
        RelayError::Transport(_) => {
            anyhow!(error).context("Is the relay running? Try 'tbrelay start'")
        }
        other => anyhow!(other),
    }
}

impl RequestArgs {
    fn into_descriptor(self) -> RequestDescriptor {
        let mut descriptor = RequestDescriptor::new(self.endpoint)
            .with_method(self.method)
            .with_oauth(self.oauth)
            .with_ok_only(self.ok_only);

        for (key, value) in self.query {
            descriptor = descriptor.with_query_param(key, QueryValue::from(value));
        }

        if let Some(body) = self.body {
            descriptor = descriptor.with_body(RequestBody::from(body));
        } else if !self.form.is_empty() {
            let fields: Map<String, Value> = self
                .form
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();
            descriptor = descriptor.with_body(fields);
        }

        descriptor
    }
}

fn print_response(response: &RelayResponse) {
    println!("{} {}", response.status(), response.status_text());
    println!("{}", response.text());
}

/// `tbrelay request`
pub async fn request(paths: &Paths, args: RequestArgs) -> Result<()> {
    let descriptor = args.into_descriptor();

    match relay(paths).send_request(descriptor).await {
        Ok(response) => {
            print_response(&response);
            Ok(())
        }
        Err(e) => {
            if let Some(response) = e.response() {
                print_response(response);
            }
            Err(not_running(e))
        }
    }
}

/// `tbrelay whoami`
pub async fn whoami(paths: &Paths) -> Result<()> {
    let relay = relay(paths);
    relay.health().await.map_err(not_running)?;

    let cache: Arc<dyn DurableCache> = Arc::new(RelayCache::new(relay.clone()));
    let purifier = HtmlPurifier::new().context("Failed to build HTML purifier")?;
    let identity = UserIdentity::spawn(relay, cache, Arc::new(purifier));

    let name = identity
        .current_user()
        .await
        .context("Could not determine the signed-in user")?;
    let modhash = identity.modhash().await.unwrap_or_default();

    println!("User:    {}", name);
    println!("Modhash: {}", modhash);
    Ok(())
}

/// `tbrelay reload`
pub async fn reload(paths: &Paths) -> Result<()> {
    relay(paths).reload().await.map_err(not_running)?;
    println!("Configuration reloaded");
    Ok(())
}

/// `tbrelay cache ...`
pub async fn cache(paths: &Paths, args: CacheArgs) -> Result<()> {
    let cache = RelayCache::new(relay(paths));

    match args {
        CacheArgs::Get { namespace, key } => match cache.get(&namespace, &key).await {
            Ok(Some(value)) => println!("{}", serde_json::to_string_pretty(&value)?),
            Ok(None) => bail!("No value cached for {}/{}", namespace, key),
            Err(e) => return Err(e).context("Cache read failed"),
        },
        CacheArgs::Set {
            namespace,
            key,
            value,
        } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            cache
                .set(&namespace, &key, value)
                .await
                .context("Cache write failed")?;
            println!("Stored {}/{}", namespace, key);
        }
        CacheArgs::Delete { namespace, key } => {
            let deleted = cache
                .delete(&namespace, &key)
                .await
                .context("Cache delete failed")?;
            if deleted {
                println!("Deleted {}/{}", namespace, key);
            } else {
                println!("Nothing cached for {}/{}", namespace, key);
            }
        }
        CacheArgs::Clear => {
            cache.clear().await.context("Cache clear failed")?;
            println!("Cache cleared");
        }
    }

    Ok(())
}
