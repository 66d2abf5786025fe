use anyhow::{anyhow, Context};
use celery_client::runtime::block_on;
use celery_client::{Celery, ClientOptions, Signature, TaskArgs, TaskId};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::Value;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(version, about = "Submit tasks to a Celery worker pool and read their results", long_about = None)]
struct Cli {
    /// Broker host.
    #[clap(long, env = "CELERY_BROKER_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Broker port.
    #[clap(long, env = "CELERY_BROKER_PORT", default_value_t = 6379)]
    port: u16,

    /// Database index.
    #[clap(long, env = "CELERY_BROKER_DB", default_value_t = 0)]
    db: u32,

    /// Password sent once after connecting.
    #[clap(long, env = "CELERY_BROKER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Seconds to wait for the socket to open.
    #[clap(long, value_name = "SECS")]
    connect_timeout: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit one task and print its ID.
    #[command(arg_required_else_help = true)]
    Post {
        /// Task name as registered with the workers.
        name: String,

        /// Positional argument as JSON. Repeatable.
        #[clap(long = "arg", value_name = "JSON")]
        args: Vec<String>,

        /// Keyword argument as KEY=JSON. Repeatable.
        #[clap(long = "kwarg", value_name = "KEY=JSON")]
        kwargs: Vec<String>,

        /// Queue to push onto.
        #[clap(long, default_value = celery_client::DEFAULT_ROUTING_KEY)]
        queue: String,

        /// Don't run before this RFC 3339 timestamp.
        #[clap(long)]
        eta: Option<String>,

        /// Wait up to this many seconds for the result and print it.
        #[clap(long, value_name = "SECS")]
        wait: Option<f64>,

        /// Seconds between result checks while waiting.
        #[clap(long, value_name = "SECS", default_value_t = 0.5)]
        interval: f64,
    },

    /// Print the status of a submitted task.
    #[command(arg_required_else_help = true)]
    Status {
        task_id: String,
    },
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let cli = Cli::parse();

    let mut options = ClientOptions::new(cli.host, cli.port).with_db(cli.db);
    if let Some(password) = cli.password {
        options = options.with_password(password);
    }
    if let Some(secs) = cli.connect_timeout {
        options = options.with_connect_timeout(Duration::try_from_secs_f64(secs).context("invalid connect timeout")?);
    }
    let celery = Celery::new(options);

    block_on(async move {
        match cli.command {
            Command::Post { name, args, kwargs, queue, eta, wait, interval } => {
                let args = parse_args(&args, &kwargs)?;
                let mut task = celery.task(name, args);
                if let Some(eta) = eta {
                    task = task.with_eta_str(&eta)?;
                }

                let result = task.apply_async(&queue).await.context("submitting task failed")?;
                info!(task_id = result.id(), queue; "Task submitted");
                println!("{}", result.id());

                if let Some(wait) = wait {
                    let timeout = Duration::try_from_secs_f64(wait).context("invalid wait")?;
                    let interval = Duration::try_from_secs_f64(interval).context("invalid interval")?;
                    let value = result.get(timeout, interval).await?;
                    println!("{}", serde_json::to_string(&value)?);
                }
            }

            Command::Status { task_id } => {
                let task_id: TaskId = task_id.parse()?;
                let status = celery.async_result(task_id).status().await.context("reading task status failed")?;
                println!("{status}");
            }
        }
        Result::<(), anyhow::Error>::Ok(())
    })
}

/// Build task arguments from CLI values: each `--arg` is JSON, each `--kwarg` is `KEY=JSON`.
fn parse_args(args: &[String], kwargs: &[String]) -> Result<TaskArgs, anyhow::Error> {
    let mut task_args = TaskArgs::new();
    for arg in args {
        let value: Value = serde_json::from_str(arg).with_context(|| format!("--arg {arg:?} is not JSON"))?;
        task_args = task_args.arg(value);
    }
    for kwarg in kwargs {
        let (key, json) = kwarg.split_once('=').ok_or_else(|| anyhow!("--kwarg {kwarg:?} is not KEY=JSON"))?;
        let value: Value = serde_json::from_str(json).with_context(|| format!("--kwarg {key:?} value is not JSON"))?;
        task_args = task_args.kwarg(key, value);
    }
    Ok(task_args)
}
