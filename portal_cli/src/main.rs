use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use aws_s3_deployment::{resolve_bucket, sync_artifact, S3Store};
use clap::{Parser, Subcommand};
use web_portal::{CloudAssembly, PortalConfig, DEFAULT_OUT_DIR};

mod init;

use init::{aws_config_for, init_tracing, LogFormat};

/// Synthesize and deploy the web console hosting stack
#[derive(Parser)]
#[command(name = "portal")]
#[command(version)]
#[command(about = "Synthesize and deploy the web console hosting stack", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true, default_value = "info")]
    log_level: String,

    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the template and asset manifest
    Synth {
        #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUT_DIR)]
        out: PathBuf,
    },
    /// Synthesize, deploy the stack, then upload the web assets
    Deploy {
        #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUT_DIR)]
        out: PathBuf,
    },
    /// Upload the web assets into an existing bucket
    Sync {
        #[arg(short, long, value_name = "NAME")]
        bucket: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        for cause in e.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = web_portal::load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    match cli.command {
        Commands::Synth { out } => {
            let (_, written) = synth_to(&config, &out)?;
            for path in written {
                println!("{}", path.display());
            }
            Ok(())
        }
        Commands::Deploy { out } => block_on(deploy(&config, &out)),
        Commands::Sync { bucket } => block_on(sync(&config, &bucket)),
    }
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(future)
}

fn synth_to(config: &PortalConfig, out: &Path) -> Result<(CloudAssembly, Vec<PathBuf>)> {
    let assembly = web_portal::synth(config).context("Failed to synthesize stack")?;
    let written = assembly.write_to(out)?;
    tracing::info!(
        stack = %assembly.stack.stack_name,
        warnings = assembly.warnings.len(),
        out = %out.display(),
        "wrote cloud assembly"
    );
    Ok((assembly, written))
}

async fn deploy(config: &PortalConfig, out: &Path) -> Result<()> {
    let (assembly, _) = synth_to(config, out)?;
    let sdk_config = aws_config_for(&assembly.props).await;

    let cfn = aws_sdk_cloudformation::Client::new(&sdk_config);
    let outputs = aws_cfn_stack::deploy::deploy_stack(&cfn, &assembly.stack)
        .await
        .with_context(|| format!("Failed to deploy stack {}", assembly.stack.stack_name))?;

    let s3 = aws_sdk_s3::Client::new(&sdk_config);
    for artifact in assembly.assets.artifacts.iter() {
        let bucket = resolve_bucket(artifact, &outputs)?;
        let store = S3Store::new(s3.clone(), bucket);
        sync_artifact(artifact, &store)
            .await
            .with_context(|| format!("Failed to upload {} into {bucket}", artifact.source_dir.display()))?;
    }

    let console_url = outputs
        .get(&config.portal.console_url_output)
        .with_context(|| format!("Stack has no output named {}", config.portal.console_url_output))?;
    println!("https://{console_url}");
    Ok(())
}

async fn sync(config: &PortalConfig, bucket: &str) -> Result<()> {
    let assembly = web_portal::synth(config).context("Failed to synthesize stack")?;
    let sdk_config = aws_config_for(&assembly.props).await;
    let store = S3Store::new(aws_sdk_s3::Client::new(&sdk_config), bucket);
    for artifact in assembly.assets.artifacts.iter() {
        let report = sync_artifact(artifact, &store)
            .await
            .with_context(|| format!("Failed to upload {} into {bucket}", artifact.source_dir.display()))?;
        println!("uploaded {} objects into {bucket}, kept {} older objects", report.uploaded.len(), report.retained.len());
    }
    Ok(())
}
