mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use sf_core::config::Config;
use sf_core::EpisodeId;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = Config::load_or_default(config_path);

    // CLI flags win over the config file.
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting spriteforge server");
    sf_server::start(config).await?;
    Ok(())
}

async fn generate_one(episode_id: &str, config_path: Option<&std::path::Path>) -> Result<()> {
    let episode_id: EpisodeId = episode_id
        .parse()
        .with_context(|| format!("invalid episode id {episode_id:?}"))?;

    let ctx = sf_server::build_context(Config::load_or_default(config_path))?;
    let metadata = ctx.sprites.sprite_metadata(&episode_id).await?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

async fn warm(config_path: Option<&std::path::Path>) -> Result<()> {
    let ctx = sf_server::build_context(Config::load_or_default(config_path))?;
    let report = ctx.sprites.warm_all().await?;
    println!(
        "generated: {}, cached: {}, skipped: {}, failed: {}",
        report.generated, report.cached, report.skipped, report.failed
    );
    if report.failed > 0 {
        anyhow::bail!("{} sprite(s) could not be generated", report.failed);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "spriteforge=trace,sf_server=trace,sf_av=trace,sf_db=debug,sf_core=debug,tower_http=debug"
                .to_string()
        } else {
            "spriteforge=info,sf_server=info,sf_av=info,sf_db=info,tower_http=info".to_string()
        }
    });

    // Logs go to stderr; stdout carries command output such as sprite JSON.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Sprite { episode_id } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(generate_one(&episode_id, cli.config.as_deref()))
        }
        Commands::Warm => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(warm(cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("spriteforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools(config_path: Option<&std::path::Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = sf_av::ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg is missing. Sprites cannot be generated until it is installed.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("failed to read {}", p.display()))?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.server.db_path.display());
    println!("  Streams: {}", config.storage.stream_root.display());
    println!(
        "  Sprites: {} (served at {})",
        config.storage.sprite_dir().display(),
        config.storage.public_prefix
    );
    println!(
        "  Tiles: {}x{} every {}s, {} per chunk",
        config.thumbnails.width,
        config.thumbnails.height,
        config.thumbnails.interval_secs,
        config.thumbnails.frames_per_chunk
    );

    let warnings = config.validate();
    for w in &warnings {
        println!("  ⚠ {w}");
    }

    Ok(())
}
