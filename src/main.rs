mod cli;

use lazyhls::{config, server};
use lazyhls_av::{FfprobeProber, Prober, ToolRegistry};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags override the config file
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting lazyhls server");
    tracing::info!(
        "Server will listen on {}:{}, cache at {:?}",
        config.server.host,
        config.server.port,
        config.cache.dir
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "lazyhls=trace,lazyhls_av=trace,lazyhls_media=debug,tower_http=debug".to_string()
        } else {
            "lazyhls=info,lazyhls_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => probe_file(&file, cli.config.as_deref(), json),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("lazyhls {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn probe_file(
    file: &std::path::Path,
    config_path: Option<&std::path::Path>,
    json: bool,
) -> Result<()> {
    if !file.is_file() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools);
    let prober = FfprobeProber::new(tools.path_or_name("ffprobe"));

    let rt = tokio::runtime::Runtime::new()?;
    let info = rt.block_on(prober.probe(file))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    let secs = info.duration as u64;
    println!(
        "Duration: {:02}:{:02}:{:02} ({:.3}s)",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        info.duration
    );
    println!("Video: {} {}x{}", info.codec, info.width, info.height);
    println!("Size: {} bytes", info.size);
    println!("Bitrate: {} bit/s", info.bitrate);
    println!("\nSegments: {}", info.total_segments);
    if let Some(last) = info.total_segments.checked_sub(1).and_then(|i| info.window(i)) {
        println!(
            "  last: #{} at {:.3}s, {:.3}s long",
            last.index, last.start, last.duration
        );
    }

    Ok(())
}

fn check_tools(config_path: Option<&std::path::Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools).check_all();
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
            print!(" ({})", version);
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
        println!("Some tools are missing. Install ffmpeg to serve segments.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Cache dir: {:?}", config.cache.dir);
            println!(
                "  Video: {} preset={} crf={} gop={}",
                config.transcode.video_codec,
                config.transcode.preset,
                config.transcode.crf,
                config.transcode.gop_size
            );
            println!(
                "  Audio: {} {}",
                config.transcode.audio_codec, config.transcode.audio_bitrate
            );
            match config.transcode.timeout_secs {
                Some(secs) => println!("  Transcode timeout: {}s", secs),
                None => println!("  Transcode timeout: none"),
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Cache dir: {:?}", config.cache.dir);
        }
    }

    Ok(())
}
