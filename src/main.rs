use std::io::{self, BufRead};
use std::path::PathBuf;

use eyre::{Result, bail};
use log::{debug, info, warn};

mod cli;

use cli::{Cli, OutputFormat};
use urlsum::config::{Config, config_path};
use urlsum::llm::Provider;
use urlsum::output;
use urlsum::pipeline::{Pipeline, Request, RequestStyle};
use urlsum::summarize::Strategy;

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("urlsum.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("urlsum")
        .join("logs")
}

fn build_after_help() -> String {
    let key_lines = [Provider::Groq, Provider::OpenAi, Provider::Anthropic, Provider::HuggingFace]
        .iter()
        .map(|p| {
            let vars = p.credential_env_vars();
            let set = vars.iter().any(|v| std::env::var(v).is_ok_and(|s| !s.trim().is_empty()));
            let mark = if set { "\x1b[32m✅\x1b[0m" } else { "\x1b[31m❌\x1b[0m" };
            format!("  {mark} {:<13} {}", p.name(), vars.join(" / "))
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "\nAPI KEYS:\n{key_lines}\n\nConfig file: {}\nLogs are written to: {}",
        config_path().display(),
        log_dir().join("urlsum.log").display()
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let file_config = Config::load().unwrap_or_else(|e| {
        warn!("Ignoring config file: {e}");
        Config::default()
    });

    // Profile, then config file, then command-line flags
    let style = RequestStyle::resolve(cli.prompt.as_deref(), cli.style.or(file_config.style))?;
    let config = file_config.overlay(cli.overrides()).resolve()?;
    let credential = config
        .provider
        .credential(cli.api_key.as_deref(), |var| std::env::var(var).ok());

    if cli.style.is_some() && !config.strategy.word_count_applies() {
        eprintln!("Note: --style has no effect with the {} strategy", Strategy::MapReduce);
    }

    if cli.verbose {
        let path = config_path();
        if path.exists() {
            eprintln!("Config: {}", path.display());
        }
        eprintln!(
            "Provider: {}\nModel: {}\nStrategy: {}\nChunking: {}",
            config.provider.name(),
            config.model_id,
            config.strategy,
            if config.chunking.enabled {
                format!("{} chars, {} overlap", config.chunking.chunk_size, config.chunking.overlap)
            } else {
                "off".to_string()
            },
        );
        if config.fetch.insecure_tls {
            eprintln!("TLS verification: off for web pages (use --secure-tls to enable)");
        }
    }
    debug!("Resolved config: {config:?}");

    let pipeline = Pipeline::from_config(config)?;

    // Collect URLs: from arg or stdin
    let urls = if let Some(ref url) = cli.url {
        vec![url.clone()]
    } else {
        let stdin = io::stdin();
        stdin.lock().lines().collect::<Result<Vec<_>, _>>()?
    };

    let urls: Vec<String> = urls.into_iter().map(|u| u.trim().to_string()).filter(|u| !u.is_empty()).collect();
    if urls.is_empty() {
        bail!("no URL provided\n\nUsage: urlsum <URL>\n       echo <URL> | urlsum");
    }

    let mut rendered = Vec::with_capacity(urls.len());
    let mut failures = 0;
    for url in &urls {
        let request = Request::new(url.as_str(), credential.as_str()).with_style(style.clone());
        let outcome = pipeline.run(&request).await;

        match &outcome {
            Ok(summary) => {
                if cli.verbose {
                    eprintln!(
                        "{url}: {} chunk(s), {} model call(s)",
                        summary.chunks, summary.model_calls
                    );
                }
            }
            Err(e) => {
                failures += 1;
                warn!("Request for {url} failed ({}): {e}", e.kind_name());
            }
        }

        rendered.push(match cli.format {
            OutputFormat::Text => output::render_text(&outcome),
            OutputFormat::Json => output::render_json(url, &outcome),
        });
    }

    let rendered = rendered.join("\n\n");
    if let Some(ref path) = cli.output {
        std::fs::write(path, &rendered)?;
        if cli.verbose {
            eprintln!("Output written to: {}", path.display());
        }
    } else {
        println!("{rendered}");
    }

    if failures > 0 {
        bail!("{failures} of {} request(s) failed", urls.len());
    }
    Ok(())
}
