use std::{path::PathBuf, time::Instant};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "playout", version)]
struct Cli {
    /// Log verbosity.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    log: LogLevel,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a playlist for a number of ticks.
    Run(RunArgs),
    /// Validate a playlist and print each layer's producer chain.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input playlist JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Number of channel ticks to run.
    #[arg(long)]
    ticks: u64,

    /// Write the last composited frame to this PNG path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Pace ticks at the channel frame rate instead of running flat out.
    #[arg(long, default_value_t = false)]
    realtime: bool,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Input playlist JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(cli.log))
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let playlist = playout::Playlist::from_path(&args.in_path)
        .with_context(|| format!("load playlist '{}'", args.in_path.display()))?;
    let mut channel = playlist.build_channel().context("build channel")?;

    let period = channel.config().fps.frame_duration();
    let started = Instant::now();
    let mut last = None;
    for tick in 0..args.ticks {
        if args.realtime {
            let due = started + period.saturating_mul(u32::try_from(tick).unwrap_or(u32::MAX));
            if let Some(wait) = due.checked_duration_since(Instant::now()) {
                std::thread::sleep(wait);
            }
        }
        last = Some(
            channel
                .tick()
                .with_context(|| format!("tick {tick}"))?,
        );
    }

    for status in channel.statuses() {
        eprintln!("{status}");
    }
    eprintln!(
        "{} ticks in {:.3}s",
        channel.frame_index().0,
        started.elapsed().as_secs_f64()
    );

    if let Some(out) = &args.out {
        let frame = last.unwrap_or_else(|| channel.processor().create_frame());
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        image::save_buffer_with_format(
            out,
            frame.data(),
            frame.width(),
            frame.height(),
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", out.display()))?;
        eprintln!("wrote {}", out.display());
    }
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let playlist = playout::Playlist::from_path(&args.in_path)
        .with_context(|| format!("load playlist '{}'", args.in_path.display()))?;
    let cfg = &playlist.channel;
    println!(
        "channel {}x{} @ {}/{} fps",
        cfg.canvas.width, cfg.canvas.height, cfg.fps.num, cfg.fps.den
    );
    for layer in &playlist.layers {
        let Some(head) = playlist
            .build_layer_chain(layer)
            .with_context(|| format!("layer {}", layer.index))?
        else {
            println!("layer {}: empty", layer.index);
            continue;
        };
        println!("layer {}:", layer.index);
        for producer in playout::walk_chain(&head)? {
            println!("  {} {}", producer.id(), producer.label());
        }
    }
    Ok(())
}
