use std::{fs, path::Path, path::PathBuf, sync::Arc};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framestitch::{
    AssembleOptions, DirectoryImageStore, FfmpegLogLevel, FfmpegSinkBackend, FourCc,
    FrameSampler, ImageReference, ImageStore, IndexedVideoAssembler, NodeContext, NodeRegistry,
    ProgressCallback, ProgressInfo, VideoMetadataReader, encode_record, extract_image_name,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Value, json};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

const CLI_AFTER_HELP: &str = "Examples:\n  framestitch info clip.mp4 --json\n  framestitch frame clip.mp4 --number 12\n  framestitch collect 12 image-000000.png\n  framestitch assemble --out out.mp4 --fps 24 --codec mp4v '[1,\"image-000001.png\"]' '[0,\"image-000000.png\"]'\n  framestitch invoke video_frame_rate '{\"video_path\": \"clip.mp4\"}'\n  framestitch completions zsh > _framestitch";

#[derive(Debug, Parser)]
#[command(
    name = "framestitch",
    version,
    about = "Sample video frames and stitch indexed images back into videos",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory used as the image store.
    #[arg(long, global = true, default_value = "images")]
    store: PathBuf,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load one frame of a video into the image store.
    #[command(
        about = "Sample a video frame",
        after_help = "Examples:\n  framestitch frame clip.mp4\n  framestitch frame clip.mp4 --number 30 --out thirty.png"
    )]
    Frame {
        /// Input video path.
        input: PathBuf,
        /// 1-based frame number.
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        number: i64,
        /// Write the frame to this image file instead of the store.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print frame count, frame rate, and dimensions.
    #[command(about = "Print video properties", visible_alias = "probe")]
    Info {
        /// Input video path.
        input: PathBuf,
    },

    /// Serialize an (index, image name) record.
    #[command(about = "Build an indexed image record")]
    Collect {
        /// Temporal position of the image.
        #[arg(allow_negative_numbers = true)]
        index: i64,
        /// Image name in the store.
        image_name: String,
    },

    /// Write records to a video in index order.
    #[command(
        about = "Assemble records into a video",
        after_help = "Records come from positional arguments and/or --from (a JSON array of record strings, or one record per line)."
    )]
    Assemble {
        /// Output video path.
        #[arg(long)]
        out: PathBuf,
        /// Output frames per second.
        #[arg(long, default_value_t = framestitch::DEFAULT_FPS)]
        fps: f64,
        /// Output FourCC codec.
        #[arg(long, default_value = "x264")]
        codec: String,
        /// File of records.
        #[arg(long)]
        from: Option<PathBuf>,
        /// Serialized records.
        records: Vec<String>,
    },

    /// Print the identifier of an image reference.
    #[command(about = "Extract an image name from a reference")]
    Name {
        /// Image reference as JSON (`{"image_name": ".."}`) or a bare name.
        reference: String,
    },

    /// Run a registered node with JSON fields.
    #[command(about = "Invoke a node by type tag")]
    Invoke {
        /// Node type tag (see `framestitch nodes`).
        type_tag: String,
        /// Node fields as a JSON object.
        #[arg(default_value = "{}")]
        fields: String,
    },

    /// List registered nodes.
    #[command(about = "List available nodes")]
    Nodes,

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        if info.total == Some(info.current) {
            self.bar.finish_and_clear();
        }
    }
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if global.verbose {
        TermLogger::init(
            LevelFilter::Debug,
            ConfigBuilder::new().set_target_level(LevelFilter::Error).build(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )?;
    }

    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level.parse()?;
        framestitch::set_ffmpeg_log_level(parsed);
    }

    Ok(())
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

/// Parse a records file: either a JSON array of record strings, or one
/// record per non-empty line.
fn parse_records_file(contents: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let trimmed = contents.trim_start();
    if let Ok(records) = serde_json::from_str::<Vec<String>>(trimmed) {
        return Ok(records);
    }
    if trimmed.starts_with("[[") {
        return Err("records file looks like a nested array; expected an array of record strings".into());
    }
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn parse_reference(text: &str) -> ImageReference {
    serde_json::from_str::<ImageReference>(text).unwrap_or_else(|_| ImageReference::new(text))
}

fn print_value(value: &Value, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else if let Value::Object(fields) = value {
        for (key, field) in fields {
            println!("{}: {}", key.bold(), field);
        }
    } else {
        println!("{value}");
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Frame { input, number, out } => {
            let image = FrameSampler::sample(&input, number)?;
            match out {
                Some(path) => {
                    ensure_writable_path(&path, cli.global.overwrite)?;
                    image.save(&path)?;
                    println!(
                        "{} {}",
                        "success:".green().bold(),
                        format!("Saved frame {number} to {}", path.display()).green()
                    );
                }
                None => {
                    let store = DirectoryImageStore::open(&cli.global.store)?;
                    let stored = store.save(image)?;
                    print_value(&serde_json::to_value(&stored)?, cli.global.json)?;
                }
            }
        }
        Commands::Info { input } => {
            let properties = VideoMetadataReader::properties(&input)?;
            if cli.global.json {
                println!("{}", serde_json::to_string_pretty(&properties)?);
            } else {
                println!("Frames: {}", properties.frame_count);
                println!("FPS: {:.3}", properties.frames_per_second);
                println!("Size: {}x{}", properties.width, properties.height);
                println!("Codec: {}", properties.codec);
            }
        }
        Commands::Collect { index, image_name } => {
            println!("{}", encode_record(index, &ImageReference::new(image_name)));
        }
        Commands::Assemble {
            out,
            fps,
            codec,
            from,
            mut records,
        } => {
            if let Some(path) = from {
                let mut from_file = parse_records_file(&fs::read_to_string(&path)?)?;
                from_file.append(&mut records);
                records = from_file;
            }
            ensure_writable_path(&out, cli.global.overwrite)?;

            let mut options = AssembleOptions::default()
                .with_fps(fps)
                .with_codec(FourCc::new(&codec)?);
            if cli.global.progress {
                options = options.with_progress(Arc::new(TerminalProgress::new()));
            }

            let store = DirectoryImageStore::open(&cli.global.store)?;
            let report =
                IndexedVideoAssembler::new(&store, &FfmpegSinkBackend).assemble(&records, &out, &options)?;

            if cli.global.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    format!(
                        "Wrote {} frame(s) at {}x{} to {}",
                        report.frame_count,
                        report.width,
                        report.height,
                        report.output.display()
                    )
                    .green()
                );
            }
        }
        Commands::Name { reference } => {
            println!("{}", extract_image_name(&parse_reference(&reference)));
        }
        Commands::Invoke { type_tag, fields } => {
            let fields: Value = serde_json::from_str(&fields)?;
            let store = DirectoryImageStore::open(&cli.global.store)?;
            let context = NodeContext::new(&store, &FfmpegSinkBackend);
            let output = NodeRegistry::builtin().invoke(&type_tag, fields, &context)?;
            print_value(&output, cli.global.json)?;
        }
        Commands::Nodes => {
            let registry = NodeRegistry::builtin();
            if cli.global.json {
                let payload: Vec<Value> = registry
                    .descriptors()
                    .map(|descriptor| json!(descriptor))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for descriptor in registry.descriptors() {
                    println!(
                        "{:<22} {} [{}] v{}",
                        descriptor.type_tag.cyan(),
                        descriptor.title,
                        descriptor.category,
                        descriptor.version
                    );
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framestitch", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, parse_records_file, parse_reference};
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn records_file_accepts_json_array() {
        let records = parse_records_file(r#"["[1,\"b\"]", "[0,\"a\"]"]"#).unwrap();
        assert_eq!(records, vec![r#"[1,"b"]"#, r#"[0,"a"]"#]);
    }

    #[test]
    fn records_file_accepts_lines() {
        let records = parse_records_file("[1,\"b\"]\n\n  [0,\"a\"]  \n").unwrap();
        assert_eq!(records, vec![r#"[1,"b"]"#, r#"[0,"a"]"#]);
    }

    #[test]
    fn reference_accepts_json_or_bare_name() {
        assert_eq!(parse_reference(r#"{"image_name": "x.png"}"#).image_name(), "x.png");
        assert_eq!(parse_reference("y.png").image_name(), "y.png");
    }
}
