use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

use card_image_cleaner::batch::{
    self, BatchOptions, BatchSummary, Progress, DEFAULT_CARD_DIR,
};
use card_image_cleaner::morphology::StructuringElement;
use card_image_cleaner::{
    default_output_path, process_file, AggressiveOptions, BasicOptions, Remover,
};

#[derive(Parser)]
#[command(
    name = "card-cleaner",
    about = "Remove near-white backgrounds from card scans and trim them to their content",
    version,
    after_help = "Typical usage: card-cleaner process, then card-cleaner reprocess\n\n\
                  NOTE: reprocess rewrites PNG files in place; keep a backup if you may \
                  want the first-pass output back."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Convert JPG scans to trimmed transparent PNGs, skipping existing PNGs
    Process(ProcessArgs),
    /// Re-run existing PNGs through the aggressive remover, in place
    Reprocess(ReprocessArgs),
    /// Clean a single image
    File(FileArgs),
}

#[derive(Args)]
struct ProcessArgs {
    /// Card image directory
    #[arg(long, default_value = DEFAULT_CARD_DIR)]
    dir: PathBuf,

    /// Channel threshold above which a pixel counts as white (0-255)
    #[arg(long, default_value_t = 230)]
    white_threshold: u8,

    /// Pixels kept around the card after trimming
    #[arg(long, default_value_t = 2)]
    margin: u32,

    /// Delete JPG originals that now have a PNG
    #[arg(long, conflicts_with = "ask_delete")]
    delete_originals: bool,

    /// Ask on stdin before deleting JPG originals
    #[arg(long)]
    ask_delete: bool,
}

#[derive(Args)]
struct ReprocessArgs {
    /// Card image directory
    #[arg(long, default_value = DEFAULT_CARD_DIR)]
    dir: PathBuf,

    #[command(flatten)]
    aggressive: AggressiveArgs,
}

#[derive(Args)]
struct AggressiveArgs {
    /// Main white threshold (0-255)
    #[arg(long, default_value_t = 220)]
    white_threshold: u8,

    /// Edge white threshold (0-255)
    #[arg(long, default_value_t = 240)]
    edge_threshold: u8,

    /// Pixels kept around the card after trimming
    #[arg(long, default_value_t = 0)]
    margin: u32,

    /// Gaussian blur sigma applied before masking
    #[arg(long, default_value_t = 0.5, conflicts_with = "no_blur")]
    blur_sigma: f32,

    /// Skip the pre-mask blur
    #[arg(long)]
    no_blur: bool,

    /// Use a 4-connected cross instead of a 3x3 square for speck removal
    #[arg(long)]
    cross_element: bool,
}

impl AggressiveArgs {
    fn options(&self) -> AggressiveOptions {
        AggressiveOptions {
            white_threshold: self.white_threshold,
            edge_threshold: self.edge_threshold,
            margin: self.margin,
            blur_sigma: (!self.no_blur).then_some(self.blur_sigma),
            structuring_element: structuring_element(self.cross_element),
            ..AggressiveOptions::default()
        }
    }
}

#[derive(Args)]
struct FileArgs {
    /// Input image
    input: PathBuf,

    /// Output PNG (default: input with .png, or {name}_cleaned.png for PNG input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use the aggressive remover
    #[arg(long)]
    aggressive: bool,

    /// White threshold, 0-255 [default: 230, or 220 with --aggressive]
    #[arg(long)]
    white_threshold: Option<u8>,

    /// Pixels kept around the card after trimming [default: 2, or 0 with --aggressive]
    #[arg(long)]
    margin: Option<u32>,

    /// Edge white threshold, 0-255 [default: 240]
    #[arg(long, requires = "aggressive")]
    edge_threshold: Option<u8>,

    /// Gaussian blur sigma applied before masking [default: 0.5]
    #[arg(long, requires = "aggressive", conflicts_with = "no_blur")]
    blur_sigma: Option<f32>,

    /// Skip the pre-mask blur
    #[arg(long, requires = "aggressive")]
    no_blur: bool,

    /// Use a 4-connected cross instead of a 3x3 square for speck removal
    #[arg(long, requires = "aggressive")]
    cross_element: bool,
}

impl FileArgs {
    fn remover(&self) -> Remover {
        if self.aggressive {
            let defaults = AggressiveOptions::default();
            Remover::Aggressive(AggressiveOptions {
                white_threshold: self.white_threshold.unwrap_or(defaults.white_threshold),
                edge_threshold: self.edge_threshold.unwrap_or(defaults.edge_threshold),
                margin: self.margin.unwrap_or(defaults.margin),
                blur_sigma: if self.no_blur {
                    None
                } else {
                    self.blur_sigma.or(defaults.blur_sigma)
                },
                structuring_element: structuring_element(self.cross_element),
                ..defaults
            })
        } else {
            let defaults = BasicOptions::default();
            Remover::Basic(BasicOptions {
                white_threshold: self.white_threshold.unwrap_or(defaults.white_threshold),
                margin: self.margin.unwrap_or(defaults.margin),
            })
        }
    }
}

fn structuring_element(cross: bool) -> StructuringElement {
    if cross {
        StructuringElement::Cross
    } else {
        StructuringElement::Square
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    match &cli.command {
        Command::Process(args) => run_process(args, cli.quiet),
        Command::Reprocess(args) => run_reprocess(args, cli.quiet),
        Command::File(args) => run_file(args, cli.quiet),
    }
}

fn run_process(args: &ProcessArgs, quiet: bool) {
    let opts = BasicOptions {
        white_threshold: args.white_threshold,
        margin: args.margin,
    };
    let batch_opts = BatchOptions::default();

    let summary = match batch::run_basic_pass(&args.dir, &opts, &batch_opts, |p| {
        print_progress(&p, quiet);
    }) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return;
        }
    };

    print_summary("PROCESSING SUMMARY", &summary, true);

    if summary.processed == 0 {
        return;
    }

    let delete = if args.delete_originals {
        true
    } else if args.ask_delete {
        confirm_delete()
    } else {
        false
    };

    if !delete {
        if args.ask_delete {
            println!("Original JPG files have been kept.");
        }
        return;
    }

    let sources: Vec<PathBuf> = summary.outcomes.into_iter().map(|o| o.path).collect();
    let deleted = batch::delete_originals(&sources, &batch_opts);
    for path in &deleted.deleted {
        if !quiet {
            println!("Deleted {}", file_name(path));
        }
    }
    for (path, e) in &deleted.failed {
        eprintln!("Failed to delete {}: {e}", file_name(path));
    }
    println!("\nDeleted {} JPG files.", deleted.deleted.len());
}

fn run_reprocess(args: &ReprocessArgs, quiet: bool) {
    let opts = args.aggressive.options();
    if !quiet {
        println!("Reprocessing images with more aggressive white removal...");
    }

    match batch::run_aggressive_pass(&args.dir, &opts, &BatchOptions::default(), |p| {
        print_progress(&p, quiet);
    }) {
        Ok(summary) => print_summary("REPROCESSING SUMMARY", &summary, false),
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn run_file(args: &FileArgs, quiet: bool) {
    if !args.input.exists() {
        eprintln!("Error: Input path does not exist: {}", args.input.display());
        process::exit(1);
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));
    let remover = args.remover();

    match process_file(&args.input, &output, &remover) {
        Ok(t) => {
            if !quiet {
                println!(
                    "[OK] {} ({}x{} -> {}x{})",
                    output.display(),
                    t.input.0,
                    t.input.1,
                    t.output.0,
                    t.output.1
                );
            }
        }
        Err(e) => {
            eprintln!("[FAIL] {}: {e}", file_name(&args.input));
            process::exit(1);
        }
    }
}

fn confirm_delete() -> bool {
    println!("\nWould you like to delete the original JPG files?");
    print!("Type 'yes' to delete JPG files, anything else to keep them: ");
    let _ = io::stdout().flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => line.trim().eq_ignore_ascii_case("yes"),
        Err(_) => false,
    }
}

fn print_progress(progress: &Progress<'_>, quiet: bool) {
    match progress {
        Progress::Failed { path, error } => {
            eprintln!("Error processing {}: {error}", file_name(path));
        }
        _ if quiet => {}
        Progress::Found { count } => println!("Found {count} files to process."),
        Progress::Processing(path) => println!("Processing {}...", file_name(path)),
        Progress::Reprocessing(path) => println!("Reprocessing {}...", file_name(path)),
        Progress::Skipping(path) => {
            println!("Skipping {} (output already exists)", file_name(path));
        }
        Progress::Saved { output, trimmed } => println!(
            "  -> Saved as {} ({}x{})",
            file_name(output),
            trimmed.output.0,
            trimmed.output.1
        ),
    }
}

fn print_summary(title: &str, summary: &BatchSummary, show_skipped: bool) {
    let rule = "=".repeat(50);
    println!("\n{rule}\n{title}\n{rule}");
    println!("Successfully processed: {}", summary.processed);
    if show_skipped {
        println!("Skipped (already exists): {}", summary.skipped);
    }
    println!("Failed: {}", summary.failed);
    println!("Total files: {}", summary.total());
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_remover(args: &[&str]) -> Remover {
        let argv: Vec<&str> = ["card-cleaner", "file", "card.png"]
            .into_iter()
            .chain(args.iter().copied())
            .collect();
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::File(file) => file.remover(),
            _ => unreachable!("parsed a file command"),
        }
    }

    #[test]
    fn file_basic_uses_basic_defaults() {
        assert_eq!(file_remover(&[]), Remover::Basic(BasicOptions::default()));
    }

    #[test]
    fn file_basic_honors_threshold_and_margin() {
        let remover = file_remover(&["--margin", "5", "--white-threshold", "200"]);
        assert_eq!(
            remover,
            Remover::Basic(BasicOptions {
                white_threshold: 200,
                margin: 5,
            })
        );

        // 10x10 square on 40x40 white trims to 10 + 2 * 5
        let mut img = image::RgbaImage::from_pixel(40, 40, image::Rgba([255, 255, 255, 255]));
        for y in 15..25 {
            for x in 15..25 {
                img.put_pixel(x, y, image::Rgba([0, 0, 0, 255]));
            }
        }
        assert_eq!(remover.apply(img).unwrap().dimensions(), (20, 20));
    }

    #[test]
    fn file_aggressive_uses_aggressive_defaults_and_overrides() {
        assert_eq!(
            file_remover(&["--aggressive"]),
            Remover::Aggressive(AggressiveOptions::default())
        );

        let Remover::Aggressive(opts) = file_remover(&[
            "--aggressive",
            "--margin",
            "3",
            "--edge-threshold",
            "245",
            "--no-blur",
            "--cross-element",
        ]) else {
            panic!("expected the aggressive remover");
        };
        assert_eq!(opts.white_threshold, 220);
        assert_eq!(opts.edge_threshold, 245);
        assert_eq!(opts.margin, 3);
        assert_eq!(opts.blur_sigma, None);
        assert_eq!(opts.structuring_element, StructuringElement::Cross);
    }
}
