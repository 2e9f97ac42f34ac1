use clap::{value_parser, Arg, ArgAction, Command};
use colored::*;
use rayon::prelude::*;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use snapedit::ops::save_image;
use snapedit::{is_image_file, Edit, EditError, Session, Webcam};

const OUTPUT_FORMATS: &[&str] = &["png", "jpg", "jpeg", "tiff", "tif", "bmp"];

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        eprintln!("{}: {}", "Error".red().bold(), err);
        std::process::exit(1);
    }
}

fn cli() -> Command {
    Command::new("snapedit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Apply channel extraction, crop, rotation and rectangle edits to images")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("PATH")
                .help("Image file or directory of images. May be repeated")
                .action(ArgAction::Append)
                .required_unless_present("capture"),
        )
        .arg(
            Arg::new("capture")
                .long("capture")
                .help("Take a single frame from the webcam instead of reading files")
                .action(ArgAction::SetTrue)
                .conflicts_with("input"),
        )
        .arg(
            Arg::new("camera")
                .long("camera")
                .value_name("INDEX")
                .help("Camera device used with --capture")
                .value_parser(value_parser!(u32))
                .default_value("0"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for edited images")
                .required(true),
        )
        .arg(
            Arg::new("edit")
                .short('e')
                .long("edit")
                .value_name("EDIT")
                .help("Edit to apply, in order. One of channel=red|green|blue, crop=X,Y,W,H, rotate=DEGREES, rect=X,Y,W,H, reset")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Output format (png, jpg, tiff, bmp)")
                .default_value("png"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_name("NUM")
                .help("Number of threads to use for processing (default: auto-detect)")
                .value_parser(value_parser!(usize))
                .default_value("0"),
        )
}

fn run() -> Result<(), Box<dyn Error>> {
    let matches = cli().get_matches();

    let output_dir = PathBuf::from(matches.get_one::<String>("output").ok_or("missing --output")?);
    let format = matches
        .get_one::<String>("format")
        .map(|f| f.to_lowercase())
        .unwrap_or_else(|| "png".to_string());
    if !OUTPUT_FORMATS.contains(&format.as_str()) {
        return Err(format!("Unsupported output format: {}", format).into());
    }

    let edits = matches
        .get_many::<String>("edit")
        .into_iter()
        .flatten()
        .map(|text| text.parse::<Edit>())
        .collect::<Result<Vec<Edit>, EditError>>()?;

    let threads = matches.get_one::<usize>("threads").copied().unwrap_or(0);
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| format!("Failed to configure thread pool: {}", e))?;
    }

    fs::create_dir_all(&output_dir)?;

    println!("{}", "Applying edits:".bold().cyan());
    if edits.is_empty() {
        println!("  {}", "(none, images are re-encoded as-is)".dimmed());
    }
    for edit in &edits {
        println!("  {}", edit.to_string().green());
    }

    let start_time = Instant::now();

    if matches.get_flag("capture") {
        let index = matches.get_one::<u32>("camera").copied().unwrap_or(0);
        let output_path = output_dir.join(format!("capture_edited.{}", format));
        capture_and_edit(index, &edits, &output_path)?;
        println!("{} {}", "Saved".green(), output_path.display());
    } else {
        let inputs: Vec<PathBuf> = matches
            .get_many::<String>("input")
            .into_iter()
            .flatten()
            .map(PathBuf::from)
            .collect();
        let image_files = collect_image_files(&inputs)?;
        edit_files(&image_files, &edits, &output_dir, &format)?;
    }

    println!("{}: {:.2?}", "Processing time".blue(), start_time.elapsed());
    Ok(())
}

fn collect_image_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut image_files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| is_image_file(path))
                .collect();
            found.sort();
            image_files.extend(found);
        } else {
            image_files.push(input.clone());
        }
    }

    if image_files.is_empty() {
        return Err("No image files found in the given inputs".into());
    }
    Ok(image_files)
}

fn edit_files(
    image_files: &[PathBuf],
    edits: &[Edit],
    output_dir: &Path,
    format: &str,
) -> Result<(), Box<dyn Error>> {
    let total_files = image_files.len();
    println!("{} {} image files", "Found".bold().blue(), total_files);

    let processed_count = Arc::new(AtomicUsize::new(0));

    let results: Vec<Result<(), EditError>> = image_files
        .par_iter()
        .map(|image_path| {
            let output_path = output_dir.join(output_filename(image_path, format));
            edit_file(image_path, edits, &output_path)?;

            let current = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
            println!(
                "{} {}/{}: {}",
                "Processed".green(),
                current,
                total_files,
                image_path.display()
            );
            Ok(())
        })
        .collect();

    let failures: Vec<EditError> = results.into_iter().filter_map(Result::err).collect();
    for err in &failures {
        eprintln!("{}: {}", "Failed".red(), err);
    }
    if !failures.is_empty() {
        return Err(format!("{} of {} images failed", failures.len(), total_files).into());
    }

    println!("{}", "Editing complete!".bold().green());
    Ok(())
}

fn edit_file(input: &Path, edits: &[Edit], output_path: &Path) -> Result<(), EditError> {
    let mut session = Session::new();
    session.load(input)?;
    finish(session, edits, output_path)
}

fn capture_and_edit(camera: u32, edits: &[Edit], output_path: &Path) -> Result<(), EditError> {
    let mut session = Session::new();
    session.capture(&mut Webcam::new(camera))?;
    finish(session, edits, output_path)
}

fn finish(mut session: Session, edits: &[Edit], output_path: &Path) -> Result<(), EditError> {
    for edit in edits {
        session.apply(edit)?;
    }
    let current = session.current().ok_or(EditError::NoImage)?;
    save_image(current, output_path)
}

fn output_filename(input_path: &Path, format: &str) -> String {
    let stem = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    format!("{}_edited.{}", stem, format)
}
