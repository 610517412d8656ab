// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bubblemark — command-line answer-sheet reader, grader and sheet generator.
//
// Entry point. Initialises logging (stderr), parses arguments and dispatches
// to the detect / grade / generate commands. Results go to stdout as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use bubblemark_core::{Alternative, AnswerKey, AnswerMap, OmrConfig, PaperSize, TemplateConfig};
use bubblemark_omr::image::{base64_payload_bytes, decode_image, open_image};
use bubblemark_omr::{PdfWriter, SheetDetector, SheetReport, SheetTemplate};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "bubblemark")]
#[command(about = "Read, grade and generate multiple-choice answer sheets")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect the marked answers on one or more sheet images.
    #[command(name = "detect")]
    Detect(DetectArgs),
    /// Detect answers on a sheet and grade them against an answer key.
    #[command(name = "grade")]
    Grade(GradeArgs),
    /// Generate a blank or pre-marked sheet as PDF or image.
    #[command(name = "generate")]
    Generate(GenerateArgs),
}

#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// JSON detection config; missing fields use the defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Treat input files as base64 text (optionally a `data:` URL).
    #[arg(long)]
    base64: bool,
}

#[derive(Args, Debug, Clone)]
struct DetectArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Sheet images to read.
    #[arg(required = true)]
    images: Vec<PathBuf>,
    /// Number of questions on the sheet (1 to 1000); missing ones are reported unanswered.
    #[arg(long)]
    questions: Option<u32>,
    /// Print threshold, candidate counts and per-bubble fill readings.
    #[arg(long)]
    verbose: bool,
}

#[derive(Args, Debug, Clone)]
struct GradeArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Sheet image to grade.
    image: PathBuf,
    /// Answer key as a JSON object, e.g. {"1": "C", "2": "a"}.
    #[arg(long)]
    key: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct GenerateArgs {
    /// Number of question rows; defaults to the highest question in --answers.
    #[arg(long)]
    questions: Option<u32>,
    /// Answers to draw, as a JSON object such as {"1": "A", "2": null}.
    #[arg(long)]
    answers: Option<PathBuf>,
    /// Fill the bubbles of the given answers (every question `A` without --answers).
    #[arg(long)]
    mark: bool,
    /// Output file; `.pdf` writes a printable page, other extensions a raster image.
    #[arg(long)]
    out: PathBuf,
    /// Paper size for PDF output (a4, a5, letter, legal).
    #[arg(long, default_value = "a4")]
    paper: String,
    /// Title stored in the PDF metadata.
    #[arg(long)]
    title: Option<String>,
    /// JSON layout config; missing fields use the defaults.
    #[arg(long)]
    layout: Option<PathBuf>,
}

/// One entry of multi-image `detect` output.
#[derive(Serialize)]
struct SheetOutcome<T: Serialize> {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Detect(args) => run_detect(args),
        Command::Grade(args) => run_grade(args),
        Command::Generate(args) => run_generate(args),
    }
}

fn load_detector(input: &InputArgs) -> Result<SheetDetector> {
    let config = match &input.config {
        Some(path) => OmrConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => OmrConfig::default(),
    };
    Ok(SheetDetector::new(config)?)
}

/// Read an input file as encoded image bytes.
fn read_sheet(path: &Path, base64: bool) -> Result<Vec<u8>> {
    if base64 {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(base64_payload_bytes(&text)
            .with_context(|| format!("failed to decode base64 in {}", path.display()))?)
    } else {
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_detect(args: DetectArgs) -> Result<()> {
    let detector = load_detector(&args.input)?;
    let inputs: Vec<Result<Vec<u8>>> = args
        .images
        .iter()
        .map(|path| read_sheet(path, args.input.base64))
        .collect();

    tracing::info!(sheets = inputs.len(), "Detecting answers");

    if args.verbose {
        let reports = report_sheets(&detector, inputs, args.questions);
        let outcomes = args
            .images
            .iter()
            .zip(reports)
            .map(|(path, report)| outcome(path, report))
            .collect();
        return print_outcomes(outcomes);
    }

    let results = detect_sheets(&detector, &inputs, args.questions);
    let outcomes = args
        .images
        .iter()
        .zip(results)
        .map(|(path, result)| outcome(path, result))
        .collect();
    print_outcomes(outcomes)
}

/// Run the batch detector over every readable input. Unreadable inputs keep
/// their read error; results stay in input order.
fn detect_sheets(
    detector: &SheetDetector,
    inputs: &[Result<Vec<u8>>],
    expected_questions: Option<u32>,
) -> Vec<Result<AnswerMap>> {
    let readable: Vec<&[u8]> = inputs
        .iter()
        .filter_map(|input| input.as_ref().ok().map(Vec::as_slice))
        .collect();
    let mut detected = detector
        .detect_batch(&readable, expected_questions)
        .into_iter();

    inputs
        .iter()
        .map(|input| -> Result<AnswerMap> {
            match input {
                Ok(_) => detected
                    .next()
                    .ok_or_else(|| anyhow!("no detection result for sheet"))?
                    .map_err(anyhow::Error::from),
                Err(err) => Err(anyhow!("{err:#}")),
            }
        })
        .collect()
}

/// Full reports for every input, computed in parallel.
fn report_sheets(
    detector: &SheetDetector,
    inputs: Vec<Result<Vec<u8>>>,
    expected_questions: Option<u32>,
) -> Vec<Result<SheetReport>> {
    inputs
        .into_par_iter()
        .map(|input| -> Result<SheetReport> {
            let image = decode_image(&input?)?;
            Ok(detector.detect_report(&image, expected_questions)?)
        })
        .collect()
}

fn outcome<T: Serialize>(path: &Path, result: Result<T>) -> SheetOutcome<T> {
    let path = path.display().to_string();
    match result {
        Ok(value) => SheetOutcome {
            path,
            result: Some(value),
            error: None,
        },
        Err(err) => {
            tracing::error!(path = %path, error = %err, "Sheet could not be read");
            SheetOutcome {
                path,
                result: None,
                error: Some(format!("{err:#}")),
            }
        }
    }
}

/// A single sheet prints its bare result; several print an array of outcomes.
fn print_outcomes<T: Serialize>(mut outcomes: Vec<SheetOutcome<T>>) -> Result<()> {
    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    if outcomes.len() == 1 {
        let single = outcomes.remove(0);
        return match (single.result, single.error) {
            (Some(value), _) => print_json(&value),
            (None, error) => bail!(
                "{}: {}",
                single.path,
                error.unwrap_or_else(|| "unknown error".into())
            ),
        };
    }
    print_json(&outcomes)?;
    if failed > 0 {
        bail!("{failed} of {} sheets could not be read", outcomes.len());
    }
    Ok(())
}

fn run_grade(args: GradeArgs) -> Result<()> {
    let detector = load_detector(&args.input)?;
    let key_text = fs::read_to_string(&args.key)
        .with_context(|| format!("failed to read answer key {}", args.key.display()))?;
    let key = AnswerKey::from_json_str(&key_text)
        .with_context(|| format!("invalid answer key {}", args.key.display()))?;

    let image = if args.input.base64 {
        let data = read_sheet(&args.image, true)?;
        decode_image(&data)
            .with_context(|| format!("failed to decode {}", args.image.display()))?
    } else {
        open_image(&args.image)?
    };
    let result = detector.grade(&image, &key)?;
    print_json(&result)
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let layout = match &args.layout {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read layout {}", path.display()))?;
            serde_json::from_str::<TemplateConfig>(&text)
                .with_context(|| format!("invalid layout {}", path.display()))?
        }
        None => TemplateConfig::default(),
    };
    let template = SheetTemplate::new(layout)?;

    let provided = match &args.answers {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read answers {}", path.display()))?;
            Some(
                serde_json::from_str::<AnswerMap>(&text)
                    .with_context(|| format!("invalid answers {}", path.display()))?,
            )
        }
        None => None,
    };

    let (questions, marks) = resolve_marks(args.questions, provided, args.mark)?;
    let sheet = template.render(questions, marks.as_ref())?;
    let is_pdf = args
        .out
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        let paper: PaperSize = args.paper.parse()?;
        let mut writer = PdfWriter::new(paper);
        if let Some(title) = &args.title {
            writer.set_title(title.clone());
        }
        writer.write_sheet_to_file(&sheet, &args.out)?;
    } else {
        sheet.save(&args.out)?;
    }

    tracing::info!(out = %args.out.display(), questions, "Sheet written");
    Ok(())
}

/// Settle the row count and the bubbles to fill for `generate`.
///
/// The count defaults to the highest question in `answers`. With `mark` and
/// no answers every question is marked `A`; without `mark` nothing is filled.
fn resolve_marks(
    questions: Option<u32>,
    answers: Option<AnswerMap>,
    mark: bool,
) -> Result<(u32, Option<AnswerMap>)> {
    let count = match (questions, &answers) {
        (Some(count), _) => count,
        (None, Some(map)) => map
            .iter()
            .map(|(q, _)| q)
            .max()
            .context("answers file has no questions")?,
        (None, None) => bail!("either --questions or --answers is required"),
    };

    let marks = match (mark, answers) {
        (false, _) => None,
        (true, Some(map)) => Some(map),
        (true, None) => Some(
            (1..=count)
                .map(|q| (q, Some(Alternative::A)))
                .collect::<AnswerMap>(),
        ),
    };
    Ok((count, marks))
}
