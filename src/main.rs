//! webpdf – command-line HTML → PDF converter.
//!
//! Usage:
//!   webpdf <input.html> [--out DIR] [--name NAME] [--landscape] ...
//!   webpdf --url https://example.com --name page
//!   webpdf --job job.json
//!
//! Without `--name` the document is named after the input file stem (e.g.
//! `report.html` → `report.pdf`). Rendering is done by the exporter program
//! (`wkhtmltopdf` unless `--exporter` or `WEBPDF_EXPORTER` says otherwise).

use std::path::{Path, PathBuf};
use std::{env, fs, process};

use webpdf_forge::job::JobOptions;
use webpdf_forge::templates;
use webpdf_forge::{GenerationError, PdfCallbackListener};

struct LogListener;

impl PdfCallbackListener for LogListener {
    fn on_success(&self, file_path: &Path) {
        log::info!("PDF saved at {}", file_path.display());
    }

    fn on_failure(&self, message: &str) {
        log::error!("{message}");
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let prog = args[0].clone();

    let mut job = JobOptions::default();
    let mut job_file: Option<PathBuf> = None;
    let mut input_path: Option<PathBuf> = None;
    let mut dump_request = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| match iter.next() {
            Some(v) => v.clone(),
            None => {
                eprintln!("Missing value for {flag}");
                print_usage(&prog);
                process::exit(1);
            }
        };
        match arg.as_str() {
            "--url" | "-u" => job.url = Some(value(arg)),
            "--asset" | "-a" => job.asset = Some(value(arg)),
            "--assets" => job.assets_dir = Some(PathBuf::from(value(arg))),
            "--sample" => {
                let name = value(arg);
                match templates::sample(&name) {
                    Some(html) => {
                        job.html = Some(html.to_string());
                        if job.name.is_empty() {
                            job.name = name;
                        }
                    }
                    None => {
                        eprintln!(
                            "Unknown sample '{name}' (available: {})",
                            templates::SAMPLE_NAMES.join(", ")
                        );
                        process::exit(1);
                    }
                }
            }
            "--job" | "-j" => job_file = Some(PathBuf::from(value(arg))),
            "--name" | "-n" => job.name = value(arg),
            "--out" | "-o" => job.output_dir = Some(PathBuf::from(value(arg))),
            "--base-url" => job.base_url = Some(value(arg)),
            "--page" | "-p" => job.page_size = Some(value(arg)),
            "--landscape" | "-l" => job.landscape = true,
            "--margins" | "-m" => {
                let raw = value(arg);
                match parse_margins(&raw) {
                    Some(m) => job.margins_mm = Some(m),
                    None => {
                        eprintln!("Invalid margins '{raw}': expected LEFT,TOP,RIGHT,BOTTOM in mm");
                        process::exit(1);
                    }
                }
            }
            "--dpi" => job.dpi = parse_number(arg, &value(arg)),
            "--timeout" | "-t" => job.timeout_ms = parse_number(arg, &value(arg)),
            "--print" => job.print = true,
            "--exporter" => job.exporter = Some(value(arg)),
            "--dump-request" => dump_request = true,
            "--help" | "-h" => {
                print_usage(&prog);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&prog);
                process::exit(1);
            }
            path => {
                if input_path.is_some() {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(&prog);
                    process::exit(1);
                }
                input_path = Some(PathBuf::from(path));
            }
        }
    }

    if let Some(path) = job_file {
        job = match fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| JobOptions::from_json(&json))
        {
            Ok(j) => j,
            Err(e) => {
                eprintln!("Error reading job '{}': {e}", path.display());
                process::exit(1);
            }
        };
    }

    if let Some(input) = input_path {
        let html = match fs::read_to_string(&input) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading '{}': {e}", input.display());
                process::exit(1);
            }
        };
        job.html = Some(html);
        if job.name.is_empty() {
            job.name = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("document")
                .to_string();
        }
        if job.output_dir.is_none() {
            job.output_dir = input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf);
        }
    }

    let builder = match job.into_builder() {
        Ok(b) => b.listener(LogListener),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if dump_request {
        match builder.build_request().map_err(|e| e.to_string()).and_then(|request| {
            request.to_json().map_err(|e| format!("cannot serialise request: {e}"))
        }) {
            Ok(json) => {
                println!("{json}");
                process::exit(0);
            }
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            process::exit(1);
        }
    };

    match runtime.block_on(builder.create_async()) {
        Ok(path) => {
            let bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            eprintln!("Wrote '{}' ({} bytes)", path.display(), bytes);
        }
        Err(e @ GenerationError::Timeout { .. }) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
        Err(e) => {
            eprintln!("Error generating PDF: {e}");
            process::exit(1);
        }
    }
}

fn parse_margins(raw: &str) -> Option<[f32; 4]> {
    let parts: Vec<f32> = raw
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [all] => Some([*all; 4]),
        [l, t, r, b] => Some([*l, *t, *r, *b]),
        _ => None,
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, raw: &str) -> T {
    match raw.parse() {
        Ok(n) => n,
        Err(_) => {
            eprintln!("Invalid number for {flag}: {raw}");
            process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    eprintln!("webpdf – HTML to PDF converter (webpdf-forge)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <input.html> [flags]");
    eprintln!("  {prog} --url <URL> --name <NAME> [flags]");
    eprintln!("  {prog} --asset <PATH> --assets <DIR> --name <NAME> [flags]");
    eprintln!("  {prog} --job <job.json>");
    eprintln!();
    eprintln!("Sources (exactly one):");
    eprintln!("  <input.html>        HTML file to convert");
    eprintln!("  --url, -u URL       Remote page to convert");
    eprintln!("  --asset, -a PATH    File inside the assets directory");
    eprintln!(
        "  --sample NAME       Built-in sample ({})",
        templates::SAMPLE_NAMES.join(", ")
    );
    eprintln!("  --job, -j FILE      JSON job description (replaces other flags)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --name, -n NAME     Output file name (default: input file stem)");
    eprintln!("  --out, -o DIR       Output directory (default: next to input, else temp dir)");
    eprintln!("  --assets DIR        Assets directory for --asset");
    eprintln!("  --base-url URL      Base URL for relative references in inline HTML");
    eprintln!("  --page, -p SIZE     a3, a4 (default), a5, letter, legal");
    eprintln!("  --landscape, -l     Landscape orientation");
    eprintln!("  --margins, -m MM    L,T,R,B margins in millimetres (or one value for all)");
    eprintln!("  --dpi N             Resolution (default: 600)");
    eprintln!("  --timeout, -t MS    Deadline in milliseconds (default: 30000)");
    eprintln!("  --print             Send the PDF to `lp` afterwards");
    eprintln!("  --exporter PROG     HTML-to-PDF program (default: $WEBPDF_EXPORTER or wkhtmltopdf)");
    eprintln!("  --dump-request      Print the resolved request as JSON and exit");
    eprintln!("  --help              Print this message");
}
