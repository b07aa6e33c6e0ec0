use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser};
use globset::{Glob, GlobSetBuilder};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use spritemap_core::{
    InputImage, PackerConfig, Quantization, RenderContext, Rgb, SortOrder, SpriteSheet,
    TemplateBinding, TemplateJob, encode_sheet, is_supported_image, load_input, pack_sprites,
    to_json_manifest,
};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "spritemap",
    about = "Pack images into one sprite sheet and render CSS/manifest templates",
    version,
    author
)]
struct Cli {
    // Input/Output
    /// Input images or directories
    #[arg(help_heading = "Input/Output", required_unless_present = "print_config")]
    inputs: Vec<PathBuf>,
    /// Output image; a run of 8 'X' is replaced by the sheet signature
    #[arg(short, long, help_heading = "Input/Output")]
    output: Option<String>,
    /// Template binding `body[:header[:footer]] <output>` (repeatable; `.hbs` bodies use handlebars)
    #[arg(
        short = 't',
        long = "template",
        num_args = 2,
        value_names = ["INPUT", "OUTPUT"],
        action = ArgAction::Append,
        help_heading = "Input/Output"
    )]
    templates: Vec<String>,
    /// YAML config file path (overrides the image options below)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob) applied inside input directories
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob) applied inside input directories
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    // Image Processing
    /// Quantization level 1..6 (3 to 8 bits per channel)
    #[arg(
        short = 'q',
        long = "quality",
        default_value_t = 6,
        value_parser = clap::value_parser!(u8).range(1..=6),
        help_heading = "Image Processing"
    )]
    quality: u8,
    /// Flatten onto this background color (rrggbb) and drop the alpha channel
    #[arg(long = "flatten", visible_alias = "na", value_name = "RRGGBB", help_heading = "Image Processing")]
    flatten: Option<String>,
    /// Write an interlaced (Adam7) PNG
    #[arg(short, long, default_value_t = false, help_heading = "Image Processing")]
    interlace: bool,
    /// Crop transparent borders before packing
    #[arg(short, long, default_value_t = false, help_heading = "Image Processing")]
    crop: bool,
    /// Crop alpha threshold (0..=254)
    #[arg(long, default_value_t = 0, help_heading = "Image Processing")]
    crop_threshold: u8,
    /// Sort order: area_desc|max_side_desc|height_desc|width_desc|name_asc|none
    #[arg(long, default_value = "area_desc", help_heading = "Image Processing")]
    sort_order: String,

    // Export
    /// Write a JSON manifest to this file
    #[arg(long, help_heading = "Export")]
    manifest: Option<PathBuf>,
    /// Export packing stats (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: pack and sign but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,

    // Logging/UX
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action = ArgAction::Set, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(long, default_value_t = false, help_heading = "Logging/UX")]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    run(&cli)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let cfg = build_config(cli)?;

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let Some(output_pattern) = cli.output.as_deref() else {
        anyhow::bail!("missing output image path (-o)");
    };
    let bindings = parse_bindings(&cli.templates)?;

    // Templates are parsed before any packing work so a bad binding aborts
    // early; destinations are only created after the sheet is packed.
    let mut jobs: Vec<TemplateJob> = Vec::new();
    let mut hbs: Vec<(String, PathBuf)> = Vec::new();
    for b in &bindings {
        if is_handlebars(&b.body) {
            let src = fs::read_to_string(&b.body)
                .with_context(|| format!("read template {}", b.body.display()))?;
            hbs.push((src, b.output.clone()));
        } else {
            jobs.push(TemplateJob::open(b)?);
        }
    }

    let paths = gather_paths(&cli.inputs, &cli.include, &cli.exclude)?;
    if paths.is_empty() {
        anyhow::bail!("no input files");
    }
    let inputs = load_images_with_progress(&paths, cli.progress && !cli.quiet)?;
    info!(count = inputs.len(), skipped = paths.len() - inputs.len(), "loaded input images");
    if inputs.is_empty() {
        anyhow::bail!("no input image could be decoded");
    }

    let sheet = pack_sprites(inputs, &cfg)?;
    let output_path = sheet.output_path(output_pattern);
    let stats = sheet.stats();
    info!(summary = %stats.summary(), "stats");

    if !cli.dry_run {
        ensure_parent(Path::new(&output_path))?;
        encode_sheet(&sheet, Path::new(&output_path))
            .with_context(|| format!("write {output_path}"))?;
        info!(path = %output_path, signature = %sheet.signature, "sheet written");
    }

    let ctx = RenderContext {
        signature: sheet.signature,
        output_path: &output_path,
    };
    if !cli.dry_run {
        for job in jobs {
            let out = job.render(&sheet.assets, &ctx)?;
            info!(out = %out.display(), "template written");
        }
    }
    for (src, out) in &hbs {
        let rendered = render_handlebars(src, &sheet, &output_path)?;
        if !cli.dry_run {
            fs::write(out, rendered).with_context(|| format!("write {}", out.display()))?;
            info!(out = %out.display(), "template written");
        }
    }

    if let Some(path) = &cli.manifest {
        let value = to_json_manifest(&sheet, &output_path);
        if !cli.dry_run {
            fs::write(path, serde_json::to_string_pretty(&value)?)
                .with_context(|| format!("write {}", path.display()))?;
            info!(?path, "manifest written");
        }
    }

    if let Some(stats_path) = &cli.export_stats {
        if !cli.dry_run {
            fs::write(stats_path, serde_json::to_string_pretty(&stats)?)
                .with_context(|| format!("write {}", stats_path.display()))?;
            info!(?stats_path, "stats exported");
        } else {
            println!("{}", stats.summary());
        }
    }
    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<PackerConfig> {
    let flatten = cli
        .flatten
        .as_deref()
        .map(str::parse::<Rgb>)
        .transpose()?;
    let cfg = PackerConfig {
        crop: cli.crop,
        crop_threshold: cli.crop_threshold,
        quantization: Quantization::new(cli.quality)?,
        flatten,
        interlace: cli.interlace,
        sort_order: cli.sort_order.parse::<SortOrder>()?,
    };
    let cfg = if let Some(path) = &cli.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)?;
        y.into_packer_config(cfg)?
    } else {
        cfg
    };
    cfg.validate()?;
    Ok(cfg)
}

fn parse_bindings(raw: &[String]) -> anyhow::Result<Vec<TemplateBinding>> {
    let bindings = TemplateBinding::parse_pairs(raw)?;
    for b in &bindings {
        if is_handlebars(&b.body) && (b.header.is_some() || b.footer.is_some()) {
            anyhow::bail!("handlebars template {} takes no header/footer", b.body.display());
        }
    }
    Ok(bindings)
}

fn is_handlebars(p: &Path) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("hbs"))
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
    }
    Ok(())
}

fn gather_paths(
    inputs: &[PathBuf],
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    // Build glob matchers
    let mut inc_set = None;
    if !include.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in include {
            b.add(Glob::new(pat)?);
        }
        inc_set = Some(b.build()?);
    }
    let mut exc_set = None;
    if !exclude.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in exclude {
            b.add(Glob::new(pat)?);
        }
        exc_set = Some(b.build()?);
    }
    let mut list: Vec<PathBuf> = Vec::new();
    for path in inputs {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| {
                    p.is_file()
                        && is_supported_image(p)
                        && !should_skip(p, inc_set.as_ref(), exc_set.as_ref())
                })
                .collect();
            found.sort();
            list.extend(found);
        } else {
            // Explicit files go through the decoder even with odd extensions so
            // they are reported as skipped rather than silently ignored.
            list.push(path.clone());
        }
    }
    Ok(list)
}

fn should_skip(
    p: &Path,
    include: Option<&globset::GlobSet>,
    exclude: Option<&globset::GlobSet>,
) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn load_images_with_progress(paths: &[PathBuf], progress: bool) -> anyhow::Result<Vec<InputImage>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = progress.then(|| {
        let b = ProgressBar::new(paths.len() as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        ) {
            b.set_style(style);
        }
        b
    });
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        if let Some(b) = &bar {
            let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
            b.set_message(msg.to_string());
        }
        match load_input(p) {
            Ok(inp) => list.push(inp),
            Err(e) if e.is_input_error() => {
                warn!(path = %p.display(), error = %e, "skip image")
            }
            Err(e) => {
                if let Some(b) = &bar {
                    b.abandon();
                }
                return Err(e).with_context(|| format!("load {}", p.display()));
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Serialize)]
struct HbsSprite<'a> {
    name: &'a str,
    normalized_name: &'a str,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    index: usize,
}

#[derive(Serialize)]
struct HbsContext<'a> {
    image: &'a str,
    signature: String,
    width: u32,
    height: u32,
    sprites: Vec<HbsSprite<'a>>,
}

fn render_handlebars(src: &str, sheet: &SpriteSheet, image: &str) -> anyhow::Result<String> {
    let sprites = sheet
        .assets
        .iter()
        .enumerate()
        .map(|(index, a)| {
            let (x, y) = a.placement().unwrap_or((0, 0));
            HbsSprite {
                name: a.source_name(),
                normalized_name: a.normalized_name(),
                x,
                y,
                w: a.width(),
                h: a.height(),
                index,
            }
        })
        .collect();
    let ctx = HbsContext {
        image,
        signature: sheet.signature.to_hex(),
        width: sheet.width(),
        height: sheet.height(),
        sprites,
    };
    let mut reg = Handlebars::new();
    reg.set_strict_mode(true);
    reg.register_template_string("tpl", src)?;
    Ok(reg.render("tpl", &ctx)?)
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    crop: Option<bool>,
    crop_threshold: Option<u8>,
    quantization: Option<u8>,
    flatten: Option<String>,
    interlace: Option<bool>,
    sort_order: Option<String>,
}

impl YamlConfig {
    fn into_packer_config(self, mut cfg: PackerConfig) -> anyhow::Result<PackerConfig> {
        if let Some(v) = self.crop {
            cfg.crop = v;
        }
        if let Some(v) = self.crop_threshold {
            cfg.crop_threshold = v;
        }
        if let Some(v) = self.quantization {
            cfg.quantization = Quantization::new(v)?;
        }
        if let Some(v) = self.flatten {
            cfg.flatten = match v.trim() {
                "" | "none" => None,
                s => Some(s.parse()?),
            };
        }
        if let Some(v) = self.interlace {
            cfg.interlace = v;
        }
        if let Some(v) = self.sort_order {
            cfg.sort_order = v.parse()?;
        }
        Ok(cfg)
    }
}
