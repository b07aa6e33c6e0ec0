//! Marker-substitution templates for stylesheets and manifests.
//!
//! A template is literal text interleaved with variable markers such as
//! `$(name)` or `$(offsetx)`. A template binding renders an optional header
//! once, the body once per packed asset, and an optional footer once.
//!
//! ```
//! use spritemap_core::template::{RenderContext, Template};
//! use spritemap_core::Signature;
//!
//! let tpl = Template::parse(".$(normname) { width: $(width)px; }\n", None, None);
//! let ctx = RenderContext { signature: Signature(0), output_path: "sheet.png" };
//! let text = tpl.render_to_string(&[], &ctx);
//! assert!(text.is_empty());
//! ```

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, instrument};

use crate::asset::Asset;
use crate::error::{Result, SpriteMapError};
use crate::signature::Signature;

/// Variables a template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    Width,
    Height,
    OffsetX,
    OffsetY,
    Name,
    NormalizedName,
    Signature,
    OutputPath,
    Index,
}

impl Variable {
    pub const ALL: [Variable; 9] = [
        Variable::Width,
        Variable::Height,
        Variable::OffsetX,
        Variable::OffsetY,
        Variable::Name,
        Variable::NormalizedName,
        Variable::Signature,
        Variable::OutputPath,
        Variable::Index,
    ];

    /// Literal marker text.
    pub fn marker(self) -> &'static str {
        match self {
            Variable::Width => "$(width)",
            Variable::Height => "$(height)",
            Variable::OffsetX => "$(offsetx)",
            Variable::OffsetY => "$(offsety)",
            Variable::Name => "$(name)",
            Variable::NormalizedName => "$(normname)",
            Variable::Signature => "$(signature)",
            Variable::OutputPath => "$(output)",
            Variable::Index => "$(index)",
        }
    }

    fn from_marker(m: &str) -> Option<Variable> {
        Self::ALL.into_iter().find(|v| v.marker() == m)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Var(Variable),
}

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = Variable::ALL
            .iter()
            .map(|v| regex::escape(v.marker()))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&alternation).expect("marker alternation is a valid regex")
    })
}

/// Split template text into literal and variable tokens in one left-to-right
/// pass. Empty literals are never emitted.
pub fn tokenize(src: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    for m in marker_regex().find_iter(src) {
        if m.start() > pos {
            tokens.push(Token::Literal(src[pos..m.start()].to_string()));
        }
        if let Some(var) = Variable::from_marker(m.as_str()) {
            tokens.push(Token::Var(var));
        }
        pos = m.end();
    }
    if pos < src.len() {
        tokens.push(Token::Literal(src[pos..].to_string()));
    }
    tokens
}

/// Run-level values shared by every render of every template.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub signature: Signature,
    /// Final output image path, after signature substitution.
    pub output_path: &'a str,
}

/// Per-asset values; header and footer use the neutral set.
#[derive(Debug, Default)]
struct AssetValues<'a> {
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    name: &'a str,
    normalized_name: &'a str,
    index: usize,
}

impl<'a> AssetValues<'a> {
    fn of(asset: &'a Asset, index: usize) -> Self {
        let (x, y) = asset.placement().unwrap_or((0, 0));
        Self {
            width: asset.width(),
            height: asset.height(),
            x,
            y,
            name: asset.source_name(),
            normalized_name: asset.normalized_name(),
            index,
        }
    }
}

/// Parsed header/body/footer token streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    header: Option<Vec<Token>>,
    body: Vec<Token>,
    footer: Option<Vec<Token>>,
}

impl Template {
    pub fn parse(body: &str, header: Option<&str>, footer: Option<&str>) -> Self {
        Self {
            header: header.map(tokenize),
            body: tokenize(body),
            footer: footer.map(tokenize),
        }
    }

    pub fn body(&self) -> &[Token] {
        &self.body
    }

    pub fn header(&self) -> Option<&[Token]> {
        self.header.as_deref()
    }

    pub fn footer(&self) -> Option<&[Token]> {
        self.footer.as_deref()
    }

    /// Render header, one body per asset (in the given, packed order) and
    /// footer into `out`.
    pub fn render<W: Write>(
        &self,
        out: &mut W,
        assets: &[Asset],
        ctx: &RenderContext<'_>,
    ) -> io::Result<()> {
        if let Some(header) = &self.header {
            write_tokens(out, header, &AssetValues::default(), ctx)?;
        }
        for (index, asset) in assets.iter().enumerate() {
            write_tokens(out, &self.body, &AssetValues::of(asset, index), ctx)?;
        }
        if let Some(footer) = &self.footer {
            write_tokens(out, footer, &AssetValues::default(), ctx)?;
        }
        Ok(())
    }

    pub fn render_to_string(&self, assets: &[Asset], ctx: &RenderContext<'_>) -> String {
        let mut buf = Vec::new();
        self.render(&mut buf, assets, ctx)
            .expect("writing into a Vec cannot fail");
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn write_tokens<W: Write>(
    out: &mut W,
    tokens: &[Token],
    v: &AssetValues<'_>,
    ctx: &RenderContext<'_>,
) -> io::Result<()> {
    for token in tokens {
        match token {
            Token::Literal(s) => out.write_all(s.as_bytes())?,
            Token::Var(var) => match var {
                Variable::Width => write!(out, "{}", v.width)?,
                Variable::Height => write!(out, "{}", v.height)?,
                Variable::OffsetX => write!(out, "{}", v.x)?,
                Variable::OffsetY => write!(out, "{}", v.y)?,
                Variable::Name => out.write_all(v.name.as_bytes())?,
                Variable::NormalizedName => out.write_all(v.normalized_name.as_bytes())?,
                Variable::Signature => write!(out, "{}", ctx.signature)?,
                Variable::OutputPath => out.write_all(ctx.output_path.as_bytes())?,
                Variable::Index => write!(out, "{}", v.index)?,
            },
        }
    }
    Ok(())
}

/// One requested output: template source files bound to a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBinding {
    pub body: PathBuf,
    pub header: Option<PathBuf>,
    pub footer: Option<PathBuf>,
    pub output: PathBuf,
}

impl TemplateBinding {
    /// Parse `body[:header[:footer]]` plus an output path. Empty header or
    /// footer parts are treated as absent. A drive prefix such as `C:\` at
    /// the start of a part is kept with that part.
    pub fn parse(input: &str, output: impl Into<PathBuf>) -> Result<Self> {
        let parts = split_parts(input);
        if parts.len() > 3 {
            return Err(SpriteMapError::Template(format!(
                "expected body[:header[:footer]], got '{input}'"
            )));
        }
        let body = parts[0];
        if body.is_empty() {
            return Err(SpriteMapError::Template(format!(
                "missing body template in '{input}'"
            )));
        }
        let part = |i: usize| {
            parts
                .get(i)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
        };
        Ok(Self {
            body: PathBuf::from(body),
            header: part(1),
            footer: part(2),
            output: output.into(),
        })
    }

    /// Pair a flat `input output input output ...` argument list into
    /// bindings. An odd count is an error.
    pub fn parse_pairs<S: AsRef<str>>(args: &[S]) -> Result<Vec<Self>> {
        if args.len() % 2 != 0 {
            return Err(SpriteMapError::Template(format!(
                "template bindings come in <input> <output> pairs, got {} arguments",
                args.len()
            )));
        }
        args.chunks_exact(2)
            .map(|pair| Self::parse(pair[0].as_ref(), pair[1].as_ref()))
            .collect()
    }

    /// Read and parse the bound template files.
    pub fn load(&self) -> Result<Template> {
        let body = read_template(&self.body)?;
        let header = self.header.as_deref().map(read_template).transpose()?;
        let footer = self.footer.as_deref().map(read_template).transpose()?;
        Ok(Template::parse(&body, header.as_deref(), footer.as_deref()))
    }
}

fn split_parts(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = input;
    loop {
        let skip = if has_drive_prefix(rest) { 2 } else { 0 };
        match rest[skip..].find(':') {
            Some(i) => {
                parts.push(&rest[..skip + i]);
                rest = &rest[skip + i + 1..];
            }
            None => {
                parts.push(rest);
                return parts;
            }
        }
    }
}

/// `X:\` or `X:/`.
fn has_drive_prefix(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 3 && b[0].is_ascii_alphabetic() && b[1] == b':' && matches!(b[2], b'\\' | b'/')
}

fn read_template(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        SpriteMapError::Template(format!("cannot read template {}: {e}", path.display()))
    })
}

/// A parsed template bound to its destination. The destination is created
/// only when the job renders, so an aborted run leaves it untouched.
/// Rendering consumes the job; the file is flushed and closed once the
/// footer is written.
#[derive(Debug)]
pub struct TemplateJob {
    template: Template,
    output: PathBuf,
}

impl TemplateJob {
    pub fn open(binding: &TemplateBinding) -> Result<Self> {
        Ok(Self {
            template: binding.load()?,
            output: binding.output.clone(),
        })
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    #[instrument(skip_all, fields(output = %self.output.display()))]
    pub fn render(self, assets: &[Asset], ctx: &RenderContext<'_>) -> Result<PathBuf> {
        let file = File::create(&self.output).map_err(|e| {
            SpriteMapError::Template(format!(
                "cannot open {} for writing: {e}",
                self.output.display()
            ))
        })?;
        let mut dest = BufWriter::new(file);
        self.template.render(&mut dest, assets, ctx)?;
        dest.flush()?;
        debug!(assets = assets.len(), "template rendered");
        Ok(self.output)
    }
}
