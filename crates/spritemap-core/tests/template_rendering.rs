use std::fs;

use image::{Rgba, RgbaImage};
use spritemap_core::prelude::*;
use spritemap_core::template::{Token, Variable, tokenize};
use spritemap_core::{TemplateJob, to_json_manifest};

fn sheet() -> SpriteSheet {
    let assets = vec![
        Asset::new("img/small.png", RgbaImage::from_pixel(5, 5, Rgba([0, 0, 255, 255]))),
        Asset::new("img/big.png", RgbaImage::from_pixel(20, 10, Rgba([255, 0, 0, 255]))),
    ];
    pack_assets(assets, &PackerConfig::default()).expect("pack")
}

#[test]
fn tokenizer_splits_literals_and_markers() {
    assert_eq!(
        tokenize("a$(width)b$(height)"),
        vec![
            Token::Literal("a".into()),
            Token::Var(Variable::Width),
            Token::Literal("b".into()),
            Token::Var(Variable::Height),
        ]
    );
    // adjacent markers never produce empty literals
    assert_eq!(
        tokenize("$(offsetx)$(offsety)"),
        vec![Token::Var(Variable::OffsetX), Token::Var(Variable::OffsetY)]
    );
    // unknown markers stay literal text
    assert_eq!(tokenize("$(unknown)"), vec![Token::Literal("$(unknown)".into())]);
    assert!(tokenize("").is_empty());
}

#[test]
fn every_variable_has_a_distinct_marker() {
    for v in Variable::ALL {
        assert_eq!(tokenize(v.marker()), vec![Token::Var(v)]);
    }
}

#[test]
fn body_renders_once_per_asset_in_packed_order() {
    let sheet = sheet();
    let tpl = Template::parse("$(name): $(width)x$(height) @ $(offsetx),$(offsety)\n", None, None);
    let text = sheet.render_template(&tpl, "sheet.png");
    assert_eq!(text, "img/big.png: 20x10 @ 0,0\nimg/small.png: 5x5 @ 0,10\n");

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    for (line, asset) in lines.iter().zip(&sheet.assets) {
        let (x, y) = asset.placement().expect("placed");
        assert!(line.ends_with(&format!("@ {x},{y}")));
    }
}

#[test]
fn header_and_footer_use_neutral_values() {
    let sheet = sheet();
    let tpl = Template::parse(
        "$(index):$(normname) ",
        Some("[$(name)|$(width)|$(offsetx)|$(index)|$(output)|$(signature)]"),
        Some("<$(height)$(normname)>"),
    );
    let text = sheet.render_template(&tpl, "out/s.png");
    let sig = sheet.signature.to_hex();
    assert_eq!(text, format!("[|0|0|0|out/s.png|{sig}]0:big 1:small <0>"));
}

#[test]
fn binding_argument_parsing() {
    let b = TemplateBinding::parse("body.css", "out.css").expect("body only");
    assert_eq!(b.header, None);
    assert_eq!(b.footer, None);

    let b = TemplateBinding::parse("body.css:head.css:foot.css", "out.css").expect("full");
    assert_eq!(b.header.as_deref(), Some(std::path::Path::new("head.css")));
    assert_eq!(b.footer.as_deref(), Some(std::path::Path::new("foot.css")));

    let b = TemplateBinding::parse("body.css::foot.css", "out.css").expect("no header");
    assert_eq!(b.header, None);
    assert!(b.footer.is_some());

    assert!(TemplateBinding::parse("a:b:c:d", "out").is_err());
    assert!(TemplateBinding::parse(":head", "out").is_err());
}

#[test]
fn job_writes_destination_and_closes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = dir.path().join("body.tpl");
    let header = dir.path().join("header.tpl");
    let footer = dir.path().join("footer.tpl");
    fs::write(&body, ".s-$(normname){background-position:-$(offsetx)px -$(offsety)px}\n").unwrap();
    fs::write(&header, ".s{background:url($(output))}\n").unwrap();
    fs::write(&footer, "/* $(signature) */\n").unwrap();
    let output = dir.path().join("sprites.css");

    let binding = TemplateBinding {
        body,
        header: Some(header),
        footer: Some(footer),
        output: output.clone(),
    };
    let sheet = sheet();
    let ctx = RenderContext {
        signature: sheet.signature,
        output_path: "sprites.png",
    };
    let job = TemplateJob::open(&binding).expect("open");
    let written = job.render(&sheet.assets, &ctx).expect("render");
    assert_eq!(written, output);

    let css = fs::read_to_string(&output).unwrap();
    let expected = format!(
        ".s{{background:url(sprites.png)}}\n\
         .s-big{{background-position:-0px -0px}}\n\
         .s-small{{background-position:-0px -10px}}\n\
         /* {} */\n",
        sheet.signature
    );
    assert_eq!(css, expected);
}

#[test]
fn missing_template_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let binding = TemplateBinding {
        body: dir.path().join("nope.tpl"),
        header: None,
        footer: None,
        output: dir.path().join("out.txt"),
    };
    assert!(TemplateJob::open(&binding).is_err());
    assert!(!dir.path().join("out.txt").exists());
}

#[test]
fn json_manifest_lists_frames() {
    let sheet = sheet();
    let v = to_json_manifest(&sheet, "sheet.png");
    let frames = v["frames"].as_object().expect("frames");
    assert_eq!(frames.len(), 2);
    assert_eq!(v["frames"]["img/small.png"]["frame"]["y"], 10);
    assert_eq!(v["frames"]["img/big.png"]["index"], 0);
    assert_eq!(v["meta"]["signature"], sheet.signature.to_hex());
    assert_eq!(v["meta"]["size"]["w"], 20);
}

#[test]
fn several_jobs_render_independently() {
    let dir = tempfile::tempdir().expect("tempdir");
    let p = |name: &str| dir.path().join(name);
    fs::write(p("css.body"), ".$(normname){left:$(offsetx)px;top:$(offsety)px}\n").unwrap();
    fs::write(p("css.head"), "/* $(output) */\n").unwrap();
    fs::write(p("list.body"), "$(index)=$(name) ").unwrap();
    fs::write(p("list.foot"), "#$(signature)").unwrap();

    let args = [
        format!("{}:{}", p("css.body").display(), p("css.head").display()),
        p("sheet.css").display().to_string(),
        format!("{}::{}", p("list.body").display(), p("list.foot").display()),
        p("sheet.txt").display().to_string(),
    ];
    let bindings = TemplateBinding::parse_pairs(&args).expect("pairs");
    assert_eq!(bindings.len(), 2);
    assert!(bindings[0].footer.is_none());
    assert!(bindings[1].header.is_none());

    let jobs: Vec<TemplateJob> = bindings
        .iter()
        .map(|b| TemplateJob::open(b).expect("open"))
        .collect();
    // destinations are only created once a job renders
    assert!(!p("sheet.css").exists());
    assert!(!p("sheet.txt").exists());

    let sheet = sheet();
    let ctx = RenderContext {
        signature: sheet.signature,
        output_path: "sheet.png",
    };
    for job in jobs {
        job.render(&sheet.assets, &ctx).expect("render");
    }

    assert_eq!(
        fs::read_to_string(p("sheet.css")).unwrap(),
        "/* sheet.png */\n.big{left:0px;top:0px}\n.small{left:0px;top:10px}\n"
    );
    assert_eq!(
        fs::read_to_string(p("sheet.txt")).unwrap(),
        format!("0=img/big.png 1=img/small.png #{}", sheet.signature)
    );
}

#[test]
fn binding_pairs_reject_odd_count() {
    let err = TemplateBinding::parse_pairs(&["body.css", "out.css", "dangling.css"]).unwrap_err();
    assert!(matches!(err, spritemap_core::SpriteMapError::Template(_)));
    assert!(TemplateBinding::parse_pairs::<&str>(&[]).expect("empty").is_empty());
}

#[test]
fn drive_prefixes_stay_with_their_part() {
    let b = TemplateBinding::parse(r"C:\tpl\body.css", "out.css").expect("drive body");
    assert_eq!(b.body, std::path::PathBuf::from(r"C:\tpl\body.css"));
    assert_eq!(b.header, None);

    let b = TemplateBinding::parse(r"C:\tpl\body.css:D:/tpl/head.css:foot.css", "out.css")
        .expect("drive parts");
    assert_eq!(b.body, std::path::PathBuf::from(r"C:\tpl\body.css"));
    assert_eq!(b.header.as_deref(), Some(std::path::Path::new("D:/tpl/head.css")));
    assert_eq!(b.footer.as_deref(), Some(std::path::Path::new("foot.css")));
}

#[test]
fn render_fails_on_unwritable_destination() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = dir.path().join("body.tpl");
    fs::write(&body, "$(name)\n").unwrap();
    let binding = TemplateBinding {
        body,
        header: None,
        footer: None,
        output: dir.path().join("missing-dir").join("out.txt"),
    };
    let job = TemplateJob::open(&binding).expect("templates load");
    let sheet = sheet();
    let ctx = RenderContext {
        signature: sheet.signature,
        output_path: "sheet.png",
    };
    let err = job.render(&sheet.assets, &ctx).unwrap_err();
    assert!(matches!(err, spritemap_core::SpriteMapError::Template(_)));
}
