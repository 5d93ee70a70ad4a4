//! Entry point: load an OBJ mesh or a directory of OBJ frames, compile them
//! through the headless resource registry and print a summary.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use asset::{AnimationSequence, FrameOrder, ImageFileDecoder, LoadContext, Mesh};
use renderer::ResourceRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Mesh(PathBuf),
    Animation {
        dir: PathBuf,
        filter: String,
        order: FrameOrder,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Options {
    source: Source,
    dump: bool,
    compile: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Options> {
    let mut obj: Option<PathBuf> = None;
    let mut anim_dir: Option<PathBuf> = None;
    let mut filter = String::new();
    let mut order = FrameOrder::default();
    let mut dump = false;
    let mut compile = true;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--obj=") {
            obj = Some(PathBuf::from(v));
        } else if let Some(v) = arg.strip_prefix("--anim-dir=") {
            anim_dir = Some(PathBuf::from(v));
        } else if let Some(v) = arg.strip_prefix("--filter=") {
            filter = v.to_string();
        } else if let Some(v) = arg.strip_prefix("--order=") {
            order = v.parse().with_context(|| format!("bad --order value '{v}'"))?;
        } else if arg == "--dump" {
            dump = true;
        } else if arg == "--no-compile" {
            compile = false;
        } else {
            log::warn!("Ignoring unknown argument '{}'", arg);
        }
    }

    let source = match (obj, anim_dir) {
        (Some(path), None) => Source::Mesh(path),
        (None, Some(dir)) => Source::Animation { dir, filter, order },
        (Some(_), Some(_)) => bail!("--obj and --anim-dir are mutually exclusive"),
        (None, None) => bail!(
            "usage: app --obj=PATH | --anim-dir=DIR [--filter=SUBSTR] [--order=asc|desc] \
             [--dump] [--no-compile]"
        ),
    };

    Ok(Options { source, dump, compile })
}

fn summarize(mesh: &Mesh) {
    if !mesh.is_valid() {
        log::warn!("'{}' has no positions or no faces", mesh.name);
    }
    log::info!(
        "'{}': {} positions, {} normals, {} texcoords, {} faces, {} materials",
        mesh.name,
        mesh.positions.len(),
        mesh.normals.len(),
        mesh.texcoords.len(),
        mesh.faces.len(),
        mesh.materials.len()
    );
}

fn run_mesh(path: PathBuf, opts: &Options, gpu: &mut ResourceRegistry) -> Result<()> {
    let images = ImageFileDecoder;
    let mut mesh = {
        let mut ctx = LoadContext::new(gpu, &images);
        asset::load_mesh(&path, &mut ctx)
            .with_context(|| format!("loading mesh {}", path.display()))?
    };
    summarize(&mesh);

    if opts.compile {
        let list = mesh.compile(gpu)?;
        if let Some(draw) = gpu.draw_list(list) {
            log::info!(
                "Compiled into {} vertices, {} triangles, {} batches",
                draw.vertices.len(),
                draw.triangle_count(),
                draw.batches.len()
            );
        }
    }
    if opts.dump {
        let mut out = io::stdout().lock();
        mesh.write_dump(&mut out)?;
        out.flush()?;
    }

    mesh.release(gpu)?;
    Ok(())
}

fn run_animation(
    dir: PathBuf,
    filter: &str,
    order: FrameOrder,
    opts: &Options,
    gpu: &mut ResourceRegistry,
) -> Result<()> {
    let images = ImageFileDecoder;
    let mut seq: AnimationSequence = {
        let mut ctx = LoadContext::new(gpu, &images);
        asset::load_animation(&dir, filter, order, &mut ctx)
            .with_context(|| format!("loading animation from {}", dir.display()))?
    };
    log::info!("Loaded {} frame(s) from {}", seq.len(), dir.display());
    for frame in &seq {
        summarize(frame);
    }

    if opts.compile {
        seq.compile(gpu)?;
    }
    if opts.dump {
        let mut out = io::stdout().lock();
        for frame in &seq {
            frame.write_dump(&mut out)?;
        }
        out.flush()?;
    }

    seq.release(gpu)?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = parse_args(std::env::args().skip(1))?;
    log::info!("Starting objanim: {:?}", opts);

    let mut gpu = ResourceRegistry::new();
    match opts.source.clone() {
        Source::Mesh(path) => run_mesh(path, &opts, &mut gpu)?,
        Source::Animation { dir, filter, order } => {
            run_animation(dir, &filter, order, &opts, &mut gpu)?
        }
    }

    log::info!(
        "Done. {} handle(s) released, {} still live",
        gpu.released_count(),
        gpu.live_handles()
    );
    Ok(())
}
